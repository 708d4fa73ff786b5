use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, tokio::task::JoinError};
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::model::common::election::ElectionId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("Secret store failure: {0}")]
    SecretStore(String),
    #[error("Background task failed: {0}")]
    Task(#[from] JoinError),
    #[error("Tally of election {0} timed out")]
    Timeout(ElectionId),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Crypto(_) | Self::SecretStore(_) | Self::Task(_) => {
                Status::InternalServerError
            }
            Self::Timeout(_) => Status::GatewayTimeout,
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            warn!("{self}");
        }
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(
            Error::not_found("Election budget".to_string()).status(),
            Status::NotFound
        );
        assert_eq!(
            Error::Timeout("budget".to_string()).status(),
            Status::GatewayTimeout
        );
        assert_eq!(
            Error::Crypto(CryptoError::Aead).status(),
            Status::InternalServerError
        );
        assert_eq!(
            Error::Status(Status::Conflict, "stale".to_string()).to_string(),
            "stale"
        );
    }
}
