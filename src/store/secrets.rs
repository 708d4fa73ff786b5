use std::collections::HashMap;
use std::sync::Arc;

use aws_sdk_secretsmanager::{error::DisplayErrorContext, Client as SecretsClient};
use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::common::election::ElectionId;
use crate::store::SecretStore;

/// Election private keys kept in AWS Secrets Manager, one secret per election.
#[derive(Clone)]
pub struct AwsSecretStore {
    client: SecretsClient,
    prefix: String,
}

impl AwsSecretStore {
    /// The key of election `X` is read from the secret named `{prefix}X`.
    pub fn new(client: SecretsClient, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    fn secret_name(&self, election_id: &ElectionId) -> String {
        format!("{}{election_id}", self.prefix)
    }
}

#[rocket::async_trait]
impl SecretStore for AwsSecretStore {
    async fn private_key(&self, election_id: &ElectionId) -> Result<String> {
        let name = self.secret_name(election_id);
        debug!("Fetching secret {name}");
        let output = self
            .client
            .get_secret_value()
            .secret_id(&name)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false);
                if missing {
                    Error::not_found(format!("Private key for election {election_id}"))
                } else {
                    Error::SecretStore(format!("{}", DisplayErrorContext(e)))
                }
            })?;
        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| Error::SecretStore(format!("Secret {name} has no string value")))
    }
}

/// Election private keys held in memory. Clones share the same keys.
#[derive(Clone, Default)]
pub struct MemorySecretStore {
    keys: Arc<Mutex<HashMap<ElectionId, String>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the armored, locked private key of an election.
    pub async fn insert(&self, election_id: &ElectionId, armored: String) {
        self.keys.lock().await.insert(election_id.clone(), armored);
    }
}

#[rocket::async_trait]
impl SecretStore for MemorySecretStore {
    async fn private_key(&self, election_id: &ElectionId) -> Result<String> {
        self.keys
            .lock()
            .await
            .get(election_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Private key for election {election_id}")))
    }
}
