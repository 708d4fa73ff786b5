use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_secretsmanager::{
    config::{Credentials, Region},
    Client as SecretsClient,
};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::ensure_indexes_exist;
use crate::service::{SharedElectionStore, SharedSecretStore};
use crate::store::{AwsSecretStore, MongoStore};
use crate::tally::BallotPrecedence;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // non-secrets
    pub(crate) tally_timeout: u64,
    #[serde(default)]
    pub(crate) allow_open_tally: bool,
    #[serde(default)]
    pub(crate) ballot_precedence: BallotPrecedence,
    // secrets
    pub(crate) key_passphrase: String,
}

impl Config {
    /// Bound on fetching and decrypting for one tally run.
    pub fn tally_timeout(&self) -> Duration {
        Duration::from_secs(self.tally_timeout)
    }

    /// May elections be tallied before they have closed?
    pub fn allow_open_tally(&self) -> bool {
        self.allow_open_tally
    }

    /// Which record wins when a voter is both stored and on the ledger.
    pub fn ballot_precedence(&self) -> BallotPrecedence {
        self.ballot_precedence
    }

    /// Passphrase unlocking election private keys, unless the caller supplies one.
    pub fn key_passphrase(&self) -> &str {
        &self.key_passphrase
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures the indexes exist, and places the `MongoStore` into managed state
/// as the election store.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(DATABASE);

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        let store: SharedElectionStore = Arc::new(MongoStore::from_db(&db));
        rocket = rocket.manage(client).manage(db).manage(store);
        Ok(rocket)
    }
}

/// Name of the database holding elections and voters.
const DATABASE: &str = "liquid";

/// Configuration for the AWS connection.
#[derive(Deserialize)]
struct AwsConfig {
    // non-secrets
    aws_region: String,
    aws_access_key_id: String,
    #[serde(default)]
    secret_prefix: String,
    // secrets
    aws_secret_access_key: String,
}

/// A fairing that loads the AWS config and places a Secrets Manager backed
/// secret store into managed state.
pub struct AwsFairing;

#[rocket::async_trait]
impl Fairing for AwsFairing {
    fn info(&self) -> Info {
        Info {
            name: "AWS Secrets Manager",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<AwsConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load AWS config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        // Construct the connection.
        let aws_config = SdkConfig::builder()
            .region(Region::new(config.aws_region))
            .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
                config.aws_access_key_id,
                config.aws_secret_access_key,
                None,
                None,
                "rocket config",
            )))
            .behavior_version(BehaviorVersion::latest())
            .build();
        let client = SecretsClient::new(&aws_config);
        info!(
            "Loaded AWS Secrets Manager config, secret prefix \"{}\"",
            config.secret_prefix
        );

        // Manage the state.
        let secrets: SharedSecretStore = Arc::new(AwsSecretStore::new(client, config.secret_prefix));
        rocket = rocket.manage(secrets);
        Ok(rocket)
    }
}


#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::*;

    #[test]
    fn optional_settings_have_defaults() {
        let figment = Figment::new()
            .merge(Serialized::default("tally_timeout", 30))
            .merge(Serialized::default("key_passphrase", "liquid"));
        let config = figment.extract::<Config>().unwrap();

        assert_eq!(config.tally_timeout(), Duration::from_secs(30));
        assert!(!config.allow_open_tally());
        assert_eq!(config.ballot_precedence(), BallotPrecedence::Stored);
        assert_eq!(config.key_passphrase(), "liquid");
    }

    #[test]
    fn ballot_precedence_is_configurable() {
        let figment = Figment::new()
            .merge(Serialized::default("tally_timeout", 30))
            .merge(Serialized::default("key_passphrase", "liquid"))
            .merge(Serialized::default("ballot_precedence", "ledger"))
            .merge(Serialized::default("allow_open_tally", true));
        let config = figment.extract::<Config>().unwrap();

        assert_eq!(config.ballot_precedence(), BallotPrecedence::Ledger);
        assert!(config.allow_open_tally());
    }

    #[test]
    fn test_settings_override_the_debug_profile() {
        let figment = crate::test_figment().select("debug");
        let config = figment.extract::<Config>().unwrap();

        assert!(!config.allow_open_tally());
        assert_eq!(config.ballot_precedence(), BallotPrecedence::Stored);
        assert_eq!(config.tally_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn missing_passphrase_is_an_error() {
        let figment = Figment::new().merge(Serialized::default("tally_timeout", 30));
        assert!(figment.extract::<Config>().is_err());
    }
}
