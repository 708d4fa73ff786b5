#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use std::sync::Arc;

use rocket::{figment::Figment, Build, Rocket};

use crate::config::{AwsFairing, ConfigFairing, DatabaseFairing};
use crate::logging::LoggerFairing;
use crate::service::{SharedElectionStore, SharedSecretStore, TallyServiceFairing};
use crate::store::{ElectionStore, SecretStore};

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod tally;

/// Build the production server: config from `Rocket.toml`, MongoDB for
/// elections and voters, and AWS Secrets Manager for election keys.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(AwsFairing)
        .attach(TallyServiceFairing)
        .mount("/", api::routes())
}

/// Build a server over the given stores instead of MongoDB and AWS.
pub fn rocket_for_stores<S, K>(figment: Figment, store: S, secrets: K) -> Rocket<Build>
where
    S: ElectionStore + 'static,
    K: SecretStore + 'static,
{
    let store: SharedElectionStore = Arc::new(store);
    let secrets: SharedSecretStore = Arc::new(secrets);
    rocket::custom(figment)
        .manage(store)
        .manage(secrets)
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(TallyServiceFairing)
        .mount("/", api::routes())
}

/// Passphrase locking the example election keys.
#[cfg(test)]
pub(crate) const TEST_PASSPHRASE: &str = "liquid";

/// Rocket config for tests.
#[cfg(test)]
pub(crate) fn test_figment() -> Figment {
    // Pin every tally setting so the active profile in Rocket.toml cannot leak in.
    rocket::Config::figment()
        .merge(("tally_timeout", 10))
        .merge(("allow_open_tally", false))
        .merge(("ballot_precedence", "stored"))
        .merge(("key_passphrase", TEST_PASSPHRASE))
        .merge(("log_level", "off"))
}

/// Insert the example elections, each with a fresh keypair.
#[cfg(test)]
pub(crate) async fn seed_example_elections(
    store: &store::MemoryStore,
    secrets: &store::MemorySecretStore,
) {
    use crate::crypto::ElectionPrivateKey;
    use crate::model::db::election::Election;

    for mut election in [Election::ended_example(), Election::open_example()] {
        let key = ElectionPrivateKey::generate();
        election.public_key = key.public_key().to_armored();
        secrets
            .insert(&election.id, key.lock(TEST_PASSPHRASE).unwrap())
            .await;
        store.insert_election(election).await;
    }
}
