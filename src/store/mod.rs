//! The collaborators a tally run reads from and writes to.
//!
//! The tally service only ever sees these traits, so the pipeline can run
//! against MongoDB and AWS in production and against in-memory fixtures in tests.

use crate::error::Result;
use crate::model::{
    common::{election::ElectionId, voter::VoterRecord},
    db::election::Election,
};
use crate::tally::Tally;

mod memory;
mod mongo;
mod secrets;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use secrets::{AwsSecretStore, MemorySecretStore};

/// Where elections and their plaintext voters live, and where results go.
#[rocket::async_trait]
pub trait ElectionStore: Send + Sync {
    /// Fetch an election, if it exists.
    async fn election(&self, election_id: &ElectionId) -> Result<Option<Election>>;

    /// Fetch every plaintext voter record stored for an election.
    async fn voters(&self, election_id: &ElectionId) -> Result<Vec<VoterRecord>>;

    /// Draw the next tally run ID for an election. IDs are strictly increasing
    /// and start from one.
    async fn next_tally_run(&self, election_id: &ElectionId) -> Result<u64>;

    /// Atomically write counts and percentages as the result of tally run `run`.
    ///
    /// Returns `false` without writing anything if a run with an equal or
    /// later ID has already written its results.
    async fn write_results(&self, election_id: &ElectionId, tally: &Tally, run: u64)
        -> Result<bool>;
}

/// Where election private keys are kept.
#[rocket::async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the armored, passphrase-locked private key of an election.
    async fn private_key(&self, election_id: &ElectionId) -> Result<String>;
}
