use std::collections::HashMap;
use std::sync::Arc;

use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    common::{election::ElectionId, voter::VoterRecord},
    db::election::Election,
};
use crate::store::ElectionStore;
use crate::tally::Tally;

#[derive(Default)]
struct Contents {
    elections: HashMap<ElectionId, Election>,
    voters: HashMap<ElectionId, Vec<VoterRecord>>,
    tally_runs: HashMap<ElectionId, u64>,
}

/// A store held entirely in memory. Clones share the same contents.
///
/// Used by the offline CLI and by tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    contents: Arc<Mutex<Contents>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an election.
    pub async fn insert_election(&self, election: Election) {
        self.contents
            .lock()
            .await
            .elections
            .insert(election.id.clone(), election);
    }

    /// Add plaintext voters to an election.
    pub async fn insert_voters(
        &self,
        election_id: &ElectionId,
        voters: impl IntoIterator<Item = VoterRecord>,
    ) {
        self.contents
            .lock()
            .await
            .voters
            .entry(election_id.clone())
            .or_default()
            .extend(voters);
    }
}

#[rocket::async_trait]
impl ElectionStore for MemoryStore {
    async fn election(&self, election_id: &ElectionId) -> Result<Option<Election>> {
        Ok(self.contents.lock().await.elections.get(election_id).cloned())
    }

    async fn voters(&self, election_id: &ElectionId) -> Result<Vec<VoterRecord>> {
        Ok(self
            .contents
            .lock()
            .await
            .voters
            .get(election_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn next_tally_run(&self, election_id: &ElectionId) -> Result<u64> {
        let mut contents = self.contents.lock().await;
        let run = contents.tally_runs.entry(election_id.clone()).or_default();
        *run += 1;
        Ok(*run)
    }

    async fn write_results(
        &self,
        election_id: &ElectionId,
        tally: &Tally,
        run: u64,
    ) -> Result<bool> {
        let mut contents = self.contents.lock().await;
        let election = contents
            .elections
            .get_mut(election_id)
            .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
        if election.tally_run >= run {
            return Ok(false);
        }
        election.counts = tally.counts.clone();
        election.percentages = tally.percentages.clone();
        election.tally_run = run;
        Ok(true)
    }
}
