use mongodb::{bson::doc, Database};
use rocket::futures::TryStreamExt;

use crate::error::Result;
use crate::model::{
    common::{election::ElectionId, voter::VoterRecord},
    db::{election::Election, voter::Voter},
    mongodb::{tally_run_counter_id, Coll, Counter},
};
use crate::store::ElectionStore;
use crate::tally::Tally;

/// The production store, backed by MongoDB.
#[derive(Clone)]
pub struct MongoStore {
    elections: Coll<Election>,
    voters: Coll<Voter>,
    counters: Coll<Counter>,
}

impl MongoStore {
    pub fn from_db(db: &Database) -> Self {
        Self {
            elections: Coll::from_db(db),
            voters: Coll::from_db(db),
            counters: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl ElectionStore for MongoStore {
    async fn election(&self, election_id: &ElectionId) -> Result<Option<Election>> {
        let election = self
            .elections
            .find_one(doc! { "_id": election_id }, None)
            .await?;
        Ok(election)
    }

    async fn voters(&self, election_id: &ElectionId) -> Result<Vec<VoterRecord>> {
        let voters: Vec<Voter> = self
            .voters
            .find(doc! { "election_id": election_id }, None)
            .await?
            .try_collect()
            .await?;
        Ok(voters.into_iter().map(|voter| voter.voter).collect())
    }

    async fn next_tally_run(&self, election_id: &ElectionId) -> Result<u64> {
        Counter::next(&self.counters, &tally_run_counter_id(election_id)).await
    }

    async fn write_results(
        &self,
        election_id: &ElectionId,
        tally: &Tally,
        run: u64,
    ) -> Result<bool> {
        let run = run as i64;
        // Only overwrite results from an earlier run, or none at all.
        let filter = doc! {
            "_id": election_id,
            "$or": [
                { "tally_run": { "$lt": run } },
                { "tally_run": { "$exists": false } },
            ],
        };
        let counts: Vec<i64> = tally.counts.iter().map(|&count| count as i64).collect();
        let update = doc! {
            "$set": {
                "counts": counts,
                "percentages": &tally.percentages,
                "tally_run": run,
            }
        };
        let result = self.elections.update_one(filter, update, None).await?;
        Ok(result.matched_count == 1)
    }
}
