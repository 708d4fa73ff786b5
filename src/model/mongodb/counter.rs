use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{common::election::ElectionId, mongodb::Coll};

/// A counter object used to hand out monotonically increasing values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u64,
}

impl Counter {
    /// Atomically increment the counter with the given ID and return the new value.
    /// A counter that does not exist yet starts from zero, so the first value is one.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u64> {
        let update = doc! {
            "$inc": { "next": 1_i64 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    format!("Failed to upsert counter with ID {id}"),
                )
            })?;
        Ok(counter.next)
    }
}

/// The ID of the counter numbering tally runs for the given election.
pub fn tally_run_counter_id(election_id: &ElectionId) -> String {
    format!("tally_run:{election_id}")
}
