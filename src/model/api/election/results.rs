use serde::{Deserialize, Serialize};

use crate::model::db::election::Election;

/// The persisted outcome of the latest tally of an election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub counts: Vec<u64>,
    pub percentages: Vec<f64>,
    /// The tally run that wrote these results.
    pub run: u64,
}

impl ElectionResults {
    /// Extract the results of an election, or `None` if it has never been tallied.
    pub fn from_election(election: Election) -> Option<Self> {
        if !election.is_tallied() {
            return None;
        }
        Some(Self {
            run: election.tally_run,
            counts: election.election.counts,
            percentages: election.election.percentages,
        })
    }
}
