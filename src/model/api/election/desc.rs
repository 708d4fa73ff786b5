use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{common::election::ElectionId, db::election::Election};

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDescription {
    /// Election unique ID.
    pub id: ElectionId,
    /// Election name.
    pub name: String,
    /// Ballot options, index zero being "abstain".
    pub options: Vec<String>,
    /// Latest persisted counts; empty if never tallied.
    pub counts: Vec<u64>,
    /// Latest persisted percentages; empty if never tallied.
    pub percentages: Vec<f64>,
    /// Armored public key for sealing ledger ballots.
    pub public_key: String,
    /// Reference to the external ballot ledger.
    pub ledger_address: String,
    /// Voting closes at this time.
    pub deadline: DateTime<Utc>,
    /// Has voting been closed?
    pub ended: bool,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            name: election.election.name,
            options: election.election.options,
            counts: election.election.counts,
            percentages: election.election.percentages,
            public_key: election.election.public_key,
            ledger_address: election.election.ledger_address,
            deadline: election.election.deadline,
            ended: election.election.ended,
        }
    }
}
