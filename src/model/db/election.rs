use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::election::ElectionId;

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Election name.
    pub name: String,
    /// The options on the ballot. Index zero is conventionally "abstain".
    pub options: Vec<String>,
    /// Weighted vote count per option, parallel to `options`.
    #[serde(default)]
    pub counts: Vec<u64>,
    /// Share of the total weight per option, parallel to `options`.
    #[serde(default)]
    pub percentages: Vec<f64>,
    /// Armored public key voters seal their ledger ballots with.
    #[serde(default)]
    pub public_key: String,
    /// Reference to the external ledger holding sealed ballots.
    #[serde(default)]
    pub ledger_address: String,
    /// Voting closes at this time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub deadline: DateTime<Utc>,
    /// Set by the deadline scheduler once voting has closed.
    #[serde(default)]
    pub ended: bool,
    /// ID of the tally run that last wrote `counts` and `percentages`.
    /// Zero if the election has never been tallied.
    #[serde(default)]
    pub tally_run: u64,
}

impl ElectionCore {
    /// Has voting closed, either by being marked ended or by passing the deadline?
    pub fn has_closed(&self, now: DateTime<Utc>) -> bool {
        self.ended || now >= self.deadline
    }

    /// Have results been written at least once?
    pub fn is_tallied(&self) -> bool {
        self.tally_run > 0
    }
}

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

/// Example data for tests.
#[cfg(test)]
pub mod examples {
    use chrono::Duration;

    use super::*;

    impl Election {
        /// An election whose deadline has passed.
        pub fn ended_example() -> Self {
            Self {
                id: "referendum".to_string(),
                election: ElectionCore {
                    name: "Referendum".to_string(),
                    options: vec!["abstain".to_string(), "yes".to_string(), "no".to_string()],
                    counts: Vec::new(),
                    percentages: Vec::new(),
                    public_key: String::new(),
                    ledger_address: "0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string(),
                    deadline: Utc::now() - Duration::days(1),
                    ended: true,
                    tally_run: 0,
                },
            }
        }

        /// An election still accepting votes.
        pub fn open_example() -> Self {
            let mut election = Self::ended_example();
            election.id = "budget".to_string();
            election.name = "Budget".to_string();
            election.deadline = Utc::now() + Duration::days(7);
            election.ended = false;
            election
        }
    }
}
