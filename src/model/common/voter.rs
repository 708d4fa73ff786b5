use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::model::common::election::OptionIndex;

/// Voter IDs are opaque strings, unique within an election.
pub type VoterId = String;

/// Where a voter record came from. Only relevant for de-duplication.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// A plaintext record stored alongside the election.
    Stored,
    /// A ballot decrypted from the external ledger.
    Ledger,
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored => write!(f, "stored"),
            Self::Ledger => write!(f, "ledger"),
        }
    }
}

/// A single voter's choice, in its wire shape.
///
/// This is both what we store for plaintext voters and what a sealed ledger
/// ballot decrypts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub id: VoterId,
    /// Chosen option. Zero means abstain.
    #[serde(default)]
    pub vote: OptionIndex,
    /// The voter this voter's weight is handed to, or empty for none.
    #[serde(default)]
    pub delegation: VoterId,
    /// Weight as last reported by whoever wrote the record.
    /// Never trusted: the tally always recomputes it.
    #[serde(default = "unit_weight")]
    pub weight: u64,
    /// Submission time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

fn unit_weight() -> u64 {
    1
}
