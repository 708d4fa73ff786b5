use serde::{Deserialize, Serialize};

use crate::model::common::voter::VoterId;
use crate::tally::TallyIssue;

/// A sealed ballot as filed on the external ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedBallot {
    /// The ledger-side voter ID the ballot was filed under.
    pub voter_id: VoterId,
    /// Armored ciphertext.
    pub ciphertext: String,
}

/// A request to tally an election.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyRequest {
    /// Expected number of options; checked against the election if given.
    #[serde(default)]
    pub option_count: Option<usize>,
    /// Ballots collected from the external ledger.
    #[serde(default)]
    pub ballots: Vec<EncryptedBallot>,
    /// Passphrase unlocking the election private key, if not the configured one.
    #[serde(default)]
    pub passphrase: Option<String>,
}

/// The results of a successful, persisted tally run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyResponse {
    pub counts: Vec<u64>,
    pub percentages: Vec<f64>,
    /// ID of the run that persisted these results.
    pub run: u64,
    /// Everything the run recovered from.
    pub issues: Vec<TallyIssue>,
}
