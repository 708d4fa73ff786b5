use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::common::{
    election::OptionIndex,
    voter::{Origin, VoterId},
};

/// A problem with a single ballot or voter that the tally recovered from.
///
/// None of these abort a run: the offending unit is excluded or repaired and
/// the tally carries on. They are returned alongside the result so operators
/// can see what happened.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TallyIssue {
    /// A sealed ballot could not be opened or parsed; it was dropped.
    #[error("Ballot filed by ledger voter {voter_id} could not be decrypted: {reason}")]
    DecryptionFailure { voter_id: VoterId, reason: String },
    /// A ballot opened, but claims to be from someone other than the voter it was filed under.
    #[error("Ballot filed by ledger voter {voter_id} decrypted to a record for {claimed_id}")]
    BallotVoterMismatch { voter_id: VoterId, claimed_id: VoterId },
    /// A second record for an already-present voter was discarded.
    #[error("Duplicate {dropped} record for voter {voter_id} ignored in favour of the {kept} one")]
    DuplicateVoter {
        voter_id: VoterId,
        kept: Origin,
        dropped: Origin,
    },
    /// A delegation pointed at nobody; the voter was treated as not delegating.
    #[error("Voter {voter_id} delegates to unknown voter {target}; treating as a direct vote")]
    MissingDelegateTarget { voter_id: VoterId, target: VoterId },
    /// A delegation cycle was broken by forcing `voter_id` to abstain.
    #[error("Delegation cycle broken at voter {voter_id} (reached from {walk_start}); vote set to abstain")]
    CycleBroken {
        voter_id: VoterId,
        walk_start: VoterId,
    },
    /// A terminal voter chose an option that does not exist; their weight was not counted.
    #[error("Voter {voter_id} voted for nonexistent option {vote}")]
    VoteOutOfRange { voter_id: VoterId, vote: OptionIndex },
    /// The counted weight does not add up to the number of voters.
    #[error("Counted weight {total_weight} does not match voter count {voter_count}")]
    WeightConsistencyMismatch { total_weight: u64, voter_count: u64 },
    /// Nobody's weight was counted; all percentages are zero.
    #[error("No weight was counted; percentages default to zero")]
    EmptyElectorate,
}

impl TallyIssue {
    /// Log this issue at a level matching its severity.
    fn log(&self) {
        match self {
            Self::WeightConsistencyMismatch { .. } => error!("{self}"),
            Self::EmptyElectorate => info!("{self}"),
            _ => warn!("{self}"),
        }
    }
}

/// Every issue raised during a single tally run, in the order they arose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TallyReport {
    issues: Vec<TallyIssue>,
}

impl TallyReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (and log) an issue.
    pub fn push(&mut self, issue: TallyIssue) {
        issue.log();
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[TallyIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<TallyIssue> {
        self.issues
    }

    /// Did the run fail its weight-consistency check?
    /// This never blocks persisting a result, but points at a resolver bug.
    pub fn has_integrity_failure(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| matches!(issue, TallyIssue::WeightConsistencyMismatch { .. }))
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}
