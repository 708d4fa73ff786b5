use std::collections::{btree_map::Entry, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::model::common::{
    election::OptionIndex,
    voter::{Origin, VoterId, VoterRecord},
};
use crate::tally::report::{TallyIssue, TallyReport};

/// A voter as seen by one tally run.
///
/// This is a private working copy of the input record: the resolver may clear
/// its delegation or force its vote to abstain, but the stored documents are
/// never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyVoter {
    pub id: VoterId,
    pub vote: OptionIndex,
    /// Delegation as a voter ID, or empty for none.
    pub delegation: VoterId,
    pub origin: Origin,
    /// Arena index of the delegate, filled in by the resolver.
    pub(crate) delegate: Option<usize>,
}

impl TallyVoter {
    fn new(record: VoterRecord, origin: Origin) -> Self {
        Self {
            id: record.id,
            vote: record.vote,
            delegation: record.delegation,
            origin,
            delegate: None,
        }
    }

    /// Is this voter a terminal, i.e. casting (rather than handing on) a vote?
    ///
    /// Only meaningful once the set has been resolved.
    pub fn is_terminal(&self) -> bool {
        self.delegate.is_none()
    }
}

/// A de-duplicated arena of voters, ordered by ID.
///
/// Delegations are followed by arena index rather than by reference, and every
/// pass over the set visits voters in ascending ID order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoterSet {
    voters: Vec<TallyVoter>,
}

impl VoterSet {
    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TallyVoter> {
        self.voters.iter()
    }

    /// Get a voter by arena index. Panics if out of bounds.
    pub fn get(&self, index: usize) -> &TallyVoter {
        &self.voters[index]
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut TallyVoter {
        &mut self.voters[index]
    }

    /// Find the arena index of the given voter.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.voters
            .binary_search_by(|voter| voter.id.as_str().cmp(id))
            .ok()
    }

    pub fn by_id(&self, id: &str) -> Option<&TallyVoter> {
        self.position(id).map(|index| self.get(index))
    }
}

/// Which source wins when a voter appears both in the stored collection and
/// among the decrypted ledger ballots.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallotPrecedence {
    /// The stored plaintext record is kept and the ledger ballot ignored.
    #[default]
    Stored,
    /// The ledger ballot is kept and the stored record ignored.
    Ledger,
}

/// Merges stored and decrypted voters into one [`VoterSet`].
///
/// Merging is first-writer-wins: the preferred origin is inserted first, and any
/// later record for an already-present ID is dropped and reported.
#[derive(Debug, Clone)]
pub struct VoterSetBuilder {
    precedence: BallotPrecedence,
    stored: Vec<VoterRecord>,
    ledger: Vec<VoterRecord>,
}

impl VoterSetBuilder {
    pub fn new(precedence: BallotPrecedence) -> Self {
        Self {
            precedence,
            stored: Vec::new(),
            ledger: Vec::new(),
        }
    }

    /// Add plaintext voters read from the store.
    pub fn stored(mut self, records: impl IntoIterator<Item = VoterRecord>) -> Self {
        self.stored.extend(records);
        self
    }

    /// Add voters decrypted from ledger ballots.
    pub fn ledger(mut self, records: impl IntoIterator<Item = VoterRecord>) -> Self {
        self.ledger.extend(records);
        self
    }

    pub fn build(self, report: &mut TallyReport) -> VoterSet {
        let batches = match self.precedence {
            BallotPrecedence::Stored => [
                (self.stored, Origin::Stored),
                (self.ledger, Origin::Ledger),
            ],
            BallotPrecedence::Ledger => [
                (self.ledger, Origin::Ledger),
                (self.stored, Origin::Stored),
            ],
        };

        let mut voters = BTreeMap::new();
        for (records, origin) in batches {
            for record in records {
                match voters.entry(record.id.clone()) {
                    Entry::Vacant(entry) => {
                        entry.insert(TallyVoter::new(record, origin));
                    }
                    Entry::Occupied(entry) => report.push(TallyIssue::DuplicateVoter {
                        voter_id: record.id,
                        kept: entry.get().origin,
                        dropped: origin,
                    }),
                }
            }
        }

        VoterSet {
            voters: voters.into_values().collect(),
        }
    }
}
