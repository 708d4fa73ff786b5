use std::collections::BTreeSet;

use crate::model::common::voter::VoterId;
use crate::tally::voter_set::VoterSet;

/// Derived weight data for a single voter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Weighted {
    /// Everyone whose weight has been folded into this voter, directly or transitively.
    pub delegated_by: BTreeSet<VoterId>,
}

impl Weighted {
    /// The voter's own ballot plus everyone delegating to them.
    pub fn weight(&self) -> u64 {
        self.delegated_by.len() as u64 + 1
    }
}

/// Weights for a whole [`VoterSet`], indexed in parallel with its arena.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Weights {
    voters: Vec<Weighted>,
}

impl Weights {
    pub fn get(&self, index: usize) -> &Weighted {
        &self.voters[index]
    }

    pub fn weight(&self, index: usize) -> u64 {
        self.voters[index].weight()
    }
}

/// Compute who ultimately delegates to whom.
///
/// Every delegating voter walks their own chain and adds themselves to each hop
/// along it. Since every voter does this, each hop ends up holding the full
/// transitive set without merging anyone else's set into it, and a voter
/// counted twice is still only one set member.
///
/// Expects the delegations to have been resolved already.
pub fn aggregate(voters: &VoterSet) -> Weights {
    let mut delegated_by = vec![BTreeSet::new(); voters.len()];

    for (index, voter) in voters.iter().enumerate() {
        let mut current = index;
        let mut hops = 0;
        while let Some(next) = voters.get(current).delegate {
            hops += 1;
            if hops > voters.len() {
                error!(
                    "Delegation chain from voter {} is still cyclic after resolution",
                    voter.id
                );
                break;
            }
            delegated_by[next].insert(index);
            current = next;
        }
    }

    // Turn arena indices into owned ID sets.
    let per_voter = delegated_by
        .into_iter()
        .map(|indices| Weighted {
            delegated_by: indices
                .into_iter()
                .map(|index| voters.get(index).id.clone())
                .collect(),
        })
        .collect();
    Weights { voters: per_voter }
}
