//! Liquid-democracy tallying.
//!
//! A run goes through four stages, each in its own module:
//!
//! 1. [`voter_set`]: merge stored and decrypted voters into one de-duplicated arena.
//! 2. [`resolver`]: drop dangling delegations and break delegation cycles.
//! 3. [`aggregator`]: work out who transitively delegates to whom, and so each weight.
//! 4. [`computer`]: sum terminal voters' weights per option and derive percentages.
//!
//! The whole pass is synchronous and works on a private snapshot of the voters.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::common::{
    election::OptionIndex,
    voter::{Origin, VoterId},
};

pub mod aggregator;
pub mod computer;
pub mod report;
pub mod resolver;
pub mod voter_set;

pub use computer::Tally;
pub use report::{TallyIssue, TallyReport};
pub use voter_set::{BallotPrecedence, VoterSet, VoterSetBuilder};

/// A voter after resolution, with their derived weight.
///
/// These only live for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVoter {
    pub id: VoterId,
    pub vote: OptionIndex,
    pub delegation: VoterId,
    pub origin: Origin,
    pub weight: u64,
    pub delegated_by: BTreeSet<VoterId>,
}

/// Everything a tally run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct TallyOutcome {
    pub tally: Tally,
    pub voters: Vec<ResolvedVoter>,
    pub report: TallyReport,
}

/// Resolve, weigh and count a voter set over `option_count` options.
///
/// `report` carries any issues already raised while assembling the set.
pub fn tally(option_count: usize, mut voters: VoterSet, mut report: TallyReport) -> TallyOutcome {
    resolver::resolve_delegations(&mut voters, &mut report);
    let weights = aggregator::aggregate(&voters);
    let tally = computer::count_votes(option_count, &voters, &weights, &mut report);

    let voters = voters
        .iter()
        .enumerate()
        .map(|(index, voter)| {
            let weighted = weights.get(index);
            ResolvedVoter {
                id: voter.id.clone(),
                vote: voter.vote,
                delegation: voter.delegation.clone(),
                origin: voter.origin,
                weight: weighted.weight(),
                delegated_by: weighted.delegated_by.clone(),
            }
        })
        .collect::<Vec<_>>();

    for voter in &voters {
        debug!(
            "Voter: {}, weight: {}, vote: {}, delegation: {:?}, delegates: {:?}",
            voter.id, voter.weight, voter.vote, voter.delegation, voter.delegated_by
        );
    }

    TallyOutcome {
        tally,
        voters,
        report,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::model::common::{election::ABSTAIN, voter::VoterRecord};

    fn options(names: &[&str]) -> usize {
        names.len()
    }

    fn run(option_count: usize, stored: Vec<VoterRecord>, ledger: Vec<VoterRecord>) -> TallyOutcome {
        let mut report = TallyReport::new();
        let voters = VoterSetBuilder::new(BallotPrecedence::Stored)
            .stored(stored)
            .ledger(ledger)
            .build(&mut report);
        tally(option_count, voters, report)
    }

    fn resolved<'a>(outcome: &'a TallyOutcome, id: &str) -> &'a ResolvedVoter {
        outcome.voters.iter().find(|voter| voter.id == id).unwrap()
    }

    #[test]
    fn delegation_chain() {
        let outcome = run(
            options(&["abstain", "yes", "no"]),
            vec![
                VoterRecord::delegating("A", "B"),
                VoterRecord::delegating("B", "C"),
                VoterRecord::direct("C", 1),
            ],
            vec![],
        );

        assert_eq!(resolved(&outcome, "C").weight, 3);
        assert_eq!(outcome.tally.counts, vec![0, 3, 0]);
        assert_eq!(outcome.tally.percentages, vec![0.0, 100.0, 0.0]);
        assert!(outcome.report.is_empty());
    }

    #[test]
    fn two_cycle() {
        let outcome = run(
            options(&["abstain", "yes"]),
            vec![
                VoterRecord {
                    vote: 1,
                    ..VoterRecord::delegating("A", "B")
                },
                VoterRecord {
                    vote: 1,
                    ..VoterRecord::delegating("B", "A")
                },
            ],
            vec![],
        );

        let broken: Vec<_> = outcome
            .voters
            .iter()
            .filter(|voter| voter.delegation.is_empty())
            .collect();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].vote, ABSTAIN);
        assert_eq!(outcome.tally.counts.iter().sum::<u64>(), 2);
        // "B" still counts as a root for its own vote.
        assert_eq!(resolved(&outcome, "B").delegation, "A");
        assert_eq!(outcome.tally.counts, vec![1, 1]);
        assert!(!outcome.report.has_integrity_failure());
    }

    #[test]
    fn cycle_members_are_each_counted_once() {
        let voter = |id, to, vote| VoterRecord {
            vote,
            ..VoterRecord::delegating(id, to)
        };
        let outcome = run(
            options(&["abstain", "yes", "no"]),
            vec![
                voter("a", "b", 1),
                voter("b", "c", 1),
                voter("c", "d", 2),
                voter("d", "a", 1),
                VoterRecord::direct("e", 2),
            ],
            vec![],
        );

        let abstainers = outcome
            .voters
            .iter()
            .filter(|voter| voter.delegation.is_empty() && voter.vote == ABSTAIN)
            .count();
        assert_eq!(abstainers, 1);
        for id in ["a", "b", "c", "d"] {
            let voter = resolved(&outcome, id);
            assert_eq!(voter.weight, 1, "weight of {id}");
            assert!(voter.delegated_by.is_empty());
        }
        assert_eq!(resolved(&outcome, "a").vote, ABSTAIN);
        assert_eq!(outcome.tally.counts, vec![1, 2, 2]);
        assert_eq!(outcome.tally.total_weight, 5);
    }

    #[test]
    fn three_cycle_is_not_amplified() {
        let outcome = run(
            options(&["abstain", "yes", "no"]),
            vec![
                VoterRecord {
                    vote: 1,
                    ..VoterRecord::delegating("a", "b")
                },
                VoterRecord {
                    vote: 1,
                    ..VoterRecord::delegating("b", "c")
                },
                VoterRecord {
                    vote: 2,
                    ..VoterRecord::delegating("c", "a")
                },
            ],
            vec![],
        );

        for voter in &outcome.voters {
            assert_eq!(voter.weight, 1, "weight of {}", voter.id);
        }
        assert_eq!(outcome.tally.counts, vec![1, 1, 1]);
    }

    #[test]
    fn delegators_into_a_cycle_follow_their_delegate() {
        // "x" sits outside the cycle and delegates to "b".
        let outcome = run(
            options(&["abstain", "yes"]),
            vec![
                VoterRecord {
                    vote: 1,
                    ..VoterRecord::delegating("a", "b")
                },
                VoterRecord {
                    vote: 1,
                    ..VoterRecord::delegating("b", "a")
                },
                VoterRecord::delegating("x", "b"),
            ],
            vec![],
        );

        assert_eq!(resolved(&outcome, "a").weight, 1);
        assert_eq!(resolved(&outcome, "b").weight, 2);
        assert_eq!(outcome.tally.counts, vec![1, 2]);
        assert!(!outcome.report.has_integrity_failure());
    }

    #[test]
    fn decrypted_ballot_joins_resolution() {
        let ballot = VoterRecord {
            id: "x".to_string(),
            vote: 2,
            delegation: String::new(),
            weight: 1,
            time: 1_690_000_000_000,
            origin: None,
        };
        let outcome = run(
            options(&["abstain", "yes", "no"]),
            vec![
                VoterRecord::direct("p", 1),
                VoterRecord::delegating("q", "x"),
            ],
            vec![ballot],
        );

        let x = resolved(&outcome, "x");
        assert_eq!(x.origin, Origin::Ledger);
        assert_eq!(x.weight, 2);
        assert_eq!(outcome.tally.counts, vec![0, 1, 2]);
        assert_eq!(outcome.tally.percentages, vec![0.0, 33.3, 66.7]);
    }

    #[test]
    fn empty_electorate() {
        let outcome = run(options(&["abstain", "yes", "no"]), vec![], vec![]);

        assert_eq!(outcome.tally.counts, vec![0, 0, 0]);
        assert_eq!(outcome.tally.percentages, vec![0.0, 0.0, 0.0]);
        assert_eq!(outcome.report.issues(), &[TallyIssue::EmptyElectorate]);
    }

    #[test]
    fn out_of_range_vote_is_reported_not_counted() {
        let outcome = run(
            options(&["abstain", "yes"]),
            vec![
                VoterRecord::direct("a", 1),
                VoterRecord::direct("b", 7),
                VoterRecord::delegating("c", "b"),
            ],
            vec![],
        );

        assert_eq!(outcome.tally.counts, vec![0, 1]);
        assert_eq!(outcome.tally.percentages, vec![0.0, 100.0]);
        assert_eq!(
            outcome.report.issues(),
            &[
                TallyIssue::VoteOutOfRange {
                    voter_id: "b".to_string(),
                    vote: 7,
                },
                TallyIssue::WeightConsistencyMismatch {
                    total_weight: 1,
                    voter_count: 3,
                },
            ]
        );
        assert!(outcome.report.has_integrity_failure());
    }

    #[test]
    fn input_weight_is_ignored() {
        let outcome = run(
            options(&["abstain", "yes"]),
            vec![VoterRecord {
                weight: 40,
                ..VoterRecord::direct("a", 1)
            }],
            vec![],
        );
        assert_eq!(outcome.tally.counts, vec![0, 1]);
    }

    #[test]
    fn tally_is_idempotent() {
        let voters = vec![
            VoterRecord::delegating("a", "b"),
            VoterRecord::delegating("b", "a"),
            VoterRecord::delegating("c", "d"),
            VoterRecord::direct("d", 1),
            VoterRecord::direct("e", 2),
        ];
        let first = run(3, voters.clone(), vec![]);
        let second = run(3, voters, vec![]);
        assert_eq!(first, second);
    }

    /// Build records from a list of (vote, delegate index) pairs, where a
    /// delegate index of `None` means a direct vote.
    fn records(shape: &[(OptionIndex, Option<usize>)]) -> Vec<VoterRecord> {
        shape.iter()
            .enumerate()
            .map(|(index, (vote, delegate))| VoterRecord {
                vote: *vote,
                delegation: delegate
                    .map(|target| format!("v{target:03}"))
                    .unwrap_or_default(),
                ..VoterRecord::direct(&format!("v{index:03}"), 0)
            })
            .collect()
    }

    /// Arbitrary delegation forests: each voter may only delegate to a voter
    /// with a smaller index, so there are no cycles.
    fn forest() -> impl Strategy<Value = Vec<(OptionIndex, Option<usize>)>> {
        prop::collection::vec((0..3u32, any::<Option<prop::sample::Index>>()), 0..40).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(index, (vote, target))| {
                        let delegate = match target {
                            Some(target) if index > 0 => Some(target.index(index)),
                            _ => None,
                        };
                        (vote, delegate)
                    })
                    .collect()
            },
        )
    }

    /// Arbitrary delegation graphs, cycles included.
    fn graph() -> impl Strategy<Value = Vec<(OptionIndex, Option<usize>)>> {
        prop::collection::vec((0..3u32, any::<Option<prop::sample::Index>>()), 1..40).prop_map(
            |raw| {
                let len = raw.len();
                raw.into_iter()
                    .map(|(vote, target)| (vote, target.map(|target| target.index(len))))
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn forest_weight_is_conserved(shape in forest()) {
            let outcome = run(3, records(&shape), vec![]);
            let terminal_weight: u64 = outcome
                .voters
                .iter()
                .filter(|voter| voter.delegation.is_empty())
                .map(|voter| voter.weight)
                .sum();
            prop_assert_eq!(outcome.tally.counts.iter().sum::<u64>(), shape.len() as u64);
            prop_assert_eq!(terminal_weight, shape.len() as u64);
            prop_assert!(!outcome.report.has_integrity_failure());
        }

        #[test]
        fn any_graph_conserves_weight(shape in graph()) {
            let outcome = run(3, records(&shape), vec![]);
            prop_assert_eq!(outcome.tally.total_weight, shape.len() as u64);
            for voter in &outcome.voters {
                prop_assert_eq!(voter.weight, 1 + voter.delegated_by.len() as u64);
            }

            let sum: f64 = outcome.tally.percentages.iter().sum();
            prop_assert!((sum - 100.0).abs() <= 0.1 * 3.0);
        }

        #[test]
        fn tally_runs_are_identical(shape in graph()) {
            let first = run(3, records(&shape), vec![]);
            let second = run(3, records(&shape), vec![]);
            prop_assert_eq!(first, second);
        }
    }
}
