use std::collections::HashSet;

use crate::model::common::election::ABSTAIN;
use crate::tally::{
    report::{TallyIssue, TallyReport},
    voter_set::VoterSet,
};

/// Resolve every delegation in the set so that each chain ends at a terminal voter.
///
/// Delegations to unknown voters are dropped first, leaving the voter to cast
/// their own vote. Then a walk is started from every voter in ID order; a walk
/// that revisits a voter has found a cycle. The voter at which *this* walk
/// re-entered the cycle, which need not be the voter the walk started from, is
/// forced to abstain and its delegation is cleared. Every other member of the
/// cycle keeps its delegation as recorded but stops handing on weight, so each
/// member is counted as a root of its own.
pub fn resolve_delegations(voters: &mut VoterSet, report: &mut TallyReport) {
    link(voters, report);

    for start in 0..voters.len() {
        let mut visited = HashSet::new();
        let mut current = start;
        while let Some(next) = voters.get(current).delegate {
            if !visited.insert(current) {
                break_cycle(voters, start, current, report);
                break;
            }
            current = next;
        }
    }
}

/// Turn every member of the cycle through `entry` into a root.
fn break_cycle(voters: &mut VoterSet, start: usize, entry: usize, report: &mut TallyReport) {
    let mut members = vec![entry];
    let mut current = entry;
    while let Some(next) = voters.get(current).delegate {
        if next == entry {
            break;
        }
        members.push(next);
        current = next;
    }
    for &member in &members {
        voters.get_mut(member).delegate = None;
    }

    let walk_start = voters.get(start).id.clone();
    let voter = voters.get_mut(entry);
    voter.delegation.clear();
    voter.vote = ABSTAIN;
    report.push(TallyIssue::CycleBroken {
        voter_id: voter.id.clone(),
        walk_start,
    });
}

/// Point every delegation at its target's arena index.
fn link(voters: &mut VoterSet, report: &mut TallyReport) {
    for index in 0..voters.len() {
        let voter = voters.get(index);
        if voter.delegation.is_empty() {
            continue;
        }
        match voters.position(&voter.delegation) {
            Some(target) => voters.get_mut(index).delegate = Some(target),
            None => {
                let voter = voters.get_mut(index);
                let target = std::mem::take(&mut voter.delegation);
                voter.delegate = None;
                report.push(TallyIssue::MissingDelegateTarget {
                    voter_id: voter.id.clone(),
                    target,
                });
            }
        }
    }
}

/// Follow a resolved delegation chain from `index` to its terminal voter.
///
/// Returns `None` only if the chain is still cyclic, which cannot happen after
/// [`resolve_delegations`].
pub fn terminal_of(voters: &VoterSet, index: usize) -> Option<usize> {
    let mut current = index;
    for _ in 0..=voters.len() {
        match voters.get(current).delegate {
            Some(next) => current = next,
            None => return Some(current),
        }
    }
    None
}
