use serde::{Deserialize, Serialize};

use crate::tally::{
    aggregator::Weights,
    report::{TallyIssue, TallyReport},
    voter_set::VoterSet,
};

/// The numeric result of a tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    /// Weighted vote count per option.
    pub counts: Vec<u64>,
    /// Share of `total_weight` per option, rounded to one decimal place.
    pub percentages: Vec<f64>,
    /// Sum of all counts.
    pub total_weight: u64,
}

/// Sum the weight of every terminal voter into their chosen option.
///
/// Terminal voters choosing an option outside the list are skipped, which
/// then shows up as a weight-consistency mismatch.
pub fn count_votes(
    option_count: usize,
    voters: &VoterSet,
    weights: &Weights,
    report: &mut TallyReport,
) -> Tally {
    let mut counts = vec![0; option_count];
    let mut total_weight = 0;

    for (index, voter) in voters.iter().enumerate() {
        if !voter.is_terminal() {
            continue;
        }
        match counts.get_mut(voter.vote as usize) {
            Some(count) => {
                let weight = weights.weight(index);
                *count += weight;
                total_weight += weight;
            }
            None => report.push(TallyIssue::VoteOutOfRange {
                voter_id: voter.id.clone(),
                vote: voter.vote,
            }),
        }
    }

    let voter_count = voters.len() as u64;
    if total_weight != voter_count {
        report.push(TallyIssue::WeightConsistencyMismatch {
            total_weight,
            voter_count,
        });
    }
    if total_weight == 0 {
        report.push(TallyIssue::EmptyElectorate);
    }

    Tally {
        percentages: percentages(&counts, total_weight),
        counts,
        total_weight,
    }
}

/// Convert counts to percentages of `total_weight`, rounded to one decimal place.
/// A zero total gives all-zero percentages.
pub fn percentages(counts: &[u64], total_weight: u64) -> Vec<f64> {
    if total_weight == 0 {
        return vec![0.0; counts.len()];
    }
    counts
        .iter()
        .map(|&count| {
            let percentage = count as f64 / total_weight as f64 * 100.0;
            (percentage * 10.0).round() / 10.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_round_to_one_decimal() {
        assert_eq!(percentages(&[1, 2, 0], 3), vec![33.3, 66.7, 0.0]);
        assert_eq!(percentages(&[1, 1, 1, 3], 6), vec![16.7, 16.7, 16.7, 50.0]);
        assert_eq!(percentages(&[7], 7), vec![100.0]);
    }

    #[test]
    fn zero_total_gives_zero_percentages() {
        assert_eq!(percentages(&[0, 0, 0], 0), vec![0.0, 0.0, 0.0]);
        assert_eq!(percentages(&[], 0), Vec::<f64>::new());
    }
}
