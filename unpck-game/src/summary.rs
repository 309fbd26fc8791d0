//! Round scoring derived from the decision log.
use serde::{Deserialize, Serialize};

use crate::decision::DecisionRecord;
use crate::numbers::rounded_percent;

/// Score and accuracy for a (possibly partial) decision log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Number of correct decisions.
    pub score: usize,
    /// Integer percentage of correct decisions, rounded half-up.
    pub accuracy: u32,
    /// Number of decisions considered.
    pub total: usize,
    /// How many of those decisions were forced by the countdown.
    pub timeouts: usize,
}

impl RoundSummary {
    #[must_use]
    pub const fn is_perfect(&self) -> bool {
        self.total > 0 && self.score == self.total
    }
}

/// Derive the summary for `log`. Recomputed on demand, never cached.
#[must_use]
pub fn summarize(log: &[DecisionRecord]) -> RoundSummary {
    let score = log.iter().filter(|record| record.correct).count();
    let timeouts = log.iter().filter(|record| record.timed_out()).count();
    RoundSummary {
        score,
        accuracy: rounded_percent(score, log.len()),
        total: log.len(),
        timeouts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ItemTag, TripItem};
    use crate::decision::{Decision, DecisionInput};

    fn record(tag: ItemTag, input: DecisionInput) -> DecisionRecord {
        DecisionRecord::evaluate(TripItem::new("probe", tag), input)
    }

    #[test]
    fn empty_log_scores_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary, RoundSummary::default());
        assert!(!summary.is_perfect());
    }

    #[test]
    fn three_of_four_is_seventy_five() {
        let log = [
            record(ItemTag::Essential, DecisionInput::manual(Decision::Pack)),
            record(ItemTag::Trap, DecisionInput::gesture(Decision::Reject)),
            record(ItemTag::Useful, DecisionInput::manual(Decision::Reject)),
            record(ItemTag::NotRequired, DecisionInput::timeout()),
        ];
        let correctness: Vec<bool> = log.iter().map(|r| r.correct).collect();
        assert_eq!(correctness, vec![true, true, false, true]);

        let summary = summarize(&log);
        assert_eq!(summary.score, 3);
        assert_eq!(summary.accuracy, 75);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.timeouts, 1);
    }

    #[test]
    fn accuracy_rounds_to_nearest() {
        let log = [
            record(ItemTag::Essential, DecisionInput::manual(Decision::Pack)),
            record(ItemTag::Essential, DecisionInput::manual(Decision::Pack)),
            record(ItemTag::Essential, DecisionInput::manual(Decision::Reject)),
        ];
        assert_eq!(summarize(&log).accuracy, 67);
        assert!(summarize(&log[..2]).is_perfect());
    }
}
