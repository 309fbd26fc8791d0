//! Player decisions and the correctness rule.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::TripItem;

/// The two classifications a player can give an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Pack,
    Reject,
}

impl Decision {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pack => "pack",
            Self::Reject => "reject",
        }
    }

    /// The decision that would be correct for `item`.
    #[must_use]
    pub const fn expected_for(item: &TripItem) -> Self {
        if item.should_pack() {
            Self::Pack
        } else {
            Self::Reject
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Pack => Self::Reject,
            Self::Reject => Self::Pack,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a decision reached the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    /// Button tap or key press.
    Manual,
    /// Swipe past the presentation layer's distance threshold.
    Gesture,
    /// The per-item countdown ran out.
    Timeout,
}

/// Abstract input event delivered by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub decision: Decision,
    pub source: DecisionSource,
}

impl DecisionInput {
    #[must_use]
    pub const fn manual(decision: Decision) -> Self {
        Self {
            decision,
            source: DecisionSource::Manual,
        }
    }

    #[must_use]
    pub const fn gesture(decision: Decision) -> Self {
        Self {
            decision,
            source: DecisionSource::Gesture,
        }
    }

    #[must_use]
    pub const fn timeout() -> Self {
        Self {
            decision: Decision::Reject,
            source: DecisionSource::Timeout,
        }
    }
}

/// One resolved round item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub item: TripItem,
    pub decision: Decision,
    pub correct: bool,
    pub source: DecisionSource,
}

impl DecisionRecord {
    /// Evaluate `decision` against `item` and capture the result.
    #[must_use]
    pub fn evaluate(item: TripItem, input: DecisionInput) -> Self {
        let correct = is_correct(&item, input.decision);
        Self {
            item,
            decision: input.decision,
            correct,
            source: input.source,
        }
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.source == DecisionSource::Timeout
    }
}

/// Pack what should be packed, reject everything else.
#[must_use]
pub const fn is_correct(item: &TripItem, decision: Decision) -> bool {
    let should_pack = item.should_pack();
    (should_pack && matches!(decision, Decision::Pack))
        || (!should_pack && matches!(decision, Decision::Reject))
}
