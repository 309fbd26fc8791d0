//! Per-item countdown, clocks, and the cooperative timer handle.
//!
//! A countdown is armed each time a new item becomes current and is tagged
//! with a [`TimerToken`]. Polls carrying a token other than the active one are
//! stale and must not touch the round; this keeps a late poll from resolving
//! an item that has already advanced.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::numbers::remaining_fraction;

/// Monotonic time source, measured from an arbitrary fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for tests and simulated play. Clones share one timeline.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    elapsed: Rc<Cell<Duration>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get().saturating_add(by));
    }

    pub fn set(&self, at: Duration) {
        self.elapsed.set(at);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.elapsed.get()
    }
}

/// Clock that follows tokio's (pausable) timer.
#[cfg(feature = "async")]
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

#[cfg(feature = "async")]
impl TokioClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

#[cfg(feature = "async")]
impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "async")]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Generation handle identifying one armed countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken(u64);

impl TimerToken {
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

/// Hands out strictly increasing tokens.
#[derive(Debug, Clone, Default)]
pub(crate) struct TokenSource {
    next: u64,
}

impl TokenSource {
    pub(crate) const fn issue(&mut self) -> TimerToken {
        let token = TimerToken(self.next);
        self.next = self.next.wrapping_add(1);
        token
    }
}

/// Countdown for the item currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    token: TimerToken,
    started_at: Duration,
    duration: Duration,
    resolved: bool,
}

impl Countdown {
    #[must_use]
    pub const fn arm(token: TimerToken, started_at: Duration, duration: Duration) -> Self {
        Self {
            token,
            started_at,
            duration,
            resolved: false,
        }
    }

    #[must_use]
    pub const fn token(&self) -> TimerToken {
        self.token
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Mark the item as decided. Returns `false` if it already was.
    pub const fn resolve(&mut self) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        true
    }

    #[must_use]
    pub fn remaining(&self, now: Duration) -> Duration {
        let elapsed = now.saturating_sub(self.started_at);
        self.duration.saturating_sub(elapsed)
    }

    /// Remaining time as a `0.0..=1.0` fraction, for progress bars.
    #[must_use]
    pub fn fraction(&self, now: Duration) -> f32 {
        remaining_fraction(self.remaining(now), self.duration)
    }

    #[must_use]
    pub fn is_expired(&self, now: Duration) -> bool {
        self.remaining(now).is_zero()
    }
}

/// Result of polling a countdown.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerPoll {
    /// The token no longer matches an unresolved item; nothing happened.
    Stale,
    /// Still counting down.
    Running { remaining: Duration },
    /// Time ran out and the item was auto-rejected.
    Fired(crate::round::DecisionOutcome),
}

#[cfg(feature = "async")]
pub use driver::drive_round;

#[cfg(feature = "async")]
mod driver {
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::MissedTickBehavior;

    use super::Clock;
    use crate::decision::DecisionInput;
    use crate::round::{Phase, RoundEngine};
    use crate::summary::RoundSummary;

    /// Run the active round to completion on the current task.
    ///
    /// Decision inputs and countdown polls are serialized through a single
    /// `select!`, so the engine only ever has one owner. If `inputs` closes
    /// the remaining items resolve by timeout. Returns `None` when the engine
    /// was not playing.
    pub async fn drive_round<C: Clock>(
        engine: &mut RoundEngine<C>,
        inputs: &mut mpsc::Receiver<DecisionInput>,
        poll_every: Duration,
    ) -> Option<RoundSummary> {
        if engine.phase() != Phase::Playing {
            return None;
        }
        let mut ticker = tokio::time::interval(poll_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut inputs_open = true;

        while engine.phase() == Phase::Playing {
            tokio::select! {
                biased;
                input = inputs.recv(), if inputs_open => match input {
                    Some(input) => {
                        let _ = engine.submit(input);
                    }
                    None => {
                        log::debug!("decision channel closed; remaining items will time out");
                        inputs_open = false;
                    }
                },
                _ = ticker.tick() => {
                    let _ = engine.tick();
                }
            }
        }

        Some(engine.summary())
    }
}
