use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use unpck_game::constants::{COUNTDOWN_POLL_INTERVAL, ROUND_PACE};
use unpck_game::{
    Clock, Decision, DecisionOutcome, DecisionRecord, DecisionSource, ManualClock, Phase,
    RoundEngine, RoundSummary, TimerPoll, TimerToken, Trip,
};

use super::duration_serde;
use super::policy::{PlayerStrategy, PolicyMove};

/// Which timeline a traced round ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// Stepped [`ManualClock`]; finishes instantly.
    Simulated,
    /// Tokio timer driving the async round driver.
    Realtime,
}

/// Everything observed while playing one round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundTrace {
    pub strategy: PlayerStrategy,
    pub trip_id: String,
    pub seed: u64,
    pub clock_mode: ClockMode,
    #[serde(with = "duration_serde")]
    pub window: Duration,
    pub round_len: usize,
    pub decisions: Vec<DecisionRecord>,
    pub summary: RoundSummary,
    pub share_text: String,
    /// Game time from the first item appearing to the results screen.
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// Polls of superseded countdowns that correctly reported stale.
    pub stale_polls: usize,
    /// Inputs delivered after the round ended that were dropped.
    pub ignored_inputs: usize,
}

/// Plays rounds on a [`ManualClock`], stepping time in poll-sized increments
/// the way a UI poll loop would.
#[derive(Debug, Clone)]
pub struct RoundSimulator {
    step: Duration,
    verbose: bool,
}

impl Default for RoundSimulator {
    fn default() -> Self {
        Self::new(false)
    }
}

impl RoundSimulator {
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self {
            step: COUNTDOWN_POLL_INTERVAL,
            verbose,
        }
    }

    /// Play one full round of `trip` under `strategy`.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip cannot start a round or the engine stops
    /// making progress.
    pub fn run(&self, trip: &Trip, strategy: PlayerStrategy, seed: u64) -> Result<RoundTrace> {
        let clock = ManualClock::new();
        let mut engine = RoundEngine::with_clock(seed, clock.clone());
        engine.open_selection()?;
        let start = engine
            .choose_trip(trip)
            .with_context(|| format!("starting trip '{}'", trip.id))?;

        let window = trip.difficulty_defaults.duration_for(ROUND_PACE);
        let mut policy = strategy.create_policy(seed);
        log::debug!(
            "{} player starting {} ({} items, seed {seed})",
            policy.name(),
            trip.id,
            start.total
        );
        let mut superseded: Vec<TimerToken> = Vec::new();
        let mut active = start.timer;
        let mut late_taps: Vec<PolicyMove> = Vec::new();
        let step_budget = self.step_budget(window, start.total);
        let mut steps = 0_usize;

        while engine.phase() == Phase::Playing {
            let Some(item) = engine.current_item().cloned() else {
                bail!("playing phase without a current item");
            };
            let shown_at = clock.now();
            let planned = policy.react(&item, engine.time_remaining());

            let next = loop {
                steps += 1;
                if steps > step_budget {
                    bail!("round stalled after {steps} clock steps");
                }
                clock.advance(self.step);
                let waited = clock.now().saturating_sub(shown_at);

                if let Some(mv) = planned
                    && waited >= mv.delay
                    && waited < window
                {
                    break engine.submit_decision(mv.decision, mv.source);
                }
                match engine.tick() {
                    TimerPoll::Running { .. } => {}
                    TimerPoll::Fired(outcome) => {
                        if let Some(mv) = planned {
                            late_taps.push(mv);
                        }
                        break outcome;
                    }
                    TimerPoll::Stale => bail!("active countdown polled stale"),
                }
            };

            if self.verbose
                && let Some(record) = next.record()
            {
                println!(
                    "     {} -> {} via {:?} ({})",
                    record.item.name,
                    record.decision,
                    record.source,
                    if record.correct { "ok" } else { "miss" }
                );
            }

            match next {
                DecisionOutcome::Advanced { timer, .. } => {
                    superseded.push(active);
                    active = timer;
                }
                DecisionOutcome::Completed { .. } => superseded.push(active),
                DecisionOutcome::Ignored(reason) => {
                    bail!("decision for '{}' was ignored: {reason:?}", item.name);
                }
            }
        }

        let stale_polls = superseded
            .iter()
            .filter(|token| engine.poll_timer(**token) == TimerPoll::Stale)
            .count();
        // Late taps land after the round is over, followed by one stray tap
        // on the results screen.
        let stray = PolicyMove::new(Decision::Pack, DecisionSource::Manual, Duration::ZERO);
        let ignored_inputs = late_taps
            .iter()
            .chain(std::iter::once(&stray))
            .filter(|mv| engine.submit_decision(mv.decision, mv.source).is_ignored())
            .count();

        trace_from_engine(
            &engine,
            TraceMeta {
                strategy,
                seed,
                clock_mode: ClockMode::Simulated,
                window,
                elapsed: clock.now(),
                stale_polls,
                ignored_inputs,
            },
        )
    }

    fn step_budget(&self, window: Duration, items: usize) -> usize {
        let per_item = window.as_millis() / self.step.as_millis().max(1) + 2;
        usize::try_from(per_item)
            .unwrap_or(usize::MAX)
            .saturating_mul(items.max(1))
    }
}

/// Round facts gathered outside the engine.
pub(crate) struct TraceMeta {
    pub strategy: PlayerStrategy,
    pub seed: u64,
    pub clock_mode: ClockMode,
    pub window: Duration,
    pub elapsed: Duration,
    pub stale_polls: usize,
    pub ignored_inputs: usize,
}

pub(crate) fn trace_from_engine<C: Clock>(
    engine: &RoundEngine<C>,
    meta: TraceMeta,
) -> Result<RoundTrace> {
    let Some(results) = engine.results() else {
        bail!("round ended outside the results phase ({})", engine.phase());
    };
    Ok(RoundTrace {
        strategy: meta.strategy,
        trip_id: results.trip.id.clone(),
        seed: meta.seed,
        clock_mode: meta.clock_mode,
        window: meta.window,
        round_len: results.trip.round_len(),
        decisions: results.decisions.to_vec(),
        summary: results.summary,
        share_text: results.share_text(),
        elapsed: meta.elapsed,
        stale_polls: meta.stale_polls,
        ignored_inputs: meta.ignored_inputs,
    })
}
