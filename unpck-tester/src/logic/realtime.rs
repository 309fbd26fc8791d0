use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use unpck_game::constants::{COUNTDOWN_POLL_INTERVAL, ROUND_PACE};
use unpck_game::{
    Clock, Decision, DecisionInput, RoundEngine, TimerPoll, TokioClock, Trip, TripItem,
    drive_round,
};

use super::policy::PlayerStrategy;
use super::simulation::{ClockMode, RoundTrace, TraceMeta, trace_from_engine};

/// When to send each input, measured from round start on the tokio timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledInput {
    at: Duration,
    input: DecisionInput,
}

/// Plan inputs for the items of a round.
///
/// Items the policy answers too late are left to the countdown; their
/// window is assumed to run out in full before the next item appears.
fn schedule_inputs(
    strategy: PlayerStrategy,
    seed: u64,
    items: &[TripItem],
    window: Duration,
) -> Vec<ScheduledInput> {
    let mut policy = strategy.create_policy(seed);
    let mut shown_at = Duration::ZERO;
    let mut schedule = Vec::new();
    for item in items {
        match policy.react(item, window) {
            Some(mv) if mv.delay < window => {
                shown_at += mv.delay;
                schedule.push(ScheduledInput {
                    at: shown_at,
                    input: DecisionInput {
                        decision: mv.decision,
                        source: mv.source,
                    },
                });
            }
            _ => shown_at += window,
        }
    }
    schedule
}

/// Play one round through the async driver on tokio's timer.
///
/// Inputs are fed from a separate task over a channel, racing the
/// countdown the same way a UI event loop does. The round takes as long as
/// the player would.
///
/// # Errors
///
/// Returns an error if the trip cannot start a round or the driver ends
/// without results.
pub async fn run_realtime_round(
    trip: &Trip,
    strategy: PlayerStrategy,
    seed: u64,
) -> Result<RoundTrace> {
    let clock = TokioClock::new();
    let mut engine = RoundEngine::with_clock(seed, clock);
    let start = engine
        .choose_trip(trip)
        .with_context(|| format!("starting trip '{}'", trip.id))?;
    let window = trip.difficulty_defaults.duration_for(ROUND_PACE);
    let schedule = schedule_inputs(strategy, seed, engine.state().items(), window);
    log::debug!(
        "realtime round {}@{} seed {seed}: {} scheduled inputs",
        strategy.key(),
        trip.id,
        schedule.len()
    );

    let (tx, mut rx) = mpsc::channel(schedule.len().max(1));
    let round_start = tokio::time::Instant::now();
    let feeder = tokio::spawn(async move {
        for entry in schedule {
            tokio::time::sleep_until(round_start + entry.at).await;
            if tx.send(entry.input).await.is_err() {
                break;
            }
        }
    });

    let Some(summary) = drive_round(&mut engine, &mut rx, COUNTDOWN_POLL_INTERVAL).await else {
        bail!("driver found no round in progress");
    };
    feeder.abort();
    let elapsed = engine.clock().now();
    log::debug!(
        "realtime round finished: score {}/{} in {elapsed:?}",
        summary.score,
        summary.total
    );

    let stale_polls = usize::from(engine.poll_timer(start.timer) == TimerPoll::Stale);
    let ignored_inputs = usize::from(
        engine
            .submit(DecisionInput::manual(Decision::Pack))
            .is_ignored(),
    );

    trace_from_engine(
        &engine,
        TraceMeta {
            strategy,
            seed,
            clock_mode: ClockMode::Realtime,
            window,
            elapsed,
            stale_polls,
            ignored_inputs,
        },
    )
}
