//! Round state machine.
//!
//! A single [`RoundState`] is owned by the [`RoundEngine`] and threaded through
//! every transition. The engine moves through
//! `welcome -> selecting -> playing -> results`, presenting one item at a time
//! under a countdown and logging exactly one [`DecisionRecord`] per item.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::{Trip, TripItem};
use crate::constants::{LOG_TARGET_ROUND, ROUND_PACE};
use crate::countdown::{Clock, Countdown, MonotonicClock, TimerPoll, TimerToken, TokenSource};
use crate::decision::{Decision, DecisionInput, DecisionRecord, DecisionSource};
use crate::selector::select_round_items;
use crate::share::share_text;
use crate::summary::{RoundSummary, summarize};

/// Screen-level phase of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Welcome,
    Selecting,
    Playing,
    Results,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Selecting => "selecting",
            Self::Playing => "playing",
            Self::Results => "results",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator for the most recent decision, shown on the item card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    #[default]
    Idle,
    Good,
    Bad,
    Timeout,
}

impl Feedback {
    #[must_use]
    pub const fn for_record(record: &DecisionRecord) -> Self {
        match (record.source, record.correct) {
            (DecisionSource::Timeout, _) => Self::Timeout,
            (_, true) => Self::Good,
            (_, false) => Self::Bad,
        }
    }
}

/// Errors surfaced by phase-level transitions. None of them are fatal; the
/// engine state is left untouched whenever one is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoundError {
    #[error("trip '{trip_id}' has no items to play")]
    EmptyTrip { trip_id: String },
    #[error("trip '{trip_id}' round length is zero")]
    EmptyRound { trip_id: String },
    #[error("cannot {action} during the {from} phase")]
    InvalidTransition { from: Phase, action: &'static str },
}

/// Why a decision was dropped without touching the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    NotPlaying,
    NoCurrentItem,
    AlreadyResolved,
}

/// What a decision submission did.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    Ignored(IgnoreReason),
    /// Recorded; the next item is now current under a fresh countdown.
    Advanced {
        record: DecisionRecord,
        cursor: usize,
        timer: TimerToken,
    },
    /// Recorded the final item; the engine is now in `results`.
    Completed {
        record: DecisionRecord,
        summary: RoundSummary,
    },
}

impl DecisionOutcome {
    #[must_use]
    pub const fn record(&self) -> Option<&DecisionRecord> {
        match self {
            Self::Ignored(_) => None,
            Self::Advanced { record, .. } | Self::Completed { record, .. } => Some(record),
        }
    }

    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }
}

/// Returned when a round starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundStart {
    pub trip_id: String,
    pub total: usize,
    pub timer: TimerToken,
}

/// Everything the engine knows about the round in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundState {
    phase: Phase,
    trip: Option<Trip>,
    items: Vec<TripItem>,
    cursor: usize,
    decisions: Vec<DecisionRecord>,
    countdown: Option<Countdown>,
    feedback: Feedback,
}

impl RoundState {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn trip(&self) -> Option<&Trip> {
        self.trip.as_ref()
    }

    /// Items selected for this round, in presentation order.
    #[must_use]
    pub fn items(&self) -> &[TripItem] {
        &self.items
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn decisions(&self) -> &[DecisionRecord] {
        &self.decisions
    }

    #[must_use]
    pub const fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    #[must_use]
    pub const fn feedback(&self) -> Feedback {
        self.feedback
    }

    /// The item awaiting a decision, if any.
    #[must_use]
    pub fn current_item(&self) -> Option<&TripItem> {
        if self.phase != Phase::Playing {
            return None;
        }
        self.items.get(self.cursor)
    }

    fn clear_round(&mut self) {
        self.trip = None;
        self.items.clear();
        self.cursor = 0;
        self.decisions.clear();
        self.countdown = None;
        self.feedback = Feedback::Idle;
    }
}

/// Snapshot for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundView {
    pub phase: Phase,
    pub trip_name: Option<String>,
    pub current_item: Option<TripItem>,
    pub cursor: usize,
    pub total: usize,
    pub score: usize,
    pub time_remaining: Duration,
    /// Remaining countdown as `0.0..=1.0`.
    pub countdown_fraction: f32,
    pub feedback: Feedback,
}

/// Read-only results of a finished round.
#[derive(Debug, Clone, Copy)]
pub struct RoundResults<'a> {
    pub trip: &'a Trip,
    pub decisions: &'a [DecisionRecord],
    pub summary: RoundSummary,
}

impl RoundResults<'_> {
    /// Plain-text line handed to share collaborators.
    #[must_use]
    pub fn share_text(&self) -> String {
        share_text(&self.trip.name, &self.summary)
    }

    #[must_use]
    pub fn recommended_loadout(&self) -> &[String] {
        &self.trip.recommended_loadout
    }
}

/// Drives rounds for one player session.
#[derive(Debug, Clone)]
pub struct RoundEngine<C = MonotonicClock> {
    state: RoundState,
    rng: ChaCha20Rng,
    clock: C,
    tokens: TokenSource,
}

impl RoundEngine<MonotonicClock> {
    /// Engine on the wall clock.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_clock(seed, MonotonicClock::new())
    }
}

impl<C: Clock> RoundEngine<C> {
    #[must_use]
    pub fn with_clock(seed: u64, clock: C) -> Self {
        Self {
            state: RoundState::default(),
            rng: ChaCha20Rng::seed_from_u64(seed),
            clock,
            tokens: TokenSource::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &RoundState {
        &self.state
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&TripItem> {
        self.state.current_item()
    }

    #[must_use]
    pub fn decisions(&self) -> &[DecisionRecord] {
        &self.state.decisions
    }

    /// Live score and accuracy over the decisions made so far.
    #[must_use]
    pub fn summary(&self) -> RoundSummary {
        summarize(&self.state.decisions)
    }

    /// Token of the countdown guarding the current item.
    #[must_use]
    pub fn active_timer(&self) -> Option<TimerToken> {
        self.state
            .countdown
            .as_ref()
            .filter(|countdown| !countdown.is_resolved())
            .map(Countdown::token)
    }

    #[must_use]
    pub fn time_remaining(&self) -> Duration {
        self.state
            .countdown
            .as_ref()
            .map_or(Duration::ZERO, |countdown| countdown.remaining(self.clock.now()))
    }

    #[must_use]
    pub fn countdown_fraction(&self) -> f32 {
        self.state
            .countdown
            .as_ref()
            .map_or(0.0, |countdown| countdown.fraction(self.clock.now()))
    }

    #[must_use]
    pub fn view(&self) -> RoundView {
        RoundView {
            phase: self.state.phase,
            trip_name: self.state.trip.as_ref().map(|trip| trip.name.clone()),
            current_item: self.current_item().cloned(),
            cursor: self.state.cursor,
            total: self.state.items.len(),
            score: self.summary().score,
            time_remaining: self.time_remaining(),
            countdown_fraction: self.countdown_fraction(),
            feedback: self.state.feedback,
        }
    }

    /// Results of the finished round; `None` outside the results phase.
    #[must_use]
    pub fn results(&self) -> Option<RoundResults<'_>> {
        if self.state.phase != Phase::Results {
            return None;
        }
        let trip = self.state.trip.as_ref()?;
        Some(RoundResults {
            trip,
            decisions: &self.state.decisions,
            summary: self.summary(),
        })
    }

    /// Leave the welcome screen for trip selection.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::InvalidTransition`] outside the welcome phase.
    pub fn open_selection(&mut self) -> Result<(), RoundError> {
        self.require(&[Phase::Welcome], "open trip selection")?;
        self.state.phase = Phase::Selecting;
        Ok(())
    }

    /// Start a round of `trip` with a freshly drawn item list.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::EmptyTrip`] when the trip has no items,
    /// [`RoundError::EmptyRound`] when its round bounds allow zero items, or
    /// [`RoundError::InvalidTransition`] while a round is being played. The
    /// engine keeps its current phase in every case.
    pub fn choose_trip(&mut self, trip: &Trip) -> Result<RoundStart, RoundError> {
        self.require(
            &[Phase::Welcome, Phase::Selecting, Phase::Results],
            "choose a trip",
        )?;
        let items = select_round_items(trip, &mut self.rng);
        if items.is_empty() {
            log::warn!(
                target: LOG_TARGET_ROUND,
                "trip '{}' cannot start a round: {} pooled items, round max {}",
                trip.id,
                trip.items.len(),
                trip.round_item_count.max
            );
            let trip_id = trip.id.clone();
            return Err(if trip.items.is_empty() {
                RoundError::EmptyTrip { trip_id }
            } else {
                RoundError::EmptyRound { trip_id }
            });
        }

        self.state.clear_round();
        self.state.trip = Some(trip.clone());
        self.state.items = items;
        self.state.phase = Phase::Playing;
        let timer = self.arm_countdown();
        log::debug!(
            target: LOG_TARGET_ROUND,
            "round started: trip={} items={}",
            trip.id,
            self.state.items.len()
        );
        Ok(RoundStart {
            trip_id: trip.id.clone(),
            total: self.state.items.len(),
            timer,
        })
    }

    /// Record a decision for the current item.
    ///
    /// Decisions outside `playing`, or for an item that is already resolved,
    /// are ignored: a manual tap can legitimately race the timeout.
    pub fn submit_decision(
        &mut self,
        decision: Decision,
        source: DecisionSource,
    ) -> DecisionOutcome {
        self.submit(DecisionInput { decision, source })
    }

    /// [`Self::submit_decision`] taking a bundled input event.
    pub fn submit(&mut self, input: DecisionInput) -> DecisionOutcome {
        if self.state.phase != Phase::Playing {
            return DecisionOutcome::Ignored(IgnoreReason::NotPlaying);
        }
        let Some(item) = self.state.items.get(self.state.cursor).cloned() else {
            return DecisionOutcome::Ignored(IgnoreReason::NoCurrentItem);
        };
        if self.state.decisions.len() > self.state.cursor {
            return DecisionOutcome::Ignored(IgnoreReason::AlreadyResolved);
        }
        let newly_resolved = self
            .state
            .countdown
            .as_mut()
            .is_some_and(Countdown::resolve);
        if !newly_resolved {
            return DecisionOutcome::Ignored(IgnoreReason::AlreadyResolved);
        }

        let record = DecisionRecord::evaluate(item, input);
        log::debug!(
            target: LOG_TARGET_ROUND,
            "item {} '{}' -> {} via {:?} ({})",
            self.state.cursor + 1,
            record.item.name,
            record.decision,
            record.source,
            if record.correct { "correct" } else { "missed" }
        );
        self.state.feedback = Feedback::for_record(&record);
        self.state.decisions.push(record.clone());

        if self.state.cursor + 1 >= self.state.items.len() {
            let summary = self.finish_round();
            return DecisionOutcome::Completed { record, summary };
        }

        self.state.cursor += 1;
        let timer = self.arm_countdown();
        DecisionOutcome::Advanced {
            record,
            cursor: self.state.cursor,
            timer,
        }
    }

    /// Check the countdown identified by `token`, firing a timeout rejection
    /// once it has run out.
    pub fn poll_timer(&mut self, token: TimerToken) -> TimerPoll {
        let now = self.clock.now();
        let remaining = match self.state.countdown.as_ref() {
            Some(countdown) if countdown.token() == token && !countdown.is_resolved() => {
                countdown.remaining(now)
            }
            _ => return TimerPoll::Stale,
        };
        if !remaining.is_zero() {
            return TimerPoll::Running { remaining };
        }
        match self.submit(DecisionInput::timeout()) {
            DecisionOutcome::Ignored(_) => TimerPoll::Stale,
            outcome => TimerPoll::Fired(outcome),
        }
    }

    /// Poll whichever countdown is currently active.
    pub fn tick(&mut self) -> TimerPoll {
        match self.active_timer() {
            Some(token) => self.poll_timer(token),
            None => TimerPoll::Stale,
        }
    }

    /// Drop the finished round and return to trip selection.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::InvalidTransition`] outside the results phase.
    pub fn reset_to_selection(&mut self) -> Result<(), RoundError> {
        self.require(&[Phase::Results], "return to trip selection")?;
        self.state.clear_round();
        self.state.phase = Phase::Selecting;
        Ok(())
    }

    /// Abandon a round in progress, cancelling its countdown.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::InvalidTransition`] outside the playing phase.
    pub fn abandon_round(&mut self) -> Result<(), RoundError> {
        self.require(&[Phase::Playing], "abandon the round")?;
        log::debug!(
            target: LOG_TARGET_ROUND,
            "round abandoned at item {}",
            self.state.cursor + 1
        );
        self.state.clear_round();
        self.state.phase = Phase::Selecting;
        Ok(())
    }

    /// Play the same trip again with a fresh random selection.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::InvalidTransition`] outside the results phase.
    pub fn replay(&mut self) -> Result<RoundStart, RoundError> {
        self.require(&[Phase::Results], "replay the trip")?;
        let Some(trip) = self.state.trip.clone() else {
            return Err(RoundError::InvalidTransition {
                from: self.state.phase,
                action: "replay the trip",
            });
        };
        self.choose_trip(&trip)
    }

    fn require(&self, allowed: &[Phase], action: &'static str) -> Result<(), RoundError> {
        if allowed.contains(&self.state.phase) {
            Ok(())
        } else {
            Err(RoundError::InvalidTransition {
                from: self.state.phase,
                action,
            })
        }
    }

    fn arm_countdown(&mut self) -> TimerToken {
        let duration = self
            .state
            .trip
            .as_ref()
            .map_or(Duration::ZERO, |trip| {
                trip.difficulty_defaults.duration_for(ROUND_PACE)
            });
        let token = self.tokens.issue();
        self.state.countdown = Some(Countdown::arm(token, self.clock.now(), duration));
        self.state.feedback = Feedback::Idle;
        token
    }

    fn finish_round(&mut self) -> RoundSummary {
        self.state.countdown = None;
        self.state.phase = Phase::Results;
        let summary = self.summary();
        let trip_id = self.state.trip.as_ref().map_or("", |trip| trip.id.as_str());
        log::info!(
            target: LOG_TARGET_ROUND,
            "round_complete trip={trip_id} score={} accuracy={}% total_items={} timeouts={}",
            summary.score,
            summary.accuracy,
            self.state.items.len(),
            summary.timeouts
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DifficultyDefaults, ItemTag, RoundItemCount};
    use crate::countdown::ManualClock;

    fn trip(items: &[(&str, ItemTag)], min: usize, max: usize) -> Trip {
        Trip {
            id: "weekend".to_string(),
            name: "Weekend".to_string(),
            round_item_count: RoundItemCount::new(min, max),
            difficulty_defaults: DifficultyDefaults {
                easy: 6.0,
                medium: 4.0,
                hard: 2.0,
            },
            recommended_loadout: vec!["Socks".to_string()],
            items: items
                .iter()
                .map(|(name, tag)| TripItem::new(*name, *tag))
                .collect(),
        }
    }

    fn four_item_trip() -> Trip {
        trip(
            &[
                ("A", ItemTag::Essential),
                ("B", ItemTag::Trap),
                ("C", ItemTag::Useful),
                ("D", ItemTag::NotRequired),
            ],
            4,
            4,
        )
    }

    fn engine() -> (RoundEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (RoundEngine::with_clock(42, clock.clone()), clock)
    }

    #[test]
    fn welcome_opens_selection_once() {
        let (mut engine, _) = engine();
        assert_eq!(engine.phase(), Phase::Welcome);
        engine.open_selection().unwrap();
        assert_eq!(engine.phase(), Phase::Selecting);
        assert_eq!(
            engine.open_selection(),
            Err(RoundError::InvalidTransition {
                from: Phase::Selecting,
                action: "open trip selection"
            })
        );
    }

    #[test]
    fn choosing_a_trip_starts_playing() {
        let (mut engine, _) = engine();
        engine.open_selection().unwrap();
        let start = engine.choose_trip(&four_item_trip()).unwrap();
        assert_eq!(start.total, 4);
        assert_eq!(start.trip_id, "weekend");
        assert_eq!(engine.phase(), Phase::Playing);
        assert_eq!(engine.state().cursor(), 0);
        assert!(engine.decisions().is_empty());
        assert_eq!(engine.active_timer(), Some(start.timer));
        assert_eq!(engine.time_remaining(), Duration::from_secs(4));
        assert!((engine.countdown_fraction() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_trip_is_refused_and_phase_kept() {
        let (mut engine, _) = engine();
        engine.open_selection().unwrap();
        let empty = trip(&[], 1, 3);
        assert_eq!(
            engine.choose_trip(&empty),
            Err(RoundError::EmptyTrip {
                trip_id: "weekend".to_string()
            })
        );
        assert_eq!(engine.phase(), Phase::Selecting);
        assert!(engine.state().trip().is_none());
    }

    #[test]
    fn zero_length_round_is_refused_and_phase_kept() {
        let (mut engine, _) = engine();
        engine.open_selection().unwrap();
        let zero = trip(&[("Pen", ItemTag::Essential)], 0, 0);
        assert!(zero.validate().is_err());
        assert_eq!(
            engine.choose_trip(&zero),
            Err(RoundError::EmptyRound {
                trip_id: "weekend".to_string()
            })
        );
        assert_eq!(engine.phase(), Phase::Selecting);
        assert!(engine.active_timer().is_none());
    }

    #[test]
    fn equal_seeds_draw_equal_rounds() {
        let pool = trip(
            &[
                ("A", ItemTag::Essential),
                ("B", ItemTag::Trap),
                ("C", ItemTag::Useful),
                ("D", ItemTag::NotRequired),
                ("E", ItemTag::Essential),
                ("F", ItemTag::Trap),
            ],
            3,
            3,
        );
        let mut first = RoundEngine::with_clock(9, ManualClock::new());
        let mut second = RoundEngine::with_clock(9, ManualClock::new());
        first.choose_trip(&pool).unwrap();
        second.choose_trip(&pool).unwrap();
        assert_eq!(first.state().items(), second.state().items());
        assert_eq!(first.state().items().len(), 3);
    }

    #[test]
    fn choosing_mid_round_is_rejected() {
        let (mut engine, _) = engine();
        engine.choose_trip(&four_item_trip()).unwrap();
        let err = engine.choose_trip(&four_item_trip()).unwrap_err();
        assert!(matches!(
            err,
            RoundError::InvalidTransition {
                from: Phase::Playing,
                ..
            }
        ));
        assert_eq!(engine.state().cursor(), 0);
    }

    #[test]
    fn log_grows_in_lockstep_and_ends_in_results() {
        let (mut engine, _) = engine();
        engine.choose_trip(&four_item_trip()).unwrap();
        for step in 0..4 {
            assert_eq!(engine.decisions().len(), engine.state().cursor());
            assert_eq!(engine.state().cursor(), step);
            let outcome = engine.submit_decision(Decision::Pack, DecisionSource::Manual);
            assert!(!outcome.is_ignored());
            assert!(engine.decisions().len() <= engine.state().items().len());
        }
        assert_eq!(engine.phase(), Phase::Results);
        assert_eq!(engine.decisions().len(), 4);
        assert!(engine.active_timer().is_none());
        assert!(engine.current_item().is_none());
    }

    #[test]
    fn late_decisions_after_results_are_ignored() {
        let (mut engine, _) = engine();
        engine.choose_trip(&trip(&[("A", ItemTag::Essential)], 1, 1)).unwrap();
        let outcome = engine.submit_decision(Decision::Pack, DecisionSource::Gesture);
        assert!(matches!(outcome, DecisionOutcome::Completed { .. }));
        let before = engine.decisions().to_vec();
        assert_eq!(
            engine.submit_decision(Decision::Reject, DecisionSource::Manual),
            DecisionOutcome::Ignored(IgnoreReason::NotPlaying)
        );
        assert_eq!(engine.decisions(), before.as_slice());
    }

    #[test]
    fn decisions_before_any_round_are_ignored() {
        let (mut engine, _) = engine();
        assert_eq!(
            engine.submit(DecisionInput::manual(Decision::Pack)),
            DecisionOutcome::Ignored(IgnoreReason::NotPlaying)
        );
        assert!(engine.decisions().is_empty());
    }

    #[test]
    fn timeout_rejects_current_item() {
        let (mut engine, clock) = engine();
        let start = engine
            .choose_trip(&trip(&[("Passport", ItemTag::Essential), ("Anvil", ItemTag::Trap)], 2, 2))
            .unwrap();
        clock.advance(Duration::from_secs(1));
        assert_eq!(
            engine.poll_timer(start.timer),
            TimerPoll::Running {
                remaining: Duration::from_secs(3)
            }
        );
        clock.advance(Duration::from_secs(3));
        let TimerPoll::Fired(outcome) = engine.poll_timer(start.timer) else {
            panic!("countdown should have fired");
        };
        let record = outcome.record().unwrap();
        assert_eq!(record.decision, Decision::Reject);
        assert_eq!(record.source, DecisionSource::Timeout);
        assert_eq!(record.correct, !record.item.should_pack());
        assert_eq!(engine.state().feedback(), Feedback::Idle);
        assert_eq!(engine.decisions().len(), 1);
    }

    #[test]
    fn stale_token_cannot_resolve_the_next_item() {
        let (mut engine, clock) = engine();
        let start = engine.choose_trip(&four_item_trip()).unwrap();
        let outcome = engine.submit_decision(Decision::Pack, DecisionSource::Manual);
        let DecisionOutcome::Advanced { timer, cursor, .. } = outcome else {
            panic!("expected the round to advance");
        };
        assert_eq!(cursor, 1);
        assert_ne!(timer, start.timer);

        clock.advance(Duration::from_secs(10));
        assert_eq!(engine.poll_timer(start.timer), TimerPoll::Stale);
        assert_eq!(engine.decisions().len(), 1);

        assert!(matches!(engine.poll_timer(timer), TimerPoll::Fired(_)));
        assert_eq!(engine.decisions().len(), 2);
        // The fired token is spent even though time is still past due.
        assert_eq!(engine.poll_timer(timer), TimerPoll::Stale);
        assert_eq!(engine.decisions().len(), 2);
    }

    #[test]
    fn manual_tap_racing_timeout_records_once() {
        let (mut engine, clock) = engine();
        let start = engine
            .choose_trip(&trip(&[("Anvil", ItemTag::Trap)], 1, 1))
            .unwrap();
        clock.advance(Duration::from_secs(5));
        assert!(matches!(
            engine.poll_timer(start.timer),
            TimerPoll::Fired(DecisionOutcome::Completed { .. })
        ));
        assert!(
            engine
                .submit_decision(Decision::Pack, DecisionSource::Manual)
                .is_ignored()
        );
        assert_eq!(engine.decisions().len(), 1);
        assert_eq!(engine.decisions()[0].source, DecisionSource::Timeout);
    }

    #[test]
    fn each_item_gets_a_fresh_countdown() {
        let (mut engine, clock) = engine();
        engine.choose_trip(&four_item_trip()).unwrap();
        clock.advance(Duration::from_secs(3));
        assert_eq!(engine.time_remaining(), Duration::from_secs(1));
        engine.submit_decision(Decision::Reject, DecisionSource::Manual);
        assert_eq!(engine.time_remaining(), Duration::from_secs(4));
        assert_eq!(engine.view().feedback, Feedback::Idle);
    }

    #[test]
    fn feedback_reflects_last_decision_on_results() {
        let (mut engine, _) = engine();
        engine.choose_trip(&trip(&[("Anvil", ItemTag::Trap)], 1, 1)).unwrap();
        engine.submit_decision(Decision::Pack, DecisionSource::Manual);
        assert_eq!(engine.state().feedback(), Feedback::Bad);

        engine.replay().unwrap();
        engine.submit_decision(Decision::Reject, DecisionSource::Manual);
        assert_eq!(engine.state().feedback(), Feedback::Good);
    }

    #[test]
    fn reset_and_replay_only_from_results() {
        let (mut engine, _) = engine();
        engine.choose_trip(&four_item_trip()).unwrap();
        assert!(engine.reset_to_selection().is_err());
        assert!(engine.replay().is_err());
        for _ in 0..4 {
            engine.submit_decision(Decision::Pack, DecisionSource::Manual);
        }

        let start = engine.replay().unwrap();
        assert_eq!(engine.phase(), Phase::Playing);
        assert_eq!(start.total, 4);
        assert!(engine.decisions().is_empty());
        for _ in 0..4 {
            engine.submit_decision(Decision::Reject, DecisionSource::Manual);
        }

        engine.reset_to_selection().unwrap();
        assert_eq!(engine.phase(), Phase::Selecting);
        assert!(engine.state().trip().is_none());
        assert!(engine.state().items().is_empty());
        assert!(engine.decisions().is_empty());
    }

    #[test]
    fn abandoning_cancels_the_countdown() {
        let (mut engine, clock) = engine();
        let start = engine.choose_trip(&four_item_trip()).unwrap();
        engine.abandon_round().unwrap();
        assert_eq!(engine.phase(), Phase::Selecting);
        clock.advance(Duration::from_secs(30));
        assert_eq!(engine.poll_timer(start.timer), TimerPoll::Stale);
        assert!(engine.decisions().is_empty());
        assert!(engine.abandon_round().is_err());
    }

    #[test]
    fn results_expose_share_text_and_loadout() {
        let (mut engine, _) = engine();
        assert!(engine.results().is_none());
        engine.choose_trip(&four_item_trip()).unwrap();
        while let Some(item) = engine.current_item().cloned() {
            engine.submit(DecisionInput::manual(Decision::expected_for(&item)));
        }
        let results = engine.results().unwrap();
        assert_eq!(results.summary.accuracy, 100);
        assert_eq!(results.recommended_loadout(), ["Socks".to_string()]);
        assert_eq!(
            results.share_text(),
            "UNPCK | Weekend — Score 4/4 | Accuracy 100%"
        );
    }

    #[test]
    fn zero_second_pace_expires_on_first_poll() {
        let (mut engine, _) = engine();
        let mut instant = trip(&[("A", ItemTag::Useful)], 1, 1);
        instant.difficulty_defaults.medium = 0.0;
        engine.choose_trip(&instant).unwrap();
        assert!(matches!(engine.tick(), TimerPoll::Fired(_)));
        assert_eq!(engine.phase(), Phase::Results);
        assert_eq!(engine.tick(), TimerPoll::Stale);
    }
}
