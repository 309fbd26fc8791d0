#![cfg(feature = "async")]

use std::time::Duration;

use tokio::sync::mpsc;
use unpck_game::{
    Catalog, Decision, DecisionInput, DecisionSource, Phase, RoundEngine, TokioClock,
    constants::COUNTDOWN_POLL_INTERVAL, drive_round,
};

fn first_trip() -> unpck_game::Trip {
    Catalog::load_from_static().trips.remove(0)
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn closed_channel_lets_every_item_time_out() {
    let trip = first_trip();
    let mut engine = RoundEngine::with_clock(5, TokioClock::new());
    engine.choose_trip(&trip).unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    drop(tx);
    let summary = drive_round(&mut engine, &mut rx, COUNTDOWN_POLL_INTERVAL)
        .await
        .unwrap();

    assert_eq!(engine.phase(), Phase::Results);
    assert_eq!(summary.total, trip.round_len());
    assert_eq!(summary.timeouts, summary.total);
    assert!(
        engine
            .decisions()
            .iter()
            .all(|record| record.decision == Decision::Reject)
    );
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn queued_inputs_resolve_items_before_the_deadline() {
    let trip = first_trip();
    let mut engine = RoundEngine::with_clock(6, TokioClock::new());
    engine.choose_trip(&trip).unwrap();
    let expected: Vec<Decision> = engine
        .state()
        .items()
        .iter()
        .map(Decision::expected_for)
        .collect();

    let (tx, mut rx) = mpsc::channel(expected.len());
    for decision in &expected {
        tx.send(DecisionInput::manual(*decision)).await.unwrap();
    }
    let summary = drive_round(&mut engine, &mut rx, Duration::from_millis(50))
        .await
        .unwrap();

    assert_eq!(summary.accuracy, 100);
    assert_eq!(summary.timeouts, 0);
    assert!(
        engine
            .decisions()
            .iter()
            .all(|record| record.source == DecisionSource::Manual)
    );
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn driver_is_a_no_op_outside_playing() {
    let mut engine = RoundEngine::with_clock(7, TokioClock::new());
    let (_tx, mut rx) = mpsc::channel::<DecisionInput>(1);
    assert!(
        drive_round(&mut engine, &mut rx, COUNTDOWN_POLL_INTERVAL)
            .await
            .is_none()
    );
    assert_eq!(engine.phase(), Phase::Welcome);
}
