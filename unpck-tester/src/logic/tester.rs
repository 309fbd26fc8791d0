use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};

use unpck_game::constants::COUNTDOWN_POLL_INTERVAL;
use unpck_game::numbers::{rounded_percent, usize_to_f64};
use unpck_game::{Decision, DecisionSource, Trip, is_correct, share_text};

use super::duration_serde;
use super::policy::PlayerStrategy;
use super::simulation::{ClockMode, RoundSimulator, RoundTrace};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub strategy: String,
    pub trip_id: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub mean_accuracy: f64,
    pub total_timeouts: usize,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// One played round, flattened for CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub scenario_name: String,
    pub strategy: String,
    pub trip_id: String,
    pub seed: u64,
    pub score: usize,
    pub total: usize,
    pub accuracy: u32,
    pub timeouts: usize,
    pub elapsed_ms: u128,
}

impl RoundRecord {
    #[must_use]
    pub fn from_trace(trace: &RoundTrace) -> Self {
        Self {
            scenario_name: scenario_name(trace.strategy, &trace.trip_id),
            strategy: trace.strategy.key().to_string(),
            trip_id: trace.trip_id.clone(),
            seed: trace.seed,
            score: trace.summary.score,
            total: trace.summary.total,
            accuracy: trace.summary.accuracy,
            timeouts: trace.summary.timeouts,
            elapsed_ms: trace.elapsed.as_millis(),
        }
    }
}

#[must_use]
pub fn scenario_name(strategy: PlayerStrategy, trip_id: &str) -> String {
    format!("{}@{trip_id}", strategy.key())
}

/// A strategy playing one trip.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub strategy: PlayerStrategy,
    pub trip: Trip,
}

impl Scenario {
    #[must_use]
    pub fn name(&self) -> String {
        scenario_name(self.strategy, &self.trip.id)
    }
}

pub struct RoundTester {
    simulator: RoundSimulator,
    verbose: bool,
}

impl RoundTester {
    pub const fn new(verbose: bool) -> Self {
        Self {
            simulator: RoundSimulator::new(verbose),
            verbose,
        }
    }

    /// Run `iterations` simulated rounds per seed; one result per seed.
    pub fn run_scenario(
        &self,
        scenario: &Scenario,
        seeds: &[u64],
        iterations: usize,
        records: &mut Vec<RoundRecord>,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (trip: {} seed: {})",
                    scenario.strategy.label().bright_white(),
                    scenario.trip.id,
                    seed
                );
            }

            let traces = (0..iterations).map(|i| {
                let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
                let started = Instant::now();
                let trace = self
                    .simulator
                    .run(&scenario.trip, scenario.strategy, iteration_seed)
                    .map_err(|err| format!("{err:#}"));
                (trace, started.elapsed())
            });
            results.push(self.collect(scenario, traces, iterations, records));
        }

        results
    }

    /// Fold traces (or errors) into a scenario result, checking each one.
    pub fn collect<I>(
        &self,
        scenario: &Scenario,
        traces: I,
        iterations: usize,
        records: &mut Vec<RoundRecord>,
    ) -> ScenarioResult
    where
        I: IntoIterator<Item = (Result<RoundTrace, String>, Duration)>,
    {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut accuracy_sum = 0_usize;
        let mut rounds = 0_usize;
        let mut total_timeouts = 0;

        for (i, (trace, duration)) in traces.into_iter().enumerate() {
            let trace = match trace {
                Ok(trace) => trace,
                Err(err) => {
                    failures.push(format!("Iteration {}: round failed: {err}", i + 1));
                    continue;
                }
            };
            records.push(RoundRecord::from_trace(&trace));
            rounds += 1;
            accuracy_sum += usize::try_from(trace.summary.accuracy).unwrap_or(0);
            total_timeouts += trace.summary.timeouts;

            if let Err(err) = check_round(&scenario.trip, &trace) {
                failures.push(format!(
                    "Iteration {} (strategy {}, trip {}, seed {}): {} | score {}/{} accuracy {}% timeouts {}",
                    i + 1,
                    trace.strategy.label(),
                    trace.trip_id,
                    trace.seed,
                    err,
                    trace.summary.score,
                    trace.summary.total,
                    trace.summary.accuracy,
                    trace.summary.timeouts
                ));
                if self.verbose {
                    println!("  ❌ Iteration {}/{} failed: {}", i + 1, iterations, err.red());
                }
            } else {
                successes += 1;
                performance_data.push(duration);
                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) score:{}/{} timeouts:{}",
                        i + 1,
                        iterations,
                        trace.summary.score,
                        trace.summary.total,
                        trace.summary.timeouts
                    );
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };
        let mean_accuracy = if rounds == 0 {
            0.0
        } else {
            usize_to_f64(accuracy_sum) / usize_to_f64(rounds)
        };

        ScenarioResult {
            scenario_name: scenario.name(),
            strategy: scenario.strategy.key().to_string(),
            trip_id: scenario.trip.id.clone(),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            mean_accuracy,
            total_timeouts,
            average_duration,
            performance_data,
        }
    }
}

/// Check the round invariants, then what the strategy promises.
///
/// # Errors
///
/// Returns a description of the first violated expectation.
pub fn check_round(trip: &Trip, trace: &RoundTrace) -> Result<(), String> {
    check_invariants(trip, trace)?;
    check_strategy(trip, trace)
}

fn check_invariants(trip: &Trip, trace: &RoundTrace) -> Result<(), String> {
    let log = &trace.decisions;
    if log.len() != trip.round_len() {
        return Err(format!(
            "logged {} decisions for a {}-item round",
            log.len(),
            trip.round_len()
        ));
    }
    let mut seen = HashSet::new();
    for record in log {
        if !trip.items.contains(&record.item) {
            return Err(format!("'{}' is not part of the trip", record.item.name));
        }
        if !seen.insert(record.item.name.as_str()) {
            return Err(format!("'{}' was presented twice", record.item.name));
        }
        if record.correct != is_correct(&record.item, record.decision) {
            return Err(format!("'{}' was scored incorrectly", record.item.name));
        }
        if record.timed_out() && record.decision != Decision::Reject {
            return Err(format!("timeout on '{}' did not reject", record.item.name));
        }
    }

    let score = log.iter().filter(|record| record.correct).count();
    let summary = &trace.summary;
    if summary.score != score || summary.total != log.len() {
        return Err(format!(
            "summary {}/{} disagrees with log {score}/{}",
            summary.score,
            summary.total,
            log.len()
        ));
    }
    if summary.accuracy != rounded_percent(score, log.len()) {
        return Err(format!("accuracy {}% is not rounded half-up", summary.accuracy));
    }
    if trace.share_text != share_text(&trip.name, summary) {
        return Err(format!("unexpected share text '{}'", trace.share_text));
    }
    if trace.ignored_inputs == 0 {
        return Err("input after the round was not ignored".to_string());
    }
    let expected_stale = match trace.clock_mode {
        ClockMode::Simulated => log.len(),
        ClockMode::Realtime => 1,
    };
    if trace.stale_polls != expected_stale {
        return Err(format!(
            "{} of {expected_stale} superseded countdowns reported stale",
            trace.stale_polls
        ));
    }
    Ok(())
}

fn check_strategy(trip: &Trip, trace: &RoundTrace) -> Result<(), String> {
    let summary = &trace.summary;
    let log = &trace.decisions;
    match trace.strategy {
        PlayerStrategy::Perfect => {
            if !summary.is_perfect() || summary.accuracy != 100 {
                return Err(format!("perfect player scored {}%", summary.accuracy));
            }
            if summary.timeouts != 0 {
                return Err("perfect player timed out".to_string());
            }
        }
        PlayerStrategy::Contrarian => {
            if summary.score != 0 {
                return Err(format!("contrarian player scored {}", summary.score));
            }
            if log.iter().any(|record| record.source != DecisionSource::Gesture) {
                return Err("contrarian decisions should arrive as gestures".to_string());
            }
        }
        PlayerStrategy::CoinFlip => {
            if summary.timeouts != 0 {
                return Err("coin-flip player answered too late".to_string());
            }
        }
        PlayerStrategy::Idle => {
            if summary.timeouts != summary.total {
                return Err(format!(
                    "idle player resolved {} items without the countdown",
                    summary.total - summary.timeouts
                ));
            }
            let rejectable = log.iter().filter(|record| !record.item.should_pack()).count();
            if summary.score != rejectable {
                return Err(format!(
                    "idle player scored {} but {rejectable} items should be rejected",
                    summary.score
                ));
            }
            if trace.clock_mode == ClockMode::Simulated {
                // Each timeout fires on the first poll at or past the window.
                let items = u32::try_from(summary.total).unwrap_or(u32::MAX);
                let expected = trace.window * items;
                let slack = COUNTDOWN_POLL_INTERVAL * items;
                if trace.elapsed < expected || trace.elapsed >= expected + slack {
                    return Err(format!(
                        "{} timeouts took {:?}, expected {expected:?} for trip {}",
                        summary.timeouts, trace.elapsed, trip.id
                    ));
                }
            }
        }
        PlayerStrategy::Hesitant => {
            if log
                .iter()
                .any(|record| !record.timed_out() && !record.correct)
            {
                return Err("hesitant player answered wrong".to_string());
            }
        }
    }
    Ok(())
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unpck_game::Catalog;

    fn bundled_scenarios() -> Vec<Scenario> {
        let catalog = Catalog::load_from_static();
        PlayerStrategy::ALL
            .into_iter()
            .flat_map(|strategy| {
                catalog.trips.iter().map(move |trip| Scenario {
                    strategy,
                    trip: trip.clone(),
                })
            })
            .collect()
    }

    #[test]
    fn every_strategy_passes_on_bundled_trips() {
        let tester = RoundTester::new(false);
        let mut records = Vec::new();
        for scenario in bundled_scenarios() {
            for result in tester.run_scenario(&scenario, &[1337, 42], 3, &mut records) {
                assert!(result.passed, "{}: {:?}", result.scenario_name, result.failures);
                assert_eq!(result.successful_iterations, 3);
            }
        }
        assert_eq!(records.len(), 5 * 3 * 2 * 3);
    }

    #[test]
    fn tampered_trace_is_caught() {
        let scenario = &bundled_scenarios()[0];
        let mut trace = RoundSimulator::default()
            .run(&scenario.trip, scenario.strategy, 9)
            .unwrap();
        assert!(check_round(&scenario.trip, &trace).is_ok());

        trace.summary.accuracy = 99;
        assert!(check_round(&scenario.trip, &trace).is_err());

        let mut short = RoundSimulator::default()
            .run(&scenario.trip, scenario.strategy, 9)
            .unwrap();
        short.decisions.pop();
        assert!(
            check_round(&scenario.trip, &short)
                .unwrap_err()
                .contains("decisions")
        );
    }

    #[test]
    fn errors_count_as_failed_iterations() {
        let scenario = &bundled_scenarios()[0];
        let mut records = Vec::new();
        let result = RoundTester::new(false).collect(
            scenario,
            vec![(Err("boom".to_string()), Duration::ZERO)],
            1,
            &mut records,
        );
        assert!(!result.passed);
        assert_eq!(result.successful_iterations, 0);
        assert!(records.is_empty());
        assert!((result.mean_accuracy - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scenario_names_join_strategy_and_trip() {
        assert_eq!(
            scenario_name(PlayerStrategy::CoinFlip, "beach-weekend"),
            "coin-flip@beach-weekend"
        );
    }
}
