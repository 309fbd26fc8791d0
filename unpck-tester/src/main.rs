mod common;
mod logic;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use common::{load_catalog, parse_seeds, split_csv};
use logic::{PlayerStrategy, RoundRecord, RoundTester, Scenario, ScenarioResult};
use unpck_game::{Catalog, Trip};

#[derive(Debug, Parser)]
#[command(name = "unpck-tester", version = "0.1.0")]
#[command(about = "Automated round simulation for UNPCK: Pack It Right")]
struct Args {
    /// Player strategies to run (comma-separated, or "all")
    #[arg(long, default_value = "all")]
    strategies: String,

    /// List all available strategies and exit
    #[arg(long)]
    list_strategies: bool,

    /// Trip ids to play (comma-separated, or "all")
    #[arg(long, default_value = "all")]
    trips: String,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of rounds per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Trip catalog JSON to load instead of the bundled one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Drive one round per seed through the async driver on the real clock.
    /// Rounds take as long as a human player would.
    #[arg(long)]
    realtime: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_strategies(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let catalog = load_catalog(args.catalog.as_deref())?;
    let strategies = expand_strategies(&args.strategies);
    let trips = select_trips(&catalog, &args.trips);
    let seeds = parse_seeds(&args.seeds)?;
    let scenarios = build_scenarios(&strategies, &trips);

    let mut records = Vec::new();
    let results = if args.realtime {
        run_realtime_scenarios(&args, &scenarios, &seeds, &mut records).await
    } else {
        run_simulated_scenarios(&args, &scenarios, &seeds, &mut records)
    };

    write_reports(&args, &results, &records, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_strategies(args: &Args) -> Result<bool> {
    if !args.list_strategies {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available strategies:")?;
    for strategy in PlayerStrategy::ALL {
        writeln!(
            output_target.writer(),
            "  {:12} - {}",
            strategy.key(),
            strategy.description()
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎒 UNPCK Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_strategies(arg: &str) -> Vec<PlayerStrategy> {
    let mut strategies = Vec::new();
    for token in split_csv(arg) {
        if token.eq_ignore_ascii_case("all") {
            strategies.extend(PlayerStrategy::ALL);
            continue;
        }
        match token.parse::<PlayerStrategy>() {
            Ok(strategy) => strategies.push(strategy),
            Err(err) => eprintln!("⚠️  {}", err.yellow()),
        }
    }
    let mut seen = Vec::with_capacity(strategies.len());
    strategies.retain(|strategy| {
        let fresh = !seen.contains(strategy);
        seen.push(*strategy);
        fresh
    });
    strategies
}

fn select_trips(catalog: &Catalog, arg: &str) -> Vec<Trip> {
    let tokens = split_csv(arg);
    if tokens.iter().any(|t| t.eq_ignore_ascii_case("all")) {
        return catalog.playable_trips().cloned().collect();
    }
    tokens
        .iter()
        .filter_map(|id| {
            let trip = catalog.trip_by_id(id);
            if trip.is_none() {
                eprintln!("⚠️  Unknown trip: {}", id.yellow());
            }
            trip.cloned()
        })
        .collect()
}

fn build_scenarios(strategies: &[PlayerStrategy], trips: &[Trip]) -> Vec<Scenario> {
    strategies
        .iter()
        .flat_map(|&strategy| {
            trips.iter().map(move |trip| Scenario {
                strategy,
                trip: trip.clone(),
            })
        })
        .collect()
}

fn run_simulated_scenarios(
    args: &Args,
    scenarios: &[Scenario],
    seeds: &[u64],
    records: &mut Vec<RoundRecord>,
) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Simulated Rounds".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let tester = RoundTester::new(args.verbose);
    scenarios
        .iter()
        .flat_map(|scenario| tester.run_scenario(scenario, seeds, args.iterations, records))
        .collect()
}

async fn run_realtime_scenarios(
    args: &Args,
    scenarios: &[Scenario],
    seeds: &[u64],
    records: &mut Vec<RoundRecord>,
) -> Vec<ScenarioResult> {
    println!("{}", "⏱️  Running Realtime Rounds".bright_blue().bold());
    println!("{}", "-".repeat(30).blue());

    let tester = RoundTester::new(args.verbose);
    let mut results = Vec::new();
    for scenario in scenarios {
        let mut traces = Vec::with_capacity(seeds.len());
        for &seed in seeds {
            let started = Instant::now();
            let trace = logic::run_realtime_round(&scenario.trip, scenario.strategy, seed)
                .await
                .map_err(|err| format!("{err:#}"));
            let duration = started.elapsed();
            match &trace {
                Ok(trace) => println!(
                    "✅ [{} seed {}] score {}/{} - {:?}",
                    scenario.name().green(),
                    seed,
                    trace.summary.score,
                    trace.summary.total,
                    duration
                ),
                Err(err) => eprintln!("❌ [{} seed {}] {err}", scenario.name().red(), seed),
            }
            traces.push((trace, duration));
        }
        results.push(tester.collect(scenario, traces, seeds.len(), records));
    }
    results
}

fn write_reports(
    args: &Args,
    results: &[ScenarioResult],
    records: &[RoundRecord],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# UNPCK Round Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        "csv" => logic::reports::generate_csv_report(&mut output_target, records)?,
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(&mut output_target, results, duration)?;
            }
        }
    }

    if matches!(args.report.as_str(), "console" | "markdown") {
        let duration = start_time.elapsed();
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
