//! lineup-search - exhaustive batting-order search
//!
//! Loads a roster (or the bundled 2021 sample), simulates a season for every
//! ordering, and prints the best lineups plus any orderings that failed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use lineup_optimizer::logging::init_tracing;
use lineup_optimizer::storage::open_journal;
use lineup_optimizer::{
    Horizon, InMemoryResultSink, PermutationSearchCoordinator, ResultReader, ResultSink, Roster, SearchConfig,
};

/// Find the batting order that scores the most runs.
///
/// Examples:
///   lineup-search                              # bundled 2021 roster, defaults
///   lineup-search --roster team.json --games 500
///   lineup-search --journal ./results --play-logs --seed 42
#[derive(Parser, Debug)]
#[command(name = "lineup-search")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Roster JSON file (array of hitter records). Defaults to the 2021 sample.
    #[arg(short, long, value_name = "FILE")]
    roster: Option<PathBuf>,

    /// Search config JSON file. Flags below override its values.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Games simulated per lineup
    #[arg(short, long)]
    games: Option<u32>,

    /// Worker threads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Evaluate single half-innings instead of full games
    #[arg(long, conflicts_with = "outs")]
    half_inning: bool,

    /// Outs per simulated game (a multiple of 3)
    #[arg(long)]
    outs: Option<u32>,

    /// Turn eligible outs into double plays
    #[arg(long)]
    double_play: bool,

    /// Chance an eligible out becomes a double play
    #[arg(long, requires = "double_play")]
    double_play_rate: Option<f64>,

    /// Base seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Stop after this many permutations
    #[arg(long)]
    max_permutations: Option<u64>,

    /// Record play-by-play logs in the sink
    #[arg(long)]
    play_logs: bool,

    /// Directory for the durable result journal. Results stay in memory if unset.
    #[arg(short, long, value_name = "DIR")]
    journal: Option<PathBuf>,

    /// How many top lineups to print
    #[arg(short, long, default_value = "10")]
    top: usize,
}

impl Cli {
    fn search_config(&self) -> Result<SearchConfig> {
        let mut config = match &self.config {
            Some(path) => SearchConfig::from_json_file(path)?,
            None => SearchConfig::default(),
        };

        if let Some(games) = self.games {
            config.games_per_season = games;
        }
        if let Some(workers) = self.workers {
            config.worker_pool_size = workers;
        }
        if self.half_inning {
            config.horizon = Horizon::HalfInning;
        }
        if let Some(outs) = self.outs {
            config.horizon = Horizon::Game { outs };
        }
        if self.double_play {
            config.double_play.enabled = true;
        }
        if let Some(rate) = self.double_play_rate {
            config.double_play.rate = rate;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.max_permutations.is_some() {
            config.max_permutations = self.max_permutations;
        }
        if self.play_logs {
            config.record_play_logs = true;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let roster = match &cli.roster {
        Some(path) => Roster::load(path)?,
        None => Roster::sample_2021()?,
    };
    let config = cli.search_config()?;

    let (sink, reader): (Arc<dyn ResultSink>, Arc<dyn ResultReader>) = match &cli.journal {
        Some(dir) => {
            let journal = Arc::new(
                open_journal(dir, None).with_context(|| format!("failed to open journal in {}", dir.display()))?,
            );
            (journal.clone() as Arc<dyn ResultSink>, journal as Arc<dyn ResultReader>)
        }
        None => {
            let memory = Arc::new(InMemoryResultSink::new());
            (memory.clone() as Arc<dyn ResultSink>, memory as Arc<dyn ResultReader>)
        }
    };

    let report = PermutationSearchCoordinator::new(roster, config, sink)?.run()?;

    println!(
        "run {}  seed {}  evaluated {}/{}  failed {}  skipped {}  ({:.2?})",
        report.run_id,
        report.seed,
        report.succeeded,
        report.total_permutations,
        report.failed.len(),
        report.skipped,
        report.elapsed,
    );

    if let Some(best) = &report.best {
        println!();
        println!("best lineup ({:.4} runs/game):", best.fitness);
        for (slot, name) in best.lineup.split(lineup_optimizer::LINEUP_DELIMITER).enumerate() {
            println!("  {}. {name}", slot + 1);
        }
    }

    let top = reader.top_results(cli.top)?;
    if !top.is_empty() {
        println!();
        println!("top {} stored results:", top.len());
        for (rank, record) in top.iter().enumerate() {
            println!("  {:>3}  {:.4}  {}", rank + 1, record.average_score, record.lineup);
        }
    }

    if !report.failed.is_empty() {
        println!();
        println!("failed permutations:");
        for failure in &report.failed {
            println!(
                "  #{} [{}] {}: {}",
                failure.permutation_index, failure.lineup, failure.kind, failure.cause
            );
        }
    }

    if !report.unflushed.is_empty() {
        println!();
        println!("{} result(s) could not be written to the sink:", report.unflushed.len());
        for kept in &report.unflushed {
            println!(
                "  {:.4}  {}  ({})",
                kept.batch.record.average_score,
                kept.batch.record.lineup,
                kept.to_error()
            );
        }
    }

    Ok(())
}
