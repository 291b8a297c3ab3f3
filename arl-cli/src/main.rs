//! ARL CLI: walk-forward runs and profit statistics.
//!
//! Commands:
//! - `run`: walk the engine forward over a price file and save artifacts
//! - `stats`: drawdown and per-segment statistics of a saved profit series

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use arl_runner::artifacts::{read_profit_csv, ArtifactManager};
use arl_runner::data_loader::{load_prices, LoadOptions, PriceFormat};
use arl_runner::metrics::{max_drawdown, segment_stats};
use arl_runner::{RunConfig, RunResult};

#[derive(Parser)]
#[command(
    name = "arl",
    about = "ARL CLI: adaptive recurrent reinforcement-learning trading signal"
)]
struct Cli {
    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the engine forward over a price file.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Price file (CSV with header, or tick .dat).
        #[arg(long)]
        prices: PathBuf,

        /// Input format; guessed from the extension when omitted.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Root directory for run artifacts.
        #[arg(long, default_value = "runs")]
        output_dir: PathBuf,
    },
    /// Statistics of a saved profit series.
    Stats {
        /// A profit.csv written by `run`.
        #[arg(long)]
        profit: PathBuf,

        /// Number of segments to split the series into.
        #[arg(long, default_value_t = 5)]
        segments: usize,

        /// Print the statistics as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        emit_json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Dat,
}

impl From<FormatArg> for PriceFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => PriceFormat::Csv,
            FormatArg::Dat => PriceFormat::Dat,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json)?;

    match cli.command {
        Commands::Run {
            config,
            prices,
            format,
            output_dir,
        } => run_cmd(config.as_deref(), &prices, format, &output_dir),
        Commands::Stats {
            profit,
            segments,
            emit_json,
        } => stats_cmd(&profit, segments, emit_json),
    }
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level '{level}'"))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn run_cmd(
    config_path: Option<&Path>,
    prices: &Path,
    format: Option<FormatArg>,
    output_dir: &Path,
) -> Result<()> {
    let config = match config_path {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };
    tracing::debug!(run_id = %config.run_id(), ?config, "configuration loaded");

    let opts = LoadOptions {
        format: format.map(PriceFormat::from).or(config.data.format),
        price_column: config.data.price_column.clone(),
    };
    let data = load_prices(prices, &opts)
        .with_context(|| format!("failed to load prices from {}", prices.display()))?;

    let result = arl_runner::run(&config, &data)?;
    print_summary(&result);

    let paths = ArtifactManager::new(output_dir)?.save_run(&result)?;
    println!("Artifacts saved to: {}", paths.run_dir.display());
    Ok(())
}

fn stats_cmd(path: &Path, segments: usize, emit_json: bool) -> Result<()> {
    let profit = read_profit_csv(path)?;
    let dd = max_drawdown(&profit);
    let segs = segment_stats(&profit, segments);

    if emit_json {
        let out = serde_json::json!({
            "points": profit.len(),
            "net": net(&profit),
            "max_drawdown": dd,
            "segments": segs,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("=== Profit Statistics ===");
    println!("Points:         {}", profit.len());
    println!("Net:            {:.6}", net(&profit));
    println!(
        "Max Drawdown:   {:.6} (tick {} -> {})",
        dd.value, dd.peak_index, dd.trough_index
    );
    println!();
    println!(
        "{:>4} {:>8} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "seg", "start", "end", "peak", "trough", "drawdown", "net", "mean", "variance"
    );
    for s in &segs {
        println!(
            "{:>4} {:>8} {:>8} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>12.6e}",
            s.index, s.start, s.end, s.peak, s.trough, s.drawdown, s.net, s.mean, s.variance
        );
    }
    Ok(())
}

fn net(profit: &[f64]) -> f64 {
    match (profit.first(), profit.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    }
}

fn print_summary(result: &RunResult) {
    let s = &result.summary;
    let meta = &result.metadata;
    println!();
    println!("=== Walk-Forward Result ===");
    println!("Run:            {}", result.run_id);
    println!("Source:         {}", meta.source);
    println!(
        "Prices:         {} ({} skipped lines)",
        meta.prices, meta.skipped_lines
    );
    println!("Folds:          {}", result.report.folds.len());
    println!("OOS Ticks:      {}", s.ticks);
    println!();
    println!("--- Performance ---");
    println!("Final Profit:   {:.6}", s.final_profit);
    println!("Net Profit:     {:.6}", s.net_profit);
    println!("Sharpe:         {:.4}", s.sharpe);
    println!("Max Drawdown:   {:.6}", s.max_drawdown.value);
    match s.directional_accuracy {
        Some(acc) => println!("Direction Hit:  {:.1}%", acc * 100.0),
        None => println!("Direction Hit:  n/a"),
    }
    println!(
        "Positions:      {} long / {} short / {} flat, {} changes",
        s.long_ticks, s.short_ticks, s.flat_ticks, s.position_changes
    );
    if let Some(p) = result.report.final_parameters() {
        println!();
        println!("--- Final Parameters ---");
        println!("{p}");
    }
    println!("Duration:       {:.2}s", meta.duration_secs);
}
