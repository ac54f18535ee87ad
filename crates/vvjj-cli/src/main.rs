//! vvjj CLI

mod run;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use run::{FlowMode, OutputFormat, RunArgs};

#[derive(Parser)]
#[command(name = "vvjj")]
#[command(about = "VVJJ quark/gluon flavor-topology histograms")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select events and write histograms, one output per generator label
    Run {
        /// Input list of `<event-table> <generator-label>` pairs
        #[arg(long)]
        input_list: Option<PathBuf>,

        /// Output directory (created if missing)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Histogram file format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Out-of-range fills: keep only in flow bins (drop) or also fold into edge bins (fold)
        #[arg(long, value_enum)]
        flow_policy: Option<FlowMode>,

        /// Threads (0 = auto). Use 1 for sequential processing.
        #[arg(long)]
        threads: Option<usize>,

        /// Run config (YAML, or JSON by extension). Flags override its values.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Per-bin tag efficiencies (tagged / untagged per category) from a histogram file
    Efficiency {
        /// Histogram file written by `vvjj run` (.json, .parquet or .pq)
        #[arg(long)]
        input: PathBuf,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the jet and event tag tables as JSON
    Tags {
        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Run { input_list, out_dir, format, flow_policy, threads, config } => {
            let args = RunArgs { input_list, out_dir, format, flow_policy, threads };
            run::cmd_run(args, config.as_deref())
        }
        Commands::Efficiency { input, output } => cmd_efficiency(&input, output.as_ref()),
        Commands::Tags { output } => cmd_tags(output.as_ref()),
        Commands::Version => {
            println!("vvjj {}", vvjj_core::VERSION);
            Ok(())
        }
    }
}

fn read_histograms(path: &Path) -> Result<Vec<vvjj_hist::Distribution>> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    let hists = match ext.as_str() {
        "json" => vvjj_hist::read_histograms_json(path)?,
        "parquet" | "pq" => vvjj_hist::read_histograms_parquet(path)?,
        _ => anyhow::bail!("{}: expected a .json, .parquet or .pq histogram file", path.display()),
    };
    Ok(hists)
}

fn cmd_efficiency(input: &Path, output: Option<&PathBuf>) -> Result<()> {
    let hists = read_histograms(input)
        .with_context(|| format!("failed to read histograms from {}", input.display()))?;
    let curves = vvjj_select::tag_efficiencies(&hists)?;
    tracing::info!(histograms = hists.len(), curves = curves.len(), "computed tag efficiencies");

    let value = serde_json::json!({
        "schema_version": vvjj_hist::EFFICIENCY_SCHEMA_V1,
        "input": input,
        "curves": curves,
    });
    write_json(output, value)
}

fn cmd_tags(output: Option<&PathBuf>) -> Result<()> {
    let value = serde_json::json!({
        "jet_tags": vvjj_select::JET_TAGS,
        "event_tags": vvjj_select::EVENT_TAGS,
    });
    write_json(output, value)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    let json = serde_json::to_string_pretty(&value)?;
    if let Some(path) = output {
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "wrote output");
    } else {
        println!("{json}");
    }
    Ok(())
}
