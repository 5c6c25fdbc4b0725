//! tcfeat CLI: build feature vocabularies and encode corpora for learners.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tcfeat_core::DataFormat;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// tcfeat: feature vocabularies and sparse encodings for text classification
#[derive(Parser, Debug)]
#[command(name = "tcfeat", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path (replaces the layered configuration)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format: liblinear, libsvm, svm_hmm, arff, jsonl
    #[arg(short, long)]
    format: Option<DataFormat>,

    /// Output directory
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Disable parallel processing
    #[arg(long)]
    sequential: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the meta pass and write the vocabularies
    Vocab {
        /// Corpus file, one JSON document per line
        corpus: PathBuf,
    },
    /// Build vocabularies, extract features and write the encoded data
    Run {
        /// Training corpus file
        corpus: PathBuf,
        /// Held-out corpus encoded with the training artifacts
        #[arg(long)]
        test: Option<PathBuf>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Encode a corpus with the artifacts of a previous run
    Apply {
        /// Corpus file to encode
        corpus: PathBuf,
        /// Output directory of the training run
        #[arg(long)]
        train_dir: PathBuf,
    },
    /// Pair learner predictions with gold outcomes
    Id2outcome {
        /// Learner prediction file, one line per instance
        predictions: PathBuf,
        /// Directory holding the encoded data and its feature store
        #[arg(long)]
        data_dir: PathBuf,
        /// Directory holding the label mapping (defaults to the data dir)
        #[arg(long)]
        labels_dir: Option<PathBuf>,
        /// Decision threshold for multi-label scores
        #[arg(long, default_value = "0.5")]
        threshold: f64,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default configuration file into the workspace
    Init,
    /// Show the effective configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "tcfeat", "tcfeat")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "tcfeat.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let settings = commands::Settings {
        config_file: cli.config,
        format: cli.format,
        out: cli.out,
        sequential: cli.sequential,
    };
    commands::handle_command(cli.command, &workspace, &settings)
}
