mod commands;
mod input;
mod output;
mod report;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::classify::ClassifyArgs;
use commands::model::{AssessArgs, PredictArgs, TrainArgs};
use commands::ratios::RatiosArgs;

/// Corporate probability of default scoring
#[derive(Parser)]
#[command(
    name = "cpd",
    version,
    about = "Corporate probability of default scoring",
    long_about = "Extracts fourteen financial ratios from a borrower's balance sheet, \
                  income statement and cash-flow statement, scores them with a stacked \
                  ensemble (logistic regression, random forest, gradient-boosted trees) \
                  and maps the resulting PD to a five-band risk tier."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Scoring configuration (TOML); CPD_* environment variables override it
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log filter, e.g. `info` or `credit_pd_core=debug` (default: CPD_LOG, else `warn`)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the X1-X14 ratios from a three-statement workbook
    Ratios(RatiosArgs),
    /// Fit the ensemble on a labelled dataset and print the training report
    Train(TrainArgs),
    /// Score one X_1..X_14 feature record
    Predict(PredictArgs),
    /// Extract, score and classify a borrower workbook
    Assess(AssessArgs),
    /// Map a PD to its risk tier and label
    Classify(ClassifyArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_env("CPD_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Ratios(args) => commands::ratios::run_ratios(args),
        Commands::Train(args) => commands::model::run_train(args, config),
        Commands::Predict(args) => commands::model::run_predict(args, config),
        Commands::Assess(args) => commands::model::run_assess(args, config),
        Commands::Classify(args) => commands::classify::run_classify(args, &config),
        Commands::Version => {
            println!("cpd {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
