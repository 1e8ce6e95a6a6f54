//! ohlcv-features CLI - build feature tables from daily price data
//!
//! ## Example Usage
//!
//! ```bash
//! # Build features from a vendor export and a CSV indicator cache
//! ohlcv-features build --prices AMZN.csv --ticker AMZN --cache-dir cache \
//!     --step close-pct --step direction:Close --step ma:ema:10:ohlc \
//!     --normalize --out features.csv --metadata features.json
//!
//! # Split a feature table 80/20
//! ohlcv-features split --input features.csv --ratio 0.8 --train train.csv --test test.csv
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use ohlcv_features::prelude::*;
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process;

/// ohlcv-features: feature engineering for daily OHLCV tables
#[derive(Parser)]
#[command(name = "ohlcv-features")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Robert Fall")]
#[command(about = "Feature engineering for daily OHLCV price tables", long_about = None)]
struct Cli {
    /// Report merge and split sizes
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive features for one ticker
    Build {
        /// Price CSV, vendor or canonical column names
        #[arg(short = 'p', long)]
        prices: PathBuf,

        /// Ticker used to look up indicator tables
        #[arg(short = 't', long)]
        ticker: String,

        /// Directory of cached indicator CSV files
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Feature step, repeatable (e.g. `direction:Close`, `ma:sma:20:Close`)
        #[arg(short = 's', long = "step")]
        steps: Vec<String>,

        /// Prices include a market cap column
        #[arg(long)]
        crypto: bool,

        /// Min-max scale every column except Date
        #[arg(short = 'n', long)]
        normalize: bool,

        /// Output CSV for the feature table
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,

        /// Output JSON for the continuous and categorical column lists
        #[arg(short = 'm', long)]
        metadata: Option<PathBuf>,
    },

    /// Split a table into training and test files, keeping row order
    Split {
        /// Input CSV
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Training share in (0, 1]
        #[arg(short = 'r', long)]
        ratio: Option<f64>,

        /// Training output CSV
        #[arg(long)]
        train: PathBuf,

        /// Test output CSV
        #[arg(long)]
        test: PathBuf,
    },
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let verbose = config.verbose || verbose;
    Ok(config.with_verbose(verbose))
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

struct BuildArgs {
    prices: PathBuf,
    ticker: String,
    cache_dir: Option<PathBuf>,
    steps: Vec<String>,
    crypto: bool,
    normalize: bool,
    out: Option<PathBuf>,
    metadata: Option<PathBuf>,
}

fn build(args: BuildArgs, config: PipelineConfig) -> Result<()> {
    let steps = if args.steps.is_empty() {
        parse_steps(&config.steps)?
    } else {
        parse_steps(&args.steps)?
    };
    if steps.is_empty() {
        bail!("no feature steps given; use --step or `steps` in the config file");
    }

    let source: Box<dyn IndicatorSource> = match args.cache_dir.as_ref().or(config.cache_dir.as_ref()) {
        Some(dir) => Box::new(CsvIndicatorCache::new(dir)),
        None => {
            log::warn!("No indicator cache configured, indicator steps will fail");
            Box::new(InMemoryIndicatorCache::new())
        }
    };

    let prices = load_price_csv(&args.prices, args.crypto)
        .with_context(|| format!("failed to load prices from {}", args.prices.display()))?;
    let pipeline = FeaturePipeline::new(source, config)?;
    let ticker = Ticker::new(args.ticker);

    println!(
        "{} {} rows for {} through {} steps",
        "Building".green().bold(),
        prices.height(),
        ticker.to_string().cyan(),
        steps.len()
    );

    let (table, meta) = pipeline.run(prices, &ticker, &steps)?;
    let mut table = if args.normalize {
        pipeline.normalize(table, &[DATE])?
    } else {
        table
    };

    println!(
        "{} {} rows, {} continuous, {} categorical",
        "Done:".green().bold(),
        table.height(),
        meta.continuous().len(),
        meta.categorical().len()
    );

    match &args.out {
        Some(path) => {
            write_csv(&mut table, path)?;
            println!("  Features: {}", path.display());
        }
        None => println!("{}", table),
    }

    if let Some(path) = &args.metadata {
        let json = serde_json::to_string_pretty(&meta)?;
        fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
        println!("  Metadata: {}", path.display());
    }
    Ok(())
}

fn split(input: &Path, ratio: Option<f64>, train_path: &Path, test_path: &Path, config: &PipelineConfig) -> Result<()> {
    let ratio = ratio.unwrap_or(config.split_ratio);
    let table = load_price_csv(input, false)
        .with_context(|| format!("failed to load {}", input.display()))?;

    let (mut train, mut test) = split_data(&table, ratio)?;
    write_csv(&mut train, train_path)?;
    write_csv(&mut test, test_path)?;

    println!(
        "{} {} rows: {} training ({}), {} testing ({})",
        "Split".green().bold(),
        table.height(),
        train.height(),
        train_path.display(),
        test.height(),
        test_path.display()
    );
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref(), cli.verbose).and_then(|config| match cli.command {
        Commands::Build {
            prices,
            ticker,
            cache_dir,
            steps,
            crypto,
            normalize,
            out,
            metadata,
        } => build(
            BuildArgs {
                prices,
                ticker,
                cache_dir,
                steps,
                crypto,
                normalize,
                out,
                metadata,
            },
            config,
        ),
        Commands::Split {
            input,
            ratio,
            train,
            test,
        } => split(&input, ratio, &train, &test, &config),
    });

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
