//! tsclust CLI: acquire daily quotes, inspect snapshots, build image datasets.
//!
//! Commands:
//! - `fetch`: download tickers from Alpha Vantage and save a JSON snapshot
//! - `info`: list the companies in a snapshot
//! - `compare`: write a wide comparison table as CSV
//! - `images`: report the shape of the windowed image dataset
//! - `encode`: run the untrained autoencoder over the image dataset

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn, Level};
use tsclust_core::data::{AlphaVantageProvider, LogProgress, RetryPolicy};
use tsclust_core::model::INPUT_CHANNELS;
use tsclust_core::{model_batch, Companies, Config, ConvAutoencoder, Field, DEFAULT_WINDOW};

#[derive(Parser)]
#[command(
    name = "tsclust",
    about = "tsclust: daily quote collections and windowed image datasets"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily quotes and save them as a JSON snapshot.
    Fetch {
        /// Tickers to download (e.g., AAPL MSFT GOOG).
        #[arg(required = true)]
        tickers: Vec<String>,

        /// Snapshot file to write.
        #[arg(long, default_value = "companies.json")]
        output: PathBuf,

        /// API key. Overrides the config file and ALPHAVANTAGE_API_KEY.
        #[arg(long)]
        api_key: Option<String>,

        /// Retry rounds over failed tickers.
        #[arg(long)]
        max_retries: Option<usize>,

        /// Seconds to sleep after each failed fetch.
        #[arg(long)]
        retry_delay_secs: Option<u64>,
    },
    /// Print tickers, row counts, date ranges and the snapshot fingerprint.
    Info {
        /// Snapshot file to read.
        #[arg(long, default_value = "companies.json")]
        input: PathBuf,
    },
    /// Export a comparison table (one column per company) as CSV.
    Compare {
        /// Snapshot file to read.
        #[arg(long, default_value = "companies.json")]
        input: PathBuf,

        /// Tickers to include. Defaults to every company.
        #[arg(long, num_args = 1..)]
        tickers: Option<Vec<String>>,

        /// Column to compare: open, high, low, close or volume.
        #[arg(long, default_value_t = Field::Close)]
        field: Field,

        /// Keep raw values instead of dividing each column by its maximum.
        #[arg(long, default_value_t = false)]
        raw: bool,

        /// CSV file to write. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Build the windowed image dataset and report its shape.
    Images {
        /// Snapshot file to read.
        #[arg(long, default_value = "companies.json")]
        input: PathBuf,

        /// Column to window.
        #[arg(long, default_value_t = Field::Close)]
        field: Field,

        /// Window width.
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: usize,
    },
    /// Run the autoencoder over the image dataset.
    Encode {
        /// Snapshot file to read.
        #[arg(long, default_value = "companies.json")]
        input: PathBuf,

        /// Window width.
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: usize,

        /// Seed for the weight initializer.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fetch {
            tickers,
            output,
            api_key,
            max_retries,
            retry_delay_secs,
        } => run_fetch(
            cli.config.as_deref(),
            tickers,
            &output,
            api_key,
            max_retries,
            retry_delay_secs,
        ),
        Commands::Info { input } => run_info(&input),
        Commands::Compare {
            input,
            tickers,
            field,
            raw,
            output,
        } => run_compare(&input, tickers, field, raw, output.as_deref()),
        Commands::Images {
            input,
            field,
            window,
        } => run_images(&input, field, window),
        Commands::Encode {
            input,
            window,
            seed,
        } => run_encode(&input, window, seed),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    Ok(config.with_env())
}

fn run_fetch(
    config_path: Option<&Path>,
    tickers: Vec<String>,
    output: &Path,
    api_key: Option<String>,
    max_retries: Option<usize>,
    retry_delay_secs: Option<u64>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(key) = api_key {
        config.alpha_vantage.api_key = key;
    }
    config.alpha_vantage.validate()?;

    let mut policy = RetryPolicy::from(&config.acquisition);
    if let Some(n) = max_retries {
        policy.max_retries = n;
    }
    if let Some(secs) = retry_delay_secs {
        policy.retry_delay = Duration::from_secs(secs);
    }

    let provider = AlphaVantageProvider::new(config.alpha_vantage)?;
    let (companies, skipped) = Companies::from_tickers(&provider, &tickers, &policy, &LogProgress);

    if companies.is_empty() {
        bail!("no company with enough history was acquired");
    }
    companies
        .save_json(output)
        .with_context(|| format!("saving {}", output.display()))?;

    println!("{companies}");
    println!("Saved: {}", output.display());
    if !skipped.is_empty() {
        warn!(count = skipped.len(), "tickers skipped after retries");
        println!("Skipped: {}", skipped.join(", "));
    }
    Ok(())
}

fn run_info(input: &Path) -> Result<()> {
    let companies = load_companies(input)?;

    println!("{companies}");
    println!("{:<8} {:>6}  {:<10}  {:<10}", "ticker", "rows", "first", "last");
    for company in &companies {
        let first = company.first_date().map(|d| d.to_string()).unwrap_or_default();
        let last = company.last_date().map(|d| d.to_string()).unwrap_or_default();
        println!(
            "{:<8} {:>6}  {:<10}  {:<10}",
            company.ticker(),
            company.len(),
            first,
            last
        );
    }
    println!("Fingerprint: {}", companies.fingerprint());
    Ok(())
}

fn run_compare(
    input: &Path,
    tickers: Option<Vec<String>>,
    field: Field,
    raw: bool,
    output: Option<&Path>,
) -> Result<()> {
    let companies = load_companies(input)?;
    let table = companies.comparison_table(tickers.as_deref(), field, !raw)?;
    if table.tickers.is_empty() {
        bail!("none of the requested tickers are in {}", input.display());
    }

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            table.write_csv(file)?;
            info!(
                path = %path.display(),
                rows = table.len(),
                columns = table.tickers.len(),
                "wrote comparison table"
            );
        }
        None => table.write_csv(std::io::stdout().lock())?,
    }
    Ok(())
}

fn run_images(input: &Path, field: Field, window: usize) -> Result<()> {
    let companies = load_companies(input)?;
    let dataset = companies.build_image_dataset(field, window)?;
    let (n, windows, width) = dataset.dim();
    println!("Dataset shape: ({n}, {windows}, {width})");
    Ok(())
}

fn run_encode(input: &Path, window: usize, seed: u64) -> Result<()> {
    let companies = load_companies(input)?;
    if companies.len() != INPUT_CHANNELS {
        bail!(
            "the autoencoder takes exactly {INPUT_CHANNELS} companies, snapshot has {}",
            companies.len()
        );
    }

    let batch = model_batch(companies.build_image_dataset(Field::Close, window)?);
    let model = ConvAutoencoder::new(seed);

    let latent = model.encode(&batch)?;
    let output = model.forward(&batch)?;
    let mse = model.reconstruction_error(&batch)?;

    println!("Parameters:   {}", model.parameter_count());
    println!("Input shape:  {:?}", batch.shape());
    println!("Latent shape: {:?}", latent.shape());
    println!("Output shape: {:?}", output.shape());
    println!("MSE:          {mse:.6}");
    Ok(())
}

fn load_companies(input: &Path) -> Result<Companies> {
    Companies::load_json(input).with_context(|| format!("loading {}", input.display()))
}
