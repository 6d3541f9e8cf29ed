use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use spotctl::config::{self, Config, InstanceSpec};
use spotctl::discovery::{self, PriceQuote};
use spotctl::provider::PriceSource;
use spotctl::providers::EcsPriceSource;
use spotctl::report::{self, DiscoveryResult};

#[derive(Parser)]
#[command(name = "spotctl")]
#[command(
    about = "Spot price discovery CLI for Alibaba Cloud ECS",
    long_about = "spotctl finds the cheapest spot price for a fixed instance configuration\nacross a set of ECS regions and their zones.\n\nFeatures:\n  - Concurrent zone enumeration per region\n  - Bounded-concurrency price lookups\n  - Partial-failure tolerance (a failing zone or region never aborts the run)\n  - Ranked price report with the single best offer"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the cheapest spot price across the configured regions
    ///
    /// Enumerates eligible zones in every region concurrently, prices each
    /// (region, zone) pair under the concurrency cap, and prints the ranked
    /// list plus the best offer.
    ///
    /// Examples:
    ///   spotctl discover
    ///   spotctl discover --concurrency 4
    ///   spotctl discover --region us-east-1 --region us-west-1
    Discover {
        /// Maximum number of price lookups in flight at once
        #[arg(long, env = "MAX_CONCURRENCY")]
        concurrency: Option<usize>,

        /// Instance type to price (overrides the configured spec)
        #[arg(long, value_name = "INSTANCE_TYPE")]
        instance_type: Option<String>,

        /// Region to query (repeatable; overrides the configured list)
        #[arg(long = "region", value_name = "REGION_ID")]
        regions: Vec<String>,

        /// API endpoint override (bare host or full URL)
        #[arg(long, env = "ALIBABA_CLOUD_ENDPOINT")]
        endpoint: Option<String>,
    },
    /// List the eligible zones of one region
    Zones {
        /// Region to enumerate (e.g., ap-northeast-1)
        #[arg(value_name = "REGION_ID")]
        region: String,

        /// Instance type to check eligibility against
        #[arg(long, value_name = "INSTANCE_TYPE")]
        instance_type: Option<String>,

        /// API endpoint override (bare host or full URL)
        #[arg(long, env = "ALIBABA_CLOUD_ENDPOINT")]
        endpoint: Option<String>,
    },
    /// Price a single (region, zone) pair
    Price {
        /// Region id (e.g., ap-northeast-1)
        #[arg(value_name = "REGION_ID")]
        region: String,

        /// Zone id (e.g., ap-northeast-1a)
        #[arg(value_name = "ZONE_ID")]
        zone: String,

        /// Instance type to price (overrides the configured spec)
        #[arg(long, value_name = "INSTANCE_TYPE")]
        instance_type: Option<String>,

        /// API endpoint override (bare host or full URL)
        #[arg(long, env = "ALIBABA_CLOUD_ENDPOINT")]
        endpoint: Option<String>,
    },
    /// Initialize discovery configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = ".spotctl.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout carries only report lines.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Discover {
            concurrency,
            instance_type,
            regions,
            endpoint,
        } => {
            run_discover(&config, concurrency, instance_type, regions, endpoint, &cli.output)
                .await?;
        }
        Commands::Zones {
            region,
            instance_type,
            endpoint,
        } => {
            run_zones(&config, region, instance_type, endpoint, &cli.output).await?;
        }
        Commands::Price {
            region,
            zone,
            instance_type,
            endpoint,
        } => {
            run_price(&config, region, zone, instance_type, endpoint, &cli.output).await?;
        }
        Commands::Init { output } => {
            config::init_config(&output)?;
        }
    }

    Ok(())
}

async fn build_source(config: &Config, endpoint: Option<String>) -> Result<EcsPriceSource> {
    let endpoint = endpoint.or_else(|| config.discovery.endpoint.clone());
    Ok(EcsPriceSource::from_env(endpoint).await?)
}

fn effective_spec(config: &Config, instance_type: Option<String>) -> InstanceSpec {
    let mut spec = config.instance.clone();
    if let Some(instance_type) = instance_type {
        spec.instance_type = instance_type;
    }
    spec
}

async fn run_discover(
    config: &Config,
    concurrency: Option<usize>,
    instance_type: Option<String>,
    regions: Vec<String>,
    endpoint: Option<String>,
    output: &str,
) -> Result<()> {
    let source = Arc::new(build_source(config, endpoint).await?);
    let spec = effective_spec(config, instance_type);
    let regions = if regions.is_empty() {
        config.region_ids()
    } else {
        regions
    };
    let concurrency = concurrency.unwrap_or(config.discovery.max_concurrency);

    let quotes = discovery::discover(source, &regions, &spec, concurrency).await?;
    let result = DiscoveryResult::rank(quotes);
    if output == "json" {
        report::print_json(result.as_ref())?;
    } else {
        report::print_report(result.as_ref(), &config.region_labels());
    }
    Ok(())
}

async fn run_zones(
    config: &Config,
    region: String,
    instance_type: Option<String>,
    endpoint: Option<String>,
    output: &str,
) -> Result<()> {
    let source = build_source(config, endpoint).await?;
    let spec = effective_spec(config, instance_type);

    let zones = discovery::eligible_zones(&source, &region, &spec).await?;
    if output == "json" {
        println!("{}", serde_json::to_string_pretty(&zones)?);
    } else if zones.is_empty() {
        println!("No eligible zones in {}.", region);
    } else {
        for zone in &zones {
            println!("{}", zone);
        }
    }
    Ok(())
}

async fn run_price(
    config: &Config,
    region: String,
    zone: String,
    instance_type: Option<String>,
    endpoint: Option<String>,
    output: &str,
) -> Result<()> {
    let source = build_source(config, endpoint).await?;
    let spec = effective_spec(config, instance_type);

    let raw = source.get_price(&region, &zone, &spec).await?;
    match raw.trade_price {
        Some(trade_price) => {
            let quote = PriceQuote {
                region_id: region,
                zone_id: zone,
                trade_price,
                original_price: raw.original_price,
                discount_price: raw.discount_price,
                currency: raw.currency,
            };
            if output == "json" {
                println!("{}", serde_json::to_string_pretty(&quote)?);
            } else {
                println!("{}", report::format_quote_line(&quote, &config.region_labels()));
            }
        }
        None => println!("No usable quote for {}/{}.", region, zone),
    }
    Ok(())
}
