use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Largest `MaxResults` accepted by `describe_parameters`.
const MAX_PAGE_SIZE: usize = 50;

/// Runtime configuration for the `offload` binary.
///
/// Every value can be given as a flag or through the environment (a `.env`
/// file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "offload",
    version,
    about = "Drive a blocking parameter store through an async adapter"
)]
pub struct CliArgs {
    /// Number of parameters to seed.
    ///
    /// Environment variable: `OFFLOAD_PARAMETERS`
    #[arg(long, env = "OFFLOAD_PARAMETERS", default_value_t = 100)]
    pub parameters: usize,

    /// Hierarchy the seeded parameters are created under.
    ///
    /// Environment variable: `OFFLOAD_PREFIX`
    #[arg(long, env = "OFFLOAD_PREFIX", default_value_t = String::from("/offload/demo"))]
    pub prefix: String,

    /// Parameters requested per page when listing.
    ///
    /// Environment variable: `OFFLOAD_PAGE_SIZE`
    #[arg(long, env = "OFFLOAD_PAGE_SIZE", default_value_t = 10)]
    pub page_size: usize,

    /// Connection pool size the store reports. Also the default number of
    /// worker threads.
    ///
    /// Environment variable: `OFFLOAD_MAX_POOL_CONNECTIONS`
    #[arg(long, env = "OFFLOAD_MAX_POOL_CONNECTIONS", default_value_t = 10)]
    pub max_pool_connections: usize,

    /// Use an explicit worker pool of this size instead of one derived from
    /// `--max-pool-connections`.
    ///
    /// Environment variable: `OFFLOAD_POOL_SIZE`
    #[arg(long, env = "OFFLOAD_POOL_SIZE")]
    pub pool_size: Option<usize>,

    /// Simulated latency of every store call, in milliseconds.
    ///
    /// Environment variable: `OFFLOAD_LATENCY_MS`
    #[arg(long, env = "OFFLOAD_LATENCY_MS", default_value_t = 0)]
    pub latency_ms: u64,

    /// Number of seeding calls the driver keeps in flight.
    ///
    /// Environment variable: `OFFLOAD_CONCURRENCY`
    #[arg(long, env = "OFFLOAD_CONCURRENCY", default_value_t = 64)]
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub parameters: usize,
    pub prefix: String,
    pub page_size: usize,
    pub max_pool_connections: usize,
    pub pool_size: Option<usize>,
    pub latency: Duration,
    pub concurrency: usize,
}

impl AppConfig {
    /// The name of the `n`th seeded parameter.
    pub fn parameter_name(&self, n: usize) -> String {
        format!("{}/{n:06}", self.prefix)
    }
}

impl TryFrom<CliArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.parameters == 0 {
            bail!("OFFLOAD_PARAMETERS must be greater than 0");
        }

        if !args.prefix.starts_with('/') {
            bail!("OFFLOAD_PREFIX ({}) must begin with /", args.prefix);
        }
        let prefix = args.prefix.trim_end_matches('/').to_owned();
        if prefix.is_empty() {
            bail!("OFFLOAD_PREFIX must name at least one hierarchy level");
        }

        if !(1..=MAX_PAGE_SIZE).contains(&args.page_size) {
            bail!(
                "OFFLOAD_PAGE_SIZE ({}) must be between 1 and {MAX_PAGE_SIZE}",
                args.page_size
            );
        }

        if args.max_pool_connections == 0 {
            bail!("OFFLOAD_MAX_POOL_CONNECTIONS must be greater than 0");
        }

        if args.pool_size == Some(0) {
            bail!("OFFLOAD_POOL_SIZE must be greater than 0");
        }

        if args.concurrency == 0 {
            bail!("OFFLOAD_CONCURRENCY must be greater than 0");
        }

        Ok(Self {
            parameters: args.parameters,
            prefix,
            page_size: args.page_size,
            max_pool_connections: args.max_pool_connections,
            pool_size: args.pool_size,
            latency: Duration::from_millis(args.latency_ms),
            concurrency: args.concurrency,
        })
    }
}
