use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use shopscribe_ai::{AnthropicClient, ApiKey, ClientConfig, DEFAULT_MODEL, Generator, load_api_key};
use shopscribe_core::DisambiguateDuplicates;
use shopscribe_describe::pipeline::{
    DEFAULT_CHECKPOINT_EVERY, DEFAULT_INPUT, DEFAULT_MAX_TOKENS, DEFAULT_OUTPUT,
};
use shopscribe_describe::{DescribeJob, FixedDelay, JobOptions, Throttle, TokenBucket};
use shopscribe_handles::{DEFAULT_MAX_BODY_BYTES, HandleService, router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "shopscribe",
    version,
    about = "LLM-backed product copy and URL handles for a store catalogue"
)]
struct Cli {
    /// `.env` file consulted when ANTHROPIC_API_KEY is not in the environment.
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    #[command(flatten)]
    model: ModelArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Model identifier sent with every request.
    #[arg(long, global = true, env = "SHOPSCRIBE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Seconds before a model request times out (0 disables the timeout).
    #[arg(long, global = true, env = "SHOPSCRIBE_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a description for every row of a product CSV.
    Describe(DescribeArgs),
    /// Serve the handle generator over HTTP.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct DescribeArgs {
    #[arg(long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Only process the first N rows (0 means all).
    #[arg(long)]
    limit: Option<usize>,

    /// Skip rows that already have a description in the output file.
    #[arg(long)]
    resume: bool,

    /// Rows buffered between writes to the output file.
    #[arg(long, default_value_t = DEFAULT_CHECKPOINT_EVERY, value_parser = positive)]
    checkpoint_every: usize,

    /// Ceiling on model calls per second.
    #[arg(long, default_value_t = 1.0, value_parser = rate)]
    requests_per_second: f64,

    #[arg(long, value_enum, default_value_t = RateLimiter::Fixed)]
    rate_limiter: RateLimiter,

    /// Calls allowed back to back before the token bucket starts spacing them.
    #[arg(long, default_value_t = 1)]
    burst: u32,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RateLimiter {
    /// Sleep 1/rate seconds after every call.
    Fixed,
    /// Allow short bursts, then refill at the configured rate.
    TokenBucket,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "SHOPSCRIBE_BIND", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Largest accepted request body, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// Rename duplicate handles with -2, -3, ... instead of trusting the model.
    #[arg(long)]
    dedupe_handles: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::debug!("shopscribe v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Describe(args) => {
            let key = load_api_key(&cli.env_file)?;
            let generator = build_generator(key, &cli.model)?;
            describe(generator, args).await
        }
        Command::Serve(args) => {
            let generator = match load_api_key(&cli.env_file) {
                Ok(key) => Some(build_generator(key, &cli.model)?),
                Err(e) => {
                    warn!(error = %e, "starting without a credential; /generate will fail");
                    None
                }
            };
            serve(generator, args).await
        }
    }
}

fn positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

const MIN_RATE: f64 = 0.001;
const MAX_RATE: f64 = 1000.0;

fn rate(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e: std::num::ParseFloatError| e.to_string())?;
    if value.is_finite() && (MIN_RATE..=MAX_RATE).contains(&value) {
        Ok(value)
    } else {
        Err(format!("must be between {MIN_RATE} and {MAX_RATE}"))
    }
}

fn build_generator(key: ApiKey, model: &ModelArgs) -> anyhow::Result<Arc<dyn Generator>> {
    let timeout = (model.timeout_secs > 0).then(|| Duration::from_secs(model.timeout_secs));
    let config = ClientConfig::new(key).model(&model.model).timeout(timeout);
    let client = AnthropicClient::new(config).context("building Anthropic client")?;
    info!(model = client.model(), "model client ready");
    let generator: Arc<dyn Generator> = Arc::new(client);
    Ok(generator)
}

fn build_throttle(args: &DescribeArgs) -> Arc<dyn Throttle> {
    match args.rate_limiter {
        RateLimiter::Fixed => Arc::new(FixedDelay::per_second(args.requests_per_second)),
        RateLimiter::TokenBucket => {
            Arc::new(TokenBucket::new(args.requests_per_second, args.burst))
        }
    }
}

fn job_options(args: &DescribeArgs) -> JobOptions {
    JobOptions {
        input: args.input.clone(),
        output: args.output.clone(),
        limit: args.limit,
        resume: args.resume,
        checkpoint_every: args.checkpoint_every,
        max_tokens: args.max_tokens,
    }
}

async fn describe(generator: Arc<dyn Generator>, args: DescribeArgs) -> anyhow::Result<()> {
    let job = DescribeJob::new(generator, build_throttle(&args), job_options(&args));
    let stats = job
        .run()
        .await
        .with_context(|| format!("describing {}", args.input.display()))?;

    eprintln!(
        "Done. {} processed, {} errors, {} skipped of {} rows.",
        stats.processed, stats.errors, stats.skipped, stats.total
    );
    eprintln!("Output: {}", args.output.display());
    Ok(())
}

async fn serve(generator: Option<Arc<dyn Generator>>, args: ServeArgs) -> anyhow::Result<()> {
    let mut service = HandleService::new(generator);
    if args.dedupe_handles {
        service = service.with_validator(Arc::new(DisambiguateDuplicates));
    }
    let app = router(Arc::new(service), args.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(addr = %args.bind, "handle server listening");
    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}
