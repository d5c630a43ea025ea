use clap::{Parser, Subcommand};
use framecache::{config, server};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Config file picked up when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Parser)]
#[command(name = "framecache")]
#[command(about = "Cached image thumbnails and animated GIF assembly over HTTP")]
#[command(long_about = "\
Cached image thumbnails and animated GIF assembly over HTTP

Endpoints:

  GET  /thumbnail?url=..&width=..&height=..&format=..&quality=..
  POST /create-filtered-gif   multipart: images (1-20 files), frameDelay (ms)
  POST /resize                JSON: {\"image_url\": \"..\"}
  GET  /health
  GET  /cache/stats

Configuration is read from ./config.toml when present, or from --config.
Run 'framecache gen-config' to print a documented config.toml.

Log verbosity follows RUST_LOG (default: info).")]
#[command(version)]
struct Cli {
    /// Path to config.toml (default: ./config.toml if it exists)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        /// Listen address, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
    /// Load and validate the config, then print the effective values
    CheckConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::CheckConfig => {
            let config = load(cli.config.as_deref())?;
            print!("{}", toml::to_string_pretty(&config)?);
            println!("# config is valid");
        }
        Command::Serve { bind } => {
            init_tracing();
            let mut config = load(cli.config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind = bind;
                config.validate()?;
            }
            init_thread_pool(&config.processing);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(serve(config))?;
        }
    }

    Ok(())
}

fn load(path: Option<&Path>) -> Result<config::ServiceConfig, config::ConfigError> {
    let path = path.or_else(|| {
        let default = Path::new(DEFAULT_CONFIG_PATH);
        default.exists().then_some(default)
    });
    config::load_config(path)
}

async fn serve(config: config::ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bind = config.server.bind.clone();
    let cache = config.cache.clone();
    let state = server::AppState::from_config(config)?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        cache_max_bytes = cache.max_bytes,
        cache_ttl_secs = cache.ttl_secs,
        "framecache listening"
    );
    server::serve(listener, state).await?;
    tracing::info!("shut down");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. Users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
