//! AtlasID Server Binary
//!
//! Starts the TCP server for AtlasID.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use atlasid::config::ConfigBuilder;
use atlasid::network::Server;
use atlasid::{Config, Dispatcher, KeyRegistry, SqliteStore, Store};
use clap::Parser;
use signal_hook::consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing_subscriber::{fmt, EnvFilter};

/// AtlasID Server
#[derive(Parser, Debug)]
#[command(name = "atlasid-server")]
#[command(about = "Segment-based unique ID server")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long)]
    listen: Option<String>,

    /// SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Ids reserved per store round trip
    #[arg(short, long)]
    batch_size: Option<i64>,

    /// Maximum concurrent connections
    #[arg(short, long)]
    max_connections: Option<usize>,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "atlasid=debug")
    #[arg(long)]
    log_level: Option<String>,

    /// Directory to write the log file to (stdout when unset)
    #[arg(long)]
    log_path: Option<PathBuf>,
}

fn load_config(args: &Args) -> atlasid::Result<Config> {
    let base = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let mut builder = ConfigBuilder::from_config(base);
    if let Some(listen) = &args.listen {
        builder = builder.listen_addr(listen);
    }
    if let Some(database) = &args.database {
        builder = builder.database_path(database);
    }
    if let Some(batch) = args.batch_size {
        builder = builder.batch_size(batch);
    }
    if let Some(max) = args.max_connections {
        builder = builder.max_connections(max);
    }
    if let Some(level) = &args.log_level {
        builder = builder.log_level(level);
    }
    if let Some(dir) = &args.log_path {
        builder = builder.log_path(dir);
    }

    let config = builder.build();
    config.validate()?;
    Ok(config)
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("Cannot open log file: {}", e);
        std::process::exit(1);
    }

    tracing::info!("AtlasID Server v{}", atlasid::VERSION);
    tracing::info!("Database: {}", config.database_path.display());
    tracing::info!("Listen address: {}", config.listen_addr);
    tracing::info!("Batch size: {}", config.batch_size);

    if let Err(e) = run(config) {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Install the tracing subscriber, appending to the configured log file if any
fn init_logging(config: &Config) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match config.log_file() {
        Some(path) => {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }
    Ok(())
}

fn run(config: Config) -> atlasid::Result<()> {
    let store: Arc<dyn Store> = if config.is_in_memory() {
        Arc::new(SqliteStore::open_in_memory()?)
    } else {
        Arc::new(SqliteStore::open(&config.database_path)?)
    };

    let registry = Arc::new(KeyRegistry::new(store, config.batch_size));
    let report = registry.rehydrate()?;
    for (key, e) in &report.failed {
        tracing::error!("Key {} was not restored: {}", key, e);
    }

    let dispatcher = Arc::new(Dispatcher::new(registry));
    let mut server = Server::bind(config, dispatcher)?;

    let shutdown = server.shutdown_handle();
    let mut signals = Signals::new([SIGHUP, SIGINT, SIGTERM, SIGQUIT])?;
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            tracing::info!("Received signal {}, initiating shutdown...", signal);
            shutdown.shutdown();
        }
    });

    server.run()
}
