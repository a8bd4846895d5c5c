mod api;
mod config;
mod error;
mod events;
mod kismet;
mod monitoring;
mod sentinel;
mod storage;
mod utils;

use crate::config::rules::{DEFAULT_CONFIG_PATH, load_config};
use crate::kismet::{KismetClient, demo};
use crate::monitoring::{start_device_poller, start_scheduler};
use crate::sentinel::Sentinel;
use crate::storage::start_save_worker;
use anyhow::Context;
use clap::Parser;
use parking_lot::RwLock;
use simplelog::*;
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

static RUNNING: AtomicBool = AtomicBool::new(true);
static SHUTDOWN_ONCE: Once = Once::new();

#[derive(Parser)]
#[command(name = "kismet-sentinel")]
#[command(about = "Kismet monitoring dashboard with drone and signal alerting", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Address to bind the dashboard to
    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for snapshot files
    #[arg(long, env = "KISMET_SAVE_DIR")]
    save_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Disable the background device poller
    #[arg(long)]
    no_poll: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    log::info!("=========================================");
    log::info!("       Kismet Sentinel Starting");
    log::info!("=========================================");

    let mut config = load_config(&cli.config);
    config.apply_env();
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = &cli.save_dir {
        config.save_dir = dir.clone();
    }
    std::fs::create_dir_all(&config.save_dir)
        .with_context(|| format!("creating save dir {}", config.save_dir.display()))?;

    let host = config.server.host.clone();
    let port = config.server.port;
    let poll_interval = Duration::from_secs(config.poll_interval_secs.max(1));
    let save_dir = config.save_dir.clone();

    let kismet_settings = Arc::new(RwLock::new(config.kismet.clone()));
    let client = KismetClient::new(Arc::clone(&kismet_settings)).context("building Kismet client")?;
    log::info!("Kismet endpoint: {}", kismet_settings.read().url);

    let (sentinel, save_rx) = Sentinel::new(config, cli.config.clone(), Box::new(client), kismet_settings);
    let sentinel = Arc::new(sentinel);

    if sentinel.demo_mode() {
        let raised = sentinel.seed_demo_alerts(&demo::demo_devices(chrono::Utc::now().timestamp()));
        log::info!("Demo mode active, {} alerts from demo devices (set KISMET_DEMO=0 to disable)", raised);
    }

    let listener = api::bind(&host, port).with_context(|| format!("binding {}:{}", host, port))?;

    let save_running = Arc::new(AtomicBool::new(true));
    let scheduler_running = Arc::new(AtomicBool::new(true));
    let poller_running = Arc::new(AtomicBool::new(true));
    let server_running = Arc::new(AtomicBool::new(true));

    log::info!("🚀 Starting components...");

    let save_handle = start_save_worker(save_rx, Arc::clone(&sentinel), Arc::clone(&save_running));
    let scheduler_handle = start_scheduler(Arc::clone(&sentinel), Arc::clone(&scheduler_running));
    let poller_handle = if cli.no_poll {
        log::info!("Background polling disabled");
        None
    } else {
        Some(start_device_poller(
            Arc::clone(&sentinel),
            poll_interval,
            Arc::clone(&poller_running),
        ))
    };
    let server_handle = api::start_http_server(listener, Arc::clone(&sentinel), Arc::clone(&server_running));

    log::info!("=========================================");
    log::info!("       Kismet Sentinel Running");
    log::info!("=========================================");
    log::info!("🖥️  Host: {}", whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string()));
    log::info!("🌐 Dashboard: http://localhost:{}", port);
    log::info!("💾 Save dir: {}", save_dir.canonicalize().unwrap_or(save_dir).display());
    log::info!("🛑 Press Ctrl+C to stop");
    log::info!("=========================================");

    ctrlc::set_handler(|| {
        SHUTDOWN_ONCE.call_once(|| {
            log::info!("");
            log::info!("🛑 Received shutdown signal");
            RUNNING.store(false, Ordering::Relaxed);
        });
    })
    .context("installing Ctrl+C handler")?;

    while RUNNING.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }

    let mut components = vec![
        ("HTTP Server", server_running, Some(server_handle)),
        ("Device Poller", poller_running, poller_handle),
        ("Scheduler", scheduler_running, Some(scheduler_handle)),
        ("Save Worker", save_running, Some(save_handle)),
    ];
    perform_shutdown(&mut components);

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = &cli.log_file {
        let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }

    CombinedLogger::init(loggers).context("initializing logger")?;
    Ok(())
}

type Component = (&'static str, Arc<AtomicBool>, Option<std::thread::JoinHandle<()>>);

/// Stops components in order: no new requests, no new polls or schedule
/// fires, then the save worker drains what is queued.
fn perform_shutdown(components: &mut [Component]) {
    log::info!("");
    log::info!("=========================================");
    log::info!("       Initiating Graceful Shutdown");
    log::info!("=========================================");

    for (name, running, handle) in components.iter_mut() {
        let Some(handle) = handle.take() else {
            continue;
        };
        running.store(false, Ordering::Relaxed);
        log::info!("  Waiting for {}...", name);
        match join_with_timeout(handle, Duration::from_secs(5)) {
            Ok(()) => log::info!("  ✅ {} stopped gracefully", name),
            Err(JoinError::Timeout) => log::warn!("  ⚠️  {} didn't stop in time, continuing...", name),
            Err(JoinError::Panic(e)) => log::error!("  ❌ {} panicked during shutdown: {:?}", name, e),
        }
    }

    log::info!("=========================================");
    log::info!("       Shutdown Complete");
    log::info!("=========================================");
}

fn join_with_timeout(handle: std::thread::JoinHandle<()>, timeout: Duration) -> Result<(), JoinError> {
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if handle.is_finished() {
            return handle.join().map_err(JoinError::Panic);
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    Err(JoinError::Timeout)
}

#[derive(Debug)]
enum JoinError {
    Timeout,
    Panic(Box<dyn std::any::Any + Send + 'static>),
}
