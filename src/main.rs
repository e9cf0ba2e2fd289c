//! host-dns CLI
//!
//! Sets the host's DNS servers from a `Name=IP` list, or restores the
//! settings saved by the previous run.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use host_dns::{DnsError, DnsManager, Settings, SnapshotStore, config, flow, servers, util};

/// Exit status when not run as root / Administrator.
const EXIT_PRIVILEGE: u8 = 77;

/// Set or restore host DNS servers
#[derive(Parser)]
#[command(name = "host-dns")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Restore the settings saved by the previous run instead of setting new ones
    #[arg(long)]
    restore: bool,

    /// File of `Name=IP` lines listing up to three servers
    #[arg(short, long, default_value = "dnsConf.txt")]
    config: PathBuf,

    /// Where the pre-change snapshot is saved
    #[arg(long, default_value = config::DEFAULT_SNAPSHOT_FILE)]
    state: PathBuf,

    /// Shared resolver file edited as a last resort on Linux
    #[arg(long, default_value = config::DEFAULT_RESOLV_CONF)]
    resolv_conf: PathBuf,

    /// Timeout in seconds for each system command, 0 for none
    #[arg(long, default_value_t = 60)]
    command_timeout: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn settings(&self) -> Settings {
        let timeout = (self.command_timeout > 0).then(|| Duration::from_secs(self.command_timeout));
        Settings::default()
            .with_snapshot_path(&self.state)
            .with_resolv_conf(&self.resolv_conf)
            .with_command_timeout(timeout)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    if let Err(e) = flow::ensure_privileged(util::is_elevated()) {
        error!("{e}; run as root or Administrator");
        return ExitCode::from(EXIT_PRIVILEGE);
    }

    let result = if cli.restore { run_restore(&cli) } else { run_set(&cli) };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            if matches!(e.downcast_ref::<DnsError>(), Some(DnsError::PrivilegeDenied)) {
                ExitCode::from(EXIT_PRIVILEGE)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run_set(cli: &Cli) -> Result<()> {
    let settings = cli.settings();
    // Nothing is captured or changed until the list is known to be usable.
    let servers = servers::load_server_list(&cli.config)
        .with_context(|| format!("Failed to load DNS servers from {}", cli.config.display()))?;
    info!(servers = %servers, "Loaded DNS servers");

    let store = SnapshotStore::new(&settings.snapshot_path);
    let manager = DnsManager::for_current_host(settings)?;
    let outcome = flow::run_set(&manager, &store, &servers)?;

    for failure in &outcome.report.failures {
        warn!("{failure}");
    }
    if !outcome.is_success() {
        anyhow::bail!("DNS servers could not be applied on {}", manager.platform());
    }
    if !outcome.flushed {
        warn!("DNS cache was not flushed; old answers may linger until they expire");
    }
    for applied in &outcome.report.applied {
        println!("{}: {} ({})", applied.point, servers, applied.method);
    }
    Ok(())
}

fn run_restore(cli: &Cli) -> Result<()> {
    let settings = cli.settings();
    let store = SnapshotStore::new(&settings.snapshot_path);
    let manager = DnsManager::for_current_host(settings)?;
    let outcome = flow::run_restore(&manager, &store)
        .with_context(|| format!("Failed to restore from {}", store.path().display()))?;

    for point in &outcome.report.restored {
        println!("{point}: restored");
    }
    if !outcome.report.is_complete() {
        for failure in &outcome.report.failures {
            warn!("{failure}");
        }
        outcome.report.into_result().with_context(|| {
            format!("Snapshot kept at {} for another attempt", store.path().display())
        })?;
    }
    Ok(())
}
