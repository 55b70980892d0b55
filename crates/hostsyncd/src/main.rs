// # hostsyncd - container hosts-file daemon
//
// Thin integration layer: reads configuration from environment variables,
// sets up logging and signal handling, and runs the sync engine from
// hostsync-core against the Docker runtime adapter. No synchronization
// logic lives here.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `HOSTS_FILE`: path of the hosts file to manage (default: /etc/hosts)
// - `ENABLE_LABEL_FILTER`: only manage labeled containers (default: false)
// - `LABEL_KEY`: filter label key (default: hoster.enable)
// - `LABEL_VALUE`: filter label value (default: true)
// - `LOG_LEVEL`: trace|debug|info|warn|error (default: info)
// - `DOCKER_HOST`: Docker daemon address (default: local socket)
//
// ## Example
//
// ```bash
// export HOSTS_FILE=/etc/hosts
// export ENABLE_LABEL_FILTER=true
// export LABEL_KEY=hoster.enable
// export LABEL_VALUE=true
//
// hostsyncd
// ```

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use hostsync_core::{FileHostsStore, SyncConfig, SyncEngine};
use hostsync_docker::DockerRuntime;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Environment-derived application configuration
struct Config {
    hosts_file: String,
    enable_label_filter: bool,
    label_key: String,
    label_value: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self {
            hosts_file: env::var("HOSTS_FILE").unwrap_or_else(|_| "/etc/hosts".to_string()),
            enable_label_filter: env::var("ENABLE_LABEL_FILTER")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            label_key: env::var("LABEL_KEY").unwrap_or_else(|_| "hoster.enable".to_string()),
            label_value: env::var("LABEL_VALUE").unwrap_or_else(|_| "true".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.hosts_file.is_empty() {
            anyhow::bail!("HOSTS_FILE cannot be empty");
        }

        if self.enable_label_filter {
            if self.label_key.is_empty() {
                anyhow::bail!(
                    "LABEL_KEY cannot be empty when ENABLE_LABEL_FILTER=true. \
                    Set it via: export LABEL_KEY=hoster.enable"
                );
            }
            if self.label_value.is_empty() {
                anyhow::bail!("LABEL_VALUE cannot be empty when ENABLE_LABEL_FILTER=true");
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the engine configuration
    fn to_sync_config(&self) -> SyncConfig {
        let mut config = SyncConfig::new();
        config.hosts_file = self.hosts_file.clone().into();
        config.filter.enabled = self.enable_label_filter;
        config.filter.label_key = self.label_key.clone();
        config.filter.label_value = self.label_value.clone();
        config
    }
}

fn main() -> ExitCode {
    let config = Config::from_env();

    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("starting hostsyncd");
    info!("hosts file: {}", config.hosts_file);
    if config.enable_label_filter {
        info!(
            "label filter enabled: {}={}",
            config.label_key, config.label_value
        );
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => DaemonExitCode::CleanShutdown,
            Err(e) => {
                error!("daemon error: {}", e);
                DaemonExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let runtime = DockerRuntime::connect()?;
    runtime.ping().await?;
    info!("connected to Docker daemon");

    let store = FileHostsStore::new(&config.hosts_file);
    let sync_config = config.to_sync_config();

    let (engine, _events) = SyncEngine::new(Arc::new(runtime), Box::new(store), sync_config)?;

    // Translate SIGTERM/SIGINT into the engine's shutdown signal so the
    // managed block is cleared before exit.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(name) => info!("received {}", name),
            Err(e) => error!("signal handling error: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    engine.run_with_shutdown(shutdown_rx).await?;
    info!("hostsyncd stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for CTRL-C (non-Unix fallback)
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
