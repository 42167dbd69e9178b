//! # PAC Host
//!
//! Serves a Proxy Auto-Configuration script generated from a domain list
//! and the operator's proxy directives.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default config path
//! pac-host
//!
//! # Run with custom config
//! pac-host -c /path/to/config.yaml
//!
//! # Override the listen address
//! pac-host --address 0.0.0.0 --port 8000
//!
//! # Increase verbosity
//! pac-host -vvvv  # trace level
//! ```
//!
//! The proxy file (default `proxies.txt`) must hold `;`-separated
//! directives, e.g. `PROXY 127.0.0.1:8118; SOCKS5 127.0.0.1:1080`.

use clap::Parser;
use pac_host::config::AppConfig;
use pac_host::logging;
use pac_host::server::PacServer;
use std::path::PathBuf;
use tracing::{error, info};

/// Serves a generated PAC script over HTTP.
#[derive(Parser, Debug)]
#[command(name = "pac-host")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "PAC_ADDRESS")]
    address: Option<String>,

    /// Listen port (overrides config)
    #[arg(short, long, env = "PAC_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace, -vvvv trace+deps)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Converts verbosity count to log level string
    fn log_level(&self) -> Option<String> {
        if self.quiet {
            return Some("error".to_string());
        }
        match self.verbose {
            0 => None,
            1 => Some("info".to_string()),
            2 => Some("debug".to_string()),
            _ => Some("trace".to_string()),
        }
    }

    /// Whether to include verbose dependency logging
    fn trace_deps(&self) -> bool {
        self.verbose >= 4
    }

    /// Applies `--address` and `--port` to the configured listen address.
    fn apply_overrides(&self, config: &mut AppConfig) {
        if self.address.is_none() && self.port.is_none() {
            return;
        }

        let (host, port) = match config.server.listen.rsplit_once(':') {
            Some((host, port)) => (host.to_string(), port.to_string()),
            None => (config.server.listen.clone(), String::new()),
        };
        let host = self.address.clone().unwrap_or(host);
        let port = self.port.map(|p| p.to_string()).unwrap_or(port);

        config.server.listen = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };
    }
}

/// Application entry point.
#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = load_config(&args);
    args.apply_overrides(&mut config);

    let log_level = args.log_level();
    let _log_guard = match logging::init_logging(&config.logging, log_level, args.trace_deps()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen,
        domains = %config.sources.domains_file.display(),
        proxies = %config.sources.proxies_file.display(),
        "Starting pac-host"
    );

    let handle = match PacServer::new(&config) {
        Ok(server) => match server.start().await {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Failed to start PAC server");
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!(error = %e, "Failed to create PAC server");
            std::process::exit(1);
        }
    };

    println!("PAC host at http://{}/", handle.local_addr());

    let trigger = handle.shutdown_trigger();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutting down");
        trigger.trigger();
    });

    if let Err(e) = handle.wait().await {
        error!(error = %e, "PAC server error");
        std::process::exit(1);
    }
}

/// Load configuration from file or use defaults
fn load_config(args: &Args) -> AppConfig {
    let config_path = args.config.clone().or_else(|| {
        let defaults = ["./config.yaml", "./config.yml", "/etc/pac-host/config.yaml"];
        defaults.into_iter().map(PathBuf::from).find(|p| p.exists())
    });

    match config_path {
        Some(path) => match AppConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: Failed to load config from {:?}: {}", path, e);
                eprintln!("Using default configuration");
                AppConfig::default()
            }
        },
        None => AppConfig::default(),
    }
}
