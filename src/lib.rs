//! # PAC Host Library
//!
//! This crate generates a Proxy Auto-Configuration (PAC) script on demand
//! and serves it over HTTP. Hosts under the configured domain suffixes are
//! routed through the operator's proxies; everything else goes direct.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types and handling
//! - [`logging`]: Logging setup and configuration
//! - [`sources`]: Raw content strategies (cache file, remote fetch, default)
//! - [`domains`]: Domain list resolution and normalization
//! - [`proxies`]: Proxy directive resolution
//! - [`compiler`]: Compilation of domains and proxies into script fragments
//! - [`template`]: The PAC script template
//! - [`server`]: Per-request generation and the HTTP server lifecycle
//!
//! ## Example
//!
//! ```ignore
//! use pac_host::config::AppConfig;
//! use pac_host::server::PacServer;
//!
//! let config = AppConfig::load("config.yaml")?;
//! let handle = PacServer::new(&config)?.start().await?;
//! println!("PAC host at http://{}/", handle.local_addr());
//! handle.stop().await?;
//! ```
//!
//! ## Request Flow
//!
//! 1. **Proxies**: read from the operator's file; a missing file is a 500
//!    with instructions
//! 2. **Domains**: read from the cache, or fetched remotely and cached
//! 3. **Compile and render**: one clause per domain, proxies joined by `;`

pub mod compiler;
pub mod config;
pub mod domains;
pub mod error;
pub mod logging;
pub mod proxies;
pub mod server;
pub mod sources;
pub mod template;

pub use config::AppConfig;
pub use domains::{DomainSet, DomainSource};
pub use error::{PacError, Result};
pub use proxies::{ProxyList, ProxySource};
pub use server::{PacServer, PacService, ServerHandle, ShutdownTrigger};
pub use template::PacTemplate;
