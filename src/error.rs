//! Error types for the pac-host application.
//!
//! This module defines all error types used throughout the application,
//! providing structured error handling with context.

use thiserror::Error;

/// Main error type for the pac-host application.
#[derive(Error, Debug)]
pub enum PacError {
    /// Configuration file could not be found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}")]
    ConfigValidation { message: String },

    /// The operator has not provided a proxy configuration file.
    #[error("Proxy configuration not found: {path}")]
    ProxyConfigMissing { path: String },

    /// The proxy configuration file exists but holds no directives.
    #[error("Proxy configuration is empty: {path}")]
    ProxyConfigEmpty { path: String },

    /// The remote domain list could not be fetched.
    #[error("Failed to fetch {url}: {message}")]
    RemoteFetch { url: String, message: String },

    /// A template marker is missing or repeated.
    #[error("Template marker {marker} must appear exactly once, found {occurrences}")]
    TemplateInvariant {
        marker: &'static str,
        occurrences: usize,
    },

    /// The HTTP listener failed.
    #[error("Server error: {message}")]
    Server { message: String },

    /// I/O error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PacError {
    /// Creates a new configuration parse error.
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
        }
    }

    /// Creates a new configuration validation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Creates a new remote fetch error.
    pub fn remote_fetch(url: impl Into<String>, message: impl ToString) -> Self {
        Self::RemoteFetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Creates a new server error.
    pub fn server(message: impl ToString) -> Self {
        Self::Server {
            message: message.to_string(),
        }
    }

    /// Whether the operator must fix the proxy configuration.
    ///
    /// This is the only error class whose guidance reaches HTTP clients.
    pub fn is_proxy_config_error(&self) -> bool {
        matches!(
            self,
            Self::ProxyConfigMissing { .. } | Self::ProxyConfigEmpty { .. }
        )
    }
}

/// Result type alias using PacError.
pub type Result<T> = std::result::Result<T, PacError>;
