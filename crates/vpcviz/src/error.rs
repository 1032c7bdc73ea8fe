//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and distinct exit codes.

use miette::Diagnostic;
use thiserror::Error;

use vpcviz_config::ConfigError;
use vpcviz_core::{CoreError, FetchError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONFIG: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Inventory ────────────────────────────────────────────────────
    #[error("Could not reach the inventory service: {reason}")]
    #[diagnostic(
        code(vpcviz::connection_failed),
        help(
            "Check inventory.endpoint in your config and that the service is reachable.\n\
             For a self-signed gateway set inventory.insecure = true or inventory.ca_cert."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Inventory rejected the API key")]
    #[diagnostic(
        code(vpcviz::auth_failed),
        help("Set VPCVIZ_API_KEY (or the variable named by inventory.api_key_env).")
    )]
    AuthFailed,

    #[error("Inventory request timed out after {seconds}s")]
    #[diagnostic(
        code(vpcviz::timeout),
        help("Raise inventory.timeout_secs or check the service's responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("Inventory error: {message}")]
    #[diagnostic(code(vpcviz::inventory))]
    Inventory { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(vpcviz::config),
        help("Run `vpcviz config path` to see which file is read, or pass --config.")
    )]
    Config(#[from] ConfigError),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vpcviz::validation))]
    Validation { field: String, reason: String },

    // ── Server ───────────────────────────────────────────────────────
    #[error("Could not bind {addr}")]
    #[diagnostic(
        code(vpcviz::bind),
        help("Another process may hold the port; choose one with --listen.")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(vpcviz::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Bind { .. } => exit_code::CONNECTION,
            Self::AuthFailed => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Config(_) => exit_code::CONFIG,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Inventory { .. } | Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Unreachable { reason } => CliError::ConnectionFailed { reason },
            FetchError::Unauthorized => CliError::AuthFailed,
            FetchError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            other @ (FetchError::Throttled { .. }
            | FetchError::Api { .. }
            | FetchError::Malformed { .. }) => CliError::Inventory {
                message: other.to_string(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Fetch(e) => e.into(),
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Serialization(e) => CliError::Json(e),
            other @ (CoreError::PartialFetch(_)
            | CoreError::Delivery(_)
            | CoreError::AlreadyRunning
            | CoreError::ShutDown) => CliError::Inventory {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_get_distinct_exit_codes() {
        let auth = CliError::from(CoreError::Fetch(FetchError::Unauthorized));
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let down = CliError::from(FetchError::Unreachable {
            reason: "connection refused".into(),
        });
        assert_eq!(down.exit_code(), exit_code::CONNECTION);

        let throttled = CliError::from(FetchError::Throttled { retry_after_secs: 2 });
        assert_eq!(throttled.exit_code(), exit_code::GENERAL);
        assert!(throttled.to_string().contains("retry after 2s"));
    }

    #[test]
    fn config_errors_exit_with_config_code() {
        let err = CliError::from(ConfigError::Validation {
            field: "inventory.endpoint".into(),
            reason: "not set".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONFIG);
        assert_eq!(err.to_string(), "invalid inventory.endpoint: not set");
    }
}
