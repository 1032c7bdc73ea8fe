// ── Runtime engine configuration ──
//
// These types describe how to reach the inventory service and how often
// to refresh and push. They carry credentials but never touch disk; the
// binary builds them from `vpcviz-config` and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;
use vpcviz_api::{InventoryClient, TlsMode, TransportConfig};

use crate::error::CoreError;

/// TLS verification strategy for the inventory endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed gateways).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Where the inventory lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// Base URL, e.g. `https://inventory.example.com/v1/`.
    pub endpoint: Url,
    pub api_key: SecretString,
    /// Every listing is scoped to this region.
    pub region: String,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Records requested per page.
    pub page_size: i32,
}

impl InventoryConfig {
    /// Build the HTTP inventory client this config describes.
    pub fn build_client(&self) -> Result<InventoryClient, CoreError> {
        let transport = TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        };
        let client = InventoryClient::from_api_key(
            self.endpoint.as_str(),
            &self.api_key,
            self.region.clone(),
            &transport,
        )
        .map_err(|e| CoreError::Config {
            message: format!("cannot build inventory client: {e}"),
        })?;
        Ok(client.with_page_size(self.page_size))
    }
}

/// Refresh and push cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delay between the end of one refresh and the start of the next.
    /// Zero disables periodic refresh; the startup refresh still runs.
    pub refresh_interval: Duration,
    /// Delay between pushes to one live viewer.
    pub push_interval: Duration,
    /// Concurrent child listings per parent.
    pub fetch_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60),
            push_interval: Duration::from_secs(10),
            fetch_concurrency: 4,
        }
    }
}
