//! Subcommand handlers.

pub mod config_cmd;
pub mod serve;
pub mod snapshot;

use std::path::Path;

use vpcviz_config::Config;
use vpcviz_core::{InventoryClient, StaticInventory};

use crate::error::CliError;

/// Where a command reads inventory from.
pub enum Source {
    Live(InventoryClient),
    Fixture(StaticInventory),
}

impl Source {
    /// A fixture file wins over the configured inventory endpoint.
    pub fn resolve(cfg: &Config, fixture: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = fixture {
            tracing::info!(path = %path.display(), "reading inventory from fixture");
            return Ok(Self::Fixture(StaticInventory::from_json_file(path)?));
        }
        let inventory = vpcviz_config::to_inventory_config(&cfg.inventory)?;
        Ok(Self::Live(inventory.build_client()?))
    }
}
