//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = vpcviz_config::load_config(global.config.as_deref())?;
            print!("{}", cfg.to_toml_redacted()?);
        }
        ConfigCommand::Path => {
            // Reported even when the file does not exist yet.
            let path = global
                .config
                .clone()
                .unwrap_or_else(vpcviz_config::config_path);
            println!("{}", path.display());
        }
    }
    Ok(())
}
