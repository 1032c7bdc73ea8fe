//! `vpcviz snapshot`: one refresh of one lineage, printed as JSON.

use serde::Serialize;

use vpcviz_config::Config;
use vpcviz_core::{Engine, Inventory};

use super::Source;
use crate::cli::{LineageArg, SnapshotArgs};
use crate::error::CliError;

pub async fn handle(args: &SnapshotArgs, cfg: &Config) -> Result<(), CliError> {
    let engine_config = vpcviz_config::to_engine_config(&cfg.engine);

    let json = match Source::resolve(cfg, args.fixture.as_deref())? {
        Source::Live(client) => {
            refresh_once(&Engine::new(engine_config, client), args.lineage, args.compact).await?
        }
        Source::Fixture(fixture) => {
            refresh_once(&Engine::new(engine_config, fixture), args.lineage, args.compact).await?
        }
    };

    println!("{json}");
    Ok(())
}

async fn refresh_once<I: Inventory>(
    engine: &Engine<I>,
    lineage: LineageArg,
    compact: bool,
) -> Result<String, CliError> {
    match lineage {
        LineageArg::Vpc => to_json(&*engine.refresh_networks().await?, compact),
        LineageArg::Stack => to_json(&*engine.refresh_stacks().await?, compact),
    }
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String, CliError> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(json)
}
