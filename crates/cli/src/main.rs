//! Binary entrypoint for `invtrack-idgen`.

mod cli;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;

use invtrack_core::AggregateId;
use invtrack_custom_id::{FormatDefinition, RenderContext};
use invtrack_infra::config::InfraConfig;
use invtrack_infra::sequence::build_allocator;
use invtrack_inventory::InventoryId;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    invtrack_observability::init(cli.log_format);

    match cli.command {
        Command::Validate { format } => {
            let definition =
                invtrack_custom_id::parse(&format).context("format definition rejected")?;
            println!("{}", invtrack_custom_id::serialize(&definition));
        }
        Command::Preview {
            format,
            count,
            start,
            at,
        } => {
            let definition = match format {
                Some(raw) => {
                    invtrack_custom_id::parse(&raw).context("format definition rejected")?
                }
                None => load_config()?.default_id_format,
            };
            for line in preview(&definition, start, count, at.unwrap_or_else(Utc::now)) {
                println!("{line}");
            }
        }
        Command::Allocate { inventory, count } => {
            let config = load_config()?;
            let allocator = build_allocator(&config)
                .await
                .context("failed to set up sequence allocator")?;
            let inventory_id = InventoryId::new(AggregateId::from_uuid(inventory));

            allocator.initialize(inventory_id)?;
            for _ in 0..count {
                let ordinal = allocator
                    .allocate_next(inventory_id)
                    .with_context(|| format!("allocation failed for inventory {inventory_id}"))?;
                println!("{ordinal}");
            }
            tracing::info!(inventory_id = %inventory_id, count, "ordinals allocated");
        }
    }

    Ok(())
}

fn load_config() -> anyhow::Result<InfraConfig> {
    InfraConfig::from_env().context("invalid configuration")
}

/// `ordinal<TAB>identifier` lines for `count` ordinals starting at `start`.
fn preview(
    definition: &FormatDefinition,
    start: u64,
    count: u64,
    now: chrono::DateTime<Utc>,
) -> Vec<String> {
    let mut rng = rand::rng();
    let mut ctx = RenderContext::new(now, &mut rng);
    (0..count)
        .map_while(|offset| start.checked_add(offset))
        .map(|ordinal| format!("{ordinal}\t{}", definition.render(ordinal, &mut ctx)))
        .collect()
}
