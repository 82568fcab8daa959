//! Keymap rebind commands

use anyhow::Result;
use boardpilot_codec::{DEFAULT_REBIND_CAPACITY, KeyDef};
use tracing::info;

use crate::client::BoardClient;
use crate::commands::{Context, KeymapCommands};
use crate::error::CliError;
use crate::output;

pub async fn execute(cmd: &KeymapCommands, ctx: &Context) -> Result<()> {
    let client = BoardClient::connect(&ctx.config).await?;
    let result = run(&client, cmd, ctx).await;
    client.close();
    result
}

async fn run(client: &BoardClient, cmd: &KeymapCommands, ctx: &Context) -> Result<()> {
    let device = client.resolve_device(ctx.device(), &ctx.config)?;
    let rpc = client.rpc();
    let mut defs = rpc.read_keymap(&device).await.map_err(CliError::from)?;

    match cmd {
        KeymapCommands::Show => {
            output::print_keymap(&defs, ctx.json);
            return Ok(());
        }
        KeymapCommands::Set {
            key,
            layer,
            behavior,
            param1,
            param2,
            no_save,
        } => {
            let def = KeyDef::new(*key, *layer, *behavior, *param1, *param2)
                .map_err(|e| CliError::ValidationError(e.to_string()))?;
            upsert(&mut defs, def)?;
            rpc.write_keymap(&device, &defs, !no_save)
                .await
                .map_err(CliError::from)?;
            info!(key, layer, "Rebind written");
            output::print_success(&format!("Bound key {key} on layer {layer}"), ctx.json);
        }
        KeymapCommands::Clear {
            key,
            layer,
            all,
            no_save,
        } => {
            let removed = if *all {
                let count = defs.len();
                defs.clear();
                count
            } else {
                match (key, layer) {
                    (Some(key), Some(layer)) => remove(&mut defs, *key, *layer),
                    _ => {
                        return Err(CliError::ValidationError(
                            "key and layer are required without --all".into(),
                        )
                        .into());
                    }
                }
            };
            rpc.write_keymap(&device, &defs, !no_save)
                .await
                .map_err(CliError::from)?;
            output::print_success(&format!("Removed {removed} rebind(s)"), ctx.json);
        }
    }
    Ok(())
}

/// Replace the rebind for the same key and layer, or append
fn upsert(defs: &mut Vec<KeyDef>, def: KeyDef) -> Result<(), CliError> {
    if let Some(existing) = defs
        .iter_mut()
        .find(|d| d.key == def.key && d.layer == def.layer)
    {
        *existing = def;
        return Ok(());
    }
    if defs.len() >= DEFAULT_REBIND_CAPACITY {
        return Err(CliError::ValidationError(format!(
            "keymap is full ({DEFAULT_REBIND_CAPACITY} rebinds)"
        )));
    }
    defs.push(def);
    Ok(())
}

fn remove(defs: &mut Vec<KeyDef>, key: u16, layer: u8) -> usize {
    let before = defs.len();
    defs.retain(|d| !(d.key == key && d.layer == layer));
    before - defs.len()
}
