//! Device management commands

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::BoardClient;
use crate::commands::{Context, DeviceCommands};
use crate::error::CliError;
use crate::output;

/// Execute device command
pub async fn execute(cmd: &DeviceCommands, ctx: &mut Context) -> Result<()> {
    let client = BoardClient::connect(&ctx.config).await?;

    let result = match cmd {
        DeviceCommands::List { detailed } => {
            list_devices(&client, ctx, *detailed);
            Ok(())
        }
        DeviceCommands::Watch => watch_devices(&client, ctx).await,
        DeviceCommands::Select { serial } => select_device(&client, ctx, serial).await,
    };
    client.close();
    result
}

fn list_devices(client: &BoardClient, ctx: &Context, detailed: bool) {
    let devices = client.devices();
    let selected = client.resolve_device(ctx.device(), &ctx.config).ok();
    output::print_device_list(&devices, selected.as_ref(), ctx.json, detailed);
}

/// Stream registry updates until Ctrl+C or the service goes away
async fn watch_devices(client: &BoardClient, ctx: &Context) -> Result<()> {
    if !ctx.json {
        println!("Watching devices (Press Ctrl+C to stop)");
        list_devices(client, ctx, false);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let registry = client.rpc().registry();
    let listener = registry.add_device_update_listener(move |update| {
        if tx.send(update.clone()).is_err() {
            debug!("Device watch ended");
        }
    });

    let mut status = client.rpc().subscribe_status();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            Some(update) = rx.recv() => output::print_device_update(&update, ctx.json),
            changed = status.changed() => {
                if changed.is_err() || !client.rpc().is_connected() {
                    registry.remove_device_update_listener(listener);
                    return Err(CliError::ServiceUnavailable("connection closed".into()).into());
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    registry.remove_device_update_listener(listener);
    Ok(())
}

/// Remember `serial` as the default device
async fn select_device(client: &BoardClient, ctx: &mut Context, serial: &str) -> Result<()> {
    let device = client.resolve_device(Some(serial), &ctx.config)?;
    ctx.config.default_device = Some(device.serial().to_string());
    ctx.config.save_to_path(&ctx.config_path).await?;

    output::print_success(
        &format!("Selected {} ({})", device.product_name(), device.serial()),
        ctx.json,
    );
    Ok(())
}
