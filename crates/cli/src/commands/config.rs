//! Raw config field access

use anyhow::Result;
use boardpilot_codec::{ConfigField, decode_field_value, hex_to_bytes};
use tracing::debug;

use crate::client::BoardClient;
use crate::commands::{ConfigCommands, Context};
use crate::error::CliError;
use crate::output;

pub async fn execute(cmd: &ConfigCommands, ctx: &Context) -> Result<()> {
    // Validate the payload before touching the service
    let payload = match cmd {
        ConfigCommands::Write { data, .. } => Some(
            hex_to_bytes(data.trim()).map_err(|e| CliError::ValidationError(e.to_string()))?,
        ),
        ConfigCommands::Read { .. } => None,
    };

    let client = BoardClient::connect(&ctx.config).await?;
    let result = match cmd {
        ConfigCommands::Read { field, raw } => read_field(&client, ctx, *field, *raw).await,
        ConfigCommands::Write { field, no_save, .. } => {
            write_field(&client, ctx, *field, payload.unwrap_or_default(), !no_save).await
        }
    };
    client.close();
    result
}

async fn read_field(client: &BoardClient, ctx: &Context, field: ConfigField, raw: bool) -> Result<()> {
    let device = client.resolve_device(ctx.device(), &ctx.config)?;
    let data = client
        .rpc()
        .read_field_bytes(&device, field)
        .await
        .map_err(CliError::from)?;
    debug!(field = %field, len = data.len(), "Field read");

    if raw {
        output::print_raw(field, &data, ctx.json);
        return Ok(());
    }
    match decode_field_value(field, &data) {
        Ok(value) => output::print_field_value(field, &value, ctx.json),
        Err(e) => {
            debug!(error = %e, "Payload did not decode, showing raw bytes");
            output::print_raw(field, &data, ctx.json);
        }
    }
    Ok(())
}

async fn write_field(
    client: &BoardClient,
    ctx: &Context,
    field: ConfigField,
    data: Vec<u8>,
    save: bool,
) -> Result<()> {
    let device = client.resolve_device(ctx.device(), &ctx.config)?;
    let save = if save && field.is_transient() {
        debug!(field = %field, "Field is transient, writing without save");
        false
    } else {
        save
    };
    client
        .rpc()
        .write_field_bytes(&device, field, &data, save)
        .await
        .map_err(CliError::from)?;

    output::print_success(
        &format!("Wrote {} bytes to {} on {}", data.len(), field, device.serial()),
        ctx.json,
    );
    Ok(())
}
