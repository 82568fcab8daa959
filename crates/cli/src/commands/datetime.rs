//! Keyboard clock commands

use anyhow::Result;
use boardpilot_codec::DateTimeValue;
use chrono::{DateTime, Local, Offset, TimeZone};

use crate::client::BoardClient;
use crate::commands::{Context, DatetimeCommands};
use crate::error::CliError;
use crate::output;

pub async fn execute(cmd: &DatetimeCommands, ctx: &Context) -> Result<()> {
    let client = BoardClient::connect(&ctx.config).await?;
    let result = match cmd {
        DatetimeCommands::Sync => sync_clock(&client, ctx).await,
    };
    client.close();
    result
}

/// Clock payload for a point in time in a given zone
pub fn datetime_value<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<DateTimeValue, CliError> {
    let timestamp = i32::try_from(now.timestamp()).map_err(|_overflow| {
        CliError::ValidationError(format!("timestamp {} does not fit 32 bits", now.timestamp()))
    })?;
    let offset = now.offset().fix().local_minus_utc();
    Ok(DateTimeValue::new(timestamp, offset))
}

async fn sync_clock(client: &BoardClient, ctx: &Context) -> Result<()> {
    let device = client.resolve_device(ctx.device(), &ctx.config)?;
    let now = Local::now();
    let value = datetime_value(&now)?;

    client
        .rpc()
        .write_datetime(&device, value)
        .await
        .map_err(CliError::from)?;
    output::print_success(
        &format!("Clock set to {}", now.format("%Y-%m-%d %H:%M:%S %:z")),
        ctx.json,
    );
    Ok(())
}
