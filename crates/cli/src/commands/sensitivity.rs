//! Pointer sensitivity commands

use anyhow::Result;

use crate::client::BoardClient;
use crate::commands::{Context, SensitivityCommands, SensitivityKind};
use crate::error::CliError;
use crate::output;

pub async fn execute(cmd: &SensitivityCommands, ctx: &Context) -> Result<()> {
    let client = BoardClient::connect(&ctx.config).await?;
    let result = run(&client, cmd, ctx).await;
    client.close();
    result
}

async fn run(client: &BoardClient, cmd: &SensitivityCommands, ctx: &Context) -> Result<()> {
    let device = client.resolve_device(ctx.device(), &ctx.config)?;
    let rpc = client.rpc();

    match cmd {
        SensitivityCommands::Show => {
            let mut values = Vec::with_capacity(SensitivityKind::ALL.len());
            for kind in SensitivityKind::ALL {
                let value = rpc
                    .read_sensitivity(&device, kind.field())
                    .await
                    .map_err(CliError::from)?;
                values.push((kind.label(), value));
            }
            output::print_sensitivities(&values, ctx.json);
        }
        SensitivityCommands::Set {
            kind,
            value,
            no_save,
        } => {
            rpc.write_sensitivity(&device, kind.field(), *value, !no_save)
                .await
                .map_err(CliError::from)?;
            output::print_success(
                &format!("Set {} sensitivity to {value}", kind.label()),
                ctx.json,
            );
        }
    }
    Ok(())
}
