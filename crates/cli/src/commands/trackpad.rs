//! Trackpad register commands

use anyhow::Result;
use boardpilot_codec::TrackpadRegisters;

use crate::client::BoardClient;
use crate::commands::{Context, TrackpadCommands};
use crate::error::CliError;
use crate::output;

pub async fn execute(cmd: &TrackpadCommands, ctx: &Context) -> Result<()> {
    if let TrackpadCommands::Set { register, .. } = cmd {
        if !TrackpadRegisters::REGISTER_NAMES.contains(&register.as_str()) {
            return Err(CliError::ValidationError(format!(
                "unknown register '{register}', expected one of: {}",
                TrackpadRegisters::REGISTER_NAMES.join(", ")
            ))
            .into());
        }
    }

    let client = BoardClient::connect(&ctx.config).await?;
    let result = run(&client, cmd, ctx).await;
    client.close();
    result
}

async fn run(client: &BoardClient, cmd: &TrackpadCommands, ctx: &Context) -> Result<()> {
    let device = client.resolve_device(ctx.device(), &ctx.config)?;
    let rpc = client.rpc();

    match cmd {
        TrackpadCommands::Show => {
            let regs = rpc
                .read_trackpad_registers(&device)
                .await
                .map_err(CliError::from)?;
            output::print_trackpad(&regs, ctx.json);
        }
        TrackpadCommands::Set {
            register,
            value,
            no_save,
        } => {
            let mut regs = rpc
                .read_trackpad_registers(&device)
                .await
                .map_err(CliError::from)?;
            match regs.set_by_name(register, *value) {
                Some(Ok(())) => {}
                Some(Err(e)) => return Err(CliError::ValidationError(e.to_string()).into()),
                None => {
                    return Err(
                        CliError::ValidationError(format!("unknown register '{register}'")).into(),
                    );
                }
            }
            rpc.write_trackpad_registers(&device, &regs, !no_save)
                .await
                .map_err(CliError::from)?;
            output::print_success(&format!("Set {register} to {value}"), ctx.json);
        }
        TrackpadCommands::Defaults { no_save } => {
            rpc.write_trackpad_registers(&device, &TrackpadRegisters::default(), !no_save)
                .await
                .map_err(CliError::from)?;
            output::print_success("Restored default trackpad registers", ctx.json);
        }
    }
    Ok(())
}
