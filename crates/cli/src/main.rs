//! boardctl - hid:ergo keyboard configuration CLI
//!
//! Talks to the BoardPilot background service to list keyboards and read or
//! change their keymap, trackpad, sensitivity and clock settings.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod client;
mod commands;
mod completion;
mod config;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::*;
use crate::config::AppConfig;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "boardctl")]
#[command(about = "BoardPilot CLI - Configure hid:ergo keyboards")]
#[command(version)]
#[command(long_about = "
boardctl talks to the BoardPilot background service to list connected
keyboards and to read or change their configuration: keymap rebinds,
trackpad registers, pointer sensitivity and the on-board clock.

Use --json for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file path
    #[arg(long, global = true, env = "BOARDCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Service address, overrides the config file
    #[arg(long, global = true, env = "BOARDCTL_ADDRESS")]
    address: Option<String>,

    /// Service port, overrides the config file
    #[arg(long, global = true, env = "BOARDCTL_PORT")]
    port: Option<u16>,

    /// Target keyboard serial
    #[arg(short, long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keyboard discovery and selection
    #[command(subcommand)]
    Device(DeviceCommands),

    /// Config field catalogue
    #[command(subcommand)]
    Field(FieldCommands),

    /// Raw config field access
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Keymap rebinds
    #[command(subcommand)]
    Keymap(KeymapCommands),

    /// Trackpad registers
    #[command(subcommand)]
    Trackpad(TrackpadCommands),

    /// Pointer sensitivity
    #[command(subcommand)]
    Sensitivity(SensitivityCommands),

    /// Keyboard clock
    #[command(subcommand)]
    Datetime(DatetimeCommands),

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_default| {
                format!("boardctl={log_level},boardpilot_ipc={log_level}").into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let code = e
                .downcast_ref::<CliError>()
                .map(CliError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn load_config(cli: &Cli) -> Result<(AppConfig, PathBuf)> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::default_config_path()?,
    };
    let mut config = AppConfig::load_from_path(&path).await?;

    if let Some(address) = &cli.address {
        config.service.address = address.clone();
    }
    if let Some(port) = cli.port {
        config.service.port = port;
    }
    config.validate()?;
    Ok((config, path))
}

async fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Completion { shell } => {
            completion::generate_completion(*shell);
            return Ok(());
        }
        // Offline
        Commands::Field(cmd) => return commands::field::execute(cmd, cli.json),
        _ => {}
    }

    let (config, config_path) = load_config(cli).await?;
    let mut ctx = Context {
        json: cli.json,
        config,
        config_path,
        device: cli.device.clone(),
    };

    match &cli.command {
        Commands::Device(cmd) => commands::device::execute(cmd, &mut ctx).await,
        Commands::Config(cmd) => commands::config::execute(cmd, &ctx).await,
        Commands::Keymap(cmd) => commands::keymap::execute(cmd, &ctx).await,
        Commands::Trackpad(cmd) => commands::trackpad::execute(cmd, &ctx).await,
        Commands::Sensitivity(cmd) => commands::sensitivity::execute(cmd, &ctx).await,
        Commands::Datetime(cmd) => commands::datetime::execute(cmd, &ctx).await,
        Commands::Field(cmd) => commands::field::execute(cmd, ctx.json),
        Commands::Completion { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardpilot_codec::ConfigField;
    use clap::Parser;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    // --- Global flag parsing ---

    #[test]
    fn parse_device_list_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["boardctl", "device", "list"])?;
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
        assert!(cli.device.is_none());
        assert!(matches!(
            cli.command,
            Commands::Device(DeviceCommands::List { detailed: false })
        ));
        Ok(())
    }

    #[test]
    fn parse_global_json_flag_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["boardctl", "device", "list", "--json"])?;
        assert!(cli.json);
        Ok(())
    }

    #[test]
    fn parse_verbose_levels() -> TestResult {
        let cli = Cli::try_parse_from(["boardctl", "-vv", "field", "list"])?;
        assert_eq!(cli.verbose, 2);
        Ok(())
    }

    #[test]
    fn parse_service_overrides() -> TestResult {
        let cli = Cli::try_parse_from([
            "boardctl",
            "--address",
            "10.0.0.5",
            "--port",
            "4000",
            "--device",
            "ABC123",
            "sensitivity",
            "show",
        ])?;
        assert_eq!(cli.address.as_deref(), Some("10.0.0.5"));
        assert_eq!(cli.port, Some(4000));
        assert_eq!(cli.device.as_deref(), Some("ABC123"));
        Ok(())
    }

    // --- Command parsing ---

    #[test]
    fn parse_config_read_by_name() -> TestResult {
        let cli = Cli::try_parse_from(["boardctl", "config", "read", "custom_iqs5xx_regs"])?;
        match &cli.command {
            Commands::Config(ConfigCommands::Read { field, raw }) => {
                assert_eq!(*field, ConfigField::CustomIqs5xxRegs);
                assert!(!raw);
            }
            _ => return Err("expected Config Read command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_config_write_no_save() -> TestResult {
        let cli =
            Cli::try_parse_from(["boardctl", "config", "write", "0x40", "1e", "--no-save"])?;
        match &cli.command {
            Commands::Config(ConfigCommands::Write {
                field,
                data,
                no_save,
            }) => {
                assert_eq!(*field, ConfigField::MouseSensitivity);
                assert_eq!(data, "1e");
                assert!(no_save);
            }
            _ => return Err("expected Config Write command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_keymap_set() -> TestResult {
        let cli = Cli::try_parse_from([
            "boardctl", "keymap", "set", "13", "0", "KEY_PRESS", "0x70005",
        ])?;
        match &cli.command {
            Commands::Keymap(KeymapCommands::Set {
                key,
                layer,
                behavior,
                param1,
                param2,
                no_save,
            }) => {
                assert_eq!((*key, *layer, *behavior), (13, 0, 6));
                assert_eq!(*param1, 0x0007_0005);
                assert_eq!(*param2, 0);
                assert!(!no_save);
            }
            _ => return Err("expected Keymap Set command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_keymap_clear_all() -> TestResult {
        let cli = Cli::try_parse_from(["boardctl", "keymap", "clear", "--all"])?;
        assert!(matches!(
            cli.command,
            Commands::Keymap(KeymapCommands::Clear { all: true, key: None, .. })
        ));
        Ok(())
    }

    #[test]
    fn parse_trackpad_set_hex_value() -> TestResult {
        let cli = Cli::try_parse_from(["boardctl", "trackpad", "set", "tap_time", "0xc8"])?;
        match &cli.command {
            Commands::Trackpad(TrackpadCommands::Set {
                register, value, ..
            }) => {
                assert_eq!(register, "tap_time");
                assert_eq!(*value, 200);
            }
            _ => return Err("expected Trackpad Set command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_sensitivity_set() -> TestResult {
        let cli = Cli::try_parse_from(["boardctl", "sensitivity", "set", "scroll", "40"])?;
        assert!(matches!(
            cli.command,
            Commands::Sensitivity(SensitivityCommands::Set {
                kind: SensitivityKind::Scroll,
                value: 40,
                no_save: false,
            })
        ));
        Ok(())
    }

    #[test]
    fn parse_completion_bash() -> TestResult {
        let cli = Cli::try_parse_from(["boardctl", "completion", "bash"])?;
        assert!(matches!(cli.command, Commands::Completion { .. }));
        Ok(())
    }

    // --- Rejection / error cases ---

    #[test]
    fn reject_no_subcommand() {
        let result = Cli::try_parse_from(["boardctl"]);
        assert!(result.is_err());
    }

    #[test]
    fn reject_unknown_field_name() {
        let result = Cli::try_parse_from(["boardctl", "config", "read", "bogus_field"]);
        assert!(result.is_err());
    }

    #[test]
    fn reject_keymap_clear_without_target() {
        let result = Cli::try_parse_from(["boardctl", "keymap", "clear"]);
        assert!(result.is_err());
    }

    #[test]
    fn reject_unknown_behavior() {
        let result = Cli::try_parse_from(["boardctl", "keymap", "set", "1", "0", "WARP"]);
        assert!(result.is_err());
    }

    #[test]
    fn reject_sensitivity_out_of_range() {
        let result = Cli::try_parse_from(["boardctl", "sensitivity", "set", "mouse", "300"]);
        assert!(result.is_err());
    }

    #[test]
    fn reject_unknown_sensitivity_kind() {
        let result = Cli::try_parse_from(["boardctl", "sensitivity", "set", "tilt", "3"]);
        assert!(result.is_err());
    }
}
