//! Config field listing

use anyhow::Result;

use crate::commands::FieldCommands;
use crate::output;

pub fn execute(cmd: &FieldCommands, json: bool) -> Result<()> {
    match cmd {
        FieldCommands::List => output::print_field_list(json),
    }
    Ok(())
}
