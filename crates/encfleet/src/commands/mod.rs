//! Command dispatch: bridges CLI args -> `Fleet` operations -> output formatting.

pub mod bulk;
pub mod config_cmd;
pub mod control;
pub mod defaults;
pub mod discover;
pub mod local_subnet;
pub mod util;

use encfleet_core::Fleet;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, fleet: &Fleet, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Discover(args) => discover::handle(fleet, args, global).await,
        Command::Control(args) => control::handle_control(fleet, args, global).await,
        Command::Push(args) => control::handle_push(fleet, args, global).await,
        Command::BulkUpdate(args) => bulk::handle(fleet, args, global).await,
        // Offline commands are handled before dispatch
        Command::LocalSubnet
        | Command::Defaults(_)
        | Command::Config(_)
        | Command::Completions(_) => unreachable!(),
    }
}
