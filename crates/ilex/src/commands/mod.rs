//! Command dispatch: bridges CLI args -> coordinator -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod status;
pub mod watch;

use ilex_core::{Coordinator, IlexClient};

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Dispatch a portal-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, resolved: Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(&resolved, global).await,
        Command::Devices(args) => devices::handle(args, &resolved, global).await,
        Command::Watch(args) => watch::handle(args, resolved, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Log in and run the startup refresh cycle.
pub async fn connect(resolved: &Resolved) -> Result<Coordinator<IlexClient>, CliError> {
    Coordinator::connect(&resolved.bridge)
        .await
        .map_err(|e| CliError::from_core(e, &resolved.profile_name))
}
