//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod locks;
pub mod passage;
pub mod passcodes;
pub mod watch;

use ttlock_core::{CommandResult, ControllerConfig, LockId};

use crate::cli::{Command, GlobalOpts, PasscodeCommand};
use crate::error::CliError;

/// Dispatch a cloud-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: ControllerConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => locks::status(config, global).await,
        Command::Lock(args) => locks::bolt(config, args.id, true, global).await,
        Command::Unlock(args) => locks::bolt(config, args.id, false, global).await,
        Command::PassageMode(args) => passage::handle(config, args, global).await,
        Command::Passcode(args) => match args.command {
            PasscodeCommand::Add {
                id,
                name,
                code,
                start,
                end,
            } => passcodes::add(config, id, name, code, (start, end), global).await,
            PasscodeCommand::List { id } => passcodes::list(config, id, global).await,
            PasscodeCommand::Cleanup { id } => passcodes::cleanup(config, id, global).await,
        },
        Command::Watch(args) => watch::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "configuration commands are not dispatched to a session".into(),
        )),
    }
}

/// Turn a routed command's outcome into a CLI result.
pub(crate) fn expect_success(
    result: &CommandResult,
    id: LockId,
    action: &str,
) -> Result<(), CliError> {
    match result {
        CommandResult::Ok | CommandResult::Removed(_) => Ok(()),
        CommandResult::Ignored => Err(CliError::LockNotFound { id: id.get() }),
        CommandResult::Failed => Err(CliError::CommandFailed {
            action: action.into(),
        }),
    }
}

/// Print a status line to stderr unless `--quiet`.
pub(crate) fn notify(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}
