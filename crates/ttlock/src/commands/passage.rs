//! Passage-mode command handler.

use ttlock_core::{Command as CoreCommand, Controller, ControllerConfig, PassageModeConfig};

use crate::cli::{GlobalOpts, PassageModeArgs};
use crate::error::CliError;

use super::{expect_success, notify};

/// Translate flags into a schedule. Rejects an empty timed window.
fn schedule(args: &PassageModeArgs) -> Result<PassageModeConfig, CliError> {
    if args.enabled && !args.all_day && args.start >= args.end {
        return Err(CliError::Validation {
            field: "--start/--end".into(),
            reason: "the window must end after it starts, or use --all-day".into(),
        });
    }
    Ok(PassageModeConfig {
        enabled: args.enabled,
        auto_unlock: args.auto_unlock,
        all_day: args.all_day,
        start_minute: args.start,
        end_minute: args.end,
        week_days: args.days.iter().map(|d| d.number()).collect(),
    })
}

pub async fn handle(
    config: ControllerConfig,
    args: PassageModeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let id = args.id;
    let schedule = schedule(&args)?;
    let cmd = CoreCommand::ConfigurePassageMode {
        id,
        config: schedule,
    };

    let result = Controller::oneshot(config, move |c| async move { c.execute(cmd).await }).await?;
    expect_success(&result, id, "passage-mode")?;

    let state = if args.enabled { "enabled" } else { "disabled" };
    notify(global, &format!("Lock {id}: passage mode {state}"));
    Ok(())
}
