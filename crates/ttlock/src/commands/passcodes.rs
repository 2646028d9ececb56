//! Passcode command handlers.

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde_json::json;
use tabled::Tabled;
use ttlock_core::{
    Command as CoreCommand, CommandResult, Controller, ControllerConfig, CoreError, LockId,
    NewPasscode, Passcode,
};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::{expect_success, notify};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PasscodeRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Valid from")]
    start: String,
    #[tabled(rename = "Valid until")]
    end: String,
    #[tabled(rename = "Expired")]
    expired: String,
}

fn local_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "-".into(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

impl PasscodeRow {
    fn new(p: &Passcode, now: DateTime<Utc>) -> Self {
        Self {
            id: p.id,
            name: p.display_name(),
            code: p.passcode.clone().unwrap_or_else(|| "-".into()),
            kind: p.kind.to_string(),
            start: local_time(p.start),
            end: local_time(p.end),
            expired: if p.is_expired(now) { "yes" } else { "no" }.into(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn add(
    config: ControllerConfig,
    id: LockId,
    name: String,
    code: String,
    (start, end): (DateTime<FixedOffset>, DateTime<FixedOffset>),
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let passcode = NewPasscode {
        passcode: code,
        name,
        start: start.with_timezone(&Utc),
        end: end.with_timezone(&Utc),
    };
    // Reject locally before opening a session.
    passcode.validate()?;

    let label = passcode.name.clone();
    let cmd = CoreCommand::CreatePasscode { id, passcode };
    let result = Controller::oneshot(config, move |c| async move { c.execute(cmd).await }).await?;
    expect_success(&result, id, "passcode add")?;

    notify(global, &format!("Lock {id}: passcode '{label}' created"));
    Ok(())
}

pub async fn list(config: ControllerConfig, id: LockId, global: &GlobalOpts) -> Result<(), CliError> {
    let passcodes = Controller::oneshot(config, move |c| async move {
        if c.lock_state(id).is_none() {
            return Err(CoreError::UnknownLock { lock_id: id.get() });
        }
        c.list_passcodes(id).await
    })
    .await?;

    let now = Utc::now();
    let out = output::render_list(
        &global.output,
        &passcodes,
        |p| PasscodeRow::new(p, now),
        |p| p.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn cleanup(
    config: ControllerConfig,
    id: LockId,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let cmd = CoreCommand::CleanupPasscodes { id };
    let result = Controller::oneshot(config, move |c| async move { c.execute(cmd).await }).await?;
    expect_success(&result, id, "passcode cleanup")?;

    let removed = match result {
        CommandResult::Removed(names) => names,
        _ => Vec::new(),
    };

    let out = match global.output {
        OutputFormat::Table => summary(&removed),
        OutputFormat::Plain => removed.join("\n"),
        _ => output::render_single(
            &global.output,
            &json!({ "removed": removed }),
            |_| String::new(),
            |_| String::new(),
        )?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

fn summary(removed: &[String]) -> String {
    if removed.is_empty() {
        "No expired passcodes".into()
    } else {
        format!(
            "Removed {} expired passcode(s): {}",
            removed.len(),
            removed.join(", ")
        )
    }
}
