//! Lock status and bolt command handlers.

use chrono::{DateTime, Local};
use serde::Serialize;
use tabled::Tabled;
use ttlock_core::{Command as CoreCommand, Controller, ControllerConfig, LockId, LockState};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{expect_success, notify};

// ── Views ───────────────────────────────────────────────────────────

/// A lock plus the attributes derived from it at render time.
#[derive(Serialize)]
pub(crate) struct LockView<'a> {
    #[serde(flatten)]
    pub state: &'a LockState,
    pub passage_mode_active: bool,
    pub is_locking: bool,
    pub is_unlocking: bool,
}

impl<'a> LockView<'a> {
    pub(crate) fn new(state: &'a LockState, now: &DateTime<Local>) -> Self {
        Self {
            state,
            passage_mode_active: state.passage_mode_active(now),
            is_locking: state.is_locking(),
            is_unlocking: state.is_unlocking(),
        }
    }
}

#[derive(Tabled)]
struct LockRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "Passage")]
    passage: String,
    #[tabled(rename = "Gateway")]
    gateway: String,
    #[tabled(rename = "Last user")]
    last_user: String,
    #[tabled(rename = "Last action")]
    last_reason: String,
}

impl LockRow {
    fn new(view: &LockView<'_>, color: bool) -> Self {
        let s = view.state;
        let mut state = output::locked_label(s.locked, color);
        if view.is_locking {
            state = "locking".into();
        } else if view.is_unlocking {
            state = "unlocking".into();
        }
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            state,
            battery: s
                .battery_level
                .map_or_else(|| "-".into(), |b| format!("{b}%")),
            passage: if view.passage_mode_active { "open" } else { "-" }.into(),
            gateway: if s.has_gateway { "yes" } else { "no" }.into(),
            last_user: last_user(s).into(),
            last_reason: s.last_reason.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

pub(crate) fn last_user(state: &LockState) -> &str {
    state.last_user.as_deref().unwrap_or("Unknown")
}

// ── Handlers ────────────────────────────────────────────────────────

/// Poll once and print every tracked lock.
pub async fn status(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let locks = Controller::oneshot(config, |c| async move { Ok(c.locks()) }).await?;

    let now = Local::now();
    let color = output::should_color(&global.color);
    let views: Vec<LockView<'_>> = locks.iter().map(|s| LockView::new(s, &now)).collect();

    let out = output::render_list(
        &global.output,
        &views,
        |v| LockRow::new(v, color),
        |v| v.state.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Lock (`lock = true`) or unlock a single lock.
pub async fn bolt(
    config: ControllerConfig,
    id: LockId,
    lock: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (cmd, action) = if lock {
        (CoreCommand::Lock { id }, "lock")
    } else {
        (CoreCommand::Unlock { id }, "unlock")
    };

    let result = Controller::oneshot(config, move |c| async move { c.execute(cmd).await }).await?;
    expect_success(&result, id, action)?;

    notify(global, &format!("Lock {id}: {action} accepted"));
    Ok(())
}
