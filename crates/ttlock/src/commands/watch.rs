//! Long-running watch: background poll plus webhook ingestion.
//!
//! Webhook deliveries are read one per line from a file or stdin. Every
//! routed event and every state change is printed as it happens.

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use ttlock_core::{Controller, ControllerConfig, LockEvent, LockId, WebhookDelivery};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::locks::{LockView, last_user};

type DeliveryLines = Lines<Box<dyn AsyncBufRead + Unpin + Send>>;

async fn open_input(path: Option<&Path>) -> Result<Option<DeliveryLines>, CliError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = if path == Path::new("-") {
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        Box::new(BufReader::new(tokio::fs::File::open(path).await?))
    };
    Ok(Some(reader.lines()))
}

async fn next_line(input: &mut Option<DeliveryLines>) -> std::io::Result<Option<String>> {
    match input {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

pub async fn handle(
    config: ControllerConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = Controller::new(config)?;
    let mut events = controller.events();
    let mut changes = controller.changes();

    let report = controller.connect().await?;
    if !report.is_complete() {
        warn!(failed = report.failed.len(), "some locks could not be polled yet");
    }

    let printer = Printer::new(global);
    for state in controller.locks() {
        printer.state(&controller, state.id)?;
    }
    // Skip the notifications the initial poll queued; the snapshot covers them.
    changes = changes.resubscribe();

    let mut input = open_input(args.webhook_file.as_deref()).await?;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break Ok(()),
            event = events.recv() => match event {
                Ok(event) => printer.event(&controller, &event)?,
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "event printer lagged"),
                Err(RecvError::Closed) => break Ok(()),
            },
            change = changes.recv() => match change {
                Ok(id) => printer.state(&controller, id)?,
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "state printer lagged"),
                Err(RecvError::Closed) => break Ok(()),
            },
            line = next_line(&mut input) => match line {
                Ok(Some(line)) => ingest(&controller, &line),
                Ok(None) => {
                    info!("webhook input exhausted");
                    flush(&controller, &printer, &mut events, &mut changes)?;
                    break Ok(());
                }
                Err(e) => break Err(CliError::Io(e)),
            },
        }
    };

    controller.disconnect().await;
    result
}

fn ingest(controller: &Controller, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match WebhookDelivery::parse(line) {
        Ok(delivery) => {
            controller.handle_webhook(&delivery);
        }
        Err(e) => warn!(error = %e, "skipping undecodable webhook delivery"),
    }
}

/// Print whatever is already queued.
fn flush(
    controller: &Controller,
    printer: &Printer,
    events: &mut broadcast::Receiver<Arc<LockEvent>>,
    changes: &mut broadcast::Receiver<LockId>,
) -> Result<(), CliError> {
    while let Ok(event) = events.try_recv() {
        printer.event(controller, &event)?;
    }
    while let Ok(id) = changes.try_recv() {
        printer.state(controller, id)?;
    }
    Ok(())
}

// ── Printing ────────────────────────────────────────────────────────

/// One structured output line, `{"event": ...}` or `{"state": ...}`.
#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum WatchLine<'a> {
    Event(&'a LockEvent),
    State(LockView<'a>),
}

struct Printer {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl Printer {
    fn new(global: &GlobalOpts) -> Self {
        Self {
            format: global.output.clone(),
            color: output::should_color(&global.color),
            quiet: global.quiet,
        }
    }

    fn structured(&self) -> bool {
        !matches!(self.format, OutputFormat::Table | OutputFormat::Plain)
    }

    fn event(&self, controller: &Controller, event: &LockEvent) -> Result<(), CliError> {
        let line = if self.structured() {
            output::render_json(&WatchLine::Event(event), true)?
        } else {
            let name = controller
                .lock_state(event.lock_id)
                .map_or_else(|| event.lock_id.to_string(), |s| s.name);
            let outcome = if event.success { "" } else { " (failed)" };
            format!(
                "{} {name}: {} by {}{outcome}",
                event.server_timestamp.format("%H:%M:%S"),
                event.description(),
                event.username.as_deref().unwrap_or("Unknown"),
            )
        };
        output::print_output(&line, self.quiet);
        Ok(())
    }

    fn state(&self, controller: &Controller, id: LockId) -> Result<(), CliError> {
        let Some(state) = controller.lock_state(id) else {
            return Ok(());
        };
        let now = Local::now();
        let line = if self.structured() {
            output::render_json(&WatchLine::State(LockView::new(&state, &now)), true)?
        } else {
            let battery = state
                .battery_level
                .map_or_else(|| "-".into(), |b| format!("{b}%"));
            let mut line = format!(
                "{} {} ({}): {}, battery {battery}, last {} by {}",
                now.format("%H:%M:%S"),
                state.name,
                state.id,
                output::locked_label(state.locked, self.color),
                state.last_reason.as_deref().unwrap_or("-"),
                last_user(&state),
            );
            if state.action_pending {
                line.push_str(" [pending]");
            }
            if state.passage_mode_active(&now) {
                line.push_str(" [passage mode]");
            }
            line
        };
        output::print_output(&line, self.quiet);
        Ok(())
    }
}
