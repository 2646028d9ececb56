//! Clap derive structures for the `ttlock` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use clap::{Args, Parser, Subcommand, ValueEnum};

use ttlock_core::LockId;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ttlock -- drive TTLock smart locks through the vendor cloud
#[derive(Debug, Parser)]
#[command(
    name = "ttlock",
    version,
    about = "Monitor and control TTLock smart locks from the command line",
    long_about = "Monitor and control TTLock smart locks from the command line.\n\n\
        Talks to the TTLock cloud open API. Locks need a gateway or wifi\n\
        to be reachable remotely.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "TTLOCK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, env = "TTLOCK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// OAuth client id (overrides profile)
    #[arg(long, env = "TTLOCK_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// Access token (overrides profile and keyring)
    #[arg(long, env = "TTLOCK_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub access_token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TTLOCK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "TTLOCK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll once and show every tracked lock
    #[command(alias = "ls")]
    Status,

    /// Lock remotely
    Lock(LockArgs),

    /// Unlock remotely
    Unlock(LockArgs),

    /// Configure the passage-mode schedule
    PassageMode(PassageModeArgs),

    /// Manage temporary passcodes
    #[command(alias = "pc")]
    Passcode(PasscodeArgs),

    /// Poll in the background and ingest webhook deliveries
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Lock commands ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LockArgs {
    /// Lock id
    pub id: LockId,
}

#[derive(Debug, Args)]
pub struct PassageModeArgs {
    /// Lock id
    pub id: LockId,

    /// Turn passage mode on or off
    #[arg(long, action = clap::ArgAction::Set)]
    pub enabled: bool,

    /// Unlock automatically when the window opens
    #[arg(long)]
    pub auto_unlock: bool,

    /// Open all day on the selected days
    #[arg(long)]
    pub all_day: bool,

    /// Window start, local time of the lock
    #[arg(long, value_parser = parse_hhmm, default_value = "00:00")]
    pub start: u16,

    /// Window end (exclusive), local time of the lock
    #[arg(long, value_parser = parse_hhmm, default_value = "00:00")]
    pub end: u16,

    /// Days the window applies to
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "mon,tue,wed,thu,fri,sat,sun"
    )]
    pub days: Vec<Weekday>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    /// 1 (Monday) .. 7 (Sunday)
    pub fn number(self) -> u8 {
        match self {
            Self::Mon => 1,
            Self::Tue => 2,
            Self::Wed => 3,
            Self::Thu => 4,
            Self::Fri => 5,
            Self::Sat => 6,
            Self::Sun => 7,
        }
    }
}

/// `HH:MM` to minutes after midnight.
fn parse_hhmm(raw: &str) -> Result<u16, String> {
    let time = NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|e| format!("expected HH:MM, got '{raw}': {e}"))?;
    u16::try_from(time.hour() * 60 + time.minute()).map_err(|e| e.to_string())
}

// ── Passcodes ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PasscodeArgs {
    #[command(subcommand)]
    pub command: PasscodeCommand,
}

#[derive(Debug, Subcommand)]
pub enum PasscodeCommand {
    /// Create a temporary passcode
    Add {
        /// Lock id
        id: LockId,

        /// Display name
        #[arg(long)]
        name: String,

        /// 4 to 9 digits
        #[arg(long)]
        code: String,

        /// Valid from (RFC 3339, e.g. 2024-06-01T12:00:00+02:00)
        #[arg(long, value_parser = parse_rfc3339)]
        start: DateTime<FixedOffset>,

        /// Valid until (RFC 3339)
        #[arg(long, value_parser = parse_rfc3339)]
        end: DateTime<FixedOffset>,
    },

    /// List passcodes on a lock
    #[command(alias = "ls")]
    List {
        /// Lock id
        id: LockId,
    },

    /// Delete every expired temporary passcode
    Cleanup {
        /// Lock id
        id: LockId,
    },
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(raw).map_err(|e| format!("expected RFC 3339, got '{raw}': {e}"))
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Newline-delimited webhook deliveries to ingest (`-` for stdin).
    ///
    /// Each line is a vendor form body (`records=[...]`) or a JSON object
    /// with a `records` field. Without this flag the command only polls
    /// until interrupted.
    #[arg(long, value_name = "PATH")]
    pub webhook_file: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the resolved configuration (secrets redacted)
    Show,

    /// Create or update a profile from the global flags
    Init,

    /// Store the access token in the system keyring
    SetToken {
        /// Token value; read from stdin when omitted
        #[arg(long)]
        token: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
