// ── Lock aggregate ──
//
// One `LockState` per physical lock. Static attributes come from polls,
// dynamic ones from polls, push events, and local commands.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use ttlock_api::models::LockDetails;

use super::features::Features;
use super::passage_mode::{PassageModeConfig, passage_mode_active};

/// Vendor-assigned numeric lock identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockId(pub i64);

impl LockId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LockId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<i64> for LockId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Attributes a detail poll reports authoritatively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    pub id: LockId,
    pub mac: String,
    pub name: String,
    pub lock_type: String,
    pub model: Option<String>,
    pub battery_level: Option<u8>,
    pub hardware_version: Option<String>,
    pub firmware_version: Option<String>,
    pub features: Features,
    pub has_gateway: bool,
    pub timezone_raw_offset_ms: i64,
    pub auto_lock_seconds: i64,
}

impl From<LockDetails> for LockInfo {
    fn from(d: LockDetails) -> Self {
        Self {
            id: LockId(d.lock_id),
            features: Features::from_feature_value(d.feature_value.as_deref()),
            mac: d.lock_mac,
            name: d.lock_alias,
            lock_type: d.lock_name,
            model: d.model_num,
            battery_level: d.electric_quantity.and_then(|v| u8::try_from(v).ok()),
            hardware_version: d.hardware_revision,
            firmware_version: d.firmware_revision,
            has_gateway: d.has_gateway != 0,
            timezone_raw_offset_ms: d.timezone_raw_offset,
            auto_lock_seconds: d.auto_lock_time,
        }
    }
}

/// In-memory record of one lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockState {
    // Identity
    pub id: LockId,
    pub mac: String,

    // Refreshed by every poll
    pub name: String,
    pub lock_type: String,
    pub model: Option<String>,
    pub battery_level: Option<u8>,
    pub hardware_version: Option<String>,
    pub firmware_version: Option<String>,
    pub features: Features,
    pub has_gateway: bool,
    pub timezone_raw_offset_ms: i64,

    // Scheduling configuration
    /// Seconds; zero or negative disables auto-lock.
    pub auto_lock_seconds: i64,
    pub passage_mode: Option<PassageModeConfig>,

    // Operational state
    /// `None` until a poll or a push event establishes it.
    pub locked: Option<bool>,
    /// `true` while at least one lock/unlock command is in flight.
    pub action_pending: bool,
    #[serde(skip)]
    commands_in_flight: u32,
    pub last_user: Option<String>,
    pub last_reason: Option<String>,
}

impl LockState {
    /// Fresh aggregate from a first successful detail poll.
    pub fn new(info: LockInfo) -> Self {
        Self {
            id: info.id,
            mac: info.mac,
            name: info.name,
            lock_type: info.lock_type,
            model: info.model,
            battery_level: info.battery_level,
            hardware_version: info.hardware_version,
            firmware_version: info.firmware_version,
            features: info.features,
            has_gateway: info.has_gateway,
            timezone_raw_offset_ms: info.timezone_raw_offset_ms,
            auto_lock_seconds: info.auto_lock_seconds,
            passage_mode: None,
            locked: None,
            action_pending: false,
            commands_in_flight: 0,
            last_user: None,
            last_reason: None,
        }
    }

    pub fn passage_mode_active<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        passage_mode_active(self.passage_mode.as_ref(), at)
    }

    /// How long after an unlock at `at` the lock should re-lock.
    ///
    /// `None` when auto-lock is disabled or passage mode is open at `at`.
    pub fn auto_lock_delay<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Option<Duration> {
        let seconds = u64::try_from(self.auto_lock_seconds).ok().filter(|s| *s > 0)?;
        if self.passage_mode_active(at) {
            return None;
        }
        Some(Duration::from_secs(seconds))
    }

    /// Count a command as started.
    pub(crate) fn begin_command(&mut self) {
        self.commands_in_flight = self.commands_in_flight.saturating_add(1);
        self.action_pending = true;
    }

    /// Count a command as finished. The flag drops with the last one.
    pub(crate) fn end_command(&mut self) {
        self.commands_in_flight = self.commands_in_flight.saturating_sub(1);
        self.action_pending = self.commands_in_flight > 0;
    }

    /// A command is in flight and the lock isn't known to be locked yet.
    pub fn is_locking(&self) -> bool {
        self.action_pending && self.locked != Some(true)
    }

    /// A command is in flight against a lock believed locked.
    pub fn is_unlocking(&self) -> bool {
        self.action_pending && self.locked == Some(true)
    }
}
