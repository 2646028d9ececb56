// ── Keyboard passcodes ──

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use strum::Display;
use ttlock_api::models::{AddPasscodeParams, PasscodeRaw};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PasscodeType {
    Permanent,
    Temporary,
    /// Cyclic, one-time, and other vendor types.
    Other,
}

impl PasscodeType {
    pub fn from_raw(value: i64) -> Self {
        match value {
            2 => Self::Permanent,
            3 => Self::Temporary,
            _ => Self::Other,
        }
    }
}

/// A passcode configured on a lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Passcode {
    pub id: i64,
    pub passcode: Option<String>,
    pub name: Option<String>,
    pub kind: PasscodeType,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Passcode {
    /// Only temporary codes expire, and only once their end is in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.kind == PasscodeType::Temporary && self.end.is_some_and(|end| end < now)
    }

    /// Name for display; falls back to the numeric id.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}

impl From<PasscodeRaw> for Passcode {
    fn from(raw: PasscodeRaw) -> Self {
        Self {
            id: raw.keyboard_pwd_id,
            passcode: raw.keyboard_pwd,
            name: raw.keyboard_pwd_name,
            kind: PasscodeType::from_raw(raw.keyboard_pwd_type),
            start: raw.start_date.and_then(from_ms),
            end: raw.end_date.and_then(from_ms),
        }
    }
}

fn from_ms(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Request to create a temporary passcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPasscode {
    pub passcode: String,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl NewPasscode {
    pub fn validate(&self) -> Result<(), CoreError> {
        let digits = self.passcode.len();
        if !(4..=9).contains(&digits) || !self.passcode.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::Validation {
                message: "passcode must be 4 to 9 digits".into(),
            });
        }
        if self.end <= self.start {
            return Err(CoreError::Validation {
                message: "passcode end time must be after its start time".into(),
            });
        }
        Ok(())
    }

    pub fn to_params(&self) -> AddPasscodeParams {
        AddPasscodeParams {
            passcode: self.passcode.clone(),
            name: self.name.clone(),
            start_ms: self.start.timestamp_millis(),
            end_ms: self.end.timestamp_millis(),
        }
    }
}
