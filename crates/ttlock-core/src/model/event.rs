// ── Lock activity records ──
//
// A record arrives from the push channel as a loose JSON object. It is
// parsed once into a `LockEvent` and never mutated afterwards.

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use serde_json::Value;
use strum::Display;
use thiserror::Error;

use super::lock::LockId;

/// What a record did to the bolt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Lock,
    Unlock,
    Unknown,
}

/// Bolt position implied by a successful record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LockOutcome {
    Locked,
    Unlocked,
}

/// `(action, description)` for a vendor record type. Unlisted codes map to
/// `(Unknown, "unknown")`; the vendor adds codes over time.
pub fn record_type_info(code: i64) -> (Action, &'static str) {
    use Action::{Lock, Unknown, Unlock};

    match code {
        1 => (Unlock, "unlock by app"),
        4 => (Unlock, "unlock by passcode"),
        7 => (Unlock, "unlock by IC card"),
        8 => (Unlock, "unlock by fingerprint"),
        9 => (Unlock, "unlock by wrist strap"),
        10 => (Unlock, "unlock by Mechanical key"),
        11 => (Lock, "lock by app"),
        12 => (Unlock, "unlock by gateway"),
        29 => (Unknown, "apply some force on the Lock"),
        30 => (Unknown, "Door sensor closed"),
        31 => (Unknown, "Door sensor open"),
        32 => (Unknown, "open from inside"),
        33 => (Lock, "lock by fingerprint"),
        34 => (Lock, "lock by passcode"),
        35 => (Lock, "lock by IC card"),
        36 => (Lock, "lock by Mechanical key"),
        37 => (Unknown, "Remote Control"),
        42 => (Unknown, "received new local mail"),
        43 => (Unknown, "received new other cities' mail"),
        44 => (Unknown, "Tamper alert"),
        45 => (Lock, "Auto Lock"),
        46 => (Unlock, "unlock by unlock key"),
        47 => (Lock, "lock by lock key"),
        48 => (
            Unknown,
            "System locked ( Caused by, for example: Using INVALID Passcode/Fingerprint/Card several times)",
        ),
        49 => (Unlock, "unlock by hotel card"),
        50 => (Unlock, "unlocked due to the high temperature"),
        51 => (Unknown, "Try to unlock with a deleted card"),
        52 => (Unknown, "Dead lock with APP"),
        53 => (Unknown, "Dead lock with passcode"),
        54 => (Unknown, "The car left (for parking lock)"),
        55 => (Unlock, "unlock with key fob"),
        57 => (Unlock, "unlock with QR code success"),
        58 => (Unknown, "Unlock with QR code failed, it's expired"),
        59 => (Unknown, "Double locked"),
        60 => (Unknown, "Cancel double lock"),
        61 => (Lock, "Lock with QR code success"),
        62 => (Unknown, "Lock with QR code failed, the lock is double locked"),
        63 => (Unlock, "auto unlock at passage mode"),
        _ => (Unknown, "unknown"),
    }
}

/// A record could not be turned into a [`LockEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid lock event: {message}")]
pub struct InvalidEventError {
    pub message: String,
}

impl InvalidEventError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One parsed activity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockEvent {
    pub lock_id: LockId,
    pub mac: String,
    pub battery_level: Option<u8>,
    /// When the vendor's server received the record.
    pub server_timestamp: DateTime<Local>,
    /// When the lock says it happened.
    pub device_timestamp: DateTime<Local>,
    pub record_type: i64,
    pub username: Option<String>,
    pub success: bool,
}

impl LockEvent {
    /// Parse a raw record object.
    ///
    /// `lockId`, `lockMac`, `serverDate`, `lockDate`, `recordType` and
    /// `success` are required. `success` is accepted as a bool or as 0/1.
    pub fn from_record(record: &Value) -> Result<Self, InvalidEventError> {
        let obj = record
            .as_object()
            .ok_or_else(|| InvalidEventError::new("record is not a JSON object"))?;

        let lock_id = obj
            .get("lockId")
            .and_then(Value::as_i64)
            .ok_or_else(|| InvalidEventError::new("missing or non-integer `lockId`"))?;
        let mac = obj
            .get("lockMac")
            .and_then(Value::as_str)
            .ok_or_else(|| InvalidEventError::new("missing `lockMac`"))?
            .to_owned();
        let server_timestamp = epoch_ms(obj.get("serverDate"), "serverDate")?;
        let device_timestamp = epoch_ms(obj.get("lockDate"), "lockDate")?;
        let record_type = obj
            .get("recordType")
            .and_then(Value::as_i64)
            .ok_or_else(|| InvalidEventError::new("missing or non-integer `recordType`"))?;
        let success = match obj.get("success") {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
            _ => return Err(InvalidEventError::new("missing or invalid `success`")),
        };

        let battery_level = obj
            .get("electricQuantity")
            .and_then(Value::as_i64)
            .and_then(|v| u8::try_from(v).ok());
        let username = obj
            .get("username")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(Self {
            lock_id: LockId(lock_id),
            mac,
            battery_level,
            server_timestamp,
            device_timestamp,
            record_type,
            username,
            success,
        })
    }

    pub fn action(&self) -> Action {
        record_type_info(self.record_type).0
    }

    pub fn description(&self) -> &'static str {
        record_type_info(self.record_type).1
    }

    /// `None` for failed records and for records that don't move the bolt.
    pub fn resulting_state(&self) -> Option<LockOutcome> {
        if !self.success {
            return None;
        }
        match self.action() {
            Action::Lock => Some(LockOutcome::Locked),
            Action::Unlock => Some(LockOutcome::Unlocked),
            Action::Unknown => None,
        }
    }
}

fn epoch_ms(value: Option<&Value>, field: &str) -> Result<DateTime<Local>, InvalidEventError> {
    let ms = value
        .and_then(Value::as_i64)
        .ok_or_else(|| InvalidEventError::new(format!("missing or non-integer `{field}`")))?;
    Local
        .timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| InvalidEventError::new(format!("`{field}` is out of range: {ms}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    fn unlock_record() -> Value {
        json!({
            "lockId": 7_252_408,
            "lockMac": "16:72:4C:CC:01:C4",
            "electricQuantity": 40,
            "serverDate": 1_682_244_497_000_i64,
            "lockDate": 1_682_244_497_000_i64,
            "recordType": 7,
            "username": "test",
            "success": 1,
        })
    }

    #[test]
    fn known_codes_are_stable() {
        assert_eq!(record_type_info(7), (Action::Unlock, "unlock by IC card"));
        assert_eq!(record_type_info(47), (Action::Lock, "lock by lock key"));
        assert_eq!(record_type_info(45), (Action::Lock, "Auto Lock"));
        assert_eq!(record_type_info(63), (Action::Unlock, "auto unlock at passage mode"));
        assert_eq!(record_type_info(31), (Action::Unknown, "Door sensor open"));
    }

    #[test]
    fn unlisted_codes_are_unknown() {
        for code in [0, 2, 3, 5, 13, 28, 38, 41, 56, 64, 1000, -1] {
            assert_eq!(record_type_info(code), (Action::Unknown, "unknown"), "code {code}");
        }
    }

    #[test]
    fn parses_webhook_record() {
        let event = LockEvent::from_record(&unlock_record()).unwrap();
        assert_eq!(event.lock_id, LockId(7_252_408));
        assert_eq!(event.battery_level, Some(40));
        assert_eq!(event.username.as_deref(), Some("test"));
        assert!(event.success);
        assert_eq!(event.action(), Action::Unlock);
        assert_eq!(event.description(), "unlock by IC card");
        assert_eq!(event.resulting_state(), Some(LockOutcome::Unlocked));
        assert_eq!(event.device_timestamp.timestamp_millis(), 1_682_244_497_000);
    }

    #[test]
    fn success_accepts_bool() {
        let mut record = unlock_record();
        record["success"] = json!(false);
        let event = LockEvent::from_record(&record).unwrap();
        assert!(!event.success);
        assert_eq!(event.resulting_state(), None);
    }

    #[test]
    fn unknown_action_has_no_resulting_state() {
        let mut record = unlock_record();
        record["recordType"] = json!(31);
        let event = LockEvent::from_record(&record).unwrap();
        assert_eq!(event.resulting_state(), None);
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        for field in ["lockId", "lockMac", "serverDate", "lockDate", "recordType", "success"] {
            let mut record = unlock_record();
            record.as_object_mut().unwrap().remove(field);
            let err = LockEvent::from_record(&record).unwrap_err();
            assert!(err.message.contains(field), "{field}: {err}");
        }
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let mut record = unlock_record();
        let obj = record.as_object_mut().unwrap();
        obj.remove("electricQuantity");
        obj.remove("username");
        let event = LockEvent::from_record(&record).unwrap();
        assert_eq!(event.battery_level, None);
        assert_eq!(event.username, None);
    }
}
