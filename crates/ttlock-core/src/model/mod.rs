// ── Domain model ──
//
// Value types for locks, activity records, capabilities, passage-mode
// schedules and passcodes. Parsed from the raw API types in ttlock-api.

pub mod event;
pub mod features;
pub mod lock;
pub mod passage_mode;
pub mod passcode;

pub use event::{Action, InvalidEventError, LockEvent, LockOutcome, record_type_info};
pub use features::{Feature, Features};
pub use lock::{LockId, LockInfo, LockState};
pub use passage_mode::{OnOff, PassageModeConfig, passage_mode_active};
pub use passcode::{NewPasscode, Passcode, PasscodeType};
