// ttlock-core: Lock state reconciliation between ttlock-api and consumers (CLI).

pub mod autolock;
pub mod command;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod model;
pub mod poller;
pub mod store;
pub mod stream;
pub mod webhook;

// ── Primary re-exports ──────────────────────────────────────────────
pub use autolock::{AUTO_LOCK_REASON, AutoLockScheduler};
pub use command::{Command, CommandResult};
pub use config::{ControllerConfig, TlsVerification};
pub use controller::Controller;
pub use device::{LockControl, LockHandle};
pub use error::CoreError;
pub use poller::RefreshReport;
pub use store::LockStore;
pub use stream::{LockStream, LockWatchStream};
pub use webhook::WebhookReport;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Aggregate
    LockId, LockInfo, LockState,
    // Activity records
    Action, InvalidEventError, LockEvent, LockOutcome, record_type_info,
    // Capabilities and schedules
    Feature, Features, OnOff, PassageModeConfig, passage_mode_active,
    // Passcodes
    NewPasscode, Passcode, PasscodeType,
};

// The raw delivery type is part of the controller's surface.
pub use ttlock_api::WebhookDelivery;
