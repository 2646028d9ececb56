// ── Command API ──
//
// Write operations as data, so the CLI can route user input through a
// single `Controller::execute` entry point.

use crate::model::{LockId, NewPasscode, PassageModeConfig};

/// Every write operation the session supports.
#[derive(Debug, Clone)]
pub enum Command {
    Lock {
        id: LockId,
    },
    Unlock {
        id: LockId,
    },
    ConfigurePassageMode {
        id: LockId,
        config: PassageModeConfig,
    },
    CreatePasscode {
        id: LockId,
        passcode: NewPasscode,
    },
    /// Delete every expired temporary passcode.
    CleanupPasscodes {
        id: LockId,
    },
}

impl Command {
    pub fn lock_id(&self) -> LockId {
        match self {
            Self::Lock { id }
            | Self::Unlock { id }
            | Self::ConfigurePassageMode { id, .. }
            | Self::CreatePasscode { id, .. }
            | Self::CleanupPasscodes { id } => *id,
        }
    }
}

/// Result of a routed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    /// The vendor or the transport rejected the command. Details are logged.
    Failed,
    /// The lock is not tracked by this session.
    Ignored,
    /// Names of the passcodes that were deleted.
    Removed(Vec<String>),
}

impl CommandResult {
    pub fn from_success(success: bool) -> Self {
        if success { Self::Ok } else { Self::Failed }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Removed(_))
    }
}
