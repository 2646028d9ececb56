// ── Lock aggregate store ──
//
// Per-lock storage with push-based change notification.

mod lock_store;
pub(crate) mod refresh;

pub use lock_store::LockStore;
