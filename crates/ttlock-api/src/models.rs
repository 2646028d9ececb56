// Open API wire types
//
// Raw camelCase payloads as the vendor returns them. Every optional field
// uses `#[serde(default)]` because the API omits fields depending on lock
// model and firmware. Secret material in the detail payload (`adminPwd`,
// `lockKey`, `aesKeyStr`, ...) is deliberately not modelled.

use serde::{Deserialize, Serialize};

// ── Paging ───────────────────────────────────────────────────────────

/// Paged list envelope used by every `*/list*` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default, rename = "pageNo")]
    pub page_no: Option<u32>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub total: Option<u32>,
}

/// Empty-body acknowledgement (`{"errcode": 0, "errmsg": "..."}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: Option<String>,
}

// ── Locks ────────────────────────────────────────────────────────────

/// One row of `lock/list` or `key/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockListEntry {
    pub lock_id: i64,
    #[serde(default)]
    pub lock_alias: Option<String>,
    #[serde(default)]
    pub lock_mac: Option<String>,
    /// 0 when the lock has no gateway bound.
    #[serde(default)]
    pub has_gateway: i64,
    #[serde(default)]
    pub feature_value: Option<String>,
}

/// Lock details from `lock/detail` (admin) or `key/get` (e-key holder).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockDetails {
    pub lock_id: i64,
    /// Hardware type name, e.g. `S31_c401cc`.
    pub lock_name: String,
    #[serde(default = "default_alias")]
    pub lock_alias: String,
    pub lock_mac: String,
    #[serde(default)]
    pub electric_quantity: Option<i64>,
    #[serde(default)]
    pub feature_value: Option<String>,
    #[serde(default)]
    pub timezone_raw_offset: i64,
    #[serde(default)]
    pub model_num: Option<String>,
    #[serde(default)]
    pub hardware_revision: Option<String>,
    #[serde(default)]
    pub firmware_revision: Option<String>,
    /// Seconds; negative or zero means auto-lock is off.
    #[serde(default = "default_auto_lock_time")]
    pub auto_lock_time: i64,
    #[serde(default)]
    pub has_gateway: i64,
    /// Server time of the response, ms epoch.
    #[serde(default)]
    pub date: i64,
}

fn default_alias() -> String {
    "Lock".to_owned()
}

fn default_auto_lock_time() -> i64 {
    -1
}

/// `lock/queryOpenState` response. 0=locked, 1=unlocked, 2=unknown.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OpenState {
    #[serde(default = "unknown_open_state")]
    pub state: i64,
}

fn unknown_open_state() -> i64 {
    2
}

impl OpenState {
    pub const LOCKED: i64 = 0;
    pub const UNLOCKED: i64 = 1;
    pub const UNKNOWN: i64 = 2;
}

// ── Passage mode ─────────────────────────────────────────────────────

/// `lock/getPassageModeConfig` response.
///
/// Tri-state fields use 0=unknown, 1=on, 2=off. The API sends `null` for
/// start/end minutes when the window is all-day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassageModeRaw {
    #[serde(default)]
    pub passage_mode: i64,
    #[serde(default)]
    pub start_date: Option<i64>,
    #[serde(default)]
    pub end_date: Option<i64>,
    #[serde(default)]
    pub is_all_day: i64,
    /// 1=Monday .. 7=Sunday
    #[serde(default)]
    pub week_days: Vec<u8>,
    #[serde(default)]
    pub auto_unlock: i64,
}

/// Parameters for `lock/configPassageMode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageModeParams {
    pub enabled: bool,
    pub auto_unlock: bool,
    pub all_day: bool,
    pub start_minute: u16,
    pub end_minute: u16,
    pub week_days: Vec<u8>,
}

// ── Passcodes ────────────────────────────────────────────────────────

/// One row of `lock/listKeyboardPwd`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasscodeRaw {
    pub keyboard_pwd_id: i64,
    #[serde(default)]
    pub keyboard_pwd: Option<String>,
    #[serde(default)]
    pub keyboard_pwd_name: Option<String>,
    /// 2=permanent, 3=temporary; other values exist for cyclic codes.
    #[serde(default)]
    pub keyboard_pwd_type: i64,
    /// ms epoch
    #[serde(default)]
    pub start_date: Option<i64>,
    /// ms epoch
    #[serde(default)]
    pub end_date: Option<i64>,
}

/// Parameters for `keyboardPwd/add`. Times are ms epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPasscodeParams {
    pub passcode: String,
    pub name: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

/// `keyboardPwd/add` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedPasscode {
    #[serde(default)]
    pub keyboard_pwd_id: Option<i64>,
}
