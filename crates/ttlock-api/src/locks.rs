// Lock endpoints
//
// Enumeration, details, open state, passage mode, and remote lock/unlock.
// Every call that reaches the device through the gateway holds the gateway
// permit for its whole round trip.

use tracing::debug;

use crate::client::TtlockClient;
use crate::error::Error;
use crate::models::{
    Ack, LockDetails, LockListEntry, OpenState, PassageModeParams, PassageModeRaw,
};

/// Page size for lock enumeration; the API maximum.
const LIST_PAGE_SIZE: u32 = 1000;

/// Remote access is possible through a gateway or built-in wifi.
const WIFI_BIT: u32 = 56;

fn lock_param(lock_id: i64) -> (&'static str, String) {
    ("lockId", lock_id.to_string())
}

fn on_off(flag: bool) -> String {
    let value = if flag { "1" } else { "2" };
    value.to_owned()
}

impl TtlockClient {
    /// Locks administered by this account.
    ///
    /// `GET lock/list`
    pub async fn list_owned_locks(&self) -> Result<Vec<LockListEntry>, Error> {
        self.get_all_pages("lock/list", &[], LIST_PAGE_SIZE).await
    }

    /// Locks shared with this account through e-keys.
    ///
    /// `GET key/list`
    pub async fn list_ekeys(&self) -> Result<Vec<LockListEntry>, Error> {
        self.get_all_pages("key/list", &[], LIST_PAGE_SIZE).await
    }

    /// Ids of every remotely reachable lock, owned locks first.
    ///
    /// Locks with neither a gateway nor wifi cannot be commanded from the
    /// cloud and are skipped.
    pub async fn list_locks(&self) -> Result<Vec<i64>, Error> {
        let owned = self.list_owned_locks().await?;
        let shared = self.list_ekeys().await?;

        let mut ids: Vec<i64> = Vec::new();
        for entry in owned.iter().chain(shared.iter()) {
            if is_connectable(entry) && !ids.contains(&entry.lock_id) {
                ids.push(entry.lock_id);
            }
        }
        debug!(count = ids.len(), "enumerated connectable locks");
        Ok(ids)
    }

    /// Lock details, falling back to the e-key view for non-admin accounts.
    ///
    /// `GET lock/detail`, then `GET key/get` on a vendor error.
    pub async fn get_lock(&self, lock_id: i64) -> Result<LockDetails, Error> {
        match self.get("lock/detail", &[lock_param(lock_id)]).await {
            Ok(details) => Ok(details),
            Err(Error::Vendor { code, message }) => {
                debug!(lock_id, code, message, "lock/detail refused, trying key/get");
                self.get("key/get", &[lock_param(lock_id)]).await
            }
            Err(e) => Err(e),
        }
    }

    /// Current open state as reported through the gateway.
    ///
    /// `GET lock/queryOpenState`
    pub async fn get_lock_state(&self, lock_id: i64) -> Result<OpenState, Error> {
        let _permit = self.gateway_permit().await;
        self.get("lock/queryOpenState", &[lock_param(lock_id)])
            .await
    }

    /// `GET lock/getPassageModeConfig`
    pub async fn get_passage_mode_config(&self, lock_id: i64) -> Result<PassageModeRaw, Error> {
        self.get("lock/getPassageModeConfig", &[lock_param(lock_id)])
            .await
    }

    /// Lock remotely.
    ///
    /// `GET lock/lock`
    pub async fn lock(&self, lock_id: i64) -> Result<(), Error> {
        let _permit = self.gateway_permit().await;
        debug!(lock_id, "locking");
        let _: Ack = self.get("lock/lock", &[lock_param(lock_id)]).await?;
        Ok(())
    }

    /// Unlock remotely.
    ///
    /// `GET lock/unlock`
    pub async fn unlock(&self, lock_id: i64) -> Result<(), Error> {
        let _permit = self.gateway_permit().await;
        debug!(lock_id, "unlocking");
        let _: Ack = self.get("lock/unlock", &[lock_param(lock_id)]).await?;
        Ok(())
    }

    /// Write the passage-mode schedule via the gateway.
    ///
    /// `POST lock/configPassageMode` with `type=2`.
    pub async fn set_passage_mode(
        &self,
        lock_id: i64,
        params: &PassageModeParams,
    ) -> Result<(), Error> {
        let week_days = serde_json::to_string(&params.week_days).map_err(|e| {
            Error::Deserialization {
                message: e.to_string(),
                body: String::new(),
            }
        })?;
        let form = [
            lock_param(lock_id),
            ("type", "2".to_owned()),
            ("passageMode", on_off(params.enabled)),
            ("autoUnlock", on_off(params.auto_unlock)),
            ("isAllDay", on_off(params.all_day)),
            ("startDate", params.start_minute.to_string()),
            ("endDate", params.end_minute.to_string()),
            ("weekDays", week_days),
        ];

        let _permit = self.gateway_permit().await;
        debug!(lock_id, ?params, "configuring passage mode");
        let _: Ack = self.post("lock/configPassageMode", &form).await?;
        Ok(())
    }
}

/// `true` if the lock can be reached without a phone nearby.
pub fn is_connectable(entry: &LockListEntry) -> bool {
    entry.has_gateway != 0 || has_feature_bit(entry.feature_value.as_deref(), WIFI_BIT)
}

/// Test a bit of the hex-encoded `featureValue` bitmask.
///
/// Works per hex digit so masks wider than any integer type still decode.
pub fn has_feature_bit(feature_value: Option<&str>, bit: u32) -> bool {
    let Some(value) = feature_value else {
        return false;
    };
    let digit_index = (bit / 4) as usize;
    value
        .chars()
        .rev()
        .nth(digit_index)
        .and_then(|c| c.to_digit(16))
        .is_some_and(|digit| digit & (1 << (bit % 4)) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(has_gateway: i64, feature_value: Option<&str>) -> LockListEntry {
        LockListEntry {
            lock_id: 1,
            lock_alias: None,
            lock_mac: None,
            has_gateway,
            feature_value: feature_value.map(str::to_owned),
        }
    }

    #[test]
    fn gateway_makes_lock_connectable() {
        assert!(is_connectable(&entry(1, None)));
    }

    #[test]
    fn wifi_bit_makes_lock_connectable() {
        // bit 56 is the low bit of the 15th hex digit from the right
        assert!(is_connectable(&entry(0, Some("100000000000000"))));
        assert!(!is_connectable(&entry(0, Some("F44354CD5F3"))));
    }

    #[test]
    fn feature_bit_decoding() {
        assert!(has_feature_bit(Some("F44354CD5F3"), 8));
        assert!(has_feature_bit(Some("F44354CD5F3"), 10));
        assert!(has_feature_bit(Some("F44354CD5F3"), 22));
        assert!(!has_feature_bit(Some("F44354CD5F3"), 56));
        assert!(!has_feature_bit(Some("zz"), 0));
        assert!(!has_feature_bit(None, 8));
    }
}
