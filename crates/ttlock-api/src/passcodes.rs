// Keyboard passcode endpoints
//
// Creation and deletion go through the gateway (`addType=2`,
// `deleteType=2`) and hold the gateway permit.

use tracing::debug;

use crate::client::TtlockClient;
use crate::error::Error;
use crate::models::{Ack, AddPasscodeParams, AddedPasscode, PasscodeRaw};

const PASSCODE_PAGE_SIZE: u32 = 100;

/// Only time-limited codes can be created remotely.
const TEMPORARY_PASSCODE_TYPE: &str = "3";

impl TtlockClient {
    /// Create a temporary passcode on the lock.
    ///
    /// `POST keyboardPwd/add`. Returns the new passcode id when the API
    /// reports one.
    pub async fn add_passcode(
        &self,
        lock_id: i64,
        params: &AddPasscodeParams,
    ) -> Result<Option<i64>, Error> {
        let form = [
            ("lockId", lock_id.to_string()),
            ("addType", "2".to_owned()),
            ("keyboardPwd", params.passcode.clone()),
            ("keyboardPwdName", params.name.clone()),
            ("keyboardPwdType", TEMPORARY_PASSCODE_TYPE.to_owned()),
            ("startDate", params.start_ms.to_string()),
            ("endDate", params.end_ms.to_string()),
        ];

        let _permit = self.gateway_permit().await;
        debug!(lock_id, name = %params.name, "adding passcode");
        let added: AddedPasscode = self.post("keyboardPwd/add", &form).await?;
        Ok(added.keyboard_pwd_id)
    }

    /// Every passcode configured on the lock, across all pages.
    ///
    /// `GET lock/listKeyboardPwd`
    pub async fn list_passcodes(&self, lock_id: i64) -> Result<Vec<PasscodeRaw>, Error> {
        self.get_all_pages(
            "lock/listKeyboardPwd",
            &[("lockId", lock_id.to_string())],
            PASSCODE_PAGE_SIZE,
        )
        .await
    }

    /// `POST keyboardPwd/delete`
    pub async fn delete_passcode(&self, lock_id: i64, passcode_id: i64) -> Result<(), Error> {
        let form = [
            ("lockId", lock_id.to_string()),
            ("deleteType", "2".to_owned()),
            ("keyboardPwdId", passcode_id.to_string()),
        ];

        let _permit = self.gateway_permit().await;
        debug!(lock_id, passcode_id, "deleting passcode");
        let _: Ack = self.post("keyboardPwd/delete", &form).await?;
        Ok(())
    }
}
