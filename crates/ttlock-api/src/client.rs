// Cloud API HTTP client
//
// Wraps `reqwest::Client` with TTLock-specific authentication parameters,
// `errcode` envelope checking, and per-request log correlation. Endpoint
// groups (locks, passcodes) are implemented as inherent methods in
// separate files to keep this module focused on transport mechanics.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::gateway::{GatewayLock, GatewayPermit};
use crate::models::Page;
use crate::transport::TransportConfig;

/// Default regional endpoint of the open API.
pub const DEFAULT_BASE_URL: &str = "https://euapi.ttlock.com/v3/";

/// Raw HTTP client for the TTLock open API.
///
/// Every request carries `clientId`, `accessToken` and a millisecond `date`.
/// Responses are plain JSON objects; a non-zero `errcode` field marks a
/// vendor-side failure and is turned into [`Error::Vendor`].
pub struct TtlockClient {
    http: reqwest::Client,
    base_url: Url,
    client_id: String,
    access_token: SecretString,
    gateway: GatewayLock,
}

impl TtlockClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// The `base_url` should end in a slash (e.g. `https://euapi.ttlock.com/v3/`)
    /// so that endpoint paths are joined beneath it.
    pub fn new(
        base_url: Url,
        client_id: String,
        access_token: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, client_id, access_token))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        client_id: String,
        access_token: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            client_id,
            access_token,
            gateway: GatewayLock::shared(),
        }
    }

    /// Use a specific gateway serialization resource instead of the shared one.
    pub fn with_gateway(mut self, gateway: GatewayLock) -> Self {
        self.gateway = gateway;
        self
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The OAuth client identifier sent with every request.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The gateway serialization resource this client honours.
    pub fn gateway(&self) -> &GatewayLock {
        &self.gateway
    }

    pub(crate) async fn gateway_permit(&self) -> GatewayPermit<'_> {
        self.gateway.acquire().await
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn auth_params(&self) -> [(&'static str, String); 3] {
        [
            ("clientId", self.client_id.clone()),
            ("accessToken", self.access_token.expose_secret().to_owned()),
            ("date", chrono::Utc::now().timestamp_millis().to_string()),
        ]
    }

    /// Send a GET request with `params` as query arguments.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.base_url.join(path)?;
        let log_id = request_tag();
        debug!(log_id, %url, ?params, "sending GET");

        let resp = self
            .http
            .get(url)
            .query(params)
            .query(&self.auth_params())
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_response(resp, &log_id).await
    }

    /// Send a POST request: auth in the query string, `params` as a form body.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.base_url.join(path)?;
        let log_id = request_tag();
        debug!(log_id, %url, ?params, "sending POST");

        let resp = self
            .http
            .post(url)
            .query(&self.auth_params())
            .form(params)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_response(resp, &log_id).await
    }

    /// GET every page of a paged `*/list*` endpoint.
    ///
    /// Stops at the `pages` count the API reports, or at the first empty
    /// page when it reports none.
    pub(crate) async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        page_size: u32,
    ) -> Result<Vec<T>, Error> {
        let mut items = Vec::new();
        let mut page_no: u32 = 1;
        loop {
            let mut query = params.to_vec();
            query.push(("pageNo", page_no.to_string()));
            query.push(("pageSize", page_size.to_string()));

            let page: Page<T> = self.get(path, &query).await?;
            let fetched = page.list.len();
            items.extend(page.list);

            let pages = page.pages.unwrap_or(1);
            if fetched == 0 || page_no >= pages {
                break;
            }
            page_no += 1;
        }
        Ok(items)
    }
}

/// Four hex characters correlating a request with its response in the logs.
fn request_tag() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..4].to_owned()
}

/// Check HTTP status and the `errcode` field, then decode the body into `T`.
async fn parse_response<T: DeserializeOwned>(
    resp: reqwest::Response,
    log_id: &str,
) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        debug!(log_id, status = status.as_u16(), body, "request failed");
        return Err(Error::Http {
            status: status.as_u16(),
            body,
        });
    }
    debug!(log_id, status = status.as_u16(), body, "received response");

    let value: Value = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.clone(),
    })?;

    check_errcode(&value)?;

    serde_json::from_value(value).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

/// A response with a non-zero `errcode` is a vendor error, whatever the
/// HTTP status said.
pub(crate) fn check_errcode(value: &Value) -> Result<(), Error> {
    let code = value.get("errcode").and_then(Value::as_i64).unwrap_or(0);
    if code == 0 {
        return Ok(());
    }
    let message = value
        .get("errmsg")
        .and_then(Value::as_str)
        .map_or_else(|| format!("errcode={code}"), str::to_owned);
    Err(Error::Vendor { code, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zero_errcode_is_success() {
        assert!(check_errcode(&json!({ "errcode": 0, "errmsg": "none error message" })).is_ok());
        assert!(check_errcode(&json!({ "lockId": 1 })).is_ok());
    }

    #[test]
    fn non_zero_errcode_is_vendor_error() {
        let err = check_errcode(&json!({ "errcode": -3003, "errmsg": "Gateway is busy" }))
            .unwrap_err();
        assert_eq!(err.vendor_code(), Some(-3003));
        assert_eq!(err.to_string(), "TTLock API error -3003: Gateway is busy");
    }

    #[test]
    fn request_tag_is_four_hex_chars() {
        let tag = request_tag();
        assert_eq!(tag.len(), 4);
        assert!(tag.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
