// Integration tests for `TtlockClient` using wiremock.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use ttlock_api::models::{AddPasscodeParams, PassageModeParams};
use ttlock_api::{Error, GatewayLock, TtlockClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, TtlockClient) {
    let server = MockServer::start().await;
    let base = url::Url::parse(&format!("{}/v3/", server.uri())).unwrap();
    let client = TtlockClient::with_client(
        reqwest::Client::new(),
        base,
        "client-id".into(),
        SecretString::from("token".to_owned()),
    )
    .with_gateway(GatewayLock::new());
    (server, client)
}

fn lock_details() -> serde_json::Value {
    json!({
        "date": 1_669_690_212_000_i64,
        "lockAlias": "Front Door",
        "modelNum": "SN9206_PV53",
        "lockMac": "16:72:4C:CC:01:C4",
        "featureValue": "F44354CD5F3",
        "adminPwd": "<REMOVED>",
        "hasGateway": 1,
        "autoLockTime": 60,
        "lockKey": "<REMOVED>",
        "lockName": "S31_c401cc",
        "firmwareRevision": "6.0.6.210622",
        "timezoneRawOffset": 46_800_000,
        "lockId": 7_252_408,
        "electricQuantity": 90,
        "hardwareRevision": "1.6",
    })
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_requests_carry_auth_params() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/lock/detail"))
        .and(query_param("lockId", "7252408"))
        .and(query_param("clientId", "client-id"))
        .and(query_param("accessToken", "token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lock_details()))
        .expect(1)
        .mount(&server)
        .await;

    let details = client.get_lock(7_252_408).await.unwrap();
    assert_eq!(details.lock_alias, "Front Door");
    assert_eq!(details.electric_quantity, Some(90));
    assert_eq!(details.auto_lock_time, 60);
    assert_eq!(details.model_num.as_deref(), Some("SN9206_PV53"));

    let requests = server.received_requests().await.unwrap();
    let date = requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "date")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert!(date.parse::<i64>().unwrap() > 1_600_000_000_000);
}

// ── Enumeration ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_locks_filters_unreachable_and_dedupes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/lock/list"))
        .and(query_param("pageNo", "1"))
        .and(query_param("pageSize", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [
                { "lockId": 1, "hasGateway": 1 },
                { "lockId": 2, "hasGateway": 0, "featureValue": "F44354CD5F3" },
                { "lockId": 3, "hasGateway": 0, "featureValue": "100000000000000" },
            ],
            "pageNo": 1, "pageSize": 1000, "pages": 1, "total": 3
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/key/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [
                { "lockId": 1, "hasGateway": 1 },
                { "lockId": 4, "hasGateway": 1 },
            ]
        })))
        .mount(&server)
        .await;

    let ids = client.list_locks().await.unwrap();
    assert_eq!(ids, vec![1, 3, 4]);
}

#[tokio::test]
async fn test_get_lock_falls_back_to_ekey_view() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/lock/detail"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "errcode": -4043, "errmsg": "not an admin" })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/key/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lock_details()))
        .expect(1)
        .mount(&server)
        .await;

    let details = client.get_lock(7_252_408).await.unwrap();
    assert_eq!(details.lock_id, 7_252_408);
}

#[tokio::test]
async fn test_get_lock_second_failure_propagates() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "errcode": 1, "errmsg": "failed" })),
        )
        .mount(&server)
        .await;

    let err = client.get_lock(1).await.unwrap_err();
    assert_eq!(err.vendor_code(), Some(1));
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn test_http_error_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client.get_lock_state(1).await.unwrap_err();
    match err {
        Error::Http { status, ref body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/lock/detail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "lockId": "nope" })))
        .mount(&server)
        .await;

    let err = client.get_lock(1).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_lock_vendor_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/lock/lock"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "errcode": -3003, "errmsg": "Gateway is busy" })),
        )
        .mount(&server)
        .await;

    let err = client.lock(1).await.unwrap_err();
    assert_eq!(err.vendor_code(), Some(-3003));
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_passage_mode_form() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v3/lock/configPassageMode"))
        .and(query_param("clientId", "client-id"))
        .and(body_string_contains("type=2"))
        .and(body_string_contains("passageMode=1"))
        .and(body_string_contains("autoUnlock=2"))
        .and(body_string_contains("isAllDay=2"))
        .and(body_string_contains("startDate=360"))
        .and(body_string_contains("endDate=1080"))
        .and(body_string_contains("weekDays=%5B1%2C2%2C3%5D"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let params = PassageModeParams {
        enabled: true,
        auto_unlock: false,
        all_day: false,
        start_minute: 360,
        end_minute: 1080,
        week_days: vec![1, 2, 3],
    };
    client.set_passage_mode(1, &params).await.unwrap();
}

#[tokio::test]
async fn test_add_and_delete_passcode() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v3/keyboardPwd/add"))
        .and(body_string_contains("addType=2"))
        .and(body_string_contains("keyboardPwdType=3"))
        .and(body_string_contains("keyboardPwd=123456"))
        .and(body_string_contains("startDate=1682244497000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keyboardPwdId": 42 })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/keyboardPwd/delete"))
        .and(body_string_contains("deleteType=2"))
        .and(body_string_contains("keyboardPwdId=42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client
        .add_passcode(
            1,
            &AddPasscodeParams {
                passcode: "123456".into(),
                name: "guest".into(),
                start_ms: 1_682_244_497_000,
                end_ms: 1_682_330_897_000,
            },
        )
        .await
        .unwrap();
    assert_eq!(id, Some(42));

    client.delete_passcode(1, 42).await.unwrap();
}

#[tokio::test]
async fn test_list_passcodes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/lock/listKeyboardPwd"))
        .and(query_param("pageSize", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{
                "keyboardPwdId": 7,
                "keyboardPwd": "4242",
                "keyboardPwdName": "cleaner",
                "keyboardPwdType": 3,
                "startDate": 1_682_244_497_000_i64,
                "endDate": 1_682_330_897_000_i64,
            }]
        })))
        .mount(&server)
        .await;

    let codes = client.list_passcodes(1).await.unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].keyboard_pwd_name.as_deref(), Some("cleaner"));
    assert_eq!(codes[0].keyboard_pwd_type, 3);
}

#[tokio::test]
async fn test_list_passcodes_follows_every_page() {
    let (server, client) = setup().await;

    for (page_no, id) in [("1", 7), ("2", 8)] {
        Mock::given(method("GET"))
            .and(path("/v3/lock/listKeyboardPwd"))
            .and(query_param("pageNo", page_no))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [{
                    "keyboardPwdId": id,
                    "keyboardPwd": "4242",
                    "keyboardPwdType": 3,
                }],
                "pageNo": page_no.parse::<u32>().unwrap(),
                "pages": 2,
                "total": 2,
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let codes = client.list_passcodes(1).await.unwrap();
    let ids: Vec<i64> = codes.iter().map(|c| c.keyboard_pwd_id).collect();
    assert_eq!(ids, vec![7, 8]);
}

// ── Gateway serialization ───────────────────────────────────────────

/// Counts concurrently in-flight requests and records the peak.
struct ConcurrencyProbe {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Respond for ConcurrencyProbe {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0 }))
    }
}

#[tokio::test]
async fn test_gateway_commands_never_overlap() {
    let (server, client) = setup().await;
    let peak = Arc::new(AtomicUsize::new(0));

    Mock::given(method("GET"))
        .respond_with(ConcurrencyProbe {
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
        })
        .mount(&server)
        .await;

    let (a, b, c) = tokio::join!(client.lock(1), client.unlock(2), client.get_lock_state(3));
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(peak.load(Ordering::SeqCst), 1);
}
