#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crowdlens_api::models::EntryExitRequest;
use crowdlens_api::{ApiClient, Error, TimeRange};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

const RANGE: TimeRange = TimeRange {
    from_utc: 1_700_000_000_000,
    to_utc: 1_700_086_399_999,
};

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success_installs_token() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "ops@example.com", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "jwt-abc",
            "user": {"id": "u1", "email": "Ops@Example.com", "name": "Ops"}
        })))
        .mount(&server)
        .await;

    let secret = SecretString::from("hunter2");
    let login = client.login("ops@example.com", &secret).await.unwrap();

    assert_eq!(login.token, "jwt-abc");
    assert_eq!(
        login.user.and_then(|u| u.email).as_deref(),
        Some("Ops@Example.com")
    );
    assert_eq!(client.token().unwrap().expose_secret(), "jwt-abc");
}

#[tokio::test]
async fn test_login_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let result = client
        .login("ops@example.com", &SecretString::from("wrong"))
        .await;

    match result {
        Err(Error::Authentication { message }) => {
            assert!(message.contains("Invalid credentials"), "got: {message}");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(!client.has_token());
}

// ── Sites ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_sites_sends_bearer_token() {
    let (server, client) = setup().await;
    client.set_token(Some(SecretString::from("jwt-abc")));

    Mock::given(method("GET"))
        .and(path("/api/sites"))
        .and(header("authorization", "Bearer jwt-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "siteId": "site-1",
                "name": "Downtown Mall",
                "city": "Austin",
                "country": "US",
                "timezone": "America/Chicago",
                "zones": [
                    {"zoneId": "z-1", "name": "Main Entrance", "securityLevel": "low"},
                    {"zoneId": "z-2"}
                ]
            },
            {"siteId": "site-2", "name": "Airport"}
        ])))
        .mount(&server)
        .await;

    let sites = client.list_sites().await.unwrap();
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0].site_id, "site-1");
    assert_eq!(sites[0].zones.as_ref().unwrap().len(), 2);
    assert!(sites[1].zones.is_none());
}

#[tokio::test]
async fn test_list_sites_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sites"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_sites().await.unwrap_err();
    assert!(err.is_auth_expired(), "expected auth error, got: {err:?}");
}

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sites"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client.list_sites().await.unwrap_err();
    match err {
        Error::Api { status, ref message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "bad gateway");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = client.list_sites().await.unwrap_err();
    assert!(
        matches!(err, Error::Deserialization { ref body, .. } if body == "{not json"),
        "got: {err:?}"
    );
}

// ── Analytics ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_dwell_posts_range_query() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/analytics/dwell"))
        .and(body_json(json!({
            "siteId": "site-1",
            "fromUtc": 1_700_000_000_000_i64,
            "toUtc": 1_700_086_399_999_i64
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "avgDwellMinutes": 12.5,
            "comparison": {"previous": 10.0, "change": 2.5, "changePercent": 25.0}
        })))
        .mount(&server)
        .await;

    let dwell = client.dwell("site-1", RANGE).await.unwrap();
    assert_eq!(dwell.avg_dwell_minutes, Some(12.5));
    assert_eq!(dwell.comparison.unwrap().change_percent, 25.0);
}

#[tokio::test]
async fn test_occupancy_buckets() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/analytics/occupancy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "buckets": [
                {"utc": 1_700_000_000_000_i64, "local": "14/11/2023 22:13", "avg": 4.0},
                {"utc": 1_700_000_900_000_i64, "avg": 7.5}
            ]
        })))
        .mount(&server)
        .await;

    let occ = client.occupancy("site-1", RANGE).await.unwrap();
    let buckets = occ.buckets.unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[1].avg, Some(7.5));
}

#[tokio::test]
async fn test_footfall_and_demographics() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/analytics/footfall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"todayFootfall": 321})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/analytics/demographics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current": {"male": 3, "female": 5},
            "timeseries": [{"timestamp": "2023-11-14T22:00:00Z", "male": 3, "female": 5}]
        })))
        .mount(&server)
        .await;

    let footfall = client.footfall("site-1", RANGE).await.unwrap();
    assert_eq!(footfall.footfall, None);
    assert_eq!(footfall.today_footfall, Some(321));

    let demo = client.demographics("site-1", RANGE).await.unwrap();
    assert_eq!(demo.current.unwrap().female, Some(5.0));
    assert_eq!(demo.timeseries.unwrap().len(), 1);
}

#[tokio::test]
async fn test_entry_exit_page() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/analytics/entry-exit"))
        .and(body_json(json!({"pageNumber": 2, "pageSize": 10, "siteId": "site-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "siteId": "site-1",
            "pageSize": 10,
            "pageNumber": 2,
            "totalRecords": 11,
            "totalPages": 2,
            "records": [{
                "personId": "p-11",
                "personName": "Ada Lovelace",
                "gender": "female",
                "zoneName": "Main Entrance",
                "entryUtc": 1_700_000_000_000_i64,
                "entryLocal": "22:13",
                "exitUtc": null,
                "exitLocal": null,
                "dwellMinutes": null
            }]
        })))
        .mount(&server)
        .await;

    let page = client
        .entry_exit(&EntryExitRequest {
            page_number: 2,
            page_size: 10,
            site_id: Some("site-1".into()),
        })
        .await
        .unwrap();

    assert_eq!(page.total_pages, 2);
    let records = page.records.unwrap();
    assert_eq!(records[0].person_name.as_deref(), Some("Ada Lovelace"));
    assert!(records[0].exit_utc.is_none());
}
