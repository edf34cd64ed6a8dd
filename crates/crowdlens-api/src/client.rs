// REST client for the analytics backend.
//
// Wraps `reqwest::Client` with base-URL joining, bearer token injection, and
// uniform status/body handling. Endpoint groups (auth, sites, analytics) are
// inherent methods in their own files.

use std::sync::{PoisonError, RwLock};

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Longest slice of an error body carried into error messages.
const BODY_PREVIEW_LEN: usize = 200;

/// HTTP client for the analytics REST API.
///
/// The bearer token lives behind a lock so a single shared client can be
/// logged in or out without rebuilding the connection pool.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `https://host/api`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            token: RwLock::new(None),
        }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Token management ─────────────────────────────────────────────

    /// Install or clear the bearer token attached to authenticated calls.
    pub fn set_token(&self, token: Option<SecretString>) {
        debug!(present = token.is_some(), "updating bearer token");
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// The current bearer token, if any.
    pub fn token(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let guard = self.token.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{path}`, preserving any path prefix on the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.authorize(self.http.get(url)).send().await?;
        Self::parse_response(resp).await
    }

    /// Send a POST request with a JSON body and decode the JSON response.
    pub(crate) async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", url);
        let resp = self
            .authorize(self.http.post(url))
            .json(body)
            .send()
            .await?;
        Self::parse_response(resp).await
    }

    async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await?;
        trace!(%status, len = body.len(), "response received");

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: error_message(&body).unwrap_or_else(|| "token rejected".into()),
            });
        }

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| preview(&body)),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

/// Pull a `message` or `error` string out of a JSON error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map(str::to_owned)
}

pub(crate) fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_LEN).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let c = client("https://counts.example.com/api/");
        assert_eq!(
            c.endpoint("analytics/dwell").unwrap().as_str(),
            "https://counts.example.com/api/analytics/dwell"
        );
        let c = client("https://counts.example.com/api");
        assert_eq!(
            c.endpoint("/sites").unwrap().as_str(),
            "https://counts.example.com/api/sites"
        );
    }

    #[test]
    fn token_roundtrip() {
        let c = client("http://localhost/api");
        assert!(!c.has_token());
        c.set_token(Some(SecretString::from("abc")));
        assert_eq!(c.token().unwrap().expose_secret(), "abc");
        c.set_token(None);
        assert!(c.token().is_none());
    }

    #[test]
    fn error_message_prefers_message_field() {
        assert_eq!(
            error_message(r#"{"message":"bad range","error":"x"}"#).as_deref(),
            Some("bad range")
        );
        assert_eq!(error_message(r#"{"error":"nope"}"#).as_deref(), Some("nope"));
        assert_eq!(error_message("<html>"), None);
    }
}
