// Login endpoint.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::client::{ApiClient, error_message, preview};
use crate::error::Error;
use crate::models::{LoginRequest, LoginResponse};

impl ApiClient {
    /// Exchange email and password for a bearer token.
    ///
    /// `POST /auth/login`. On success the token is installed on this client
    /// so subsequent calls are authenticated.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<LoginResponse, Error> {
        let url = self.endpoint("auth/login")?;
        debug!(email, "logging in");

        let body = LoginRequest {
            email,
            password: password.expose_secret(),
        };
        let resp = self.http().post(url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = error_message(&text).unwrap_or_else(|| preview(&text));
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {detail}"),
            });
        }

        let text = resp.text().await?;
        let login: LoginResponse =
            serde_json::from_str(&text).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: text,
            })?;

        self.set_token(Some(SecretString::from(login.token.clone())));
        info!("login successful");
        Ok(login)
    }
}
