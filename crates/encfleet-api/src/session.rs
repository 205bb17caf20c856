// Device login
//
// `GET /usapi?method=login&id=<user>&pass=<md5>` answers with a JSON body
// and one or more session cookies. The cookies are folded into a single
// `Cookie` header value that the caller carries for the rest of one
// operation. Sessions are never cached or shared between operations.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use crate::auth::Credentials;
use crate::client::{DeviceClient, ResultCode, check_status, decode_json};
use crate::error::Error;
use crate::retry::RetryPolicy;

/// Session credential produced by a successful login: the folded
/// `name=value; name2=value2` cookie header.
#[derive(Clone)]
pub struct Session {
    cookie_header: SecretString,
}

impl Session {
    pub fn from_cookie_header(header: impl Into<String>) -> Self {
        Self {
            cookie_header: SecretString::from(header.into()),
        }
    }

    /// The value to send in the `Cookie` request header.
    pub fn cookie_header(&self) -> &str {
        self.cookie_header.expose_secret()
    }

    /// `true` when the device set no cookies at all.
    pub fn is_empty(&self) -> bool {
        self.cookie_header.expose_secret().is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cookie_header", &"[REDACTED]")
            .finish()
    }
}

impl DeviceClient {
    /// Log in once, without retrying.
    ///
    /// An HTTP 401/403 or a non-zero `result` code is an explicit rejection
    /// and surfaces as [`Error::Authentication`].
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, Error> {
        let digest = credentials.password_digest();
        let url = self.usapi_url(
            "login",
            &[("id", credentials.username.as_str()), ("pass", digest.as_str())],
        )?;

        debug!(address = %self.address(), username = %credentials.username, "logging in");

        let resp = self
            .request(reqwest::Method::GET, url, "application/json", None)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let cookie_header = resp
            .cookies()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect::<Vec<_>>()
            .join("; ");

        let body: Value = decode_json(resp).await?;
        if let ResultCode::Failure(code) = ResultCode::from_body(&body) {
            return Err(Error::Authentication {
                message: format!("device returned result {code}"),
            });
        }

        debug!(
            address = %self.address(),
            cookies = cookie_header.split("; ").filter(|c| !c.is_empty()).count(),
            "login successful"
        );
        Ok(Session::from_cookie_header(cookie_header))
    }

    /// Log in under `policy`: connection-level failures are retried,
    /// rejections return immediately.
    pub async fn login_with_retry(
        &self,
        credentials: &Credentials,
        policy: &RetryPolicy,
    ) -> Result<Session, Error> {
        policy.run("login", || self.login(credentials)).await
    }
}
