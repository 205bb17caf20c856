// Device API HTTP client
//
// Wraps `reqwest::Client` with `usapi` URL construction, status mapping and
// JSON decoding. Endpoint methods (login, ping, settings, report) live in
// separate files as inherent impls to keep this module focused on transport
// mechanics.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::session::Session;

const BODY_PREVIEW_LEN: usize = 200;

/// The `result` field every `usapi` response carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultCode {
    /// `0` or `"0"`.
    Success,
    /// Any other value, rendered as text.
    Failure(String),
    /// The body is not an object or has no `result` field.
    Absent,
}

impl ResultCode {
    pub fn from_body(body: &Value) -> Self {
        match body.get("result") {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::Number(n)) if n.as_i64() == Some(0) || n.as_f64() == Some(0.0) => {
                Self::Success
            }
            Some(Value::String(s)) if s.trim() == "0" => Self::Success,
            Some(Value::String(s)) => Self::Failure(s.clone()),
            Some(other) => Self::Failure(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Build the base URL for a device address.
///
/// Accepts a bare host (`172.16.6.10`, port `port` appended unless it is
/// 80), a socket address (`127.0.0.1:8080`, used as-is), or a full URL.
pub fn device_base_url(address: &str, port: u16) -> Result<Url, Error> {
    let address = address.trim();
    if address.contains("://") {
        return Ok(Url::parse(address)?);
    }
    if address.parse::<SocketAddr>().is_ok() || port == 80 {
        return Ok(Url::parse(&format!("http://{address}/"))?);
    }
    Ok(Url::parse(&format!("http://{address}:{port}/"))?)
}

/// HTTP client for a single appliance's `usapi` endpoint.
///
/// Cheap to construct: the inner `reqwest::Client` is reference-counted,
/// so the fleet layer builds one `DeviceClient` per device per operation
/// from a shared client.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
    address: String,
    timeout: Option<Duration>,
}

impl DeviceClient {
    /// Create a client for `address` on top of a shared HTTP client.
    pub fn new(http: reqwest::Client, address: &str, port: u16) -> Result<Self, Error> {
        let base_url = device_base_url(address, port)?;
        Ok(Self {
            http,
            base_url,
            address: address.to_owned(),
            timeout: None,
        })
    }

    /// Create a client from an explicit base URL (used by tests against a
    /// mock server).
    pub fn with_base_url(http: reqwest::Client, base_url: Url) -> Self {
        let address = base_url
            .host_str()
            .map(|host| match base_url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_owned(),
            })
            .unwrap_or_default();
        Self {
            http,
            base_url,
            address,
            timeout: None,
        }
    }

    /// Override the per-request deadline for every call made by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The address this client talks to, as given by the caller.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/usapi?method={method}&{params...}`, parameters in order.
    pub(crate) fn usapi_url(&self, method: &str, params: &[(&str, &str)]) -> Result<Url, Error> {
        let mut url = self.base_url.join("usapi")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("method", method);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) fn request(
        &self,
        method: Method,
        url: Url,
        accept: &'static str,
        session: Option<&Session>,
    ) -> RequestBuilder {
        let mut builder = self.http.request(method, url).header(ACCEPT, accept);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(session) = session.filter(|s| !s.is_empty()) {
            builder = builder.header(COOKIE, session.cookie_header());
        }
        builder
    }

    /// Send a GET and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        session: Option<&Session>,
    ) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self
            .request(Method::GET, url, "application/json", session)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        decode_json(resp).await
    }

    /// Send a POST with a JSON body and decode the JSON reply.
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
        session: Option<&Session>,
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self
            .request(Method::POST, url, "application/json", session)
            .json(body)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        decode_json(resp).await
    }

    /// Send a GET and return the body as text (HTML report).
    pub(crate) async fn get_text(
        &self,
        url: Url,
        session: Option<&Session>,
    ) -> Result<String, Error> {
        debug!("GET {}", url);
        let resp = self
            .request(Method::GET, url, "text/html", session)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.text().await?)
    }
}

/// Map auth rejections and other non-success statuses to errors.
pub(crate) async fn check_status(resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    trace!(%status, url = %resp.url(), "response status");

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(Error::Authentication {
            message: format!("device refused the request (HTTP {status})"),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Http {
            status: status.as_u16(),
            message: preview(&body).to_owned(),
        });
    }

    Ok(resp)
}

/// Read the body and deserialize it, keeping a preview for diagnostics.
pub(crate) async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, Error> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn result_code_accepts_numeric_and_string_zero() {
        assert_eq!(ResultCode::from_body(&json!({"result": 0})), ResultCode::Success);
        assert_eq!(ResultCode::from_body(&json!({"result": "0"})), ResultCode::Success);
        assert_eq!(ResultCode::from_body(&json!({"result": 0.0})), ResultCode::Success);
        assert_eq!(
            ResultCode::from_body(&json!({"result": 31})),
            ResultCode::Failure("31".into())
        );
        assert_eq!(
            ResultCode::from_body(&json!({"result": 0.5})),
            ResultCode::Failure("0.5".into())
        );
        assert_eq!(
            ResultCode::from_body(&json!({"result": "busy"})),
            ResultCode::Failure("busy".into())
        );
        assert_eq!(ResultCode::from_body(&json!({"status": 0})), ResultCode::Absent);
        assert_eq!(ResultCode::from_body(&json!([0])), ResultCode::Absent);
    }

    #[test]
    fn base_url_for_bare_host_uses_port() {
        assert_eq!(
            device_base_url("172.16.6.10", 80).unwrap().as_str(),
            "http://172.16.6.10/"
        );
        assert_eq!(
            device_base_url("172.16.6.10", 8080).unwrap().as_str(),
            "http://172.16.6.10:8080/"
        );
    }

    #[test]
    fn base_url_keeps_explicit_socket_address() {
        assert_eq!(
            device_base_url("127.0.0.1:4321", 80).unwrap().as_str(),
            "http://127.0.0.1:4321/"
        );
        assert_eq!(
            device_base_url("127.0.0.1:4321", 8080).unwrap().as_str(),
            "http://127.0.0.1:4321/"
        );
    }

    #[test]
    fn usapi_url_keeps_parameter_order() {
        let client = DeviceClient::new(reqwest::Client::new(), "10.0.0.5", 80).unwrap();
        let url = client
            .usapi_url("login", &[("id", "Admin"), ("pass", "abc123")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://10.0.0.5/usapi?method=login&id=Admin&pass=abc123"
        );
    }

    #[test]
    fn address_is_derived_from_base_url() {
        let url = Url::parse("http://127.0.0.1:5000").unwrap();
        let client = DeviceClient::with_base_url(reqwest::Client::new(), url);
        assert_eq!(client.address(), "127.0.0.1:5000");
    }
}
