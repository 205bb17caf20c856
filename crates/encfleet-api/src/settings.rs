// Settings endpoints
//
// Reading the configuration (`get-settings`, or the `get-report` HTML page
// as a fallback) and writing it back (`import-settings`). All three need
// the session cookie from a prior login.

use serde_json::{Map, Value};
use tracing::debug;

use crate::client::{DeviceClient, ResultCode};
use crate::error::Error;
use crate::report;
use crate::retry::RetryPolicy;
use crate::session::Session;

impl DeviceClient {
    /// Fetch the device's current settings document.
    ///
    /// `GET /usapi?method=get-settings`
    ///
    /// The whole JSON object is the document; a non-zero `result` code
    /// means the device refused and is reported as [`Error::Rejected`].
    pub async fn get_settings(&self, session: &Session) -> Result<Map<String, Value>, Error> {
        let url = self.usapi_url("get-settings", &[])?;
        let body: Value = self.get_json(url, Some(session)).await?;
        if let ResultCode::Failure(result) = ResultCode::from_body(&body) {
            return Err(Error::Rejected {
                method: "get-settings",
                result,
            });
        }
        match body {
            Value::Object(map) => {
                debug!(address = %self.address(), keys = map.len(), "settings fetched");
                Ok(map)
            }
            other => Err(Error::Deserialization {
                message: "get-settings did not return a JSON object".into(),
                body: other.to_string(),
            }),
        }
    }

    /// Fetch the HTML status report.
    ///
    /// `GET /usapi?method=get-report`
    pub async fn get_report(&self, session: &Session) -> Result<String, Error> {
        let url = self.usapi_url("get-report", &[])?;
        self.get_text(url, Some(session)).await
    }

    /// Fetch the status report and extract the settings document embedded
    /// under its `SETTINGS` section.
    pub async fn get_report_settings(
        &self,
        session: &Session,
    ) -> Result<Map<String, Value>, Error> {
        let html = self.get_report(session).await?;
        let settings = report::settings_from_report(&html)?;
        debug!(address = %self.address(), keys = settings.len(), "settings extracted from report");
        Ok(settings)
    }

    /// Replace the device's configuration.
    ///
    /// `POST /usapi?method=import-settings` with the document as the JSON
    /// body. Returns the device's acknowledgement.
    pub async fn import_settings(
        &self,
        session: &Session,
        settings: &Map<String, Value>,
    ) -> Result<Value, Error> {
        let url = self.usapi_url("import-settings", &[])?;
        let ack: Value = self.post_json(url, settings, Some(session)).await?;
        if let ResultCode::Failure(result) = ResultCode::from_body(&ack) {
            return Err(Error::Rejected {
                method: "import-settings",
                result,
            });
        }
        debug!(address = %self.address(), "settings imported");
        Ok(ack)
    }

    /// [`import_settings`](Self::import_settings) under `policy`.
    pub async fn import_settings_with_retry(
        &self,
        session: &Session,
        settings: &Map<String, Value>,
        policy: &RetryPolicy,
    ) -> Result<Value, Error> {
        policy
            .run("import-settings", || self.import_settings(session, settings))
            .await
    }
}
