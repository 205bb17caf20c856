// Liveness endpoint
//
// `GET /usapi?method=ping` is the cheapest call the firmware offers and
// needs no session. Discovery uses it to tell appliances apart from any
// other host that happens to answer HTTP on the subnet.

use serde_json::Value;
use tracing::trace;

use crate::client::{DeviceClient, ResultCode};
use crate::error::Error;

impl DeviceClient {
    /// Ping the device.
    ///
    /// `GET /usapi?method=ping`
    ///
    /// Returns `Ok(true)` only for a JSON body whose `result` is `0` or
    /// `"0"`. Transport failures, non-success statuses and malformed bodies
    /// are errors; the caller decides how to classify them.
    pub async fn ping(&self) -> Result<bool, Error> {
        let url = self.usapi_url("ping", &[])?;
        let body: Value = self.get_json(url, None).await?;
        let code = ResultCode::from_body(&body);
        trace!(address = %self.address(), ?code, "ping answered");
        Ok(code.is_success())
    }
}
