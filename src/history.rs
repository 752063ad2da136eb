//! ==============================================================================
//! history.rs - one-shot history retrieval per sensor
//! ==============================================================================
//!
//! purpose:
//!     pulls the stored points for one sensor from the backend at session
//!     start: GET <base>/<sensor>?limit=N -> [{id?, value, time}, ...]
//!
//! failure policy:
//!     `fetch` returns the error so it can be tested; the session logs it and
//!     leaves the sensor's buffer as it was. nothing is retried.
//!
//! ==============================================================================

use crate::domain::{DisplayPoint, RawPoint, SensorKey};
use crate::error::{DashError, Result};
use crate::normalize::normalize;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
pub struct HistoryLoader {
    client: reqwest::Client,
    base: Url,
    limit: usize,
}

impl HistoryLoader {
    pub fn new(base: Url, limit: usize) -> Self {
        Self::with_client(reqwest::Client::new(), base, limit)
    }

    pub fn with_client(client: reqwest::Client, base: Url, limit: usize) -> Self {
        Self { client, base, limit }
    }

    /// `<base>/<sensor>`; any path already on the base is kept
    pub fn endpoint(&self, key: SensorKey) -> String {
        format!("{}/{}", self.base.as_str().trim_end_matches('/'), key.api_name())
    }

    /// normalized history, newest `limit` points, in arrival order
    pub async fn fetch(&self, key: SensorKey) -> Result<Vec<DisplayPoint>> {
        let path = self.endpoint(key);
        debug!(sensor = %key, %path, "fetching history");

        let response = self
            .client
            .get(path.as_str())
            .query(&[("limit", self.limit)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashError::Status {
                path,
                status: status.as_u16(),
            });
        }

        let raw: Vec<RawPoint> = response.json().await?;
        let skip = raw.len().saturating_sub(self.limit);
        Ok(raw.iter().skip(skip).map(normalize).collect())
    }
}
