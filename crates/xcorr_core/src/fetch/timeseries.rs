//! HTTP waveform source backed by a timeseries web service.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;

use crate::models::ChannelSpec;
use crate::waveform::RawStream;

use super::{geocsv, SourceError, WaveformSource};

/// Default service endpoint.
pub const DEFAULT_TIMESERIES_URL: &str = "https://service.iris.edu/irisws/timeseries/1/query";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Waveform source that requests GeoCSV sample lists over HTTP.
///
/// HTTP 204 and 404 are the service's "no data" answers; every other
/// failure is reported as transient.
pub struct TimeseriesClient {
    client: reqwest::Client,
    base_url: String,
    correct_response: bool,
}

impl TimeseriesClient {
    /// Create a client.
    ///
    /// When `correct_response` is set, the service is asked to remove the
    /// instrument response and return earth units instead of raw counts.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        correct_response: bool,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::transient(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            correct_response,
        })
    }

    /// Query parameters for one request.
    pub fn query_params(
        &self,
        channel: &ChannelSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("net", channel.network().to_string()),
            ("sta", channel.station().to_string()),
            ("loc", channel.location().to_string()),
            ("cha", channel.channel().to_string()),
            ("start", start.format(TIME_FORMAT).to_string()),
            ("end", end.format(TIME_FORMAT).to_string()),
            ("format", "geocsv.slist".to_string()),
        ];
        if self.correct_response {
            params.push(("correct", "true".to_string()));
        }
        params
    }
}

#[async_trait]
impl WaveformSource for TimeseriesClient {
    fn name(&self) -> &str {
        "timeseries"
    }

    async fn get_waveforms(
        &self,
        channel: &ChannelSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<RawStream, SourceError> {
        let params = self.query_params(channel, start, end);

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::transient(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND {
            return Err(SourceError::no_data(channel, start, end));
        }
        if !status.is_success() {
            return Err(SourceError::transient(format!(
                "HTTP {} for {}",
                status, channel
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::transient(format!("Failed to read response: {}", e)))?;

        let traces = geocsv::parse(&body, channel.location())?;
        if traces.is_empty() {
            return Err(SourceError::no_data(channel, start, end));
        }

        Ok(RawStream::new(channel.clone(), traces))
    }
}
