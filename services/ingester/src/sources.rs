//! Upstream providers.
//!
//! Each provider sits behind a trait so runs can be driven by a stub in tests.
//! Fetches are single attempts: a failed run is simply retried by the next
//! scheduled invocation.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, SecondsFormat, Utc};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use comfort_common::{provider_date, ComfortError, ComfortResult};
use ingestion::{TrafficGrouping, WeatherSchema, FIELD_MAP};

use crate::context::RunContext;

/// Source of weather telemetry payloads.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the raw JSON document for one API mode.
    async fn fetch(&self, ctx: &RunContext, schema: WeatherSchema) -> ComfortResult<Value>;
}

/// Source of gate traffic payloads.
#[async_trait]
pub trait TrafficSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(
        &self,
        ctx: &RunContext,
        grouping: TrafficGrouping,
        window: DateWindow,
    ) -> ComfortResult<Value>;
}

/// Inclusive calendar-date range requested from the traffic provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The day before `date` through `date`.
    pub fn daily(date: NaiveDate) -> Self {
        Self {
            start: date.pred_opt().unwrap_or(date),
            end: date,
        }
    }

    /// Last day of the previous year through `date`.
    pub fn year_to_date(date: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(date.year() - 1, 12, 31).unwrap_or(date);
        Self { start, end: date }
    }

    pub fn for_grouping(grouping: TrafficGrouping, date: NaiveDate) -> Self {
        match grouping {
            TrafficGrouping::Day => Self::daily(date),
            TrafficGrouping::Interval => Self::year_to_date(date),
        }
    }
}

/// Build the shared HTTP client.
pub fn build_http_client(timeout_secs: u64) -> ComfortResult<Client> {
    Client::builder()
        .timeout(StdDuration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ComfortError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))
}

/// Check the status and decode the body of a provider response.
async fn read_json(source: &str, response: Response) -> ComfortResult<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(ComfortError::UpstreamStatus {
            source_name: source.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| ComfortError::fetch(source, format!("Failed to read body: {}", e)))?;

    debug!(source = %source, bytes = body.len(), "Received response");

    serde_json::from_str(&body)
        .map_err(|e| ComfortError::schema(source, format!("Response is not JSON: {}", e)))
}

// ============================================================================
// Tomorrow.io
// ============================================================================

/// Tomorrow.io v4 weather client.
pub struct TomorrowClient {
    client: Client,
    base_url: String,
    api_key: String,
    location: String,
    units: String,
    history_days: u32,
}

impl TomorrowClient {
    pub const NAME: &'static str = "tomorrow.io";

    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        location: impl Into<String>,
        units: impl Into<String>,
        history_days: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            location: location.into(),
            units: units.into(),
            history_days,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ComfortResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| ComfortError::fetch(Self::NAME, e.to_string()))?;
        read_json(Self::NAME, response).await
    }

    fn history_body(&self, ctx: &RunContext) -> Value {
        let end = Utc::now();
        let start = end - Duration::days(i64::from(self.history_days));
        let fields: Vec<&str> = FIELD_MAP.iter().map(|(provider, _)| *provider).collect();

        json!({
            "location": self.location,
            "fields": fields,
            "timesteps": ["1h"],
            "startTime": start.to_rfc3339_opts(SecondsFormat::Secs, true),
            "endTime": end.to_rfc3339_opts(SecondsFormat::Secs, true),
            "units": self.units,
            "timezone": ctx.zone.to_string(),
        })
    }
}

#[async_trait]
impl TelemetrySource for TomorrowClient {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip(self, ctx, schema), fields(run_id = %ctx.run_id, schema = %schema))]
    async fn fetch(&self, ctx: &RunContext, schema: WeatherSchema) -> ComfortResult<Value> {
        let request = match schema {
            WeatherSchema::Realtime => self
                .client
                .get(format!("{}/weather/realtime", self.base_url))
                .query(&[
                    ("apikey", self.api_key.as_str()),
                    ("location", self.location.as_str()),
                    ("units", self.units.as_str()),
                ]),
            WeatherSchema::Forecast { timestep } => self
                .client
                .get(format!("{}/weather/forecast", self.base_url))
                .query(&[
                    ("apikey", self.api_key.as_str()),
                    ("location", self.location.as_str()),
                    ("timesteps", timestep.query_value()),
                    ("units", self.units.as_str()),
                ]),
            WeatherSchema::History => self
                .client
                .post(format!("{}/timelines", self.base_url))
                .header("apikey", self.api_key.as_str())
                .json(&self.history_body(ctx)),
        };

        info!(location = %self.location, "Fetching weather");
        self.send(request.header("accept", "application/json")).await
    }
}

// ============================================================================
// SenSource
// ============================================================================

/// SenSource VEA traffic client.
pub struct SensourceClient {
    client: Client,
    base_url: String,
    token: String,
}

impl SensourceClient {
    pub const NAME: &'static str = "sensource";

    pub fn new(client: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl TrafficSource for SensourceClient {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip(self, ctx, grouping, window), fields(run_id = %ctx.run_id, grouping = grouping.name()))]
    async fn fetch(
        &self,
        ctx: &RunContext,
        grouping: TrafficGrouping,
        window: DateWindow,
    ) -> ComfortResult<Value> {
        let start = provider_date(window.start);
        let end = provider_date(window.end);

        info!(start = %start, end = %end, "Fetching traffic");

        let response = self
            .client
            .get(format!("{}/api/data/traffic", self.base_url))
            .bearer_auth(&self.token)
            .header("accept", "application/json")
            .query(&[
                ("relativeDate", "custom"),
                ("startDate", start.as_str()),
                ("endDate", end.as_str()),
                ("dateGroupings", grouping.query_value()),
                ("entityType", "sensor"),
                ("excludeClosedHours", "true"),
                ("metrics", grouping.metrics()),
            ])
            .send()
            .await
            .map_err(|e| ComfortError::fetch(Self::NAME, e.to_string()))?;

        read_json(Self::NAME, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_window() {
        let window = DateWindow::daily(date(2024, 3, 1));
        assert_eq!(window.start, date(2024, 2, 29));
        assert_eq!(window.end, date(2024, 3, 1));
    }

    #[test]
    fn test_year_to_date_window() {
        let window = DateWindow::for_grouping(TrafficGrouping::Interval, date(2024, 6, 15));
        assert_eq!(window.start, date(2023, 12, 31));
        assert_eq!(window.end, date(2024, 6, 15));

        let window = DateWindow::year_to_date(date(2024, 1, 1));
        assert_eq!(window.start, date(2023, 12, 31));
    }

    #[test]
    fn test_history_body() {
        let client = TomorrowClient::new(
            build_http_client(5).unwrap(),
            "https://api.tomorrow.io/v4/",
            "key",
            "38.6355,-90.2905",
            "imperial",
            7,
        );
        let ctx = RunContext::new(Default::default());
        let body = client.history_body(&ctx);

        assert_eq!(client.base_url, "https://api.tomorrow.io/v4");
        assert_eq!(body["timesteps"], json!(["1h"]));
        assert_eq!(body["timezone"], "America/Chicago");
        assert_eq!(body["fields"].as_array().unwrap().len(), FIELD_MAP.len());
        assert!(body["startTime"].as_str().unwrap() < body["endTime"].as_str().unwrap());
    }
}
