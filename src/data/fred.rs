//! FRED API integration for the TIPS constant-maturity real yield series
//! (`DFII5`, `DFII7`, `DFII10`, `DFII20`, `DFII30`).

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::data::{ObservationSource, SourceError};
use crate::domain::Observation;
use crate::error::AppError;

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// FRED's marker for "no value published".
const MISSING_SENTINEL: &str = ".";

pub struct FredClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FredClient {
    /// Build a client from `FRED_API_KEY` (environment or `.env`).
    ///
    /// `timeout` bounds every request so a hanging lookup resolves to an
    /// absent cell instead of stalling the whole table.
    pub fn from_env(timeout: Duration) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("FRED_API_KEY")
            .map_err(|_| AppError::config("Missing FRED_API_KEY in environment (.env)."))?;
        Self::new(api_key, timeout)
    }

    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::runtime(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at another endpoint (proxies, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl ObservationSource for FredClient {
    fn observations(
        &self,
        key: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>, SourceError> {
        debug!(series = key, %start, %end, "fetching FRED observations");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("series_id", key),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("sort_order", "asc"),
                ("observation_start", &start.to_string()),
                ("observation_end", &end.to_string()),
            ])
            .send()
            .map_err(|e| SourceError::unavailable(key, format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(SourceError::unavailable(
                key,
                format!("request failed with status {}", resp.status()),
            ));
        }

        let body: ObservationsResponse = resp
            .json()
            .map_err(|e| SourceError::unavailable(key, format!("failed to parse response: {e}")))?;

        parse_observations(key, body)
    }

    fn name(&self) -> &str {
        "FRED"
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

fn parse_observations(key: &str, body: ObservationsResponse) -> Result<Vec<Observation>, SourceError> {
    let mut out = Vec::with_capacity(body.observations.len());
    for obs in body.observations {
        let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
            .map_err(|e| SourceError::invalid(key, format!("invalid date '{}': {e}", obs.date)))?;
        out.push(Observation {
            date,
            value: parse_value(&obs.value),
        });
    }
    Ok(out)
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == MISSING_SENTINEL || trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_and_garbage_values_are_missing() {
        assert_eq!(parse_value("."), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("n/a"), None);
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value(" 1.92 "), Some(1.92));
        assert_eq!(parse_value("-0.15"), Some(-0.15));
    }

    #[test]
    fn response_body_maps_to_observations() {
        let json = r#"{
            "realtime_start": "2025-03-24",
            "count": 3,
            "observations": [
                {"realtime_start": "2025-03-24", "date": "2025-03-20", "value": "1.95"},
                {"realtime_start": "2025-03-24", "date": "2025-03-21", "value": "."},
                {"realtime_start": "2025-03-24", "date": "2025-03-24", "value": "1.90"}
            ]
        }"#;
        let body: ObservationsResponse = serde_json::from_str(json).unwrap();
        let obs = parse_observations("DFII10", body).unwrap();

        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].value, Some(1.95));
        assert_eq!(obs[1].value, None);
        assert_eq!(obs[2].date, NaiveDate::from_ymd_opt(2025, 3, 24).unwrap());
    }

    #[test]
    fn bad_date_is_an_invalid_response() {
        let body = ObservationsResponse {
            observations: vec![RawObservation {
                date: "21/03/2025".to_string(),
                value: "1.9".to_string(),
            }],
        };
        let err = parse_observations("DFII10", body).unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse { .. }));
    }

    #[test]
    fn unreachable_endpoint_is_unavailable() {
        let client = FredClient::new("test-key", Duration::from_millis(500))
            .unwrap()
            .with_base_url("http://127.0.0.1:9/fred/series/observations");
        let day = NaiveDate::from_ymd_opt(2025, 3, 21).unwrap();
        let err = client.observations("DFII10", day, day).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }
}
