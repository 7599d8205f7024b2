//! Rate lookup against the Banco Central do Brasil SGS series API.
//!
//! The upstream publishes observations as `{"data": "DD/MM/YYYY",
//! "valor": "12,34"}` records; everything locale-shaped is normalized here
//! so callers only ever see a `NaiveDate` and an `f64` percentage.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// SGS series 11: daily Selic rate.
pub const DEFAULT_SERIES: u32 = 11;

const SGS_BASE_URL: &str = "https://api.bcb.gov.br";
const FETCH_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Error, Debug)]
pub enum RateError {
    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    UpstreamStatus(reqwest::StatusCode),

    #[error("Series {0} returned no observations")]
    EmptySeries(u32),

    #[error("Invalid observation date: {0:?}")]
    InvalidDate(String),

    #[error("Invalid observation value: {0:?}")]
    InvalidValue(String),
}

/// The most recent value of a series. `value` is a percentage
/// (13.25 means 13.25%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateObservation {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
struct SgsRecord {
    data: String,
    // Missing key and explicit null must stay distinguishable: the outer
    // Option is key presence, the inner is the value.
    #[serde(default, deserialize_with = "nullable_string")]
    valor: Option<Option<String>>,
}

fn nullable_string<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Client for one SGS series. Cheap to clone; the underlying HTTP client
/// pools connections.
#[derive(Debug, Clone)]
pub struct SgsClient {
    series: u32,
    base_url: String,
    client: reqwest::Client,
}

impl SgsClient {
    pub fn new(series: u32) -> Result<Self, RateError> {
        Self::with_base_url(series, SGS_BASE_URL)
    }

    pub(crate) fn with_base_url(series: u32, base_url: &str) -> Result<Self, RateError> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            series,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn series(&self) -> u32 {
        self.series
    }

    /// Latest observation of the configured series, or `None` when the
    /// upstream is unreachable or returns something unusable. The concrete
    /// failure is logged, never surfaced.
    pub async fn fetch_latest(&self) -> Option<RateObservation> {
        match self.fetch_latest_inner().await {
            Ok(observation) => Some(observation),
            Err(e) => {
                tracing::warn!(series = self.series, error = %e, "rate fetch failed");
                None
            }
        }
    }

    async fn fetch_latest_inner(&self) -> Result<RateObservation, RateError> {
        let response = self.client.get(self.endpoint_url()).send().await?;
        if !response.status().is_success() {
            return Err(RateError::UpstreamStatus(response.status()));
        }

        let records = response.json::<Vec<SgsRecord>>().await?;
        latest_observation(&records, self.series)
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/dados/serie/bcdata.sgs.{}/dados?formato=json&limit=1",
            self.base_url, self.series
        )
    }
}

fn latest_observation(records: &[SgsRecord], series: u32) -> Result<RateObservation, RateError> {
    let record = records.last().ok_or(RateError::EmptySeries(series))?;
    let date = parse_series_date(&record.data)?;
    // The upstream occasionally omits `valor`; such records read as zero.
    // An explicit null is malformed, not missing.
    let value = match &record.valor {
        None => 0.0,
        Some(None) => return Err(RateError::InvalidValue("null".to_string())),
        Some(Some(raw)) => parse_series_value(raw)?,
    };
    Ok(RateObservation { date, value })
}

fn parse_series_date(raw: &str) -> Result<NaiveDate, RateError> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y")
        .map_err(|_| RateError::InvalidDate(raw.to_string()))
}

fn parse_series_value(raw: &str) -> Result<f64, RateError> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| RateError::InvalidValue(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::get};
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    fn record(data: &str, valor: Option<&str>) -> SgsRecord {
        SgsRecord {
            data: data.to_string(),
            valor: valor.map(|v| Some(v.to_string())),
        }
    }

    async fn spawn_sgs_stub(series: u32, status: StatusCode, body: &'static str) -> SocketAddr {
        let path = format!("/dados/serie/bcdata.sgs.{series}/dados");
        let app = Router::new().route(&path, get(move || async move { (status, body) }));
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("stub should bind");
        let addr = listener.local_addr().expect("stub should have an address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub should serve");
        });
        addr
    }

    async fn stub_client(series: u32, status: StatusCode, body: &'static str) -> SgsClient {
        let addr = spawn_sgs_stub(series, status, body).await;
        SgsClient::with_base_url(series, &format!("http://{addr}")).expect("client should build")
    }

    #[test]
    fn parse_series_value_accepts_comma_decimals() {
        assert_eq!(parse_series_value("13,25").unwrap(), 13.25);
        assert_eq!(parse_series_value("11.04").unwrap(), 11.04);
        assert_eq!(parse_series_value(" 10,5 ").unwrap(), 10.5);
    }

    #[test]
    fn parse_series_value_rejects_garbage() {
        assert!(matches!(
            parse_series_value("abc"),
            Err(RateError::InvalidValue(_))
        ));
    }

    #[test]
    fn parse_series_date_reads_day_month_year() {
        let date = parse_series_date("29/08/2025").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 8, 29).unwrap());
    }

    #[test]
    fn parse_series_date_rejects_iso_order() {
        assert!(matches!(
            parse_series_date("2025-08-29"),
            Err(RateError::InvalidDate(_))
        ));
    }

    #[test]
    fn latest_observation_uses_the_last_record() {
        let records = vec![
            record("28/08/2025", Some("13,15")),
            record("29/08/2025", Some("13,25")),
        ];

        let observation = latest_observation(&records, DEFAULT_SERIES).unwrap();
        assert_eq!(
            observation.date,
            NaiveDate::from_ymd_opt(2025, 8, 29).unwrap()
        );
        assert_eq!(observation.value, 13.25);
    }

    #[test]
    fn missing_valor_reads_as_zero() {
        let records = vec![record("29/08/2025", None)];
        let observation = latest_observation(&records, DEFAULT_SERIES).unwrap();
        assert_eq!(observation.value, 0.0);
    }

    #[test]
    fn explicit_null_valor_is_an_error() {
        let records = vec![SgsRecord {
            data: "29/08/2025".to_string(),
            valor: Some(None),
        }];
        assert!(matches!(
            latest_observation(&records, DEFAULT_SERIES),
            Err(RateError::InvalidValue(_))
        ));
    }

    #[test]
    fn empty_series_is_an_error() {
        assert!(matches!(
            latest_observation(&[], 433),
            Err(RateError::EmptySeries(433))
        ));
    }

    #[test]
    fn observation_serializes_with_iso_date() {
        let observation = RateObservation {
            date: NaiveDate::from_ymd_opt(2025, 8, 29).unwrap(),
            value: 13.25,
        };
        let json = serde_json::to_string(&observation).unwrap();
        assert_eq!(json, r#"{"date":"2025-08-29","value":13.25}"#);
    }

    #[test]
    fn endpoint_url_includes_format_and_limit() {
        let client = SgsClient::with_base_url(433, "http://127.0.0.1:9/").unwrap();
        assert_eq!(
            client.endpoint_url(),
            "http://127.0.0.1:9/dados/serie/bcdata.sgs.433/dados?formato=json&limit=1"
        );
    }

    #[tokio::test]
    async fn fetch_latest_returns_the_newest_observation() {
        let client = stub_client(
            11,
            StatusCode::OK,
            r#"[{"data":"28/08/2025","valor":"13,15"},{"data":"29/08/2025","valor":"13,25"}]"#,
        )
        .await;

        let observation = client.fetch_latest().await.expect("rate should resolve");
        assert_eq!(
            observation.date,
            NaiveDate::from_ymd_opt(2025, 8, 29).unwrap()
        );
        assert_eq!(observation.value, 13.25);
    }

    #[tokio::test]
    async fn fetch_latest_collapses_empty_series_to_none() {
        let client = stub_client(11, StatusCode::OK, "[]").await;
        assert!(client.fetch_latest().await.is_none());
    }

    #[tokio::test]
    async fn fetch_latest_collapses_upstream_errors_to_none() {
        let client = stub_client(11, StatusCode::INTERNAL_SERVER_ERROR, "[]").await;
        assert!(client.fetch_latest().await.is_none());
    }

    #[tokio::test]
    async fn fetch_latest_collapses_malformed_bodies_to_none() {
        let client = stub_client(11, StatusCode::OK, "not json").await;
        assert!(client.fetch_latest().await.is_none());
    }

    #[tokio::test]
    async fn fetch_latest_collapses_null_valor_to_none() {
        let client =
            stub_client(11, StatusCode::OK, r#"[{"data":"29/08/2025","valor":null}]"#).await;
        assert!(client.fetch_latest().await.is_none());
    }

    #[tokio::test]
    async fn empty_series_surfaces_the_typed_error_internally() {
        let client = stub_client(77, StatusCode::OK, "[]").await;
        let err = client
            .fetch_latest_inner()
            .await
            .expect_err("empty series must fail");
        assert!(matches!(err, RateError::EmptySeries(77)));
    }
}
