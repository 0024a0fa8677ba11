//! Yahoo Finance price adapter.
//!
//! Reads daily bars from the v8 chart API. Transient failures (connect,
//! timeout, 429, 5xx) are retried with exponential backoff; a response the
//! primary host cannot serve is retried once on the alternate host.

use std::cell::Cell;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::domain::error::QuantError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::data_port::PriceDataPort;

const HOSTS: [&str; 2] = [
    "https://query1.finance.yahoo.com",
    "https://query2.finance.yahoo.com",
];

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Backoff and pacing for outbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Minimum gap between two consecutive requests.
    pub request_spacing: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            request_spacing: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), saturating at `Duration::MAX`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .unwrap_or(Duration::MAX)
    }
}

enum Failure {
    /// Give up on this ticker.
    Fatal(String),
    /// This host cannot serve the request; another one might.
    TryAlternate(String),
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    policy: RetryPolicy,
    last_request: Cell<Option<Instant>>,
}

impl YahooAdapter {
    pub fn new(policy: RetryPolicy) -> Result<Self, QuantError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")
            .build()
            .map_err(|e| QuantError::DataFetch {
                ticker: "yahoo".into(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            policy,
            last_request: Cell::new(None),
        })
    }

    fn chart_url(host: &str, ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp() + 86_399;
        let symbol = ticker.replace('^', "%5E");
        format!(
            "{host}/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    fn pace(&self) {
        if let Some(prev) = self.last_request.get() {
            let elapsed = prev.elapsed();
            if elapsed < self.policy.request_spacing {
                std::thread::sleep(self.policy.request_spacing - elapsed);
            }
        }
        self.last_request.set(Some(Instant::now()));
    }

    fn fetch_from(
        &self,
        host: &str,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, Failure> {
        let url = Self::chart_url(host, ticker, start, end);
        let mut last_error = String::from("no attempt made");

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                let delay = self.policy.backoff(attempt);
                tracing::debug!(ticker, attempt, ?delay, "retrying after {last_error}");
                std::thread::sleep(delay);
            }
            self.pace();

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = e.to_string();
                    continue;
                }
                Err(e) => return Err(Failure::Fatal(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                return Err(Failure::Fatal(format!("HTTP {status}: access denied")));
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                last_error = format!("HTTP {status}");
                continue;
            }
            if !status.is_success() {
                return Err(Failure::TryAlternate(format!("HTTP {status}")));
            }

            let chart: ChartResponse = resp
                .json()
                .map_err(|e| Failure::TryAlternate(format!("unreadable response: {e}")))?;
            return parse_chart(ticker, chart, start, end).map_err(Failure::TryAlternate);
        }

        Err(Failure::Fatal(format!(
            "gave up after {} retries: {last_error}",
            self.policy.max_retries
        )))
    }
}

impl PriceDataPort for YahooAdapter {
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, QuantError> {
        tracing::info!(ticker, %start, %end, "fetching prices from Yahoo Finance");

        let mut reason = String::new();
        for (i, host) in HOSTS.iter().enumerate() {
            match self.fetch_from(host, ticker, start, end) {
                Ok(series) => {
                    tracing::debug!(ticker, points = series.len(), host, "fetched prices");
                    return Ok(series);
                }
                Err(Failure::TryAlternate(r)) if i + 1 < HOSTS.len() => {
                    tracing::warn!(ticker, host, "{r}; trying alternate host");
                    reason = r;
                }
                Err(Failure::TryAlternate(r)) | Err(Failure::Fatal(r)) => {
                    reason = r;
                    break;
                }
            }
        }

        Err(QuantError::DataFetch {
            ticker: ticker.to_string(),
            reason,
        })
    }
}

fn parse_chart(
    ticker: &str,
    resp: ChartResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, String> {
    let data = match (resp.chart.result, resp.chart.error) {
        (_, Some(err)) => return Err(format!("{}: {}", err.code, err.description)),
        (Some(result), None) => result
            .into_iter()
            .next()
            .ok_or_else(|| "result array is empty".to_string())?,
        (None, None) => return Err("empty result with no error".into()),
    };

    let timestamps = data.timestamp.unwrap_or_default();
    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut points: Vec<PricePoint> = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| format!("invalid timestamp: {ts}"))?;
        if date < start || date > end {
            continue;
        }

        let adj = adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten());
        let close = adj
            .or_else(|| closes.get(i).copied().flatten())
            .unwrap_or(f64::NAN);

        // the live bar can repeat the last session's date
        match points.last_mut() {
            Some(last) if last.date == date => last.close = close,
            _ => points.push(PricePoint::new(date, close)),
        }
    }

    if points.is_empty() {
        return Err(format!("no prices between {start} and {end}"));
    }

    PriceSeries::from_unsorted(ticker, points).map_err(|e| e.to_string())
}
