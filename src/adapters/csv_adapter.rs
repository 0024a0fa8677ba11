//! CSV file price adapter.
//!
//! One file per ticker, `<dir>/<TICKER>.csv`, with a `date,close` header and
//! an optional `adj_close` column that wins when present. An empty price
//! field marks a gap.

use crate::domain::error::QuantError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }
}

fn parse_price(ticker: &str, field: Option<&str>) -> Result<Option<f64>, QuantError> {
    match field.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|e| QuantError::DataFetch {
            ticker: ticker.to_string(),
            reason: format!("invalid price '{s}': {e}"),
        }),
    }
}

impl PriceDataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, QuantError> {
        let fetch_err = |reason: String| QuantError::DataFetch {
            ticker: ticker.to_string(),
            reason,
        };

        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path)
            .map_err(|e| fetch_err(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| fetch_err(format!("CSV parse error: {e}")))?
            .clone();
        let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));

        let date_col = column("date").ok_or_else(|| fetch_err("missing date column".into()))?;
        let close_col = column("close").ok_or_else(|| fetch_err("missing close column".into()))?;
        let adj_col = column("adj_close");

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| fetch_err(format!("CSV parse error: {e}")))?;

            let date_str = record
                .get(date_col)
                .ok_or_else(|| fetch_err("missing date value".into()))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| fetch_err(format!("invalid date '{date_str}': {e}")))?;

            if date < start || date > end {
                continue;
            }

            let adj = match adj_col {
                Some(i) => parse_price(ticker, record.get(i))?,
                None => None,
            };
            let close = match adj {
                Some(v) => v,
                None => parse_price(ticker, record.get(close_col))?.unwrap_or(f64::NAN),
            };

            points.push(PricePoint::new(date, close));
        }

        tracing::debug!(ticker, points = points.len(), path = %path.display(), "read CSV prices");
        PriceSeries::from_unsorted(ticker, points)
    }
}
