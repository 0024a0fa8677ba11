//! Market data port trait.

use chrono::NaiveDate;

use crate::domain::error::QuantError;
use crate::domain::price::{PriceSeries, PriceTable};

pub trait PriceDataPort {
    /// Daily adjusted closes for `ticker` within `[start, end]`.
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, QuantError>;

    /// Default implementation: one `fetch_prices` call per ticker, in order.
    fn fetch_table(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, QuantError> {
        let mut table = PriceTable::new();
        for ticker in tickers {
            table.insert(ticker.clone(), self.fetch_prices(ticker, start, end)?);
        }
        Ok(table)
    }
}
