//! Daily price series as delivered by a data port.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::error::QuantError;

#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    /// Adjusted close. Non-finite values mark gaps to be forward-filled.
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }

    pub fn is_valid(&self) -> bool {
        self.close.is_finite()
    }
}

/// Ordered prices for one ticker. Dates are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, QuantError> {
        let ticker = ticker.into();
        if points.windows(2).any(|w| w[0].date >= w[1].date) {
            return Err(QuantError::UnorderedDates { ticker });
        }
        Ok(Self { ticker, points })
    }

    /// Sorts by date first. Duplicate dates are still rejected.
    pub fn from_unsorted(
        ticker: impl Into<String>,
        mut points: Vec<PricePoint>,
    ) -> Result<Self, QuantError> {
        points.sort_by_key(|p| p.date);
        Self::new(ticker, points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_valid()).count()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Valid close quoted exactly on `date`.
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        let index = self.points.binary_search_by_key(&date, |p| p.date).ok()?;
        let point = &self.points[index];
        point.is_valid().then_some(point.close)
    }

    /// Rebase to `base` at the first valid close, e.g. 100.
    pub fn normalize(&self, base: f64) -> Result<Vec<(NaiveDate, f64)>, QuantError> {
        let first = self
            .points
            .iter()
            .find(|p| p.is_valid() && p.close != 0.0)
            .ok_or_else(|| QuantError::insufficient(format!("{} prices", self.ticker), 0, 1))?
            .close;

        let mut last = f64::NAN;
        Ok(self
            .points
            .iter()
            .filter_map(|p| {
                if p.is_valid() {
                    last = p.close;
                }
                last.is_finite().then_some((p.date, last / first * base))
            })
            .collect())
    }
}

/// Price series keyed by ticker, as returned for a multi-ticker fetch.
pub type PriceTable = BTreeMap<String, PriceSeries>;
