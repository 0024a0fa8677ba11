//! Price-to-return transformation.
//!
//! Prices are placed on a calendar (the provider's trading days, or business
//! month ends), forward-filled across gaps, then differenced into fractional
//! returns. The first calendar point has no predecessor and is dropped.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};

use super::error::QuantError;
use super::price::PriceSeries;

/// Minimum number of calendar prices needed to produce one return.
pub const MIN_PRICE_POINTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    BusinessMonthEnd,
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "d" => Ok(Frequency::Daily),
            "monthly" | "bm" | "business_month_end" => Ok(Frequency::BusinessMonthEnd),
            other => Err(format!("unknown frequency '{other}' (expected daily or monthly)")),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::BusinessMonthEnd => write!(f, "monthly"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    pub ticker: String,
    pub points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Last Monday-to-Friday day of the month.
pub fn business_month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut day = first_of_next.pred_opt()?;
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day = day.pred_opt()?;
    }
    Some(day)
}

/// Business month ends falling within `[start, end]`.
pub fn business_month_ends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) <= (end.year(), end.month()) {
        if let Some(bm) = business_month_end(year, month) {
            if bm >= start && bm <= end {
                out.push(bm);
            }
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    out
}

/// Prices on the requested calendar, with `None` where no valid quote falls
/// exactly on a calendar date.
fn calendar(series: &PriceSeries, frequency: Frequency) -> Vec<(NaiveDate, Option<f64>)> {
    match frequency {
        Frequency::Daily => series
            .points()
            .iter()
            .map(|p| (p.date, p.is_valid().then_some(p.close)))
            .collect(),
        Frequency::BusinessMonthEnd => {
            let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
                return Vec::new();
            };
            business_month_ends(first, last)
                .into_iter()
                .map(|bm| (bm, series.close_on(bm)))
                .collect()
        }
    }
}

/// Forward-fill calendar gaps; leading gaps have nothing to fill from and are dropped.
fn forward_fill(calendar: Vec<(NaiveDate, Option<f64>)>) -> Vec<(NaiveDate, f64)> {
    let mut last: Option<f64> = None;
    calendar
        .into_iter()
        .filter_map(|(date, close)| {
            if close.is_some() {
                last = close;
            }
            last.map(|close| (date, close))
        })
        .collect()
}

fn resample(series: &PriceSeries, frequency: Frequency) -> Vec<(NaiveDate, f64)> {
    forward_fill(calendar(series, frequency))
}

/// Period-over-period fractional returns of a price series.
pub fn to_returns(series: &PriceSeries, frequency: Frequency) -> Result<ReturnSeries, QuantError> {
    let calendar = resample(series, frequency);
    if calendar.len() < MIN_PRICE_POINTS {
        return Err(QuantError::insufficient(
            format!("{} {} prices", series.ticker, frequency),
            calendar.len(),
            MIN_PRICE_POINTS,
        ));
    }

    let points = calendar
        .windows(2)
        .map(|w| {
            let (_, prev) = w[0];
            let (date, curr) = w[1];
            ReturnPoint {
                date,
                value: (curr - prev) / prev,
            }
        })
        .collect::<Vec<_>>();

    if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
        return Err(QuantError::DataFetch {
            ticker: series.ticker.clone(),
            reason: format!("zero price before {}", bad.date),
        });
    }

    tracing::debug!(
        ticker = %series.ticker,
        %frequency,
        prices = series.len(),
        returns = points.len(),
        "computed returns"
    );

    Ok(ReturnSeries {
        ticker: series.ticker.clone(),
        points,
    })
}

/// Returns of several assets on their common dates.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    pub tickers: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// One row per date, one column per ticker.
    pub rows: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    pub fn n_assets(&self) -> usize {
        self.tickers.len()
    }

    pub fn n_obs(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[index]).collect()
    }

    pub fn column_by_ticker(&self, ticker: &str) -> Option<Vec<f64>> {
        let index = self.tickers.iter().position(|t| t == ticker)?;
        Some(self.column(index))
    }
}

/// Inner-join return series on date.
pub fn align_returns(series: &[ReturnSeries]) -> Result<ReturnMatrix, QuantError> {
    let Some((head, tail)) = series.split_first() else {
        return Err(QuantError::insufficient("return matrix assets", 0, 1));
    };

    let mut common: BTreeSet<NaiveDate> = head.points.iter().map(|p| p.date).collect();
    for s in tail {
        let dates: BTreeSet<NaiveDate> = s.points.iter().map(|p| p.date).collect();
        common = common.intersection(&dates).copied().collect();
    }

    if common.len() < MIN_PRICE_POINTS {
        return Err(QuantError::insufficient(
            "common return dates",
            common.len(),
            MIN_PRICE_POINTS,
        ));
    }

    let columns: Vec<Vec<f64>> = series
        .iter()
        .map(|s| {
            s.points
                .iter()
                .filter(|p| common.contains(&p.date))
                .map(|p| p.value)
                .collect()
        })
        .collect();

    let dates: Vec<NaiveDate> = common.into_iter().collect();
    let rows = (0..dates.len())
        .map(|i| columns.iter().map(|c| c[i]).collect())
        .collect();

    Ok(ReturnMatrix {
        tickers: series.iter().map(|s| s.ticker.clone()).collect(),
        dates,
        rows,
    })
}
