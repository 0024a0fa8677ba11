#![allow(dead_code)]

use chrono::{Datelike, Days, NaiveDate, Weekday};
use quantwork::domain::chart::{BarChart, LineChart, ScatterChart};
use quantwork::domain::error::QuantError;
use quantwork::domain::price::{PricePoint, PriceSeries};
use quantwork::ports::chart_port::ChartPort;
use quantwork::ports::data_port::PriceDataPort;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockPriceDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
    pub requests: RefCell<Vec<String>>,
}

impl MockPriceDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_prices(mut self, ticker: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(ticker.to_string(), points);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockPriceDataPort {
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, QuantError> {
        self.requests.borrow_mut().push(ticker.to_string());
        if let Some(reason) = self.errors.get(ticker) {
            return Err(QuantError::DataFetch {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        let points = self
            .data
            .get(ticker)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.date >= start && p.date <= end)
            .collect();
        PriceSeries::new(ticker, points)
    }
}

#[derive(Default)]
pub struct RecordingChartPort {
    pub scatters: RefCell<Vec<ScatterChart>>,
    pub lines: RefCell<Vec<LineChart>>,
    pub bars: RefCell<Vec<BarChart>>,
}

impl RecordingChartPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.scatters.borrow().len() + self.lines.borrow().len() + self.bars.borrow().len()
    }
}

impl ChartPort for RecordingChartPort {
    fn scatter(&self, chart: &ScatterChart) -> Result<(), QuantError> {
        self.scatters.borrow_mut().push(chart.clone());
        Ok(())
    }

    fn line(&self, chart: &LineChart) -> Result<(), QuantError> {
        self.lines.borrow_mut().push(chart.clone());
        Ok(())
    }

    fn bar(&self, chart: &BarChart) -> Result<(), QuantError> {
        self.bars.borrow_mut().push(chart.clone());
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` consecutive weekdays starting on or after `start`.
pub fn weekdays(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut d = start;
    while dates.len() < n {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(d);
        }
        d = d + Days::new(1);
    }
    dates
}

/// Prices compounding `returns` from `initial`, one per weekday.
pub fn prices_from_returns(start: NaiveDate, initial: f64, returns: &[f64]) -> Vec<PricePoint> {
    let dates = weekdays(start, returns.len() + 1);
    let mut price = initial;
    let mut points = vec![PricePoint::new(dates[0], price)];
    for (date, r) in dates[1..].iter().zip(returns) {
        price *= 1.0 + r;
        points.push(PricePoint::new(*date, price));
    }
    points
}

/// Deterministic wiggly daily returns.
pub fn wave(n: usize, amplitude: f64, phase: f64) -> Vec<f64> {
    (0..n)
        .map(|i| amplitude * ((i as f64) * 0.7 + phase).sin() + 0.0003)
        .collect()
}
