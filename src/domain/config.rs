//! Typed run configuration built from a [`ConfigPort`].
//!
//! Every key is optional; missing keys fall back to the coursework reference
//! run. Present-but-invalid values are rejected.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use super::error::QuantError;
use super::game::{parse_matrix, Selection};
use super::portfolio::{PortfolioWeights, DEFAULT_TRADING_DAYS};
use super::returns::Frequency;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct CapmConfig {
    pub stock: String,
    pub market: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Average annual T-bill rate in percent.
    pub annual_tbill_rate: f64,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioConfig {
    pub tickers: Vec<String>,
    pub weights: PortfolioWeights,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trading_days: f64,
    pub market: String,
    pub bond: String,
    pub risk_free_rate: f64,
    pub market_risk_premium: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NashConfig {
    pub row_payoffs: Vec<Vec<f64>>,
    pub col_payoffs: Vec<Vec<f64>>,
    pub selection: Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub source: DataSource,
    pub csv_dir: PathBuf,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub request_spacing: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartRenderer {
    Svg,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub renderer: ChartRenderer,
    pub output_dir: PathBuf,
}

fn date_or(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: (i32, u32, u32),
) -> Result<NaiveDate, QuantError> {
    match config.get_string(section, key) {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            QuantError::config_invalid(section, key, "invalid date format (expected YYYY-MM-DD)")
        }),
        None => NaiveDate::from_ymd_opt(default.0, default.1, default.2).ok_or_else(|| {
            QuantError::config_invalid(section, key, "invalid default date")
        }),
    }
}

fn date_range(
    config: &dyn ConfigPort,
    section: &str,
    start: (i32, u32, u32),
    end: (i32, u32, u32),
) -> Result<(NaiveDate, NaiveDate), QuantError> {
    let start_date = date_or(config, section, "start_date", start)?;
    let end_date = date_or(config, section, "end_date", end)?;
    if start_date >= end_date {
        return Err(QuantError::config_invalid(
            section,
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok((start_date, end_date))
}

fn ticker_or(config: &dyn ConfigPort, section: &str, key: &str, default: &str) -> Result<String, QuantError> {
    let value = config
        .get_string(section, key)
        .unwrap_or_else(|| default.to_string());
    let value = value.trim().to_uppercase();
    if value.is_empty() {
        return Err(QuantError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        });
    }
    Ok(value)
}

fn int_or(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, QuantError> {
    config
        .get_int(section, key)
        .map(|v| v.unwrap_or(default))
        .map_err(|_| QuantError::config_invalid(section, key, "expected an integer"))
}

fn number_or(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, QuantError> {
    let value = config
        .get_double(section, key)
        .map(|v| v.unwrap_or(default))
        .map_err(|_| QuantError::config_invalid(section, key, "expected a number"))?;
    if !value.is_finite() {
        return Err(QuantError::config_invalid(section, key, "must be a finite number"));
    }
    Ok(value)
}

fn non_negative_ms(config: &dyn ConfigPort, key: &str, default: i64) -> Result<Duration, QuantError> {
    let ms = int_or(config, "data", key, default)?;
    u64::try_from(ms)
        .map(Duration::from_millis)
        .map_err(|_| QuantError::config_invalid("data", key, "must be non-negative"))
}

impl CapmConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantError> {
        let (start_date, end_date) = date_range(config, "capm", (2008, 10, 1), (2013, 9, 1))?;

        let annual_tbill_rate = number_or(config, "capm", "annual_tbill_rate", 0.5)?;
        if !(0.0..100.0).contains(&annual_tbill_rate) {
            return Err(QuantError::config_invalid(
                "capm",
                "annual_tbill_rate",
                "annual_tbill_rate is a percentage between 0 and 100",
            ));
        }

        let frequency = match config.get_string("capm", "frequency") {
            Some(s) => s
                .parse()
                .map_err(|e: String| QuantError::config_invalid("capm", "frequency", e))?,
            None => Frequency::BusinessMonthEnd,
        };

        Ok(Self {
            stock: ticker_or(config, "capm", "stock", "DIS")?,
            market: ticker_or(config, "capm", "market", "^GSPC")?,
            start_date,
            end_date,
            annual_tbill_rate,
            frequency,
        })
    }
}

impl PortfolioConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantError> {
        let (start_date, end_date) = date_range(config, "portfolio", (2015, 1, 1), (2018, 1, 1))?;

        let tickers: Vec<String> = config
            .get_list("portfolio", "tickers")
            .unwrap_or_else(|| vec!["AAPL".into(), "MSFT".into()])
            .into_iter()
            .map(|t| t.to_uppercase())
            .collect();
        if tickers.is_empty() {
            return Err(QuantError::ConfigMissing {
                section: "portfolio".into(),
                key: "tickers".into(),
            });
        }

        let weights = match config.get_list("portfolio", "weights") {
            Some(raw) => {
                let parsed = raw
                    .iter()
                    .map(|w| w.parse::<f64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| QuantError::config_invalid("portfolio", "weights", e.to_string()))?;
                PortfolioWeights::new(parsed)?
            }
            None => PortfolioWeights::equal(tickers.len())?,
        };
        if weights.len() != tickers.len() {
            return Err(QuantError::mismatch("portfolio weights", tickers.len(), weights.len()));
        }

        let trading_days = number_or(config, "portfolio", "trading_days", DEFAULT_TRADING_DAYS)?;
        if trading_days <= 0.0 {
            return Err(QuantError::config_invalid(
                "portfolio",
                "trading_days",
                "trading_days must be positive",
            ));
        }

        let risk_free_rate = number_or(config, "portfolio", "risk_free_rate", 0.025)?;
        if !(0.0..1.0).contains(&risk_free_rate) {
            return Err(QuantError::config_invalid(
                "portfolio",
                "risk_free_rate",
                "risk_free_rate must be between 0 and 1",
            ));
        }

        Ok(Self {
            tickers,
            weights,
            start_date,
            end_date,
            trading_days,
            market: ticker_or(config, "portfolio", "market", "SPY")?,
            bond: ticker_or(config, "portfolio", "bond", "IEF")?,
            risk_free_rate,
            market_risk_premium: number_or(config, "portfolio", "market_risk_premium", 0.05)?,
        })
    }
}

impl NashConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantError> {
        let matrix = |key: &str, default: &str| {
            let text = config
                .get_string("nash", key)
                .unwrap_or_else(|| default.to_string());
            parse_matrix(&text).map_err(|e| QuantError::config_invalid("nash", key, e))
        };

        let selection = match config.get_string("nash", "selection") {
            Some(s) => s
                .parse()
                .map_err(|e: String| QuantError::config_invalid("nash", "selection", e))?,
            None => Selection::All,
        };

        Ok(Self {
            row_payoffs: matrix("row_payoffs", "25,9;33,10")?,
            col_payoffs: matrix("col_payoffs", "30,13;36,12")?,
            selection,
        })
    }
}

impl DataConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantError> {
        let source = match config
            .get_string("data", "source")
            .map(|s| s.trim().to_lowercase())
            .as_deref()
        {
            None | Some("yahoo") => DataSource::Yahoo,
            Some("csv") => DataSource::Csv,
            Some(other) => {
                return Err(QuantError::config_invalid(
                    "data",
                    "source",
                    format!("unknown source '{other}' (expected yahoo or csv)"),
                ));
            }
        };

        let max_retries = int_or(config, "data", "max_retries", 3)?;
        let max_retries = u32::try_from(max_retries)
            .map_err(|_| QuantError::config_invalid("data", "max_retries", "must be non-negative"))?;

        Ok(Self {
            source,
            csv_dir: config
                .get_string("data", "csv_dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            max_retries,
            base_delay: non_negative_ms(config, "base_delay_ms", 500)?,
            request_spacing: non_negative_ms(config, "request_spacing_ms", 2000)?,
        })
    }
}

impl ChartConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantError> {
        let renderer = match config
            .get_string("charts", "renderer")
            .map(|s| s.trim().to_lowercase())
            .as_deref()
        {
            None | Some("svg") => ChartRenderer::Svg,
            Some("none") => ChartRenderer::None,
            Some(other) => {
                return Err(QuantError::config_invalid(
                    "charts",
                    "renderer",
                    format!("unknown renderer '{other}' (expected svg or none)"),
                ));
            }
        };

        Ok(Self {
            renderer,
            output_dir: config
                .get_string("charts", "output_dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("charts")),
        })
    }
}
