//! Console reports printed by the CLI pipelines.

use std::fmt;

use nalgebra::DMatrix;

use crate::domain::game::{Equilibrium, Selection};
use crate::domain::portfolio::PortfolioAnalysis;
use crate::domain::regression::RegressionResult;
use crate::domain::returns::Frequency;
use crate::domain::stats::ComparativeStats;

#[derive(Debug, Clone, PartialEq)]
pub struct CapmReport {
    pub stock: String,
    pub market: String,
    pub frequency: Frequency,
    pub regression: RegressionResult,
    pub annual_tbill_rate: f64,
    /// Percent per period.
    pub jensens_alpha: f64,
    /// Fraction, e.g. 0.05 for 5%.
    pub annualized_excess_return: f64,
}

impl CapmReport {
    pub fn new(
        stock: impl Into<String>,
        market: impl Into<String>,
        frequency: Frequency,
        regression: RegressionResult,
        annual_tbill_rate: f64,
    ) -> Self {
        Self {
            stock: stock.into(),
            market: market.into(),
            frequency,
            jensens_alpha: regression.jensens_alpha(annual_tbill_rate),
            annualized_excess_return: regression.annualized_excess_return(annual_tbill_rate),
            regression,
            annual_tbill_rate,
        }
    }
}

impl fmt::Display for CapmReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.regression;
        writeln!(
            f,
            "=== CAPM: {} against {} ({} returns, {} observations) ===",
            self.stock, self.market, self.frequency, r.observations
        )?;
        writeln!(f, "Beta (Slope):             {:.6}", r.slope)?;
        writeln!(f, "Alpha (Intercept):        {:.6}", r.intercept)?;
        writeln!(f, "Correlation (r):          {:.6}", r.r)?;
        writeln!(f, "R^2:                      {:.6}", r.r_squared)?;
        writeln!(f, "P-value:                  {:.6}", r.p_value)?;
        writeln!(f, "Standard Error:           {:.6}", r.std_err)?;
        writeln!(f, "Intercept Std Error:      {:.6}", r.intercept_std_err)?;
        writeln!(f, "Average Annual T-bill:    {:.4} %", self.annual_tbill_rate)?;
        writeln!(f, "Jensen's Alpha:           {:.6} % per period", self.jensens_alpha)?;
        write!(
            f,
            "Annualized Excess Return: {:.6} %",
            self.annualized_excess_return * 100.0
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioReport {
    pub analysis: PortfolioAnalysis,
    pub market: String,
    pub beta: f64,
    pub risk_free_rate: f64,
    pub market_risk_premium: f64,
    pub capm_expected_return: f64,
    /// Portfolio first, then the bond proxy.
    pub comparison: Vec<ComparativeStats>,
}

fn write_matrix(f: &mut fmt::Formatter<'_>, labels: &[String], m: &DMatrix<f64>) -> fmt::Result {
    write!(f, "{:>10}", "")?;
    for label in labels {
        write!(f, " {label:>12}")?;
    }
    writeln!(f)?;
    for (i, label) in labels.iter().enumerate() {
        write!(f, "{label:>10}")?;
        for j in 0..m.ncols() {
            write!(f, " {:>12.6}", m[(i, j)])?;
        }
        writeln!(f)?;
    }
    Ok(())
}

fn write_stats_table(f: &mut fmt::Formatter<'_>, stats: &[ComparativeStats]) -> fmt::Result {
    write!(f, "{:<16}", "")?;
    for s in stats {
        write!(f, " {:>12}", s.name)?;
    }
    writeln!(f)?;

    let rows: [(&str, fn(&ComparativeStats) -> f64, bool); 8] = [
        ("Total Return", |s| s.total_return, true),
        ("CAGR", |s| s.cagr, true),
        ("Annual Mean", |s| s.annualized_mean, true),
        ("Annual Vol", |s| s.annualized_volatility, true),
        ("Sharpe", |s| s.sharpe_ratio, false),
        ("Max Drawdown", |s| s.max_drawdown, true),
        ("Best Day", |s| s.best_day, true),
        ("Worst Day", |s| s.worst_day, true),
    ];
    for (label, value, percent) in rows {
        write!(f, "{label:<16}")?;
        for s in stats {
            if percent {
                write!(f, " {:>11.2}%", value(s) * 100.0)?;
            } else {
                write!(f, " {:>12.2}", value(s))?;
            }
        }
        writeln!(f)?;
    }
    write!(f, "{:<16}", "Observations")?;
    for s in stats {
        write!(f, " {:>12}", s.observations)?;
    }
    writeln!(f)
}

impl fmt::Display for PortfolioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.analysis;
        writeln!(f, "=== Portfolio: {} ===", a.tickers.join(", "))?;

        writeln!(f, "\n{:<10} {:>8} {:>14} {:>14}", "Ticker", "Weight", "Annual Return", "Annual StdDev")?;
        for (i, ticker) in a.tickers.iter().enumerate() {
            writeln!(
                f,
                "{:<10} {:>8.4} {:>13.4}% {:>13.4}%",
                ticker,
                a.weights[i],
                a.annual_returns[i] * 100.0,
                a.annual_std_devs[i] * 100.0
            )?;
        }

        writeln!(f, "\nCovariance (daily):")?;
        write_matrix(f, &a.tickers, &a.daily_covariance)?;
        writeln!(f, "\nCovariance (annualized):")?;
        write_matrix(f, &a.tickers, &a.annual_covariance)?;
        writeln!(f, "\nCorrelation:")?;
        write_matrix(f, &a.tickers, &a.correlation)?;

        writeln!(f, "\nExpected Portfolio Return: {:.5} %", a.expected_return * 100.0)?;
        writeln!(f, "Portfolio Variance:        {:.6}", a.variance)?;
        writeln!(f, "Portfolio Volatility:      {:.5} %", a.volatility * 100.0)?;

        writeln!(f, "\nPortfolio Beta vs {}:     {:.6}", self.market, self.beta)?;
        writeln!(
            f,
            "CAPM Expected Return:      {:.5} % (risk-free {:.2} %, premium {:.2} %)",
            self.capm_expected_return * 100.0,
            self.risk_free_rate * 100.0,
            self.market_risk_premium * 100.0
        )?;

        if !self.comparison.is_empty() {
            writeln!(f, "\nComparative statistics (daily returns):")?;
            write_stats_table(f, &self.comparison)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NashReport {
    pub shape: (usize, usize),
    pub zero_sum: bool,
    pub selection: Selection,
    /// Equilibria after selection, with `(row, column)` expected payoffs.
    pub equilibria: Vec<(Equilibrium, (f64, f64))>,
    /// How many the enumeration found before selection.
    pub found: usize,
}

impl fmt::Display for NashReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Nash equilibria: {}x{} game ===", self.shape.0, self.shape.1)?;
        if self.zero_sum {
            writeln!(f, "Zero-sum: yes (a mixed-strategy equilibrium exists; every equilibrium has the same value)")?;
        } else {
            writeln!(f, "Zero-sum: no (at least one equilibrium exists)")?;
        }
        writeln!(f, "Equilibria found: {}", self.found)?;
        if self.selection == Selection::Last && self.found > 1 {
            writeln!(f, "Showing only the last equilibrium enumerated")?;
        }
        for (i, (eq, (row, col))) in self.equilibria.iter().enumerate() {
            let kind = if eq.is_pure() { "pure" } else { "mixed" };
            writeln!(f, "  #{} ({kind}): {eq}", i + 1)?;
            writeln!(f, "      payoffs: row {row:.4}, column {col:.4}")?;
        }
        Ok(())
    }
}
