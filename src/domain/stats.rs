//! Descriptive statistics and the side-by-side performance summary.

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) covariance of two equal-length slices.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return f64::NAN;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (ma, mb) = (mean(a), mean(b));
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (n - 1) as f64
}

pub fn sample_variance(values: &[f64]) -> f64 {
    sample_covariance(values, values)
}

pub fn sample_std_dev(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Performance summary of one daily return series.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparativeStats {
    pub name: String,
    pub total_return: f64,
    pub cagr: f64,
    pub annualized_mean: f64,
    pub annualized_volatility: f64,
    /// Annualized, zero risk-free rate.
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub best_day: f64,
    pub worst_day: f64,
    pub observations: usize,
}

impl ComparativeStats {
    pub fn compute(name: impl Into<String>, returns: &[f64], trading_days: f64) -> Self {
        let name = name.into();
        if returns.is_empty() {
            return Self {
                name,
                total_return: 0.0,
                cagr: 0.0,
                annualized_mean: 0.0,
                annualized_volatility: 0.0,
                sharpe_ratio: 0.0,
                max_drawdown: 0.0,
                best_day: 0.0,
                worst_day: 0.0,
                observations: 0,
            };
        }

        let equity = equity_curve(returns);
        let total_return = equity.last().copied().unwrap_or(1.0) - 1.0;

        let years = returns.len() as f64 / trading_days;
        let cagr = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            -1.0
        };

        let daily_mean = mean(returns);
        let daily_std = if returns.len() > 1 {
            sample_std_dev(returns)
        } else {
            0.0
        };
        let sharpe_ratio = if daily_std > 0.0 {
            daily_mean / daily_std * trading_days.sqrt()
        } else {
            0.0
        };

        Self {
            name,
            total_return,
            cagr,
            annualized_mean: daily_mean * trading_days,
            annualized_volatility: daily_std * trading_days.sqrt(),
            sharpe_ratio,
            max_drawdown: max_drawdown(&equity),
            best_day: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_day: returns.iter().copied().fold(f64::INFINITY, f64::min),
            observations: returns.len(),
        }
    }
}

/// Growth of 1 unit, starting at 1.0 before the first return.
pub fn equity_curve(returns: &[f64]) -> Vec<f64> {
    let mut equity = Vec::with_capacity(returns.len() + 1);
    equity.push(1.0);
    let mut value = 1.0;
    for r in returns {
        value *= 1.0 + r;
        equity.push(value);
    }
    equity
}

/// Largest peak-to-trough decline as a positive fraction.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let Some(&first) = equity.first() else {
        return 0.0;
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &value in equity {
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
        }
    }
    max_dd
}
