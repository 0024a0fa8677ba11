//! Portfolio risk/return statistics over a date-aligned return matrix.
//!
//! Every annualized quantity uses the same `trading_days` factor: means and
//! covariances scale linearly, standard deviations by its square root.

use nalgebra::{DMatrix, DVector};

use super::error::QuantError;
use super::returns::ReturnMatrix;
use super::stats::{mean, sample_covariance, sample_variance};

pub const DEFAULT_TRADING_DAYS: f64 = 250.0;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// One weight per asset, summing to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioWeights(Vec<f64>);

impl PortfolioWeights {
    pub fn new(weights: Vec<f64>) -> Result<Self, QuantError> {
        if weights.is_empty() {
            return Err(QuantError::InvalidWeights {
                reason: "no weights given".into(),
            });
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(QuantError::InvalidWeights {
                reason: "weights must be finite".into(),
            });
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(QuantError::InvalidWeights {
                reason: format!("weights sum to {sum}, expected 1"),
            });
        }
        Ok(Self(weights))
    }

    /// Equal weight across `n` assets.
    pub fn equal(n: usize) -> Result<Self, QuantError> {
        Self::new(vec![1.0 / n as f64; n])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn check_len(&self, assets: usize) -> Result<(), QuantError> {
        if self.0.len() != assets {
            return Err(QuantError::mismatch("portfolio weights", assets, self.0.len()));
        }
        Ok(())
    }

    fn to_vector(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.0)
    }
}

/// Mean daily return per asset, scaled to a year.
pub fn annualized_mean_returns(matrix: &ReturnMatrix, trading_days: f64) -> Vec<f64> {
    (0..matrix.n_assets())
        .map(|i| mean(&matrix.column(i)) * trading_days)
        .collect()
}

/// Sample standard deviation per asset, scaled by `sqrt(trading_days)`.
pub fn annualized_std_devs(matrix: &ReturnMatrix, trading_days: f64) -> Vec<f64> {
    (0..matrix.n_assets())
        .map(|i| (sample_variance(&matrix.column(i)) * trading_days).sqrt())
        .collect()
}

pub fn portfolio_expected_return(
    weights: &PortfolioWeights,
    annual_returns: &[f64],
) -> Result<f64, QuantError> {
    weights.check_len(annual_returns.len())?;
    Ok(weights
        .as_slice()
        .iter()
        .zip(annual_returns)
        .map(|(w, r)| w * r)
        .sum())
}

/// Sample (n - 1) covariance of daily returns.
pub fn covariance_matrix(matrix: &ReturnMatrix) -> Result<DMatrix<f64>, QuantError> {
    let n = matrix.n_obs();
    if n < 2 {
        return Err(QuantError::insufficient("covariance observations", n, 2));
    }
    let k = matrix.n_assets();
    let data = DMatrix::from_fn(n, k, |r, c| matrix.rows[r][c]);
    let means = data.row_mean();
    let centered = DMatrix::from_fn(n, k, |r, c| data[(r, c)] - means[c]);
    Ok(centered.transpose() * &centered / (n - 1) as f64)
}

pub fn annualized_covariance(
    matrix: &ReturnMatrix,
    trading_days: f64,
) -> Result<DMatrix<f64>, QuantError> {
    Ok(covariance_matrix(matrix)? * trading_days)
}

/// Pearson correlation; identical for daily and annualized covariance.
///
/// An asset with zero variance has no defined correlation, so its whole row
/// and column are NaN, diagonal included.
pub fn correlation_matrix(cov: &DMatrix<f64>) -> Result<DMatrix<f64>, QuantError> {
    let k = cov.nrows();
    if cov.ncols() != k {
        return Err(QuantError::mismatch("covariance columns", k, cov.ncols()));
    }
    let flat: Vec<bool> = (0..k).map(|i| cov[(i, i)] <= 0.0).collect();
    for (i, _) in flat.iter().enumerate().filter(|(_, f)| **f) {
        tracing::warn!(asset = i, "constant returns; correlation undefined");
    }
    Ok(DMatrix::from_fn(k, k, |i, j| {
        if flat[i] || flat[j] {
            f64::NAN
        } else if i == j {
            1.0
        } else {
            cov[(i, j)] / (cov[(i, i)] * cov[(j, j)]).sqrt()
        }
    }))
}

/// `w' * cov * w`.
pub fn portfolio_variance(
    weights: &PortfolioWeights,
    cov: &DMatrix<f64>,
) -> Result<f64, QuantError> {
    weights.check_len(cov.nrows())?;
    if cov.ncols() != cov.nrows() {
        return Err(QuantError::mismatch("covariance columns", cov.nrows(), cov.ncols()));
    }
    let w = weights.to_vector();
    Ok(w.dot(&(cov * &w)))
}

pub fn portfolio_volatility(
    weights: &PortfolioWeights,
    cov: &DMatrix<f64>,
) -> Result<f64, QuantError> {
    Ok(portfolio_variance(weights, cov)?.max(0.0).sqrt())
}

/// Weighted daily return of the combined portfolio.
pub fn portfolio_returns(
    matrix: &ReturnMatrix,
    weights: &PortfolioWeights,
) -> Result<Vec<f64>, QuantError> {
    weights.check_len(matrix.n_assets())?;
    Ok(matrix
        .rows
        .iter()
        .map(|row| row.iter().zip(weights.as_slice()).map(|(r, w)| r * w).sum())
        .collect())
}

/// Annualized Cov(portfolio, market) / Var(market).
pub fn capm_beta(
    portfolio: &[f64],
    market: &[f64],
    trading_days: f64,
) -> Result<f64, QuantError> {
    if portfolio.len() != market.len() {
        return Err(QuantError::mismatch("market returns", portfolio.len(), market.len()));
    }
    if market.len() < 2 {
        return Err(QuantError::insufficient("market returns", market.len(), 2));
    }
    let market_var = sample_variance(market) * trading_days;
    if market_var <= 0.0 {
        return Err(QuantError::ZeroVariance {
            what: "market returns".into(),
        });
    }
    Ok(sample_covariance(portfolio, market) * trading_days / market_var)
}

pub fn capm_expected_return(beta: f64, risk_free_rate: f64, market_risk_premium: f64) -> f64 {
    risk_free_rate + beta * market_risk_premium
}

/// Everything printed for the portfolio study.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioAnalysis {
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
    pub annual_returns: Vec<f64>,
    pub annual_std_devs: Vec<f64>,
    pub expected_return: f64,
    pub daily_covariance: DMatrix<f64>,
    pub annual_covariance: DMatrix<f64>,
    pub correlation: DMatrix<f64>,
    pub variance: f64,
    pub volatility: f64,
}

impl PortfolioAnalysis {
    pub fn compute(
        matrix: &ReturnMatrix,
        weights: &PortfolioWeights,
        trading_days: f64,
    ) -> Result<Self, QuantError> {
        weights.check_len(matrix.n_assets())?;

        let annual_returns = annualized_mean_returns(matrix, trading_days);
        let expected_return = portfolio_expected_return(weights, &annual_returns)?;
        let daily_covariance = covariance_matrix(matrix)?;
        let annual_covariance = &daily_covariance * trading_days;
        let correlation = correlation_matrix(&daily_covariance)?;
        let variance = portfolio_variance(weights, &annual_covariance)?;

        Ok(Self {
            tickers: matrix.tickers.clone(),
            weights: weights.as_slice().to_vec(),
            annual_returns,
            annual_std_devs: annualized_std_devs(matrix, trading_days),
            expected_return,
            daily_covariance,
            annual_covariance,
            correlation,
            variance,
            volatility: variance.max(0.0).sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn matrix(rows: Vec<Vec<f64>>) -> ReturnMatrix {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        ReturnMatrix {
            tickers: (0..rows[0].len()).map(|i| format!("T{i}")).collect(),
            dates: (0..rows.len())
                .map(|i| start + chrono::Days::new(i as u64))
                .collect(),
            rows,
        }
    }

    fn two_assets() -> ReturnMatrix {
        matrix(vec![
            vec![0.01, 0.02],
            vec![-0.02, 0.01],
            vec![0.03, -0.01],
            vec![0.00, 0.02],
        ])
    }

    #[test]
    fn weights_must_sum_to_one() {
        assert!(PortfolioWeights::new(vec![0.5, 0.5]).is_ok());
        assert!(PortfolioWeights::new(vec![0.5, 0.6]).is_err());
        assert!(PortfolioWeights::new(vec![]).is_err());
        assert!(PortfolioWeights::new(vec![f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn equal_weights() {
        let w = PortfolioWeights::equal(4).unwrap();
        assert_eq!(w.as_slice(), &[0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn annual_means_scale_by_trading_days() {
        let m = two_assets();
        let annual = annualized_mean_returns(&m, 250.0);
        assert_relative_eq!(annual[0], 0.005 * 250.0, epsilon = 1e-12);
        assert_relative_eq!(annual[1], 0.01 * 250.0, epsilon = 1e-12);
    }

    #[test]
    fn expected_return_is_weighted_sum() {
        let w = PortfolioWeights::new(vec![0.25, 0.75]).unwrap();
        let er = portfolio_expected_return(&w, &[0.1, 0.2]).unwrap();
        assert_relative_eq!(er, 0.175, epsilon = 1e-12);
    }

    #[test]
    fn covariance_is_sample_covariance() {
        let m = two_assets();
        let cov = covariance_matrix(&m).unwrap();
        assert_relative_eq!(cov[(0, 0)], sample_variance(&m.column(0)), epsilon = 1e-15);
        assert_relative_eq!(
            cov[(0, 1)],
            sample_covariance(&m.column(0), &m.column(1)),
            epsilon = 1e-15
        );
        assert_relative_eq!(cov[(0, 1)], cov[(1, 0)], epsilon = 1e-18);
    }

    #[test]
    fn correlation_is_scale_invariant() {
        let m = two_assets();
        let daily = covariance_matrix(&m).unwrap();
        let annual = annualized_covariance(&m, 250.0).unwrap();
        let c1 = correlation_matrix(&daily).unwrap();
        let c2 = correlation_matrix(&annual).unwrap();
        assert_relative_eq!(c1, c2, epsilon = 1e-12);
        assert_eq!(c1[(0, 0)], 1.0);
        assert!(c1[(0, 1)].abs() <= 1.0);
    }

    #[test]
    fn correlation_of_constant_asset_is_nan() {
        let m = matrix(vec![
            vec![0.25, 0.02, 0.01],
            vec![0.25, 0.03, -0.01],
            vec![0.25, 0.01, 0.02],
        ]);
        let cov = covariance_matrix(&m).unwrap();
        let c = correlation_matrix(&cov).unwrap();
        for j in 0..3 {
            assert!(c[(0, j)].is_nan());
            assert!(c[(j, 0)].is_nan());
        }
        assert_eq!(c[(1, 1)], 1.0);
        assert!(c[(1, 2)].is_finite());
    }

    #[test]
    fn analysis_survives_constant_asset() {
        let m = matrix(vec![
            vec![0.0, 0.01],
            vec![0.0, -0.02],
            vec![0.0, 0.015],
            vec![0.0, 0.003],
        ]);
        let w = PortfolioWeights::new(vec![0.5, 0.5]).unwrap();
        let a = PortfolioAnalysis::compute(&m, &w, 250.0).unwrap();

        assert_eq!(a.annual_returns[0], 0.0);
        assert_eq!(a.annual_covariance[(0, 0)], 0.0);
        assert!(a.correlation[(0, 1)].is_nan());
        assert_relative_eq!(a.variance, 0.25 * a.annual_covariance[(1, 1)], epsilon = 1e-15);
        assert_relative_eq!(a.volatility, a.variance.sqrt(), epsilon = 1e-15);
    }

    #[test]
    fn variance_of_single_asset_portfolio() {
        let m = two_assets();
        let cov = annualized_covariance(&m, 250.0).unwrap();
        let w = PortfolioWeights::new(vec![1.0, 0.0]).unwrap();
        assert_relative_eq!(
            portfolio_variance(&w, &cov).unwrap(),
            cov[(0, 0)],
            epsilon = 1e-15
        );
    }

    #[test]
    fn variance_two_assets_closed_form() {
        let m = two_assets();
        let cov = annualized_covariance(&m, 250.0).unwrap();
        let w = PortfolioWeights::new(vec![0.5, 0.5]).unwrap();
        let expected = 0.25 * cov[(0, 0)] + 0.25 * cov[(1, 1)] + 0.5 * cov[(0, 1)];
        assert_relative_eq!(portfolio_variance(&w, &cov).unwrap(), expected, epsilon = 1e-15);
        assert_relative_eq!(
            portfolio_volatility(&w, &cov).unwrap(),
            expected.sqrt(),
            epsilon = 1e-15
        );
    }

    #[test]
    fn mismatched_weights_are_fatal() {
        let m = two_assets();
        let cov = covariance_matrix(&m).unwrap();
        let w = PortfolioWeights::new(vec![0.2, 0.3, 0.5]).unwrap();
        assert!(matches!(
            portfolio_variance(&w, &cov),
            Err(QuantError::DimensionMismatch { expected: 2, actual: 3, .. })
        ));
        assert!(portfolio_returns(&m, &w).is_err());
        assert!(PortfolioAnalysis::compute(&m, &w, 250.0).is_err());
    }

    #[test]
    fn portfolio_returns_are_weighted() {
        let m = two_assets();
        let w = PortfolioWeights::new(vec![0.5, 0.5]).unwrap();
        let r = portfolio_returns(&m, &w).unwrap();
        assert_relative_eq!(r[0], 0.015, epsilon = 1e-15);
        assert_relative_eq!(r[2], 0.01, epsilon = 1e-15);
    }

    #[test]
    fn capm_beta_of_market_is_one() {
        let market = [0.01, -0.02, 0.015, 0.003];
        assert_relative_eq!(capm_beta(&market, &market, 250.0).unwrap(), 1.0, epsilon = 1e-12);
        let levered: Vec<f64> = market.iter().map(|r| 2.0 * r).collect();
        assert_relative_eq!(capm_beta(&levered, &market, 250.0).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn capm_beta_rejects_flat_market() {
        let err = capm_beta(&[0.01, 0.02], &[0.0, 0.0], 250.0).unwrap_err();
        assert!(matches!(err, QuantError::ZeroVariance { .. }));
    }

    #[test]
    fn capm_expected_return_reference_constants() {
        assert_relative_eq!(capm_expected_return(1.2, 0.025, 0.05), 0.085, epsilon = 1e-15);
    }

    #[test]
    fn analysis_bundles_consistent_values() {
        let m = two_assets();
        let w = PortfolioWeights::new(vec![0.5, 0.5]).unwrap();
        let a = PortfolioAnalysis::compute(&m, &w, 250.0).unwrap();
        assert_relative_eq!(a.volatility, a.variance.sqrt(), epsilon = 1e-15);
        assert_relative_eq!(a.annual_covariance, &a.daily_covariance * 250.0, epsilon = 1e-15);
        assert_relative_eq!(
            a.annual_std_devs[0],
            a.annual_covariance[(0, 0)].sqrt(),
            epsilon = 1e-12
        );
    }
}
