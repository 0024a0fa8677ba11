//! Single-predictor ordinary least squares and the CAPM excess-return metric.

use statrs::distribution::{ContinuousCDF, StudentsT};

use super::error::QuantError;
use super::stats::mean;

/// Guards the t statistic against division by zero on a perfect fit.
const TINY: f64 = 1.0e-20;

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionResult {
    /// Beta when `x` is the market.
    pub slope: f64,
    /// Alpha when `x` is the market.
    pub intercept: f64,
    pub r: f64,
    pub r_squared: f64,
    /// Two-sided p-value for the null hypothesis `slope == 0`.
    pub p_value: f64,
    /// Standard error of the slope.
    pub std_err: f64,
    pub intercept_std_err: f64,
    pub observations: usize,
}

impl RegressionResult {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Jensen's alpha in percent per period, given an annual T-bill rate in
    /// percent and monthly periods.
    pub fn jensens_alpha(&self, annual_tbill_pct: f64) -> f64 {
        let monthly_riskfree = annual_tbill_pct / 12.0;
        let risk_free_component = monthly_riskfree * (1.0 - self.slope);
        self.intercept * 100.0 - risk_free_component
    }

    /// Jensen's alpha compounded over twelve months, as a fraction.
    pub fn annualized_excess_return(&self, annual_tbill_pct: f64) -> f64 {
        (1.0 + self.jensens_alpha(annual_tbill_pct) / 100.0).powi(12) - 1.0
    }
}

/// Regress `y` on `x`.
pub fn linregress(x: &[f64], y: &[f64]) -> Result<RegressionResult, QuantError> {
    if x.len() != y.len() {
        return Err(QuantError::mismatch("regression response", x.len(), y.len()));
    }
    let n = x.len();
    if n < 2 {
        return Err(QuantError::insufficient("regression observations", n, 2));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(QuantError::Solver {
            reason: "regression input contains non-finite values".into(),
        });
    }

    let x_mean = mean(x);
    let y_mean = mean(y);

    // Population (1/n) moments; the normalisation cancels in every ratio.
    let nf = n as f64;
    let ssxm = x.iter().map(|v| (v - x_mean).powi(2)).sum::<f64>() / nf;
    let ssym = y.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>() / nf;
    let ssxym = x
        .iter()
        .zip(y)
        .map(|(a, b)| (a - x_mean) * (b - y_mean))
        .sum::<f64>()
        / nf;

    if x.iter().all(|v| *v == x[0]) {
        return Err(QuantError::ZeroVariance {
            what: "regression predictor".into(),
        });
    }

    let r = if y.iter().all(|v| *v == y[0]) {
        0.0
    } else {
        (ssxym / (ssxm * ssym).sqrt()).clamp(-1.0, 1.0)
    };

    let slope = ssxym / ssxm;
    let intercept = y_mean - slope * x_mean;

    let (p_value, std_err) = if n == 2 {
        (0.0, 0.0)
    } else {
        let df = (n - 2) as f64;
        let t = r * (df / ((1.0 - r + TINY) * (1.0 + r + TINY))).sqrt();
        let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| QuantError::Solver {
            reason: format!("t distribution: {e}"),
        })?;
        let p = 2.0 * dist.sf(t.abs());
        let se = ((1.0 - r * r) * ssym / ssxm / df).sqrt();
        (p, se)
    };

    let x_sq_mean = x.iter().map(|v| v * v).sum::<f64>() / nf;
    let intercept_std_err = std_err * x_sq_mean.sqrt();

    Ok(RegressionResult {
        slope,
        intercept,
        r,
        r_squared: r * r,
        p_value,
        std_err,
        intercept_std_err,
        observations: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_line_recovers_parameters() {
        let x = [-0.02, 0.01, 0.03, 0.05, -0.04];
        let y: Vec<f64> = x.iter().map(|v| 1.5 * v + 0.002).collect();
        let r = linregress(&x, &y).unwrap();
        assert_relative_eq!(r.slope, 1.5, epsilon = 1e-10);
        assert_relative_eq!(r.intercept, 0.002, epsilon = 1e-12);
        assert_relative_eq!(r.r_squared, 1.0, epsilon = 1e-12);
        assert!(r.std_err < 1e-6);
        assert!(r.p_value < 1e-6);
    }

    #[test]
    fn identical_series_give_unit_beta() {
        let x = [0.01, -0.03, 0.02, 0.04, -0.01, 0.0];
        let r = linregress(&x, &x).unwrap();
        assert_relative_eq!(r.slope, 1.0, epsilon = 1e-12);
        assert_relative_eq!(r.intercept, 0.0, epsilon = 1e-12);
        assert_relative_eq!(r.r_squared, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn noisy_fit_matches_reference_values() {
        // Reference values from a standard least-squares implementation.
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];
        let r = linregress(&x, &y).unwrap();
        assert_relative_eq!(r.slope, 0.6, epsilon = 1e-12);
        assert_relative_eq!(r.intercept, 2.2, epsilon = 1e-12);
        assert_relative_eq!(r.r, 0.7745966692414834, epsilon = 1e-12);
        assert_relative_eq!(r.std_err, 0.28284271247461895, epsilon = 1e-12);
        assert_relative_eq!(r.p_value, 0.1240270, epsilon = 1e-6);
    }

    #[test]
    fn constant_predictor_is_rejected() {
        let x = [0.01, 0.01, 0.01];
        let y = [0.02, 0.03, 0.01];
        let err = linregress(&x, &y).unwrap_err();
        assert!(matches!(err, QuantError::ZeroVariance { .. }));
    }

    #[test]
    fn constant_response_has_zero_correlation() {
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 2.0, 2.0];
        let r = linregress(&x, &y).unwrap();
        assert_eq!(r.r, 0.0);
        assert_eq!(r.slope, 0.0);
        assert_eq!(r.intercept, 2.0);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = linregress(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            QuantError::DimensionMismatch { expected: 3, actual: 2, .. }
        ));
    }

    #[test]
    fn too_few_points_is_rejected() {
        let err = linregress(&[1.0], &[1.0]).unwrap_err();
        assert!(matches!(err, QuantError::InsufficientData { have: 1, .. }));
    }

    #[test]
    fn two_points_fit_exactly() {
        let r = linregress(&[0.0, 1.0], &[1.0, 3.0]).unwrap();
        assert_relative_eq!(r.slope, 2.0);
        assert_relative_eq!(r.intercept, 1.0);
        assert_eq!(r.p_value, 0.0);
        assert_eq!(r.std_err, 0.0);
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let err = linregress(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, QuantError::Solver { .. }));
    }

    #[test]
    fn predict_uses_fitted_line() {
        let r = linregress(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
        assert_relative_eq!(r.predict(10.0), 21.0, epsilon = 1e-10);
    }

    #[test]
    fn excess_return_formula() {
        let r = RegressionResult {
            slope: 1.2,
            intercept: 0.005,
            r: 0.8,
            r_squared: 0.64,
            p_value: 0.01,
            std_err: 0.1,
            intercept_std_err: 0.01,
            observations: 58,
        };
        // 0.5 / 12 * (1 - 1.2) = -0.008333..
        let alpha = r.jensens_alpha(0.5);
        assert_relative_eq!(alpha, 0.5 + 0.5 / 12.0 * 0.2, epsilon = 1e-12);
        let expected = (1.0 + alpha / 100.0).powi(12) - 1.0;
        assert_relative_eq!(r.annualized_excess_return(0.5), expected, epsilon = 1e-12);
    }

    #[test]
    fn beta_of_one_has_no_risk_free_adjustment() {
        let r = linregress(&[0.0, 0.01, 0.02], &[0.01, 0.02, 0.03]).unwrap();
        assert_relative_eq!(r.jensens_alpha(0.5), 1.0, epsilon = 1e-9);
    }
}
