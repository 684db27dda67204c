use serde::{Deserialize, Serialize};

/// Below this `|det|` the X/M design is treated as collinear.
pub const SINGULAR_DETERMINANT: f64 = 1e-10;
/// Smallest sample with a positive residual degree of freedom for Y ~ X.
pub const MIN_SIMPLE_OBSERVATIONS: usize = 3;
/// Smallest sample with a positive residual degree of freedom for Y ~ X + M.
pub const MIN_CONDITIONAL_OBSERVATIONS: usize = 4;
/// Two-sided 5% critical value of the normal approximation.
pub const CRITICAL_T_95: f64 = 1.96;

/// OLS estimate of the X slope.
///
/// When `estimable` is false the numbers are the zero sentinel (slope 0,
/// standard error 0) and must be rendered as "no estimate", not as a null
/// effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Coefficient on X.
    pub slope: f64,
    /// Standard error of `slope`.
    pub standard_error: f64,
    /// Fitted intercept.
    pub intercept: f64,
    /// Coefficient on M; present only for the conditional regression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope_on_m: Option<f64>,
    /// False when the design was degenerate.
    pub estimable: bool,
}

impl RegressionResult {
    fn no_estimate(intercept: f64, conditional: bool) -> Self {
        Self {
            slope: 0.0,
            standard_error: 0.0,
            intercept,
            slope_on_m: if conditional { Some(0.0) } else { None },
            estimable: false,
        }
    }

    /// `|slope / standard_error|`, or 0 when the standard error is 0.
    #[must_use]
    pub fn t_statistic(&self) -> f64 {
        if self.standard_error > 0.0 {
            (self.slope / self.standard_error).abs()
        } else {
            0.0
        }
    }

    /// Whether `|t|` exceeds `critical_t`.
    #[must_use]
    pub fn is_significant_at(&self, critical_t: f64) -> bool {
        self.estimable && self.t_statistic() > critical_t
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Regression of Y on X with intercept.
///
/// Returns the sentinel when `Sxx` is zero or fewer than three pairs are
/// given. Extra elements of the longer slice are ignored.
#[must_use]
pub fn simple_reg(xs: &[f64], ys: &[f64]) -> RegressionResult {
    let n = xs.len().min(ys.len());
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let (x_mean, y_mean) = (mean(xs), mean(ys));

    let (mut sxx, mut sxy) = (0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - x_mean;
        sxx += dx * dx;
        sxy += dx * (y - y_mean);
    }
    if n < MIN_SIMPLE_OBSERVATIONS || sxx <= 0.0 {
        return RegressionResult::no_estimate(y_mean, false);
    }

    let slope = sxy / sxx;
    let sse: f64 = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let residual = y - (y_mean + slope * (x - x_mean));
            residual * residual
        })
        .sum();
    RegressionResult {
        slope,
        standard_error: (sse / (n - 2) as f64 / sxx).sqrt(),
        intercept: y_mean - slope * x_mean,
        slope_on_m: None,
        estimable: true,
    }
}

/// Regression of Y on X and M with intercept, via the centered 2×2 normal
/// equations.
///
/// `slope` is the X coefficient and `standard_error` its standard error.
/// Returns the sentinel when `|det| < 1e-10` or fewer than four triples are
/// given.
#[must_use]
pub fn multi_reg(xs: &[f64], ms: &[f64], ys: &[f64]) -> RegressionResult {
    let n = xs.len().min(ms.len()).min(ys.len());
    let (xs, ms, ys) = (&xs[..n], &ms[..n], &ys[..n]);
    let (x_mean, m_mean, y_mean) = (mean(xs), mean(ms), mean(ys));

    let (mut sxx, mut smm, mut sxm, mut sxy, mut smy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for ((&x, &m), &y) in xs.iter().zip(ms).zip(ys) {
        let (dx, dm, dy) = (x - x_mean, m - m_mean, y - y_mean);
        sxx += dx * dx;
        smm += dm * dm;
        sxm += dx * dm;
        sxy += dx * dy;
        smy += dm * dy;
    }
    let det = sxx * smm - sxm * sxm;
    if n < MIN_CONDITIONAL_OBSERVATIONS || det.abs() < SINGULAR_DETERMINANT {
        return RegressionResult::no_estimate(y_mean, true);
    }

    let slope_x = (smm * sxy - sxm * smy) / det;
    let slope_m = (sxx * smy - sxm * sxy) / det;
    let intercept = y_mean - slope_x * x_mean - slope_m * m_mean;
    let sse: f64 = xs
        .iter()
        .zip(ms)
        .zip(ys)
        .map(|((&x, &m), &y)| {
            let residual = y - (intercept + slope_x * x + slope_m * m);
            residual * residual
        })
        .sum();
    let mse = sse / (n - 3) as f64;
    RegressionResult {
        slope: slope_x,
        standard_error: (mse * smm / det).max(0.0).sqrt(),
        intercept,
        slope_on_m: Some(slope_m),
        estimable: true,
    }
}
