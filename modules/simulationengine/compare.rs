use serde::{Deserialize, Serialize};

use crate::estimation::RegressionResult;

/// How far each estimate lands from the effect that generated the data.
///
/// Biases are `estimate − true_beta`; a missing value means the regression
/// returned no estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasComparison {
    /// Effect used by the generator.
    pub true_beta: f64,
    /// Bias of the regression of Y on X.
    pub unconditional_bias: Option<f64>,
    /// Bias of the regression of Y on X and M.
    pub conditional_bias: Option<f64>,
    /// Shift of the X slope caused by adding M (`conditional − unconditional`).
    pub displacement: Option<f64>,
}

impl BiasComparison {
    /// Whether conditioning moved the estimate further from the truth.
    #[must_use]
    pub fn conditioning_hurts(&self) -> bool {
        match (self.unconditional_bias, self.conditional_bias) {
            (Some(unconditional), Some(conditional)) => conditional.abs() > unconditional.abs(),
            _ => false,
        }
    }

    /// Whether the conditional slope points the opposite way from a non-zero
    /// true effect.
    #[must_use]
    pub fn sign_reversed(&self) -> bool {
        self.conditional_bias.is_some_and(|bias| {
            let estimate = self.true_beta + bias;
            self.true_beta != 0.0 && estimate != 0.0 && (estimate > 0.0) != (self.true_beta > 0.0)
        })
    }
}

/// Compares both X slopes against `true_beta`.
#[must_use]
pub fn compare(
    true_beta: f64,
    unconditional: &RegressionResult,
    conditional: &RegressionResult,
) -> BiasComparison {
    let bias = |fit: &RegressionResult| fit.estimable.then(|| fit.slope - true_beta);
    let displacement = (unconditional.estimable && conditional.estimable)
        .then(|| conditional.slope - unconditional.slope);
    BiasComparison {
        true_beta,
        unconditional_bias: bias(unconditional),
        conditional_bias: bias(conditional),
        displacement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(slope: f64, estimable: bool) -> RegressionResult {
        RegressionResult {
            slope,
            standard_error: 0.01,
            intercept: 0.0,
            slope_on_m: None,
            estimable,
        }
    }

    #[test]
    fn biases_are_measured_against_truth() {
        let comparison = compare(0.25, &fit(0.24, true), &fit(-0.2, true));
        assert!((comparison.unconditional_bias.unwrap() + 0.01).abs() < 1e-12);
        assert!((comparison.conditional_bias.unwrap() + 0.45).abs() < 1e-12);
        assert!((comparison.displacement.unwrap() + 0.44).abs() < 1e-12);
        assert!(comparison.conditioning_hurts());
        assert!(comparison.sign_reversed());
    }

    #[test]
    fn missing_estimates_carry_no_bias() {
        let comparison = compare(0.0, &fit(0.1, true), &fit(0.0, false));
        assert!(comparison.unconditional_bias.is_some());
        assert!(comparison.conditional_bias.is_none());
        assert!(comparison.displacement.is_none());
        assert!(!comparison.conditioning_hurts());
        assert!(!comparison.sign_reversed());
    }
}
