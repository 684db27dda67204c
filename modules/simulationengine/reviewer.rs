use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    estimation::{RegressionResult, CRITICAL_T_95},
    helper::SimulationTelemetry,
};

/// Reading of a single X slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The design was degenerate; nothing to read.
    NoEstimate,
    /// `|t|` at or below the critical value.
    NotSignificant,
    /// Significant slope from the regression of Y on X.
    Significant,
    /// Significant slope after conditioning on M although X has no effect.
    Spurious,
    /// Significant slope after conditioning on M for a non-zero effect.
    Biased,
}

impl Verdict {
    /// Short badge text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoEstimate => "no estimate",
            Self::NotSignificant => "not significant",
            Self::Significant => "significant",
            Self::Spurious => "spurious association",
            Self::Biased => "biased",
        }
    }

    /// Whether the verdict flags a problem introduced by conditioning.
    #[must_use]
    pub const fn is_warning(self) -> bool {
        matches!(self, Self::Spurious | Self::Biased)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdicts for both regressions of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Verdict on Y ~ X.
    pub unconditional: Verdict,
    /// Verdict on Y ~ X + M.
    pub conditional: Verdict,
}

/// Reviewer that reads t-statistics against a critical value.
#[derive(Debug, Clone)]
pub struct SimulationReviewer {
    telemetry: Option<SimulationTelemetry>,
    critical_t: f64,
}

impl SimulationReviewer {
    /// Creates reviewer using the 5% two-sided normal critical value.
    #[must_use]
    pub const fn new(telemetry: Option<SimulationTelemetry>) -> Self {
        Self {
            telemetry,
            critical_t: CRITICAL_T_95,
        }
    }

    /// Overrides the critical `|t|`.
    #[must_use]
    pub const fn with_critical_t(mut self, critical_t: f64) -> Self {
        self.critical_t = critical_t;
        self
    }

    /// Critical `|t|` in use.
    #[must_use]
    pub const fn critical_t(&self) -> f64 {
        self.critical_t
    }

    /// Classifies the unconditional slope.
    #[must_use]
    pub fn classify_unconditional(&self, fit: &RegressionResult) -> Verdict {
        if !fit.estimable {
            Verdict::NoEstimate
        } else if fit.is_significant_at(self.critical_t) {
            Verdict::Significant
        } else {
            Verdict::NotSignificant
        }
    }

    /// Classifies the slope obtained after conditioning on the collider.
    #[must_use]
    pub fn classify_conditional(&self, fit: &RegressionResult, true_beta: f64) -> Verdict {
        if !fit.estimable {
            Verdict::NoEstimate
        } else if !fit.is_significant_at(self.critical_t) {
            Verdict::NotSignificant
        } else if true_beta == 0.0 {
            Verdict::Spurious
        } else {
            Verdict::Biased
        }
    }

    /// Reviews both regressions of a run.
    pub fn review(
        &self,
        true_beta: f64,
        unconditional: &RegressionResult,
        conditional: &RegressionResult,
    ) -> Result<Review> {
        let review = Review {
            unconditional: self.classify_unconditional(unconditional),
            conditional: self.classify_conditional(conditional, true_beta),
        };
        if let Some(tel) = &self.telemetry {
            tel.event(
                "simulation.review.complete",
                json!({
                    "unconditional": review.unconditional,
                    "conditional": review.conditional,
                    "critical_t": self.critical_t,
                }),
            )?;
        }
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(slope: f64, standard_error: f64) -> RegressionResult {
        RegressionResult {
            slope,
            standard_error,
            intercept: 0.0,
            slope_on_m: Some(0.5),
            estimable: true,
        }
    }

    #[test]
    fn null_effect_with_significant_conditional_is_spurious() {
        let reviewer = SimulationReviewer::new(None);
        let review = reviewer
            .review(0.0, &fit(0.01, 0.02), &fit(-0.4, 0.01))
            .unwrap();
        assert_eq!(review.unconditional, Verdict::NotSignificant);
        assert_eq!(review.conditional, Verdict::Spurious);
        assert!(review.conditional.is_warning());
    }

    #[test]
    fn real_effect_with_significant_conditional_is_biased() {
        let reviewer = SimulationReviewer::new(None);
        let review = reviewer
            .review(0.25, &fit(0.25, 0.01), &fit(-0.2, 0.01))
            .unwrap();
        assert_eq!(review.unconditional, Verdict::Significant);
        assert_eq!(review.conditional, Verdict::Biased);
        assert!(!review.unconditional.is_warning());
    }

    #[test]
    fn sentinel_reads_as_no_estimate() {
        let reviewer = SimulationReviewer::new(None);
        let sentinel = RegressionResult {
            estimable: false,
            ..fit(0.0, 0.0)
        };
        assert_eq!(reviewer.classify_unconditional(&sentinel), Verdict::NoEstimate);
        assert_eq!(reviewer.classify_conditional(&sentinel, 0.0), Verdict::NoEstimate);
        assert_eq!(Verdict::NoEstimate.to_string(), "no estimate");
    }

    #[test]
    fn critical_value_is_configurable() {
        let strict = SimulationReviewer::new(None).with_critical_t(3.0);
        assert_eq!(strict.classify_unconditional(&fit(0.25, 0.1)), Verdict::NotSignificant);
        let lenient = SimulationReviewer::new(None).with_critical_t(2.0);
        assert_eq!(lenient.classify_unconditional(&fit(0.25, 0.1)), Verdict::Significant);
    }
}
