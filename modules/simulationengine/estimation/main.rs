//! Estimation stack: OLS fits and the collider adjustment built on them.

/// Naive residualization on the collider.
pub mod adjustment;
/// Simple and two-predictor OLS.
pub mod regression;

pub use adjustment::{adjust, adjust_with, AdjustedDataset, AdjustedObservation};
pub use regression::{
    multi_reg, simple_reg, RegressionResult, CRITICAL_T_95, MIN_CONDITIONAL_OBSERVATIONS,
    MIN_SIMPLE_OBSERVATIONS, SINGULAR_DETERMINANT,
};
