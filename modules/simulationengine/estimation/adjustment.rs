use serde::{Deserialize, Serialize};

use crate::data_generator::Dataset;

use super::regression::{mean, multi_reg, simple_reg, RegressionResult};

/// X paired with the outcome after residualizing on the collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustedObservation {
    /// Treatment, unchanged.
    pub x: f64,
    /// `y − slope_on_m · (m − mean(m))`.
    pub adjusted_y: f64,
}

/// Same length and order as the dataset it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedDataset {
    slope_on_m: f64,
    m_mean: f64,
    x: Vec<f64>,
    adjusted_y: Vec<f64>,
}

impl AdjustedDataset {
    /// Coefficient on M used for the adjustment (0 for a degenerate design).
    #[must_use]
    pub const fn slope_on_m(&self) -> f64 {
        self.slope_on_m
    }

    /// Mean of M the collider was centered on.
    #[must_use]
    pub const fn m_mean(&self) -> f64 {
        self.m_mean
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether there are no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// X column.
    #[must_use]
    pub fn xs(&self) -> &[f64] {
        &self.x
    }

    /// Adjusted Y column.
    #[must_use]
    pub fn adjusted_ys(&self) -> &[f64] {
        &self.adjusted_y
    }

    /// Observation at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<AdjustedObservation> {
        Some(AdjustedObservation {
            x: *self.x.get(index)?,
            adjusted_y: *self.adjusted_y.get(index)?,
        })
    }

    /// Observations in dataset order.
    pub fn iter(&self) -> impl Iterator<Item = AdjustedObservation> + '_ {
        self.x
            .iter()
            .zip(&self.adjusted_y)
            .map(|(&x, &adjusted_y)| AdjustedObservation { x, adjusted_y })
    }

    /// Line through the adjusted cloud; its slope equals the conditional X slope.
    #[must_use]
    pub fn fit(&self) -> RegressionResult {
        simple_reg(&self.x, &self.adjusted_y)
    }
}

/// Residualizes Y on the collider: `adjusted_y = y − slope_on_m · (m − mean(m))`.
///
/// This is the naive "control for M" view whose bias the demo exists to show,
/// not a valid causal adjustment.
#[must_use]
pub fn adjust(dataset: &Dataset) -> AdjustedDataset {
    adjust_with(dataset, &multi_reg(dataset.xs(), dataset.ms(), dataset.ys()))
}

/// Same as [`adjust`], reusing a conditional fit already computed for `dataset`.
///
/// A fit without a coefficient on M (or a sentinel) leaves Y unchanged.
#[must_use]
pub fn adjust_with(dataset: &Dataset, conditional: &RegressionResult) -> AdjustedDataset {
    let slope_on_m = conditional
        .slope_on_m
        .filter(|_| conditional.estimable)
        .unwrap_or(0.0);
    let m_mean = mean(dataset.ms());
    let adjusted_y = dataset
        .ys()
        .iter()
        .zip(dataset.ms())
        .map(|(&y, &m)| y - slope_on_m * (m - m_mean))
        .collect();
    AdjustedDataset {
        slope_on_m,
        m_mean,
        x: dataset.xs().to_vec(),
        adjusted_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ScenarioCatalog;

    #[test]
    fn adjustment_preserves_order_and_applies_formula() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        let data = catalog.get("c1").unwrap().generate(500, 42, 0.0);
        let adjusted = adjust(&data);
        assert_eq!(adjusted.len(), data.len());
        let slope_on_m = multi_reg(data.xs(), data.ms(), data.ys()).slope_on_m.unwrap();
        assert_eq!(adjusted.slope_on_m(), slope_on_m);
        for (raw, adj) in data.iter().zip(adjusted.iter()) {
            assert_eq!(raw.x, adj.x);
            let expected = raw.y - slope_on_m * (raw.m - adjusted.m_mean());
            assert_eq!(adj.adjusted_y, expected);
        }
        assert_eq!(adjusted.get(0).unwrap().x, data.xs()[0]);
        assert!(adjusted.get(500).is_none());
    }

    #[test]
    fn adjusted_fit_matches_conditional_slope() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        let data = catalog.get("m3").unwrap().generate(2_000, 5, 0.06);
        let conditional = multi_reg(data.xs(), data.ms(), data.ys());
        let line = adjust(&data).fit();
        assert!((line.slope - conditional.slope).abs() < 1e-9);
    }

    #[test]
    fn reusing_the_conditional_fit_changes_nothing() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        let data = catalog.get("c2").unwrap().generate(1_000, 8, 0.05);
        let conditional = multi_reg(data.xs(), data.ms(), data.ys());
        assert_eq!(adjust_with(&data, &conditional), adjust(&data));
        let unconditional = simple_reg(data.xs(), data.ys());
        assert_eq!(adjust_with(&data, &unconditional).adjusted_ys(), data.ys());
    }

    #[test]
    fn degenerate_design_leaves_outcome_untouched() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        let data = catalog.get("c3").unwrap().generate(3, 1, 0.0);
        let adjusted = adjust(&data);
        assert_eq!(adjusted.slope_on_m(), 0.0);
        assert_eq!(adjusted.adjusted_ys(), data.ys());
        assert_eq!(adjusted.xs(), data.xs());
    }
}
