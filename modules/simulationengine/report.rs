use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    catalog::ScenarioKind,
    compare::BiasComparison,
    data_generator::Dataset,
    estimation::{AdjustedDataset, RegressionResult},
    request::SimulationRequest,
    reviewer::{Review, Verdict},
};

/// Everything a single run produced.
///
/// Carries no clock or run id, so two runs of an equal request compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Request that was executed.
    pub request: SimulationRequest,
    /// Structure of the scenario.
    pub kind: ScenarioKind,
    /// Effect used by the generator.
    pub true_beta: f64,
    /// Regression of Y on X.
    pub unconditional: RegressionResult,
    /// Regression of Y on X and M.
    pub conditional: RegressionResult,
    /// Biases of both estimates.
    pub comparison: BiasComparison,
    /// Verdicts of both estimates.
    pub review: Review,
    /// Simulated sample.
    pub dataset: Dataset,
    /// Outcome residualized on the collider.
    pub adjusted: AdjustedDataset,
}

impl SimulationReport {
    /// Scenario id of the run.
    #[must_use]
    pub fn scenario_id(&self) -> &str {
        &self.request.scenario_id
    }

    /// Result and verdict selected by the request's conditioning.
    #[must_use]
    pub fn surfaced(&self) -> (&RegressionResult, Verdict) {
        if self.request.conditioning.is_conditioned() {
            (&self.conditional, self.review.conditional)
        } else {
            (&self.unconditional, self.review.unconditional)
        }
    }

    /// JSON view; the sample columns are left out unless `include_data`.
    pub fn to_json(&self, include_data: bool) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if !include_data {
            if let Some(fields) = value.as_object_mut() {
                fields.remove("dataset");
                fields.remove("adjusted");
            }
        }
        Ok(value)
    }
}

/// Builder for `SimulationReport`.
pub struct SimulationReportBuilder {
    request: SimulationRequest,
    kind: Option<ScenarioKind>,
    fits: Option<(RegressionResult, RegressionResult)>,
    comparison: Option<BiasComparison>,
    review: Option<Review>,
    dataset: Option<Dataset>,
    adjusted: Option<AdjustedDataset>,
}

impl SimulationReportBuilder {
    /// Creates builder for `request`.
    #[must_use]
    pub const fn new(request: SimulationRequest) -> Self {
        Self {
            request,
            kind: None,
            fits: None,
            comparison: None,
            review: None,
            dataset: None,
            adjusted: None,
        }
    }

    /// Sets the scenario kind.
    #[must_use]
    pub const fn kind(mut self, kind: ScenarioKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets both regression results.
    #[must_use]
    pub const fn fits(
        mut self,
        unconditional: RegressionResult,
        conditional: RegressionResult,
    ) -> Self {
        self.fits = Some((unconditional, conditional));
        self
    }

    /// Sets the comparison.
    #[must_use]
    pub const fn comparison(mut self, comparison: BiasComparison) -> Self {
        self.comparison = Some(comparison);
        self
    }

    /// Sets the review.
    #[must_use]
    pub const fn review(mut self, review: Review) -> Self {
        self.review = Some(review);
        self
    }

    /// Sets the simulated sample.
    #[must_use]
    pub fn dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// Sets the adjusted sample.
    #[must_use]
    pub fn adjusted(mut self, adjusted: AdjustedDataset) -> Self {
        self.adjusted = Some(adjusted);
        self
    }

    /// Builds report; fails if a part is missing.
    pub fn build(self) -> Result<SimulationReport> {
        let id = self.request.scenario_id.clone();
        let missing = |part: &str| anyhow!("report for `{id}` is missing its {part}");
        let kind = self.kind.ok_or_else(|| missing("scenario kind"))?;
        let (unconditional, conditional) = self.fits.ok_or_else(|| missing("regressions"))?;
        let comparison = self.comparison.ok_or_else(|| missing("comparison"))?;
        let review = self.review.ok_or_else(|| missing("review"))?;
        let dataset = self.dataset.ok_or_else(|| missing("dataset"))?;
        let adjusted = self.adjusted.ok_or_else(|| missing("adjusted dataset"))?;
        Ok(SimulationReport {
            true_beta: dataset.true_beta(),
            request: self.request,
            kind,
            unconditional,
            conditional,
            comparison,
            review,
            dataset,
            adjusted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::ScenarioCatalog,
        compare::compare,
        estimation::{adjust, multi_reg, simple_reg},
        methods::Conditioning,
    };

    fn parts(request: &SimulationRequest) -> SimulationReportBuilder {
        let catalog = ScenarioCatalog::builtin().unwrap();
        let scenario = catalog.get(&request.scenario_id).unwrap();
        let dataset = scenario.generate(request.n, request.seed, 0.0);
        let unconditional = simple_reg(dataset.xs(), dataset.ys());
        let conditional = multi_reg(dataset.xs(), dataset.ms(), dataset.ys());
        SimulationReportBuilder::new(request.clone())
            .kind(scenario.kind())
            .fits(unconditional, conditional)
            .comparison(compare(0.0, &unconditional, &conditional))
            .review(Review {
                unconditional: Verdict::NotSignificant,
                conditional: Verdict::Spurious,
            })
            .adjusted(adjust(&dataset))
            .dataset(dataset)
    }

    #[test]
    fn surfaced_follows_conditioning() {
        let request = SimulationRequest::new("c1").with_n(200);
        let report = parts(&request).build().unwrap();
        assert_eq!(report.surfaced().1, Verdict::NotSignificant);
        assert_eq!(report.surfaced().0, &report.unconditional);

        let conditioned = parts(&request.with_conditioning(Conditioning::OnCollider))
            .build()
            .unwrap();
        assert_eq!(conditioned.surfaced().1, Verdict::Spurious);
        assert_eq!(conditioned.surfaced().0, &conditioned.conditional);
    }

    #[test]
    fn json_omits_data_unless_asked() {
        let report = parts(&SimulationRequest::new("m1").with_n(50)).build().unwrap();
        let summary = report.to_json(false).unwrap();
        assert!(summary.get("dataset").is_none());
        assert_eq!(summary["request"]["scenario_id"], "m1");
        assert_eq!(summary["kind"], "mbias");
        let full = report.to_json(true).unwrap();
        assert_eq!(full["dataset"]["x"].as_array().unwrap().len(), 50);
    }

    #[test]
    fn incomplete_builder_fails() {
        let error = SimulationReportBuilder::new(SimulationRequest::new("c2"))
            .build()
            .unwrap_err();
        assert!(error.to_string().contains("c2"));
    }
}
