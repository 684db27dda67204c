use anyhow::Result;
use serde_json::json;
use shared_logging::LogLevel;
use uuid::Uuid;

use crate::{
    catalog::Scenario,
    compare::compare,
    estimation::{adjust_with, multi_reg, simple_reg},
    helper::SimulationTelemetry,
    report::{SimulationReport, SimulationReportBuilder},
    request::SimulationRequest,
    reviewer::SimulationReviewer,
};

/// Simulator chains generation, both regressions, adjustment and review.
#[derive(Debug, Clone)]
pub struct Simulator {
    reviewer: SimulationReviewer,
    telemetry: Option<SimulationTelemetry>,
}

impl Simulator {
    /// Creates a simulator.
    #[must_use]
    pub const fn new(reviewer: SimulationReviewer, telemetry: Option<SimulationTelemetry>) -> Self {
        Self {
            reviewer,
            telemetry,
        }
    }

    /// Runs `request` against `scenario`.
    ///
    /// The request is not validated here; callers go through the engine.
    pub fn run(&self, scenario: &Scenario, request: &SimulationRequest) -> Result<SimulationReport> {
        let run_id = Uuid::new_v4();
        let true_beta = scenario.true_beta(request.effect);
        if let Some(tel) = &self.telemetry {
            tel.log(
                LogLevel::Debug,
                "simulation.run.start",
                json!({
                    "run_id": run_id,
                    "scenario": scenario.id,
                    "n": request.n,
                    "seed": request.seed,
                    "effect": request.effect.label(),
                    "conditioning": request.conditioning.label(),
                }),
            )?;
        }

        let dataset = scenario.generate(request.n, request.seed, true_beta);
        let unconditional = simple_reg(dataset.xs(), dataset.ys());
        let conditional = multi_reg(dataset.xs(), dataset.ms(), dataset.ys());
        let adjusted = adjust_with(&dataset, &conditional);
        let comparison = compare(true_beta, &unconditional, &conditional);
        let review = self.reviewer.review(true_beta, &unconditional, &conditional)?;

        if let Some(tel) = &self.telemetry {
            tel.event(
                "simulation.run.completed",
                json!({
                    "run_id": run_id,
                    "scenario": scenario.id,
                    "true_beta": true_beta,
                    "unconditional_slope": unconditional.slope,
                    "conditional_slope": conditional.slope,
                    "estimable": unconditional.estimable && conditional.estimable,
                }),
            )?;
        }

        SimulationReportBuilder::new(request.clone())
            .kind(scenario.kind())
            .fits(unconditional, conditional)
            .comparison(comparison)
            .review(review)
            .adjusted(adjusted)
            .dataset(dataset)
            .build()
    }
}
