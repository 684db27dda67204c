use anyhow::Result;
use serde_json::json;

use crate::{
    catalog::{Scenario, ScenarioCatalog},
    config::LabConfig,
    helper::SimulationTelemetry,
    report::SimulationReport,
    request::{EngineError, SimulationRequest},
    reviewer::SimulationReviewer,
    simulator::Simulator,
};

/// Entry point: resolves scenarios, validates requests and runs the simulator.
#[derive(Debug)]
pub struct SimulationEngine {
    telemetry: Option<SimulationTelemetry>,
    catalog: ScenarioCatalog,
    simulator: Simulator,
}

impl SimulationEngine {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> SimulationEngineBuilder {
        SimulationEngineBuilder::default()
    }

    /// Scenarios the engine can run.
    #[must_use]
    pub const fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    /// Looks up a scenario.
    pub fn scenario(&self, id: &str) -> Result<&Scenario, EngineError> {
        self.catalog
            .get(id)
            .ok_or_else(|| EngineError::UnknownScenario(id.to_owned()))
    }

    /// Runs one request.
    ///
    /// Unknown ids and samples below three observations come back as
    /// [`EngineError`]; anything else (telemetry IO) as a plain error.
    pub fn run(&self, request: &SimulationRequest) -> Result<SimulationReport> {
        let scenario = self.scenario(&request.scenario_id)?;
        request.validate()?;
        self.simulator.run(scenario, request)
    }

    /// Returns telemetry handle.
    #[must_use]
    pub const fn telemetry(&self) -> Option<&SimulationTelemetry> {
        self.telemetry.as_ref()
    }
}

/// Builder for `SimulationEngine`.
#[derive(Default)]
pub struct SimulationEngineBuilder {
    telemetry: Option<SimulationTelemetry>,
    catalog: Option<ScenarioCatalog>,
    critical_t: Option<f64>,
}

impl SimulationEngineBuilder {
    /// Sets telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: SimulationTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Replaces the built-in catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: ScenarioCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the critical `|t|` used by the reviewer.
    #[must_use]
    pub const fn critical_t(mut self, critical_t: f64) -> Self {
        self.critical_t = Some(critical_t);
        self
    }

    /// Applies the catalog path and review settings of a lab config.
    pub fn config(mut self, config: &LabConfig) -> Result<Self> {
        if let Some(path) = &config.catalog {
            self.catalog = Some(ScenarioCatalog::load(path)?);
        }
        self.critical_t = Some(config.review.critical_t);
        Ok(self)
    }

    /// Builds the engine.
    pub fn build(self) -> Result<SimulationEngine> {
        let telemetry = self.telemetry;
        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => ScenarioCatalog::builtin()?,
        };
        let mut reviewer = SimulationReviewer::new(telemetry.clone());
        if let Some(critical_t) = self.critical_t {
            reviewer = reviewer.with_critical_t(critical_t);
        }
        if let Some(tel) = &telemetry {
            for rejected in catalog.rejected() {
                tel.warn(
                    "catalog.entry_rejected",
                    json!({ "scenario": rejected.scenario(), "reason": rejected.to_string() }),
                )?;
            }
            tel.event(
                "catalog.loaded",
                json!({ "scenarios": catalog.len(), "rejected": catalog.rejected().len() }),
            )?;
        }
        let simulator = Simulator::new(reviewer, telemetry.clone());
        Ok(SimulationEngine {
            telemetry,
            catalog,
            simulator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::ScenarioKind,
        methods::{Conditioning, EffectMode},
        request::MIN_SAMPLE_SIZE,
        reviewer::Verdict,
    };
    use tempfile::tempdir;

    fn engine() -> SimulationEngine {
        SimulationEngine::builder().build().unwrap()
    }

    #[test]
    fn engine_runs_builtin_scenarios() {
        let engine = engine();
        assert_eq!(engine.catalog().len(), 13);
        for scenario in engine.catalog().iter() {
            let report = engine
                .run(&SimulationRequest::new(scenario.id.clone()).with_n(200))
                .unwrap();
            assert_eq!(report.dataset.len(), 200);
            assert_eq!(report.scenario_id(), scenario.id);
        }
    }

    #[test]
    fn unknown_scenario_is_rejected() {
        let error = engine().run(&SimulationRequest::new("c99")).unwrap_err();
        assert_eq!(
            error.downcast_ref::<EngineError>(),
            Some(&EngineError::UnknownScenario("c99".into()))
        );
    }

    #[test]
    fn undersized_request_is_rejected_not_clamped() {
        let error = engine()
            .run(&SimulationRequest::new("c1").with_n(2))
            .unwrap_err();
        assert_eq!(
            error.downcast_ref::<EngineError>(),
            Some(&EngineError::SampleTooSmall {
                requested: 2,
                minimum: MIN_SAMPLE_SIZE
            })
        );
        let report = engine()
            .run(&SimulationRequest::new("c1").with_n(MIN_SAMPLE_SIZE))
            .unwrap();
        assert_eq!(report.review.conditional, Verdict::NoEstimate);
        assert!(report.unconditional.estimable);
    }

    #[test]
    fn mbias_null_case_turns_spurious_when_conditioned() {
        let engine = engine();
        let ids: Vec<String> = engine
            .catalog()
            .of_kind(ScenarioKind::MBias)
            .map(|scenario| scenario.id.clone())
            .collect();
        assert_eq!(ids.len(), 10);
        for id in ids {
            let request = SimulationRequest::new(id.clone())
                .with_n(100_000)
                .with_seed(42)
                .with_conditioning(Conditioning::OnCollider);
            let report = engine.run(&request).unwrap();
            assert!(report.unconditional.slope.abs() < 0.05, "{id}");
            assert_eq!(report.review.conditional, Verdict::Spurious, "{id}");
        }
    }

    #[test]
    fn literature_effects_converge_unconditionally() {
        let engine = engine();
        for id in ["c1", "m1", "m7"] {
            let request = SimulationRequest::new(id)
                .with_n(100_000)
                .with_seed(11)
                .with_effect(EffectMode::Literature);
            let report = engine.run(&request).unwrap();
            let beta = engine.scenario(id).unwrap().literature_beta;
            assert!((report.unconditional.slope - beta).abs() < 0.02, "{id}");
            let unconditional_bias = report.comparison.unconditional_bias.unwrap().abs();
            let conditional_bias = report.comparison.conditional_bias.unwrap().abs();
            assert!(conditional_bias > unconditional_bias + 0.1, "{id}");
            assert!(report.comparison.conditioning_hurts(), "{id}");
            assert_eq!(report.review.conditional, Verdict::Biased, "{id}");
        }
    }

    #[test]
    fn equal_requests_give_equal_reports() {
        let engine = engine();
        let request = SimulationRequest::new("c3").with_n(1_000).with_seed(5);
        assert_eq!(engine.run(&request).unwrap(), engine.run(&request).unwrap());
    }

    #[test]
    fn builder_logs_catalog_and_honours_overrides() {
        let tmp = tempdir().unwrap();
        let catalog_path = tmp.path().join("catalog.toml");
        std::fs::write(
            &catalog_path,
            r#"
[[scenario]]
id = "solo"
kind = "collider"
title = "Solo"
subtitle = "One entry"
x = "X"
y = "Y"
m = "M"
literature_beta = 0.1
paths_cite = "none"
effect_cite = "none"
story = "A single collider."
paths = { xc = 0.5, yc = 0.5 }

[[scenario]]
id = "broken"
kind = "mbias"
title = "Broken"
subtitle = "Missing a path"
x = "X"
y = "Y"
m = "M"
literature_beta = 0.1
paths_cite = "none"
effect_cite = "none"
story = "Lacks u2m."
paths = { u1x = 0.5, u1m = 0.5, u2y = 0.5 }
"#,
        )
        .unwrap();
        let config_path = tmp.path().join("lab.toml");
        std::fs::write(&config_path, "catalog = \"catalog.toml\"\n[review]\ncritical_t = 50.0\n")
            .unwrap();
        let config = LabConfig::load(&config_path).unwrap();

        let log_path = tmp.path().join("engine.log");
        let telemetry = SimulationTelemetry::builder("simulation-engine")
            .log_path(&log_path)
            .build()
            .unwrap();
        let engine = SimulationEngine::builder()
            .telemetry(telemetry)
            .config(&config)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(engine.catalog().len(), 1);
        assert!(engine.scenario("broken").is_err());
        assert!(engine.telemetry().is_some());

        let report = engine
            .run(
                &SimulationRequest::new("solo")
                    .with_n(5_000)
                    .with_conditioning(Conditioning::OnCollider),
            )
            .unwrap();
        assert_eq!(report.review.conditional, Verdict::NotSignificant);

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("catalog.entry_rejected"));
        assert!(log.contains("catalog.loaded"));
        assert!(log.contains("simulation.run.completed"));
    }
}
