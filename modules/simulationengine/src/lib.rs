#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]
#![allow(clippy::cast_precision_loss, clippy::suboptimal_flops)]

//! Collider Simulation Engine – draws seeded samples from collider and M-bias DAGs, fits OLS with and without the collider, and reviews the bias.

/// Seeded uniform and normal generators.
#[path = "../rng.rs"]
pub mod rng;

/// Scenario catalog and its validation.
#[path = "../catalog.rs"]
pub mod catalog;

/// Structural-equation sampling.
#[path = "../data_generator.rs"]
pub mod data_generator;

/// Effect and conditioning modes.
#[path = "../methods.rs"]
pub mod methods;

/// Run parameters and input validation.
#[path = "../request.rs"]
pub mod request;

/// OLS fits and collider adjustment.
#[path = "../estimation/main.rs"]
pub mod estimation;

/// Bias of each estimate against the true effect.
#[path = "../compare.rs"]
pub mod compare;

/// Significance verdicts.
#[path = "../reviewer.rs"]
pub mod reviewer;

/// Per-run report.
#[path = "../report.rs"]
pub mod report;

/// Simulator orchestration.
#[path = "../simulator.rs"]
pub mod simulator;

/// Telemetry for simulation engine.
#[path = "../helper.rs"]
pub mod helper;

/// Lab configuration file.
#[path = "../config.rs"]
pub mod config;

/// Runtime entry point.
#[path = "../main.rs"]
pub mod runtime;

pub use catalog::{Scenario, ScenarioCatalog, ScenarioKind};
pub use config::LabConfig;
pub use data_generator::Dataset;
pub use estimation::{AdjustedDataset, RegressionResult};
pub use helper::{SimulationTelemetry, SimulationTelemetryBuilder};
pub use methods::{Conditioning, EffectMode};
pub use report::SimulationReport;
pub use request::{EngineError, SimulationRequest};
pub use reviewer::Verdict;
pub use runtime::{SimulationEngine, SimulationEngineBuilder};
