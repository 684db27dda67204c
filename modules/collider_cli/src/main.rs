use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use collider_simulationengine::{
    catalog::ScenarioKind,
    helper::random_seed,
    request::snap_sample_size,
    Conditioning, EffectMode, LabConfig, RegressionResult, Scenario, ScenarioCatalog,
    SimulationEngine, SimulationReport, SimulationRequest, SimulationTelemetry,
};
use serde_json::json;
use shared_logging::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "colliders",
    version,
    about = "Simulate collider and M-bias scenarios and watch conditioning bias the estimate"
)]
struct Cli {
    /// Lab configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Scenario catalog replacing the built-in one.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// Append JSON-lines logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Minimum log level (debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lists catalog scenarios grouped by structure.
    List,
    /// Prints one scenario as JSON.
    Show {
        /// Scenario id.
        id: String,
    },
    /// Simulates a scenario and prints both regressions.
    Run(RunArgs),
}

#[derive(Parser, Debug, Default)]
struct RunArgs {
    /// Scenario id.
    #[arg(long)]
    scenario: Option<String>,
    /// Sample size.
    #[arg(long, conflicts_with = "slider")]
    n: Option<usize>,
    /// Sample size as a 0-100 position on the log-scale slider.
    #[arg(long)]
    slider: Option<f64>,
    /// Generator seed.
    #[arg(long, conflicts_with = "random_seed")]
    seed: Option<u32>,
    /// Draw a fresh seed.
    #[arg(long)]
    random_seed: bool,
    /// Simulate with the literature effect instead of a null effect.
    #[arg(long)]
    literature: bool,
    /// Surface the regression that conditions on the collider.
    #[arg(long)]
    conditioned: bool,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
    /// Include the simulated sample in the JSON report.
    #[arg(long, requires = "json")]
    with_data: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => LabConfig::load(path)?,
        None => LabConfig::default(),
    };
    let engine = build_engine(&cli, &config)?;
    match cli.command {
        Commands::List => {
            print!("{}", render_catalog(engine.catalog()));
            Ok(())
        }
        Commands::Show { id } => {
            let scenario = engine.scenario(&id)?;
            println!("{}", serde_json::to_string_pretty(scenario)?);
            Ok(())
        }
        Commands::Run(args) => {
            let request = build_request(&args, &config);
            let report = engine
                .run(&request)
                .with_context(|| format!("running scenario `{}`", request.scenario_id))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report.to_json(args.with_data)?)?);
            } else {
                let scenario = engine.scenario(&request.scenario_id)?;
                print!("{}", render_report(scenario, &report));
            }
            if let Some(tel) = engine.telemetry() {
                tel.event(
                    "cli.run.printed",
                    json!({ "scenario": request.scenario_id, "json": args.json }),
                )?;
            }
            Ok(())
        }
    }
}

fn build_engine(cli: &Cli, config: &LabConfig) -> Result<SimulationEngine> {
    let level = cli.log_level.unwrap_or(config.logging.level);
    let mut telemetry = SimulationTelemetry::builder("colliders").min_level(level);
    telemetry = match cli.log_file.as_ref().or(config.logging.path.as_ref()) {
        Some(path) => telemetry.log_path(path),
        None => telemetry.stderr(),
    };
    let mut builder = SimulationEngine::builder()
        .telemetry(telemetry.build().context("opening log sink")?)
        .config(config)?;
    if let Some(path) = &cli.catalog {
        builder = builder.catalog(ScenarioCatalog::load(path)?);
    }
    builder.build()
}

fn build_request(args: &RunArgs, config: &LabConfig) -> SimulationRequest {
    let mut request = config.default_request();
    if let Some(id) = &args.scenario {
        request.scenario_id.clone_from(id);
    }
    if let Some(n) = args.n {
        request.n = n;
    } else if let Some(position) = args.slider {
        request.n = snap_sample_size(position);
    }
    if args.random_seed {
        request.seed = random_seed();
    } else if let Some(seed) = args.seed {
        request.seed = seed;
    }
    if args.literature {
        request.effect = EffectMode::Literature;
    }
    if args.conditioned {
        request.conditioning = Conditioning::OnCollider;
    }
    request
}

fn render_catalog(catalog: &ScenarioCatalog) -> String {
    let mut lines = Vec::new();
    for kind in [ScenarioKind::Collider, ScenarioKind::MBias] {
        lines.push(format!("{}:", kind.label()));
        for scenario in catalog.of_kind(kind) {
            lines.push(format!(
                "  {:<4} {} ({})",
                scenario.id, scenario.title, scenario.subtitle
            ));
        }
    }
    for rejected in catalog.rejected() {
        lines.push(format!("rejected: {rejected}"));
    }
    lines.push(String::new());
    lines.join("\n")
}

fn render_fit(label: &str, fit: &RegressionResult, surfaced: bool, verdict: &str) -> String {
    let marker = if surfaced { "*" } else { " " };
    if fit.estimable {
        format!(
            "{marker} {label:<10} {:>9.4} {:>9.4} {:>8.2}  {verdict}",
            fit.slope,
            fit.standard_error,
            fit.t_statistic()
        )
    } else {
        format!("{marker} {label:<10} {:>9} {:>9} {:>8}  {verdict}", "n/a", "n/a", "n/a")
    }
}

fn render_report(scenario: &Scenario, report: &SimulationReport) -> String {
    let request = &report.request;
    let conditioned = request.conditioning.is_conditioned();
    let paths = scenario
        .path_coefficients()
        .iter()
        .map(|(name, value)| format!("{name}={value:.2}"))
        .collect::<Vec<_>>()
        .join(" ");
    let mut lines = vec![
        format!("{} [{}]: {}", scenario.id, scenario.kind().label(), scenario.title),
        format!("  {}", scenario.subtitle),
        format!(
            "  X = {}, Y = {}, M = {}",
            scenario.labels.x, scenario.labels.y, scenario.labels.m
        ),
        format!("  paths: {paths}"),
        format!(
            "  true beta = {:.3} ({}), n = {}, seed = {}",
            report.true_beta,
            request.effect.label(),
            request.n,
            request.seed
        ),
        String::new(),
        format!("  {:<10} {:>9} {:>9} {:>8}  verdict", "model", "slope", "s.e.", "|t|"),
        render_fit(
            "Y ~ X",
            &report.unconditional,
            !conditioned,
            report.review.unconditional.label(),
        ),
        render_fit(
            "Y ~ X + M",
            &report.conditional,
            conditioned,
            report.review.conditional.label(),
        ),
    ];
    if let Some(slope_on_m) = report
        .conditional
        .slope_on_m
        .filter(|_| report.conditional.estimable)
    {
        lines.push(format!("  coefficient on M: {slope_on_m:.4}"));
    }
    if let Some(displacement) = report.comparison.displacement {
        lines.push(format!("  shift from conditioning on M: {displacement:+.4}"));
    }
    if report.comparison.sign_reversed() {
        lines.push("  conditioning on M reverses the sign of the effect".into());
    }
    let (_, verdict) = report.surfaced();
    if verdict.is_warning() {
        lines.push(format!(
            "  warning: {verdict} after conditioning on {}",
            scenario.labels.m
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}
