use serde::{Deserialize, Serialize};

use crate::{
    catalog::{CausalStructure, Scenario},
    rng::{standard_normal, Mulberry32},
};

/// Lower bound on every residual-noise variance; keeps coefficients near ±1 from
/// producing a degenerate (noise-free) variable.
pub const NOISE_VARIANCE_FLOOR: f64 = 0.05;

/// Standard deviation of the residual noise of a standardized variable whose
/// causes already explain `explained_variance`.
#[must_use]
pub fn residual_scale(explained_variance: f64) -> f64 {
    (1.0 - explained_variance).max(NOISE_VARIANCE_FLOOR).sqrt()
}

/// One simulated unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Treatment.
    pub x: f64,
    /// Outcome.
    pub y: f64,
    /// Collider.
    pub m: f64,
}

/// Simulated sample, stored column-wise and tagged with the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    scenario_id: String,
    seed: u32,
    true_beta: f64,
    x: Vec<f64>,
    y: Vec<f64>,
    m: Vec<f64>,
}

impl Dataset {
    /// Scenario the sample was drawn from.
    #[must_use]
    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    /// Seed of the generator.
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// X -> Y effect used to simulate Y.
    #[must_use]
    pub const fn true_beta(&self) -> f64 {
        self.true_beta
    }

    /// Number of observations (the requested `n`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the sample is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// X column.
    #[must_use]
    pub fn xs(&self) -> &[f64] {
        &self.x
    }

    /// Y column.
    #[must_use]
    pub fn ys(&self) -> &[f64] {
        &self.y
    }

    /// M column.
    #[must_use]
    pub fn ms(&self) -> &[f64] {
        &self.m
    }

    /// Observation at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Observation> {
        Some(Observation {
            x: *self.x.get(index)?,
            y: *self.y.get(index)?,
            m: *self.m.get(index)?,
        })
    }

    /// Observations in generation order.
    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.m)
            .map(|((&x, &y), &m)| Observation { x, y, m })
    }
}

/// Evaluates the structural equations of `scenario` for `n` independent units.
///
/// One generator is seeded from `seed` per call. Normals are drawn per unit in
/// a fixed order: collider → X, Y noise, C noise; M-bias → U1, U2, X noise,
/// Y noise, M noise. Identical arguments give a bit-identical dataset.
#[must_use]
pub fn generate(scenario: &Scenario, n: usize, seed: u32, true_beta: f64) -> Dataset {
    let mut rng = Mulberry32::new(seed);
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut m = Vec::with_capacity(n);

    match &scenario.structure {
        CausalStructure::Collider(paths) => {
            let c_scale = residual_scale(paths.xc * paths.xc + paths.yc * paths.yc);
            for _ in 0..n {
                let xi = standard_normal(&mut rng);
                let yi = true_beta * xi + standard_normal(&mut rng);
                let ci = paths.xc * xi + paths.yc * yi + c_scale * standard_normal(&mut rng);
                x.push(xi);
                y.push(yi);
                m.push(ci);
            }
        }
        CausalStructure::MBias { paths, .. } => {
            let x_scale = residual_scale(paths.u1x * paths.u1x);
            let y_scale = residual_scale(paths.u2y * paths.u2y);
            let m_scale = residual_scale(paths.u1m * paths.u1m + paths.u2m * paths.u2m);
            for _ in 0..n {
                let u1 = standard_normal(&mut rng);
                let u2 = standard_normal(&mut rng);
                let xi = paths.u1x * u1 + x_scale * standard_normal(&mut rng);
                let yi = true_beta * xi + paths.u2y * u2 + y_scale * standard_normal(&mut rng);
                let mi = paths.u1m * u1 + paths.u2m * u2 + m_scale * standard_normal(&mut rng);
                x.push(xi);
                y.push(yi);
                m.push(mi);
            }
        }
    }

    Dataset {
        scenario_id: scenario.id.clone(),
        seed,
        true_beta,
        x,
        y,
        m,
    }
}
