use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::methods::{Conditioning, EffectMode};

/// Smallest sample a request may ask for.
pub const MIN_SAMPLE_SIZE: usize = 3;
/// Range covered by the sample-size slider.
pub const SLIDER_MIN_SAMPLE: usize = 10;
/// Upper end of the sample-size slider.
pub const SLIDER_MAX_SAMPLE: usize = 100_000;
/// Decades spanned by the slider (10^0 .. 10^5).
const SLIDER_DECADES: f64 = 5.0;

/// Errors returned to the caller instead of a report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The scenario id does not match a catalog entry.
    #[error("unknown scenario `{0}`")]
    UnknownScenario(String),
    /// `n` leaves no residual degree of freedom; requests are rejected, never clamped.
    #[error("sample size {requested} is below the minimum of {minimum}")]
    SampleTooSmall {
        /// Size that was asked for.
        requested: usize,
        /// Smallest accepted size.
        minimum: usize,
    },
}

/// Everything the engine needs for one run, passed explicitly on every call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Catalog id.
    pub scenario_id: String,
    /// Sample size.
    pub n: usize,
    /// Generator seed.
    pub seed: u32,
    /// Null or literature effect.
    pub effect: EffectMode,
    /// Which regression is surfaced.
    pub conditioning: Conditioning,
}

impl SimulationRequest {
    /// Request with the demo defaults (`n = 1000`, seed 42, null effect, unconditioned).
    #[must_use]
    pub fn new(scenario_id: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            n: 1_000,
            seed: 42,
            effect: EffectMode::Null,
            conditioning: Conditioning::Unconditional,
        }
    }

    /// Sets the sample size.
    #[must_use]
    pub const fn with_n(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the effect mode.
    #[must_use]
    pub const fn with_effect(mut self, effect: EffectMode) -> Self {
        self.effect = effect;
        self
    }

    /// Sets the surfaced regression.
    #[must_use]
    pub const fn with_conditioning(mut self, conditioning: Conditioning) -> Self {
        self.conditioning = conditioning;
        self
    }

    /// Rejects requests the regressions cannot estimate.
    pub const fn validate(&self) -> Result<(), EngineError> {
        if self.n < MIN_SAMPLE_SIZE {
            return Err(EngineError::SampleTooSmall {
                requested: self.n,
                minimum: MIN_SAMPLE_SIZE,
            });
        }
        Ok(())
    }

    /// Same request with the next seed, i.e. a fresh draw.
    #[must_use]
    pub fn resampled(&self) -> Self {
        Self {
            seed: self.seed.wrapping_add(1),
            ..self.clone()
        }
    }
}

/// Maps a slider position in [0, 100] onto a log-scale sample size.
///
/// The raw value `10^(5·p/100)` is rounded to steps of 10 below 100, 50 below
/// 1 000, 500 below 10 000 and 5 000 above, then clamped to [10, 100 000].
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn snap_sample_size(position: f64) -> usize {
    let position = if position.is_nan() { 0.0 } else { position.clamp(0.0, 100.0) };
    let raw = 10f64.powf(position / 100.0 * SLIDER_DECADES);
    let step = if raw < 100.0 {
        10.0
    } else if raw < 1_000.0 {
        50.0
    } else if raw < 10_000.0 {
        500.0
    } else {
        5_000.0
    };
    let snapped = (raw / step).round() * step;
    (snapped as usize).clamp(SLIDER_MIN_SAMPLE, SLIDER_MAX_SAMPLE)
}

/// Slider position that displays `n`; inverse of [`snap_sample_size`] up to rounding.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn slider_position(n: usize) -> f64 {
    let n = n.clamp(SLIDER_MIN_SAMPLE, SLIDER_MAX_SAMPLE) as f64;
    (n.log10() / SLIDER_DECADES * 100.0).round()
}
