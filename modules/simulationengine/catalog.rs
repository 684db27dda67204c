use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{data_generator, data_generator::Dataset, methods::EffectMode};

/// Catalog compiled into the binary.
pub const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

/// Coefficients of the simple collider DAG (X -> C <- Y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderPaths {
    /// X -> C.
    pub xc: f64,
    /// Y -> C.
    pub yc: f64,
}

/// Coefficients of the M-bias DAG (X <- U1 -> M <- U2 -> Y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MBiasPaths {
    /// U1 -> X.
    pub u1x: f64,
    /// U1 -> M.
    pub u1m: f64,
    /// U2 -> Y.
    pub u2y: f64,
    /// U2 -> M.
    pub u2m: f64,
}

/// Display names for the unobserved causes of an M-bias scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatentLabels {
    /// Candidate interpretations of U1.
    pub u1: Vec<String>,
    /// Candidate interpretations of U2.
    pub u2: Vec<String>,
}

/// Structural family of a scenario together with its path coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CausalStructure {
    /// X and Y both cause the collider C.
    Collider(ColliderPaths),
    /// Unobserved U1 and U2 both cause M; U1 causes X and U2 causes Y.
    MBias {
        /// Path coefficients.
        paths: MBiasPaths,
        /// Display names for U1/U2.
        latents: LatentLabels,
    },
}

/// Discriminant of [`CausalStructure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// Simple collider.
    Collider,
    /// M-bias.
    MBias,
}

impl ScenarioKind {
    /// Label used in catalog files and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Collider => "collider",
            Self::MBias => "mbias",
        }
    }

    /// Path coefficient names a scenario of this kind must declare.
    #[must_use]
    pub const fn required_coefficients(self) -> &'static [&'static str] {
        match self {
            Self::Collider => &["xc", "yc"],
            Self::MBias => &["u1x", "u1m", "u2y", "u2m"],
        }
    }
}

/// Names of the three observed variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableLabels {
    /// Treatment.
    pub x: String,
    /// Outcome.
    pub y: String,
    /// Collider being conditioned on.
    pub m: String,
}

/// Citation strings shown next to the diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citations {
    /// Source for the path coefficients.
    pub paths: String,
    /// Source for the literature effect size.
    pub effect: String,
}

/// One causal model of the catalog. Display text is carried, never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Stable identifier (`c1`, `m4`, ...).
    pub id: String,
    /// Headline.
    pub title: String,
    /// What is being conditioned on.
    pub subtitle: String,
    /// Observed variable names.
    pub labels: VariableLabels,
    /// Structural family and coefficients.
    pub structure: CausalStructure,
    /// X -> Y effect reported in the literature.
    pub literature_beta: f64,
    /// Citation strings.
    pub citations: Citations,
    /// Narrative caption.
    pub story: String,
}

impl Scenario {
    /// Structural family.
    #[must_use]
    pub const fn kind(&self) -> ScenarioKind {
        match self.structure {
            CausalStructure::Collider(_) => ScenarioKind::Collider,
            CausalStructure::MBias { .. } => ScenarioKind::MBias,
        }
    }

    /// The X -> Y effect used to simulate Y under `mode`.
    #[must_use]
    pub const fn true_beta(&self, mode: EffectMode) -> f64 {
        match mode {
            EffectMode::Null => 0.0,
            EffectMode::Literature => self.literature_beta,
        }
    }

    /// Path coefficients in declaration order, for captions and diagrams.
    #[must_use]
    pub fn path_coefficients(&self) -> IndexMap<&'static str, f64> {
        match &self.structure {
            CausalStructure::Collider(paths) => {
                IndexMap::from([("xc", paths.xc), ("yc", paths.yc)])
            }
            CausalStructure::MBias { paths, .. } => IndexMap::from([
                ("u1x", paths.u1x),
                ("u1m", paths.u1m),
                ("u2y", paths.u2y),
                ("u2m", paths.u2m),
            ]),
        }
    }

    /// Simulates `n` observations from this scenario's structural equations.
    #[must_use]
    pub fn generate(&self, n: usize, seed: u32, true_beta: f64) -> Dataset {
        data_generator::generate(self, n, seed, true_beta)
    }
}

/// Problems that exclude a single catalog entry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    /// A required path coefficient (or the literature effect) is absent.
    #[error("scenario `{scenario}` is missing coefficient `{coefficient}`")]
    MissingCoefficient {
        /// Offending scenario.
        scenario: String,
        /// Name of the absent coefficient.
        coefficient: &'static str,
    },
    /// A path coefficient lies outside [-1, 1].
    #[error("scenario `{scenario}`: coefficient `{coefficient}` = {value} lies outside [-1, 1]")]
    CoefficientOutOfRange {
        /// Offending scenario.
        scenario: String,
        /// Coefficient name.
        coefficient: &'static str,
        /// Declared value.
        value: f64,
    },
    /// `kind` is neither `collider` nor `mbias`.
    #[error("scenario `{scenario}` has unknown kind `{kind}`")]
    UnknownKind {
        /// Offending scenario.
        scenario: String,
        /// Declared kind.
        kind: String,
    },
    /// Two entries share an id; the later one is dropped.
    #[error("scenario id `{0}` is declared more than once")]
    DuplicateId(String),
}

impl CatalogError {
    /// Id of the rejected entry.
    #[must_use]
    pub fn scenario(&self) -> &str {
        match self {
            Self::MissingCoefficient { scenario, .. }
            | Self::CoefficientOutOfRange { scenario, .. }
            | Self::UnknownKind { scenario, .. }
            | Self::DuplicateId(scenario) => scenario,
        }
    }
}

/// Immutable, ordered set of validated scenarios.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: IndexMap<String, Scenario>,
    rejected: Vec<CatalogError>,
}

impl ScenarioCatalog {
    /// Parses the catalog embedded at build time.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG).context("parsing built-in scenario catalog")
    }

    /// Loads a catalog from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading scenario catalog {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses and validates a catalog document.
    ///
    /// Malformed TOML fails the whole load; entries that are well-formed but
    /// invalid are dropped and reported through [`Self::rejected`].
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let document: CatalogDocument = toml::from_str(raw)?;
        let mut scenarios = IndexMap::new();
        let mut rejected = Vec::new();
        for entry in document.scenarios {
            if scenarios.contains_key(&entry.id) {
                rejected.push(CatalogError::DuplicateId(entry.id));
                continue;
            }
            match entry.validate() {
                Ok(scenario) => {
                    scenarios.insert(scenario.id.clone(), scenario);
                }
                Err(err) => rejected.push(err),
            }
        }
        Ok(Self {
            scenarios,
            rejected,
        })
    }

    /// Looks up a scenario by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.get(id)
    }

    /// Scenarios in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values()
    }

    /// Scenarios of one structural family, in catalog order.
    pub fn of_kind(&self, kind: ScenarioKind) -> impl Iterator<Item = &Scenario> {
        self.iter().filter(move |scenario| scenario.kind() == kind)
    }

    /// Number of accepted scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether no scenario survived validation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Entries excluded during validation.
    #[must_use]
    pub fn rejected(&self) -> &[CatalogError] {
        &self.rejected
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default, rename = "scenario")]
    scenarios: Vec<RawScenario>,
}

#[derive(Debug, Deserialize)]
struct RawScenario {
    id: String,
    kind: String,
    title: String,
    #[serde(default)]
    subtitle: String,
    x: String,
    y: String,
    m: String,
    #[serde(default)]
    u1_labels: Vec<String>,
    #[serde(default)]
    u2_labels: Vec<String>,
    #[serde(default)]
    paths: BTreeMap<String, f64>,
    literature_beta: Option<f64>,
    #[serde(default)]
    paths_cite: String,
    #[serde(default)]
    effect_cite: String,
    #[serde(default)]
    story: String,
}

impl RawScenario {
    fn validate(self) -> Result<Scenario, CatalogError> {
        let kind = match self.kind.as_str() {
            "collider" => ScenarioKind::Collider,
            "mbias" | "m_bias" => ScenarioKind::MBias,
            other => {
                return Err(CatalogError::UnknownKind {
                    scenario: self.id,
                    kind: other.to_string(),
                })
            }
        };
        let literature_beta =
            self.literature_beta
                .ok_or_else(|| CatalogError::MissingCoefficient {
                    scenario: self.id.clone(),
                    coefficient: "literature_beta",
                })?;
        let mut coefficients = [0.0; 4];
        for (slot, name) in coefficients
            .iter_mut()
            .zip(kind.required_coefficients().iter().copied())
        {
            *slot = self.coefficient(name)?;
        }
        let structure = match kind {
            ScenarioKind::Collider => CausalStructure::Collider(ColliderPaths {
                xc: coefficients[0],
                yc: coefficients[1],
            }),
            ScenarioKind::MBias => CausalStructure::MBias {
                paths: MBiasPaths {
                    u1x: coefficients[0],
                    u1m: coefficients[1],
                    u2y: coefficients[2],
                    u2m: coefficients[3],
                },
                latents: LatentLabels {
                    u1: self.u1_labels,
                    u2: self.u2_labels,
                },
            },
        };
        Ok(Scenario {
            id: self.id,
            title: self.title,
            subtitle: self.subtitle,
            labels: VariableLabels {
                x: self.x,
                y: self.y,
                m: self.m,
            },
            structure,
            literature_beta,
            citations: Citations {
                paths: self.paths_cite,
                effect: self.effect_cite,
            },
            story: self.story,
        })
    }

    fn coefficient(&self, name: &'static str) -> Result<f64, CatalogError> {
        let value = *self
            .paths
            .get(name)
            .ok_or_else(|| CatalogError::MissingCoefficient {
                scenario: self.id.clone(),
                coefficient: name,
            })?;
        if !(-1.0..=1.0).contains(&value) {
            return Err(CatalogError::CoefficientOutOfRange {
                scenario: self.id.clone(),
                coefficient: name,
                value,
            });
        }
        Ok(value)
    }
}
