use serde::{Deserialize, Serialize};

/// Which X -> Y effect the outcome is simulated with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMode {
    /// No causal effect; isolates the bias.
    #[default]
    Null,
    /// The scenario's literature effect size.
    Literature,
}

impl EffectMode {
    /// Label for logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Literature => "literature",
        }
    }

    /// Maps the "realistic effect" toggle.
    #[must_use]
    pub const fn from_realistic(realistic: bool) -> Self {
        if realistic {
            Self::Literature
        } else {
            Self::Null
        }
    }
}

/// Which regression is surfaced to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conditioning {
    /// Y on X alone.
    #[default]
    Unconditional,
    /// Y on X and the collider M.
    OnCollider,
}

impl Conditioning {
    /// Label for logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unconditional => "unconditional",
            Self::OnCollider => "on_collider",
        }
    }

    /// Maps the "control for M" toggle.
    #[must_use]
    pub const fn from_toggle(conditioned: bool) -> Self {
        if conditioned {
            Self::OnCollider
        } else {
            Self::Unconditional
        }
    }

    /// Whether the collider enters the regression.
    #[must_use]
    pub const fn is_conditioned(self) -> bool {
        matches!(self, Self::OnCollider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_map_to_modes() {
        assert_eq!(EffectMode::from_realistic(true), EffectMode::Literature);
        assert_eq!(EffectMode::from_realistic(false), EffectMode::Null);
        assert!(Conditioning::from_toggle(true).is_conditioned());
        assert!(!Conditioning::default().is_conditioned());
        assert_eq!(
            serde_json::to_string(&Conditioning::OnCollider).unwrap(),
            "\"on_collider\""
        );
    }
}
