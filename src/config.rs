//! Tunable matching policy.

use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, Result};

pub const CLASS_WEIGHT_ENV: &str = "RPA_CLASS_WEIGHT";
pub const TEXT_WEIGHT_ENV: &str = "RPA_TEXT_WEIGHT";
pub const PARENT_TAG_WEIGHT_ENV: &str = "RPA_PARENT_TAG_WEIGHT";
pub const THRESHOLD_ENV: &str = "RPA_MATCH_THRESHOLD";

/// Weights used to score a candidate against the reference target.
///
/// A candidate is accepted only when its score is strictly greater than
/// `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Per shared class.
    pub class_overlap: u32,
    /// Identical text content.
    pub text_match: u32,
    /// Parents share a tag name.
    pub parent_tag: u32,
    pub threshold: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            class_overlap: 7,
            text_match: 10,
            parent_tag: 5,
            threshold: 7,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub weights: ScoringWeights,
}

impl RecorderConfig {
    /// Build the config from `RPA_*` environment variables, falling back to
    /// the defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RecorderConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ScoringWeights::default();
        let read = |key: &str, fallback: u32| -> Result<u32> {
            match lookup(key) {
                None => Ok(fallback),
                Some(raw) => raw.trim().parse().map_err(|_| RecorderError::InvalidConfig {
                    field: key.to_string(),
                    reason: format!("expected a non-negative integer, got '{}'", raw),
                }),
            }
        };

        let config = Self {
            weights: ScoringWeights {
                class_overlap: read(CLASS_WEIGHT_ENV, defaults.class_overlap)?,
                text_match: read(TEXT_WEIGHT_ENV, defaults.text_match)?,
                parent_tag: read(PARENT_TAG_WEIGHT_ENV, defaults.parent_tag)?,
                threshold: read(THRESHOLD_ENV, defaults.threshold)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        if w.class_overlap == 0 && w.text_match == 0 && w.parent_tag == 0 {
            return Err(RecorderError::InvalidConfig {
                field: "weights".to_string(),
                reason: "at least one scoring weight must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
