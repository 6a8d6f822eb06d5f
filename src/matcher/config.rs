//! TOML configuration for the matcher.
//!
//! Provides two loading methods:
//! - `default_config()` - Loads the embedded configuration compiled into the binary
//! - `load_config(path)` - Loads a custom configuration from a file path

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::MappingError;

/// Default configuration embedded in the binary at compile time.
/// Loaded from `config/matching.toml`.
const DEFAULT_CONFIG: &str = include_str!("../../config/matching.toml");

/// Root configuration loaded from matching.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    pub thresholds: Thresholds,
    pub weights: Weights,
    #[serde(default)]
    pub names: NameRules,
    #[serde(default)]
    pub synonyms: Vec<SynonymGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    /// Minimum score for a source bone to be kept as a slot candidate
    pub similarity: f32,
    /// Confidence at which an entry is mirrored to the opposite side
    pub lock: f32,
    /// Fraction of the parent's confidence given to structural matches
    pub hierarchical_discount: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Weights {
    pub synonym: f32,
    pub jaccard: f32,
    pub edit_distance: f32,
    /// Multiplier applied when exactly one name is sided
    pub unilateral_penalty: f32,
}

/// Name-cleaning rules applied before tokenizing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameRules {
    #[serde(default)]
    pub strip_namespace: bool,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub suffixes: Vec<String>,
}

/// Compact names that refer to the same bone.
#[derive(Debug, Clone, Deserialize)]
pub struct SynonymGroup {
    pub group: Vec<String>,
}

impl MatchConfig {
    /// Reject values outside their meaningful ranges.
    pub fn validate(&self) -> Result<(), MappingError> {
        let unit = [
            ("thresholds.similarity", self.thresholds.similarity),
            ("thresholds.lock", self.thresholds.lock),
            (
                "thresholds.hierarchical_discount",
                self.thresholds.hierarchical_discount,
            ),
            ("weights.synonym", self.weights.synonym),
            ("weights.unilateral_penalty", self.weights.unilateral_penalty),
        ];
        for (key, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(MappingError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    key, value
                )));
            }
        }

        if self.weights.jaccard < 0.0 || self.weights.edit_distance < 0.0 {
            return Err(MappingError::Config(
                "weights.jaccard and weights.edit_distance must not be negative".to_string(),
            ));
        }
        if self.weights.jaccard + self.weights.edit_distance <= 0.0 {
            return Err(MappingError::Config(
                "weights.jaccard and weights.edit_distance cannot both be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Jaccard and edit-distance weights scaled to sum to 1.
    pub fn blend_weights(&self) -> (f32, f32) {
        let total = self.weights.jaccard + self.weights.edit_distance;
        (
            self.weights.jaccard / total,
            self.weights.edit_distance / total,
        )
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        default_config()
    }
}

/// Load matching configuration from a TOML file at the given path.
///
/// # Example
/// ```ignore
/// let config = load_config(Path::new("/path/to/matching.toml"))?;
/// ```
pub fn load_config(path: &Path) -> Result<MatchConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: MatchConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Get the default configuration embedded in the binary.
///
/// # Panics
/// Panics if the embedded TOML is invalid (this would be a compile-time bug).
pub fn default_config() -> MatchConfig {
    toml::from_str(DEFAULT_CONFIG).expect("embedded matching.toml must be valid TOML")
}

/// Shared, parse-once copy of the embedded configuration.
pub(crate) fn shared_default() -> &'static MatchConfig {
    static DEFAULT: OnceLock<MatchConfig> = OnceLock::new();
    DEFAULT.get_or_init(default_config)
}
