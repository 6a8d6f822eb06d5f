//! Fixed target vocabulary loading.
//!
//! Provides two loading methods, mirroring how matching config is loaded:
//! - `TargetVocabulary::builtin()` - the embedded, versioned humanoid rig
//! - `load_vocabulary(path)` - a custom rig description from a TOML file

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use crate::error::MappingError;

use super::index::BoneIndex;
use super::types::Bone;

/// Default target rig embedded in the binary at compile time.
const BUILTIN_VOCABULARY: &str = include_str!("../../config/target_rig.toml");

#[derive(Debug, Clone, Deserialize)]
struct VocabularyFile {
    name: String,
    version: String,
    slots: Vec<SlotDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlotDefinition {
    name: String,
    #[serde(default)]
    parent: Option<String>,
}

/// The fixed, versioned list of target bone slots and their topology.
#[derive(Debug, Clone)]
pub struct TargetVocabulary {
    name: String,
    version: String,
    topology: BoneIndex,
}

impl TargetVocabulary {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        slots: Vec<Bone>,
    ) -> Result<Self, MappingError> {
        let topology = BoneIndex::build(slots)
            .map_err(|e| MappingError::Config(format!("Invalid target vocabulary: {}", e)))?;
        Ok(Self {
            name: name.into(),
            version: version.into(),
            topology,
        })
    }

    /// Parse a vocabulary from its TOML description.
    pub fn from_toml(content: &str) -> Result<Self, MappingError> {
        let file: VocabularyFile = toml::from_str(content)?;
        let slots = file
            .slots
            .into_iter()
            .map(|s| Bone {
                name: s.name,
                parent_name: s.parent,
            })
            .collect();
        Self::new(file.name, file.version, slots)
    }

    /// The embedded humanoid rig.
    ///
    /// # Panics
    /// Panics if the embedded TOML is invalid (this would be a compile-time bug).
    pub fn builtin() -> Self {
        Self::from_toml(BUILTIN_VOCABULARY).expect("embedded target_rig.toml must be valid")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn topology(&self) -> &BoneIndex {
        &self.topology
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.topology.contains(slot)
    }

    pub fn len(&self) -> usize {
        self.topology.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topology.is_empty()
    }

    /// Slot names in vocabulary order.
    pub fn slots(&self) -> impl Iterator<Item = &str> + '_ {
        self.topology.names()
    }
}

/// Load a target vocabulary from a TOML file at the given path.
pub fn load_vocabulary(path: &Path) -> Result<TargetVocabulary> {
    let content = std::fs::read_to_string(path)?;
    let vocabulary = TargetVocabulary::from_toml(&content)?;
    Ok(vocabulary)
}
