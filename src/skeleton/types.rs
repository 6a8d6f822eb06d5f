use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::MappingError;

use super::index::BoneIndex;

/// A named node in a skeleton hierarchy.
///
/// `name` is the identity key and is compared verbatim: case and leading
/// whitespace are significant. `parent_name` is a lookup-only back reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    #[serde(default, rename = "parent", skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            parent_name: parent.map(str::to_string),
        }
    }

    /// Parent name, treating an empty string the same as no parent.
    pub fn parent(&self) -> Option<&str> {
        self.parent_name.as_deref().filter(|p| !p.is_empty())
    }
}

/// Serialized form of a source skeleton as exported by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SkeletonFile {
    #[serde(default)]
    name: Option<String>,
    bones: Vec<Bone>,
}

/// An ordered, immutable source skeleton.
#[derive(Debug, Clone)]
pub struct Skeleton {
    name: Option<String>,
    index: BoneIndex,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Result<Self, MappingError> {
        Ok(Self {
            name: None,
            index: BoneIndex::build(bones)?,
        })
    }

    /// Build from `(name, parent_name)` pairs, the shape the host scene
    /// graph hands over.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, parent)| Bone::new(name, parent))
                .collect(),
        )
    }

    /// Parse a skeleton from JSON: `{"name": "...", "bones": [{"name", "parent"}]}`.
    pub fn from_json(json: &str) -> Result<Self, MappingError> {
        let file: SkeletonFile = serde_json::from_str(json)?;
        let mut skeleton = Self::new(file.bones)?;
        skeleton.name = file.name;
        Ok(skeleton)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn index(&self) -> &BoneIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// A copy of this skeleton without the named bone. Children of the
    /// removed bone are re-parented to its parent.
    pub fn without_bone(&self, name: &str) -> Result<Self, MappingError> {
        let removed_parent = self
            .index
            .get(name)
            .ok_or_else(|| MappingError::NotFound(name.to_string()))?
            .parent()
            .map(str::to_string);

        let bones = self
            .index
            .bones()
            .iter()
            .filter(|b| b.name != name)
            .map(|b| {
                if b.parent() == Some(name) {
                    Bone {
                        name: b.name.clone(),
                        parent_name: removed_parent.clone(),
                    }
                } else {
                    b.clone()
                }
            })
            .collect();

        let mut skeleton = Self::new(bones)?;
        skeleton.name = self.name.clone();
        Ok(skeleton)
    }

    pub fn to_json(&self) -> Result<String, MappingError> {
        let file = SkeletonFile {
            name: self.name.clone(),
            bones: self.index.bones().to_vec(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }
}

/// Read a source skeleton from a JSON file on disk.
pub fn load_skeleton(path: &Path) -> Result<Skeleton> {
    let content = std::fs::read_to_string(path)?;
    let skeleton = Skeleton::from_json(&content)?;

    debug!(
        "Read skeleton {:?} with {} bones from {:?}",
        skeleton.name().unwrap_or("<unnamed>"),
        skeleton.len(),
        path
    );

    Ok(skeleton)
}
