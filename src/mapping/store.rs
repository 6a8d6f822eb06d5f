//! Mapping table persistence.
//!
//! The document is a JSON object keyed by target bone, in vocabulary order:
//!
//! ```json
//! {
//!     "Pelvis": {
//!         "source_bone": "mixamorig:Hips",
//!         "enabled": true,
//!         "detection_method": "Automatic",
//!         "confidence": 0.9
//!     }
//! }
//! ```
//!
//! Unknown fields are ignored on load. Writes go through a temp file in the
//! destination directory and an atomic rename.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::info;

use crate::skeleton::TargetVocabulary;

use super::table::MappingTable;
use super::types::{DetectionMethod, MappingEntry};

/// One persisted row; the target bone is the enclosing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEntry {
    #[serde(default)]
    pub source_bone: String,
    #[serde(default)]
    pub enabled: bool,
    pub detection_method: DetectionMethod,
    #[serde(default)]
    pub confidence: f32,
}

impl PersistedEntry {
    fn into_entry(self, target_bone: &str) -> MappingEntry {
        let mut entry = MappingEntry {
            enabled: self.enabled && !self.source_bone.is_empty(),
            source_bone: self.source_bone,
            target_bone: target_bone.to_string(),
            detection_method: self.detection_method,
            confidence: self.confidence,
        };
        entry.pin_confidence();
        entry
    }
}

impl From<&MappingEntry> for PersistedEntry {
    fn from(entry: &MappingEntry) -> Self {
        Self {
            source_bone: entry.source_bone.clone(),
            enabled: entry.enabled,
            detection_method: entry.detection_method,
            confidence: entry.confidence,
        }
    }
}

/// Build the persisted document, one key per target. Where a target has
/// several rows the enabled one is kept.
pub fn to_document(table: &MappingTable, vocabulary: &TargetVocabulary) -> Result<Map<String, Value>> {
    let mut doc = Map::new();
    let mut seen = HashSet::new();
    for entry in table.snapshot(vocabulary) {
        if !seen.insert(entry.target_bone.clone()) {
            continue;
        }
        let row = table.get(&entry.target_bone).unwrap_or(&entry);
        doc.insert(
            row.target_bone.clone(),
            serde_json::to_value(PersistedEntry::from(row))?,
        );
    }
    Ok(doc)
}

/// Rebuild a table from a persisted document, in document order.
pub fn from_document(doc: Map<String, Value>) -> Result<MappingTable> {
    let mut table = MappingTable::new();
    for (target, value) in doc {
        let persisted: PersistedEntry = serde_json::from_value(value)
            .with_context(|| format!("Invalid mapping entry for {:?}", target))?;
        table.push(persisted.into_entry(&target));
    }
    Ok(table)
}

/// Serialize with 4-space indentation and a trailing newline.
pub fn to_json(table: &MappingTable, vocabulary: &TargetVocabulary) -> Result<String> {
    let doc = to_document(table, vocabulary)?;
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser)?;
    let mut s = String::from_utf8(buf)?;
    if !s.ends_with('\n') {
        s.push('\n');
    }
    Ok(s)
}

pub fn from_json(json: &str) -> Result<MappingTable> {
    let doc: Map<String, Value> = serde_json::from_str(json)?;
    from_document(doc)
}

/// Write the table to `path` atomically.
pub fn save_mappings(table: &MappingTable, vocabulary: &TargetVocabulary, path: &Path) -> Result<()> {
    let json = to_json(table, vocabulary)?;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(json.as_bytes())?;
    temp.flush()?;
    temp.persist(path)?;

    info!("Saved {} mapping row(s) to {:?}", table.len(), path);
    Ok(())
}

pub fn load_mappings(path: &Path) -> Result<MappingTable> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mappings from {:?}", path))?;
    let table = from_json(&content)?;
    info!("Loaded {} mapping row(s) from {:?}", table.len(), path);
    Ok(table)
}
