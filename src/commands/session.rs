use std::fmt;

use tracing::{info, warn};

use crate::error::MappingError;
use crate::mapping::{MappingEntry, MappingTable, TableCounts};
use crate::matcher::{default_config, MatchConfig, Scorer};
use crate::skeleton::{Skeleton, TargetVocabulary};

use super::report::{ActionOutcome, ActionReport};

/// Everything one mapping session works on: the selected source skeleton,
/// the target vocabulary, the matching configuration and the table.
///
/// Actions run synchronously and one at a time; the session holds no shared
/// state, so a host keeps one per open rig.
#[derive(Debug, Clone)]
pub struct MappingSession {
    pub(super) source: Option<Skeleton>,
    pub(super) vocabulary: TargetVocabulary,
    pub(super) scorer: Scorer,
    pub(super) table: MappingTable,
}

impl MappingSession {
    pub fn new(vocabulary: TargetVocabulary, config: MatchConfig) -> Result<Self, MappingError> {
        config.validate()?;
        let table = MappingTable::for_vocabulary(&vocabulary);
        Ok(Self {
            source: None,
            vocabulary,
            scorer: Scorer::new(config),
            table,
        })
    }

    pub fn source(&self) -> Option<&Skeleton> {
        self.source.as_ref()
    }

    pub fn vocabulary(&self) -> &TargetVocabulary {
        &self.vocabulary
    }

    pub fn config(&self) -> &MatchConfig {
        self.scorer.config()
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// One entry per vocabulary slot, in vocabulary order, followed by rows
    /// for targets outside the vocabulary.
    pub fn snapshot(&self) -> Vec<MappingEntry> {
        self.table.snapshot(&self.vocabulary)
    }

    pub fn counts(&self) -> TableCounts {
        self.table.counts(&self.vocabulary)
    }

    /// Select the source skeleton.
    ///
    /// Selecting a skeleton with a different name discards the table. A
    /// skeleton with the same name is a re-read of the same rig: the table
    /// is kept so that `validate_mappings` can check it against the change.
    /// Unnamed skeletons always count as a new rig.
    pub fn select_source(&mut self, skeleton: Skeleton) -> ActionOutcome {
        let current = self.source.as_ref().and_then(Skeleton::name);
        let same_rig = match (current, skeleton.name()) {
            (Some(current), Some(next)) => current == next,
            _ => false,
        };

        let message = if same_rig {
            format!("Reloaded source skeleton ({} bones)", skeleton.len())
        } else {
            self.table = MappingTable::for_vocabulary(&self.vocabulary);
            format!(
                "Selected source skeleton {:?} ({} bones); mapping table reset",
                skeleton.name().unwrap_or("<unnamed>"),
                skeleton.len()
            )
        };
        info!("{}", message);
        self.source = Some(skeleton);
        self.outcome("select_source", message)
    }

    /// Drop the source selection and the table.
    pub fn deselect_source(&mut self) -> ActionOutcome {
        self.source = None;
        self.table = MappingTable::for_vocabulary(&self.vocabulary);
        self.outcome("deselect_source", "Source skeleton deselected")
    }

    pub(super) fn require_source(&self) -> Result<&Skeleton, MappingError> {
        match &self.source {
            Some(skeleton) if !skeleton.is_empty() => Ok(skeleton),
            Some(_) => Err(MappingError::Input(
                "Selected source skeleton has no bones".to_string(),
            )),
            None => Err(MappingError::Input("No source skeleton selected".to_string())),
        }
    }

    /// Successful outcome with the table's current counts.
    pub(super) fn outcome(&self, action: &str, message: impl Into<String>) -> ActionOutcome {
        ActionOutcome::ok(ActionReport::new(action, message).with_counts(self.counts()))
    }

    pub(super) fn report(&self, action: &str, message: impl Into<String>) -> ActionReport {
        ActionReport::new(action, message).with_counts(self.counts())
    }

    /// Failed outcome; the table is reported as it stands, unchanged.
    pub(super) fn failure(&self, action: &str, err: impl fmt::Display) -> ActionOutcome {
        warn!("{} failed: {}", action, err);
        ActionOutcome::failed(self.report(action, err.to_string()))
    }
}

impl Default for MappingSession {
    fn default() -> Self {
        let vocabulary = TargetVocabulary::builtin();
        let table = MappingTable::for_vocabulary(&vocabulary);
        Self {
            source: None,
            vocabulary,
            scorer: Scorer::new(default_config()),
            table,
        }
    }
}
