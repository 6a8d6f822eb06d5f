use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::warn;

use crate::skeleton::TargetVocabulary;

use super::types::{ConflictRecord, MappingEntry, TableCounts};

/// The mutable mapping result store.
///
/// Rows are kept in insertion order, which for a table created with
/// [`MappingTable::for_vocabulary`] is vocabulary order. Duplicate rows for
/// one target can appear through [`MappingTable::push`]; the uniqueness
/// invariant (one enabled row per target) is restored by
/// [`MappingTable::resolve_conflicts`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// One unmapped row per vocabulary slot.
    pub fn for_vocabulary(vocabulary: &TargetVocabulary) -> Self {
        Self {
            entries: vocabulary.slots().map(MappingEntry::unmapped).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut MappingEntry> {
        self.entries.iter_mut()
    }

    fn position(&self, target: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.target_bone == target && e.enabled)
            .or_else(|| self.entries.iter().position(|e| e.target_bone == target))
    }

    /// The row for a target, preferring an enabled one.
    pub fn get(&self, target: &str) -> Option<&MappingEntry> {
        self.position(target).map(|i| &self.entries[i])
    }

    pub fn get_mut(&mut self, target: &str) -> Option<&mut MappingEntry> {
        self.position(target).map(move |i| &mut self.entries[i])
    }

    /// Source bone mapped to a target, if the row is enabled.
    pub fn source_for(&self, target: &str) -> Option<&str> {
        self.get(target)
            .filter(|e| e.is_mapped())
            .map(|e| e.source_bone.as_str())
    }

    /// True if the slot holds a manual row, enabled or not. Automatic passes
    /// never write to such a slot.
    pub fn is_locked(&self, target: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.target_bone == target && e.is_manual())
    }

    /// Replace the row for `entry.target_bone`, or append it.
    pub fn set(&mut self, entry: MappingEntry) {
        match self.position(&entry.target_bone) {
            Some(i) => self.entries[i] = entry,
            None => self.entries.push(entry),
        }
    }

    /// Append a row without replacing any existing row for the same target.
    pub fn push(&mut self, entry: MappingEntry) {
        self.entries.push(entry);
    }

    /// Enabled rows that point at a source bone.
    pub fn mapped(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter().filter(|e| e.is_mapped())
    }

    /// True if some enabled row other than `except_target` uses `source`.
    pub fn is_source_claimed(&self, source: &str, except_target: &str) -> bool {
        self.mapped()
            .any(|e| e.source_bone == source && e.target_bone != except_target)
    }

    /// Reset every row that is not manual, so a detection pass recomputes
    /// it from scratch.
    pub fn reset_automatic(&mut self) {
        for entry in self.entries.iter_mut().filter(|e| !e.is_manual()) {
            entry.clear();
        }
    }

    /// Reset every row, manual ones included.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.clear();
        }
    }

    /// Add unmapped rows for vocabulary slots missing from the table.
    pub fn ensure_slots(&mut self, vocabulary: &TargetVocabulary) {
        for slot in vocabulary.slots() {
            if self.position(slot).is_none() {
                self.entries.push(MappingEntry::unmapped(slot));
            }
        }
    }

    /// Disable all but the highest-precedence enabled row per target.
    /// Ties go to the earlier row.
    pub fn resolve_conflicts(&mut self) -> Vec<ConflictRecord> {
        let mut winner: HashMap<&str, usize> = HashMap::new();
        let mut losers = Vec::new();

        for (i, entry) in self.entries.iter().enumerate() {
            if !entry.enabled {
                continue;
            }
            match winner.get(entry.target_bone.as_str()).copied() {
                None => {
                    winner.insert(entry.target_bone.as_str(), i);
                }
                Some(w) => {
                    if entry.precedence(&self.entries[w]) == Ordering::Greater {
                        winner.insert(entry.target_bone.as_str(), i);
                        losers.push((w, i));
                    } else {
                        losers.push((i, w));
                    }
                }
            }
        }

        // A row that lost to an earlier winner which itself later lost is
        // still a loser; report against the final winner.
        let final_winner: HashMap<String, usize> = winner
            .into_iter()
            .map(|(t, i)| (t.to_string(), i))
            .collect();

        let mut records = Vec::new();
        for (loser, _) in losers {
            let target = self.entries[loser].target_bone.clone();
            let kept = final_winner
                .get(&target)
                .map(|&w| self.entries[w].source_bone.clone())
                .unwrap_or_default();
            let entry = &mut self.entries[loser];
            if !entry.enabled {
                continue;
            }
            entry.enabled = false;
            warn!(
                "Conflict on {:?}: disabled {:?} ({}) in favour of {:?}",
                target, entry.source_bone, entry.detection_method, kept
            );
            records.push(ConflictRecord {
                target_bone: target,
                kept_source: kept,
                disabled_source: entry.source_bone.clone(),
                description: format!(
                    "duplicate enabled {} entry for the same target",
                    entry.detection_method
                ),
            });
        }
        records
    }

    /// Rows ordered by vocabulary, followed by rows for unknown targets in
    /// their stored order. Slots without a row appear as unmapped.
    pub fn snapshot(&self, vocabulary: &TargetVocabulary) -> Vec<MappingEntry> {
        let mut out: Vec<MappingEntry> = vocabulary
            .slots()
            .map(|slot| {
                self.get(slot)
                    .cloned()
                    .unwrap_or_else(|| MappingEntry::unmapped(slot))
            })
            .collect();
        out.extend(
            self.entries
                .iter()
                .filter(|e| !vocabulary.contains(&e.target_bone))
                .cloned(),
        );
        out
    }

    /// Mapped / unmapped / disabled counts over vocabulary slots.
    pub fn counts(&self, vocabulary: &TargetVocabulary) -> TableCounts {
        let mut counts = TableCounts::default();
        for slot in vocabulary.slots() {
            match self.get(slot) {
                Some(e) if e.is_mapped() => counts.mapped += 1,
                Some(e) if !e.enabled && !e.source_bone.is_empty() => {
                    counts.disabled += 1;
                    counts.unmapped += 1;
                }
                _ => counts.unmapped += 1,
            }
        }
        counts
    }
}
