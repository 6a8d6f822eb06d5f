//! Name similarity scoring.
//!
//! Scores are in [0, 1] and symmetric. Composition, strongest first:
//! equal content tokens (or equal compact forms), a synonym-group hit, then a
//! blend of token-set overlap and edit-distance similarity. Opposite sides
//! always score 0.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use super::config::{shared_default, MatchConfig};
use super::normalize::{NormalizedName, Normalizer};

/// Synonym lookup keyed by compact name.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    group_of: HashMap<String, usize>,
}

impl SynonymTable {
    pub fn from_config(config: &MatchConfig) -> Self {
        let mut group_of = HashMap::new();
        for (i, group) in config.synonyms.iter().enumerate() {
            for name in &group.group {
                group_of.entry(compact_key(name)).or_insert(i);
            }
        }
        Self { group_of }
    }

    /// True if both compact names belong to the same synonym group.
    pub fn same_group(&self, a: &str, b: &str) -> bool {
        match (self.group_of.get(a), self.group_of.get(b)) {
            (Some(ga), Some(gb)) => ga == gb,
            _ => false,
        }
    }
}

fn compact_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Similarity scorer bound to one matching configuration.
#[derive(Debug, Clone)]
pub struct Scorer {
    config: MatchConfig,
    synonyms: SynonymTable,
}

impl Scorer {
    pub fn new(config: MatchConfig) -> Self {
        let synonyms = SynonymTable::from_config(&config);
        Self { config, synonyms }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn normalize(&self, name: &str) -> NormalizedName {
        Normalizer::new(&self.config.names).normalize(name)
    }

    /// Score two raw bone names.
    pub fn score(&self, source: &str, target: &str) -> f32 {
        self.score_normalized(&self.normalize(source), &self.normalize(target))
    }

    /// Score two already-normalized names.
    pub fn score_normalized(&self, a: &NormalizedName, b: &NormalizedName) -> f32 {
        // Laterality is required, never merely preferred.
        if let (Some(sa), Some(sb)) = (a.side, b.side) {
            if sa != sb {
                return 0.0;
            }
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let mut score = if a.tokens == b.tokens || a.compact == b.compact {
            1.0
        } else {
            let blended = self.blended(a, b);
            if self.synonyms.same_group(&a.compact, &b.compact) {
                blended.max(self.config.weights.synonym)
            } else {
                blended
            }
        };

        if a.side.is_some() != b.side.is_some() {
            score *= self.config.weights.unilateral_penalty;
        }

        score.clamp(0.0, 1.0)
    }

    fn blended(&self, a: &NormalizedName, b: &NormalizedName) -> f32 {
        let (jaccard_weight, edit_weight) = self.config.blend_weights();
        let overlap = jaccard(&a.tokens, &b.tokens);
        let edit = strsim::normalized_levenshtein(&a.compact, &b.compact) as f32;
        jaccard_weight * overlap + edit_weight * edit
    }

    /// Levenshtein distance between the compact forms; first tie-breaker
    /// when two candidates score the same.
    pub fn edit_distance(&self, a: &NormalizedName, b: &NormalizedName) -> usize {
        strsim::levenshtein(&a.compact, &b.compact)
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(shared_default().clone())
    }
}

/// Token-set overlap: |A ∩ B| / |A ∪ B|.
pub fn jaccard(a: &[String], b: &[String]) -> f32 {
    let sa: HashSet<&str> = a.iter().map(String::as_str).collect();
    let sb: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = sa.union(&sb).count();
    if union == 0 {
        return 0.0;
    }
    sa.intersection(&sb).count() as f32 / union as f32
}

/// Score two names with the embedded default configuration.
pub fn score(source_name: &str, target_name: &str) -> f32 {
    static SCORER: OnceLock<Scorer> = OnceLock::new();
    SCORER.get_or_init(Scorer::default).score(source_name, target_name)
}
