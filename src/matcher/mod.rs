//! Bone-name similarity and per-slot candidate ranking.
//!
//! Names are normalized into lower-case content tokens plus a side marker,
//! scored pairwise against every target slot, and ranked. Thresholds,
//! weights, prefix/suffix rules and synonym groups come from a TOML config
//! (embedded defaults in `config/matching.toml`).
//!
//! # Example
//!
//! ```ignore
//! use rigmap::matcher::{default_config, generate_candidates, Scorer};
//! use rigmap::mapping::MappingTable;
//! use rigmap::skeleton::{load_skeleton, TargetVocabulary};
//!
//! let config = default_config();
//! let scorer = Scorer::new(config.clone());
//! let source = load_skeleton(std::path::Path::new("mixamo.json"))?;
//! let vocabulary = TargetVocabulary::builtin();
//! let table = MappingTable::for_vocabulary(&vocabulary);
//!
//! let candidates = generate_candidates(
//!     &scorer, &source, &vocabulary, &table, config.thresholds.similarity,
//! );
//! if let Some(best) = candidates.for_target(" L UpperArm").first() {
//!     println!("{} ({:.2})", best.source_bone, best.score);
//! }
//! ```

mod candidates;
mod config;
mod normalize;
mod similarity;

pub use candidates::{generate_candidates, Candidate, CandidateSet, SlotCandidates};
pub use config::{
    default_config, load_config, MatchConfig, NameRules, SynonymGroup, Thresholds, Weights,
};
pub(crate) use config::shared_default;
pub use normalize::{normalize, NormalizedName, Normalizer, Side};
pub use similarity::{jaccard, score, Scorer, SynonymTable};
