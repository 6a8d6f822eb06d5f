//! The mapping table and the passes that write to it.
//!
//! - **Table**: one row per target slot, with detection method and confidence
//! - **Consolidation**: ranked candidates become a hierarchy-consistent table
//! - **Mirror**: confident one-sided rows are copied to the opposite side
//! - **Validation**: stale rows are disabled against the current skeleton
//! - **Store**: JSON persistence keyed by target bone

mod consolidate;
mod mirror;
mod store;
mod table;
mod types;
mod validate;

pub use consolidate::{
    check_consistency, is_hierarchy_consistent, pair_consistent, ConsolidationReport, Consolidator,
    Rejection,
};
pub use mirror::{mirror_name, MirrorPolicy, MirrorReport, MirrorResolver, MirrorSkip};
pub use store::{from_json, load_mappings, save_mappings, to_document, to_json, PersistedEntry};
pub use table::MappingTable;
pub use types::*;
pub use validate::{validate_and_disable_invalid, DisableReason, DisabledEntry, ValidationReport};
