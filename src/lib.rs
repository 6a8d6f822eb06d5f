//! Bone-name matching and hierarchy-consistent mapping for skeleton
//! retargeting.
//!
//! ```ignore
//! use rigmap::{MappingSession, Skeleton};
//!
//! let mut session = MappingSession::default();
//! session.select_source(Skeleton::from_pairs([
//!     ("mixamorig:Hips", None),
//!     ("mixamorig:Spine", Some("mixamorig:Hips")),
//! ])?);
//! let outcome = session.auto_detect();
//! println!("{}", outcome);
//! ```

pub mod commands;
pub mod error;
pub mod mapping;
pub mod matcher;
pub mod skeleton;

pub use commands::{ActionOutcome, ActionReport, MappingSession};
pub use error::MappingError;
pub use mapping::{DetectionMethod, MappingEntry, MappingTable};
pub use skeleton::{Bone, BoneIndex, Skeleton, TargetVocabulary};

/// Install the global `tracing` subscriber. Honours `RUST_LOG`, defaulting
/// to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
