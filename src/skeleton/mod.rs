pub mod index;
pub mod types;
pub mod vocabulary;

pub use index::BoneIndex;
pub use types::{load_skeleton, Bone, Skeleton};
pub use vocabulary::{load_vocabulary, TargetVocabulary};
