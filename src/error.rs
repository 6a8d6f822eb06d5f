use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    /// No usable skeleton selection or an invalid request. Aborts the action
    /// before anything is written.
    #[error("Input error: {0}")]
    Input(String),

    #[error("Bone not found: {0}")]
    NotFound(String),

    #[error("{source_bone:?} -> {target:?} breaks hierarchy order against {against:?}")]
    ConsistencyViolation {
        target: String,
        source_bone: String,
        against: String,
    },

    #[error("Pass aborted: {0}")]
    Aborted(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl From<MappingError> for String {
    fn from(err: MappingError) -> Self {
        err.to_string()
    }
}
