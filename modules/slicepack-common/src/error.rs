use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlicePackError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Malformed payload map at `{path}`: {reason}")]
    MalformedPayloadMap { path: String, reason: String },

    #[error("Colliding leaf name `{name}` in slice `{slice}`")]
    CollidingLeaf { slice: String, name: String },

    #[error("Artifact name `{0}` is reserved")]
    ReservedArtifact(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Template `{template}` did not produce a usable `{artifact}` artifact")]
    MissingArtifact { template: String, artifact: String },

    #[error("Unknown action creator: {0}")]
    UnknownAction(String),

    #[error("Reducer error in `{action_type}`: {reason}")]
    Reducer { action_type: String, reason: String },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SlicePackError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn malformed(path: &[String], reason: impl Into<String>) -> Self {
        Self::MalformedPayloadMap {
            path: if path.is_empty() {
                "<root>".to_string()
            } else {
                path.join(".")
            },
            reason: reason.into(),
        }
    }

    pub fn reducer(action_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Reducer {
            action_type: action_type.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while validating a spec, before anything is registered.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::MissingField(_)
                | Self::MalformedPayloadMap { .. }
                | Self::CollidingLeaf { .. }
                | Self::ReservedArtifact(_)
                | Self::UnknownTemplate(_)
                | Self::MissingArtifact { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SlicePackError>;
