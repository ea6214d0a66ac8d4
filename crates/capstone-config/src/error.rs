use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider failed to load or a value did not deserialize.
    #[error("failed to load capstone configuration: {0}")]
    Figment(#[from] figment::Error),

    /// Rejected by [`crate::CapstoneConfig::validate`].
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
