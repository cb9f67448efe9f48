//! Errors raised while building requests or reading payloads.

use pagetree_fetch::FetchError;
use thiserror::Error;

/// Errors specific to the built-in modules.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A credential the API requires is not configured.
    #[error("{module} requires {credential}")]
    MissingCredential {
        /// Module name.
        module: &'static str,
        /// What is missing, e.g. "an access token".
        credential: &'static str,
    },

    /// A placeholder could not be filled from the node.
    #[error("Cannot resolve placeholder <{0}>")]
    Unresolvable(String),

    /// The request template is unusable.
    #[error("Invalid request settings: {0}")]
    InvalidSettings(String),

    /// The API answered with an error document or an unexpected shape.
    #[error("Unexpected payload: {0}")]
    Payload(String),
}

impl From<ModuleError> for FetchError {
    fn from(err: ModuleError) -> Self {
        match err {
            ModuleError::Unresolvable(_) => FetchError::Unresolvable(err.to_string()),
            ModuleError::Payload(message) => FetchError::Parse(message),
            ModuleError::MissingCredential { .. } | ModuleError::InvalidSettings(_) => {
                FetchError::Configuration(err.to_string())
            }
        }
    }
}
