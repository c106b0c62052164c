//! Startup-time errors.
//!
//! Cache operations themselves never fail: a miss is `None` and a disabled type is a
//! no-op. Only configuration loading and registry construction report errors.

use thiserror::Error;

use crate::TypeKey;

/// Result alias for fallible startup paths.
pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("invalid cache strategy `{0}` (expected Global or PerContext)")]
    InvalidStrategy(String),

    #[error("invalid value `{value}` for setting `{key}`")]
    InvalidSetting { key: String, value: String },

    #[error("type `{child}` declares unregistered parent `{parent}`")]
    UnknownParent { child: TypeKey, parent: TypeKey },

    #[error("type `{dependent}` depends on unregistered type `{target}`")]
    UnknownDependency { dependent: TypeKey, target: TypeKey },

    #[error("type hierarchy cycle through `{0}`")]
    Cycle(TypeKey),
}
