//! Error types for the survival core.
//!
//! Only caller bugs and bad data end up here. Gated no-ops (cooldowns,
//! missing targets, insufficient materials) are reported through the
//! structured outcome types of each resolver instead.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all survival core errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Referenced item is not known to any catalog.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// Referenced building type is not in the building catalog.
    #[error("Unknown building type: {0}")]
    UnknownBuilding(String),

    /// Referenced enemy archetype does not exist.
    #[error("Unknown enemy archetype: {0}")]
    UnknownEnemy(String),

    /// Referenced resource archetype does not exist.
    #[error("Unknown resource archetype: {0}")]
    UnknownResource(String),

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u64),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Configuration value outside its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

impl GameError {
    /// Wrap a RON parse failure for the named data source.
    pub(crate) fn parse(source_name: &str, err: &ron::error::SpannedError) -> Self {
        Self::DataParseError {
            source_name: source_name.to_string(),
            message: err.to_string(),
        }
    }
}
