//! Error types for the lead funnel.

use crate::funnel::model::StepIndex;
use crate::funnel::validation::ValidationBlocked;

/// Top-level error type for the funnel core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("Presentation error: {0}")]
    Presentation(#[from] PresentationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown service type: {0} (expected \"aesthetic\" or \"implants\")")]
    UnknownService(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Key-value persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt value under key {key}: {message}")]
    Corrupt { key: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Store closed")]
    Closed,
}

/// Step navigation errors. None of these are fatal: the wizard state is
/// left unchanged whenever one is returned.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("Step {} blocked: {} {}", .0.step, .0.field, .0.reason)]
    Blocked(ValidationBlocked),

    #[error("Target step {0} not found in presentation")]
    MissingTargetStep(StepIndex),

    #[error("Cannot {action} from {state}")]
    InvalidTransition { state: String, action: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Missing pieces of the (external) presentation collaborator.
#[derive(Debug, thiserror::Error)]
pub enum PresentationError {
    #[error("Step {0} does not exist in the presentation")]
    MissingTargetStep(StepIndex),

    #[error("Optional element {0} is absent")]
    MissingElement(&'static str),
}

/// Result type alias for the funnel core.
pub type Result<T> = std::result::Result<T, Error>;
