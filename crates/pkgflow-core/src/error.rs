use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("duplicate action '{action}' in module '{module}' (already registered by '{existing_module}')")]
    DuplicateAction {
        action: String,
        module: String,
        existing_module: String,
    },

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("invalid action definition: {0}")]
    InvalidDefinition(String),

    #[error("action function not available: {action} (module '{module}')")]
    ActionFunctionNotAvailable { action: String, module: String },

    #[error("required argument '{arg}' not available for action '{action}'")]
    RequiredActionArgumentNotAvailable { action: String, arg: String },

    #[error("action in progress: {0} (use --continue to resume or --abort to discard it)")]
    ActionInProgress(String),

    #[error("no action in progress")]
    NoActionInProgress,

    #[error("step '{action}' failed: {message}")]
    StepFailed { action: String, message: String },

    #[error("corrupt checkpoint file {}: {reason}", path.display())]
    CorruptCheckpoint { path: PathBuf, reason: String },

    #[error("no actions configured: add modules to pkgflow.yaml")]
    NotConfigured,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
