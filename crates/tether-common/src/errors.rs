use std::path::PathBuf;

use crate::id::WindowId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures reported by the platform window layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("window creation failed: {0}")]
    CreateFailed(String),

    #[error("window destruction failed: {0}")]
    DestroyFailed(String),

    #[error("script evaluation failed: {0}")]
    ScriptFailed(String),

    #[error("no native window {0}")]
    NoSuchWindow(WindowId),
}

/// Errors returned by the window coordinator and the call bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("window not found: {0}")]
    WindowNotFound(WindowId),

    #[error("window id already in use: {0}")]
    WindowIdInUse(WindowId),

    #[error("invalid child window id: {0}")]
    InvalidWindowId(WindowId),

    #[error("binding '{name}' not found on window {window}")]
    BindingNotFound { window: WindowId, name: String },

    #[error("bind failed: {0}")]
    BindFailed(String),

    #[error("call rejected: {0}")]
    Rejected(String),

    #[error("no native invoke handler registered")]
    DispatchUnhandled,

    #[error("timed out waiting for the ui thread")]
    DispatchTimeout,

    #[error("ui thread is no longer running")]
    UiThreadGone,

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
