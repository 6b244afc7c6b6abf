use thiserror::Error;

/// Errors that can occur during audio session operations.
///
/// Only capture start surfaces these to callers. Everywhere else they are
/// logged and folded into the session's ready flag or change flags.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("audio session is not ready")]
    NotReady,

    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("unsupported on this platform: {0}")]
    Unsupported(String),

    #[error("platform error: {0}")]
    Platform(String),
}
