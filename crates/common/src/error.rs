//! Error types shared across screenrec crates.

/// Top-level error type for screenrec operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenrecError {
    /// The host cannot capture the display at all. No session can start.
    #[error("Unsupported platform: {message}")]
    UnsupportedPlatform { message: String },

    /// The user (or the host) refused a capture permission prompt.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// An optional input device could not be opened.
    #[error("Device unavailable: {message}")]
    DeviceUnavailable { message: String },

    #[error("Recorder construction failed: {message}")]
    RecorderConstructionFailed { message: String },

    /// Releasing one resource failed. Only ever logged during teardown.
    #[error("Failed to release {resource}: {message}")]
    ResourceReleaseFailure { resource: String, message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Session busy: {message}")]
    SessionBusy { message: String },

    #[error("Session controller is no longer running")]
    ControllerClosed,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using ScreenrecError.
pub type ScreenrecResult<T> = Result<T, ScreenrecError>;

impl ScreenrecError {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            message: msg.into(),
        }
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: msg.into(),
        }
    }

    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            message: msg.into(),
        }
    }

    pub fn recorder(msg: impl Into<String>) -> Self {
        Self::RecorderConstructionFailed {
            message: msg.into(),
        }
    }

    pub fn release(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ResourceReleaseFailure {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::SessionBusy {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// The user-facing text without the variant prefix.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedPlatform { message }
            | Self::PermissionDenied { message }
            | Self::DeviceUnavailable { message }
            | Self::RecorderConstructionFailed { message }
            | Self::Capture { message }
            | Self::SessionBusy { message }
            | Self::Config { message }
            | Self::ResourceReleaseFailure { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_strips_variant_prefix() {
        let err = ScreenrecError::permission_denied("Permission denied by user");
        assert_eq!(err.user_message(), "Permission denied by user");
        assert_eq!(
            err.to_string(),
            "Permission denied: Permission denied by user"
        );
    }
}
