//! The error type shared by every wrapper.

use crate::guard::Subsystem;

/// Result alias that carries the custom [`SdlError`] type.
pub type Result<T> = std::result::Result<T, SdlError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum SdlError {
    /// A native entry point reported failure. `message` is the library's own
    /// error string, fetched right after the failing call.
    #[error("{call}() failed, errMsg: {message}")]
    Native {
        call: &'static str,
        message: String,
    },
    /// Fixed message without a native error attached.
    #[error("{0}")]
    Message(String),
    /// A guard for this subsystem is already alive on the backend.
    #[error("{} subsystem is already initialised", .0.name())]
    AlreadyActive(Subsystem),
    /// The handle was emptied by `take` or `into_raw` before use.
    #[error("{0} handle is empty")]
    EmptyHandle(&'static str),
    /// An argument that cannot be handed to the native layer.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed configuration file.
    #[error("config: {0}")]
    Config(#[from] serde_json::Error),
}

impl SdlError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Builds the error for a failed native call. Callers fetch the native
    /// error string into a local before calling this.
    pub fn native(call: &'static str, message: impl Into<String>) -> Self {
        Self::Native {
            call,
            message: message.into(),
        }
    }

    /// Name of the native call that failed, if this is a native failure.
    pub fn call(&self) -> Option<&'static str> {
        match self {
            Self::Native { call, .. } => Some(call),
            _ => None,
        }
    }
}

impl Default for SdlError {
    fn default() -> Self {
        Self::msg("SDL2 exception occurs")
    }
}

impl From<&str> for SdlError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SdlError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<std::ffi::NulError> for SdlError {
    fn from(value: std::ffi::NulError) -> Self {
        Self::InvalidArgument(format!(
            "string contains an interior NUL byte at {}",
            value.nul_position()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_call_and_native_message() {
        let err = SdlError::native("SDL_CreateWindow", "No available video device");
        assert_eq!(
            err.to_string(),
            "SDL_CreateWindow() failed, errMsg: No available video device"
        );
        assert_eq!(err.call(), Some("SDL_CreateWindow"));
    }

    #[test]
    fn default_carries_fixed_message() {
        let err = SdlError::default();
        assert_eq!(err.to_string(), "SDL2 exception occurs");
        assert_eq!(err.call(), None);
    }

    #[test]
    fn interior_nul_is_an_invalid_argument() {
        let nul = std::ffi::CString::new("a\0b").unwrap_err();
        let err = SdlError::from(nul);
        assert!(matches!(err, SdlError::InvalidArgument(_)));
        assert!(err.to_string().contains("NUL"));
    }
}
