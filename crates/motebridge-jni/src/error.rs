//! Errors raised at the JNI boundary

use motebridge_core::{BridgeError, LayoutError};
use thiserror::Error;

/// Errors that can occur while serving a native call
#[derive(Error, Debug)]
pub enum JniBridgeError {
    /// JNI call failed
    #[error("JNI error: {0}")]
    Jni(#[from] jni::errors::Error),

    /// Bridge operation failed
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Bridge for a node type could not be built
    #[error("Invalid layout: {0}")]
    Layout(#[from] LayoutError),

    /// Receiver class was never attached
    #[error("No node type registered for this class")]
    UnknownClass,

    /// Class list non-empty but no class was found
    #[error("None of the configured node classes is loaded: {0}")]
    NoClassAttached(String),

    /// Native call before `JNI_OnLoad` finished
    #[error("Native library not initialized")]
    NotLoaded,

    /// Java array shorter than the requested length
    #[error("Java array holds {actual} bytes, {requested} requested")]
    ArrayTooShort {
        /// Requested length
        requested: usize,
        /// Array length
        actual: usize,
    },
}

impl JniBridgeError {
    /// Java exception class thrown for this error
    pub fn exception_class(&self) -> &'static str {
        match self {
            JniBridgeError::Bridge(e) if e.is_access_violation() => {
                "java/lang/IndexOutOfBoundsException"
            }
            JniBridgeError::ArrayTooShort { .. } => "java/lang/IndexOutOfBoundsException",
            _ => "java/lang/IllegalStateException",
        }
    }

    /// True when the JVM already has an exception pending for this error
    pub fn is_pending_exception(&self) -> bool {
        matches!(self, JniBridgeError::Jni(jni::errors::Error::JavaException))
    }
}
