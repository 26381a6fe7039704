//! Failure taxonomy of the invocation bridge
//!
//! Every rejected pipeline stage maps to exactly one variant. Failures raised
//! by the invoked method body itself are reported as [`InvokeError::TargetThrew`]
//! so callers can tell them apart from failures raised by the bridge.

use crate::types::ObjectRef;

/// Result type for invocation entry points
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Invocation failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvokeError {
    /// The calling thread already carried a pending failure; nothing ran
    #[error("Call abandoned: calling thread has a pending exception")]
    PendingExceptionOnEntry,

    /// The calling class may not access the target method
    #[error("Class {calling_class} cannot access {access} method {method} of class {declaring_class}")]
    AccessViolation {
        /// Calling class name
        calling_class: String,
        /// Access level of the target (`private`, `protected`, `package-private`)
        access: &'static str,
        /// Pretty method name
        method: String,
        /// Declaring class name
        declaring_class: String,
    },

    /// Actual argument count differs from the formal parameter count
    #[error("Wrong number of arguments; expected {expected}, got {got}")]
    ArgumentCountMismatch {
        /// Formal parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// An argument cannot be converted or assigned to its parameter type
    #[error("Argument {index} has type {got}, expected {expected}")]
    ArgumentTypeMismatch {
        /// Zero-based parameter index
        index: usize,
        /// Formal parameter type name
        expected: String,
        /// Actual argument type name (or a reason, e.g. `null`)
        got: String,
    },

    /// Instance method called without a receiver
    #[error("Null receiver for instance method {method}")]
    NullReceiver {
        /// Pretty method name
        method: String,
    },

    /// Receiver does not extend or implement the declaring type
    #[error("Expected receiver of type {expected}, but got {got}")]
    ClassCastOnVirtualDispatch {
        /// Declaring class or interface name
        expected: String,
        /// Receiver's runtime class name
        got: String,
    },

    /// The invoked method body raised a failure
    #[error("Invocation target failed: {description}")]
    TargetThrew {
        /// The thrown object
        exception: ObjectRef,
        /// Class name and message of the thrown object
        description: String,
    },

    /// The callee's return value cannot be converted to the declared return type
    #[error("Couldn't convert result of type {got} to {expected}")]
    ResultTypeMismatch {
        /// Declared return type name
        expected: String,
        /// Returned value's type name
        got: String,
    },

    /// Dispatch selected a method without an implementation
    #[error("Abstract method {method} has no implementation in {class}")]
    AbstractMethod {
        /// Pretty method name
        method: String,
        /// Receiver's runtime class name
        class: String,
    },
}

impl InvokeError {
    /// Whether this failure came from the callee rather than the bridge
    pub fn is_target_failure(&self) -> bool {
        matches!(self, InvokeError::TargetThrew { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = InvokeError::ArgumentCountMismatch { expected: 2, got: 1 };
        assert_eq!(err.to_string(), "Wrong number of arguments; expected 2, got 1");

        let err = InvokeError::ClassCastOnVirtualDispatch {
            expected: "app.Shape".to_string(),
            got: "app.Base".to_string(),
        };
        assert_eq!(err.to_string(), "Expected receiver of type app.Shape, but got app.Base");
    }

    #[test]
    fn test_target_failure() {
        let err = InvokeError::TargetThrew {
            exception: ObjectRef::from_index(3),
            description: "java.lang.Throwable: boom".to_string(),
        };
        assert!(err.is_target_failure());
        assert!(!InvokeError::PendingExceptionOnEntry.is_target_failure());
    }
}
