//! Rivet SDK - embedder-facing types for the invocation bridge
//!
//! This crate provides the minimal types needed to call into a Rivet runtime
//! without depending on the full rivet-engine:
//! - **Values**: the tagged [`Value`] union, the untyped [`RawValue`] word and
//!   the [`VarArgs`] argument stream
//! - **Identifiers**: [`ObjectRef`], [`ClassId`], [`MethodId`], [`LoaderId`]
//! - **Method handles**: the opaque [`MethodHandle`], tagged with an ABI width
//! - **Errors**: the [`InvokeError`] failure taxonomy
//!
//! # Example
//!
//! ```ignore
//! use rivet_sdk::{MethodHandle, PointerSize, Value};
//!
//! let handle = MethodHandle::from_raw(raw_id_from_embedder);
//! let result = invoke_with_values(&runtime, &mut thread, None, handle, &[Value::Int(2), Value::Int(3)])?;
//! assert_eq!(result, Value::Int(5));
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod types;
pub mod value;

pub use error::{InvokeError, InvokeResult};
pub use types::{ClassId, LoaderId, MethodHandle, MethodId, ObjectRef, PointerSize, PrimitiveKind};
pub use value::{RawValue, Value, VarArgs};
