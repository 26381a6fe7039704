//! Rivet Engine
//!
//! Runtime model and reflective method-invocation bridge:
//! - **Runtime**: classes, method descriptors, heap, mutator lock and the
//!   execution-engine seam (`vm` module)
//! - **Bridge**: access checks, dispatch, argument marshalling and result
//!   conversion for native and reflective callers (`vm::reflect` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use rivet_engine::{ClassDef, MethodDef, NativeMethodEngine, RuntimeBuilder, TypeRef};
//! use rivet_engine::{invoke_with_values, ThreadContext, Value, PrimitiveKind};
//!
//! let int = TypeRef::Primitive(PrimitiveKind::Int);
//! let mut builder = RuntimeBuilder::new();
//! let math = builder.define_class(ClassDef::new("app.Math"))?;
//! let add = builder.define_method(math, MethodDef::new("add").as_static().param(int).param(int).returns(int))?;
//!
//! let mut engine = NativeMethodEngine::new();
//! engine.register(add, |frame| Ok(Value::Int(frame.arg(0).as_i32().unwrap_or(0) + frame.arg(1).as_i32().unwrap_or(0))));
//! let runtime = builder.build(Arc::new(engine));
//!
//! let mut thread = ThreadContext::unattached("main");
//! let sum = invoke_with_values(&runtime, &mut thread, None, runtime.handle_for(add), &[Value::Int(2), Value::Int(3)])?;
//! assert_eq!(sum, Value::Int(5));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![cfg_attr(test, allow(clippy::approx_constant))]
#![cfg_attr(test, allow(clippy::unnecessary_cast))]

// ============================================================================
// Core Modules
// ============================================================================

/// Runtime model and invocation bridge
pub mod vm;

// ============================================================================
// Re-exports from SDK
// ============================================================================

pub use rivet_sdk::{
    ClassId, InvokeError, InvokeResult, LoaderId, MethodHandle, MethodId, ObjectRef, PointerSize,
    PrimitiveKind, RawValue, Value, VarArgs,
};

// ============================================================================
// Re-exports from VM
// ============================================================================

pub use vm::{
    AccessFlags, CallFrame, CallingClassLookup, ClassDef, ConfigError, EngineConfig,
    ExecutionEngine, InvokeKind, LinkError, Method, MethodDef, MutatorGuard, MutatorLock,
    NativeMethodEngine, Runtime, RuntimeBuilder, ShadowStack, ThreadContext, Thrown, TypeRef,
};

// ============================================================================
// Re-exports from Bridge
// ============================================================================

pub use vm::reflect::{
    get_calling_class, invoke_constructor, invoke_method,
    invoke_virtual_or_interface_with_raw_values, invoke_virtual_or_interface_with_values,
    invoke_virtual_or_interface_with_varargs, invoke_with_raw_values, invoke_with_values,
    invoke_with_varargs, ReflectiveMethod,
};
