//! Rivet runtime model
//!
//! The state an invocation reads:
//! - Class registry, method table and linker
//! - Object heap
//! - Mutator lock and calling-thread context
//! - Execution-engine seam
//! - Configuration

pub mod class_registry;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod heap;
pub mod linker;
pub mod method;
pub mod mutator;
pub mod object;
pub mod reflect;
pub mod runtime;
pub mod thread;

pub use class_registry::{ClassRegistry, CoreClasses};
pub use config::{ConfigError, EngineConfig};
pub use engine::{
    CallFrame, ClassInitializer, ExecutionEngine, MethodBody, NativeMethodEngine, Thrown,
};
pub use heap::{Heap, HeapError};
pub use linker::{ClassDef, LinkError, MethodDef, RuntimeBuilder};
pub use method::{AccessFlags, InvokeKind, Method, MethodTable, TypeRef};
pub use mutator::{MutatorGuard, MutatorLock};
pub use object::{Class, HeapObject, IfTableEntry, ObjectBody, VTable};
pub use runtime::Runtime;
pub use thread::{CallingClassLookup, ShadowStack, ThreadContext};
