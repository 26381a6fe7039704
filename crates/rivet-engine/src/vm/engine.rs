//! Execution-engine seam
//!
//! The bridge never runs method bodies itself. It hands a [`CallFrame`] to an
//! [`ExecutionEngine`] and gets back either a return value or the object the
//! body threw. Class initialization goes through the same collaborator.
//!
//! [`NativeMethodEngine`] is the in-crate implementation: method bodies and
//! static initializers are Rust closures registered by method/class ID, the
//! same way native handlers are linked into a dispatch table ahead of time.

use std::sync::Arc;

use parking_lot::ReentrantMutex;
use rustc_hash::FxHashMap;

use rivet_sdk::{ClassId, MethodId, ObjectRef, Value};

use crate::vm::method::Method;
use crate::vm::mutator::MutatorGuard;
use crate::vm::object::Class;
use crate::vm::runtime::Runtime;
use crate::vm::thread::ThreadContext;

/// An object thrown by a method body or static initializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thrown(pub ObjectRef);

/// Everything a method body may touch while it runs
pub struct CallFrame<'r, 'f> {
    /// The runtime the call runs in
    pub runtime: &'r Runtime,
    /// The concrete method being executed (after dispatch)
    pub method: &'r Method,
    /// Receiver, `None` for static methods
    pub receiver: Option<ObjectRef>,
    /// Marshalled arguments, one per formal parameter
    pub args: &'f [Value],
    /// The calling thread
    pub thread: &'f mut ThreadContext,
    /// Shared hold on the mutator lock; may be suspended around blocking work
    pub guard: &'f mut MutatorGuard<'r>,
}

impl CallFrame<'_, '_> {
    /// Argument by position
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).copied().unwrap_or_default()
    }

    /// Allocate a throwable of `class` with `message`, ready to return as `Err`
    pub fn throw_new(&self, class: ClassId, message: impl Into<String>) -> Thrown {
        Thrown(self.runtime.heap().alloc_throwable(class, message))
    }
}

impl std::fmt::Debug for CallFrame<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallFrame")
            .field("method", &self.method.id)
            .field("receiver", &self.receiver)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Collaborator that executes method bodies
pub trait ExecutionEngine: Send + Sync {
    /// Run the body of `frame.method`
    fn execute(&self, frame: &mut CallFrame<'_, '_>) -> Result<Value, Thrown>;

    /// Make sure `class` (and its superclasses) have completed static
    /// initialization. May suspend `guard` while waiting on another thread.
    fn ensure_initialized(
        &self,
        runtime: &Runtime,
        class: ClassId,
        thread: &mut ThreadContext,
        guard: &mut MutatorGuard<'_>,
    ) -> Result<(), Thrown>;
}

/// Method body closure
pub type MethodBody = Arc<dyn Fn(&mut CallFrame<'_, '_>) -> Result<Value, Thrown> + Send + Sync>;

/// Static initializer closure
pub type ClassInitializer =
    Arc<dyn Fn(&Runtime, &mut ThreadContext) -> Result<(), Thrown> + Send + Sync>;

/// Execution engine backed by registered Rust closures
#[derive(Default)]
pub struct NativeMethodEngine {
    bodies: FxHashMap<MethodId, MethodBody>,
    initializers: FxHashMap<ClassId, ClassInitializer>,
    init_lock: ReentrantMutex<()>,
}

impl NativeMethodEngine {
    /// Create an engine with no bodies
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the body of a method
    pub fn register<F>(&mut self, method: MethodId, body: F)
    where
        F: Fn(&mut CallFrame<'_, '_>) -> Result<Value, Thrown> + Send + Sync + 'static,
    {
        self.bodies.insert(method, Arc::new(body));
    }

    /// Register the static initializer of a class
    pub fn register_initializer<F>(&mut self, class: ClassId, init: F)
    where
        F: Fn(&Runtime, &mut ThreadContext) -> Result<(), Thrown> + Send + Sync + 'static,
    {
        self.initializers.insert(class, Arc::new(init));
    }

    /// Whether a body is registered for `method`
    pub fn contains(&self, method: MethodId) -> bool {
        self.bodies.contains_key(&method)
    }

    /// Number of registered bodies
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Check if no bodies are registered
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl ExecutionEngine for NativeMethodEngine {
    fn execute(&self, frame: &mut CallFrame<'_, '_>) -> Result<Value, Thrown> {
        match self.bodies.get(&frame.method.id) {
            Some(body) => body(frame),
            None => {
                let message = format!(
                    "No implementation found for {}",
                    frame.runtime.pretty_method(frame.method)
                );
                tracing::warn!(method = ?frame.method.id, "{}", message);
                Err(frame.throw_new(frame.runtime.classes().core().throwable, message))
            }
        }
    }

    fn ensure_initialized(
        &self,
        runtime: &Runtime,
        class: ClassId,
        thread: &mut ThreadContext,
        guard: &mut MutatorGuard<'_>,
    ) -> Result<(), Thrown> {
        let Some(target) = runtime.classes().get_class(class) else {
            return Ok(());
        };
        if target.is_initialized() {
            return Ok(());
        }
        if target.is_erroneous() {
            return Err(could_not_initialize(runtime, target));
        }

        // Another thread may be running the initializer; wait without
        // holding the mutator lock.
        let _init = guard.suspended(|| self.init_lock.lock());
        if target.is_initialized() {
            return Ok(());
        }
        if target.is_erroneous() {
            return Err(could_not_initialize(runtime, target));
        }

        if let Some(parent) = target.parent_id {
            if let Err(thrown) = self.ensure_initialized(runtime, parent, thread, guard) {
                target.mark_erroneous();
                return Err(thrown);
            }
        }

        tracing::debug!(class = %target.name, "running static initializer");
        if let Some(init) = self.initializers.get(&class) {
            if let Err(thrown) = init(runtime, thread) {
                tracing::warn!(class = %target.name, "static initializer threw; class erroneous");
                target.mark_erroneous();
                return Err(thrown);
            }
        }
        target.mark_initialized();
        Ok(())
    }
}

/// Thrown on every use of a class whose initializer failed
fn could_not_initialize(runtime: &Runtime, class: &Class) -> Thrown {
    let message = format!("Could not initialize class {}", class.name);
    Thrown(runtime.alloc_throwable(runtime.classes().core().throwable, message))
}

impl std::fmt::Debug for NativeMethodEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeMethodEngine")
            .field("bodies", &self.bodies.len())
            .field("initializers", &self.initializers.len())
            .finish()
    }
}
