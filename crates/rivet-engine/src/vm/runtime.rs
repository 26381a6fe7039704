//! Runtime
//!
//! The linked, read-only world an invocation runs against: classes, method
//! descriptors, the object heap, the mutator lock and the execution-engine
//! collaborator. Build one with [`RuntimeBuilder`](crate::vm::linker::RuntimeBuilder).

use std::sync::Arc;

use rivet_sdk::{ClassId, MethodHandle, MethodId, ObjectRef, PointerSize, Value};

use crate::vm::class_registry::ClassRegistry;
use crate::vm::config::EngineConfig;
use crate::vm::engine::ExecutionEngine;
use crate::vm::heap::Heap;
use crate::vm::method::{Method, MethodTable, TypeRef};
use crate::vm::mutator::MutatorLock;

/// A linked runtime
pub struct Runtime {
    classes: ClassRegistry,
    methods: MethodTable,
    heap: Heap,
    mutator: MutatorLock,
    config: EngineConfig,
    engine: Arc<dyn ExecutionEngine>,
}

impl Runtime {
    pub(crate) fn new(
        classes: ClassRegistry,
        methods: MethodTable,
        config: EngineConfig,
        engine: Arc<dyn ExecutionEngine>,
    ) -> Self {
        Self {
            classes,
            methods,
            heap: Heap::new(),
            mutator: MutatorLock::new(),
            config,
            engine,
        }
    }

    /// Loaded classes
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Linked method descriptors
    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    /// Object heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// The runtime-wide mutator lock
    pub fn mutator(&self) -> &MutatorLock {
        &self.mutator
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The execution-engine collaborator
    pub fn engine(&self) -> &dyn ExecutionEngine {
        self.engine.as_ref()
    }

    /// ABI width of this runtime
    pub fn pointer_size(&self) -> PointerSize {
        self.config.pointer_size()
    }

    // ===== Method handles =====

    /// Descriptor by ID
    pub fn method(&self, id: MethodId) -> Option<&Method> {
        self.methods.get(id)
    }

    /// Handle for a linked method, tagged with this runtime's width
    pub fn handle_for(&self, id: MethodId) -> MethodHandle {
        MethodHandle::from_method(id, self.pointer_size())
    }

    /// Decode a handle issued by an embedder.
    ///
    /// # Panics
    /// On an unrecognized width tag, a width that differs from the runtime's,
    /// or an ID that names no method. All three mean the embedder forged or
    /// mixed up handles.
    pub fn method_for_handle(&self, handle: MethodHandle) -> &Method {
        let width = handle.pointer_size();
        if width != self.pointer_size() {
            panic!(
                "contract violation: method handle for a {}-bit ABI used with a {}-bit runtime",
                width.bits(),
                self.pointer_size().bits()
            );
        }
        match self.methods.get(handle.method_id()) {
            Some(method) => method,
            None => panic!(
                "contract violation: method handle names unknown method {:?}",
                handle.method_id()
            ),
        }
    }

    // ===== Objects =====

    /// Runtime class of a live object.
    ///
    /// # Panics
    /// If `obj` was not issued by this runtime's heap.
    pub fn class_of(&self, obj: ObjectRef) -> ClassId {
        match self.heap.class_of(obj) {
            Some(class) => class,
            None => panic!("contract violation: dangling object reference {}", obj),
        }
    }

    /// Whether `obj` is an instance of `class` (or a subtype)
    pub fn instance_of(&self, obj: ObjectRef, class: ClassId) -> bool {
        self.classes.is_assignable_from(class, self.class_of(obj))
    }

    /// Allocate a zeroed instance of `class`
    pub fn alloc_instance(&self, class: ClassId) -> ObjectRef {
        let fields = self.classes.get_class(class).map_or(0, |c| c.field_count);
        self.heap.alloc_instance(class, fields)
    }

    /// Allocate an `Object[]` holding `elements`
    pub fn alloc_object_array(&self, elements: Vec<Option<ObjectRef>>) -> ObjectRef {
        self.heap.alloc_array(self.classes.core().object_array, elements)
    }

    /// Allocate a throwable of `class`
    pub fn alloc_throwable(&self, class: ClassId, message: impl Into<String>) -> ObjectRef {
        self.heap.alloc_throwable(class, message)
    }

    // ===== Diagnostics =====

    /// Source-level name of a type
    pub fn type_name(&self, ty: TypeRef) -> String {
        match ty {
            TypeRef::Primitive(kind) => kind.name().to_string(),
            TypeRef::Reference(class) => self.classes.class_name(class).to_string(),
        }
    }

    /// Type name of a value: the primitive kind, the runtime class, or `null`
    pub fn value_type_name(&self, value: &Value) -> String {
        match value {
            Value::Object(None) => "null".to_string(),
            Value::Object(Some(obj)) => self.classes.class_name(self.class_of(*obj)).to_string(),
            other => other.kind().map_or_else(String::new, |k| k.name().to_string()),
        }
    }

    /// `int app.Base.add(int, long)`
    pub fn pretty_method(&self, method: &Method) -> String {
        let params = method
            .parameters
            .iter()
            .map(|p| self.type_name(*p))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} {}.{}({})",
            self.type_name(method.return_type),
            self.classes.class_name(method.declaring_class),
            method.name,
            params
        )
    }

    /// `app.Oops: message` for a thrown object
    pub fn describe_throwable(&self, obj: ObjectRef) -> String {
        let class = self.classes.class_name(self.class_of(obj));
        match self.heap.throwable_message(obj) {
            Some(message) if !message.is_empty() => format!("{}: {}", class, message),
            _ => class.to_string(),
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("classes", &self.classes.iter().count())
            .field("methods", &self.methods.len())
            .field("objects", &self.heap.len())
            .field("config", &self.config)
            .finish()
    }
}
