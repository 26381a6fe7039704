//! Object model and class system

use std::sync::atomic::{AtomicU8, Ordering};

use rivet_sdk::{ClassId, LoaderId, MethodId, ObjectRef, PrimitiveKind, Value};

use crate::vm::method::AccessFlags;

/// Heap object
#[derive(Debug, Clone)]
pub struct HeapObject {
    /// Runtime class
    pub class_id: ClassId,
    /// Payload
    pub body: ObjectBody,
}

/// Object payload by shape
#[derive(Debug, Clone)]
pub enum ObjectBody {
    /// Plain instance with its field slots
    Instance(Vec<Value>),
    /// Canonical wrapper of a primitive value
    Boxed(Value),
    /// Reference array
    Array(Vec<Option<ObjectRef>>),
    /// Throwable with a detail message
    Throwable(String),
}

const INIT_PENDING: u8 = 0;
const INIT_DONE: u8 = 1;
const INIT_ERRONEOUS: u8 = 2;

/// Class definition metadata
#[derive(Debug)]
pub struct Class {
    /// Class ID (unique identifier)
    pub id: ClassId,
    /// Fully qualified, dot-separated name
    pub name: String,
    /// Defining loader
    pub loader: LoaderId,
    /// Class access flags
    pub access_flags: AccessFlags,
    /// Superclass (None for the root class and interfaces)
    pub parent_id: Option<ClassId>,
    /// Directly implemented (or extended, for interfaces) interfaces
    pub interfaces: Vec<ClassId>,
    /// Methods declared by this class, in definition order
    pub declared_methods: Vec<MethodId>,
    /// Virtual method table
    pub vtable: VTable,
    /// Interface dispatch table
    pub iftable: Vec<IfTableEntry>,
    /// Number of instance fields (including inherited)
    pub field_count: usize,
    /// Primitive kind wrapped by instances of this class, for box classes
    pub boxed_kind: Option<PrimitiveKind>,
    init_state: AtomicU8,
}

impl Class {
    /// Create a new class
    pub fn new(id: ClassId, name: String, loader: LoaderId, access_flags: AccessFlags) -> Self {
        Self {
            id,
            name,
            loader,
            access_flags,
            parent_id: None,
            interfaces: Vec::new(),
            declared_methods: Vec::new(),
            vtable: VTable::new(),
            iftable: Vec::new(),
            field_count: 0,
            boxed_kind: None,
            init_state: AtomicU8::new(INIT_PENDING),
        }
    }

    /// Whether this class is an interface
    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(AccessFlags::INTERFACE)
    }

    /// Whether this class is abstract
    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(AccessFlags::ABSTRACT)
    }

    /// Package name: everything before the last `.`, empty for the default package
    pub fn package_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) => &self.name[..pos],
            None => "",
        }
    }

    /// Same runtime package: same package name and same defining loader
    pub fn is_in_same_package(&self, other: &Class) -> bool {
        self.id == other.id
            || (self.loader == other.loader && self.package_name() == other.package_name())
    }

    /// Whether static initialization has completed
    pub fn is_initialized(&self) -> bool {
        self.init_state.load(Ordering::Acquire) == INIT_DONE
    }

    /// Whether static initialization failed; the class is unusable
    pub fn is_erroneous(&self) -> bool {
        self.init_state.load(Ordering::Acquire) == INIT_ERRONEOUS
    }

    /// Record that static initialization has completed
    pub fn mark_initialized(&self) {
        self.init_state.store(INIT_DONE, Ordering::Release);
    }

    /// Record that static initialization threw
    pub fn mark_erroneous(&self) {
        self.init_state.store(INIT_ERRONEOUS, Ordering::Release);
    }

    /// Interface table entry for `interface_id`
    pub fn find_iftable_entry(&self, interface_id: ClassId) -> Option<&IfTableEntry> {
        self.iftable.iter().find(|entry| entry.interface_id == interface_id)
    }

    /// Get method from vtable
    pub fn get_method(&self, method_index: usize) -> Option<MethodId> {
        self.vtable.get_method(method_index)
    }
}

/// Virtual method table for dynamic dispatch
#[derive(Debug, Clone, Default)]
pub struct VTable {
    /// Method IDs (indexed by method slot)
    pub methods: Vec<MethodId>,
}

impl VTable {
    /// Create a new empty vtable
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method to the vtable (appends to end), returning its slot
    pub fn add_method(&mut self, method_id: MethodId) -> usize {
        self.methods.push(method_id);
        self.methods.len() - 1
    }

    /// Get method ID by slot
    pub fn get_method(&self, index: usize) -> Option<MethodId> {
        self.methods.get(index).copied()
    }

    /// Get number of methods
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Override a method at specific slot
    pub fn override_method(&mut self, index: usize, method_id: MethodId) -> Result<(), String> {
        if index < self.methods.len() {
            self.methods[index] = method_id;
            Ok(())
        } else {
            Err(format!("Method index {} out of bounds", index))
        }
    }
}

/// Per-interface slot map of an implementing class
#[derive(Debug, Clone)]
pub struct IfTableEntry {
    /// Implemented interface
    pub interface_id: ClassId,
    /// Concrete method for each interface method slot
    pub methods: Vec<MethodId>,
}
