//! Class linker
//!
//! Defines classes and methods, then computes dispatch tables when the
//! runtime is built:
//!
//! - **vtable**: a copy of the superclass vtable; a declared virtual method
//!   with the same name and signature as an inherited one takes over its
//!   slot, anything else is appended.
//! - **interface slots**: an interface's instance methods are numbered in
//!   declaration order.
//! - **iftable**: for every interface a class implements (transitively), the
//!   concrete method filling each interface slot. A slot with no public
//!   implementation keeps the abstract interface method.

use std::sync::Arc;

use thiserror::Error;

use rivet_sdk::{ClassId, LoaderId, MethodId};

use crate::vm::class_registry::{ClassRegistry, CoreClasses};
use crate::vm::config::{ConfigError, EngineConfig};
use crate::vm::engine::ExecutionEngine;
use crate::vm::method::{AccessFlags, InvokeKind, Method, MethodTable, TypeRef};
use crate::vm::object::{Class, IfTableEntry};
use crate::vm::runtime::Runtime;

/// Errors raised while defining classes and methods
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// A referenced class ID does not exist
    #[error("Unknown class {0:?}")]
    UnknownClass(ClassId),

    /// A class with the same name is already defined
    #[error("Duplicate class definition: {0}")]
    DuplicateClass(String),

    /// Superclass is an interface
    #[error("Class {class} cannot extend interface {parent}")]
    ExtendsInterface {
        /// Class being defined
        class: String,
        /// Named superclass
        parent: String,
    },

    /// Implemented type is not an interface
    #[error("Class {class} cannot implement non-interface {interface}")]
    NotAnInterface {
        /// Class being defined
        class: String,
        /// Named interface
        interface: String,
    },

    /// More formal parameters than the calling convention allows
    #[error("Method {method} has {count} parameters, limit is {max}")]
    TooManyParameters {
        /// Method name
        method: String,
        /// Declared parameter count
        count: usize,
        /// Configured limit
        max: usize,
    },

    /// A parameter declared as `void`
    #[error("Method {method} declares a void parameter at index {index}")]
    VoidParameter {
        /// Method name
        method: String,
        /// Parameter index
        index: usize,
    },

    /// Contradictory flags
    #[error("Invalid flags on method {method}: {reason}")]
    InvalidFlags {
        /// Method name
        method: String,
        /// What is wrong
        reason: &'static str,
    },
}

/// Definition for a class or interface
#[derive(Debug, Clone)]
pub struct ClassDef {
    /// Fully qualified, dot-separated name
    pub name: String,
    /// Defining loader
    pub loader: LoaderId,
    /// Class access flags
    pub access_flags: AccessFlags,
    /// Superclass; `None` means `java.lang.Object` for classes
    pub parent: Option<ClassId>,
    /// Directly implemented interfaces
    pub interfaces: Vec<ClassId>,
    /// Instance fields declared by this class
    pub fields: usize,
}

impl ClassDef {
    /// A public class defined by the application loader
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loader: LoaderId::APP,
            access_flags: AccessFlags::PUBLIC,
            parent: None,
            interfaces: Vec::new(),
            fields: 0,
        }
    }

    /// A public interface defined by the application loader
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name).flags(AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT)
    }

    /// Set the superclass
    pub fn extends(mut self, parent: ClassId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add an implemented (or, for interfaces, extended) interface
    pub fn implements(mut self, interface: ClassId) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Set the defining loader
    pub fn loader(mut self, loader: LoaderId) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the access flags
    pub fn flags(mut self, flags: AccessFlags) -> Self {
        self.access_flags = flags;
        self
    }

    /// Declare instance fields
    pub fn fields(mut self, count: usize) -> Self {
        self.fields = count;
        self
    }
}

/// Definition for a method
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Simple name
    pub name: String,
    /// Access flags
    pub access_flags: AccessFlags,
    /// Formal parameter types
    pub parameters: Vec<TypeRef>,
    /// Return type
    pub return_type: TypeRef,
}

impl MethodDef {
    /// A public instance method returning `void`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access_flags: AccessFlags::PUBLIC,
            parameters: Vec::new(),
            return_type: TypeRef::VOID,
        }
    }

    /// A public instance initializer
    pub fn constructor() -> Self {
        Self::new("<init>").flags(AccessFlags::PUBLIC | AccessFlags::CONSTRUCTOR)
    }

    /// Replace the access flags
    pub fn flags(mut self, flags: AccessFlags) -> Self {
        self.access_flags = flags;
        self
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.access_flags = self.access_flags | AccessFlags::STATIC;
        self
    }

    /// Mark as abstract
    pub fn as_abstract(mut self) -> Self {
        self.access_flags = self.access_flags | AccessFlags::ABSTRACT;
        self
    }

    /// Add a parameter
    pub fn param(mut self, ty: TypeRef) -> Self {
        self.parameters.push(ty);
        self
    }

    /// Set return type
    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.return_type = ty;
        self
    }
}

/// Builder that defines classes and methods, then links them into a [`Runtime`]
#[derive(Debug)]
pub struct RuntimeBuilder {
    config: EngineConfig,
    classes: ClassRegistry,
    methods: MethodTable,
}

impl RuntimeBuilder {
    /// Builder with the default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            classes: ClassRegistry::new(),
            methods: MethodTable::new(),
        }
    }

    /// Builder with a validated configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Core class IDs
    pub fn core(&self) -> CoreClasses {
        *self.classes.core()
    }

    /// Classes defined so far
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Define a class or interface
    pub fn define_class(&mut self, def: ClassDef) -> Result<ClassId, LinkError> {
        if self.classes.get_class_by_name(&def.name).is_some() {
            return Err(LinkError::DuplicateClass(def.name));
        }
        let is_interface = def.access_flags.contains(AccessFlags::INTERFACE);

        let parent = if is_interface {
            None
        } else {
            let parent_id = def.parent.unwrap_or(self.classes.core().object);
            let parent = self
                .classes
                .get_class(parent_id)
                .ok_or(LinkError::UnknownClass(parent_id))?;
            if parent.is_interface() {
                return Err(LinkError::ExtendsInterface {
                    class: def.name,
                    parent: parent.name.clone(),
                });
            }
            Some(parent_id)
        };

        for &iface in &def.interfaces {
            let class = self
                .classes
                .get_class(iface)
                .ok_or(LinkError::UnknownClass(iface))?;
            if !class.is_interface() {
                return Err(LinkError::NotAnInterface {
                    class: def.name,
                    interface: class.name.clone(),
                });
            }
        }

        let inherited_fields = parent
            .and_then(|p| self.classes.get_class(p))
            .map_or(0, |p| p.field_count);

        let mut class = Class::new(
            self.classes.next_class_id(),
            def.name,
            def.loader,
            def.access_flags,
        );
        class.parent_id = parent;
        class.interfaces = def.interfaces;
        class.field_count = inherited_fields + def.fields;

        tracing::trace!(class = %class.name, id = ?class.id, "defined class");
        Ok(self.classes.register_class(class))
    }

    /// Define a method on `class`
    pub fn define_method(&mut self, class: ClassId, def: MethodDef) -> Result<MethodId, LinkError> {
        let owner = self
            .classes
            .get_class(class)
            .ok_or(LinkError::UnknownClass(class))?;

        if def.parameters.len() > self.config.max_arguments {
            return Err(LinkError::TooManyParameters {
                method: def.name,
                count: def.parameters.len(),
                max: self.config.max_arguments,
            });
        }
        if let Some(index) = def.parameters.iter().position(|p| *p == TypeRef::VOID) {
            return Err(LinkError::VoidParameter {
                method: def.name,
                index,
            });
        }

        let mut flags = def.access_flags;
        let is_static = flags.contains(AccessFlags::STATIC);
        if is_static && flags.contains(AccessFlags::ABSTRACT) {
            return Err(LinkError::InvalidFlags {
                method: def.name,
                reason: "static methods cannot be abstract",
            });
        }
        if flags.contains(AccessFlags::CONSTRUCTOR) && (is_static || owner.is_interface()) {
            return Err(LinkError::InvalidFlags {
                method: def.name,
                reason: "constructors must be instance methods of a class",
            });
        }

        let (kind, method_index) = if is_static {
            (InvokeKind::Static, 0)
        } else if flags.contains(AccessFlags::PRIVATE) || flags.contains(AccessFlags::CONSTRUCTOR) {
            (InvokeKind::Direct, 0)
        } else if owner.is_interface() {
            flags = flags | AccessFlags::ABSTRACT;
            let slot = owner
                .declared_methods
                .iter()
                .filter_map(|id| self.methods.get(*id))
                .filter(|m| m.kind == InvokeKind::Interface)
                .count();
            (InvokeKind::Interface, slot)
        } else {
            // Vtable slots are assigned in `build`
            (InvokeKind::Virtual, 0)
        };

        let id = self.methods.next_method_id();
        self.methods.push(Method {
            id,
            name: def.name,
            declaring_class: class,
            access_flags: flags,
            parameters: def.parameters,
            return_type: def.return_type,
            kind,
            method_index,
            pointer_size: self.config.pointer_size(),
        });
        if let Some(owner) = self.classes.get_class_mut(class) {
            owner.declared_methods.push(id);
        }
        Ok(id)
    }

    /// Compute dispatch tables and produce the runtime
    pub fn build(mut self, engine: Arc<dyn ExecutionEngine>) -> Runtime {
        self.link_vtables();
        self.link_iftables();
        tracing::debug!(
            classes = self.classes.iter().count(),
            methods = self.methods.len(),
            "linked runtime"
        );
        Runtime::new(self.classes, self.methods, self.config, engine)
    }

    fn link_vtables(&mut self) {
        // Superclasses always have lower IDs than their subclasses.
        let count = self.classes.next_class_id().index();
        for index in 0..count {
            let id = ClassId(index as u32);
            let Some(class) = self.classes.get_class(id) else {
                continue;
            };
            if class.is_interface() {
                continue;
            }

            let mut vtable = class
                .parent_id
                .and_then(|p| self.classes.get_class(p))
                .map(|p| p.vtable.clone())
                .unwrap_or_default();
            let declared = class.declared_methods.clone();

            for method_id in declared {
                let Some(method) = self.methods.get(method_id) else {
                    continue;
                };
                if method.kind != InvokeKind::Virtual {
                    continue;
                }
                let existing = vtable.methods.iter().position(|slot| {
                    self.methods
                        .get(*slot)
                        .is_some_and(|inherited| inherited.has_same_signature(method))
                });
                let slot = match existing {
                    Some(slot) => {
                        vtable.methods[slot] = method_id;
                        slot
                    }
                    None => vtable.add_method(method_id),
                };
                if let Some(method) = self.methods.get_mut(method_id) {
                    method.method_index = slot;
                }
            }

            if let Some(class) = self.classes.get_class_mut(id) {
                class.vtable = vtable;
            }
        }
    }

    fn link_iftables(&mut self) {
        let count = self.classes.next_class_id().index();
        for index in 0..count {
            let id = ClassId(index as u32);
            let Some(class) = self.classes.get_class(id) else {
                continue;
            };
            if class.is_interface() {
                continue;
            }

            let mut iftable = Vec::new();
            for iface in self.classes.all_interfaces(id) {
                let Some(interface) = self.classes.get_class(iface) else {
                    continue;
                };
                let methods = interface
                    .declared_methods
                    .iter()
                    .filter_map(|m| self.methods.get(*m))
                    .filter(|m| m.kind == InvokeKind::Interface)
                    .map(|imethod| {
                        class
                            .vtable
                            .methods
                            .iter()
                            .copied()
                            .find(|slot| {
                                self.methods.get(*slot).is_some_and(|m| {
                                    m.access_flags.contains(AccessFlags::PUBLIC)
                                        && m.has_same_signature(imethod)
                                })
                            })
                            .unwrap_or(imethod.id)
                    })
                    .collect();
                iftable.push(IfTableEntry {
                    interface_id: iface,
                    methods,
                });
            }

            if let Some(class) = self.classes.get_class_mut(id) {
                class.iftable = iftable;
            }
        }
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
