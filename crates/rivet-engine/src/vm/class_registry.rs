//! Class registry and subtype queries

use rustc_hash::FxHashMap;

use rivet_sdk::{ClassId, LoaderId, PrimitiveKind};

use crate::vm::method::AccessFlags;
use crate::vm::object::Class;

/// Name of the root class
pub const OBJECT_CLASS: &str = "java.lang.Object";
/// Name of the root throwable class
pub const THROWABLE_CLASS: &str = "java.lang.Throwable";
/// Name of the numeric box superclass
pub const NUMBER_CLASS: &str = "java.lang.Number";
/// Name of the reference array class used for reflective argument lists
pub const OBJECT_ARRAY_CLASS: &str = "java.lang.Object[]";

/// IDs of the classes the bridge itself relies on
#[derive(Debug, Clone, Copy)]
pub struct CoreClasses {
    /// `java.lang.Object`
    pub object: ClassId,
    /// `java.lang.Throwable`
    pub throwable: ClassId,
    /// `java.lang.Number`
    pub number: ClassId,
    /// `java.lang.Object[]`
    pub object_array: ClassId,
    boxes: [ClassId; 8],
}

impl CoreClasses {
    /// Wrapper class for a primitive kind; `None` for `void`
    pub fn box_class(&self, kind: PrimitiveKind) -> Option<ClassId> {
        PrimitiveKind::ALL
            .iter()
            .position(|k| *k == kind)
            .map(|i| self.boxes[i])
    }
}

/// Registry of loaded classes
#[derive(Debug)]
pub struct ClassRegistry {
    /// Classes indexed by ID
    classes: Vec<Class>,
    /// Class name to ID mapping
    name_to_id: FxHashMap<String, ClassId>,
    core: CoreClasses,
}

impl ClassRegistry {
    /// Create a registry holding the boot classes
    pub fn new() -> Self {
        let mut registry = Self {
            classes: Vec::new(),
            name_to_id: FxHashMap::default(),
            core: CoreClasses {
                object: ClassId(0),
                throwable: ClassId(0),
                number: ClassId(0),
                object_array: ClassId(0),
                boxes: [ClassId(0); 8],
            },
        };

        let public = AccessFlags::PUBLIC;
        let object = registry.register_boot(OBJECT_CLASS, None, public);
        let throwable = registry.register_boot(THROWABLE_CLASS, Some(object), public);
        let number = registry.register_boot(
            NUMBER_CLASS,
            Some(object),
            public | AccessFlags::ABSTRACT,
        );
        let object_array = registry.register_boot(
            OBJECT_ARRAY_CLASS,
            Some(object),
            public | AccessFlags::FINAL,
        );

        let mut boxes = [ClassId(0); 8];
        for (slot, kind) in PrimitiveKind::ALL.iter().enumerate() {
            let parent = if kind.is_numeric() { number } else { object };
            let name = kind.boxed_class_name().unwrap_or(OBJECT_CLASS);
            let id = registry.register_boot(name, Some(parent), public | AccessFlags::FINAL);
            if let Some(class) = registry.get_class_mut(id) {
                class.boxed_kind = Some(*kind);
            }
            boxes[slot] = id;
        }

        registry.core = CoreClasses {
            object,
            throwable,
            number,
            object_array,
            boxes,
        };
        for class in &registry.classes {
            class.mark_initialized();
        }
        registry
    }

    fn register_boot(
        &mut self,
        name: &str,
        parent: Option<ClassId>,
        flags: AccessFlags,
    ) -> ClassId {
        let mut class = Class::new(self.next_class_id(), name.to_string(), LoaderId::BOOT, flags);
        class.parent_id = parent;
        self.register_class(class)
    }

    /// Register a new class; its ID must be `next_class_id()`
    pub fn register_class(&mut self, class: Class) -> ClassId {
        debug_assert_eq!(class.id, self.next_class_id());
        let id = class.id;
        let name = class.name.clone();

        self.classes.push(class);
        self.name_to_id.insert(name, id);

        id
    }

    /// Core class IDs
    pub fn core(&self) -> &CoreClasses {
        &self.core
    }

    /// Get class by ID
    pub fn get_class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id.index())
    }

    /// Get mutable class by ID
    pub fn get_class_mut(&mut self, id: ClassId) -> Option<&mut Class> {
        self.classes.get_mut(id.index())
    }

    /// Get class by name
    pub fn get_class_by_name(&self, name: &str) -> Option<&Class> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.classes.get(id.index()))
    }

    /// Get next available class ID
    pub fn next_class_id(&self) -> ClassId {
        ClassId(self.classes.len() as u32)
    }

    /// Class name for diagnostics
    pub fn class_name(&self, id: ClassId) -> &str {
        self.get_class(id).map(|c| c.name.as_str()).unwrap_or("<unknown class>")
    }

    /// Iterate over all classes
    pub fn iter(&self) -> impl Iterator<Item = &Class> {
        self.classes.iter()
    }

    // ===== Subtyping =====

    /// Check if a class is `super_class_id` or inherits from it through superclasses
    pub fn is_subclass_of(&self, sub_class_id: ClassId, super_class_id: ClassId) -> bool {
        let mut current = Some(sub_class_id);
        while let Some(id) = current {
            if id == super_class_id {
                return true;
            }
            current = self.get_class(id).and_then(|c| c.parent_id);
        }
        false
    }

    /// Check if a class (or interface) implements `interface_id`, directly or inherited
    pub fn implements(&self, class_id: ClassId, interface_id: ClassId) -> bool {
        let mut current = Some(class_id);
        while let Some(id) = current {
            let Some(class) = self.get_class(id) else {
                return false;
            };
            for &iface in &class.interfaces {
                if iface == interface_id || self.implements(iface, interface_id) {
                    return true;
                }
            }
            current = class.parent_id;
        }
        false
    }

    /// Check if a value of class `src` may be stored where `dst` is expected
    pub fn is_assignable_from(&self, dst: ClassId, src: ClassId) -> bool {
        if dst == src || dst == self.core.object {
            return true;
        }
        match self.get_class(dst) {
            Some(class) if class.is_interface() => self.implements(src, dst),
            Some(_) => self.is_subclass_of(src, dst),
            None => false,
        }
    }

    /// All interfaces implemented by a class, transitively, superclass interfaces first
    pub fn all_interfaces(&self, class_id: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let mut current = Some(class_id);
        while let Some(id) = current {
            chain.push(id);
            current = self.get_class(id).and_then(|c| c.parent_id);
        }

        let mut result = Vec::new();
        for &id in chain.iter().rev() {
            if let Some(class) = self.get_class(id) {
                for &iface in &class.interfaces {
                    self.collect_interface(iface, &mut result);
                }
            }
        }
        result
    }

    fn collect_interface(&self, iface: ClassId, out: &mut Vec<ClassId>) {
        if out.contains(&iface) {
            return;
        }
        if let Some(class) = self.get_class(iface) {
            for &parent in &class.interfaces {
                self.collect_interface(parent, out);
            }
        }
        out.push(iface);
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn define(registry: &mut ClassRegistry, name: &str, parent: Option<ClassId>) -> ClassId {
        let mut class = Class::new(
            registry.next_class_id(),
            name.to_string(),
            LoaderId(1),
            AccessFlags::PUBLIC,
        );
        class.parent_id = parent.or(Some(registry.core().object));
        registry.register_class(class)
    }

    fn define_interface(
        registry: &mut ClassRegistry,
        name: &str,
        parents: Vec<ClassId>,
    ) -> ClassId {
        let mut class = Class::new(
            registry.next_class_id(),
            name.to_string(),
            LoaderId(1),
            AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT,
        );
        class.interfaces = parents;
        registry.register_class(class)
    }

    #[test]
    fn test_boot_classes() {
        let registry = ClassRegistry::new();
        let core = *registry.core();

        assert_eq!(registry.class_name(core.object), OBJECT_CLASS);
        let int_box = core.box_class(PrimitiveKind::Int).unwrap();
        assert_eq!(registry.class_name(int_box), "java.lang.Integer");
        assert_eq!(
            registry.get_class(int_box).unwrap().boxed_kind,
            Some(PrimitiveKind::Int)
        );
        assert!(registry.is_subclass_of(int_box, core.number));

        let bool_box = core.box_class(PrimitiveKind::Boolean).unwrap();
        assert!(!registry.is_subclass_of(bool_box, core.number));
        assert!(core.box_class(PrimitiveKind::Void).is_none());
        assert!(registry.get_class(core.object).unwrap().is_initialized());
    }

    #[test]
    fn test_get_class_by_name() {
        let mut registry = ClassRegistry::new();
        let id = define(&mut registry, "app.Point", None);

        let retrieved = registry.get_class_by_name("app.Point").unwrap();
        assert_eq!(retrieved.id, id);
        assert!(registry.get_class_by_name("app.Missing").is_none());
    }

    #[test]
    fn test_deep_inheritance_chain() {
        let mut registry = ClassRegistry::new();
        let a = define(&mut registry, "A", None);
        let b = define(&mut registry, "B", Some(a));
        let c = define(&mut registry, "C", Some(b));

        assert!(registry.is_subclass_of(c, a));
        assert!(registry.is_subclass_of(c, c));
        assert!(!registry.is_subclass_of(a, c));
        assert!(registry.is_assignable_from(registry.core().object, c));
    }

    #[test]
    fn test_interfaces_are_transitive() {
        let mut registry = ClassRegistry::new();
        let shape = define_interface(&mut registry, "Shape", vec![]);
        let polygon = define_interface(&mut registry, "Polygon", vec![shape]);
        let base = define(&mut registry, "Base", None);
        let square = define(&mut registry, "Square", Some(base));
        registry.get_class_mut(square).unwrap().interfaces = vec![polygon];
        let tiny = define(&mut registry, "TinySquare", Some(square));

        assert!(registry.implements(tiny, shape));
        assert!(registry.is_assignable_from(shape, tiny));
        assert!(registry.is_assignable_from(polygon, square));
        assert!(!registry.is_assignable_from(shape, base));
        assert_eq!(registry.all_interfaces(tiny), vec![shape, polygon]);
    }
}
