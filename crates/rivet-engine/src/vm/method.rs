//! Method descriptors and the method table
//!
//! A [`Method`] is immutable once linked. The bridge borrows descriptors from
//! the [`MethodTable`] and never mutates them.

use rivet_sdk::{ClassId, MethodId, PointerSize, PrimitiveKind};

/// Access and property flags for classes and methods (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessFlags(u32);

impl AccessFlags {
    /// No flags (package-private)
    pub const NONE: Self = Self(0x0000);
    /// Visible everywhere
    pub const PUBLIC: Self = Self(0x0001);
    /// Visible only inside the declaring class
    pub const PRIVATE: Self = Self(0x0002);
    /// Visible to the package and to subclasses
    pub const PROTECTED: Self = Self(0x0004);
    /// Static member
    pub const STATIC: Self = Self(0x0008);
    /// Final member or class
    pub const FINAL: Self = Self(0x0010);
    /// Interface class
    pub const INTERFACE: Self = Self(0x0200);
    /// Abstract method or class
    pub const ABSTRACT: Self = Self(0x0400);
    /// Instance initializer
    pub const CONSTRUCTOR: Self = Self(0x0001_0000);

    /// Create from raw bits
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Check if all flags of `other` are set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of flags
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Remove flags
    pub const fn difference(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Access level keyword used in diagnostics
    pub const fn access_name(&self) -> &'static str {
        if self.contains(Self::PUBLIC) {
            "public"
        } else if self.contains(Self::PRIVATE) {
            "private"
        } else if self.contains(Self::PROTECTED) {
            "protected"
        } else {
            "package-private"
        }
    }
}

impl std::ops::BitOr for AccessFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Formal parameter or return type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Primitive kind (or `void` for returns)
    Primitive(PrimitiveKind),
    /// Reference to an instance of the class (or a subtype)
    Reference(ClassId),
}

impl TypeRef {
    /// `void`
    pub const VOID: Self = TypeRef::Primitive(PrimitiveKind::Void);

    /// Primitive kind, if primitive
    pub const fn primitive(&self) -> Option<PrimitiveKind> {
        match self {
            TypeRef::Primitive(kind) => Some(*kind),
            TypeRef::Reference(_) => None,
        }
    }
}

/// How the target implementation is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    /// No receiver, no dispatch
    Static,
    /// Receiver required, no dispatch (private methods, constructors)
    Direct,
    /// Dispatch through the receiver's vtable
    Virtual,
    /// Dispatch through the receiver's interface table
    Interface,
}

impl InvokeKind {
    /// Whether a receiver is required
    pub const fn needs_receiver(&self) -> bool {
        !matches!(self, InvokeKind::Static)
    }
}

/// Linked method descriptor
#[derive(Debug, Clone)]
pub struct Method {
    /// Method ID
    pub id: MethodId,
    /// Simple name (`<init>` for constructors)
    pub name: String,
    /// Declaring class
    pub declaring_class: ClassId,
    /// Access flags
    pub access_flags: AccessFlags,
    /// Formal parameter types, in order
    pub parameters: Vec<TypeRef>,
    /// Return type
    pub return_type: TypeRef,
    /// Invocation kind, derived at link time
    pub kind: InvokeKind,
    /// Vtable slot (virtual) or interface method slot (interface); 0 otherwise
    pub method_index: usize,
    /// ABI width the method was compiled for
    pub pointer_size: PointerSize,
}

impl Method {
    /// Whether the method is static
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(AccessFlags::STATIC)
    }

    /// Whether the method is private
    pub fn is_private(&self) -> bool {
        self.access_flags.contains(AccessFlags::PRIVATE)
    }

    /// Whether the method is an instance initializer
    pub fn is_constructor(&self) -> bool {
        self.access_flags.contains(AccessFlags::CONSTRUCTOR)
    }

    /// Whether the method has no body
    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(AccessFlags::ABSTRACT)
    }

    /// Whether the method is selected without looking at the receiver
    pub fn is_direct(&self) -> bool {
        matches!(self.kind, InvokeKind::Static | InvokeKind::Direct)
    }

    /// Same name, parameters and return type
    pub fn has_same_signature(&self, other: &Method) -> bool {
        self.name == other.name
            && self.parameters == other.parameters
            && self.return_type == other.return_type
    }

    /// Parameter count
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Shorty descriptor: return type then parameters, `L` for references
    pub fn shorty(&self) -> String {
        std::iter::once(self.return_type)
            .chain(self.parameters.iter().copied())
            .map(|ty| match ty {
                TypeRef::Primitive(kind) => kind.descriptor(),
                TypeRef::Reference(_) => 'L',
            })
            .collect()
    }
}

/// Method table: descriptors by ID
#[derive(Debug, Default)]
pub struct MethodTable {
    methods: Vec<Method>,
}

impl MethodTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Next available method ID
    pub fn next_method_id(&self) -> MethodId {
        MethodId(self.methods.len() as u32)
    }

    /// Register a descriptor; its ID must be `next_method_id()`
    pub(crate) fn push(&mut self, method: Method) -> MethodId {
        debug_assert_eq!(method.id, self.next_method_id());
        let id = method.id;
        self.methods.push(method);
        id
    }

    /// Get method by ID
    pub fn get(&self, id: MethodId) -> Option<&Method> {
        self.methods.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: MethodId) -> Option<&mut Method> {
        self.methods.get_mut(id.index())
    }

    /// Number of methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Iterate over all methods
    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, parameters: Vec<TypeRef>, return_type: TypeRef) -> Method {
        Method {
            id: MethodId(0),
            name: name.to_string(),
            declaring_class: ClassId(0),
            access_flags: AccessFlags::PUBLIC,
            parameters,
            return_type,
            kind: InvokeKind::Virtual,
            method_index: 0,
            pointer_size: PointerSize::NATIVE,
        }
    }

    #[test]
    fn test_access_flags() {
        let flags = AccessFlags::PUBLIC | AccessFlags::STATIC;
        assert!(flags.contains(AccessFlags::PUBLIC));
        assert!(flags.contains(AccessFlags::STATIC));
        assert!(!flags.contains(AccessFlags::PRIVATE));
        assert_eq!(flags.difference(AccessFlags::STATIC), AccessFlags::PUBLIC);
        assert_eq!(flags.bits(), 0x0009);
    }

    #[test]
    fn test_access_name() {
        assert_eq!(AccessFlags::PUBLIC.access_name(), "public");
        assert_eq!(AccessFlags::PRIVATE.access_name(), "private");
        assert_eq!(AccessFlags::PROTECTED.access_name(), "protected");
        assert_eq!(AccessFlags::NONE.access_name(), "package-private");
        assert_eq!(AccessFlags::STATIC.access_name(), "package-private");
    }

    #[test]
    fn test_shorty() {
        let m = method(
            "f",
            vec![
                TypeRef::Primitive(PrimitiveKind::Int),
                TypeRef::Reference(ClassId(3)),
                TypeRef::Primitive(PrimitiveKind::Double),
            ],
            TypeRef::Primitive(PrimitiveKind::Long),
        );
        assert_eq!(m.shorty(), "JILD");
        assert_eq!(m.arity(), 3);
    }

    #[test]
    fn test_signature_comparison() {
        let int = TypeRef::Primitive(PrimitiveKind::Int);
        let a = method("f", vec![int], int);
        let b = method("f", vec![int], int);
        let c = method("f", vec![int], TypeRef::VOID);
        let d = method("g", vec![int], int);
        assert!(a.has_same_signature(&b));
        assert!(!a.has_same_signature(&c));
        assert!(!a.has_same_signature(&d));
    }

    #[test]
    fn test_method_table() {
        let mut table = MethodTable::new();
        assert!(table.is_empty());
        let id = table.push(method("f", vec![], TypeRef::VOID));
        assert_eq!(id, MethodId(0));
        assert_eq!(table.next_method_id(), MethodId(1));
        assert_eq!(table.get(id).unwrap().name, "f");
        assert!(table.get(MethodId(5)).is_none());
    }
}
