//! Identifiers, primitive kinds and the ABI width tag
//!
//! # Method handle encoding
//!
//! ```text
//! bits  0..32   method id
//! bits 32..40   ABI width tag (4 = 32-bit, 8 = 64-bit)
//! bits 40..64   reserved, must be zero
//! ```

use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Reference to a heap object owned by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(u32);

impl ObjectRef {
    /// Create from a heap slot index
    #[inline]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Heap slot index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Class identifier (index into the class registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    /// Registry index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Method identifier (index into the method table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u32);

impl MethodId {
    /// Method table index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Defining class loader identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LoaderId(pub u32);

impl LoaderId {
    /// The boot loader, which defines the core classes
    pub const BOOT: Self = Self(0);
    /// The default application loader
    pub const APP: Self = Self(1);
}

// ============================================================================
// Primitive kinds
// ============================================================================

/// Primitive kinds of the managed type system, plus `void`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `boolean`
    Boolean,
    /// `byte` (signed 8-bit)
    Byte,
    /// `char` (unsigned 16-bit)
    Char,
    /// `short` (signed 16-bit)
    Short,
    /// `int` (signed 32-bit)
    Int,
    /// `long` (signed 64-bit)
    Long,
    /// `float` (IEEE 754 single)
    Float,
    /// `double` (IEEE 754 double)
    Double,
    /// `void` (return type only)
    Void,
}

impl PrimitiveKind {
    /// The eight value-carrying kinds, in descriptor order
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Single-character type descriptor
    pub const fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
            PrimitiveKind::Void => 'V',
        }
    }

    /// Parse a single-character type descriptor
    pub fn from_descriptor(c: char) -> Option<Self> {
        match c {
            'Z' => Some(PrimitiveKind::Boolean),
            'B' => Some(PrimitiveKind::Byte),
            'C' => Some(PrimitiveKind::Char),
            'S' => Some(PrimitiveKind::Short),
            'I' => Some(PrimitiveKind::Int),
            'J' => Some(PrimitiveKind::Long),
            'F' => Some(PrimitiveKind::Float),
            'D' => Some(PrimitiveKind::Double),
            'V' => Some(PrimitiveKind::Void),
            _ => None,
        }
    }

    /// Parse a descriptor supplied by an embedder.
    ///
    /// # Panics
    /// An unrecognized descriptor is a caller bug, not a managed failure.
    pub fn expect_descriptor(c: char) -> Self {
        match Self::from_descriptor(c) {
            Some(kind) => kind,
            None => panic!("contract violation: unrecognized primitive descriptor {:?}", c),
        }
    }

    /// Source-level name (`int`, `boolean`, ...)
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Void => "void",
        }
    }

    /// Name of the canonical wrapper class; `None` for `void`
    pub const fn boxed_class_name(self) -> Option<&'static str> {
        match self {
            PrimitiveKind::Boolean => Some("java.lang.Boolean"),
            PrimitiveKind::Byte => Some("java.lang.Byte"),
            PrimitiveKind::Char => Some("java.lang.Character"),
            PrimitiveKind::Short => Some("java.lang.Short"),
            PrimitiveKind::Int => Some("java.lang.Integer"),
            PrimitiveKind::Long => Some("java.lang.Long"),
            PrimitiveKind::Float => Some("java.lang.Float"),
            PrimitiveKind::Double => Some("java.lang.Double"),
            PrimitiveKind::Void => None,
        }
    }

    /// Whether this kind takes part in the numeric widening lattice
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::Short
                | PrimitiveKind::Int
                | PrimitiveKind::Long
                | PrimitiveKind::Float
                | PrimitiveKind::Double
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// ABI width
// ============================================================================

/// Pointer width of the calling convention a method was compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerSize {
    /// 32-bit calling convention
    K32,
    /// 64-bit calling convention
    K64,
}

impl PointerSize {
    /// Pointer width of the host
    #[cfg(target_pointer_width = "64")]
    pub const NATIVE: Self = PointerSize::K64;
    /// Pointer width of the host
    #[cfg(not(target_pointer_width = "64"))]
    pub const NATIVE: Self = PointerSize::K32;

    /// Width in bytes, also used as the handle tag
    pub const fn bytes(self) -> u32 {
        match self {
            PointerSize::K32 => 4,
            PointerSize::K64 => 8,
        }
    }

    /// Width in bits
    pub const fn bits(self) -> u32 {
        self.bytes() * 8
    }

    /// Decode a width tag (in bytes)
    pub const fn from_bytes(bytes: u32) -> Option<Self> {
        match bytes {
            4 => Some(PointerSize::K32),
            8 => Some(PointerSize::K64),
            _ => None,
        }
    }

    /// Decode a width in bits
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(PointerSize::K32),
            64 => Some(PointerSize::K64),
            _ => None,
        }
    }
}

// ============================================================================
// Method handle
// ============================================================================

const HANDLE_ID_MASK: u64 = 0xFFFF_FFFF;
const HANDLE_WIDTH_SHIFT: u64 = 32;
const HANDLE_WIDTH_MASK: u64 = 0xFF;
const HANDLE_RESERVED_SHIFT: u64 = 40;

/// Opaque method handle issued to embedders.
///
/// Two construction paths exist: [`MethodHandle::from_method`] for method
/// objects the runtime already holds, and [`MethodHandle::from_raw`] for ids
/// round-tripped through foreign code. Both decode the same way.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MethodHandle(u64);

impl MethodHandle {
    /// Build a handle for a method compiled for `pointer_size`
    pub const fn from_method(id: MethodId, pointer_size: PointerSize) -> Self {
        Self((id.0 as u64) | ((pointer_size.bytes() as u64) << HANDLE_WIDTH_SHIFT))
    }

    /// Wrap an externally issued handle value. No validation happens until decode.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle value for passing across the foreign boundary
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Method id encoded in the handle
    pub const fn method_id(self) -> MethodId {
        MethodId((self.0 & HANDLE_ID_MASK) as u32)
    }

    /// Decode the width tag, or `None` if it is not a recognized width
    pub const fn try_pointer_size(self) -> Option<PointerSize> {
        if self.0 >> HANDLE_RESERVED_SHIFT != 0 {
            return None;
        }
        PointerSize::from_bytes(((self.0 >> HANDLE_WIDTH_SHIFT) & HANDLE_WIDTH_MASK) as u32)
    }

    /// Decode the width tag.
    ///
    /// # Panics
    /// An unrecognized width tag means the embedder forged or corrupted the handle.
    pub fn pointer_size(self) -> PointerSize {
        match self.try_pointer_size() {
            Some(size) => size,
            None => panic!(
                "contract violation: unrecognized ABI width tag in method handle {:#018x}",
                self.0
            ),
        }
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodHandle")
            .field("method", &self.method_id())
            .field("width", &self.try_pointer_size())
            .finish()
    }
}
