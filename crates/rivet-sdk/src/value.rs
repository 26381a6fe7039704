//! Argument and result values at the invocation boundary
//!
//! Three caller shapes are supported:
//! - [`Value`]: a tagged union, one variant per primitive kind plus `void`
//!   and object references
//! - [`RawValue`]: an untyped 64-bit word, interpreted according to the
//!   formal parameter it is bound to
//! - [`VarArgs`]: a stream of words after C default argument promotions
//!   (`boolean`/`byte`/`char`/`short` travel as `int`, `float` as `double`)

use std::collections::VecDeque;
use std::fmt;

use crate::types::{ObjectRef, PrimitiveKind};

// ============================================================================
// Tagged value
// ============================================================================

/// Tagged value for arguments and results
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `char` (UTF-16 code unit)
    Char(u16),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// No value (result of a `void` method)
    Void,
    /// Object reference, `None` is null
    Object(Option<ObjectRef>),
}

impl Value {
    /// The null reference
    #[inline]
    pub const fn null() -> Self {
        Value::Object(None)
    }

    /// Primitive kind of this value; `None` for references
    pub const fn kind(&self) -> Option<PrimitiveKind> {
        match self {
            Value::Boolean(_) => Some(PrimitiveKind::Boolean),
            Value::Byte(_) => Some(PrimitiveKind::Byte),
            Value::Char(_) => Some(PrimitiveKind::Char),
            Value::Short(_) => Some(PrimitiveKind::Short),
            Value::Int(_) => Some(PrimitiveKind::Int),
            Value::Long(_) => Some(PrimitiveKind::Long),
            Value::Float(_) => Some(PrimitiveKind::Float),
            Value::Double(_) => Some(PrimitiveKind::Double),
            Value::Void => Some(PrimitiveKind::Void),
            Value::Object(_) => None,
        }
    }

    /// Check if this is an object reference (including null)
    #[inline]
    pub const fn is_reference(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Check if this is the null reference
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Object(None))
    }

    /// Get the reference if this is an object value
    pub const fn as_object(&self) -> Option<Option<ObjectRef>> {
        match self {
            Value::Object(obj) => Some(*obj),
            _ => None,
        }
    }

    /// Get as i32 if this is an int
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as i64 if this is a long
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as f64 if this is a double
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Encode into an untyped word
    pub fn to_raw(self) -> RawValue {
        match self {
            Value::Boolean(v) => RawValue::boolean(v),
            Value::Byte(v) => RawValue::byte(v),
            Value::Char(v) => RawValue::char(v),
            Value::Short(v) => RawValue::short(v),
            Value::Int(v) => RawValue::int(v),
            Value::Long(v) => RawValue::long(v),
            Value::Float(v) => RawValue::float(v),
            Value::Double(v) => RawValue::double(v),
            Value::Void => RawValue::default(),
            Value::Object(obj) => RawValue::object(obj),
        }
    }

    /// Interpret an untyped word as a primitive of `kind`
    pub fn from_raw(kind: PrimitiveKind, raw: RawValue) -> Self {
        match kind {
            PrimitiveKind::Boolean => Value::Boolean(raw.as_boolean()),
            PrimitiveKind::Byte => Value::Byte(raw.as_byte()),
            PrimitiveKind::Char => Value::Char(raw.as_char()),
            PrimitiveKind::Short => Value::Short(raw.as_short()),
            PrimitiveKind::Int => Value::Int(raw.as_int()),
            PrimitiveKind::Long => Value::Long(raw.as_long()),
            PrimitiveKind::Float => Value::Float(raw.as_float()),
            PrimitiveKind::Double => Value::Double(raw.as_double()),
            PrimitiveKind::Void => Value::Void,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Void
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "(byte){}", v),
            Value::Char(v) => match char::from_u32(*v as u32) {
                Some(c) if !c.is_control() => write!(f, "'{}'", c),
                _ => write!(f, "'\\u{:04x}'", v),
            },
            Value::Short(v) => write!(f, "(short){}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Float(v) => write!(f, "{}f", v),
            Value::Double(v) => write!(f, "{}d", v),
            Value::Void => f.write_str("void"),
            Value::Object(None) => f.write_str("null"),
            Value::Object(Some(obj)) => write!(f, "{}", obj),
        }
    }
}

// ============================================================================
// Untyped word
// ============================================================================

/// Untyped 64-bit argument word.
///
/// Carries no tag: the reader decides how to interpret it from the formal
/// parameter type. Object references are stored as `index + 1`, zero is null.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct RawValue(u64);

impl RawValue {
    /// Create from raw bits
    #[inline(always)]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Get raw bits
    #[inline(always)]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Encode a boolean
    pub const fn boolean(v: bool) -> Self {
        Self(v as u64)
    }

    /// Encode a byte
    pub const fn byte(v: i8) -> Self {
        Self(v as i64 as u64)
    }

    /// Encode a char
    pub const fn char(v: u16) -> Self {
        Self(v as u64)
    }

    /// Encode a short
    pub const fn short(v: i16) -> Self {
        Self(v as i64 as u64)
    }

    /// Encode an int
    pub const fn int(v: i32) -> Self {
        Self(v as i64 as u64)
    }

    /// Encode a long
    pub const fn long(v: i64) -> Self {
        Self(v as u64)
    }

    /// Encode a float
    pub fn float(v: f32) -> Self {
        Self(v.to_bits() as u64)
    }

    /// Encode a double
    pub fn double(v: f64) -> Self {
        Self(v.to_bits())
    }

    /// Encode an object reference
    pub const fn object(obj: Option<ObjectRef>) -> Self {
        match obj {
            Some(r) => Self(r.index() as u64 + 1),
            None => Self(0),
        }
    }

    /// Read the low byte as a boolean
    pub const fn as_boolean(self) -> bool {
        (self.0 & 0xFF) != 0
    }

    /// Read the low 8 bits
    pub const fn as_byte(self) -> i8 {
        self.0 as u8 as i8
    }

    /// Read the low 16 bits, unsigned
    pub const fn as_char(self) -> u16 {
        self.0 as u16
    }

    /// Read the low 16 bits, signed
    pub const fn as_short(self) -> i16 {
        self.0 as u16 as i16
    }

    /// Read the low 32 bits
    pub const fn as_int(self) -> i32 {
        self.0 as u32 as i32
    }

    /// Read all 64 bits as a long
    pub const fn as_long(self) -> i64 {
        self.0 as i64
    }

    /// Read the low 32 bits as a float
    pub fn as_float(self) -> f32 {
        f32::from_bits(self.0 as u32)
    }

    /// Read all 64 bits as a double
    pub fn as_double(self) -> f64 {
        f64::from_bits(self.0)
    }

    /// Read an object reference
    ///
    /// # Panics
    /// If the word is not an encoded reference.
    pub fn as_object(self) -> Option<ObjectRef> {
        match self.0 {
            0 => None,
            n => match u32::try_from(n - 1) {
                Ok(index) => Some(ObjectRef::from_index(index)),
                Err(_) => panic!("contract violation: {:#x} is not an object reference", n),
            },
        }
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawValue({:#x})", self.0)
    }
}

// ============================================================================
// Variadic stream
// ============================================================================

/// Argument stream in the platform variadic calling convention.
///
/// Words are stored after default argument promotion, so a `short` pushed
/// here is indistinguishable from an `int` with the same value. Readers
/// narrow back to the formal parameter kind.
#[derive(Debug, Clone, Default)]
pub struct VarArgs {
    words: VecDeque<u64>,
}

impl VarArgs {
    /// Create an empty stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an int-class word (also used for promoted boolean/byte/char/short)
    pub fn push_int(&mut self, v: i32) -> &mut Self {
        self.words.push_back(v as i64 as u64);
        self
    }

    /// Push a boolean (promoted to int)
    pub fn push_boolean(&mut self, v: bool) -> &mut Self {
        self.push_int(v as i32)
    }

    /// Push a char (promoted to int)
    pub fn push_char(&mut self, v: u16) -> &mut Self {
        self.push_int(v as i32)
    }

    /// Push a long
    pub fn push_long(&mut self, v: i64) -> &mut Self {
        self.words.push_back(v as u64);
        self
    }

    /// Push a float (promoted to double)
    pub fn push_float(&mut self, v: f32) -> &mut Self {
        self.push_double(v as f64)
    }

    /// Push a double
    pub fn push_double(&mut self, v: f64) -> &mut Self {
        self.words.push_back(v.to_bits());
        self
    }

    /// Push an object reference
    pub fn push_object(&mut self, obj: Option<ObjectRef>) -> &mut Self {
        self.words.push_back(RawValue::object(obj).to_bits());
        self
    }

    /// Number of words not yet consumed
    pub fn remaining(&self) -> usize {
        self.words.len()
    }

    /// Consume the next integer-class word, sign-extended
    pub fn next_integral(&mut self) -> Option<i64> {
        self.words.pop_front().map(|w| w as i64)
    }

    /// Consume the next double word
    pub fn next_double(&mut self) -> Option<f64> {
        self.words.pop_front().map(f64::from_bits)
    }

    /// Consume the next reference word
    pub fn next_object(&mut self) -> Option<Option<ObjectRef>> {
        self.words.pop_front().map(|w| RawValue::from_bits(w).as_object())
    }
}
