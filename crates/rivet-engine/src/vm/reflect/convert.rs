//! Primitive conversion, boxing and unboxing
//!
//! ## Widening lattice
//!
//! | from \ to | Z | B | C | S | I | J | F | D |
//! |-----------|---|---|---|---|---|---|---|---|
//! | boolean   | ✓ |   |   |   |   |   |   |   |
//! | byte      |   | ✓ |   | ✓ | ✓ | ✓ | ✓ | ✓ |
//! | char      |   |   | ✓ |   | ✓ | ✓ | ✓ | ✓ |
//! | short     |   |   |   | ✓ | ✓ | ✓ | ✓ | ✓ |
//! | int       |   |   |   |   | ✓ | ✓ | ✓ | ✓ |
//! | long      |   |   |   |   |   | ✓ | ✓ | ✓ |
//! | float     |   |   |   |   |   |   | ✓ | ✓ |
//! | double    |   |   |   |   |   |   |   | ✓ |
//!
//! Nothing narrows. `boolean` and `char` never convert to or from anything
//! but themselves, except that `char` widens to `int` and above.

use rivet_sdk::{InvokeError, ObjectRef, PrimitiveKind, Value};
use thiserror::Error;

use crate::vm::method::TypeRef;
use crate::vm::runtime::Runtime;

/// A value that cannot be converted to the requested type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Couldn't convert {from} to {to}")]
pub struct ConversionError {
    /// Source type name (`null` for a null reference)
    pub from: String,
    /// Destination type name
    pub to: String,
}

impl ConversionError {
    pub(crate) fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Report as a failure to convert argument `index`
    pub fn for_argument(self, index: usize) -> InvokeError {
        InvokeError::ArgumentTypeMismatch {
            index,
            expected: self.to,
            got: self.from,
        }
    }

    /// Report as a failure to convert a return value
    pub fn for_result(self) -> InvokeError {
        InvokeError::ResultTypeMismatch {
            expected: self.to,
            got: self.from,
        }
    }
}

/// Whether `src` is `dst` or widens to it
pub fn is_widening(src: PrimitiveKind, dst: PrimitiveKind) -> bool {
    use PrimitiveKind::*;

    if src == dst {
        return src != Void;
    }
    match dst {
        Short => matches!(src, Byte),
        Int => matches!(src, Byte | Char | Short),
        Long => matches!(src, Byte | Char | Short | Int),
        Float => matches!(src, Byte | Char | Short | Int | Long),
        Double => matches!(src, Byte | Char | Short | Int | Long | Float),
        Boolean | Byte | Char | Void => false,
    }
}

/// Convert `value` of kind `src_kind` to `dst_kind` along the widening lattice.
///
/// # Panics
/// If `value` is not a primitive of `src_kind`.
pub fn convert_primitive_value(
    src_kind: PrimitiveKind,
    dst_kind: PrimitiveKind,
    value: Value,
) -> Result<Value, ConversionError> {
    if value.kind() != Some(src_kind) {
        panic!(
            "contract violation: value {} is not of kind {}",
            value, src_kind
        );
    }
    if !is_widening(src_kind, dst_kind) {
        return Err(ConversionError::new(src_kind.name(), dst_kind.name()));
    }
    if src_kind == dst_kind {
        return Ok(value);
    }

    let widened = match (value, dst_kind) {
        (Value::Byte(v), PrimitiveKind::Short) => Value::Short(v as i16),
        (v, PrimitiveKind::Int) => Value::Int(integral(v) as i32),
        (v, PrimitiveKind::Long) => Value::Long(integral(v)),
        (v, PrimitiveKind::Float) => Value::Float(integral(v) as f32),
        (Value::Float(v), PrimitiveKind::Double) => Value::Double(v as f64),
        (v, PrimitiveKind::Double) => Value::Double(integral(v) as f64),
        _ => return Err(ConversionError::new(src_kind.name(), dst_kind.name())),
    };
    Ok(widened)
}

/// Non-failing conversion: the widened value, or `None` if not convertible
pub fn convert_primitive_value_no_throw(
    src_kind: PrimitiveKind,
    dst_kind: PrimitiveKind,
    value: Value,
) -> Option<Value> {
    convert_primitive_value(src_kind, dst_kind, value).ok()
}

fn integral(value: Value) -> i64 {
    match value {
        Value::Byte(v) => v as i64,
        Value::Char(v) => v as i64,
        Value::Short(v) => v as i64,
        Value::Int(v) => v as i64,
        Value::Long(v) => v,
        _ => 0,
    }
}

/// Box a primitive into its wrapper object; `void` boxes to null.
///
/// # Panics
/// If `value` is not a primitive of `kind`.
pub fn box_primitive(runtime: &Runtime, kind: PrimitiveKind, value: Value) -> Option<ObjectRef> {
    if value.kind() != Some(kind) {
        panic!("contract violation: cannot box {} as {}", value, kind);
    }
    let class = runtime.classes().core().box_class(kind)?;
    Some(runtime.heap().alloc_boxed(class, value))
}

/// Unbox (or type-check) a reference being stored into a slot of type `dst`
pub fn unbox_primitive_for_field(
    runtime: &Runtime,
    obj: Option<ObjectRef>,
    dst: TypeRef,
) -> Result<Value, ConversionError> {
    unbox_primitive(runtime, obj, dst)
}

/// Unbox (or type-check) a reference returned where `dst` is declared.
///
/// Only exact or widening kind matches are accepted; a null reference never
/// converts to a primitive.
pub fn unbox_primitive_for_result(
    runtime: &Runtime,
    obj: Option<ObjectRef>,
    dst: TypeRef,
) -> Result<Value, ConversionError> {
    unbox_primitive(runtime, obj, dst)
}

fn unbox_primitive(
    runtime: &Runtime,
    obj: Option<ObjectRef>,
    dst: TypeRef,
) -> Result<Value, ConversionError> {
    let dst_kind = match dst {
        TypeRef::Reference(class) => {
            return match obj {
                None => Ok(Value::null()),
                Some(o) if runtime.instance_of(o, class) => Ok(Value::Object(Some(o))),
                Some(o) => Err(ConversionError::new(
                    runtime.classes().class_name(runtime.class_of(o)),
                    runtime.classes().class_name(class),
                )),
            };
        }
        TypeRef::Primitive(kind) => kind,
    };

    let Some(obj) = obj else {
        return Err(ConversionError::new("null", dst_kind.name()));
    };
    let class_id = runtime.class_of(obj);
    let boxed = runtime
        .classes()
        .get_class(class_id)
        .and_then(|c| c.boxed_kind)
        .zip(runtime.heap().boxed_value(obj));

    match boxed {
        Some((src_kind, value)) => {
            convert_primitive_value(src_kind, dst_kind, value).map_err(|_| {
                ConversionError::new(runtime.classes().class_name(class_id), dst_kind.name())
            })
        }
        None => Err(ConversionError::new(
            runtime.classes().class_name(class_id),
            dst_kind.name(),
        )),
    }
}
