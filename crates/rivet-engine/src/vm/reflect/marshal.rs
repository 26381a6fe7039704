//! Argument marshalling
//!
//! Turns one of the caller argument shapes into a vector of tagged values,
//! one per formal parameter, converted to the parameter's type. The count is
//! checked before any argument is read.

use rivet_sdk::{InvokeError, InvokeResult, ObjectRef, PrimitiveKind, RawValue, Value, VarArgs};

use crate::vm::method::{Method, TypeRef};
use crate::vm::reflect::convert::{convert_primitive_value, unbox_primitive_for_field};
use crate::vm::runtime::Runtime;

/// Caller-supplied arguments, in one of the accepted shapes
#[derive(Debug)]
pub enum ArgumentSource<'a> {
    /// Platform variadic stream (promoted words)
    VarArgs(&'a mut VarArgs),
    /// Tagged values
    Values(&'a [Value]),
    /// Untyped words, read according to the formal parameter types
    Raw(&'a [RawValue]),
    /// An `Object[]` of boxed arguments; null means no arguments
    Boxed(Option<ObjectRef>),
}

/// Produce the argument vector for `method`
pub fn marshal(
    runtime: &Runtime,
    method: &Method,
    source: ArgumentSource<'_>,
) -> InvokeResult<Vec<Value>> {
    match source {
        ArgumentSource::VarArgs(args) => marshal_varargs(runtime, method, args),
        ArgumentSource::Values(values) => marshal_values(runtime, method, values),
        ArgumentSource::Raw(words) => marshal_raw(runtime, method, words),
        ArgumentSource::Boxed(array) => marshal_boxed(runtime, method, array),
    }
}

fn check_count(method: &Method, got: usize) -> InvokeResult<()> {
    if method.arity() == got {
        Ok(())
    } else {
        Err(InvokeError::ArgumentCountMismatch {
            expected: method.arity(),
            got,
        })
    }
}

fn type_mismatch(runtime: &Runtime, index: usize, expected: TypeRef, got: String) -> InvokeError {
    InvokeError::ArgumentTypeMismatch {
        index,
        expected: runtime.type_name(expected),
        got,
    }
}

/// A reference argument must be null or assignable to the parameter class
fn check_reference(
    runtime: &Runtime,
    index: usize,
    param: TypeRef,
    obj: Option<ObjectRef>,
) -> InvokeResult<Value> {
    unbox_primitive_for_field(runtime, obj, param).map_err(|e| e.for_argument(index))
}

fn marshal_values(
    runtime: &Runtime,
    method: &Method,
    values: &[Value],
) -> InvokeResult<Vec<Value>> {
    check_count(method, values.len())?;

    let mut args = Vec::with_capacity(values.len());
    for (index, (param, value)) in method.parameters.iter().zip(values).enumerate() {
        let arg = match (*param, *value) {
            (_, Value::Object(obj)) => check_reference(runtime, index, *param, obj)?,
            (TypeRef::Primitive(_), Value::Void) | (TypeRef::Reference(_), _) => {
                return Err(type_mismatch(runtime, index, *param, runtime.value_type_name(value)));
            }
            (TypeRef::Primitive(dst), v) => {
                let src = v.kind().unwrap_or(PrimitiveKind::Void);
                convert_primitive_value(src, dst, v).map_err(|e| e.for_argument(index))?
            }
        };
        args.push(arg);
    }
    Ok(args)
}

fn marshal_raw(runtime: &Runtime, method: &Method, words: &[RawValue]) -> InvokeResult<Vec<Value>> {
    check_count(method, words.len())?;

    let mut args = Vec::with_capacity(words.len());
    for (index, (param, word)) in method.parameters.iter().zip(words).enumerate() {
        let arg = match *param {
            TypeRef::Primitive(kind) => Value::from_raw(kind, *word),
            TypeRef::Reference(_) => check_reference(runtime, index, *param, word.as_object())?,
        };
        args.push(arg);
    }
    Ok(args)
}

fn marshal_boxed(
    runtime: &Runtime,
    method: &Method,
    array: Option<ObjectRef>,
) -> InvokeResult<Vec<Value>> {
    let elements = match array {
        None => Vec::new(),
        Some(obj) => match runtime.heap().array_elements(obj) {
            Some(elements) => elements,
            None => panic!(
                "contract violation: reflective argument list {} is not an array",
                obj
            ),
        },
    };
    check_count(method, elements.len())?;

    method
        .parameters
        .iter()
        .zip(elements)
        .enumerate()
        .map(|(index, (param, element))| {
            unbox_primitive_for_field(runtime, element, *param).map_err(|e| e.for_argument(index))
        })
        .collect()
}

fn marshal_varargs(
    runtime: &Runtime,
    method: &Method,
    stream: &mut VarArgs,
) -> InvokeResult<Vec<Value>> {
    check_count(method, stream.remaining())?;

    let mut args = Vec::with_capacity(method.arity());
    for (index, param) in method.parameters.iter().enumerate() {
        let arg = match *param {
            TypeRef::Reference(_) => {
                let obj = stream.next_object().flatten();
                check_reference(runtime, index, *param, obj)?
            }
            TypeRef::Primitive(kind) => {
                read_promoted(stream, kind)
                    .map_err(|got| type_mismatch(runtime, index, *param, got))?
            }
        };
        args.push(arg);
    }
    Ok(args)
}

/// Read one promoted word back as `kind`, rejecting values that do not fit
fn read_promoted(stream: &mut VarArgs, kind: PrimitiveKind) -> Result<Value, String> {
    let out_of_range = |word: i64| format!("out-of-range value {}", word);

    match kind {
        PrimitiveKind::Float => {
            let d = stream.next_double().unwrap_or_default();
            let f = d as f32;
            if d.is_nan() || f as f64 == d {
                Ok(Value::Float(f))
            } else {
                Err(format!("inexact value {}", d))
            }
        }
        PrimitiveKind::Double => Ok(Value::Double(stream.next_double().unwrap_or_default())),
        PrimitiveKind::Long => Ok(Value::Long(stream.next_integral().unwrap_or_default())),
        _ => {
            let word = stream.next_integral().unwrap_or_default();
            let value = match kind {
                PrimitiveKind::Boolean => match word {
                    0 => Some(Value::Boolean(false)),
                    1 => Some(Value::Boolean(true)),
                    _ => None,
                },
                PrimitiveKind::Byte => i8::try_from(word).ok().map(Value::Byte),
                PrimitiveKind::Char => u16::try_from(word).ok().map(Value::Char),
                PrimitiveKind::Short => i16::try_from(word).ok().map(Value::Short),
                PrimitiveKind::Int => i32::try_from(word).ok().map(Value::Int),
                _ => None,
            };
            value.ok_or_else(|| out_of_range(word))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_promoted_ranges() {
        let mut stream = VarArgs::new();
        stream
            .push_int(-128)
            .push_int(128)
            .push_char(0xFFFF)
            .push_int(-1)
            .push_int(1)
            .push_int(2);

        assert_eq!(read_promoted(&mut stream, PrimitiveKind::Byte), Ok(Value::Byte(-128)));
        assert!(read_promoted(&mut stream, PrimitiveKind::Byte).is_err());
        assert_eq!(read_promoted(&mut stream, PrimitiveKind::Char), Ok(Value::Char(0xFFFF)));
        assert!(read_promoted(&mut stream, PrimitiveKind::Char).is_err());
        assert_eq!(read_promoted(&mut stream, PrimitiveKind::Boolean), Ok(Value::Boolean(true)));
        assert!(read_promoted(&mut stream, PrimitiveKind::Boolean).is_err());
    }

    #[test]
    fn test_read_promoted_float() {
        let mut stream = VarArgs::new();
        stream.push_float(0.1).push_double(0.1).push_double(f64::NAN);

        assert_eq!(read_promoted(&mut stream, PrimitiveKind::Float), Ok(Value::Float(0.1)));
        assert!(read_promoted(&mut stream, PrimitiveKind::Float).is_err());
        let nan = read_promoted(&mut stream, PrimitiveKind::Float).unwrap();
        assert!(matches!(nan, Value::Float(f) if f.is_nan()));
    }

    #[test]
    fn test_read_promoted_wide() {
        let mut stream = VarArgs::new();
        stream.push_long(i64::MIN).push_double(-0.0).push_int(i32::MAX);

        assert_eq!(read_promoted(&mut stream, PrimitiveKind::Long), Ok(Value::Long(i64::MIN)));
        let d = read_promoted(&mut stream, PrimitiveKind::Double).unwrap();
        assert!(matches!(d, Value::Double(v) if v == 0.0 && v.is_sign_negative()));
        assert_eq!(read_promoted(&mut stream, PrimitiveKind::Int), Ok(Value::Int(i32::MAX)));
    }
}
