//! Reflective invocation bridge
//!
//! Verifies, dispatches, marshals and invokes calls coming from native code
//! and reflection, then converts the result:
//!
//! - [`convert`]: primitive widening, boxing and unboxing
//! - [`access`]: access checks and calling-class lookup
//! - [`dispatch`]: virtual and interface target selection
//! - [`marshal`]: argument list conversion
//! - [`invoke`]: the pipeline and its entry points
//! - [`trace`]: show-call diagnostics

pub mod access;
pub mod convert;
pub mod dispatch;
pub mod invoke;
pub mod marshal;
pub mod trace;

pub use access::{
    get_calling_class, invalid_receiver_error, verify_access, verify_access_from_frames,
    verify_object_is_class, AccessCheck,
};
pub use convert::{
    box_primitive, convert_primitive_value, convert_primitive_value_no_throw, is_widening,
    unbox_primitive_for_field, unbox_primitive_for_result, ConversionError,
};
pub use dispatch::{find_virtual_method_for_virtual_or_interface, resolve, DispatchMode};
pub use invoke::{
    invoke_constructor, invoke_method, invoke_virtual_or_interface_with_raw_values,
    invoke_virtual_or_interface_with_values, invoke_virtual_or_interface_with_varargs,
    invoke_with_raw_values, invoke_with_values, invoke_with_varargs, InvokeState,
    ReflectiveMethod,
};
pub use marshal::{marshal, ArgumentSource};
