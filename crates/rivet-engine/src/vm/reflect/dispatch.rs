//! Dispatch resolution: which body runs for a declared method and a receiver

use rivet_sdk::{InvokeError, InvokeResult, ObjectRef};

use crate::vm::method::{InvokeKind, Method};
use crate::vm::reflect::access::{invalid_receiver_error, verify_object_is_class};
use crate::vm::runtime::Runtime;

/// How the target is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Run the named method itself (non-virtual and super-style calls)
    Exact,
    /// Dispatch on the receiver's runtime class for virtual/interface kinds
    VirtualOrInterface,
}

/// Look up the override of `method` in `receiver`'s runtime class.
///
/// Returns `None` when the receiver's class has no table entry for the
/// method, i.e. it does not extend or implement the declaring type.
pub fn find_virtual_method_for_virtual_or_interface<'r>(
    runtime: &'r Runtime,
    receiver: ObjectRef,
    method: &'r Method,
) -> Option<&'r Method> {
    let class = runtime.classes().get_class(runtime.class_of(receiver))?;
    let target = match method.kind {
        InvokeKind::Static | InvokeKind::Direct => return Some(method),
        InvokeKind::Virtual => class.get_method(method.method_index)?,
        InvokeKind::Interface => *class
            .find_iftable_entry(method.declaring_class)?
            .methods
            .get(method.method_index)?,
    };
    runtime.method(target)
}

/// Select the concrete method to execute
pub fn resolve<'r>(
    runtime: &'r Runtime,
    method: &'r Method,
    receiver: Option<ObjectRef>,
    mode: DispatchMode,
) -> InvokeResult<&'r Method> {
    if method.kind == InvokeKind::Static {
        return Ok(method);
    }

    let Some(obj) = receiver else {
        return Err(InvokeError::NullReceiver {
            method: runtime.pretty_method(method),
        });
    };
    verify_object_is_class(runtime, obj, method.declaring_class)?;

    let target = match (mode, method.kind) {
        (DispatchMode::VirtualOrInterface, InvokeKind::Virtual | InvokeKind::Interface) => {
            find_virtual_method_for_virtual_or_interface(runtime, obj, method)
                .ok_or_else(|| invalid_receiver_error(runtime, obj, method.declaring_class))?
        }
        _ => method,
    };

    if target.is_abstract() {
        return Err(InvokeError::AbstractMethod {
            method: runtime.pretty_method(target),
            class: runtime
                .classes()
                .class_name(runtime.class_of(obj))
                .to_string(),
        });
    }

    tracing::trace!(
        declared = ?method.id,
        resolved = ?target.id,
        kind = ?method.kind,
        "dispatch resolved"
    );
    Ok(target)
}
