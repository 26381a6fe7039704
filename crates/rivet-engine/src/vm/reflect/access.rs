//! Access verification
//!
//! Rules, in order:
//!
//! 1. `public` is always accessible.
//! 2. A class can always access its own members.
//! 3. `private` is accessible from nowhere else.
//! 4. `protected` and package-private members are accessible from the same
//!    runtime package (same loader and same package name).
//! 5. `protected` members are also accessible from a subclass, provided the
//!    receiver (if any) is an instance of that subclass. Static members have
//!    no receiver to check.

use rivet_sdk::{ClassId, InvokeError, InvokeResult, ObjectRef};

use crate::vm::method::{AccessFlags, Method};
use crate::vm::runtime::Runtime;
use crate::vm::thread::ThreadContext;

/// Outcome of a frame-based access check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessCheck {
    /// Access granted
    Allowed,
    /// No managed caller at the requested depth; nothing to restrict
    Unattached,
    /// Access denied for this calling class
    Denied {
        /// The resolved calling class
        calling_class: ClassId,
    },
}

impl AccessCheck {
    /// Whether the call may proceed
    pub fn is_allowed(&self) -> bool {
        !matches!(self, AccessCheck::Denied { .. })
    }
}

/// Decide whether `calling_class` may access a member of `declaring_class`
pub fn verify_access(
    runtime: &Runtime,
    receiver: Option<ObjectRef>,
    declaring_class: ClassId,
    access_flags: AccessFlags,
    calling_class: ClassId,
) -> bool {
    if access_flags.contains(AccessFlags::PUBLIC) || calling_class == declaring_class {
        return true;
    }
    if access_flags.contains(AccessFlags::PRIVATE) {
        return false;
    }

    let classes = runtime.classes();
    let (Some(caller), Some(declaring)) = (
        classes.get_class(calling_class),
        classes.get_class(declaring_class),
    ) else {
        return false;
    };
    if caller.is_in_same_package(declaring) {
        return true;
    }

    access_flags.contains(AccessFlags::PROTECTED)
        && classes.is_subclass_of(calling_class, declaring_class)
        && (access_flags.contains(AccessFlags::STATIC)
            || receiver.is_none_or(|obj| runtime.instance_of(obj, calling_class)))
}

/// Class active `num_frames` managed frames up the calling thread's stack
pub fn get_calling_class(thread: &ThreadContext, num_frames: usize) -> Option<ClassId> {
    thread.lookup()?.class_at_depth(num_frames)
}

/// Access check against the class found `num_frames` frames up.
///
/// A thread with no managed frame at that depth is not restricted.
pub fn verify_access_from_frames(
    runtime: &Runtime,
    thread: &ThreadContext,
    receiver: Option<ObjectRef>,
    declaring_class: ClassId,
    access_flags: AccessFlags,
    num_frames: usize,
) -> AccessCheck {
    if access_flags.contains(AccessFlags::PUBLIC) {
        return AccessCheck::Allowed;
    }

    let Some(calling_class) = get_calling_class(thread, num_frames) else {
        tracing::trace!(thread = %thread.name(), num_frames, "no managed caller; access allowed");
        return AccessCheck::Unattached;
    };
    if runtime.config().trace_calls {
        crate::vm::reflect::trace::show_class_lookup(runtime, num_frames, calling_class);
    }

    if verify_access(runtime, receiver, declaring_class, access_flags, calling_class) {
        AccessCheck::Allowed
    } else {
        AccessCheck::Denied { calling_class }
    }
}

/// The failure reported when `calling_class` may not call `method`
pub fn access_violation(runtime: &Runtime, calling_class: ClassId, method: &Method) -> InvokeError {
    let classes = runtime.classes();
    InvokeError::AccessViolation {
        calling_class: classes.class_name(calling_class).to_string(),
        access: method.access_flags.access_name(),
        method: runtime.pretty_method(method),
        declaring_class: classes.class_name(method.declaring_class).to_string(),
    }
}

/// Check that a receiver is an instance of `class`
pub fn verify_object_is_class(
    runtime: &Runtime,
    obj: ObjectRef,
    class: ClassId,
) -> InvokeResult<()> {
    if runtime.instance_of(obj, class) {
        Ok(())
    } else {
        Err(invalid_receiver_error(runtime, obj, class))
    }
}

/// "Expected receiver of type X, but got Y"
pub fn invalid_receiver_error(runtime: &Runtime, obj: ObjectRef, class: ClassId) -> InvokeError {
    let classes = runtime.classes();
    InvokeError::ClassCastOnVirtualDispatch {
        expected: classes.class_name(class).to_string(),
        got: classes.class_name(runtime.class_of(obj)).to_string(),
    }
}
