//! Invocation driver
//!
//! Every entry point runs the same pipeline:
//!
//! ```text
//! Entered -> AccessChecked -> DispatchResolved -> ArgsMarshalled
//!         -> Invoked -> ResultConverted -> Done
//! ```
//!
//! Any stage may move to `Failed`. A failure is recorded as pending on the
//! calling thread and also returned. A thread that already has a pending
//! failure is turned away at `Entered` and nothing else happens.
//!
//! The mutator lock is held shared from `Entered` to `Done`. Only the
//! execution-engine collaborator may suspend it, around the `Invoked` stage.
//!
//! Native-interface entry points (`invoke_with_*`) take the calling class from
//! the innermost managed frame. The reflective entry point skips `num_frames`
//! frames, and boxes its result.

use rivet_sdk::{
    InvokeError, InvokeResult, MethodHandle, ObjectRef, RawValue, Value, VarArgs,
};

use crate::vm::defaults::NATIVE_CALLER_DEPTH;
use crate::vm::engine::{CallFrame, Thrown};
use crate::vm::method::{Method, TypeRef};
use crate::vm::reflect::access::{access_violation, verify_access_from_frames, AccessCheck};
use crate::vm::reflect::convert::{
    box_primitive, convert_primitive_value, unbox_primitive_for_result, ConversionError,
};
use crate::vm::reflect::dispatch::{resolve, DispatchMode};
use crate::vm::reflect::marshal::{marshal, ArgumentSource};
use crate::vm::reflect::trace::{show_call, show_call_result};
use crate::vm::runtime::Runtime;
use crate::vm::thread::ThreadContext;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeState {
    /// Call accepted, no pending failure
    Entered,
    /// Caller may access the method
    AccessChecked,
    /// Concrete method selected
    DispatchResolved,
    /// Arguments converted to the parameter types
    ArgsMarshalled,
    /// Body returned normally
    Invoked,
    /// Return value converted to the declared type
    ResultConverted,
    /// Finished successfully
    Done,
    /// Finished with a failure
    Failed,
}

/// A method object as seen by reflection: a handle plus the accessibility
/// override that skips the access check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflectiveMethod {
    handle: MethodHandle,
    accessible: bool,
}

impl ReflectiveMethod {
    /// Wrap a handle; access is checked
    pub fn new(handle: MethodHandle) -> Self {
        Self {
            handle,
            accessible: false,
        }
    }

    /// The underlying handle
    pub fn handle(&self) -> MethodHandle {
        self.handle
    }

    /// Whether access checks are suppressed
    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    /// Suppress (or restore) access checks
    pub fn set_accessible(&mut self, accessible: bool) {
        self.accessible = accessible;
    }
}

#[derive(Debug, Clone, Copy)]
enum AccessMode {
    /// Check against the class `n` frames up
    Frames(usize),
    /// Caller vouches for access
    Skip,
}

#[derive(Debug, Clone, Copy)]
enum Dispatch {
    Resolve(DispatchMode),
    /// Receiver already known to be an initialized instance of the declaring class
    Trusted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultShape {
    Typed,
    Boxed,
}

#[derive(Debug, Clone, Copy)]
struct CallOptions {
    access: AccessMode,
    dispatch: Dispatch,
    result: ResultShape,
}

impl CallOptions {
    const fn native(mode: DispatchMode) -> Self {
        Self {
            access: AccessMode::Frames(NATIVE_CALLER_DEPTH),
            dispatch: Dispatch::Resolve(mode),
            result: ResultShape::Typed,
        }
    }
}

struct Pipeline<'r, 't> {
    thread: &'t mut ThreadContext,
    method: &'r Method,
    state: InvokeState,
}

impl Pipeline<'_, '_> {
    fn advance(&mut self, next: InvokeState) {
        tracing::trace!(
            method = ?self.method.id,
            from = ?self.state,
            to = ?next,
            "invoke transition"
        );
        self.state = next;
    }

    fn fail(&mut self, error: InvokeError) -> InvokeError {
        self.advance(InvokeState::Failed);
        self.thread.set_pending(error.clone());
        error
    }
}

fn target_threw(runtime: &Runtime, Thrown(exception): Thrown) -> InvokeError {
    InvokeError::TargetThrew {
        exception,
        description: runtime.describe_throwable(exception),
    }
}

/// Convert a body's return value to the declared return type
fn convert_result(
    runtime: &Runtime,
    declared: TypeRef,
    value: Value,
) -> Result<Value, ConversionError> {
    if declared == TypeRef::VOID {
        return Ok(Value::Void);
    }
    match (declared, value) {
        (_, Value::Object(obj)) => unbox_primitive_for_result(runtime, obj, declared),
        (TypeRef::Primitive(dst), v) if v != Value::Void => match v.kind() {
            Some(src) => convert_primitive_value(src, dst, v),
            None => Err(ConversionError::new(runtime.value_type_name(&v), dst.name())),
        },
        (_, v) => Err(ConversionError::new(
            runtime.value_type_name(&v),
            runtime.type_name(declared),
        )),
    }
}

fn box_result(runtime: &Runtime, value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        Value::Void => Value::null(),
        primitive => match primitive.kind() {
            Some(kind) => Value::Object(box_primitive(runtime, kind, primitive)),
            None => Value::null(),
        },
    }
}

fn run(
    runtime: &Runtime,
    thread: &mut ThreadContext,
    method: &Method,
    receiver: Option<ObjectRef>,
    source: ArgumentSource<'_>,
    options: CallOptions,
) -> InvokeResult<Value> {
    let mut pipeline = Pipeline {
        thread,
        method,
        state: InvokeState::Entered,
    };

    if pipeline.thread.has_pending() {
        tracing::debug!(method = ?method.id, "pending failure on entry; call abandoned");
        pipeline.advance(InvokeState::Failed);
        return Err(InvokeError::PendingExceptionOnEntry);
    }

    let mut guard = runtime.mutator().shared();

    if let AccessMode::Frames(num_frames) = options.access {
        if runtime.config().enforce_access {
            let check = verify_access_from_frames(
                runtime,
                pipeline.thread,
                receiver.filter(|_| !method.is_static()),
                method.declaring_class,
                method.access_flags,
                num_frames,
            );
            if let AccessCheck::Denied { calling_class } = check {
                return Err(pipeline.fail(access_violation(runtime, calling_class, method)));
            }
        }
    }
    pipeline.advance(InvokeState::AccessChecked);

    let target = match options.dispatch {
        Dispatch::Resolve(mode) => match resolve(runtime, method, receiver, mode) {
            Ok(target) => target,
            Err(error) => return Err(pipeline.fail(error)),
        },
        Dispatch::Trusted => method,
    };
    pipeline.advance(InvokeState::DispatchResolved);

    let args = match marshal(runtime, target, source) {
        Ok(args) => args,
        Err(error) => return Err(pipeline.fail(error)),
    };
    pipeline.advance(InvokeState::ArgsMarshalled);

    let receiver = if target.is_static() { None } else { receiver };
    if runtime.config().trace_calls {
        show_call(runtime, target, receiver, &args);
    }

    if target.is_static() {
        let initialized = runtime.engine().ensure_initialized(
            runtime,
            target.declaring_class,
            pipeline.thread,
            &mut guard,
        );
        if let Err(thrown) = initialized {
            return Err(pipeline.fail(target_threw(runtime, thrown)));
        }
    }

    let outcome = {
        let mut frame = CallFrame {
            runtime,
            method: target,
            receiver,
            args: &args,
            thread: &mut *pipeline.thread,
            guard: &mut guard,
        };
        runtime.engine().execute(&mut frame)
    };
    let value = match outcome {
        Ok(value) => value,
        Err(thrown) => return Err(pipeline.fail(target_threw(runtime, thrown))),
    };
    pipeline.advance(InvokeState::Invoked);

    let mut result = match convert_result(runtime, target.return_type, value) {
        Ok(result) => result,
        Err(error) => return Err(pipeline.fail(error.for_result())),
    };
    if options.result == ResultShape::Boxed {
        result = box_result(runtime, result);
    }
    pipeline.advance(InvokeState::ResultConverted);

    if runtime.config().trace_calls {
        show_call_result(runtime, target, &result);
    }
    pipeline.advance(InvokeState::Done);
    drop(guard);
    Ok(result)
}

// ============================================================================
// Native-interface entry points
// ============================================================================

/// Call `handle` exactly as named, arguments from a variadic stream
#[tracing::instrument(level = "debug", skip_all, fields(method = ?handle.method_id()))]
pub fn invoke_with_varargs(
    runtime: &Runtime,
    thread: &mut ThreadContext,
    receiver: Option<ObjectRef>,
    handle: MethodHandle,
    args: &mut VarArgs,
) -> InvokeResult<Value> {
    let method = runtime.method_for_handle(handle);
    let options = CallOptions::native(DispatchMode::Exact);
    run(runtime, thread, method, receiver, ArgumentSource::VarArgs(args), options)
}

/// Call `handle` exactly as named, arguments as tagged values
#[tracing::instrument(level = "debug", skip_all, fields(method = ?handle.method_id()))]
pub fn invoke_with_values(
    runtime: &Runtime,
    thread: &mut ThreadContext,
    receiver: Option<ObjectRef>,
    handle: MethodHandle,
    args: &[Value],
) -> InvokeResult<Value> {
    let method = runtime.method_for_handle(handle);
    let options = CallOptions::native(DispatchMode::Exact);
    run(runtime, thread, method, receiver, ArgumentSource::Values(args), options)
}

/// Call `handle` exactly as named, arguments as untyped words
#[tracing::instrument(level = "debug", skip_all, fields(method = ?handle.method_id()))]
pub fn invoke_with_raw_values(
    runtime: &Runtime,
    thread: &mut ThreadContext,
    receiver: Option<ObjectRef>,
    handle: MethodHandle,
    args: &[RawValue],
) -> InvokeResult<Value> {
    let method = runtime.method_for_handle(handle);
    let options = CallOptions::native(DispatchMode::Exact);
    run(runtime, thread, method, receiver, ArgumentSource::Raw(args), options)
}

/// Dispatch `handle` on the receiver, arguments from a variadic stream
#[tracing::instrument(level = "debug", skip_all, fields(method = ?handle.method_id()))]
pub fn invoke_virtual_or_interface_with_varargs(
    runtime: &Runtime,
    thread: &mut ThreadContext,
    receiver: Option<ObjectRef>,
    handle: MethodHandle,
    args: &mut VarArgs,
) -> InvokeResult<Value> {
    let method = runtime.method_for_handle(handle);
    let options = CallOptions::native(DispatchMode::VirtualOrInterface);
    run(runtime, thread, method, receiver, ArgumentSource::VarArgs(args), options)
}

/// Dispatch `handle` on the receiver, arguments as tagged values
#[tracing::instrument(level = "debug", skip_all, fields(method = ?handle.method_id()))]
pub fn invoke_virtual_or_interface_with_values(
    runtime: &Runtime,
    thread: &mut ThreadContext,
    receiver: Option<ObjectRef>,
    handle: MethodHandle,
    args: &[Value],
) -> InvokeResult<Value> {
    let method = runtime.method_for_handle(handle);
    let options = CallOptions::native(DispatchMode::VirtualOrInterface);
    run(runtime, thread, method, receiver, ArgumentSource::Values(args), options)
}

/// Dispatch `handle` on the receiver, arguments as untyped words
#[tracing::instrument(level = "debug", skip_all, fields(method = ?handle.method_id()))]
pub fn invoke_virtual_or_interface_with_raw_values(
    runtime: &Runtime,
    thread: &mut ThreadContext,
    receiver: Option<ObjectRef>,
    handle: MethodHandle,
    args: &[RawValue],
) -> InvokeResult<Value> {
    let method = runtime.method_for_handle(handle);
    let options = CallOptions::native(DispatchMode::VirtualOrInterface);
    run(runtime, thread, method, receiver, ArgumentSource::Raw(args), options)
}

// ============================================================================
// Reflection entry points
// ============================================================================

/// `Method.invoke`: arguments from an `Object[]` (null for none), result boxed.
///
/// The calling class is looked up `num_frames` frames up, defaulting to the
/// configured `default_num_frames`. Returns null for `void` methods.
#[tracing::instrument(level = "debug", skip_all, fields(method = ?method.handle().method_id()))]
pub fn invoke_method(
    runtime: &Runtime,
    thread: &mut ThreadContext,
    method: &ReflectiveMethod,
    receiver: Option<ObjectRef>,
    args: Option<ObjectRef>,
    num_frames: Option<usize>,
) -> InvokeResult<Option<ObjectRef>> {
    let descriptor = runtime.method_for_handle(method.handle());
    let access = if method.is_accessible() {
        AccessMode::Skip
    } else {
        AccessMode::Frames(num_frames.unwrap_or(runtime.config().default_num_frames))
    };
    let options = CallOptions {
        access,
        dispatch: Dispatch::Resolve(DispatchMode::VirtualOrInterface),
        result: ResultShape::Boxed,
    };

    let result = run(runtime, thread, descriptor, receiver, ArgumentSource::Boxed(args), options)?;
    Ok(result.as_object().flatten())
}

/// Run a constructor on a freshly allocated `receiver`.
///
/// Trusted path: the caller guarantees access, class initialization and the
/// receiver's exact class, so only argument conversion and the call remain.
///
/// # Panics
/// If `constructor` does not name an instance initializer.
#[tracing::instrument(level = "debug", skip_all, fields(method = ?constructor.method_id()))]
pub fn invoke_constructor(
    runtime: &Runtime,
    thread: &mut ThreadContext,
    constructor: MethodHandle,
    receiver: ObjectRef,
    args: Option<ObjectRef>,
) -> InvokeResult<()> {
    let method = runtime.method_for_handle(constructor);
    if !method.is_constructor() {
        panic!(
            "contract violation: {} is not a constructor",
            runtime.pretty_method(method)
        );
    }
    let options = CallOptions {
        access: AccessMode::Skip,
        dispatch: Dispatch::Trusted,
        result: ResultShape::Typed,
    };

    run(runtime, thread, method, Some(receiver), ArgumentSource::Boxed(args), options)?;
    Ok(())
}
