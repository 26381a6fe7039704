//! Show-call diagnostics
//!
//! Human-readable dumps of calls going through the bridge, emitted on the
//! `rivet::calls` target when `trace_calls` is enabled. Formats are for
//! people, not parsers.

use rivet_sdk::{ClassId, ObjectRef, Value};

use crate::vm::defaults::CALL_TRACE_TARGET;
use crate::vm::method::Method;
use crate::vm::runtime::Runtime;

/// `app.Base.add(int, long) on @3 with (1, 2L)`
pub fn format_call(
    runtime: &Runtime,
    method: &Method,
    receiver: Option<ObjectRef>,
    args: &[Value],
) -> String {
    let mut out = runtime.pretty_method(method);
    if let Some(obj) = receiver {
        let class = runtime.classes().class_name(runtime.class_of(obj));
        out.push_str(&format!(" on {} ({})", obj, class));
    }
    let args = args.iter().map(|a| format_value(runtime, a)).collect::<Vec<_>>();
    out.push_str(&format!(" with ({})", args.join(", ")));
    out
}

fn format_value(runtime: &Runtime, value: &Value) -> String {
    match value {
        Value::Object(Some(obj)) => {
            let class = runtime.classes().class_name(runtime.class_of(*obj));
            match runtime.heap().boxed_value(*obj) {
                Some(inner) => format!("{}<{}>", class, inner),
                None => format!("{} ({})", obj, class),
            }
        }
        other => other.to_string(),
    }
}

/// Dump a call about to enter its target
pub fn show_call(runtime: &Runtime, method: &Method, receiver: Option<ObjectRef>, args: &[Value]) {
    tracing::debug!(
        target: CALL_TRACE_TARGET,
        "invoke {}",
        format_call(runtime, method, receiver, args)
    );
}

/// Dump the converted result of a call
pub fn show_call_result(runtime: &Runtime, method: &Method, result: &Value) {
    tracing::debug!(
        target: CALL_TRACE_TARGET,
        "return from {}: {}",
        runtime.pretty_method(method),
        format_value(runtime, result)
    );
}

/// Dump the calling class found by a stack lookup
pub fn show_class_lookup(runtime: &Runtime, num_frames: usize, class: ClassId) {
    tracing::debug!(
        target: CALL_TRACE_TARGET,
        num_frames,
        "calling class {}",
        runtime.classes().class_name(class)
    );
}
