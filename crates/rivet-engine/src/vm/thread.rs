//! Calling thread state
//!
//! A [`ThreadContext`] is the bridge's view of the thread running an
//! invocation: its pending-failure slot and the capability to ask which class
//! is active a given number of managed frames up.

use rivet_sdk::{ClassId, InvokeError};

/// Stack-walk capability: the class active `depth` managed frames up
pub trait CallingClassLookup: Send {
    /// Class of the frame at `depth` (0 = innermost), or `None` if the stack
    /// is not that deep
    fn class_at_depth(&self, depth: usize) -> Option<ClassId>;
}

/// Explicit stack of managed frame classes, innermost last
#[derive(Debug, Clone, Default)]
pub struct ShadowStack {
    frames: Vec<ClassId>,
}

impl ShadowStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stack from outermost to innermost frames
    pub fn with_frames(frames: impl IntoIterator<Item = ClassId>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Enter a frame of `class`
    pub fn push(&mut self, class: ClassId) {
        self.frames.push(class);
    }

    /// Leave the innermost frame
    pub fn pop(&mut self) -> Option<ClassId> {
        self.frames.pop()
    }

    /// Number of frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl CallingClassLookup for ShadowStack {
    fn class_at_depth(&self, depth: usize) -> Option<ClassId> {
        self.frames.iter().rev().nth(depth).copied()
    }
}

/// State of one calling thread
pub struct ThreadContext {
    name: String,
    lookup: Option<Box<dyn CallingClassLookup>>,
    pending: Option<InvokeError>,
}

impl ThreadContext {
    /// A thread with managed frames
    pub fn attached(name: impl Into<String>, lookup: impl CallingClassLookup + 'static) -> Self {
        Self {
            name: name.into(),
            lookup: Some(Box::new(lookup)),
            pending: None,
        }
    }

    /// A native-only thread with no managed frames
    pub fn unattached(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lookup: None,
            pending: None,
        }
    }

    /// Thread name (diagnostics only)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the thread has a stack-walk capability
    pub fn is_attached(&self) -> bool {
        self.lookup.is_some()
    }

    /// The stack-walk capability, if attached
    pub fn lookup(&self) -> Option<&dyn CallingClassLookup> {
        self.lookup.as_deref()
    }

    /// Replace the stack-walk capability
    pub fn set_lookup(&mut self, lookup: Option<Box<dyn CallingClassLookup>>) {
        self.lookup = lookup;
    }

    /// Whether a failure is pending
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending failure, if any
    pub fn pending(&self) -> Option<&InvokeError> {
        self.pending.as_ref()
    }

    /// Record a failure as pending, replacing any previous one
    pub fn set_pending(&mut self, error: InvokeError) {
        tracing::debug!(thread = %self.name, %error, "recording pending failure");
        self.pending = Some(error);
    }

    /// Take and clear the pending failure
    pub fn take_pending(&mut self) -> Option<InvokeError> {
        self.pending.take()
    }

    /// Clear the pending failure
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }
}

impl std::fmt::Debug for ThreadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadContext")
            .field("name", &self.name)
            .field("attached", &self.is_attached())
            .field("pending", &self.pending)
            .finish()
    }
}
