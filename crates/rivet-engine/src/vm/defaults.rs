//! Default constants for engine configuration.

/// Largest formal parameter count the managed calling convention supports.
pub const MAX_ARGUMENTS_LIMIT: usize = 255;

/// Default maximum formal parameter count accepted at link time.
pub const DEFAULT_MAX_ARGUMENTS: usize = MAX_ARGUMENTS_LIMIT;

/// Default number of frames skipped when the reflective entry point resolves
/// its calling class (the frame of the reflective `invoke` itself).
pub const DEFAULT_NUM_FRAMES: usize = 1;

/// Upper bound on `default_num_frames`.
pub const MAX_NUM_FRAMES: usize = 64;

/// Frame depth used by the native-interface entry points: the caller is the
/// top managed frame.
pub const NATIVE_CALLER_DEPTH: usize = 0;

/// Tracing target of the show-call diagnostic hooks.
pub const CALL_TRACE_TARGET: &str = "rivet::calls";
