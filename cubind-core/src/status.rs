use crate::error::CubindError;

/// Typed view of one native library's status codes.
///
/// Each wrapper crate defines its own enum over the raw `i32` code space of
/// the library it binds and plugs it into [`check_status`], so the
/// translation into [`CubindError`] is written once.
pub trait NativeStatus: Copy + std::fmt::Debug {
    fn from_raw(raw: i32) -> Self;
    fn raw(self) -> i32;
    fn is_success(self) -> bool;
}

/// Emits the per-native-call log line: entry-point name and status code.
pub fn trace_call(call: &str, status: i32) {
    log::debug!(target: "cubind", "{call}: status {status}");
}

/// Logs the call and translates a non-success status into
/// [`CubindError::Operation`]. `context` is only rendered on failure.
pub fn check_status<S: NativeStatus>(
    call: &str,
    raw: i32,
    context: impl FnOnce() -> String,
) -> Result<(), CubindError> {
    trace_call(call, raw);
    if S::from_raw(raw).is_success() {
        Ok(())
    } else {
        Err(CubindError::Operation {
            call: call.to_string(),
            status: raw,
            context: context(),
        })
    }
}

/// Like [`check_status`] for entry points where zero is the only success
/// code (the runtime allocator and copy calls).
pub fn check_raw(
    call: &str,
    raw: i32,
    context: impl FnOnce() -> String,
) -> Result<(), CubindError> {
    trace_call(call, raw);
    if raw == 0 {
        Ok(())
    } else {
        Err(CubindError::Operation {
            call: call.to_string(),
            status: raw,
            context: context(),
        })
    }
}
