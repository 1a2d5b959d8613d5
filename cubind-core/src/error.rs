use thiserror::Error;

/// Errors produced by the binding layer.
///
/// Every failing native call is translated into exactly one of these
/// variants and raised synchronously to the immediate caller. There are no
/// retries at this layer. Teardown paths never produce errors; destroy and
/// free failures are logged and swallowed.
#[derive(Error, Debug)]
pub enum CubindError {
    /// A native create entry point refused to hand out a resource.
    #[error("{call} failed during resource creation with status {status}")]
    Creation { call: String, status: i32 },

    /// The native allocator returned no memory.
    #[error("{call} returned no memory: {detail}")]
    Allocation { call: String, detail: String },

    /// A native per-operation call returned a non-success status.
    /// `context` describes the originating view or buffer.
    #[error("{call} failed with status {status} ({context})")]
    Operation {
        call: String,
        status: i32,
        context: String,
    },

    /// A caller-supplied argument failed validation before any native code
    /// was dispatched.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// An inconsistency inside the wrapper itself.
    #[error("internal error: {0}")]
    Internal(String),
}
