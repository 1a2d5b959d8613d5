//! # cubind-sparse
//!
//! Opaque-handle wrappers for the native sparse library: the library
//! context plus the per-algorithm analysis-info objects, all built on the
//! core handle-lifecycle primitive. Creation failures surface as typed
//! errors; destruction is deterministic, idempotent, and never fails.

// Declare modules
pub mod context;
pub mod info;
pub mod native;
pub mod sim;
pub mod status;

#[cfg(feature = "cuda")]
pub mod ffi;

// Re-export public types
pub use context::SparseContext;
pub use cubind_core::CubindError;
pub use info::{Bsrsm2Info, Csric02Info};
pub use native::{InfoKind, SparseNative};
pub use sim::SimSparse;
pub use status::SparseStatus;
