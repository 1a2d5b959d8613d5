//! # cubind-core
//!
//! Shared machinery for the native GPU library bindings: device pointers
//! and buffers, the handle-lifecycle primitive, and the status-to-error
//! translation convention used by every wrapper crate. The simulated
//! driver in [`sim`] backs tests and examples on machines without the
//! native libraries.

// Declare modules
pub mod error;
pub mod handle;
pub mod memory;
pub mod sim;
pub mod status;

#[cfg(feature = "cuda")]
pub mod ffi;

// Re-export public types
pub use error::CubindError;
pub use handle::{HandleCell, RawHandle};
pub use memory::{DeviceAlloc, DeviceBuffer, DevicePtr, PitchedBuffer};
pub use sim::SimDriver;
pub use status::NativeStatus;
