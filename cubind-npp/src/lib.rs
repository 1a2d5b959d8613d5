//! # cubind-npp
//!
//! Device-image views over the native image-primitives library. One
//! generic pitched image type, [`DeviceImage`], parameterized over sample
//! type and channel count, carries the whole operation catalog: fills,
//! alpha composition, error-metric reductions with scratch-size queries,
//! color twists, and convolution filters. Every operation is one native
//! call dispatched through [`ImagingNative`] and checked into a typed
//! error.

// Declare modules
pub mod context;
pub mod format;
pub mod image;
pub mod native;
pub mod sim;
pub mod status;
pub mod types;

#[cfg(feature = "cuda")]
pub mod ffi;

// Re-export public types
pub use context::NppContext;
pub use cubind_core::{CubindError, DeviceBuffer, DevicePtr, PitchedBuffer};
pub use format::{FormatKey, Sample, SampleKind};
pub use image::DeviceImage;
pub use native::{ImageOperand, ImagingNative};
pub use sim::SimImaging;
pub use status::NppStatus;
pub use types::{AlphaOp, BorderType, ErrorMetric, Point, Roi, Size, TwistMatrix};
