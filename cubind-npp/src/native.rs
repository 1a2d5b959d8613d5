use crate::format::FormatKey;
use crate::types::{AlphaOp, BorderType, ErrorMetric, Point, Size, TwistMatrix};
use cubind_core::DevicePtr;
use std::fmt::Debug;

/// One pitched image operand: a pointer (already region-adjusted where the
/// operation works on a region) and its pitch in bytes.
#[derive(Debug, Clone, Copy)]
pub struct ImageOperand {
    pub ptr: DevicePtr,
    pub pitch: usize,
}

/// Entry points consumed from the native image-primitives library.
///
/// One method per operation; the `FormatKey` argument selects the concrete
/// per-format entry point, so the whole catalog dispatches through one
/// table instead of one wrapper type per format. Every method is a single
/// native call returning the raw status code; translation happens in the
/// image view.
pub trait ImagingNative: Debug + Send + Sync {
    /// Pitched allocation for `width` x `height` pixels of `fmt`.
    /// A null pointer reports allocation failure.
    fn malloc(&self, fmt: FormatKey, width: u32, height: u32) -> (DevicePtr, usize);

    fn free(&self, ptr: DevicePtr) -> i32;

    /// Fills the region with one pixel value (`fmt.pixel_bytes()` bytes).
    fn set(&self, fmt: FormatKey, value: &[u8], dst: ImageOperand, roi: Size) -> i32;

    fn alpha_comp(
        &self,
        fmt: FormatKey,
        src1: ImageOperand,
        src2: ImageOperand,
        dst: ImageOperand,
        roi: Size,
        op: AlphaOp,
    ) -> i32;

    /// Scratch bytes `metric` needs for a region of `roi` pixels.
    fn error_metric_scratch_size(
        &self,
        fmt: FormatKey,
        metric: ErrorMetric,
        roi: Size,
    ) -> (i32, usize);

    /// Computes `metric` between two regions, writing one `f64` to
    /// `result` on the device. `scratch` must satisfy the queried size.
    fn error_metric(
        &self,
        fmt: FormatKey,
        metric: ErrorMetric,
        src1: ImageOperand,
        src2: ImageOperand,
        roi: Size,
        result: DevicePtr,
        scratch: DevicePtr,
    ) -> i32;

    fn color_twist(
        &self,
        fmt: FormatKey,
        src: ImageOperand,
        dst: ImageOperand,
        roi: Size,
        twist: &TwistMatrix,
    ) -> i32;

    /// Convolution over the region. `kernel` points at
    /// `kernel_size.pixels()` reverse-order `f32` coefficients on the
    /// device.
    fn filter(
        &self,
        fmt: FormatKey,
        src: ImageOperand,
        dst: ImageOperand,
        roi: Size,
        kernel: DevicePtr,
        kernel_size: Size,
        anchor: Point,
    ) -> i32;

    /// Bordered convolution: receives the source base pointer, the full
    /// allocation size, and the region offset so out-of-region pixels can
    /// be sourced according to `border`.
    #[allow(clippy::too_many_arguments)]
    fn filter_border(
        &self,
        fmt: FormatKey,
        src: ImageOperand,
        src_size: Size,
        src_offset: Point,
        dst: ImageOperand,
        dst_roi: Size,
        kernel: DevicePtr,
        kernel_size: Size,
        anchor: Point,
        border: BorderType,
    ) -> i32;
}
