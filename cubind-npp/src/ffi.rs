//! Bindings to the real image-primitives library, linked at build time and
//! compiled only with the `cuda` feature.
//!
//! The dispatch table currently covers the `32f` two-channel family; other
//! keys report `NotSupportedMode` rather than declaring the full
//! per-format symbol catalog. Extending coverage means adding rows to the
//! matches below.

use crate::format::{FormatKey, SampleKind};
use crate::native::{ImageOperand, ImagingNative};
use crate::status::NppStatus;
use crate::types::{AlphaOp, BorderType, ErrorMetric, Point, Size, TwistMatrix};
use cubind_core::{DevicePtr, NativeStatus};
use std::os::raw::{c_int, c_void};

#[repr(C)]
#[derive(Clone, Copy)]
struct NppiSize {
    width: c_int,
    height: c_int,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct NppiPoint {
    x: c_int,
    y: c_int,
}

impl From<Size> for NppiSize {
    fn from(s: Size) -> Self {
        Self {
            width: s.width as c_int,
            height: s.height as c_int,
        }
    }
}

impl From<Point> for NppiPoint {
    fn from(p: Point) -> Self {
        Self {
            x: p.x as c_int,
            y: p.y as c_int,
        }
    }
}

#[link(name = "nppisu")]
extern "C" {
    fn nppiMalloc_32f_C2(width: c_int, height: c_int, step: *mut c_int) -> *mut c_void;
    fn nppiFree(ptr: *mut c_void);
}

#[link(name = "nppidei")]
extern "C" {
    fn nppiSet_32f_C2R(value: *const f32, dst: *mut f32, step: c_int, roi: NppiSize) -> c_int;
}

#[link(name = "nppial")]
extern "C" {
    fn nppiAlphaComp_32f_AC1R(
        src1: *const f32,
        step1: c_int,
        src2: *const f32,
        step2: c_int,
        dst: *mut f32,
        dst_step: c_int,
        roi: NppiSize,
        op: c_int,
    ) -> c_int;
}

type ErrorFn = unsafe extern "C" fn(
    *const f32,
    c_int,
    *const f32,
    c_int,
    NppiSize,
    *mut f64,
    *mut u8,
) -> c_int;
type ErrorSizeFn = unsafe extern "C" fn(NppiSize, *mut c_int) -> c_int;

#[link(name = "nppist")]
extern "C" {
    fn nppiMaximumError_32f_C2R(
        src1: *const f32,
        step1: c_int,
        src2: *const f32,
        step2: c_int,
        roi: NppiSize,
        error: *mut f64,
        buffer: *mut u8,
    ) -> c_int;
    fn nppiMaximumErrorGetBufferHostSize_32f_C2R(roi: NppiSize, size: *mut c_int) -> c_int;
    fn nppiAverageError_32f_C2R(
        src1: *const f32,
        step1: c_int,
        src2: *const f32,
        step2: c_int,
        roi: NppiSize,
        error: *mut f64,
        buffer: *mut u8,
    ) -> c_int;
    fn nppiAverageErrorGetBufferHostSize_32f_C2R(roi: NppiSize, size: *mut c_int) -> c_int;
    fn nppiMaximumRelativeError_32f_C2R(
        src1: *const f32,
        step1: c_int,
        src2: *const f32,
        step2: c_int,
        roi: NppiSize,
        error: *mut f64,
        buffer: *mut u8,
    ) -> c_int;
    fn nppiMaximumRelativeErrorGetBufferHostSize_32f_C2R(
        roi: NppiSize,
        size: *mut c_int,
    ) -> c_int;
    fn nppiAverageRelativeError_32f_C2R(
        src1: *const f32,
        step1: c_int,
        src2: *const f32,
        step2: c_int,
        roi: NppiSize,
        error: *mut f64,
        buffer: *mut u8,
    ) -> c_int;
    fn nppiAverageRelativeErrorGetBufferHostSize_32f_C2R(
        roi: NppiSize,
        size: *mut c_int,
    ) -> c_int;
}

#[link(name = "nppicc")]
extern "C" {
    fn nppiColorTwist_32f_C2R(
        src: *const f32,
        src_step: c_int,
        dst: *mut f32,
        dst_step: c_int,
        roi: NppiSize,
        twist: *const [f32; 4],
    ) -> c_int;
}

#[link(name = "nppif")]
extern "C" {
    fn nppiFilter_32f_C2R(
        src: *const f32,
        src_step: c_int,
        dst: *mut f32,
        dst_step: c_int,
        roi: NppiSize,
        kernel: *const f32,
        kernel_size: NppiSize,
        anchor: NppiPoint,
    ) -> c_int;
    fn nppiFilterBorder_32f_C2R(
        src: *const f32,
        src_step: c_int,
        src_size: NppiSize,
        src_offset: NppiPoint,
        dst: *mut f32,
        dst_step: c_int,
        dst_roi: NppiSize,
        kernel: *const f32,
        kernel_size: NppiSize,
        anchor: NppiPoint,
        border: c_int,
    ) -> c_int;
}

const F32_C2: FormatKey = FormatKey::new(SampleKind::F32, 2);

fn alpha_op_raw(op: AlphaOp) -> c_int {
    match op {
        AlphaOp::Over => 1,
        AlphaOp::In => 2,
        AlphaOp::Out => 3,
        AlphaOp::Atop => 4,
        AlphaOp::Xor => 5,
        AlphaOp::Plus => 6,
    }
}

fn border_raw(border: BorderType) -> c_int {
    match border {
        BorderType::Replicate => 2,
        BorderType::Wrap => 3,
        BorderType::Mirror => 4,
    }
}

fn src_ptr(op: ImageOperand) -> *const f32 {
    op.ptr.as_raw() as *const f32
}

fn dst_ptr(op: ImageOperand) -> *mut f32 {
    op.ptr.as_raw() as *mut f32
}

/// [`ImagingNative`] over the real library.
#[derive(Debug, Default)]
pub struct NppLib;

impl ImagingNative for NppLib {
    fn malloc(&self, fmt: FormatKey, width: u32, height: u32) -> (DevicePtr, usize) {
        if fmt != F32_C2 {
            return (DevicePtr::NULL, 0);
        }
        let mut step: c_int = 0;
        let ptr = unsafe { nppiMalloc_32f_C2(width as c_int, height as c_int, &mut step) };
        (DevicePtr::from_raw(ptr as u64), step as usize)
    }

    fn free(&self, ptr: DevicePtr) -> i32 {
        unsafe { nppiFree(ptr.as_raw() as *mut c_void) };
        NppStatus::Success.raw()
    }

    fn set(&self, fmt: FormatKey, value: &[u8], dst: ImageOperand, roi: Size) -> i32 {
        if fmt != F32_C2 {
            return NppStatus::NotSupportedMode.raw();
        }
        unsafe {
            nppiSet_32f_C2R(
                value.as_ptr() as *const f32,
                dst_ptr(dst),
                dst.pitch as c_int,
                roi.into(),
            )
        }
    }

    fn alpha_comp(
        &self,
        fmt: FormatKey,
        src1: ImageOperand,
        src2: ImageOperand,
        dst: ImageOperand,
        roi: Size,
        op: AlphaOp,
    ) -> i32 {
        if fmt != F32_C2 {
            return NppStatus::NotSupportedMode.raw();
        }
        unsafe {
            nppiAlphaComp_32f_AC1R(
                src_ptr(src1),
                src1.pitch as c_int,
                src_ptr(src2),
                src2.pitch as c_int,
                dst_ptr(dst),
                dst.pitch as c_int,
                roi.into(),
                alpha_op_raw(op),
            )
        }
    }

    fn error_metric_scratch_size(
        &self,
        fmt: FormatKey,
        metric: ErrorMetric,
        roi: Size,
    ) -> (i32, usize) {
        if fmt != F32_C2 {
            return (NppStatus::NotSupportedMode.raw(), 0);
        }
        let query: ErrorSizeFn = match metric {
            ErrorMetric::Maximum => nppiMaximumErrorGetBufferHostSize_32f_C2R,
            ErrorMetric::Average => nppiAverageErrorGetBufferHostSize_32f_C2R,
            ErrorMetric::MaximumRelative => nppiMaximumRelativeErrorGetBufferHostSize_32f_C2R,
            ErrorMetric::AverageRelative => nppiAverageRelativeErrorGetBufferHostSize_32f_C2R,
        };
        let mut size: c_int = 0;
        let status = unsafe { query(roi.into(), &mut size) };
        (status, size.max(0) as usize)
    }

    fn error_metric(
        &self,
        fmt: FormatKey,
        metric: ErrorMetric,
        src1: ImageOperand,
        src2: ImageOperand,
        roi: Size,
        result: DevicePtr,
        scratch: DevicePtr,
    ) -> i32 {
        if fmt != F32_C2 {
            return NppStatus::NotSupportedMode.raw();
        }
        let entry: ErrorFn = match metric {
            ErrorMetric::Maximum => nppiMaximumError_32f_C2R,
            ErrorMetric::Average => nppiAverageError_32f_C2R,
            ErrorMetric::MaximumRelative => nppiMaximumRelativeError_32f_C2R,
            ErrorMetric::AverageRelative => nppiAverageRelativeError_32f_C2R,
        };
        unsafe {
            entry(
                src_ptr(src1),
                src1.pitch as c_int,
                src_ptr(src2),
                src2.pitch as c_int,
                roi.into(),
                result.as_raw() as *mut f64,
                scratch.as_raw() as *mut u8,
            )
        }
    }

    fn color_twist(
        &self,
        fmt: FormatKey,
        src: ImageOperand,
        dst: ImageOperand,
        roi: Size,
        twist: &TwistMatrix,
    ) -> i32 {
        if fmt != F32_C2 {
            return NppStatus::NotSupportedMode.raw();
        }
        unsafe {
            nppiColorTwist_32f_C2R(
                src_ptr(src),
                src.pitch as c_int,
                dst_ptr(dst),
                dst.pitch as c_int,
                roi.into(),
                twist.as_ptr(),
            )
        }
    }

    fn filter(
        &self,
        fmt: FormatKey,
        src: ImageOperand,
        dst: ImageOperand,
        roi: Size,
        kernel: DevicePtr,
        kernel_size: Size,
        anchor: Point,
    ) -> i32 {
        if fmt != F32_C2 {
            return NppStatus::NotSupportedMode.raw();
        }
        unsafe {
            nppiFilter_32f_C2R(
                src_ptr(src),
                src.pitch as c_int,
                dst_ptr(dst),
                dst.pitch as c_int,
                roi.into(),
                kernel.as_raw() as *const f32,
                kernel_size.into(),
                anchor.into(),
            )
        }
    }

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
    ) -> i32 {
        if fmt != F32_C2 {
            return NppStatus::NotSupportedMode.raw();
        }
        unsafe {
            nppiFilterBorder_32f_C2R(
                src_ptr(src),
                src.pitch as c_int,
                src_size.into(),
                src_offset.into(),
                dst_ptr(dst),
                dst.pitch as c_int,
                dst_roi.into(),
                kernel.as_raw() as *const f32,
                kernel_size.into(),
                anchor.into(),
                border_raw(border),
            )
        }
    }
}
