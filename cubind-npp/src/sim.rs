use crate::format::{FormatKey, SampleKind};
use crate::native::{ImageOperand, ImagingNative};
use crate::status::NppStatus;
use crate::types::{AlphaOp, BorderType, ErrorMetric, Point, Size, TwistMatrix};
use cubind_core::{DevicePtr, NativeStatus, SimDriver};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

const PITCH_ALIGN: usize = 512;

/// Reference implementation of the imaging entry points over [`SimDriver`]
/// memory, used by tests and examples.
///
/// Arithmetic runs on `f64` regardless of the sample type, with integer
/// samples rounded and saturated on store. Relative error is
/// `|a - b| / max(|a|, |b|)`, zero when both samples are zero. The plain
/// filter clamps sampling to the region; the bordered filter supports
/// replicate borders and reports the other modes as unsupported.
#[derive(Debug)]
pub struct SimImaging {
    driver: Arc<SimDriver>,
    dispatched: AtomicUsize,
    fail_next_op: AtomicI32,
}

impl SimImaging {
    pub fn new(driver: Arc<SimDriver>) -> Self {
        Self {
            driver,
            dispatched: AtomicUsize::new(0),
            fail_next_op: AtomicI32::new(0),
        }
    }

    pub fn driver(&self) -> &Arc<SimDriver> {
        &self.driver
    }

    /// Number of operations that reached the (simulated) native layer.
    /// Scratch-size queries and allocations are not counted.
    pub fn dispatch_count(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Forces the next operation to return `status` without touching
    /// memory, once. `status` must be non-zero.
    pub fn fail_next_op(&self, status: i32) {
        self.fail_next_op.store(status, Ordering::SeqCst);
    }

    fn begin_op(&self) -> Option<i32> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        match self.fail_next_op.swap(0, Ordering::SeqCst) {
            0 => None,
            injected => Some(injected),
        }
    }

    fn sample_at(&self, fmt: FormatKey, img: ImageOperand, x: u32, y: u32) -> Option<Vec<f64>> {
        let px_bytes = fmt.pixel_bytes();
        let ptr = img
            .ptr
            .byte_offset(y as u64 * img.pitch as u64 + x as u64 * px_bytes as u64);
        let mut raw = vec![0u8; px_bytes];
        if !self.driver.read(ptr, &mut raw) {
            return None;
        }
        let elem = fmt.sample.byte_size();
        Some(
            (0..fmt.channels as usize)
                .map(|c| decode(fmt.sample, &raw[c * elem..(c + 1) * elem]))
                .collect(),
        )
    }

    fn store_at(
        &self,
        fmt: FormatKey,
        img: ImageOperand,
        x: u32,
        y: u32,
        values: &[f64],
    ) -> bool {
        let px_bytes = fmt.pixel_bytes();
        let elem = fmt.sample.byte_size();
        let mut raw = vec![0u8; px_bytes];
        for (c, &v) in values.iter().enumerate() {
            encode(fmt.sample, v, &mut raw[c * elem..(c + 1) * elem]);
        }
        let ptr = img
            .ptr
            .byte_offset(y as u64 * img.pitch as u64 + x as u64 * px_bytes as u64);
        self.driver.write(ptr, &raw)
    }

    fn read_kernel(&self, kernel: DevicePtr, kernel_size: Size) -> Option<Vec<f64>> {
        let mut raw = vec![0u8; kernel_size.pixels() * 4];
        if !self.driver.read(kernel, &mut raw) {
            return None;
        }
        Some(
            raw.chunks_exact(4)
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]) as f64)
                .collect(),
        )
    }
}

fn decode(kind: SampleKind, bytes: &[u8]) -> f64 {
    match kind {
        SampleKind::U8 => bytes[0] as f64,
        SampleKind::U16 => u16::from_ne_bytes([bytes[0], bytes[1]]) as f64,
        SampleKind::F32 => f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
    }
}

fn encode(kind: SampleKind, value: f64, out: &mut [u8]) {
    match kind {
        SampleKind::U8 => out[0] = value.round().clamp(0.0, u8::MAX as f64) as u8,
        SampleKind::U16 => out.copy_from_slice(
            &(value.round().clamp(0.0, u16::MAX as f64) as u16).to_ne_bytes(),
        ),
        SampleKind::F32 => out.copy_from_slice(&(value as f32).to_ne_bytes()),
    }
}

impl ImagingNative for SimImaging {
    fn malloc(&self, fmt: FormatKey, width: u32, height: u32) -> (DevicePtr, usize) {
        let row_bytes = width as usize * fmt.pixel_bytes();
        let pitch = row_bytes.max(1).div_ceil(PITCH_ALIGN) * PITCH_ALIGN;
        let ptr = self.driver.alloc_block(pitch * height as usize);
        (ptr, pitch)
    }

    fn free(&self, ptr: DevicePtr) -> i32 {
        if self.driver.free_block(ptr) {
            NppStatus::Success.raw()
        } else {
            NppStatus::BadArgument.raw()
        }
    }

    fn set(&self, fmt: FormatKey, value: &[u8], dst: ImageOperand, roi: Size) -> i32 {
        if let Some(status) = self.begin_op() {
            return status;
        }
        if value.len() != fmt.pixel_bytes() {
            return NppStatus::BadArgument.raw();
        }
        let mut row = Vec::with_capacity(value.len() * roi.width as usize);
        for _ in 0..roi.width {
            row.extend_from_slice(value);
        }
        for y in 0..roi.height {
            let ptr = dst.ptr.byte_offset(y as u64 * dst.pitch as u64);
            if !self.driver.write(ptr, &row) {
                return NppStatus::NullPointer.raw();
            }
        }
        NppStatus::Success.raw()
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
        if let Some(status) = self.begin_op() {
            return status;
        }
        if fmt.channels < 2 {
            return NppStatus::NotSupportedMode.raw();
        }
        let channels = fmt.channels as usize;
        let alpha_max = fmt.sample.alpha_max();
        for y in 0..roi.height {
            for x in 0..roi.width {
                let (a, b) = match (
                    self.sample_at(fmt, src1, x, y),
                    self.sample_at(fmt, src2, x, y),
                ) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return NppStatus::NullPointer.raw(),
                };
                let alpha_a = a[channels - 1] / alpha_max;
                let alpha_b = b[channels - 1] / alpha_max;
                let (fa, fb) = match op {
                    AlphaOp::Over => (1.0, 1.0 - alpha_a),
                    AlphaOp::In => (alpha_b, 0.0),
                    AlphaOp::Out => (1.0 - alpha_b, 0.0),
                    AlphaOp::Atop => (alpha_b, 1.0 - alpha_a),
                    AlphaOp::Xor => (1.0 - alpha_b, 1.0 - alpha_a),
                    AlphaOp::Plus => (1.0, 1.0),
                };
                let mut out = vec![0.0f64; channels];
                for ch in 0..channels - 1 {
                    out[ch] = a[ch] * alpha_a * fa + b[ch] * alpha_b * fb;
                }
                out[channels - 1] = (alpha_a * fa + alpha_b * fb) * alpha_max;
                if !self.store_at(fmt, dst, x, y, &out) {
                    return NppStatus::NullPointer.raw();
                }
            }
        }
        NppStatus::Success.raw()
    }

    fn error_metric_scratch_size(
        &self,
        _fmt: FormatKey,
        _metric: ErrorMetric,
        roi: Size,
    ) -> (i32, usize) {
        // one partial f64 per reduction block plus two accumulator slots
        (
            NppStatus::Success.raw(),
            (roi.pixels().div_ceil(256) + 2) * 8,
        )
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
        if let Some(status) = self.begin_op() {
            return status;
        }
        if result.is_null() || scratch.is_null() {
            return NppStatus::NullPointer.raw();
        }
        // the advertised scratch span must be live device memory
        let (_, required) = self.error_metric_scratch_size(fmt, metric, roi);
        let mut probe = vec![0u8; required];
        if !self.driver.read(scratch, &mut probe) {
            return NppStatus::MemoryAllocation.raw();
        }
        let channels = fmt.channels as usize;
        let mut max_abs = 0.0f64;
        let mut sum_abs = 0.0f64;
        let mut max_rel = 0.0f64;
        let mut sum_rel = 0.0f64;
        let mut samples = 0usize;
        for y in 0..roi.height {
            for x in 0..roi.width {
                let (a, b) = match (
                    self.sample_at(fmt, src1, x, y),
                    self.sample_at(fmt, src2, x, y),
                ) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return NppStatus::NullPointer.raw(),
                };
                for ch in 0..channels {
                    let diff = (a[ch] - b[ch]).abs();
                    let denom = a[ch].abs().max(b[ch].abs());
                    let rel = if denom == 0.0 { 0.0 } else { diff / denom };
                    max_abs = max_abs.max(diff);
                    sum_abs += diff;
                    max_rel = max_rel.max(rel);
                    sum_rel += rel;
                    samples += 1;
                }
            }
        }
        let value = match metric {
            ErrorMetric::Maximum => max_abs,
            ErrorMetric::Average => sum_abs / samples.max(1) as f64,
            ErrorMetric::MaximumRelative => max_rel,
            ErrorMetric::AverageRelative => sum_rel / samples.max(1) as f64,
        };
        if !self.driver.write(result, &value.to_ne_bytes()) {
            return NppStatus::NullPointer.raw();
        }
        NppStatus::Success.raw()
    }

    fn color_twist(
        &self,
        fmt: FormatKey,
        src: ImageOperand,
        dst: ImageOperand,
        roi: Size,
        twist: &TwistMatrix,
    ) -> i32 {
        if let Some(status) = self.begin_op() {
            return status;
        }
        let channels = fmt.channels as usize;
        let twisted = channels.min(3);
        for y in 0..roi.height {
            for x in 0..roi.width {
                let input = match self.sample_at(fmt, src, x, y) {
                    Some(v) => v,
                    None => return NppStatus::NullPointer.raw(),
                };
                let mut out = input.clone();
                for row in 0..twisted {
                    let mut acc = twist[row][3] as f64;
                    for (k, &input_k) in input.iter().enumerate().take(twisted) {
                        acc += twist[row][k] as f64 * input_k;
                    }
                    out[row] = acc;
                }
                if !self.store_at(fmt, dst, x, y, &out) {
                    return NppStatus::NullPointer.raw();
                }
            }
        }
        NppStatus::Success.raw()
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
        if let Some(status) = self.begin_op() {
            return status;
        }
        let coeffs = match self.read_kernel(kernel, kernel_size) {
            Some(c) => c,
            None => return NppStatus::NullPointer.raw(),
        };
        let channels = fmt.channels as usize;
        let mut results = Vec::with_capacity(roi.pixels());
        for y in 0..roi.height {
            for x in 0..roi.width {
                let mut acc = vec![0.0f64; channels];
                for j in 0..kernel_size.height {
                    for i in 0..kernel_size.width {
                        // coefficients are stored in reverse order
                        let weight = coeffs[(kernel_size.height - 1 - j) as usize
                            * kernel_size.width as usize
                            + (kernel_size.width - 1 - i) as usize];
                        let sx = (x as i64 + i as i64 - anchor.x as i64)
                            .clamp(0, roi.width as i64 - 1) as u32;
                        let sy = (y as i64 + j as i64 - anchor.y as i64)
                            .clamp(0, roi.height as i64 - 1) as u32;
                        let sample = match self.sample_at(fmt, src, sx, sy) {
                            Some(v) => v,
                            None => return NppStatus::NullPointer.raw(),
                        };
                        for ch in 0..channels {
                            acc[ch] += weight * sample[ch];
                        }
                    }
                }
                results.push(acc);
            }
        }
        let mut idx = 0;
        for y in 0..roi.height {
            for x in 0..roi.width {
                if !self.store_at(fmt, dst, x, y, &results[idx]) {
                    return NppStatus::NullPointer.raw();
                }
                idx += 1;
            }
        }
        NppStatus::Success.raw()
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
        if let Some(status) = self.begin_op() {
            return status;
        }
        if border != BorderType::Replicate {
            return NppStatus::NotSupportedMode.raw();
        }
        let coeffs = match self.read_kernel(kernel, kernel_size) {
            Some(c) => c,
            None => return NppStatus::NullPointer.raw(),
        };
        let channels = fmt.channels as usize;
        let mut results = Vec::with_capacity(dst_roi.pixels());
        for y in 0..dst_roi.height {
            for x in 0..dst_roi.width {
                let mut acc = vec![0.0f64; channels];
                for j in 0..kernel_size.height {
                    for i in 0..kernel_size.width {
                        let weight = coeffs[(kernel_size.height - 1 - j) as usize
                            * kernel_size.width as usize
                            + (kernel_size.width - 1 - i) as usize];
                        let sx = (src_offset.x as i64 + x as i64 + i as i64 - anchor.x as i64)
                            .clamp(0, src_size.width as i64 - 1) as u32;
                        let sy = (src_offset.y as i64 + y as i64 + j as i64 - anchor.y as i64)
                            .clamp(0, src_size.height as i64 - 1) as u32;
                        let sample = match self.sample_at(fmt, src, sx, sy) {
                            Some(v) => v,
                            None => return NppStatus::NullPointer.raw(),
                        };
                        for ch in 0..channels {
                            acc[ch] += weight * sample[ch];
                        }
                    }
                }
                results.push(acc);
            }
        }
        let mut idx = 0;
        for y in 0..dst_roi.height {
            for x in 0..dst_roi.width {
                if !self.store_at(fmt, dst, x, y, &results[idx]) {
                    return NppStatus::NullPointer.raw();
                }
                idx += 1;
            }
        }
        NppStatus::Success.raw()
    }
}
