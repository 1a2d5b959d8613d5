use crate::context::NppContext;
use crate::format::{FormatKey, Sample};
use crate::native::ImageOperand;
use crate::status::NppStatus;
use crate::types::{AlphaOp, BorderType, ErrorMetric, Point, Roi, Size, TwistMatrix};
use bytemuck::Zeroable;
use cubind_core::status::{check_raw, check_status, trace_call};
use cubind_core::{CubindError, DeviceBuffer, DevicePtr, PitchedBuffer};
use std::marker::PhantomData;
use std::sync::Arc;

/// A pitched image allocation on the device, viewed through a region of
/// interest.
///
/// `T` is the channel sample type and `C` the channel count; together they
/// select the native entry-point family every operation dispatches to.
/// Each operation validates its arguments, forwards to exactly one native
/// call with the region-derived pointer, and translates a non-success
/// status into a typed error carrying this view's description.
///
/// The view owns its memory only when constructed by [`alloc`](Self::alloc)
/// or [`adopt_raw`](Self::adopt_raw); aliases never free. Teardown happens
/// on drop (or through the explicit, idempotent
/// [`release`](Self::release)), and free failures are logged and swallowed.
/// Aliased views share memory without any locking; serializing concurrent
/// access is the caller's job.
#[derive(Debug)]
pub struct DeviceImage<T: Sample, const C: usize> {
    base: DevicePtr,
    pitch: usize,
    size: Size,
    roi: Roi,
    owns: bool,
    freed: bool,
    ctx: Arc<NppContext>,
    _sample: PhantomData<T>,
}

impl<T: Sample, const C: usize> DeviceImage<T, C> {
    /// The dispatch key of this view's pixel format.
    pub const FORMAT: FormatKey = FormatKey::new(T::KIND, C as u32);

    /// Allocates a fresh pitched image on the device (owning).
    pub fn alloc(ctx: &Arc<NppContext>, width: u32, height: u32) -> Result<Self, CubindError> {
        if width == 0 || height == 0 {
            return Err(CubindError::Precondition(format!(
                "cannot allocate a {width}x{height} image"
            )));
        }
        let call = format!("nppiMalloc_{}", Self::FORMAT.tag());
        let (ptr, pitch) = ctx.imaging.malloc(Self::FORMAT, width, height);
        log::debug!(target: "cubind", "{}: pitch {}, {} channels", call, pitch, C);
        if ptr.is_null() {
            return Err(CubindError::Allocation {
                call,
                detail: format!("{width}x{height} pixels returned a null device pointer"),
            });
        }
        let size = Size::new(width, height);
        Ok(Self {
            base: ptr,
            pitch,
            size,
            roi: Roi::of(size),
            owns: true,
            freed: false,
            ctx: Arc::clone(ctx),
            _sample: PhantomData,
        })
    }

    fn from_raw(
        ctx: &Arc<NppContext>,
        ptr: DevicePtr,
        width: u32,
        height: u32,
        pitch: usize,
        owns: bool,
    ) -> Result<Self, CubindError> {
        if ptr.is_null() {
            return Err(CubindError::Precondition(
                "cannot wrap a null device pointer".to_string(),
            ));
        }
        if width == 0 || height == 0 {
            return Err(CubindError::Precondition(format!(
                "cannot wrap a {width}x{height} image"
            )));
        }
        if pitch < width as usize * Self::FORMAT.pixel_bytes() {
            return Err(CubindError::Precondition(format!(
                "pitch {pitch} does not cover one row of {width} {} pixels",
                Self::FORMAT.tag()
            )));
        }
        let size = Size::new(width, height);
        Ok(Self {
            base: ptr,
            pitch,
            size,
            roi: Roi::of(size),
            owns,
            freed: false,
            ctx: Arc::clone(ctx),
            _sample: PhantomData,
        })
    }

    /// Wraps an already-allocated pointer and takes ownership of it: the
    /// view frees the memory on teardown.
    pub fn adopt_raw(
        ctx: &Arc<NppContext>,
        ptr: DevicePtr,
        width: u32,
        height: u32,
        pitch: usize,
    ) -> Result<Self, CubindError> {
        Self::from_raw(ctx, ptr, width, height, pitch, true)
    }

    /// Non-owning view over an already-allocated pointer. The caller keeps
    /// responsibility for freeing the memory.
    pub fn alias_raw(
        ctx: &Arc<NppContext>,
        ptr: DevicePtr,
        width: u32,
        height: u32,
        pitch: usize,
    ) -> Result<Self, CubindError> {
        Self::from_raw(ctx, ptr, width, height, pitch, false)
    }

    /// Non-owning alias of another view's full allocation, with the region
    /// of interest reset to the full bounds.
    pub fn alias_of(other: &Self) -> Self {
        Self {
            base: other.base,
            pitch: other.pitch,
            size: other.size,
            roi: Roi::of(other.size),
            owns: false,
            freed: false,
            ctx: Arc::clone(&other.ctx),
            _sample: PhantomData,
        }
    }

    // --- Geometry ---

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Row stride in bytes, including padding.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn channels(&self) -> usize {
        C
    }

    pub fn roi(&self) -> Roi {
        self.roi
    }

    pub fn owns_memory(&self) -> bool {
        self.owns
    }

    /// Base pointer of the full allocation.
    pub fn base_ptr(&self) -> DevicePtr {
        self.base
    }

    /// Pointer to the first pixel of the current region of interest:
    /// `base + roi.y * pitch + roi.x * pixel_bytes`.
    pub fn roi_ptr(&self) -> DevicePtr {
        self.base.byte_offset(
            self.roi.y as u64 * self.pitch as u64
                + self.roi.x as u64 * Self::FORMAT.pixel_bytes() as u64,
        )
    }

    /// Narrows the working region. The rectangle must lie inside the full
    /// allocation; out-of-bounds regions are rejected, never clamped.
    pub fn set_roi(&mut self, roi: Roi) -> Result<(), CubindError> {
        if roi.width == 0 || roi.height == 0 {
            return Err(CubindError::Precondition(
                "region of interest must not be empty".to_string(),
            ));
        }
        if !roi.fits_within(self.size) {
            return Err(CubindError::Precondition(format!(
                "region {roi:?} exceeds image bounds {:?}",
                self.size
            )));
        }
        self.roi = roi;
        Ok(())
    }

    /// Resets the region of interest to the full allocation.
    pub fn reset_roi(&mut self) {
        self.roi = Roi::of(self.size);
    }

    fn operand(&self) -> ImageOperand {
        ImageOperand {
            ptr: self.roi_ptr(),
            pitch: self.pitch,
        }
    }

    fn describe(&self) -> String {
        format!(
            "{}x{} {} image, pitch {}, roi {:?}",
            self.size.width,
            self.size.height,
            Self::FORMAT.tag(),
            self.pitch,
            self.roi
        )
    }

    fn check(&self, call: &str, status: i32) -> Result<(), CubindError> {
        check_status::<NppStatus>(call, status, || self.describe())
    }

    fn check_peer_region(&self, peer: &Self, what: &str) -> Result<(), CubindError> {
        if peer.roi.size() != self.roi.size() {
            return Err(CubindError::Precondition(format!(
                "{what} region {:?} does not match source region {:?}",
                peer.roi.size(),
                self.roi.size()
            )));
        }
        Ok(())
    }

    // --- Operations ---

    /// Sets every pixel of the region of interest to `value`.
    pub fn set(&self, value: [T; C]) -> Result<(), CubindError> {
        let status = self.ctx.imaging.set(
            Self::FORMAT,
            bytemuck::cast_slice(&value[..]),
            self.operand(),
            self.roi.size(),
        );
        self.check(&Self::FORMAT.entry("Set"), status)
    }

    /// Alpha composition of `self` with `src2` into `dest`.
    pub fn alpha_comp(&self, src2: &Self, dest: &Self, op: AlphaOp) -> Result<(), CubindError> {
        self.check_peer_region(src2, "second source")?;
        self.check_peer_region(dest, "destination")?;
        let status = self.ctx.imaging.alpha_comp(
            Self::FORMAT,
            self.operand(),
            src2.operand(),
            dest.operand(),
            self.roi.size(),
            op,
        );
        self.check(&Self::FORMAT.alpha_entry(), status)
    }

    /// Scratch bytes the native library needs for `metric` over the
    /// current region.
    pub fn error_scratch_size(&self, metric: ErrorMetric) -> Result<usize, CubindError> {
        let call = Self::FORMAT.entry(&format!("{}GetBufferHostSize", metric.op_name()));
        let (status, bytes) =
            self.ctx
                .imaging
                .error_metric_scratch_size(Self::FORMAT, metric, self.roi.size());
        self.check(&call, status)?;
        Ok(bytes)
    }

    /// Computes `metric` between the regions of `self` and `src2`, writing
    /// the scalar result into `result` on the device.
    ///
    /// A caller-supplied `scratch` buffer is checked against the queried
    /// native requirement before anything is dispatched; too small fails
    /// with a precondition error and the native call never happens. With
    /// `None` a buffer of the required size is allocated and freed
    /// internally.
    pub fn error_metric(
        &self,
        metric: ErrorMetric,
        src2: &Self,
        result: &DeviceBuffer<f64>,
        scratch: Option<&DeviceBuffer<u8>>,
    ) -> Result<(), CubindError> {
        self.check_peer_region(src2, "second source")?;
        if result.is_empty() {
            return Err(CubindError::Precondition(
                "result buffer holds no elements".to_string(),
            ));
        }
        let required = self.error_scratch_size(metric)?;
        let call = Self::FORMAT.entry(metric.op_name());
        let status = match scratch {
            Some(buf) => {
                if buf.size_bytes() < required {
                    return Err(CubindError::Precondition(format!(
                        "scratch buffer of {} bytes is smaller than the required {} bytes",
                        buf.size_bytes(),
                        required
                    )));
                }
                self.ctx.imaging.error_metric(
                    Self::FORMAT,
                    metric,
                    self.operand(),
                    src2.operand(),
                    self.roi.size(),
                    result.device_ptr(),
                    buf.device_ptr(),
                )
            }
            None => {
                log::trace!(target: "cubind", "{call}: allocating {required} scratch bytes internally");
                let scratch = DeviceBuffer::<u8>::alloc(&self.ctx.alloc, required.max(1))?;
                self.ctx.imaging.error_metric(
                    Self::FORMAT,
                    metric,
                    self.operand(),
                    src2.operand(),
                    self.roi.size(),
                    result.device_ptr(),
                    scratch.device_ptr(),
                )
            }
        };
        self.check(&call, status)
    }

    /// Maximum absolute error between the two regions.
    pub fn max_error(
        &self,
        src2: &Self,
        result: &DeviceBuffer<f64>,
        scratch: Option<&DeviceBuffer<u8>>,
    ) -> Result<(), CubindError> {
        self.error_metric(ErrorMetric::Maximum, src2, result, scratch)
    }

    /// Average absolute error between the two regions.
    pub fn average_error(
        &self,
        src2: &Self,
        result: &DeviceBuffer<f64>,
        scratch: Option<&DeviceBuffer<u8>>,
    ) -> Result<(), CubindError> {
        self.error_metric(ErrorMetric::Average, src2, result, scratch)
    }

    /// Maximum relative error between the two regions.
    pub fn maximum_relative_error(
        &self,
        src2: &Self,
        result: &DeviceBuffer<f64>,
        scratch: Option<&DeviceBuffer<u8>>,
    ) -> Result<(), CubindError> {
        self.error_metric(ErrorMetric::MaximumRelative, src2, result, scratch)
    }

    /// Average relative error between the two regions.
    pub fn average_relative_error(
        &self,
        src2: &Self,
        result: &DeviceBuffer<f64>,
        scratch: Option<&DeviceBuffer<u8>>,
    ) -> Result<(), CubindError> {
        self.error_metric(ErrorMetric::AverageRelative, src2, result, scratch)
    }

    /// Applies the color-twist matrix within the region into `dest`.
    pub fn color_twist(&self, dest: &Self, twist: &TwistMatrix) -> Result<(), CubindError> {
        self.check_peer_region(dest, "destination")?;
        let status = self.ctx.imaging.color_twist(
            Self::FORMAT,
            self.operand(),
            dest.operand(),
            self.roi.size(),
            twist,
        );
        self.check(&Self::FORMAT.entry("ColorTwist"), status)
    }

    /// In-place color twist within the region.
    pub fn color_twist_inplace(&self, twist: &TwistMatrix) -> Result<(), CubindError> {
        let status = self.ctx.imaging.color_twist(
            Self::FORMAT,
            self.operand(),
            self.operand(),
            self.roi.size(),
            twist,
        );
        self.check(&Self::FORMAT.entry_inplace("ColorTwist"), status)
    }

    fn check_kernel(
        kernel: &DeviceBuffer<f32>,
        kernel_size: Size,
    ) -> Result<(), CubindError> {
        if kernel_size.width == 0 || kernel_size.height == 0 {
            return Err(CubindError::Precondition(
                "filter kernel must not be empty".to_string(),
            ));
        }
        let needed = kernel_size.pixels();
        if kernel.len() < needed {
            return Err(CubindError::Precondition(format!(
                "kernel buffer holds {} coefficients, a {}x{} filter needs {}",
                kernel.len(),
                kernel_size.width,
                kernel_size.height,
                needed
            )));
        }
        Ok(())
    }

    /// General 2-D convolution over the region into `dest`. Coefficients
    /// are expected in reverse order, as the native filter consumes them.
    pub fn filter(
        &self,
        dest: &Self,
        kernel: &DeviceBuffer<f32>,
        kernel_size: Size,
        anchor: Point,
    ) -> Result<(), CubindError> {
        self.check_peer_region(dest, "destination")?;
        Self::check_kernel(kernel, kernel_size)?;
        let status = self.ctx.imaging.filter(
            Self::FORMAT,
            self.operand(),
            dest.operand(),
            self.roi.size(),
            kernel.device_ptr(),
            kernel_size,
            anchor,
        );
        self.check(&Self::FORMAT.entry("Filter"), status)
    }

    /// Bordered convolution into `dest`'s region. The native call receives
    /// this view's base pointer, full size, and region offset so it can
    /// source pixels outside the region according to `border`.
    pub fn filter_border(
        &self,
        dest: &Self,
        kernel: &DeviceBuffer<f32>,
        kernel_size: Size,
        anchor: Point,
        border: BorderType,
    ) -> Result<(), CubindError> {
        self.check_peer_region(dest, "destination")?;
        Self::check_kernel(kernel, kernel_size)?;
        let src = ImageOperand {
            ptr: self.base,
            pitch: self.pitch,
        };
        let status = self.ctx.imaging.filter_border(
            Self::FORMAT,
            src,
            self.size,
            self.roi.origin(),
            dest.operand(),
            dest.roi.size(),
            kernel.device_ptr(),
            kernel_size,
            anchor,
            border,
        );
        self.check(&Self::FORMAT.entry("FilterBorder"), status)
    }

    // --- Host transfers ---

    /// Uploads tightly packed rows covering the region of interest.
    pub fn copy_from_host(&self, data: &[T]) -> Result<(), CubindError> {
        let region = self.roi.size();
        let expected = region.pixels() * C;
        if data.len() != expected {
            return Err(CubindError::Precondition(format!(
                "host slice holds {} samples, the region needs {}",
                data.len(),
                expected
            )));
        }
        let row_bytes = region.width as usize * Self::FORMAT.pixel_bytes();
        let status = self.ctx.alloc.memcpy_2d_h2d(
            self.roi_ptr(),
            self.pitch,
            bytemuck::cast_slice(data),
            row_bytes,
            row_bytes,
            region.height as usize,
        );
        check_raw("cudaMemcpy2D", status, || self.describe())
    }

    /// Downloads the region of interest as tightly packed rows.
    pub fn copy_to_host(&self) -> Result<Vec<T>, CubindError> {
        let region = self.roi.size();
        let mut out = vec![T::zeroed(); region.pixels() * C];
        let row_bytes = region.width as usize * Self::FORMAT.pixel_bytes();
        let status = self.ctx.alloc.memcpy_2d_d2h(
            self.roi_ptr(),
            self.pitch,
            bytemuck::cast_slice_mut(&mut out),
            row_bytes,
            row_bytes,
            region.height as usize,
        );
        check_raw("cudaMemcpy2D", status, || self.describe())?;
        Ok(out)
    }

    // --- Reinterpretation ---

    /// Reinterprets the full allocation as a generic strided buffer of
    /// `[T; C]` pixels. The pointer, pitch, and bounds carry over; no data
    /// moves and this view keeps ownership.
    pub fn to_pitched(&self) -> PitchedBuffer<[T; C]> {
        PitchedBuffer::new(
            self.base,
            self.size.width as usize,
            self.size.height as usize,
            self.pitch,
        )
    }

    /// Non-owning image view over a strided pixel buffer, with the region
    /// of interest set to the full bounds.
    pub fn from_pitched(
        ctx: &Arc<NppContext>,
        buf: &PitchedBuffer<[T; C]>,
    ) -> Result<Self, CubindError> {
        Self::from_raw(
            ctx,
            buf.device_ptr(),
            buf.width() as u32,
            buf.height() as u32,
            buf.pitch(),
            false,
        )
    }

    // --- Teardown ---

    /// Frees the allocation if this view owns it; later calls are no-ops.
    /// Free failures are logged and swallowed.
    pub fn release(&mut self) {
        if !self.owns || self.freed {
            return;
        }
        self.freed = true;
        let status = self.ctx.imaging.free(self.base);
        trace_call("nppiFree", status);
        if status != 0 {
            log::warn!(target: "cubind", "nppiFree returned status {status}, ignoring");
        }
    }
}

impl<T: Sample, const C: usize> Drop for DeviceImage<T, C> {
    fn drop(&mut self) {
        self.release();
    }
}
