use crate::error::CubindError;
use crate::status::{check_raw, trace_call};
use bytemuck::{Pod, Zeroable};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;

/// Address of a device allocation, or of a location inside one (for
/// example a region-of-interest pointer derived from a base pointer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevicePtr(u64);

impl DevicePtr {
    pub const NULL: DevicePtr = DevicePtr(0);

    pub fn from_raw(addr: u64) -> Self {
        Self(addr)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Address `offset` bytes past this one.
    pub fn byte_offset(self, offset: u64) -> Self {
        Self(self.0 + offset)
    }
}

/// Entry points of the native device memory allocator.
///
/// Each method maps to exactly one native call and returns the raw status
/// code alongside its outputs; translation into [`CubindError`] happens in
/// the wrappers.
pub trait DeviceAlloc: Debug + Send + Sync {
    fn malloc(&self, bytes: usize) -> (i32, DevicePtr);
    fn free(&self, ptr: DevicePtr) -> i32;
    fn memcpy_h2d(&self, dst: DevicePtr, src: &[u8]) -> i32;
    fn memcpy_d2h(&self, src: DevicePtr, dst: &mut [u8]) -> i32;
    /// Row-wise copy into a pitched destination. `src` holds `rows` rows of
    /// `src_pitch` bytes each, of which the first `row_bytes` are copied.
    fn memcpy_2d_h2d(
        &self,
        dst: DevicePtr,
        dst_pitch: usize,
        src: &[u8],
        src_pitch: usize,
        row_bytes: usize,
        rows: usize,
    ) -> i32;
    fn memcpy_2d_d2h(
        &self,
        src: DevicePtr,
        src_pitch: usize,
        dst: &mut [u8],
        dst_pitch: usize,
        row_bytes: usize,
        rows: usize,
    ) -> i32;
}

/// A typed linear allocation on the device.
///
/// Used for scratch space, result scalars, and filter coefficients. The
/// buffer owns its memory unless constructed over an existing pointer with
/// `owns == false`; only an owning buffer frees on teardown, exactly once.
#[derive(Debug)]
pub struct DeviceBuffer<T> {
    ptr: DevicePtr,
    len: usize,
    owns: bool,
    freed: bool,
    alloc: Arc<dyn DeviceAlloc>,
    _elem: PhantomData<T>,
}

impl<T> DeviceBuffer<T> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn size_bytes(&self) -> usize {
        self.len * mem::size_of::<T>()
    }

    pub fn device_ptr(&self) -> DevicePtr {
        self.ptr
    }

    pub fn owns_memory(&self) -> bool {
        self.owns
    }

    /// Frees the allocation if owning; later calls are no-ops. Free
    /// failures are logged and swallowed.
    pub fn release(&mut self) {
        if !self.owns || self.freed {
            return;
        }
        self.freed = true;
        if self.ptr.is_null() {
            return;
        }
        let status = self.alloc.free(self.ptr);
        trace_call("cudaFree", status);
        if status != 0 {
            log::warn!(target: "cubind", "cudaFree returned status {status}, ignoring");
        }
    }

    fn describe(&self) -> String {
        format!(
            "linear buffer of {} x {}-byte elements",
            self.len,
            mem::size_of::<T>()
        )
    }
}

impl<T: Pod> DeviceBuffer<T> {
    /// Allocates `len` elements through the native allocator.
    pub fn alloc(alloc: &Arc<dyn DeviceAlloc>, len: usize) -> Result<Self, CubindError> {
        if len == 0 {
            return Err(CubindError::Precondition(
                "cannot allocate an empty device buffer".to_string(),
            ));
        }
        let bytes = len * mem::size_of::<T>();
        let (status, ptr) = alloc.malloc(bytes);
        trace_call("cudaMalloc", status);
        if status != 0 || ptr.is_null() {
            return Err(CubindError::Allocation {
                call: "cudaMalloc".to_string(),
                detail: format!("{bytes} bytes, status {status}"),
            });
        }
        Ok(Self {
            ptr,
            len,
            owns: true,
            freed: false,
            alloc: Arc::clone(alloc),
            _elem: PhantomData,
        })
    }

    /// Allocates and uploads `data` in one step.
    pub fn from_host(alloc: &Arc<dyn DeviceAlloc>, data: &[T]) -> Result<Self, CubindError> {
        let buf = Self::alloc(alloc, data.len())?;
        buf.copy_from_host(data)?;
        Ok(buf)
    }

    /// Wraps an existing allocation. With `owns == true` the buffer takes
    /// ownership and frees the pointer on teardown; with `owns == false` it
    /// is a non-owning alias and frees nothing.
    pub fn from_raw(
        alloc: &Arc<dyn DeviceAlloc>,
        ptr: DevicePtr,
        len: usize,
        owns: bool,
    ) -> Self {
        Self {
            ptr,
            len,
            owns,
            freed: false,
            alloc: Arc::clone(alloc),
            _elem: PhantomData,
        }
    }

    pub fn copy_from_host(&self, data: &[T]) -> Result<(), CubindError> {
        if data.len() != self.len {
            return Err(CubindError::Precondition(format!(
                "host slice holds {} elements, buffer holds {}",
                data.len(),
                self.len
            )));
        }
        let status = self.alloc.memcpy_h2d(self.ptr, bytemuck::cast_slice(data));
        check_raw("cudaMemcpy", status, || self.describe())
    }

    pub fn copy_to_host(&self) -> Result<Vec<T>, CubindError> {
        let mut out = vec![T::zeroed(); self.len];
        let status = self
            .alloc
            .memcpy_d2h(self.ptr, bytemuck::cast_slice_mut(&mut out));
        check_raw("cudaMemcpy", status, || self.describe())?;
        Ok(out)
    }
}

impl<T> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Non-owning descriptor of a pitched, row-major 2-D device allocation.
///
/// This is the reinterpretation carrier between the image views and
/// generic strided code: conversions into and out of it keep the pointer,
/// pitch, and bounds, move no data, and never transfer ownership. The
/// pitch is trusted to cover at least one row of `width` elements.
#[derive(Debug, Clone, Copy)]
pub struct PitchedBuffer<T> {
    ptr: DevicePtr,
    width: usize,
    height: usize,
    pitch: usize,
    _elem: PhantomData<T>,
}

impl<T> PitchedBuffer<T> {
    pub fn new(ptr: DevicePtr, width: usize, height: usize, pitch: usize) -> Self {
        Self {
            ptr,
            width,
            height,
            pitch,
            _elem: PhantomData,
        }
    }

    pub fn device_ptr(&self) -> DevicePtr {
        self.ptr
    }

    /// Elements per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per row including padding.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Pointer to the start of `row`.
    pub fn row_ptr(&self, row: usize) -> DevicePtr {
        self.ptr.byte_offset((row * self.pitch) as u64)
    }

    pub fn size_bytes(&self) -> usize {
        self.pitch * self.height
    }
}
