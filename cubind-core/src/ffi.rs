//! Bindings to the real CUDA runtime allocator, linked at build time.
//! Compiled only with the `cuda` feature.

use crate::memory::{DeviceAlloc, DevicePtr};
use std::os::raw::{c_int, c_void};

#[link(name = "cudart")]
extern "C" {
    fn cudaMalloc(dev_ptr: *mut *mut c_void, size: usize) -> c_int;
    fn cudaFree(dev_ptr: *mut c_void) -> c_int;
    fn cudaMemcpy(dst: *mut c_void, src: *const c_void, count: usize, kind: c_int) -> c_int;
    fn cudaMemcpy2D(
        dst: *mut c_void,
        dpitch: usize,
        src: *const c_void,
        spitch: usize,
        width: usize,
        height: usize,
        kind: c_int,
    ) -> c_int;
}

const MEMCPY_HOST_TO_DEVICE: c_int = 1;
const MEMCPY_DEVICE_TO_HOST: c_int = 2;

/// [`DeviceAlloc`] over the CUDA runtime.
#[derive(Debug, Default)]
pub struct CudaRuntime;

impl DeviceAlloc for CudaRuntime {
    fn malloc(&self, bytes: usize) -> (i32, DevicePtr) {
        let mut ptr: *mut c_void = std::ptr::null_mut();
        let status = unsafe { cudaMalloc(&mut ptr, bytes) };
        (status, DevicePtr::from_raw(ptr as u64))
    }

    fn free(&self, ptr: DevicePtr) -> i32 {
        unsafe { cudaFree(ptr.as_raw() as *mut c_void) }
    }

    fn memcpy_h2d(&self, dst: DevicePtr, src: &[u8]) -> i32 {
        unsafe {
            cudaMemcpy(
                dst.as_raw() as *mut c_void,
                src.as_ptr() as *const c_void,
                src.len(),
                MEMCPY_HOST_TO_DEVICE,
            )
        }
    }

    fn memcpy_d2h(&self, src: DevicePtr, dst: &mut [u8]) -> i32 {
        unsafe {
            cudaMemcpy(
                dst.as_mut_ptr() as *mut c_void,
                src.as_raw() as *const c_void,
                dst.len(),
                MEMCPY_DEVICE_TO_HOST,
            )
        }
    }

    fn memcpy_2d_h2d(
        &self,
        dst: DevicePtr,
        dst_pitch: usize,
        src: &[u8],
        src_pitch: usize,
        row_bytes: usize,
        rows: usize,
    ) -> i32 {
        unsafe {
            cudaMemcpy2D(
                dst.as_raw() as *mut c_void,
                dst_pitch,
                src.as_ptr() as *const c_void,
                src_pitch,
                row_bytes,
                rows,
                MEMCPY_HOST_TO_DEVICE,
            )
        }
    }

    fn memcpy_2d_d2h(
        &self,
        src: DevicePtr,
        src_pitch: usize,
        dst: &mut [u8],
        dst_pitch: usize,
        row_bytes: usize,
        rows: usize,
    ) -> i32 {
        unsafe {
            cudaMemcpy2D(
                dst.as_mut_ptr() as *mut c_void,
                dst_pitch,
                src.as_raw() as *const c_void,
                src_pitch,
                row_bytes,
                rows,
                MEMCPY_DEVICE_TO_HOST,
            )
        }
    }
}
