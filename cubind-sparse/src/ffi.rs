//! Bindings to the real sparse library, linked at build time.
//! Compiled only with the `cuda` feature.

use crate::native::{InfoKind, SparseNative};
use cubind_core::RawHandle;
use std::os::raw::{c_int, c_void};

#[link(name = "cusparse")]
extern "C" {
    fn cusparseCreate(handle: *mut *mut c_void) -> c_int;
    fn cusparseDestroy(handle: *mut c_void) -> c_int;
    fn cusparseCreateCsric02Info(info: *mut *mut c_void) -> c_int;
    fn cusparseDestroyCsric02Info(info: *mut c_void) -> c_int;
    fn cusparseCreateBsrsm2Info(info: *mut *mut c_void) -> c_int;
    fn cusparseDestroyBsrsm2Info(info: *mut c_void) -> c_int;
}

fn create_with(f: unsafe extern "C" fn(*mut *mut c_void) -> c_int) -> (i32, RawHandle) {
    let mut handle: *mut c_void = std::ptr::null_mut();
    let status = unsafe { f(&mut handle) };
    (status, handle as u64)
}

fn destroy_with(f: unsafe extern "C" fn(*mut c_void) -> c_int, handle: RawHandle) -> i32 {
    unsafe { f(handle as *mut c_void) }
}

/// [`SparseNative`] over the real library.
#[derive(Debug, Default)]
pub struct CusparseLib;

impl SparseNative for CusparseLib {
    fn create_handle(&self) -> (i32, RawHandle) {
        create_with(cusparseCreate)
    }

    fn destroy_handle(&self, handle: RawHandle) -> i32 {
        destroy_with(cusparseDestroy, handle)
    }

    fn create_info(&self, kind: InfoKind) -> (i32, RawHandle) {
        match kind {
            InfoKind::Csric02 => create_with(cusparseCreateCsric02Info),
            InfoKind::Bsrsm2 => create_with(cusparseCreateBsrsm2Info),
        }
    }

    fn destroy_info(&self, kind: InfoKind, info: RawHandle) -> i32 {
        match kind {
            InfoKind::Csric02 => destroy_with(cusparseDestroyCsric02Info, info),
            InfoKind::Bsrsm2 => destroy_with(cusparseDestroyBsrsm2Info, info),
        }
    }
}
