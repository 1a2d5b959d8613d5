use crate::native::{InfoKind, SparseNative};
use cubind_core::{CubindError, HandleCell, RawHandle};
use std::sync::Arc;

fn acquire_info(
    lib: &Arc<dyn SparseNative>,
    kind: InfoKind,
) -> Result<HandleCell, CubindError> {
    HandleCell::acquire(kind.name(), kind.create_call(), || lib.create_info(kind))
}

/// Wrapper for the incomplete-Cholesky (csric02) analysis-info object.
#[derive(Debug)]
pub struct Csric02Info {
    cell: HandleCell,
    lib: Arc<dyn SparseNative>,
}

impl Csric02Info {
    pub fn new(lib: &Arc<dyn SparseNative>) -> Result<Self, CubindError> {
        Ok(Self {
            cell: acquire_info(lib, InfoKind::Csric02)?,
            lib: Arc::clone(lib),
        })
    }

    /// The inner native handle.
    pub fn raw(&self) -> RawHandle {
        self.cell.raw()
    }

    pub fn is_released(&self) -> bool {
        self.cell.is_released()
    }

    /// Destroys the native info object. Idempotent; failures are logged
    /// and swallowed.
    pub fn release(&mut self) {
        let lib = Arc::clone(&self.lib);
        self.cell.release(InfoKind::Csric02.destroy_call(), |h| {
            lib.destroy_info(InfoKind::Csric02, h)
        });
    }
}

impl Drop for Csric02Info {
    fn drop(&mut self) {
        self.release();
    }
}

/// Wrapper for the block triangular solve (bsrsm2) analysis-info object.
#[derive(Debug)]
pub struct Bsrsm2Info {
    cell: HandleCell,
    lib: Arc<dyn SparseNative>,
}

impl Bsrsm2Info {
    pub fn new(lib: &Arc<dyn SparseNative>) -> Result<Self, CubindError> {
        Ok(Self {
            cell: acquire_info(lib, InfoKind::Bsrsm2)?,
            lib: Arc::clone(lib),
        })
    }

    /// The inner native handle.
    pub fn raw(&self) -> RawHandle {
        self.cell.raw()
    }

    pub fn is_released(&self) -> bool {
        self.cell.is_released()
    }

    /// Destroys the native info object. Idempotent; failures are logged
    /// and swallowed.
    pub fn release(&mut self) {
        let lib = Arc::clone(&self.lib);
        self.cell.release(InfoKind::Bsrsm2.destroy_call(), |h| {
            lib.destroy_info(InfoKind::Bsrsm2, h)
        });
    }
}

impl Drop for Bsrsm2Info {
    fn drop(&mut self) {
        self.release();
    }
}
