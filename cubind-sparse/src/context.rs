use crate::native::SparseNative;
use cubind_core::{CubindError, HandleCell, RawHandle};
use std::sync::Arc;

/// Wrapper for the sparse library handle itself.
///
/// Created eagerly; a failing native create fails the constructor. The
/// handle is destroyed exactly once, by [`release`](Self::release) or by
/// drop, whichever comes first.
#[derive(Debug)]
pub struct SparseContext {
    cell: HandleCell,
    lib: Arc<dyn SparseNative>,
}

impl SparseContext {
    pub fn new(lib: &Arc<dyn SparseNative>) -> Result<Self, CubindError> {
        let cell = HandleCell::acquire("cusparseHandle", "cusparseCreate", || lib.create_handle())?;
        Ok(Self {
            cell,
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

    /// Destroys the native handle. Idempotent; failures are logged and
    /// swallowed.
    pub fn release(&mut self) {
        let lib = Arc::clone(&self.lib);
        self.cell
            .release("cusparseDestroy", |h| lib.destroy_handle(h));
    }
}

impl Drop for SparseContext {
    fn drop(&mut self) {
        self.release();
    }
}
