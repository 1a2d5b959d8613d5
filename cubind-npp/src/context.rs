use crate::native::ImagingNative;
use crate::sim::SimImaging;
use cubind_core::{DeviceAlloc, SimDriver};
use std::sync::Arc;

/// Shared native-library context every image view holds: the imaging
/// entry points plus the device allocator used for internally managed
/// scratch buffers.
#[derive(Debug)]
pub struct NppContext {
    pub(crate) imaging: Arc<dyn ImagingNative>,
    pub(crate) alloc: Arc<dyn DeviceAlloc>,
}

impl NppContext {
    pub fn new(imaging: Arc<dyn ImagingNative>, alloc: Arc<dyn DeviceAlloc>) -> Arc<Self> {
        Arc::new(Self { imaging, alloc })
    }

    /// Context over the in-host simulated driver.
    pub fn simulated() -> Arc<Self> {
        let driver = Arc::new(SimDriver::new());
        let imaging = Arc::new(SimImaging::new(Arc::clone(&driver)));
        Self::new(imaging, driver)
    }

    pub fn imaging(&self) -> &Arc<dyn ImagingNative> {
        &self.imaging
    }

    pub fn alloc(&self) -> &Arc<dyn DeviceAlloc> {
        &self.alloc
    }
}
