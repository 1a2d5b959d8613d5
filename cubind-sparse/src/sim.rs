use crate::native::{InfoKind, SparseNative};
use crate::status::SparseStatus;
use cubind_core::{NativeStatus, RawHandle};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Simulated sparse library used by tests and examples.
///
/// Handles are monotonically numbered. The live set and the destroy-call
/// counter let tests prove that creation failures leak nothing and that
/// release is idempotent.
#[derive(Debug)]
pub struct SimSparse {
    next: AtomicU64,
    live: Mutex<HashSet<RawHandle>>,
    destroy_calls: AtomicUsize,
    fail_next_create: AtomicBool,
}

impl Default for SimSparse {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(1),
            live: Mutex::new(HashSet::new()),
            destroy_calls: AtomicUsize::new(0),
            fail_next_create: AtomicBool::new(false),
        }
    }
}

impl SimSparse {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> MutexGuard<'_, HashSet<RawHandle>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next create call fail with `AllocFailed`, once.
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Handles created and not yet destroyed.
    pub fn live_handles(&self) -> usize {
        self.live().len()
    }

    /// Total number of destroy calls the library has received.
    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    fn create(&self) -> (i32, RawHandle) {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            log::debug!(target: "cubind", "sim sparse: injected creation failure");
            return (SparseStatus::AllocFailed.raw(), 0);
        }
        let handle = self.next.fetch_add(1, Ordering::SeqCst);
        self.live().insert(handle);
        (SparseStatus::Success.raw(), handle)
    }

    fn destroy(&self, handle: RawHandle) -> i32 {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        if self.live().remove(&handle) {
            SparseStatus::Success.raw()
        } else {
            SparseStatus::InvalidValue.raw()
        }
    }
}

impl SparseNative for SimSparse {
    fn create_handle(&self) -> (i32, RawHandle) {
        self.create()
    }

    fn destroy_handle(&self, handle: RawHandle) -> i32 {
        self.destroy(handle)
    }

    fn create_info(&self, _kind: InfoKind) -> (i32, RawHandle) {
        self.create()
    }

    fn destroy_info(&self, _kind: InfoKind, info: RawHandle) -> i32 {
        self.destroy(info)
    }
}
