use crate::memory::{DeviceAlloc, DevicePtr};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

const FIRST_ADDR: u64 = 0x0100_0000;
const ALIGN: u64 = 512;

/// In-host stand-in for the native driver and its allocator.
///
/// Hands out fake device addresses backed by host memory so the wrapper
/// layer can run, and be tested, on machines without the native libraries.
/// Pointer arithmetic behaves like the real allocator: interior pointers
/// (region-of-interest offsets, row pointers) resolve into their containing
/// block. Addresses are never reused, so a stale pointer fails to resolve
/// instead of silently landing in a newer allocation.
#[derive(Debug, Default)]
pub struct SimDriver {
    state: Mutex<SimState>,
    fail_next_alloc: AtomicBool,
}

#[derive(Debug)]
struct SimState {
    next_addr: u64,
    blocks: BTreeMap<u64, Vec<u8>>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            next_addr: FIRST_ADDR,
            blocks: BTreeMap::new(),
        }
    }
}

impl SimDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next allocation request fail, once.
    pub fn fail_next_alloc(&self) {
        self.fail_next_alloc.store(true, Ordering::SeqCst);
    }

    /// Number of blocks currently allocated and not freed.
    pub fn live_allocations(&self) -> usize {
        self.state().blocks.len()
    }

    /// Allocates a block of `bytes`, returning a null pointer if the
    /// driver is out of memory (or a failure was injected).
    pub fn alloc_block(&self, bytes: usize) -> DevicePtr {
        if self.fail_next_alloc.swap(false, Ordering::SeqCst) {
            log::debug!(target: "cubind", "sim driver: injected allocation failure");
            return DevicePtr::NULL;
        }
        let mut state = self.state();
        let addr = state.next_addr;
        let span = (bytes.max(1) as u64).div_ceil(ALIGN) * ALIGN;
        state.next_addr = addr + span + ALIGN;
        state.blocks.insert(addr, vec![0u8; bytes]);
        DevicePtr::from_raw(addr)
    }

    /// Frees a block by its base address. Returns false for pointers that
    /// do not name a live block.
    pub fn free_block(&self, ptr: DevicePtr) -> bool {
        self.state().blocks.remove(&ptr.as_raw()).is_some()
    }

    /// Reads `out.len()` bytes starting at `ptr`, which may point inside a
    /// block. Returns false if the span is not covered by one live block.
    pub fn read(&self, ptr: DevicePtr, out: &mut [u8]) -> bool {
        let state = self.state();
        match resolve(&state, ptr, out.len()) {
            Some((base, offset)) => {
                let block = &state.blocks[&base];
                out.copy_from_slice(&block[offset..offset + out.len()]);
                true
            }
            None => false,
        }
    }

    /// Writes `data` starting at `ptr`; same resolution rules as `read`.
    pub fn write(&self, ptr: DevicePtr, data: &[u8]) -> bool {
        let mut state = self.state();
        match resolve(&state, ptr, data.len()) {
            Some((base, offset)) => match state.blocks.get_mut(&base) {
                Some(block) => {
                    block[offset..offset + data.len()].copy_from_slice(data);
                    true
                }
                None => false,
            },
            None => false,
        }
    }
}

/// Finds the block containing `[ptr, ptr + len)`, returning its base
/// address and the offset of `ptr` within it.
fn resolve(state: &SimState, ptr: DevicePtr, len: usize) -> Option<(u64, usize)> {
    let addr = ptr.as_raw();
    let (base, block) = state.blocks.range(..=addr).next_back()?;
    let offset = (addr - base) as usize;
    if offset + len <= block.len() {
        Some((*base, offset))
    } else {
        None
    }
}

impl DeviceAlloc for SimDriver {
    fn malloc(&self, bytes: usize) -> (i32, DevicePtr) {
        let ptr = self.alloc_block(bytes);
        if ptr.is_null() {
            (2, ptr) // cudaErrorMemoryAllocation
        } else {
            (0, ptr)
        }
    }

    fn free(&self, ptr: DevicePtr) -> i32 {
        if self.free_block(ptr) {
            0
        } else {
            1 // cudaErrorInvalidValue
        }
    }

    fn memcpy_h2d(&self, dst: DevicePtr, src: &[u8]) -> i32 {
        if self.write(dst, src) {
            0
        } else {
            1
        }
    }

    fn memcpy_d2h(&self, src: DevicePtr, dst: &mut [u8]) -> i32 {
        if self.read(src, dst) {
            0
        } else {
            1
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
        for row in 0..rows {
            let start = row * src_pitch;
            if start + row_bytes > src.len() {
                return 1;
            }
            let dst_row = dst.byte_offset((row * dst_pitch) as u64);
            if !self.write(dst_row, &src[start..start + row_bytes]) {
                return 1;
            }
        }
        0
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
        for row in 0..rows {
            let start = row * dst_pitch;
            if start + row_bytes > dst.len() {
                return 1;
            }
            let src_row = src.byte_offset((row * src_pitch) as u64);
            if !self.read(src_row, &mut dst[start..start + row_bytes]) {
                return 1;
            }
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_pointers_resolve_into_their_block() {
        let driver = SimDriver::new();
        let base = driver.alloc_block(1024);
        let inner = base.byte_offset(600);
        assert!(driver.write(inner, &[1, 2, 3, 4]));
        let mut out = [0u8; 4];
        assert!(driver.read(inner, &mut out));
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn spans_crossing_block_end_are_rejected() {
        let driver = SimDriver::new();
        let base = driver.alloc_block(16);
        assert!(!driver.write(base.byte_offset(12), &[0u8; 8]));
    }

    #[test]
    fn freeing_unknown_pointer_fails() {
        let driver = SimDriver::new();
        let base = driver.alloc_block(16);
        assert!(driver.free_block(base));
        assert!(!driver.free_block(base));
        assert!(!driver.free_block(DevicePtr::from_raw(0xdead)));
    }
}
