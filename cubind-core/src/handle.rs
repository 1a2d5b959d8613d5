use crate::error::CubindError;
use crate::status::trace_call;

/// Raw opaque token handed out by a native create entry point.
pub type RawHandle = u64;

/// Lifecycle cell for one native opaque handle.
///
/// The cell holds the token from successful creation until it is released.
/// Release happens at most once; further release calls are no-ops. The cell
/// itself never frees anything: the owning wrapper is expected to invoke
/// [`release`](HandleCell::release) from its `Drop` impl, and a cell dropped
/// while still live only emits a leak warning.
#[derive(Debug)]
pub struct HandleCell {
    raw: RawHandle,
    name: &'static str,
    released: bool,
}

impl HandleCell {
    /// Runs the native create call and checks its status.
    ///
    /// `name` is the handle type used in diagnostics; `create_call` is the
    /// native entry-point name recorded in the log. A non-zero status fails
    /// the whole construction with [`CubindError::Creation`].
    pub fn acquire<F>(
        name: &'static str,
        create_call: &str,
        create: F,
    ) -> Result<Self, CubindError>
    where
        F: FnOnce() -> (i32, RawHandle),
    {
        let (status, raw) = create();
        trace_call(create_call, status);
        if status != 0 {
            return Err(CubindError::Creation {
                call: create_call.to_string(),
                status,
            });
        }
        Ok(Self {
            raw,
            name,
            released: false,
        })
    }

    /// The raw token. Valid until the cell is released.
    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Invokes the native destroy entry point, at most once.
    ///
    /// A second call is a logged no-op. Destroy failures are logged and
    /// swallowed; teardown never fails.
    pub fn release<F>(&mut self, destroy_call: &str, destroy: F)
    where
        F: FnOnce(RawHandle) -> i32,
    {
        if self.released {
            log::trace!(target: "cubind", "{}: release after release, ignoring", self.name);
            return;
        }
        self.released = true;
        let status = destroy(self.raw);
        trace_call(destroy_call, status);
        if status != 0 {
            log::warn!(
                target: "cubind",
                "{} destroy returned status {status}, ignoring",
                self.name
            );
        }
    }
}

impl Drop for HandleCell {
    fn drop(&mut self) {
        if !self.released {
            log::warn!(
                target: "cubind",
                "{} handle {:#x} dropped without release, native resource leaked",
                self.name,
                self.raw
            );
        }
    }
}
