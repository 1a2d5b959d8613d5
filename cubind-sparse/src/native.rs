use cubind_core::RawHandle;
use std::fmt::Debug;

/// Which analysis-info object a create/destroy pair refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKind {
    /// Incomplete-Cholesky (level 0) analysis info.
    Csric02,
    /// Block triangular solve analysis info.
    Bsrsm2,
}

impl InfoKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Csric02 => "csric02Info",
            Self::Bsrsm2 => "bsrsm2Info",
        }
    }

    pub(crate) fn create_call(self) -> &'static str {
        match self {
            Self::Csric02 => "cusparseCreateCsric02Info",
            Self::Bsrsm2 => "cusparseCreateBsrsm2Info",
        }
    }

    pub(crate) fn destroy_call(self) -> &'static str {
        match self {
            Self::Csric02 => "cusparseDestroyCsric02Info",
            Self::Bsrsm2 => "cusparseDestroyBsrsm2Info",
        }
    }
}

/// Entry points consumed from the native sparse library.
///
/// Each method is one native call returning the raw status code; the
/// wrappers translate. `InfoKind` keys the per-kind create/destroy pairs
/// so the dispatch lives in one place per implementation.
pub trait SparseNative: Debug + Send + Sync {
    fn create_handle(&self) -> (i32, RawHandle);
    fn destroy_handle(&self, handle: RawHandle) -> i32;
    fn create_info(&self, kind: InfoKind) -> (i32, RawHandle);
    fn destroy_info(&self, kind: InfoKind, info: RawHandle) -> i32;
}
