use cubind_core::NativeStatus;

/// Status codes returned by the sparse library.
///
/// Raw values follow the native header; anything outside the known range
/// is preserved in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseStatus {
    Success,
    NotInitialized,
    AllocFailed,
    InvalidValue,
    ArchMismatch,
    MappingError,
    ExecutionFailed,
    InternalError,
    MatrixTypeNotSupported,
    ZeroPivot,
    NotSupported,
    Unknown(i32),
}

impl NativeStatus for SparseStatus {
    fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Success,
            1 => Self::NotInitialized,
            2 => Self::AllocFailed,
            3 => Self::InvalidValue,
            4 => Self::ArchMismatch,
            5 => Self::MappingError,
            6 => Self::ExecutionFailed,
            7 => Self::InternalError,
            8 => Self::MatrixTypeNotSupported,
            9 => Self::ZeroPivot,
            10 => Self::NotSupported,
            other => Self::Unknown(other),
        }
    }

    fn raw(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::NotInitialized => 1,
            Self::AllocFailed => 2,
            Self::InvalidValue => 3,
            Self::ArchMismatch => 4,
            Self::MappingError => 5,
            Self::ExecutionFailed => 6,
            Self::InternalError => 7,
            Self::MatrixTypeNotSupported => 8,
            Self::ZeroPivot => 9,
            Self::NotSupported => 10,
            Self::Unknown(raw) => raw,
        }
    }

    fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}
