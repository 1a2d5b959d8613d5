use cubind_core::NativeStatus;

/// Status codes returned by the image-primitives library.
///
/// Zero is success and negative values are errors. Positive values are
/// warnings the library may emit alongside a valid result; the wrapper
/// treats them as success after logging the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NppStatus {
    Success,
    BadArgument,
    SizeError,
    NullPointer,
    MemoryAllocation,
    RangeError,
    StepError,
    NotSupportedMode,
    Unknown(i32),
}

impl NativeStatus for NppStatus {
    fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Success,
            -2 => Self::BadArgument,
            -6 => Self::SizeError,
            -8 => Self::NullPointer,
            -10 => Self::MemoryAllocation,
            -13 => Self::RangeError,
            -14 => Self::StepError,
            -9999 => Self::NotSupportedMode,
            other => Self::Unknown(other),
        }
    }

    fn raw(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::BadArgument => -2,
            Self::SizeError => -6,
            Self::NullPointer => -8,
            Self::MemoryAllocation => -10,
            Self::RangeError => -13,
            Self::StepError => -14,
            Self::NotSupportedMode => -9999,
            Self::Unknown(raw) => raw,
        }
    }

    fn is_success(self) -> bool {
        self.raw() >= 0
    }
}
