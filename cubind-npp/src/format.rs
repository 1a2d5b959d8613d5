use bytemuck::{Pod, Zeroable};
use num_traits::{FromPrimitive, ToPrimitive};
use std::fmt::Debug;

/// Storage type of one channel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    U8,
    U16,
    F32,
}

impl SampleKind {
    /// Byte size of a single sample.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }

    /// Tag used in native entry-point names (`8u`, `16u`, `32f`).
    pub const fn tag(self) -> &'static str {
        match self {
            Self::U8 => "8u",
            Self::U16 => "16u",
            Self::F32 => "32f",
        }
    }

    /// Largest representable channel value, used to normalize alpha.
    pub(crate) fn alpha_max(self) -> f64 {
        match self {
            Self::U8 => u8::MAX as f64,
            Self::U16 => u16::MAX as f64,
            Self::F32 => 1.0,
        }
    }
}

/// Dispatch key: one (sample type, channel count) pair.
///
/// Every operation in the catalog resolves through this key to a concrete
/// per-format native entry point, replacing the one-wrapper-type-per-format
/// pattern of the native headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatKey {
    pub sample: SampleKind,
    pub channels: u32,
}

impl FormatKey {
    pub const fn new(sample: SampleKind, channels: u32) -> Self {
        Self { sample, channels }
    }

    /// Bytes per pixel (all channels).
    pub fn pixel_bytes(self) -> usize {
        self.sample.byte_size() * self.channels as usize
    }

    /// Format tag in entry-point names, e.g. `32f_C2`.
    pub fn tag(self) -> String {
        format!("{}_C{}", self.sample.tag(), self.channels)
    }

    /// ROI entry-point name, e.g. `nppiSet_32f_C2R`.
    pub fn entry(self, op: &str) -> String {
        format!("nppi{}_{}R", op, self.tag())
    }

    /// In-place ROI entry-point name, e.g. `nppiColorTwist_32f_C2IR`.
    pub fn entry_inplace(self, op: &str) -> String {
        format!("nppi{}_{}IR", op, self.tag())
    }

    /// Alpha-composition entry-point name; the alpha channel is counted
    /// separately there, e.g. `nppiAlphaComp_32f_AC1R` for two channels.
    pub fn alpha_entry(self) -> String {
        format!(
            "nppiAlphaComp_{}_AC{}R",
            self.sample.tag(),
            self.channels.saturating_sub(1).max(1)
        )
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for f32 {}
}

/// A channel sample type the dispatch table knows about.
///
/// Sealed: the set of sample types mirrors the native entry-point families
/// and cannot be extended from outside the crate.
pub trait Sample:
    Pod
    + Zeroable
    + Copy
    + PartialEq
    + Debug
    + ToPrimitive
    + FromPrimitive
    + Send
    + Sync
    + sealed::Sealed
    + 'static
{
    const KIND: SampleKind;
}

impl Sample for u8 {
    const KIND: SampleKind = SampleKind::U8;
}

impl Sample for u16 {
    const KIND: SampleKind = SampleKind::U16;
}

impl Sample for f32 {
    const KIND: SampleKind = SampleKind::F32;
}
