//! Model tier definitions shared across the engine.

const GIB: u64 = 1024 * 1024 * 1024;

/// One candidate generative model in the fallback chain.
///
/// Tiers are ordered from highest quality to cheapest fallback; the
/// loader walks [`ModelTier::chain`] in that order and stops at the
/// first tier that loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    OpenSora,
    CogVideoX5b,
    CogVideoX2b,
    Svd,
}

impl ModelTier {
    /// Tier name for display.
    pub fn name(&self) -> &str {
        match self {
            Self::OpenSora => "Open-Sora",
            Self::CogVideoX5b => "CogVideoX-5B",
            Self::CogVideoX2b => "CogVideoX-2B",
            Self::Svd => "Stable Video Diffusion",
        }
    }

    /// Tier ID used when invoking the backend.
    pub fn id(&self) -> &str {
        match self {
            Self::OpenSora => "open-sora",
            Self::CogVideoX5b => "cogvideox-5b",
            Self::CogVideoX2b => "cogvideox-2b",
            Self::Svd => "svd",
        }
    }

    /// Priority rank in the fallback chain, 0 = primary.
    pub fn rank(&self) -> u8 {
        match self {
            Self::OpenSora => 0,
            Self::CogVideoX5b => 1,
            Self::CogVideoX2b => 2,
            Self::Svd => 3,
        }
    }

    /// Accelerator memory needed to run the tier at full precision.
    pub fn full_precision_bytes(&self) -> u64 {
        match self {
            Self::OpenSora => 24 * GIB,
            Self::CogVideoX5b => 16 * GIB,
            Self::CogVideoX2b => 10 * GIB,
            Self::Svd => 6 * GIB,
        }
    }

    /// Accelerator memory needed with 4-bit quantization applied.
    pub fn quantized_bytes(&self) -> u64 {
        match self {
            Self::OpenSora => 12 * GIB,
            Self::CogVideoX5b => 10 * GIB,
            Self::CogVideoX2b => 6 * GIB,
            Self::Svd => 4 * GIB,
        }
    }

    /// Whether the tier can execute without an accelerator.
    ///
    /// The two heavy tiers are accelerator-only; the loader skips them
    /// outright on CPU-only hosts instead of attempting a doomed load.
    pub fn supports_cpu(&self) -> bool {
        match self {
            Self::OpenSora | Self::CogVideoX5b => false,
            Self::CogVideoX2b | Self::Svd => true,
        }
    }

    /// The full fallback chain in priority order.
    pub fn chain() -> [ModelTier; 4] {
        [Self::OpenSora, Self::CogVideoX5b, Self::CogVideoX2b, Self::Svd]
    }
}

/// Precision mode a tier was loaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Full,
    FourBit,
    CpuFallback,
}

impl Precision {
    pub fn label(&self) -> &str {
        match self {
            Self::Full => "full",
            Self::FourBit => "4-bit",
            Self::CpuFallback => "cpu-fallback",
        }
    }
}
