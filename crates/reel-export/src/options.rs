//! Export options.

use crate::error::{ExportError, Result};

/// Output bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    #[default]
    Int16,
    Int24,
    Float32,
}

impl BitDepth {
    /// Bits per sample.
    pub fn bits(&self) -> u16 {
        match self {
            BitDepth::Int16 => 16,
            BitDepth::Int24 => 24,
            BitDepth::Float32 => 32,
        }
    }

    /// Map a `bit_depth` encoder setting onto a supported depth.
    ///
    /// 32 bits selects float samples.
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            16 => Ok(BitDepth::Int16),
            24 => Ok(BitDepth::Int24),
            32 => Ok(BitDepth::Float32),
            other => Err(ExportError::InvalidOptions(format!(
                "unsupported bit depth: {}",
                other
            ))),
        }
    }
}
