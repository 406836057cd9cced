//! Enumerates the scalar element types that may cross the bridge.

use std::fmt;

/// Logical dtype identifier shared between engines and bridge objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    #[default]
    /// 32-bit floating point following IEEE-754 semantics.
    F32,
}

impl DType {
    /// Returns the number of bytes required per scalar element.
    pub fn size_in_bytes(self) -> usize {
        match self {
            DType::F32 => 4,
        }
    }

    /// Name used in type strings, matching the engine's own spelling.
    pub fn name(self) -> &'static str {
        match self {
            DType::F32 => "float",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
