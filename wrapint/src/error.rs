use core::fmt;

/// Failure modes for operations on [`crate::WrapInt`].
///
/// Mirrors the split the rest of this workspace relies on: most of these are
/// recoverable (the caller should fall back to `top` and move on), but a
/// mismatched bitwidth or an unsupported conversion width indicates a bug in
/// the caller and should be treated as fatal further up the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapIntError {
    /// Two operands that should share a bitwidth did not.
    BitwidthMismatch { lhs: u32, rhs: u32 },
    /// A mathematical integer does not fit in the requested bitwidth.
    DoesNotFit { bitwidth: u32 },
    /// Division or remainder with a zero divisor.
    DivideByZero,
    /// Sign/zero extension or truncation requested between incompatible
    /// widths (extension needs `dst >= src`, truncation needs `dst <= src`).
    UnsupportedConversion { src: u32, dst: u32 },
    /// A bitwidth of zero, or one exceeding [`crate::W_MAX`], was requested.
    InvalidBitwidth(u32),
}

impl fmt::Display for WrapIntError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WrapIntError::BitwidthMismatch { lhs, rhs } => {
                write!(f, "bitwidth mismatch: lhs has {lhs} bits, rhs has {rhs} bits")
            }
            WrapIntError::DoesNotFit { bitwidth } => {
                write!(f, "value does not fit in {bitwidth} bits")
            }
            WrapIntError::DivideByZero => write!(f, "division by zero"),
            WrapIntError::UnsupportedConversion { src, dst } => {
                write!(f, "unsupported conversion from {src} bits to {dst} bits")
            }
            WrapIntError::InvalidBitwidth(bw) => write!(f, "invalid bitwidth {bw}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WrapIntError {}
