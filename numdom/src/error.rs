use thiserror::Error;
use wrapint::WrapIntError;

/// Fatal misuse errors. Per the error-handling design these indicate a bug
/// in the caller (the CFG driver) rather than an unusual but legitimate
/// program state, and should terminate the analysis with diagnostic
/// context rather than be silently absorbed.
///
/// Recoverable conditions (divide-by-zero, a value that does not fit a
/// bitwidth, an ill-typed constraint, a solver budget exhausted) are never
/// represented here: they are logged via `tracing::warn!` at the call site
/// and the operation falls back to a sound `top`/no-op result instead.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("bitwidth mismatch combining abstract values: {0}")]
    Bitwidth(#[from] WrapIntError),

    #[error("bitwidth requested from a vacuous (top or bottom) abstract value")]
    BitwidthFromVacuous,

    #[error("unsupported conversion from {src} bits to {dst} bits")]
    UnsupportedConversion { src: u32, dst: u32 },

    #[error("variable {0:?} is not bound in this environment")]
    UnboundVariable(String),

    #[error("rename requires a bijective mapping, but {0:?} was mapped more than once")]
    NotBijective(String),
}
