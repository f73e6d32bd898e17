//! Abstract-interpretation numerical domains over fixed-width machine
//! integers, signedness-agnostic throughout: every value carries a bitwidth
//! but never an intrinsic signedness, matching how a CFG built from machine
//! code or from a signedness-erased IR actually looks.
//!
//! The crate is layered bottom-up:
//!
//! - [`interval`] — an unbounded mathematical interval, the external
//!   driver-facing view a value is rendered to.
//! - [`tnum`]/[`witv`] — the two abstract domains proper: known-bits
//!   ("tnum") and split wrapped-interval, each with its own transfer
//!   functions in the sibling `*_ops` module.
//! - [`stnum`] — a signedness-split pair of tnums, so that a value
//!   straddling the sign-bit pole still gets a tight known-bits
//!   approximation on each side of it.
//! - [`env`] — lifts any of the above point-wise over a set of named
//!   variables.
//! - [`reduced`] — keeps a range environment and a tnum environment over
//!   the same variables mutually tightened.
//! - [`linexpr`]/[`solver`] — a linear constraint language and the
//!   propagation engine that refines an environment against a system of
//!   such constraints.
//! - [`domain`] — the public façade gluing all of the above into one
//!   [`domain::NumericalDomain`] a driver actually holds per program
//!   point.

pub mod domain;
pub mod env;
pub mod error;
pub mod interval;
pub mod linexpr;
pub mod reduced;
pub mod solver;
pub mod stnum;
pub mod stnum_ops;
pub mod tnum;
pub mod tnum_ops;
pub mod witv;
pub mod witv_ops;

pub use domain::{ArithOp, BitwiseOp, ConvOp, NumericalDomain, Operand};
pub use env::{Env, Lattice};
pub use error::DomainError;
pub use interval::{Bound, Interval};
pub use linexpr::{Classification, Coeff, Constraint, LinExpr};
pub use reduced::ReducedProduct;
pub use solver::{RefineDomain, SolveReport, SolverConfig, SolverStats};
pub use stnum::Stnum;
pub use tnum::Tnum;
pub use witv::SplitWrappedInterval;

pub use wrapint::{WrapInt, WrapIntError};
