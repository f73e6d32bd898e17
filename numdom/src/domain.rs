//! Public façade (C9): a numerical abstract domain over named variables,
//! combining the reduced range/tnum product (C7) with the linear constraint
//! solver (C8). This is the surface a CFG-walking driver actually calls;
//! everything else in this crate is plumbing it assembles.
//!
//! Per Section 9's design note, backward (condition-guided refinement of an
//! operation's *operands* from a known *result*) transfer functions are
//! intentionally omitted here — see `DESIGN.md`. Every method below is a
//! forward operation.

use std::hash::Hash;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use wrapint::{WrapInt, WrapIntError};

use crate::{
    env::Env,
    error::DomainError,
    interval::Interval,
    linexpr::{Coeff, Constraint, LinExpr},
    reduced::ReducedProduct,
    solver::{self, RefineDomain, SolveReport, SolverConfig, SolverStats},
    stnum::Stnum,
    witv::SplitWrappedInterval,
};

/// A right-hand operand: either another tracked variable or a literal at a
/// fixed bitwidth.
#[derive(Clone, Debug)]
pub enum Operand<Var> {
    Var(Var),
    Const(WrapInt),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Udiv,
    Urem,
    Sdiv,
    Srem,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
    Shl,
    Lshr,
    Ashr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvOp {
    Zext,
    Sext,
    Trunc,
}

fn bitwidth_mismatch(lhs: u32, rhs: u32) -> DomainError {
    DomainError::Bitwidth(WrapIntError::BitwidthMismatch { lhs, rhs })
}

fn neg(c: Coeff) -> Coeff {
    -c
}

/// Negates one constraint into the constraint asserting its complement,
/// used by [`NumericalDomain::entails`].
fn negate<Var: Clone + Eq + Hash>(c: Constraint<Var>) -> Constraint<Var> {
    match c {
        Constraint::Eq(e) => Constraint::Ne(e),
        Constraint::Ne(e) => Constraint::Eq(e),
        Constraint::Le(e) => Constraint::Lt(negate_expr(e)),
        Constraint::Lt(e) => Constraint::Le(negate_expr(e)),
    }
}

fn negate_expr<Var: Clone + Eq + Hash>(e: LinExpr<Var>) -> LinExpr<Var> {
    let mut out = LinExpr::constant(neg(e.constant.clone()));
    for v in e.vars() {
        out = out.with_term(v.clone(), neg(e.coeff_of(v)));
    }
    out
}

/// The reduced product of a signedness-agnostic wrapped-interval domain and
/// a signedness-split known-bits domain, with a linear constraint solver
/// layered on top.
#[derive(Clone)]
pub struct NumericalDomain<Var> {
    product: ReducedProduct<Var>,
}

impl<Var: Clone + Eq + Hash> NumericalDomain<Var> {
    pub fn make_top() -> Self {
        NumericalDomain {
            product: ReducedProduct::top(),
        }
    }

    pub fn make_bottom() -> Self {
        NumericalDomain {
            product: ReducedProduct::bottom(),
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.product.is_bottom()
    }

    pub fn is_top(&self) -> bool {
        self.product.ranges.is_top() && self.product.tnums.is_top()
    }

    pub fn leq(&self, other: &Self, bitwidth_of: impl Fn(&Var) -> u32 + Copy) -> bool {
        self.product.ranges.leq(&other.product.ranges, bitwidth_of)
            && self.product.tnums.leq(&other.product.tnums, bitwidth_of)
    }

    pub fn join(&self, other: &Self, bitwidth_of: impl Fn(&Var) -> u32 + Copy) -> Self {
        NumericalDomain {
            product: ReducedProduct {
                ranges: self.product.ranges.join(&other.product.ranges, bitwidth_of),
                tnums: self.product.tnums.join(&other.product.tnums, bitwidth_of),
            },
        }
    }

    /// Meet is where the two sides actually inform each other: every
    /// variable touched by either operand is fed through
    /// [`ReducedProduct::reduce_variable`] afterward.
    pub fn meet(&self, other: &Self, bitwidth_of: impl Fn(&Var) -> u32 + Copy) -> Self {
        let mut product = ReducedProduct {
            ranges: self.product.ranges.meet(&other.product.ranges, bitwidth_of),
            tnums: self.product.tnums.meet(&other.product.tnums, bitwidth_of),
        };
        let touched: Vec<Var> = self
            .product
            .ranges
            .keys()
            .chain(other.product.ranges.keys())
            .chain(self.product.tnums.keys())
            .chain(other.product.tnums.keys())
            .cloned()
            .collect();
        for v in touched {
            if product.is_bottom() {
                break;
            }
            product.reduce_variable(&v, bitwidth_of(&v));
        }
        NumericalDomain { product }
    }

    pub fn widen(&self, other: &Self, bitwidth_of: impl Fn(&Var) -> u32 + Copy) -> Self {
        NumericalDomain {
            product: ReducedProduct {
                ranges: self.product.ranges.widen(&other.product.ranges, bitwidth_of),
                tnums: self.product.tnums.widen(&other.product.tnums, bitwidth_of),
            },
        }
    }

    /// Only the range side can make use of syntactic thresholds; the tnum
    /// side widens with its own bit-mask acceleration regardless.
    pub fn widen_with_thresholds(
        &self,
        other: &Self,
        thresholds: impl Fn(&Var) -> Vec<WrapInt>,
        bitwidth_of: impl Fn(&Var) -> u32 + Copy,
    ) -> Self {
        if self.product.ranges.is_bottom() {
            return other.clone();
        }
        if other.product.ranges.is_bottom() {
            return self.clone();
        }
        let mut ranges = Env::top();
        let keys: std::collections::HashSet<Var> = self
            .product
            .ranges
            .keys()
            .chain(other.product.ranges.keys())
            .cloned()
            .collect();
        for v in keys {
            let bw = bitwidth_of(&v);
            let a = self.product.ranges.at(&v, bw);
            let b = other.product.ranges.at(&v, bw);
            let th = thresholds(&v);
            ranges.set(v, a.widen_with_thresholds(&b, &th));
        }
        NumericalDomain {
            product: ReducedProduct {
                ranges,
                tnums: self.product.tnums.widen(&other.product.tnums, bitwidth_of),
            },
        }
    }

    pub fn narrow(&self, other: &Self, bitwidth_of: impl Fn(&Var) -> u32 + Copy) -> Self {
        NumericalDomain {
            product: ReducedProduct {
                ranges: self.product.ranges.narrow(&other.product.ranges, bitwidth_of),
                tnums: self.product.tnums.narrow(&other.product.tnums, bitwidth_of),
            },
        }
    }

    pub fn forget(&mut self, vars: &[Var]) {
        self.product.ranges.forget(vars);
        self.product.tnums.forget(vars);
    }

    pub fn project(&mut self, vars: &[Var]) {
        self.product.ranges.project(vars);
        self.product.tnums.project(vars);
    }

    pub fn expand(&mut self, x: &Var, new_var: Var, bitwidth: u32) {
        self.product.ranges.expand(x, new_var.clone(), bitwidth);
        self.product.tnums.expand(x, new_var, bitwidth);
    }

    pub fn rename(&mut self, from: &[Var], to: &[Var]) -> Result<(), DomainError> {
        self.product.ranges.rename(from, to)?;
        self.product.tnums.rename(from, to)
    }

    pub fn remove(&mut self, v: &Var) {
        self.product.ranges.remove(v);
        self.product.tnums.remove(v);
    }

    /// The external, driver-facing view of `v`'s value as an unbounded
    /// mathematical interval.
    pub fn at(&self, v: &Var, bitwidth: u32) -> Interval {
        self.product.ranges.at(v, bitwidth).to_interval()
    }

    pub fn get_tnum(&self, v: &Var, bitwidth: u32) -> Stnum {
        self.product.tnums.at(v, bitwidth)
    }

    pub fn get_wrapped(&self, v: &Var, bitwidth: u32) -> SplitWrappedInterval {
        self.product.ranges.at(v, bitwidth)
    }

    fn operand_range(
        &self,
        op: &Operand<Var>,
        bw: u32,
        bitwidth_of: &impl Fn(&Var) -> u32,
    ) -> Result<SplitWrappedInterval, DomainError> {
        match op {
            Operand::Var(v) => {
                let vbw = bitwidth_of(v);
                if vbw != bw {
                    return Err(bitwidth_mismatch(bw, vbw));
                }
                Ok(self.product.ranges.at(v, vbw))
            }
            Operand::Const(w) => {
                if w.bitwidth() != bw {
                    return Err(bitwidth_mismatch(bw, w.bitwidth()));
                }
                Ok(SplitWrappedInterval::singleton(*w))
            }
        }
    }

    fn operand_tnum(
        &self,
        op: &Operand<Var>,
        bw: u32,
        bitwidth_of: &impl Fn(&Var) -> u32,
    ) -> Result<Stnum, DomainError> {
        match op {
            Operand::Var(v) => {
                let vbw = bitwidth_of(v);
                if vbw != bw {
                    return Err(bitwidth_mismatch(bw, vbw));
                }
                Ok(self.product.tnums.at(v, vbw))
            }
            Operand::Const(w) => {
                if w.bitwidth() != bw {
                    return Err(bitwidth_mismatch(bw, w.bitwidth()));
                }
                Ok(Stnum::singleton(*w))
            }
        }
    }

    /// `dst <- x <op> y`, computed independently on the range and tnum
    /// sides, then reduced against each other.
    pub fn apply_arith(
        &mut self,
        op: ArithOp,
        dst: Var,
        x: &Var,
        y: Operand<Var>,
        bitwidth_of: impl Fn(&Var) -> u32,
    ) -> Result<(), DomainError> {
        let bw = bitwidth_of(x);
        let yr = self.operand_range(&y, bw, &bitwidth_of)?;
        let yt = self.operand_tnum(&y, bw, &bitwidth_of)?;
        let xr = self.product.ranges.at(x, bw);
        let xt = self.product.tnums.at(x, bw);
        let rr = match op {
            ArithOp::Add => xr.add(&yr),
            ArithOp::Sub => xr.sub(&yr),
            ArithOp::Mul => xr.mul(&yr),
            ArithOp::Udiv => xr.udiv(&yr),
            ArithOp::Urem => xr.urem(&yr),
            ArithOp::Sdiv => xr.sdiv(&yr),
            ArithOp::Srem => xr.srem(&yr),
        };
        let rt = match op {
            ArithOp::Add => xt.add(&yt),
            ArithOp::Sub => xt.sub(&yt),
            ArithOp::Mul => xt.mul(&yt),
            ArithOp::Udiv => xt.udiv(&yt),
            ArithOp::Urem => xt.urem(&yt),
            ArithOp::Sdiv => xt.sdiv(&yt),
            ArithOp::Srem => xt.srem(&yt),
        };
        self.product.ranges.set(dst.clone(), rr);
        self.product.tnums.set(dst.clone(), rt);
        self.product.reduce_variable(&dst, bw);
        Ok(())
    }

    pub fn apply_bitwise(
        &mut self,
        op: BitwiseOp,
        dst: Var,
        x: &Var,
        y: Operand<Var>,
        bitwidth_of: impl Fn(&Var) -> u32,
    ) -> Result<(), DomainError> {
        let bw = bitwidth_of(x);
        let yr = self.operand_range(&y, bw, &bitwidth_of)?;
        let yt = self.operand_tnum(&y, bw, &bitwidth_of)?;
        let xr = self.product.ranges.at(x, bw);
        let xt = self.product.tnums.at(x, bw);
        let rr = match op {
            BitwiseOp::And => xr.and(&yr),
            BitwiseOp::Or => xr.or(&yr),
            BitwiseOp::Xor => xr.xor(&yr),
            BitwiseOp::Shl => xr.shl(&yr),
            BitwiseOp::Lshr => xr.lshr(&yr),
            BitwiseOp::Ashr => xr.ashr(&yr),
        };
        let rt = match op {
            BitwiseOp::And => xt.and(&yt),
            BitwiseOp::Or => xt.or(&yt),
            BitwiseOp::Xor => xt.xor(&yt),
            BitwiseOp::Shl => xt.shl(&yt),
            BitwiseOp::Lshr => xt.lshr(&yt),
            BitwiseOp::Ashr => xt.ashr(&yt),
        };
        self.product.ranges.set(dst.clone(), rr);
        self.product.tnums.set(dst.clone(), rt);
        self.product.reduce_variable(&dst, bw);
        Ok(())
    }

    /// `dst <- not(x)` is the one unary bitwise op, so it does not fit
    /// [`Self::apply_bitwise`]'s binary shape.
    pub fn apply_not(&mut self, dst: Var, x: &Var, bitwidth_of: impl Fn(&Var) -> u32) {
        let bw = bitwidth_of(x);
        let xr = self.product.ranges.at(x, bw);
        let xt = self.product.tnums.at(x, bw);
        self.product.ranges.set(dst.clone(), xr.not());
        self.product.tnums.set(dst.clone(), xt.not());
        self.product.reduce_variable(&dst, bw);
    }

    /// Integer-conversion ops (zero/sign extend, truncate). `dst`'s width
    /// is `new_bitwidth`; extension requires `new_bitwidth >= x`'s width,
    /// truncation the reverse, matching `WrapInt`'s own direction-checked
    /// casts — a violation is a driver bug, so it is fatal.
    pub fn apply_conv(
        &mut self,
        op: ConvOp,
        dst: Var,
        x: &Var,
        new_bitwidth: u32,
        bitwidth_of: impl Fn(&Var) -> u32,
    ) -> Result<(), DomainError> {
        let src_bw = bitwidth_of(x);
        let extends = matches!(op, ConvOp::Zext | ConvOp::Sext);
        if (extends && new_bitwidth < src_bw) || (matches!(op, ConvOp::Trunc) && new_bitwidth > src_bw) {
            return Err(DomainError::UnsupportedConversion {
                src: src_bw,
                dst: new_bitwidth,
            });
        }
        let xr = self.product.ranges.at(x, src_bw);
        let xt = self.product.tnums.at(x, src_bw);
        let (rr, rt) = match op {
            ConvOp::Zext => (xr.zero_extend(new_bitwidth), xt.zero_extend(new_bitwidth)),
            ConvOp::Sext => (xr.sign_extend(new_bitwidth), xt.sign_extend(new_bitwidth)),
            ConvOp::Trunc => (xr.truncate(new_bitwidth), xt.truncate(new_bitwidth)),
        };
        self.product.ranges.set(dst.clone(), rr);
        self.product.tnums.set(dst.clone(), rt);
        self.product.reduce_variable(&dst, new_bitwidth);
        Ok(())
    }

    /// Rounds a rational interval outward to integers: the sound direction
    /// for a forward-evaluated assignment (the solver's pivot refinement
    /// rounds the other way, inward, since its pivot is already known
    /// integer-valued; see [`crate::solver`]).
    fn eval_expr_bounds(&self, expr: &LinExpr<Var>, bw: u32, bitwidth_of: &impl Fn(&Var) -> u32) -> (WrapInt, WrapInt) {
        let lookup = |v: &Var| -> (BigInt, BigInt) {
            let vbw = bitwidth_of(v);
            match self.product.ranges.at(v, vbw).signed_bounds() {
                Some((lo, hi)) => (BigInt::from(lo.to_i128()), BigInt::from(hi.to_i128())),
                None => (
                    BigInt::from(WrapInt::imin(vbw).unwrap().to_i128()),
                    BigInt::from(WrapInt::imax(vbw).unwrap().to_i128()),
                ),
            }
        };
        let (lo, hi) = expr.bounds(None, lookup);
        let imin_big = BigInt::from(WrapInt::imin(bw).unwrap().to_i128());
        let imax_big = BigInt::from(WrapInt::imax(bw).unwrap().to_i128());
        let lo_big = lo.floor().to_integer().max(imin_big.clone()).min(imax_big.clone());
        let hi_big = hi.ceil().to_integer().max(imin_big).min(imax_big);
        let lo_w = WrapInt::from_i128(lo_big.to_i128().unwrap(), bw).unwrap();
        let hi_w = WrapInt::from_i128(hi_big.to_i128().unwrap(), bw).unwrap();
        (lo_w, hi_w)
    }

    /// Strong update: `x <- expr`, replacing whatever `x` held.
    pub fn assign(&mut self, x: Var, expr: &LinExpr<Var>, bitwidth: u32, bitwidth_of: impl Fn(&Var) -> u32) {
        let (lo, hi) = self.eval_expr_bounds(expr, bitwidth, &bitwidth_of);
        self.product
            .ranges
            .set(x.clone(), SplitWrappedInterval::from_signed_range(lo, hi).unwrap());
        self.product.tnums.set(x.clone(), Stnum::mk_stnum_range(lo, hi));
        self.product.reduce_variable(&x, bitwidth);
    }

    /// Weak update: `x <- x | expr`, used when the assignment may or may
    /// not execute.
    pub fn weak_assign(&mut self, x: Var, expr: &LinExpr<Var>, bitwidth: u32, bitwidth_of: impl Fn(&Var) -> u32) {
        let (lo, hi) = self.eval_expr_bounds(expr, bitwidth, &bitwidth_of);
        let rbound = SplitWrappedInterval::from_signed_range(lo, hi).unwrap();
        let tbound = Stnum::mk_stnum_range(lo, hi);
        self.product.ranges.join_var(x.clone(), rbound, bitwidth);
        self.product.tnums.join_var(x.clone(), tbound, bitwidth);
        self.product.reduce_variable(&x, bitwidth);
    }

    /// Propagates `constraints` against the range side via the linear
    /// solver, then reduces every variable the system mentions against the
    /// tnum side.
    pub fn add_constraints(
        &mut self,
        constraints: &[Constraint<Var>],
        bitwidth_of: impl Fn(&Var) -> u32 + Copy,
        config: &SolverConfig,
        stats: Option<&SolverStats>,
    ) -> SolveReport {
        let report = solver::solve(&mut self.product.ranges, constraints, bitwidth_of, config, stats);
        if report.bottom {
            self.product.ranges = Env::bottom();
            self.product.tnums = Env::bottom();
            return report;
        }
        let vars: Vec<Var> = constraints.iter().flat_map(|c| c.expr().vars().cloned()).collect();
        for v in &vars {
            if self.product.is_bottom() {
                break;
            }
            self.product.reduce_variable(v, bitwidth_of(v));
        }
        SolveReport {
            bottom: self.product.is_bottom(),
            ..report
        }
    }

    /// Whether the current environment already entails `cst` — i.e. every
    /// concretization satisfies it — checked by seeing whether meeting the
    /// range side with the constraint's negation collapses to bottom,
    /// without mutating `self`. A sound under-approximation: it can answer
    /// "unknown" (by returning `false`) for entailments only the tnum side
    /// could prove, but never claims entailment that does not hold.
    pub fn entails(&self, cst: &Constraint<Var>, bitwidth_of: impl Fn(&Var) -> u32 + Copy, config: &SolverConfig) -> bool {
        if self.product.is_bottom() {
            return true;
        }
        let mut ranges = self.product.ranges.clone();
        let negated = [negate(cst.clone())];
        let report = solver::solve(&mut ranges, &negated, bitwidth_of, config, None);
        report.bottom
    }

    /// Emits two inequalities per tracked variable from its current range,
    /// picking whichever of the signed or unsigned witness pair gives the
    /// tighter single convex enclosure when the value straddles the signed
    /// pole (the split representation is exact there; a pair of linear
    /// inequalities over one convex hull cannot be).
    pub fn to_linear_constraint_system(&self, bitwidth_of: impl Fn(&Var) -> u32) -> Vec<Constraint<Var>> {
        let mut out = Vec::new();
        if self.product.is_bottom() {
            return out;
        }
        for v in self.product.ranges.keys() {
            let bw = bitwidth_of(v);
            let val = self.product.ranges.at(v, bw);
            if val.is_bottom() || val.is_top() {
                continue;
            }
            let (lo, hi) = if val.is_negative() || val.is_nonnegative() {
                (val.get_signed_min().unwrap(), val.get_signed_max().unwrap())
            } else {
                let smin = BigInt::from(val.get_signed_min().unwrap().to_i128());
                let smax = BigInt::from(val.get_signed_max().unwrap().to_i128());
                let umin = BigInt::from(val.get_unsigned_min().unwrap().to_u128());
                let umax = BigInt::from(val.get_unsigned_max().unwrap().to_u128());
                if &smax - &smin <= &umax - &umin {
                    (val.get_signed_min().unwrap(), val.get_signed_max().unwrap())
                } else {
                    (val.get_unsigned_min().unwrap(), val.get_unsigned_max().unwrap())
                }
            };
            let lo_c = Coeff::Int(BigInt::from(lo.to_i128()));
            let hi_c = Coeff::Int(BigInt::from(hi.to_i128()));
            // v - hi <= 0
            out.push(Constraint::Le(
                LinExpr::constant(neg(hi_c)).with_term(v.clone(), Coeff::from_i64(1)),
            ));
            // lo - v <= 0
            out.push(Constraint::Le(
                LinExpr::constant(lo_c).with_term(v.clone(), Coeff::from_i64(-1)),
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bw(_v: &&str) -> u32 {
        8
    }

    #[test]
    fn arithmetic_add_reduces_across_both_sides() {
        let mut d: NumericalDomain<&str> = NumericalDomain::make_top();
        d.assign("x", &LinExpr::constant(Coeff::from_i64(3)), 8, bw);
        d.assign("y", &LinExpr::constant(Coeff::from_i64(4)), 8, bw);
        d.apply_arith(ArithOp::Add, "z", &"x", Operand::Var("y"), bw).unwrap();
        assert_eq!(d.at(&"z", 8), Interval::singleton(7));
    }

    #[test]
    fn assign_then_add_constraint_tightens_an_unconstrained_variable() {
        let mut d: NumericalDomain<&str> = NumericalDomain::make_top();
        let e: LinExpr<&str> = LinExpr::constant(Coeff::from_i64(-5)).with_term("x", Coeff::from_i64(1));
        let report = d.add_constraints(&[Constraint::Eq(e)], bw, &SolverConfig::default(), None);
        assert!(!report.bottom);
        assert_eq!(d.at(&"x", 8), Interval::singleton(5));
    }

    #[test]
    fn entails_recognizes_an_already_satisfied_bound() {
        let mut d: NumericalDomain<&str> = NumericalDomain::make_top();
        d.assign("x", &LinExpr::constant(Coeff::from_i64(3)), 8, bw);
        // x <= 10
        let e: LinExpr<&str> = LinExpr::constant(Coeff::from_i64(-10)).with_term("x", Coeff::from_i64(1));
        assert!(d.entails(&Constraint::Le(e), bw, &SolverConfig::default()));
    }

    #[test]
    fn forget_returns_a_variable_to_top() {
        let mut d: NumericalDomain<&str> = NumericalDomain::make_top();
        d.assign("x", &LinExpr::constant(Coeff::from_i64(3)), 8, bw);
        d.forget(&["x"]);
        assert_eq!(d.at(&"x", 8), Interval::range(-128, 127));
    }

    #[test]
    fn bitwidth_mismatch_between_operands_is_fatal() {
        let mut d: NumericalDomain<&str> = NumericalDomain::make_top();
        d.assign("x", &LinExpr::constant(Coeff::from_i64(3)), 8, bw);
        let bad = WrapInt::from_i128(1, 16).unwrap();
        assert!(d.apply_arith(ArithOp::Add, "z", &"x", Operand::Const(bad), bw).is_err());
    }
}
