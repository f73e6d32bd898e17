//! Linear constraint solver (C8): propagates a system of linear constraints
//! over an [`Env`] by tightening one pivot variable at a time, Section 4.7's
//! "reduce one variable against the residual of the rest". Two propagation
//! strategies share the same per-constraint refinement step:
//!
//! - small systems round-robin every constraint each cycle until a pass
//!   makes no change;
//! - large systems maintain a trigger map (variable -> constraints that
//!   mention it) and a worklist of variables refined since the last pass,
//!   processing only constraints a refinement could actually affect.
//!
//! Both modes share a per-run operation budget (`Σ arity² over constraints,
//! times max_cycles`) so a pathological system degrades to a sound but
//! incomplete fixpoint instead of spinning forever.

use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use tracing::warn;
use wrapint::WrapInt;

use crate::{
    env::{Env, Lattice},
    linexpr::{Classification, Coeff, Constraint},
};

/// Resource limits for [`solve`]. Defaults match Section 4.7's literal
/// constants.
#[derive(Clone, Copy, Debug)]
pub struct SolverConfig {
    pub max_cycles: u32,
    pub large_system_threshold: usize,
    pub op_budget_per_cycle: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_cycles: 10,
            large_system_threshold: 3,
            op_budget_per_cycle: 27,
        }
    }
}

/// Running counters, threaded through explicitly rather than kept as a
/// global: a driver analysing many procedures concurrently can give each
/// its own `SolverStats`, or share one to see aggregate solver pressure.
#[derive(Default)]
pub struct SolverStats {
    pub cycles_run: AtomicU32,
    pub ops_performed: AtomicU64,
    pub budget_exceeded: AtomicU32,
    pub contradictions: AtomicU32,
}

impl SolverStats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Outcome of one [`solve`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolveReport {
    pub bottom: bool,
    pub cycles_run: u32,
    pub budget_exceeded: bool,
}

/// The abstract-domain operations the solver needs from a pivot variable's
/// value to refine it against a residual bound. Implemented for
/// [`crate::witv::SplitWrappedInterval`] and [`crate::stnum::Stnum`], the
/// two value types [`Env`] holds in this crate.
pub trait RefineDomain: Lattice + PartialEq {
    /// `(signed_min, signed_max)`, or `None` if bottom.
    fn signed_bounds(&self) -> Option<(WrapInt, WrapInt)>;
    fn from_signed_range(lo: WrapInt, hi: WrapInt) -> Self;
    fn lower_half_line(&self, x: WrapInt, signed: bool) -> Self;
    fn upper_half_line(&self, x: WrapInt, signed: bool) -> Self;
    fn trim(&self, x: WrapInt) -> Self;
}

impl RefineDomain for crate::witv::SplitWrappedInterval {
    fn signed_bounds(&self) -> Option<(WrapInt, WrapInt)> {
        match (self.get_signed_min(), self.get_signed_max()) {
            (Some(lo), Some(hi)) => Some((lo, hi)),
            _ => None,
        }
    }
    fn from_signed_range(lo: WrapInt, hi: WrapInt) -> Self {
        Self::from_signed_range(lo, hi).unwrap_or_else(|| Self::top(lo.bitwidth()))
    }
    fn lower_half_line(&self, x: WrapInt, signed: bool) -> Self {
        Self::lower_half_line(self, x, signed)
    }
    fn upper_half_line(&self, x: WrapInt, signed: bool) -> Self {
        Self::upper_half_line(self, x, signed)
    }
    fn trim(&self, x: WrapInt) -> Self {
        Self::trim(self, x)
    }
}

impl RefineDomain for crate::stnum::Stnum {
    fn signed_bounds(&self) -> Option<(WrapInt, WrapInt)> {
        match (self.get_signed_min(), self.get_signed_max()) {
            (Some(lo), Some(hi)) => Some((lo, hi)),
            _ => None,
        }
    }
    fn from_signed_range(lo: WrapInt, hi: WrapInt) -> Self {
        Self::mk_stnum_range(lo, hi)
    }
    fn lower_half_line(&self, x: WrapInt, signed: bool) -> Self {
        Self::lower_half_line(self, x, signed)
    }
    fn upper_half_line(&self, x: WrapInt, signed: bool) -> Self {
        Self::upper_half_line(self, x, signed)
    }
    fn trim(&self, x: WrapInt) -> Self {
        Self::trim(self, x)
    }
}

fn div_interval(lo: BigRational, hi: BigRational, c: &Coeff) -> (BigRational, BigRational) {
    let c_r = c.as_rational();
    if c.is_negative() {
        (hi / c_r.clone(), lo / c_r)
    } else {
        (lo / c_r.clone(), hi / c_r)
    }
}

/// One pivot's refinement: solves `c_p * x_p = -(constant + Σ_{i≠p} cᵢ·xᵢ)`
/// for a rational bound on `x_p`, rounds outward to integers (sound: any
/// bound a real-valued relaxation admits also admits every integer point in
/// it), clamps to the bitwidth's signed range, and applies the constraint
/// kind's refinement rule. Returns `None` if this pivot's residual makes the
/// constraint unsatisfiable.
fn refine_pivot<Var, V>(
    c: &Constraint<Var>,
    pivot: &Var,
    env: &Env<Var, V>,
    bitwidth_of: &impl Fn(&Var) -> u32,
) -> Option<V>
where
    Var: Clone + Eq + Hash,
    V: RefineDomain,
{
    let expr = c.expr();
    let cp = expr.coeff_of(pivot);
    if cp.is_zero() {
        return None;
    }
    let bw = bitwidth_of(pivot);
    let lookup = |v: &Var| -> (BigInt, BigInt) {
        let vbw = bitwidth_of(v);
        match env.at(v, vbw).signed_bounds() {
            Some((lo, hi)) => (BigInt::from(lo.to_i128()), BigInt::from(hi.to_i128())),
            None => (
                BigInt::from(WrapInt::imin(vbw).unwrap().to_i128()),
                BigInt::from(WrapInt::imax(vbw).unwrap().to_i128()),
            ),
        }
    };
    let (rest_lo, rest_hi) = expr.bounds(Some(pivot), lookup);
    let (neg_lo, neg_hi) = (-rest_hi, -rest_lo);
    let (xlo, xhi) = div_interval(neg_lo, neg_hi, &cp);

    let imin_big = BigInt::from(WrapInt::imin(bw).unwrap().to_i128());
    let imax_big = BigInt::from(WrapInt::imax(bw).unwrap().to_i128());
    let lo_big = xlo.ceil().to_integer().max(imin_big.clone());
    let hi_big = xhi.floor().to_integer().min(imax_big);
    if lo_big > hi_big {
        return None;
    }
    let lo_w = WrapInt::from_i128(lo_big.to_i128().unwrap(), bw).unwrap();
    let hi_w = WrapInt::from_i128(hi_big.to_i128().unwrap(), bw).unwrap();

    let old = env.at(pivot, bw);
    let new = match c {
        Constraint::Eq(_) => old.meet(&V::from_signed_range(lo_w, hi_w)),
        Constraint::Le(_) => {
            if cp.is_positive() {
                old.lower_half_line(hi_w, true)
            } else {
                old.upper_half_line(lo_w, true)
            }
        }
        Constraint::Ne(_) => {
            if lo_w == hi_w {
                old.trim(lo_w)
            } else {
                old.clone()
            }
        }
        Constraint::Lt(_) => old.clone(), // unreachable: solve() always preprocesses Lt away
    };
    if new.is_bottom() {
        None
    } else {
        Some(new)
    }
}

/// Propagates one constraint once against every variable it mentions.
/// Returns the set of variables whose value actually changed, or `true` in
/// the second slot if the environment collapsed to bottom.
fn propagate_once<Var, V>(
    c: &Constraint<Var>,
    env: &mut Env<Var, V>,
    bitwidth_of: &impl Fn(&Var) -> u32,
) -> (HashSet<Var>, bool)
where
    Var: Clone + Eq + Hash,
    V: RefineDomain,
{
    let mut refined = HashSet::new();
    let vars: Vec<Var> = c.expr().vars().cloned().collect();
    for pivot in &vars {
        let old = env.at(pivot, bitwidth_of(pivot));
        match refine_pivot(c, pivot, env, bitwidth_of) {
            None => {
                if !c.expr().coeff_of(pivot).is_zero() {
                    return (refined, true);
                }
            }
            Some(new) => {
                if new != old {
                    env.set(pivot.clone(), new);
                    refined.insert(pivot.clone());
                }
            }
        }
    }
    (refined, false)
}

fn arity_sq<Var: Eq + Hash>(c: &Constraint<Var>) -> u64 {
    let n = c.expr().vars().count() as u64;
    n * n
}

/// Preprocesses `constraints` (splitting strict inequalities, dropping
/// tautologies, short-circuiting on a contradiction) and propagates the
/// result against `env` until a fixpoint, a cycle cap, or an operation
/// budget is reached. `bitwidth_of` gives each variable's declared width,
/// the same contract [`Env`] itself uses.
pub fn solve<Var, V>(
    env: &mut Env<Var, V>,
    constraints: &[Constraint<Var>],
    bitwidth_of: impl Fn(&Var) -> u32,
    config: &SolverConfig,
    stats: Option<&SolverStats>,
) -> SolveReport
where
    Var: Clone + Eq + Hash,
    V: RefineDomain,
{
    if env.is_bottom() {
        return SolveReport {
            bottom: true,
            cycles_run: 0,
            budget_exceeded: false,
        };
    }

    let mut flat = Vec::new();
    for c in constraints {
        for p in c.clone().preprocess() {
            match p.classify() {
                Classification::Tautology => continue,
                Classification::Contradiction => {
                    warn!("contradictory linear constraint, environment collapses to bottom");
                    if let Some(s) = stats {
                        s.contradictions.fetch_add(1, Ordering::Relaxed);
                    }
                    *env = Env::bottom();
                    return SolveReport {
                        bottom: true,
                        cycles_run: 0,
                        budget_exceeded: false,
                    };
                }
                Classification::Undetermined => flat.push(p),
            }
        }
    }
    if flat.is_empty() {
        return SolveReport {
            bottom: false,
            cycles_run: 0,
            budget_exceeded: false,
        };
    }

    let mut trigger: HashMap<Var, HashSet<usize>> = HashMap::new();
    let mut size_sq_sum: u64 = 0;
    for (i, c) in flat.iter().enumerate() {
        size_sq_sum += arity_sq(c);
        for v in c.expr().vars() {
            trigger.entry(v.clone()).or_default().insert(i);
        }
    }
    let is_large =
        flat.len() > config.large_system_threshold || size_sq_sum > config.op_budget_per_cycle as u64;
    let total_budget = size_sq_sum.max(1) * config.max_cycles as u64;

    let mut ops_used: u64 = 0;
    let mut cycles_run: u32 = 0;
    let mut budget_exceeded = false;
    let mut went_bottom = false;

    if is_large {
        let mut worklist: HashSet<Var> = trigger.keys().cloned().collect();
        'outer: while !worklist.is_empty() && cycles_run < config.max_cycles {
            cycles_run += 1;
            let mut indices: HashSet<usize> = HashSet::new();
            for v in &worklist {
                if let Some(idxs) = trigger.get(v) {
                    indices.extend(idxs.iter().copied());
                }
            }
            worklist.clear();
            let mut idx_vec: Vec<usize> = indices.into_iter().collect();
            idx_vec.sort_unstable();
            for idx in idx_vec {
                let c = &flat[idx];
                let cost = arity_sq(c);
                if ops_used + cost > total_budget {
                    budget_exceeded = true;
                    break 'outer;
                }
                ops_used += cost;
                let (refined, bottom) = propagate_once(c, env, &bitwidth_of);
                if bottom {
                    went_bottom = true;
                    break 'outer;
                }
                worklist.extend(refined);
            }
        }
    } else {
        'outer2: for _ in 0..config.max_cycles {
            cycles_run += 1;
            let mut any_change = false;
            for c in &flat {
                let cost = arity_sq(c);
                if ops_used + cost > total_budget {
                    budget_exceeded = true;
                    break 'outer2;
                }
                ops_used += cost;
                let (refined, bottom) = propagate_once(c, env, &bitwidth_of);
                if bottom {
                    went_bottom = true;
                    break 'outer2;
                }
                if !refined.is_empty() {
                    any_change = true;
                }
            }
            if !any_change {
                break;
            }
        }
    }

    if went_bottom {
        *env = Env::bottom();
    }
    if let Some(s) = stats {
        s.cycles_run.fetch_add(cycles_run, Ordering::Relaxed);
        s.ops_performed.fetch_add(ops_used, Ordering::Relaxed);
        if budget_exceeded {
            s.budget_exceeded.fetch_add(1, Ordering::Relaxed);
        }
    }
    if budget_exceeded {
        warn!(
            ops_used,
            total_budget, "solver operation budget exceeded, stopping at the last sound approximation"
        );
    }
    SolveReport {
        bottom: env.is_bottom(),
        cycles_run,
        budget_exceeded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{linexpr::LinExpr, witv::SplitWrappedInterval};

    fn bw(_v: &&str) -> u32 {
        8
    }

    #[test]
    fn equality_pins_a_variable_to_a_constant() {
        // x - 5 = 0
        let mut env: Env<&str, SplitWrappedInterval> = Env::top();
        let e: LinExpr<&str> = LinExpr::constant(Coeff::from_i64(-5)).with_term("x", Coeff::from_i64(1));
        let cs = [Constraint::Eq(e)];
        let report = solve(&mut env, &cs, bw, &SolverConfig::default(), None);
        assert!(!report.bottom);
        let v = env.at(&"x", 8);
        assert!(v.is_singleton());
        assert_eq!(v.get_signed_min(), Some(WrapInt::from_i128(5, 8).unwrap()));
    }

    #[test]
    fn inequality_tightens_an_upper_bound() {
        // x <= 10, starting from top
        let mut env: Env<&str, SplitWrappedInterval> = Env::top();
        let e: LinExpr<&str> = LinExpr::constant(Coeff::from_i64(-10)).with_term("x", Coeff::from_i64(1));
        let cs = [Constraint::Le(e)];
        let report = solve(&mut env, &cs, bw, &SolverConfig::default(), None);
        assert!(!report.bottom);
        let v = env.at(&"x", 8);
        assert_eq!(v.get_signed_max(), Some(WrapInt::from_i128(10, 8).unwrap()));
    }

    #[test]
    fn a_two_variable_equality_propagates_through_a_known_operand() {
        // x - y = 0, y pinned to 3 already -> x tightens to 3.
        let mut env: Env<&str, SplitWrappedInterval> = Env::top();
        env.set("y", SplitWrappedInterval::singleton(WrapInt::from_i128(3, 8).unwrap()));
        let e: LinExpr<&str> = LinExpr::var("x").with_term("y", Coeff::from_i64(-1));
        let cs = [Constraint::Eq(e)];
        let report = solve(&mut env, &cs, bw, &SolverConfig::default(), None);
        assert!(!report.bottom);
        let v = env.at(&"x", 8);
        assert!(v.is_singleton());
        assert_eq!(v.get_signed_min(), Some(WrapInt::from_i128(3, 8).unwrap()));
    }

    #[test]
    fn a_constant_contradiction_collapses_the_environment_to_bottom() {
        let mut env: Env<&str, SplitWrappedInterval> = Env::top();
        let e: LinExpr<&str> = LinExpr::constant(Coeff::from_i64(5));
        let cs = [Constraint::Eq(e)];
        let report = solve(&mut env, &cs, bw, &SolverConfig::default(), None);
        assert!(report.bottom);
        assert!(env.is_bottom());
    }

    #[test]
    fn a_disequation_trims_a_single_remaining_point() {
        // x != 5, x already narrowed to {4, 5}.
        let mut env: Env<&str, SplitWrappedInterval> = Env::top();
        env.set(
            "x",
            SplitWrappedInterval::from_signed_range(
                WrapInt::from_i128(4, 8).unwrap(),
                WrapInt::from_i128(5, 8).unwrap(),
            )
            .unwrap(),
        );
        let e: LinExpr<&str> = LinExpr::constant(Coeff::from_i64(-5)).with_term("x", Coeff::from_i64(1));
        let cs = [Constraint::Ne(e)];
        let report = solve(&mut env, &cs, bw, &SolverConfig::default(), None);
        assert!(!report.bottom);
        let v = env.at(&"x", 8);
        assert!(v.is_singleton());
        assert_eq!(v.get_signed_min(), Some(WrapInt::from_i128(4, 8).unwrap()));
    }
}
