//! Separate environment (C6): a finite variable→abstract-value map with
//! every lattice operation lifted point-wise. "Separate" in the literature
//! sense — each variable's abstract value is independent of every other's,
//! as opposed to a relational domain that would track one structure over
//! the whole variable set (that is what [`crate::reduced`]'s linear solver
//! layers on top, constraint by constraint).

use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

use crate::error::DomainError;

/// The subset of each domain's lattice operations an environment needs to
/// lift point-wise. Implemented by [`crate::witv::SplitWrappedInterval`]
/// and [`crate::stnum::Stnum`], the two value types this crate's
/// environments actually hold.
pub trait Lattice: Clone {
    fn bottom(bitwidth: u32) -> Self;
    fn top(bitwidth: u32) -> Self;
    fn is_bottom(&self) -> bool;
    fn is_top(&self) -> bool;
    fn leq(&self, other: &Self) -> bool;
    fn join(&self, other: &Self) -> Self;
    fn meet(&self, other: &Self) -> Self;
    fn widen(&self, other: &Self) -> Self;
    fn narrow(&self, other: &Self) -> Self;
}

impl Lattice for crate::witv::SplitWrappedInterval {
    fn bottom(bitwidth: u32) -> Self {
        Self::bottom(bitwidth)
    }
    fn top(bitwidth: u32) -> Self {
        Self::top(bitwidth)
    }
    fn is_bottom(&self) -> bool {
        Self::is_bottom(self)
    }
    fn is_top(&self) -> bool {
        Self::is_top(self)
    }
    fn leq(&self, other: &Self) -> bool {
        Self::leq(self, other)
    }
    fn join(&self, other: &Self) -> Self {
        Self::join(self, other)
    }
    fn meet(&self, other: &Self) -> Self {
        Self::meet(self, other)
    }
    fn widen(&self, other: &Self) -> Self {
        Self::widen(self, other)
    }
    fn narrow(&self, other: &Self) -> Self {
        Self::narrow(self, other)
    }
}

impl Lattice for crate::stnum::Stnum {
    fn bottom(bitwidth: u32) -> Self {
        Self::bottom(bitwidth)
    }
    fn top(bitwidth: u32) -> Self {
        Self::top(bitwidth)
    }
    fn is_bottom(&self) -> bool {
        Self::is_bottom(self)
    }
    fn is_top(&self) -> bool {
        Self::is_top(self)
    }
    fn leq(&self, other: &Self) -> bool {
        Self::leq(self, other)
    }
    fn join(&self, other: &Self) -> Self {
        Self::join(self, other)
    }
    fn meet(&self, other: &Self) -> Self {
        Self::meet(self, other)
    }
    fn widen(&self, other: &Self) -> Self {
        Self::widen(self, other)
    }
    fn narrow(&self, other: &Self) -> Self {
        Self::narrow(self, other)
    }
}

/// A partial map from variables to abstract values of type `V`. `bottom`
/// is a distinguished whole-environment state (unreachable program point)
/// distinct from simply holding no keys (every variable unconstrained).
#[derive(Clone, Debug)]
pub struct Env<Var, V> {
    bottom: bool,
    map: HashMap<Var, V>,
}

impl<Var, V> Env<Var, V>
where
    Var: Clone + Eq + Hash,
    V: Lattice,
{
    pub fn top() -> Self {
        Env {
            bottom: false,
            map: HashMap::new(),
        }
    }

    pub fn bottom() -> Self {
        Env {
            bottom: true,
            map: HashMap::new(),
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.bottom
    }

    pub fn is_top(&self) -> bool {
        !self.bottom && self.map.is_empty()
    }

    /// Current value for `v`, or `top(bitwidth)` if unconstrained, or
    /// `bottom(bitwidth)` if the whole environment is unreachable.
    /// `bitwidth` is the caller's declared width for `v`: a separate
    /// environment does not itself record variable types.
    pub fn at(&self, v: &Var, bitwidth: u32) -> V {
        if self.bottom {
            return V::bottom(bitwidth);
        }
        match self.map.get(v) {
            Some(val) => val.clone(),
            None => V::top(bitwidth),
        }
    }

    /// Strong update: replaces whatever `v` held.
    pub fn set(&mut self, v: Var, val: V) {
        if self.bottom {
            return;
        }
        if val.is_bottom() {
            self.bottom = true;
            self.map.clear();
            return;
        }
        self.map.insert(v, val);
    }

    /// Weak update: `v ↦ at(v) | val`, used when an assignment may or may
    /// not execute (e.g. joining branches of a conditional).
    pub fn join_var(&mut self, v: Var, val: V, bitwidth: u32) {
        let joined = self.at(&v, bitwidth).join(&val);
        self.set(v, joined);
    }

    pub fn remove(&mut self, v: &Var) {
        self.map.remove(v);
    }

    pub fn forget(&mut self, vars: &[Var]) {
        for v in vars {
            self.map.remove(v);
        }
    }

    /// Keeps only `vars`, forgetting everything else.
    pub fn project(&mut self, vars: &[Var]) {
        if self.bottom {
            return;
        }
        let keep: HashSet<&Var> = vars.iter().collect();
        self.map.retain(|k, _| keep.contains(k));
    }

    /// Renames `from[i]` to `to[i]`. `from` must be a set of keys present
    /// or absent uniformly and `to` must not collide with surviving keys
    /// or with itself, i.e. the renaming must be bijective on the given
    /// vectors.
    pub fn rename(&mut self, from: &[Var], to: &[Var]) -> Result<(), DomainError> {
        if from.len() != to.len() {
            return Err(DomainError::NotBijective(format!(
                "rename: {} source variables but {} targets",
                from.len(),
                to.len()
            )));
        }
        let unique_to: HashSet<&Var> = to.iter().collect();
        if unique_to.len() != to.len() {
            return Err(DomainError::NotBijective("rename: duplicate targets".to_string()));
        }
        if self.bottom {
            return Ok(());
        }
        let mut staged = Vec::with_capacity(from.len());
        for (f, t) in from.iter().zip(to.iter()) {
            if let Some(val) = self.map.remove(f) {
                staged.push((t.clone(), val));
            }
        }
        for (t, val) in staged {
            self.map.insert(t, val);
        }
        Ok(())
    }

    /// Introduces `new_var` as a copy of `x`'s current value, used when a
    /// driver splits one logical variable into two (e.g. array expansion
    /// upstream of this crate).
    pub fn expand(&mut self, x: &Var, new_var: Var, bitwidth: u32) {
        let val = self.at(x, bitwidth);
        self.set(new_var, val);
    }

    fn all_keys<'a>(&'a self, other: &'a Self) -> HashSet<&'a Var> {
        self.map.keys().chain(other.map.keys()).collect()
    }

    pub fn leq(&self, other: &Self, bitwidth_of: impl Fn(&Var) -> u32) -> bool {
        if self.bottom {
            return true;
        }
        if other.bottom {
            return false;
        }
        self.all_keys(other)
            .into_iter()
            .all(|k| self.at(k, bitwidth_of(k)).leq(&other.at(k, bitwidth_of(k))))
    }

    fn lift(&self, other: &Self, bitwidth_of: &impl Fn(&Var) -> u32, op: impl Fn(&V, &V) -> V) -> Self {
        let mut map = HashMap::new();
        for k in self.all_keys(other) {
            let bw = bitwidth_of(k);
            let v = op(&self.at(k, bw), &other.at(k, bw));
            if !v.is_top() {
                map.insert(k.clone(), v);
            }
        }
        Env { bottom: false, map }
    }

    pub fn join(&self, other: &Self, bitwidth_of: impl Fn(&Var) -> u32) -> Self {
        match (self.bottom, other.bottom) {
            (true, _) => other.clone(),
            (_, true) => self.clone(),
            _ => self.lift(other, &bitwidth_of, |a, b| a.join(b)),
        }
    }

    pub fn meet(&self, other: &Self, bitwidth_of: impl Fn(&Var) -> u32) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let mut result = self.lift(other, &bitwidth_of, |a, b| a.meet(b));
        if result.map.values().any(|v| v.is_bottom()) {
            result = Self::bottom();
        }
        result
    }

    pub fn widen(&self, other: &Self, bitwidth_of: impl Fn(&Var) -> u32) -> Self {
        match (self.bottom, other.bottom) {
            (true, _) => other.clone(),
            (_, true) => self.clone(),
            _ => self.lift(other, &bitwidth_of, |a, b| a.widen(b)),
        }
    }

    pub fn narrow(&self, other: &Self, bitwidth_of: impl Fn(&Var) -> u32) -> Self {
        match (self.bottom, other.bottom) {
            (true, _) | (_, true) => self.clone(),
            _ => self.lift(other, &bitwidth_of, |a, b| a.narrow(b)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &Var> {
        self.map.keys()
    }
}

impl<Var, V> Default for Env<Var, V>
where
    Var: Clone + Eq + Hash,
    V: Lattice,
{
    fn default() -> Self {
        Self::top()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stnum::Stnum;
    use wrapint::WrapInt;

    fn bw(_v: &&str) -> u32 {
        8
    }

    #[test]
    fn missing_variable_reads_as_top() {
        let env: Env<&str, Stnum> = Env::top();
        assert!(env.at(&"x", 8).is_top());
    }

    #[test]
    fn bottom_environment_reads_every_variable_as_bottom() {
        let env: Env<&str, Stnum> = Env::bottom();
        assert!(env.at(&"x", 8).is_bottom());
    }

    #[test]
    fn setting_bottom_collapses_the_whole_environment() {
        let mut env: Env<&str, Stnum> = Env::top();
        env.set("x", Stnum::bottom(8));
        assert!(env.is_bottom());
    }

    #[test]
    fn weak_update_joins_rather_than_overwrites() {
        let mut env: Env<&str, Stnum> = Env::top();
        env.set("x", Stnum::singleton(WrapInt::from_i128(1, 8).unwrap()));
        env.join_var("x", Stnum::singleton(WrapInt::from_i128(2, 8).unwrap()), 8);
        let v = env.at(&"x", 8);
        assert!(v.at(WrapInt::from_i128(1, 8).unwrap()));
        assert!(v.at(WrapInt::from_i128(2, 8).unwrap()));
    }

    #[test]
    fn rename_requires_matching_arity() {
        let mut env: Env<&str, Stnum> = Env::top();
        assert!(env.rename(&["x"], &["y", "z"]).is_err());
    }

    #[test]
    fn project_keeps_only_named_variables() {
        let mut env: Env<&str, Stnum> = Env::top();
        env.set("x", Stnum::singleton(WrapInt::from_i128(1, 8).unwrap()));
        env.set("y", Stnum::singleton(WrapInt::from_i128(2, 8).unwrap()));
        env.project(&["x"]);
        assert!(env.keys().eq(["x"].iter()) || env.keys().collect::<Vec<_>>() == vec![&"x"]);
        let _ = bw;
    }
}
