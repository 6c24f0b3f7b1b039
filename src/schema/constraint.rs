//! Constraint kinds (spec §3.9, §4.C6).
//!
//! Each kind is generic over the term universe it is expressed in: `Vanishing<B>`
//! and `PropertyAssertion<B>` are parameterised by whatever represents "this
//! must hold" at a given level (a plain term at HIR/AIR, a [`MirCond`] at
//! MIR); the rest are parameterised directly by the level's term type. This
//! is the "three distinct constraint types sharing common operations"
//! design note (spec §9), realised through generics rather than repeating
//! each struct three times by hand.

use crate::context::Context;
use crate::handle::Handle;
use crate::term::air::AirTerm;
use crate::term::mir::MirTerm;
use crate::term::HirTerm;
use serde::{Deserialize, Serialize};

/// "All rows", or a single row index (possibly relative to the end).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    AllRows,
    /// A single row; negative values are interpreted from the end of the
    /// trace (e.g. `-1` is the last row).
    Row(i64),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vanishing<B> {
    pub handle: Handle,
    pub case: Option<u64>,
    pub context: Context,
    pub domain: Domain,
    pub body: B,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RangeConstraint<T> {
    pub handle: Handle,
    pub case: Option<u64>,
    pub context: Context,
    pub expr: T,
    pub bitwidth: u32,
}

/// `(context, [unit expressions])`: one value per row, per position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LookupVector<T> {
    pub context: Context,
    pub exprs: Vec<T>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lookup<T> {
    pub handle: Handle,
    pub source: LookupVector<T>,
    pub target: LookupVector<T>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sorted<T> {
    pub handle: Handle,
    pub context: Context,
    pub bitwidth: u32,
    pub selector: Option<T>,
    pub sources: Vec<T>,
    /// `true` = ascending, one entry per source.
    pub signs: Vec<bool>,
    pub strict: bool,
}

/// Retained from the legacy dump only as an inert marker (spec §3.9): the
/// dump lacks sort-direction information, so this is never consulted by any
/// analysis or lowering pass in this crate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Permutation {
    pub handle: Handle,
    pub from: Vec<Handle>,
    pub to: Vec<Handle>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyAssertion<B> {
    pub handle: Handle,
    pub context: Context,
    pub body: B,
}

/// Whether a term is a "unit expression" — produces exactly one value per
/// row. Lists and two-armed `IfZero` are forbidden in lookup/sorted slots
/// (spec §3.9); MIR and AIR terms satisfy this unconditionally since those
/// variants don't exist at those levels.
pub trait IsUnitExpr {
    fn is_unit_expr(&self) -> bool;
}

impl IsUnitExpr for HirTerm {
    fn is_unit_expr(&self) -> bool {
        match self {
            HirTerm::List(_) => false,
            HirTerm::IfZero(_, Some(_), Some(_)) => false,
            HirTerm::IfZero(c, t, f) => {
                c.is_unit_expr()
                    && t.as_deref().map_or(true, IsUnitExpr::is_unit_expr)
                    && f.as_deref().map_or(true, IsUnitExpr::is_unit_expr)
            }
            HirTerm::Const(_) | HirTerm::LabelledConst(..) | HirTerm::ColumnAccess(..) => true,
            HirTerm::Add(xs) | HirTerm::Sub(xs) | HirTerm::Mul(xs) => xs.iter().all(IsUnitExpr::is_unit_expr),
            HirTerm::Norm(x) | HirTerm::Cast(x, _) | HirTerm::Exp(x, _) => x.is_unit_expr(),
        }
    }
}

impl IsUnitExpr for MirTerm {
    fn is_unit_expr(&self) -> bool {
        true
    }
}

impl IsUnitExpr for AirTerm {
    fn is_unit_expr(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ColumnId;

    #[test]
    fn list_is_not_a_unit_expr() {
        let t = HirTerm::List(vec![HirTerm::one(), HirTerm::zero()]);
        assert!(!t.is_unit_expr());
    }

    #[test]
    fn two_armed_ifzero_is_not_a_unit_expr() {
        let t = HirTerm::if_zero(HirTerm::column(ColumnId(0)), Some(HirTerm::one()), Some(HirTerm::zero()));
        assert!(!t.is_unit_expr());
    }

    #[test]
    fn one_armed_ifzero_is_a_unit_expr() {
        let t = HirTerm::if_zero(HirTerm::column(ColumnId(0)), Some(HirTerm::one()), None);
        assert!(t.is_unit_expr());
    }
}
