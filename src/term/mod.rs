//! The term algebra (spec §3.8, component C2).
//!
//! HIR is the richest of the three universes: it alone carries `List` (a
//! block whose vanishing semantics is the conjunction of its members) and
//! two-armed `IfZero`. Constructors are pure — they never simplify; that is
//! the job of [`crate::simplify`].

pub mod air;
pub mod mir;
pub mod pretty;

use crate::field::FieldElement;
use crate::ids::ColumnId;
use serde::{Deserialize, Serialize};

/// A high-level term.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HirTerm {
    Const(FieldElement),
    LabelledConst(String, FieldElement),
    ColumnAccess(ColumnId, i64),
    Add(Vec<HirTerm>),
    Sub(Vec<HirTerm>),
    Mul(Vec<HirTerm>),
    /// A block: the conjunction of the vanishing of each argument.
    List(Vec<HirTerm>),
    Norm(Box<HirTerm>),
    Exp(Box<HirTerm>, u64),
    /// "I promise `arg` fits in `bit_width` bits."
    Cast(Box<HirTerm>, u32),
    /// Either branch may be absent, denoting zero in that branch.
    IfZero(Box<HirTerm>, Option<Box<HirTerm>>, Option<Box<HirTerm>>),
}

impl HirTerm {
    pub fn zero() -> Self {
        HirTerm::Const(FieldElement::zero())
    }

    pub fn one() -> Self {
        HirTerm::Const(FieldElement::one())
    }

    pub fn column(id: ColumnId) -> Self {
        HirTerm::ColumnAccess(id, 0)
    }

    pub fn shifted(id: ColumnId, shift: i64) -> Self {
        HirTerm::ColumnAccess(id, shift)
    }

    pub fn add(args: impl IntoIterator<Item = HirTerm>) -> Self {
        HirTerm::Add(args.into_iter().collect())
    }

    pub fn sub(args: impl IntoIterator<Item = HirTerm>) -> Self {
        HirTerm::Sub(args.into_iter().collect())
    }

    pub fn mul(args: impl IntoIterator<Item = HirTerm>) -> Self {
        HirTerm::Mul(args.into_iter().collect())
    }

    pub fn norm(arg: HirTerm) -> Self {
        HirTerm::Norm(Box::new(arg))
    }

    pub fn exp(arg: HirTerm, pow: u64) -> Self {
        HirTerm::Exp(Box::new(arg), pow)
    }

    pub fn cast(arg: HirTerm, bit_width: u32) -> Self {
        HirTerm::Cast(Box::new(arg), bit_width)
    }

    pub fn if_zero(cond: HirTerm, then_branch: Option<HirTerm>, else_branch: Option<HirTerm>) -> Self {
        HirTerm::IfZero(Box::new(cond), then_branch.map(Box::new), else_branch.map(Box::new))
    }

    /// Direct sub-terms, for generic bottom-up traversals.
    pub fn children(&self) -> Vec<&HirTerm> {
        match self {
            HirTerm::Const(_) | HirTerm::LabelledConst(..) | HirTerm::ColumnAccess(..) => vec![],
            HirTerm::Add(xs) | HirTerm::Sub(xs) | HirTerm::Mul(xs) | HirTerm::List(xs) => {
                xs.iter().collect()
            }
            HirTerm::Norm(x) | HirTerm::Exp(x, _) | HirTerm::Cast(x, _) => vec![x.as_ref()],
            HirTerm::IfZero(c, t, f) => {
                let mut v = vec![c.as_ref()];
                if let Some(t) = t {
                    v.push(t.as_ref());
                }
                if let Some(f) = f {
                    v.push(f.as_ref());
                }
                v
            }
        }
    }

    /// Node count of the tree, used to prioritise compilation work (larger
    /// constraints first).
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_ignores_identity() {
        let a = HirTerm::add([HirTerm::column(ColumnId(0)), HirTerm::one()]);
        let b = HirTerm::add([HirTerm::column(ColumnId(0)), HirTerm::one()]);
        assert_eq!(a, b);
    }

    #[test]
    fn children_walks_ifzero_without_dropping_absent_branches() {
        let t = HirTerm::if_zero(HirTerm::column(ColumnId(0)), Some(HirTerm::one()), None);
        assert_eq!(t.children().len(), 2);
    }

    #[test]
    fn size_counts_every_node() {
        let t = HirTerm::add([HirTerm::one(), HirTerm::one()]);
        assert_eq!(t.size(), 3);
    }
}
