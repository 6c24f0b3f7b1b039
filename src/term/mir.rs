//! The mid-level term universe (spec §3.8).
//!
//! MIR terms are purely arithmetic — `List` and two-armed `IfZero` have
//! already been eliminated by HIR->MIR lowering (component C7). Equations
//! live alongside, never inside, a `MirTerm`: they describe a *condition*
//! ([`MirCond`]) under which a vanishing constraint's body is exempted.

use crate::field::FieldElement;
use crate::ids::ColumnId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MirTerm {
    Const(FieldElement),
    LabelledConst(String, FieldElement),
    ColumnAccess(ColumnId, i64),
    Add(Vec<MirTerm>),
    Sub(Vec<MirTerm>),
    Mul(Vec<MirTerm>),
    Norm(Box<MirTerm>),
    Exp(Box<MirTerm>, u64),
    Cast(Box<MirTerm>, u32),
}

impl MirTerm {
    pub fn zero() -> Self {
        MirTerm::Const(FieldElement::zero())
    }

    pub fn children(&self) -> Vec<&MirTerm> {
        match self {
            MirTerm::Const(_) | MirTerm::LabelledConst(..) | MirTerm::ColumnAccess(..) => vec![],
            MirTerm::Add(xs) | MirTerm::Sub(xs) | MirTerm::Mul(xs) => xs.iter().collect(),
            MirTerm::Norm(x) | MirTerm::Exp(x, _) | MirTerm::Cast(x, _) => vec![x.as_ref()],
        }
    }
}

/// The six comparison kinds a MIR `Equation` may carry (spec §3.8). Only
/// `Eq`/`Neq` are ever produced by this crate's HIR->MIR lowering (§4.C7);
/// the ordering kinds exist for a complete term algebra but reaching them
/// during MIR->AIR lowering of a vanishing constraint is an internal error
/// (see SPEC_FULL.md's Open Question resolutions).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EqKind {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A disjunction-of-equations condition, as produced by condition extraction
/// (spec §4.C7). Only `Or` is ever constructed by this crate's lowering
/// passes; `And` exists so the type can represent a general CNF/DNF term if
/// a future pass needs one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MirCond {
    /// The unconditional-true leaf (contributed by `Const`/`ColumnAccess`).
    True,
    Eq(EqKind, MirTerm, MirTerm),
    And(Vec<MirCond>),
    Or(Vec<MirCond>),
}

impl MirCond {
    pub fn or(args: impl IntoIterator<Item = MirCond>) -> Self {
        MirCond::Or(args.into_iter().collect())
    }
}
