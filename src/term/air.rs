//! The arithmetized term universe (spec §3.8, §4.C8).
//!
//! AIR terms have no `Norm`, no `IfZero`, no `Equation` — only the
//! operations a prover's polynomial evaluator needs. `LabelledConst` is also
//! gone: by the time MIR->AIR lowering runs, the schema has been "frozen"
//! (spec §5) and every labelled constant has a concrete value.

use crate::field::FieldElement;
use crate::ids::ColumnId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AirTerm {
    Const(FieldElement),
    ColumnAccess(ColumnId, i64),
    Add(Vec<AirTerm>),
    Sub(Vec<AirTerm>),
    Mul(Vec<AirTerm>),
    Exp(Box<AirTerm>, u64),
    Cast(Box<AirTerm>, u32),
}

impl AirTerm {
    pub fn zero() -> Self {
        AirTerm::Const(FieldElement::zero())
    }

    pub fn one() -> Self {
        AirTerm::Const(FieldElement::one())
    }

    pub fn column(id: ColumnId) -> Self {
        AirTerm::ColumnAccess(id, 0)
    }

    pub fn add2(a: AirTerm, b: AirTerm) -> Self {
        AirTerm::Add(vec![a, b])
    }

    pub fn sub2(a: AirTerm, b: AirTerm) -> Self {
        AirTerm::Sub(vec![a, b])
    }

    pub fn mul2(a: AirTerm, b: AirTerm) -> Self {
        AirTerm::Mul(vec![a, b])
    }

    pub fn children(&self) -> Vec<&AirTerm> {
        match self {
            AirTerm::Const(_) | AirTerm::ColumnAccess(..) => vec![],
            AirTerm::Add(xs) | AirTerm::Sub(xs) | AirTerm::Mul(xs) => xs.iter().collect(),
            AirTerm::Exp(x, _) | AirTerm::Cast(x, _) => vec![x.as_ref()],
        }
    }
}
