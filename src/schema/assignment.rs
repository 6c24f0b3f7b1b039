//! Assignment kinds (spec §3.10): compiler-introduced computations that
//! populate one or more columns from others, preserving semantics after
//! lowering.

use crate::context::Context;
use crate::ids::ColumnId;
use crate::types::DataType;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SortedPermutation {
    pub context: Context,
    pub targets: Vec<ColumnId>,
    /// `true` = ascending. The first entry must be ascending (spec §3.10).
    pub signs: Vec<bool>,
    pub sources: Vec<ColumnId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Interleaving {
    pub context: Context,
    pub target: ColumnId,
    pub sources: Vec<ColumnId>,
    pub target_type: DataType,
}

impl Interleaving {
    /// Row `i*len+k` of `target` equals row `i` of `sources[k]`.
    pub fn len(&self) -> usize {
        self.sources.len()
    }
}

/// A generic computed-column form carrying its own generation body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Computation<T> {
    pub target: ColumnId,
    pub body: T,
}

/// The normalisation gadget's witness computation (spec §4.C8 step 2):
/// `target = 1/source` if `source != 0`, else `0`. This is a native
/// field-inverse operation, not expressible as an AIR term (the algebra has
/// no division), so it gets its own assignment kind rather than riding on
/// [`Computation`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Normalization<T> {
    pub target: ColumnId,
    pub source: T,
}

/// The byte-decomposition gadget's witness (spec §4.C8 "Range constraints",
/// `w > maxAirRangeWidth` branch): `limbs` are the base-256 little-endian
/// digits of `source`. Native, like [`Normalization`] — no AIR term can
/// express "the i-th byte of x".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Decomposition<T> {
    pub source: T,
    pub limbs: Vec<ColumnId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Assignment<T> {
    SortedPermutation(SortedPermutation),
    Interleaving(Interleaving),
    Computation(Computation<T>),
    Normalization(Normalization<T>),
    Decomposition(Decomposition<T>),
}

impl<T> Assignment<T> {
    /// The columns this assignment introduces, in the order they should be
    /// appended to the schema's declaration list (spec §4.C5 `addAssignment`).
    pub fn columns(&self) -> Vec<ColumnId> {
        match self {
            Assignment::SortedPermutation(s) => s.targets.clone(),
            Assignment::Interleaving(i) => vec![i.target],
            Assignment::Computation(c) => vec![c.target],
            Assignment::Normalization(n) => vec![n.target],
            Assignment::Decomposition(d) => d.limbs.clone(),
        }
    }
}
