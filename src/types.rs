//! Data types (spec §3.7).

use crate::interval::Interval;
use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Either the unbounded field, or an unsigned integer of a fixed width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Field,
    Uint(u32),
}

impl DataType {
    /// `None` for `Field` (unbounded); `Some(w)` for `Uint(w)`.
    pub fn width(&self) -> Option<u32> {
        match self {
            DataType::Field => None,
            DataType::Uint(w) => Some(*w),
        }
    }

    /// Whether `v` is representable by this type.
    pub fn accept(&self, v: &BigInt) -> bool {
        match self {
            DataType::Field => true,
            DataType::Uint(w) => {
                v >= &BigInt::zero() && Interval::unsigned(*w).contains(v)
            }
        }
    }

    /// This type's uint projection, if any (identity for `Uint`, `None` for
    /// `Field`).
    pub fn as_uint(&self) -> Option<u32> {
        match self {
            DataType::Field => None,
            DataType::Uint(w) => Some(*w),
        }
    }

    /// The join (widest-covering) of two types, used when an assignment's
    /// target must hold the union of its sources' ranges (spec §3.10).
    pub fn join(&self, other: &DataType) -> DataType {
        match (self, other) {
            (DataType::Field, _) | (_, DataType::Field) => DataType::Field,
            (DataType::Uint(a), DataType::Uint(b)) => DataType::Uint((*a).max(*b)),
        }
    }
}
