//! Row-window bounds (spec §3.3).

use serde::{Deserialize, Serialize};

/// `(pastShift, futureShift)`: the widest window around a row a term reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Bounds {
    pub past: u32,
    pub future: u32,
}

impl Bounds {
    pub const ZERO: Bounds = Bounds { past: 0, future: 0 };

    /// The bounds contributed by a single column access at shift `s`.
    pub fn of_shift(s: i64) -> Bounds {
        Bounds {
            past: (-s).max(0) as u32,
            future: s.max(0) as u32,
        }
    }

    /// Componentwise max; identity is `(0, 0)`.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            past: self.past.max(other.past),
            future: self.future.max(other.future),
        }
    }
}
