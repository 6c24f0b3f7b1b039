//! Modules (spec §3.4).

use serde::{Deserialize, Serialize};

/// A partition of columns sharing a length multiplier and evaluation
/// context. Every trace row count for a column in this module must be a
/// multiple of `length_multiplier`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub length_multiplier: u32,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module { name: name.into(), length_multiplier: 1 }
    }

    /// The schema-local sentinel module created when a schema is
    /// constructed (spec §9 "Global state").
    pub fn prelude() -> Self {
        Module { name: String::new(), length_multiplier: 1 }
    }
}
