//! Qualified names threaded through constraints, columns and errors.
//!
//! Real-world constraint compilers (this crate's closest relative threads a
//! `(module, name)` pair everywhere rather than a bare string) need a name
//! that survives module renaming and prints consistently in diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub module: String,
    pub name: String,
}

impl Handle {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Handle { module: module.into(), name: name.into() }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.module, self.name)
        }
    }
}
