//! Registers, columns and declarations (spec §3.6).

use crate::context::Context;
use crate::ids::ModuleId;
use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// The physical storage behind a column. At the core level a column and its
/// backing register are 1:1 (perspectives, which can map several columns
/// onto one register, are a front-end concern); the legacy name table is the
/// only surviving trace of that distinction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Register {
    pub name: String,
    pub module: ModuleId,
    pub data_type: DataType,
    pub padding_value: crate::field::FieldElement,
    pub length_multiplier: u32,
    /// `true` if this register is the target of an assignment rather than
    /// user-supplied input data.
    pub computed: bool,
    /// `true` if this register must be accompanied by a range constraint
    /// (spec §3.6 invariant).
    pub must_prove: bool,
}

impl Register {
    pub fn context(&self) -> Context {
        Context::defined(self.module, self.length_multiplier)
    }
}

/// How a column entered the schema: as user-supplied input data, or as the
/// target of an assignment. The declaration order (inputs, then
/// assignments) is what the "column cache" and the binary encoder (C9)
/// replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Declaration {
    Input(crate::ids::ColumnId),
    Assignment(crate::ids::ColumnId),
}

impl Declaration {
    pub fn column(self) -> crate::ids::ColumnId {
        match self {
            Declaration::Input(c) | Declaration::Assignment(c) => c,
        }
    }
}
