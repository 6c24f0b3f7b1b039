//! Lowering passes (spec §4.C7, §4.C8): HIR->MIR and MIR->AIR.

pub mod hir_to_mir;
pub mod mir_to_air;

pub use hir_to_mir::lower_hir_to_mir;
pub use mir_to_air::lower_mir_to_air;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A deterministic short hash of a term's pretty-printed S-expression, used
/// to name gadget columns so structurally-identical sub-terms across
/// different constraints share one inverse column (spec §4.C8 step 2, §9).
pub fn short_hash(key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
