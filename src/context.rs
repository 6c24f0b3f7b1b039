//! Evaluation context (spec §3.5).

use crate::ids::ModuleId;
use serde::{Deserialize, Serialize};

/// The module a term may be evaluated under, tagged with that module's
/// length multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Context {
    /// Constant-only expression; compatible with any module.
    Void,
    Defined { module: ModuleId, multiplier: u32 },
    /// Two incompatible defined contexts were joined.
    Conflicted,
}

impl Context {
    pub fn defined(module: ModuleId, multiplier: u32) -> Context {
        Context::Defined { module, multiplier }
    }

    pub fn is_conflicted(&self) -> bool {
        matches!(self, Context::Conflicted)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Context::Void)
    }

    /// Join two contexts per spec §3.5:
    /// `void ⊔ X = X`; `(m,k) ⊔ (m,k) = (m,k)`; any other pair of `Defined`s
    /// is `Conflicted`; `Conflicted` is absorbing.
    pub fn join(&self, other: &Context) -> Context {
        match (self, other) {
            (Context::Conflicted, _) | (_, Context::Conflicted) => Context::Conflicted,
            (Context::Void, x) => *x,
            (x, Context::Void) => *x,
            (
                Context::Defined { module: m1, multiplier: k1 },
                Context::Defined { module: m2, multiplier: k2 },
            ) => {
                if m1 == m2 && k1 == k2 {
                    *self
                } else {
                    Context::Conflicted
                }
            }
        }
    }

    pub fn join_all(contexts: impl IntoIterator<Item = Context>) -> Context {
        contexts.into_iter().fold(Context::Void, |acc, c| acc.join(&c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_is_identity() {
        let m = Context::defined(ModuleId(0), 1);
        assert_eq!(Context::Void.join(&m), m);
        assert_eq!(m.join(&Context::Void), m);
    }

    #[test]
    fn same_module_and_multiplier_is_stable() {
        let m = Context::defined(ModuleId(2), 4);
        assert_eq!(m.join(&m), m);
    }

    #[test]
    fn mismatched_module_or_multiplier_conflicts() {
        let a = Context::defined(ModuleId(0), 1);
        let b = Context::defined(ModuleId(1), 1);
        let c = Context::defined(ModuleId(0), 2);
        assert!(a.join(&b).is_conflicted());
        assert!(a.join(&c).is_conflicted());
    }

    #[test]
    fn conflicted_is_absorbing() {
        let m = Context::defined(ModuleId(0), 1);
        assert!(Context::Conflicted.join(&m).is_conflicted());
    }
}
