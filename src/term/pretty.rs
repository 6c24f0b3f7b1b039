//! Pretty-printing terms back to S-expressions (spec §4.C2, §6).
//!
//! Each variant maps to a fixed head symbol from the surface syntax's
//! vocabulary (`+ - * ~ ^ shift if ifnot begin == != < <= > >=`). A
//! [`ColumnNamer`] resolves a `ColumnAccess` to its qualified name; encoding
//! tests that have no schema at hand can pass [`unnamed`], which falls back
//! to `#id`.

use super::air::AirTerm;
use super::mir::{EqKind, MirCond, MirTerm};
use super::HirTerm;
use crate::ids::ColumnId;
use std::fmt::Write as _;

pub trait ColumnNamer {
    fn name(&self, id: ColumnId) -> String;
}

/// A namer with no schema backing it; always produces `#id`.
pub struct Unnamed;
impl ColumnNamer for Unnamed {
    fn name(&self, id: ColumnId) -> String {
        format!("#{}", id.index())
    }
}

fn access(namer: &dyn ColumnNamer, id: ColumnId, shift: i64) -> String {
    let base = namer.name(id);
    if shift == 0 {
        base
    } else {
        format!("(shift {} {})", base, shift)
    }
}

fn paren(head: &str, args: &[String]) -> String {
    let mut s = String::new();
    write!(s, "({}", head).unwrap();
    for a in args {
        write!(s, " {}", a).unwrap();
    }
    s.push(')');
    s
}

pub fn pretty_hir(term: &HirTerm, namer: &dyn ColumnNamer) -> String {
    match term {
        HirTerm::Const(v) => v.to_string(),
        HirTerm::LabelledConst(label, _) => label.clone(),
        HirTerm::ColumnAccess(id, shift) => access(namer, *id, *shift),
        HirTerm::Add(xs) => paren("+", &xs.iter().map(|x| pretty_hir(x, namer)).collect::<Vec<_>>()),
        HirTerm::Sub(xs) => paren("-", &xs.iter().map(|x| pretty_hir(x, namer)).collect::<Vec<_>>()),
        HirTerm::Mul(xs) => paren("*", &xs.iter().map(|x| pretty_hir(x, namer)).collect::<Vec<_>>()),
        HirTerm::List(xs) => paren("begin", &xs.iter().map(|x| pretty_hir(x, namer)).collect::<Vec<_>>()),
        HirTerm::Norm(x) => paren("~", &[pretty_hir(x, namer)]),
        HirTerm::Exp(x, p) => paren("^", &[pretty_hir(x, namer), p.to_string()]),
        HirTerm::Cast(x, w) => paren("cast", &[pretty_hir(x, namer), w.to_string()]),
        HirTerm::IfZero(c, t, f) => {
            let mut args = vec![pretty_hir(c, namer)];
            if let Some(t) = t {
                args.push(pretty_hir(t, namer));
            }
            if let Some(f) = f {
                args.push(pretty_hir(f, namer));
            }
            let head = if t.is_none() { "ifnot" } else { "if" };
            paren(head, &args)
        }
    }
}

pub fn pretty_mir(term: &MirTerm, namer: &dyn ColumnNamer) -> String {
    match term {
        MirTerm::Const(v) => v.to_string(),
        MirTerm::LabelledConst(label, _) => label.clone(),
        MirTerm::ColumnAccess(id, shift) => access(namer, *id, *shift),
        MirTerm::Add(xs) => paren("+", &xs.iter().map(|x| pretty_mir(x, namer)).collect::<Vec<_>>()),
        MirTerm::Sub(xs) => paren("-", &xs.iter().map(|x| pretty_mir(x, namer)).collect::<Vec<_>>()),
        MirTerm::Mul(xs) => paren("*", &xs.iter().map(|x| pretty_mir(x, namer)).collect::<Vec<_>>()),
        MirTerm::Norm(x) => paren("~", &[pretty_mir(x, namer)]),
        MirTerm::Exp(x, p) => paren("^", &[pretty_mir(x, namer), p.to_string()]),
        MirTerm::Cast(x, w) => paren("cast", &[pretty_mir(x, namer), w.to_string()]),
    }
}

fn eq_head(kind: EqKind) -> &'static str {
    match kind {
        EqKind::Eq => "==",
        EqKind::Neq => "!=",
        EqKind::Lt => "<",
        EqKind::Le => "<=",
        EqKind::Gt => ">",
        EqKind::Ge => ">=",
    }
}

pub fn pretty_mir_cond(cond: &MirCond, namer: &dyn ColumnNamer) -> String {
    match cond {
        MirCond::True => "true".to_string(),
        MirCond::Eq(kind, lhs, rhs) => {
            paren(eq_head(*kind), &[pretty_mir(lhs, namer), pretty_mir(rhs, namer)])
        }
        MirCond::And(xs) => paren("and", &xs.iter().map(|x| pretty_mir_cond(x, namer)).collect::<Vec<_>>()),
        MirCond::Or(xs) => paren("or", &xs.iter().map(|x| pretty_mir_cond(x, namer)).collect::<Vec<_>>()),
    }
}

pub fn pretty_air(term: &AirTerm, namer: &dyn ColumnNamer) -> String {
    match term {
        AirTerm::Const(v) => v.to_string(),
        AirTerm::ColumnAccess(id, shift) => access(namer, *id, *shift),
        AirTerm::Add(xs) => paren("+", &xs.iter().map(|x| pretty_air(x, namer)).collect::<Vec<_>>()),
        AirTerm::Sub(xs) => paren("-", &xs.iter().map(|x| pretty_air(x, namer)).collect::<Vec<_>>()),
        AirTerm::Mul(xs) => paren("*", &xs.iter().map(|x| pretty_air(x, namer)).collect::<Vec<_>>()),
        AirTerm::Exp(x, p) => paren("^", &[pretty_air(x, namer), p.to_string()]),
        AirTerm::Cast(x, w) => paren("cast", &[pretty_air(x, namer), w.to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldElement;

    #[test]
    fn unnamed_columns_print_as_hash_id() {
        let t = HirTerm::column(ColumnId(3));
        assert_eq!(pretty_hir(&t, &Unnamed), "#3");
    }

    #[test]
    fn shifted_access_prints_shift_form() {
        let t = HirTerm::shifted(ColumnId(1), -2);
        assert_eq!(pretty_hir(&t, &Unnamed), "(shift #1 -2)");
    }

    #[test]
    fn norm_uses_tilde_head() {
        let t = HirTerm::norm(HirTerm::Const(FieldElement::from_u64(5)));
        assert_eq!(pretty_hir(&t, &Unnamed), "(~ 5)");
    }

    #[test]
    fn ifzero_without_then_branch_prints_ifnot() {
        let t = HirTerm::if_zero(HirTerm::column(ColumnId(0)), None, Some(HirTerm::one()));
        assert_eq!(pretty_hir(&t, &Unnamed), "(ifnot #0 1)");
    }
}
