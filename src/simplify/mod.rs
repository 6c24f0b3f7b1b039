//! The simplifier (spec §4.C4): bottom-up constant propagation and an
//! optional normalisation-elimination pass driven by integer-range analysis.

use crate::analysis::{integer_range_hir, integer_range_mir};
use crate::field::FieldElement;
use crate::interval::Interval;
use crate::schema::Register;
use crate::term::mir::MirTerm;
use crate::term::HirTerm;
use num_bigint::BigInt;
use num_traits::{One, Zero};

fn is_const_hir(t: &HirTerm) -> Option<FieldElement> {
    match t {
        HirTerm::Const(v) | HirTerm::LabelledConst(_, v) => Some(*v),
        _ => None,
    }
}

fn is_const_mir(t: &MirTerm) -> Option<FieldElement> {
    match t {
        MirTerm::Const(v) | MirTerm::LabelledConst(_, v) => Some(*v),
        _ => None,
    }
}

/// `constantPropagation` over an HIR term (spec §4.C4). Idempotent (U3):
/// running it again on its own output is a no-op.
pub fn constant_propagation_hir(term: &HirTerm, keep_casts: bool) -> crate::error::Result<HirTerm> {
    let out = match term {
        HirTerm::Const(_) | HirTerm::LabelledConst(..) | HirTerm::ColumnAccess(..) => term.clone(),
        HirTerm::Add(xs) => fold_add_hir(flatten_hir(xs, is_add_hir, keep_casts)?),
        HirTerm::Sub(xs) => fold_sub_hir(simplify_each_hir(xs, keep_casts)?),
        HirTerm::Mul(xs) => fold_mul_hir(flatten_hir(xs, is_mul_hir, keep_casts)?),
        HirTerm::List(xs) => HirTerm::List(simplify_each_hir(xs, keep_casts)?),
        HirTerm::Norm(x) => {
            let x = constant_propagation_hir(x, keep_casts)?;
            match is_const_hir(&x) {
                Some(v) => HirTerm::Const(v.normalise()),
                None => HirTerm::norm(x),
            }
        }
        HirTerm::Exp(x, n) => {
            let x = constant_propagation_hir(x, keep_casts)?;
            match is_const_hir(&x) {
                Some(v) => HirTerm::Const(v.pow(*n)),
                None => HirTerm::exp(x, *n),
            }
        }
        HirTerm::Cast(x, w) => {
            let x = constant_propagation_hir(x, keep_casts)?;
            if let Some(v) = is_const_hir(&x) {
                if !Interval::unsigned(*w).contains(&v.to_bigint()) {
                    return Err(crate::error::Error::type_range(format!(
                        "cast constant {} does not fit in {} bits",
                        v, w
                    )));
                }
                if keep_casts {
                    HirTerm::cast(x, *w)
                } else {
                    x
                }
            } else {
                HirTerm::cast(x, *w)
            }
        }
        HirTerm::IfZero(c, t, f) => {
            let c = constant_propagation_hir(c, keep_casts)?;
            let t = t.as_deref().map(|t| constant_propagation_hir(t, keep_casts)).transpose()?;
            let f = f.as_deref().map(|f| constant_propagation_hir(f, keep_casts)).transpose()?;
            HirTerm::if_zero(c, t, f)
        }
    };
    Ok(out)
}

fn simplify_each_hir(xs: &[HirTerm], keep_casts: bool) -> crate::error::Result<Vec<HirTerm>> {
    xs.iter().map(|x| constant_propagation_hir(x, keep_casts)).collect()
}

fn is_add_hir(t: &HirTerm) -> Option<&[HirTerm]> {
    match t {
        HirTerm::Add(xs) => Some(xs),
        _ => None,
    }
}

fn is_mul_hir(t: &HirTerm) -> Option<&[HirTerm]> {
    match t {
        HirTerm::Mul(xs) => Some(xs),
        _ => None,
    }
}

/// Simplifies each child, then flattens one level of nested same-kind nodes.
fn flatten_hir(
    xs: &[HirTerm],
    same_kind: fn(&HirTerm) -> Option<&[HirTerm]>,
    keep_casts: bool,
) -> crate::error::Result<Vec<HirTerm>> {
    let simplified = simplify_each_hir(xs, keep_casts)?;
    let mut out = Vec::with_capacity(simplified.len());
    for x in simplified {
        if let Some(nested) = same_kind(&x) {
            out.extend(nested.iter().cloned());
        } else {
            out.push(x);
        }
    }
    Ok(out)
}

fn fold_add_hir(xs: Vec<HirTerm>) -> HirTerm {
    if xs.iter().all(|x| is_const_hir(x).is_some()) {
        let sum = xs.iter().fold(FieldElement::zero(), |acc, x| acc.add(is_const_hir(x).unwrap()));
        return HirTerm::Const(sum);
    }
    let survivors: Vec<HirTerm> = xs.into_iter().filter(|x| !matches!(is_const_hir(x), Some(v) if v.is_zero())).collect();
    match survivors.len() {
        0 => HirTerm::zero(),
        1 => survivors.into_iter().next().unwrap(),
        _ => HirTerm::Add(survivors),
    }
}

fn fold_mul_hir(xs: Vec<HirTerm>) -> HirTerm {
    if xs.iter().any(|x| matches!(is_const_hir(x), Some(v) if v.is_zero())) {
        return HirTerm::zero();
    }
    if xs.iter().all(|x| is_const_hir(x).is_some()) {
        let prod = xs.iter().fold(FieldElement::one(), |acc, x| acc.mul(is_const_hir(x).unwrap()));
        return HirTerm::Const(prod);
    }
    let survivors: Vec<HirTerm> = xs.into_iter().filter(|x| !matches!(is_const_hir(x), Some(v) if v == FieldElement::one())).collect();
    match survivors.len() {
        0 => HirTerm::one(),
        1 => survivors.into_iter().next().unwrap(),
        _ => HirTerm::Mul(survivors),
    }
}

fn fold_sub_hir(xs: Vec<HirTerm>) -> HirTerm {
    if xs.iter().all(|x| is_const_hir(x).is_some()) {
        let mut iter = xs.iter().map(|x| is_const_hir(x).unwrap());
        let first = iter.next().unwrap_or_else(FieldElement::zero);
        let result = iter.fold(first, |acc, v| acc.sub(v));
        return HirTerm::Const(result);
    }
    // "Constant minus flattened sum": drop constant-0 trailing subtrahends,
    // the rest stays a Sub — the remaining symbolic terms can't be reordered
    // without changing which operand is the minuend.
    let survivors: Vec<HirTerm> = xs
        .into_iter()
        .enumerate()
        .filter(|(i, x)| *i == 0 || !matches!(is_const_hir(x), Some(v) if v.is_zero()))
        .map(|(_, x)| x)
        .collect();
    match survivors.len() {
        1 => survivors.into_iter().next().unwrap(),
        _ => HirTerm::Sub(survivors),
    }
}

/// `eliminateNormalisation` (spec §4.C4). `level` 0 leaves every `Norm`
/// untouched; `level >= 1` rewrites `Norm(arg)` once `integerRange(arg)` is
/// known to already be boolean or signed-boolean.
pub fn eliminate_normalisation_hir(term: &HirTerm, registers: &[Register], level: u32) -> HirTerm {
    let rewrite_children = |xs: &[HirTerm]| xs.iter().map(|x| eliminate_normalisation_hir(x, registers, level)).collect();
    match term {
        HirTerm::Const(_) | HirTerm::LabelledConst(..) | HirTerm::ColumnAccess(..) => term.clone(),
        HirTerm::Add(xs) => HirTerm::Add(rewrite_children(xs)),
        HirTerm::Sub(xs) => HirTerm::Sub(rewrite_children(xs)),
        HirTerm::Mul(xs) => HirTerm::Mul(rewrite_children(xs)),
        HirTerm::List(xs) => HirTerm::List(rewrite_children(xs)),
        HirTerm::Exp(x, n) => HirTerm::exp(eliminate_normalisation_hir(x, registers, level), *n),
        HirTerm::Cast(x, w) => HirTerm::cast(eliminate_normalisation_hir(x, registers, level), *w),
        HirTerm::IfZero(c, t, f) => HirTerm::if_zero(
            eliminate_normalisation_hir(c, registers, level),
            t.as_deref().map(|t| eliminate_normalisation_hir(t, registers, level)),
            f.as_deref().map(|f| eliminate_normalisation_hir(f, registers, level)),
        ),
        HirTerm::Norm(arg) => {
            let arg = eliminate_normalisation_hir(arg, registers, level);
            if level == 0 {
                return HirTerm::norm(arg);
            }
            let range = integer_range_hir(&arg, registers);
            if range.within(&Interval::boolean()) {
                arg
            } else if range.within(&Interval::new(-BigInt::one(), BigInt::one())) {
                HirTerm::mul([arg.clone(), arg])
            } else {
                HirTerm::norm(arg)
            }
        }
    }
}

pub fn eliminate_normalisation_mir(term: &MirTerm, registers: &[Register], level: u32) -> MirTerm {
    let rewrite_children = |xs: &[MirTerm]| xs.iter().map(|x| eliminate_normalisation_mir(x, registers, level)).collect();
    match term {
        MirTerm::Const(_) | MirTerm::LabelledConst(..) | MirTerm::ColumnAccess(..) => term.clone(),
        MirTerm::Add(xs) => MirTerm::Add(rewrite_children(xs)),
        MirTerm::Sub(xs) => MirTerm::Sub(rewrite_children(xs)),
        MirTerm::Mul(xs) => MirTerm::Mul(rewrite_children(xs)),
        MirTerm::Exp(x, n) => MirTerm::Exp(Box::new(eliminate_normalisation_mir(x, registers, level)), *n),
        MirTerm::Cast(x, w) => MirTerm::Cast(Box::new(eliminate_normalisation_mir(x, registers, level)), *w),
        MirTerm::Norm(arg) => {
            let arg = eliminate_normalisation_mir(arg, registers, level);
            if level == 0 {
                return MirTerm::Norm(Box::new(arg));
            }
            let range = integer_range_mir(&arg, registers);
            if range.within(&Interval::boolean()) {
                arg
            } else if range.within(&Interval::new(-BigInt::one(), BigInt::one())) {
                MirTerm::Mul(vec![arg.clone(), arg])
            } else {
                MirTerm::Norm(Box::new(arg))
            }
        }
    }
}

/// `constantPropagation` over an MIR term, run before MIR->AIR lowering so
/// normalisation elimination and the `Cast`-elision rule also apply there.
pub fn constant_propagation_mir(term: &MirTerm, keep_casts: bool) -> crate::error::Result<MirTerm> {
    let out = match term {
        MirTerm::Const(_) | MirTerm::LabelledConst(..) | MirTerm::ColumnAccess(..) => term.clone(),
        MirTerm::Add(xs) => fold_add_mir(flatten_mir(xs, is_add_mir, keep_casts)?),
        MirTerm::Sub(xs) => fold_sub_mir(simplify_each_mir(xs, keep_casts)?),
        MirTerm::Mul(xs) => fold_mul_mir(flatten_mir(xs, is_mul_mir, keep_casts)?),
        MirTerm::Norm(x) => {
            let x = constant_propagation_mir(x, keep_casts)?;
            match is_const_mir(&x) {
                Some(v) => MirTerm::Const(v.normalise()),
                None => MirTerm::Norm(Box::new(x)),
            }
        }
        MirTerm::Exp(x, n) => {
            let x = constant_propagation_mir(x, keep_casts)?;
            match is_const_mir(&x) {
                Some(v) => MirTerm::Const(v.pow(*n)),
                None => MirTerm::Exp(Box::new(x), *n),
            }
        }
        MirTerm::Cast(x, w) => {
            let x = constant_propagation_mir(x, keep_casts)?;
            if let Some(v) = is_const_mir(&x) {
                if !Interval::unsigned(*w).contains(&v.to_bigint()) {
                    return Err(crate::error::Error::type_range(format!(
                        "cast constant {} does not fit in {} bits",
                        v, w
                    )));
                }
                if keep_casts {
                    MirTerm::Cast(Box::new(x), *w)
                } else {
                    x
                }
            } else {
                MirTerm::Cast(Box::new(x), *w)
            }
        }
    };
    Ok(out)
}

fn simplify_each_mir(xs: &[MirTerm], keep_casts: bool) -> crate::error::Result<Vec<MirTerm>> {
    xs.iter().map(|x| constant_propagation_mir(x, keep_casts)).collect()
}

fn is_add_mir(t: &MirTerm) -> Option<&[MirTerm]> {
    match t {
        MirTerm::Add(xs) => Some(xs),
        _ => None,
    }
}

fn is_mul_mir(t: &MirTerm) -> Option<&[MirTerm]> {
    match t {
        MirTerm::Mul(xs) => Some(xs),
        _ => None,
    }
}

fn flatten_mir(
    xs: &[MirTerm],
    same_kind: fn(&MirTerm) -> Option<&[MirTerm]>,
    keep_casts: bool,
) -> crate::error::Result<Vec<MirTerm>> {
    let simplified = simplify_each_mir(xs, keep_casts)?;
    let mut out = Vec::with_capacity(simplified.len());
    for x in simplified {
        if let Some(nested) = same_kind(&x) {
            out.extend(nested.iter().cloned());
        } else {
            out.push(x);
        }
    }
    Ok(out)
}

fn fold_add_mir(xs: Vec<MirTerm>) -> MirTerm {
    if xs.iter().all(|x| is_const_mir(x).is_some()) {
        let sum = xs.iter().fold(FieldElement::zero(), |acc, x| acc.add(is_const_mir(x).unwrap()));
        return MirTerm::Const(sum);
    }
    let survivors: Vec<MirTerm> = xs.into_iter().filter(|x| !matches!(is_const_mir(x), Some(v) if v.is_zero())).collect();
    match survivors.len() {
        0 => MirTerm::zero(),
        1 => survivors.into_iter().next().unwrap(),
        _ => MirTerm::Add(survivors),
    }
}

fn fold_mul_mir(xs: Vec<MirTerm>) -> MirTerm {
    if xs.iter().any(|x| matches!(is_const_mir(x), Some(v) if v.is_zero())) {
        return MirTerm::zero();
    }
    if xs.iter().all(|x| is_const_mir(x).is_some()) {
        let prod = xs.iter().fold(FieldElement::one(), |acc, x| acc.mul(is_const_mir(x).unwrap()));
        return MirTerm::Const(prod);
    }
    let survivors: Vec<MirTerm> = xs.into_iter().filter(|x| !matches!(is_const_mir(x), Some(v) if v == FieldElement::one())).collect();
    match survivors.len() {
        0 => MirTerm::Const(FieldElement::one()),
        1 => survivors.into_iter().next().unwrap(),
        _ => MirTerm::Mul(survivors),
    }
}

fn fold_sub_mir(xs: Vec<MirTerm>) -> MirTerm {
    if xs.iter().all(|x| is_const_mir(x).is_some()) {
        let mut iter = xs.iter().map(|x| is_const_mir(x).unwrap());
        let first = iter.next().unwrap_or_else(FieldElement::zero);
        let result = iter.fold(first, |acc, v| acc.sub(v));
        return MirTerm::Const(result);
    }
    let survivors: Vec<MirTerm> = xs
        .into_iter()
        .enumerate()
        .filter(|(i, x)| *i == 0 || !matches!(is_const_mir(x), Some(v) if v.is_zero()))
        .map(|(_, x)| x)
        .collect();
    match survivors.len() {
        1 => survivors.into_iter().next().unwrap(),
        _ => MirTerm::Sub(survivors),
    }
}
