//! HIR->MIR lowering (spec §4.C7): expansion of lists/two-armed conditionals
//! via n-ary cross product, then condition/body extraction.

use crate::analysis::Contextual;
use crate::error::{Error, Result};
use crate::schema::{
    Assignment, Computation, HirSchema, Lookup, LookupVector, MirSchema, PropertyAssertion, RangeConstraint, Sorted, Vanishing,
};
use crate::term::mir::{EqKind, MirCond, MirTerm};
use crate::term::HirTerm;
use itertools::Itertools;
use tracing::{debug, info};

/// `Expansion`: rewrites a term to the list of terms with no `List` node and
/// no two-armed `IfZero` (spec §4.C7).
pub fn expand_hir(term: &HirTerm) -> Vec<HirTerm> {
    match term {
        HirTerm::Const(_) | HirTerm::LabelledConst(..) | HirTerm::ColumnAccess(..) => vec![term.clone()],
        HirTerm::Add(xs) => cross_product(xs, HirTerm::Add, flatten_matching(|t| matches!(t, HirTerm::Add(_)))),
        HirTerm::Mul(xs) => cross_product(xs, HirTerm::Mul, flatten_matching(|t| matches!(t, HirTerm::Mul(_)))),
        HirTerm::Sub(xs) => cross_product(xs, HirTerm::Sub, |xs| xs),
        HirTerm::List(xs) => xs.iter().flat_map(expand_hir).collect(),
        HirTerm::Norm(x) => expand_hir(x).into_iter().map(HirTerm::norm).collect(),
        HirTerm::Exp(x, n) => expand_hir(x).into_iter().map(|v| HirTerm::exp(v, *n)).collect(),
        HirTerm::Cast(x, w) => expand_hir(x).into_iter().map(|v| HirTerm::cast(v, *w)).collect(),
        HirTerm::IfZero(c, Some(t), Some(f)) => {
            let mut out = expand_hir(&HirTerm::if_zero((**c).clone(), Some((**t).clone()), None));
            out.extend(expand_hir(&HirTerm::if_zero((**c).clone(), None, Some((**f).clone()))));
            out
        }
        HirTerm::IfZero(c, t, f) => {
            let c_variants: Vec<Option<HirTerm>> = expand_hir(c).into_iter().map(Some).collect();
            let t_variants: Vec<Option<HirTerm>> = match t {
                Some(t) => expand_hir(t).into_iter().map(Some).collect(),
                None => vec![None],
            };
            let f_variants: Vec<Option<HirTerm>> = match f {
                Some(f) => expand_hir(f).into_iter().map(Some).collect(),
                None => vec![None],
            };
            let mut out = Vec::new();
            for c_i in &c_variants {
                for t_j in &t_variants {
                    for f_k in &f_variants {
                        out.push(HirTerm::if_zero(c_i.clone().unwrap(), t_j.clone(), f_k.clone()));
                    }
                }
            }
            out
        }
    }
}

fn flatten_matching(is_match: fn(&HirTerm) -> bool) -> impl Fn(Vec<HirTerm>) -> Vec<HirTerm> {
    move |combo: Vec<HirTerm>| {
        let mut out = Vec::with_capacity(combo.len());
        for x in combo {
            let children = match &x {
                HirTerm::Add(xs) | HirTerm::Mul(xs) if is_match(&x) => Some(xs.clone()),
                _ => None,
            };
            match children {
                Some(xs) => out.extend(xs),
                None => out.push(x),
            }
        }
        out
    }
}

fn cross_product(xs: &[HirTerm], build: fn(Vec<HirTerm>) -> HirTerm, flatten: impl Fn(Vec<HirTerm>) -> Vec<HirTerm>) -> Vec<HirTerm> {
    let per_position: Vec<Vec<HirTerm>> = xs.iter().map(expand_hir).collect();
    if per_position.iter().any(|v| v.is_empty()) {
        return vec![];
    }
    per_position
        .into_iter()
        .multi_cartesian_product()
        .map(|combo| build(flatten(combo)))
        .collect()
}

/// `Condition extraction` of an expanded term (spec §4.C7).
pub fn extract_condition(term: &HirTerm) -> MirCond {
    match term {
        HirTerm::Const(_) | HirTerm::LabelledConst(..) | HirTerm::ColumnAccess(..) => MirCond::True,
        HirTerm::Add(xs) | HirTerm::Sub(xs) | HirTerm::Mul(xs) => MirCond::or(xs.iter().map(extract_condition)),
        HirTerm::Norm(x) | HirTerm::Cast(x, _) | HirTerm::Exp(x, _) => extract_condition(x),
        HirTerm::List(_) => unreachable!("List must be eliminated by expansion before condition extraction"),
        HirTerm::IfZero(c, Some(t), None) => {
            MirCond::or([extract_condition(c), MirCond::Eq(EqKind::Neq, extract_body(c), MirTerm::zero()), extract_condition(t)])
        }
        HirTerm::IfZero(c, None, Some(f)) => {
            MirCond::or([extract_condition(c), MirCond::Eq(EqKind::Eq, extract_body(c), MirTerm::zero()), extract_condition(f)])
        }
        HirTerm::IfZero(_, None, None) => MirCond::True,
        HirTerm::IfZero(_, Some(_), Some(_)) => {
            unreachable!("two-armed IfZero must be eliminated by expansion before condition extraction")
        }
    }
}

/// `Body extraction` of an expanded term (spec §4.C7).
pub fn extract_body(term: &HirTerm) -> MirTerm {
    match term {
        HirTerm::Const(v) => MirTerm::Const(*v),
        HirTerm::LabelledConst(l, v) => MirTerm::LabelledConst(l.clone(), *v),
        HirTerm::ColumnAccess(id, s) => MirTerm::ColumnAccess(*id, *s),
        HirTerm::Add(xs) => MirTerm::Add(xs.iter().map(extract_body).collect()),
        HirTerm::Sub(xs) => MirTerm::Sub(xs.iter().map(extract_body).collect()),
        HirTerm::Mul(xs) => MirTerm::Mul(xs.iter().map(extract_body).collect()),
        HirTerm::Norm(x) => MirTerm::Norm(Box::new(extract_body(x))),
        HirTerm::Exp(x, n) => MirTerm::Exp(Box::new(extract_body(x)), *n),
        HirTerm::Cast(x, w) => MirTerm::Cast(Box::new(extract_body(x)), *w),
        HirTerm::List(_) => unreachable!("List must be eliminated by expansion before body extraction"),
        HirTerm::IfZero(_, Some(t), None) => extract_body(t),
        HirTerm::IfZero(_, None, Some(f)) => extract_body(f),
        HirTerm::IfZero(_, None, None) => MirTerm::zero(),
        HirTerm::IfZero(_, Some(_), Some(_)) => {
            unreachable!("two-armed IfZero reaching the body extractor is a compiler bug")
        }
    }
}

/// Lowers a `UnitExpr` (lookup/sorted/range slot): expansion must produce
/// exactly one term (spec §4.C7), which is then lowered directly via body
/// extraction.
fn lower_unit_expr(term: &HirTerm, handle_ctx: &str) -> Result<MirTerm> {
    let expanded = expand_hir(term);
    match expanded.len() {
        1 => Ok(extract_body(&expanded[0])),
        n => Err(Error::structural(format!(
            "{}: unit expression expanded to {} terms, expected exactly 1",
            handle_ctx, n
        ))),
    }
}

/// Lowers a vanishing-like body (vanishing constraint or property assertion)
/// to the disjunction `extracted_condition ∨ body = 0` for every expanded
/// branch (spec §4.C7 "For each expanded HIR vanishing constraint...").
fn lower_vanishing_body(term: &HirTerm) -> Vec<MirCond> {
    expand_hir(term)
        .iter()
        .map(|e| MirCond::or([extract_condition(e), MirCond::Eq(EqKind::Eq, extract_body(e), MirTerm::zero())]))
        .collect()
}

/// Lowers a whole HIR schema to MIR (spec §4.C7). Modules, registers and
/// declarations carry over unchanged; every constraint/assertion/assignment
/// body is lowered through expansion + condition/body extraction.
pub fn lower_hir_to_mir(schema: &HirSchema) -> Result<MirSchema> {
    info!(
        vanishing = schema.vanishing.len(),
        ranges = schema.ranges.len(),
        lookups = schema.lookups.len(),
        sorted = schema.sorted.len(),
        "lowering HIR schema to MIR"
    );
    let mut out: MirSchema = MirSchema {
        modules: schema.modules.clone(),
        registers: schema.registers.clone(),
        declarations: schema.declarations.clone(),
        assignments: Vec::new(),
        vanishing: Vec::new(),
        ranges: Vec::new(),
        lookups: Vec::new(),
        sorted: Vec::new(),
        permutations: schema.permutations.clone(),
        assertions: Vec::new(),
    };

    for a in &schema.assignments {
        out.assignments.push(match a {
            Assignment::SortedPermutation(s) => Assignment::SortedPermutation(s.clone()),
            Assignment::Interleaving(i) => Assignment::Interleaving(i.clone()),
            Assignment::Computation(c) => {
                let body = lower_unit_expr(&c.body, "assignment")?;
                Assignment::Computation(Computation { target: c.target, body })
            }
            Assignment::Normalization(n) => {
                let source = lower_unit_expr(&n.source, "assignment")?;
                Assignment::Normalization(crate::schema::Normalization { target: n.target, source })
            }
            Assignment::Decomposition(_) => {
                unreachable!("Decomposition assignments are only introduced by MIR->AIR lowering")
            }
        });
    }

    for v in &schema.vanishing {
        let branches = lower_vanishing_body(&v.body);
        debug!(handle = %v.handle, branches = branches.len(), "expanded vanishing constraint");
        for body in branches {
            let context = body.context_of(&out.registers);
            out.vanishing.push(Vanishing { handle: v.handle.clone(), case: v.case, context, domain: v.domain, body });
        }
    }

    for r in &schema.ranges {
        let expr = lower_unit_expr(&r.expr, &r.handle.to_string())?;
        let context = expr.context_of(&out.registers);
        out.ranges.push(RangeConstraint { handle: r.handle.clone(), case: r.case, context, expr, bitwidth: r.bitwidth });
    }

    for l in &schema.lookups {
        let source = lower_vector(&l.source, &out, &l.handle.to_string())?;
        let target = lower_vector(&l.target, &out, &l.handle.to_string())?;
        out.lookups.push(Lookup { handle: l.handle.clone(), source, target });
    }

    for s in &schema.sorted {
        let sources = s
            .sources
            .iter()
            .map(|e| lower_unit_expr(e, &s.handle.to_string()))
            .collect::<Result<Vec<_>>>()?;
        let selector = s.selector.as_ref().map(|e| lower_unit_expr(e, &s.handle.to_string())).transpose()?;
        out.sorted.push(Sorted {
            handle: s.handle.clone(),
            context: s.context,
            bitwidth: s.bitwidth,
            selector,
            sources,
            signs: s.signs.clone(),
            strict: s.strict,
        });
    }

    for p in &schema.assertions {
        for body in lower_vanishing_body(&p.body) {
            let context = body.context_of(&out.registers);
            out.assertions.push(PropertyAssertion { handle: p.handle.clone(), context, body });
        }
    }

    info!(vanishing = out.vanishing.len(), "HIR->MIR lowering complete");
    Ok(out)
}

fn lower_vector(v: &LookupVector<HirTerm>, out: &MirSchema, handle_ctx: &str) -> Result<LookupVector<MirTerm>> {
    let exprs = v.exprs.iter().map(|e| lower_unit_expr(e, handle_ctx)).collect::<Result<Vec<_>>>()?;
    let context = crate::context::Context::join_all(exprs.iter().map(|e| e.context_of(&out.registers)));
    Ok(LookupVector { context, exprs })
}
