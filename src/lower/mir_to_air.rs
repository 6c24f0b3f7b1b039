//! MIR->AIR lowering (spec §4.C8): normalisation via computed-inverse
//! columns, the sorted-permutation gadget, and range-constraint selection
//! (primitive range check vs. byte decomposition).

use crate::analysis::Contextual;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::field::FieldElement;
use crate::handle::Handle;
use crate::ids::{ColumnId, ModuleId};
use crate::lower::short_hash;
use crate::schema::{
    Assignment, AirSchema, Computation, Decomposition, Domain, Lookup, LookupVector, MirSchema, Normalization, PropertyAssertion,
    RangeConstraint, Sorted, Vanishing,
};
use crate::term::air::AirTerm;
use crate::term::mir::{EqKind, MirCond, MirTerm};
use crate::term::pretty::{pretty_air, Unnamed};
use crate::types::DataType;
use num_bigint::BigInt;
use num_traits::One;
use std::collections::HashMap;
use tracing::{debug, info};

/// The widest bit width the AIR primitive range-check can cover directly;
/// anything wider goes through byte decomposition (spec §4.C8). No concrete
/// value is given in spec.md; 16 matches the width most lookup-backed range
/// checks in this family of systems use (see DESIGN.md).
pub const MAX_AIR_RANGE_WIDTH: u32 = 16;

/// The widest total packed bit count (`max_bitwidth * source_count`) the
/// lexicographic-sort gadget's single packed field element can hold without
/// limbs overlapping/carrying into each other. BN254's scalar field is
/// ~254 bits (spec §3.1's "p >= 250 bits" floor); 250 keeps every packed
/// digit strictly inside the field's canonical range with a safety margin,
/// rather than trusting callers to stay under it.
pub const MAX_PACKED_LEX_BITS: u32 = 250;

struct Ctx {
    schema: AirSchema,
    inv_cache: HashMap<String, ColumnId>,
}

fn module_name(schema: &AirSchema, module: ModuleId) -> String {
    schema.module(module).map(|m| m.name.clone()).unwrap_or_default()
}

/// `256^i` as a field element, computed via `BigInt` shifting rather than a
/// raw `u64 << (8*i)` (which overflows once `i >= 8`, i.e. past 64 bits of
/// limb weight — squarely reachable for any `mustProve` column wider than
/// 64 bits, since `DataType::Uint` has no declared width ceiling).
fn byte_weight(i: u32) -> FieldElement {
    FieldElement::from_bigint(&(BigInt::one() << (8 * i)))
}

fn context_module(context: &Context) -> ModuleId {
    match context {
        Context::Defined { module, .. } => *module,
        // Registration-time checks (U1) guarantee a constraint's context is
        // never void/conflicted by the time it reaches lowering.
        Context::Void | Context::Conflicted => unreachable!("constraint reached lowering with an unresolved context"),
    }
}

fn lower_term(term: &MirTerm, module: ModuleId, ctx: &mut Ctx) -> Result<AirTerm> {
    Ok(match term {
        MirTerm::Const(v) => AirTerm::Const(*v),
        MirTerm::LabelledConst(_, v) => AirTerm::Const(*v),
        MirTerm::ColumnAccess(id, s) => AirTerm::ColumnAccess(*id, *s),
        MirTerm::Add(xs) => AirTerm::Add(lower_terms(xs, module, ctx)?),
        MirTerm::Sub(xs) => AirTerm::Sub(lower_terms(xs, module, ctx)?),
        MirTerm::Mul(xs) => AirTerm::Mul(lower_terms(xs, module, ctx)?),
        MirTerm::Exp(x, n) => AirTerm::Exp(Box::new(lower_term(x, module, ctx)?), *n),
        MirTerm::Cast(x, w) => AirTerm::Cast(Box::new(lower_term(x, module, ctx)?), *w),
        MirTerm::Norm(x) => {
            let e = lower_term(x, module, ctx)?;
            lower_normalisation(e, module, ctx)?
        }
    })
}

fn lower_terms(xs: &[MirTerm], module: ModuleId, ctx: &mut Ctx) -> Result<Vec<AirTerm>> {
    xs.iter().map(|x| lower_term(x, module, ctx)).collect()
}

/// The normalisation gadget (spec §4.C8 step 2-4): introduces (or reuses) a
/// computed inverse column for `e` and returns `e * inv_e`.
fn lower_normalisation(e: AirTerm, module: ModuleId, ctx: &mut Ctx) -> Result<AirTerm> {
    let key = pretty_air(&e, &Unnamed);
    let inv_id = match ctx.inv_cache.get(&key) {
        Some(&id) => id,
        None => {
            let name = format!("inv_{}", short_hash(&key));
            debug!(column = %name, expr = %key, "allocating normalisation inverse column");
            let id = ctx.schema.declare_computed_column(module, name, DataType::Field)?;
            ctx.inv_cache.insert(key.clone(), id);
            let inv_access = AirTerm::ColumnAccess(id, 0);
            let one_minus_e_inv = AirTerm::sub2(AirTerm::one(), AirTerm::mul2(e.clone(), inv_access.clone()));
            let base = module_name(&ctx.schema, module);
            ctx.schema.add_vanishing_constraint(
                Handle::new(base.clone(), format!("[{} <=]", key)),
                None,
                Domain::AllRows,
                AirTerm::mul2(e.clone(), one_minus_e_inv.clone()),
            )?;
            ctx.schema.add_vanishing_constraint(
                Handle::new(base, format!("[{} =>]", key)),
                None,
                Domain::AllRows,
                AirTerm::mul2(inv_access, one_minus_e_inv),
            )?;
            ctx.schema.add_assignment(Assignment::Normalization(Normalization { target: id, source: e.clone() }))?;
            id
        }
    };
    Ok(AirTerm::mul2(e, AirTerm::ColumnAccess(inv_id, 0)))
}

/// Compiles a disjunction-of-equations condition to the product-of-witnesses
/// polynomial (spec §4.C8 "MIR constraints... are expressed as products of
/// disjuncted-term witnesses"): `True` contributes the multiplicative
/// identity (it never by itself makes the product vanish); `Eq` contributes
/// `lhs - rhs`; `Neq` contributes `1 - Norm(lhs - rhs)`, zero exactly when
/// `lhs != rhs`. The product is zero iff at least one disjunct holds.
fn cond_witness(cond: &MirCond, module: ModuleId, ctx: &mut Ctx) -> Result<AirTerm> {
    Ok(match cond {
        MirCond::True => AirTerm::one(),
        MirCond::Eq(EqKind::Eq, lhs, rhs) => {
            let l = lower_term(lhs, module, ctx)?;
            let r = lower_term(rhs, module, ctx)?;
            AirTerm::sub2(l, r)
        }
        MirCond::Eq(EqKind::Neq, lhs, rhs) => {
            let l = lower_term(lhs, module, ctx)?;
            let r = lower_term(rhs, module, ctx)?;
            let diff = AirTerm::sub2(l, r);
            let normed = lower_normalisation(diff, module, ctx)?;
            AirTerm::sub2(AirTerm::one(), normed)
        }
        MirCond::Eq(_, _, _) => unreachable!(
            "ordering EqKinds are never produced by this crate's HIR->MIR lowering; \
             reaching one here is a compiler bug (see SPEC_FULL.md Open Question 4)"
        ),
        MirCond::Or(xs) => {
            let mut product = AirTerm::one();
            for x in xs {
                product = AirTerm::mul2(product, cond_witness(x, module, ctx)?);
            }
            product
        }
        MirCond::And(_) => unreachable!("MirCond::And is never produced by this crate's lowering passes"),
    })
}

/// Emits the constraints realising "`expr` (an AIR term) lies in
/// `[0, 2^bitwidth)`" (spec §4.C8 "Range constraints").
fn emit_bitwidth_constraint(expr: AirTerm, bitwidth: u32, module: ModuleId, handle: Handle, ctx: &mut Ctx) -> Result<()> {
    match bitwidth {
        0 => {
            ctx.schema.add_vanishing_constraint(handle, None, Domain::AllRows, expr)?;
        }
        1 => {
            let guard = AirTerm::mul2(expr.clone(), AirTerm::sub2(expr, AirTerm::one()));
            ctx.schema.add_vanishing_constraint(handle, None, Domain::AllRows, guard)?;
        }
        w if w <= MAX_AIR_RANGE_WIDTH => {
            ctx.schema.add_range_constraint(handle, None, expr, w)?;
        }
        w => {
            let n_limbs = (w + 7) / 8;
            debug!(handle = %handle, bitwidth = w, limbs = n_limbs, "decomposing range constraint into bytes");
            let mut limbs = Vec::with_capacity(n_limbs as usize);
            let base = module_name(&ctx.schema, module);
            for i in 0..n_limbs {
                let id = ctx.schema.declare_computed_column(module, format!("{}_b{}", handle.name, i), DataType::Uint(8))?;
                ctx.schema.add_range_constraint(
                    Handle::new(base.clone(), format!("{}[byte{}]", handle, i)),
                    None,
                    AirTerm::ColumnAccess(id, 0),
                    8,
                )?;
                limbs.push(id);
            }
            let reconstruction = limbs
                .iter()
                .enumerate()
                .map(|(i, &id)| AirTerm::mul2(AirTerm::ColumnAccess(id, 0), AirTerm::Const(byte_weight(i as u32))))
                .fold(AirTerm::zero(), AirTerm::add2);
            ctx.schema.add_vanishing_constraint(
                Handle::new(base, format!("{}[recon]", handle)),
                None,
                Domain::AllRows,
                AirTerm::sub2(expr.clone(), reconstruction),
            )?;
            ctx.schema.add_assignment(Assignment::Decomposition(Decomposition { source: expr, limbs }))?;
        }
    }
    Ok(())
}

/// The sorted-permutation gadget (spec §4.C8): permutation lookups between
/// sources and targets, plus either the column-sort gadget (`n = 1`) or a
/// packed lexicographic-sort gadget (`n > 1`, see DESIGN.md for how this
/// crate realises "a selector per byte of lex position" as a single packed
/// delta check, which is equivalent for the uniform-sign case).
fn emit_sorted_permutation_gadget(
    targets: &[ColumnId],
    sources: &[ColumnId],
    signs: &[bool],
    context: Context,
    ctx: &mut Ctx,
) -> Result<()> {
    let module = context_module(&context);
    let base = module_name(&ctx.schema, module);

    let src_vec = LookupVector { context, exprs: sources.iter().map(|&c| AirTerm::column(c)).collect() };
    let tgt_vec = LookupVector { context, exprs: targets.iter().map(|&c| AirTerm::column(c)).collect() };
    ctx.schema.add_lookup_constraint(Handle::new(base.clone(), "sorted_perm_fwd"), src_vec.clone(), tgt_vec.clone())?;
    ctx.schema.add_lookup_constraint(Handle::new(base.clone(), "sorted_perm_rev"), tgt_vec, src_vec)?;

    let max_bitwidth = targets
        .iter()
        .map(|&c| ctx.schema.register(c).and_then(|r| r.data_type.width()).unwrap_or(254))
        .max()
        .unwrap_or(254);

    if targets.len() == 1 {
        let ascending = signs[0];
        let delta = ctx.schema.declare_computed_column(module, format!("delta_{}", targets[0].index()), DataType::Uint(max_bitwidth))?;
        let cur = AirTerm::ColumnAccess(targets[0], 0);
        let next = AirTerm::ColumnAccess(targets[0], 1);
        let diff = if ascending { AirTerm::sub2(next, cur) } else { AirTerm::sub2(cur, next) };
        ctx.schema.add_vanishing_constraint(
            Handle::new(base.clone(), "delta_recon"),
            None,
            Domain::AllRows,
            AirTerm::sub2(AirTerm::column(delta), diff),
        )?;
        emit_bitwidth_constraint(AirTerm::column(delta), max_bitwidth, module, Handle::new(base, "delta_range"), ctx)?;
        return Ok(());
    }

    if signs.iter().any(|&s| s != signs[0]) {
        return Err(Error::structural(
            "mixed-sign lexicographic sort over more than one source column is not supported",
        ));
    }
    let total_packed_bits = max_bitwidth as u64 * targets.len() as u64;
    if total_packed_bits > MAX_PACKED_LEX_BITS as u64 {
        return Err(Error::structural(format!(
            "lexicographic sort over {} columns of width {} needs {} packed bits, \
             more than this gadget's {}-bit ceiling for a single field element \
             (mixed widths would overlap/carry into each other and silently \
             accept unsorted traces)",
            targets.len(),
            max_bitwidth,
            total_packed_bits,
            MAX_PACKED_LEX_BITS,
        )));
    }
    let ascending = signs[0];
    let radix = FieldElement::from_bigint(&(BigInt::one() << max_bitwidth));
    let mut packed = AirTerm::zero();
    for &t in targets {
        packed = AirTerm::add2(AirTerm::mul2(packed, AirTerm::Const(radix)), AirTerm::column(t));
    }
    let lex_col = ctx.schema.declare_computed_column(module, "lex_packed", DataType::Field)?;
    ctx.schema
        .add_assignment(Assignment::Computation(Computation { target: lex_col, body: packed }))?;
    let cur = AirTerm::ColumnAccess(lex_col, 0);
    let next = AirTerm::ColumnAccess(lex_col, 1);
    let diff = if ascending { AirTerm::sub2(next, cur) } else { AirTerm::sub2(cur, next) };
    let delta = ctx.schema.declare_computed_column(module, "lex_delta", DataType::Uint(max_bitwidth * targets.len() as u32))?;
    ctx.schema.add_vanishing_constraint(
        Handle::new(base.clone(), "lex_delta_recon"),
        None,
        Domain::AllRows,
        AirTerm::sub2(AirTerm::column(delta), diff),
    )?;
    emit_bitwidth_constraint(
        AirTerm::column(delta),
        max_bitwidth * targets.len() as u32,
        module,
        Handle::new(base, "lex_delta_range"),
        ctx,
    )?;
    Ok(())
}

/// Lowers a whole MIR schema to AIR (spec §4.C8).
pub fn lower_mir_to_air(schema: &MirSchema) -> Result<AirSchema> {
    info!(
        vanishing = schema.vanishing.len(),
        ranges = schema.ranges.len(),
        assignments = schema.assignments.len(),
        "lowering MIR schema to AIR"
    );
    let mut ctx = Ctx {
        schema: AirSchema {
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
        },
        inv_cache: HashMap::new(),
    };

    let mut sorted_perm_gadgets = Vec::new();
    for a in &schema.assignments {
        match a {
            Assignment::SortedPermutation(s) => {
                sorted_perm_gadgets.push((s.targets.clone(), s.sources.clone(), s.signs.clone(), s.context));
                ctx.schema.assignments.push(Assignment::SortedPermutation(s.clone()));
                for &c in &s.targets {
                    ctx.schema.declarations.push(crate::schema::Declaration::Assignment(c));
                }
            }
            Assignment::Interleaving(i) => ctx.schema.assignments.push(Assignment::Interleaving(i.clone())),
            Assignment::Computation(c) => {
                let body = lower_term(&c.body, context_module(&c.body.context_of(&schema.registers)), &mut ctx)?;
                ctx.schema.assignments.push(Assignment::Computation(Computation { target: c.target, body }));
            }
            Assignment::Normalization(_) | Assignment::Decomposition(_) => {
                unreachable!("Normalization/Decomposition assignments only exist after MIR->AIR lowering runs")
            }
        }
    }

    for v in &schema.vanishing {
        let module = context_module(&v.context);
        let body = cond_witness(&v.body, module, &mut ctx)?;
        let context = body.context_of(&ctx.schema.registers);
        ctx.schema.vanishing.push(Vanishing { handle: v.handle.clone(), case: v.case, context, domain: v.domain, body });
    }

    for r in &schema.ranges {
        let module = context_module(&r.context);
        let expr = lower_term(&r.expr, module, &mut ctx)?;
        emit_bitwidth_constraint(expr, r.bitwidth, module, r.handle.clone(), &mut ctx)?;
    }

    for l in &schema.lookups {
        let source = lower_vector(&l.source, &mut ctx)?;
        let target = lower_vector(&l.target, &mut ctx)?;
        ctx.schema.lookups.push(Lookup { handle: l.handle.clone(), source, target });
    }

    for s in &schema.sorted {
        let module = context_module(&s.context);
        let sources = s.sources.iter().map(|e| lower_term(e, module, &mut ctx)).collect::<Result<Vec<_>>>()?;
        let selector = s.selector.as_ref().map(|e| lower_term(e, module, &mut ctx)).transpose()?;
        ctx.schema.sorted.push(Sorted {
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
        let module = context_module(&p.context);
        let body = cond_witness(&p.body, module, &mut ctx)?;
        let context = body.context_of(&ctx.schema.registers);
        ctx.schema.assertions.push(PropertyAssertion { handle: p.handle.clone(), context, body });
    }

    for (targets, sources, signs, context) in sorted_perm_gadgets {
        emit_sorted_permutation_gadget(&targets, &sources, &signs, context, &mut ctx)?;
    }

    info!(
        vanishing = ctx.schema.vanishing.len(),
        registers = ctx.schema.registers.len(),
        inverse_columns = ctx.inv_cache.len(),
        "MIR->AIR lowering complete"
    );
    Ok(ctx.schema)
}

fn lower_vector(v: &LookupVector<MirTerm>, ctx: &mut Ctx) -> Result<LookupVector<AirTerm>> {
    let module = context_module(&v.context);
    let exprs = v.exprs.iter().map(|e| lower_term(e, module, ctx)).collect::<Result<Vec<_>>>()?;
    let context = Context::join_all(exprs.iter().map(|e| e.context_of(&ctx.schema.registers)));
    Ok(LookupVector { context, exprs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ModuleId;
    use crate::schema::{HirSchema, MirSchema};
    use crate::term::HirTerm;
    use crate::types::DataType;

    fn mir_schema_with_binary_guard() -> MirSchema {
        let mut hir: HirSchema = HirSchema::new();
        let m = hir.add_module("m");
        let x = hir.add_data_column(m, "x", DataType::Uint(1), false).unwrap();
        let body = HirTerm::mul([HirTerm::column(x), HirTerm::sub([HirTerm::column(x), HirTerm::one()])]);
        hir.add_vanishing_constraint(Handle::new("m", "c"), None, Domain::AllRows, body).unwrap();
        crate::lower::lower_hir_to_mir(&hir).unwrap()
    }

    #[test]
    fn binary_guard_survives_to_air_unchanged_in_shape() {
        let mir = mir_schema_with_binary_guard();
        let air = lower_mir_to_air(&mir).unwrap();
        assert_eq!(air.vanishing.len(), 1);
    }

    #[test]
    fn normalisation_emits_inverse_column_and_two_guards() {
        let mut hir: HirSchema = HirSchema::new();
        let m = hir.add_module("m");
        let x = hir.add_data_column(m, "x", DataType::Field, false).unwrap();
        let y = hir.add_data_column(m, "y", DataType::Field, false).unwrap();
        let body = HirTerm::norm(HirTerm::sub([HirTerm::column(x), HirTerm::column(y)]));
        hir.add_vanishing_constraint(Handle::new("m", "c"), None, Domain::AllRows, body).unwrap();
        let mir = crate::lower::lower_hir_to_mir(&hir).unwrap();
        let air = lower_mir_to_air(&mir).unwrap();
        assert_eq!(air.vanishing.len(), 3);
        assert!(air.registers.iter().any(|r| r.name.starts_with("inv_")));
    }

    #[test]
    fn range_wider_than_max_decomposes_into_bytes() {
        let mut hir: HirSchema = HirSchema::new();
        let m = hir.add_module("m");
        let x = hir.add_data_column(m, "x", DataType::Uint(32), true).unwrap();
        hir.add_range_constraint(Handle::new("m", "r"), None, HirTerm::column(x), 32).unwrap();
        let mir = crate::lower::lower_hir_to_mir(&hir).unwrap();
        let air = lower_mir_to_air(&mir).unwrap();
        assert_eq!(air.ranges.len(), 4);
    }

    #[test]
    fn module_id_is_stable_across_pipeline() {
        let mir = mir_schema_with_binary_guard();
        let air = lower_mir_to_air(&mir).unwrap();
        assert_eq!(air.modules.len(), mir.modules.len());
        let _ = ModuleId(0);
    }
}
