//! Legacy JSON constraint dump ingest (spec §4.C10, §6 "Legacy JSON").
//!
//! Translates the external dump's `{columns, constraints, computations}`
//! object into an [`HirSchema`]. This is a separate front-end, not a term
//! universe of its own: every value it produces is an ordinary [`HirTerm`],
//! so the rest of the pipeline (analyses, simplifier, HIR->MIR, MIR->AIR)
//! runs over ingested schemas exactly as it does over ones built directly
//! through `Schema::add_*`.

use crate::analysis::Contextual;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::field::FieldElement;
use crate::handle::Handle;
use crate::ids::{ColumnId, ModuleId};
use crate::schema::{Assignment, Domain, HirSchema, Interleaving, LookupVector, SortedPermutation};
use crate::term::HirTerm;
use crate::types::DataType;
use num_bigint::{BigInt, Sign};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A dump-format big integer: `[sign, [u32 words, little-endian]]`, with
/// `sign` in `{-1, 0, 1}` (spec §6).
fn parse_bigint(value: &serde_json::Value) -> Result<BigInt> {
    let arr = value.as_array().ok_or_else(|| Error::syntax("big integer must be a 2-element array"))?;
    if arr.len() != 2 {
        return Err(Error::syntax("big integer must be `[sign, words]`"));
    }
    let sign_num = arr[0].as_i64().ok_or_else(|| Error::syntax("big integer sign must be an integer"))?;
    let sign = match sign_num {
        -1 => Sign::Minus,
        0 => Sign::NoSign,
        1 => Sign::Plus,
        other => return Err(Error::syntax(format!("invalid big integer sign {other}"))),
    };
    let words: Vec<u32> = arr[1]
        .as_array()
        .ok_or_else(|| Error::syntax("big integer words must be an array"))?
        .iter()
        .map(|w| w.as_u64().map(|w| w as u32).ok_or_else(|| Error::syntax("big integer word must be a u32")))
        .collect::<Result<_>>()?;
    Ok(BigInt::from_slice(sign, &words))
}

#[derive(Deserialize)]
struct Dump {
    columns: Vec<DumpColumn>,
    #[serde(default)]
    constraints: Vec<DumpConstraint>,
    #[serde(default)]
    computations: Vec<DumpComputation>,
}

#[derive(Deserialize)]
struct DumpColumn {
    handle: String,
    kind: DumpColumnKind,
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    prove: bool,
}

#[derive(Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum DumpColumnKind {
    Commitment,
    Computed,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum DumpConstraint {
    Vanishing { handle: String, expr: RawExpr },
    Range { handle: String, expr: RawExpr, bitwidth: u32 },
    Lookup { handle: String, source: Vec<RawExpr>, target: Vec<RawExpr> },
    /// Discarded at ingest (spec §3.9, §4.C10): the dump carries no sort
    /// direction, so there is nothing semantically useful to recover here.
    Permutation { handle: String, from: Vec<String>, to: Vec<String> },
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum DumpComputation {
    SortedPermutation { targets: Vec<String>, signs: Vec<bool>, sources: Vec<String> },
    Interleaving { target: String, sources: Vec<String> },
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawExpr {
    Const(serde_json::Value),
    LabelledConst(String, serde_json::Value),
    Column { name: String, #[serde(default)] shift: i64 },
    Add(Vec<RawExpr>),
    Sub(Vec<RawExpr>),
    Mul(Vec<RawExpr>),
    List(Vec<RawExpr>),
    Norm(Box<RawExpr>),
    Exp(Box<RawExpr>, u64),
    Cast(Box<RawExpr>, u32),
    IfZero {
        cond: Box<RawExpr>,
        #[serde(default)]
        then_branch: Option<Box<RawExpr>>,
        #[serde(default)]
        else_branch: Option<Box<RawExpr>>,
    },
}

/// Resolves the dump's column-handle conventions: `"module.name"` for a
/// declared column, `"...#<id>"` for a direct reference to the `id`-th
/// declared column (spec §6). The latter is only meaningful once every
/// `Commitment` column has already been ingested, which `ingest` guarantees
/// by resolving handles in a second pass.
fn resolve_handle(handle: &str, columns: &HashMap<String, ColumnId>) -> Result<ColumnId> {
    if let Some(id_str) = handle.strip_prefix('#') {
        let id: usize = id_str.parse().map_err(|_| Error::name_resolution(format!("malformed column reference `{handle}`")))?;
        return Ok(ColumnId(id));
    }
    columns
        .get(handle)
        .copied()
        .ok_or_else(|| Error::name_resolution(format!("unknown column `{handle}`")))
}

fn split_module(handle: &str) -> (&str, &str) {
    match handle.rsplit_once('.') {
        Some((module, name)) => (module, name),
        None => ("", handle),
    }
}

fn parse_data_type(tag: &str) -> Result<DataType> {
    match tag {
        "Native" => Ok(DataType::Field),
        "Byte" => Ok(DataType::Uint(8)),
        "Binary" => Ok(DataType::Uint(1)),
        other => other
            .strip_prefix("Integer:")
            .and_then(|n| n.parse::<u32>().ok())
            .map(DataType::Uint)
            .ok_or_else(|| Error::syntax(format!("unknown column type `{other}`"))),
    }
}

fn convert_expr(expr: &RawExpr, columns: &HashMap<String, ColumnId>) -> Result<HirTerm> {
    Ok(match expr {
        RawExpr::Const(v) => HirTerm::Const(FieldElement::from_bigint(&parse_bigint(v)?)),
        RawExpr::LabelledConst(label, v) => HirTerm::LabelledConst(label.clone(), FieldElement::from_bigint(&parse_bigint(v)?)),
        RawExpr::Column { name, shift } => HirTerm::shifted(resolve_handle(name, columns)?, *shift),
        RawExpr::Add(xs) => HirTerm::Add(convert_exprs(xs, columns)?),
        RawExpr::Sub(xs) => HirTerm::Sub(convert_exprs(xs, columns)?),
        RawExpr::Mul(xs) => HirTerm::Mul(convert_exprs(xs, columns)?),
        RawExpr::List(xs) => HirTerm::List(convert_exprs(xs, columns)?),
        RawExpr::Norm(x) => HirTerm::norm(convert_expr(x, columns)?),
        RawExpr::Exp(x, n) => HirTerm::exp(convert_expr(x, columns)?, *n),
        RawExpr::Cast(x, w) => HirTerm::cast(convert_expr(x, columns)?, *w),
        RawExpr::IfZero { cond, then_branch, else_branch } => HirTerm::if_zero(
            convert_expr(cond, columns)?,
            then_branch.as_deref().map(|t| convert_expr(t, columns)).transpose()?,
            else_branch.as_deref().map(|e| convert_expr(e, columns)).transpose()?,
        ),
    })
}

fn convert_exprs(xs: &[RawExpr], columns: &HashMap<String, ColumnId>) -> Result<Vec<HirTerm>> {
    xs.iter().map(|x| convert_expr(x, columns)).collect()
}

/// Ingests a legacy JSON constraint dump into a fresh [`HirSchema`] (spec
/// §4.C10).
pub fn ingest(json: &str) -> Result<HirSchema> {
    let dump: Dump = serde_json::from_str(json).map_err(|e| Error::syntax(format!("malformed legacy dump: {e}")))?;

    let mut schema = HirSchema::new();
    let mut modules: HashMap<String, ModuleId> = HashMap::new();
    modules.insert(String::new(), ModuleId(0));
    let mut columns: HashMap<String, ColumnId> = HashMap::new();
    // `Computed` columns are deferred: the dump's `computations` section
    // carries both the target name and its source list, so we don't know
    // the target's type/context until that section is processed (§4.C10).
    let mut pending_computed: Vec<&DumpColumn> = Vec::new();

    for col in &dump.columns {
        let (module_name, name) = split_module(&col.handle);
        let module = *modules.entry(module_name.to_string()).or_insert_with(|| schema.add_module(module_name));

        match col.kind {
            DumpColumnKind::Commitment => {
                let data_type = parse_data_type(&col.data_type)?;
                let id = schema.add_data_column(module, name, data_type, col.prove)?;
                columns.insert(col.handle.clone(), id);
                if col.prove {
                    let width = data_type
                        .width()
                        .ok_or_else(|| Error::type_range(format!("`@prove` column `{}` has no bitwidth (field-typed)", col.handle)))?;
                    schema.add_range_constraint(Handle::new(module_name, format!("{name}@prove")), None, HirTerm::column(id), width)?;
                }
            }
            DumpColumnKind::Computed => pending_computed.push(col),
        }
    }

    for comp in &dump.computations {
        match comp {
            DumpComputation::SortedPermutation { targets, signs, sources } => {
                let source_ids: Vec<ColumnId> = sources.iter().map(|s| resolve_handle(s, &columns)).collect::<Result<_>>()?;
                if source_ids.is_empty() {
                    return Err(Error::structural("sorted permutation computation has no sources"));
                }
                let context = schema.register(source_ids[0]).unwrap().context();
                let module = match context {
                    Context::Defined { module, .. } => module,
                    _ => return Err(Error::context("sorted permutation source has no module context", Handle::new("", "computation"))),
                };
                let source_types: Vec<DataType> = source_ids.iter().map(|c| schema.register(*c).unwrap().data_type).collect();
                let mut target_ids = Vec::with_capacity(targets.len());
                for (target_handle, ty) in targets.iter().zip(&source_types) {
                    let (tmod, tname) = split_module(target_handle);
                    let tmod_id = *modules.entry(tmod.to_string()).or_insert_with(|| schema.add_module(tmod));
                    let id = schema.declare_computed_column(tmod_id, tname, *ty)?;
                    columns.insert(target_handle.clone(), id);
                    target_ids.push(id);
                }
                schema.add_assignment(Assignment::SortedPermutation(SortedPermutation {
                    context,
                    targets: target_ids,
                    signs: signs.clone(),
                    sources: source_ids,
                }))?;
            }
            DumpComputation::Interleaving { target, sources } => {
                let source_ids: Vec<ColumnId> = sources.iter().map(|s| resolve_handle(s, &columns)).collect::<Result<_>>()?;
                if source_ids.is_empty() {
                    return Err(Error::structural("interleaving computation has no sources"));
                }
                let target_type = source_ids
                    .iter()
                    .map(|c| schema.register(*c).unwrap().data_type)
                    .reduce(|a, b| a.join(&b))
                    .unwrap();
                let (tmod, tname) = split_module(target);
                let tmod_id = *modules.entry(tmod.to_string()).or_insert_with(|| schema.add_module(tmod));
                let base_mult = schema.module(tmod_id).unwrap().length_multiplier;
                let id = schema.declare_computed_column_with_multiplier(
                    tmod_id,
                    tname,
                    target_type,
                    base_mult * source_ids.len() as u32,
                )?;
                columns.insert(target.clone(), id);
                let context = Context::defined(tmod_id, base_mult * source_ids.len() as u32);
                schema.add_assignment(Assignment::Interleaving(Interleaving { context, target: id, sources: source_ids, target_type }))?;
            }
        }
    }

    for col in &pending_computed {
        if !columns.contains_key(&col.handle) {
            warn!("legacy dump: computed column `{}` has no producing computation entry", col.handle);
        }
    }

    for c in &dump.constraints {
        match c {
            DumpConstraint::Vanishing { handle, expr } => {
                let (module_name, name) = split_module(handle);
                let body = convert_expr(expr, &columns)?;
                schema.add_vanishing_constraint(Handle::new(module_name, name), None, Domain::AllRows, body)?;
            }
            DumpConstraint::Range { handle, expr, bitwidth } => {
                let (module_name, name) = split_module(handle);
                let body = convert_expr(expr, &columns)?;
                schema.add_range_constraint(Handle::new(module_name, name), None, body, *bitwidth)?;
            }
            DumpConstraint::Lookup { handle, source, target } => {
                let (module_name, name) = split_module(handle);
                let source_exprs = convert_exprs(source, &columns)?;
                let target_exprs = convert_exprs(target, &columns)?;
                let source_ctx = Context::join_all(source_exprs.iter().map(|e| e.context_of(&schema.registers)));
                let target_ctx = Context::join_all(target_exprs.iter().map(|e| e.context_of(&schema.registers)));
                schema.add_lookup_constraint(
                    Handle::new(module_name, name),
                    LookupVector { context: source_ctx, exprs: source_exprs },
                    LookupVector { context: target_ctx, exprs: target_exprs },
                )?;
            }
            DumpConstraint::Permutation { handle, .. } => {
                debug!("legacy dump: discarding permutation entry `{}` (no sort direction available)", handle);
            }
        }
    }

    Ok(schema)
}
