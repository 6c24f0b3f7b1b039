//! Schema core (spec §4.C5): modules, registers, columns, declarations,
//! assignments and constraints, plus the consistency checks and iterator
//! surface that operate over them.

pub mod assignment;
pub mod constraint;
pub mod module;
pub mod register;

pub use crate::handle::Handle;
pub use assignment::{Assignment, Computation, Decomposition, Interleaving, Normalization, SortedPermutation};
pub use constraint::{Domain, IsUnitExpr, Lookup, LookupVector, Permutation, PropertyAssertion, RangeConstraint, Sorted, Vanishing};
pub use module::Module;
pub use register::{Declaration, Register};

use crate::analysis::{ColumnRef, Contextual, RequiredColumns};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::field::FieldElement;
use crate::ids::{ColumnId, ModuleId};
use crate::term::air::AirTerm;
use crate::term::mir::{MirCond, MirTerm};
use crate::term::HirTerm;
use crate::types::DataType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// A schema at a given IR level: `T` is the level's general term type, `B`
/// is the type used to express "this must hold" for vanishing constraints
/// and property assertions (equal to `T` at HIR/AIR, `MirCond` at MIR).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Schema<T, B = T> {
    pub modules: Vec<Module>,
    pub registers: Vec<Register>,
    pub declarations: Vec<Declaration>,
    pub assignments: Vec<Assignment<T>>,
    pub vanishing: Vec<Vanishing<B>>,
    pub ranges: Vec<RangeConstraint<T>>,
    pub lookups: Vec<Lookup<T>>,
    pub sorted: Vec<Sorted<T>>,
    pub permutations: Vec<Permutation>,
    pub assertions: Vec<PropertyAssertion<B>>,
}

pub type HirSchema = Schema<HirTerm>;
pub type MirSchema = Schema<MirTerm, MirCond>;
pub type AirSchema = Schema<AirTerm>;

impl<T, B> Default for Schema<T, B> {
    fn default() -> Self {
        Schema {
            modules: vec![Module::prelude()],
            registers: Vec::new(),
            declarations: Vec::new(),
            assignments: Vec::new(),
            vanishing: Vec::new(),
            ranges: Vec::new(),
            lookups: Vec::new(),
            sorted: Vec::new(),
            permutations: Vec::new(),
            assertions: Vec::new(),
        }
    }
}

impl<T, B> Schema<T, B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, name: impl Into<String>) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.modules.push(Module::new(name));
        id
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.index())
    }

    pub fn register(&self, id: ColumnId) -> Option<&Register> {
        self.registers.get(id.index())
    }

    fn alloc_register(
        &mut self,
        module: ModuleId,
        name: String,
        data_type: DataType,
        computed: bool,
    ) -> Result<ColumnId> {
        let length_multiplier = self.module(module).ok_or_else(|| Error::name_resolution(format!("unknown module {}", module)))?.length_multiplier;
        self.alloc_register_with_multiplier(module, name, data_type, computed, length_multiplier)
    }

    /// Like [`Schema::alloc_register`], but with an explicit length
    /// multiplier instead of inheriting the module's. Used by
    /// [`Schema::declare_computed_column_with_multiplier`] for assignments
    /// (e.g. `Interleaving`) whose target rows run at a multiple of the
    /// module's own row count (spec §3.10).
    fn alloc_register_with_multiplier(
        &mut self,
        module: ModuleId,
        name: String,
        data_type: DataType,
        computed: bool,
        length_multiplier: u32,
    ) -> Result<ColumnId> {
        if module.index() >= self.modules.len() {
            return Err(Error::name_resolution(format!("unknown module {}", module)));
        }
        let id = ColumnId(self.registers.len());
        self.registers.push(Register {
            name,
            module,
            data_type,
            padding_value: FieldElement::zero(),
            length_multiplier,
            computed,
            must_prove: false,
        });
        Ok(id)
    }

    /// Declares a user-supplied input data column.
    pub fn add_data_column(
        &mut self,
        module: ModuleId,
        name: impl Into<String>,
        data_type: DataType,
        must_prove: bool,
    ) -> Result<ColumnId> {
        let id = self.alloc_register(module, name.into(), data_type, false)?;
        self.registers[id.index()].must_prove = must_prove;
        self.declarations.push(Declaration::Input(id));
        Ok(id)
    }

    /// Allocates a fresh register for a computed column, without yet
    /// registering the assignment that produces it. Callers build an
    /// [`Assignment`] referencing the returned id and pass it to
    /// [`Schema::add_assignment`].
    pub fn declare_computed_column(
        &mut self,
        module: ModuleId,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Result<ColumnId> {
        self.alloc_register(module, name.into(), data_type, true)
    }

    /// Like [`Schema::declare_computed_column`], but with an explicit
    /// length multiplier. Used for `Interleaving` targets, whose rows run
    /// `len(sources)` times faster than the rest of their module (spec
    /// §3.10).
    pub fn declare_computed_column_with_multiplier(
        &mut self,
        module: ModuleId,
        name: impl Into<String>,
        data_type: DataType,
        length_multiplier: u32,
    ) -> Result<ColumnId> {
        self.alloc_register_with_multiplier(module, name.into(), data_type, true, length_multiplier)
    }

    /// Module removal ("Remap") is unsupported (open question, SPEC_FULL.md
    /// §5 resolution 2): a schema that contains lookup/range/sorted
    /// constraints spanning the module to be removed cannot have those
    /// constraints rewritten here, so this always fails rather than
    /// silently producing an inconsistent schema.
    pub fn remove_module(&self, _module: ModuleId) -> Result<()> {
        Err(Error::structural("module removal (`Remap`) is not supported"))
    }

    /// Registers an assignment and appends its target columns to the
    /// declaration list, in the order exposed by [`Assignment::columns`].
    pub fn add_assignment(&mut self, assignment: Assignment<T>) -> Result<ColumnId> {
        let cols = assignment.columns();
        let first = *cols
            .first()
            .ok_or_else(|| Error::structural("assignment introduces no columns"))?;
        for &c in &cols {
            if c.index() >= self.registers.len() {
                return Err(Error::name_resolution(format!("unknown column #{}", c)));
            }
            self.registers[c.index()].computed = true;
            self.declarations.push(Declaration::Assignment(c));
        }
        self.assignments.push(assignment);
        Ok(first)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn input_columns(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Input(c) => Some(*c),
            Declaration::Assignment(_) => None,
        })
    }

    pub fn assignments(&self) -> impl Iterator<Item = &Assignment<T>> {
        self.assignments.iter()
    }

    /// Declarations in declaration order: inputs, then assignments.
    pub fn declarations(&self) -> impl Iterator<Item = Declaration> + '_ {
        self.declarations.iter().copied()
    }

    /// The "column cache": every declared column, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.declarations().map(Declaration::column)
    }

    pub fn vanishing_constraints(&self) -> impl Iterator<Item = &Vanishing<B>> {
        self.vanishing.iter()
    }

    pub fn range_constraints(&self) -> impl Iterator<Item = &RangeConstraint<T>> {
        self.ranges.iter()
    }

    pub fn lookup_constraints(&self) -> impl Iterator<Item = &Lookup<T>> {
        self.lookups.iter()
    }

    pub fn sorted_constraints(&self) -> impl Iterator<Item = &Sorted<T>> {
        self.sorted.iter()
    }

    pub fn assertions(&self) -> impl Iterator<Item = &PropertyAssertion<B>> {
        self.assertions.iter()
    }
}

impl<T, B: Contextual> Schema<T, B> {
    /// Registers a vanishing constraint. The context is inferred from the
    /// body (not taken from the caller) and validated non-void/non-conflicted
    /// per the `contextOf` contract of spec §4.C3 and universal property U1.
    pub fn add_vanishing_constraint(
        &mut self,
        handle: Handle,
        case: Option<u64>,
        domain: Domain,
        body: B,
    ) -> Result<()> {
        let context = body.context_of(&self.registers);
        self.require_well_formed_context(&handle, context)?;
        self.vanishing.push(Vanishing { handle, case, context, domain, body });
        Ok(())
    }

    pub fn add_property_assertion(&mut self, handle: Handle, body: B) -> Result<()> {
        let context = body.context_of(&self.registers);
        self.require_well_formed_context(&handle, context)?;
        self.assertions.push(PropertyAssertion { handle, context, body });
        Ok(())
    }

    fn require_well_formed_context(&self, handle: &Handle, context: Context) -> Result<()> {
        if context.is_conflicted() {
            return Err(Error::context(
                format!("constraint `{}` joins incompatible module contexts", handle),
                handle.clone(),
            ));
        }
        if context.is_void() {
            return Err(Error::context(
                format!("constraint `{}` has no module context (constant-only body)", handle),
                handle.clone(),
            ));
        }
        Ok(())
    }
}

impl<T: Contextual + IsUnitExpr, B> Schema<T, B> {
    pub fn add_range_constraint(
        &mut self,
        handle: Handle,
        case: Option<u64>,
        expr: T,
        bitwidth: u32,
    ) -> Result<()> {
        let context = expr.context_of(&self.registers);
        if context.is_conflicted() {
            return Err(Error::context(format!("range constraint `{}` has a conflicted context", handle), handle.clone()));
        }
        self.ranges.push(RangeConstraint { handle, case, context, expr, bitwidth });
        Ok(())
    }

    pub fn add_lookup_constraint(
        &mut self,
        handle: Handle,
        source: LookupVector<T>,
        target: LookupVector<T>,
    ) -> Result<()> {
        if source.exprs.len() != target.exprs.len() {
            return Err(Error::structural(format!(
                "lookup `{}`: source has {} columns, target has {}",
                handle,
                source.exprs.len(),
                target.exprs.len()
            )));
        }
        for e in source.exprs.iter().chain(target.exprs.iter()) {
            if !e.is_unit_expr() {
                return Err(Error::structural(format!("lookup `{}`: non-unit expression in a lookup slot", handle)));
            }
        }
        let source_ctx = Context::join_all(source.exprs.iter().map(|e| e.context_of(&self.registers)));
        let target_ctx = Context::join_all(target.exprs.iter().map(|e| e.context_of(&self.registers)));
        if source_ctx.is_conflicted() || source_ctx.is_void() || target_ctx.is_conflicted() || target_ctx.is_void() {
            return Err(Error::context(format!("lookup `{}` has a void or conflicted context", handle), handle.clone()));
        }
        self.lookups.push(Lookup { handle, source, target });
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_sorted_constraint(
        &mut self,
        handle: Handle,
        context: Context,
        bitwidth: u32,
        selector: Option<T>,
        sources: Vec<T>,
        signs: Vec<bool>,
        strict: bool,
    ) -> Result<()> {
        if sources.len() != signs.len() {
            return Err(Error::structural(format!("sorted `{}`: sources/signs length mismatch", handle)));
        }
        if !signs.first().copied().unwrap_or(true) {
            return Err(Error::structural(format!("sorted `{}`: first sort key must be ascending", handle)));
        }
        for e in sources.iter().chain(selector.iter()) {
            if !e.is_unit_expr() {
                return Err(Error::structural(format!("sorted `{}`: non-unit expression", handle)));
            }
        }
        self.sorted.push(Sorted { handle, context, bitwidth, selector, sources, signs, strict });
        Ok(())
    }
}

impl<T, B> Schema<T, B> {
    /// Substitutes matching `LabelledConst`s throughout every constraint and
    /// assertion (spec §4.C5 `substituteConstants`). Must run before the
    /// terms are consumed by a lowering pass (spec §5 "freezes").
    pub fn substitute_constants(&mut self, map: &HashMap<String, FieldElement>)
    where
        T: SubstituteLabelled,
        B: SubstituteLabelled,
    {
        for v in &mut self.vanishing {
            v.body.substitute_labelled(map);
        }
        for r in &mut self.ranges {
            r.expr.substitute_labelled(map);
        }
        for l in &mut self.lookups {
            l.source.exprs.iter_mut().for_each(|e| e.substitute_labelled(map));
            l.target.exprs.iter_mut().for_each(|e| e.substitute_labelled(map));
        }
        for s in &mut self.sorted {
            s.sources.iter_mut().for_each(|e| e.substitute_labelled(map));
            if let Some(sel) = &mut s.selector {
                sel.substitute_labelled(map);
            }
        }
        for a in &mut self.assertions {
            a.body.substitute_labelled(map);
        }
    }

    /// Warns (never fails) on an input column that no constraint, assertion
    /// or assignment ever reads — a declared symbol that can't affect
    /// anything downstream. Mirrors Corset's `compiler/mod.rs` unused-symbol
    /// warning (SPEC_FULL.md supplemented feature §3).
    fn warn_unused_declarations(&self)
    where
        T: RequiredColumns,
        B: RequiredColumns,
    {
        let mut read: HashSet<ColumnId> = HashSet::new();
        for v in &self.vanishing {
            v.body.required_columns_into(&mut read);
        }
        for r in &self.ranges {
            r.expr.required_columns_into(&mut read);
        }
        for l in &self.lookups {
            l.source.exprs.iter().for_each(|e| e.required_columns_into(&mut read));
            l.target.exprs.iter().for_each(|e| e.required_columns_into(&mut read));
        }
        for s in &self.sorted {
            s.sources.iter().for_each(|e| e.required_columns_into(&mut read));
            if let Some(sel) = &s.selector {
                sel.required_columns_into(&mut read);
            }
        }
        for p in &self.assertions {
            p.body.required_columns_into(&mut read);
        }
        for a in &self.assignments {
            match a {
                Assignment::SortedPermutation(sp) => read.extend(sp.sources.iter().copied()),
                Assignment::Interleaving(i) => read.extend(i.sources.iter().copied()),
                Assignment::Computation(c) => c.body.required_columns_into(&mut read),
                Assignment::Normalization(n) => n.source.required_columns_into(&mut read),
                Assignment::Decomposition(d) => d.source.required_columns_into(&mut read),
            }
        }
        for d in &self.declarations {
            if let Declaration::Input(c) = d {
                if !read.contains(c) {
                    let reg = &self.registers[c.index()];
                    warn!(column = %reg.name, "declared column is never read by any constraint or assignment");
                }
            }
        }
    }

    /// Checks schema-wide invariants (spec §4.C5 `checkConsistency`):
    /// assignment targets are wide enough for the join of their sources,
    /// every computed column is the target of exactly one assignment, and
    /// every `mustProve` unsigned column is backed by exactly one range
    /// constraint of the matching bit width (spec §3.6, universal property
    /// U7 "range -> proof coverage", spec §8).
    pub fn check_consistency(&self) -> Result<()>
    where
        T: ColumnRef + RequiredColumns,
        B: RequiredColumns,
    {
        self.warn_unused_declarations();
        let mut computed_targets: HashMap<ColumnId, u32> = HashMap::new();
        for a in &self.assignments {
            for c in a.columns() {
                *computed_targets.entry(c).or_insert(0) += 1;
            }
        }
        for (col, count) in &computed_targets {
            if *count != 1 {
                return Err(Error::consistency(format!(
                    "computed column #{} is the target of {} assignments (expected exactly 1)",
                    col, count
                )));
            }
        }
        for (id, reg) in self.registers.iter().enumerate() {
            if reg.computed && !computed_targets.contains_key(&ColumnId(id)) {
                return Err(Error::consistency(format!("computed column `{}` has no producing assignment", reg.name)));
            }
        }
        for a in &self.assignments {
            if let Assignment::Interleaving(i) = a {
                let joined = i
                    .sources
                    .iter()
                    .map(|c| self.registers[c.index()].data_type)
                    .reduce(|a, b| a.join(&b))
                    .unwrap_or(DataType::Field);
                if joined != i.target_type {
                    return Err(Error::consistency(format!(
                        "interleaving target type {:?} does not match joined source type {:?}",
                        i.target_type, joined
                    )));
                }
                // Open question resolution (SPEC_FULL.md §5.3): the target's
                // multiplier must be exactly the module's base multiplier
                // times the source count; anything else is flagged rather
                // than silently accepted, since a stray collision with an
                // unrelated existing multiplier in the module would make two
                // logically distinct row strides indistinguishable.
                let target_reg = &self.registers[i.target.index()];
                let base = self.modules[target_reg.module.index()].length_multiplier;
                let expected = base * i.len() as u32;
                if target_reg.length_multiplier != expected {
                    return Err(Error::consistency(format!(
                        "interleaving target `{}` has length multiplier {}, expected {} ({} sources x module multiplier {})",
                        target_reg.name, target_reg.length_multiplier, expected, i.len(), base
                    )));
                }
            }
        }
        for (id, reg) in self.registers.iter().enumerate() {
            if !reg.must_prove {
                continue;
            }
            let width = match reg.data_type {
                DataType::Uint(w) => w,
                DataType::Field => continue,
            };
            let matching = self
                .ranges
                .iter()
                .filter(|r| r.expr.as_plain_column() == Some(ColumnId(id)) && r.bitwidth == width)
                .count();
            if matching != 1 {
                return Err(Error::consistency(format!(
                    "column `{}` is declared mustProve with {} bits but has {} matching range constraints (expected 1)",
                    reg.name, width, matching
                )));
            }
        }
        Ok(())
    }
}

/// Rewrites matching `LabelledConst` nodes in place (spec §4.C5
/// `substituteConstants`). `AirTerm` has no `LabelledConst` variant — by the
/// time a schema reaches AIR it has already been frozen — so its impl is a
/// no-op kept only so generic code compiles uniformly across levels.
pub trait SubstituteLabelled {
    fn substitute_labelled(&mut self, map: &HashMap<String, FieldElement>);
}

impl SubstituteLabelled for HirTerm {
    fn substitute_labelled(&mut self, map: &HashMap<String, FieldElement>) {
        match self {
            HirTerm::LabelledConst(label, value) => {
                if let Some(v) = map.get(label) {
                    *value = *v;
                }
            }
            HirTerm::Const(_) | HirTerm::ColumnAccess(..) => {}
            HirTerm::Add(xs) | HirTerm::Sub(xs) | HirTerm::Mul(xs) | HirTerm::List(xs) => {
                xs.iter_mut().for_each(|x| x.substitute_labelled(map));
            }
            HirTerm::Norm(x) | HirTerm::Cast(x, _) | HirTerm::Exp(x, _) => x.substitute_labelled(map),
            HirTerm::IfZero(c, t, f) => {
                c.substitute_labelled(map);
                if let Some(t) = t {
                    t.substitute_labelled(map);
                }
                if let Some(f) = f {
                    f.substitute_labelled(map);
                }
            }
        }
    }
}

impl SubstituteLabelled for MirTerm {
    fn substitute_labelled(&mut self, map: &HashMap<String, FieldElement>) {
        match self {
            MirTerm::LabelledConst(label, value) => {
                if let Some(v) = map.get(label) {
                    *value = *v;
                }
            }
            MirTerm::Const(_) | MirTerm::ColumnAccess(..) => {}
            MirTerm::Add(xs) | MirTerm::Sub(xs) | MirTerm::Mul(xs) => {
                xs.iter_mut().for_each(|x| x.substitute_labelled(map));
            }
            MirTerm::Norm(x) | MirTerm::Cast(x, _) | MirTerm::Exp(x, _) => x.substitute_labelled(map),
        }
    }
}

impl SubstituteLabelled for MirCond {
    fn substitute_labelled(&mut self, map: &HashMap<String, FieldElement>) {
        match self {
            MirCond::True => {}
            MirCond::Eq(_, lhs, rhs) => {
                lhs.substitute_labelled(map);
                rhs.substitute_labelled(map);
            }
            MirCond::And(xs) | MirCond::Or(xs) => xs.iter_mut().for_each(|x| x.substitute_labelled(map)),
        }
    }
}

impl SubstituteLabelled for AirTerm {
    fn substitute_labelled(&mut self, _map: &HashMap<String, FieldElement>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_data_column_rejects_unknown_module() {
        let mut schema: HirSchema = Schema::new();
        let err = schema.add_data_column(ModuleId(7), "x", DataType::Uint(8), false);
        assert!(matches!(err, Err(Error::NameResolution { .. })));
    }

    #[test]
    fn constant_only_vanishing_constraint_is_rejected_as_void() {
        let mut schema: HirSchema = Schema::new();
        let err = schema.add_vanishing_constraint(Handle::new("m", "c"), None, Domain::AllRows, HirTerm::zero());
        assert!(matches!(err, Err(Error::Context { .. })));
    }

    #[test]
    fn well_formed_vanishing_constraint_is_accepted() {
        let mut schema: HirSchema = Schema::new();
        let m = schema.add_module("m");
        let x = schema.add_data_column(m, "x", DataType::Uint(8), false).unwrap();
        let body = HirTerm::mul([HirTerm::column(x), HirTerm::sub([HirTerm::column(x), HirTerm::one()])]);
        assert!(schema.add_vanishing_constraint(Handle::new("m", "c"), None, Domain::AllRows, body).is_ok());
    }

    #[test]
    fn computed_column_with_no_assignment_fails_consistency() {
        let mut schema: HirSchema = Schema::new();
        let m = schema.add_module("m");
        schema.declare_computed_column(m, "y", DataType::Field).unwrap();
        assert!(schema.check_consistency().is_err());
    }

    #[test]
    fn assignment_records_declaration_and_consistency_passes() {
        let mut schema: HirSchema = Schema::new();
        let m = schema.add_module("m");
        let target = schema.declare_computed_column(m, "y", DataType::Field).unwrap();
        schema
            .add_assignment(Assignment::Computation(Computation { target, body: HirTerm::zero() }))
            .unwrap();
        assert!(schema.check_consistency().is_ok());
        assert_eq!(schema.columns().count(), 1);
    }

    #[test]
    fn must_prove_column_without_range_constraint_fails_consistency() {
        let mut schema: HirSchema = Schema::new();
        let m = schema.add_module("m");
        schema.add_data_column(m, "x", DataType::Uint(8), true).unwrap();
        assert!(matches!(schema.check_consistency(), Err(Error::Consistency { .. })));
    }

    #[test]
    fn must_prove_column_with_matching_range_constraint_passes_consistency() {
        let mut schema: HirSchema = Schema::new();
        let m = schema.add_module("m");
        let x = schema.add_data_column(m, "x", DataType::Uint(8), true).unwrap();
        schema.add_range_constraint(Handle::new("m", "r"), None, HirTerm::column(x), 8).unwrap();
        assert!(schema.check_consistency().is_ok());
    }

    #[test]
    fn must_prove_column_with_mismatched_bitwidth_fails_consistency() {
        let mut schema: HirSchema = Schema::new();
        let m = schema.add_module("m");
        let x = schema.add_data_column(m, "x", DataType::Uint(8), true).unwrap();
        schema.add_range_constraint(Handle::new("m", "r"), None, HirTerm::column(x), 16).unwrap();
        assert!(matches!(schema.check_consistency(), Err(Error::Consistency { .. })));
    }
}
