//! Symbolic analyses over terms (spec §4.C3): the module context a term is
//! evaluated in, which columns/cells it reads, the row-window it spans, and
//! the integer range (hence bit width) it can take.

use crate::bounds::Bounds;
use crate::context::Context;
use crate::ids::ColumnId;
use crate::interval::Interval;
use crate::schema::Register;
use crate::term::air::AirTerm;
use crate::term::mir::{EqKind, MirCond, MirTerm};
use crate::term::HirTerm;
use std::collections::BTreeSet;

/// `contextOf`: the module a term must be evaluated in, found by joining the
/// contexts of every `ColumnAccess` leaf (spec §3.5, §4.C3).
pub trait Contextual {
    fn context_of(&self, registers: &[Register]) -> Context;
}

impl Contextual for HirTerm {
    fn context_of(&self, registers: &[Register]) -> Context {
        match self {
            HirTerm::Const(_) | HirTerm::LabelledConst(..) => Context::Void,
            HirTerm::ColumnAccess(id, _) => registers[id.index()].context(),
            _ => Context::join_all(self.children().iter().map(|c| c.context_of(registers))),
        }
    }
}

impl Contextual for MirTerm {
    fn context_of(&self, registers: &[Register]) -> Context {
        match self {
            MirTerm::Const(_) | MirTerm::LabelledConst(..) => Context::Void,
            MirTerm::ColumnAccess(id, _) => registers[id.index()].context(),
            _ => Context::join_all(self.children().iter().map(|c| c.context_of(registers))),
        }
    }
}

impl Contextual for MirCond {
    fn context_of(&self, registers: &[Register]) -> Context {
        match self {
            MirCond::True => Context::Void,
            MirCond::Eq(_, lhs, rhs) => lhs.context_of(registers).join(&rhs.context_of(registers)),
            MirCond::And(xs) | MirCond::Or(xs) => {
                Context::join_all(xs.iter().map(|x| x.context_of(registers)))
            }
        }
    }
}

impl Contextual for AirTerm {
    fn context_of(&self, registers: &[Register]) -> Context {
        match self {
            AirTerm::Const(_) => Context::Void,
            AirTerm::ColumnAccess(id, _) => registers[id.index()].context(),
            _ => Context::join_all(self.children().iter().map(|c| c.context_of(registers))),
        }
    }
}

/// Recognises a term that is nothing but a direct, unshifted access to a
/// single column, for invariants that need to tie a constraint back to the
/// one column it was raised against (spec §3.6, U7 "range -> proof coverage").
pub trait ColumnRef {
    fn as_plain_column(&self) -> Option<ColumnId>;
}

impl ColumnRef for HirTerm {
    fn as_plain_column(&self) -> Option<ColumnId> {
        match self {
            HirTerm::ColumnAccess(id, 0) => Some(*id),
            _ => None,
        }
    }
}

impl ColumnRef for MirTerm {
    fn as_plain_column(&self) -> Option<ColumnId> {
        match self {
            MirTerm::ColumnAccess(id, 0) => Some(*id),
            _ => None,
        }
    }
}

impl ColumnRef for AirTerm {
    fn as_plain_column(&self) -> Option<ColumnId> {
        match self {
            AirTerm::ColumnAccess(id, 0) => Some(*id),
            _ => None,
        }
    }
}

/// `requiredCells` at the HIR level (spec §4.C3): constants contribute ∅;
/// `IfZero` contributes the condition plus *both* branches, not only the
/// taken one, because this describes static dependency, not a dynamic trace
/// evaluation (which is the trace container's concern, an external
/// collaborator per spec.md §1).
pub fn required_cells_hir(term: &HirTerm, row: i64) -> BTreeSet<(ColumnId, i64)> {
    let mut out = BTreeSet::new();
    collect_cells_hir(term, row, &mut out);
    out
}

fn collect_cells_hir(term: &HirTerm, row: i64, out: &mut BTreeSet<(ColumnId, i64)>) {
    match term {
        HirTerm::ColumnAccess(id, shift) => {
            out.insert((*id, row + shift));
        }
        HirTerm::IfZero(c, t, f) => {
            collect_cells_hir(c, row, out);
            if let Some(t) = t {
                collect_cells_hir(t, row, out);
            }
            if let Some(f) = f {
                collect_cells_hir(f, row, out);
            }
        }
        _ => {
            for c in term.children() {
                collect_cells_hir(c, row, out);
            }
        }
    }
}

/// `requiredColumns`: every column a term reads, ignoring row shift.
pub fn required_columns_hir(term: &HirTerm) -> BTreeSet<ColumnId> {
    let mut out = BTreeSet::new();
    collect_columns_hir(term, &mut out);
    out
}

fn collect_columns_hir(term: &HirTerm, out: &mut BTreeSet<ColumnId>) {
    if let HirTerm::ColumnAccess(id, _) = term {
        out.insert(*id);
    }
    for c in term.children() {
        collect_columns_hir(c, out);
    }
}

pub fn required_columns_mir(term: &MirTerm) -> BTreeSet<ColumnId> {
    let mut out = BTreeSet::new();
    collect_columns_mir(term, &mut out);
    out
}

fn collect_columns_mir(term: &MirTerm, out: &mut BTreeSet<ColumnId>) {
    if let MirTerm::ColumnAccess(id, _) = term {
        out.insert(*id);
    }
    for c in term.children() {
        collect_columns_mir(c, out);
    }
}

pub fn required_columns_air(term: &AirTerm) -> BTreeSet<ColumnId> {
    let mut out = BTreeSet::new();
    collect_columns_air(term, &mut out);
    out
}

fn collect_columns_air(term: &AirTerm, out: &mut BTreeSet<ColumnId>) {
    if let AirTerm::ColumnAccess(id, _) = term {
        out.insert(*id);
    }
    for c in term.children() {
        collect_columns_air(c, out);
    }
}

/// `requiredCells`: every `(column, row)` pair a term reads when evaluated
/// at `row`. Purely symbolic — this crate has no trace container, so
/// out-of-range rows are the evaluator's concern, not ours.
pub fn required_cells_air(term: &AirTerm, row: i64) -> BTreeSet<(ColumnId, i64)> {
    let mut out = BTreeSet::new();
    collect_cells_air(term, row, &mut out);
    out
}

/// `requiredColumns`, generalised across all three term universes plus
/// `MirCond`, so schema-wide passes (the unused-declaration check in
/// `Schema::check_consistency`) can walk a `Vanishing<B>`'s body without
/// matching on the level by hand.
pub trait RequiredColumns {
    fn required_columns_into(&self, out: &mut BTreeSet<ColumnId>);
}

impl RequiredColumns for HirTerm {
    fn required_columns_into(&self, out: &mut BTreeSet<ColumnId>) {
        collect_columns_hir(self, out);
    }
}

impl RequiredColumns for MirTerm {
    fn required_columns_into(&self, out: &mut BTreeSet<ColumnId>) {
        collect_columns_mir(self, out);
    }
}

impl RequiredColumns for AirTerm {
    fn required_columns_into(&self, out: &mut BTreeSet<ColumnId>) {
        collect_columns_air(self, out);
    }
}

impl RequiredColumns for MirCond {
    fn required_columns_into(&self, out: &mut BTreeSet<ColumnId>) {
        match self {
            MirCond::True => {}
            MirCond::Eq(_, lhs, rhs) => {
                lhs.required_columns_into(out);
                rhs.required_columns_into(out);
            }
            MirCond::And(xs) | MirCond::Or(xs) => xs.iter().for_each(|x| x.required_columns_into(out)),
        }
    }
}

fn collect_cells_air(term: &AirTerm, row: i64, out: &mut BTreeSet<(ColumnId, i64)>) {
    if let AirTerm::ColumnAccess(id, shift) = term {
        out.insert((*id, row + shift));
    }
    for c in term.children() {
        collect_cells_air(c, row, out);
    }
}

/// `shiftRange`: the widest past/future row-window a term spans.
pub fn shift_range_hir(term: &HirTerm) -> Bounds {
    match term {
        HirTerm::ColumnAccess(_, shift) => Bounds::of_shift(*shift),
        _ => term.children().iter().fold(Bounds::ZERO, |acc, c| acc.union(&shift_range_hir(c))),
    }
}

pub fn shift_range_air(term: &AirTerm) -> Bounds {
    match term {
        AirTerm::ColumnAccess(_, shift) => Bounds::of_shift(*shift),
        _ => term.children().iter().fold(Bounds::ZERO, |acc, c| acc.union(&shift_range_air(c))),
    }
}

/// `integerRange`: a sound (possibly loose) bound on the values a term can
/// take, given each column's declared [`DataType`] (spec §4.C1/§4.C3).
pub fn integer_range_hir(term: &HirTerm, registers: &[Register]) -> Interval {
    match term {
        HirTerm::Const(v) => Interval::point(v.to_bigint()),
        HirTerm::LabelledConst(_, v) => Interval::point(v.to_bigint()),
        HirTerm::ColumnAccess(id, _) => column_interval(*id, registers),
        HirTerm::Add(xs) => fold_ranges_hir(xs, registers, Interval::add),
        HirTerm::Sub(xs) => fold_ranges_hir(xs, registers, Interval::sub),
        HirTerm::Mul(xs) => fold_ranges_hir(xs, registers, Interval::mul),
        HirTerm::List(xs) => xs
            .iter()
            .map(|x| integer_range_hir(x, registers))
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(Interval::zero),
        HirTerm::Norm(_) => Interval::boolean(),
        HirTerm::Exp(x, n) => integer_range_hir(x, registers).exp(*n),
        HirTerm::Cast(_, w) => Interval::unsigned(*w),
        HirTerm::IfZero(_, t, f) => {
            let branches: Vec<Interval> = [t, f]
                .into_iter()
                .flatten()
                .map(|b| integer_range_hir(b, registers))
                .collect();
            branches
                .into_iter()
                .reduce(|a, b| a.union(&b))
                .unwrap_or_else(Interval::zero)
        }
    }
}

fn fold_ranges_hir(xs: &[HirTerm], registers: &[Register], op: fn(&Interval, &Interval) -> Interval) -> Interval {
    let mut iter = xs.iter().map(|x| integer_range_hir(x, registers));
    let first = iter.next().unwrap_or_else(Interval::zero);
    iter.fold(first, |acc, next| op(&acc, &next))
}

pub fn integer_range_mir(term: &MirTerm, registers: &[Register]) -> Interval {
    match term {
        MirTerm::Const(v) => Interval::point(v.to_bigint()),
        MirTerm::LabelledConst(_, v) => Interval::point(v.to_bigint()),
        MirTerm::ColumnAccess(id, _) => column_interval(*id, registers),
        MirTerm::Add(xs) => fold_ranges_mir(xs, registers, Interval::add),
        MirTerm::Sub(xs) => fold_ranges_mir(xs, registers, Interval::sub),
        MirTerm::Mul(xs) => fold_ranges_mir(xs, registers, Interval::mul),
        MirTerm::Norm(_) => Interval::boolean(),
        MirTerm::Exp(x, n) => integer_range_mir(x, registers).exp(*n),
        MirTerm::Cast(_, w) => Interval::unsigned(*w),
    }
}

fn fold_ranges_mir(xs: &[MirTerm], registers: &[Register], op: fn(&Interval, &Interval) -> Interval) -> Interval {
    let mut iter = xs.iter().map(|x| integer_range_mir(x, registers));
    let first = iter.next().unwrap_or_else(Interval::zero);
    iter.fold(first, |acc, next| op(&acc, &next))
}

fn column_interval(id: ColumnId, registers: &[Register]) -> Interval {
    match registers[id.index()].data_type.width() {
        Some(w) => Interval::unsigned(w),
        None => {
            // `Field`: the field's own canonical range, [0, p). We don't
            // carry the modulus here; a field-typed column contributes no
            // usable bound, so callers treat this as "unbounded" by
            // widening through `union`/`accept` rather than reading `hi`.
            Interval::unsigned(254)
        }
    }
}

/// `bitWidth`: the minimal unsigned bit width that can hold a term's range,
/// or `None` if the range includes negative values (not representable as
/// an unsigned range constraint).
pub fn bit_width(range: &Interval) -> Option<u32> {
    use num_bigint::BigInt;
    use num_traits::Zero;
    if range.lo < BigInt::zero() {
        return None;
    }
    let mut width = 0u32;
    while !range.hi.is_zero() && !Interval::unsigned(width).contains(&range.hi) {
        width += 1;
    }
    Some(width)
}

/// Whether `cond` is one this crate's MIR->AIR lowering can compile: only
/// `Eq`/`Neq` leaves (spec §4.C7/§4.C8; see SPEC_FULL.md's Open Question
/// resolution on the ordering `EqKind`s).
pub fn is_lowerable_cond(cond: &MirCond) -> bool {
    match cond {
        MirCond::True => true,
        MirCond::Eq(kind, _, _) => matches!(kind, EqKind::Eq | EqKind::Neq),
        MirCond::And(xs) | MirCond::Or(xs) => xs.iter().all(is_lowerable_cond),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldElement;
    use crate::ids::ModuleId;
    use crate::schema::Register;
    use crate::types::DataType;

    fn reg(width: u32) -> Register {
        Register {
            name: "x".into(),
            module: ModuleId(0),
            data_type: DataType::Uint(width),
            padding_value: FieldElement::zero(),
            length_multiplier: 1,
            computed: false,
            must_prove: false,
        }
    }

    #[test]
    fn context_of_const_is_void() {
        let regs = vec![reg(8)];
        assert_eq!(HirTerm::one().context_of(&regs), Context::Void);
    }

    #[test]
    fn context_of_column_is_its_registers_context() {
        let regs = vec![reg(8)];
        let t = HirTerm::column(ColumnId(0));
        assert_eq!(t.context_of(&regs), Context::defined(ModuleId(0), 1));
    }

    #[test]
    fn required_columns_collects_every_leaf_once() {
        let t = HirTerm::add([HirTerm::column(ColumnId(0)), HirTerm::column(ColumnId(0)), HirTerm::column(ColumnId(1))]);
        let cols = required_columns_hir(&t);
        assert_eq!(cols.len(), 2);
    }

    #[test]
    fn shift_range_picks_widest_window() {
        let t = HirTerm::add([HirTerm::shifted(ColumnId(0), -3), HirTerm::shifted(ColumnId(0), 2)]);
        let b = shift_range_hir(&t);
        assert_eq!(b.past, 3);
        assert_eq!(b.future, 2);
    }

    #[test]
    fn bit_width_of_unsigned_range_matches_width() {
        let range = Interval::unsigned(8);
        assert_eq!(bit_width(&range), Some(8));
    }

    #[test]
    fn bit_width_rejects_negative_lower_bound() {
        let range = Interval::new(num_bigint::BigInt::from(-1), num_bigint::BigInt::from(5));
        assert_eq!(bit_width(&range), None);
    }

    #[test]
    fn sum_of_two_bytes_ranges_over_nine_bits() {
        let regs = vec![reg(8), reg(8)];
        let t = HirTerm::add([HirTerm::column(ColumnId(0)), HirTerm::column(ColumnId(1))]);
        let range = integer_range_hir(&t, &regs);
        assert_eq!(bit_width(&range), Some(9));
    }

    #[test]
    fn required_cells_of_ifzero_includes_both_branches() {
        let t = HirTerm::if_zero(HirTerm::column(ColumnId(0)), Some(HirTerm::column(ColumnId(1))), Some(HirTerm::column(ColumnId(2))));
        let cells = required_cells_hir(&t, 5);
        assert_eq!(cells, BTreeSet::from([(ColumnId(0), 5), (ColumnId(1), 5), (ColumnId(2), 5)]));
    }

    #[test]
    fn required_cells_of_constant_is_empty() {
        assert!(required_cells_hir(&HirTerm::one(), 0).is_empty());
    }

    #[test]
    fn plain_column_access_recognised_only_without_shift() {
        assert_eq!(HirTerm::column(ColumnId(4)).as_plain_column(), Some(ColumnId(4)));
        assert_eq!(HirTerm::shifted(ColumnId(4), 1).as_plain_column(), None);
    }
}
