//! End-to-end scenarios from spec.md §8, exercised against the public
//! lowering pipeline (HIR -> MIR -> AIR). Since the trace container and
//! field-arithmetic evaluator are external collaborators (spec.md §1), this
//! file carries a tiny private `AirTerm` evaluator — good enough to check
//! that a hand-picked set of column values does or doesn't vanish the
//! lowered constraints, without reimplementing a prover.

use arithc::field::FieldElement;
use arithc::handle::Handle;
use arithc::ids::ColumnId;
use arithc::schema::{Assignment, Domain, HirSchema, Interleaving, LookupVector, SortedPermutation};
use arithc::term::air::AirTerm;
use arithc::types::DataType;
use std::collections::HashMap;

fn eval(term: &AirTerm, cols: &HashMap<ColumnId, Vec<FieldElement>>, row: i64) -> Option<FieldElement> {
    match term {
        AirTerm::Const(v) => Some(*v),
        AirTerm::ColumnAccess(id, shift) => {
            let values = cols.get(id)?;
            let idx = row + shift;
            if idx < 0 || idx as usize >= values.len() {
                None
            } else {
                Some(values[idx as usize])
            }
        }
        AirTerm::Add(xs) => xs.iter().try_fold(FieldElement::zero(), |acc, x| Some(acc.add(eval(x, cols, row)?))),
        AirTerm::Sub(xs) => {
            let mut iter = xs.iter();
            let first = eval(iter.next()?, cols, row)?;
            iter.try_fold(first, |acc, x| Some(acc.sub(eval(x, cols, row)?)))
        }
        AirTerm::Mul(xs) => xs.iter().try_fold(FieldElement::one(), |acc, x| Some(acc.mul(eval(x, cols, row)?))),
        AirTerm::Exp(x, n) => Some(eval(x, cols, row)?.pow(*n)),
        AirTerm::Cast(x, _) => eval(x, cols, row),
    }
}

/// Fills in the witness for every `inv_*` computed column the normalisation
/// gadget introduced (spec §4.C8 step 2): `1/e` where `e` is nonzero, else
/// `0`. `e`'s own values must already be present in `cols` for every column
/// it reads.
fn fill_normalisation_witnesses(schema: &arithc::schema::AirSchema, cols: &mut HashMap<ColumnId, Vec<FieldElement>>, rows: usize) {
    for a in &schema.assignments {
        if let Assignment::Normalization(n) = a {
            let mut values = Vec::with_capacity(rows);
            for row in 0..rows as i64 {
                let e = eval(&n.source, cols, row).unwrap_or_else(FieldElement::zero);
                values.push(e.inverse().unwrap_or_else(FieldElement::zero));
            }
            cols.insert(n.target, values);
        }
    }
}

fn f(v: i64) -> FieldElement {
    assert!(v >= 0, "test helper only needs non-negative literals");
    FieldElement::from_u64(v as u64)
}

/// Scenario 1: binary guard.
#[test]
fn scenario_binary_guard() {
    let mut hir: HirSchema = HirSchema::new();
    let m = hir.add_module("m");
    let x = hir.add_data_column(m, "x", DataType::Uint(1), false).unwrap();
    let body = arithc::term::HirTerm::mul([arithc::term::HirTerm::column(x), arithc::term::HirTerm::sub([arithc::term::HirTerm::column(x), arithc::term::HirTerm::one()])]);
    hir.add_vanishing_constraint(Handle::new("m", "c"), None, Domain::AllRows, body).unwrap();

    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
    let air = arithc::lower::lower_mir_to_air(&mir).unwrap();
    assert_eq!(air.vanishing.len(), 1);

    let accepting: Vec<FieldElement> = [0, 1, 0, 1].into_iter().map(f).collect();
    let cols: HashMap<ColumnId, Vec<FieldElement>> = HashMap::from([(x, accepting)]);
    for row in 0..4 {
        assert!(eval(&air.vanishing[0].body, &cols, row).unwrap().is_zero());
    }

    let rejecting: Vec<FieldElement> = [0, 2].into_iter().map(f).collect();
    let cols: HashMap<ColumnId, Vec<FieldElement>> = HashMap::from([(x, rejecting)]);
    assert!(!eval(&air.vanishing[0].body, &cols, 1).unwrap().is_zero());
}

/// Scenario 2: conditional expands to a cross product of two constraints,
/// with one shared normalisation gadget for the condition column.
#[test]
fn scenario_conditional_cross_product() {
    let mut hir: HirSchema = HirSchema::new();
    let m = hir.add_module("m");
    let cond = hir.add_data_column(m, "cond", DataType::Uint(8), false).unwrap();
    let y = hir.add_data_column(m, "y", DataType::Uint(8), false).unwrap();
    let z = hir.add_data_column(m, "z", DataType::Uint(8), false).unwrap();
    let body = arithc::term::HirTerm::if_zero(
        arithc::term::HirTerm::column(cond),
        Some(arithc::term::HirTerm::column(y)),
        Some(arithc::term::HirTerm::column(z)),
    );
    hir.add_vanishing_constraint(Handle::new("m", "c"), None, Domain::AllRows, body).unwrap();

    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
    assert_eq!(mir.vanishing.len(), 2);
    let air = arithc::lower::lower_mir_to_air(&mir).unwrap();
    // Two main branches plus one shared guard pair (spec §8 scenario 2).
    assert_eq!(air.vanishing.len(), 4);
    assert_eq!(air.registers.iter().filter(|r| r.name.starts_with("inv_")).count(), 1);

    let rows = 2;
    let mut cols: HashMap<ColumnId, Vec<FieldElement>> = HashMap::new();
    cols.insert(cond, vec![f(0), f(5)]);
    cols.insert(y, vec![f(0), f(9)]); // Y[0] = 0, required since cond[0] == 0.
    cols.insert(z, vec![f(9), f(0)]); // Z[1] = 0, required since cond[1] != 0.
    fill_normalisation_witnesses(&air, &mut cols, rows);

    for c in &air.vanishing {
        for row in 0..rows as i64 {
            assert!(eval(&c.body, &cols, row).unwrap().is_zero(), "constraint `{}` failed at row {row}", c.handle);
        }
    }

    // Breaking Y[0] = 0 must now fail one of the two main constraints.
    cols.insert(y, vec![f(1), f(9)]);
    fill_normalisation_witnesses(&air, &mut cols, rows);
    let any_fails = air.vanishing.iter().any(|c| !eval(&c.body, &cols, 0).unwrap().is_zero());
    assert!(any_fails);
}

/// Scenario 3: `(begin A B)` distributes into two independent constraints.
#[test]
fn scenario_list_distributes() {
    let mut hir: HirSchema = HirSchema::new();
    let m = hir.add_module("m");
    let a = hir.add_data_column(m, "a", DataType::Field, false).unwrap();
    let b = hir.add_data_column(m, "b", DataType::Field, false).unwrap();
    let body = arithc::term::HirTerm::List(vec![arithc::term::HirTerm::column(a), arithc::term::HirTerm::column(b)]);
    hir.add_vanishing_constraint(Handle::new("m", "c"), None, Domain::AllRows, body).unwrap();

    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
    assert_eq!(mir.vanishing.len(), 2);
    let air = arithc::lower::lower_mir_to_air(&mir).unwrap();
    assert_eq!(air.vanishing.len(), 2);

    let cols: HashMap<ColumnId, Vec<FieldElement>> = HashMap::from([(a, vec![f(0)]), (b, vec![f(0)])]);
    assert!(air.vanishing.iter().all(|c| eval(&c.body, &cols, 0).unwrap().is_zero()));

    let cols: HashMap<ColumnId, Vec<FieldElement>> = HashMap::from([(a, vec![f(1)]), (b, vec![f(0)])]);
    assert!(air.vanishing.iter().any(|c| !eval(&c.body, &cols, 0).unwrap().is_zero()));
}

/// Scenario 4: sorted permutation over two source columns produces the
/// forward/reverse permutation lookups plus the packed lexicographic-sort
/// delta gadget (spec §4.C8 "n > 1").
#[test]
fn scenario_sorted_permutation_gadget_shape() {
    let mut hir: HirSchema = HirSchema::new();
    let m = hir.add_module("m");
    let s1 = hir.add_data_column(m, "s1", DataType::Uint(8), false).unwrap();
    let s2 = hir.add_data_column(m, "s2", DataType::Uint(8), false).unwrap();
    let t1 = hir.declare_computed_column(m, "t1", DataType::Uint(8)).unwrap();
    let t2 = hir.declare_computed_column(m, "t2", DataType::Uint(8)).unwrap();
    let context = hir.register(s1).unwrap().context();
    hir.add_assignment(Assignment::SortedPermutation(SortedPermutation {
        context,
        targets: vec![t1, t2],
        signs: vec![true, true],
        sources: vec![s1, s2],
    }))
    .unwrap();
    assert!(hir.check_consistency().is_ok());

    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
    let air = arithc::lower::lower_mir_to_air(&mir).unwrap();

    assert_eq!(air.lookups.len(), 2, "expected forward and reverse permutation lookups");
    assert!(air.registers.iter().any(|r| r.name == "lex_packed"));
    assert!(air.registers.iter().any(|r| r.name == "lex_delta"));
    assert!(!air.ranges.is_empty(), "lex_delta must carry a range constraint");
}

/// Scenario 5: a u32 `mustProve` column decomposes into 4 byte columns with
/// a reconstruction equation and per-byte `[0,256)` range constraints.
#[test]
fn scenario_range_lowering_decomposes_into_bytes() {
    let mut hir: HirSchema = HirSchema::new();
    let m = hir.add_module("m");
    let x = hir.add_data_column(m, "x", DataType::Uint(32), true).unwrap();
    hir.add_range_constraint(Handle::new("m", "r"), None, arithc::term::HirTerm::column(x), 32).unwrap();

    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
    let air = arithc::lower::lower_mir_to_air(&mir).unwrap();

    assert_eq!(air.ranges.len(), 4);
    assert!(air.ranges.iter().all(|r| r.bitwidth == 8));
    assert!(air
        .assignments
        .iter()
        .any(|a| matches!(a, Assignment::Decomposition(d) if d.limbs.len() == 4)));
    assert!(air.vanishing.iter().any(|v| v.handle.name.contains("recon")));
}

/// Scenario 6: normalisation over field-typed columns emits exactly one
/// inverse column and two guard constraints, whose witness the test fills
/// in exactly as spec §4.C8 step 2 describes.
#[test]
fn scenario_normalisation_gadget() {
    let mut hir: HirSchema = HirSchema::new();
    let m = hir.add_module("m");
    let x = hir.add_data_column(m, "x", DataType::Field, false).unwrap();
    let y = hir.add_data_column(m, "y", DataType::Field, false).unwrap();
    let body = arithc::term::HirTerm::norm(arithc::term::HirTerm::sub([arithc::term::HirTerm::column(x), arithc::term::HirTerm::column(y)]));
    hir.add_vanishing_constraint(Handle::new("m", "c"), None, Domain::AllRows, body).unwrap();

    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
    let air = arithc::lower::lower_mir_to_air(&mir).unwrap();
    assert_eq!(air.vanishing.len(), 3);
    assert_eq!(air.registers.iter().filter(|r| r.name.starts_with("inv_")).count(), 1);

    for (xv, yv) in [(3i64, 3i64), (3, 7)] {
        let mut cols: HashMap<ColumnId, Vec<FieldElement>> = HashMap::from([(x, vec![f(xv)]), (y, vec![f(yv)])]);
        fill_normalisation_witnesses(&air, &mut cols, 1);
        for v in &air.vanishing {
            assert!(eval(&v.body, &cols, 0).unwrap().is_zero(), "guard `{}` failed for x={xv} y={yv}", v.handle);
        }
    }
}

/// A sanity check on encode/decode round-tripping an `Interleaving`
/// assignment end to end, independent of the unit tests in `encode`.
#[test]
fn interleaving_round_trips_through_encoding() {
    let mut hir: HirSchema = HirSchema::new();
    let m = hir.add_module("m");
    let a = hir.add_data_column(m, "a", DataType::Uint(8), false).unwrap();
    let b = hir.add_data_column(m, "b", DataType::Uint(8), false).unwrap();
    let target = hir
        .declare_computed_column_with_multiplier(m, "packed", DataType::Uint(8), hir.module(m).unwrap().length_multiplier * 2)
        .unwrap();
    let context = arithc::context::Context::defined(m, hir.module(m).unwrap().length_multiplier * 2);
    hir.add_assignment(Assignment::Interleaving(Interleaving { context, target, sources: vec![a, b], target_type: DataType::Uint(8) }))
        .unwrap();
    assert!(hir.check_consistency().is_ok());

    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
    let air = arithc::lower::lower_mir_to_air(&mir).unwrap();
    let bytes = arithc::encode::encode_schema(&air).unwrap();
    let decoded = arithc::encode::decode_schema(&bytes).unwrap();
    assert_eq!(decoded.registers[target.index()].length_multiplier, 2);
}

/// Legacy JSON ingest feeding straight into the full pipeline.
#[test]
fn legacy_dump_feeds_the_lowering_pipeline() {
    let json = r#"{
        "columns": [
            {"handle": "m.x", "kind": "commitment", "type": "Integer:1"}
        ],
        "constraints": [
            {"kind": "vanishing", "handle": "m.c", "expr":
                {"mul": [
                    {"column": {"name": "m.x", "shift": 0}},
                    {"sub": [{"column": {"name": "m.x", "shift": 0}}, {"const": [1, [1]]}]}
                ]}
            }
        ],
        "computations": []
    }"#;
    let hir = arithc::legacy::ingest(json).unwrap();
    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
    let air = arithc::lower::lower_mir_to_air(&mir).unwrap();
    assert_eq!(air.vanishing.len(), 1);

    let bytes = arithc::encode::encode_schema(&air).unwrap();
    assert!(arithc::encode::decode_schema(&bytes).is_ok());
}

/// `Sorted` constraints themselves (as distinct from the permutation
/// *assignment* gadget above) carry through HIR->MIR->AIR unchanged in
/// shape: one `Sorted` in, one `Sorted` out, same source count.
#[test]
fn sorted_constraint_lowers_one_to_one() {
    let mut hir: HirSchema = HirSchema::new();
    let m = hir.add_module("m");
    let a = hir.add_data_column(m, "a", DataType::Uint(8), false).unwrap();
    let b = hir.add_data_column(m, "b", DataType::Uint(8), false).unwrap();
    hir.add_sorted_constraint(
        Handle::new("m", "s"),
        arithc::context::Context::defined(m, 1),
        8,
        None,
        vec![arithc::term::HirTerm::column(a), arithc::term::HirTerm::column(b)],
        vec![true, true],
        true,
    )
    .unwrap();

    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
    assert_eq!(mir.sorted.len(), 1);
    let air = arithc::lower::lower_mir_to_air(&mir).unwrap();
    assert_eq!(air.sorted.len(), 1);
    assert_eq!(air.sorted[0].sources.len(), 2);
}

/// Lookup constraints carry through unchanged in vector length.
#[test]
fn lookup_constraint_preserves_vector_length() {
    let mut hir: HirSchema = HirSchema::new();
    let src_m = hir.add_module("src");
    let tgt_m = hir.add_module("tgt");
    let s = hir.add_data_column(src_m, "s", DataType::Uint(8), false).unwrap();
    let t = hir.add_data_column(tgt_m, "t", DataType::Uint(8), false).unwrap();
    hir.add_lookup_constraint(
        Handle::new("src", "l"),
        LookupVector { context: arithc::context::Context::defined(src_m, 1), exprs: vec![arithc::term::HirTerm::column(s)] },
        LookupVector { context: arithc::context::Context::defined(tgt_m, 1), exprs: vec![arithc::term::HirTerm::column(t)] },
    )
    .unwrap();

    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
    let air = arithc::lower::lower_mir_to_air(&mir).unwrap();
    assert_eq!(air.lookups.len(), 1);
    assert_eq!(air.lookups[0].source.exprs.len(), air.lookups[0].target.exprs.len());
}
