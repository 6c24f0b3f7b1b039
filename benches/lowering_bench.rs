use arithc::handle::Handle;
use arithc::schema::{Domain, HirSchema};
use arithc::term::HirTerm;
use arithc::types::DataType;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

/// A synthetic schema with `n` binary-guard constraints and one wide
/// normalisation constraint per module, exercising both the cross-product
/// expansion of HIR->MIR and the inverse-column gadget of MIR->AIR.
fn synthetic_schema(n: usize) -> HirSchema {
    let mut schema = HirSchema::new();
    let m = schema.add_module("m");
    for i in 0..n {
        let x = schema.add_data_column(m, format!("x{i}"), DataType::Uint(1), false).unwrap();
        let body = HirTerm::mul([HirTerm::column(x), HirTerm::sub([HirTerm::column(x), HirTerm::one()])]);
        schema.add_vanishing_constraint(Handle::new("m", format!("binary{i}")), None, Domain::AllRows, body).unwrap();

        let a = schema.add_data_column(m, format!("a{i}"), DataType::Field, false).unwrap();
        let b = schema.add_data_column(m, format!("b{i}"), DataType::Field, false).unwrap();
        let cond = schema.add_data_column(m, format!("cond{i}"), DataType::Uint(8), false).unwrap();
        let conditional = HirTerm::if_zero(HirTerm::column(cond), Some(HirTerm::column(a)), Some(HirTerm::column(b)));
        schema.add_vanishing_constraint(Handle::new("m", format!("cond{i}")), None, Domain::AllRows, conditional).unwrap();
    }
    schema
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("hir-mir-air-pipeline");

    for size in [8usize, 32, 128] {
        group.bench_function(format!("hir_to_mir/{size}"), |b| {
            b.iter_batched(|| synthetic_schema(size), |hir| arithc::lower::lower_hir_to_mir(&hir).unwrap(), BatchSize::SmallInput)
        });

        group.bench_function(format!("full_pipeline/{size}"), |b| {
            b.iter_batched(
                || synthetic_schema(size),
                |hir| {
                    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
                    arithc::lower::lower_mir_to_air(&mir).unwrap()
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("encode/{size}"), |b| {
            b.iter_batched(
                || {
                    let hir = synthetic_schema(size);
                    let mir = arithc::lower::lower_hir_to_mir(&hir).unwrap();
                    arithc::lower::lower_mir_to_air(&mir).unwrap()
                },
                |air| arithc::encode::encode_schema(&air).unwrap(),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
