//! NLEM formulary ranking benchmark

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use mediremind::services::{Formulary, FormularyEntry};

const CATEGORIES: [&str; 5] = [
    "Cardiovascular",
    "Antidiabetic",
    "Analgesic",
    "Antibiotic",
    "Respiratory",
];
const INDICATIONS: [&str; 5] = [
    "hypertension chest pain",
    "type 2 diabetes",
    "fever headache pain",
    "bacterial infection",
    "asthma wheezing",
];

fn synthetic_formulary(size: usize) -> Formulary {
    let entries: Vec<FormularyEntry> = (0..size)
        .map(|i| FormularyEntry {
            drug_name: format!("Drug{}", i),
            category: CATEGORIES[i % CATEGORIES.len()].to_string(),
            schedule: if i % 3 == 0 { "H".into() } else { String::new() },
            indication: INDICATIONS[i % INDICATIONS.len()].to_string(),
            dosage_form: format!("Tablet {} mg", (i % 10 + 1) * 50),
        })
        .collect();
    Formulary::from_entries(&entries)
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("formulary/query");
    for size in [100, 1000] {
        let formulary = synthetic_formulary(size);
        group.bench_function(format!("top3_{}", size), |b| {
            b.iter(|| formulary.query(black_box("chest pain and hypertension"), 3));
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let entries: Vec<FormularyEntry> = (0..1000)
        .map(|i| FormularyEntry {
            drug_name: format!("Drug{}", i),
            category: CATEGORIES[i % CATEGORIES.len()].to_string(),
            schedule: String::new(),
            indication: INDICATIONS[i % INDICATIONS.len()].to_string(),
            dosage_form: "Tablet".into(),
        })
        .collect();

    c.bench_function("formulary/build_1000", |b| {
        b.iter(|| Formulary::from_entries(black_box(&entries)));
    });
}

criterion_group!(benches, bench_query, bench_build);
criterion_main!(benches);
