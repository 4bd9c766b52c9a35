use std::hint::black_box;
use std::sync::Arc;
use criterion::{criterion_group, criterion_main, Criterion};
use exg_split::{
    DatasetGenerator, EpochIndex, SplitUnit, SplittingConfig, TestAxis, TestSplitter, TrainMode,
    ValAxis, ValSplitter,
};

/// 40 subjects × 2 sessions × 120 trials, 4 labels.
fn synthetic_index() -> Arc<EpochIndex> {
    let (subjects, sessions, trials) = (40, 2, 120);
    let n = subjects * sessions * trials;
    Arc::new(
        EpochIndex::new(
            (0..n).map(|i| i / (sessions * trials)).collect(),
            (0..n).map(|i| (i / trials) % sessions).collect(),
            (0..n).map(|i| i % 4).collect(),
            (0..n).map(|i| i % trials).collect(),
            (0..subjects).map(|s| format!("S{s:02}")).collect(),
            (0..sessions).map(|s| format!("ses-{}", s + 1)).collect(),
            (0..4).map(|l| format!("L{l}")).collect(),
        )
        .unwrap(),
    )
}

fn bench_full_kfold(c: &mut Criterion) {
    let index = synthetic_index();
    let cfg = SplittingConfig {
        train_mode: TrainMode::Full,
        cross_validation: true,
        test_splitters: vec![TestSplitter::new(TestAxis::Subject, SplitUnit::KFold, "5")],
        val_splitters: vec![ValSplitter::new(ValAxis::Trial, SplitUnit::Ratio, "0.2")],
    };
    c.bench_function("generate Full 5-fold [9600 epochs]", |b| {
        b.iter(|| {
            let generator = DatasetGenerator::new(index.clone(), black_box(cfg.clone()));
            black_box(generator.generate().unwrap().into_datasets().len())
        })
    });
}

fn bench_individual(c: &mut Criterion) {
    let index = synthetic_index();
    let cfg = SplittingConfig {
        train_mode: TrainMode::Individual,
        cross_validation: false,
        test_splitters: vec![TestSplitter::new(TestAxis::Session, SplitUnit::Number, "1")],
        val_splitters: vec![ValSplitter::new(ValAxis::Trial, SplitUnit::Ratio, "0.2")],
    };
    c.bench_function("generate Individual [40 subjects]", |b| {
        b.iter(|| {
            let generator = DatasetGenerator::new(index.clone(), black_box(cfg.clone()));
            black_box(generator.generate().unwrap().into_datasets().len())
        })
    });
}

criterion_group!(benches, bench_full_kfold, bench_individual);
criterion_main!(benches);
