/// Shared fixture builders for the integration tests.
use exg_split::{Dataset, EpochIndex, Mask};
use std::sync::Arc;

/// `subjects × sessions × trials` epochs, labels alternating per trial.
///
/// Epoch `i = (subject · sessions + session) · trials + trial`.
#[allow(unused)]
pub fn grid_index(subjects: usize, sessions: usize, trials: usize, labels: usize) -> Arc<EpochIndex> {
    let mut subject = vec![];
    let mut session = vec![];
    let mut label = vec![];
    let mut trial = vec![];
    for s in 0..subjects {
        for ses in 0..sessions {
            for t in 0..trials {
                subject.push(s);
                session.push(ses);
                label.push(t % labels);
                trial.push(t);
            }
        }
    }
    Arc::new(
        EpochIndex::new(
            subject,
            session,
            label,
            trial,
            (0..subjects).map(|s| format!("S{s:02}")).collect(),
            (0..sessions).map(|s| format!("ses-{}", s + 1)).collect(),
            (0..labels).map(|l| format!("L{l}")).collect(),
        )
        .expect("grid index is dense"),
    )
}

#[allow(unused)]
/// Panics unless train/val/test/excluded are pairwise disjoint and cover the population.
pub fn assert_partition(ds: &Dataset) {
    let parts = [
        ("train", ds.train_mask()),
        ("val", ds.val_mask()),
        ("test", ds.test_mask()),
        ("excluded", ds.excluded_mask()),
    ];
    for (i, (a_name, a)) in parts.iter().enumerate() {
        for (b_name, b) in parts.iter().skip(i + 1) {
            assert!(a.is_disjoint(b), "{}: {a_name} overlaps {b_name}", ds.name());
        }
    }
    let union = parts
        .iter()
        .fold(Mask::empty(ds.population_mask().len()), |acc, (_, m)| acc.union(m));
    assert_eq!(&union, ds.population_mask(), "{}: partition does not cover population", ds.name());
    assert!(ds.remaining_mask().is_empty());
}

#[allow(unused)]
/// Distinct subject ids in `mask`.
pub fn subjects_in(index: &EpochIndex, mask: &Mask) -> Vec<usize> {
    let mut ids: Vec<usize> = mask.iter().map(|i| index.subject_of(i)).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[allow(unused)]
/// Distinct session ids in `mask`.
pub fn sessions_in(index: &EpochIndex, mask: &Mask) -> Vec<usize> {
    let mut ids: Vec<usize> = mask.iter().map(|i| index.session_of(i)).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
