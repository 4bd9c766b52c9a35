mod common;
use common::{grid_index, subjects_in};
use exg_split::{pick_manual, real_num, EpochIndex, Mask, SplitValue, StrataPicker, Target};

/// One recording whose label `l` has `sizes[l]` trials.
fn uneven_labels(sizes: &[usize]) -> EpochIndex {
    let label: Vec<usize> = sizes.iter().enumerate().flat_map(|(l, &n)| vec![l; n]).collect();
    let n = label.len();
    EpochIndex::new(
        vec![0; n],
        vec![0; n],
        label,
        (0..n).collect(),
        vec!["S01".into()],
        vec!["ses-1".into()],
        (0..sizes.len()).map(|l| format!("L{l}")).collect(),
    )
    .unwrap()
}

fn per_label(index: &EpochIndex, mask: &Mask) -> Vec<usize> {
    let mut counts = vec![0; index.labels().len()];
    for i in mask.iter() {
        counts[index.label_of(i)] += 1;
    }
    counts
}

#[test]
fn trial_picks_stay_balanced_while_every_label_has_trials() {
    let index = uneven_labels(&[2, 5, 9]);
    let picker = StrataPicker::new(&index);

    for n in 1..=6 {
        let picked = picker
            .pick(Target::Trial, index.full_mask(), None, &SplitValue::Number(n), 0)
            .unwrap();
        let counts = per_label(&index, &picked.selected);
        let max = counts.iter().max().copied().unwrap_or(0);
        let min = counts.iter().min().copied().unwrap_or(0);
        assert!(max - min <= 1, "n={n}: {counts:?}");
        assert_eq!(picked.selected.count(), n);
    }
}

#[test]
fn exhausted_label_drops_out_of_rotation() {
    let index = uneven_labels(&[2, 5, 9]);
    let picked = StrataPicker::new(&index)
        .pick(Target::Trial, index.full_mask(), None, &SplitValue::Number(9), 0)
        .unwrap();
    assert_eq!(per_label(&index, &picked.selected), vec![2, 4, 3]);
    assert_eq!(picked.available.count(), 7);
    assert!(picked.available.is_disjoint(&picked.selected));
}

#[test]
fn subject_picks_move_whole_subjects() {
    let index = grid_index(4, 2, 3, 2);
    let picked = StrataPicker::new(&index)
        .pick(Target::Subject, index.full_mask(), None, &SplitValue::Ratio(0.5), 0)
        .unwrap();
    assert_eq!(picked.picked, 2);
    assert_eq!(subjects_in(&index, &picked.selected), vec![0, 1]);
    assert_eq!(picked.selected.count(), 12);
    assert_eq!(subjects_in(&index, &picked.available), vec![2, 3]);
}

#[test]
fn kfold_sizes_folds_against_clean_pool() {
    let index = grid_index(7, 1, 2, 2);
    let all = index.full_mask();
    // Fold 1 after subjects 0..3 went to fold 0.
    let available = all.subtract(&Mask::from_fn(index.len(), |i| index.subject_of(i) < 3));

    let value = SplitValue::KFold(3);
    assert_eq!(real_num(&index, Target::Subject, &value, &available, Some(&all), 1).unwrap(), 2);
    assert_eq!(real_num(&index, Target::Subject, &value, &available, None, 1).unwrap(), 1);
}

#[test]
fn manual_session_pick_ignores_unknown_ids() {
    let index = grid_index(2, 3, 2, 2);
    let picked = pick_manual(&index, Target::Session, index.full_mask(), &[2, 9]);
    assert_eq!(picked.requested, 2);
    assert_eq!(picked.picked, 1);
    assert!(picked.is_short());
    assert!(picked.selected.iter().all(|i| index.session_of(i) == 2));
    assert_eq!(picked.selected.count(), 4);
}

/// Four subjects with different session counts, trial counts and label mixes.
fn uneven_recordings() -> EpochIndex {
    let (mut subject, mut session, mut label, mut trial) = (vec![], vec![], vec![], vec![]);
    for s in 0..4 {
        for ses in 0..=(s % 2) {
            for t in 0..(2 + s) {
                subject.push(s);
                session.push(ses);
                label.push(t % (1 + s % 3));
                trial.push(t);
            }
        }
    }
    EpochIndex::new(
        subject,
        session,
        label,
        trial,
        (0..4).map(|s| format!("S{s:02}")).collect(),
        vec!["ses-1".into(), "ses-2".into()],
        vec!["L0".into(), "L1".into(), "L2".into()],
    )
    .unwrap()
}

#[test]
fn id_picks_never_leave_a_stratum_half_used() {
    let index = uneven_recordings();
    let full = index.full_mask();
    let groups = |target: Target| -> Vec<Mask> {
        match target {
            Target::Subject => (0..index.subjects().len()).map(|s| index.mask_for_subject(s)).collect(),
            _ => (0..index.sessions().len()).map(|s| index.mask_for_session(s)).collect(),
        }
    };

    for target in [Target::Subject, Target::Session] {
        let mut previous = Mask::empty(index.len());
        for n in 1..=groups(target).len() {
            let picked = StrataPicker::new(&index)
                .pick(target, full.clone(), None, &SplitValue::Number(n), 0)
                .unwrap();
            assert_eq!(picked.picked, n);
            // Every group is either taken whole or left whole, so each
            // stratum still available has consumed nothing.
            for group in groups(target) {
                let taken = group.intersect(&picked.selected);
                assert!(taken.is_empty() || taken == group, "{target:?} n={n}");
            }
            assert_eq!(picked.selected.union(&picked.available), full);
            // Growing the request only adds groups.
            assert_eq!(previous.subtract(&picked.selected), Mask::empty(index.len()));
            previous = picked.selected;
        }
    }
}

#[test]
fn subject_picks_follow_stratum_order() {
    let index = uneven_recordings();
    let picked = StrataPicker::new(&index)
        .pick(Target::Subject, index.full_mask(), None, &SplitValue::Number(2), 0)
        .unwrap();
    // Every subject has label 0; ties on consumed go to the lowest key.
    assert_eq!(subjects_in(&index, &picked.selected), vec![0, 1]);
}
