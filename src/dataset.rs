//! One generated train/validation/test partition.
//!
//! A [`Dataset`] starts with every epoch of its population in `remaining`.
//! The generator then moves bits out of `remaining` into `test`, `val`, or
//! `excluded` (independent splits), and finally moves whatever is left into
//! `train`. Bits only ever move out of `remaining`, so at every point
//!
//! ```text
//! remaining = population − train − val − test − excluded
//! ```
//!
//! and the four assigned masks stay pairwise disjoint. Only the generator can
//! move bits; callers may rename a dataset or toggle its selection flag.
use std::fmt;
use std::sync::Arc;

use crate::epoch::EpochIndex;
use crate::mask::Mask;

/// Per-split epoch counts of a [`Dataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitSummary {
    pub train: usize,
    pub val: usize,
    pub test: usize,
    pub excluded: usize,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    epochs: Arc<EpochIndex>,
    name: String,
    sequence_id: usize,
    selected: bool,
    population: Mask,
    train: Mask,
    val: Mask,
    test: Mask,
    excluded: Mask,
    remaining: Mask,
}

impl Dataset {
    /// Fresh dataset whose whole `population` is still unassigned.
    pub(crate) fn new(epochs: Arc<EpochIndex>, sequence_id: usize, name: String, population: Mask) -> Self {
        let n = epochs.len();
        Self {
            epochs,
            name,
            sequence_id,
            selected: true,
            remaining: population.clone(),
            population,
            train: Mask::empty(n),
            val: Mask::empty(n),
            test: Mask::empty(n),
            excluded: Mask::empty(n),
        }
    }

    /// Move `mask ∩ remaining` into the test set.
    pub(crate) fn set_test(&mut self, mask: &Mask) {
        let moved = self.remaining.intersect(mask);
        self.remaining.subtract_with(&moved);
        self.test.union_with(&moved);
    }

    /// Move `mask ∩ remaining` into the validation set.
    pub(crate) fn set_val(&mut self, mask: &Mask) {
        let moved = self.remaining.intersect(mask);
        self.remaining.subtract_with(&moved);
        self.val.union_with(&moved);
    }

    /// Drop `mask ∩ remaining` from every split.
    pub(crate) fn exclude(&mut self, mask: &Mask) {
        let moved = self.remaining.intersect(mask);
        self.remaining.subtract_with(&moved);
        self.excluded.union_with(&moved);
    }

    /// Everything still unassigned becomes training data.
    pub(crate) fn set_remaining_to_train(&mut self) {
        let rest = std::mem::replace(&mut self.remaining, Mask::empty(self.epochs.len()));
        self.train.union_with(&rest);
    }

    pub fn epoch_index(&self) -> &Arc<EpochIndex> {
        &self.epochs
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Position of this dataset in its generator run.
    pub fn sequence_id(&self) -> usize {
        self.sequence_id
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Epochs this dataset was drawn from (all epochs, or one subject's).
    pub fn population_mask(&self) -> &Mask {
        &self.population
    }

    pub fn train_mask(&self) -> &Mask {
        &self.train
    }

    pub fn val_mask(&self) -> &Mask {
        &self.val
    }

    pub fn test_mask(&self) -> &Mask {
        &self.test
    }

    /// Epochs dropped by independent test splits.
    pub fn excluded_mask(&self) -> &Mask {
        &self.excluded
    }

    pub fn remaining_mask(&self) -> &Mask {
        &self.remaining
    }

    pub fn summary(&self) -> SplitSummary {
        SplitSummary {
            train: self.train.count(),
            val: self.val.count(),
            test: self.test.count(),
            excluded: self.excluded.count(),
        }
    }

    /// Distinct subject names present in `mask`, in id order.
    pub fn subject_names_in(&self, mask: &Mask) -> Vec<&str> {
        let mut seen = vec![false; self.epochs.subjects().len()];
        for i in mask.iter() {
            seen[self.epochs.subject_of(i)] = true;
        }
        seen.iter()
            .zip(self.epochs.subjects())
            .filter_map(|(&s, name)| s.then_some(name.as_str()))
            .collect()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary();
        write!(
            f,
            "{} [#{}] train={} val={} test={}",
            self.name, self.sequence_id, s.train, s.val, s.test
        )?;
        if s.excluded > 0 {
            write!(f, " excluded={}", s.excluded)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(n: usize) -> Arc<EpochIndex> {
        Arc::new(
            EpochIndex::new(
                (0..n).map(|i| i % 2).collect(),
                vec![0; n],
                vec![0; n],
                (0..n).collect(),
                vec!["a".into(), "b".into()],
                vec!["x".into()],
                vec!["l".into()],
            )
            .unwrap(),
        )
    }

    #[test]
    fn masks_stay_disjoint() {
        let idx = index(10);
        let mut ds = Dataset::new(idx.clone(), 0, "Group 0".into(), idx.full_mask());

        ds.set_test(&Mask::from_indices(10, [0, 1, 2]));
        // Overlapping request: epoch 2 is already test.
        ds.set_val(&Mask::from_indices(10, [2, 3, 4]));
        ds.exclude(&Mask::from_indices(10, [4, 5]));
        ds.set_remaining_to_train();

        assert_eq!(ds.test_mask().iter().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(ds.val_mask().iter().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(ds.excluded_mask().iter().collect::<Vec<_>>(), vec![5]);
        assert_eq!(ds.train_mask().iter().collect::<Vec<_>>(), vec![6, 7, 8, 9]);
        assert!(ds.remaining_mask().is_empty());
        assert!(ds.train_mask().is_disjoint(ds.test_mask()));
        assert!(ds.val_mask().is_disjoint(ds.test_mask()));
        assert_eq!(
            ds.summary(),
            SplitSummary { train: 4, val: 2, test: 3, excluded: 1 }
        );
    }

    #[test]
    fn restricted_population() {
        let idx = index(6);
        let mut ds = Dataset::new(idx.clone(), 3, "Subject a".into(), idx.mask_for_subject(0));
        ds.set_test(&idx.full_mask());
        assert_eq!(ds.test_mask().count(), 3);
        assert_eq!(ds.subject_names_in(ds.test_mask()), vec!["a"]);
    }

    #[test]
    fn caller_bookkeeping() {
        let idx = index(2);
        let mut ds = Dataset::new(idx.clone(), 1, "Group 1".into(), idx.full_mask());
        ds.set_name("fold A");
        ds.set_selected(false);
        assert_eq!(ds.name(), "fold A");
        assert!(!ds.is_selected());
        assert_eq!(ds.sequence_id(), 1);
        assert_eq!(ds.to_string(), "fold A [#1] train=0 val=0 test=0");
    }
}
