//! Boolean selection masks over the shared epoch index space.
//!
//! A [`Mask`] is the only way a subset of epochs is represented: datasets,
//! strata and pick results are all masks of the same length as the
//! [`EpochIndex`](crate::EpochIndex) they were built from. Epochs are never
//! copied or re-indexed.
//!
//! The set operations (`intersect`, `subtract`, `union`) return new masks.
//! The `*_with` variants and `insert`/`remove` mutate in place and are used
//! only by code that owns the mask exclusively for the duration of a pick.
use ndarray::{Array1, ArrayView1, Zip};
use std::ops::{BitAnd, BitOr, Sub};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    bits: Array1<bool>,
}

impl Mask {
    /// Mask of length `len` with nothing selected.
    pub fn empty(len: usize) -> Self {
        Self { bits: Array1::from_elem(len, false) }
    }

    /// Mask of length `len` with every epoch selected.
    pub fn full(len: usize) -> Self {
        Self { bits: Array1::from_elem(len, true) }
    }

    pub fn from_fn(len: usize, f: impl FnMut(usize) -> bool) -> Self {
        Self { bits: Array1::from_shape_fn(len, f) }
    }

    /// Mask of length `len` selecting `indices`. Out-of-range indices are ignored.
    pub fn from_indices(len: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut mask = Self::empty(len);
        for i in indices {
            if i < len {
                mask.bits[i] = true;
            }
        }
        mask
    }

    /// Length of the index space (not the number of selected epochs).
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Number of selected epochs.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// `true` when no epoch is selected.
    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }

    #[inline]
    pub fn contains(&self, i: usize) -> bool {
        self.bits.get(i).copied().unwrap_or(false)
    }

    #[inline]
    pub fn insert(&mut self, i: usize) {
        self.bits[i] = true;
    }

    #[inline]
    pub fn remove(&mut self, i: usize) {
        self.bits[i] = false;
    }

    pub fn intersect(&self, other: &Mask) -> Mask {
        let mut out = self.clone();
        out.intersect_with(other);
        out
    }

    pub fn subtract(&self, other: &Mask) -> Mask {
        let mut out = self.clone();
        out.subtract_with(other);
        out
    }

    pub fn union(&self, other: &Mask) -> Mask {
        let mut out = self.clone();
        out.union_with(other);
        out
    }

    pub fn intersect_with(&mut self, other: &Mask) {
        self.check_len(other);
        Zip::from(&mut self.bits).and(&other.bits).for_each(|a, &b| *a &= b);
    }

    pub fn subtract_with(&mut self, other: &Mask) {
        self.check_len(other);
        Zip::from(&mut self.bits).and(&other.bits).for_each(|a, &b| *a &= !b);
    }

    pub fn union_with(&mut self, other: &Mask) {
        self.check_len(other);
        Zip::from(&mut self.bits).and(&other.bits).for_each(|a, &b| *a |= b);
    }

    /// `true` when the two masks share no selected epoch.
    pub fn is_disjoint(&self, other: &Mask) -> bool {
        self.check_len(other);
        !self.bits.iter().zip(other.bits.iter()).any(|(&a, &b)| a && b)
    }

    /// Selected indices in ascending order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| if b { Some(i) } else { None })
    }

    /// Highest selected index.
    pub fn last(&self) -> Option<usize> {
        self.iter().next_back()
    }

    /// Read-only view for indexing epoch tensors downstream.
    pub fn as_array(&self) -> ArrayView1<'_, bool> {
        self.bits.view()
    }

    /// Selection as bytes (`1` = selected), the layout written by [`crate::io`].
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits.iter().map(|&b| b as u8).collect()
    }

    fn check_len(&self, other: &Mask) {
        assert_eq!(
            self.len(),
            other.len(),
            "masks over different epoch collections"
        );
    }
}

impl BitAnd for &Mask {
    type Output = Mask;
    fn bitand(self, rhs: &Mask) -> Mask {
        self.intersect(rhs)
    }
}

impl BitOr for &Mask {
    type Output = Mask;
    fn bitor(self, rhs: &Mask) -> Mask {
        self.union(rhs)
    }
}

impl Sub for &Mask {
    type Output = Mask;
    fn sub(self, rhs: &Mask) -> Mask {
        self.subtract(rhs)
    }
}
