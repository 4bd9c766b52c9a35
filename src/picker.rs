//! Balanced group selection.
//!
//! [`StrataPicker::pick`] selects `n` distinct groups (subjects, sessions, or
//! single epochs) out of an available mask while spreading the picks across
//! `(label, subject, session)` strata:
//!
//! ```text
//! n = real_num(...)
//! strata[(label, subject, session)] = (available ∩ stratum, consumed = 0)
//! repeat n times:
//!     s     = first stratum with the smallest `consumed` that still has epochs
//!     i     = last epoch of s
//!     group = every available epoch sharing i's group id
//!     move group from `available` into `selected`
//!     consumed[stratum of e] += 1 for every moved epoch e
//! ```
//!
//! Running out of strata before `n` picks is not an error, the result is
//! simply smaller than requested. Manual id lists skip balancing entirely and
//! go through [`pick_manual`].
use std::collections::{BTreeMap, HashMap};

use crate::epoch::{EpochIndex, Target};
use crate::error::{Result, SplitError};
use crate::mask::Mask;
use crate::splitter::SplitValue;

/// Outcome of one pick step.
#[derive(Debug, Clone)]
pub struct Picked {
    /// Epochs selected by this step.
    pub selected: Mask,
    /// What is left of the input mask after removing `selected`.
    pub available: Mask,
    /// Number of groups that were asked for.
    pub requested: usize,
    /// Number of groups actually selected.
    pub picked: usize,
}

impl Picked {
    /// `true` when fewer groups were found than requested.
    pub fn is_short(&self) -> bool {
        self.picked < self.requested
    }
}

/// Resolve how many groups a unit asks for out of `total` distinct groups.
///
/// * `Number(n)`  → `n`
/// * `Ratio(r)`   → `floor(r · total)`
/// * `KFold(k)`   → `total / k`, plus one for the first `total % k` folds
///
/// # Examples
///
/// ```
/// use exg_split::{picker::resolve_count, SplitValue};
///
/// let folds: Vec<usize> = (0..3)
///     .map(|g| resolve_count(7, &SplitValue::KFold(3), g).unwrap())
///     .collect();
/// assert_eq!(folds, vec![3, 2, 2]);
/// ```
pub fn resolve_count(total: usize, value: &SplitValue, group_index: usize) -> Result<usize> {
    match value {
        SplitValue::Number(n) => Ok(*n),
        SplitValue::Ratio(r) => Ok((r * total as f64).floor() as usize),
        SplitValue::KFold(k) => {
            let k = (*k).max(1);
            let base = total / k;
            let remainder = total % k;
            Ok(if group_index < remainder { base + 1 } else { base })
        }
        SplitValue::Manual(_) => Err(SplitError::ManualUnit),
    }
}

/// Count of groups to pick, measured against `clean` when given and
/// `available` otherwise.
pub fn real_num(
    index: &EpochIndex,
    target: Target,
    value: &SplitValue,
    available: &Mask,
    clean: Option<&Mask>,
    group_index: usize,
) -> Result<usize> {
    let reference = clean.unwrap_or(available);
    let total = index.distinct_count(target, reference);
    resolve_count(total, value, group_index)
}

/// Select exactly the listed ids that are still available, without balancing.
///
/// Subject and session lists name ids; trial lists name trial ordinals.
pub fn pick_manual(index: &EpochIndex, target: Target, mut available: Mask, ids: &[usize]) -> Picked {
    let id_of = |i: usize| match target {
        Target::Subject => index.subject_of(i),
        Target::Session => index.session_of(i),
        Target::Trial => index.trial_of(i),
    };
    let selected = Mask::from_fn(index.len(), |i| available.contains(i) && ids.contains(&id_of(i)));
    available.subtract_with(&selected);

    let mut found: Vec<usize> = selected.iter().map(id_of).collect();
    found.sort_unstable();
    found.dedup();

    Picked { selected, available, requested: ids.len(), picked: found.len() }
}

type StratumKey = (usize, usize, usize);

struct Stratum {
    mask: Mask,
    remaining: usize,
    consumed: usize,
}

/// Counter-balanced picker over one [`EpochIndex`].
pub struct StrataPicker<'a> {
    index: &'a EpochIndex,
}

impl<'a> StrataPicker<'a> {
    pub fn new(index: &'a EpochIndex) -> Self {
        Self { index }
    }

    /// Pick groups along `target` from `available`.
    ///
    /// Takes ownership of `available` for the duration of the step and hands
    /// back what is left in [`Picked::available`]. `value` must not be
    /// `Manual`.
    pub fn pick(
        &self,
        target: Target,
        mut available: Mask,
        clean: Option<&Mask>,
        value: &SplitValue,
        group_index: usize,
    ) -> Result<Picked> {
        let requested = real_num(self.index, target, value, &available, clean, group_index)?;
        let (mut strata, positions) = self.strata(&available);
        let mut selected = Mask::empty(self.index.len());
        let mut picked = 0;

        while picked < requested {
            let Some(pos) = least_consumed(&strata) else {
                break;
            };
            let Some(last) = strata[pos].mask.last() else {
                break;
            };

            let group = self.index.group_mask(target, last, &available);
            for e in group.iter() {
                available.remove(e);
                selected.insert(e);
                let stratum = &mut strata[positions[&self.key(e)]];
                stratum.mask.remove(e);
                stratum.remaining -= 1;
                stratum.consumed += 1;
            }
            picked += 1;
        }

        if picked < requested {
            log::debug!(
                "{target:?} pick exhausted: {picked} of {requested} groups (fold {group_index})"
            );
        }

        Ok(Picked { selected, available, requested, picked })
    }

    #[inline]
    fn key(&self, i: usize) -> StratumKey {
        (self.index.label_of(i), self.index.subject_of(i), self.index.session_of(i))
    }

    /// Strata in label → subject → session order, plus key → position.
    fn strata(&self, available: &Mask) -> (Vec<Stratum>, HashMap<StratumKey, usize>) {
        let mut members: BTreeMap<StratumKey, Vec<usize>> = BTreeMap::new();
        for i in available.iter() {
            members.entry(self.key(i)).or_default().push(i);
        }

        let mut positions = HashMap::with_capacity(members.len());
        let strata = members
            .into_iter()
            .enumerate()
            .map(|(pos, (key, epochs))| {
                positions.insert(key, pos);
                Stratum {
                    remaining: epochs.len(),
                    mask: Mask::from_indices(self.index.len(), epochs),
                    consumed: 0,
                }
            })
            .collect();
        (strata, positions)
    }
}

/// First non-empty stratum with the smallest consumed count.
fn least_consumed(strata: &[Stratum]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (pos, s) in strata.iter().enumerate() {
        if s.remaining == 0 {
            continue;
        }
        match best {
            Some(b) if strata[b].consumed <= s.consumed => {}
            _ => best = Some(pos),
        }
    }
    best
}
