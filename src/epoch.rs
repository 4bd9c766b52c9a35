//! Per-epoch attribute index.
//!
//! [`EpochIndex`] is the flat, immutable table every split is computed over:
//! for each epoch `i` it stores the subject, session, label and trial ordinal,
//! plus id → name tables for subjects, sessions and labels. It is built once
//! (usually by merging per-recording [`EpochBatch`]es) and then shared
//! read-only, typically behind an `Arc`, by every generator run.
//!
//! ```text
//! batch A (sub-01 / ses-1)   events [L, R, L]   event_id {L: 1, R: 2}
//! batch B (sub-02 / ses-1)   events [R, R]      event_id {R: 7}
//!        │
//!        └─→ subject [0, 0, 0, 1, 1]
//!            session [0, 0, 0, 0, 0]
//!            label   [0, 1, 0, 1, 1]     (R shares id 1 across recordings)
//!            trial   [0, 1, 2, 0, 1]
//! ```
use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, SplitError};
use crate::mask::Mask;

/// The dimension a split is performed along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Subject,
    Session,
    /// Individual epochs.
    Trial,
}

/// Epochs cut from one recording, as handed over by a loader.
#[derive(Debug, Clone)]
pub struct EpochBatch {
    /// Subject display name.
    pub subject: String,
    /// Session display name.
    pub session: String,
    /// Event name → event code, as declared by this recording.
    pub event_id: BTreeMap<String, i64>,
    /// Event code of each epoch, in recording order.
    pub events: Vec<i64>,
}

/// Immutable per-epoch attributes over which every mask is defined.
#[derive(Debug, Clone)]
pub struct EpochIndex {
    subject: Vec<usize>,
    session: Vec<usize>,
    label: Vec<usize>,
    trial: Vec<usize>,
    subject_names: Vec<String>,
    session_names: Vec<String>,
    label_names: Vec<String>,
}

impl EpochIndex {
    /// Build an index from raw attribute arrays.
    ///
    /// All four arrays must have the same length and every id array must be
    /// dense over its name table: ids lie in `0..names.len()` and every id
    /// is used at least once.
    pub fn new(
        subject: Vec<usize>,
        session: Vec<usize>,
        label: Vec<usize>,
        trial: Vec<usize>,
        subject_names: Vec<String>,
        session_names: Vec<String>,
        label_names: Vec<String>,
    ) -> Result<Self> {
        let n = subject.len();
        for (field, got) in [
            ("session", session.len()),
            ("label", label.len()),
            ("trial", trial.len()),
        ] {
            if got != n {
                return Err(SplitError::LengthMismatch { field, expected: n, got });
            }
        }
        check_dense("subject", &subject, subject_names.len())?;
        check_dense("session", &session, session_names.len())?;
        check_dense("label", &label, label_names.len())?;

        Ok(Self {
            subject,
            session,
            label,
            trial,
            subject_names,
            session_names,
            label_names,
        })
    }

    /// Merge per-recording batches into one index.
    ///
    /// Subjects and sessions get ids in order of first appearance of their
    /// names. Labels are renumbered by event *name*, so two recordings that
    /// use different codes for the same event end up sharing one label id.
    /// The trial ordinal is the epoch's position inside its batch.
    pub fn from_batches(batches: &[EpochBatch]) -> Result<Self> {
        let mut subject_ids = NameTable::default();
        let mut session_ids = NameTable::default();
        let mut label_ids = NameTable::default();

        let n: usize = batches.iter().map(|b| b.events.len()).sum();
        let mut subject = Vec::with_capacity(n);
        let mut session = Vec::with_capacity(n);
        let mut label = Vec::with_capacity(n);
        let mut trial = Vec::with_capacity(n);

        for batch in batches {
            if batch.events.is_empty() {
                continue;
            }
            let sub = subject_ids.id(&batch.subject);
            let ses = session_ids.id(&batch.session);

            // Register used names in code order so renumbering is stable and
            // declared-but-unused events never get an id.
            let mut declared: Vec<(&String, &i64)> = batch
                .event_id
                .iter()
                .filter(|(_, code)| batch.events.contains(code))
                .collect();
            declared.sort_by_key(|(name, code)| (**code, (*name).clone()));
            let mut code_to_label: HashMap<i64, (&String, usize)> = HashMap::with_capacity(declared.len());
            for (name, &code) in declared {
                if let Some((first, _)) = code_to_label.get(&code) {
                    return Err(SplitError::AmbiguousEvent {
                        subject: batch.subject.clone(),
                        session: batch.session.clone(),
                        code,
                        first: (*first).clone(),
                        second: name.clone(),
                    });
                }
                code_to_label.insert(code, (name, label_ids.id(name)));
            }

            for (t, code) in batch.events.iter().enumerate() {
                let (_, lbl) = *code_to_label.get(code).ok_or_else(|| SplitError::UnknownEvent {
                    subject: batch.subject.clone(),
                    session: batch.session.clone(),
                    code: *code,
                })?;
                subject.push(sub);
                session.push(ses);
                label.push(lbl);
                trial.push(t);
            }
        }

        log::debug!(
            "merged {} batches into {} epochs ({} subjects, {} sessions, {} labels)",
            batches.len(),
            subject.len(),
            subject_ids.names.len(),
            session_ids.names.len(),
            label_ids.names.len(),
        );

        Self::new(
            subject,
            session,
            label,
            trial,
            subject_ids.names,
            session_ids.names,
            label_ids.names,
        )
    }

    /// Total number of epochs.
    #[inline]
    pub fn len(&self) -> usize {
        self.subject.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subject.is_empty()
    }

    /// Subject display names, indexed by subject id.
    pub fn subjects(&self) -> &[String] {
        &self.subject_names
    }

    /// Session display names, indexed by session id.
    pub fn sessions(&self) -> &[String] {
        &self.session_names
    }

    /// Label display names, indexed by label id.
    pub fn labels(&self) -> &[String] {
        &self.label_names
    }

    #[inline]
    pub fn subject_of(&self, i: usize) -> usize {
        self.subject[i]
    }

    #[inline]
    pub fn session_of(&self, i: usize) -> usize {
        self.session[i]
    }

    #[inline]
    pub fn label_of(&self, i: usize) -> usize {
        self.label[i]
    }

    #[inline]
    pub fn trial_of(&self, i: usize) -> usize {
        self.trial[i]
    }

    pub fn full_mask(&self) -> Mask {
        Mask::full(self.len())
    }

    pub fn mask_for_subject(&self, id: usize) -> Mask {
        Mask::from_fn(self.len(), |i| self.subject[i] == id)
    }

    pub fn mask_for_session(&self, id: usize) -> Mask {
        Mask::from_fn(self.len(), |i| self.session[i] == id)
    }

    pub fn mask_for_label(&self, id: usize) -> Mask {
        Mask::from_fn(self.len(), |i| self.label[i] == id)
    }

    /// Id of the group epoch `i` belongs to along `target`.
    ///
    /// For [`Target::Trial`] every epoch is its own group, so this is `i`.
    #[inline]
    pub fn group_of(&self, target: Target, i: usize) -> usize {
        match target {
            Target::Subject => self.subject[i],
            Target::Session => self.session[i],
            Target::Trial => i,
        }
    }

    /// Epochs of `within` that belong to the same `target` group as epoch `i`.
    pub fn group_mask(&self, target: Target, i: usize, within: &Mask) -> Mask {
        match target {
            Target::Trial => Mask::from_indices(self.len(), [i]).intersect(within),
            _ => {
                let g = self.group_of(target, i);
                Mask::from_fn(self.len(), |j| within.contains(j) && self.group_of(target, j) == g)
            }
        }
    }

    /// Number of distinct `target` groups with at least one epoch in `mask`.
    pub fn distinct_count(&self, target: Target, mask: &Mask) -> usize {
        let n_ids = match target {
            Target::Subject => self.subject_names.len(),
            Target::Session => self.session_names.len(),
            Target::Trial => return mask.count(),
        };
        let mut seen = vec![false; n_ids];
        for i in mask.iter() {
            seen[self.group_of(target, i)] = true;
        }
        seen.into_iter().filter(|&s| s).count()
    }
}

fn check_dense(field: &'static str, ids: &[usize], n_names: usize) -> Result<()> {
    let mut used = vec![false; n_names];
    for &id in ids {
        if id >= n_names {
            return Err(SplitError::SparseIds {
                field,
                detail: format!("id {id} but only {n_names} names"),
            });
        }
        used[id] = true;
    }
    if let Some(gap) = used.iter().position(|&u| !u) {
        return Err(SplitError::SparseIds {
            field,
            detail: format!("id {gap} is never used"),
        });
    }
    Ok(())
}

/// First-appearance name → dense id assignment.
#[derive(Default)]
struct NameTable {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

impl NameTable {
    fn id(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }
}
