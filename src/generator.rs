//! Dataset generation.
//!
//! [`DatasetGenerator::generate`] turns a [`SplittingConfig`] into an ordered
//! list of [`Dataset`]s:
//!
//! ```text
//! for population in (all epochs | each subject):
//!     fold = FoldState::new()
//!     loop:
//!         dataset = Dataset(population)
//!         test  = run test chain on dataset.remaining      (level k picks from level k-1)
//!         val   = run val chain on what test left
//!         train = everything still remaining
//!         emit dataset
//!         stop unless cross-validating and the fold driver has folds left
//! ```
//!
//! The fold driver is the first level of the first enabled chain. Across
//! folds it only picks from `population − fold.consumed_pool` while sizing
//! each fold against the whole population, so successive folds partition the
//! same reference pool.
//!
//! Generation is synchronous. Run it on a worker with [`DatasetGenerator::spawn`]
//! and use the [`GeneratorHandle`] to poll progress or interrupt it; the
//! interrupt flag is checked at the top of both loops and before every pick.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::config::{SplittingConfig, TrainMode};
use crate::dataset::Dataset;
use crate::epoch::{EpochIndex, Target};
use crate::error::{Result, SplitError};
use crate::mask::Mask;
use crate::picker::{pick_manual, Picked, StrataPicker};
use crate::splitter::{SplitAxis, SplitValue, Splitter};

// ── State ─────────────────────────────────────────────────────────────────

/// Lifecycle of a generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorState {
    Idle,
    Running,
    Completed,
    Interrupted,
    Failed(String),
}

/// How a run that did not fail ended.
#[derive(Debug)]
pub enum Outcome {
    Completed(Vec<Dataset>),
    /// Stopped on request; no datasets are returned.
    Interrupted,
}

impl Outcome {
    /// Datasets of a completed run, empty when interrupted.
    pub fn into_datasets(self) -> Vec<Dataset> {
        match self {
            Outcome::Completed(datasets) => datasets,
            Outcome::Interrupted => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    interrupted: AtomicBool,
    produced: AtomicUsize,
    state: Mutex<GeneratorState>,
}

/// Cross-thread view of a generator: progress, state and interruption.
#[derive(Debug, Clone)]
pub struct GeneratorHandle {
    shared: Arc<Shared>,
}

impl GeneratorHandle {
    /// Ask the run to stop at its next checkpoint. The flag stays set.
    pub fn interrupt(&self) {
        self.shared.interrupted.store(true, Ordering::Relaxed);
    }

    pub fn is_interrupted(&self) -> bool {
        self.shared.interrupted.load(Ordering::Relaxed)
    }

    /// Datasets emitted so far by the current run.
    pub fn produced(&self) -> usize {
        self.shared.produced.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> GeneratorState {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: GeneratorState) {
        *self.shared.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// Pool bookkeeping carried from one cross-validation fold to the next.
#[derive(Debug, Clone)]
pub struct FoldState {
    /// Epochs already picked by the fold driver in earlier folds.
    pub consumed_pool: Mask,
    pub fold_index: usize,
}

impl FoldState {
    fn new(len: usize) -> Self {
        Self { consumed_pool: Mask::empty(len), fold_index: 0 }
    }
}

// ── Chains ────────────────────────────────────────────────────────────────

/// A resolved, enabled splitter.
#[derive(Debug, Clone)]
struct Level {
    target: Target,
    independent: bool,
    value: SplitValue,
}

fn resolve<A: SplitAxis>(chain: &[&Splitter<A>]) -> Result<Vec<Level>> {
    chain
        .iter()
        .filter_map(|s| s.axis.target().map(|target| (s, target)))
        .map(|(s, target)| {
            Ok(Level { target, independent: s.axis.is_independent(), value: s.value()? })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chain {
    Test,
    Val,
}

impl Chain {
    fn name(self) -> &'static str {
        match self {
            Chain::Test => "test",
            Chain::Val => "validation",
        }
    }
}

/// Result of running one chain over a pool.
struct ChainPick {
    selected: Mask,
    excluded: Mask,
}

enum Step {
    Built(Dataset),
    /// The fold driver found nothing left to pick.
    Exhausted,
    Interrupted,
}

// ── Generator ─────────────────────────────────────────────────────────────

pub struct DatasetGenerator {
    epochs: Arc<EpochIndex>,
    config: SplittingConfig,
    handle: GeneratorHandle,
}

impl DatasetGenerator {
    pub fn new(epochs: Arc<EpochIndex>, config: SplittingConfig) -> Self {
        Self {
            epochs,
            config,
            handle: GeneratorHandle {
                shared: Arc::new(Shared {
                    interrupted: AtomicBool::new(false),
                    produced: AtomicUsize::new(0),
                    state: Mutex::new(GeneratorState::Idle),
                }),
            },
        }
    }

    pub fn config(&self) -> &SplittingConfig {
        &self.config
    }

    pub fn handle(&self) -> GeneratorHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> GeneratorState {
        self.handle.state()
    }

    /// Run `generate()` on a dedicated thread.
    pub fn spawn(self) -> (GeneratorHandle, JoinHandle<Result<Outcome>>) {
        let handle = self.handle();
        let worker = thread::spawn(move || self.generate());
        (handle, worker)
    }

    /// Generate every dataset the configuration describes.
    ///
    /// # Errors
    ///
    /// * An enabled splitter is invalid (checked before anything is built).
    /// * The first fold of a population selects nothing for its test set
    ///   (or validation set, when validation drives the folds).
    /// * The run finishes with zero datasets.
    ///
    /// Interruption is not an error: it returns [`Outcome::Interrupted`].
    pub fn generate(&self) -> Result<Outcome> {
        self.handle.shared.produced.store(0, Ordering::Relaxed);
        self.handle.set_state(GeneratorState::Running);

        match self.run() {
            Ok(Some(datasets)) if datasets.is_empty() => {
                let err = SplitError::NoDatasetGenerated;
                log::error!("{err}");
                self.handle.set_state(GeneratorState::Failed(err.to_string()));
                Err(err)
            }
            Ok(Some(datasets)) => {
                log::info!("generated {} datasets", datasets.len());
                self.handle.set_state(GeneratorState::Completed);
                Ok(Outcome::Completed(datasets))
            }
            Ok(None) => {
                log::warn!("dataset generation interrupted");
                self.handle.set_state(GeneratorState::Interrupted);
                Ok(Outcome::Interrupted)
            }
            Err(err) => {
                log::error!("dataset generation failed: {err}");
                self.handle.set_state(GeneratorState::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    /// `Ok(None)` when interrupted.
    fn run(&self) -> Result<Option<Vec<Dataset>>> {
        self.config.validate()?;
        let test = resolve(&self.config.active_test_splitters())?;
        let val = resolve(&self.config.active_val_splitters())?;

        let driver = if !test.is_empty() {
            Some(Chain::Test)
        } else if !val.is_empty() {
            Some(Chain::Val)
        } else {
            None
        };
        let max_folds = driver.and_then(|chain| {
            let first = match chain {
                Chain::Test => &test[0],
                Chain::Val => &val[0],
            };
            match first.value {
                SplitValue::KFold(k) => Some(k),
                _ => None,
            }
        });

        let populations: Vec<(Option<usize>, Mask)> = match self.config.train_mode {
            TrainMode::Full => vec![(None, self.epochs.full_mask())],
            TrainMode::Individual => (0..self.epochs.subjects().len())
                .map(|s| (Some(s), self.epochs.mask_for_subject(s)))
                .collect(),
        };

        log::info!(
            "generating datasets: {} epochs, {:?} mode, {} population(s), cross-validation {}",
            self.epochs.len(),
            self.config.train_mode,
            populations.len(),
            if self.config.cross_validation { "on" } else { "off" },
        );

        let mut datasets = Vec::new();
        for (subject, population) in populations {
            if self.is_interrupted() {
                return Ok(None);
            }
            let mut fold = FoldState::new(self.epochs.len());

            loop {
                if self.is_interrupted() {
                    return Ok(None);
                }
                let name = self.dataset_name(subject, datasets.len(), fold.fold_index);
                let step = self.build(
                    name,
                    datasets.len(),
                    &population,
                    &test,
                    &val,
                    driver,
                    &mut fold,
                )?;
                match step {
                    Step::Built(ds) => {
                        log::debug!("{ds}");
                        datasets.push(ds);
                        self.handle.shared.produced.fetch_add(1, Ordering::Relaxed);
                    }
                    Step::Exhausted => break,
                    Step::Interrupted => return Ok(None),
                }

                if !self.config.cross_validation || driver.is_none() {
                    break;
                }
                fold.fold_index += 1;
                if max_folds.is_some_and(|k| fold.fold_index >= k) {
                    break;
                }
            }
        }
        Ok(Some(datasets))
    }

    fn dataset_name(&self, subject: Option<usize>, sequence_id: usize, fold_index: usize) -> String {
        match subject {
            None => format!("Group {sequence_id}"),
            Some(s) if self.config.cross_validation => {
                format!("Subject {}-{}", self.epochs.subjects()[s], fold_index)
            }
            Some(s) => format!("Subject {}", self.epochs.subjects()[s]),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        name: String,
        sequence_id: usize,
        population: &Mask,
        test: &[Level],
        val: &[Level],
        driver: Option<Chain>,
        fold: &mut FoldState,
    ) -> Result<Step> {
        let mut ds = Dataset::new(self.epochs.clone(), sequence_id, name, population.clone());

        for (chain, levels) in [(Chain::Test, test), (Chain::Val, val)] {
            if levels.is_empty() {
                continue;
            }
            let drives = driver == Some(chain);
            let pool = ds.remaining_mask().clone();
            let Some(pick) = self.run_chain(levels, pool, drives.then_some(&mut *fold))? else {
                return Ok(Step::Interrupted);
            };

            if pick.selected.is_empty() {
                if drives {
                    if fold.fold_index == 0 {
                        return Err(SplitError::EmptySelection {
                            dataset: ds.name().to_string(),
                            chain: chain.name(),
                        });
                    }
                    log::debug!("{}: pool exhausted after {} folds", ds.name(), fold.fold_index);
                    return Ok(Step::Exhausted);
                }
                log::warn!("{}: {} set is empty", ds.name(), chain.name());
            }

            match chain {
                Chain::Test => ds.set_test(&pick.selected),
                Chain::Val => ds.set_val(&pick.selected),
            }
            ds.exclude(&pick.excluded);
        }

        ds.set_remaining_to_train();
        Ok(Step::Built(ds))
    }

    /// Run the levels of one chain over `pool`. `Ok(None)` when interrupted.
    ///
    /// Level `k` picks from the result of level `k − 1`. Only the first level
    /// sees the fold state.
    fn run_chain(
        &self,
        levels: &[Level],
        pool: Mask,
        mut fold: Option<&mut FoldState>,
    ) -> Result<Option<ChainPick>> {
        let picker = StrataPicker::new(&self.epochs);
        let mut current = pool.clone();
        let mut excluded = Mask::empty(self.epochs.len());

        for (k, level) in levels.iter().enumerate() {
            if self.is_interrupted() {
                return Ok(None);
            }

            let (available, clean, group_index) = match fold.as_deref() {
                Some(f) if k == 0 => (current.subtract(&f.consumed_pool), Some(current.clone()), f.fold_index),
                _ => (current.clone(), None, 0),
            };

            let picked: Picked = match &level.value {
                SplitValue::Manual(ids) => pick_manual(&self.epochs, level.target, available, ids),
                value => picker.pick(level.target, available, clean.as_ref(), value, group_index)?,
            };
            if picked.is_short() && picked.picked > 0 {
                log::warn!(
                    "{:?} split asked for {} groups, only {} available",
                    level.target,
                    picked.requested,
                    picked.picked
                );
            }

            if k == 0 {
                if let Some(f) = fold.as_deref_mut() {
                    f.consumed_pool.union_with(&picked.selected);
                }
            }
            if level.independent {
                excluded.union_with(&self.whole_groups(level.target, &picked.selected, &pool));
            }
            current = picked.selected;
        }

        excluded.subtract_with(&current);
        Ok(Some(ChainPick { selected: current, excluded }))
    }

    /// Every epoch of `pool` in a `target` group touched by `selected`.
    fn whole_groups(&self, target: Target, selected: &Mask, pool: &Mask) -> Mask {
        if target == Target::Trial {
            return selected.clone();
        }
        let n_groups = match target {
            Target::Subject => self.epochs.subjects().len(),
            _ => self.epochs.sessions().len(),
        };
        let mut hit = vec![false; n_groups];
        for i in selected.iter() {
            hit[self.epochs.group_of(target, i)] = true;
        }
        Mask::from_fn(self.epochs.len(), |i| pool.contains(i) && hit[self.epochs.group_of(target, i)])
    }

    fn is_interrupted(&self) -> bool {
        self.handle.is_interrupted()
    }
}
