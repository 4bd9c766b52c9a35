//! # exg-split — leak-free dataset splitting for EEG epochs
//!
//! `exg-split` partitions a collection of labeled epochs into disjoint
//! train / validation / test sets. Splits are declared, not coded: a
//! [`SplittingConfig`] lists test and validation splitters, each choosing
//! groups along an axis (subject, session or trial) with a unit (ratio,
//! number, k-fold or a manual id list). The generator evaluates the
//! configuration once per population (all epochs, or each subject) and once
//! per cross-validation fold.
//!
//! ## Pipeline overview
//!
//! ```text
//! per-recording epoch batches (loader output)
//!   │
//!   ├─ EpochIndex::from_batches()   subject / session / label / trial arrays
//!   │
//!   ├─ DatasetGenerator::generate()
//!   │     for each population × fold:
//!   │        test chain   StrataPicker, level k picks from level k-1
//!   │        val chain    on what the test chain left
//!   │        train        everything still remaining
//!   │
//!   └─→ Vec<Dataset>   train_mask / val_mask / test_mask over the same index
//! ```
//!
//! Every subset is a [`Mask`] over the shared [`EpochIndex`]; epochs are never
//! copied. Picks are balanced across `(label, subject, session)` strata so no
//! single stratum fills a quota on its own.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use exg_split::{
//!     DatasetGenerator, EpochIndex, Outcome, SplitUnit, SplittingConfig,
//!     TestAxis, TestSplitter, TrainMode,
//! };
//!
//! // 2 subjects × 2 sessions × 2 trials.
//! let n = 8;
//! let index = EpochIndex::new(
//!     (0..n).map(|i| i / 4).collect(),
//!     (0..n).map(|i| (i / 2) % 2).collect(),
//!     (0..n).map(|i| i % 2).collect(),
//!     (0..n).map(|i| i % 2).collect(),
//!     vec!["s1".into(), "s2".into()],
//!     vec!["ses-1".into(), "ses-2".into()],
//!     vec!["left".into(), "right".into()],
//! ).unwrap();
//!
//! let cfg = SplittingConfig {
//!     train_mode: TrainMode::Individual,
//!     test_splitters: vec![TestSplitter::new(TestAxis::Session, SplitUnit::Number, "1")],
//!     val_splitters: vec![],
//!     ..SplittingConfig::default()
//! };
//!
//! let generator = DatasetGenerator::new(Arc::new(index), cfg);
//! let datasets = match generator.generate().unwrap() {
//!     Outcome::Completed(d) => d,
//!     Outcome::Interrupted => unreachable!(),
//! };
//! assert_eq!(datasets.len(), 2);
//! assert_eq!(datasets[0].test_mask().count(), 2);
//! assert_eq!(datasets[0].train_mask().count(), 2);
//! ```
//!
//! ## Running in the background
//!
//! Generation is synchronous. [`DatasetGenerator::spawn`] moves it onto a
//! worker thread and returns a [`GeneratorHandle`] that can poll
//! [`GeneratorHandle::produced`] or [`GeneratorHandle::interrupt`] the run.

pub mod config;
pub mod dataset;
pub mod epoch;
pub mod error;
pub mod generator;
pub mod io;
pub mod mask;
pub mod picker;
pub mod splitter;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{SplittingConfig, TrainMode};

// dataset
pub use dataset::{Dataset, SplitSummary};

// epoch
pub use epoch::{EpochBatch, EpochIndex, Target};

// error
pub use error::{Result, SplitError};

// generator
pub use generator::{DatasetGenerator, FoldState, GeneratorHandle, GeneratorState, Outcome};

// io — safetensors helpers
pub use io::{read_epoch_index, write_datasets, write_epoch_index, StWriter};

// mask
pub use mask::Mask;

// picker
pub use picker::{pick_manual, real_num, Picked, StrataPicker};

// splitter
pub use splitter::{
    SplitAxis, SplitUnit, SplitValue, Splitter, TestAxis, TestSplitter, ValAxis, ValSplitter,
};
