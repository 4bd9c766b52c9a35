//! Splitting configuration.
//!
//! [`SplittingConfig`] holds everything the generator needs besides the
//! epochs themselves: the training mode, whether to cross-validate, and the
//! ordered test and validation splitter chains. All fields have defaults that
//! match a typical cross-subject setup.
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SplitError};
use crate::splitter::{SplitAxis, SplitUnit, Splitter, TestAxis, TestSplitter, ValAxis, ValSplitter};

/// Population a dataset is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainMode {
    /// One population made of every epoch.
    Full,
    /// One population per subject.
    Individual,
}

/// Configuration for one generator run.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use exg_split::{SplittingConfig, TrainMode, TestSplitter, TestAxis, SplitUnit};
///
/// let cfg = SplittingConfig {
///     train_mode: TrainMode::Individual,
///     test_splitters: vec![TestSplitter::new(TestAxis::Session, SplitUnit::Number, "1")],
///     val_splitters: vec![],
///     ..SplittingConfig::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
///
/// Fields missing from a JSON config take their value from
/// [`SplittingConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplittingConfig {
    /// Whole population at once, or one dataset family per subject.
    ///
    /// Default: [`TrainMode::Full`].
    pub train_mode: TrainMode,

    /// Emit one dataset per fold instead of a single dataset.
    ///
    /// Folds are driven by the first enabled test splitter (or the first
    /// enabled validation splitter when the test chain is disabled). With a
    /// `KFold` driver exactly `k` folds are attempted; with any other unit
    /// folds continue until the pool runs dry.
    ///
    /// Default: `false`.
    pub cross_validation: bool,

    /// Test chain, evaluated in order. Each level picks from the result of
    /// the level before it.
    ///
    /// Default: one `Subject / Ratio / 0.2` splitter.
    pub test_splitters: Vec<TestSplitter>,

    /// Validation chain, evaluated in order on what the test chain left.
    ///
    /// Default: one `Subject / Ratio / 0.2` splitter.
    pub val_splitters: Vec<ValSplitter>,
}

impl Default for SplittingConfig {
    /// Cross-subject: 20 % of subjects for test, 20 % of the rest for validation.
    fn default() -> Self {
        Self {
            train_mode: TrainMode::Full,
            cross_validation: false,
            test_splitters: vec![Splitter::new(TestAxis::Subject, SplitUnit::Ratio, "0.2")],
            val_splitters: vec![Splitter::new(ValAxis::Subject, SplitUnit::Ratio, "0.2")],
        }
    }
}

impl SplittingConfig {
    /// Check every splitter that will be evaluated.
    ///
    /// Chains stop at the first disabled row, so rows after it are ignored.
    /// Placeholder rows are skipped.
    pub fn validate(&self) -> Result<()> {
        check_chain(&self.test_splitters)?;
        check_chain(&self.val_splitters)
    }

    /// Enabled test splitters, in evaluation order.
    pub fn active_test_splitters(&self) -> Vec<&TestSplitter> {
        active(&self.test_splitters)
    }

    /// Enabled validation splitters, in evaluation order.
    pub fn active_val_splitters(&self) -> Vec<&ValSplitter> {
        active(&self.val_splitters)
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("failed to parse splitting config")
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialise splitting config")
    }
}

fn active<A: SplitAxis>(chain: &[Splitter<A>]) -> Vec<&Splitter<A>> {
    chain
        .iter()
        .filter(|s| s.is_option())
        .take_while(|s| s.axis.target().is_some())
        .collect()
}

fn check_chain<A: SplitAxis>(chain: &[Splitter<A>]) -> Result<()> {
    for (position, splitter) in chain.iter().enumerate() {
        if !splitter.is_option() {
            continue;
        }
        if splitter.axis.target().is_none() {
            break;
        }
        if let Err(SplitError::InvalidSplitterState { unit, raw }) = splitter.value() {
            return Err(SplitError::InvalidSplitter { chain: A::CHAIN, position, unit, raw });
        }
    }
    Ok(())
}
