//! One splitting rule: an axis, a selection unit and a user-entered value.
//!
//! Test and validation chains use different axis enums ([`TestAxis`] has
//! "independent" variants, [`ValAxis`] does not), so an independent
//! validation split cannot be expressed. Both share the unit/value handling
//! through [`Splitter<A>`] and the [`SplitAxis`] trait.
//!
//! | unit | valid raw value |
//! |---|---|
//! | `Ratio`  | float in `[0, 1]` |
//! | `Number` | non-negative integer literal |
//! | `KFold`  | positive integer literal |
//! | `Manual` | whitespace-separated non-negative integer literals (at least one) |
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::epoch::Target;
use crate::error::{Result, SplitError};

// ── Unit ──────────────────────────────────────────────────────────────────

/// How many groups a splitter selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitUnit {
    /// Fraction of the distinct groups available.
    Ratio,
    /// Absolute number of groups.
    Number,
    /// `1/k` of the groups, remainder spread over the first folds.
    KFold,
    /// Explicit list of ids.
    Manual,
}

impl SplitUnit {
    /// Parse `raw` under this unit. `None` when the value is not valid.
    pub fn parse(self, raw: &str) -> Option<SplitValue> {
        let raw = raw.trim();
        match self {
            SplitUnit::Ratio => {
                let v: f64 = raw.parse().ok()?;
                (0.0..=1.0).contains(&v).then_some(SplitValue::Ratio(v))
            }
            SplitUnit::Number => parse_literal(raw).map(SplitValue::Number),
            SplitUnit::KFold => parse_literal(raw)
                .filter(|&k| k > 0)
                .map(SplitValue::KFold),
            SplitUnit::Manual => {
                let ids = raw
                    .split_whitespace()
                    .map(parse_literal)
                    .collect::<Option<Vec<usize>>>()?;
                (!ids.is_empty()).then_some(SplitValue::Manual(ids))
            }
        }
    }
}

/// Bare decimal digits only: no sign, no exponent, no fraction.
fn parse_literal(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

impl fmt::Display for SplitUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SplitUnit::Ratio => "Ratio",
            SplitUnit::Number => "Number",
            SplitUnit::KFold => "K Fold",
            SplitUnit::Manual => "Manual",
        })
    }
}

impl FromStr for SplitUnit {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace([' ', '-', '_'], "").as_str() {
            "ratio" => Ok(SplitUnit::Ratio),
            "number" => Ok(SplitUnit::Number),
            "kfold" => Ok(SplitUnit::KFold),
            "manual" => Ok(SplitUnit::Manual),
            _ => Err(SplitError::UnknownUnit(s.to_string())),
        }
    }
}

/// Typed value of a valid splitter.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitValue {
    Ratio(f64),
    Number(usize),
    KFold(usize),
    Manual(Vec<usize>),
}

impl SplitValue {
    pub fn unit(&self) -> SplitUnit {
        match self {
            SplitValue::Ratio(_) => SplitUnit::Ratio,
            SplitValue::Number(_) => SplitUnit::Number,
            SplitValue::KFold(_) => SplitUnit::KFold,
            SplitValue::Manual(_) => SplitUnit::Manual,
        }
    }
}

// ── Axes ──────────────────────────────────────────────────────────────────

/// Behaviour shared by test and validation axes.
pub trait SplitAxis: Copy + fmt::Debug + fmt::Display {
    /// Chain name used in error messages.
    const CHAIN: &'static str;

    /// Dimension to split along, `None` when disabled.
    fn target(&self) -> Option<Target>;

    /// Independent splits drop the whole selected group from training.
    fn is_independent(&self) -> bool {
        false
    }
}

/// Axis of a test splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestAxis {
    Disabled,
    Session,
    SessionIndependent,
    Trial,
    TrialIndependent,
    Subject,
    SubjectIndependent,
}

impl SplitAxis for TestAxis {
    const CHAIN: &'static str = "test";

    fn target(&self) -> Option<Target> {
        match self {
            TestAxis::Disabled => None,
            TestAxis::Session | TestAxis::SessionIndependent => Some(Target::Session),
            TestAxis::Trial | TestAxis::TrialIndependent => Some(Target::Trial),
            TestAxis::Subject | TestAxis::SubjectIndependent => Some(Target::Subject),
        }
    }

    fn is_independent(&self) -> bool {
        matches!(
            self,
            TestAxis::SessionIndependent | TestAxis::TrialIndependent | TestAxis::SubjectIndependent
        )
    }
}

/// Axis of a validation splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValAxis {
    Disabled,
    Session,
    Trial,
    Subject,
}

impl SplitAxis for ValAxis {
    const CHAIN: &'static str = "validation";

    fn target(&self) -> Option<Target> {
        match self {
            ValAxis::Disabled => None,
            ValAxis::Session => Some(Target::Session),
            ValAxis::Trial => Some(Target::Trial),
            ValAxis::Subject => Some(Target::Subject),
        }
    }
}

impl fmt::Display for TestAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TestAxis::Disabled => "Disable",
            TestAxis::Session => "By Session",
            TestAxis::SessionIndependent => "By Session (Independent)",
            TestAxis::Trial => "By Trial",
            TestAxis::TrialIndependent => "By Trial (Independent)",
            TestAxis::Subject => "By Subject",
            TestAxis::SubjectIndependent => "By Subject (Independent)",
        })
    }
}

impl fmt::Display for ValAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValAxis::Disabled => "Disable",
            ValAxis::Session => "By Session",
            ValAxis::Trial => "By Trial",
            ValAxis::Subject => "By Subject",
        })
    }
}

/// Normalise "By Session (Independent)" / "session_independent" alike.
fn axis_key(s: &str) -> String {
    let lower = s.trim().to_ascii_lowercase();
    let lower = lower.strip_prefix("by ").unwrap_or(&lower);
    lower
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

impl FromStr for TestAxis {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self> {
        match axis_key(s).as_str() {
            "disable" | "disabled" => Ok(TestAxis::Disabled),
            "session" => Ok(TestAxis::Session),
            "sessionindependent" => Ok(TestAxis::SessionIndependent),
            "trial" => Ok(TestAxis::Trial),
            "trialindependent" => Ok(TestAxis::TrialIndependent),
            "subject" => Ok(TestAxis::Subject),
            "subjectindependent" => Ok(TestAxis::SubjectIndependent),
            _ => Err(SplitError::UnknownAxis(s.to_string())),
        }
    }
}

impl FromStr for ValAxis {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self> {
        match axis_key(s).as_str() {
            "disable" | "disabled" => Ok(ValAxis::Disabled),
            "session" => Ok(ValAxis::Session),
            "trial" => Ok(ValAxis::Trial),
            "subject" => Ok(ValAxis::Subject),
            _ => Err(SplitError::UnknownAxis(s.to_string())),
        }
    }
}

// ── Splitter ──────────────────────────────────────────────────────────────

/// One entry of a test or validation chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Splitter<A> {
    pub axis: A,
    pub unit: SplitUnit,
    #[serde(rename = "value", default)]
    raw_value: String,
    /// `false` for placeholder rows that only pad a fixed-length chain.
    #[serde(default = "default_is_option")]
    is_option: bool,
}

fn default_is_option() -> bool {
    true
}

pub type TestSplitter = Splitter<TestAxis>;
pub type ValSplitter = Splitter<ValAxis>;

impl<A: SplitAxis> Splitter<A> {
    pub fn new(axis: A, unit: SplitUnit, raw_value: impl Into<String>) -> Self {
        Self { axis, unit, raw_value: raw_value.into(), is_option: true }
    }

    /// Structural row that pads a chain and is never evaluated.
    pub fn placeholder(axis: A) -> Self {
        Self { axis, unit: SplitUnit::Ratio, raw_value: String::new(), is_option: false }
    }

    pub fn is_option(&self) -> bool {
        self.is_option
    }

    /// `true` when this row takes part in splitting.
    pub fn is_enabled(&self) -> bool {
        self.is_option && self.axis.target().is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.unit.parse(&self.raw_value).is_some()
    }

    /// Replace the user-entered value. Validity is re-checked lazily.
    pub fn set_value(&mut self, raw: impl Into<String>) {
        self.raw_value = raw.into();
    }

    /// The user-entered value, only readable once it is valid.
    pub fn raw_value(&self) -> Result<&str> {
        if !self.is_valid() {
            return Err(self.invalid_state());
        }
        Ok(&self.raw_value)
    }

    /// Typed value: the id list for `Manual`, the number otherwise.
    pub fn value(&self) -> Result<SplitValue> {
        self.unit.parse(&self.raw_value).ok_or_else(|| self.invalid_state())
    }

    fn invalid_state(&self) -> SplitError {
        SplitError::InvalidSplitterState {
            unit: self.unit.to_string(),
            raw: self.raw_value.clone(),
        }
    }
}
