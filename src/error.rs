//! Error type shared by every partitioning step.
//!
//! Configuration problems and contract violations are errors; running out of
//! data during a pick is not (see [`crate::picker`]), it shows up as a smaller
//! mask instead.

/// All errors that can occur while building an index or generating datasets.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// `value()` / `raw_value()` was called on a splitter that failed validation.
    #[error("splitter is invalid: unit {unit} cannot hold value {raw:?}")]
    InvalidSplitterState { unit: String, raw: String },

    /// An enabled splitter in a configuration chain is invalid.
    #[error("{chain} splitter #{position} is invalid: unit {unit} cannot hold value {raw:?}")]
    InvalidSplitter {
        chain: &'static str,
        position: usize,
        unit: String,
        raw: String,
    },

    /// Unit name that does not map onto [`crate::SplitUnit`].
    #[error("unknown split unit {0:?}")]
    UnknownUnit(String),

    /// Axis name that does not map onto a test or validation axis.
    #[error("unknown split axis {0:?}")]
    UnknownAxis(String),

    /// A manual id list reached count resolution. Manual selection never goes
    /// through the balancing picker.
    #[error("manual selections have no count to resolve")]
    ManualUnit,

    /// A split that must select something came back empty.
    #[error("{dataset}: no epochs left to select for the {chain} set")]
    EmptySelection { dataset: String, chain: &'static str },

    /// A finished run produced zero datasets.
    #[error("no valid dataset was generated")]
    NoDatasetGenerated,

    /// Per-epoch attribute arrays disagree in length.
    #[error("{field} has {got} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    /// An id array uses an id outside `0..names.len()`, or leaves a gap.
    #[error("{field} ids are not dense: {detail}")]
    SparseIds { field: &'static str, detail: String },

    /// An epoch carries an event code its recording never declared.
    #[error("recording {subject}/{session}: event code {code} has no name")]
    UnknownEvent {
        subject: String,
        session: String,
        code: i64,
    },

    /// A recording maps two event names onto one code it actually uses.
    #[error("recording {subject}/{session}: event code {code} is declared as both {first:?} and {second:?}")]
    AmbiguousEvent {
        subject: String,
        session: String,
        code: i64,
        first: String,
        second: String,
    },
}

pub type Result<T> = std::result::Result<T, SplitError>;
