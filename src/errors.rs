//! Errors
//!
//! Custom error types used throughout the `quinlan` crate.
use thiserror::Error;

/// Errors that can occur while fitting or applying a decision tree.
#[derive(Debug, Error)]
pub enum QuinlanError {
    /// Row count and label count disagree.
    #[error("Got {0} rows but {1} labels.")]
    DimensionMismatch(usize, usize),
    /// A label outside `[0, n_classes)`.
    #[error("Label {0} at row {1} is outside the valid range 0..{2}.")]
    LabelOutOfRange(usize, usize, usize),
    /// Feature matrix with no columns.
    #[error("The feature matrix must have at least one column.")]
    NoFeatures,
    /// Feature matrix with no rows.
    #[error("Cannot fit a tree on an empty training set.")]
    EmptyTrainingSet,
    /// A depth bound below -1.
    #[error("Invalid max_depth {0}, expected -1, 0, or a positive value.")]
    InvalidMaxDepth(i64),
    /// Per-feature value-count table of the wrong width.
    #[error("Expected {1} per-feature value counts, got {0}.")]
    InvalidValueCounts(usize, usize),
    /// Per-feature continuous-flag table of the wrong width.
    #[error("Expected {1} per-feature continuous flags, got {0}.")]
    InvalidContinuousFlags(usize, usize),
    /// A query vector of the wrong width.
    #[error("The query vector has {0} features, the tree was fitted on {1}.")]
    FeatureWidthMismatch(usize, usize),
    /// Prediction requested before the tree was fitted.
    #[error("The tree has not been fitted, call fit before predicting.")]
    NotFitted,
    /// Classification dispatched through more branch nodes than there are features.
    #[error("Classification did not reach a leaf within {0} steps, the tree is malformed.")]
    TraversalExhausted(usize),
    /// Unable to write model to file.
    #[error("Unable to write model to file: {0}")]
    UnableToWrite(String),
    /// Unable to read model from file.
    #[error("Unable to read model from a file {0}")]
    UnableToRead(String),
}
