//! Training-set view: the feature matrix, the class labels, and the
//! per-feature metadata the inducer branches on.
use crate::data::Matrix;
use crate::errors::QuinlanError;

/// Borrowed view over the training data, validated once at fit time.
///
/// Continuous features are carried with a `value_counts` entry of 2,
/// representing the two-way below/above-threshold split.
pub struct TrainingSet<'a> {
    /// The feature matrix, rows are instances and columns are features.
    pub data: &'a Matrix<'a, f64>,
    /// Class index per row, each in `0..n_classes`.
    pub labels: &'a [usize],
    /// Number of classes.
    pub n_classes: usize,
    /// Per-feature flag marking continuous features.
    pub is_continuous: &'a [bool],
    /// Distinct-value count per feature.
    pub value_counts: &'a [usize],
}

impl<'a> TrainingSet<'a> {
    /// Assemble and validate a training set.
    ///
    /// Fails fast on a zero-column matrix, an empty matrix, a row/label
    /// count mismatch, or any label outside `0..n_classes`.
    pub fn new(
        data: &'a Matrix<'a, f64>,
        labels: &'a [usize],
        n_classes: usize,
        is_continuous: &'a [bool],
        value_counts: &'a [usize],
    ) -> Result<Self, QuinlanError> {
        if data.cols == 0 {
            return Err(QuinlanError::NoFeatures);
        }
        if data.rows == 0 {
            return Err(QuinlanError::EmptyTrainingSet);
        }
        if data.rows != labels.len() {
            return Err(QuinlanError::DimensionMismatch(data.rows, labels.len()));
        }
        for (row, &label) in labels.iter().enumerate() {
            if label >= n_classes {
                return Err(QuinlanError::LabelOutOfRange(label, row, n_classes));
            }
        }
        Ok(TrainingSet {
            data,
            labels,
            n_classes,
            is_continuous,
            value_counts,
        })
    }

    /// Per-class counts of the labels in `rows`.
    pub fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &row in rows {
            counts[self.labels[row]] += 1;
        }
        counts
    }

    /// Whether every row in `rows` carries the same label.
    pub fn is_pure(&self, rows: &[usize]) -> bool {
        match rows.split_first() {
            Some((&first, rest)) => rest.iter().all(|&row| self.labels[row] == self.labels[first]),
            None => true,
        }
    }

    /// Distinct values of one feature column restricted to `rows`,
    /// sorted ascending.
    pub fn distinct_column_values(&self, rows: &[usize], feature: usize) -> Vec<f64> {
        let column = self.data.get_col(feature);
        let mut values: Vec<f64> = rows.iter().map(|&row| column[row]).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        values
    }
}
