//! Split search: branch statistics, information gain, and the
//! continuous-feature threshold scan used while growing a tree.
//!
//! Every function here is a pure function of its explicit inputs. The
//! candidate threshold for a continuous feature is a parameter and a
//! return value, never shared mutable state, so a gain computed for one
//! row subset can never observe a threshold from another.
use crate::dataset::TrainingSet;
use crate::utils::{class_probabilities, entropy};

/// Occupancy statistics of one branch of a candidate split.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchStats {
    /// Selected rows as a fraction of the subset.
    pub fraction: f64,
    /// Per-class counts of the selected rows.
    pub counts: Vec<usize>,
    /// `counts` normalized by the selected-row total, all zero when the
    /// branch matched no rows.
    pub probabilities: Vec<f64>,
}

/// Gain of splitting one feature over a row subset.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureGain {
    /// Information gain against the fit-time prior entropy.
    pub gain: f64,
    /// Class counts of the subset, summed over the branches.
    pub counts: Vec<usize>,
}

/// The winning feature of a best-split scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// Index of the chosen feature.
    pub feature: usize,
    /// Information gain the feature achieved.
    pub gain: f64,
    /// Class counts of the subset the scan ran over.
    pub counts: Vec<usize>,
    /// The threshold the gain was computed with, for continuous features.
    pub threshold: Option<f64>,
}

#[inline]
fn branch_matches(set: &TrainingSet, row: usize, feature: usize, value: usize, threshold: Option<f64>) -> bool {
    let x = *set.data.get(row, feature);
    match threshold {
        // Branch 0 is at or below the threshold, branch 1 above it.
        Some(t) => {
            if value == 0 {
                x <= t
            } else {
                x > t
            }
        }
        None => x == value as f64,
    }
}

/// Rows of `rows` that fall into branch `value` of `feature`.
pub fn branch_rows(
    set: &TrainingSet,
    rows: &[usize],
    feature: usize,
    value: usize,
    threshold: Option<f64>,
) -> Vec<usize> {
    rows.iter()
        .copied()
        .filter(|&row| branch_matches(set, row, feature, value, threshold))
        .collect()
}

/// Fraction, class counts, and class probabilities of the rows selected
/// by branch `value` of `feature` within the subset.
pub fn branch_stats(
    set: &TrainingSet,
    rows: &[usize],
    feature: usize,
    value: usize,
    threshold: Option<f64>,
) -> BranchStats {
    let mut counts = vec![0; set.n_classes];
    let mut selected = 0;
    for &row in rows {
        if branch_matches(set, row, feature, value, threshold) {
            selected += 1;
            counts[set.labels[row]] += 1;
        }
    }
    let fraction = if rows.is_empty() {
        0.0
    } else {
        selected as f64 / rows.len() as f64
    };
    let probabilities = class_probabilities(&counts);
    BranchStats {
        fraction,
        counts,
        probabilities,
    }
}

/// Information gain of splitting the subset on `feature`.
///
/// The weighted branch entropies are subtracted from `prior_entropy`,
/// the entropy of the full training label distribution fixed at fit
/// time, not the subset's own distribution.
pub fn information_gain(
    set: &TrainingSet,
    rows: &[usize],
    feature: usize,
    threshold: Option<f64>,
    prior_entropy: f64,
) -> FeatureGain {
    let n_branches = match threshold {
        Some(_) => 2,
        None => set.value_counts[feature],
    };
    let mut weighted = 0.0;
    let mut counts = vec![0; set.n_classes];
    for value in 0..n_branches {
        let stats = branch_stats(set, rows, feature, value, threshold);
        weighted += stats.fraction * entropy(&stats.probabilities);
        for (total, branch) in counts.iter_mut().zip(&stats.counts) {
            *total += branch;
        }
    }
    FeatureGain {
        gain: prior_entropy - weighted,
        counts,
    }
}

/// Best binary threshold for a continuous feature over the subset.
///
/// Candidates are the midpoints of adjacent distinct sorted values; each
/// is scored by [`information_gain`] and the first maximum wins. Returns
/// the winning threshold together with its gain. A subset with a single
/// distinct value yields that value itself as the threshold.
pub fn select_threshold(set: &TrainingSet, rows: &[usize], feature: usize, prior_entropy: f64) -> (f64, f64) {
    let distinct = set.distinct_column_values(rows, feature);
    if distinct.len() < 2 {
        let threshold = distinct.first().copied().unwrap_or(0.0);
        let gain = information_gain(set, rows, feature, Some(threshold), prior_entropy).gain;
        return (threshold, gain);
    }
    let mut best_threshold = f64::NAN;
    let mut best_gain = f64::NEG_INFINITY;
    for pair in distinct.windows(2) {
        let candidate = (pair[0] + pair[1]) / 2.0;
        let gain = information_gain(set, rows, feature, Some(candidate), prior_entropy).gain;
        if gain > best_gain {
            best_gain = gain;
            best_threshold = candidate;
        }
    }
    (best_threshold, best_gain)
}

/// Scan every feature and keep the one with maximal gain.
///
/// Continuous features get a fresh threshold against the current subset
/// before their gain is computed. Ties keep the lowest feature index.
pub fn best_split(set: &TrainingSet, rows: &[usize], prior_entropy: f64) -> Split {
    let evaluate = |feature: usize| -> Split {
        let threshold = if set.is_continuous[feature] {
            Some(select_threshold(set, rows, feature, prior_entropy).0)
        } else {
            None
        };
        let FeatureGain { gain, counts } = information_gain(set, rows, feature, threshold, prior_entropy);
        Split {
            feature,
            gain,
            counts,
            threshold,
        }
    };

    let mut best = evaluate(0);
    for feature in 1..set.data.cols {
        let candidate = evaluate(feature);
        if candidate.gain > best.gain {
            best = candidate;
        }
    }
    best
}
