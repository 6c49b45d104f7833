//! Numeric helpers shared by the split search and the classifier.

/// Shannon entropy, base 2, of a class-probability vector.
///
/// Zero-probability terms contribute nothing, following the
/// `0 * log2(0) = 0` convention.
#[inline]
pub fn entropy(probabilities: &[f64]) -> f64 {
    probabilities
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum()
}

/// Normalize per-class counts into probabilities.
///
/// An all-zero count vector yields an all-zero probability vector rather
/// than dividing by zero; an empty branch is a valid, common case.
#[inline]
pub fn class_probabilities(counts: &[usize]) -> Vec<f64> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0.0; counts.len()];
    }
    counts.iter().map(|&c| c as f64 / total as f64).collect()
}

/// Index of the largest count. Ties keep the first index.
#[inline]
pub fn argmax_counts(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate().skip(1) {
        if c > counts[best] {
            best = i;
        }
    }
    best
}
