//! Deterministic train/validation split keyed by row position and seed.

/// Map `(seed, index)` to a stable value in `[0, 1]`.
pub fn split_u01(seed: u64, index: usize) -> f64 {
    let hash = blake3::hash(format!("{seed}:{index}").as_bytes());
    let bytes = hash.as_bytes();
    let raw = u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]);
    (raw as f64) / (u64::MAX as f64)
}

/// Row indices assigned to each side of the split.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Assign `n` rows to train or validation.
///
/// With two or more rows and a positive fraction, both sides are non-empty:
/// one row is moved across when hashing leaves a side empty. A single row
/// always trains.
pub fn validation_split(n: usize, fraction: f64, seed: u64) -> SplitIndices {
    let mut split = SplitIndices::default();
    if n < 2 || fraction <= 0.0 {
        split.train = (0..n).collect();
        return split;
    }
    let scored: Vec<(usize, f64)> = (0..n).map(|idx| (idx, split_u01(seed, idx))).collect();
    for &(idx, unit) in &scored {
        if unit < fraction {
            split.validation.push(idx);
        } else {
            split.train.push(idx);
        }
    }
    if split.validation.is_empty() {
        let idx = lowest_score(&scored, &split.train);
        split.train.retain(|&i| i != idx);
        split.validation.push(idx);
    } else if split.train.is_empty() {
        let idx = highest_score(&scored, &split.validation);
        split.validation.retain(|&i| i != idx);
        split.train.push(idx);
    }
    split
}

fn lowest_score(scored: &[(usize, f64)], candidates: &[usize]) -> usize {
    candidates
        .iter()
        .copied()
        .min_by(|&a, &b| scored[a].1.total_cmp(&scored[b].1))
        .unwrap_or(0)
}

fn highest_score(scored: &[(usize, f64)], candidates: &[usize]) -> usize {
    candidates
        .iter()
        .copied()
        .max_by(|&a, &b| scored[a].1.total_cmp(&scored[b].1))
        .unwrap_or(0)
}
