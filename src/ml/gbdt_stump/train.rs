use super::model::{GbdtStumpModel, Stump};
use crate::ml::{BinaryDataset, logit, sigmoid};

/// Training hyperparameters for stump boosting.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of boosting rounds.
    pub rounds: usize,
    /// Shrinkage applied per round.
    pub learning_rate: f32,
    /// Number of bins used for split search.
    pub bins: usize,
    /// L2 penalty on leaf values (Newton denominator).
    pub l2: f32,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            rounds: 100,
            learning_rate: 0.1,
            bins: 32,
            l2: 1.0,
        }
    }
}

/// Train a binary stump-GBDT model on the logistic loss.
pub fn train_gbdt_stump(
    dataset: &BinaryDataset,
    options: &TrainOptions,
) -> Result<GbdtStumpModel, String> {
    let dim = dataset.check_shape()?;
    if dim > u16::MAX as usize {
        return Err(format!("Too many features for stump indices: {dim}"));
    }
    if !options.learning_rate.is_finite() || options.learning_rate <= 0.0 {
        return Err("learning_rate must be > 0".to_string());
    }
    let bins = options.bins.clamp(2, 256);
    let l2 = options.l2.max(0.0);

    let n = dataset.len();
    let (mins, maxs) = compute_feature_min_max(&dataset.x, dim);
    let binned = bin_features(&dataset.x, &mins, &maxs, bins);

    let prior = dataset.positives() as f32 / n as f32;
    let init_raw = logit(prior);
    let mut raw = vec![init_raw; n];

    let mut stumps = Vec::with_capacity(options.rounds);
    for _round in 0..options.rounds {
        let probs: Vec<f32> = raw.iter().map(|&r| sigmoid(r)).collect();
        let residuals: Vec<f32> = dataset
            .y
            .iter()
            .zip(&probs)
            .map(|(&label, &p)| if label { 1.0 - p } else { -p })
            .collect();

        let Some(best) = best_split(&binned, &residuals, dim, bins) else {
            break;
        };
        let threshold = threshold_for_bin(mins[best.feature_index], maxs[best.feature_index], best.split_bin, bins);
        let (left_value, right_value) =
            newton_leaf_values(&dataset.x, &residuals, &probs, best.feature_index, threshold, l2);
        let stump = Stump {
            feature_index: best.feature_index as u16,
            threshold,
            left_value,
            right_value,
        };
        for (score, row) in raw.iter_mut().zip(&dataset.x) {
            *score += options.learning_rate * stump.predict(row);
        }
        stumps.push(stump);
    }

    let model = GbdtStumpModel {
        model_version: 1,
        feature_len: dim,
        learning_rate: options.learning_rate,
        init_raw,
        stumps,
    };
    model.validate()?;
    Ok(model)
}

fn compute_feature_min_max(x: &[Vec<f32>], feature_len: usize) -> (Vec<f32>, Vec<f32>) {
    let mut mins = vec![f32::INFINITY; feature_len];
    let mut maxs = vec![f32::NEG_INFINITY; feature_len];
    for row in x {
        for (j, &v) in row.iter().take(feature_len).enumerate() {
            mins[j] = mins[j].min(v);
            maxs[j] = maxs[j].max(v);
        }
    }
    for j in 0..feature_len {
        if !mins[j].is_finite() || !maxs[j].is_finite() {
            mins[j] = 0.0;
            maxs[j] = 0.0;
        }
    }
    (mins, maxs)
}

fn bin_features(x: &[Vec<f32>], mins: &[f32], maxs: &[f32], bins: usize) -> Vec<Vec<u8>> {
    let top = (bins - 1) as f32;
    x.iter()
        .map(|row| {
            mins.iter()
                .zip(maxs)
                .enumerate()
                .map(|(j, (&min, &max))| {
                    let v = row.get(j).copied().unwrap_or(0.0);
                    let t = if max > min {
                        ((v - min) / (max - min)).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    (t * top).round() as u8
                })
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    score: f64,
    feature_index: usize,
    split_bin: usize,
}

/// Lowest residual SSE across all features; `None` when nothing can split.
fn best_split(binned: &[Vec<u8>], residuals: &[f32], dim: usize, bins: usize) -> Option<BestSplit> {
    (0..dim)
        .filter_map(|feature_idx| best_split_for_feature(binned, residuals, feature_idx, bins))
        .fold(None, |best: Option<BestSplit>, split| match best {
            Some(current) if current.score <= split.score => Some(current),
            _ => Some(split),
        })
}

fn best_split_for_feature(
    binned: &[Vec<u8>],
    residuals: &[f32],
    feature_idx: usize,
    bins: usize,
) -> Option<BestSplit> {
    let mut counts = vec![0u32; bins];
    let mut sums = vec![0f64; bins];
    let mut sums_sq = vec![0f64; bins];
    for (row, &r) in binned.iter().zip(residuals) {
        let b = row.get(feature_idx).copied().unwrap_or(0) as usize;
        let r = r as f64;
        counts[b] += 1;
        sums[b] += r;
        sums_sq[b] += r * r;
    }
    let total_count: u32 = counts.iter().sum();
    let total_sum: f64 = sums.iter().sum();
    let total_sum_sq: f64 = sums_sq.iter().sum();

    let mut best: Option<BestSplit> = None;
    let mut left_count = 0u32;
    let mut left_sum = 0f64;
    let mut left_sum_sq = 0f64;
    for split_bin in 0..(bins - 1) {
        left_count += counts[split_bin];
        left_sum += sums[split_bin];
        left_sum_sq += sums_sq[split_bin];
        let right_count = total_count - left_count;
        if left_count == 0 || right_count == 0 {
            continue;
        }
        let right_sum = total_sum - left_sum;
        let right_sum_sq = total_sum_sq - left_sum_sq;
        let left_sse = left_sum_sq - (left_sum * left_sum) / left_count as f64;
        let right_sse = right_sum_sq - (right_sum * right_sum) / right_count as f64;
        let score = left_sse + right_sse;
        if best.is_none_or(|current| score < current.score) {
            best = Some(BestSplit {
                score,
                feature_index: feature_idx,
                split_bin,
            });
        }
    }
    best
}

/// Upper edge of `split_bin`, so every value binned at or below it goes left.
fn threshold_for_bin(min: f32, max: f32, split_bin: usize, bins: usize) -> f32 {
    let t = (split_bin as f32 + 0.5) / (bins - 1) as f32;
    min + t * (max - min)
}

fn newton_leaf_values(
    x: &[Vec<f32>],
    residuals: &[f32],
    probs: &[f32],
    feature_idx: usize,
    threshold: f32,
    l2: f32,
) -> (f32, f32) {
    let mut left = (0.0f32, 0.0f32);
    let mut right = (0.0f32, 0.0f32);
    for ((row, &r), &p) in x.iter().zip(residuals).zip(probs) {
        let v = row.get(feature_idx).copied().unwrap_or(0.0);
        let side = if v <= threshold { &mut left } else { &mut right };
        side.0 += r;
        side.1 += p * (1.0 - p);
    }
    let leaf = |(gradient, hessian): (f32, f32)| {
        let denom = hessian + l2;
        if denom <= f32::EPSILON {
            0.0
        } else {
            gradient / denom
        }
    };
    (leaf(left), leaf(right))
}
