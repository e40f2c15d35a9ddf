use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};

use super::LogRegModel;
use crate::ml::{BinaryDataset, sigmoid};

/// Training options for the logistic regression classifier.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub learning_rate: f32,
    pub l2: f32,
    pub batch_size: usize,
    pub seed: u64,
    /// Weight classes by inverse frequency during fitting. The intercept is
    /// shifted back to the observed base rate afterwards.
    pub balance_classes: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 200,
            learning_rate: 0.1,
            l2: 1e-3,
            batch_size: 32,
            seed: 42,
            balance_classes: false,
        }
    }
}

/// Fit with seeded mini-batch SGD on the log loss plus an L2 penalty.
pub fn train_logreg(
    dataset: &BinaryDataset,
    options: &TrainOptions,
) -> Result<LogRegModel, String> {
    let dim = dataset.check_shape()?;
    if !options.learning_rate.is_finite() || options.learning_rate <= 0.0 {
        return Err("learning_rate must be > 0".to_string());
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut weights: Vec<f32> = (0..dim)
        .map(|_| (rng.random::<f32>() - 0.5) * 0.01)
        .collect();
    let mut bias = 0.0f32;

    let (negative_weight, positive_weight) = if options.balance_classes {
        class_weights(dataset)
    } else {
        (1.0, 1.0)
    };

    let mut indices: Vec<usize> = (0..dataset.len()).collect();
    let batch_size = options.batch_size.max(1);
    let lr = options.learning_rate;
    let l2 = options.l2.max(0.0);

    for _epoch in 0..options.epochs {
        indices.shuffle(&mut rng);
        for chunk in indices.chunks(batch_size) {
            let mut grad_w = vec![0.0f32; dim];
            let mut grad_b = 0.0f32;
            let mut batch_weight = 0.0f32;
            for &idx in chunk {
                let x = &dataset.x[idx];
                let label = dataset.y[idx];
                let weight = if label { positive_weight } else { negative_weight };
                if weight == 0.0 {
                    continue;
                }
                let z = weights.iter().zip(x).fold(bias, |acc, (w, v)| acc + w * v);
                let diff = sigmoid(z) - if label { 1.0 } else { 0.0 };
                for (g, v) in grad_w.iter_mut().zip(x) {
                    *g += diff * v * weight;
                }
                grad_b += diff * weight;
                batch_weight += weight;
            }
            if batch_weight == 0.0 {
                continue;
            }
            let inv = 1.0 / batch_weight;
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= lr * (g * inv + l2 * *w);
            }
            bias -= lr * grad_b * inv;
        }
    }
    bias += prior_correction(negative_weight, positive_weight);

    let model = LogRegModel {
        model_version: 1,
        feature_len: dim,
        weights,
        bias,
    };
    model.validate()?;
    Ok(model)
}

/// Inverse-frequency weights so both outcomes contribute equally.
fn class_weights(dataset: &BinaryDataset) -> (f32, f32) {
    let total = dataset.len() as f32;
    let positives = dataset.positives() as f32;
    let negatives = total - positives;
    if positives == 0.0 || negatives == 0.0 {
        return (1.0, 1.0);
    }
    (total / (2.0 * negatives), total / (2.0 * positives))
}

/// Log-odds shift that undoes the prior implied by class weights.
///
/// Weighted fitting targets odds `w+ * pi / (w- * (1 - pi))`; adding
/// `ln(w- / w+)` restores `pi / (1 - pi)`.
fn prior_correction(negative_weight: f32, positive_weight: f32) -> f32 {
    if negative_weight <= 0.0 || positive_weight <= 0.0 {
        return 0.0;
    }
    (negative_weight / positive_weight).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> BinaryDataset {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let v = i as f32 / 10.0 - 2.0;
            x.push(vec![v, 1.0]);
            y.push(v > 0.0);
        }
        BinaryDataset { x, y }
    }

    #[test]
    fn learns_a_separable_boundary() {
        let model = train_logreg(&separable(), &TrainOptions::default()).unwrap();
        assert!(model.predict_probability(&[1.5, 1.0]) > 0.8);
        assert!(model.predict_probability(&[-1.5, 1.0]) < 0.2);
    }

    #[test]
    fn same_seed_reproduces_weights() {
        let options = TrainOptions {
            epochs: 10,
            ..TrainOptions::default()
        };
        let a = train_logreg(&separable(), &options).unwrap();
        let b = train_logreg(&separable(), &options).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_class_still_trains() {
        let dataset = BinaryDataset {
            x: vec![vec![0.0], vec![1.0]],
            y: vec![true, true],
        };
        let model = train_logreg(&dataset, &TrainOptions::default()).unwrap();
        assert!(model.predict_probability(&[0.5]) > 0.5);
    }

    #[test]
    fn rejects_empty_dataset() {
        assert!(train_logreg(&BinaryDataset::default(), &TrainOptions::default()).is_err());
    }

    #[test]
    fn balanced_weights_favor_the_minority() {
        let dataset = BinaryDataset {
            x: vec![vec![0.0]; 4],
            y: vec![true, false, false, false],
        };
        let (neg, pos) = class_weights(&dataset);
        assert!(pos > neg);
        assert!((neg * 3.0 + pos - 4.0).abs() < 1e-6);
    }

    fn uninformative(rows: usize, positives_every: usize) -> BinaryDataset {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..rows {
            x.push(vec![((i % 7) as f32 - 3.0) / 3.0, 1.0]);
            y.push(i % positives_every == 0);
        }
        BinaryDataset { x, y }
    }

    fn mean_probability(model: &LogRegModel, dataset: &BinaryDataset) -> f32 {
        let total: f32 = dataset.x.iter().map(|x| model.predict_probability(x)).sum();
        total / dataset.len() as f32
    }

    #[test]
    fn default_fit_matches_the_base_rate() {
        let dataset = uninformative(500, 10);
        let model = train_logreg(&dataset, &TrainOptions::default()).unwrap();
        assert!((mean_probability(&model, &dataset) - 0.1).abs() < 0.03);
    }

    #[test]
    fn balanced_fit_is_shifted_back_to_the_base_rate() {
        let dataset = uninformative(500, 10);
        let options = TrainOptions {
            balance_classes: true,
            ..TrainOptions::default()
        };
        let model = train_logreg(&dataset, &options).unwrap();
        assert!((mean_probability(&model, &dataset) - 0.1).abs() < 0.05);
    }

    #[test]
    fn equal_weights_need_no_correction() {
        assert_eq!(prior_correction(1.0, 1.0), 0.0);
        assert!(prior_correction(0.5, 2.0) < 0.0);
    }
}
