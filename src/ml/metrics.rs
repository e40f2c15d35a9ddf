//! Evaluation metrics for the success classifier.

use serde::{Deserialize, Serialize};

use super::{BinaryDataset, Classifier};

/// Probability at or above which a startup is predicted to succeed.
pub const DECISION_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}

#[derive(Debug, Clone)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Held-out metrics recorded in the artifact for operator visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub rows: usize,
    pub positives: usize,
    /// `None` when the split holds only one outcome.
    pub roc_auc: Option<f32>,
    pub accuracy: Option<f32>,
    pub log_loss: Option<f32>,
    pub brier: Option<f32>,
    pub precision: Option<f32>,
    pub recall: Option<f32>,
}

impl ValidationMetrics {
    pub fn empty() -> Self {
        Self {
            rows: 0,
            positives: 0,
            roc_auc: None,
            accuracy: None,
            log_loss: None,
            brier: None,
            precision: None,
            recall: None,
        }
    }
}

/// Score `dataset` with `classifier` and summarize.
pub fn evaluate(classifier: &Classifier, dataset: &BinaryDataset) -> ValidationMetrics {
    let scores: Vec<f32> = dataset
        .x
        .iter()
        .map(|row| classifier.predict_probability(row))
        .collect();
    summarize(&scores, &dataset.y)
}

/// Summarize probabilities against labels; non-finite scores are dropped.
pub fn summarize(scores: &[f32], labels: &[bool]) -> ValidationMetrics {
    let (scores, labels): (Vec<f32>, Vec<bool>) = scores
        .iter()
        .zip(labels)
        .filter(|(score, _)| score.is_finite())
        .map(|(&score, &label)| (score, label))
        .unzip();
    if scores.is_empty() {
        return ValidationMetrics::empty();
    }
    let cm = binary_confusion(&scores, &labels, DECISION_THRESHOLD);
    let per_class = precision_recall_by_class(&cm);
    let positive = &per_class[1];
    ValidationMetrics {
        rows: scores.len(),
        positives: labels.iter().filter(|&&l| l).count(),
        roc_auc: roc_auc(&scores, &labels),
        accuracy: Some(accuracy(&cm)),
        log_loss: Some(log_loss(&scores, &labels)),
        brier: Some(brier_score(&scores, &labels)),
        precision: Some(positive.precision),
        recall: Some(positive.recall),
    }
}

/// Two-class confusion matrix (`0` = failed, `1` = succeeded).
pub fn binary_confusion(scores: &[f32], labels: &[bool], threshold: f32) -> ConfusionMatrix {
    let mut cm = ConfusionMatrix::new(2);
    for (&score, &label) in scores.iter().zip(labels) {
        cm.add(label as usize, (score >= threshold) as usize);
    }
    cm
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f32;
        let mut fp = 0f32;
        let mut fn_ = 0f32;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f32;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f32;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        stats.push(PerClassStats {
            precision,
            recall,
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let total = cm.total();
    if total == 0 {
        return 0.0;
    }
    let correct: u64 = (0..cm.n_classes).map(|c| cm.get(c, c) as u64).sum();
    correct as f32 / total as f32
}

/// Area under the ROC curve via the rank-sum statistic (ties averaged).
///
/// `None` when either class is absent.
pub fn roc_auc(scores: &[f32], labels: &[bool]) -> Option<f32> {
    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0f64;
    let mut start = 0usize;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; tied scores share the average rank.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            if labels[idx] {
                positive_rank_sum += avg_rank;
            }
        }
        start = end;
    }
    let p = positives as f64;
    let u = positive_rank_sum - p * (p + 1.0) / 2.0;
    Some((u / (p * negatives as f64)) as f32)
}

/// Mean negative log-likelihood with probabilities clipped to avoid `ln(0)`.
pub fn log_loss(scores: &[f32], labels: &[bool]) -> f32 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: f64 = scores
        .iter()
        .zip(labels)
        .map(|(&p, &label)| {
            let p = (p as f64).clamp(1e-7, 1.0 - 1e-7);
            if label { -p.ln() } else { -(1.0 - p).ln() }
        })
        .sum();
    (sum / scores.len() as f64) as f32
}

/// Mean squared error between probability and outcome.
pub fn brier_score(scores: &[f32], labels: &[bool]) -> f32 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: f32 = scores
        .iter()
        .zip(labels)
        .map(|(&p, &label)| {
            let target = if label { 1.0 } else { 0.0 };
            (p - target) * (p - target)
        })
        .sum();
    sum / scores.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking_has_unit_auc() {
        let scores = [0.1, 0.2, 0.8, 0.9];
        let labels = [false, false, true, true];
        assert_eq!(roc_auc(&scores, &labels), Some(1.0));
        let reversed = [true, true, false, false];
        assert_eq!(roc_auc(&scores, &reversed), Some(0.0));
    }

    #[test]
    fn ties_count_half() {
        let scores = [0.5, 0.5];
        let labels = [false, true];
        assert_eq!(roc_auc(&scores, &labels), Some(0.5));
    }

    #[test]
    fn auc_needs_both_classes() {
        assert_eq!(roc_auc(&[0.3, 0.7], &[true, true]), None);
    }

    #[test]
    fn summary_uses_half_threshold() {
        let metrics = summarize(&[0.9, 0.4, 0.6, 0.1], &[true, true, false, false]);
        assert_eq!(metrics.rows, 4);
        assert_eq!(metrics.positives, 2);
        assert_eq!(metrics.accuracy, Some(0.5));
        assert_eq!(metrics.precision, Some(0.5));
        assert_eq!(metrics.recall, Some(0.5));
        assert_eq!(metrics.roc_auc, Some(0.75));
    }

    #[test]
    fn non_finite_scores_are_ignored() {
        let metrics = summarize(&[f32::NAN, 0.9], &[false, true]);
        assert_eq!(metrics.rows, 1);
        assert_eq!(metrics.roc_auc, None);
        assert!(summarize(&[], &[]).accuracy.is_none());
    }

    #[test]
    fn log_loss_and_brier_reward_confidence() {
        let labels = [true, false];
        assert!(log_loss(&[0.9, 0.1], &labels) < log_loss(&[0.6, 0.4], &labels));
        assert!((brier_score(&[1.0, 0.0], &labels)).abs() < 1e-6);
    }
}
