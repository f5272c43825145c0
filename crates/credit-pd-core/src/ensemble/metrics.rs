use serde::{Deserialize, Serialize};

use crate::risk::decision::predict_label;

/// Binary classification quality at a fixed threshold, plus ranking AUC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// `None` when only one class is present.
    pub auc: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(actual: &[u8], predicted: &[u8]) -> Self {
        let mut m = ConfusionMatrix::default();
        for (a, p) in actual.iter().zip(predicted) {
            match (a, p) {
                (0, 0) => m.true_negative += 1,
                (0, _) => m.false_positive += 1,
                (_, 0) => m.false_negative += 1,
                _ => m.true_positive += 1,
            }
        }
        m
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

/// Hard labels for `probabilities` at `threshold`.
pub fn hard_labels(probabilities: &[f64], threshold: f64) -> Vec<u8> {
    probabilities
        .iter()
        .map(|p| predict_label(*p, threshold).as_class())
        .collect()
}

/// Accuracy, precision, recall and F1 at `threshold`; undefined ratios are 0.
pub fn evaluate(actual: &[u8], probabilities: &[f64], threshold: f64) -> ClassificationMetrics {
    let cm = ConfusionMatrix::from_predictions(actual, &hard_labels(probabilities, threshold));
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

    let precision = ratio(cm.true_positive, cm.true_positive + cm.false_positive);
    let recall = ratio(cm.true_positive, cm.true_positive + cm.false_negative);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    ClassificationMetrics {
        accuracy: ratio(cm.true_positive + cm.true_negative, cm.total()),
        precision,
        recall,
        f1,
        auc: roc_auc(actual, probabilities),
    }
}

/// Area under the ROC curve via the rank-sum statistic, averaging tied ranks.
pub fn roc_auc(actual: &[u8], scores: &[f64]) -> Option<f64> {
    let n_pos = actual.iter().filter(|a| **a == 1).count();
    let n_neg = actual.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&i, &j| scores[i].total_cmp(&scores[j]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; a tie block shares its mean rank.
        let mean_rank = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = mean_rank;
        }
        start = end + 1;
    }

    let pos_rank_sum: f64 = actual
        .iter()
        .zip(&ranks)
        .filter(|(a, _)| **a == 1)
        .map(|(_, r)| r)
        .sum();
    let n_pos = n_pos as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_ranking() {
        let y = [0, 0, 1, 1];
        let s = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&y, &s), Some(1.0));
        let inverted = [0.9, 0.8, 0.2, 0.1];
        assert_eq!(roc_auc(&y, &inverted), Some(0.0));
    }

    #[test]
    fn test_ties_count_half() {
        let y = [0, 1];
        assert_eq!(roc_auc(&y, &[0.5, 0.5]), Some(0.5));
        let y = [0, 0, 1, 1];
        let s = [0.1, 0.4, 0.4, 0.9];
        // pairs: (0.1,0.4)=1 (0.1,0.9)=1 (0.4,0.4)=0.5 (0.4,0.9)=1
        assert_eq!(roc_auc(&y, &s), Some(3.5 / 4.0));
    }

    #[test]
    fn test_single_class_auc_undefined() {
        assert_eq!(roc_auc(&[1, 1], &[0.2, 0.3]), None);
    }

    #[test]
    fn test_evaluate_uses_threshold() {
        let y = [0, 0, 1, 1];
        let p = [0.05, 0.16, 0.15, 0.9];
        let m = evaluate(&y, &p, 0.15);
        // predicted: 0, 1, 1, 1
        assert_eq!(m.accuracy, 0.75);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.recall, 1.0);
        assert!((m.f1 - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let m = evaluate(&[0, 0, 1], &[0.0, 0.0, 0.0], 0.15);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
    }

    #[test]
    fn test_confusion_matrix() {
        let cm = ConfusionMatrix::from_predictions(&[0, 0, 1, 1, 1], &[0, 1, 0, 1, 1]);
        assert_eq!(
            cm,
            ConfusionMatrix {
                true_negative: 1,
                false_positive: 1,
                false_negative: 1,
                true_positive: 2
            }
        );
        assert_eq!(cm.total(), 5);
    }
}
