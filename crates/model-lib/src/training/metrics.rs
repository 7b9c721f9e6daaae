//! Validation metrics for a fitted classifier

use std::collections::BTreeMap;

/// Compute accuracy, precision, recall, F1 and ROC AUC.
///
/// `roc_auc` is omitted when `labels` holds a single class.
pub fn evaluate(probabilities: &[f64], labels: &[bool], threshold: f64) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    if probabilities.is_empty() || probabilities.len() != labels.len() {
        return metrics;
    }

    let (mut tp, mut fp, mut tn, mut fn_) = (0usize, 0usize, 0usize, 0usize);
    for (&p, &actual) in probabilities.iter().zip(labels) {
        match (p >= threshold, actual) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, false) => tn += 1,
            (false, true) => fn_ += 1,
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    metrics.insert("accuracy".to_string(), ratio(tp + tn, labels.len()));
    metrics.insert("precision".to_string(), precision);
    metrics.insert("recall".to_string(), recall);
    metrics.insert("f1".to_string(), f1);
    if let Some(auc) = roc_auc(probabilities, labels) {
        metrics.insert("roc_auc".to_string(), auc);
    }
    metrics
}

/// Area under the ROC curve via the rank-sum statistic (ties get average rank)
pub fn roc_auc(probabilities: &[f64], labels: &[bool]) -> Option<f64> {
    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| probabilities[a].total_cmp(&probabilities[b]));

    let mut pos_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probabilities[order[j + 1]] == probabilities[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; the tie group i..=j shares their mean
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] {
                pos_rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_metrics() {
        let probs = [0.9, 0.8, 0.3, 0.6, 0.1];
        let labels = [true, true, true, false, false];
        let m = evaluate(&probs, &labels, 0.5);
        assert!((m["accuracy"] - 0.6).abs() < 1e-12);
        assert!((m["precision"] - 2.0 / 3.0).abs() < 1e-12);
        assert!((m["recall"] - 2.0 / 3.0).abs() < 1e-12);
        assert!((m["f1"] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_auc_perfect_and_inverted() {
        let labels = [false, false, true, true];
        assert_eq!(roc_auc(&[0.1, 0.2, 0.8, 0.9], &labels), Some(1.0));
        assert_eq!(roc_auc(&[0.9, 0.8, 0.2, 0.1], &labels), Some(0.0));
    }

    #[test]
    fn test_auc_ties_count_half() {
        let labels = [false, true];
        assert_eq!(roc_auc(&[0.5, 0.5], &labels), Some(0.5));
    }

    #[test]
    fn test_single_class_has_no_auc() {
        let m = evaluate(&[0.2, 0.7], &[true, true], 0.5);
        assert!(!m.contains_key("roc_auc"));
        assert!((m["accuracy"] - 0.5).abs() < 1e-12);
    }
}
