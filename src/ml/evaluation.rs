// ============================================================
// Layer 5 — Evaluation Metrics
// ============================================================
// Pure-Rust metric computation over (probability, label) pairs —
// no tensor backend involved, so every formula here is unit
// tested against hand-checked vectors.
//
// AUC is computed with the rank-sum (Mann-Whitney) formulation:
//
//   AUC = (Σ ranks of positives − n₊(n₊+1)/2) / (n₊ · n₋)
//
// with tied scores receiving their average rank, which is the
// standard correction and keeps the statistic in [0, 1].

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Classification metrics at the 0.5 threshold, plus AUC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub auc: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub positives: usize,
    pub negatives: usize,
}

/// Compute metrics over scored examples. Needs both classes present:
/// AUC is undefined otherwise, and a snapshot with a single class is
/// a degenerate training run that should be surfaced, not averaged
/// over.
pub fn evaluate(scored: &[(f64, u8)]) -> Result<EvalMetrics> {
    let positives = scored.iter().filter(|(_, y)| *y == 1).count();
    let negatives = scored.len() - positives;
    if positives == 0 || negatives == 0 {
        bail!(
            "cannot evaluate a single-class snapshot \
             ({positives} positives, {negatives} negatives)"
        );
    }

    let mut true_pos = 0usize;
    let mut false_pos = 0usize;
    let mut correct = 0usize;
    for (score, label) in scored {
        let predicted = *score >= 0.5;
        let actual = *label == 1;
        if predicted == actual {
            correct += 1;
        }
        if predicted && actual {
            true_pos += 1;
        }
        if predicted && !actual {
            false_pos += 1;
        }
    }

    let accuracy = correct as f64 / scored.len() as f64;
    let precision = if true_pos + false_pos > 0 {
        true_pos as f64 / (true_pos + false_pos) as f64
    } else {
        0.0
    };
    let recall = true_pos as f64 / positives as f64;

    Ok(EvalMetrics {
        auc: auc(scored),
        accuracy,
        precision,
        recall,
        positives,
        negatives,
    })
}

/// Rank-based AUC with average ranks for ties. Caller guarantees
/// both classes are present.
fn auc(scored: &[(f64, u8)]) -> f64 {
    let mut order: Vec<usize> = (0..scored.len()).collect();
    order.sort_by(|&a, &b| {
        scored[a]
            .0
            .partial_cmp(&scored[b].0)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Average rank per tie group, 1-based
    let mut ranks = vec![0.0f64; scored.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scored[order[j + 1]].0 == scored[order[i]].0 {
            j += 1;
        }
        let average = (i + 1 + j + 1) as f64 / 2.0;
        for &index in &order[i..=j] {
            ranks[index] = average;
        }
        i = j + 1;
    }

    let n_pos = scored.iter().filter(|(_, y)| *y == 1).count() as f64;
    let n_neg = scored.len() as f64 - n_pos;
    let rank_sum: f64 = scored
        .iter()
        .zip(&ranks)
        .filter(|((_, y), _)| *y == 1)
        .map(|(_, r)| r)
        .sum();

    (rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}

/// Pair importance magnitudes with feature names and rank them,
/// descending, name as the deterministic tie-break. Fails on a
/// length mismatch rather than silently mislabelling columns.
pub fn rank_features(
    names: &[&str],
    magnitudes: &[f32],
) -> Result<Vec<(String, f64)>> {
    if names.len() != magnitudes.len() {
        bail!(
            "{} feature names but {} importance values",
            names.len(),
            magnitudes.len()
        );
    }
    let mut ranked: Vec<(String, f64)> = names
        .iter()
        .zip(magnitudes)
        .map(|(name, m)| (name.to_string(), *m as f64))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    Ok(ranked)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_ranking_gives_auc_one() {
        let scored = vec![(0.9, 1), (0.8, 1), (0.3, 0), (0.1, 0)];
        let metrics = evaluate(&scored).unwrap();
        assert!((metrics.auc - 1.0).abs() < 1e-12);
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);
    }

    #[test]
    fn test_inverted_ranking_gives_auc_zero() {
        let scored = vec![(0.1, 1), (0.9, 0)];
        let metrics = evaluate(&scored).unwrap();
        assert!(metrics.auc.abs() < 1e-12);
    }

    #[test]
    fn test_all_ties_give_auc_half() {
        let scored = vec![(0.5, 1), (0.5, 0), (0.5, 1), (0.5, 0)];
        let metrics = evaluate(&scored).unwrap();
        assert!((metrics.auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_hand_checked_confusion_counts() {
        // predictions at 0.5: [1, 0, 1, 0]; labels: [1, 1, 0, 0]
        // → TP=1, FP=1, FN=1, TN=1
        let scored = vec![(0.7, 1), (0.2, 1), (0.8, 0), (0.4, 0)];
        let metrics = evaluate(&scored).unwrap();
        assert_eq!(metrics.accuracy, 0.5);
        assert_eq!(metrics.precision, 0.5);
        assert_eq!(metrics.recall, 0.5);
    }

    #[test]
    fn test_single_class_is_an_error() {
        assert!(evaluate(&[(0.9, 1), (0.3, 1)]).is_err());
        assert!(evaluate(&[]).is_err());
    }

    #[test]
    fn test_feature_ranking_sorted_with_name_tiebreak() {
        let ranked = rank_features(&["b", "a", "c"], &[0.5, 0.5, 0.9]).unwrap();
        assert_eq!(ranked[0].0, "c");
        assert_eq!(ranked[1].0, "a"); // ties broken alphabetically
        assert_eq!(ranked[2].0, "b");
    }

    #[test]
    fn test_feature_ranking_length_mismatch() {
        assert!(rank_features(&["a"], &[0.1, 0.2]).is_err());
    }
}
