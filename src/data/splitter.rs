// ============================================================
// Layer 4 — Train / Validation / Test Splitter
// ============================================================
// Stratified, seeded three-way split.
//
// Why stratified?
//   Repurchase labels are imbalanced. A plain random split on a
//   small snapshot can easily hand the validation or test partition
//   zero positives, which makes AUC undefined and early stopping
//   meaningless. Shuffling WITHIN each label group and slicing each
//   group by the same fractions guarantees both classes appear in
//   every partition (whenever the group is large enough).
//
// Why seeded?
//   The whole pipeline is reproducible from explicit seeds; the
//   split is part of the training contract, not ambient randomness.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom over a
// StdRng seeded by the caller.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::features::TrainingExample;

/// The three partitions of one training snapshot.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<TrainingExample>,
    pub validation: Vec<TrainingExample>,
    pub test: Vec<TrainingExample>,
}

/// Stratified split by label. `train_fraction + val_fraction` must
/// leave room for a non-empty test slice.
pub fn stratified_split(
    examples: Vec<TrainingExample>,
    train_fraction: f64,
    val_fraction: f64,
    seed: u64,
) -> Result<Split> {
    if train_fraction <= 0.0
        || val_fraction <= 0.0
        || train_fraction + val_fraction >= 1.0
    {
        bail!(
            "invalid split fractions: train={train_fraction}, val={val_fraction} \
             (must each be in (0,1) and sum below 1)"
        );
    }

    let mut rng = StdRng::seed_from_u64(seed);

    let (mut positives, mut negatives): (Vec<_>, Vec<_>) =
        examples.into_iter().partition(|e| e.label == 1);
    positives.shuffle(&mut rng);
    negatives.shuffle(&mut rng);

    let mut split = Split {
        train: Vec::new(),
        validation: Vec::new(),
        test: Vec::new(),
    };
    for group in [positives, negatives] {
        let total = group.len();
        let train_end = (total as f64 * train_fraction).round() as usize;
        let val_end = train_end
            + (total as f64 * val_fraction).round() as usize;
        let val_end = val_end.min(total);

        for (i, example) in group.into_iter().enumerate() {
            if i < train_end {
                split.train.push(example);
            } else if i < val_end {
                split.validation.push(example);
            } else {
                split.test.push(example);
            }
        }
    }

    tracing::debug!(
        "Split: {} train, {} validation, {} test ({} positives total)",
        split.train.len(),
        split.validation.len(),
        split.test.len(),
        split.train.iter().filter(|e| e.label == 1).count()
            + split.validation.iter().filter(|e| e.label == 1).count()
            + split.test.iter().filter(|e| e.label == 1).count(),
    );

    Ok(split)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::{CustomerFeatures, RECENCY_SENTINEL_DAYS};

    fn example(customer_id: u32, label: u8) -> TrainingExample {
        TrainingExample {
            features: CustomerFeatures {
                customer_id,
                recency_days: RECENCY_SENTINEL_DAYS,
                frequency: 0.0,
                monetary_total: 0.0,
                monetary_avg: 0.0,
                avg_quantity: 0.0,
                distinct_products: 0.0,
                tenure_days: 0.0,
                age: 30.0,
                gender_code: 0.0,
                preferred_category_code: 0.0,
                payment_method_code: 0.0,
                share_beauty: 0.0,
                share_books: 0.0,
                share_clothing: 0.0,
                share_electronics: 0.0,
                share_home_garden: 0.0,
                share_sports: 0.0,
                q1_share: 0.0,
                q2_share: 0.0,
                q3_share: 0.0,
                q4_share: 0.0,
            },
            label,
        }
    }

    fn pool() -> Vec<TrainingExample> {
        // 100 examples, 20% positive
        (0..100)
            .map(|i| example(i, u8::from(i % 5 == 0)))
            .collect()
    }

    #[test]
    fn test_no_examples_lost() {
        let split = stratified_split(pool(), 0.7, 0.15, 1).unwrap();
        assert_eq!(
            split.train.len() + split.validation.len() + split.test.len(),
            100
        );
    }

    #[test]
    fn test_both_classes_in_every_partition() {
        let split = stratified_split(pool(), 0.7, 0.15, 1).unwrap();
        for partition in [&split.train, &split.validation, &split.test] {
            assert!(partition.iter().any(|e| e.label == 1));
            assert!(partition.iter().any(|e| e.label == 0));
        }
    }

    #[test]
    fn test_split_is_seed_deterministic() {
        let ids = |s: &Split| -> Vec<u32> {
            s.train.iter().map(|e| e.features.customer_id).collect()
        };
        let a = stratified_split(pool(), 0.7, 0.15, 9).unwrap();
        let b = stratified_split(pool(), 0.7, 0.15, 9).unwrap();
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn test_invalid_fractions_rejected() {
        assert!(stratified_split(pool(), 0.9, 0.2, 1).is_err());
        assert!(stratified_split(pool(), 0.0, 0.5, 1).is_err());
    }
}
