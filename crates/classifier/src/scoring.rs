//! Logit scoring

use aicc_core::CategoryScore;

/// Numerically stable softmax over the full logit vector
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Top `k` (label, probability) pairs, descending.
///
/// Ties keep label index order. `k` is clamped to the number of labels.
pub fn top_k(probabilities: &[f32], labels: &[String], k: usize) -> Vec<CategoryScore> {
    let mut indexed: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    // sort_by is stable
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

    indexed
        .into_iter()
        .take(k.min(labels.len()))
        .map(|(i, p)| CategoryScore::new(labels[i].clone(), p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("label_{}", i)).collect()
    }

    #[test]
    fn test_softmax_basic() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        assert_eq!(probs.len(), 3);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_softmax_empty() {
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn test_top_k_order_and_clamp() {
        let labels = labels(4);
        let top = top_k(&[0.1, 0.4, 0.2, 0.3], &labels, 10);
        assert_eq!(top.len(), 4);
        let names: Vec<&str> = top.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(names, vec!["label_1", "label_3", "label_2", "label_0"]);

        let top = top_k(&[0.1, 0.4, 0.2, 0.3], &labels, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].probability, 0.4);
    }

    #[test]
    fn test_top_k_ties_keep_index_order() {
        let labels = labels(4);
        let top = top_k(&[0.25, 0.25, 0.25, 0.25], &labels, 4);
        let names: Vec<&str> = top.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(names, vec!["label_0", "label_1", "label_2", "label_3"]);
    }

    #[test]
    fn test_random_logits_properties() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..500 {
            let n = rng.gen_range(1..40);
            let logits: Vec<f32> = (0..n).map(|_| rng.gen_range(-20.0..20.0)).collect();
            let probs = softmax(&logits);

            let sum: f32 = probs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "softmax sum {}", sum);

            let k = rng.gen_range(1..=n);
            let top = top_k(&probs, &labels(n), k);
            assert_eq!(top.len(), k);
            assert!(top.windows(2).all(|w| w[0].probability >= w[1].probability));

            let top_sum: f32 = top.iter().map(|s| s.probability).sum();
            assert!(top_sum <= 1.0 + 1e-5);
        }
    }
}
