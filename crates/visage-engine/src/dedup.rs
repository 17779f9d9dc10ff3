//! Online deduplication of face samples within one enrollment run.

use visage_core::{cosine_similarity, FaceSample};

/// Greedy first-seen-wins duplicate filter.
///
/// A candidate is dropped when its embedding is more similar than the
/// threshold to ANY already-accepted sample. O(n²) in the run length,
/// deterministic for a fixed input order, and order-preserving: the
/// output is always a subsequence of the input.
#[derive(Clone, Copy, Debug)]
pub struct DedupEngine {
    threshold: f32,
}

impl DedupEngine {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn deduplicate(&self, samples: Vec<FaceSample>) -> Vec<FaceSample> {
        let mut accepted: Vec<FaceSample> = Vec::new();

        'candidates: for candidate in samples {
            for kept in &accepted {
                match cosine_similarity(&candidate.embedding, &kept.embedding) {
                    Ok(sim) if sim > self.threshold => continue 'candidates,
                    Ok(_) => {}
                    // Mismatched dimensions cannot be "similar"; keep the
                    // candidate and let downstream decide what to do with it.
                    Err(_) => {}
                }
            }
            accepted.push(candidate);
        }

        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visage_core::{Embedding, ImageData};

    fn sample(v: &[f32]) -> FaceSample {
        FaceSample::new(Embedding::new(v.to_vec()), ImageData::jpeg(vec![0u8; 4]))
    }

    fn firsts(samples: &[FaceSample]) -> Vec<f32> {
        samples.iter().map(|s| s.embedding.as_slice()[0]).collect()
    }

    #[test]
    fn empty_input_empty_output() {
        let engine = DedupEngine::new(0.7);
        assert!(engine.deduplicate(Vec::new()).is_empty());
    }

    #[test]
    fn single_sample_always_accepted() {
        let engine = DedupEngine::new(0.7);
        let out = engine.deduplicate(vec![sample(&[0.0, 0.0])]);
        assert_eq!(out.len(), 1, "even a zero vector is kept when it is first");
    }

    #[test]
    fn near_duplicate_is_dropped() {
        let engine = DedupEngine::new(0.7);
        let out = engine.deduplicate(vec![
            sample(&[1.0, 0.0]),
            sample(&[0.99, 0.05]), // ~0.998 similar to the first
            sample(&[0.0, 1.0]),   // orthogonal, kept
        ]);
        assert_eq!(firsts(&out), vec![1.0, 0.0]);
    }

    #[test]
    fn first_seen_wins() {
        let engine = DedupEngine::new(0.7);
        let out = engine.deduplicate(vec![sample(&[1.0, 0.0]), sample(&[1.0, 0.0])]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].embedding.as_slice(), &[1.0, 0.0]);
    }

    #[test]
    fn output_preserves_input_order() {
        let engine = DedupEngine::new(0.7);
        let out = engine.deduplicate(vec![
            sample(&[1.0, 0.0, 0.0]),
            sample(&[0.0, 1.0, 0.0]),
            sample(&[0.0, 0.0, 1.0]),
        ]);
        assert_eq!(firsts(&out), vec![1.0, 0.0, 0.0]);
        assert_eq!(out[1].embedding.as_slice()[1], 1.0);
        assert_eq!(out[2].embedding.as_slice()[2], 1.0);
    }

    #[test]
    fn deduplicate_is_idempotent() {
        let engine = DedupEngine::new(0.7);
        let input = vec![
            sample(&[1.0, 0.0]),
            sample(&[0.95, 0.1]),
            sample(&[0.0, 1.0]),
            sample(&[0.1, 0.98]),
            sample(&[-1.0, 0.2]),
        ];
        let once = engine.deduplicate(input);
        let twice = engine.deduplicate(once.clone());
        assert_eq!(firsts(&once), firsts(&twice));
    }

    #[test]
    fn raising_threshold_never_shrinks_output() {
        let input = vec![
            sample(&[1.0, 0.0]),
            sample(&[0.9, 0.3]),
            sample(&[0.5, 0.5]),
            sample(&[0.0, 1.0]),
        ];
        let mut prev = 0usize;
        for threshold in [0.0, 0.3, 0.6, 0.9, 0.999] {
            let n = DedupEngine::new(threshold).deduplicate(input.clone()).len();
            assert!(n >= prev, "threshold {threshold} shrank output: {n} < {prev}");
            prev = n;
        }
    }

    #[test]
    fn very_low_threshold_collapses_correlated_input() {
        // Everything in the +x half-plane correlates positively, so with
        // threshold 0 only the first sample survives.
        let engine = DedupEngine::new(0.0);
        let out = engine.deduplicate(vec![
            sample(&[1.0, 0.1]),
            sample(&[0.8, 0.4]),
            sample(&[0.9, 0.2]),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn threshold_near_one_keeps_everything_but_exact_duplicates() {
        let engine = DedupEngine::new(0.9999);
        let out = engine.deduplicate(vec![
            sample(&[1.0, 0.0]),
            sample(&[0.9, 0.3]),
            sample(&[0.5, 0.8]),
        ]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn mismatched_dimensions_are_kept_not_dropped() {
        let engine = DedupEngine::new(0.7);
        let out = engine.deduplicate(vec![sample(&[1.0, 0.0]), sample(&[1.0, 0.0, 0.0])]);
        assert_eq!(out.len(), 2);
    }
}
