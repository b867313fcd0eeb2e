//! Citation-influence and score-fusion helpers shared by the analyzer and the
//! read facade. Grounded on the teacher's confidence-modifier style
//! (multiplicative adjustments, capped to [0,1]) but scoped to this domain's
//! needs: z-normalizing citation counts and fusing two [0,1] scores.

/// z-normalize a set of citation counts, then squash into [0,1] with a
/// logistic curve so a handful of extreme outliers don't dominate the fused
/// hybrid-search score (spec §4.6).
pub fn z_normalize_citations(counts: &[u64]) -> Vec<f64> {
    if counts.is_empty() {
        return Vec::new();
    }
    let values: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let std_dev = variance.sqrt();

    values
        .iter()
        .map(|&v| {
            if std_dev < f64::EPSILON {
                0.5
            } else {
                let z = (v - mean) / std_dev;
                1.0 / (1.0 + (-z).exp())
            }
        })
        .collect()
}

/// Fixed convex combination of semantic similarity and citation influence
/// (spec §4.6 `hybrid_search`: weight alpha=0.7 on similarity by default).
pub fn fuse_scores(similarity: f64, influence: f64, alpha: f64) -> f64 {
    (alpha * similarity + (1.0 - alpha) * influence).clamp(0.0, 1.0)
}

pub const DEFAULT_HYBRID_ALPHA: f64 = 0.7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_normalize_empty_is_empty() {
        assert!(z_normalize_citations(&[]).is_empty());
    }

    #[test]
    fn z_normalize_uniform_counts_are_neutral() {
        let out = z_normalize_citations(&[10, 10, 10]);
        for v in out {
            assert!((v - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn z_normalize_preserves_order() {
        let out = z_normalize_citations(&[1, 50, 1000]);
        assert!(out[0] < out[1]);
        assert!(out[1] < out[2]);
    }

    #[test]
    fn fuse_scores_respects_alpha_extremes() {
        assert!((fuse_scores(0.9, 0.1, 1.0) - 0.9).abs() < 1e-9);
        assert!((fuse_scores(0.9, 0.1, 0.0) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn fuse_scores_default_alpha_matches_spec() {
        let fused = fuse_scores(1.0, 0.0, DEFAULT_HYBRID_ALPHA);
        assert!((fused - 0.7).abs() < 1e-9);
    }
}
