//! Vote aggregation for tree ensembles

/// Combines per-tree class-probability vectors into one distribution.
#[derive(Debug, Clone, Default)]
pub struct VoteAggregator {
    /// Per-tree weights; empty means equal weights
    weights: Vec<f64>,
}

impl VoteAggregator {
    /// Aggregator that averages every tree equally.
    pub fn equal_weights() -> Self {
        Self::default()
    }

    /// Create an aggregator with one weight per tree.
    pub fn with_weights(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    /// Weighted average of the tree distributions (soft voting).
    ///
    /// Returns `None` when there are no votes, when the vectors disagree on
    /// the number of classes, or when the weights sum to zero.
    pub fn aggregate(&self, votes: &[&[f64]]) -> Option<Vec<f64>> {
        let n_classes = votes.first()?.len();
        if votes.iter().any(|v| v.len() != n_classes) {
            return None;
        }

        let mut summed = vec![0.0; n_classes];
        let mut total_weight = 0.0;

        for (i, vote) in votes.iter().enumerate() {
            let weight = self.weights.get(i).copied().unwrap_or(1.0);
            for (acc, p) in summed.iter_mut().zip(vote.iter()) {
                *acc += weight * p;
            }
            total_weight += weight;
        }

        if total_weight > 0.0 {
            Some(summed.into_iter().map(|s| s / total_weight).collect())
        } else {
            None
        }
    }

    /// Index of the most probable class; ties go to the lowest index.
    pub fn argmax(probabilities: &[f64]) -> Option<usize> {
        probabilities
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_weights() {
        let aggregator = VoteAggregator::equal_weights();
        let a: &[f64] = &[0.8, 0.2];
        let b: &[f64] = &[0.6, 0.4];

        let aggregated = aggregator.aggregate(&[a, b]).unwrap();

        // Should be simple average
        assert!((aggregated[0] - 0.7).abs() < 1e-12);
        assert!((aggregated[1] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_aggregation() {
        let aggregator = VoteAggregator::with_weights(vec![3.0, 1.0]);
        let a: &[f64] = &[1.0, 0.0];
        let b: &[f64] = &[0.0, 1.0];

        let aggregated = aggregator.aggregate(&[a, b]).unwrap();
        assert!((aggregated[0] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_or_empty_votes() {
        let aggregator = VoteAggregator::equal_weights();
        let a: &[f64] = &[1.0, 0.0];
        let b: &[f64] = &[0.2, 0.3, 0.5];

        assert!(aggregator.aggregate(&[]).is_none());
        assert!(aggregator.aggregate(&[a, b]).is_none());
    }

    #[test]
    fn test_argmax_ties_pick_first() {
        assert_eq!(VoteAggregator::argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(VoteAggregator::argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(VoteAggregator::argmax(&[]), None);
    }
}
