//! Opponent curriculum
//!
//! Early in training the learner mostly meets the random opponent, which
//! drives broad state coverage. As training progresses the weight shifts
//! toward the policies that exploit the learner's own table, hardening the
//! policy against its current weaknesses.
//!
//! | Opponent      | progress 0 | progress 1 |
//! |---------------|-----------:|-----------:|
//! | Random        |       0.70 |       0.10 |
//! | Aggressive    |       0.10 |       0.15 |
//! | Defensive     |       0.10 |       0.15 |
//! | Mirror        |       0.05 |       0.25 |
//! | Best response |       0.05 |       0.35 |

use rand::{Rng, rngs::StdRng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use super::opponents::OpponentPolicy;

/// Weighted opponent schedule over a set of enabled policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    opponents: Vec<OpponentPolicy>,
}

impl Default for Curriculum {
    fn default() -> Self {
        Self::new(OpponentPolicy::ALL.to_vec())
    }
}

impl Curriculum {
    /// Create a curriculum over the given opponents
    ///
    /// Duplicates are dropped; order is kept.
    pub fn new(opponents: Vec<OpponentPolicy>) -> Self {
        let mut unique = Vec::with_capacity(opponents.len());
        for policy in opponents {
            if !unique.contains(&policy) {
                unique.push(policy);
            }
        }
        Self { opponents: unique }
    }

    /// Curriculum that always plays one opponent
    pub fn fixed(opponent: OpponentPolicy) -> Self {
        Self::new(vec![opponent])
    }

    pub fn opponents(&self) -> &[OpponentPolicy] {
        &self.opponents
    }

    /// Unnormalised weight of `policy` at `progress` in `[0, 1]`
    pub fn base_weight(policy: OpponentPolicy, progress: f64) -> f64 {
        let p = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        match policy {
            OpponentPolicy::Random => 0.70 - 0.60 * p,
            OpponentPolicy::Aggressive => 0.10 + 0.05 * p,
            OpponentPolicy::Defensive => 0.10 + 0.05 * p,
            OpponentPolicy::Mirror => 0.05 + 0.20 * p,
            OpponentPolicy::BestResponse => 0.05 + 0.30 * p,
        }
    }

    /// Normalised weights of the enabled opponents at `progress`
    pub fn weights(&self, progress: f64) -> Vec<(OpponentPolicy, f64)> {
        let raw: Vec<(OpponentPolicy, f64)> = self
            .opponents
            .iter()
            .map(|&policy| (policy, Self::base_weight(policy, progress)))
            .collect();
        let total: f64 = raw.iter().map(|(_, w)| w).sum();
        if total > 0.0 {
            raw.into_iter().map(|(policy, w)| (policy, w / total)).collect()
        } else {
            raw
        }
    }

    /// Draw the opponent for the next episode
    pub fn sample(&self, progress: f64, rng: &mut StdRng) -> OpponentPolicy {
        sample_policy(&self.weights(progress), rng)
    }
}

/// Weighted draw from `weights`
///
/// An empty list yields [`OpponentPolicy::Random`]. When no weight is
/// positive and finite the draw is uniform over the listed policies.
pub fn sample_policy(weights: &[(OpponentPolicy, f64)], rng: &mut StdRng) -> OpponentPolicy {
    let usable = |w: f64| w.is_finite() && w > 0.0;
    let total: f64 = weights.iter().map(|&(_, w)| w).filter(|&w| usable(w)).sum();

    if total <= 0.0 {
        return weights
            .choose(rng)
            .map_or(OpponentPolicy::Random, |&(policy, _)| policy);
    }

    let mut remaining = rng.random::<f64>() * total;
    let mut last = OpponentPolicy::Random;
    for &(policy, weight) in weights {
        if !usable(weight) {
            continue;
        }
        last = policy;
        if remaining < weight {
            return policy;
        }
        remaining -= weight;
    }
    // Floating point leftovers land on the last usable policy
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::q_learning::build_rng;

    fn weight_of(weights: &[(OpponentPolicy, f64)], policy: OpponentPolicy) -> f64 {
        weights
            .iter()
            .find(|(p, _)| *p == policy)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    #[test]
    fn test_weights_sum_to_one() {
        let curriculum = Curriculum::default();
        for progress in [0.0, 0.25, 0.5, 1.0] {
            let total: f64 = curriculum.weights(progress).iter().map(|(_, w)| w).sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_random_dominates_early_adversaries_late() {
        let curriculum = Curriculum::default();

        let early = curriculum.weights(0.0);
        let random = weight_of(&early, OpponentPolicy::Random);
        assert!(early.iter().all(|&(_, w)| w <= random));

        let late = curriculum.weights(1.0);
        let adversarial = weight_of(&late, OpponentPolicy::Mirror)
            + weight_of(&late, OpponentPolicy::BestResponse);
        assert!(adversarial > weight_of(&late, OpponentPolicy::Random));
    }

    #[test]
    fn test_sample_respects_enabled_opponents() {
        let curriculum = Curriculum::new(vec![OpponentPolicy::Aggressive, OpponentPolicy::Mirror]);
        let mut rng = build_rng(Some(11));
        for _ in 0..200 {
            let policy = curriculum.sample(0.5, &mut rng);
            assert!(matches!(
                policy,
                OpponentPolicy::Aggressive | OpponentPolicy::Mirror
            ));
        }
    }

    #[test]
    fn test_fixed_curriculum_always_returns_its_opponent() {
        let curriculum = Curriculum::fixed(OpponentPolicy::Defensive);
        let mut rng = build_rng(Some(12));
        for progress in [0.0, 0.5, 1.0] {
            assert_eq!(curriculum.sample(progress, &mut rng), OpponentPolicy::Defensive);
        }
    }

    #[test]
    fn test_sample_fallbacks() {
        let mut rng = build_rng(Some(13));
        assert_eq!(sample_policy(&[], &mut rng), OpponentPolicy::Random);

        let zeros = [
            (OpponentPolicy::Mirror, 0.0),
            (OpponentPolicy::Defensive, f64::NAN),
        ];
        let mut seen_mirror = false;
        let mut seen_defensive = false;
        for _ in 0..200 {
            match sample_policy(&zeros, &mut rng) {
                OpponentPolicy::Mirror => seen_mirror = true,
                OpponentPolicy::Defensive => seen_defensive = true,
                other => panic!("unexpected {other}"),
            }
        }
        assert!(seen_mirror && seen_defensive);
    }

    #[test]
    fn test_sample_skips_zero_weights() {
        let weights = [(OpponentPolicy::Random, 0.0), (OpponentPolicy::Aggressive, 1.0)];
        let mut rng = build_rng(Some(14));
        for _ in 0..100 {
            assert_eq!(sample_policy(&weights, &mut rng), OpponentPolicy::Aggressive);
        }
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let curriculum = Curriculum::new(vec![
            OpponentPolicy::Random,
            OpponentPolicy::Random,
            OpponentPolicy::Mirror,
        ]);
        assert_eq!(
            curriculum.opponents(),
            &[OpponentPolicy::Random, OpponentPolicy::Mirror]
        );
    }
}
