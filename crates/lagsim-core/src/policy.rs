//! Impairment policy.
//!
//! Pure decision functions over the configured probabilities. Each roll
//! consumes exactly one uniform draw from the environment, and a probability
//! of exactly zero consumes none, so a disabled impairment leaves the random
//! stream untouched and runs stay replayable.

use std::time::Duration;

use crate::{channel::ChannelClass, config::ImpairmentConfig, env::Environment};

/// What happens to a packet after the loss roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Enqueue with this much latency.
    Deliver {
        /// Total latency before the packet is released.
        latency: Duration,
        /// A reliable packet lost its roll and pays for a resend.
        retransmitted: bool,
    },
    /// Unreliable loss: the packet never reaches the transport.
    Discard,
}

/// Loss and reorder parameters taken from an [`ImpairmentConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpairmentPolicy {
    base_latency: Duration,
    loss_probability: f64,
    extra_reliable_latency: Duration,
    reorder_probability: f64,
}

impl ImpairmentPolicy {
    /// Build the policy for `config`.
    pub fn new(config: &ImpairmentConfig) -> Self {
        Self {
            base_latency: config.base_latency,
            loss_probability: config.loss_probability,
            extra_reliable_latency: config.extra_reliable_latency,
            reorder_probability: config.reorder_probability,
        }
    }

    /// Roll for loss and work out the packet's latency.
    ///
    /// Reliable channels cannot actually lose data, so a loss event turns
    /// into `extra_reliable_latency` on top of the base latency.
    pub fn judge<E: Environment>(&self, class: ChannelClass, env: &E) -> Verdict {
        if !roll(self.loss_probability, env) {
            return Verdict::Deliver { latency: self.base_latency, retransmitted: false };
        }

        match class {
            ChannelClass::Reliable => Verdict::Deliver {
                latency: self.base_latency.saturating_add(self.extra_reliable_latency),
                retransmitted: true,
            },
            ChannelClass::Unreliable => Verdict::Discard,
        }
    }

    /// Whether a packet should be inserted before the last queued packet
    /// instead of appended.
    ///
    /// Only unreliable packets reorder, and only when something is queued to
    /// overtake. No draw is consumed otherwise.
    pub fn reorders<E: Environment>(&self, class: ChannelClass, queued: usize, env: &E) -> bool {
        class == ChannelClass::Unreliable && queued > 0 && roll(self.reorder_probability, env)
    }
}

fn roll<E: Environment>(probability: f64, env: &E) -> bool {
    probability > 0.0 && env.random_unit() < probability
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEnv;

    fn policy(loss: f64, reorder: f64) -> ImpairmentPolicy {
        ImpairmentPolicy::new(&ImpairmentConfig {
            base_latency: Duration::from_millis(100),
            loss_probability: loss,
            extra_reliable_latency: Duration::from_millis(50),
            reorder_probability: reorder,
            ..ImpairmentConfig::default()
        })
    }

    #[test]
    fn zero_probabilities_consume_no_draws() {
        let env = ScriptedEnv::new();
        let policy = policy(0.0, 0.0);

        for class in ChannelClass::ALL {
            assert_eq!(
                policy.judge(class, &env),
                Verdict::Deliver { latency: Duration::from_millis(100), retransmitted: false }
            );
            assert!(!policy.reorders(class, 5, &env));
        }

        assert_eq!(env.draws_consumed(), 0);
    }

    #[test]
    fn reliable_loss_adds_latency() {
        let env = ScriptedEnv::with_draws(&[0.1]);
        assert_eq!(
            policy(0.5, 0.0).judge(ChannelClass::Reliable, &env),
            Verdict::Deliver { latency: Duration::from_millis(150), retransmitted: true }
        );
    }

    #[test]
    fn unreliable_loss_discards() {
        let env = ScriptedEnv::with_draws(&[0.1]);
        assert_eq!(policy(0.5, 0.0).judge(ChannelClass::Unreliable, &env), Verdict::Discard);
    }

    #[test]
    fn draw_at_probability_is_not_a_loss() {
        let env = ScriptedEnv::with_draws(&[0.5]);
        assert!(matches!(
            policy(0.5, 0.0).judge(ChannelClass::Unreliable, &env),
            Verdict::Deliver { retransmitted: false, .. }
        ));
    }

    #[test]
    fn reliable_never_reorders() {
        let env = ScriptedEnv::new();
        assert!(!policy(0.0, 1.0).reorders(ChannelClass::Reliable, 3, &env));
        assert_eq!(env.draws_consumed(), 0);
    }

    #[test]
    fn empty_queue_skips_reorder_roll() {
        let env = ScriptedEnv::new();
        assert!(!policy(0.0, 1.0).reorders(ChannelClass::Unreliable, 0, &env));
        assert_eq!(env.draws_consumed(), 0);
    }

    #[test]
    fn unreliable_reorders_on_low_draw() {
        let env = ScriptedEnv::with_draws(&[0.2, 0.8]);
        let policy = policy(0.0, 0.5);

        assert!(policy.reorders(ChannelClass::Unreliable, 1, &env));
        assert!(!policy.reorders(ChannelClass::Unreliable, 1, &env));
        assert_eq!(env.draws_consumed(), 2);
    }
}
