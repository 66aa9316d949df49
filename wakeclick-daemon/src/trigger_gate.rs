//! Accept or ignore keyword detections based on timing
//!
//! Two windows suppress detections: the arming delay right after startup
//! (audio device warm-up tends to produce false positives) and a cooldown
//! after each accepted trigger. The cooldown is shared by all keywords.

use std::time::{Duration, Instant};

use crate::bindings::{BindingTable, KeywordBinding};

pub const DEFAULT_ARM_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Accept(KeywordBinding),
    IgnoreArming,
    IgnoreCooldown,
    IgnoreUnbound,
}

#[derive(Debug, Clone)]
pub struct TriggerGate {
    bindings: BindingTable,
    started_at: Instant,
    last_trigger: Option<Instant>,
    arm_delay: Duration,
    cooldown: Duration,
}

impl TriggerGate {
    pub fn new(bindings: BindingTable, started_at: Instant) -> Self {
        Self {
            bindings,
            started_at,
            last_trigger: None,
            arm_delay: DEFAULT_ARM_DELAY,
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_arm_delay(mut self, arm_delay: Duration) -> Self {
        self.arm_delay = arm_delay;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn last_trigger(&self) -> Option<Instant> {
        self.last_trigger
    }

    /// Decide what to do with a detection of `keyword_index` at `now`.
    ///
    /// Only `Accept` updates the cooldown reference; ignored detections leave
    /// the gate untouched.
    pub fn evaluate(&mut self, keyword_index: usize, now: Instant) -> GateDecision {
        let Some(binding) = self.bindings.get(keyword_index) else {
            return GateDecision::IgnoreUnbound;
        };

        if now.saturating_duration_since(self.started_at) < self.arm_delay {
            return GateDecision::IgnoreArming;
        }

        if let Some(last) = self.last_trigger {
            if now.saturating_duration_since(last) < self.cooldown {
                return GateDecision::IgnoreCooldown;
            }
        }

        self.last_trigger = Some(now);
        GateDecision::Accept(binding.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::Action;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn gate(t0: Instant) -> TriggerGate {
        TriggerGate::new(BindingTable::default(), t0)
    }

    #[test]
    fn test_accept_after_arming() {
        let t0 = Instant::now();
        let mut gate = gate(t0);
        match gate.evaluate(0, t0 + secs(3.0)) {
            GateDecision::Accept(binding) => assert_eq!(binding.action, Action::EnterCall),
            other => panic!("expected accept, got {:?}", other),
        }
        assert_eq!(gate.last_trigger(), Some(t0 + secs(3.0)));
    }

    #[test]
    fn test_arming_window() {
        let t0 = Instant::now();
        let mut gate = gate(t0);
        assert_eq!(gate.evaluate(0, t0 + secs(1.999)), GateDecision::IgnoreArming);
        assert_eq!(gate.last_trigger(), None);
        assert!(matches!(gate.evaluate(0, t0 + secs(2.0)), GateDecision::Accept(_)));
    }

    #[test]
    fn test_cooldown_is_global() {
        let t0 = Instant::now();
        let mut gate = gate(t0);
        assert!(matches!(gate.evaluate(0, t0 + secs(3.0)), GateDecision::Accept(_)));
        // A different keyword is still inside the same cooldown
        assert_eq!(gate.evaluate(1, t0 + secs(3.8)), GateDecision::IgnoreCooldown);
        assert_eq!(gate.last_trigger(), Some(t0 + secs(3.0)));
        assert!(matches!(gate.evaluate(1, t0 + secs(4.5)), GateDecision::Accept(_)));
    }

    #[test]
    fn test_unbound_checked_first() {
        let t0 = Instant::now();
        let mut gate = gate(t0);
        assert_eq!(gate.evaluate(7, t0), GateDecision::IgnoreUnbound);
        assert_eq!(gate.evaluate(7, t0 + secs(10.0)), GateDecision::IgnoreUnbound);
    }

    #[test]
    fn test_zero_delays_accept_immediately() {
        let t0 = Instant::now();
        let mut gate = gate(t0)
            .with_arm_delay(Duration::ZERO)
            .with_cooldown(Duration::ZERO);
        assert!(matches!(gate.evaluate(0, t0), GateDecision::Accept(_)));
        assert!(matches!(gate.evaluate(0, t0), GateDecision::Accept(_)));
    }
}
