//! Time and plan-id sources, injected so plan building stays reproducible.

use crate::types::PlanId;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Source of the current time.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant (millisecond precision).
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Source of globally unique plan ids.
pub trait PlanIdGenerator: Send + Sync + Debug {
    fn next_id(&self) -> PlanId;
}

/// Prefixed random 128-bit ids.
#[derive(Debug, Clone)]
pub struct RandomPlanIds {
    prefix: String,
}

impl RandomPlanIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for RandomPlanIds {
    fn default() -> Self {
        Self::new("trp_")
    }
}

impl PlanIdGenerator for RandomPlanIds {
    fn next_id(&self) -> PlanId {
        PlanId::generate(&self.prefix)
    }
}

/// `prefix1`, `prefix2`, ... Unique per instance only.
#[derive(Debug)]
pub struct SequentialPlanIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialPlanIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl PlanIdGenerator for SequentialPlanIds {
    fn next_id(&self) -> PlanId {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        PlanId::from(format!("{}{}", self.prefix, n).as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_set_and_advance() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::new(t0);
        assert_eq!(clock.now(), t0);
        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(clock.now(), t0 + chrono::Duration::seconds(90));
        clock.set(t0);
        assert_eq!(clock.now(), t0);
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialPlanIds::new("plan-");
        assert_eq!(ids.next_id().as_str(), "plan-1");
        assert_eq!(ids.next_id().as_str(), "plan-2");
    }

    #[test]
    fn test_random_ids_use_prefix() {
        let id = RandomPlanIds::new("x_").next_id();
        assert!(id.as_str().starts_with("x_"));
    }
}
