//! Generation clock. Owns the run's reference time and the history window
//! every pattern anchors its first leg into.

use crate::rng::StreamRng;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_DAYS: i64 = 180;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationClock {
    pub reference_time: DateTime<Utc>,
    pub history_days: i64,
}

impl GenerationClock {
    pub fn new(reference_time: DateTime<Utc>, history_days: i64) -> Self {
        Self {
            reference_time,
            history_days: history_days.max(1),
        }
    }

    /// A start time 1..=history_days days before the reference time.
    pub fn anchor(&self, rng: &mut StreamRng) -> DateTime<Utc> {
        let days_back = rng.int_inclusive(1, self.history_days);
        self.reference_time - Duration::days(days_back)
    }

    /// Start time for activity that continues a customer's history: 1..=48
    /// hours after `last`, held at the reference time, and always later than
    /// `last`. Falls back to `anchor` for a customer with no history.
    pub fn continue_after(&self, last: Option<DateTime<Utc>>, rng: &mut StreamRng) -> DateTime<Utc> {
        let Some(last) = last else {
            return self.anchor(rng);
        };
        let next = Self::hours_after(last, 1, 48, rng).min(self.reference_time);
        if next > last {
            next
        } else {
            last + Duration::minutes(1)
        }
    }

    /// `from` shifted forward by a whole number of hours in [lo, hi].
    pub fn hours_after(from: DateTime<Utc>, lo: i64, hi: i64, rng: &mut StreamRng) -> DateTime<Utc> {
        from + Duration::hours(rng.int_inclusive(lo, hi))
    }

    /// `from` shifted forward by a whole number of days in [lo, hi].
    pub fn days_after(from: DateTime<Utc>, lo: i64, hi: i64, rng: &mut StreamRng) -> DateTime<Utc> {
        from + Duration::days(rng.int_inclusive(lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_falls_inside_history_window() {
        let now = Utc::now();
        let clock = GenerationClock::new(now, DEFAULT_HISTORY_DAYS);
        let mut rng = StreamRng::new(5, 0);
        for _ in 0..1_000 {
            let t = clock.anchor(&mut rng);
            let back = (now - t).num_days();
            assert!((1..=DEFAULT_HISTORY_DAYS).contains(&back), "{back} days back");
        }
    }

    #[test]
    fn continuation_moves_forward_and_holds_at_reference() {
        let now = Utc::now();
        let clock = GenerationClock::new(now, DEFAULT_HISTORY_DAYS);
        let mut rng = StreamRng::new(9, 0);

        let last = now - Duration::days(30);
        for _ in 0..500 {
            let t = clock.continue_after(Some(last), &mut rng);
            assert!(t > last && t <= last + Duration::hours(48));
        }

        let near = now - Duration::hours(2);
        let t = clock.continue_after(Some(near), &mut rng);
        assert!(t > near && t <= now);

        let t = clock.continue_after(Some(now), &mut rng);
        assert_eq!(t, now + Duration::minutes(1));

        let t = clock.continue_after(None, &mut rng);
        assert!((1..=DEFAULT_HISTORY_DAYS).contains(&(now - t).num_days()));
    }

    #[test]
    fn zero_history_is_clamped() {
        let clock = GenerationClock::new(Utc::now(), 0);
        assert_eq!(clock.history_days, 1);
    }
}
