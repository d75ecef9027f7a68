//! Millisecond time stamps and deadlines
//!
//! Time stamps are monotonic milliseconds in a `u32` and wrap after roughly
//! 49 days. A deadline is due when it is less than half the range behind
//! the current time stamp.

/// Milliseconds in a second
pub const SECOND: u32 = 1_000;
/// Milliseconds in a minute
pub const MINUTE: u32 = 60 * SECOND;
/// Milliseconds in an hour
pub const HOUR: u32 = 60 * MINUTE;

/// True if `deadline` has been reached at `now`
pub fn is_due(now: u32, deadline: u32) -> bool {
    now.wrapping_sub(deadline) < u32::MAX / 2
}

/// Milliseconds left until `deadline`, zero when due
pub fn remaining(now: u32, deadline: u32) -> u32 {
    if is_due(now, deadline) {
        0
    } else {
        deadline.wrapping_sub(now)
    }
}

/// Keep the earliest of two optional deadlines
pub fn earliest(now: u32, a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => {
            if remaining(now, a) <= remaining(now, b) {
                Some(a)
            } else {
                Some(b)
            }
        }
        (a, None) => a,
        (None, b) => b,
    }
}

/// UTC clock, seconds since 2000-01-01, derived from the time stamps
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UtcClock {
    utc: u32,
    reference: u32,
}

impl UtcClock {
    /// Set the UTC time at the time stamp `now`
    pub fn set(&mut self, utc: u32, now: u32) {
        self.utc = utc;
        self.reference = now;
    }

    /// UTC time at the time stamp `now`
    pub fn utc(&self, now: u32) -> u32 {
        self.utc
            .wrapping_add(now.wrapping_sub(self.reference) / SECOND)
    }

    /// Time stamp at which the UTC time `utc` is reached
    pub fn timestamp(&self, utc: u32, now: u32) -> u32 {
        let current = self.utc(now);
        if utc <= current {
            now
        } else {
            now.wrapping_add((utc - current).saturating_mul(SECOND))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_across_wrap() {
        assert!(is_due(100, 100));
        assert!(is_due(101, 100));
        assert!(!is_due(99, 100));
        assert!(is_due(5, u32::MAX - 5));
        assert!(!is_due(u32::MAX - 5, 5));
        assert_eq!(remaining(u32::MAX - 5, 5), 11);
    }

    #[test]
    fn earliest_deadline() {
        assert_eq!(earliest(0, Some(10), Some(5)), Some(5));
        assert_eq!(earliest(0, None, Some(5)), Some(5));
        assert_eq!(earliest(u32::MAX - 1, Some(3), Some(u32::MAX)), Some(u32::MAX));
        assert_eq!(earliest(0, None, None), None);
    }

    #[test]
    fn utc_clock() {
        let mut clock = UtcClock::default();
        clock.set(1_000, 5_000);
        assert_eq!(clock.utc(5_000), 1_000);
        assert_eq!(clock.utc(7_500), 1_002);
        assert_eq!(clock.timestamp(1_010, 5_000), 15_000);
        assert_eq!(clock.timestamp(900, 5_000), 5_000);
    }
}
