//! Periodic trust center check-in
//!
//! The device reads the keep-alive attributes of the trust center at an
//! interval of the keep-alive base plus a random jitter. The parent is
//! considered bad after three check-ins in a row without a response.

use rand::{rngs::SmallRng, Rng};

use zcl_data::cluster_library::keep_alive::{DEFAULT_KEEP_ALIVE_BASE, DEFAULT_KEEP_ALIVE_JITTER};

use crate::timer::{is_due, MINUTE, SECOND};

/// Failed check-ins before the parent is considered bad
pub const MAX_CHECK_IN_FAILURES: u8 = 3;

/// Check-in state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckIn {
    base: u8,
    jitter: u16,
    failures: u8,
    pending: bool,
    next: Option<u32>,
}

impl Default for CheckIn {
    fn default() -> Self {
        Self {
            base: DEFAULT_KEEP_ALIVE_BASE,
            jitter: DEFAULT_KEEP_ALIVE_JITTER,
            failures: 0,
            pending: false,
            next: None,
        }
    }
}

impl CheckIn {
    /// Keep-alive base in minutes
    pub fn base(&self) -> u8 {
        self.base
    }

    /// Keep-alive jitter in seconds
    pub fn jitter(&self) -> u16 {
        self.jitter
    }

    /// Consecutive failures
    pub fn failures(&self) -> u8 {
        self.failures
    }

    /// True while check-ins are scheduled
    pub fn is_running(&self) -> bool {
        self.next.is_some() || self.pending
    }

    /// Milliseconds until the next check-in
    pub fn interval(&self, rng: &mut SmallRng) -> u32 {
        let jitter = rng.gen_range(0..=u32::from(self.jitter));
        u32::from(self.base) * MINUTE + jitter * SECOND
    }

    /// Start checking in
    pub fn start(&mut self, now: u32, rng: &mut SmallRng) {
        self.failures = 0;
        self.pending = false;
        self.next = Some(now.wrapping_add(self.interval(rng)));
    }

    /// Stop checking in
    pub fn stop(&mut self) {
        self.pending = false;
        self.next = None;
    }

    /// Time of the next check-in
    pub fn next_deadline(&self) -> Option<u32> {
        if self.pending {
            None
        } else {
            self.next
        }
    }

    /// True when a check-in shall be sent, the check-in is then pending
    /// until a response or a timeout
    pub fn poll(&mut self, now: u32) -> bool {
        match self.next {
            Some(deadline) if !self.pending && is_due(now, deadline) => {
                self.pending = true;
                true
            }
            _ => false,
        }
    }

    /// The trust center answered, base and jitter are taken from the
    /// response when present
    pub fn succeeded(&mut self, base: Option<u8>, jitter: Option<u16>, now: u32, rng: &mut SmallRng) {
        if let Some(base) = base {
            self.base = base;
        }
        if let Some(jitter) = jitter {
            self.jitter = jitter;
        }
        self.failures = 0;
        self.pending = false;
        if self.next.is_some() {
            self.next = Some(now.wrapping_add(self.interval(rng)));
        }
    }

    /// The check-in timed out, returns true when the parent is bad
    pub fn failed(&mut self, now: u32, rng: &mut SmallRng) -> bool {
        self.pending = false;
        self.failures = self.failures.saturating_add(1);
        if self.next.is_some() {
            self.next = Some(now.wrapping_add(self.interval(rng)));
        }
        if self.failures >= MAX_CHECK_IN_FAILURES {
            self.failures = 0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn interval_with_jitter() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut check_in = CheckIn::default();
        for _ in 0..32 {
            let interval = check_in.interval(&mut rng);
            assert!(interval >= 10 * MINUTE);
            assert!(interval <= 10 * MINUTE + 300 * SECOND);
        }
        check_in.succeeded(Some(1), Some(0), 0, &mut rng);
        assert_eq!(check_in.interval(&mut rng), MINUTE);
    }

    #[test]
    fn bad_parent_after_three_failures() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut check_in = CheckIn::default();
        check_in.succeeded(Some(1), Some(0), 0, &mut rng);
        check_in.start(0, &mut rng);
        assert!(!check_in.poll(MINUTE - 1));
        assert!(check_in.poll(MINUTE));
        assert!(!check_in.poll(MINUTE));
        assert_eq!(check_in.next_deadline(), None);
        assert!(!check_in.failed(MINUTE + 5_000, &mut rng));
        assert!(check_in.poll(2 * MINUTE + 5_000));
        assert!(!check_in.failed(2 * MINUTE + 10_000, &mut rng));
        assert!(check_in.poll(3 * MINUTE + 10_000));
        assert!(check_in.failed(3 * MINUTE + 15_000, &mut rng));
        assert_eq!(check_in.failures(), 0);
        assert_eq!(check_in.next_deadline(), Some(4 * MINUTE + 15_000));
    }
}
