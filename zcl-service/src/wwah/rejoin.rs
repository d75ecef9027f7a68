//! Rejoin backoff
//!
//! After losing the network the device rejoins with a delay that doubles
//! after every attempt, capped at the maximum backoff. When the attempts of
//! a cycle are used up the device waits a long period, 15 minutes for
//! sleepy end devices and 24 hours for other devices, and starts over.

use zcl_data::cluster_library::wwah::EnableRejoinAlgorithm;

use crate::config::DeviceKind;
use crate::timer::{is_due, HOUR, MINUTE, SECOND};

/// Growth of the delay between attempts
pub const BACKOFF_RATIO: u32 = 2;
/// Wait after a full cycle for sleepy end devices
pub const SLEEPY_CYCLE_WAIT: u32 = 15 * MINUTE;
/// Wait after a full cycle for other devices
pub const CYCLE_WAIT: u32 = 24 * HOUR;

/// Rejoin parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RejoinParameters {
    /// Delay before the first attempt, seconds
    pub first_backoff: u16,
    /// Largest delay between attempts, seconds
    pub max_backoff: u16,
    /// Attempts in a cycle
    pub max_iterations: u16,
}

impl From<&EnableRejoinAlgorithm> for RejoinParameters {
    fn from(payload: &EnableRejoinAlgorithm) -> Self {
        Self {
            first_backoff: payload.fast_rejoin_first_backoff,
            max_backoff: payload.max_backoff_time,
            max_iterations: payload.max_backoff_iterations,
        }
    }
}

/// Rejoin schedule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RejoinBackoff {
    parameters: RejoinParameters,
    cycle_wait: u32,
    attempt: u16,
    next: Option<u32>,
}

impl RejoinBackoff {
    /// Schedule for the device kind
    pub fn new(parameters: RejoinParameters, kind: DeviceKind) -> Self {
        let cycle_wait = if kind == DeviceKind::SleepyEndDevice {
            SLEEPY_CYCLE_WAIT
        } else {
            CYCLE_WAIT
        };
        Self {
            parameters,
            cycle_wait,
            attempt: 0,
            next: None,
        }
    }

    /// Parameters set by the trust center
    pub fn parameters(&self) -> RejoinParameters {
        self.parameters
    }

    /// Delay before attempt `attempt` of a cycle, milliseconds
    pub fn delay(&self, attempt: u16) -> u32 {
        let maximum = u32::from(self.parameters.max_backoff) * SECOND;
        let mut delay = u32::from(self.parameters.first_backoff) * SECOND;
        for _ in 0..attempt {
            if delay >= maximum {
                break;
            }
            delay = delay.saturating_mul(BACKOFF_RATIO);
        }
        delay.min(maximum)
    }

    /// The network was lost at `now`
    pub fn start(&mut self, now: u32) {
        self.attempt = 0;
        self.next = Some(now.wrapping_add(self.delay(0)));
    }

    /// The network was joined
    pub fn stop(&mut self) {
        self.next = None;
        self.attempt = 0;
    }

    /// True while rejoining
    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// Time of the next attempt
    pub fn next_deadline(&self) -> Option<u32> {
        self.next
    }

    /// Returns the attempt number in the cycle when an attempt is due at
    /// `now` and schedules the following one
    pub fn poll(&mut self, now: u32) -> Option<u16> {
        let deadline = self.next?;
        if !is_due(now, deadline) {
            return None;
        }
        let attempt = self.attempt;
        self.attempt += 1;
        if self.attempt >= self.parameters.max_iterations.max(1) {
            self.attempt = 0;
            self.next = Some(
                deadline
                    .wrapping_add(self.cycle_wait)
                    .wrapping_add(self.delay(0)),
            );
        } else {
            self.next = Some(deadline.wrapping_add(self.delay(self.attempt)));
        }
        Some(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameters() -> RejoinParameters {
        RejoinParameters {
            first_backoff: 10,
            max_backoff: 600,
            max_iterations: 8,
        }
    }

    #[test]
    fn sleepy_schedule() {
        let mut backoff = RejoinBackoff::new(parameters(), DeviceKind::SleepyEndDevice);
        backoff.start(0);
        let mut attempts = std::vec::Vec::new();
        let mut now = 0;
        while attempts.len() < 9 {
            let deadline = backoff.next_deadline().unwrap();
            assert_eq!(backoff.poll(deadline.wrapping_sub(1)), None);
            now = deadline;
            backoff.poll(now).unwrap();
            attempts.push(now / SECOND);
        }
        assert_eq!(attempts, [10, 30, 70, 150, 310, 630, 1230, 1830, 2740]);
        assert_eq!(now, 2_740_000);
    }

    #[test]
    fn router_waits_a_day() {
        let mut backoff = RejoinBackoff::new(
            RejoinParameters {
                first_backoff: 1,
                max_backoff: 4,
                max_iterations: 2,
            },
            DeviceKind::Router,
        );
        backoff.start(0);
        assert_eq!(backoff.poll(1_000), Some(0));
        assert_eq!(backoff.poll(3_000), Some(1));
        assert_eq!(backoff.next_deadline(), Some(3_000 + CYCLE_WAIT + 1_000));
        backoff.stop();
        assert!(!backoff.is_running());
        assert_eq!(backoff.poll(u32::MAX / 4), None);
    }
}
