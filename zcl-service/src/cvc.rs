//! Continuous value change
//!
//! Moves an integer attribute from its current value to a target value in
//! steps of 100 ms. The span is split into a whole step per tick and a
//! remainder spread over the ticks, so exactly one value change is made per
//! tick and the last tick lands on the target value.

use heapless::Vec;

use zcl_data::cluster_library::{AttributeIdentifier, ClusterIdentifier};

use crate::timer::is_due;
use crate::Error;

/// Maximum number of transitions running at the same time
pub const MAX_TRANSITIONS: usize = 16;
/// Maximum number of transitions per endpoint
pub const MAX_TRANSITIONS_PER_ENDPOINT: usize = 4;
/// Endpoint of a free transition slot
pub const UNDEFINED: u8 = 0xff;
/// Length of a step in milliseconds
pub const TICK: u32 = 100;
/// Transition time applying the target value on the next tick
pub const TRANSITION_TIME_IMMEDIATE: u16 = 0xffff;

const MAX_EVENTS: usize = 2 * MAX_TRANSITIONS;

/// Who started a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionOwner {
    /// Level control command
    LevelControl {
        /// The on/off attribute follows the level
        with_on_off: bool,
    },
    /// Scene recall
    SceneRecall {
        /// Group
        group: u16,
        /// Scene
        scene: u8,
    },
    /// Started by the application
    Application(u32),
}

/// How a transition ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionStatus {
    /// The target value was reached
    Completed,
    /// Replaced by a new transition for the same attribute
    Cancelled,
}

/// Parameters of a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Endpoint
    pub endpoint: u8,
    /// Cluster
    pub cluster: ClusterIdentifier,
    /// Attribute
    pub attribute: AttributeIdentifier,
    /// Current value
    pub current: i64,
    /// Target value
    pub end: i64,
    /// Lowest value
    pub minimum: i64,
    /// Highest value
    pub maximum: i64,
    /// The value may wrap from maximum to minimum
    pub overlap: bool,
    /// Transition time in tenths of a second
    pub transition_time: u16,
    /// Owner
    pub owner: TransitionOwner,
}

/// Output of the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionEvent {
    /// Write `value` to the attribute
    Apply {
        /// Endpoint
        endpoint: u8,
        /// Cluster
        cluster: ClusterIdentifier,
        /// Attribute
        attribute: AttributeIdentifier,
        /// New value
        value: i64,
    },
    /// The transition has ended
    Finished {
        /// Endpoint
        endpoint: u8,
        /// Cluster
        cluster: ClusterIdentifier,
        /// Attribute
        attribute: AttributeIdentifier,
        /// Owner
        owner: TransitionOwner,
        /// Status
        status: TransitionStatus,
    },
}

#[derive(Clone, Copy, Debug)]
struct Transition {
    endpoint: u8,
    cluster: ClusterIdentifier,
    attribute: AttributeIdentifier,
    current: i64,
    end: i64,
    minimum: i64,
    maximum: i64,
    overlap: bool,
    increasing: bool,
    step: i64,
    remainder: i64,
    accumulator: i64,
    steps: i64,
    steps_left: i64,
    owner: TransitionOwner,
    next_tick: u32,
}

impl Transition {
    const FREE: Transition = Transition {
        endpoint: UNDEFINED,
        cluster: 0,
        attribute: 0,
        current: 0,
        end: 0,
        minimum: 0,
        maximum: 0,
        overlap: false,
        increasing: true,
        step: 0,
        remainder: 0,
        accumulator: 0,
        steps: 0,
        steps_left: 0,
        owner: TransitionOwner::Application(0),
        next_tick: 0,
    };

    fn is_free(&self) -> bool {
        self.endpoint == UNDEFINED
    }

    fn is_for(&self, endpoint: u8, cluster: ClusterIdentifier, attribute: AttributeIdentifier) -> bool {
        !self.is_free()
            && self.endpoint == endpoint
            && self.cluster == cluster
            && self.attribute == attribute
    }

    fn wrap(&self, value: i64) -> i64 {
        if !self.overlap {
            return value;
        }
        let range = self.maximum - self.minimum + 1;
        if value > self.maximum {
            value - range
        } else if value < self.minimum {
            value + range
        } else {
            value
        }
    }

    fn advance(&mut self) {
        let mut delta = self.step;
        self.accumulator += self.remainder;
        if self.accumulator >= self.steps {
            self.accumulator -= self.steps;
            delta += 1;
        }
        let next = if self.increasing {
            self.current + delta
        } else {
            self.current - delta
        };
        self.steps_left -= 1;
        self.current = if self.steps_left == 0 {
            self.end
        } else {
            self.wrap(next)
        };
    }

    fn finished(&self, status: TransitionStatus) -> TransitionEvent {
        TransitionEvent::Finished {
            endpoint: self.endpoint,
            cluster: self.cluster,
            attribute: self.attribute,
            owner: self.owner,
            status,
        }
    }
}

/// Distance and direction from `current` to `end`
fn span(current: i64, end: i64, minimum: i64, maximum: i64, overlap: bool) -> (i64, bool) {
    if !overlap {
        return ((end - current).abs(), end >= current);
    }
    let range = maximum - minimum + 1;
    let up = (end - current).rem_euclid(range);
    let down = range - up;
    if up <= down {
        (up, true)
    } else {
        (down, false)
    }
}

/// Transition slots
pub struct ContinuousValueChange {
    slots: [Transition; MAX_TRANSITIONS],
    events: Vec<TransitionEvent, MAX_EVENTS>,
}

impl Default for ContinuousValueChange {
    fn default() -> Self {
        Self {
            slots: [Transition::FREE; MAX_TRANSITIONS],
            events: Vec::new(),
        }
    }
}

impl ContinuousValueChange {
    /// Start a transition, a running transition of the same attribute is
    /// cancelled first
    pub fn start(&mut self, request: TransitionRequest, now: u32) -> Result<(), Error> {
        if request.endpoint == UNDEFINED || request.minimum > request.maximum {
            return Err(Error::InvalidRecord);
        }
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.is_for(request.endpoint, request.cluster, request.attribute))
        {
            let cancelled = slot.finished(TransitionStatus::Cancelled);
            *slot = Transition::FREE;
            self.push_event(cancelled);
        }
        let end = request.end.clamp(request.minimum, request.maximum);
        let current = request.current.clamp(request.minimum, request.maximum);
        if end == current {
            let mut transition = Transition::FREE;
            transition.endpoint = request.endpoint;
            transition.cluster = request.cluster;
            transition.attribute = request.attribute;
            transition.owner = request.owner;
            if request.current != current {
                self.push_event(TransitionEvent::Apply {
                    endpoint: request.endpoint,
                    cluster: request.cluster,
                    attribute: request.attribute,
                    value: current,
                });
            }
            self.push_event(transition.finished(TransitionStatus::Completed));
            return Ok(());
        }
        let on_endpoint = self
            .slots
            .iter()
            .filter(|s| s.endpoint == request.endpoint)
            .count();
        if on_endpoint >= MAX_TRANSITIONS_PER_ENDPOINT {
            return Err(Error::TableFull);
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.is_free())
            .ok_or(Error::TableFull)?;
        let (distance, increasing) = span(
            current,
            end,
            request.minimum,
            request.maximum,
            request.overlap,
        );
        let (steps, next_tick) = match request.transition_time {
            0 | TRANSITION_TIME_IMMEDIATE => (1, now),
            time => (i64::from(time), now.wrapping_add(TICK)),
        };
        *slot = Transition {
            endpoint: request.endpoint,
            cluster: request.cluster,
            attribute: request.attribute,
            current,
            end,
            minimum: request.minimum,
            maximum: request.maximum,
            overlap: request.overlap,
            increasing,
            step: distance / steps,
            remainder: distance % steps,
            accumulator: 0,
            steps,
            steps_left: steps,
            owner: request.owner,
            next_tick,
        };
        Ok(())
    }

    /// Run the ticks that are due at `now`
    pub fn tick(&mut self, now: u32) {
        let mut finished: Vec<TransitionEvent, MAX_TRANSITIONS> = Vec::new();
        let mut applied: Vec<TransitionEvent, MAX_TRANSITIONS> = Vec::new();
        for slot in self.slots.iter_mut().filter(|s| !s.is_free()) {
            let before = slot.current;
            while slot.steps_left > 0 && is_due(now, slot.next_tick) {
                slot.advance();
                slot.next_tick = slot.next_tick.wrapping_add(TICK);
            }
            if slot.current != before {
                let _ = applied.push(TransitionEvent::Apply {
                    endpoint: slot.endpoint,
                    cluster: slot.cluster,
                    attribute: slot.attribute,
                    value: slot.current,
                });
            }
            if slot.steps_left == 0 {
                let _ = finished.push(slot.finished(TransitionStatus::Completed));
                *slot = Transition::FREE;
            }
        }
        for event in applied.into_iter().chain(finished) {
            self.push_event(event);
        }
    }

    /// Stop a transition without a completion, returns its owner
    pub fn stop(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        attribute: AttributeIdentifier,
    ) -> Option<TransitionOwner> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.is_for(endpoint, cluster, attribute))?;
        let owner = slot.owner;
        *slot = Transition::FREE;
        Some(owner)
    }

    /// Stop every transition on an endpoint
    pub fn stop_endpoint(&mut self, endpoint: u8) {
        for slot in self.slots.iter_mut().filter(|s| s.endpoint == endpoint) {
            *slot = Transition::FREE;
        }
    }

    /// True if a transition is running for the attribute
    pub fn is_running(
        &self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        attribute: AttributeIdentifier,
    ) -> bool {
        self.slots
            .iter()
            .any(|s| s.is_for(endpoint, cluster, attribute))
    }

    /// True if a transition started by `owner` runs on the endpoint
    pub fn is_owner_running(&self, endpoint: u8, owner: TransitionOwner) -> bool {
        self.slots
            .iter()
            .any(|s| !s.is_free() && s.endpoint == endpoint && s.owner == owner)
    }

    /// Remaining time in tenths of a second
    pub fn remaining_time(
        &self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        attribute: AttributeIdentifier,
    ) -> u16 {
        self.slots
            .iter()
            .find(|s| s.is_for(endpoint, cluster, attribute))
            .map(|s| s.steps_left.min(i64::from(u16::MAX - 1)) as u16)
            .unwrap_or(0)
    }

    /// Next tick of any running transition
    pub fn next_deadline(&self, now: u32) -> Option<u32> {
        self.slots
            .iter()
            .filter(|s| !s.is_free())
            .map(|s| s.next_tick)
            .fold(None, |earliest, tick| {
                crate::timer::earliest(now, earliest, Some(tick))
            })
    }

    /// Take the events produced since the last call
    pub fn take_events(&mut self) -> Vec<TransitionEvent, MAX_EVENTS> {
        core::mem::take(&mut self.events)
    }

    fn push_event(&mut self, event: TransitionEvent) {
        if self.events.push(event).is_err() {
            log::warn!("Transition event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(current: i64, end: i64, transition_time: u16) -> TransitionRequest {
        TransitionRequest {
            endpoint: 1,
            cluster: 0x0008,
            attribute: 0x0000,
            current,
            end,
            minimum: 0,
            maximum: 254,
            overlap: false,
            transition_time,
            owner: TransitionOwner::LevelControl { with_on_off: false },
        }
    }

    fn values(events: &[TransitionEvent]) -> std::vec::Vec<i64> {
        events
            .iter()
            .filter_map(|e| match e {
                TransitionEvent::Apply { value, .. } => Some(*value),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn exact_final_value() {
        let mut cvc = ContinuousValueChange::default();
        cvc.start(request(0, 100, 7), 0).unwrap();
        let mut all = std::vec::Vec::new();
        for n in 1..=7 {
            cvc.tick(n * TICK);
            all.extend_from_slice(&cvc.take_events());
        }
        let applied = values(&all);
        assert_eq!(applied.len(), 7);
        assert_eq!(*applied.last().unwrap(), 100);
        assert!(applied.windows(2).all(|w| w[0] < w[1]));
        let deltas: std::vec::Vec<i64> = std::iter::once(applied[0])
            .chain(applied.windows(2).map(|w| w[1] - w[0]))
            .collect();
        assert!(deltas.iter().all(|d| *d == 14 || *d == 15));
        assert!(matches!(
            all.last(),
            Some(TransitionEvent::Finished {
                status: TransitionStatus::Completed,
                ..
            })
        ));
        assert!(!cvc.is_running(1, 0x0008, 0x0000));
    }

    #[test]
    fn decreasing_with_catch_up() {
        let mut cvc = ContinuousValueChange::default();
        cvc.start(request(200, 3, 10), 1_000).unwrap();
        assert_eq!(cvc.remaining_time(1, 0x0008, 0x0000), 10);
        cvc.tick(1_350);
        assert_eq!(values(&cvc.take_events()), [141]);
        assert_eq!(cvc.remaining_time(1, 0x0008, 0x0000), 7);
        cvc.tick(2_000);
        let events = cvc.take_events();
        assert_eq!(values(&events), [3]);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn immediate_transition() {
        let mut cvc = ContinuousValueChange::default();
        cvc.start(request(0, 100, TRANSITION_TIME_IMMEDIATE), 500)
            .unwrap();
        assert!(cvc.take_events().is_empty());
        assert_eq!(cvc.next_deadline(500), Some(500));
        cvc.tick(500);
        let events = cvc.take_events();
        assert_eq!(values(&events), [100]);
        assert!(matches!(
            events[1],
            TransitionEvent::Finished {
                status: TransitionStatus::Completed,
                ..
            }
        ));
    }

    #[test]
    fn same_value_completes_at_once() {
        let mut cvc = ContinuousValueChange::default();
        cvc.start(request(42, 42, 50), 0).unwrap();
        let events = cvc.take_events();
        assert_eq!(events.len(), 1);
        assert!(!cvc.is_running(1, 0x0008, 0x0000));
    }

    #[test]
    fn restart_cancels_previous() {
        let mut cvc = ContinuousValueChange::default();
        cvc.start(request(0, 100, 10), 0).unwrap();
        let mut second = request(0, 50, 10);
        second.owner = TransitionOwner::Application(7);
        cvc.start(second, 0).unwrap();
        let events = cvc.take_events();
        assert_eq!(
            events[..],
            [TransitionEvent::Finished {
                endpoint: 1,
                cluster: 0x0008,
                attribute: 0x0000,
                owner: TransitionOwner::LevelControl { with_on_off: false },
                status: TransitionStatus::Cancelled,
            }]
        );
        assert!(cvc.is_owner_running(1, TransitionOwner::Application(7)));
    }

    #[test]
    fn overlap_takes_short_path() {
        let mut cvc = ContinuousValueChange::default();
        let mut wrap = request(250, 4, 5);
        wrap.overlap = true;
        cvc.start(wrap, 0).unwrap();
        cvc.tick(5 * TICK);
        let events = cvc.take_events();
        assert_eq!(values(&events), [4]);
        let mut cvc = ContinuousValueChange::default();
        cvc.start(wrap, 0).unwrap();
        let mut all = std::vec::Vec::new();
        for n in 1..=5 {
            cvc.tick(n * TICK);
            all.extend_from_slice(&cvc.take_events());
        }
        assert_eq!(values(&all), [251, 253, 0, 2, 4]);
    }

    #[test]
    fn endpoint_capacity() {
        let mut cvc = ContinuousValueChange::default();
        for attribute in 0..4 {
            let mut r = request(0, 10, 10);
            r.attribute = attribute;
            cvc.start(r, 0).unwrap();
        }
        let mut r = request(0, 10, 10);
        r.attribute = 9;
        assert_eq!(cvc.start(r, 0), Err(Error::TableFull));
        assert_eq!(cvc.stop(1, 0x0008, 0), Some(TransitionOwner::LevelControl { with_on_off: false }));
        assert_eq!(cvc.stop(1, 0x0008, 0), None);
        assert!(cvc.start(r, 0).is_ok());
    }
}
