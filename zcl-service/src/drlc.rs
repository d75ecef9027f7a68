//! Load control event scheduler
//!
//! Client side calendar of load control events keyed by the issuer event
//! identifier, kept sorted. Every change of an event produces a status
//! report for the server that issued it. The server side keeps the events
//! it published to answer get scheduled events.
//!
//! Times are UTC seconds.

use heapless::Vec;
use rand::{rngs::SmallRng, Rng};

use zcl_data::cluster_library::drlc::{
    CancelControl, CancelLoadControlEvent, DeviceClass, EventControl, EventStatus,
    GetScheduledEvents, LoadControlEvent, ReportEventStatus, MAX_CRITICALITY_LEVEL, START_NOW,
};
use zcl_data::ShortAddress;

use crate::Error;

/// Maximum number of scheduled events
pub const MAX_LOAD_CONTROL_EVENTS: usize = 8;
/// Maximum number of published events
pub const MAX_PUBLISHED_EVENTS: usize = 8;
/// Maximum number of status changes waiting to be sent
pub const MAX_STATUS_CHANGES: usize = 16;

/// State of a scheduled event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventState {
    /// Waiting for the start time
    Scheduled,
    /// Running
    Active,
}

/// Where an event came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventOrigin {
    /// Local endpoint hosting the client cluster
    pub endpoint: u8,
    /// Server address
    pub server: ShortAddress,
    /// Server endpoint
    pub server_endpoint: u8,
}

/// Enrollment of this device
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Enrollment {
    /// Device classes of the device
    pub device_class: DeviceClass,
    /// Utility enrollment group
    pub utility_enrollment_group: u8,
    /// Start randomization, minutes
    pub start_randomization: u8,
    /// Duration randomization, minutes
    pub duration_randomization: u8,
}

impl Enrollment {
    /// True if an event for the classes and group applies to this device
    pub fn matches(&self, device_class: DeviceClass, group: u8) -> bool {
        self.device_class.intersects(device_class)
            && (group == 0 || group == self.utility_enrollment_group)
    }
}

/// A load control event in the calendar
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledEvent {
    /// Origin
    pub origin: EventOrigin,
    /// The event as received
    pub event: LoadControlEvent,
    /// Start after randomization
    pub effective_start: u32,
    /// End after randomization
    pub effective_end: u32,
    /// State
    pub state: EventState,
    /// The device takes part in the event
    pub participating: bool,
    /// Duty cycling is enabled
    pub duty_cycling: bool,
    /// Time of a pending cancellation
    pub cancel_at: Option<u32>,
}

/// Status report waiting to be sent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusChange {
    /// Origin of the event
    pub origin: EventOrigin,
    /// The report
    pub report: ReportEventStatus,
    /// The event, none for rejected requests of unknown events
    pub event: Option<LoadControlEvent>,
}

fn randomization(rng: &mut SmallRng, enabled: bool, minutes: u8) -> u32 {
    if enabled && minutes > 0 {
        rng.gen_range(0..=u32::from(minutes) * 60)
    } else {
        0
    }
}

/// Load control calendar
#[derive(Default)]
pub struct LoadControlScheduler {
    events: Vec<ScheduledEvent, MAX_LOAD_CONTROL_EVENTS>,
    published: Vec<LoadControlEvent, MAX_PUBLISHED_EVENTS>,
    changes: Vec<StatusChange, MAX_STATUS_CHANGES>,
}

impl LoadControlScheduler {
    fn report(
        &mut self,
        origin: EventOrigin,
        issuer_event_id: u32,
        status: EventStatus,
        event: Option<LoadControlEvent>,
        now: u32,
    ) {
        let mut report = ReportEventStatus::new(issuer_event_id, status, now);
        if let Some(event) = &event {
            report = report.applied(event);
        }
        let change = StatusChange {
            origin,
            report,
            event,
        };
        if self.changes.push(change).is_err() {
            log::warn!("Load control status change dropped, {:08x}", issuer_event_id);
        }
    }

    fn position(&self, issuer_event_id: u32) -> Result<usize, usize> {
        self.events
            .binary_search_by_key(&issuer_event_id, |e| e.event.issuer_event_id)
    }

    /// Add or replace an event
    pub fn schedule(
        &mut self,
        origin: EventOrigin,
        event: LoadControlEvent,
        enrollment: &Enrollment,
        now: u32,
        rng: &mut SmallRng,
    ) {
        let id = event.issuer_event_id;
        if !enrollment.matches(event.device_class, event.utility_enrollment_group)
            || event.criticality_level == 0
            || event.criticality_level > MAX_CRITICALITY_LEVEL
        {
            self.report(origin, id, EventStatus::Rejected, Some(event), now);
            return;
        }
        let start = if event.start_time == START_NOW {
            now
        } else {
            event.start_time
        };
        let end = start.saturating_add(u32::from(event.duration) * 60);
        if end <= now {
            self.report(origin, id, EventStatus::RejectedExpired, Some(event), now);
            return;
        }
        if let Ok(index) = self.position(id) {
            if self.events[index].event == event {
                self.report(origin, id, EventStatus::LoadControlEventReceived, Some(event), now);
                return;
            }
            self.events.remove(index);
        }
        let mut index = 0;
        while index < self.events.len() {
            let other = self.events[index];
            let overlaps = other.effective_start < end && start < other.effective_end;
            if overlaps && other.event.device_class.intersects(event.device_class) {
                self.events.remove(index);
                self.report(
                    other.origin,
                    other.event.issuer_event_id,
                    EventStatus::EventSuperseded,
                    Some(other.event),
                    now,
                );
            } else {
                index += 1;
            }
        }
        let effective_start = start.saturating_add(randomization(
            rng,
            event.event_control.contains(EventControl::RANDOMIZE_START),
            enrollment.start_randomization,
        ));
        let effective_end = effective_start
            .saturating_add(u32::from(event.duration) * 60)
            .saturating_add(randomization(
                rng,
                event.event_control.contains(EventControl::RANDOMIZE_END),
                enrollment.duration_randomization,
            ));
        let scheduled = ScheduledEvent {
            origin,
            event,
            effective_start,
            effective_end,
            state: EventState::Scheduled,
            participating: true,
            duty_cycling: false,
            cancel_at: None,
        };
        let index = match self.position(id) {
            Ok(index) | Err(index) => index,
        };
        if self.events.insert(index, scheduled).is_err() {
            self.report(origin, id, EventStatus::Rejected, Some(event), now);
            return;
        }
        self.report(origin, id, EventStatus::LoadControlEventReceived, Some(event), now);
    }

    /// Cancel an event
    pub fn cancel(
        &mut self,
        origin: EventOrigin,
        cancel: &CancelLoadControlEvent,
        enrollment: &Enrollment,
        now: u32,
        rng: &mut SmallRng,
    ) {
        let id = cancel.issuer_event_id;
        let index = match self.position(id) {
            Ok(index) => index,
            Err(_) => {
                self.report(origin, id, EventStatus::RejectedUndefinedEvent, None, now);
                return;
            }
        };
        if !enrollment.matches(cancel.device_class, cancel.utility_enrollment_group) {
            let event = self.events[index].event;
            self.report(origin, id, EventStatus::RejectedInvalidCancelCommand, Some(event), now);
            return;
        }
        self.cancel_at(index, cancel.cancel_control, cancel.effective_time, enrollment, now, rng);
    }

    /// Cancel every event
    pub fn cancel_all(
        &mut self,
        cancel_control: CancelControl,
        enrollment: &Enrollment,
        now: u32,
        rng: &mut SmallRng,
    ) {
        let ids: Vec<u32, MAX_LOAD_CONTROL_EVENTS> =
            self.events.iter().map(|e| e.event.issuer_event_id).collect();
        for id in ids {
            if let Ok(index) = self.position(id) {
                self.cancel_at(index, cancel_control, START_NOW, enrollment, now, rng);
            }
        }
    }

    fn cancel_at(
        &mut self,
        index: usize,
        cancel_control: CancelControl,
        effective_time: u32,
        enrollment: &Enrollment,
        now: u32,
        rng: &mut SmallRng,
    ) {
        let scheduled = self.events[index];
        let id = scheduled.event.issuer_event_id;
        if now >= scheduled.effective_end {
            self.events.remove(index);
            self.report(
                scheduled.origin,
                id,
                EventStatus::RejectedExpired,
                Some(scheduled.event),
                now,
            );
            return;
        }
        let effective = if effective_time == START_NOW {
            now
        } else {
            effective_time
        };
        if effective >= scheduled.effective_end {
            self.report(
                scheduled.origin,
                id,
                EventStatus::RejectedInvalidEffectiveTime,
                Some(scheduled.event),
                now,
            );
            return;
        }
        let graceful = cancel_control.contains(CancelControl::GRACEFUL)
            && scheduled
                .event
                .event_control
                .contains(EventControl::RANDOMIZE_END);
        let effective = effective.saturating_add(randomization(
            rng,
            graceful,
            enrollment.duration_randomization,
        ));
        if effective <= now {
            self.events.remove(index);
            self.report(
                scheduled.origin,
                id,
                EventStatus::EventCancelled,
                Some(scheduled.event),
                now,
            );
        } else {
            self.events[index].cancel_at = Some(effective);
        }
    }

    /// Start, complete and cancel events due at `now`, events below the
    /// conformance level are opted out when they start
    pub fn update(&mut self, now: u32, conformance_level: u8) {
        let mut index = 0;
        while index < self.events.len() {
            let scheduled = self.events[index];
            let id = scheduled.event.issuer_event_id;
            if scheduled.cancel_at.map(|at| now >= at).unwrap_or(false) {
                self.events.remove(index);
                self.report(
                    scheduled.origin,
                    id,
                    EventStatus::EventCancelled,
                    Some(scheduled.event),
                    now,
                );
                continue;
            }
            if scheduled.state == EventState::Scheduled && now >= scheduled.effective_start {
                self.events[index].state = EventState::Active;
                self.report(
                    scheduled.origin,
                    id,
                    EventStatus::EventStarted,
                    Some(scheduled.event),
                    now,
                );
                if scheduled.participating
                    && conformance_level != 0
                    && scheduled.event.criticality_level < conformance_level
                {
                    self.events[index].participating = false;
                    self.report(
                        scheduled.origin,
                        id,
                        EventStatus::OptOut,
                        Some(scheduled.event),
                        now,
                    );
                }
            }
            let scheduled = self.events[index];
            if scheduled.state == EventState::Active && now >= scheduled.effective_end {
                self.events.remove(index);
                let status = if scheduled.participating {
                    EventStatus::EventCompleted
                } else {
                    EventStatus::CompletedNoUser
                };
                self.report(scheduled.origin, id, status, Some(scheduled.event), now);
                continue;
            }
            index += 1;
        }
    }

    fn set_participation(&mut self, issuer_event_id: u32, participating: bool, now: u32) -> Result<(), EventStatus> {
        let index = self
            .position(issuer_event_id)
            .map_err(|_| EventStatus::RejectedUndefinedEvent)?;
        let scheduled = self.events[index];
        if scheduled.participating != participating {
            self.events[index].participating = participating;
            let status = if participating {
                EventStatus::OptIn
            } else {
                EventStatus::OptOut
            };
            self.report(
                scheduled.origin,
                issuer_event_id,
                status,
                Some(scheduled.event),
                now,
            );
        }
        Ok(())
    }

    /// The user opts out of an event
    pub fn opt_out(&mut self, issuer_event_id: u32, now: u32) -> Result<(), EventStatus> {
        self.set_participation(issuer_event_id, false, now)
    }

    /// The user opts in to an event
    pub fn opt_in(&mut self, issuer_event_id: u32, now: u32) -> Result<(), EventStatus> {
        self.set_participation(issuer_event_id, true, now)
    }

    /// Enable or disable duty cycling of an event
    pub fn set_duty_cycling(&mut self, issuer_event_id: u32, enabled: bool) -> Result<(), EventStatus> {
        let index = self
            .position(issuer_event_id)
            .map_err(|_| EventStatus::RejectedUndefinedEvent)?;
        self.events[index].duty_cycling = enabled;
        Ok(())
    }

    /// Find an event
    pub fn event(&self, issuer_event_id: u32) -> Option<&ScheduledEvent> {
        self.position(issuer_event_id)
            .ok()
            .map(|index| &self.events[index])
    }

    /// Events ordered by issuer event identifier
    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    /// The running event of an endpoint
    pub fn active(&self, endpoint: u8) -> Option<&ScheduledEvent> {
        self.events
            .iter()
            .find(|e| e.origin.endpoint == endpoint && e.state == EventState::Active)
    }

    /// Put back an event read from storage
    pub fn restore(&mut self, scheduled: ScheduledEvent) -> Result<(), Error> {
        match self.position(scheduled.event.issuer_event_id) {
            Ok(index) => {
                self.events[index] = scheduled;
                Ok(())
            }
            Err(index) => self
                .events
                .insert(index, scheduled)
                .map_err(|_| Error::TableFull),
        }
    }

    /// Remove every event without reports
    pub fn clear(&mut self) {
        self.events.clear();
        self.published.clear();
    }

    /// Earliest time something happens
    pub fn next_deadline(&self) -> Option<u32> {
        self.events
            .iter()
            .map(|e| {
                let transition = match e.state {
                    EventState::Scheduled => e.effective_start,
                    EventState::Active => e.effective_end,
                };
                e.cancel_at.map_or(transition, |at| at.min(transition))
            })
            .min()
    }

    /// Take the status changes produced since the last call
    pub fn take_changes(&mut self) -> Vec<StatusChange, MAX_STATUS_CHANGES> {
        core::mem::take(&mut self.changes)
    }

    /// Remember an event published by the local server
    pub fn publish(&mut self, event: LoadControlEvent) -> Result<(), Error> {
        if let Some(existing) = self
            .published
            .iter_mut()
            .find(|e| e.issuer_event_id == event.issuer_event_id)
        {
            *existing = event;
            return Ok(());
        }
        self.published.push(event).map_err(|_| Error::TableFull)
    }

    /// Published events matching a get scheduled events request, ordered by
    /// start time
    pub fn scheduled_events(&self, request: &GetScheduledEvents) -> Vec<LoadControlEvent, MAX_PUBLISHED_EVENTS> {
        let mut events: Vec<LoadControlEvent, MAX_PUBLISHED_EVENTS> = self
            .published
            .iter()
            .filter(|e| e.start_time >= request.start_time)
            .filter(|e| {
                request
                    .issuer_event_id
                    .map_or(true, |id| id == e.issuer_event_id)
            })
            .copied()
            .collect();
        events.sort_unstable_by_key(|e| e.start_time);
        if request.number_of_events != 0 {
            events.truncate(usize::from(request.number_of_events));
        }
        events
    }
}
