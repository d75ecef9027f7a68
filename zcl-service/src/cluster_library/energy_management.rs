//! Energy management server
//!
//! Exposes the state of the running load control event and lets a client
//! opt in or out of it.

use zcl_data::cluster_library::drlc::{EventControl, EventStatus, ReportEventStatus};
use zcl_data::cluster_library::energy_management::{
    ActionsRequired, CurrentEventStatus, LoadControlState, ManageEvent, ManagedEventStatus,
    ATTR_CONFORMANCE_LEVEL, ATTR_CURRENT_EVENT_ID, ATTR_CURRENT_EVENT_STATUS,
    ATTR_LOAD_CONTROL_STATE, ATTR_MINIMUM_CYCLE_PERIOD, ATTR_MINIMUM_OFF_TIME,
    ATTR_MINIMUM_ON_TIME, CMD_MANAGE_EVENT, CMD_REPORT_EVENT_STATUS, NO_CURRENT_EVENT,
};
use zcl_data::cluster_library::{cluster, AttributeValue, ClusterLibraryStatus};
use zcl_data::pack::Pack;

use super::{malformed, CommandResult, HandlerResult, Inbound};
use crate::attribute_store::{Access, AttributeRecord, Role};
use crate::callback::{CallbackStatus, DeviceEvent, DeviceHandler};
use crate::drlc::ScheduledEvent;
use crate::ClusterLibraryService;

/// Attributes of an energy management server
pub fn server_attributes() -> [AttributeRecord; 7] {
    [
        AttributeRecord::read_only(ATTR_LOAD_CONTROL_STATE, AttributeValue::Bitmap8(0))
            .with_access(Access::REPORTABLE),
        AttributeRecord::read_only(
            ATTR_CURRENT_EVENT_ID,
            AttributeValue::Unsigned32(NO_CURRENT_EVENT),
        )
        .with_access(Access::REPORTABLE),
        AttributeRecord::read_only(
            ATTR_CURRENT_EVENT_STATUS,
            AttributeValue::Bitmap8(CurrentEventStatus::EXTENDED_BITS_PRESENT.bits()),
        )
        .with_access(Access::REPORTABLE),
        AttributeRecord::writable(ATTR_CONFORMANCE_LEVEL, AttributeValue::Unsigned8(0))
            .with_limits(0, 0x0f)
            .with_access(Access::NON_VOLATILE),
        AttributeRecord::writable(ATTR_MINIMUM_OFF_TIME, AttributeValue::Unsigned16(0))
            .with_access(Access::NON_VOLATILE),
        AttributeRecord::writable(ATTR_MINIMUM_ON_TIME, AttributeValue::Unsigned16(0))
            .with_access(Access::NON_VOLATILE),
        AttributeRecord::writable(ATTR_MINIMUM_CYCLE_PERIOD, AttributeValue::Unsigned16(0))
            .with_access(Access::NON_VOLATILE),
    ]
}

/// Current event status bits of a running event
fn event_status(scheduled: &ScheduledEvent) -> CurrentEventStatus {
    let mut status = CurrentEventStatus::EXTENDED_BITS_PRESENT | CurrentEventStatus::EVENT_ACTIVE;
    let control = scheduled.event.event_control;
    status.set(
        CurrentEventStatus::RANDOMIZED_START_TIME,
        control.contains(EventControl::RANDOMIZE_START),
    );
    status.set(
        CurrentEventStatus::RANDOMIZED_DURATION,
        control.contains(EventControl::RANDOMIZE_END),
    );
    status.set(
        CurrentEventStatus::DEVICE_PARTICIPATING,
        scheduled.participating,
    );
    status.set(CurrentEventStatus::REDUCING_LOAD, scheduled.participating);
    status
}

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    pub(crate) fn handle_energy_management(&mut self, inbound: &Inbound) -> CommandResult {
        if inbound.header.command != CMD_MANAGE_EVENT {
            return Ok(HandlerResult::NotHandled);
        }
        let (request, _) = ManageEvent::unpack(inbound.payload).map_err(malformed)?;
        log::info!(
            "> Manage event {:08x}, {:?}",
            request.issuer_event_id,
            request.actions_required
        );
        let now = self.utc_time();
        let scheduled = self
            .drlc
            .event(request.issuer_event_id)
            .filter(|e| e.origin.endpoint == inbound.endpoint)
            .copied();
        let enrollment = self.enrollment(inbound.endpoint);
        let report = match scheduled {
            Some(scheduled)
                if enrollment
                    .matches(request.device_class, request.utility_enrollment_group) =>
            {
                let (status, _) = self.notify(
                    inbound.endpoint,
                    CallbackStatus::Ok,
                    DeviceEvent::ManageEvent {
                        issuer_event_id: request.issuer_event_id,
                        actions: request.actions_required,
                    },
                );
                if status != CallbackStatus::Ok {
                    return Err(status
                        .response_status()
                        .unwrap_or(ClusterLibraryStatus::Failure));
                }
                self.manage_event(&scheduled, request.actions_required, now)
            }
            Some(scheduled) => ReportEventStatus::new(
                request.issuer_event_id,
                EventStatus::Rejected,
                now,
            )
            .applied(&scheduled.event),
            None => ReportEventStatus::new(
                request.issuer_event_id,
                EventStatus::RejectedUndefinedEvent,
                now,
            ),
        };
        self.respond(inbound, CMD_REPORT_EVENT_STATUS, &ManagedEventStatus(report));
        self.process_load_control();
        self.refresh_energy_management(inbound.endpoint);
        Ok(HandlerResult::HandledWillRespond)
    }

    fn manage_event(
        &mut self,
        scheduled: &ScheduledEvent,
        actions: ActionsRequired,
        now: u32,
    ) -> ReportEventStatus {
        let id = scheduled.event.issuer_event_id;
        if actions.contains(ActionsRequired::OPT_OUT) {
            let _ = self.drlc.opt_out(id, now);
        } else if actions.contains(ActionsRequired::OPT_IN) {
            let _ = self.drlc.opt_in(id, now);
        }
        if actions.contains(ActionsRequired::ENABLE_DUTY_CYCLING) {
            let _ = self.drlc.set_duty_cycling(id, true);
        } else if actions.contains(ActionsRequired::DISABLE_DUTY_CYCLING) {
            let _ = self.drlc.set_duty_cycling(id, false);
        }
        let participating = self
            .drlc
            .event(id)
            .map_or(scheduled.participating, |e| e.participating);
        let status = if participating {
            EventStatus::OptIn
        } else {
            EventStatus::OptOut
        };
        ReportEventStatus::new(id, status, now).applied(&scheduled.event)
    }

    /// Mirror the running event of an endpoint into the energy management
    /// attributes
    pub(crate) fn refresh_energy_management(&mut self, endpoint: u8) {
        if self
            .store
            .cluster(endpoint, cluster::ENERGY_MANAGEMENT, Role::Server)
            .is_none()
        {
            return;
        }
        let (state, id, status) = match self.drlc.active(endpoint) {
            Some(scheduled) => {
                let mut state = LoadControlState::EVENT_IN_PROGRESS;
                state.set(LoadControlState::OTHER_LOAD_REDUCTION, scheduled.participating);
                (state, scheduled.event.issuer_event_id, event_status(scheduled))
            }
            None => (
                LoadControlState::empty(),
                NO_CURRENT_EVENT,
                CurrentEventStatus::EXTENDED_BITS_PRESENT,
            ),
        };
        let values = [
            (ATTR_LOAD_CONTROL_STATE, AttributeValue::Bitmap8(state.bits())),
            (ATTR_CURRENT_EVENT_ID, AttributeValue::Unsigned32(id)),
            (ATTR_CURRENT_EVENT_STATUS, AttributeValue::Bitmap8(status.bits())),
        ];
        for (attribute, value) in values {
            self.set_attribute(
                endpoint,
                cluster::ENERGY_MANAGEMENT,
                Role::Server,
                attribute,
                value,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drlc::{EventOrigin, EventState};
    use zcl_data::cluster_library::drlc::{DeviceClass, LoadControlEvent};
    use zcl_data::ShortAddress;

    fn scheduled(control: EventControl, participating: bool) -> ScheduledEvent {
        ScheduledEvent {
            origin: EventOrigin {
                endpoint: 1,
                server: ShortAddress::new(0),
                server_endpoint: 1,
            },
            event: LoadControlEvent {
                issuer_event_id: 7,
                device_class: DeviceClass::WATER_HEATER,
                utility_enrollment_group: 0,
                start_time: 0,
                duration: 10,
                criticality_level: 3,
                cooling_temperature_offset: 0xff,
                heating_temperature_offset: 0xff,
                cooling_temperature_set_point: i16::MIN,
                heating_temperature_set_point: i16::MIN,
                average_load_adjustment_percentage: i8::MIN,
                duty_cycle: 0xff,
                event_control: control,
            },
            effective_start: 0,
            effective_end: 600,
            state: EventState::Active,
            participating,
            duty_cycling: false,
            cancel_at: None,
        }
    }

    #[test]
    fn running_event_bits() {
        let status = event_status(&scheduled(EventControl::RANDOMIZE_START, true));
        assert!(status.contains(
            CurrentEventStatus::EVENT_ACTIVE
                | CurrentEventStatus::RANDOMIZED_START_TIME
                | CurrentEventStatus::DEVICE_PARTICIPATING
        ));
        assert!(!status.contains(CurrentEventStatus::RANDOMIZED_DURATION));
        let status = event_status(&scheduled(EventControl::empty(), false));
        assert!(!status.contains(CurrentEventStatus::DEVICE_PARTICIPATING));
        assert!(status.contains(CurrentEventStatus::EXTENDED_BITS_PRESENT));
    }

    #[test]
    fn defaults() {
        let attributes = server_attributes();
        assert_eq!(attributes[1].value, AttributeValue::Unsigned32(0xffff_ffff));
        assert!(attributes[3].access.contains(Access::WRITE));
    }
}
