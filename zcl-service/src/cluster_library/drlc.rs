//! Demand response and load control
//!
//! The client keeps the calendar of events received from the utility and
//! reports every state change back to the issuing server. The server side
//! publishes events and answers get scheduled events from the events it
//! published.

use zcl_data::cluster_library::drlc::{
    CancelAllLoadControlEvents, CancelLoadControlEvent, DeviceClass, GetScheduledEvents,
    LoadControlEvent, ReportEventStatus, ATTR_DEVICE_CLASS_VALUE,
    ATTR_DURATION_RANDOMIZATION_MINUTES, ATTR_START_RANDOMIZATION_MINUTES,
    ATTR_UTILITY_ENROLLMENT_GROUP, CMD_CANCEL_ALL_LOAD_CONTROL_EVENTS,
    CMD_CANCEL_LOAD_CONTROL_EVENT, CMD_GET_SCHEDULED_EVENTS, CMD_LOAD_CONTROL_EVENT,
    CMD_REPORT_EVENT_STATUS, DEFAULT_START_RANDOMIZATION_MINUTES, MAX_RANDOMIZATION_MINUTES,
};
use zcl_data::cluster_library::{
    cluster, AttributeIdentifier, AttributeValue, ClusterLibraryStatus, Direction,
};
use zcl_data::pack::Pack;

use super::{malformed, CommandResult, HandlerResult, Inbound};
use crate::aps::Destination;
use crate::attribute_store::{Access, AttributeRecord, Role, WriteOrigin, MAX_ENDPOINTS};
use crate::callback::{CallbackStatus, DeviceEvent, DeviceHandler};
use crate::config::DrlcConfig;
use crate::drlc::{Enrollment, EventOrigin};
use crate::{ClusterLibraryService, Error};

/// Highest utility enrollment group
const MAX_UTILITY_ENROLLMENT_GROUP: i64 = 0x0f;

/// Attributes of a load control client
pub fn client_attributes(config: &DrlcConfig) -> [AttributeRecord; 4] {
    let randomization = i64::from(MAX_RANDOMIZATION_MINUTES);
    [
        AttributeRecord::writable(
            ATTR_UTILITY_ENROLLMENT_GROUP,
            AttributeValue::Unsigned8(config.utility_enrollment_group),
        )
        .with_limits(0, MAX_UTILITY_ENROLLMENT_GROUP)
        .with_access(Access::NON_VOLATILE),
        AttributeRecord::writable(
            ATTR_START_RANDOMIZATION_MINUTES,
            AttributeValue::Unsigned8(DEFAULT_START_RANDOMIZATION_MINUTES),
        )
        .with_limits(0, randomization)
        .with_access(Access::NON_VOLATILE),
        AttributeRecord::writable(
            ATTR_DURATION_RANDOMIZATION_MINUTES,
            AttributeValue::Unsigned8(0),
        )
        .with_limits(0, randomization)
        .with_access(Access::NON_VOLATILE),
        AttributeRecord::writable(
            ATTR_DEVICE_CLASS_VALUE,
            AttributeValue::Bitmap16(config.device_class),
        )
        .with_access(Access::NON_VOLATILE),
    ]
}

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    fn client_attribute(&self, endpoint: u8, attribute: AttributeIdentifier) -> Option<i64> {
        self.store
            .read(
                endpoint,
                cluster::DEMAND_RESPONSE,
                Role::Client,
                attribute,
                None,
                WriteOrigin::Local,
            )
            .ok()
            .and_then(AttributeValue::as_integer)
    }

    /// Enrollment of a load control client endpoint
    pub(crate) fn enrollment(&self, endpoint: u8) -> Enrollment {
        let config = &self.config.drlc;
        let device_class = self
            .client_attribute(endpoint, ATTR_DEVICE_CLASS_VALUE)
            .map_or(config.device_class, |v| v as u16);
        let utility_enrollment_group = self
            .client_attribute(endpoint, ATTR_UTILITY_ENROLLMENT_GROUP)
            .map_or(config.utility_enrollment_group, |v| v as u8);
        Enrollment {
            device_class: DeviceClass::from_bits_retain(device_class),
            utility_enrollment_group,
            start_randomization: self
                .client_attribute(endpoint, ATTR_START_RANDOMIZATION_MINUTES)
                .map_or(DEFAULT_START_RANDOMIZATION_MINUTES, |v| v as u8),
            duration_randomization: self
                .client_attribute(endpoint, ATTR_DURATION_RANDOMIZATION_MINUTES)
                .map_or(0, |v| v as u8),
        }
    }

    pub(crate) fn handle_load_control_client(&mut self, inbound: &Inbound) -> CommandResult {
        let origin = EventOrigin {
            endpoint: inbound.endpoint,
            server: inbound.indication.source,
            server_endpoint: inbound.indication.source_endpoint,
        };
        let enrollment = self.enrollment(inbound.endpoint);
        let now = self.utc_time();
        match inbound.header.command {
            CMD_LOAD_CONTROL_EVENT => {
                let (event, _) = LoadControlEvent::unpack(inbound.payload).map_err(malformed)?;
                log::info!(
                    "> Load control event {:08x} start {} duration {}",
                    event.issuer_event_id,
                    event.start_time,
                    event.duration
                );
                self.drlc
                    .schedule(origin, event, &enrollment, now, &mut self.rng);
            }
            CMD_CANCEL_LOAD_CONTROL_EVENT => {
                let (cancel, _) =
                    CancelLoadControlEvent::unpack(inbound.payload).map_err(malformed)?;
                log::info!("> Cancel load control event {:08x}", cancel.issuer_event_id);
                self.drlc
                    .cancel(origin, &cancel, &enrollment, now, &mut self.rng);
            }
            CMD_CANCEL_ALL_LOAD_CONTROL_EVENTS => {
                let (cancel, _) =
                    CancelAllLoadControlEvents::unpack(inbound.payload).map_err(malformed)?;
                log::info!("> Cancel all load control events");
                self.drlc
                    .cancel_all(cancel.cancel_control, &enrollment, now, &mut self.rng);
            }
            _ => return Ok(HandlerResult::NotHandled),
        }
        Ok(HandlerResult::HandledWillRespond)
    }

    pub(crate) fn handle_load_control_server(&mut self, inbound: &Inbound) -> CommandResult {
        match inbound.header.command {
            CMD_REPORT_EVENT_STATUS => {
                let (report, _) = ReportEventStatus::unpack(inbound.payload).map_err(malformed)?;
                log::info!(
                    "> Event {:08x} status {:?} from {}",
                    report.issuer_event_id,
                    report.event_status,
                    inbound.indication.source
                );
                let (status, _) = self.notify(
                    inbound.endpoint,
                    CallbackStatus::Ok,
                    DeviceEvent::ClusterCommand {
                        cluster: inbound.cluster(),
                        role: inbound.role,
                        header: inbound.header,
                        payload: inbound.payload,
                    },
                );
                match status.response_status() {
                    Some(ClusterLibraryStatus::Success) => Ok(HandlerResult::Handled),
                    Some(status) => Err(status),
                    None => Ok(HandlerResult::HandledWillRespond),
                }
            }
            CMD_GET_SCHEDULED_EVENTS => {
                let (request, _) = GetScheduledEvents::unpack(inbound.payload).map_err(malformed)?;
                let events = self.drlc.scheduled_events(&request);
                log::info!("> Get scheduled events, {} found", events.len());
                if events.is_empty() {
                    return Err(ClusterLibraryStatus::NotFound);
                }
                for event in events.iter() {
                    self.respond(inbound, CMD_LOAD_CONTROL_EVENT, event);
                }
                Ok(HandlerResult::HandledWillRespond)
            }
            _ => Ok(HandlerResult::NotHandled),
        }
    }

    /// Conformance level of the energy management server, zero when absent
    pub(crate) fn conformance_level(&self) -> u8 {
        use zcl_data::cluster_library::energy_management::ATTR_CONFORMANCE_LEVEL;
        self.store
            .endpoints_hosting(cluster::ENERGY_MANAGEMENT, Role::Server)
            .iter()
            .find_map(|endpoint| {
                self.store
                    .read(
                        *endpoint,
                        cluster::ENERGY_MANAGEMENT,
                        Role::Server,
                        ATTR_CONFORMANCE_LEVEL,
                        None,
                        WriteOrigin::Local,
                    )
                    .ok()
                    .and_then(AttributeValue::as_integer)
            })
            .map_or(0, |level| level as u8)
    }

    /// Send the status changes of the calendar to the issuing servers
    pub(crate) fn process_load_control(&mut self) {
        let changes = self.drlc.take_changes();
        if changes.is_empty() {
            return;
        }
        let mut touched: heapless::Vec<u8, MAX_ENDPOINTS> = heapless::Vec::new();
        for change in changes {
            let origin = change.origin;
            log::info!(
                "< Event {:08x} status {:?}",
                change.report.issuer_event_id,
                change.report.event_status
            );
            let destination = Destination::Unicast {
                address: origin.server,
                endpoint: origin.server_endpoint,
            };
            let _ = self.send(
                destination,
                origin.endpoint,
                cluster::DEMAND_RESPONSE,
                Direction::ToServer,
                None,
                CMD_REPORT_EVENT_STATUS,
                &change.report,
            );
            if let Some(event) = change.event {
                self.notify(
                    origin.endpoint,
                    CallbackStatus::Ok,
                    DeviceEvent::LoadControlEvent {
                        status: change.report.event_status,
                        event,
                    },
                );
            }
            if !touched.contains(&origin.endpoint) {
                let _ = touched.push(origin.endpoint);
            }
        }
        for endpoint in touched {
            self.refresh_energy_management(endpoint);
        }
    }

    /// Publish a load control event from a local server
    pub fn publish_event(
        &mut self,
        endpoint: u8,
        destination: Destination,
        event: LoadControlEvent,
    ) -> Result<u8, Error> {
        self.drlc.publish(event)?;
        self.send(
            destination,
            endpoint,
            cluster::DEMAND_RESPONSE,
            Direction::ToClient,
            None,
            CMD_LOAD_CONTROL_EVENT,
            &event,
        )
    }

    /// Cancel a published load control event
    pub fn cancel_event(
        &mut self,
        endpoint: u8,
        destination: Destination,
        cancel: CancelLoadControlEvent,
    ) -> Result<u8, Error> {
        self.send(
            destination,
            endpoint,
            cluster::DEMAND_RESPONSE,
            Direction::ToClient,
            None,
            CMD_CANCEL_LOAD_CONTROL_EVENT,
            &cancel,
        )
    }

    /// The user opts out of an event
    pub fn opt_out(&mut self, issuer_event_id: u32) -> Result<(), ClusterLibraryStatus> {
        let now = self.utc_time();
        self.drlc
            .opt_out(issuer_event_id, now)
            .map_err(|_| ClusterLibraryStatus::NotFound)?;
        self.process_load_control();
        Ok(())
    }

    /// The user opts in to an event
    pub fn opt_in(&mut self, issuer_event_id: u32) -> Result<(), ClusterLibraryStatus> {
        let now = self.utc_time();
        self.drlc
            .opt_in(issuer_event_id, now)
            .map_err(|_| ClusterLibraryStatus::NotFound)?;
        self.process_load_control();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_defaults() {
        let config = DrlcConfig {
            device_class: 0x0004,
            utility_enrollment_group: 3,
        };
        let attributes = client_attributes(&config);
        assert_eq!(attributes[0].value, AttributeValue::Unsigned8(3));
        assert_eq!(attributes[0].range(), Some((0, 15)));
        assert_eq!(attributes[1].value, AttributeValue::Unsigned8(0x1e));
        assert_eq!(attributes[2].range(), Some((0, 0x3c)));
        assert_eq!(attributes[3].value, AttributeValue::Bitmap16(0x0004));
    }
}
