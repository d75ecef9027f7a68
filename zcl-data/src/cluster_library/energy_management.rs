//! # Energy Management Cluster

use core::convert::TryFrom;

use crate::cluster_library::drlc::{DeviceClass, EventControl, EventStatus, ReportEventStatus};
use crate::pack::{Pack, Reader, Writer};
use crate::Error;

/// Energy management attribute, load control state
pub const ATTR_LOAD_CONTROL_STATE: u16 = 0x0000;
/// Energy management attribute, current event identifier
pub const ATTR_CURRENT_EVENT_ID: u16 = 0x0001;
/// Energy management attribute, current event status
pub const ATTR_CURRENT_EVENT_STATUS: u16 = 0x0002;
/// Energy management attribute, conformance level
pub const ATTR_CONFORMANCE_LEVEL: u16 = 0x0003;
/// Energy management attribute, minimum off time in seconds
pub const ATTR_MINIMUM_OFF_TIME: u16 = 0x0004;
/// Energy management attribute, minimum on time in seconds
pub const ATTR_MINIMUM_ON_TIME: u16 = 0x0005;
/// Energy management attribute, minimum cycle period in seconds
pub const ATTR_MINIMUM_CYCLE_PERIOD: u16 = 0x0006;

/// Current event identifier when no event is active
pub const NO_CURRENT_EVENT: u32 = 0xffff_ffff;

/// Client command, manage event
pub const CMD_MANAGE_EVENT: u8 = 0x00;
/// Server command, report event status
pub const CMD_REPORT_EVENT_STATUS: u8 = 0x00;

bitflags! {
    /// Load control state attribute
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct LoadControlState: u8 {
        /// The controlled device is turned off
        const RELAY_OPEN = 1 << 0;
        /// An event is in progress
        const EVENT_IN_PROGRESS = 1 << 1;
        /// Consumption reduced to stabilise power
        const POWER_STABILIZING = 1 << 2;
        /// Consumption reduced for another reason
        const OTHER_LOAD_REDUCTION = 1 << 3;
        /// The device is consuming
        const CURRENT_FLOW = 1 << 4;
        /// The device would consume if allowed
        const LOAD_CALL = 1 << 5;
    }
}

bitflags! {
    /// Current event status attribute
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CurrentEventStatus: u8 {
        /// The event had a randomized start time
        const RANDOMIZED_START_TIME = 1 << 0;
        /// The event has a randomized duration
        const RANDOMIZED_DURATION = 1 << 1;
        /// Always set
        const EXTENDED_BITS_PRESENT = 1 << 2;
        /// The event is active
        const EVENT_ACTIVE = 1 << 3;
        /// The device participates in the event
        const DEVICE_PARTICIPATING = 1 << 4;
        /// The device is shedding load
        const REDUCING_LOAD = 1 << 5;
        /// The device returns to normal load after the event
        const ON_AT_END_OF_EVENT = 1 << 6;
    }
}

bitflags! {
    /// Actions of a manage event command
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ActionsRequired: u8 {
        /// Opt out of the event
        const OPT_OUT = 1 << 0;
        /// Opt in to the event
        const OPT_IN = 1 << 1;
        /// Disable duty cycling
        const DISABLE_DUTY_CYCLING = 1 << 2;
        /// Enable duty cycling
        const ENABLE_DUTY_CYCLING = 1 << 3;
    }
}

/// Manage event
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManageEvent {
    /// Issuer event identifier
    pub issuer_event_id: u32,
    /// Device classes
    pub device_class: DeviceClass,
    /// Utility enrollment group
    pub utility_enrollment_group: u8,
    /// Requested actions
    pub actions_required: ActionsRequired,
}

impl Pack<ManageEvent, Error> for ManageEvent {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u32(self.issuer_event_id)?;
        writer.write_u16(self.device_class.bits())?;
        writer.write_u8(self.utility_enrollment_group)?;
        writer.write_u8(self.actions_required.bits())?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let event = Self {
            issuer_event_id: reader.read_u32()?,
            device_class: DeviceClass::from_bits_retain(reader.read_u16()?),
            utility_enrollment_group: reader.read_u8()?,
            actions_required: ActionsRequired::from_bits_truncate(reader.read_u8()?),
        };
        Ok((event, reader.position()))
    }
}

/// Report event status sent by the energy management server
///
/// Same layout as the load control report without the signature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManagedEventStatus(pub ReportEventStatus);

impl Pack<ManagedEventStatus, Error> for ManagedEventStatus {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let report = &self.0;
        let mut writer = Writer::new(data);
        writer.write_u32(report.issuer_event_id)?;
        writer.write_u8(u8::from(report.event_status))?;
        writer.write_u32(report.event_status_time)?;
        writer.write_u8(report.criticality_level_applied)?;
        writer.write_i16(report.cooling_temperature_set_point_applied)?;
        writer.write_i16(report.heating_temperature_set_point_applied)?;
        writer.write_i8(report.average_load_adjustment_percentage_applied)?;
        writer.write_u8(report.duty_cycle_applied)?;
        writer.write_u8(report.event_control.bits())?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let issuer_event_id = reader.read_u32()?;
        let event_status = EventStatus::try_from(reader.read_u8()?)?;
        let event_status_time = reader.read_u32()?;
        let mut report = ReportEventStatus::new(issuer_event_id, event_status, event_status_time);
        report.criticality_level_applied = reader.read_u8()?;
        report.cooling_temperature_set_point_applied = reader.read_i16()?;
        report.heating_temperature_set_point_applied = reader.read_i16()?;
        report.average_load_adjustment_percentage_applied = reader.read_i8()?;
        report.duty_cycle_applied = reader.read_u8()?;
        report.event_control = EventControl::from_bits_truncate(reader.read_u8()?);
        Ok((Self(report), reader.position()))
    }
}
