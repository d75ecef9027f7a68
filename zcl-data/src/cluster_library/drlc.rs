//! # Demand Response and Load Control Cluster

use core::convert::TryFrom;

use crate::pack::{Pack, Reader, Writer};
use crate::Error;

/// DRLC client attribute, utility enrollment group
pub const ATTR_UTILITY_ENROLLMENT_GROUP: u16 = 0x0000;
/// DRLC client attribute, start randomization in minutes
pub const ATTR_START_RANDOMIZATION_MINUTES: u16 = 0x0001;
/// DRLC client attribute, duration randomization in minutes
pub const ATTR_DURATION_RANDOMIZATION_MINUTES: u16 = 0x0002;
/// DRLC client attribute, device class
pub const ATTR_DEVICE_CLASS_VALUE: u16 = 0x0003;

/// Default start randomization, minutes
pub const DEFAULT_START_RANDOMIZATION_MINUTES: u8 = 0x1e;
/// Upper limit of the randomization attributes, minutes
pub const MAX_RANDOMIZATION_MINUTES: u8 = 0x3c;

/// Cluster revision implemented
pub const CLUSTER_REVISION: u16 = 0x0002;

/// Start time meaning "now"
pub const START_NOW: u32 = 0x0000_0000;
/// Highest criticality level
pub const MAX_CRITICALITY_LEVEL: u8 = 0x09;

/// Optional temperature offset not present
pub const OFFSET_NOT_USED: u8 = 0xff;
/// Optional temperature set point not present
pub const SET_POINT_NOT_USED: i16 = i16::MIN;
/// Optional average load adjustment not present
pub const LOAD_ADJUSTMENT_NOT_USED: i8 = i8::MIN;
/// Optional duty cycle not present
pub const DUTY_CYCLE_NOT_USED: u8 = 0xff;

/// Server command, load control event
pub const CMD_LOAD_CONTROL_EVENT: u8 = 0x00;
/// Server command, cancel load control event
pub const CMD_CANCEL_LOAD_CONTROL_EVENT: u8 = 0x01;
/// Server command, cancel all load control events
pub const CMD_CANCEL_ALL_LOAD_CONTROL_EVENTS: u8 = 0x02;
/// Client command, report event status
pub const CMD_REPORT_EVENT_STATUS: u8 = 0x00;
/// Client command, get scheduled events
pub const CMD_GET_SCHEDULED_EVENTS: u8 = 0x01;

/// Size of the signature of a report event status command
pub const SIGNATURE_LENGTH: usize = 42;

bitflags! {
    /// Device classes addressed by an event
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DeviceClass: u16 {
        /// HVAC compressor or furnace
        const HVAC = 1 << 0;
        /// Strip and baseboard heaters
        const STRIP_HEATER = 1 << 1;
        /// Water heater
        const WATER_HEATER = 1 << 2;
        /// Pool pump, spa or jacuzzi
        const POOL_PUMP = 1 << 3;
        /// Smart appliances
        const SMART_APPLIANCE = 1 << 4;
        /// Irrigation pump
        const IRRIGATION_PUMP = 1 << 5;
        /// Managed commercial and industrial loads
        const MANAGED_LOADS = 1 << 6;
        /// Simple residential on/off loads
        const SIMPLE_LOADS = 1 << 7;
        /// Exterior lighting
        const EXTERIOR_LIGHTING = 1 << 8;
        /// Interior lighting
        const INTERIOR_LIGHTING = 1 << 9;
        /// Electric vehicle
        const ELECTRIC_VEHICLE = 1 << 10;
        /// Generation systems
        const GENERATION_SYSTEMS = 1 << 11;
    }
}

bitflags! {
    /// Event control field of a load control event
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EventControl: u8 {
        /// Randomize the start time
        const RANDOMIZE_START = 1 << 0;
        /// Randomize the end time
        const RANDOMIZE_END = 1 << 1;
    }
}

bitflags! {
    /// Cancel control field
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CancelControl: u8 {
        /// Run to the end of the randomized period before cancelling
        const GRACEFUL = 1 << 0;
    }
}

extended_enum!(
    /// Event status reported by the client
    EventStatus, u8,
    /// Load control event command received
    LoadControlEventReceived => 0x01,
    /// Event started
    EventStarted => 0x02,
    /// Event completed
    EventCompleted => 0x03,
    /// User has chosen to opt out
    OptOut => 0x04,
    /// User has chosen to opt in
    OptIn => 0x05,
    /// Event has been cancelled
    EventCancelled => 0x06,
    /// Event has been superseded
    EventSuperseded => 0x07,
    /// Event partially completed with user opt out
    PartiallyOptOut => 0x08,
    /// Event partially completed due to user opt in
    PartiallyOptIn => 0x09,
    /// Event completed without user participation
    CompletedNoUser => 0x0a,
    /// Rejected, invalid cancel command
    RejectedInvalidCancelCommand => 0xf8,
    /// Rejected, invalid effective time of cancel command
    RejectedInvalidEffectiveTime => 0xf9,
    /// Rejected, the event had expired when received
    RejectedExpired => 0xfb,
    /// Rejected, cancel of an undefined event
    RejectedUndefinedEvent => 0xfd,
    /// Load control event rejected
    Rejected => 0xfe,
);

extended_enum!(
    /// Signature type of a report event status command
    SignatureType, u8,
    /// No signature
    NoSignature => 0x00,
    /// ECDSA signature
    Ecdsa => 0x01,
);

/// Load control event
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadControlEvent {
    /// Issuer event identifier
    pub issuer_event_id: u32,
    /// Device classes the event applies to
    pub device_class: DeviceClass,
    /// Utility enrollment group, zero for all groups
    pub utility_enrollment_group: u8,
    /// Start time, UTC seconds, zero for now
    pub start_time: u32,
    /// Duration in minutes
    pub duration: u16,
    /// Criticality level
    pub criticality_level: u8,
    /// Cooling temperature offset, 0.1 degrees
    pub cooling_temperature_offset: u8,
    /// Heating temperature offset, 0.1 degrees
    pub heating_temperature_offset: u8,
    /// Cooling temperature set point, 0.01 degrees
    pub cooling_temperature_set_point: i16,
    /// Heating temperature set point, 0.01 degrees
    pub heating_temperature_set_point: i16,
    /// Average load adjustment percentage
    pub average_load_adjustment_percentage: i8,
    /// Duty cycle percentage
    pub duty_cycle: u8,
    /// Event control
    pub event_control: EventControl,
}

impl Default for LoadControlEvent {
    fn default() -> Self {
        Self {
            issuer_event_id: 0,
            device_class: DeviceClass::empty(),
            utility_enrollment_group: 0,
            start_time: START_NOW,
            duration: 0,
            criticality_level: 1,
            cooling_temperature_offset: OFFSET_NOT_USED,
            heating_temperature_offset: OFFSET_NOT_USED,
            cooling_temperature_set_point: SET_POINT_NOT_USED,
            heating_temperature_set_point: SET_POINT_NOT_USED,
            average_load_adjustment_percentage: LOAD_ADJUSTMENT_NOT_USED,
            duty_cycle: DUTY_CYCLE_NOT_USED,
            event_control: EventControl::empty(),
        }
    }
}

impl Pack<LoadControlEvent, Error> for LoadControlEvent {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u32(self.issuer_event_id)?;
        writer.write_u16(self.device_class.bits())?;
        writer.write_u8(self.utility_enrollment_group)?;
        writer.write_u32(self.start_time)?;
        writer.write_u16(self.duration)?;
        writer.write_u8(self.criticality_level)?;
        writer.write_u8(self.cooling_temperature_offset)?;
        writer.write_u8(self.heating_temperature_offset)?;
        writer.write_i16(self.cooling_temperature_set_point)?;
        writer.write_i16(self.heating_temperature_set_point)?;
        writer.write_i8(self.average_load_adjustment_percentage)?;
        writer.write_u8(self.duty_cycle)?;
        writer.write_u8(self.event_control.bits())?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let event = Self {
            issuer_event_id: reader.read_u32()?,
            device_class: DeviceClass::from_bits_retain(reader.read_u16()?),
            utility_enrollment_group: reader.read_u8()?,
            start_time: reader.read_u32()?,
            duration: reader.read_u16()?,
            criticality_level: reader.read_u8()?,
            cooling_temperature_offset: reader.read_u8()?,
            heating_temperature_offset: reader.read_u8()?,
            cooling_temperature_set_point: reader.read_i16()?,
            heating_temperature_set_point: reader.read_i16()?,
            average_load_adjustment_percentage: reader.read_i8()?,
            duty_cycle: reader.read_u8()?,
            event_control: EventControl::from_bits_truncate(reader.read_u8()?),
        };
        Ok((event, reader.position()))
    }
}

/// Cancel load control event
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CancelLoadControlEvent {
    /// Issuer event identifier
    pub issuer_event_id: u32,
    /// Device classes
    pub device_class: DeviceClass,
    /// Utility enrollment group
    pub utility_enrollment_group: u8,
    /// Cancel control
    pub cancel_control: CancelControl,
    /// Time of the cancellation, UTC seconds, zero for now
    pub effective_time: u32,
}

impl Pack<CancelLoadControlEvent, Error> for CancelLoadControlEvent {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u32(self.issuer_event_id)?;
        writer.write_u16(self.device_class.bits())?;
        writer.write_u8(self.utility_enrollment_group)?;
        writer.write_u8(self.cancel_control.bits())?;
        writer.write_u32(self.effective_time)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let cancel = Self {
            issuer_event_id: reader.read_u32()?,
            device_class: DeviceClass::from_bits_retain(reader.read_u16()?),
            utility_enrollment_group: reader.read_u8()?,
            cancel_control: CancelControl::from_bits_truncate(reader.read_u8()?),
            effective_time: reader.read_u32()?,
        };
        Ok((cancel, reader.position()))
    }
}

/// Cancel all load control events
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CancelAllLoadControlEvents {
    /// Cancel control
    pub cancel_control: CancelControl,
}

impl Pack<CancelAllLoadControlEvents, Error> for CancelAllLoadControlEvents {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(self.cancel_control.bits())?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let cancel_control = CancelControl::from_bits_truncate(reader.read_u8()?);
        Ok((Self { cancel_control }, reader.position()))
    }
}

/// Report event status
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReportEventStatus {
    /// Issuer event identifier
    pub issuer_event_id: u32,
    /// New status
    pub event_status: EventStatus,
    /// Time of the status change, UTC seconds
    pub event_status_time: u32,
    /// Criticality level applied
    pub criticality_level_applied: u8,
    /// Cooling temperature set point applied
    pub cooling_temperature_set_point_applied: i16,
    /// Heating temperature set point applied
    pub heating_temperature_set_point_applied: i16,
    /// Average load adjustment percentage applied
    pub average_load_adjustment_percentage_applied: i8,
    /// Duty cycle applied
    pub duty_cycle_applied: u8,
    /// Event control of the event
    pub event_control: EventControl,
    /// Signature type
    pub signature_type: SignatureType,
    /// Signature, zero when not signed
    pub signature: [u8; SIGNATURE_LENGTH],
}

impl ReportEventStatus {
    /// Unsigned status report with the optional fields unused
    pub fn new(issuer_event_id: u32, event_status: EventStatus, event_status_time: u32) -> Self {
        Self {
            issuer_event_id,
            event_status,
            event_status_time,
            criticality_level_applied: 0,
            cooling_temperature_set_point_applied: SET_POINT_NOT_USED,
            heating_temperature_set_point_applied: SET_POINT_NOT_USED,
            average_load_adjustment_percentage_applied: LOAD_ADJUSTMENT_NOT_USED,
            duty_cycle_applied: DUTY_CYCLE_NOT_USED,
            event_control: EventControl::empty(),
            signature_type: SignatureType::NoSignature,
            signature: [0u8; SIGNATURE_LENGTH],
        }
    }

    /// Fill the applied fields from an event
    pub fn applied(mut self, event: &LoadControlEvent) -> Self {
        self.criticality_level_applied = event.criticality_level;
        self.cooling_temperature_set_point_applied = event.cooling_temperature_set_point;
        self.heating_temperature_set_point_applied = event.heating_temperature_set_point;
        self.average_load_adjustment_percentage_applied = event.average_load_adjustment_percentage;
        self.duty_cycle_applied = event.duty_cycle;
        self.event_control = event.event_control;
        self
    }
}

impl Pack<ReportEventStatus, Error> for ReportEventStatus {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u32(self.issuer_event_id)?;
        writer.write_u8(u8::from(self.event_status))?;
        writer.write_u32(self.event_status_time)?;
        writer.write_u8(self.criticality_level_applied)?;
        writer.write_i16(self.cooling_temperature_set_point_applied)?;
        writer.write_i16(self.heating_temperature_set_point_applied)?;
        writer.write_i8(self.average_load_adjustment_percentage_applied)?;
        writer.write_u8(self.duty_cycle_applied)?;
        writer.write_u8(self.event_control.bits())?;
        writer.write_u8(u8::from(self.signature_type))?;
        writer.write_bytes(&self.signature)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let issuer_event_id = reader.read_u32()?;
        let event_status = EventStatus::try_from(reader.read_u8()?)?;
        let event_status_time = reader.read_u32()?;
        let criticality_level_applied = reader.read_u8()?;
        let cooling_temperature_set_point_applied = reader.read_i16()?;
        let heating_temperature_set_point_applied = reader.read_i16()?;
        let average_load_adjustment_percentage_applied = reader.read_i8()?;
        let duty_cycle_applied = reader.read_u8()?;
        let event_control = EventControl::from_bits_truncate(reader.read_u8()?);
        let signature_type = SignatureType::try_from(reader.read_u8()?)?;
        let mut signature = [0u8; SIGNATURE_LENGTH];
        signature.copy_from_slice(reader.read_bytes(SIGNATURE_LENGTH)?);
        Ok((
            Self {
                issuer_event_id,
                event_status,
                event_status_time,
                criticality_level_applied,
                cooling_temperature_set_point_applied,
                heating_temperature_set_point_applied,
                average_load_adjustment_percentage_applied,
                duty_cycle_applied,
                event_control,
                signature_type,
                signature,
            },
            reader.position(),
        ))
    }
}

/// Get scheduled events
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GetScheduledEvents {
    /// Earliest start time of interest, UTC seconds
    pub start_time: u32,
    /// Maximum number of events, zero for all
    pub number_of_events: u8,
    /// Only events with this identifier
    pub issuer_event_id: Option<u32>,
}

impl Pack<GetScheduledEvents, Error> for GetScheduledEvents {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u32(self.start_time)?;
        writer.write_u8(self.number_of_events)?;
        if let Some(issuer_event_id) = self.issuer_event_id {
            writer.write_u32(issuer_event_id)?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let start_time = reader.read_u32()?;
        let number_of_events = reader.read_u8()?;
        let issuer_event_id = if reader.remaining() >= 4 {
            Some(reader.read_u32()?)
        } else {
            None
        };
        Ok((
            Self {
                start_time,
                number_of_events,
                issuer_event_id,
            },
            reader.position(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_load_control_event() {
        let data = [
            0x78, 0x56, 0x34, 0x12, // issuer event id
            0x01, 0x00, // hvac
            0x00, // all groups
            0x00, 0x00, 0x00, 0x00, // now
            0x3c, 0x00, // 60 minutes
            0x05, // criticality
            0xff, 0xff, // offsets
            0x00, 0x80, 0x00, 0x80, // set points
            0x80, 0xff, // adjustment and duty cycle
            0x03, // randomize start and end
        ];
        let (event, used) = LoadControlEvent::unpack(&data).unwrap();
        assert_eq!(used, 23);
        assert_eq!(event.issuer_event_id, 0x1234_5678);
        assert_eq!(event.device_class, DeviceClass::HVAC);
        assert_eq!(event.duration, 60);
        assert_eq!(event.cooling_temperature_set_point, SET_POINT_NOT_USED);
        assert_eq!(event.average_load_adjustment_percentage, LOAD_ADJUSTMENT_NOT_USED);
        assert!(event.event_control.contains(EventControl::RANDOMIZE_END));
        assert_eq!(
            LoadControlEvent::unpack(&data[..22]),
            Err(Error::WrongNumberOfBytes)
        );
    }

    #[test]
    fn unpack_cancel() {
        let data = [0xef, 0xbe, 0xad, 0xde, 0xff, 0x0f, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
        let (cancel, used) = CancelLoadControlEvent::unpack(&data).unwrap();
        assert_eq!(used, 12);
        assert_eq!(cancel.issuer_event_id, 0xdead_beef);
        assert!(cancel.cancel_control.contains(CancelControl::GRACEFUL));
        assert_eq!(cancel.effective_time, 0);
    }

    #[test]
    fn pack_report_event_status() {
        let report = ReportEventStatus::new(0xdead_beef, EventStatus::RejectedUndefinedEvent, 100);
        let mut buffer = [0u8; 64];
        assert_eq!(report.pack(&mut buffer), Ok(60));
        assert_eq!(buffer[..5], [0xef, 0xbe, 0xad, 0xde, 0xfd]);
        let (unpacked, _) = ReportEventStatus::unpack(&buffer[..60]).unwrap();
        assert_eq!(unpacked.event_status, EventStatus::RejectedUndefinedEvent);
        assert_eq!(unpacked.signature, [0u8; SIGNATURE_LENGTH]);
    }

    #[test]
    fn get_scheduled_events_optional_identifier() {
        let (request, used) = GetScheduledEvents::unpack(&[0, 0, 0, 0, 2]).unwrap();
        assert_eq!(used, 5);
        assert_eq!(request.issuer_event_id, None);
        let (request, _) =
            GetScheduledEvents::unpack(&[0, 0, 0, 0, 0, 0x01, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(request.issuer_event_id, Some(1));
    }
}
