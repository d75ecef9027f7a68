//! # Works With All Hubs Cluster
//!
//! Manufacturer specific cluster, all frames carry the manufacturer code
//! `MANUFACTURER_CODE`.

use core::convert::TryFrom;

use heapless::Vec;

use crate::cluster_library::ClusterIdentifier;
use crate::common::address::ShortAddress;
use crate::common::types::OctetString;
use crate::pack::{Pack, Reader, Writer};
use crate::Error;

/// Manufacturer code of the cluster
pub const MANUFACTURER_CODE: u16 = 0x1217;
/// Cluster revision implemented
pub const CLUSTER_REVISION: u16 = 0x0001;

/// Attribute, OTA downgrades disabled
pub const ATTR_DISABLE_OTA_DOWNGRADES: u16 = 0x0002;
/// Attribute, management leave without rejoin enabled
pub const ATTR_MGMT_LEAVE_WITHOUT_REJOIN_ENABLED: u16 = 0x0003;
/// Attribute, network retry count
pub const ATTR_NWK_RETRY_COUNT: u16 = 0x0004;
/// Attribute, MAC retry count
pub const ATTR_MAC_RETRY_COUNT: u16 = 0x0005;
/// Attribute, router check-in enabled
pub const ATTR_ROUTER_CHECK_IN_ENABLED: u16 = 0x0006;
/// Attribute, touchlink inter-PAN enabled
pub const ATTR_TOUCHLINK_INTERPAN_ENABLED: u16 = 0x0007;
/// Attribute, parent classification enabled
pub const ATTR_PARENT_CLASSIFICATION_ENABLED: u16 = 0x0008;
/// Attribute, application event retry enabled
pub const ATTR_APP_EVENT_RETRY_ENABLED: u16 = 0x0009;
/// Attribute, application event retry queue size
pub const ATTR_APP_EVENT_RETRY_QUEUE_SIZE: u16 = 0x000a;
/// Attribute, rejoin enabled
pub const ATTR_REJOIN_ENABLED: u16 = 0x000b;
/// Attribute, MAC poll failure wait time in seconds
pub const ATTR_MAC_POLL_FAILURE_WAIT_TIME: u16 = 0x000c;
/// Attribute, configuration mode enabled
pub const ATTR_CONFIGURATION_MODE_ENABLED: u16 = 0x000d;
/// Attribute, current debug report identifier
pub const ATTR_CURRENT_DEBUG_REPORT_ID: u16 = 0x000e;
/// Attribute, TC security on network key rotation enabled
pub const ATTR_TC_SECURITY_ON_NWK_KEY_ROTATION_ENABLED: u16 = 0x000f;
/// Attribute, bad parent recovery enabled
pub const ATTR_BAD_PARENT_RECOVERY_ENABLED: u16 = 0x0010;
/// Attribute, pending network update channel
pub const ATTR_PENDING_NETWORK_UPDATE_CHANNEL: u16 = 0x0011;
/// Attribute, pending network update PAN identifier
pub const ATTR_PENDING_NETWORK_UPDATE_PANID: u16 = 0x0012;
/// Attribute, OTA maximum offline duration in minutes
pub const ATTR_OTA_MAX_OFFLINE_DURATION: u16 = 0x0013;

/// Default application event retry queue size
pub const DEFAULT_APP_EVENT_RETRY_QUEUE_SIZE: u8 = 10;
/// Default MAC poll failure wait time, seconds
pub const DEFAULT_MAC_POLL_FAILURE_WAIT_TIME: u8 = 3;
/// Pending channel when no update is pending
pub const NO_PENDING_CHANNEL: u8 = 0xff;
/// Pending PAN identifier when no update is pending
pub const NO_PENDING_PANID: u16 = 0xffff;
/// Lowest network and MAC retry count
pub const MIN_RETRY_COUNT: u8 = 0x03;

/// Maximum number of clusters in a cluster list
pub const MAX_CLUSTER_LIST: usize = 10;
/// Maximum number of beacons in a survey
pub const MAX_BEACON_SURVEY: usize = 4;
/// Maximum size of debug report data in a response
pub const MAX_DEBUG_REPORT_DATA: usize = 64;

extended_enum!(
    /// Commands received by the server
    WwahCommand, u8,
    EnableApsLinkKeyAuthorization => 0x00,
    DisableApsLinkKeyAuthorization => 0x01,
    ApsLinkKeyAuthorizationQuery => 0x02,
    RequestNewApsLinkKey => 0x03,
    EnableAppEventRetryAlgorithm => 0x04,
    DisableAppEventRetryAlgorithm => 0x05,
    RequestTime => 0x06,
    EnableRejoinAlgorithm => 0x07,
    DisableRejoinAlgorithm => 0x08,
    SetIasZoneEnrollmentMethod => 0x09,
    ClearBindingTable => 0x0a,
    EnablePeriodicRouterCheckIns => 0x0b,
    DisablePeriodicRouterCheckIns => 0x0c,
    SetMacPollCcaWaitTime => 0x0d,
    SetPendingNetworkUpdate => 0x0e,
    RequireApsAcksOnUnicasts => 0x0f,
    RemoveApsAcksOnUnicastsRequirement => 0x10,
    ApsAckRequirementQuery => 0x11,
    DebugReportQuery => 0x12,
    SurveyBeacons => 0x13,
    DisableOtaDowngrades => 0x14,
    DisableMgmtLeaveWithoutRejoin => 0x15,
    DisableTouchlinkInterpanMessageSupport => 0x16,
    EnableParentClassification => 0x17,
    DisableParentClassification => 0x18,
    EnableTcSecurityOnNwkKeyRotation => 0x19,
    EnableBadParentRecovery => 0x1a,
    DisableBadParentRecovery => 0x1b,
    EnableConfigurationMode => 0x1c,
    DisableConfigurationMode => 0x1d,
    UseTrustCenterForCluster => 0x1e,
    TrustCenterForClusterServerQuery => 0x1f,
);

extended_enum!(
    /// Commands generated by the server
    WwahResponse, u8,
    ApsLinkKeyAuthorizationQueryResponse => 0x00,
    PoweringOffNotification => 0x01,
    PoweringOnNotification => 0x02,
    ShortAddressChange => 0x03,
    ApsAckRequirementQueryResponse => 0x04,
    PowerDescriptorChange => 0x05,
    NewDebugReportNotification => 0x06,
    DebugReportQueryResponse => 0x07,
    TrustCenterForClusterServerQueryResponse => 0x08,
    SurveyBeaconsResponse => 0x09,
);

extended_enum!(
    /// Reason of a powering on or off notification
    PowerNotificationReason, u8,
    Unknown => 0x00,
    Battery => 0x01,
    Brownout => 0x02,
    Watchdog => 0x03,
    ResetPin => 0x04,
    MemoryOrHardwareFault => 0x05,
    SoftwareException => 0x06,
    OtaBootloadSuccess => 0x07,
    SoftwareReset => 0x08,
    PowerButton => 0x09,
    Temperature => 0x0a,
    BootloadFailure => 0x0b,
);

/// List of cluster identifiers
pub type ClusterList = Vec<ClusterIdentifier, MAX_CLUSTER_LIST>;

/// Payload consisting of a count and a list of clusters
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterListPayload {
    /// Clusters
    pub clusters: ClusterList,
}

impl Pack<ClusterListPayload, Error> for ClusterListPayload {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(self.clusters.len() as u8)?;
        for cluster in self.clusters.iter() {
            writer.write_u16(*cluster)?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let count = reader.read_u8()?;
        let mut clusters = ClusterList::new();
        for _ in 0..count {
            clusters
                .push(reader.read_u16()?)
                .map_err(|_| Error::NotEnoughSpace)?;
        }
        Ok((Self { clusters }, reader.position()))
    }
}

/// APS link key authorization query response
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ApsLinkKeyAuthorizationQueryResponse {
    /// Cluster queried
    pub cluster: ClusterIdentifier,
    /// Whether an APS link key is required
    pub authorized: bool,
}

impl Pack<ApsLinkKeyAuthorizationQueryResponse, Error> for ApsLinkKeyAuthorizationQueryResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u16(self.cluster)?;
        writer.write_bool(self.authorized)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let cluster = reader.read_u16()?;
        let authorized = reader.read_bool()?;
        Ok((
            Self {
                cluster,
                authorized,
            },
            reader.position(),
        ))
    }
}

/// Enable application event retry algorithm
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnableAppEventRetryAlgorithm {
    /// First backoff in seconds
    pub first_backoff: u8,
    /// Common ratio of the backoff sequence
    pub common_ratio: u8,
    /// Maximum backoff in seconds
    pub max_backoff: u32,
    /// Maximum number of re-delivery attempts
    pub max_redelivery_attempts: u8,
}

impl Pack<EnableAppEventRetryAlgorithm, Error> for EnableAppEventRetryAlgorithm {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(self.first_backoff)?;
        writer.write_u8(self.common_ratio)?;
        writer.write_u32(self.max_backoff)?;
        writer.write_u8(self.max_redelivery_attempts)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let payload = Self {
            first_backoff: reader.read_u8()?,
            common_ratio: reader.read_u8()?,
            max_backoff: reader.read_u32()?,
            max_redelivery_attempts: reader.read_u8()?,
        };
        Ok((payload, reader.position()))
    }
}

/// Enable rejoin algorithm, all times in seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnableRejoinAlgorithm {
    /// Time spent on fast rejoin attempts
    pub fast_rejoin_timeout: u16,
    /// Time between rejoin attempts after the fast phase
    pub duration_between_rejoins: u16,
    /// First backoff of the fast phase
    pub fast_rejoin_first_backoff: u16,
    /// Largest backoff
    pub max_backoff_time: u16,
    /// Number of backoff iterations before falling back to the long wait
    pub max_backoff_iterations: u16,
}

impl Pack<EnableRejoinAlgorithm, Error> for EnableRejoinAlgorithm {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u16(self.fast_rejoin_timeout)?;
        writer.write_u16(self.duration_between_rejoins)?;
        writer.write_u16(self.fast_rejoin_first_backoff)?;
        writer.write_u16(self.max_backoff_time)?;
        writer.write_u16(self.max_backoff_iterations)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let payload = Self {
            fast_rejoin_timeout: reader.read_u16()?,
            duration_between_rejoins: reader.read_u16()?,
            fast_rejoin_first_backoff: reader.read_u16()?,
            max_backoff_time: reader.read_u16()?,
            max_backoff_iterations: reader.read_u16()?,
        };
        Ok((payload, reader.position()))
    }
}

/// Set pending network update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetPendingNetworkUpdate {
    /// Channel
    pub channel: u8,
    /// PAN identifier
    pub pan_id: u16,
}

impl Pack<SetPendingNetworkUpdate, Error> for SetPendingNetworkUpdate {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(self.channel)?;
        writer.write_u16(self.pan_id)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let channel = reader.read_u8()?;
        let pan_id = reader.read_u16()?;
        Ok((Self { channel, pan_id }, reader.position()))
    }
}

bitflags! {
    /// Parent classification mask carried in beacons
    ///
    /// Bit 0 is TC connectivity and bit 1 is long uptime.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ParentClassification: u8 {
        /// The parent has connectivity to the trust center
        const TC_CONNECTIVITY = 1 << 0;
        /// The parent has been up for a long time
        const LONG_UPTIME = 1 << 1;
    }
}

/// Priority when choosing a parent, higher is better
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParentPriority {
    /// No TC connectivity and short uptime, or not a WWAH parent
    VeryLow = 1,
    /// No TC connectivity and long uptime
    Low = 2,
    /// TC connectivity and short uptime
    High = 3,
    /// TC connectivity and long uptime
    VeryHigh = 4,
}

impl ParentClassification {
    /// Priority of a parent with this classification
    pub fn priority(self) -> ParentPriority {
        let tc = self.contains(ParentClassification::TC_CONNECTIVITY);
        let uptime = self.contains(ParentClassification::LONG_UPTIME);
        match (tc, uptime) {
            (true, true) => ParentPriority::VeryHigh,
            (true, false) => ParentPriority::High,
            (false, true) => ParentPriority::Low,
            (false, false) => ParentPriority::VeryLow,
        }
    }
}

/// One surveyed beacon
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeaconSurvey {
    /// Short address of the beaconing device
    pub device_short: ShortAddress,
    /// RSSI in dBm
    pub rssi: i8,
    /// Classification of the beaconing device
    pub classification: ParentClassification,
}

/// Survey beacons response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurveyBeaconsResponse {
    /// Best beacons
    pub beacons: Vec<BeaconSurvey, MAX_BEACON_SURVEY>,
}

impl Pack<SurveyBeaconsResponse, Error> for SurveyBeaconsResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(self.beacons.len() as u8)?;
        for beacon in self.beacons.iter() {
            writer.write_u16(beacon.device_short.into())?;
            writer.write_i8(beacon.rssi)?;
            writer.write_u8(beacon.classification.bits())?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let count = reader.read_u8()?;
        let mut beacons = Vec::new();
        for _ in 0..count {
            let device_short = ShortAddress::new(reader.read_u16()?);
            let rssi = reader.read_i8()?;
            let classification = ParentClassification::from_bits_truncate(reader.read_u8()?);
            beacons
                .push(BeaconSurvey {
                    device_short,
                    rssi,
                    classification,
                })
                .map_err(|_| Error::NotEnoughSpace)?;
        }
        Ok((Self { beacons }, reader.position()))
    }
}

/// Debug report query response
#[derive(Clone, Debug, PartialEq)]
pub struct DebugReportQueryResponse {
    /// Report identifier, zero when there is no report
    pub report_id: u8,
    /// Report data
    pub data: Vec<u8, MAX_DEBUG_REPORT_DATA>,
}

impl Pack<DebugReportQueryResponse, Error> for DebugReportQueryResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(self.report_id)?;
        writer.write_bytes(&self.data)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let report_id = reader.read_u8()?;
        let report = Vec::from_slice(reader.rest()).map_err(|_| Error::NotEnoughSpace)?;
        Ok((
            Self {
                report_id,
                data: report,
            },
            data.len(),
        ))
    }
}

/// Powering on or off notification
#[derive(Clone, Debug, PartialEq)]
pub struct PoweringNotification {
    /// Reason
    pub reason: PowerNotificationReason,
    /// Manufacturer of the manufacturer specific reason
    pub manufacturer_id: u16,
    /// Manufacturer specific reason
    pub manufacturer_reason: OctetString,
}

impl Pack<PoweringNotification, Error> for PoweringNotification {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(u8::from(self.reason))?;
        writer.write_u16(self.manufacturer_id)?;
        writer.write_string(&self.manufacturer_reason)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let reason = PowerNotificationReason::try_from(reader.read_u8()?)?;
        let manufacturer_id = reader.read_u16()?;
        let manufacturer_reason =
            OctetString::from_slice(reader.read_string()?).map_err(|_| Error::NotEnoughSpace)?;
        Ok((
            Self {
                reason,
                manufacturer_id,
                manufacturer_reason,
            },
            reader.position(),
        ))
    }
}

/// Short address change notification
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShortAddressChange {
    /// IEEE address of the device
    pub device_eui64: u64,
    /// New short address
    pub device_short: ShortAddress,
}

impl Pack<ShortAddressChange, Error> for ShortAddressChange {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u64(self.device_eui64)?;
        writer.write_u16(self.device_short.into())?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let device_eui64 = reader.read_u64()?;
        let device_short = ShortAddress::new(reader.read_u16()?);
        Ok((
            Self {
                device_eui64,
                device_short,
            },
            reader.position(),
        ))
    }
}

/// New debug report notification
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewDebugReportNotification {
    /// Report identifier
    pub report_id: u8,
    /// Size of the report
    pub size: u32,
}

impl Pack<NewDebugReportNotification, Error> for NewDebugReportNotification {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(self.report_id)?;
        writer.write_u32(self.size)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let report_id = reader.read_u8()?;
        let size = reader.read_u32()?;
        Ok((Self { report_id, size }, reader.position()))
    }
}

/// Power descriptor change notification
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerDescriptorChange {
    /// Current power mode
    pub current_power_mode: u32,
    /// Available power sources
    pub available_power_sources: u32,
    /// Current power source
    pub current_power_source: u32,
    /// Current power source level
    pub current_power_source_level: u32,
}

impl Pack<PowerDescriptorChange, Error> for PowerDescriptorChange {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u32(self.current_power_mode)?;
        writer.write_u32(self.available_power_sources)?;
        writer.write_u32(self.current_power_source)?;
        writer.write_u32(self.current_power_source_level)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let payload = Self {
            current_power_mode: reader.read_u32()?,
            available_power_sources: reader.read_u32()?,
            current_power_source: reader.read_u32()?,
            current_power_source_level: reader.read_u32()?,
        };
        Ok((payload, reader.position()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_cluster_list() {
        let data = [0x02, 0x06, 0x00, 0x08, 0x00];
        let (payload, used) = ClusterListPayload::unpack(&data).unwrap();
        assert_eq!(used, 5);
        assert_eq!(payload.clusters[..], [0x0006, 0x0008]);
        assert_eq!(
            ClusterListPayload::unpack(&data[..4]),
            Err(Error::WrongNumberOfBytes)
        );
    }

    #[test]
    fn too_many_clusters() {
        let mut data = [0u8; 23];
        data[0] = 11;
        assert_eq!(ClusterListPayload::unpack(&data), Err(Error::NotEnoughSpace));
    }

    #[test]
    fn unpack_rejoin_algorithm() {
        let data = [0x0a, 0x00, 0x3c, 0x00, 0x0a, 0x00, 0x58, 0x02, 0x08, 0x00];
        let (payload, used) = EnableRejoinAlgorithm::unpack(&data).unwrap();
        assert_eq!(used, 10);
        assert_eq!(payload.fast_rejoin_timeout, 10);
        assert_eq!(payload.duration_between_rejoins, 60);
        assert_eq!(payload.fast_rejoin_first_backoff, 10);
        assert_eq!(payload.max_backoff_time, 600);
        assert_eq!(payload.max_backoff_iterations, 8);
    }

    #[test]
    fn classification_priority() {
        let both = ParentClassification::TC_CONNECTIVITY | ParentClassification::LONG_UPTIME;
        assert_eq!(both.priority(), ParentPriority::VeryHigh);
        assert_eq!(
            ParentClassification::TC_CONNECTIVITY.priority(),
            ParentPriority::High
        );
        assert_eq!(ParentClassification::LONG_UPTIME.priority(), ParentPriority::Low);
        assert_eq!(ParentClassification::empty().priority(), ParentPriority::VeryLow);
        assert!(ParentPriority::High > ParentPriority::Low);
    }

    #[test]
    fn pack_survey_response() {
        let mut response = SurveyBeaconsResponse::default();
        response
            .beacons
            .push(BeaconSurvey {
                device_short: ShortAddress::new(0x1234),
                rssi: -40,
                classification: ParentClassification::all(),
            })
            .unwrap();
        let mut buffer = [0u8; 8];
        assert_eq!(response.pack(&mut buffer), Ok(5));
        assert_eq!(buffer[..5], [0x01, 0x34, 0x12, 0xd8, 0x03]);
    }

    #[test]
    fn unpack_powering_notification() {
        let data = [0x09, 0x17, 0x12, 0x02, 0xaa, 0xbb];
        let (payload, used) = PoweringNotification::unpack(&data).unwrap();
        assert_eq!(used, 6);
        assert_eq!(payload.reason, PowerNotificationReason::PowerButton);
        assert_eq!(payload.manufacturer_reason[..], [0xaa, 0xbb]);
    }
}
