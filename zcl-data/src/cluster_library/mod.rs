//! # Cluster Library (ZCL)

use core::convert::TryFrom;

mod attribute;
pub mod basic;
pub mod commands;
pub mod drlc;
pub mod energy_management;
mod frame;
pub mod groups;
pub mod keep_alive;
pub mod level_control;
pub mod on_off;
pub mod scenes;
pub mod wwah;

pub use attribute::{AttributeDataType, AttributeValue};
pub use commands::{Command, GeneralCommandIdentifier};
pub use frame::{ClusterLibraryHeader, Direction, Frame, FrameControl, FrameType};

/// 16-bit attribute identifier
pub type AttributeIdentifier = u16;
/// 16-bit cluster identifier
pub type ClusterIdentifier = u16;

/// Global attribute, cluster revision, present in every cluster
pub const ATTR_CLUSTER_REVISION: AttributeIdentifier = 0xfffd;

/// Home automation profile identifier
pub const PROFILE_HOME_AUTOMATION: u16 = 0x0104;
/// Smart energy profile identifier
pub const PROFILE_SMART_ENERGY: u16 = 0x0109;

/// Endpoint addressing every endpoint on a node
pub const BROADCAST_ENDPOINT: u8 = 0xff;

/// First cluster identifier of the manufacturer specific range
pub const MANUFACTURER_SPECIFIC_CLUSTER_START: ClusterIdentifier = 0xfc00;

/// Returns true if the cluster identifier is in the manufacturer specific range
pub fn is_manufacturer_specific_cluster(cluster: ClusterIdentifier) -> bool {
    cluster >= MANUFACTURER_SPECIFIC_CLUSTER_START
}

extended_enum!(
    /// Cluster library status codes
    ClusterLibraryStatus, u8,
    /// Operation was successful.
    Success => 0x00,
    /// Operation was not successful.
    Failure => 0x01,
    /// The sender of the command does not have authorisation to carry out this command.
    NotAuthorised => 0x7e,
    /// A reserved field/subfield/bit contains a non-zero value.
    ReservedFieldNotZero => 0x7f,
    /// The command appears to contain the wrong fields.
    MalformedCommand => 0x80,
    /// The specified cluster command is not supported on the device.
    UnsupportedClusterCommand => 0x81,
    /// The specified general command is not supported on the device.
    UnsupportedGeneralCommand => 0x82,
    /// A manufacturer specific unicast, cluster specific command was received
    /// with an unknown manufacturer code.
    UnsupportedManufacturerClusterCommand => 0x83,
    /// A manufacturer specific unicast, general command was received with an
    /// unknown manufacturer code.
    UnsupportedManufacturerGeneralCommand => 0x84,
    /// At least one field of the command contains an incorrect value.
    InvalidField => 0x85,
    /// The specified attribute does not exist on the device.
    UnsupportedAttribute => 0x86,
    /// Out of range error, or set to a reserved value.
    InvalidValue => 0x87,
    /// Attempt to write a read only attribute.
    ReadOnly => 0x88,
    /// An operation failed due to an insufficient amount of free space.
    InsufficientSpace => 0x89,
    /// An attempt to create an entry in a table failed due to a duplicate entry.
    DuplicateExists => 0x8a,
    /// The requested information could not be found.
    NotFound => 0x8b,
    /// Periodic reports cannot be issued for this attribute.
    UnreportableAttribute => 0x8c,
    /// The data type given for an attribute is incorrect.
    InvalidDataType => 0x8d,
    /// The selector for an attribute is incorrect.
    InvalidSelector => 0x8e,
    /// A request has been made to read an attribute that the requestor is not
    /// authorized to read.
    WriteOnly => 0x8f,
    /// Setting the requested values would put the device in an inconsistent state on startup.
    InconsistentStartupState => 0x90,
    /// An attempt has been made to write an attribute that is present but is
    /// defined using an out-of-band method and not over the air.
    DefinedOutOfBand => 0x91,
    /// The supplied values are inconsistent.
    Inconsistent => 0x92,
    /// The credentials presented by the device sending the command are not
    /// sufficient to perform this action.
    ActionDenied => 0x93,
    /// The exchange was aborted due to excessive response time.
    Timeout => 0x94,
    /// Failed case when a client or a server decides to abort the upgrade process.
    Abort => 0x95,
    /// Invalid OTA upgrade image.
    InvalidImage => 0x96,
    /// Server does not have data block available yet.
    WaitForData => 0x97,
    /// No OTA upgrade image available for the client.
    NoImageAvailable => 0x98,
    /// The client still requires more OTA upgrade image files.
    RequireMoreImage => 0x99,
    /// The command has been received and is being processed.
    NotificationPending => 0x9a,
    /// An operation was unsuccessful due to a hardware failure.
    HardwareFailure => 0xc0,
    /// An operation was unsuccessful due to a software failure.
    SoftwareFailure => 0xc1,
    /// An error occurred during calibration.
    CalibrationError => 0xc2,
    /// The cluster is not supported.
    UnsupportedCluster => 0xc3,
    /// Limit of attribute range reached.
    LimitReached => 0xc4,
);

impl ClusterLibraryStatus {
    /// Map status codes made obsolete by ZCL revision 8 onto their
    /// replacements
    pub fn to_zcl8(self) -> Self {
        match self {
            ClusterLibraryStatus::UnsupportedGeneralCommand
            | ClusterLibraryStatus::UnsupportedManufacturerClusterCommand
            | ClusterLibraryStatus::UnsupportedManufacturerGeneralCommand => {
                ClusterLibraryStatus::UnsupportedClusterCommand
            }
            ClusterLibraryStatus::DuplicateExists | ClusterLibraryStatus::LimitReached => {
                ClusterLibraryStatus::Success
            }
            ClusterLibraryStatus::WriteOnly => ClusterLibraryStatus::NotAuthorised,
            ClusterLibraryStatus::InconsistentStartupState
            | ClusterLibraryStatus::DefinedOutOfBand
            | ClusterLibraryStatus::ActionDenied
            | ClusterLibraryStatus::HardwareFailure
            | ClusterLibraryStatus::SoftwareFailure => ClusterLibraryStatus::Failure,
            status => status,
        }
    }

    /// Convert the status for the given status mode
    pub fn for_mode(self, mode: StatusMode) -> Self {
        match mode {
            StatusMode::Legacy => self,
            StatusMode::Zcl8 => self.to_zcl8(),
        }
    }

    /// Decode a status byte, unknown values are reported as `Failure`
    pub fn from_u8_lossy(value: u8) -> Self {
        Self::try_from(value).unwrap_or(ClusterLibraryStatus::Failure)
    }
}

/// Which set of status codes are sent to peers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusMode {
    /// Status codes are sent as produced, including the ones obsoleted by ZCL8
    Legacy,
    /// Obsolete status codes are mapped onto the ZCL8 set
    Zcl8,
}

impl Default for StatusMode {
    fn default() -> Self {
        StatusMode::Legacy
    }
}

/// Cluster identifiers known to this library
pub mod cluster {
    use super::ClusterIdentifier;

    /// Basic
    pub const BASIC: ClusterIdentifier = 0x0000;
    /// Identify
    pub const IDENTIFY: ClusterIdentifier = 0x0003;
    /// Groups
    pub const GROUPS: ClusterIdentifier = 0x0004;
    /// Scenes
    pub const SCENES: ClusterIdentifier = 0x0005;
    /// On/Off
    pub const ON_OFF: ClusterIdentifier = 0x0006;
    /// Level control
    pub const LEVEL_CONTROL: ClusterIdentifier = 0x0008;
    /// Poll control
    pub const POLL_CONTROL: ClusterIdentifier = 0x0020;
    /// Keep-alive
    pub const KEEP_ALIVE: ClusterIdentifier = 0x0025;
    /// Window covering
    pub const WINDOW_COVERING: ClusterIdentifier = 0x0102;
    /// Color control
    pub const COLOR_CONTROL: ClusterIdentifier = 0x0300;
    /// Temperature measurement
    pub const TEMPERATURE_MEASUREMENT: ClusterIdentifier = 0x0402;
    /// Demand response and load control
    pub const DEMAND_RESPONSE: ClusterIdentifier = 0x0701;
    /// Energy management
    pub const ENERGY_MANAGEMENT: ClusterIdentifier = 0x0706;
    /// Works with all hubs, manufacturer specific
    pub const WORKS_WITH_ALL_HUBS: ClusterIdentifier = 0xfc57;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn status_conversion() {
        assert_eq!(ClusterLibraryStatus::try_from(0x8b), Ok(ClusterLibraryStatus::NotFound));
        assert_eq!(ClusterLibraryStatus::try_from(0x03), Err(Error::InvalidValue));
        assert_eq!(u8::from(ClusterLibraryStatus::LimitReached), 0xc4);
        assert_eq!(
            ClusterLibraryStatus::from_u8_lossy(0x03),
            ClusterLibraryStatus::Failure
        );
    }

    #[test]
    fn zcl8_status_mapping() {
        let mode = StatusMode::Zcl8;
        assert_eq!(
            ClusterLibraryStatus::UnsupportedGeneralCommand.for_mode(mode),
            ClusterLibraryStatus::UnsupportedClusterCommand
        );
        assert_eq!(
            ClusterLibraryStatus::DuplicateExists.for_mode(mode),
            ClusterLibraryStatus::Success
        );
        assert_eq!(
            ClusterLibraryStatus::WriteOnly.for_mode(mode),
            ClusterLibraryStatus::NotAuthorised
        );
        assert_eq!(
            ClusterLibraryStatus::HardwareFailure.for_mode(mode),
            ClusterLibraryStatus::Failure
        );
        assert_eq!(
            ClusterLibraryStatus::InsufficientSpace.for_mode(mode),
            ClusterLibraryStatus::InsufficientSpace
        );
        assert_eq!(
            ClusterLibraryStatus::DuplicateExists.for_mode(StatusMode::Legacy),
            ClusterLibraryStatus::DuplicateExists
        );
    }

    #[test]
    fn manufacturer_specific_range() {
        assert!(is_manufacturer_specific_cluster(cluster::WORKS_WITH_ALL_HUBS));
        assert!(!is_manufacturer_specific_cluster(cluster::SCENES));
    }
}
