//! Runtime configuration of the cluster library service

use zcl_data::cluster_library::StatusMode;

/// Status code set sent to peers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StatusCompatibility {
    /// Send status codes as produced
    Legacy,
    /// Map status codes obsoleted by ZCL revision 8
    Zcl8,
}

impl From<StatusCompatibility> for StatusMode {
    fn from(value: StatusCompatibility) -> Self {
        match value {
            StatusCompatibility::Legacy => StatusMode::Legacy,
            StatusCompatibility::Zcl8 => StatusMode::Zcl8,
        }
    }
}

/// When default responses are sent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DefaultResponsePolicy {
    /// Send unless the peer disabled it, errors are always sent
    Standard,
    /// Only send default responses carrying an error
    ErrorsOnly,
    /// Never send default responses
    Never,
}

/// Kind of device, selects the rejoin floor and the parent selection rules
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeviceKind {
    /// End device with the receiver off when idle
    SleepyEndDevice,
    /// End device with the receiver on when idle
    EndDevice,
    /// Router
    Router,
}

impl DeviceKind {
    /// True for end devices
    pub fn is_end_device(self) -> bool {
        !matches!(self, DeviceKind::Router)
    }
}

/// Works with all hubs defaults
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WwahConfig {
    /// APS acknowledgements required unless the cluster is listed
    pub aps_ack_required_by_default: bool,
    /// APS link key required unless the cluster is listed
    pub aps_link_key_required_by_default: bool,
    /// Short address of the trust center
    pub trust_center_address: u16,
    /// Endpoint of the trust center hosting the keep-alive cluster
    pub trust_center_endpoint: u8,
    /// Kind of this device
    pub device_kind: DeviceKind,
    /// Lowest usable RSSI, dBm
    pub minimum_rssi: i8,
}

impl Default for WwahConfig {
    fn default() -> Self {
        Self {
            aps_ack_required_by_default: false,
            aps_link_key_required_by_default: false,
            trust_center_address: 0x0000,
            trust_center_endpoint: 0x01,
            device_kind: DeviceKind::SleepyEndDevice,
            minimum_rssi: -90,
        }
    }
}

/// Demand response and load control defaults
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DrlcConfig {
    /// Device class bits of this device
    pub device_class: u16,
    /// Utility enrollment group, zero matches every group
    pub utility_enrollment_group: u8,
}

impl Default for DrlcConfig {
    fn default() -> Self {
        Self {
            device_class: 0x0fff,
            utility_enrollment_group: 0,
        }
    }
}

/// Service configuration
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Status code set sent to peers
    pub status_mode: StatusCompatibility,
    /// When default responses are sent
    pub default_response: DefaultResponsePolicy,
    /// Transaction timeout in milliseconds
    pub transaction_timeout: u32,
    /// WWAH defaults
    pub wwah: WwahConfig,
    /// DRLC defaults
    pub drlc: DrlcConfig,
    /// Seed for the randomisation of event times and check-in jitter
    pub random_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            status_mode: StatusCompatibility::Legacy,
            default_response: DefaultResponsePolicy::Standard,
            transaction_timeout: 5_000,
            wwah: WwahConfig::default(),
            drlc: DrlcConfig::default(),
            random_seed: 0x5eed_1217,
        }
    }
}

impl Config {
    /// Status mode derived from the configuration
    pub fn status_mode(&self) -> StatusMode {
        self.status_mode.into()
    }
}
