//! Application support envelope of inbound and outbound cluster library frames

use heapless::Vec;

use zcl_data::{cluster_library::ClusterIdentifier, GroupIdentifier, ShortAddress};

/// Largest cluster library frame handled, header included
pub const MAX_FRAME_SIZE: usize = 128;

/// Destination of an outbound frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    /// A single endpoint on a device
    Unicast {
        /// Short address
        address: ShortAddress,
        /// Endpoint
        endpoint: u8,
    },
    /// Every member of a group
    Group(GroupIdentifier),
}

impl Destination {
    /// Unicast destination
    pub fn unicast(address: u16, endpoint: u8) -> Self {
        Destination::Unicast {
            address: ShortAddress::new(address),
            endpoint,
        }
    }

    /// True for unicast destinations
    pub fn is_unicast(&self) -> bool {
        matches!(self, Destination::Unicast { .. })
    }
}

/// APS security applied to a frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Security {
    /// Network layer security only
    Network,
    /// APS security using a link key
    LinkKey,
}

/// Data indication delivered by the APS layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApsIndication {
    /// Short address of the sender
    pub source: ShortAddress,
    /// Endpoint of the sender
    pub source_endpoint: u8,
    /// Group the frame was sent to, none for unicast and broadcast
    pub group: Option<GroupIdentifier>,
    /// Destination endpoint, 0xff for every endpoint
    pub destination_endpoint: u8,
    /// Profile identifier
    pub profile: u16,
    /// Cluster identifier
    pub cluster: ClusterIdentifier,
    /// The sender requested an APS acknowledgement
    pub acknowledge_requested: bool,
    /// Security applied by the sender
    pub security: Security,
}

impl ApsIndication {
    /// Unicast indication with network security and no APS acknowledgement
    pub fn unicast(
        source: u16,
        source_endpoint: u8,
        destination_endpoint: u8,
        profile: u16,
        cluster: ClusterIdentifier,
    ) -> Self {
        Self {
            source: ShortAddress::new(source),
            source_endpoint,
            group: None,
            destination_endpoint,
            profile,
            cluster,
            acknowledge_requested: false,
            security: Security::Network,
        }
    }

    /// True when sent to a single device
    pub fn is_unicast(&self) -> bool {
        self.group.is_none() && self.destination_endpoint != zcl_data::cluster_library::BROADCAST_ENDPOINT
    }
}

/// Data request handed to the APS layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApsRequest {
    /// Destination
    pub destination: Destination,
    /// Source endpoint
    pub source_endpoint: u8,
    /// Profile identifier
    pub profile: u16,
    /// Cluster identifier
    pub cluster: ClusterIdentifier,
    /// Request an APS acknowledgement
    pub acknowledge_request: bool,
    /// Security to apply
    pub security: Security,
}

/// Outbound frame, envelope and serialised cluster library frame
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingFrame {
    /// Envelope
    pub request: ApsRequest,
    /// Cluster library frame
    pub payload: Vec<u8, MAX_FRAME_SIZE>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indication_kind() {
        let mut indication = ApsIndication::unicast(0x1234, 1, 1, 0x0104, 0x0006);
        assert!(indication.is_unicast());
        indication.destination_endpoint = 0xff;
        assert!(!indication.is_unicast());
        indication.destination_endpoint = 1;
        indication.group = Some(0x0001);
        assert!(!indication.is_unicast());
        assert!(Destination::unicast(0, 1).is_unicast());
        assert!(!Destination::Group(1).is_unicast());
    }
}
