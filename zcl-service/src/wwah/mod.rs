//! Works with all hubs policy
//!
//! Cluster lists set by the trust center decide which frames need an APS
//! acknowledgement or an APS link key and which clusters may only talk to
//! the trust center. A list holds the clusters whose requirement differs
//! from the current default, so with the default off the listed clusters
//! are required and with the default on they are exempt.

pub mod check_in;
pub mod parent;
pub mod rejoin;

use heapless::Vec;

use zcl_data::cluster_library::{
    cluster, wwah::ClusterList, wwah::EnableAppEventRetryAlgorithm, ClusterIdentifier,
    ClusterLibraryHeader, GeneralCommandIdentifier,
};
use zcl_data::ShortAddress;

use crate::aps::{ApsIndication, Security};
use crate::config::WwahConfig;
use crate::Error;

/// Maximum number of clusters forced through the trust center
pub const MAX_TRUST_CENTER_CLUSTERS: usize = 4;

/// Outcome of the policy check of an inbound frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Pass the frame on
    Accept,
    /// Drop without a response
    Drop,
    /// Answer with a not authorised default response
    NotAuthorized,
}

/// Device management requests subject to the policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZdoRequest {
    /// Management leave
    MgmtLeave {
        /// The device shall rejoin after leaving
        rejoin: bool,
    },
    /// Management network update
    MgmtNetworkUpdate {
        /// Channel mask of the request
        channels: u32,
    },
    /// Bind or unbind
    Bind,
    /// Management permit joining
    MgmtPermitJoining,
    /// Any other request
    Other,
}

/// Boolean settings kept in the WWAH server attributes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolicyFlags {
    /// Configuration mode enabled
    pub configuration_mode: bool,
    /// Management leave without rejoin enabled
    pub leave_without_rejoin: bool,
    /// Touchlink inter-PAN messages enabled
    pub touchlink_interpan: bool,
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self {
            configuration_mode: true,
            leave_without_rejoin: true,
            touchlink_interpan: true,
        }
    }
}

fn set_membership(list: &mut ClusterList, default: bool, cluster: ClusterIdentifier, required: bool) -> Result<(), Error> {
    let listed = list.iter().position(|c| *c == cluster);
    match (required != default, listed) {
        (true, None) => list.push(cluster).map_err(|_| Error::TableFull),
        (false, Some(index)) => {
            list.swap_remove(index);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Cluster lists of the policy
#[derive(Clone, Debug, PartialEq)]
pub struct WwahPolicy {
    /// Short address of the trust center
    pub trust_center: ShortAddress,
    /// APS acknowledgements required unless listed
    pub ack_required_by_default: bool,
    /// APS link key required unless listed
    pub link_key_required_by_default: bool,
    /// Clusters differing from the acknowledgement default
    pub ack_clusters: ClusterList,
    /// Clusters differing from the link key default
    pub link_key_clusters: ClusterList,
    /// Clusters that only talk to the trust center
    pub trust_center_clusters: Vec<ClusterIdentifier, MAX_TRUST_CENTER_CLUSTERS>,
    /// Application event retry parameters, none when disabled
    pub app_event_retry: Option<EnableAppEventRetryAlgorithm>,
}

impl WwahPolicy {
    /// Policy with the configured defaults and empty lists
    pub fn new(config: &WwahConfig) -> Self {
        Self {
            trust_center: ShortAddress::new(config.trust_center_address),
            ack_required_by_default: config.aps_ack_required_by_default,
            link_key_required_by_default: config.aps_link_key_required_by_default,
            ack_clusters: ClusterList::new(),
            link_key_clusters: ClusterList::new(),
            trust_center_clusters: Vec::new(),
            app_event_retry: None,
        }
    }

    /// True if the address is the trust center
    pub fn is_trust_center(&self, address: ShortAddress) -> bool {
        address == self.trust_center
    }

    /// True if unicast frames of the cluster need an APS acknowledgement
    pub fn requires_aps_ack(&self, cluster: ClusterIdentifier) -> bool {
        self.ack_required_by_default != self.ack_clusters.contains(&cluster)
    }

    /// True if frames of the cluster need APS link key security
    pub fn requires_aps_link_key(&self, cluster: ClusterIdentifier) -> bool {
        self.link_key_required_by_default != self.link_key_clusters.contains(&cluster)
    }

    /// True if the cluster only talks to the trust center
    pub fn must_use_trust_center_for(&self, cluster: ClusterIdentifier) -> bool {
        self.trust_center_clusters.contains(&cluster)
    }

    /// Require or exempt APS acknowledgements for the clusters
    pub fn require_aps_acks(&mut self, clusters: &[ClusterIdentifier], required: bool) -> Result<(), Error> {
        for cluster in clusters {
            set_membership(&mut self.ack_clusters, self.ack_required_by_default, *cluster, required)?;
        }
        Ok(())
    }

    /// No cluster requires APS acknowledgements
    pub fn remove_aps_ack_requirement(&mut self) {
        self.ack_required_by_default = false;
        self.ack_clusters.clear();
    }

    /// Require or exempt APS link key authorization for the clusters
    pub fn require_aps_link_key(&mut self, clusters: &[ClusterIdentifier], required: bool) -> Result<(), Error> {
        for cluster in clusters {
            set_membership(
                &mut self.link_key_clusters,
                self.link_key_required_by_default,
                *cluster,
                required,
            )?;
        }
        Ok(())
    }

    /// Clusters that may only talk to the trust center, replaces the list
    pub fn use_trust_center_for(&mut self, clusters: &[ClusterIdentifier]) -> Result<(), Error> {
        self.trust_center_clusters =
            Vec::from_slice(clusters).map_err(|_| Error::TableFull)?;
        Ok(())
    }

    /// Clusters requiring APS acknowledgements, as listed
    pub fn ack_requirement_list(&self) -> ClusterList {
        self.ack_clusters.clone()
    }

    /// Check an inbound frame
    pub fn accept_frame(
        &self,
        indication: &ApsIndication,
        header: &ClusterLibraryHeader,
        flags: &PolicyFlags,
    ) -> PolicyDecision {
        let trusted = self.is_trust_center(indication.source);
        if indication.cluster == cluster::WORKS_WITH_ALL_HUBS && !trusted {
            return PolicyDecision::Drop;
        }
        let missing_ack = indication.is_unicast()
            && self.requires_aps_ack(indication.cluster)
            && !indication.acknowledge_requested;
        let missing_link_key = self.requires_aps_link_key(indication.cluster)
            && indication.security != Security::LinkKey;
        let not_trust_center = self.must_use_trust_center_for(indication.cluster) && !trusted;
        let write = header.is_global()
            && (header.command == GeneralCommandIdentifier::WriteAttributes
                || header.command == GeneralCommandIdentifier::WriteAttributesUndivided
                || header.command == GeneralCommandIdentifier::WriteAttributesNoResponse);
        let configuration_locked = write && !flags.configuration_mode && !trusted;
        if missing_ack || missing_link_key || not_trust_center || configuration_locked {
            if trusted {
                PolicyDecision::NotAuthorized
            } else {
                PolicyDecision::Drop
            }
        } else {
            PolicyDecision::Accept
        }
    }

    /// Check an inbound device management request
    pub fn accept_zdo(&self, source: ShortAddress, request: ZdoRequest, flags: &PolicyFlags) -> bool {
        let trusted = self.is_trust_center(source);
        match request {
            ZdoRequest::MgmtLeave { rejoin } => {
                (rejoin || flags.leave_without_rejoin) && (trusted || flags.configuration_mode)
            }
            ZdoRequest::MgmtNetworkUpdate { .. } => trusted,
            ZdoRequest::Bind | ZdoRequest::MgmtPermitJoining => {
                trusted || flags.configuration_mode
            }
            ZdoRequest::Other => true,
        }
    }

    /// Delay in milliseconds before redelivering an application event,
    /// none when retries are disabled or exhausted
    pub fn app_event_retry_delay(&self, attempt: u8) -> Option<u32> {
        let retry = self.app_event_retry?;
        if attempt >= retry.max_redelivery_attempts {
            return None;
        }
        let mut delay = u32::from(retry.first_backoff);
        for _ in 0..attempt {
            delay = delay.saturating_mul(u32::from(retry.common_ratio));
            if delay >= retry.max_backoff {
                break;
            }
        }
        Some(delay.min(retry.max_backoff).saturating_mul(crate::timer::SECOND))
    }
}
