//! Device callback
//!
//! Cluster events surfaced to the application go through a single callback.
//! The dispatcher sets a default status before the call, the application
//! overwrites it and may fill in an output payload.

use heapless::Vec;

use zcl_data::cluster_library::{
    drlc::{EventStatus, LoadControlEvent},
    energy_management::ActionsRequired,
    wwah::{BeaconSurvey, DebugReportQueryResponse, MAX_BEACON_SURVEY},
    AttributeIdentifier, AttributeValue, ClusterIdentifier, ClusterLibraryHeader,
    ClusterLibraryStatus,
};
use zcl_data::{GroupIdentifier, ShortAddress};

use crate::attribute_store::Role;
use crate::cvc::{TransitionOwner, TransitionStatus};

/// Status returned by the application
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackStatus {
    /// Handled
    Ok,
    /// Failed
    Error,
    /// Not handled
    NotFound,
    /// Handled, nothing shall be sent
    Ignore,
    /// Out of resources
    NoMemory,
    /// The entry exists already
    AlreadyExists,
    /// The application will respond later
    Pending,
}

impl CallbackStatus {
    /// Status of the default response, none when nothing is sent
    pub fn response_status(self) -> Option<ClusterLibraryStatus> {
        match self {
            CallbackStatus::Ok => Some(ClusterLibraryStatus::Success),
            CallbackStatus::Error => Some(ClusterLibraryStatus::Failure),
            CallbackStatus::NotFound => Some(ClusterLibraryStatus::NotFound),
            CallbackStatus::NoMemory => Some(ClusterLibraryStatus::InsufficientSpace),
            CallbackStatus::AlreadyExists => Some(ClusterLibraryStatus::DuplicateExists),
            CallbackStatus::Ignore | CallbackStatus::Pending => None,
        }
    }
}

/// Event passed to the application
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceEvent<'p> {
    /// An attribute has been written
    SetAttributeValue {
        /// Cluster
        cluster: ClusterIdentifier,
        /// Role
        role: Role,
        /// Attribute
        attribute: AttributeIdentifier,
        /// New value
        value: AttributeValue,
    },
    /// Cluster command without a built-in handler
    ClusterCommand {
        /// Cluster
        cluster: ClusterIdentifier,
        /// Receiving role
        role: Role,
        /// Frame header
        header: ClusterLibraryHeader,
        /// Command payload
        payload: &'p [u8],
    },
    /// Attribute report from a peer
    ReportAttribute {
        /// Sender
        source: ShortAddress,
        /// Cluster
        cluster: ClusterIdentifier,
        /// Attribute
        attribute: AttributeIdentifier,
        /// Reported value
        value: AttributeValue,
    },
    /// An expected report did not arrive in time
    NoReporting {
        /// Cluster
        cluster: ClusterIdentifier,
        /// Attribute
        attribute: AttributeIdentifier,
    },
    /// A scene was added
    SceneAdded {
        /// Group
        group: GroupIdentifier,
        /// Scene
        scene: u8,
    },
    /// An existing scene was overwritten
    SceneUpdated {
        /// Group
        group: GroupIdentifier,
        /// Scene
        scene: u8,
    },
    /// A scene was removed
    SceneRemoved {
        /// Group
        group: GroupIdentifier,
        /// Scene
        scene: u8,
    },
    /// A scene recall has finished
    SceneRecalled {
        /// Group
        group: GroupIdentifier,
        /// Scene
        scene: u8,
    },
    /// The endpoint joined a group
    GroupAdded {
        /// Group
        group: GroupIdentifier,
    },
    /// The endpoint left a group
    GroupRemoved {
        /// Group
        group: GroupIdentifier,
    },
    /// Factory defaults have been restored
    ResetToFactoryDefaults,
    /// A value transition has ended
    TransitionFinished {
        /// Cluster
        cluster: ClusterIdentifier,
        /// Attribute
        attribute: AttributeIdentifier,
        /// Owner
        owner: TransitionOwner,
        /// Status
        status: TransitionStatus,
    },
    /// A request sent by the application got its response or timed out
    TransactionComplete {
        /// Token given when sending
        token: u32,
        /// Status of the exchange
        status: ClusterLibraryStatus,
        /// Response command
        command: u8,
        /// Response payload
        payload: &'p [u8],
    },
    /// A load control event changed state
    LoadControlEvent {
        /// New state
        status: EventStatus,
        /// The event
        event: LoadControlEvent,
    },
    /// Manage event command for the running event
    ManageEvent {
        /// Issuer event identifier
        issuer_event_id: u32,
        /// Requested actions
        actions: ActionsRequired,
    },
    /// A new APS link key shall be requested from the trust center
    RequestNewApsLinkKey,
    /// The time shall be read from the trust center
    RequestTime,
    /// IAS zone enrollment method
    SetIasZoneEnrollmentMethod {
        /// Method
        method: u8,
    },
    /// The binding table shall be cleared
    ClearBindingTable,
    /// MAC poll CCA wait time
    SetMacPollCcaWaitTime {
        /// Wait time
        wait_time: u8,
    },
    /// Survey beacons, the application fills in [`CallbackOutput::Beacons`]
    SurveyBeacons {
        /// Only standard beacons
        standard_beacons: bool,
    },
    /// Debug report query, the application fills in
    /// [`CallbackOutput::DebugReport`]
    DebugReportQuery {
        /// Report identifier
        report_id: u8,
    },
    /// Rejoin the network
    RejoinAttempt {
        /// Attempt number in the current cycle
        attempt: u8,
    },
    /// The parent failed three check-ins in a row
    BadParent {
        /// Scan for a new parent
        recover: bool,
    },
}

/// Output filled in by the application
#[derive(Clone, Debug, PartialEq)]
pub enum CallbackOutput {
    /// Nothing
    None,
    /// Result of a beacon survey
    Beacons(Vec<BeaconSurvey, MAX_BEACON_SURVEY>),
    /// Debug report
    DebugReport(DebugReportQueryResponse),
}

/// Parameters of a device callback
#[derive(Clone, Debug, PartialEq)]
pub struct CallbackParameters<'p> {
    /// Endpoint
    pub endpoint: u8,
    /// Status, preset by the dispatcher
    pub status: CallbackStatus,
    /// The event
    pub event: DeviceEvent<'p>,
    /// Output
    pub output: CallbackOutput,
}

/// Application interface
pub trait DeviceHandler {
    /// Handle a cluster event
    fn device_callback(&mut self, parameters: &mut CallbackParameters);

    /// Endpoint receiving a frame sent to the broadcast endpoint, none to
    /// deliver the frame to every endpoint hosting the cluster
    fn broadcast_endpoint(&mut self, _cluster: ClusterIdentifier) -> Option<u8> {
        None
    }
}

/// Invoke the application callback, returns the status and the output
pub fn invoke<H: DeviceHandler>(
    handler: &mut H,
    endpoint: u8,
    status: CallbackStatus,
    event: DeviceEvent,
) -> (CallbackStatus, CallbackOutput) {
    let mut parameters = CallbackParameters {
        endpoint,
        status,
        event,
        output: CallbackOutput::None,
    };
    handler.device_callback(&mut parameters);
    (parameters.status, parameters.output)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refuser;

    impl DeviceHandler for Refuser {
        fn device_callback(&mut self, parameters: &mut CallbackParameters) {
            if let DeviceEvent::SceneAdded { .. } = parameters.event {
                parameters.status = CallbackStatus::NoMemory;
            }
        }
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            CallbackStatus::AlreadyExists.response_status(),
            Some(ClusterLibraryStatus::DuplicateExists)
        );
        assert_eq!(CallbackStatus::Pending.response_status(), None);
        assert_eq!(CallbackStatus::Ignore.response_status(), None);
    }

    #[test]
    fn default_status_is_kept() {
        let mut handler = Refuser;
        let (status, output) = invoke(
            &mut handler,
            1,
            CallbackStatus::Ok,
            DeviceEvent::GroupAdded { group: 1 },
        );
        assert_eq!(status, CallbackStatus::Ok);
        assert_eq!(output, CallbackOutput::None);
        let (status, _) = invoke(
            &mut handler,
            1,
            CallbackStatus::Ok,
            DeviceEvent::SceneAdded { group: 1, scene: 2 },
        );
        assert_eq!(status, CallbackStatus::NoMemory);
    }
}
