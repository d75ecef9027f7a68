//! Works with all hubs server
//!
//! Commands from the trust center adjust the policy tables and the boolean
//! settings kept in the server attributes. Requests that need the
//! application, a beacon survey or a debug report for example, go through
//! the device callback.

use core::cmp::Reverse;
use core::convert::TryFrom;

use zcl_data::cluster_library::wwah::{
    ApsLinkKeyAuthorizationQueryResponse, ClusterList, ClusterListPayload,
    EnableAppEventRetryAlgorithm, EnableRejoinAlgorithm, NewDebugReportNotification,
    PowerDescriptorChange, PoweringNotification, SetPendingNetworkUpdate, ShortAddressChange,
    SurveyBeaconsResponse, WwahCommand, WwahResponse, ATTR_APP_EVENT_RETRY_ENABLED,
    ATTR_APP_EVENT_RETRY_QUEUE_SIZE, ATTR_BAD_PARENT_RECOVERY_ENABLED,
    ATTR_CONFIGURATION_MODE_ENABLED, ATTR_CURRENT_DEBUG_REPORT_ID, ATTR_DISABLE_OTA_DOWNGRADES,
    ATTR_MAC_POLL_FAILURE_WAIT_TIME, ATTR_MAC_RETRY_COUNT, ATTR_MGMT_LEAVE_WITHOUT_REJOIN_ENABLED,
    ATTR_NWK_RETRY_COUNT, ATTR_OTA_MAX_OFFLINE_DURATION, ATTR_PARENT_CLASSIFICATION_ENABLED,
    ATTR_PENDING_NETWORK_UPDATE_CHANNEL, ATTR_PENDING_NETWORK_UPDATE_PANID, ATTR_REJOIN_ENABLED,
    ATTR_ROUTER_CHECK_IN_ENABLED, ATTR_TC_SECURITY_ON_NWK_KEY_ROTATION_ENABLED,
    ATTR_TOUCHLINK_INTERPAN_ENABLED, DEFAULT_APP_EVENT_RETRY_QUEUE_SIZE,
    DEFAULT_MAC_POLL_FAILURE_WAIT_TIME, MANUFACTURER_CODE, MIN_RETRY_COUNT, NO_PENDING_CHANNEL,
    NO_PENDING_PANID,
};
use zcl_data::cluster_library::{
    cluster, AttributeIdentifier, AttributeValue, ClusterLibraryStatus, Direction,
};
use zcl_data::pack::{Pack, Reader};

use super::{malformed, CommandResult, HandlerResult, Inbound};
use crate::aps::Destination;
use crate::attribute_store::{Access, AttributeRecord, Role, WriteOrigin};
use crate::callback::{CallbackOutput, CallbackStatus, DeviceEvent, DeviceHandler};
use crate::wwah::parent::priority;
use crate::wwah::rejoin::{RejoinBackoff, RejoinParameters};
use crate::{ClusterLibraryService, Error};

/// Attributes of a works with all hubs server
pub fn server_attributes() -> [AttributeRecord; 18] {
    use AttributeValue::{Boolean, Unsigned16, Unsigned8};
    let setting = |identifier, value| {
        AttributeRecord::read_only(identifier, value).with_access(Access::NON_VOLATILE)
    };
    [
        setting(ATTR_DISABLE_OTA_DOWNGRADES, Boolean(false)),
        setting(ATTR_MGMT_LEAVE_WITHOUT_REJOIN_ENABLED, Boolean(true)),
        setting(ATTR_NWK_RETRY_COUNT, Unsigned8(MIN_RETRY_COUNT)),
        setting(ATTR_MAC_RETRY_COUNT, Unsigned8(MIN_RETRY_COUNT)),
        setting(ATTR_ROUTER_CHECK_IN_ENABLED, Boolean(false)),
        setting(ATTR_TOUCHLINK_INTERPAN_ENABLED, Boolean(true)),
        setting(ATTR_PARENT_CLASSIFICATION_ENABLED, Boolean(false)),
        setting(ATTR_APP_EVENT_RETRY_ENABLED, Boolean(false)),
        setting(
            ATTR_APP_EVENT_RETRY_QUEUE_SIZE,
            Unsigned8(DEFAULT_APP_EVENT_RETRY_QUEUE_SIZE),
        ),
        setting(ATTR_REJOIN_ENABLED, Boolean(false)),
        setting(
            ATTR_MAC_POLL_FAILURE_WAIT_TIME,
            Unsigned8(DEFAULT_MAC_POLL_FAILURE_WAIT_TIME),
        ),
        setting(ATTR_CONFIGURATION_MODE_ENABLED, Boolean(true)),
        AttributeRecord::read_only(ATTR_CURRENT_DEBUG_REPORT_ID, Unsigned8(0)),
        setting(ATTR_TC_SECURITY_ON_NWK_KEY_ROTATION_ENABLED, Boolean(false)),
        setting(ATTR_BAD_PARENT_RECOVERY_ENABLED, Boolean(false)),
        setting(ATTR_PENDING_NETWORK_UPDATE_CHANNEL, Unsigned8(NO_PENDING_CHANNEL)),
        setting(ATTR_PENDING_NETWORK_UPDATE_PANID, Unsigned16(NO_PENDING_PANID)),
        setting(ATTR_OTA_MAX_OFFLINE_DURATION, Unsigned16(0)),
    ]
}

fn clusters(payload: &[u8]) -> Result<ClusterList, ClusterLibraryStatus> {
    ClusterListPayload::unpack(payload)
        .map(|(p, _)| p.clusters)
        .map_err(malformed)
}

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    fn wwah_endpoint(&self) -> Option<u8> {
        self.store
            .endpoints_hosting(cluster::WORKS_WITH_ALL_HUBS, Role::Server)
            .first()
            .copied()
    }

    /// Boolean WWAH setting, `default` without a WWAH server
    pub(crate) fn wwah_flag(&self, attribute: AttributeIdentifier, default: bool) -> bool {
        let endpoint = match self.wwah_endpoint() {
            Some(endpoint) => endpoint,
            None => return default,
        };
        match self.store.read(
            endpoint,
            cluster::WORKS_WITH_ALL_HUBS,
            Role::Server,
            attribute,
            None,
            WriteOrigin::Local,
        ) {
            Ok(AttributeValue::Boolean(value)) => *value,
            _ => default,
        }
    }

    fn set_wwah(&mut self, endpoint: u8, attribute: AttributeIdentifier, value: AttributeValue) {
        self.set_attribute(
            endpoint,
            cluster::WORKS_WITH_ALL_HUBS,
            Role::Server,
            attribute,
            value,
        );
    }

    pub(crate) fn handle_wwah(&mut self, inbound: &Inbound) -> CommandResult {
        let command = match WwahCommand::try_from(inbound.header.command) {
            Ok(command) => command,
            Err(_) => return Ok(HandlerResult::NotHandled),
        };
        log::info!("> WWAH {:?} from {}", command, inbound.indication.source);
        let endpoint = inbound.endpoint;
        let mut reader = Reader::new(inbound.payload);
        let flag = |attribute, on| Some((attribute, AttributeValue::Boolean(on)));
        let setting = match command {
            WwahCommand::EnableApsLinkKeyAuthorization
            | WwahCommand::DisableApsLinkKeyAuthorization => {
                let list = clusters(inbound.payload)?;
                let required = command == WwahCommand::EnableApsLinkKeyAuthorization;
                self.policy
                    .require_aps_link_key(&list, required)
                    .map_err(|_| ClusterLibraryStatus::InsufficientSpace)?;
                None
            }
            WwahCommand::ApsLinkKeyAuthorizationQuery => {
                let cluster = reader.read_u16().map_err(malformed)?;
                let response = ApsLinkKeyAuthorizationQueryResponse {
                    cluster,
                    authorized: self.policy.requires_aps_link_key(cluster),
                };
                self.respond(
                    inbound,
                    WwahResponse::ApsLinkKeyAuthorizationQueryResponse.into(),
                    &response,
                );
                return Ok(HandlerResult::HandledWillRespond);
            }
            WwahCommand::RequestNewApsLinkKey => {
                return self.wwah_request(endpoint, DeviceEvent::RequestNewApsLinkKey);
            }
            WwahCommand::EnableAppEventRetryAlgorithm => {
                let (retry, _) =
                    EnableAppEventRetryAlgorithm::unpack(inbound.payload).map_err(malformed)?;
                if retry.first_backoff == 0 || retry.common_ratio == 0 || retry.max_backoff == 0 {
                    return Err(ClusterLibraryStatus::InvalidField);
                }
                self.policy.app_event_retry = Some(retry);
                flag(ATTR_APP_EVENT_RETRY_ENABLED, true)
            }
            WwahCommand::DisableAppEventRetryAlgorithm => {
                self.policy.app_event_retry = None;
                flag(ATTR_APP_EVENT_RETRY_ENABLED, false)
            }
            WwahCommand::RequestTime => {
                return self.wwah_request(endpoint, DeviceEvent::RequestTime);
            }
            WwahCommand::EnableRejoinAlgorithm => {
                let (rejoin, _) =
                    EnableRejoinAlgorithm::unpack(inbound.payload).map_err(malformed)?;
                if rejoin.fast_rejoin_first_backoff == 0
                    || rejoin.max_backoff_time == 0
                    || rejoin.max_backoff_iterations == 0
                {
                    return Err(ClusterLibraryStatus::InvalidField);
                }
                self.rejoin = Some(RejoinBackoff::new(
                    RejoinParameters::from(&rejoin),
                    self.config.wwah.device_kind,
                ));
                flag(ATTR_REJOIN_ENABLED, true)
            }
            WwahCommand::DisableRejoinAlgorithm => {
                self.rejoin = None;
                flag(ATTR_REJOIN_ENABLED, false)
            }
            WwahCommand::SetIasZoneEnrollmentMethod => {
                let method = reader.read_u8().map_err(malformed)?;
                return self.wwah_request(endpoint, DeviceEvent::SetIasZoneEnrollmentMethod { method });
            }
            WwahCommand::ClearBindingTable => {
                self.bindings.clear();
                return self.wwah_request(endpoint, DeviceEvent::ClearBindingTable);
            }
            WwahCommand::EnablePeriodicRouterCheckIns => {
                let interval = reader.read_u16().map_err(malformed)?;
                if interval == 0 {
                    return Err(ClusterLibraryStatus::InvalidValue);
                }
                flag(ATTR_ROUTER_CHECK_IN_ENABLED, true)
            }
            WwahCommand::DisablePeriodicRouterCheckIns => flag(ATTR_ROUTER_CHECK_IN_ENABLED, false),
            WwahCommand::SetMacPollCcaWaitTime => {
                let wait_time = reader.read_u8().map_err(malformed)?;
                return self.wwah_request(endpoint, DeviceEvent::SetMacPollCcaWaitTime { wait_time });
            }
            WwahCommand::SetPendingNetworkUpdate => {
                let (update, _) =
                    SetPendingNetworkUpdate::unpack(inbound.payload).map_err(malformed)?;
                self.set_wwah(
                    endpoint,
                    ATTR_PENDING_NETWORK_UPDATE_CHANNEL,
                    AttributeValue::Unsigned8(update.channel),
                );
                Some((
                    ATTR_PENDING_NETWORK_UPDATE_PANID,
                    AttributeValue::Unsigned16(update.pan_id),
                ))
            }
            WwahCommand::RequireApsAcksOnUnicasts => {
                let list = clusters(inbound.payload)?;
                self.policy
                    .require_aps_acks(&list, true)
                    .map_err(|_| ClusterLibraryStatus::InsufficientSpace)?;
                None
            }
            WwahCommand::RemoveApsAcksOnUnicastsRequirement => {
                self.policy.remove_aps_ack_requirement();
                None
            }
            WwahCommand::ApsAckRequirementQuery => {
                let response = ClusterListPayload {
                    clusters: self.policy.ack_requirement_list(),
                };
                self.respond(
                    inbound,
                    WwahResponse::ApsAckRequirementQueryResponse.into(),
                    &response,
                );
                return Ok(HandlerResult::HandledWillRespond);
            }
            WwahCommand::DebugReportQuery => {
                let report_id = reader.read_u8().map_err(malformed)?;
                let (_, output) = self.notify(
                    endpoint,
                    CallbackStatus::NotFound,
                    DeviceEvent::DebugReportQuery { report_id },
                );
                return match output {
                    CallbackOutput::DebugReport(report) => {
                        self.respond(
                            inbound,
                            WwahResponse::DebugReportQueryResponse.into(),
                            &report,
                        );
                        Ok(HandlerResult::HandledWillRespond)
                    }
                    _ => Err(ClusterLibraryStatus::NotFound),
                };
            }
            WwahCommand::SurveyBeacons => {
                let standard_beacons = reader.read_bool().map_err(malformed)?;
                self.survey_beacons(inbound, standard_beacons);
                return Ok(HandlerResult::HandledWillRespond);
            }
            WwahCommand::DisableOtaDowngrades => flag(ATTR_DISABLE_OTA_DOWNGRADES, true),
            WwahCommand::DisableMgmtLeaveWithoutRejoin => {
                flag(ATTR_MGMT_LEAVE_WITHOUT_REJOIN_ENABLED, false)
            }
            WwahCommand::DisableTouchlinkInterpanMessageSupport => {
                flag(ATTR_TOUCHLINK_INTERPAN_ENABLED, false)
            }
            WwahCommand::EnableParentClassification => {
                flag(ATTR_PARENT_CLASSIFICATION_ENABLED, true)
            }
            WwahCommand::DisableParentClassification => {
                flag(ATTR_PARENT_CLASSIFICATION_ENABLED, false)
            }
            WwahCommand::EnableTcSecurityOnNwkKeyRotation => {
                flag(ATTR_TC_SECURITY_ON_NWK_KEY_ROTATION_ENABLED, true)
            }
            WwahCommand::EnableBadParentRecovery => flag(ATTR_BAD_PARENT_RECOVERY_ENABLED, true),
            WwahCommand::DisableBadParentRecovery => flag(ATTR_BAD_PARENT_RECOVERY_ENABLED, false),
            WwahCommand::EnableConfigurationMode => flag(ATTR_CONFIGURATION_MODE_ENABLED, true),
            WwahCommand::DisableConfigurationMode => flag(ATTR_CONFIGURATION_MODE_ENABLED, false),
            WwahCommand::UseTrustCenterForCluster => {
                let list = clusters(inbound.payload)?;
                self.policy
                    .use_trust_center_for(&list)
                    .map_err(|_| ClusterLibraryStatus::InsufficientSpace)?;
                None
            }
            WwahCommand::TrustCenterForClusterServerQuery => {
                let response = ClusterListPayload {
                    clusters: self.policy.trust_center_clusters.iter().copied().collect(),
                };
                self.respond(
                    inbound,
                    WwahResponse::TrustCenterForClusterServerQueryResponse.into(),
                    &response,
                );
                return Ok(HandlerResult::HandledWillRespond);
            }
        };
        if let Some((attribute, value)) = setting {
            self.set_wwah(endpoint, attribute, value);
        }
        Ok(HandlerResult::Handled)
    }

    /// Pass a request to the application, its status becomes the default
    /// response
    fn wwah_request(&mut self, endpoint: u8, event: DeviceEvent) -> CommandResult {
        let (status, _) = self.notify(endpoint, CallbackStatus::Ok, event);
        match status.response_status() {
            Some(ClusterLibraryStatus::Success) => Ok(HandlerResult::Handled),
            Some(status) => Err(status),
            None => Ok(HandlerResult::HandledWillRespond),
        }
    }

    fn survey_beacons(&mut self, inbound: &Inbound, standard_beacons: bool) {
        let (_, output) = self.notify(
            inbound.endpoint,
            CallbackStatus::Ok,
            DeviceEvent::SurveyBeacons { standard_beacons },
        );
        let mut response = SurveyBeaconsResponse::default();
        if let CallbackOutput::Beacons(beacons) = output {
            response.beacons = beacons;
        }
        let classification =
            self.wwah_flag(ATTR_PARENT_CLASSIFICATION_ENABLED, false);
        response
            .beacons
            .sort_unstable_by_key(|b| Reverse((priority(b, classification), b.rssi)));
        self.respond(inbound, WwahResponse::SurveyBeaconsResponse.into(), &response);
    }

    fn notify_trust_center<P: Pack<P, zcl_data::Error>>(
        &mut self,
        command: WwahResponse,
        payload: &P,
    ) -> Result<u8, Error> {
        let endpoint = self.wwah_endpoint().ok_or(Error::NoSuchCluster)?;
        let destination = Destination::Unicast {
            address: self.policy.trust_center,
            endpoint: self.config.wwah.trust_center_endpoint,
        };
        log::info!("< WWAH {:?} to {}", command, self.policy.trust_center);
        self.send(
            destination,
            endpoint,
            cluster::WORKS_WITH_ALL_HUBS,
            Direction::ToClient,
            Some(MANUFACTURER_CODE),
            command.into(),
            payload,
        )
    }

    /// Tell the trust center the device is powering on or off
    pub fn send_powering_notification(
        &mut self,
        powering_on: bool,
        notification: &PoweringNotification,
    ) -> Result<u8, Error> {
        let command = if powering_on {
            WwahResponse::PoweringOnNotification
        } else {
            WwahResponse::PoweringOffNotification
        };
        self.notify_trust_center(command, notification)
    }

    /// Tell the trust center the short address changed
    pub fn send_short_address_change(&mut self, change: &ShortAddressChange) -> Result<u8, Error> {
        self.notify_trust_center(WwahResponse::ShortAddressChange, change)
    }

    /// Tell the trust center the power descriptor changed
    pub fn send_power_descriptor_change(
        &mut self,
        change: &PowerDescriptorChange,
    ) -> Result<u8, Error> {
        self.notify_trust_center(WwahResponse::PowerDescriptorChange, change)
    }

    /// Announce a new debug report
    pub fn send_new_debug_report(
        &mut self,
        notification: &NewDebugReportNotification,
    ) -> Result<u8, Error> {
        if let Some(endpoint) = self.wwah_endpoint() {
            self.set_wwah(
                endpoint,
                ATTR_CURRENT_DEBUG_REPORT_ID,
                AttributeValue::Unsigned8(notification.report_id),
            );
        }
        self.notify_trust_center(WwahResponse::NewDebugReportNotification, notification)
    }
}
