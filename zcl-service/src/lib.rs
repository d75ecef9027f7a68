//! # ZCL Service
//!
//! Runtime of the Zigbee cluster library. Frames delivered by the
//! application support layer are parsed, checked against the works with all
//! hubs policy and dispatched to the foundation or cluster handlers. Events
//! are surfaced to the application through a single callback and outbound
//! frames are queued for the application support layer.
//!
//! Time is driven by the integrator, `receive`, `update` and `timeout`
//! return the time stamp at which `timeout` shall be called next.

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate bitflags;

use core::cell::Cell;

use heapless::{spsc::Producer, Vec};
use rand::{rngs::SmallRng, SeedableRng};

use zcl_data::cluster_library::{
    commands::{
        AttributeReport, Command, DefaultResponse, ReadAttributes, ReportAttributes, MAX_RECORDS,
    },
    AttributeIdentifier, AttributeValue, ClusterIdentifier, ClusterLibraryHeader,
    ClusterLibraryStatus, Direction, Frame, FrameType, GeneralCommandIdentifier,
    BROADCAST_ENDPOINT,
};
use zcl_data::cluster_library::{cluster, keep_alive, wwah::BeaconSurvey};
use zcl_data::pack::Pack;
use zcl_data::ShortAddress;

pub mod aps;
pub mod attribute_store;
pub mod binding;
pub mod callback;
pub mod cluster_library;
pub mod config;
pub mod cvc;
pub mod drlc;
mod error;
pub mod persistence;
pub mod reporting;
pub mod timer;
pub mod transaction;
pub mod wwah;

pub use aps::{ApsIndication, ApsRequest, Destination, OutgoingFrame, Security, MAX_FRAME_SIZE};
pub use attribute_store::{Access, AttributeRecord, EndpointDescriptor, Role, WriteOrigin};
pub use callback::{
    CallbackOutput, CallbackParameters, CallbackStatus, DeviceEvent, DeviceHandler,
};
pub use config::Config;
pub use error::Error;

use attribute_store::AttributeStore;
use binding::{Binding, BindingTable, MAX_BINDINGS};
use cluster_library::{
    groups::GroupTable,
    scenes::{PendingRecall, SceneTable, MAX_PENDING_RECALLS},
    HandlerResult, Inbound,
};
use cvc::{ContinuousValueChange, TransitionEvent, TransitionRequest};
use drlc::LoadControlScheduler;
use reporting::{Reporting, ReportingKey, MAX_REPORTING};
use timer::{earliest, is_due, UtcClock};
use transaction::{Completion, Transaction, TransactionTable};
use wwah::{
    check_in::CheckIn, parent::select_parent, rejoin::RejoinBackoff, PolicyFlags, WwahPolicy,
    ZdoRequest,
};

/// Command sent by the application
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommandRequest<'p> {
    /// Destination
    pub destination: Destination,
    /// Local endpoint
    pub source_endpoint: u8,
    /// Profile identifier
    pub profile: u16,
    /// Cluster identifier
    pub cluster: ClusterIdentifier,
    /// Direction of the command
    pub direction: Direction,
    /// Profile wide or cluster specific
    pub frame_type: FrameType,
    /// Manufacturer code
    pub manufacturer: Option<u16>,
    /// Command identifier
    pub command: u8,
    /// Command payload
    pub payload: &'p [u8],
    /// Completion token, the response or the time out is reported with a
    /// transaction complete event
    pub token: Option<u32>,
}

/// Cluster library service
pub struct ClusterLibraryService<'a, H: DeviceHandler, const N: usize> {
    config: Config,
    handler: H,
    tx_queue: Producer<'a, OutgoingFrame, N>,
    sequence: Cell<u8>,
    timestamp: u32,
    armed: u32,
    rng: SmallRng,
    clock: UtcClock,
    store: AttributeStore,
    groups: GroupTable,
    scenes: SceneTable,
    pending_recalls: Vec<PendingRecall, MAX_PENDING_RECALLS>,
    cvc: ContinuousValueChange,
    reporting: Reporting,
    transactions: TransactionTable,
    drlc: LoadControlScheduler,
    policy: WwahPolicy,
    rejoin: Option<RejoinBackoff>,
    check_in: CheckIn,
    bindings: BindingTable,
}

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    /// Create a service, outbound frames are pushed onto `tx_queue`
    pub fn new(config: Config, handler: H, tx_queue: Producer<'a, OutgoingFrame, N>) -> Self {
        Self {
            config,
            handler,
            tx_queue,
            sequence: Cell::new(0),
            timestamp: 0,
            armed: 0,
            rng: SmallRng::seed_from_u64(config.random_seed),
            clock: UtcClock::default(),
            store: AttributeStore::default(),
            groups: GroupTable::default(),
            scenes: SceneTable::default(),
            pending_recalls: Vec::new(),
            cvc: ContinuousValueChange::default(),
            reporting: Reporting::default(),
            transactions: TransactionTable::default(),
            drlc: LoadControlScheduler::default(),
            policy: WwahPolicy::new(&config.wwah),
            rejoin: None,
            check_in: CheckIn::default(),
            bindings: BindingTable::default(),
        }
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The application handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The application handler
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Attribute tables
    pub fn attributes(&self) -> &AttributeStore {
        &self.store
    }

    /// Attribute tables, for registering hooks
    pub fn attributes_mut(&mut self) -> &mut AttributeStore {
        &mut self.store
    }

    /// Group memberships
    pub fn groups(&self) -> &GroupTable {
        &self.groups
    }

    /// Scene table
    pub fn scenes(&self) -> &SceneTable {
        &self.scenes
    }

    /// Load control calendar
    pub fn load_control(&self) -> &LoadControlScheduler {
        &self.drlc
    }

    /// Works with all hubs policy
    pub fn policy(&self) -> &WwahPolicy {
        &self.policy
    }

    /// Value transitions
    pub fn transitions(&self) -> &ContinuousValueChange {
        &self.cvc
    }

    /// Trust center check-in state
    pub fn check_in(&self) -> &CheckIn {
        &self.check_in
    }

    /// Register an endpoint
    pub fn add_endpoint(&mut self, descriptor: EndpointDescriptor) -> Result<(), Error> {
        self.store.add_endpoint(descriptor)
    }

    /// Register a cluster instance
    pub fn add_cluster(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        manufacturer: Option<u16>,
        revision: u16,
        attributes: &[AttributeRecord],
    ) -> Result<(), Error> {
        self.store
            .add_cluster(endpoint, cluster, role, manufacturer, revision, attributes)
    }

    /// Add a binding, attribute reports are sent to the bound destinations
    pub fn add_binding(&mut self, binding: Binding) -> Result<(), Error> {
        self.bindings.add(binding)
    }

    /// Remove a binding
    pub fn remove_binding(&mut self, binding: &Binding) -> bool {
        self.bindings.remove(binding)
    }

    /// Bindings
    pub fn bindings(&self) -> &[Binding] {
        self.bindings.entries()
    }

    /// Set the UTC time, seconds since 2000-01-01, at the time stamp
    pub fn set_utc_time(&mut self, utc: u32, timestamp: u32) {
        self.clock.set(utc, timestamp);
    }

    /// UTC time at the last time stamp
    pub fn utc_time(&self) -> u32 {
        self.clock.utc(self.timestamp)
    }

    /// Read a local attribute
    pub fn read_attribute(
        &self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
    ) -> Result<AttributeValue, ClusterLibraryStatus> {
        if let Some(value) = self.dynamic_value(endpoint, cluster, role, attribute) {
            return Ok(value);
        }
        self.store
            .read(endpoint, cluster, role, attribute, None, WriteOrigin::Local)
            .map(Clone::clone)
    }

    /// Write a local attribute, the write passes the hooks and triggers
    /// reports like a remote write
    pub fn write_attribute(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        value: AttributeValue,
    ) -> Result<(), ClusterLibraryStatus> {
        self.write_local(
            endpoint,
            cluster,
            role,
            attribute,
            None,
            value,
            WriteOrigin::Local,
        )?;
        self.process_transitions();
        Ok(())
    }

    /// Start a value transition on a local attribute
    pub fn start_transition(&mut self, request: TransitionRequest) -> Result<(), Error> {
        self.cvc.start(request, self.timestamp)?;
        self.process_transitions();
        Ok(())
    }

    /// Stop a value transition, no completion is reported
    pub fn stop_transition(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        attribute: AttributeIdentifier,
    ) -> Option<cvc::TransitionOwner> {
        self.cvc.stop(endpoint, cluster, attribute)
    }

    /// Send a command, returns the transaction sequence number
    pub fn send_command(&mut self, request: &CommandRequest) -> Result<u8, Error> {
        let sequence = self.next_sequence();
        let header = ClusterLibraryHeader::new(
            request.frame_type,
            request.direction,
            request.manufacturer,
            sequence,
            request.command,
            request.token.is_none(),
        );
        if let (Some(token), Destination::Unicast { address, endpoint }) =
            (request.token, request.destination)
        {
            self.transactions.reserve(Transaction {
                sequence,
                peer: address,
                peer_endpoint: endpoint,
                local_endpoint: request.source_endpoint,
                profile: request.profile,
                cluster: request.cluster,
                direction: request.direction,
                completion: Completion::Application(token),
                deadline: self
                    .timestamp
                    .wrapping_add(self.config.transaction_timeout),
            })?;
        }
        if let Err(err) = self.queue_frame(
            request.destination,
            request.source_endpoint,
            request.profile,
            request.cluster,
            &header,
            request.payload,
        ) {
            self.transactions.cancel(sequence);
            return Err(err);
        }
        Ok(sequence)
    }

    /// Check a device management request against the policy
    pub fn accept_zdo(&self, source: ShortAddress, request: ZdoRequest) -> bool {
        let accepted = self
            .policy
            .accept_zdo(source, request, &self.policy_flags());
        if !accepted {
            log::warn!("> Refused {:?} from {}", request, source);
        }
        accepted
    }

    /// Pick a parent among surveyed beacons
    pub fn select_parent(&self, beacons: &[BeaconSurvey]) -> Option<BeaconSurvey> {
        select_parent(
            beacons,
            self.config.wwah.minimum_rssi,
            self.config.wwah.device_kind.is_end_device(),
            self.wwah_flag(zcl_data::cluster_library::wwah::ATTR_PARENT_CLASSIFICATION_ENABLED, false),
        )
    }

    /// The network was lost, rejoin attempts start when enabled
    pub fn network_lost(&mut self, timestamp: u32) -> u32 {
        self.timestamp = timestamp;
        self.check_in.stop();
        if let Some(rejoin) = self.rejoin.as_mut() {
            log::info!("Network lost, rejoining");
            rejoin.start(timestamp);
        }
        self.arm()
    }

    /// The network was joined, trust center check-ins start when a
    /// keep-alive client is registered
    pub fn network_joined(&mut self, timestamp: u32) -> u32 {
        self.timestamp = timestamp;
        if let Some(rejoin) = self.rejoin.as_mut() {
            rejoin.stop();
        }
        if !self
            .store
            .endpoints_hosting(cluster::KEEP_ALIVE, Role::Client)
            .is_empty()
        {
            self.check_in.start(timestamp, &mut self.rng);
        }
        self.arm()
    }

    /// Receive a cluster library frame
    pub fn receive(
        &mut self,
        indication: &ApsIndication,
        data: &[u8],
        timestamp: u32,
    ) -> Result<u32, Error> {
        self.timestamp = timestamp;
        let frame = match Frame::parse(data) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("> Malformed frame from {}, {:?}", indication.source, err);
                return Err(Error::MalformedFrame);
            }
        };
        log::info!(
            "> {} ep {} cluster {:04x} {:?} command {:02x} seq {}",
            indication.source,
            indication.source_endpoint,
            indication.cluster,
            frame.header.control.frame_type,
            frame.header.command,
            frame.header.transaction_sequence
        );
        if self.complete_transaction(indication, &frame) {
            return Ok(self.arm());
        }
        let role = Role::receiving(frame.header.control.direction);
        let endpoints = self.delivery_endpoints(indication, role);
        let first = Inbound {
            indication: *indication,
            endpoint: endpoints
                .first()
                .copied()
                .unwrap_or(indication.destination_endpoint),
            role,
            header: frame.header,
            payload: frame.payload,
        };
        if indication.is_unicast()
            && self
                .store
                .cluster(indication.destination_endpoint, indication.cluster, role)
                .is_none()
        {
            log::warn!(
                "> No cluster {:04x} on endpoint {}",
                indication.cluster,
                indication.destination_endpoint
            );
            self.send_default_response(&first, ClusterLibraryStatus::UnsupportedCluster);
            return Ok(self.arm());
        }
        match self
            .policy
            .accept_frame(indication, &frame.header, &self.policy_flags())
        {
            wwah::PolicyDecision::Accept => {}
            wwah::PolicyDecision::Drop => {
                log::warn!(
                    "> Dropped cluster {:04x} from {}, policy",
                    indication.cluster,
                    indication.source
                );
                return Ok(self.arm());
            }
            wwah::PolicyDecision::NotAuthorized => {
                log::warn!(
                    "> Refused cluster {:04x} from {}, policy",
                    indication.cluster,
                    indication.source
                );
                self.send_default_response(&first, ClusterLibraryStatus::NotAuthorised);
                return Ok(self.arm());
            }
        }
        for endpoint in endpoints {
            let inbound = Inbound {
                endpoint,
                ..first
            };
            let result = self.dispatch(&inbound);
            self.finish(&inbound, result);
        }
        self.process_transitions();
        self.process_load_control();
        Ok(self.arm())
    }

    /// Run everything due at `timestamp`
    pub fn update(&mut self, timestamp: u32) -> Result<u32, Error> {
        self.timestamp = timestamp;
        self.process_transitions();
        while let Some(transaction) = self.transactions.expire(timestamp) {
            self.transaction_timed_out(transaction);
        }
        self.send_due_reports();
        for key in self.reporting.missing_reports(timestamp) {
            log::warn!(
                "No report of {:04x}:{:04x} on endpoint {}",
                key.cluster,
                key.attribute,
                key.endpoint
            );
            self.notify(
                key.endpoint,
                CallbackStatus::Ok,
                DeviceEvent::NoReporting {
                    cluster: key.cluster,
                    attribute: key.attribute,
                },
            );
        }
        let utc = self.clock.utc(timestamp);
        let conformance = self.conformance_level();
        self.drlc.update(utc, conformance);
        self.process_load_control();
        let attempt = self.rejoin.as_mut().and_then(|r| r.poll(timestamp));
        if let Some(attempt) = attempt {
            log::info!("Rejoin attempt {}", attempt);
            self.notify(
                0,
                CallbackStatus::Ok,
                DeviceEvent::RejoinAttempt {
                    attempt: attempt.min(u16::from(u8::MAX)) as u8,
                },
            );
        }
        if self.check_in.poll(timestamp) {
            self.send_check_in();
        }
        Ok(self.arm())
    }

    /// Call when the time stamp returned earlier has been reached
    pub fn timeout(&mut self) -> Result<u32, Error> {
        let now = if self.armed == 0 || is_due(self.timestamp, self.armed) {
            self.timestamp
        } else {
            self.armed
        };
        self.update(now)
    }

    /// Earliest deadline, zero when nothing is scheduled
    pub fn next_deadline(&self) -> u32 {
        let now = self.timestamp;
        let mut next = self.cvc.next_deadline(now);
        next = earliest(now, next, self.transactions.next_deadline(now));
        next = earliest(now, next, self.reporting.next_deadline(now));
        next = earliest(
            now,
            next,
            self.drlc
                .next_deadline()
                .map(|utc| self.clock.timestamp(utc, now)),
        );
        next = earliest(
            now,
            next,
            self.rejoin.as_ref().and_then(RejoinBackoff::next_deadline),
        );
        next = earliest(now, next, self.check_in.next_deadline());
        next.unwrap_or(0)
    }

    fn arm(&mut self) -> u32 {
        self.armed = self.next_deadline();
        self.armed
    }

    pub(crate) fn now(&self) -> u32 {
        self.timestamp
    }

    pub(crate) fn next_sequence(&self) -> u8 {
        loop {
            let sequence = self.sequence.get().wrapping_add(1);
            self.sequence.set(sequence);
            if !self.transactions.is_outstanding(sequence) {
                return sequence;
            }
        }
    }

    pub(crate) fn status(&self, status: ClusterLibraryStatus) -> ClusterLibraryStatus {
        status.for_mode(self.config.status_mode())
    }

    pub(crate) fn notify(
        &mut self,
        endpoint: u8,
        status: CallbackStatus,
        event: DeviceEvent,
    ) -> (CallbackStatus, CallbackOutput) {
        callback::invoke(&mut self.handler, endpoint, status, event)
    }

    fn delivery_endpoints(
        &mut self,
        indication: &ApsIndication,
        role: Role,
    ) -> Vec<u8, { attribute_store::MAX_ENDPOINTS }> {
        let hosting = self.store.endpoints_hosting(indication.cluster, role);
        if let Some(group) = indication.group {
            return hosting
                .into_iter()
                .filter(|endpoint| self.groups.contains(*endpoint, group))
                .collect();
        }
        if indication.destination_endpoint == BROADCAST_ENDPOINT {
            if let Some(endpoint) = self.handler.broadcast_endpoint(indication.cluster) {
                return hosting.into_iter().filter(|e| *e == endpoint).collect();
            }
            return hosting;
        }
        let mut endpoints = Vec::new();
        let _ = endpoints.push(indication.destination_endpoint);
        endpoints
    }

    fn finish(&mut self, inbound: &Inbound, result: HandlerResult) {
        let status = match result {
            HandlerResult::Handled => ClusterLibraryStatus::Success,
            HandlerResult::HandledWithError(status) => status,
            HandlerResult::HandledWillRespond | HandlerResult::NotHandled => return,
        };
        self.send_default_response(inbound, status);
    }

    pub(crate) fn send_default_response(&mut self, inbound: &Inbound, status: ClusterLibraryStatus) {
        if !inbound.indication.is_unicast() {
            return;
        }
        if inbound.header.is_global()
            && inbound.header.command == GeneralCommandIdentifier::DefaultResponse
        {
            return;
        }
        let success = status == ClusterLibraryStatus::Success;
        match self.config.default_response {
            config::DefaultResponsePolicy::Never => return,
            config::DefaultResponsePolicy::ErrorsOnly if success => return,
            _ => {}
        }
        if success && inbound.header.control.disable_default_response {
            return;
        }
        let response = Command::DefaultResponse(DefaultResponse {
            command: inbound.header.command,
            status: self.status(status),
        });
        self.respond_global(inbound, &response);
    }

    /// Respond with a cluster specific command
    pub(crate) fn respond<P: Pack<P, zcl_data::Error>>(
        &mut self,
        inbound: &Inbound,
        command: u8,
        payload: &P,
    ) {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        match payload.pack(&mut buffer) {
            Ok(used) => self.respond_raw(inbound, FrameType::Local, command, &buffer[..used]),
            Err(err) => log::error!("< Failed to pack response {:02x}, {:?}", command, err),
        }
    }

    /// Respond with a profile wide command
    pub(crate) fn respond_global(&mut self, inbound: &Inbound, command: &Command) {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        match command.pack(&mut buffer) {
            Ok((used, identifier)) => self.respond_raw(
                inbound,
                FrameType::Global,
                identifier.into(),
                &buffer[..used],
            ),
            Err(err) => log::error!(
                "< Failed to pack response {:?}, {:?}",
                command.identifier(),
                err
            ),
        }
    }

    fn respond_raw(&mut self, inbound: &Inbound, frame_type: FrameType, command: u8, payload: &[u8]) {
        let header = ClusterLibraryHeader::new(
            frame_type,
            inbound.role.sending(),
            inbound.header.manufacturer,
            inbound.header.transaction_sequence,
            command,
            true,
        );
        let destination = Destination::Unicast {
            address: inbound.indication.source,
            endpoint: inbound.indication.source_endpoint,
        };
        let _ = self.queue_frame(
            destination,
            inbound.endpoint,
            inbound.indication.profile,
            inbound.indication.cluster,
            &header,
            payload,
        );
    }

    /// Send an unsolicited cluster specific command
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn send<P: Pack<P, zcl_data::Error>>(
        &mut self,
        destination: Destination,
        source_endpoint: u8,
        cluster: ClusterIdentifier,
        direction: Direction,
        manufacturer: Option<u16>,
        command: u8,
        payload: &P,
    ) -> Result<u8, Error> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let used = payload.pack(&mut buffer)?;
        let sequence = self.next_sequence();
        let header = ClusterLibraryHeader::new(
            FrameType::Local,
            direction,
            manufacturer,
            sequence,
            command,
            true,
        );
        let profile = self.profile_of(source_endpoint);
        self.queue_frame(
            destination,
            source_endpoint,
            profile,
            cluster,
            &header,
            &buffer[..used],
        )?;
        Ok(sequence)
    }

    pub(crate) fn profile_of(&self, endpoint: u8) -> u16 {
        self.store
            .endpoint(endpoint)
            .map(|e| e.profile)
            .unwrap_or(zcl_data::cluster_library::PROFILE_HOME_AUTOMATION)
    }

    fn queue_frame(
        &mut self,
        destination: Destination,
        source_endpoint: u8,
        profile: u16,
        cluster: ClusterIdentifier,
        header: &ClusterLibraryHeader,
        payload: &[u8],
    ) -> Result<(), Error> {
        if let Destination::Unicast { address, .. } = destination {
            if self.policy.must_use_trust_center_for(cluster) && !self.policy.is_trust_center(address) {
                log::warn!("< Dropped cluster {:04x} to {}, trust center only", cluster, address);
                return Err(Error::PolicyViolation);
            }
        }
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let used = Frame {
            header: *header,
            payload,
        }
        .serialize(&mut buffer)?;
        let request = ApsRequest {
            destination,
            source_endpoint,
            profile,
            cluster,
            acknowledge_request: destination.is_unicast() && self.policy.requires_aps_ack(cluster),
            security: if self.policy.requires_aps_link_key(cluster) {
                Security::LinkKey
            } else {
                Security::Network
            },
        };
        let frame = OutgoingFrame {
            request,
            payload: Vec::from_slice(&buffer[..used]).map_err(|_| Error::NotEnoughSpace)?,
        };
        match self.tx_queue.enqueue(frame) {
            Ok(()) => {
                log::info!(
                    "< Queued cluster {:04x} command {:02x} seq {} to {:?}",
                    cluster,
                    header.command,
                    header.transaction_sequence,
                    destination
                );
                Ok(())
            }
            Err(_) => {
                log::error!("< Failed to queue cluster {:04x}, {:?}", cluster, Error::QueueFull);
                Err(Error::QueueFull)
            }
        }
    }

    /// Value computed on read instead of stored
    pub(crate) fn dynamic_value(
        &self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
    ) -> Option<AttributeValue> {
        if cluster == cluster::LEVEL_CONTROL
            && role == Role::Server
            && attribute == zcl_data::cluster_library::level_control::ATTR_REMAINING_TIME
            && self.store.record(endpoint, cluster, role, attribute, None).is_some()
        {
            let remaining = self.cvc.remaining_time(
                endpoint,
                cluster,
                zcl_data::cluster_library::level_control::ATTR_CURRENT_LEVEL,
            );
            return Some(AttributeValue::Unsigned16(remaining));
        }
        None
    }

    /// Write an attribute and run the post write steps
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn write_local(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        manufacturer: Option<u16>,
        value: AttributeValue,
        origin: WriteOrigin,
    ) -> Result<(), ClusterLibraryStatus> {
        let previous = self.store.write(
            endpoint,
            cluster,
            role,
            attribute,
            manufacturer,
            value.clone(),
            origin,
        )?;
        if previous != value {
            self.attribute_written(endpoint, cluster, role, attribute, value);
        }
        Ok(())
    }

    /// Set an attribute maintained by the service, failures are logged
    pub(crate) fn set_attribute(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        value: AttributeValue,
    ) {
        if self.store.record(endpoint, cluster, role, attribute, None).is_none() {
            return;
        }
        if let Err(status) =
            self.write_local(endpoint, cluster, role, attribute, None, value, WriteOrigin::Local)
        {
            log::error!(
                "Failed to set {:04x}:{:04x} on endpoint {}, {:?}",
                cluster,
                attribute,
                endpoint,
                status
            );
        }
    }

    fn attribute_written(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        value: AttributeValue,
    ) {
        self.reporting
            .attribute_changed(endpoint, cluster, role, attribute, &value);
        let scene_defined = self
            .store
            .record(endpoint, cluster, role, attribute, None)
            .map(|r| r.access.contains(Access::SCENE))
            .unwrap_or(false);
        self.notify(
            endpoint,
            CallbackStatus::Ok,
            DeviceEvent::SetAttributeValue {
                cluster,
                role,
                attribute,
                value,
            },
        );
        if role == Role::Server && scene_defined && self.scenes.has_fieldset(endpoint, cluster) {
            self.invalidate_scene(endpoint);
        }
    }

    fn process_transitions(&mut self) {
        self.cvc.tick(self.timestamp);
        loop {
            let events = self.cvc.take_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                match event {
                    TransitionEvent::Apply {
                        endpoint,
                        cluster,
                        attribute,
                        value,
                    } => self.apply_transition(endpoint, cluster, attribute, value),
                    TransitionEvent::Finished {
                        endpoint,
                        cluster,
                        attribute,
                        owner,
                        status,
                    } => {
                        self.notify(
                            endpoint,
                            CallbackStatus::Ok,
                            DeviceEvent::TransitionFinished {
                                cluster,
                                attribute,
                                owner,
                                status,
                            },
                        );
                        self.level_transition_finished(endpoint, owner, status);
                        self.recall_transition_finished(endpoint, owner, status);
                    }
                }
            }
        }
    }

    fn apply_transition(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        attribute: AttributeIdentifier,
        value: i64,
    ) {
        let data_type = match self
            .store
            .record(endpoint, cluster, Role::Server, attribute, None)
        {
            Some(record) => record.value.data_type(),
            None => return,
        };
        match AttributeValue::from_integer(data_type, value) {
            Ok(value) => self.set_attribute(endpoint, cluster, Role::Server, attribute, value),
            Err(err) => log::error!("Transition value {} rejected, {:?}", value, err),
        }
    }

    fn complete_transaction(&mut self, indication: &ApsIndication, frame: &Frame) -> bool {
        let header = &frame.header;
        let transaction = match self.transactions.complete(
            header.transaction_sequence,
            indication.source,
            indication.cluster,
            header.control.direction,
        ) {
            Some(transaction) => transaction,
            None => return false,
        };
        let status = if header.is_global() && header.command == GeneralCommandIdentifier::DefaultResponse {
            match DefaultResponse::unpack(frame.payload) {
                Ok((response, _)) => response.status,
                Err(_) => ClusterLibraryStatus::MalformedCommand,
            }
        } else {
            ClusterLibraryStatus::Success
        };
        match transaction.completion {
            Completion::Application(token) => {
                self.notify(
                    transaction.local_endpoint,
                    CallbackStatus::Ok,
                    DeviceEvent::TransactionComplete {
                        token,
                        status,
                        command: header.command,
                        payload: frame.payload,
                    },
                );
            }
            Completion::KeepAliveRead => self.keep_alive_response(frame, status),
        }
        true
    }

    fn transaction_timed_out(&mut self, transaction: Transaction) {
        log::warn!(
            "Transaction {} to {} timed out",
            transaction.sequence,
            transaction.peer
        );
        match transaction.completion {
            Completion::Application(token) => {
                self.notify(
                    transaction.local_endpoint,
                    CallbackStatus::Ok,
                    DeviceEvent::TransactionComplete {
                        token,
                        status: ClusterLibraryStatus::Timeout,
                        command: 0,
                        payload: &[],
                    },
                );
            }
            Completion::KeepAliveRead => self.check_in_failed(),
        }
    }

    fn send_due_reports(&mut self) {
        let now = self.timestamp;
        let due = self.reporting.due_reports(now);
        let mut index = 0;
        while index < due.len() {
            let first = due[index];
            let mut reports = ReportAttributes::default();
            let mut keys: Vec<ReportingKey, MAX_REPORTING> = Vec::new();
            while index < due.len()
                && due[index].endpoint == first.endpoint
                && due[index].cluster == first.cluster
                && due[index].role == first.role
                && reports.reports.len() < MAX_RECORDS
            {
                let key = due[index];
                index += 1;
                if let Ok(value) = self.store.read(
                    key.endpoint,
                    key.cluster,
                    key.role(),
                    key.attribute,
                    None,
                    WriteOrigin::Local,
                ) {
                    let value = value.clone();
                    let _ = reports.reports.push(AttributeReport {
                        identifier: key.attribute,
                        value,
                    });
                    let _ = keys.push(key);
                }
            }
            if reports.reports.is_empty() {
                continue;
            }
            let destinations: Vec<Destination, MAX_BINDINGS> = self
                .bindings
                .destinations(first.endpoint, first.cluster)
                .collect();
            let command = Command::ReportAttributes(reports.clone());
            for destination in destinations {
                let _ = self.send_global(
                    destination,
                    first.endpoint,
                    first.cluster,
                    first.role().sending(),
                    &command,
                );
            }
            for (key, report) in keys.iter().zip(reports.reports.iter()) {
                self.reporting.reported(key, report.value.clone(), now);
            }
        }
    }

    /// Send an unsolicited profile wide command
    pub(crate) fn send_global(
        &mut self,
        destination: Destination,
        source_endpoint: u8,
        cluster: ClusterIdentifier,
        direction: Direction,
        command: &Command,
    ) -> Result<u8, Error> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let (used, identifier) = command.pack(&mut buffer)?;
        let sequence = self.next_sequence();
        let header = ClusterLibraryHeader::new(
            FrameType::Global,
            direction,
            None,
            sequence,
            identifier.into(),
            true,
        );
        let profile = self.profile_of(source_endpoint);
        self.queue_frame(
            destination,
            source_endpoint,
            profile,
            cluster,
            &header,
            &buffer[..used],
        )?;
        Ok(sequence)
    }

    fn send_check_in(&mut self) {
        let trust_center = Destination::Unicast {
            address: self.policy.trust_center,
            endpoint: self.config.wwah.trust_center_endpoint,
        };
        let source_endpoint = self
            .store
            .endpoints_hosting(cluster::KEEP_ALIVE, Role::Client)
            .first()
            .copied();
        let source_endpoint = match source_endpoint {
            Some(endpoint) => endpoint,
            None => {
                self.check_in.stop();
                return;
            }
        };
        let mut request = ReadAttributes::default();
        let _ = request.attributes.push(keep_alive::ATTR_TC_KEEP_ALIVE_BASE);
        let _ = request.attributes.push(keep_alive::ATTR_TC_KEEP_ALIVE_JITTER);
        let sent = self.send_global(
            trust_center,
            source_endpoint,
            cluster::KEEP_ALIVE,
            Direction::ToServer,
            &Command::ReadAttributes(request),
        );
        let sequence = match sent {
            Ok(sequence) => sequence,
            Err(_) => {
                self.check_in_failed();
                return;
            }
        };
        let reserved = self.transactions.reserve(Transaction {
            sequence,
            peer: self.policy.trust_center,
            peer_endpoint: self.config.wwah.trust_center_endpoint,
            local_endpoint: source_endpoint,
            profile: self.profile_of(source_endpoint),
            cluster: cluster::KEEP_ALIVE,
            direction: Direction::ToServer,
            completion: Completion::KeepAliveRead,
            deadline: self
                .timestamp
                .wrapping_add(self.config.transaction_timeout),
        });
        if reserved.is_err() {
            self.check_in_failed();
        }
    }

    fn keep_alive_response(&mut self, frame: &Frame, status: ClusterLibraryStatus) {
        let response = if frame.header.is_global()
            && frame.header.command == GeneralCommandIdentifier::ReadAttributesResponse
        {
            match Command::unpack(frame.payload, GeneralCommandIdentifier::ReadAttributesResponse) {
                Ok((Command::ReadAttributesResponse(response), _)) => Some(response),
                _ => None,
            }
        } else {
            None
        };
        let response = match response {
            Some(response) if status == ClusterLibraryStatus::Success => response,
            _ => {
                self.check_in_failed();
                return;
            }
        };
        let mut base = None;
        let mut jitter = None;
        for record in response.attributes.iter() {
            match (record.identifier, &record.value) {
                (keep_alive::ATTR_TC_KEEP_ALIVE_BASE, Some(AttributeValue::Unsigned8(v))) => {
                    base = Some(*v)
                }
                (keep_alive::ATTR_TC_KEEP_ALIVE_JITTER, Some(AttributeValue::Unsigned16(v))) => {
                    jitter = Some(*v)
                }
                _ => {}
            }
        }
        log::info!("Trust center check-in, base {:?} jitter {:?}", base, jitter);
        self.check_in
            .succeeded(base, jitter, self.timestamp, &mut self.rng);
    }

    fn check_in_failed(&mut self) {
        if self.check_in.failed(self.timestamp, &mut self.rng) {
            let recover = self.wwah_flag(
                zcl_data::cluster_library::wwah::ATTR_BAD_PARENT_RECOVERY_ENABLED,
                false,
            );
            log::warn!("Bad parent, recover {}", recover);
            self.notify(0, CallbackStatus::Ok, DeviceEvent::BadParent { recover });
        }
    }

    pub(crate) fn policy_flags(&self) -> PolicyFlags {
        use zcl_data::cluster_library::wwah::{
            ATTR_CONFIGURATION_MODE_ENABLED, ATTR_MGMT_LEAVE_WITHOUT_REJOIN_ENABLED,
            ATTR_TOUCHLINK_INTERPAN_ENABLED,
        };
        let defaults = PolicyFlags::default();
        PolicyFlags {
            configuration_mode: self
                .wwah_flag(ATTR_CONFIGURATION_MODE_ENABLED, defaults.configuration_mode),
            leave_without_rejoin: self.wwah_flag(
                ATTR_MGMT_LEAVE_WITHOUT_REJOIN_ENABLED,
                defaults.leave_without_rejoin,
            ),
            touchlink_interpan: self
                .wwah_flag(ATTR_TOUCHLINK_INTERPAN_ENABLED, defaults.touchlink_interpan),
        }
    }
}

#[cfg(test)]
mod tests;
