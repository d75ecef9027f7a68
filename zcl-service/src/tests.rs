use std::collections::HashMap;

use super::*;

use heapless::spsc::{Consumer, Queue};

use zcl_data::cluster_library::commands::{
    AttributeStatus, DiscoverAttributes, ReadAttributesResponse, WriteAttributeRecord,
    WriteAttributes,
};
use zcl_data::cluster_library::drlc::{
    DeviceClass, EventControl, EventStatus, LoadControlEvent, ReportEventStatus,
    CMD_LOAD_CONTROL_EVENT, CMD_REPORT_EVENT_STATUS, START_NOW,
};
use zcl_data::cluster_library::energy_management::{
    ActionsRequired, ManageEvent, ManagedEventStatus, ATTR_CURRENT_EVENT_ID, CMD_MANAGE_EVENT,
    NO_CURRENT_EVENT,
};
use zcl_data::cluster_library::groups::{AddGroup, GroupStatusResponse, CMD_ADD_GROUP};
use zcl_data::cluster_library::level_control::{ATTR_CURRENT_LEVEL, ATTR_ON_OFF_TRANSITION_TIME};
use zcl_data::cluster_library::on_off::ATTR_ON_OFF;
use zcl_data::cluster_library::scenes::{
    AddScene, CopyScene, ExtensionFieldSet, GetSceneMembershipResponse, GroupRequest,
    RecallScene, SceneRequest, SceneStatusResponse, ScenesCommand, ATTR_CURRENT_GROUP,
    ATTR_CURRENT_SCENE, ATTR_SCENE_COUNT, ATTR_SCENE_VALID,
};
use zcl_data::cluster_library::PROFILE_HOME_AUTOMATION;
use zcl_data::CharacterString;

use crate::cluster_library::{
    drlc as load_control, energy_management, groups, level_control, on_off, scenes, wwah,
};
use crate::cvc::{TransitionOwner, TransitionStatus};
use crate::persistence::{PersistentStorage, RecordTag};

const QUEUE_SIZE: usize = 16;

#[derive(Default)]
struct Recorder {
    resets: usize,
    groups_added: std::vec::Vec<u16>,
    load_control: std::vec::Vec<EventStatus>,
    scenes_removed: std::vec::Vec<(u16, u8)>,
    finished: std::vec::Vec<(TransitionOwner, TransitionStatus)>,
}

impl DeviceHandler for Recorder {
    fn device_callback(&mut self, parameters: &mut CallbackParameters) {
        match parameters.event {
            DeviceEvent::ResetToFactoryDefaults => self.resets += 1,
            DeviceEvent::GroupAdded { group } => self.groups_added.push(group),
            DeviceEvent::LoadControlEvent { status, .. } => self.load_control.push(status),
            DeviceEvent::SceneRemoved { group, scene } => self.scenes_removed.push((group, scene)),
            DeviceEvent::TransitionFinished { owner, status, .. } => {
                self.finished.push((owner, status))
            }
            _ => {}
        }
    }
}

#[derive(Default)]
struct MemoryStorage {
    records: HashMap<u8, std::vec::Vec<u8>>,
}

impl PersistentStorage for MemoryStorage {
    fn read(&mut self, tag: RecordTag, buffer: &mut [u8]) -> Result<usize, Error> {
        match self.records.get(&u8::from(tag)) {
            Some(data) => {
                buffer[..data.len()].copy_from_slice(data);
                Ok(data.len())
            }
            None => Ok(0),
        }
    }

    fn write(&mut self, tag: RecordTag, data: &[u8]) -> Result<(), Error> {
        self.records.insert(tag.into(), data.to_vec());
        Ok(())
    }
}

type Service<'a> = ClusterLibraryService<'a, Recorder, QUEUE_SIZE>;

fn light(producer: Producer<'_, OutgoingFrame, QUEUE_SIZE>) -> Service<'_> {
    let mut service = ClusterLibraryService::new(Config::default(), Recorder::default(), producer);
    service
        .add_endpoint(EndpointDescriptor {
            endpoint: 1,
            profile: PROFILE_HOME_AUTOMATION,
            device: 0x0101,
        })
        .unwrap();
    let clusters: [(ClusterIdentifier, &[AttributeRecord]); 4] = [
        (cluster::GROUPS, &groups::server_attributes()),
        (cluster::SCENES, &scenes::server_attributes()),
        (cluster::ON_OFF, &on_off::server_attributes(true)),
        (cluster::LEVEL_CONTROL, &level_control::server_attributes(128)),
    ];
    for (identifier, attributes) in clusters {
        service
            .add_cluster(1, identifier, Role::Server, None, 1, attributes)
            .unwrap();
    }
    service
        .add_cluster(
            1,
            cluster::WORKS_WITH_ALL_HUBS,
            Role::Server,
            Some(zcl_data::cluster_library::wwah::MANUFACTURER_CODE),
            1,
            &wwah::server_attributes(),
        )
        .unwrap();
    service
}

fn demand_response(service: &mut Service) {
    let config = *service.config();
    service
        .add_cluster(
            1,
            cluster::DEMAND_RESPONSE,
            Role::Client,
            None,
            2,
            &load_control::client_attributes(&config.drlc),
        )
        .unwrap();
    service
        .add_cluster(
            1,
            cluster::ENERGY_MANAGEMENT,
            Role::Server,
            None,
            1,
            &energy_management::server_attributes(),
        )
        .unwrap();
}

fn directed(
    frame_type: FrameType,
    direction: Direction,
    command: u8,
    payload: &[u8],
    no_default: bool,
) -> std::vec::Vec<u8> {
    let header = ClusterLibraryHeader::new(frame_type, direction, None, 0x17, command, no_default);
    let mut buffer = [0u8; MAX_FRAME_SIZE];
    let used = Frame { header, payload }.serialize(&mut buffer).unwrap();
    buffer[..used].to_vec()
}

fn frame(frame_type: FrameType, command: u8, payload: &[u8], no_default: bool) -> std::vec::Vec<u8> {
    directed(frame_type, Direction::ToServer, command, payload, no_default)
}

fn global(command: &Command) -> std::vec::Vec<u8> {
    let mut buffer = [0u8; MAX_FRAME_SIZE];
    let (used, identifier) = command.pack(&mut buffer).unwrap();
    frame(FrameType::Global, identifier.into(), &buffer[..used], false)
}

fn local<P: Pack<P, zcl_data::Error>>(command: u8, payload: &P) -> std::vec::Vec<u8> {
    let mut buffer = [0u8; MAX_FRAME_SIZE];
    let used = payload.pack(&mut buffer).unwrap();
    frame(FrameType::Local, command, &buffer[..used], false)
}

fn from(source: u16, cluster: ClusterIdentifier) -> ApsIndication {
    ApsIndication::unicast(source, 1, 1, PROFILE_HOME_AUTOMATION, cluster)
}

fn drain(consumer: &mut Consumer<'_, OutgoingFrame, QUEUE_SIZE>) -> std::vec::Vec<OutgoingFrame> {
    let mut frames = std::vec::Vec::new();
    while let Some(frame) = consumer.dequeue() {
        frames.push(frame);
    }
    frames
}

fn global_response(frame: &OutgoingFrame) -> Command {
    let parsed = Frame::parse(&frame.payload).unwrap();
    assert!(parsed.header.is_global());
    let identifier = GeneralCommandIdentifier::try_from(parsed.header.command).unwrap();
    Command::unpack(parsed.payload, identifier).unwrap().0
}

fn default_status(frame: &OutgoingFrame) -> ClusterLibraryStatus {
    match global_response(frame) {
        Command::DefaultResponse(response) => response.status,
        other => panic!("unexpected {:?}", other),
    }
}

fn scene_response<P: Pack<P, zcl_data::Error>>(frame: &OutgoingFrame, command: ScenesCommand) -> P {
    let parsed = Frame::parse(&frame.payload).unwrap();
    assert!(!parsed.header.is_global());
    assert_eq!(parsed.header.command, u8::from(command));
    P::unpack(parsed.payload).unwrap().0
}

fn scenes_request<P: Pack<P, zcl_data::Error>>(
    service: &mut Service,
    consumer: &mut Consumer<'_, OutgoingFrame, QUEUE_SIZE>,
    command: ScenesCommand,
    payload: &P,
    timestamp: u32,
) -> std::vec::Vec<OutgoingFrame> {
    service
        .receive(
            &from(0x1234, cluster::SCENES),
            &local(command.into(), payload),
            timestamp,
        )
        .unwrap();
    drain(consumer)
}

fn scene_attribute(service: &Service, attribute: u16) -> AttributeValue {
    service
        .read_attribute(1, cluster::SCENES, Role::Server, attribute)
        .unwrap()
}

fn current_level(service: &Service) -> AttributeValue {
    service
        .read_attribute(1, cluster::LEVEL_CONTROL, Role::Server, ATTR_CURRENT_LEVEL)
        .unwrap()
}

fn set_level(service: &mut Service, level: u8) {
    service
        .write_attribute(
            1,
            cluster::LEVEL_CONTROL,
            Role::Server,
            ATTR_CURRENT_LEVEL,
            AttributeValue::Unsigned8(level),
        )
        .unwrap();
}

fn report_statuses(frames: &[OutgoingFrame]) -> std::vec::Vec<EventStatus> {
    frames
        .iter()
        .filter(|f| f.request.cluster == cluster::DEMAND_RESPONSE)
        .map(|f| {
            let parsed = Frame::parse(&f.payload).unwrap();
            assert_eq!(parsed.header.command, CMD_REPORT_EVENT_STATUS);
            ReportEventStatus::unpack(parsed.payload).unwrap().0.event_status
        })
        .collect()
}

#[test]
fn read_attributes() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    let mut request = ReadAttributes::default();
    request.attributes.push(ATTR_ON_OFF).unwrap();
    request.attributes.push(0x1234).unwrap();
    let data = global(&Command::ReadAttributes(request));
    service.receive(&from(0x1234, cluster::ON_OFF), &data, 0).unwrap();

    let frames = drain(&mut consumer);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].request.destination, Destination::unicast(0x1234, 1));
    let response = match global_response(&frames[0]) {
        Command::ReadAttributesResponse(response) => response,
        other => panic!("unexpected {:?}", other),
    };
    let expected = ReadAttributesResponse {
        attributes: [
            AttributeStatus {
                identifier: ATTR_ON_OFF,
                status: ClusterLibraryStatus::Success,
                value: Some(AttributeValue::Boolean(true)),
            },
            AttributeStatus {
                identifier: 0x1234,
                status: ClusterLibraryStatus::UnsupportedAttribute,
                value: None,
            },
        ]
        .into_iter()
        .collect(),
    };
    assert_eq!(response, expected);
}

#[test]
fn remote_write_to_read_only_attribute() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    let mut request = WriteAttributes::default();
    request
        .attributes
        .push(WriteAttributeRecord {
            identifier: ATTR_ON_OFF,
            value: AttributeValue::Boolean(false),
        })
        .unwrap();
    let data = global(&Command::WriteAttributes(request));
    service.receive(&from(0x1234, cluster::ON_OFF), &data, 0).unwrap();

    let frames = drain(&mut consumer);
    let response = match global_response(&frames[0]) {
        Command::WriteAttributesResponse(response) => response,
        other => panic!("unexpected {:?}", other),
    };
    assert!(!response.is_success());
    assert_eq!(response.attributes[0].status, ClusterLibraryStatus::ReadOnly);
    assert!(service.is_on(1));
}

#[test]
fn unsupported_cluster() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    let data = frame(FrameType::Local, 0x00, &[], true);
    service.receive(&from(0x1234, 0x0300), &data, 0).unwrap();

    let frames = drain(&mut consumer);
    assert_eq!(frames.len(), 1);
    assert_eq!(default_status(&frames[0]), ClusterLibraryStatus::UnsupportedCluster);
}

#[test]
fn default_response_follows_the_request() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);

    service
        .receive(&from(0x1234, cluster::ON_OFF), &frame(FrameType::Local, 0x00, &[], true), 0)
        .unwrap();
    assert!(!service.is_on(1));
    assert!(drain(&mut consumer).is_empty());

    service
        .receive(&from(0x1234, cluster::ON_OFF), &frame(FrameType::Local, 0x01, &[], false), 10)
        .unwrap();
    assert!(service.is_on(1));
    let frames = drain(&mut consumer);
    assert_eq!(frames.len(), 1);
    assert_eq!(default_status(&frames[0]), ClusterLibraryStatus::Success);

    let malformed = [0x01, 0x17];
    assert_eq!(
        service.receive(&from(0x1234, cluster::ON_OFF), &malformed, 20),
        Err(Error::MalformedFrame)
    );
}

#[test]
fn add_group_command() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    let request = AddGroup {
        group: 0x0042,
        name: CharacterString::new(),
    };
    service
        .receive(&from(0x1234, cluster::GROUPS), &local(CMD_ADD_GROUP, &request), 0)
        .unwrap();

    let frames = drain(&mut consumer);
    assert_eq!(frames.len(), 1);
    let parsed = Frame::parse(&frames[0].payload).unwrap();
    assert_eq!(parsed.header.command, CMD_ADD_GROUP);
    let (response, _) = GroupStatusResponse::unpack(parsed.payload).unwrap();
    assert_eq!(response.status, ClusterLibraryStatus::Success);
    assert_eq!(response.group, 0x0042);
    assert!(service.groups().contains(1, 0x0042));
    assert_eq!(service.handler().groups_added, [0x0042]);

    let invalid = AddGroup {
        group: 0x0000,
        name: CharacterString::new(),
    };
    service
        .receive(&from(0x1234, cluster::GROUPS), &local(CMD_ADD_GROUP, &invalid), 10)
        .unwrap();
    let frames = drain(&mut consumer);
    let parsed = Frame::parse(&frames[0].payload).unwrap();
    let (response, _) = GroupStatusResponse::unpack(parsed.payload).unwrap();
    assert_eq!(response.status, ClusterLibraryStatus::InvalidValue);
}

#[test]
fn group_frames_reach_members_only() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    let indication = ApsIndication {
        group: Some(0x0005),
        destination_endpoint: BROADCAST_ENDPOINT,
        ..from(0x1234, cluster::ON_OFF)
    };
    let off = frame(FrameType::Local, 0x00, &[], false);
    service.receive(&indication, &off, 0).unwrap();
    assert!(service.is_on(1));

    service.join_group(1, 0x0005).unwrap();
    service.receive(&indication, &off, 10).unwrap();
    assert!(!service.is_on(1));
    assert!(drain(&mut consumer).is_empty());
}

#[test]
fn save_and_restore() {
    let mut storage = MemoryStorage::default();
    {
        let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
        let (producer, _consumer) = queue.split();
        let mut service = light(producer);
        service.join_group(1, 0x0010).unwrap();
        service
            .write_attribute(
                1,
                cluster::LEVEL_CONTROL,
                Role::Server,
                ATTR_CURRENT_LEVEL,
                AttributeValue::Unsigned8(40),
            )
            .unwrap();
        service.store_scene(1, 0x0010, 3).unwrap();
        service
            .write_attribute(
                1,
                cluster::LEVEL_CONTROL,
                Role::Server,
                ATTR_CURRENT_LEVEL,
                AttributeValue::Unsigned8(90),
            )
            .unwrap();
        service.policy.require_aps_acks(&[cluster::ON_OFF], true).unwrap();
        service.save(&mut storage).unwrap();
    }
    assert!(storage.records.contains_key(&u8::from(RecordTag::Attributes)));

    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, _consumer) = queue.split();
    let mut service = light(producer);
    service.restore(&mut storage).unwrap();

    assert_eq!(
        service
            .read_attribute(1, cluster::LEVEL_CONTROL, Role::Server, ATTR_CURRENT_LEVEL)
            .unwrap(),
        AttributeValue::Unsigned8(90)
    );
    assert!(service.groups().contains(1, 0x0010));
    assert!(service.scenes().find(1, 0x0010, 3).is_some());
    assert_eq!(
        service
            .read_attribute(1, cluster::SCENES, Role::Server, ATTR_SCENE_COUNT)
            .unwrap(),
        AttributeValue::Unsigned8(1)
    );
    assert!(service.policy().requires_aps_ack(cluster::ON_OFF));

    service.recall_scene(1, 0x0010, 3, Some(0)).unwrap();
    assert_eq!(
        service
            .read_attribute(1, cluster::LEVEL_CONTROL, Role::Server, ATTR_CURRENT_LEVEL)
            .unwrap(),
        AttributeValue::Unsigned8(40)
    );
}

#[test]
fn corrupt_record_is_reported() {
    let mut storage = MemoryStorage::default();
    storage
        .records
        .insert(RecordTag::Groups.into(), vec![0x06, 0x01, 0x04, 0x00, 0x01]);
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, _consumer) = queue.split();
    let mut service = light(producer);
    assert_eq!(service.restore(&mut storage), Err(Error::InvalidRecord));
}

#[test]
fn reset_to_factory_defaults() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    service.join_group(1, 0x0010).unwrap();
    service.store_scene(1, 0x0010, 1).unwrap();
    service
        .write_attribute(
            1,
            cluster::LEVEL_CONTROL,
            Role::Server,
            ATTR_CURRENT_LEVEL,
            AttributeValue::Unsigned8(20),
        )
        .unwrap();
    service.policy.require_aps_acks(&[cluster::ON_OFF], true).unwrap();

    let reset = frame(
        FrameType::Local,
        zcl_data::cluster_library::basic::CMD_RESET_TO_FACTORY_DEFAULTS,
        &[],
        true,
    );
    service
        .add_cluster(
            1,
            cluster::BASIC,
            Role::Server,
            None,
            3,
            &cluster_library::basic::BasicInformation::default().server_attributes(),
        )
        .unwrap();
    service
        .receive(&from(0x0000, cluster::BASIC), &reset, 0)
        .unwrap();

    assert_eq!(service.handler().resets, 1);
    assert!(service.groups().entries().is_empty());
    assert!(service.scenes().entries().is_empty());
    assert!(!service.policy().requires_aps_ack(cluster::ON_OFF));
    assert_eq!(
        service
            .read_attribute(1, cluster::LEVEL_CONTROL, Role::Server, ATTR_CURRENT_LEVEL)
            .unwrap(),
        AttributeValue::Unsigned8(128)
    );
    assert!(drain(&mut consumer).is_empty());
}

#[test]
fn trust_center_is_told_when_refused() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    service.policy.require_aps_acks(&[cluster::ON_OFF], true).unwrap();

    let toggle = frame(FrameType::Local, 0x02, &[], false);
    service.receive(&from(0x0000, cluster::ON_OFF), &toggle, 0).unwrap();
    assert!(service.is_on(1));
    let frames = drain(&mut consumer);
    assert_eq!(frames.len(), 1);
    assert_eq!(default_status(&frames[0]), ClusterLibraryStatus::NotAuthorised);

    let downgrade = frame(FrameType::Local, 0x14, &[], false);
    service
        .receive(&from(0x4321, cluster::WORKS_WITH_ALL_HUBS), &downgrade, 10)
        .unwrap();
    assert!(drain(&mut consumer).is_empty());
}

fn event(issuer_event_id: u32) -> LoadControlEvent {
    LoadControlEvent {
        issuer_event_id,
        device_class: DeviceClass::all(),
        utility_enrollment_group: 0,
        start_time: START_NOW,
        duration: 1,
        criticality_level: 1,
        cooling_temperature_offset: 0xff,
        heating_temperature_offset: 0xff,
        cooling_temperature_set_point: i16::MIN,
        heating_temperature_set_point: i16::MIN,
        average_load_adjustment_percentage: i8::MIN,
        duty_cycle: 0xff,
        event_control: EventControl::empty(),
    }
}

fn current_event(service: &Service) -> AttributeValue {
    service
        .read_attribute(1, cluster::ENERGY_MANAGEMENT, Role::Server, ATTR_CURRENT_EVENT_ID)
        .unwrap()
}

#[test]
fn load_control_event_lifecycle() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    demand_response(&mut service);
    service.set_utc_time(1_000, 0);

    let indication = from(0x0000, cluster::DEMAND_RESPONSE);
    let mut buffer = [0u8; MAX_FRAME_SIZE];
    let used = event(0x0101).pack(&mut buffer).unwrap();
    let data = directed(
        FrameType::Local,
        Direction::ToClient,
        CMD_LOAD_CONTROL_EVENT,
        &buffer[..used],
        false,
    );
    service.receive(&indication, &data, 0).unwrap();
    assert_eq!(
        report_statuses(&drain(&mut consumer)),
        [EventStatus::LoadControlEventReceived]
    );

    service.update(0).unwrap();
    assert_eq!(report_statuses(&drain(&mut consumer)), [EventStatus::EventStarted]);
    assert_eq!(current_event(&service), AttributeValue::Unsigned32(0x0101));

    let manage = ManageEvent {
        issuer_event_id: 0x0101,
        device_class: DeviceClass::all(),
        utility_enrollment_group: 0,
        actions_required: ActionsRequired::OPT_OUT,
    };
    let data = local(CMD_MANAGE_EVENT, &manage);
    service
        .receive(&from(0x2222, cluster::ENERGY_MANAGEMENT), &data, 1_000)
        .unwrap();
    let frames = drain(&mut consumer);
    let managed = frames
        .iter()
        .find(|f| f.request.cluster == cluster::ENERGY_MANAGEMENT)
        .unwrap();
    let parsed = Frame::parse(&managed.payload).unwrap();
    let (status, _) = ManagedEventStatus::unpack(parsed.payload).unwrap();
    assert_eq!(status.0.event_status, EventStatus::OptOut);
    assert_eq!(report_statuses(&frames), [EventStatus::OptOut]);

    service.update(60_000).unwrap();
    assert_eq!(
        report_statuses(&drain(&mut consumer)),
        [EventStatus::CompletedNoUser]
    );
    assert_eq!(current_event(&service), AttributeValue::Unsigned32(NO_CURRENT_EVENT));
    assert_eq!(
        service.handler().load_control,
        [
            EventStatus::LoadControlEventReceived,
            EventStatus::EventStarted,
            EventStatus::OptOut,
            EventStatus::CompletedNoUser,
        ]
    );
}

#[test]
fn transaction_times_out() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    let sequence = service
        .send_command(&CommandRequest {
            destination: Destination::unicast(0x3333, 1),
            source_endpoint: 1,
            profile: PROFILE_HOME_AUTOMATION,
            cluster: cluster::ON_OFF,
            direction: Direction::ToServer,
            frame_type: FrameType::Local,
            manufacturer: None,
            command: 0x02,
            payload: &[],
            token: Some(7),
        })
        .unwrap();
    let frames = drain(&mut consumer);
    let parsed = Frame::parse(&frames[0].payload).unwrap();
    assert_eq!(parsed.header.transaction_sequence, sequence);
    assert!(!parsed.header.control.disable_default_response);
    assert_eq!(service.next_deadline(), service.config().transaction_timeout);
    assert_eq!(service.timeout(), Ok(0));
}

#[test]
fn discover_attributes_in_pages() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    let first = DiscoverAttributes {
        start: 0x0000,
        maximum: 1,
    };
    service
        .receive(&from(0x1234, cluster::ON_OFF), &global(&Command::DiscoverAttributes(first)), 0)
        .unwrap();
    let frames = drain(&mut consumer);
    let response = match global_response(&frames[0]) {
        Command::DiscoverAttributesResponse(response) => response,
        other => panic!("unexpected {:?}", other),
    };
    assert!(!response.complete);
    let identifiers: std::vec::Vec<u16> = response.attributes.iter().map(|a| a.identifier).collect();
    assert_eq!(identifiers, [ATTR_ON_OFF]);

    let rest = DiscoverAttributes {
        start: ATTR_ON_OFF + 1,
        maximum: 8,
    };
    service
        .receive(&from(0x1234, cluster::ON_OFF), &global(&Command::DiscoverAttributes(rest)), 10)
        .unwrap();
    let frames = drain(&mut consumer);
    let response = match global_response(&frames[0]) {
        Command::DiscoverAttributesResponse(response) => response,
        other => panic!("unexpected {:?}", other),
    };
    assert!(response.complete);
    let identifiers: std::vec::Vec<u16> = response.attributes.iter().map(|a| a.identifier).collect();
    assert_eq!(identifiers, [0xfffd]);
}

#[test]
fn remove_scene_command() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    service.join_group(1, 0x0010).unwrap();
    service.store_scene(1, 0x0010, 1).unwrap();
    service.store_scene(1, 0x0010, 2).unwrap();
    drain(&mut consumer);

    let request = SceneRequest {
        group: 0x0010,
        scene: 1,
    };
    let frames = scenes_request(&mut service, &mut consumer, ScenesCommand::RemoveScene, &request, 0);
    let response: SceneStatusResponse = scene_response(&frames[0], ScenesCommand::RemoveScene);
    assert_eq!(response.status, ClusterLibraryStatus::Success);
    assert_eq!((response.group, response.scene), (0x0010, 1));
    assert!(service.scenes().find(1, 0x0010, 1).is_none());
    assert!(service.scenes().find(1, 0x0010, 2).is_some());
    assert_eq!(scene_attribute(&service, ATTR_SCENE_COUNT), AttributeValue::Unsigned8(1));
    assert_eq!(service.handler().scenes_removed, [(0x0010, 1)]);

    let frames = scenes_request(&mut service, &mut consumer, ScenesCommand::RemoveScene, &request, 10);
    let response: SceneStatusResponse = scene_response(&frames[0], ScenesCommand::RemoveScene);
    assert_eq!(response.status, ClusterLibraryStatus::NotFound);

    let other = SceneRequest {
        group: 0x0020,
        scene: 2,
    };
    let frames = scenes_request(&mut service, &mut consumer, ScenesCommand::RemoveScene, &other, 20);
    let response: SceneStatusResponse = scene_response(&frames[0], ScenesCommand::RemoveScene);
    assert_eq!(response.status, ClusterLibraryStatus::InvalidField);
    assert_eq!(service.scenes().count(1), 1);
}

#[test]
fn remove_all_scenes_of_a_group() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    service.join_group(1, 0x0010).unwrap();
    service.store_scene(1, 0x0010, 1).unwrap();
    service.store_scene(1, 0x0010, 2).unwrap();
    service.store_scene(1, 0x0000, 5).unwrap();
    drain(&mut consumer);

    let request = GroupRequest { group: 0x0010 };
    let frames = scenes_request(&mut service, &mut consumer, ScenesCommand::RemoveAllScenes, &request, 0);
    let response: GroupStatusResponse = scene_response(&frames[0], ScenesCommand::RemoveAllScenes);
    assert_eq!(response.status, ClusterLibraryStatus::Success);
    assert_eq!(response.group, 0x0010);
    assert!(service.scenes().scenes(1, 0x0010).is_empty());
    assert!(service.scenes().find(1, 0x0000, 5).is_some());
    assert_eq!(scene_attribute(&service, ATTR_SCENE_COUNT), AttributeValue::Unsigned8(1));
    assert_eq!(service.handler().scenes_removed.len(), 2);
}

#[test]
fn remove_all_scenes_with_global_group() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    service.join_group(1, 0x0010).unwrap();
    service.store_scene(1, 0x0010, 1).unwrap();
    service.store_scene(1, 0x0000, 5).unwrap();
    service.store_scene(1, 0x0000, 6).unwrap();
    assert_eq!(scene_attribute(&service, ATTR_CURRENT_SCENE), AttributeValue::Unsigned8(6));
    assert_eq!(scene_attribute(&service, ATTR_SCENE_VALID), AttributeValue::Boolean(true));
    drain(&mut consumer);

    let request = GroupRequest { group: 0x0000 };
    let frames = scenes_request(&mut service, &mut consumer, ScenesCommand::RemoveAllScenes, &request, 0);
    let response: GroupStatusResponse = scene_response(&frames[0], ScenesCommand::RemoveAllScenes);
    assert_eq!(response.status, ClusterLibraryStatus::Success);
    assert!(service.scenes().entries().is_empty());
    assert_eq!(scene_attribute(&service, ATTR_SCENE_COUNT), AttributeValue::Unsigned8(0));
    assert_eq!(scene_attribute(&service, ATTR_CURRENT_SCENE), AttributeValue::Unsigned8(0));
    assert_eq!(scene_attribute(&service, ATTR_CURRENT_GROUP), AttributeValue::Unsigned16(0));
    assert_eq!(scene_attribute(&service, ATTR_SCENE_VALID), AttributeValue::Boolean(false));
    assert_eq!(service.handler().scenes_removed.len(), 3);
}

#[test]
fn copy_scene_command() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    service.join_group(1, 0x0010).unwrap();
    service.join_group(1, 0x0020).unwrap();
    set_level(&mut service, 40);
    service.store_scene(1, 0x0010, 1).unwrap();
    set_level(&mut service, 60);
    service.store_scene(1, 0x0010, 2).unwrap();
    set_level(&mut service, 90);
    service.store_scene(1, 0x0020, 1).unwrap();
    drain(&mut consumer);

    let single = CopyScene {
        copy_all: false,
        group_from: 0x0010,
        scene_from: 2,
        group_to: 0x0020,
        scene_to: 7,
    };
    let frames = scenes_request(&mut service, &mut consumer, ScenesCommand::CopyScene, &single, 0);
    let response: SceneStatusResponse = scene_response(&frames[0], ScenesCommand::CopyScene);
    assert_eq!(response.status, ClusterLibraryStatus::Success);
    assert_eq!((response.group, response.scene), (0x0010, 2));
    assert_eq!(
        service.scenes().find(1, 0x0020, 7).unwrap().fieldsets,
        service.scenes().find(1, 0x0010, 2).unwrap().fieldsets
    );

    let all = CopyScene {
        copy_all: true,
        group_from: 0x0010,
        scene_from: 0,
        group_to: 0x0020,
        scene_to: 0,
    };
    let frames = scenes_request(&mut service, &mut consumer, ScenesCommand::CopyScene, &all, 10);
    let response: SceneStatusResponse = scene_response(&frames[0], ScenesCommand::CopyScene);
    assert_eq!(response.status, ClusterLibraryStatus::Success);
    assert_eq!(
        service.scenes().find(1, 0x0020, 1).unwrap().fieldsets,
        service.scenes().find(1, 0x0010, 1).unwrap().fieldsets
    );
    assert!(service.scenes().find(1, 0x0020, 2).is_some());
    assert!(service.scenes().find(1, 0x0020, 7).is_some());
    assert_eq!(scene_attribute(&service, ATTR_SCENE_COUNT), AttributeValue::Unsigned8(5));

    let missing = CopyScene {
        scene_from: 9,
        ..single
    };
    let frames = scenes_request(&mut service, &mut consumer, ScenesCommand::CopyScene, &missing, 20);
    let response: SceneStatusResponse = scene_response(&frames[0], ScenesCommand::CopyScene);
    assert_eq!(response.status, ClusterLibraryStatus::NotFound);
}

#[test]
fn get_scene_membership_command() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    service.join_group(1, 0x0010).unwrap();
    service.store_scene(1, 0x0010, 3).unwrap();
    service.store_scene(1, 0x0010, 1).unwrap();
    service.store_scene(1, 0x0000, 4).unwrap();
    drain(&mut consumer);

    let request = GroupRequest { group: 0x0010 };
    let frames =
        scenes_request(&mut service, &mut consumer, ScenesCommand::GetSceneMembership, &request, 0);
    let response: GetSceneMembershipResponse =
        scene_response(&frames[0], ScenesCommand::GetSceneMembership);
    assert_eq!(response.status, ClusterLibraryStatus::Success);
    assert_eq!(response.capacity, (scenes::MAX_SCENES - 3) as u8);
    assert_eq!(response.group, 0x0010);
    let mut listed = response.scenes.unwrap();
    listed.sort_unstable();
    assert_eq!(listed[..], [1, 3]);

    let other = GroupRequest { group: 0x0020 };
    let frames =
        scenes_request(&mut service, &mut consumer, ScenesCommand::GetSceneMembership, &other, 10);
    let response: GetSceneMembershipResponse =
        scene_response(&frames[0], ScenesCommand::GetSceneMembership);
    assert_eq!(response.status, ClusterLibraryStatus::InvalidField);
    assert_eq!(response.capacity, (scenes::MAX_SCENES - 3) as u8);
    assert_eq!(response.scenes, None);
}

#[test]
fn scene_attribute_write_clears_scene_valid() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, _consumer) = queue.split();
    let mut service = light(producer);
    service.store_scene(1, 0x0000, 1).unwrap();
    assert_eq!(scene_attribute(&service, ATTR_SCENE_VALID), AttributeValue::Boolean(true));

    service
        .write_attribute(
            1,
            cluster::LEVEL_CONTROL,
            Role::Server,
            ATTR_ON_OFF_TRANSITION_TIME,
            AttributeValue::Unsigned16(5),
        )
        .unwrap();
    assert_eq!(scene_attribute(&service, ATTR_SCENE_VALID), AttributeValue::Boolean(true));

    set_level(&mut service, 30);
    assert_eq!(scene_attribute(&service, ATTR_SCENE_VALID), AttributeValue::Boolean(false));
    assert_eq!(scene_attribute(&service, ATTR_CURRENT_SCENE), AttributeValue::Unsigned8(1));
}

#[test]
fn overlapping_recall_cancels_the_first() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    set_level(&mut service, 40);
    service.store_scene(1, 0x0000, 1).unwrap();
    set_level(&mut service, 200);
    service.store_scene(1, 0x0000, 2).unwrap();
    set_level(&mut service, 128);
    drain(&mut consumer);

    let first = RecallScene {
        group: 0x0000,
        scene: 1,
        transition_time: Some(2),
    };
    let frames = scenes_request(&mut service, &mut consumer, ScenesCommand::RecallScene, &first, 0);
    assert_eq!(default_status(&frames[0]), ClusterLibraryStatus::Success);
    assert!(service.handler().finished.is_empty());

    let second = RecallScene {
        group: 0x0000,
        scene: 2,
        transition_time: Some(2),
    };
    scenes_request(&mut service, &mut consumer, ScenesCommand::RecallScene, &second, 500);
    assert_eq!(
        service.handler().finished,
        [(
            TransitionOwner::SceneRecall { group: 0, scene: 1 },
            TransitionStatus::Cancelled
        )]
    );

    service.update(3000).unwrap();
    assert_eq!(current_level(&service), AttributeValue::Unsigned8(200));
    assert_eq!(
        service.handler().finished.last(),
        Some(&(
            TransitionOwner::SceneRecall { group: 0, scene: 2 },
            TransitionStatus::Completed
        ))
    );
    assert_eq!(scene_attribute(&service, ATTR_CURRENT_SCENE), AttributeValue::Unsigned8(2));
    assert_eq!(scene_attribute(&service, ATTR_SCENE_VALID), AttributeValue::Boolean(true));
}

#[test]
fn recall_clamps_stored_values() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    let mut fieldsets = heapless::Vec::new();
    fieldsets
        .push(ExtensionFieldSet {
            cluster: cluster::LEVEL_CONTROL,
            data: heapless::Vec::from_slice(&[0xff]).unwrap(),
        })
        .unwrap();
    let request = AddScene {
        group: 0x0000,
        scene: 3,
        transition_time: 0,
        name: CharacterString::new(),
        fieldsets,
    };
    let frames = scenes_request(&mut service, &mut consumer, ScenesCommand::AddScene, &request, 0);
    let response: SceneStatusResponse = scene_response(&frames[0], ScenesCommand::AddScene);
    assert_eq!(response.status, ClusterLibraryStatus::Success);

    service.recall_scene(1, 0x0000, 3, None).unwrap();
    assert_eq!(current_level(&service), AttributeValue::Unsigned8(254));
    assert_eq!(scene_attribute(&service, ATTR_CURRENT_SCENE), AttributeValue::Unsigned8(3));

    set_level(&mut service, 128);
    let recall = RecallScene {
        group: 0x0000,
        scene: 3,
        transition_time: Some(1),
    };
    let frames = scenes_request(&mut service, &mut consumer, ScenesCommand::RecallScene, &recall, 100);
    assert_eq!(default_status(&frames[0]), ClusterLibraryStatus::Success);
    service.update(1500).unwrap();
    assert_eq!(current_level(&service), AttributeValue::Unsigned8(254));
}
