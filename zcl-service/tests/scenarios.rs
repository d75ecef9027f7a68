use heapless::spsc::{Consumer, Producer, Queue};

use zcl_data::cluster_library::drlc::{
    CancelControl, CancelLoadControlEvent, DeviceClass, EventStatus, ReportEventStatus,
    CMD_CANCEL_LOAD_CONTROL_EVENT, CMD_REPORT_EVENT_STATUS,
};
use zcl_data::cluster_library::level_control::ATTR_CURRENT_LEVEL;
use zcl_data::cluster_library::on_off::ATTR_ON_OFF;
use zcl_data::cluster_library::scenes::{
    AddScene, ExtensionFieldSet, ExtensionFieldSets, SceneRequest, SceneStatusResponse,
    ViewSceneResponse, ATTR_CURRENT_GROUP, ATTR_CURRENT_SCENE, ATTR_SCENE_VALID,
};
use zcl_data::cluster_library::wwah::{
    ClusterListPayload, EnableRejoinAlgorithm, WwahCommand, MANUFACTURER_CODE,
};
use zcl_data::cluster_library::{
    cluster, AttributeIdentifier, AttributeValue, ClusterIdentifier, ClusterLibraryHeader,
    ClusterLibraryStatus, Direction, Frame, FrameType, PROFILE_HOME_AUTOMATION,
};
use zcl_data::pack::Pack;
use zcl_data::CharacterString;

use zcl_service::cluster_library::{drlc, groups, level_control, on_off, scenes, wwah};
use zcl_service::cvc::{TransitionOwner, TransitionRequest, TransitionStatus, TRANSITION_TIME_IMMEDIATE};
use zcl_service::{
    ApsIndication, AttributeRecord, CallbackParameters, ClusterLibraryService, Config,
    DeviceEvent, DeviceHandler, EndpointDescriptor, OutgoingFrame, Role, MAX_FRAME_SIZE,
};

const QUEUE_SIZE: usize = 16;
const TRUST_CENTER: u16 = 0x0000;
const HUB_ENDPOINT: u8 = 0x01;

type Finished = (ClusterIdentifier, AttributeIdentifier, TransitionOwner, TransitionStatus);

#[derive(Default)]
struct Recorder {
    finished: Vec<Finished>,
    rejoin_attempts: Vec<u8>,
}

impl DeviceHandler for Recorder {
    fn device_callback(&mut self, parameters: &mut CallbackParameters) {
        match parameters.event {
            DeviceEvent::TransitionFinished {
                cluster,
                attribute,
                owner,
                status,
            } => self.finished.push((cluster, attribute, owner, status)),
            DeviceEvent::RejoinAttempt { attempt } => self.rejoin_attempts.push(attempt),
            _ => {}
        }
    }
}

type Service<'a> = ClusterLibraryService<'a, Recorder, QUEUE_SIZE>;

fn service(producer: Producer<'_, OutgoingFrame, QUEUE_SIZE>) -> Service<'_> {
    let mut service = ClusterLibraryService::new(Config::default(), Recorder::default(), producer);
    service
        .add_endpoint(EndpointDescriptor {
            endpoint: 1,
            profile: PROFILE_HOME_AUTOMATION,
            device: 0x0101,
        })
        .unwrap();
    service
}

/// Dimmable light on endpoint 1
fn light(producer: Producer<'_, OutgoingFrame, QUEUE_SIZE>) -> Service<'_> {
    let mut service = service(producer);
    service
        .add_cluster(1, cluster::GROUPS, Role::Server, None, 4, &groups::server_attributes())
        .unwrap();
    service
        .add_cluster(1, cluster::SCENES, Role::Server, None, 3, &scenes::server_attributes())
        .unwrap();
    service
        .add_cluster(1, cluster::ON_OFF, Role::Server, None, 2, &on_off::server_attributes(true))
        .unwrap();
    service
        .add_cluster(
            1,
            cluster::LEVEL_CONTROL,
            Role::Server,
            None,
            3,
            &level_control::server_attributes(128),
        )
        .unwrap();
    service
}

fn frame(
    frame_type: FrameType,
    direction: Direction,
    manufacturer: Option<u16>,
    command: u8,
    payload: &[u8],
) -> Vec<u8> {
    let header = ClusterLibraryHeader::new(frame_type, direction, manufacturer, 0x42, command, false);
    let mut buffer = [0u8; MAX_FRAME_SIZE];
    let used = Frame { header, payload }.serialize(&mut buffer).unwrap();
    buffer[..used].to_vec()
}

fn packed<P: Pack<P, zcl_data::Error>>(payload: &P) -> Vec<u8> {
    let mut buffer = [0u8; MAX_FRAME_SIZE];
    let used = payload.pack(&mut buffer).unwrap();
    buffer[..used].to_vec()
}

fn drain(consumer: &mut Consumer<'_, OutgoingFrame, QUEUE_SIZE>) -> Vec<OutgoingFrame> {
    let mut frames = Vec::new();
    while let Some(frame) = consumer.dequeue() {
        frames.push(frame);
    }
    frames
}

fn level(service: &Service) -> AttributeValue {
    service
        .read_attribute(1, cluster::LEVEL_CONTROL, Role::Server, ATTR_CURRENT_LEVEL)
        .unwrap()
}

fn scene_attribute(service: &Service, attribute: AttributeIdentifier) -> AttributeValue {
    service
        .read_attribute(1, cluster::SCENES, Role::Server, attribute)
        .unwrap()
}

#[test]
fn scene_recall_with_transition() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, _consumer) = queue.split();
    let mut service = light(producer);

    service.join_group(1, 0x0001).unwrap();
    service.store_scene(1, 0x0001, 7).unwrap();
    service
        .write_attribute(
            1,
            cluster::LEVEL_CONTROL,
            Role::Server,
            ATTR_CURRENT_LEVEL,
            AttributeValue::Unsigned8(10),
        )
        .unwrap();
    assert_eq!(level(&service), AttributeValue::Unsigned8(10));

    service.recall_scene(1, 0x0001, 7, Some(100)).unwrap();
    service.update(5_000).unwrap();
    let halfway = level(&service).as_integer().unwrap();
    assert!(halfway > 10 && halfway < 128);

    service.update(10_000).unwrap();
    assert_eq!(level(&service), AttributeValue::Unsigned8(128));
    assert_eq!(
        service
            .read_attribute(1, cluster::ON_OFF, Role::Server, ATTR_ON_OFF)
            .unwrap(),
        AttributeValue::Boolean(true)
    );
    assert_eq!(scene_attribute(&service, ATTR_CURRENT_SCENE), AttributeValue::Unsigned8(7));
    assert_eq!(scene_attribute(&service, ATTR_CURRENT_GROUP), AttributeValue::Unsigned16(1));
    assert_eq!(scene_attribute(&service, ATTR_SCENE_VALID), AttributeValue::Boolean(true));
    assert!(service.handler().finished.iter().any(|f| {
        f.2 == TransitionOwner::SceneRecall {
            group: 0x0001,
            scene: 7,
        } && f.3 == TransitionStatus::Completed
    }));
}

#[test]
fn enhanced_scene_keeps_tenths() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = light(producer);
    service.join_group(1, 0x0001).unwrap();

    let mut fieldsets = ExtensionFieldSets::new();
    fieldsets
        .push(ExtensionFieldSet {
            cluster: cluster::LEVEL_CONTROL,
            data: heapless::Vec::from_slice(&[0x40]).unwrap(),
        })
        .unwrap();
    let add = AddScene {
        group: 0x0001,
        scene: 2,
        transition_time: 0x0019,
        name: CharacterString::new(),
        fieldsets,
    };
    let indication = ApsIndication::unicast(0x1234, 1, 1, PROFILE_HOME_AUTOMATION, cluster::SCENES);
    let data = frame(FrameType::Local, Direction::ToServer, None, 0x40, &packed(&add));
    service.receive(&indication, &data, 0).unwrap();

    let frames = drain(&mut consumer);
    assert_eq!(frames.len(), 1);
    let response = Frame::parse(&frames[0].payload).unwrap();
    assert_eq!(response.header.command, 0x40);
    assert_eq!(response.header.control.direction, Direction::ToClient);
    let (status, _) = SceneStatusResponse::unpack(response.payload).unwrap();
    assert_eq!(status.status, ClusterLibraryStatus::Success);

    let view = SceneRequest {
        group: 0x0001,
        scene: 2,
    };
    let data = frame(FrameType::Local, Direction::ToServer, None, 0x41, &packed(&view));
    service.receive(&indication, &data, 10).unwrap();

    let frames = drain(&mut consumer);
    assert_eq!(frames.len(), 1);
    let response = Frame::parse(&frames[0].payload).unwrap();
    assert_eq!(response.header.command, 0x41);
    let (view, _) = ViewSceneResponse::unpack(response.payload).unwrap();
    assert_eq!(view.status, ClusterLibraryStatus::Success);
    let detail = view.detail.unwrap();
    assert_eq!(detail.transition_time, 0x0019);
    assert_eq!(detail.fieldsets[0].cluster, cluster::LEVEL_CONTROL);
    assert_eq!(detail.fieldsets[0].data[..], [0x40]);
}

#[test]
fn immediate_transition_completes_at_once() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, _consumer) = queue.split();
    let mut service = service(producer);
    service
        .add_cluster(
            1,
            0xfc00,
            Role::Server,
            None,
            1,
            &[AttributeRecord::writable(0x0000, AttributeValue::Unsigned8(0))],
        )
        .unwrap();

    service
        .start_transition(TransitionRequest {
            endpoint: 1,
            cluster: 0xfc00,
            attribute: 0x0000,
            current: 0,
            end: 100,
            minimum: 0,
            maximum: 100,
            overlap: false,
            transition_time: TRANSITION_TIME_IMMEDIATE,
            owner: TransitionOwner::Application(42),
        })
        .unwrap();

    assert_eq!(
        service
            .read_attribute(1, 0xfc00, Role::Server, 0x0000)
            .unwrap(),
        AttributeValue::Unsigned8(100)
    );
    assert_eq!(
        service.handler().finished,
        [(
            0xfc00,
            0x0000,
            TransitionOwner::Application(42),
            TransitionStatus::Completed
        )]
    );
    assert_eq!(service.next_deadline(), 0);
}

#[test]
fn cancel_of_unknown_event_is_rejected() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = service(producer);
    let config = *service.config();
    service
        .add_cluster(
            1,
            cluster::DEMAND_RESPONSE,
            Role::Client,
            None,
            2,
            &drlc::client_attributes(&config.drlc),
        )
        .unwrap();
    service.set_utc_time(700_000_000, 0);

    let cancel = CancelLoadControlEvent {
        issuer_event_id: 0xdead_beef,
        device_class: DeviceClass::all(),
        utility_enrollment_group: 0,
        cancel_control: CancelControl::empty(),
        effective_time: 0,
    };
    let indication =
        ApsIndication::unicast(0x2000, 9, 1, PROFILE_HOME_AUTOMATION, cluster::DEMAND_RESPONSE);
    let data = frame(
        FrameType::Local,
        Direction::ToClient,
        None,
        CMD_CANCEL_LOAD_CONTROL_EVENT,
        &packed(&cancel),
    );
    service.receive(&indication, &data, 0).unwrap();

    let frames = drain(&mut consumer);
    assert_eq!(frames.len(), 1);
    let outgoing = &frames[0];
    assert_eq!(outgoing.request.cluster, cluster::DEMAND_RESPONSE);
    assert_eq!(
        outgoing.request.destination,
        zcl_service::Destination::unicast(0x2000, 9)
    );
    let report = Frame::parse(&outgoing.payload).unwrap();
    assert_eq!(report.header.command, CMD_REPORT_EVENT_STATUS);
    assert_eq!(report.header.control.direction, Direction::ToServer);
    let (status, _) = ReportEventStatus::unpack(report.payload).unwrap();
    assert_eq!(status.issuer_event_id, 0xdead_beef);
    assert_eq!(status.event_status, EventStatus::RejectedUndefinedEvent);
    assert!(service.load_control().event(0xdead_beef).is_none());
}

fn hub_light(producer: Producer<'_, OutgoingFrame, QUEUE_SIZE>) -> Service<'_> {
    let mut service = light(producer);
    service
        .add_cluster(
            1,
            cluster::WORKS_WITH_ALL_HUBS,
            Role::Server,
            Some(MANUFACTURER_CODE),
            1,
            &wwah::server_attributes(),
        )
        .unwrap();
    service
}

fn from_trust_center(
    service: &mut Service,
    command: WwahCommand,
    payload: &[u8],
    timestamp: u32,
) {
    let indication = ApsIndication::unicast(
        TRUST_CENTER,
        HUB_ENDPOINT,
        1,
        PROFILE_HOME_AUTOMATION,
        cluster::WORKS_WITH_ALL_HUBS,
    );
    let data = frame(
        FrameType::Local,
        Direction::ToServer,
        Some(MANUFACTURER_CODE),
        command.into(),
        payload,
    );
    service.receive(&indication, &data, timestamp).unwrap();
}

#[test]
fn unacknowledged_frames_are_dropped() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = hub_light(producer);

    let mut list = ClusterListPayload::default();
    list.clusters.push(cluster::ON_OFF).unwrap();
    from_trust_center(&mut service, WwahCommand::RequireApsAcksOnUnicasts, &packed(&list), 0);
    assert!(service.policy().requires_aps_ack(cluster::ON_OFF));
    drain(&mut consumer);

    let toggle = frame(FrameType::Local, Direction::ToServer, None, 0x02, &[]);
    let indication = ApsIndication::unicast(0x1234, 1, 1, PROFILE_HOME_AUTOMATION, cluster::ON_OFF);
    service.receive(&indication, &toggle, 10).unwrap();
    assert!(service.is_on(1));
    assert!(drain(&mut consumer).is_empty());

    let acknowledged = ApsIndication {
        acknowledge_requested: true,
        ..indication
    };
    service.receive(&acknowledged, &toggle, 20).unwrap();
    assert!(!service.is_on(1));
    let frames = drain(&mut consumer);
    assert_eq!(frames.len(), 1);
    assert!(frames[0].request.acknowledge_request);
}

#[test]
fn rejoin_backoff_schedule() {
    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = hub_light(producer);

    let rejoin = EnableRejoinAlgorithm {
        fast_rejoin_timeout: 10,
        duration_between_rejoins: 60,
        fast_rejoin_first_backoff: 10,
        max_backoff_time: 600,
        max_backoff_iterations: 8,
    };
    from_trust_center(&mut service, WwahCommand::EnableRejoinAlgorithm, &packed(&rejoin), 0);
    drain(&mut consumer);

    assert_eq!(service.network_lost(0), 10_000);
    let mut attempts = Vec::new();
    while attempts.len() < 9 {
        let deadline = service.next_deadline();
        assert_ne!(deadline, 0);
        let before = service.handler().rejoin_attempts.len();
        service.update(deadline.wrapping_sub(1)).unwrap();
        assert_eq!(service.handler().rejoin_attempts.len(), before);
        service.update(deadline).unwrap();
        if service.handler().rejoin_attempts.len() > before {
            attempts.push(deadline / 1_000);
        }
    }
    assert_eq!(attempts, [10, 30, 70, 150, 310, 630, 1230, 1830, 2740]);
    assert_eq!(
        service.handler().rejoin_attempts,
        [0, 1, 2, 3, 4, 5, 6, 7, 0]
    );

    service.network_joined(2_800_000);
    assert_eq!(service.next_deadline(), 0);
}
