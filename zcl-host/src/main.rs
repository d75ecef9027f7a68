mod parser;
mod storage;

use std::fs;
use std::io::{self, Read};

use chrono::{Local, SecondsFormat};
use clap::{App, AppSettings, Arg};
use heapless::spsc::{Consumer, Producer, Queue};
use log::{info, warn};
use serde_derive::Deserialize;

use zcl_data::cluster_library::{
    basic::PowerSource, cluster, wwah::MANUFACTURER_CODE, ClusterIdentifier,
    PROFILE_HOME_AUTOMATION,
};
use zcl_service::cluster_library::{
    basic::BasicInformation, drlc as load_control, energy_management, groups, level_control,
    on_off, scenes, wwah,
};
use zcl_service::{
    AttributeRecord, CallbackParameters, ClusterLibraryService, Config, DeviceHandler,
    EndpointDescriptor, Error, OutgoingFrame, Role,
};

use parser::{TraceEvent, TraceLine};
use storage::FileStorage;

const QUEUE_SIZE: usize = 32;

type Service<'a> = ClusterLibraryService<'a, Console, QUEUE_SIZE>;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DeviceConfig {
    endpoint: u8,
    profile: u16,
    device: u16,
    manufacturer_name: String,
    model_identifier: String,
    on: bool,
    level: u8,
    demand_response: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            endpoint: 1,
            profile: PROFILE_HOME_AUTOMATION,
            device: 0x0101,
            manufacturer_name: "Psila".to_string(),
            model_identifier: "Dimmable light".to_string(),
            on: false,
            level: 254,
            demand_response: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HostConfig {
    service: Config,
    device: DeviceConfig,
    state: Option<String>,
}

fn read_config(file_path: &str) -> Option<HostConfig> {
    match fs::read(file_path) {
        Ok(bytes) => {
            match toml::from_str::<HostConfig>(&String::from_utf8_lossy(bytes.as_slice())) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse {}, {}", file_path, e);
                    None
                }
            }
        }
        Err(e) => {
            warn!("Failed to read {}, {}", file_path, e);
            None
        }
    }
}

fn now() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Prints every device event
struct Console;

impl DeviceHandler for Console {
    fn device_callback(&mut self, parameters: &mut CallbackParameters) {
        println!(
            "{} EVT {:02x} {:?} {:?}",
            now(),
            parameters.endpoint,
            parameters.event,
            parameters.status
        );
    }
}

fn create_service<'a>(
    config: &HostConfig,
    producer: Producer<'a, OutgoingFrame, QUEUE_SIZE>,
) -> Result<Service<'a>, Error> {
    let mut service = ClusterLibraryService::new(config.service, Console, producer);
    let device = &config.device;
    service.add_endpoint(EndpointDescriptor {
        endpoint: device.endpoint,
        profile: device.profile,
        device: device.device,
    })?;
    let basic = BasicInformation {
        manufacturer_name: &device.manufacturer_name,
        model_identifier: &device.model_identifier,
        power_source: PowerSource::Mains,
        ..BasicInformation::default()
    };
    let clusters: [(ClusterIdentifier, &[AttributeRecord]); 5] = [
        (cluster::BASIC, &basic.server_attributes()),
        (cluster::GROUPS, &groups::server_attributes()),
        (cluster::SCENES, &scenes::server_attributes()),
        (cluster::ON_OFF, &on_off::server_attributes(device.on)),
        (
            cluster::LEVEL_CONTROL,
            &level_control::server_attributes(device.level),
        ),
    ];
    for (identifier, attributes) in clusters {
        service.add_cluster(device.endpoint, identifier, Role::Server, None, 1, attributes)?;
    }
    service.add_cluster(
        device.endpoint,
        cluster::WORKS_WITH_ALL_HUBS,
        Role::Server,
        Some(MANUFACTURER_CODE),
        1,
        &wwah::server_attributes(),
    )?;
    if device.demand_response {
        service.add_cluster(
            device.endpoint,
            cluster::DEMAND_RESPONSE,
            Role::Client,
            None,
            2,
            &load_control::client_attributes(&config.service.drlc),
        )?;
        service.add_cluster(
            device.endpoint,
            cluster::ENERGY_MANAGEMENT,
            Role::Server,
            None,
            1,
            &energy_management::server_attributes(),
        )?;
    }
    Ok(service)
}

fn print_outgoing(consumer: &mut Consumer<'_, OutgoingFrame, QUEUE_SIZE>) {
    while let Some(frame) = consumer.dequeue() {
        let request = &frame.request;
        println!(
            "{} TX {:02x} {:?} ACK {} {:?} {}",
            now(),
            request.source_endpoint,
            request.destination,
            request.acknowledge_request,
            request.security,
            parser::describe_frame(request.cluster, &frame.payload)
        );
    }
}

/// Run the timers that are due at `timestamp`
fn settle(
    service: &mut Service,
    consumer: &mut Consumer<'_, OutgoingFrame, QUEUE_SIZE>,
    timestamp: u32,
) {
    loop {
        let deadline = service.next_deadline();
        if deadline == 0 || deadline > timestamp {
            break;
        }
        if let Err(e) = service.update(deadline) {
            warn!("Update at {} failed, {:?}", deadline, e);
        }
        print_outgoing(consumer);
        if service.next_deadline() == deadline {
            break;
        }
    }
}

fn handle_line(service: &mut Service, line: TraceLine) -> Result<(), Error> {
    let timestamp = line.timestamp;
    match line.event {
        TraceEvent::Receive { indication, data } => {
            println!(
                "{} RX {}:{:02x} -> {:02x} {}",
                now(),
                parser::address(indication.source),
                indication.source_endpoint,
                indication.destination_endpoint,
                parser::describe_frame(indication.cluster, &data)
            );
            service.receive(&indication, &data, timestamp)?;
        }
        TraceEvent::Tick => {
            service.update(timestamp)?;
        }
        TraceEvent::NetworkLost => {
            let next = service.network_lost(timestamp);
            info!("Network lost, next rejoin at {}", next);
        }
        TraceEvent::NetworkJoined => {
            service.network_joined(timestamp);
            info!("Network joined");
        }
        TraceEvent::Utc(utc) => service.set_utc_time(utc, timestamp),
    }
    Ok(())
}

fn replay(
    service: &mut Service,
    consumer: &mut Consumer<'_, OutgoingFrame, QUEUE_SIZE>,
    trace: &str,
    profile: u16,
) -> u32 {
    let mut last = 0;
    for (number, text) in trace.lines().enumerate() {
        let line = match parser::parse_line(text, profile) {
            Ok(Some(line)) => line,
            Ok(None) => continue,
            Err(e) => {
                warn!("Line {}: {}", number + 1, e);
                continue;
            }
        };
        if line.timestamp < last {
            warn!("Line {}: time stamp goes backwards", number + 1);
            continue;
        }
        last = line.timestamp;
        settle(service, consumer, last);
        if let Err(e) = handle_line(service, line) {
            warn!("Line {}: {:?}", number + 1, e);
        }
        print_outgoing(consumer);
    }
    last
}

fn main() {
    env_logger::init();
    let matches = App::new("ZCL trace replay")
        .about("Feeds a cluster library trace to a light endpoint and prints the traffic")
        .setting(AppSettings::DisableVersion)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .help("Path to configuration file")
                .use_delimiter(false)
                .required(false)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("state")
                .short("s")
                .long("state")
                .help("Directory holding the persistent records")
                .use_delimiter(false)
                .required(false)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("until")
                .short("u")
                .long("until")
                .help("Keep running timers until this time stamp, milliseconds")
                .use_delimiter(false)
                .required(false)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("trace")
                .help("Trace file, standard input when omitted")
                .use_delimiter(false)
                .required(false),
        )
        .get_matches();

    let config = matches
        .value_of("config")
        .and_then(read_config)
        .unwrap_or_default();

    let mut trace = String::new();
    let read = match matches.value_of("trace") {
        Some(path) => fs::read_to_string(path).map(|text| trace = text),
        None => io::stdin().read_to_string(&mut trace).map(|_| ()),
    };
    if let Err(e) = read {
        eprintln!("Failed to read trace, {}", e);
        std::process::exit(1);
    }

    let until = match matches.value_of("until").map(str::parse::<u32>) {
        Some(Ok(until)) => Some(until),
        Some(Err(e)) => {
            eprintln!("Invalid time stamp, {}", e);
            std::process::exit(1);
        }
        None => None,
    };

    let mut queue: Queue<OutgoingFrame, QUEUE_SIZE> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut service = match create_service(&config, producer) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to create the endpoint, {:?}", e);
            std::process::exit(1);
        }
    };

    let state = matches
        .value_of("state")
        .map(str::to_string)
        .or_else(|| config.state.clone());
    let mut storage = match state.map(FileStorage::new).transpose() {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Failed to open the state directory, {:?}", e);
            std::process::exit(1);
        }
    };
    if let Some(storage) = storage.as_mut() {
        match service.restore(storage) {
            Ok(()) => info!("State restored"),
            Err(e) => warn!("Failed to restore state, {:?}", e),
        }
    }

    let last = replay(&mut service, &mut consumer, &trace, config.device.profile);
    if let Some(until) = until {
        settle(&mut service, &mut consumer, until.max(last));
    }

    if let Some(storage) = storage.as_mut() {
        match service.save(storage) {
            Ok(()) => info!("State saved"),
            Err(e) => warn!("Failed to save state, {:?}", e),
        }
    }
}
