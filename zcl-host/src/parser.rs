//! Trace lines and frame decoding
//!
//! A trace is a text file with one event per line, blank lines and lines
//! starting with `#` are skipped. Every event starts with a millisecond
//! time stamp.
//!
//! ```text
//! 0     utc 700000000
//! 10    rx 0x0000:1 -> 1 0x0006 011702 ack
//! 20    rx 0x1234:1 -> 1 0x0005 0105 group=0x0001
//! 5000  tick
//! 6000  lost
//! 9000  joined
//! ```
//!
//! A receive names the source address and endpoint, the destination
//! endpoint, the cluster and the frame bytes in hex. The optional flags
//! `ack`, `key` and `group=<id>` set the APS acknowledgement request, link
//! key security and the destination group.

use std::fmt::{self, Write};

use zcl_data::cluster_library::{
    self, scenes::ScenesCommand, wwah::WwahCommand, ClusterIdentifier, ClusterLibraryHeader,
    FrameType,
};
use zcl_data::pack::Pack;
use zcl_data::ShortAddress;
use zcl_service::{ApsIndication, Security};

/// Event of a trace line
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    /// Frame delivered by the APS layer
    Receive {
        /// APS envelope
        indication: ApsIndication,
        /// Cluster library frame
        data: Vec<u8>,
    },
    /// Run the timers
    Tick,
    /// The network was lost
    NetworkLost,
    /// The network was joined
    NetworkJoined,
    /// Set the UTC time, seconds since 2000-01-01
    Utc(u32),
}

/// Parsed trace line
#[derive(Clone, Debug, PartialEq)]
pub struct TraceLine {
    /// Time stamp, milliseconds
    pub timestamp: u32,
    /// Event
    pub event: TraceEvent,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParseError {
    MissingField(&'static str),
    InvalidNumber(String),
    InvalidHex(String),
    UnknownEvent(String),
    UnknownFlag(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::MissingField(field) => write!(f, "missing {}", field),
            ParseError::InvalidNumber(text) => write!(f, "invalid number \"{}\"", text),
            ParseError::InvalidHex(text) => write!(f, "invalid hex \"{}\"", text),
            ParseError::UnknownEvent(text) => write!(f, "unknown event \"{}\"", text),
            ParseError::UnknownFlag(text) => write!(f, "unknown flag \"{}\"", text),
        }
    }
}

/// Number in decimal or, with a `0x` prefix, hexadecimal
fn number(text: &str) -> Result<u32, ParseError> {
    let result = match text.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse::<u32>(),
    };
    result.map_err(|_| ParseError::InvalidNumber(text.to_string()))
}

fn narrow<T: TryFrom<u32>>(text: &str) -> Result<T, ParseError> {
    T::try_from(number(text)?).map_err(|_| ParseError::InvalidNumber(text.to_string()))
}

/// Bytes written as pairs of hex digits
pub fn parse_hex(text: &str) -> Result<Vec<u8>, ParseError> {
    if text.len() % 2 != 0 || !text.is_ascii() {
        return Err(ParseError::InvalidHex(text.to_string()));
    }
    (0..text.len())
        .step_by(2)
        .map(|n| {
            u8::from_str_radix(&text[n..n + 2], 16)
                .map_err(|_| ParseError::InvalidHex(text.to_string()))
        })
        .collect()
}

fn receive<'a, I>(mut fields: I, profile: u16) -> Result<TraceEvent, ParseError>
where
    I: Iterator<Item = &'a str>,
{
    let source = fields.next().ok_or(ParseError::MissingField("source"))?;
    let (address, source_endpoint) = source
        .split_once(':')
        .ok_or(ParseError::MissingField("source endpoint"))?;
    if fields.next() != Some("->") {
        return Err(ParseError::MissingField("->"));
    }
    let destination = fields
        .next()
        .ok_or(ParseError::MissingField("destination endpoint"))?;
    let cluster = fields.next().ok_or(ParseError::MissingField("cluster"))?;
    let data = fields.next().ok_or(ParseError::MissingField("frame"))?;
    let mut indication = ApsIndication::unicast(
        narrow(address)?,
        narrow(source_endpoint)?,
        narrow(destination)?,
        profile,
        narrow(cluster)?,
    );
    for flag in fields {
        match flag.split_once('=') {
            Some(("group", group)) => indication.group = Some(narrow(group)?),
            None if flag == "ack" => indication.acknowledge_requested = true,
            None if flag == "key" => indication.security = Security::LinkKey,
            _ => return Err(ParseError::UnknownFlag(flag.to_string())),
        }
    }
    Ok(TraceEvent::Receive {
        indication,
        data: parse_hex(data)?,
    })
}

/// Parse a trace line, none for blank lines and comments
pub fn parse_line(line: &str, profile: u16) -> Result<Option<TraceLine>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut fields = line.split_whitespace();
    let timestamp = number(fields.next().ok_or(ParseError::MissingField("time stamp"))?)?;
    let event = match fields.next().ok_or(ParseError::MissingField("event"))? {
        "rx" => receive(fields, profile)?,
        "tick" => TraceEvent::Tick,
        "lost" => TraceEvent::NetworkLost,
        "joined" => TraceEvent::NetworkJoined,
        "utc" => TraceEvent::Utc(number(
            fields.next().ok_or(ParseError::MissingField("utc"))?,
        )?),
        other => return Err(ParseError::UnknownEvent(other.to_string())),
    };
    Ok(Some(TraceLine { timestamp, event }))
}

fn hex(output: &mut String, payload: &[u8]) {
    for b in payload {
        let _ = write!(output, "{:02x}", b);
    }
}

fn describe_command(output: &mut String, payload: &[u8], command: cluster_library::GeneralCommandIdentifier) {
    match cluster_library::Command::unpack(payload, command) {
        Ok((cmd, _used)) => match cmd {
            cluster_library::Command::ReadAttributes(cmd) => {
                output.push_str("Read attributes");
                for attribute in cmd.attributes.iter() {
                    let _ = write!(output, " {:04x}", attribute);
                }
            }
            cluster_library::Command::ReadAttributesResponse(cmd) => {
                output.push_str("Read attributes response");
                for attribute in cmd.attributes.iter() {
                    let _ = write!(output, " {:04x}", attribute.identifier);
                    match &attribute.value {
                        Some(value) => {
                            let _ = write!(output, " {:?}", value);
                        }
                        None => {
                            let _ = write!(output, " {:?}", attribute.status);
                        }
                    }
                }
            }
            cluster_library::Command::WriteAttributes(cmd)
            | cluster_library::Command::WriteAttributesUndivided(cmd)
            | cluster_library::Command::WriteAttributesNoResponse(cmd) => {
                output.push_str("Write attributes");
                for record in cmd.attributes.iter() {
                    let _ = write!(output, " {:04x} {:?}", record.identifier, record.value);
                }
            }
            cluster_library::Command::WriteAttributesResponse(cmd) => {
                output.push_str("Write attributes response");
                if cmd.is_success() {
                    output.push_str(" Success");
                }
                for record in cmd.attributes.iter() {
                    let _ = write!(output, " {:04x} {:?}", record.identifier, record.status);
                }
            }
            cluster_library::Command::ReportAttributes(cmd) => {
                output.push_str("Report attributes");
                for report in cmd.reports.iter() {
                    let _ = write!(output, " {:04x} {:?}", report.identifier, report.value);
                }
            }
            cluster_library::Command::DefaultResponse(cmd) => {
                let _ = write!(output, "Default response {:02x} {:?}", cmd.command, cmd.status);
            }
            cmd => {
                let _ = write!(output, "{:?}", cmd);
            }
        },
        Err(e) => {
            let _ = write!(output, "Failed to parse command, {:?} Payload: ", e);
            hex(output, payload);
        }
    }
}

fn command_name(cluster: ClusterIdentifier, command: u8) -> Option<String> {
    match cluster {
        cluster_library::cluster::SCENES => {
            ScenesCommand::try_from(command).ok().map(|c| format!("{:?}", c))
        }
        cluster_library::cluster::WORKS_WITH_ALL_HUBS => {
            WwahCommand::try_from(command).ok().map(|c| format!("{:?}", c))
        }
        _ => None,
    }
}

/// One line description of a cluster library frame
pub fn describe_frame(cluster: ClusterIdentifier, payload: &[u8]) -> String {
    let mut output = format!("ZCL {:04x} ", cluster);
    match ClusterLibraryHeader::unpack(payload) {
        Ok((header, used)) => {
            let _ = write!(
                output,
                "{:?} {:?} ",
                header.control.frame_type, header.control.direction
            );
            if !header.control.disable_default_response {
                output.push_str("RSP ");
            }
            if let Some(manufacturer) = header.manufacturer {
                let _ = write!(output, "MNF {:04x} ", manufacturer);
            }
            let _ = write!(output, "SEQ {} ", header.transaction_sequence);
            if header.control.frame_type == FrameType::Global {
                match cluster_library::GeneralCommandIdentifier::try_from(header.command) {
                    Ok(cmd) => describe_command(&mut output, &payload[used..], cmd),
                    Err(_) => {
                        let _ = write!(output, "Unknown command {:02x} Payload: ", header.command);
                        hex(&mut output, &payload[used..]);
                    }
                }
            } else {
                match command_name(cluster, header.command) {
                    Some(name) => {
                        let _ = write!(output, "CMD {} Payload: ", name);
                    }
                    None => {
                        let _ = write!(output, "CMD {:02x} Payload: ", header.command);
                    }
                }
                hex(&mut output, &payload[used..]);
            }
        }
        Err(e) => {
            let _ = write!(output, "Failed to parse frame, {:?} Payload: ", e);
            hex(&mut output, payload);
        }
    }
    output
}

/// Short address printed in traces
pub fn address(address: ShortAddress) -> String {
    format!("{:04x}", u16::from(address))
}
