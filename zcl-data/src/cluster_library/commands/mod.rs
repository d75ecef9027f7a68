//! # Profile-wide (foundation) commands

mod attributes;
mod default_response;
mod discover;
mod reporting;

use crate::pack::Pack;
use crate::Error;

pub use attributes::{
    AttributeReport, AttributeStatus, ReadAttributes, ReadAttributesResponse, ReportAttributes,
    WriteAttributeRecord, WriteAttributeStatus, WriteAttributes, WriteAttributesResponse,
};
pub use default_response::DefaultResponse;
pub use discover::{
    AttributeInformation, DiscoverAttributes, DiscoverAttributesExtendedResponse,
    DiscoverAttributesResponse, DiscoverCommands, DiscoverCommandsResponse,
    ExtendedAttributeInformation, MAX_DISCOVERY_ENTRIES,
};
pub use reporting::{
    AttributeReportingConfiguration, AttributeReportingStatus, ConfigureReporting,
    ConfigureReportingResponse, ReadReportingConfiguration, ReadReportingConfigurationRecord,
    ReadReportingConfigurationResponse, ReportingConfigurationStatus, ReportingDirection,
};

/// Maximum number of records in a foundation command
pub const MAX_RECORDS: usize = 16;

extended_enum!(
    /// Cluster library general command identifiers
    GeneralCommandIdentifier, u8,
    ReadAttributes => 0x00,
    ReadAttributesResponse => 0x01,
    WriteAttributes => 0x02,
    WriteAttributesUndivided => 0x03,
    WriteAttributesResponse => 0x04,
    WriteAttributesNoResponse => 0x05,
    ConfigureReporting => 0x06,
    ConfigureReportingResponse => 0x07,
    ReadReportingConfiguration => 0x08,
    ReadReportingConfigurationResponse => 0x09,
    ReportAttributes => 0x0a,
    DefaultResponse => 0x0b,
    DiscoverAttributes => 0x0c,
    DiscoverAttributesResponse => 0x0d,
    ReadAttributesStructured => 0x0e,
    WriteAttributesStructured => 0x0f,
    WriteAttributesStructuredResponse => 0x10,
    DiscoverCommandsReceived => 0x11,
    DiscoverCommandsReceivedResponse => 0x12,
    DiscoverCommandsGenerated => 0x13,
    DiscoverCommandsGeneratedResponse => 0x14,
    DiscoverAttributesExtended => 0x15,
    DiscoverAttributesExtendedResponse => 0x16,
);

/// Cluster library general command
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Command {
    ReadAttributes(ReadAttributes),
    ReadAttributesResponse(ReadAttributesResponse),
    WriteAttributes(WriteAttributes),
    WriteAttributesUndivided(WriteAttributes),
    WriteAttributesResponse(WriteAttributesResponse),
    WriteAttributesNoResponse(WriteAttributes),
    ConfigureReporting(ConfigureReporting),
    ConfigureReportingResponse(ConfigureReportingResponse),
    ReadReportingConfiguration(ReadReportingConfiguration),
    ReadReportingConfigurationResponse(ReadReportingConfigurationResponse),
    ReportAttributes(ReportAttributes),
    DefaultResponse(DefaultResponse),
    DiscoverAttributes(DiscoverAttributes),
    DiscoverAttributesResponse(DiscoverAttributesResponse),
    DiscoverCommandsReceived(DiscoverCommands),
    DiscoverCommandsReceivedResponse(DiscoverCommandsResponse),
    DiscoverCommandsGenerated(DiscoverCommands),
    DiscoverCommandsGeneratedResponse(DiscoverCommandsResponse),
    DiscoverAttributesExtended(DiscoverAttributes),
    DiscoverAttributesExtendedResponse(DiscoverAttributesExtendedResponse),
}

impl Command {
    /// The command identifier of this command
    pub fn identifier(&self) -> GeneralCommandIdentifier {
        match self {
            Command::ReadAttributes(_) => GeneralCommandIdentifier::ReadAttributes,
            Command::ReadAttributesResponse(_) => GeneralCommandIdentifier::ReadAttributesResponse,
            Command::WriteAttributes(_) => GeneralCommandIdentifier::WriteAttributes,
            Command::WriteAttributesUndivided(_) => {
                GeneralCommandIdentifier::WriteAttributesUndivided
            }
            Command::WriteAttributesResponse(_) => {
                GeneralCommandIdentifier::WriteAttributesResponse
            }
            Command::WriteAttributesNoResponse(_) => {
                GeneralCommandIdentifier::WriteAttributesNoResponse
            }
            Command::ConfigureReporting(_) => GeneralCommandIdentifier::ConfigureReporting,
            Command::ConfigureReportingResponse(_) => {
                GeneralCommandIdentifier::ConfigureReportingResponse
            }
            Command::ReadReportingConfiguration(_) => {
                GeneralCommandIdentifier::ReadReportingConfiguration
            }
            Command::ReadReportingConfigurationResponse(_) => {
                GeneralCommandIdentifier::ReadReportingConfigurationResponse
            }
            Command::ReportAttributes(_) => GeneralCommandIdentifier::ReportAttributes,
            Command::DefaultResponse(_) => GeneralCommandIdentifier::DefaultResponse,
            Command::DiscoverAttributes(_) => GeneralCommandIdentifier::DiscoverAttributes,
            Command::DiscoverAttributesResponse(_) => {
                GeneralCommandIdentifier::DiscoverAttributesResponse
            }
            Command::DiscoverCommandsReceived(_) => {
                GeneralCommandIdentifier::DiscoverCommandsReceived
            }
            Command::DiscoverCommandsReceivedResponse(_) => {
                GeneralCommandIdentifier::DiscoverCommandsReceivedResponse
            }
            Command::DiscoverCommandsGenerated(_) => {
                GeneralCommandIdentifier::DiscoverCommandsGenerated
            }
            Command::DiscoverCommandsGeneratedResponse(_) => {
                GeneralCommandIdentifier::DiscoverCommandsGeneratedResponse
            }
            Command::DiscoverAttributesExtended(_) => {
                GeneralCommandIdentifier::DiscoverAttributesExtended
            }
            Command::DiscoverAttributesExtendedResponse(_) => {
                GeneralCommandIdentifier::DiscoverAttributesExtendedResponse
            }
        }
    }

    /// Serialise the command payload, returns the number of bytes written and
    /// the command identifier
    pub fn pack(&self, data: &mut [u8]) -> Result<(usize, GeneralCommandIdentifier), Error> {
        let used = match self {
            Command::ReadAttributes(cmd) => cmd.pack(data)?,
            Command::ReadAttributesResponse(cmd) => cmd.pack(data)?,
            Command::WriteAttributes(cmd)
            | Command::WriteAttributesUndivided(cmd)
            | Command::WriteAttributesNoResponse(cmd) => cmd.pack(data)?,
            Command::WriteAttributesResponse(cmd) => cmd.pack(data)?,
            Command::ConfigureReporting(cmd) => cmd.pack(data)?,
            Command::ConfigureReportingResponse(cmd) => cmd.pack(data)?,
            Command::ReadReportingConfiguration(cmd) => cmd.pack(data)?,
            Command::ReadReportingConfigurationResponse(cmd) => cmd.pack(data)?,
            Command::ReportAttributes(cmd) => cmd.pack(data)?,
            Command::DefaultResponse(cmd) => cmd.pack(data)?,
            Command::DiscoverAttributes(cmd) | Command::DiscoverAttributesExtended(cmd) => {
                cmd.pack(data)?
            }
            Command::DiscoverAttributesResponse(cmd) => cmd.pack(data)?,
            Command::DiscoverCommandsReceived(cmd) | Command::DiscoverCommandsGenerated(cmd) => {
                cmd.pack(data)?
            }
            Command::DiscoverCommandsReceivedResponse(cmd)
            | Command::DiscoverCommandsGeneratedResponse(cmd) => cmd.pack(data)?,
            Command::DiscoverAttributesExtendedResponse(cmd) => cmd.pack(data)?,
        };
        Ok((used, self.identifier()))
    }

    /// De-serialise a command payload, the structured read and write
    /// commands are not supported and fail with `UnknownCommand`
    pub fn unpack(data: &[u8], command: GeneralCommandIdentifier) -> Result<(Self, usize), Error> {
        match command {
            GeneralCommandIdentifier::ReadAttributes => {
                let (cmd, used) = ReadAttributes::unpack(data)?;
                Ok((Command::ReadAttributes(cmd), used))
            }
            GeneralCommandIdentifier::ReadAttributesResponse => {
                let (cmd, used) = ReadAttributesResponse::unpack(data)?;
                Ok((Command::ReadAttributesResponse(cmd), used))
            }
            GeneralCommandIdentifier::WriteAttributes => {
                let (cmd, used) = WriteAttributes::unpack(data)?;
                Ok((Command::WriteAttributes(cmd), used))
            }
            GeneralCommandIdentifier::WriteAttributesUndivided => {
                let (cmd, used) = WriteAttributes::unpack(data)?;
                Ok((Command::WriteAttributesUndivided(cmd), used))
            }
            GeneralCommandIdentifier::WriteAttributesResponse => {
                let (cmd, used) = WriteAttributesResponse::unpack(data)?;
                Ok((Command::WriteAttributesResponse(cmd), used))
            }
            GeneralCommandIdentifier::WriteAttributesNoResponse => {
                let (cmd, used) = WriteAttributes::unpack(data)?;
                Ok((Command::WriteAttributesNoResponse(cmd), used))
            }
            GeneralCommandIdentifier::ConfigureReporting => {
                let (cmd, used) = ConfigureReporting::unpack(data)?;
                Ok((Command::ConfigureReporting(cmd), used))
            }
            GeneralCommandIdentifier::ConfigureReportingResponse => {
                let (cmd, used) = ConfigureReportingResponse::unpack(data)?;
                Ok((Command::ConfigureReportingResponse(cmd), used))
            }
            GeneralCommandIdentifier::ReadReportingConfiguration => {
                let (cmd, used) = ReadReportingConfiguration::unpack(data)?;
                Ok((Command::ReadReportingConfiguration(cmd), used))
            }
            GeneralCommandIdentifier::ReadReportingConfigurationResponse => {
                let (cmd, used) = ReadReportingConfigurationResponse::unpack(data)?;
                Ok((Command::ReadReportingConfigurationResponse(cmd), used))
            }
            GeneralCommandIdentifier::ReportAttributes => {
                let (cmd, used) = ReportAttributes::unpack(data)?;
                Ok((Command::ReportAttributes(cmd), used))
            }
            GeneralCommandIdentifier::DefaultResponse => {
                let (cmd, used) = DefaultResponse::unpack(data)?;
                Ok((Command::DefaultResponse(cmd), used))
            }
            GeneralCommandIdentifier::DiscoverAttributes => {
                let (cmd, used) = DiscoverAttributes::unpack(data)?;
                Ok((Command::DiscoverAttributes(cmd), used))
            }
            GeneralCommandIdentifier::DiscoverAttributesResponse => {
                let (cmd, used) = DiscoverAttributesResponse::unpack(data)?;
                Ok((Command::DiscoverAttributesResponse(cmd), used))
            }
            GeneralCommandIdentifier::DiscoverCommandsReceived => {
                let (cmd, used) = DiscoverCommands::unpack(data)?;
                Ok((Command::DiscoverCommandsReceived(cmd), used))
            }
            GeneralCommandIdentifier::DiscoverCommandsReceivedResponse => {
                let (cmd, used) = DiscoverCommandsResponse::unpack(data)?;
                Ok((Command::DiscoverCommandsReceivedResponse(cmd), used))
            }
            GeneralCommandIdentifier::DiscoverCommandsGenerated => {
                let (cmd, used) = DiscoverCommands::unpack(data)?;
                Ok((Command::DiscoverCommandsGenerated(cmd), used))
            }
            GeneralCommandIdentifier::DiscoverCommandsGeneratedResponse => {
                let (cmd, used) = DiscoverCommandsResponse::unpack(data)?;
                Ok((Command::DiscoverCommandsGeneratedResponse(cmd), used))
            }
            GeneralCommandIdentifier::DiscoverAttributesExtended => {
                let (cmd, used) = DiscoverAttributes::unpack(data)?;
                Ok((Command::DiscoverAttributesExtended(cmd), used))
            }
            GeneralCommandIdentifier::DiscoverAttributesExtendedResponse => {
                let (cmd, used) = DiscoverAttributesExtendedResponse::unpack(data)?;
                Ok((Command::DiscoverAttributesExtendedResponse(cmd), used))
            }
            GeneralCommandIdentifier::ReadAttributesStructured
            | GeneralCommandIdentifier::WriteAttributesStructured
            | GeneralCommandIdentifier::WriteAttributesStructuredResponse => {
                Err(Error::UnknownCommand)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster_library::{AttributeValue, ClusterLibraryStatus};

    #[test]
    fn unpack_by_identifier() {
        let data = [0x00, 0x00, 0x01, 0x00];
        let (cmd, used) = Command::unpack(&data, GeneralCommandIdentifier::ReadAttributes).unwrap();
        assert_eq!(used, 4);
        match cmd {
            Command::ReadAttributes(read) => assert_eq!(read.attributes[..], [0x0000, 0x0001]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn structured_commands_are_unsupported() {
        assert_eq!(
            Command::unpack(&[], GeneralCommandIdentifier::WriteAttributesStructured),
            Err(Error::UnknownCommand)
        );
    }

    #[test]
    fn pack_read_response() {
        let mut response = ReadAttributesResponse::default();
        response
            .attributes
            .push(AttributeStatus {
                identifier: 0x0000,
                status: ClusterLibraryStatus::Success,
                value: Some(AttributeValue::Boolean(true)),
            })
            .unwrap();
        let cmd = Command::ReadAttributesResponse(response);
        let mut buffer = [0u8; 16];
        let (used, id) = cmd.pack(&mut buffer).unwrap();
        assert_eq!(id, GeneralCommandIdentifier::ReadAttributesResponse);
        assert_eq!(buffer[..used], [0x00, 0x00, 0x00, 0x10, 0x01]);
    }
}
