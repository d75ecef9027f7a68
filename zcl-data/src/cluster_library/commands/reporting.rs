//! Attribute reporting configuration commands

use core::convert::TryFrom;

use heapless::Vec;

use crate::cluster_library::{
    AttributeDataType, AttributeIdentifier, AttributeValue, ClusterLibraryStatus,
};
use crate::pack::{Pack, Reader, Writer};
use crate::Error;

use super::MAX_RECORDS;

extended_enum!(
    /// Direction of a reporting configuration
    ReportingDirection, u8,
    /// The receiver of the configuration sends the reports
    Send => 0x00,
    /// The receiver of the configuration expects reports
    Receive => 0x01,
);

/// Attribute reporting configuration record
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeReportingConfiguration {
    /// Reports are sent by the receiver of the configuration
    Send {
        /// Attribute identifier
        identifier: AttributeIdentifier,
        /// Attribute data type
        data_type: AttributeDataType,
        /// Minimum reporting interval in seconds
        minimum_interval: u16,
        /// Maximum reporting interval in seconds, 0xffff disables reporting
        maximum_interval: u16,
        /// Reportable change, only for analog types
        reportable_change: Option<AttributeValue>,
    },
    /// Reports are expected by the receiver of the configuration
    Receive {
        /// Attribute identifier
        identifier: AttributeIdentifier,
        /// Timeout period in seconds, zero disables the timeout
        timeout: u16,
    },
}

impl AttributeReportingConfiguration {
    /// Direction of the record
    pub fn direction(&self) -> ReportingDirection {
        match self {
            AttributeReportingConfiguration::Send { .. } => ReportingDirection::Send,
            AttributeReportingConfiguration::Receive { .. } => ReportingDirection::Receive,
        }
    }

    /// Attribute identifier of the record
    pub fn identifier(&self) -> AttributeIdentifier {
        match self {
            AttributeReportingConfiguration::Send { identifier, .. }
            | AttributeReportingConfiguration::Receive { identifier, .. } => *identifier,
        }
    }

    fn unpack_body(
        reader: &mut Reader,
        direction: ReportingDirection,
        identifier: AttributeIdentifier,
    ) -> Result<Self, Error> {
        match direction {
            ReportingDirection::Send => {
                let data_type = AttributeDataType::try_from(reader.read_u8()?)?;
                let minimum_interval = reader.read_u16()?;
                let maximum_interval = reader.read_u16()?;
                let reportable_change = if data_type.is_analog() {
                    let (value, used) = AttributeValue::unpack(reader.rest(), data_type)?;
                    reader.read_bytes(used)?;
                    Some(value)
                } else {
                    None
                };
                Ok(AttributeReportingConfiguration::Send {
                    identifier,
                    data_type,
                    minimum_interval,
                    maximum_interval,
                    reportable_change,
                })
            }
            ReportingDirection::Receive => Ok(AttributeReportingConfiguration::Receive {
                identifier,
                timeout: reader.read_u16()?,
            }),
        }
    }

    fn pack_body(&self, writer: &mut Writer) -> Result<(), Error> {
        match self {
            AttributeReportingConfiguration::Send {
                data_type,
                minimum_interval,
                maximum_interval,
                reportable_change,
                ..
            } => {
                writer.write_u8(u8::from(*data_type))?;
                writer.write_u16(*minimum_interval)?;
                writer.write_u16(*maximum_interval)?;
                if data_type.is_analog() {
                    let change = match reportable_change {
                        Some(change) => change.clone(),
                        None => AttributeValue::default_for(*data_type)?,
                    };
                    let size = change.packed_size();
                    change.pack(writer.allocate(size)?)?;
                }
            }
            AttributeReportingConfiguration::Receive { timeout, .. } => {
                writer.write_u16(*timeout)?;
            }
        }
        Ok(())
    }
}

impl Pack<AttributeReportingConfiguration, Error> for AttributeReportingConfiguration {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(u8::from(self.direction()))?;
        writer.write_u16(self.identifier())?;
        self.pack_body(&mut writer)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let direction = ReportingDirection::try_from(reader.read_u8()?)?;
        let identifier = reader.read_u16()?;
        let record = Self::unpack_body(&mut reader, direction, identifier)?;
        Ok((record, reader.position()))
    }
}

/// Configure reporting command
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigureReporting {
    /// Configuration records
    pub records: Vec<AttributeReportingConfiguration, MAX_RECORDS>,
}

impl Pack<ConfigureReporting, Error> for ConfigureReporting {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut offset = 0;
        for record in self.records.iter() {
            offset += record.pack(&mut data[offset..])?;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut offset = 0;
        let mut records = Vec::new();
        while offset < data.len() {
            let (record, used) = AttributeReportingConfiguration::unpack(&data[offset..])?;
            records.push(record).map_err(|_| Error::NotEnoughSpace)?;
            offset += used;
        }
        Ok((Self { records }, offset))
    }
}

/// Status of one record of a configure reporting command
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttributeReportingStatus {
    /// Status
    pub status: ClusterLibraryStatus,
    /// Direction of the record
    pub direction: ReportingDirection,
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
}

/// Configure reporting response, only failed records are listed and an
/// empty list is sent as a single success status
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigureReportingResponse {
    /// Failed records
    pub records: Vec<AttributeReportingStatus, MAX_RECORDS>,
}

impl Pack<ConfigureReportingResponse, Error> for ConfigureReportingResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        if self.records.is_empty() {
            writer.write_u8(u8::from(ClusterLibraryStatus::Success))?;
        }
        for record in self.records.iter() {
            writer.write_u8(u8::from(record.status))?;
            writer.write_u8(u8::from(record.direction))?;
            writer.write_u16(record.identifier)?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let mut records = Vec::new();
        if data.len() == 1 {
            reader.read_u8()?;
            return Ok((Self { records }, 1));
        }
        while !reader.is_empty() {
            let status = ClusterLibraryStatus::from_u8_lossy(reader.read_u8()?);
            let direction = ReportingDirection::try_from(reader.read_u8()?)?;
            let identifier = reader.read_u16()?;
            records
                .push(AttributeReportingStatus {
                    status,
                    direction,
                    identifier,
                })
                .map_err(|_| Error::NotEnoughSpace)?;
        }
        Ok((Self { records }, reader.position()))
    }
}

/// Attribute record of a read reporting configuration request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReadReportingConfigurationRecord {
    /// Direction
    pub direction: ReportingDirection,
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
}

/// Read reporting configuration command
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadReportingConfiguration {
    /// Requested records
    pub records: Vec<ReadReportingConfigurationRecord, MAX_RECORDS>,
}

impl Pack<ReadReportingConfiguration, Error> for ReadReportingConfiguration {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        for record in self.records.iter() {
            writer.write_u8(u8::from(record.direction))?;
            writer.write_u16(record.identifier)?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let mut records = Vec::new();
        while !reader.is_empty() {
            let direction = ReportingDirection::try_from(reader.read_u8()?)?;
            let identifier = reader.read_u16()?;
            records
                .push(ReadReportingConfigurationRecord {
                    direction,
                    identifier,
                })
                .map_err(|_| Error::NotEnoughSpace)?;
        }
        Ok((Self { records }, reader.position()))
    }
}

/// One record of a read reporting configuration response
#[derive(Clone, Debug, PartialEq)]
pub enum ReportingConfigurationStatus {
    /// The configuration of the attribute
    Configured(AttributeReportingConfiguration),
    /// The attribute has no configuration or could not be read
    Failed {
        /// Status
        status: ClusterLibraryStatus,
        /// Direction
        direction: ReportingDirection,
        /// Attribute identifier
        identifier: AttributeIdentifier,
    },
}

/// Read reporting configuration response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadReportingConfigurationResponse {
    /// Response records
    pub records: Vec<ReportingConfigurationStatus, MAX_RECORDS>,
}

impl Pack<ReadReportingConfigurationResponse, Error> for ReadReportingConfigurationResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        for record in self.records.iter() {
            match record {
                ReportingConfigurationStatus::Configured(configuration) => {
                    writer.write_u8(u8::from(ClusterLibraryStatus::Success))?;
                    writer.write_u8(u8::from(configuration.direction()))?;
                    writer.write_u16(configuration.identifier())?;
                    configuration.pack_body(&mut writer)?;
                }
                ReportingConfigurationStatus::Failed {
                    status,
                    direction,
                    identifier,
                } => {
                    writer.write_u8(u8::from(*status))?;
                    writer.write_u8(u8::from(*direction))?;
                    writer.write_u16(*identifier)?;
                }
            }
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let mut records = Vec::new();
        while !reader.is_empty() {
            let status = ClusterLibraryStatus::from_u8_lossy(reader.read_u8()?);
            let direction = ReportingDirection::try_from(reader.read_u8()?)?;
            let identifier = reader.read_u16()?;
            let record = if status == ClusterLibraryStatus::Success {
                ReportingConfigurationStatus::Configured(
                    AttributeReportingConfiguration::unpack_body(
                        &mut reader,
                        direction,
                        identifier,
                    )?,
                )
            } else {
                ReportingConfigurationStatus::Failed {
                    status,
                    direction,
                    identifier,
                }
            };
            records.push(record).map_err(|_| Error::NotEnoughSpace)?;
        }
        Ok((Self { records }, reader.position()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_configure_reporting() {
        // current level, u8, 1 s to 300 s, change 2, then a receive record
        let data = [
            0x00, 0x00, 0x00, 0x20, 0x01, 0x00, 0x2c, 0x01, 0x02, 0x01, 0x00, 0x00, 0x3c, 0x00,
        ];
        let (cmd, used) = ConfigureReporting::unpack(&data).unwrap();
        assert_eq!(used, data.len());
        assert_eq!(
            cmd.records[0],
            AttributeReportingConfiguration::Send {
                identifier: 0x0000,
                data_type: AttributeDataType::Unsigned8,
                minimum_interval: 1,
                maximum_interval: 300,
                reportable_change: Some(AttributeValue::Unsigned8(2)),
            }
        );
        assert_eq!(
            cmd.records[1],
            AttributeReportingConfiguration::Receive {
                identifier: 0x0000,
                timeout: 60
            }
        );
    }

    #[test]
    fn discrete_types_have_no_change_field() {
        let data = [0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x10, 0x0e];
        let (cmd, used) = ConfigureReporting::unpack(&data).unwrap();
        assert_eq!(used, 8);
        match &cmd.records[0] {
            AttributeReportingConfiguration::Send {
                reportable_change, ..
            } => assert_eq!(*reportable_change, None),
            _ => unreachable!(),
        }
        let mut buffer = [0u8; 16];
        assert_eq!(cmd.pack(&mut buffer), Ok(8));
        assert_eq!(buffer[..8], data);
    }

    #[test]
    fn pack_read_reporting_configuration_response() {
        let mut response = ReadReportingConfigurationResponse::default();
        response
            .records
            .push(ReportingConfigurationStatus::Failed {
                status: ClusterLibraryStatus::NotFound,
                direction: ReportingDirection::Send,
                identifier: 0x0001,
            })
            .unwrap();
        response
            .records
            .push(ReportingConfigurationStatus::Configured(
                AttributeReportingConfiguration::Send {
                    identifier: 0x0000,
                    data_type: AttributeDataType::Unsigned16,
                    minimum_interval: 0,
                    maximum_interval: 10,
                    reportable_change: None,
                },
            ))
            .unwrap();
        let mut buffer = [0u8; 32];
        let used = response.pack(&mut buffer).unwrap();
        assert_eq!(
            buffer[..used],
            [0x8b, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x21, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00]
        );
        let (unpacked, _) = ReadReportingConfigurationResponse::unpack(&buffer[..used]).unwrap();
        assert_eq!(unpacked.records[0], response.records[0]);
    }

    #[test]
    fn configure_response_success() {
        let (response, used) = ConfigureReportingResponse::unpack(&[0x00]).unwrap();
        assert_eq!(used, 1);
        assert!(response.records.is_empty());
    }
}
