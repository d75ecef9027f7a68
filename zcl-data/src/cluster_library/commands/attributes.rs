use core::convert::TryFrom;

use heapless::Vec;

use crate::cluster_library::{
    AttributeDataType, AttributeIdentifier, AttributeValue, ClusterLibraryStatus,
};
use crate::pack::{Pack, Reader, Writer};
use crate::Error;

use super::MAX_RECORDS;

/// Read attributes request, a list of attribute identifiers
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadAttributes {
    /// Attributes to read
    pub attributes: Vec<AttributeIdentifier, MAX_RECORDS>,
}

impl Pack<ReadAttributes, Error> for ReadAttributes {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        for identifier in self.attributes.iter() {
            writer.write_u16(*identifier)?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() % 2 != 0 {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut reader = Reader::new(data);
        let mut attributes = Vec::new();
        while !reader.is_empty() {
            attributes
                .push(reader.read_u16()?)
                .map_err(|_| Error::NotEnoughSpace)?;
        }
        Ok((Self { attributes }, reader.position()))
    }
}

/// Read attribute status record
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeStatus {
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
    /// Read status
    pub status: ClusterLibraryStatus,
    /// Value, only present on success
    pub value: Option<AttributeValue>,
}

impl Pack<AttributeStatus, Error> for AttributeStatus {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u16(self.identifier)?;
        writer.write_u8(u8::from(self.status))?;
        let mut used = writer.position();
        if let Some(value) = &self.value {
            writer.write_u8(u8::from(value.data_type()))?;
            used = writer.position();
            used += value.pack(&mut data[used..])?;
        }
        Ok(used)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let identifier = reader.read_u16()?;
        let status = ClusterLibraryStatus::from_u8_lossy(reader.read_u8()?);
        if status != ClusterLibraryStatus::Success {
            return Ok((
                Self {
                    identifier,
                    status,
                    value: None,
                },
                reader.position(),
            ));
        }
        let data_type = AttributeDataType::try_from(reader.read_u8()?)?;
        let (value, used) = AttributeValue::unpack(reader.rest(), data_type)?;
        Ok((
            Self {
                identifier,
                status,
                value: Some(value),
            },
            reader.position() + used,
        ))
    }
}

/// Read attributes response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadAttributesResponse {
    /// Status records
    pub attributes: Vec<AttributeStatus, MAX_RECORDS>,
}

impl Pack<ReadAttributesResponse, Error> for ReadAttributesResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut offset = 0;
        for attribute in self.attributes.iter() {
            offset += attribute.pack(&mut data[offset..])?;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut offset = 0;
        let mut attributes = Vec::new();
        while offset < data.len() {
            let (attribute_status, used) = AttributeStatus::unpack(&data[offset..])?;
            attributes
                .push(attribute_status)
                .map_err(|_| Error::NotEnoughSpace)?;
            offset += used;
        }
        Ok((Self { attributes }, offset))
    }
}

/// Write attribute record, identifier and typed value
#[derive(Clone, Debug, PartialEq)]
pub struct WriteAttributeRecord {
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
    /// Value to write
    pub value: AttributeValue,
}

impl Pack<WriteAttributeRecord, Error> for WriteAttributeRecord {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u16(self.identifier)?;
        writer.write_u8(u8::from(self.value.data_type()))?;
        let offset = writer.position();
        Ok(offset + self.value.pack(&mut data[offset..])?)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let identifier = reader.read_u16()?;
        let data_type = AttributeDataType::try_from(reader.read_u8()?)?;
        let (value, used) = AttributeValue::unpack(reader.rest(), data_type)?;
        Ok((Self { identifier, value }, reader.position() + used))
    }
}

/// Write attributes request, shared by the undivided and no response
/// variants
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteAttributes {
    /// Write records
    pub attributes: Vec<WriteAttributeRecord, MAX_RECORDS>,
}

impl Pack<WriteAttributes, Error> for WriteAttributes {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut offset = 0;
        for record in self.attributes.iter() {
            offset += record.pack(&mut data[offset..])?;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut offset = 0;
        let mut attributes = Vec::new();
        while offset < data.len() {
            let (record, used) = WriteAttributeRecord::unpack(&data[offset..])?;
            attributes.push(record).map_err(|_| Error::NotEnoughSpace)?;
            offset += used;
        }
        Ok((Self { attributes }, offset))
    }
}

/// Write attribute status record
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WriteAttributeStatus {
    /// Write status
    pub status: ClusterLibraryStatus,
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
}

/// Write attributes response
///
/// Only failed records are listed. A response where every write succeeded
/// is a single success status and is represented with an empty list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteAttributesResponse {
    /// Failed writes
    pub attributes: Vec<WriteAttributeStatus, MAX_RECORDS>,
}

impl WriteAttributesResponse {
    /// True when every write succeeded
    pub fn is_success(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl Pack<WriteAttributesResponse, Error> for WriteAttributesResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        if self.attributes.is_empty() {
            writer.write_u8(u8::from(ClusterLibraryStatus::Success))?;
        }
        for record in self.attributes.iter() {
            writer.write_u8(u8::from(record.status))?;
            writer.write_u16(record.identifier)?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let mut attributes = Vec::new();
        if data.len() == 1 {
            let status = ClusterLibraryStatus::from_u8_lossy(reader.read_u8()?);
            if status != ClusterLibraryStatus::Success {
                return Err(Error::WrongNumberOfBytes);
            }
            return Ok((Self { attributes }, 1));
        }
        while !reader.is_empty() {
            let status = ClusterLibraryStatus::from_u8_lossy(reader.read_u8()?);
            let identifier = reader.read_u16()?;
            attributes
                .push(WriteAttributeStatus { status, identifier })
                .map_err(|_| Error::NotEnoughSpace)?;
        }
        Ok((Self { attributes }, reader.position()))
    }
}

/// One attribute of a report
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeReport {
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
    /// Reported value
    pub value: AttributeValue,
}

/// Report attributes command
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportAttributes {
    /// Reported attributes
    pub reports: Vec<AttributeReport, MAX_RECORDS>,
}

impl Pack<ReportAttributes, Error> for ReportAttributes {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut offset = 0;
        for report in self.reports.iter() {
            let record = WriteAttributeRecord {
                identifier: report.identifier,
                value: report.value.clone(),
            };
            offset += record.pack(&mut data[offset..])?;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut offset = 0;
        let mut reports = Vec::new();
        while offset < data.len() {
            let (record, used) = WriteAttributeRecord::unpack(&data[offset..])?;
            reports
                .push(AttributeReport {
                    identifier: record.identifier,
                    value: record.value,
                })
                .map_err(|_| Error::NotEnoughSpace)?;
            offset += used;
        }
        Ok((Self { reports }, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_read_attributes() {
        let data = [0x0b, 0x05];
        let (cmd, used) = ReadAttributes::unpack(&data).unwrap();
        assert_eq!(used, 2);
        assert_eq!(cmd.attributes[0], 0x050b);

        assert_eq!(
            ReadAttributes::unpack(&data[..1]),
            Err(Error::WrongNumberOfBytes)
        );
    }

    #[test]
    fn unpack_read_attributes_response() {
        let data = [
            0x00, 0x00, 0x00, 0x20, 0x80, // current level, 128
            0xfd, 0xff, 0x86, // unsupported
            0x05, 0x00, 0x00, 0x42, 0x04, b'z', b'l', b'l', b'o',
        ];
        let (cmd, used) = ReadAttributesResponse::unpack(&data).unwrap();
        assert_eq!(used, data.len());
        assert_eq!(cmd.attributes.len(), 3);
        assert_eq!(cmd.attributes[0].value, Some(AttributeValue::Unsigned8(0x80)));
        assert_eq!(
            cmd.attributes[1].status,
            ClusterLibraryStatus::UnsupportedAttribute
        );
        assert_eq!(cmd.attributes[1].value, None);
        match &cmd.attributes[2].value {
            Some(AttributeValue::CharacterString(s)) => assert_eq!(s.as_str(), "zllo"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn unpack_write_attributes() {
        let data = [0x10, 0x00, 0x21, 0x2c, 0x01, 0x11, 0x00, 0x10, 0x01];
        let (cmd, used) = WriteAttributes::unpack(&data).unwrap();
        assert_eq!(used, 9);
        assert_eq!(cmd.attributes[0].identifier, 0x0010);
        assert_eq!(cmd.attributes[0].value, AttributeValue::Unsigned16(300));
        assert_eq!(cmd.attributes[1].value, AttributeValue::Boolean(true));
    }

    #[test]
    fn write_response_all_success() {
        let response = WriteAttributesResponse::default();
        let mut buffer = [0u8; 8];
        assert_eq!(response.pack(&mut buffer), Ok(1));
        assert_eq!(buffer[0], 0x00);
        let (unpacked, _) = WriteAttributesResponse::unpack(&buffer[..1]).unwrap();
        assert!(unpacked.is_success());
    }

    #[test]
    fn write_response_with_failures() {
        let mut response = WriteAttributesResponse::default();
        response
            .attributes
            .push(WriteAttributeStatus {
                status: ClusterLibraryStatus::ReadOnly,
                identifier: 0x0000,
            })
            .unwrap();
        response
            .attributes
            .push(WriteAttributeStatus {
                status: ClusterLibraryStatus::InvalidValue,
                identifier: 0x4001,
            })
            .unwrap();
        let mut buffer = [0u8; 8];
        assert_eq!(response.pack(&mut buffer), Ok(6));
        assert_eq!(buffer[..6], [0x88, 0x00, 0x00, 0x87, 0x01, 0x40]);
    }

    #[test]
    fn unpack_report_attributes() {
        let data = [0x00, 0x00, 0x10, 0x00];
        let (cmd, _) = ReportAttributes::unpack(&data).unwrap();
        assert_eq!(cmd.reports[0].value, AttributeValue::Boolean(false));
    }
}
