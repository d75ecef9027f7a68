//! Attribute and command discovery

use core::convert::TryFrom;

use heapless::Vec;

use crate::cluster_library::{AttributeDataType, AttributeIdentifier};
use crate::pack::{Pack, Reader, Writer};
use crate::Error;

/// Maximum number of entries in a discovery response
pub const MAX_DISCOVERY_ENTRIES: usize = 24;

/// Discover attributes request, also used for the extended variant
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiscoverAttributes {
    /// First attribute identifier to consider
    pub start: AttributeIdentifier,
    /// Maximum number of attributes in the response
    pub maximum: u8,
}

impl Pack<DiscoverAttributes, Error> for DiscoverAttributes {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u16(self.start)?;
        writer.write_u8(self.maximum)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let start = reader.read_u16()?;
        let maximum = reader.read_u8()?;
        Ok((Self { start, maximum }, reader.position()))
    }
}

/// Attribute identifier and type
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttributeInformation {
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
    /// Data type
    pub data_type: AttributeDataType,
}

/// Discover attributes response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscoverAttributesResponse {
    /// True when there are no more attributes to discover
    pub complete: bool,
    /// Discovered attributes
    pub attributes: Vec<AttributeInformation, MAX_DISCOVERY_ENTRIES>,
}

impl Pack<DiscoverAttributesResponse, Error> for DiscoverAttributesResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_bool(self.complete)?;
        for attribute in self.attributes.iter() {
            writer.write_u16(attribute.identifier)?;
            writer.write_u8(u8::from(attribute.data_type))?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let complete = reader.read_bool()?;
        let mut attributes = Vec::new();
        while !reader.is_empty() {
            let identifier = reader.read_u16()?;
            let data_type = AttributeDataType::try_from(reader.read_u8()?)?;
            attributes
                .push(AttributeInformation {
                    identifier,
                    data_type,
                })
                .map_err(|_| Error::NotEnoughSpace)?;
        }
        Ok((
            Self {
                complete,
                attributes,
            },
            reader.position(),
        ))
    }
}

/// Attribute identifier, type and access control bits
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtendedAttributeInformation {
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
    /// Data type
    pub data_type: AttributeDataType,
    /// Access control, bit 0 readable, bit 1 writable, bit 2 reportable
    pub access: u8,
}

/// Discover attributes extended response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscoverAttributesExtendedResponse {
    /// True when there are no more attributes to discover
    pub complete: bool,
    /// Discovered attributes
    pub attributes: Vec<ExtendedAttributeInformation, MAX_DISCOVERY_ENTRIES>,
}

impl Pack<DiscoverAttributesExtendedResponse, Error> for DiscoverAttributesExtendedResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_bool(self.complete)?;
        for attribute in self.attributes.iter() {
            writer.write_u16(attribute.identifier)?;
            writer.write_u8(u8::from(attribute.data_type))?;
            writer.write_u8(attribute.access)?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let complete = reader.read_bool()?;
        let mut attributes = Vec::new();
        while !reader.is_empty() {
            let identifier = reader.read_u16()?;
            let data_type = AttributeDataType::try_from(reader.read_u8()?)?;
            let access = reader.read_u8()?;
            attributes
                .push(ExtendedAttributeInformation {
                    identifier,
                    data_type,
                    access,
                })
                .map_err(|_| Error::NotEnoughSpace)?;
        }
        Ok((
            Self {
                complete,
                attributes,
            },
            reader.position(),
        ))
    }
}

/// Discover commands received or generated request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiscoverCommands {
    /// First command identifier to consider
    pub start: u8,
    /// Maximum number of commands in the response
    pub maximum: u8,
}

impl Pack<DiscoverCommands, Error> for DiscoverCommands {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(self.start)?;
        writer.write_u8(self.maximum)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let start = reader.read_u8()?;
        let maximum = reader.read_u8()?;
        Ok((Self { start, maximum }, reader.position()))
    }
}

/// Discover commands received or generated response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscoverCommandsResponse {
    /// True when there are no more commands to discover
    pub complete: bool,
    /// Command identifiers
    pub commands: Vec<u8, MAX_DISCOVERY_ENTRIES>,
}

impl Pack<DiscoverCommandsResponse, Error> for DiscoverCommandsResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_bool(self.complete)?;
        writer.write_bytes(&self.commands)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let complete = reader.read_bool()?;
        let commands = Vec::from_slice(reader.rest()).map_err(|_| Error::NotEnoughSpace)?;
        Ok((Self { complete, commands }, data.len()))
    }
}
