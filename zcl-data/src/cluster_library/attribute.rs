use core::convert::TryFrom;
use core::fmt;

use crate::pack::{Pack, Reader};
use crate::Error;

use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::{CharacterString, OctetString};

extended_enum!(
    /// Attribute data type
    AttributeDataType, u8,
    None => 0x00,
    Data8 => 0x08,
    Data16 => 0x09,
    Data24 => 0x0a,
    Data32 => 0x0b,
    Data40 => 0x0c,
    Data48 => 0x0d,
    Data56 => 0x0e,
    Data64 => 0x0f,
    Boolean => 0x10,
    Bitmap8 => 0x18,
    Bitmap16 => 0x19,
    Bitmap24 => 0x1a,
    Bitmap32 => 0x1b,
    Bitmap40 => 0x1c,
    Bitmap48 => 0x1d,
    Bitmap56 => 0x1e,
    Bitmap64 => 0x1f,
    Unsigned8 => 0x20,
    Unsigned16 => 0x21,
    Unsigned24 => 0x22,
    Unsigned32 => 0x23,
    Unsigned40 => 0x24,
    Unsigned48 => 0x25,
    Unsigned56 => 0x26,
    Unsigned64 => 0x27,
    Signed8 => 0x28,
    Signed16 => 0x29,
    Signed24 => 0x2a,
    Signed32 => 0x2b,
    Signed40 => 0x2c,
    Signed48 => 0x2d,
    Signed56 => 0x2e,
    Signed64 => 0x2f,
    Enumeration8 => 0x30,
    Enumeration16 => 0x31,
    FloatingPoint16 => 0x38,
    FloatingPoint32 => 0x39,
    FloatingPoint64 => 0x3a,
    OctetString => 0x41,
    CharacterString => 0x42,
    LongOctetString => 0x43,
    LongCharacterString => 0x44,
    Array => 0x48,
    Structure => 0x4c,
    Set => 0x50,
    Bag => 0x51,
    TimeOfDay => 0xe0,
    Date => 0xe1,
    UtcTime => 0xe2,
    ClusterIdentifier => 0xe8,
    AttributeIdentifier => 0xe9,
    BuildingAutomationControlNetworkObjectIdentifier => 0xea,
    IeeeAddress => 0xf0,
    Key128 => 0xf1,
    Unknown => 0xff,
);

impl AttributeDataType {
    /// Size of a value of this type, `None` for variable sized types
    pub fn num_octets(self) -> Option<usize> {
        match self {
            AttributeDataType::None | AttributeDataType::Unknown => Some(0),
            AttributeDataType::Data8
            | AttributeDataType::Boolean
            | AttributeDataType::Bitmap8
            | AttributeDataType::Unsigned8
            | AttributeDataType::Signed8
            | AttributeDataType::Enumeration8 => Some(1),
            AttributeDataType::Data16
            | AttributeDataType::Bitmap16
            | AttributeDataType::Unsigned16
            | AttributeDataType::Signed16
            | AttributeDataType::Enumeration16
            | AttributeDataType::FloatingPoint16
            | AttributeDataType::ClusterIdentifier
            | AttributeDataType::AttributeIdentifier => Some(2),
            AttributeDataType::Data24
            | AttributeDataType::Bitmap24
            | AttributeDataType::Unsigned24
            | AttributeDataType::Signed24 => Some(3),
            AttributeDataType::Data32
            | AttributeDataType::Bitmap32
            | AttributeDataType::Unsigned32
            | AttributeDataType::Signed32
            | AttributeDataType::FloatingPoint32
            | AttributeDataType::TimeOfDay
            | AttributeDataType::Date
            | AttributeDataType::UtcTime
            | AttributeDataType::BuildingAutomationControlNetworkObjectIdentifier => Some(4),
            AttributeDataType::Data40
            | AttributeDataType::Bitmap40
            | AttributeDataType::Unsigned40
            | AttributeDataType::Signed40 => Some(5),
            AttributeDataType::Data48
            | AttributeDataType::Bitmap48
            | AttributeDataType::Unsigned48
            | AttributeDataType::Signed48 => Some(6),
            AttributeDataType::Data56
            | AttributeDataType::Bitmap56
            | AttributeDataType::Unsigned56
            | AttributeDataType::Signed56 => Some(7),
            AttributeDataType::Data64
            | AttributeDataType::Bitmap64
            | AttributeDataType::Unsigned64
            | AttributeDataType::Signed64
            | AttributeDataType::FloatingPoint64
            | AttributeDataType::IeeeAddress => Some(8),
            AttributeDataType::Key128 => Some(16),
            AttributeDataType::OctetString
            | AttributeDataType::CharacterString
            | AttributeDataType::LongOctetString
            | AttributeDataType::LongCharacterString
            | AttributeDataType::Array
            | AttributeDataType::Structure
            | AttributeDataType::Set
            | AttributeDataType::Bag => None,
        }
    }

    /// Analog types carry a reportable change field in reporting
    /// configurations, changes of discrete types are always reported
    pub fn is_analog(self) -> bool {
        matches!(
            self,
            AttributeDataType::Unsigned8
                | AttributeDataType::Unsigned16
                | AttributeDataType::Unsigned24
                | AttributeDataType::Unsigned32
                | AttributeDataType::Unsigned40
                | AttributeDataType::Unsigned48
                | AttributeDataType::Unsigned56
                | AttributeDataType::Unsigned64
                | AttributeDataType::Signed8
                | AttributeDataType::Signed16
                | AttributeDataType::Signed24
                | AttributeDataType::Signed32
                | AttributeDataType::Signed40
                | AttributeDataType::Signed48
                | AttributeDataType::Signed56
                | AttributeDataType::Signed64
                | AttributeDataType::FloatingPoint16
                | AttributeDataType::FloatingPoint32
                | AttributeDataType::FloatingPoint64
                | AttributeDataType::TimeOfDay
                | AttributeDataType::Date
                | AttributeDataType::UtcTime
        )
    }

    /// Range of the integer types, as (minimum, maximum)
    pub fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            AttributeDataType::Boolean => Some((0, 1)),
            AttributeDataType::Data8
            | AttributeDataType::Bitmap8
            | AttributeDataType::Unsigned8
            | AttributeDataType::Enumeration8 => Some((0, 0xff)),
            AttributeDataType::Data16
            | AttributeDataType::Bitmap16
            | AttributeDataType::Unsigned16
            | AttributeDataType::Enumeration16
            | AttributeDataType::ClusterIdentifier
            | AttributeDataType::AttributeIdentifier => Some((0, 0xffff)),
            AttributeDataType::Data24 | AttributeDataType::Bitmap24 | AttributeDataType::Unsigned24 => {
                Some((0, 0x00ff_ffff))
            }
            AttributeDataType::Data32
            | AttributeDataType::Bitmap32
            | AttributeDataType::Unsigned32
            | AttributeDataType::TimeOfDay
            | AttributeDataType::Date
            | AttributeDataType::UtcTime => Some((0, 0xffff_ffff)),
            AttributeDataType::Unsigned40 => Some((0, 0xff_ffff_ffff)),
            AttributeDataType::Unsigned48 => Some((0, 0xffff_ffff_ffff)),
            AttributeDataType::Unsigned56 => Some((0, 0x00ff_ffff_ffff_ffff)),
            AttributeDataType::Signed8 => Some((i8::MIN as i64, i8::MAX as i64)),
            AttributeDataType::Signed16 => Some((i16::MIN as i64, i16::MAX as i64)),
            AttributeDataType::Signed24 => Some((-0x80_0000, 0x7f_ffff)),
            AttributeDataType::Signed32 => Some((i32::MIN as i64, i32::MAX as i64)),
            AttributeDataType::Signed40 => Some((-0x80_0000_0000, 0x7f_ffff_ffff)),
            AttributeDataType::Signed48 => Some((-0x8000_0000_0000, 0x7fff_ffff_ffff)),
            AttributeDataType::Signed56 => Some((-0x0080_0000_0000_0000, 0x007f_ffff_ffff_ffff)),
            AttributeDataType::Signed64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

/// A typed attribute value
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    /// No data
    None,
    /// 8-bit data
    Data8(u8),
    /// 16-bit data
    Data16(u16),
    /// 24-bit data
    Data24(u32),
    /// 32-bit data
    Data32(u32),
    /// 64-bit data
    Data64(u64),
    /// Boolean
    Boolean(bool),
    /// 8-bit bitmap
    Bitmap8(u8),
    /// 16-bit bitmap
    Bitmap16(u16),
    /// 24-bit bitmap
    Bitmap24(u32),
    /// 32-bit bitmap
    Bitmap32(u32),
    /// 64-bit bitmap
    Bitmap64(u64),
    /// Unsigned 8-bit integer
    Unsigned8(u8),
    /// Unsigned 16-bit integer
    Unsigned16(u16),
    /// Unsigned 24-bit integer
    Unsigned24(u32),
    /// Unsigned 32-bit integer
    Unsigned32(u32),
    /// Unsigned 40-bit integer
    Unsigned40(u64),
    /// Unsigned 48-bit integer
    Unsigned48(u64),
    /// Unsigned 56-bit integer
    Unsigned56(u64),
    /// Unsigned 64-bit integer
    Unsigned64(u64),
    /// Signed 8-bit integer
    Signed8(i8),
    /// Signed 16-bit integer
    Signed16(i16),
    /// Signed 24-bit integer
    Signed24(i32),
    /// Signed 32-bit integer
    Signed32(i32),
    /// Signed 40-bit integer
    Signed40(i64),
    /// Signed 48-bit integer
    Signed48(i64),
    /// Signed 56-bit integer
    Signed56(i64),
    /// Signed 64-bit integer
    Signed64(i64),
    /// 8-bit enumeration
    Enumeration8(u8),
    /// 16-bit enumeration
    Enumeration16(u16),
    /// Single precision floating point
    FloatingPoint32(f32),
    /// Octet string
    OctetString(OctetString),
    /// Character string
    CharacterString(CharacterString),
    /// Array, the encoded element type, count and elements
    Array(OctetString),
    /// Structure, the encoded element count and elements
    Structure(OctetString),
    /// Time of day
    TimeOfDay(u32),
    /// Date
    Date(u32),
    /// UTC time, seconds since 2000-01-01
    UtcTime(u32),
    /// Cluster identifier
    ClusterIdentifier(u16),
    /// Attribute identifier
    AttributeIdentifier(u16),
    /// IEEE address
    IeeeAddress(u64),
    /// 128-bit security key
    Key128([u8; 16]),
}

fn collection_value(reader: &mut Reader, data_type: AttributeDataType) -> Result<(), Error> {
    match data_type {
        AttributeDataType::Array | AttributeDataType::Set | AttributeDataType::Bag => {
            let element_type = AttributeDataType::try_from(reader.read_u8()?)?;
            let count = reader.read_u16()?;
            if count != 0xffff {
                for _ in 0..count {
                    let (_, used) = AttributeValue::unpack(reader.rest(), element_type)?;
                    reader.read_bytes(used)?;
                }
            }
        }
        AttributeDataType::Structure => {
            let count = reader.read_u16()?;
            if count != 0xffff {
                for _ in 0..count {
                    let element_type = AttributeDataType::try_from(reader.read_u8()?)?;
                    let (_, used) = AttributeValue::unpack(reader.rest(), element_type)?;
                    reader.read_bytes(used)?;
                }
            }
        }
        _ => return Err(Error::UnsupportedAttributeValue),
    }
    Ok(())
}

impl AttributeValue {
    /// Serialise the value without the type identifier, returns the number
    /// of bytes written
    pub fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let size = self.data_type().num_octets();
        if let Some(size) = size {
            if data.len() < size {
                return Err(Error::NotEnoughSpace);
            }
        }
        match self {
            AttributeValue::None => Ok(0),
            AttributeValue::Data8(v)
            | AttributeValue::Bitmap8(v)
            | AttributeValue::Unsigned8(v)
            | AttributeValue::Enumeration8(v) => {
                data[0] = *v;
                Ok(1)
            }
            AttributeValue::Boolean(v) => {
                data[0] = *v as u8;
                Ok(1)
            }
            AttributeValue::Signed8(v) => {
                data[0] = *v as u8;
                Ok(1)
            }
            AttributeValue::Data16(v)
            | AttributeValue::Bitmap16(v)
            | AttributeValue::Unsigned16(v)
            | AttributeValue::Enumeration16(v)
            | AttributeValue::ClusterIdentifier(v)
            | AttributeValue::AttributeIdentifier(v) => {
                LittleEndian::write_u16(&mut data[..2], *v);
                Ok(2)
            }
            AttributeValue::Signed16(v) => {
                LittleEndian::write_i16(&mut data[..2], *v);
                Ok(2)
            }
            AttributeValue::Data24(v) | AttributeValue::Bitmap24(v) | AttributeValue::Unsigned24(v) => {
                LittleEndian::write_u24(&mut data[..3], *v & 0x00ff_ffff);
                Ok(3)
            }
            AttributeValue::Signed24(v) => {
                LittleEndian::write_i24(&mut data[..3], *v);
                Ok(3)
            }
            AttributeValue::Data32(v)
            | AttributeValue::Bitmap32(v)
            | AttributeValue::Unsigned32(v)
            | AttributeValue::TimeOfDay(v)
            | AttributeValue::Date(v)
            | AttributeValue::UtcTime(v) => {
                LittleEndian::write_u32(&mut data[..4], *v);
                Ok(4)
            }
            AttributeValue::Signed32(v) => {
                LittleEndian::write_i32(&mut data[..4], *v);
                Ok(4)
            }
            AttributeValue::FloatingPoint32(v) => {
                LittleEndian::write_f32(&mut data[..4], *v);
                Ok(4)
            }
            AttributeValue::Unsigned40(v) => {
                LittleEndian::write_uint(&mut data[..5], *v & 0xff_ffff_ffff, 5);
                Ok(5)
            }
            AttributeValue::Unsigned48(v) => {
                LittleEndian::write_uint(&mut data[..6], *v & 0xffff_ffff_ffff, 6);
                Ok(6)
            }
            AttributeValue::Unsigned56(v) => {
                LittleEndian::write_uint(&mut data[..7], *v & 0x00ff_ffff_ffff_ffff, 7);
                Ok(7)
            }
            AttributeValue::Signed40(v) => {
                LittleEndian::write_int(&mut data[..5], *v, 5);
                Ok(5)
            }
            AttributeValue::Signed48(v) => {
                LittleEndian::write_int(&mut data[..6], *v, 6);
                Ok(6)
            }
            AttributeValue::Signed56(v) => {
                LittleEndian::write_int(&mut data[..7], *v, 7);
                Ok(7)
            }
            AttributeValue::Data64(v)
            | AttributeValue::Bitmap64(v)
            | AttributeValue::Unsigned64(v)
            | AttributeValue::IeeeAddress(v) => {
                LittleEndian::write_u64(&mut data[..8], *v);
                Ok(8)
            }
            AttributeValue::Signed64(v) => {
                LittleEndian::write_i64(&mut data[..8], *v);
                Ok(8)
            }
            AttributeValue::Key128(v) => {
                data[..16].copy_from_slice(v);
                Ok(16)
            }
            AttributeValue::OctetString(v) => v.pack(data),
            AttributeValue::CharacterString(v) => v.pack(data),
            AttributeValue::Array(v) | AttributeValue::Structure(v) => {
                if data.len() < v.len() {
                    return Err(Error::NotEnoughSpace);
                }
                data[..v.len()].copy_from_slice(v);
                Ok(v.len())
            }
        }
    }

    /// De-serialise a value of the given type, returns the value and the
    /// number of bytes used
    pub fn unpack(data: &[u8], data_type: AttributeDataType) -> Result<(Self, usize), Error> {
        if let Some(num_octets) = data_type.num_octets() {
            if data.len() < num_octets {
                return Err(Error::WrongNumberOfBytes);
            }
        }
        let value = match data_type {
            AttributeDataType::None => AttributeValue::None,
            AttributeDataType::Data8 => AttributeValue::Data8(data[0]),
            AttributeDataType::Data16 => AttributeValue::Data16(LittleEndian::read_u16(data)),
            AttributeDataType::Data24 => AttributeValue::Data24(LittleEndian::read_u24(data)),
            AttributeDataType::Data32 => AttributeValue::Data32(LittleEndian::read_u32(data)),
            AttributeDataType::Data64 => AttributeValue::Data64(LittleEndian::read_u64(data)),
            AttributeDataType::Boolean => match data[0] {
                0x00 => AttributeValue::Boolean(false),
                0x01 => AttributeValue::Boolean(true),
                _ => return Err(Error::InvalidValue),
            },
            AttributeDataType::Bitmap8 => AttributeValue::Bitmap8(data[0]),
            AttributeDataType::Bitmap16 => AttributeValue::Bitmap16(LittleEndian::read_u16(data)),
            AttributeDataType::Bitmap24 => AttributeValue::Bitmap24(LittleEndian::read_u24(data)),
            AttributeDataType::Bitmap32 => AttributeValue::Bitmap32(LittleEndian::read_u32(data)),
            AttributeDataType::Bitmap64 => AttributeValue::Bitmap64(LittleEndian::read_u64(data)),
            AttributeDataType::Unsigned8 => AttributeValue::Unsigned8(data[0]),
            AttributeDataType::Unsigned16 => {
                AttributeValue::Unsigned16(LittleEndian::read_u16(data))
            }
            AttributeDataType::Unsigned24 => {
                AttributeValue::Unsigned24(LittleEndian::read_u24(data))
            }
            AttributeDataType::Unsigned32 => {
                AttributeValue::Unsigned32(LittleEndian::read_u32(data))
            }
            AttributeDataType::Unsigned40 => {
                AttributeValue::Unsigned40(LittleEndian::read_uint(data, 5))
            }
            AttributeDataType::Unsigned48 => {
                AttributeValue::Unsigned48(LittleEndian::read_uint(data, 6))
            }
            AttributeDataType::Unsigned56 => {
                AttributeValue::Unsigned56(LittleEndian::read_uint(data, 7))
            }
            AttributeDataType::Unsigned64 => {
                AttributeValue::Unsigned64(LittleEndian::read_u64(data))
            }
            AttributeDataType::Signed8 => AttributeValue::Signed8(data[0] as i8),
            AttributeDataType::Signed16 => AttributeValue::Signed16(LittleEndian::read_i16(data)),
            AttributeDataType::Signed24 => AttributeValue::Signed24(LittleEndian::read_i24(data)),
            AttributeDataType::Signed32 => AttributeValue::Signed32(LittleEndian::read_i32(data)),
            AttributeDataType::Signed40 => AttributeValue::Signed40(LittleEndian::read_int(data, 5)),
            AttributeDataType::Signed48 => AttributeValue::Signed48(LittleEndian::read_int(data, 6)),
            AttributeDataType::Signed56 => AttributeValue::Signed56(LittleEndian::read_int(data, 7)),
            AttributeDataType::Signed64 => AttributeValue::Signed64(LittleEndian::read_i64(data)),
            AttributeDataType::Enumeration8 => AttributeValue::Enumeration8(data[0]),
            AttributeDataType::Enumeration16 => {
                AttributeValue::Enumeration16(LittleEndian::read_u16(data))
            }
            AttributeDataType::FloatingPoint32 => {
                AttributeValue::FloatingPoint32(LittleEndian::read_f32(data))
            }
            AttributeDataType::OctetString => {
                let (value, used) = OctetString::unpack(data)?;
                return Ok((AttributeValue::OctetString(value), used));
            }
            AttributeDataType::CharacterString => {
                let (value, used) = CharacterString::unpack(data)?;
                return Ok((AttributeValue::CharacterString(value), used));
            }
            AttributeDataType::Array | AttributeDataType::Structure => {
                let mut reader = Reader::new(data);
                collection_value(&mut reader, data_type)?;
                let used = reader.position();
                let raw = OctetString::from_slice(&data[..used]).map_err(|_| Error::NotEnoughSpace)?;
                let value = if data_type == AttributeDataType::Array {
                    AttributeValue::Array(raw)
                } else {
                    AttributeValue::Structure(raw)
                };
                return Ok((value, used));
            }
            AttributeDataType::TimeOfDay => AttributeValue::TimeOfDay(LittleEndian::read_u32(data)),
            AttributeDataType::Date => AttributeValue::Date(LittleEndian::read_u32(data)),
            AttributeDataType::UtcTime => AttributeValue::UtcTime(LittleEndian::read_u32(data)),
            AttributeDataType::ClusterIdentifier => {
                AttributeValue::ClusterIdentifier(LittleEndian::read_u16(data))
            }
            AttributeDataType::AttributeIdentifier => {
                AttributeValue::AttributeIdentifier(LittleEndian::read_u16(data))
            }
            AttributeDataType::IeeeAddress => {
                AttributeValue::IeeeAddress(LittleEndian::read_u64(data))
            }
            AttributeDataType::Key128 => {
                let mut key = [0u8; 16];
                key.copy_from_slice(&data[..16]);
                AttributeValue::Key128(key)
            }
            _ => return Err(Error::UnsupportedAttributeValue),
        };
        let used = data_type.num_octets().unwrap_or(0);
        Ok((value, used))
    }

    /// The type of the value
    pub fn data_type(&self) -> AttributeDataType {
        match self {
            AttributeValue::None => AttributeDataType::None,
            AttributeValue::Data8(_) => AttributeDataType::Data8,
            AttributeValue::Data16(_) => AttributeDataType::Data16,
            AttributeValue::Data24(_) => AttributeDataType::Data24,
            AttributeValue::Data32(_) => AttributeDataType::Data32,
            AttributeValue::Data64(_) => AttributeDataType::Data64,
            AttributeValue::Boolean(_) => AttributeDataType::Boolean,
            AttributeValue::Bitmap8(_) => AttributeDataType::Bitmap8,
            AttributeValue::Bitmap16(_) => AttributeDataType::Bitmap16,
            AttributeValue::Bitmap24(_) => AttributeDataType::Bitmap24,
            AttributeValue::Bitmap32(_) => AttributeDataType::Bitmap32,
            AttributeValue::Bitmap64(_) => AttributeDataType::Bitmap64,
            AttributeValue::Unsigned8(_) => AttributeDataType::Unsigned8,
            AttributeValue::Unsigned16(_) => AttributeDataType::Unsigned16,
            AttributeValue::Unsigned24(_) => AttributeDataType::Unsigned24,
            AttributeValue::Unsigned32(_) => AttributeDataType::Unsigned32,
            AttributeValue::Unsigned40(_) => AttributeDataType::Unsigned40,
            AttributeValue::Unsigned48(_) => AttributeDataType::Unsigned48,
            AttributeValue::Unsigned56(_) => AttributeDataType::Unsigned56,
            AttributeValue::Unsigned64(_) => AttributeDataType::Unsigned64,
            AttributeValue::Signed8(_) => AttributeDataType::Signed8,
            AttributeValue::Signed16(_) => AttributeDataType::Signed16,
            AttributeValue::Signed24(_) => AttributeDataType::Signed24,
            AttributeValue::Signed32(_) => AttributeDataType::Signed32,
            AttributeValue::Signed40(_) => AttributeDataType::Signed40,
            AttributeValue::Signed48(_) => AttributeDataType::Signed48,
            AttributeValue::Signed56(_) => AttributeDataType::Signed56,
            AttributeValue::Signed64(_) => AttributeDataType::Signed64,
            AttributeValue::Enumeration8(_) => AttributeDataType::Enumeration8,
            AttributeValue::Enumeration16(_) => AttributeDataType::Enumeration16,
            AttributeValue::FloatingPoint32(_) => AttributeDataType::FloatingPoint32,
            AttributeValue::OctetString(_) => AttributeDataType::OctetString,
            AttributeValue::CharacterString(_) => AttributeDataType::CharacterString,
            AttributeValue::Array(_) => AttributeDataType::Array,
            AttributeValue::Structure(_) => AttributeDataType::Structure,
            AttributeValue::TimeOfDay(_) => AttributeDataType::TimeOfDay,
            AttributeValue::Date(_) => AttributeDataType::Date,
            AttributeValue::UtcTime(_) => AttributeDataType::UtcTime,
            AttributeValue::ClusterIdentifier(_) => AttributeDataType::ClusterIdentifier,
            AttributeValue::AttributeIdentifier(_) => AttributeDataType::AttributeIdentifier,
            AttributeValue::IeeeAddress(_) => AttributeDataType::IeeeAddress,
            AttributeValue::Key128(_) => AttributeDataType::Key128,
        }
    }

    /// Size of the serialised value
    pub fn packed_size(&self) -> usize {
        match self {
            AttributeValue::OctetString(v) => v.len() + 1,
            AttributeValue::CharacterString(v) => v.len() + 1,
            AttributeValue::Array(v) | AttributeValue::Structure(v) => v.len(),
            value => value.data_type().num_octets().unwrap_or(0),
        }
    }

    /// The value as an integer, for the integer like types
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Boolean(v) => Some(*v as i64),
            AttributeValue::Data8(v)
            | AttributeValue::Bitmap8(v)
            | AttributeValue::Unsigned8(v)
            | AttributeValue::Enumeration8(v) => Some(*v as i64),
            AttributeValue::Data16(v)
            | AttributeValue::Bitmap16(v)
            | AttributeValue::Unsigned16(v)
            | AttributeValue::Enumeration16(v)
            | AttributeValue::ClusterIdentifier(v)
            | AttributeValue::AttributeIdentifier(v) => Some(*v as i64),
            AttributeValue::Data24(v)
            | AttributeValue::Bitmap24(v)
            | AttributeValue::Unsigned24(v)
            | AttributeValue::Data32(v)
            | AttributeValue::Bitmap32(v)
            | AttributeValue::Unsigned32(v)
            | AttributeValue::TimeOfDay(v)
            | AttributeValue::Date(v)
            | AttributeValue::UtcTime(v) => Some(*v as i64),
            AttributeValue::Unsigned40(v)
            | AttributeValue::Unsigned48(v)
            | AttributeValue::Unsigned56(v) => Some(*v as i64),
            AttributeValue::Signed8(v) => Some(*v as i64),
            AttributeValue::Signed16(v) => Some(*v as i64),
            AttributeValue::Signed24(v) | AttributeValue::Signed32(v) => Some(*v as i64),
            AttributeValue::Signed40(v)
            | AttributeValue::Signed48(v)
            | AttributeValue::Signed56(v)
            | AttributeValue::Signed64(v) => Some(*v),
            _ => None,
        }
    }

    /// Create a value of an integer like type, fails if the value does not
    /// fit the type
    pub fn from_integer(data_type: AttributeDataType, value: i64) -> Result<Self, Error> {
        let (minimum, maximum) = data_type
            .integer_range()
            .ok_or(Error::UnsupportedAttributeValue)?;
        if value < minimum || value > maximum {
            return Err(Error::InvalidValue);
        }
        let value = match data_type {
            AttributeDataType::Boolean => AttributeValue::Boolean(value != 0),
            AttributeDataType::Data8 => AttributeValue::Data8(value as u8),
            AttributeDataType::Bitmap8 => AttributeValue::Bitmap8(value as u8),
            AttributeDataType::Unsigned8 => AttributeValue::Unsigned8(value as u8),
            AttributeDataType::Enumeration8 => AttributeValue::Enumeration8(value as u8),
            AttributeDataType::Data16 => AttributeValue::Data16(value as u16),
            AttributeDataType::Bitmap16 => AttributeValue::Bitmap16(value as u16),
            AttributeDataType::Unsigned16 => AttributeValue::Unsigned16(value as u16),
            AttributeDataType::Enumeration16 => AttributeValue::Enumeration16(value as u16),
            AttributeDataType::ClusterIdentifier => AttributeValue::ClusterIdentifier(value as u16),
            AttributeDataType::AttributeIdentifier => {
                AttributeValue::AttributeIdentifier(value as u16)
            }
            AttributeDataType::Data24 => AttributeValue::Data24(value as u32),
            AttributeDataType::Bitmap24 => AttributeValue::Bitmap24(value as u32),
            AttributeDataType::Unsigned24 => AttributeValue::Unsigned24(value as u32),
            AttributeDataType::Data32 => AttributeValue::Data32(value as u32),
            AttributeDataType::Bitmap32 => AttributeValue::Bitmap32(value as u32),
            AttributeDataType::Unsigned32 => AttributeValue::Unsigned32(value as u32),
            AttributeDataType::TimeOfDay => AttributeValue::TimeOfDay(value as u32),
            AttributeDataType::Date => AttributeValue::Date(value as u32),
            AttributeDataType::UtcTime => AttributeValue::UtcTime(value as u32),
            AttributeDataType::Unsigned40 => AttributeValue::Unsigned40(value as u64),
            AttributeDataType::Unsigned48 => AttributeValue::Unsigned48(value as u64),
            AttributeDataType::Unsigned56 => AttributeValue::Unsigned56(value as u64),
            AttributeDataType::Signed8 => AttributeValue::Signed8(value as i8),
            AttributeDataType::Signed16 => AttributeValue::Signed16(value as i16),
            AttributeDataType::Signed24 => AttributeValue::Signed24(value as i32),
            AttributeDataType::Signed32 => AttributeValue::Signed32(value as i32),
            AttributeDataType::Signed40 => AttributeValue::Signed40(value),
            AttributeDataType::Signed48 => AttributeValue::Signed48(value),
            AttributeDataType::Signed56 => AttributeValue::Signed56(value),
            AttributeDataType::Signed64 => AttributeValue::Signed64(value),
            _ => return Err(Error::UnsupportedAttributeValue),
        };
        Ok(value)
    }

    /// True when the difference to `previous` is at least `change`,
    /// discrete types report any difference
    pub fn change_exceeds(&self, previous: &AttributeValue, change: Option<&AttributeValue>) -> bool {
        if !self.data_type().is_analog() {
            return self != previous;
        }
        match (self, previous, change) {
            (AttributeValue::FloatingPoint32(a), AttributeValue::FloatingPoint32(b), change) => {
                let delta = if a > b { a - b } else { b - a };
                match change {
                    Some(AttributeValue::FloatingPoint32(c)) => delta >= *c && delta > 0.0,
                    _ => delta > 0.0,
                }
            }
            _ => match (self.as_integer(), previous.as_integer()) {
                (Some(a), Some(b)) => {
                    let delta = (a as i128 - b as i128).unsigned_abs();
                    let change = change.and_then(|c| c.as_integer()).unwrap_or(0).max(0) as u128;
                    delta > 0 && delta >= change
                }
                _ => self != previous,
            },
        }
    }

    /// Zero or empty value of the given type
    pub fn default_for(data_type: AttributeDataType) -> Result<Self, Error> {
        match data_type {
            AttributeDataType::None => Ok(AttributeValue::None),
            AttributeDataType::FloatingPoint32 => Ok(AttributeValue::FloatingPoint32(0.0)),
            AttributeDataType::OctetString => Ok(AttributeValue::OctetString(OctetString::new())),
            AttributeDataType::CharacterString => {
                Ok(AttributeValue::CharacterString(CharacterString::new()))
            }
            AttributeDataType::IeeeAddress => Ok(AttributeValue::IeeeAddress(0)),
            AttributeDataType::Key128 => Ok(AttributeValue::Key128([0u8; 16])),
            data_type => Self::from_integer(data_type, 0),
        }
    }

    /// Check the value against the invalid marker of its type
    pub fn is_valid(&self) -> bool {
        match self {
            AttributeValue::Unsigned8(v) | AttributeValue::Enumeration8(v) => *v != u8::MAX,
            AttributeValue::Unsigned16(v)
            | AttributeValue::Enumeration16(v)
            | AttributeValue::ClusterIdentifier(v)
            | AttributeValue::AttributeIdentifier(v) => *v != u16::MAX,
            AttributeValue::Unsigned24(v) => *v < 0x00ff_ffff,
            AttributeValue::Unsigned32(v)
            | AttributeValue::TimeOfDay(v)
            | AttributeValue::Date(v)
            | AttributeValue::UtcTime(v) => *v != u32::MAX,
            AttributeValue::Unsigned64(v) | AttributeValue::IeeeAddress(v) => *v != u64::MAX,
            AttributeValue::Signed8(v) => *v != i8::MIN,
            AttributeValue::Signed16(v) => *v != i16::MIN,
            AttributeValue::Signed24(v) => *v > -8_388_608 && *v <= 8_388_607,
            AttributeValue::Signed32(v) => *v != i32::MIN,
            AttributeValue::Signed64(v) => *v != i64::MIN,
            AttributeValue::FloatingPoint32(v) => !v.is_nan(),
            _ => true,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "Invalid");
        }
        match self {
            AttributeValue::None => write!(f, "None"),
            AttributeValue::Boolean(v) => write!(f, "{}", v),
            AttributeValue::FloatingPoint32(v) => write!(f, "{}", v),
            AttributeValue::CharacterString(v) => write!(f, "{}", v),
            AttributeValue::OctetString(v)
            | AttributeValue::Array(v)
            | AttributeValue::Structure(v) => {
                for b in v.iter() {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            AttributeValue::Key128(v) => {
                for b in v.iter() {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            AttributeValue::ClusterIdentifier(v) | AttributeValue::AttributeIdentifier(v) => {
                write!(f, "{:04x}", v)
            }
            AttributeValue::IeeeAddress(v) => write!(f, "{:016x}", v),
            value => match value.as_integer() {
                Some(v) => write!(f, "{}", v),
                None => write!(f, "?"),
            },
        }
    }
}
