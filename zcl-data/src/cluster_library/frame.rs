use core::convert::TryFrom;

use crate::error::Error;
use crate::pack::{Pack, PackFixed};

use byteorder::{ByteOrder, LittleEndian};

// ZCL, 2.4.1.1.1 Frame Type Sub-field
/// Frame type field
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameType {
    /// The command is global for all clusters, a profile-wide command
    Global = 0b00,
    /// Command is specific or local to a cluster
    Local = 0b01,
}

impl TryFrom<u8> for FrameType {
    type Error = Error;
    /// Get `FrameType` from a `u8`
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value & 0b11 {
            0b00 => Ok(FrameType::Global),
            0b01 => Ok(FrameType::Local),
            _ => Err(Error::UnknownFrameType),
        }
    }
}

/// Direction of the command
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Sent from the client side to the server side
    ToServer = 0,
    /// Sent from the server side to the client side
    ToClient = 1,
}

impl TryFrom<u8> for Direction {
    type Error = Error;
    /// Get `Direction`from `u8`
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value & 0b0000_1000 {
            0b0000_0000 => Ok(Direction::ToServer),
            0b0000_1000 => Ok(Direction::ToClient),
            _ => Err(Error::InvalidValue),
        }
    }
}

impl Direction {
    /// The direction of a reply to a frame sent in this direction
    pub fn reverse(self) -> Self {
        match self {
            Direction::ToServer => Direction::ToClient,
            Direction::ToClient => Direction::ToServer,
        }
    }
}

impl From<Direction> for u8 {
    /// Get `u8` from `Direction`
    fn from(value: Direction) -> u8 {
        match value {
            Direction::ToServer => 0b0000_0000,
            Direction::ToClient => 0b0000_1000,
        }
    }
}

const RESERVED_MASK: u8 = 0b1110_0000;

// ZCL, 2.4.1.1 Frame Control Field
/// Cluster library frame control field
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameControl {
    /// Frame type, see `FrameType`
    pub frame_type: FrameType,
    /// Manufacturer specific command
    pub manufacturer_specific: bool,
    /// Command direction, see `Direction`
    pub direction: Direction,
    /// Disable default response mechanism
    pub disable_default_response: bool,
}

impl PackFixed<FrameControl, Error> for FrameControl {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() != 1 {
            Err(Error::WrongNumberOfBytes)
        } else {
            let frame_type = self.frame_type as u8;
            data[0] = frame_type
                | ((self.manufacturer_specific as u8) << 2)
                | u8::from(self.direction)
                | ((self.disable_default_response as u8) << 4);
            Ok(())
        }
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() != 1 {
            Err(Error::WrongNumberOfBytes)
        } else if data[0] & RESERVED_MASK != 0 {
            Err(Error::ReservedBitsSet)
        } else {
            let frame_type = FrameType::try_from(data[0])?;
            let manufacturer_specific = (data[0] & 0b0000_0100) == 0b0000_0100;
            let direction = Direction::try_from(data[0])?;
            let disable_default_response = (data[0] & 0b0001_0000) == 0b0001_0000;
            Ok(Self {
                frame_type,
                manufacturer_specific,
                direction,
                disable_default_response,
            })
        }
    }
}

// ZCL, 2.4.1 General ZCL Frame Format
/// Cluster library frame header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClusterLibraryHeader {
    /// Frame control, see `FrameControl`
    pub control: FrameControl,
    /// Optional manufacturer code for manufacturer specific clusters
    pub manufacturer: Option<u16>,
    /// Transaction sequence code
    pub transaction_sequence: u8,
    /// Command identifier
    pub command: u8,
}

impl Pack<ClusterLibraryHeader, Error> for ClusterLibraryHeader {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let length = if self.manufacturer.is_some() { 5 } else { 3 };
        if data.len() < length {
            return Err(Error::NotEnoughSpace);
        }
        let mut control = self.control;
        control.manufacturer_specific = self.manufacturer.is_some();
        control.pack(&mut data[0..1])?;
        let mut offset = 1;
        if let Some(manufacturer) = self.manufacturer {
            LittleEndian::write_u16(&mut data[offset..offset + 2], manufacturer);
            offset += 2;
        }
        data[offset] = self.transaction_sequence;
        offset += 1;
        data[offset] = self.command;
        offset += 1;
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() < 3 {
            return Err(Error::WrongNumberOfBytes);
        }
        let control = FrameControl::unpack(&data[0..1])?;
        let mut offset = 1;
        let manufacturer = if control.manufacturer_specific {
            if data.len() < 5 {
                return Err(Error::WrongNumberOfBytes);
            }
            let manufacturer = LittleEndian::read_u16(&data[offset..offset + 2]);
            offset += 2;
            Some(manufacturer)
        } else {
            None
        };

        let transaction_sequence = data[offset];
        offset += 1;
        let command = data[offset];
        offset += 1;

        Ok((
            Self {
                control,
                manufacturer,
                transaction_sequence,
                command,
            },
            offset,
        ))
    }
}

impl ClusterLibraryHeader {
    /// Create a header for a command, the manufacturer specific flag
    /// follows the presence of a manufacturer code
    pub fn new(
        frame_type: FrameType,
        direction: Direction,
        manufacturer: Option<u16>,
        transaction_sequence: u8,
        command: u8,
        disable_default_response: bool,
    ) -> Self {
        Self {
            control: FrameControl {
                frame_type,
                manufacturer_specific: manufacturer.is_some(),
                direction,
                disable_default_response,
            },
            manufacturer,
            transaction_sequence,
            command,
        }
    }

    /// True for profile-wide commands
    pub fn is_global(&self) -> bool {
        self.control.frame_type == FrameType::Global
    }
}

/// A cluster library frame, header and the command payload
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Frame header
    pub header: ClusterLibraryHeader,
    /// Command payload
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Parse a frame, the payload borrows from `data`
    pub fn parse(data: &'a [u8]) -> Result<Self, Error> {
        let (header, used) = ClusterLibraryHeader::unpack(data)?;
        Ok(Self {
            header,
            payload: &data[used..],
        })
    }

    /// Serialize the frame into `data`, returns the number of bytes written
    pub fn serialize(&self, data: &mut [u8]) -> Result<usize, Error> {
        let used = self.header.pack(data)?;
        let length = used + self.payload.len();
        if data.len() < length {
            return Err(Error::NotEnoughSpace);
        }
        data[used..length].copy_from_slice(self.payload);
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_frame_control() {
        let data = [0x11];

        let control = FrameControl::unpack(&data[0..1]).unwrap();

        assert_eq!(control.frame_type, FrameType::Local);
        assert_eq!(control.manufacturer_specific, false);
        assert_eq!(control.direction, Direction::ToServer);
        assert_eq!(control.disable_default_response, true);
    }

    #[test]
    fn pack_frame_control() {
        let cases = [
            (FrameType::Local, false, Direction::ToServer, false, 0x01),
            (FrameType::Global, true, Direction::ToServer, false, 0x04),
            (FrameType::Global, false, Direction::ToClient, false, 0x08),
            (FrameType::Global, false, Direction::ToServer, true, 0x10),
        ];
        let mut data = [0u8; 1];
        for (frame_type, manufacturer_specific, direction, disable_default_response, expected) in
            cases
        {
            let control = FrameControl {
                frame_type,
                manufacturer_specific,
                direction,
                disable_default_response,
            };
            control.pack(&mut data).unwrap();
            assert_eq!(data[0], expected);
        }
        assert_eq!(
            FrameControl::unpack(&[0x08]).map(|c| c.direction.reverse()),
            Ok(Direction::ToServer)
        );
    }

    #[test]
    fn unpack_header() {
        // on/off toggle, no default response
        let data = [0x11, 0x80, 0x02];
        let (header, used) = ClusterLibraryHeader::unpack(&data[..]).unwrap();
        assert_eq!(used, 3);
        assert_eq!(header.control.frame_type, FrameType::Local);
        assert_eq!(header.control.direction, Direction::ToServer);
        assert!(header.control.disable_default_response);
        assert_eq!(header.manufacturer, None);
        assert_eq!(header.transaction_sequence, 0x80);
        assert_eq!(header.command, 0x02);

        // default response from a server
        let data = [0x18, 0x05, 0x0b, 0x02, 0x00];
        let (header, used) = ClusterLibraryHeader::unpack(&data[..]).unwrap();
        assert_eq!(used, 3);
        assert!(header.is_global());
        assert_eq!(header.control.direction, Direction::ToClient);
        assert_eq!(header.command, 0x0b);
    }

    #[test]
    fn reserved_bits_are_rejected() {
        let data = [0x21, 0x01, 0x02];
        assert_eq!(
            ClusterLibraryHeader::unpack(&data[..]),
            Err(Error::ReservedBitsSet)
        );
        let data = [0x03, 0x01, 0x02];
        assert_eq!(
            ClusterLibraryHeader::unpack(&data[..]),
            Err(Error::UnknownFrameType)
        );
    }

    #[test]
    fn truncated_header() {
        // manufacturer specific, but the code is cut short
        let data = [0x05, 0x17, 0x12];
        assert_eq!(
            ClusterLibraryHeader::unpack(&data[..]),
            Err(Error::WrongNumberOfBytes)
        );
        assert_eq!(
            ClusterLibraryHeader::unpack(&data[..2]),
            Err(Error::WrongNumberOfBytes)
        );
    }

    #[test]
    fn parse_frame() {
        // WWAH, disable OTA downgrades
        let data = [0x05, 0x17, 0x12, 0x42, 0x14];
        let frame = Frame::parse(&data[..]).unwrap();
        assert_eq!(frame.header.manufacturer, Some(0x1217));
        assert_eq!(frame.header.transaction_sequence, 0x42);
        assert_eq!(frame.header.command, 0x14);
        assert!(frame.payload.is_empty());
        assert!(!frame.header.is_global());

        // read attributes, current level
        let data = [0x00, 0x07, 0x00, 0x00, 0x00];
        let frame = Frame::parse(&data[..]).unwrap();
        assert!(frame.header.is_global());
        assert_eq!(frame.payload, &[0x00, 0x00]);

        let mut buffer = [0u8; 8];
        let used = frame.serialize(&mut buffer).unwrap();
        assert_eq!(buffer[..used], data);
        assert_eq!(frame.serialize(&mut buffer[..4]), Err(Error::NotEnoughSpace));
    }

    #[test]
    fn pack_header() {
        let mut buffer = [0u8; 32];

        let header = ClusterLibraryHeader::new(
            FrameType::Local,
            Direction::ToClient,
            None,
            0x34,
            0x18,
            false,
        );
        assert_eq!(header.pack(&mut buffer), Ok(3));
        assert_eq!(buffer[..3], [0x09, 0x34, 0x18]);

        let header = ClusterLibraryHeader::new(
            FrameType::Local,
            Direction::ToClient,
            Some(0x7654),
            0x01,
            0xee,
            true,
        );
        assert_eq!(header.pack(&mut buffer), Ok(5));
        assert_eq!(buffer[..5], [0x1d, 0x54, 0x76, 0x01, 0xee]);
        assert_eq!(header.pack(&mut buffer[..4]), Err(Error::NotEnoughSpace));

        // the manufacturer flag follows the manufacturer code
        let mut header = header;
        header.manufacturer = None;
        assert_eq!(header.pack(&mut buffer), Ok(3));
        assert_eq!(buffer[0], 0x19);
    }
}
