//! # Bounded string types
//!
//! Strings are stored with a fixed capacity, longer strings are rejected.

use heapless::{String, Vec};

use crate::pack::Pack;
use crate::Error;

/// Longest string kept in attribute storage
pub const MAX_STRING_LENGTH: usize = 64;

/// Octet string
pub type OctetString = Vec<u8, MAX_STRING_LENGTH>;

/// Character string
pub type CharacterString = String<MAX_STRING_LENGTH>;

fn string_bytes(data: &[u8]) -> Result<(&[u8], usize), Error> {
    if data.is_empty() {
        return Err(Error::WrongNumberOfBytes);
    }
    let length = match data[0] {
        0xff => 0,
        length => length as usize,
    };
    if data.len() <= length {
        return Err(Error::WrongNumberOfBytes);
    }
    Ok((&data[1..=length], length + 1))
}

fn pack_string(value: &[u8], data: &mut [u8]) -> Result<usize, Error> {
    if data.len() <= value.len() {
        return Err(Error::NotEnoughSpace);
    }
    data[0] = value.len() as u8;
    data[1..=value.len()].copy_from_slice(value);
    Ok(value.len() + 1)
}

impl Pack<OctetString, Error> for OctetString {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        pack_string(self.as_ref(), data)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let (bytes, used) = string_bytes(data)?;
        let value = OctetString::from_slice(bytes).map_err(|_| Error::NotEnoughSpace)?;
        Ok((value, used))
    }
}

impl Pack<CharacterString, Error> for CharacterString {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        pack_string(self.as_bytes(), data)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let (bytes, used) = string_bytes(data)?;
        let text = core::str::from_utf8(bytes).map_err(|_| Error::InvalidValue)?;
        let mut value = CharacterString::new();
        value.push_str(text).map_err(|_| Error::NotEnoughSpace)?;
        Ok((value, used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_character_string() {
        let data = [0x05, b'h', b'e', b'l', b'l', b'o', 0x00];
        let (value, used) = CharacterString::unpack(&data).unwrap();
        assert_eq!(used, 6);
        assert_eq!(value.as_str(), "hello");

        let (value, used) = CharacterString::unpack(&data[6..]).unwrap();
        assert_eq!(used, 1);
        assert!(value.is_empty());
    }

    #[test]
    fn pack_octet_string() {
        let value = OctetString::from_slice(&[0xde, 0xad]).unwrap();
        let mut data = [0u8; 4];
        assert_eq!(value.pack(&mut data), Ok(3));
        assert_eq!(data[..3], [0x02, 0xde, 0xad]);
        assert_eq!(value.pack(&mut data[..2]), Err(Error::NotEnoughSpace));
    }

    #[test]
    fn unpack_too_long() {
        let mut data = [0u8; 100];
        data[0] = 99;
        assert_eq!(OctetString::unpack(&data), Err(Error::NotEnoughSpace));
    }
}
