//! # Traits for handling packing and unpacking
//!
//! These traits handles packing and unpacking of data into byte slices. The
//! `Reader` and `Writer` cursors walk command payloads field by field, all
//! multi-byte fields are little-endian.

use byteorder::{ByteOrder, LittleEndian};

use crate::Error;

/// Packing of data of fixed size
pub trait PackFixed<T, E> {
    /// Serialise into buffer, returning if there was an error
    fn pack(&self, data: &mut [u8]) -> Result<(), E>;
    /// De-serialise from buffer, returning object or error
    fn unpack(data: &[u8]) -> Result<T, E>;
}

/// Packing of data with variable size
pub trait Pack<T, E> {
    /// Serialise into buffer, returning number of bytes written or error
    fn pack(&self, data: &mut [u8]) -> Result<usize, E>;
    /// De-serialise from buffer, returning object and number of bytes used
    /// or error
    fn unpack(data: &[u8]) -> Result<(T, usize), E>;
}

/// Payload cursor for reading little-endian fields
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Number of bytes consumed
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Number of bytes left
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// True when all bytes has been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The bytes not yet consumed
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    /// Take `length` bytes
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < length {
            return Err(Error::WrongNumberOfBytes);
        }
        let bytes = &self.data[self.offset..self.offset + length];
        self.offset += length;
        Ok(bytes)
    }

    /// Read a `u8`
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a `i8`
    pub fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a boolean, any non-zero value is true
    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a `u16`
    pub fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    /// Read a `i16`
    pub fn read_i16(&mut self) -> Result<i16, Error> {
        Ok(LittleEndian::read_i16(self.read_bytes(2)?))
    }

    /// Read a `u32`
    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    /// Read a `u64`
    pub fn read_u64(&mut self) -> Result<u64, Error> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    /// Read an optional trailing `u8`, `None` if the payload has ended
    pub fn read_optional_u8(&mut self) -> Result<Option<u8>, Error> {
        if self.is_empty() {
            Ok(None)
        } else {
            self.read_u8().map(Some)
        }
    }

    /// Read an optional trailing `u16`, `None` if the payload has ended
    pub fn read_optional_u16(&mut self) -> Result<Option<u16>, Error> {
        if self.is_empty() {
            Ok(None)
        } else {
            self.read_u16().map(Some)
        }
    }

    /// Read a length-prefixed octet or character string, the invalid
    /// length 0xff is read as an empty string
    pub fn read_string(&mut self) -> Result<&'a [u8], Error> {
        let length = match self.read_u8()? {
            0xff => 0,
            length => length as usize,
        };
        self.read_bytes(length)
    }
}

/// Payload cursor for writing little-endian fields
#[derive(Debug)]
pub struct Writer<'a> {
    data: &'a mut [u8],
    offset: usize,
}

impl<'a> Writer<'a> {
    /// Create a writer at the start of `data`
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Number of bytes written
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Number of bytes that still fits
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Reserve `length` bytes and return them for writing
    pub fn allocate(&mut self, length: usize) -> Result<&mut [u8], Error> {
        if self.remaining() < length {
            return Err(Error::NotEnoughSpace);
        }
        let start = self.offset;
        self.offset += length;
        Ok(&mut self.data[start..start + length])
    }

    /// Write bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.allocate(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Write a `u8`
    pub fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.allocate(1)?[0] = value;
        Ok(())
    }

    /// Write a `i8`
    pub fn write_i8(&mut self, value: i8) -> Result<(), Error> {
        self.write_u8(value as u8)
    }

    /// Write a boolean
    pub fn write_bool(&mut self, value: bool) -> Result<(), Error> {
        self.write_u8(value as u8)
    }

    /// Write a `u16`
    pub fn write_u16(&mut self, value: u16) -> Result<(), Error> {
        LittleEndian::write_u16(self.allocate(2)?, value);
        Ok(())
    }

    /// Write a `i16`
    pub fn write_i16(&mut self, value: i16) -> Result<(), Error> {
        LittleEndian::write_i16(self.allocate(2)?, value);
        Ok(())
    }

    /// Write a `u32`
    pub fn write_u32(&mut self, value: u32) -> Result<(), Error> {
        LittleEndian::write_u32(self.allocate(4)?, value);
        Ok(())
    }

    /// Write a `u64`
    pub fn write_u64(&mut self, value: u64) -> Result<(), Error> {
        LittleEndian::write_u64(self.allocate(8)?, value);
        Ok(())
    }

    /// Write a length-prefixed string
    pub fn write_string(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if bytes.len() >= 0xff {
            return Err(Error::InvalidValue);
        }
        self.write_u8(bytes.len() as u8)?;
        self.write_bytes(bytes)
    }
}
