//! # Addresses used in the application envelope

use core::default::Default;

use crate::pack::PackFixed;
use crate::Error;

use byteorder::{ByteOrder, LittleEndian};

/// Short address size
pub const SHORT_ADDRESS_SIZE: usize = 2;
/// Short address, broadcast address
pub const SHORT_ADDRESS_BROADCAST: u16 = 0xffff;
/// Short address, unassigned address
pub const SHORT_ADDRESS_UNASSIGNED: u16 = 0xfffe;
/// Short address of the trust center
pub const TRUST_CENTER_ADDRESS: ShortAddress = ShortAddress(0x0000);

/// 16-bit short address
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShortAddress(u16);

impl ShortAddress {
    /// Create a short address
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// The broadcast address
    pub fn broadcast() -> Self {
        Self(SHORT_ADDRESS_BROADCAST)
    }

    /// True for any of the broadcast addresses, 0xfff8 to 0xffff
    pub fn is_broadcast(self) -> bool {
        self.0 >= 0xfff8 && self.0 != SHORT_ADDRESS_UNASSIGNED
    }

    /// True if the address is a unicast address
    pub fn is_assigned(self) -> bool {
        self.0 < 0xfff8
    }
}

impl PackFixed<ShortAddress, Error> for ShortAddress {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() == SHORT_ADDRESS_SIZE {
            LittleEndian::write_u16(data, self.0);
            Ok(())
        } else {
            Err(Error::NotEnoughSpace)
        }
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() == SHORT_ADDRESS_SIZE {
            Ok(ShortAddress(LittleEndian::read_u16(data)))
        } else {
            Err(Error::WrongNumberOfBytes)
        }
    }
}

impl From<u16> for ShortAddress {
    fn from(value: u16) -> Self {
        ShortAddress(value)
    }
}

impl From<ShortAddress> for u16 {
    fn from(value: ShortAddress) -> Self {
        value.0
    }
}

impl PartialEq<u16> for ShortAddress {
    fn eq(&self, other: &u16) -> bool {
        self.0 == *other
    }
}

impl Default for ShortAddress {
    fn default() -> Self {
        Self(SHORT_ADDRESS_BROADCAST)
    }
}

impl core::fmt::Display for ShortAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

/// 16-bit group identifier
pub type GroupIdentifier = u16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_addresses() {
        assert!(ShortAddress::broadcast().is_broadcast());
        assert!(ShortAddress::new(0xfffd).is_broadcast());
        assert!(!ShortAddress::new(0xfffe).is_broadcast());
        assert!(TRUST_CENTER_ADDRESS.is_assigned());
    }

    #[test]
    fn pack_short_address() {
        let mut data = [0u8; 2];
        ShortAddress::new(0x1a2b).pack(&mut data).unwrap();
        assert_eq!(data, [0x2b, 0x1a]);
        assert_eq!(ShortAddress::unpack(&data), Ok(ShortAddress::new(0x1a2b)));
        assert_eq!(ShortAddress::unpack(&data[..1]), Err(Error::WrongNumberOfBytes));
    }
}
