//! # Error handling

/// Errors
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Error {
    /// Not enough space for the operation
    NotEnoughSpace,
    /// Wrong number of bytes provided to the operation
    WrongNumberOfBytes,
    /// The value provided is invalid
    InvalidValue,
    /// The frame type is unknown
    UnknownFrameType,
    /// Reserved bits in the frame control field are set
    ReservedBitsSet,
    /// The command identifier is unknown for the cluster
    UnknownCommand,
    /// The cluster identifier is unknown
    UnknownClusterIdentifier,
    /// The attribute data type is not supported
    UnsupportedAttributeValue,
}
