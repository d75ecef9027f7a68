use core::convert::From;

use zcl_data;

/// Errors
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Error {
    /// A frame could not be parsed
    MalformedFrame,
    /// The endpoint has not been registered
    NoSuchEndpoint,
    /// The endpoint is already registered
    DuplicateEndpoint,
    /// The cluster instance is already registered
    DuplicateCluster,
    /// The cluster instance does not exist
    NoSuchCluster,
    /// The attribute does not exist
    NoSuchAttribute,
    /// A fixed capacity table is full
    TableFull,
    /// The outgoing queue is full
    QueueFull,
    /// The buffer is too small
    NotEnoughSpace,
    /// The request was refused by the WWAH policy
    PolicyViolation,
    /// Persistent storage failed
    Storage,
    /// A stored record has an unexpected version or layout
    InvalidRecord,
    /// Wire data error
    DataError(zcl_data::Error),
}

impl From<zcl_data::Error> for Error {
    fn from(error: zcl_data::Error) -> Self {
        Self::DataError(error)
    }
}
