//! Outstanding requests waiting for a response

use zcl_data::cluster_library::{ClusterIdentifier, Direction};
use zcl_data::ShortAddress;

use crate::timer::{earliest, is_due};
use crate::Error;

/// Number of transaction slots
pub const MAX_TRANSACTIONS: usize = 8;

/// What to do when a transaction completes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Report to the application with the token given when sending
    Application(u32),
    /// Keep-alive attribute read of the trust center check-in
    KeepAliveRead,
}

/// A request waiting for its response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction sequence number
    pub sequence: u8,
    /// Peer the request was sent to
    pub peer: ShortAddress,
    /// Endpoint of the peer
    pub peer_endpoint: u8,
    /// Local endpoint
    pub local_endpoint: u8,
    /// Profile
    pub profile: u16,
    /// Cluster
    pub cluster: ClusterIdentifier,
    /// Direction of the request
    pub direction: Direction,
    /// Completion
    pub completion: Completion,
    /// Time out at this time stamp
    pub deadline: u32,
}

impl Transaction {
    fn matches(
        &self,
        sequence: u8,
        source: ShortAddress,
        cluster: ClusterIdentifier,
        direction: Direction,
    ) -> bool {
        self.sequence == sequence
            && self.peer == source
            && self.cluster == cluster
            && self.direction == direction.reverse()
    }
}

/// Transaction table
#[derive(Default)]
pub struct TransactionTable {
    slots: [Option<Transaction>; MAX_TRANSACTIONS],
}

impl TransactionTable {
    /// True if a request with the sequence number is outstanding
    pub fn is_outstanding(&self, sequence: u8) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|t| t.sequence == sequence)
    }

    /// True if no slot is free
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Reserve a slot for the transaction
    pub fn reserve(&mut self, transaction: Transaction) -> Result<(), Error> {
        if self.is_outstanding(transaction.sequence) {
            return Err(Error::InvalidRecord);
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(Error::TableFull)?;
        *slot = Some(transaction);
        Ok(())
    }

    /// Complete the transaction answered by a frame, the frame direction is
    /// the reverse of the request direction
    pub fn complete(
        &mut self,
        sequence: u8,
        source: ShortAddress,
        cluster: ClusterIdentifier,
        direction: Direction,
    ) -> Option<Transaction> {
        self.slots
            .iter_mut()
            .find(|s| {
                s.map(|t| t.matches(sequence, source, cluster, direction))
                    .unwrap_or(false)
            })
            .and_then(Option::take)
    }

    /// Remove the transaction with the sequence number, nothing happens if
    /// there is none
    pub fn cancel(&mut self, sequence: u8) -> Option<Transaction> {
        self.slots
            .iter_mut()
            .find(|s| s.map(|t| t.sequence == sequence).unwrap_or(false))
            .and_then(Option::take)
    }

    /// Remove one transaction that has timed out
    pub fn expire(&mut self, now: u32) -> Option<Transaction> {
        self.slots
            .iter_mut()
            .find(|s| s.map(|t| is_due(now, t.deadline)).unwrap_or(false))
            .and_then(Option::take)
    }

    /// Earliest deadline
    pub fn next_deadline(&self, now: u32) -> Option<u32> {
        self.slots
            .iter()
            .flatten()
            .fold(None, |next, t| earliest(now, next, Some(t.deadline)))
    }
}
