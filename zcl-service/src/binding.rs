//! Destinations of attribute reports and load control status reports

use heapless::Vec;

use zcl_data::cluster_library::ClusterIdentifier;

use crate::aps::Destination;
use crate::Error;

/// Maximum number of bindings
pub const MAX_BINDINGS: usize = 8;

/// Binding of a local cluster to a destination
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    /// Local endpoint
    pub endpoint: u8,
    /// Cluster
    pub cluster: ClusterIdentifier,
    /// Destination
    pub destination: Destination,
}

/// Binding table
#[derive(Default)]
pub struct BindingTable {
    entries: Vec<Binding, MAX_BINDINGS>,
}

impl BindingTable {
    /// Add a binding, adding an existing binding does nothing
    pub fn add(&mut self, binding: Binding) -> Result<(), Error> {
        if self.entries.contains(&binding) {
            return Ok(());
        }
        self.entries.push(binding).map_err(|_| Error::TableFull)
    }

    /// Remove a binding
    pub fn remove(&mut self, binding: &Binding) -> bool {
        match self.entries.iter().position(|b| b == binding) {
            Some(index) => {
                self.entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every binding
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Bindings
    pub fn entries(&self) -> &[Binding] {
        &self.entries
    }

    /// Destinations bound to a local cluster
    pub fn destinations(
        &self,
        endpoint: u8,
        cluster: ClusterIdentifier,
    ) -> impl Iterator<Item = Destination> + '_ {
        self.entries
            .iter()
            .filter(move |b| b.endpoint == endpoint && b.cluster == cluster)
            .map(|b| b.destination)
    }
}
