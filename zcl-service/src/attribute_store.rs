//! Attribute store
//!
//! Typed attribute tables per endpoint, cluster and role. Writes pass the
//! type and range checks, the check hook and the write hook before the value
//! is stored, a failing hook leaves the stored value untouched.

use heapless::Vec;

use zcl_data::cluster_library::{
    AttributeIdentifier, AttributeValue, ClusterIdentifier, ClusterLibraryStatus, Direction,
    ATTR_CLUSTER_REVISION,
};

use crate::Error;

/// Maximum number of endpoints
pub const MAX_ENDPOINTS: usize = 4;
/// Maximum number of cluster instances over all endpoints
pub const MAX_CLUSTER_INSTANCES: usize = 24;
/// Maximum number of attributes in a cluster instance
pub const MAX_ATTRIBUTES: usize = 24;

/// Side of a cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Server side, holds the attributes
    Server,
    /// Client side
    Client,
}

impl Role {
    /// The role receiving a frame sent in `direction`
    pub fn receiving(direction: Direction) -> Self {
        match direction {
            Direction::ToServer => Role::Server,
            Direction::ToClient => Role::Client,
        }
    }

    /// Direction of frames sent by this role
    pub fn sending(self) -> Direction {
        match self {
            Role::Server => Direction::ToClient,
            Role::Client => Direction::ToServer,
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        match role {
            Role::Server => 0,
            Role::Client => 1,
        }
    }
}

bitflags! {
    /// Attribute access
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Access: u8 {
        /// Readable over the air
        const READ = 1 << 0;
        /// Writable over the air
        const WRITE = 1 << 1;
        /// Can be reported
        const REPORTABLE = 1 << 2;
        /// Part of the scene extension field set of the cluster
        const SCENE = 1 << 3;
        /// Saved to persistent storage
        const NON_VOLATILE = 1 << 4;
    }
}

/// Where a write comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOrigin {
    /// Write attributes command from a peer, access rules apply
    Remote,
    /// The stack or the application
    Local,
}

/// One attribute
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeRecord {
    /// Identifier
    pub identifier: AttributeIdentifier,
    /// Manufacturer code for manufacturer specific attributes
    pub manufacturer: Option<u16>,
    /// Access
    pub access: Access,
    /// Current value, the type never changes
    pub value: AttributeValue,
    /// Value restored on reset to factory defaults
    pub default: AttributeValue,
    /// Inclusive limits for integer values
    pub limits: Option<(i64, i64)>,
}

impl AttributeRecord {
    /// A record with `value` as current and default value
    pub fn new(identifier: AttributeIdentifier, access: Access, value: AttributeValue) -> Self {
        Self {
            identifier,
            manufacturer: None,
            access,
            default: value.clone(),
            value,
            limits: None,
        }
    }

    /// Read-only record
    pub fn read_only(identifier: AttributeIdentifier, value: AttributeValue) -> Self {
        Self::new(identifier, Access::READ, value)
    }

    /// Readable and writable record
    pub fn writable(identifier: AttributeIdentifier, value: AttributeValue) -> Self {
        Self::new(identifier, Access::READ | Access::WRITE, value)
    }

    /// Set inclusive limits
    pub fn with_limits(mut self, minimum: i64, maximum: i64) -> Self {
        self.limits = Some((minimum, maximum));
        self
    }

    /// Add access flags
    pub fn with_access(mut self, access: Access) -> Self {
        self.access |= access;
        self
    }

    /// Make the record manufacturer specific
    pub fn with_manufacturer(mut self, manufacturer: u16) -> Self {
        self.manufacturer = Some(manufacturer);
        self
    }

    /// Limits of the record, falling back to the range of the type
    pub fn range(&self) -> Option<(i64, i64)> {
        self.limits
            .or_else(|| self.value.data_type().integer_range())
    }

    fn matches(
        &self,
        identifier: AttributeIdentifier,
        manufacturer: Option<u16>,
        cluster_manufacturer: Option<u16>,
    ) -> bool {
        if self.identifier != identifier {
            return false;
        }
        match self.manufacturer {
            Some(code) => manufacturer == Some(code),
            None => manufacturer.is_none() || manufacturer == cluster_manufacturer,
        }
    }
}

/// Validate a value before it is written, return false to reject
pub type CheckHook = fn(endpoint: u8, attribute: AttributeIdentifier, value: &AttributeValue) -> bool;
/// Called before the value is stored, a status other than success aborts
pub type WriteHook =
    fn(endpoint: u8, attribute: AttributeIdentifier, value: &AttributeValue) -> ClusterLibraryStatus;
/// Called after the attributes of the cluster have been reset to defaults
pub type DefaultHook = fn(endpoint: u8, attributes: &mut [AttributeRecord]);

/// Endpoint descriptor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Endpoint, 1 to 254
    pub endpoint: u8,
    /// Profile identifier
    pub profile: u16,
    /// Device identifier
    pub device: u16,
}

/// A cluster on an endpoint
pub struct ClusterInstance {
    /// Endpoint
    pub endpoint: u8,
    /// Cluster identifier
    pub cluster: ClusterIdentifier,
    /// Side
    pub role: Role,
    /// Manufacturer code for manufacturer specific clusters
    pub manufacturer: Option<u16>,
    attributes: Vec<AttributeRecord, MAX_ATTRIBUTES>,
    check_hook: Option<CheckHook>,
    write_hook: Option<WriteHook>,
    default_hook: Option<DefaultHook>,
}

impl ClusterInstance {
    /// Attributes ordered by identifier
    pub fn attributes(&self) -> &[AttributeRecord] {
        &self.attributes
    }

    /// Find an attribute
    pub fn attribute(
        &self,
        identifier: AttributeIdentifier,
        manufacturer: Option<u16>,
    ) -> Option<&AttributeRecord> {
        self.attributes
            .iter()
            .find(|r| r.matches(identifier, manufacturer, self.manufacturer))
    }

    fn attribute_mut(
        &mut self,
        identifier: AttributeIdentifier,
        manufacturer: Option<u16>,
    ) -> Option<&mut AttributeRecord> {
        let cluster_manufacturer = self.manufacturer;
        self.attributes
            .iter_mut()
            .find(|r| r.matches(identifier, manufacturer, cluster_manufacturer))
    }

    /// Attributes in the scene extension field set, ordered by identifier
    pub fn scene_attributes(&self) -> impl Iterator<Item = &AttributeRecord> {
        self.attributes
            .iter()
            .filter(|r| r.access.contains(Access::SCENE))
    }

    /// Revision of the cluster
    pub fn revision(&self) -> u16 {
        match self.attribute(ATTR_CLUSTER_REVISION, None).map(|r| &r.value) {
            Some(AttributeValue::Unsigned16(revision)) => *revision,
            _ => 0,
        }
    }
}

/// Attribute tables of all endpoints
#[derive(Default)]
pub struct AttributeStore {
    endpoints: Vec<EndpointDescriptor, MAX_ENDPOINTS>,
    clusters: Vec<ClusterInstance, MAX_CLUSTER_INSTANCES>,
}

impl AttributeStore {
    /// Register an endpoint
    pub fn add_endpoint(&mut self, descriptor: EndpointDescriptor) -> Result<(), Error> {
        if descriptor.endpoint == 0 || descriptor.endpoint == 0xff {
            return Err(Error::NoSuchEndpoint);
        }
        if self.endpoint(descriptor.endpoint).is_some() {
            return Err(Error::DuplicateEndpoint);
        }
        self.endpoints
            .push(descriptor)
            .map_err(|_| Error::TableFull)
    }

    /// Find an endpoint
    pub fn endpoint(&self, endpoint: u8) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|e| e.endpoint == endpoint)
    }

    /// Registered endpoints
    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    /// Register a cluster instance, a cluster revision attribute is added
    /// when missing and the attributes are ordered by identifier
    pub fn add_cluster(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        manufacturer: Option<u16>,
        revision: u16,
        attributes: &[AttributeRecord],
    ) -> Result<(), Error> {
        if self.endpoint(endpoint).is_none() {
            return Err(Error::NoSuchEndpoint);
        }
        if self.cluster(endpoint, cluster, role).is_some() {
            return Err(Error::DuplicateCluster);
        }
        let mut records: Vec<AttributeRecord, MAX_ATTRIBUTES> =
            Vec::from_slice(attributes).map_err(|_| Error::TableFull)?;
        if !records.iter().any(|r| r.identifier == ATTR_CLUSTER_REVISION) {
            records
                .push(AttributeRecord::read_only(
                    ATTR_CLUSTER_REVISION,
                    AttributeValue::Unsigned16(revision),
                ))
                .map_err(|_| Error::TableFull)?;
        }
        records.sort_unstable_by_key(|r| r.identifier);
        let instance = ClusterInstance {
            endpoint,
            cluster,
            role,
            manufacturer,
            attributes: records,
            check_hook: None,
            write_hook: None,
            default_hook: None,
        };
        self.clusters
            .push(instance)
            .map_err(|_| Error::TableFull)
    }

    /// Find a cluster instance
    pub fn cluster(
        &self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
    ) -> Option<&ClusterInstance> {
        self.clusters
            .iter()
            .find(|c| c.endpoint == endpoint && c.cluster == cluster && c.role == role)
    }

    fn cluster_mut(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
    ) -> Option<&mut ClusterInstance> {
        self.clusters
            .iter_mut()
            .find(|c| c.endpoint == endpoint && c.cluster == cluster && c.role == role)
    }

    /// All cluster instances
    pub fn clusters(&self) -> &[ClusterInstance] {
        &self.clusters
    }

    /// Endpoints hosting the cluster with the given role
    pub fn endpoints_hosting(
        &self,
        cluster: ClusterIdentifier,
        role: Role,
    ) -> Vec<u8, MAX_ENDPOINTS> {
        let mut endpoints = Vec::new();
        for instance in self
            .clusters
            .iter()
            .filter(|c| c.cluster == cluster && c.role == role)
        {
            let _ = endpoints.push(instance.endpoint);
        }
        endpoints
    }

    /// Install the check hook of a cluster instance
    pub fn install_check_hook(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        hook: CheckHook,
    ) -> Result<(), Error> {
        let instance = self
            .cluster_mut(endpoint, cluster, role)
            .ok_or(Error::NoSuchCluster)?;
        instance.check_hook = Some(hook);
        Ok(())
    }

    /// Install the write hook of a cluster instance
    pub fn install_write_hook(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        hook: WriteHook,
    ) -> Result<(), Error> {
        let instance = self
            .cluster_mut(endpoint, cluster, role)
            .ok_or(Error::NoSuchCluster)?;
        instance.write_hook = Some(hook);
        Ok(())
    }

    /// Install the default hook of a cluster instance
    pub fn install_default_hook(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        hook: DefaultHook,
    ) -> Result<(), Error> {
        let instance = self
            .cluster_mut(endpoint, cluster, role)
            .ok_or(Error::NoSuchCluster)?;
        instance.default_hook = Some(hook);
        Ok(())
    }

    /// Find an attribute record
    pub fn record(
        &self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        manufacturer: Option<u16>,
    ) -> Option<&AttributeRecord> {
        self.cluster(endpoint, cluster, role)
            .and_then(|c| c.attribute(attribute, manufacturer))
    }

    /// Read an attribute, remote reads of attributes without read access
    /// fail with `NotAuthorised`
    pub fn read(
        &self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        manufacturer: Option<u16>,
        origin: WriteOrigin,
    ) -> Result<&AttributeValue, ClusterLibraryStatus> {
        let instance = self
            .cluster(endpoint, cluster, role)
            .ok_or(ClusterLibraryStatus::UnsupportedCluster)?;
        let record = instance
            .attribute(attribute, manufacturer)
            .ok_or(ClusterLibraryStatus::UnsupportedAttribute)?;
        if origin == WriteOrigin::Remote && !record.access.contains(Access::READ) {
            return Err(ClusterLibraryStatus::NotAuthorised);
        }
        Ok(&record.value)
    }

    /// Check that a write would be accepted without storing the value
    #[allow(clippy::too_many_arguments)]
    pub fn validate(
        &self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        manufacturer: Option<u16>,
        value: &AttributeValue,
        origin: WriteOrigin,
    ) -> Result<(), ClusterLibraryStatus> {
        let instance = self
            .cluster(endpoint, cluster, role)
            .ok_or(ClusterLibraryStatus::UnsupportedCluster)?;
        let record = instance
            .attribute(attribute, manufacturer)
            .ok_or(ClusterLibraryStatus::UnsupportedAttribute)?;
        if origin == WriteOrigin::Remote && !record.access.contains(Access::WRITE) {
            return Err(ClusterLibraryStatus::ReadOnly);
        }
        if value.data_type() != record.value.data_type() {
            return Err(ClusterLibraryStatus::InvalidDataType);
        }
        if let (Some((minimum, maximum)), Some(v)) = (record.limits, value.as_integer()) {
            if v < minimum || v > maximum {
                return Err(ClusterLibraryStatus::InvalidValue);
            }
        }
        if let Some(hook) = instance.check_hook {
            if !hook(endpoint, attribute, value) {
                return Err(ClusterLibraryStatus::InvalidValue);
            }
        }
        Ok(())
    }

    /// Write an attribute, returns the previous value
    #[allow(clippy::too_many_arguments)]
    pub fn write(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        manufacturer: Option<u16>,
        value: AttributeValue,
        origin: WriteOrigin,
    ) -> Result<AttributeValue, ClusterLibraryStatus> {
        self.validate(
            endpoint,
            cluster,
            role,
            attribute,
            manufacturer,
            &value,
            origin,
        )?;
        let instance = self
            .cluster_mut(endpoint, cluster, role)
            .ok_or(ClusterLibraryStatus::UnsupportedCluster)?;
        if let Some(hook) = instance.write_hook {
            let status = hook(endpoint, attribute, &value);
            if status != ClusterLibraryStatus::Success {
                return Err(status);
            }
        }
        let record = instance
            .attribute_mut(attribute, manufacturer)
            .ok_or(ClusterLibraryStatus::UnsupportedAttribute)?;
        Ok(core::mem::replace(&mut record.value, value))
    }

    /// Put back a value read from storage, the hooks do not run
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        manufacturer: Option<u16>,
        value: AttributeValue,
    ) -> Result<(), ClusterLibraryStatus> {
        let record = self
            .cluster_mut(endpoint, cluster, role)
            .ok_or(ClusterLibraryStatus::UnsupportedCluster)?
            .attribute_mut(attribute, manufacturer)
            .ok_or(ClusterLibraryStatus::UnsupportedAttribute)?;
        if record.value.data_type() != value.data_type() {
            return Err(ClusterLibraryStatus::InvalidDataType);
        }
        record.value = value;
        Ok(())
    }

    /// Restore the default value of every attribute and run the default hooks
    pub fn reset_to_defaults(&mut self) {
        for instance in self.clusters.iter_mut() {
            for record in instance.attributes.iter_mut() {
                record.value = record.default.clone();
            }
            if let Some(hook) = instance.default_hook {
                hook(instance.endpoint, &mut instance.attributes);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AttributeStore {
        let mut store = AttributeStore::default();
        store
            .add_endpoint(EndpointDescriptor {
                endpoint: 1,
                profile: 0x0104,
                device: 0x0101,
            })
            .unwrap();
        store
            .add_cluster(
                1,
                0x0008,
                Role::Server,
                None,
                5,
                &[
                    AttributeRecord::writable(0x0011, AttributeValue::Unsigned8(0xff)),
                    AttributeRecord::read_only(0x0000, AttributeValue::Unsigned8(0x80))
                        .with_limits(1, 254)
                        .with_access(Access::SCENE | Access::REPORTABLE),
                ],
            )
            .unwrap();
        store
    }

    fn reject_odd(_endpoint: u8, _attribute: u16, value: &AttributeValue) -> bool {
        value.as_integer().map(|v| v % 2 == 0).unwrap_or(false)
    }

    fn refuse(_endpoint: u8, _attribute: u16, _value: &AttributeValue) -> ClusterLibraryStatus {
        ClusterLibraryStatus::InvalidValue
    }

    #[test]
    fn registration() {
        let mut store = store();
        let instance = store.cluster(1, 0x0008, Role::Server).unwrap();
        assert_eq!(instance.revision(), 5);
        let identifiers: std::vec::Vec<u16> =
            instance.attributes().iter().map(|r| r.identifier).collect();
        assert_eq!(identifiers, [0x0000, 0x0011, 0xfffd]);
        assert_eq!(
            store.add_cluster(1, 0x0008, Role::Server, None, 5, &[]),
            Err(Error::DuplicateCluster)
        );
        assert_eq!(
            store.add_cluster(2, 0x0008, Role::Server, None, 5, &[]),
            Err(Error::NoSuchEndpoint)
        );
        assert_eq!(store.endpoints_hosting(0x0008, Role::Server)[..], [1]);
    }

    #[test]
    fn write_then_read() {
        let mut store = store();
        let previous = store
            .write(
                1,
                0x0008,
                Role::Server,
                0x0011,
                None,
                AttributeValue::Unsigned8(0x20),
                WriteOrigin::Remote,
            )
            .unwrap();
        assert_eq!(previous, AttributeValue::Unsigned8(0xff));
        assert_eq!(
            store.read(1, 0x0008, Role::Server, 0x0011, None, WriteOrigin::Remote),
            Ok(&AttributeValue::Unsigned8(0x20))
        );
    }

    #[test]
    fn write_failures() {
        let mut store = store();
        let write = |store: &mut AttributeStore, attribute, value, origin| {
            store.write(1, 0x0008, Role::Server, attribute, None, value, origin)
        };
        assert_eq!(
            write(&mut store, 0x0000, AttributeValue::Unsigned8(5), WriteOrigin::Remote),
            Err(ClusterLibraryStatus::ReadOnly)
        );
        assert_eq!(
            write(&mut store, 0x0011, AttributeValue::Unsigned16(5), WriteOrigin::Remote),
            Err(ClusterLibraryStatus::InvalidDataType)
        );
        assert_eq!(
            write(&mut store, 0x0000, AttributeValue::Unsigned8(0xff), WriteOrigin::Local),
            Err(ClusterLibraryStatus::InvalidValue)
        );
        assert_eq!(
            write(&mut store, 0x0042, AttributeValue::Unsigned8(1), WriteOrigin::Local),
            Err(ClusterLibraryStatus::UnsupportedAttribute)
        );
        assert_eq!(
            store.read(1, 0x0006, Role::Server, 0x0000, None, WriteOrigin::Remote),
            Err(ClusterLibraryStatus::UnsupportedCluster)
        );
    }

    #[test]
    fn unreadable_attribute() {
        let mut store = store();
        store
            .add_cluster(
                1,
                0xfc00,
                Role::Server,
                None,
                1,
                &[AttributeRecord::new(0x0001, Access::WRITE, AttributeValue::Unsigned16(7))],
            )
            .unwrap();
        assert_eq!(
            store.read(1, 0xfc00, Role::Server, 0x0001, None, WriteOrigin::Remote),
            Err(ClusterLibraryStatus::NotAuthorised)
        );
        assert_eq!(
            store.read(1, 0xfc00, Role::Server, 0x0001, None, WriteOrigin::Local),
            Ok(&AttributeValue::Unsigned16(7))
        );
    }

    #[test]
    fn hooks() {
        let mut store = store();
        store
            .install_check_hook(1, 0x0008, Role::Server, reject_odd)
            .unwrap();
        assert_eq!(
            store.write(
                1,
                0x0008,
                Role::Server,
                0x0011,
                None,
                AttributeValue::Unsigned8(3),
                WriteOrigin::Remote
            ),
            Err(ClusterLibraryStatus::InvalidValue)
        );
        store
            .install_write_hook(1, 0x0008, Role::Server, refuse)
            .unwrap();
        assert_eq!(
            store.write(
                1,
                0x0008,
                Role::Server,
                0x0011,
                None,
                AttributeValue::Unsigned8(4),
                WriteOrigin::Remote
            ),
            Err(ClusterLibraryStatus::InvalidValue)
        );
        assert_eq!(
            store.read(1, 0x0008, Role::Server, 0x0011, None, WriteOrigin::Local),
            Ok(&AttributeValue::Unsigned8(0xff))
        );
    }

    #[test]
    fn manufacturer_specific() {
        let mut store = store();
        store
            .add_cluster(
                1,
                0xfc57,
                Role::Server,
                Some(0x1217),
                1,
                &[
                    AttributeRecord::read_only(0x0002, AttributeValue::Boolean(false)),
                    AttributeRecord::read_only(0x0003, AttributeValue::Boolean(true))
                        .with_manufacturer(0x1234),
                ],
            )
            .unwrap();
        let read = |manufacturer, attribute| {
            store
                .read(1, 0xfc57, Role::Server, attribute, manufacturer, WriteOrigin::Remote)
                .map(|v| v.clone())
        };
        assert_eq!(read(Some(0x1217), 0x0002), Ok(AttributeValue::Boolean(false)));
        assert_eq!(read(None, 0x0002), Ok(AttributeValue::Boolean(false)));
        assert_eq!(
            read(Some(0x1217), 0x0003),
            Err(ClusterLibraryStatus::UnsupportedAttribute)
        );
        assert_eq!(read(Some(0x1234), 0x0003), Ok(AttributeValue::Boolean(true)));
    }

    #[test]
    fn reset() {
        let mut store = store();
        store
            .write(
                1,
                0x0008,
                Role::Server,
                0x0000,
                None,
                AttributeValue::Unsigned8(10),
                WriteOrigin::Local,
            )
            .unwrap();
        store.reset_to_defaults();
        assert_eq!(
            store.read(1, 0x0008, Role::Server, 0x0000, None, WriteOrigin::Local),
            Ok(&AttributeValue::Unsigned8(0x80))
        );
    }
}
