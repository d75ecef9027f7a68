//! Groups server
//!
//! Group memberships are kept per endpoint in a shared table. Removing a
//! group also removes the scenes stored for it.

use heapless::Vec;

use zcl_data::cluster_library::groups::{
    AddGroup, GetGroupMembership, GetGroupMembershipResponse, GroupList, GroupStatusResponse,
    ViewGroupResponse, ATTR_NAME_SUPPORT, CMD_ADD_GROUP, CMD_ADD_GROUP_IF_IDENTIFYING,
    CMD_GET_GROUP_MEMBERSHIP, CMD_REMOVE_ALL_GROUPS, CMD_REMOVE_GROUP, CMD_VIEW_GROUP,
};
use zcl_data::cluster_library::{cluster, AttributeValue, ClusterLibraryStatus};
use zcl_data::pack::{Pack, Reader};
use zcl_data::{CharacterString, GroupIdentifier};

use super::{malformed, CommandResult, HandlerResult, Inbound};
use crate::attribute_store::{AttributeRecord, Role, WriteOrigin};
use crate::callback::{CallbackStatus, DeviceEvent, DeviceHandler};
use crate::ClusterLibraryService;

/// Maximum number of group memberships over all endpoints
pub const MAX_GROUPS: usize = 16;
/// Lowest group identifier
pub const MIN_GROUP: GroupIdentifier = 0x0001;
/// Highest group identifier
pub const MAX_GROUP: GroupIdentifier = 0xfff7;

/// Identify cluster attribute, remaining identify time
const ATTR_IDENTIFY_TIME: u16 = 0x0000;

/// Membership of an endpoint in a group
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupMembership {
    /// Endpoint
    pub endpoint: u8,
    /// Group
    pub group: GroupIdentifier,
}

/// Group memberships
#[derive(Clone, Debug, Default)]
pub struct GroupTable {
    entries: Vec<GroupMembership, MAX_GROUPS>,
}

impl GroupTable {
    /// Add the endpoint to a group
    pub fn add(&mut self, endpoint: u8, group: GroupIdentifier) -> Result<(), ClusterLibraryStatus> {
        if self.contains(endpoint, group) {
            return Err(ClusterLibraryStatus::DuplicateExists);
        }
        self.entries
            .push(GroupMembership { endpoint, group })
            .map_err(|_| ClusterLibraryStatus::InsufficientSpace)
    }

    /// Remove the endpoint from a group
    pub fn remove(&mut self, endpoint: u8, group: GroupIdentifier) -> bool {
        match self
            .entries
            .iter()
            .position(|m| m.endpoint == endpoint && m.group == group)
        {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove the endpoint from every group, returns the groups left
    pub fn remove_all(&mut self, endpoint: u8) -> GroupList {
        let groups = self.groups(endpoint);
        self.entries.retain(|m| m.endpoint != endpoint);
        groups
    }

    /// True if the endpoint is a member of the group
    pub fn contains(&self, endpoint: u8, group: GroupIdentifier) -> bool {
        self.entries
            .iter()
            .any(|m| m.endpoint == endpoint && m.group == group)
    }

    /// Groups of an endpoint
    pub fn groups(&self, endpoint: u8) -> GroupList {
        self.entries
            .iter()
            .filter(|m| m.endpoint == endpoint)
            .map(|m| m.group)
            .collect()
    }

    /// Number of free slots
    pub fn free(&self) -> usize {
        MAX_GROUPS - self.entries.len()
    }

    /// All memberships
    pub fn entries(&self) -> &[GroupMembership] {
        &self.entries
    }

    /// Remove every membership
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Attributes of a groups server
pub fn server_attributes() -> [AttributeRecord; 1] {
    [AttributeRecord::read_only(
        ATTR_NAME_SUPPORT,
        AttributeValue::Bitmap8(0),
    )]
}

fn check_group(group: GroupIdentifier) -> Result<(), ClusterLibraryStatus> {
    if (MIN_GROUP..=MAX_GROUP).contains(&group) {
        Ok(())
    } else {
        Err(ClusterLibraryStatus::InvalidValue)
    }
}

fn read_group(payload: &[u8]) -> Result<GroupIdentifier, ClusterLibraryStatus> {
    Reader::new(payload).read_u16().map_err(malformed)
}

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    pub(crate) fn handle_groups(&mut self, inbound: &Inbound) -> CommandResult {
        match inbound.header.command {
            CMD_ADD_GROUP => {
                let (request, _) = AddGroup::unpack(inbound.payload).map_err(malformed)?;
                log::info!("> Add group {:04x} endpoint {}", request.group, inbound.endpoint);
                let status = self.add_group(inbound.endpoint, request.group);
                self.respond_group_status(inbound, CMD_ADD_GROUP, status, request.group);
                Ok(HandlerResult::HandledWillRespond)
            }
            CMD_VIEW_GROUP => {
                let group = read_group(inbound.payload)?;
                let status = match check_group(group) {
                    Ok(()) if self.groups.contains(inbound.endpoint, group) => {
                        ClusterLibraryStatus::Success
                    }
                    Ok(()) => ClusterLibraryStatus::NotFound,
                    Err(status) => status,
                };
                if inbound.is_unicast() {
                    let response = ViewGroupResponse {
                        status: self.status(status),
                        group,
                        name: CharacterString::new(),
                    };
                    self.respond(inbound, CMD_VIEW_GROUP, &response);
                }
                Ok(HandlerResult::HandledWillRespond)
            }
            CMD_GET_GROUP_MEMBERSHIP => {
                let (request, _) = GetGroupMembership::unpack(inbound.payload).map_err(malformed)?;
                let member = self.groups.groups(inbound.endpoint);
                let groups: GroupList = if request.groups.is_empty() {
                    member
                } else {
                    member
                        .into_iter()
                        .filter(|g| request.groups.contains(g))
                        .collect()
                };
                if inbound.is_unicast() || !groups.is_empty() {
                    let response = GetGroupMembershipResponse {
                        capacity: self.groups.free().min(0xfe) as u8,
                        groups,
                    };
                    self.respond(inbound, CMD_GET_GROUP_MEMBERSHIP, &response);
                }
                Ok(HandlerResult::HandledWillRespond)
            }
            CMD_REMOVE_GROUP => {
                let group = read_group(inbound.payload)?;
                log::info!("> Remove group {:04x} endpoint {}", group, inbound.endpoint);
                let status = match check_group(group) {
                    Ok(()) => {
                        if self.remove_group(inbound.endpoint, group) {
                            ClusterLibraryStatus::Success
                        } else {
                            ClusterLibraryStatus::NotFound
                        }
                    }
                    Err(status) => status,
                };
                self.respond_group_status(inbound, CMD_REMOVE_GROUP, status, group);
                Ok(HandlerResult::HandledWillRespond)
            }
            CMD_REMOVE_ALL_GROUPS => {
                log::info!("> Remove all groups endpoint {}", inbound.endpoint);
                for group in self.groups.remove_all(inbound.endpoint) {
                    self.remove_group_scenes(inbound.endpoint, group);
                    self.notify(
                        inbound.endpoint,
                        CallbackStatus::Ok,
                        DeviceEvent::GroupRemoved { group },
                    );
                }
                Ok(HandlerResult::Handled)
            }
            CMD_ADD_GROUP_IF_IDENTIFYING => {
                let (request, _) = AddGroup::unpack(inbound.payload).map_err(malformed)?;
                if !self.is_identifying(inbound.endpoint) {
                    return Ok(HandlerResult::Handled);
                }
                match self.add_group(inbound.endpoint, request.group) {
                    ClusterLibraryStatus::Success => Ok(HandlerResult::Handled),
                    status => Err(status),
                }
            }
            _ => Ok(HandlerResult::NotHandled),
        }
    }

    fn respond_group_status(
        &mut self,
        inbound: &Inbound,
        command: u8,
        status: ClusterLibraryStatus,
        group: GroupIdentifier,
    ) {
        if inbound.is_unicast() {
            let response = GroupStatusResponse {
                status: self.status(status),
                group,
            };
            self.respond(inbound, command, &response);
        }
    }

    fn add_group(&mut self, endpoint: u8, group: GroupIdentifier) -> ClusterLibraryStatus {
        if let Err(status) = check_group(group) {
            return status;
        }
        match self.groups.add(endpoint, group) {
            Ok(()) => {
                self.notify(endpoint, CallbackStatus::Ok, DeviceEvent::GroupAdded { group });
                ClusterLibraryStatus::Success
            }
            Err(status) => status,
        }
    }

    /// Remove an endpoint from a group and drop the scenes of the group
    pub(crate) fn remove_group(&mut self, endpoint: u8, group: GroupIdentifier) -> bool {
        if !self.groups.remove(endpoint, group) {
            return false;
        }
        self.remove_group_scenes(endpoint, group);
        self.notify(endpoint, CallbackStatus::Ok, DeviceEvent::GroupRemoved { group });
        true
    }

    /// True while the identify time of the endpoint is running
    fn is_identifying(&self, endpoint: u8) -> bool {
        matches!(
            self.store.read(
                endpoint,
                cluster::IDENTIFY,
                Role::Server,
                ATTR_IDENTIFY_TIME,
                None,
                WriteOrigin::Local
            ),
            Ok(AttributeValue::Unsigned16(time)) if *time > 0
        )
    }

    /// Add an endpoint to a group as the application
    pub fn join_group(&mut self, endpoint: u8, group: GroupIdentifier) -> Result<(), ClusterLibraryStatus> {
        match self.add_group(endpoint, group) {
            ClusterLibraryStatus::Success => Ok(()),
            status => Err(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memberships() {
        let mut table = GroupTable::default();
        table.add(1, 0x0001).unwrap();
        table.add(1, 0x0002).unwrap();
        table.add(2, 0x0001).unwrap();
        assert_eq!(table.add(1, 0x0001), Err(ClusterLibraryStatus::DuplicateExists));
        assert!(table.contains(2, 0x0001));
        assert_eq!(table.groups(1)[..], [0x0001, 0x0002]);
        assert_eq!(table.free(), MAX_GROUPS - 3);
        assert!(table.remove(1, 0x0001));
        assert!(!table.remove(1, 0x0001));
        assert_eq!(table.remove_all(1)[..], [0x0002]);
        assert_eq!(table.entries().len(), 1);
    }

    #[test]
    fn table_full() {
        let mut table = GroupTable::default();
        for group in 1..=MAX_GROUPS as u16 {
            table.add(1, group).unwrap();
        }
        assert_eq!(table.add(2, 1), Err(ClusterLibraryStatus::InsufficientSpace));
        assert_eq!(table.free(), 0);
    }

    #[test]
    fn group_range() {
        assert_eq!(check_group(0x0000), Err(ClusterLibraryStatus::InvalidValue));
        assert_eq!(check_group(0xfff8), Err(ClusterLibraryStatus::InvalidValue));
        assert!(check_group(0x0001).is_ok());
        assert!(check_group(0xfff7).is_ok());
    }
}
