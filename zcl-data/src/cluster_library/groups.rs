//! # Groups Cluster

use heapless::Vec;

use crate::cluster_library::ClusterLibraryStatus;
use crate::common::address::GroupIdentifier;
use crate::common::types::CharacterString;
use crate::pack::{Pack, Reader, Writer};
use crate::Error;

/// Groups attribute, name support
pub const ATTR_NAME_SUPPORT: u16 = 0x0000;

/// Groups command, add group
pub const CMD_ADD_GROUP: u8 = 0x00;
/// Groups command, view group
pub const CMD_VIEW_GROUP: u8 = 0x01;
/// Groups command, get group membership
pub const CMD_GET_GROUP_MEMBERSHIP: u8 = 0x02;
/// Groups command, remove group
pub const CMD_REMOVE_GROUP: u8 = 0x03;
/// Groups command, remove all groups
pub const CMD_REMOVE_ALL_GROUPS: u8 = 0x04;
/// Groups command, add group if identifying
pub const CMD_ADD_GROUP_IF_IDENTIFYING: u8 = 0x05;

/// Maximum number of groups in a membership command
pub const MAX_GROUP_LIST: usize = 16;

/// List of group identifiers
pub type GroupList = Vec<GroupIdentifier, MAX_GROUP_LIST>;

/// Add group request
#[derive(Clone, Debug, PartialEq)]
pub struct AddGroup {
    /// Group identifier
    pub group: GroupIdentifier,
    /// Group name, not stored
    pub name: CharacterString,
}

impl Pack<AddGroup, Error> for AddGroup {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u16(self.group)?;
        writer.write_string(self.name.as_bytes())?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let group = reader.read_u16()?;
        let (name, used) = if reader.is_empty() {
            (CharacterString::new(), 0)
        } else {
            CharacterString::unpack(reader.rest())?
        };
        Ok((Self { group, name }, reader.position() + used))
    }
}

/// Response to add and remove group, status and group identifier
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupStatusResponse {
    /// Status
    pub status: ClusterLibraryStatus,
    /// Group identifier
    pub group: GroupIdentifier,
}

impl Pack<GroupStatusResponse, Error> for GroupStatusResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(u8::from(self.status))?;
        writer.write_u16(self.group)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let status = ClusterLibraryStatus::from_u8_lossy(reader.read_u8()?);
        let group = reader.read_u16()?;
        Ok((Self { status, group }, reader.position()))
    }
}

/// View group response
#[derive(Clone, Debug, PartialEq)]
pub struct ViewGroupResponse {
    /// Status
    pub status: ClusterLibraryStatus,
    /// Group identifier
    pub group: GroupIdentifier,
    /// Group name, always empty as names are not supported
    pub name: CharacterString,
}

impl Pack<ViewGroupResponse, Error> for ViewGroupResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(u8::from(self.status))?;
        writer.write_u16(self.group)?;
        writer.write_string(self.name.as_bytes())?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let status = ClusterLibraryStatus::from_u8_lossy(reader.read_u8()?);
        let group = reader.read_u16()?;
        let (name, used) = CharacterString::unpack(reader.rest())?;
        Ok((
            Self {
                status,
                group,
                name,
            },
            reader.position() + used,
        ))
    }
}

/// Get group membership request, an empty list asks for every group
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetGroupMembership {
    /// Groups to check
    pub groups: GroupList,
}

fn unpack_group_list(reader: &mut Reader) -> Result<GroupList, Error> {
    let count = reader.read_u8()?;
    let mut groups = GroupList::new();
    for _ in 0..count {
        groups
            .push(reader.read_u16()?)
            .map_err(|_| Error::NotEnoughSpace)?;
    }
    Ok(groups)
}

fn pack_group_list(writer: &mut Writer, groups: &GroupList) -> Result<(), Error> {
    writer.write_u8(groups.len() as u8)?;
    for group in groups.iter() {
        writer.write_u16(*group)?;
    }
    Ok(())
}

impl Pack<GetGroupMembership, Error> for GetGroupMembership {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        pack_group_list(&mut writer, &self.groups)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let groups = unpack_group_list(&mut reader)?;
        Ok((Self { groups }, reader.position()))
    }
}

/// Get group membership response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetGroupMembershipResponse {
    /// Remaining capacity of the group table, 0xfe at least one more, 0xff
    /// unknown
    pub capacity: u8,
    /// Groups the endpoint is member of
    pub groups: GroupList,
}

impl Pack<GetGroupMembershipResponse, Error> for GetGroupMembershipResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(self.capacity)?;
        pack_group_list(&mut writer, &self.groups)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let capacity = reader.read_u8()?;
        let groups = unpack_group_list(&mut reader)?;
        Ok((Self { capacity, groups }, reader.position()))
    }
}
