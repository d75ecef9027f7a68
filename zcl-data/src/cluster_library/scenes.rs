//! # Scenes Cluster
//!
//! Scene payloads. Extension field sets are kept as opaque bytes, the owner
//! of a cluster decides how its field set is laid out.

use heapless::Vec;

use crate::cluster_library::{ClusterIdentifier, ClusterLibraryStatus};
use crate::common::address::GroupIdentifier;
use crate::common::types::CharacterString;
use crate::pack::{Pack, Reader, Writer};
use crate::Error;

/// Scenes attribute, number of scenes in the table
pub const ATTR_SCENE_COUNT: u16 = 0x0000;
/// Scenes attribute, last stored or recalled scene
pub const ATTR_CURRENT_SCENE: u16 = 0x0001;
/// Scenes attribute, group of the last stored or recalled scene
pub const ATTR_CURRENT_GROUP: u16 = 0x0002;
/// Scenes attribute, the current state matches the current scene
pub const ATTR_SCENE_VALID: u16 = 0x0003;
/// Scenes attribute, scene name support
pub const ATTR_NAME_SUPPORT: u16 = 0x0004;
/// Scenes attribute, IEEE address of the last configuring device
pub const ATTR_LAST_CONFIGURED_BY: u16 = 0x0005;

/// Cluster revision implemented
pub const CLUSTER_REVISION: u16 = 0x0003;

/// Maximum number of extension field sets in a scene
pub const MAX_FIELDSETS: usize = 6;
/// Maximum length of the data of one extension field set
pub const MAX_FIELDSET_LENGTH: usize = 16;
/// Maximum number of scenes listed in a membership response
pub const MAX_SCENE_LIST: usize = 16;

/// Recall transition time meaning "use the stored transition time"
pub const TRANSITION_TIME_UNSPECIFIED: u16 = 0xffff;

/// Copy scene mode bit, copy all scenes of the group
pub const COPY_ALL_SCENES: u8 = 0x01;

extended_enum!(
    /// Scenes command identifiers, responses share the numbering
    ScenesCommand, u8,
    AddScene => 0x00,
    ViewScene => 0x01,
    RemoveScene => 0x02,
    RemoveAllScenes => 0x03,
    StoreScene => 0x04,
    RecallScene => 0x05,
    GetSceneMembership => 0x06,
    EnhancedAddScene => 0x40,
    EnhancedViewScene => 0x41,
    CopyScene => 0x42,
);

impl ScenesCommand {
    /// True for the enhanced variants which count transition time in tenths
    /// of a second
    pub fn is_enhanced(self) -> bool {
        matches!(
            self,
            ScenesCommand::EnhancedAddScene | ScenesCommand::EnhancedViewScene
        )
    }
}

/// Extension field set, the scene data of one cluster
#[derive(Clone, Debug, PartialEq)]
pub struct ExtensionFieldSet {
    /// Cluster the data belongs to
    pub cluster: ClusterIdentifier,
    /// Attribute values in the order defined by the cluster
    pub data: Vec<u8, MAX_FIELDSET_LENGTH>,
}

/// Extension field sets of a scene
pub type ExtensionFieldSets = Vec<ExtensionFieldSet, MAX_FIELDSETS>;

fn unpack_fieldsets(reader: &mut Reader) -> Result<ExtensionFieldSets, Error> {
    let mut fieldsets = ExtensionFieldSets::new();
    while !reader.is_empty() {
        let cluster = reader.read_u16()?;
        let length = reader.read_u8()? as usize;
        let bytes = reader.read_bytes(length)?;
        let data = Vec::from_slice(bytes).map_err(|_| Error::NotEnoughSpace)?;
        fieldsets
            .push(ExtensionFieldSet { cluster, data })
            .map_err(|_| Error::NotEnoughSpace)?;
    }
    Ok(fieldsets)
}

fn pack_fieldsets(writer: &mut Writer, fieldsets: &ExtensionFieldSets) -> Result<(), Error> {
    for fieldset in fieldsets.iter() {
        writer.write_u16(fieldset.cluster)?;
        writer.write_u8(fieldset.data.len() as u8)?;
        writer.write_bytes(&fieldset.data)?;
    }
    Ok(())
}

fn unpack_name(reader: &mut Reader) -> Result<CharacterString, Error> {
    let (name, used) = CharacterString::unpack(reader.rest())?;
    reader.read_bytes(used)?;
    Ok(name)
}

/// Add scene and enhanced add scene request
#[derive(Clone, Debug, PartialEq)]
pub struct AddScene {
    /// Group identifier, zero for the global scene
    pub group: GroupIdentifier,
    /// Scene identifier
    pub scene: u8,
    /// Transition time, seconds or tenths of a second for enhanced add
    pub transition_time: u16,
    /// Scene name
    pub name: CharacterString,
    /// Extension field sets
    pub fieldsets: ExtensionFieldSets,
}

impl Pack<AddScene, Error> for AddScene {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u16(self.group)?;
        writer.write_u8(self.scene)?;
        writer.write_u16(self.transition_time)?;
        writer.write_string(self.name.as_bytes())?;
        pack_fieldsets(&mut writer, &self.fieldsets)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let group = reader.read_u16()?;
        let scene = reader.read_u8()?;
        let transition_time = reader.read_u16()?;
        let name = unpack_name(&mut reader)?;
        let fieldsets = unpack_fieldsets(&mut reader)?;
        Ok((
            Self {
                group,
                scene,
                transition_time,
                name,
                fieldsets,
            },
            reader.position(),
        ))
    }
}

/// Request addressing one scene, view, remove and store
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneRequest {
    /// Group identifier
    pub group: GroupIdentifier,
    /// Scene identifier
    pub scene: u8,
}

impl Pack<SceneRequest, Error> for SceneRequest {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u16(self.group)?;
        writer.write_u8(self.scene)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let group = reader.read_u16()?;
        let scene = reader.read_u8()?;
        Ok((Self { group, scene }, reader.position()))
    }
}

/// Recall scene request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecallScene {
    /// Group identifier
    pub group: GroupIdentifier,
    /// Scene identifier
    pub scene: u8,
    /// Transition time in seconds, overrides the stored time
    pub transition_time: Option<u16>,
}

impl Pack<RecallScene, Error> for RecallScene {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u16(self.group)?;
        writer.write_u8(self.scene)?;
        if let Some(transition_time) = self.transition_time {
            writer.write_u16(transition_time)?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let group = reader.read_u16()?;
        let scene = reader.read_u8()?;
        let transition_time = match reader.read_optional_u16()? {
            Some(TRANSITION_TIME_UNSPECIFIED) | None => None,
            time => time,
        };
        Ok((
            Self {
                group,
                scene,
                transition_time,
            },
            reader.position(),
        ))
    }
}

/// Request addressing a group, remove all scenes and get scene membership
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupRequest {
    /// Group identifier
    pub group: GroupIdentifier,
}

impl Pack<GroupRequest, Error> for GroupRequest {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u16(self.group)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let group = reader.read_u16()?;
        Ok((Self { group }, reader.position()))
    }
}

/// Copy scene request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CopyScene {
    /// Copy every scene of the source group
    pub copy_all: bool,
    /// Source group
    pub group_from: GroupIdentifier,
    /// Source scene, ignored when copying all
    pub scene_from: u8,
    /// Destination group
    pub group_to: GroupIdentifier,
    /// Destination scene, ignored when copying all
    pub scene_to: u8,
}

impl Pack<CopyScene, Error> for CopyScene {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(if self.copy_all { COPY_ALL_SCENES } else { 0 })?;
        writer.write_u16(self.group_from)?;
        writer.write_u8(self.scene_from)?;
        writer.write_u16(self.group_to)?;
        writer.write_u8(self.scene_to)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let mode = reader.read_u8()?;
        let group_from = reader.read_u16()?;
        let scene_from = reader.read_u8()?;
        let group_to = reader.read_u16()?;
        let scene_to = reader.read_u8()?;
        Ok((
            Self {
                copy_all: mode & COPY_ALL_SCENES == COPY_ALL_SCENES,
                group_from,
                scene_from,
                group_to,
                scene_to,
            },
            reader.position(),
        ))
    }
}

/// Response with status, group and scene. Used for add, remove, store and
/// copy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneStatusResponse {
    /// Status
    pub status: ClusterLibraryStatus,
    /// Group identifier
    pub group: GroupIdentifier,
    /// Scene identifier
    pub scene: u8,
}

impl Pack<SceneStatusResponse, Error> for SceneStatusResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(u8::from(self.status))?;
        writer.write_u16(self.group)?;
        writer.write_u8(self.scene)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let status = ClusterLibraryStatus::from_u8_lossy(reader.read_u8()?);
        let group = reader.read_u16()?;
        let scene = reader.read_u8()?;
        Ok((
            Self {
                status,
                group,
                scene,
            },
            reader.position(),
        ))
    }
}

/// Scene content of a view scene response
#[derive(Clone, Debug, PartialEq)]
pub struct SceneDetail {
    /// Transition time, seconds or tenths of a second for enhanced view
    pub transition_time: u16,
    /// Scene name
    pub name: CharacterString,
    /// Extension field sets
    pub fieldsets: ExtensionFieldSets,
}

/// View scene and enhanced view scene response
#[derive(Clone, Debug, PartialEq)]
pub struct ViewSceneResponse {
    /// Status
    pub status: ClusterLibraryStatus,
    /// Group identifier
    pub group: GroupIdentifier,
    /// Scene identifier
    pub scene: u8,
    /// Scene content, only present on success
    pub detail: Option<SceneDetail>,
}

impl Pack<ViewSceneResponse, Error> for ViewSceneResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(u8::from(self.status))?;
        writer.write_u16(self.group)?;
        writer.write_u8(self.scene)?;
        if let (ClusterLibraryStatus::Success, Some(detail)) = (self.status, &self.detail) {
            writer.write_u16(detail.transition_time)?;
            writer.write_string(detail.name.as_bytes())?;
            pack_fieldsets(&mut writer, &detail.fieldsets)?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let status = ClusterLibraryStatus::from_u8_lossy(reader.read_u8()?);
        let group = reader.read_u16()?;
        let scene = reader.read_u8()?;
        let detail = if status == ClusterLibraryStatus::Success {
            let transition_time = reader.read_u16()?;
            let name = unpack_name(&mut reader)?;
            let fieldsets = unpack_fieldsets(&mut reader)?;
            Some(SceneDetail {
                transition_time,
                name,
                fieldsets,
            })
        } else {
            None
        };
        Ok((
            Self {
                status,
                group,
                scene,
                detail,
            },
            reader.position(),
        ))
    }
}

/// Get scene membership response
#[derive(Clone, Debug, PartialEq)]
pub struct GetSceneMembershipResponse {
    /// Status
    pub status: ClusterLibraryStatus,
    /// Free entries of the scene table, 0xfe at least one, 0xff unknown
    pub capacity: u8,
    /// Group identifier
    pub group: GroupIdentifier,
    /// Scenes of the group, only present on success
    pub scenes: Option<Vec<u8, MAX_SCENE_LIST>>,
}

impl Pack<GetSceneMembershipResponse, Error> for GetSceneMembershipResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(u8::from(self.status))?;
        writer.write_u8(self.capacity)?;
        writer.write_u16(self.group)?;
        if let (ClusterLibraryStatus::Success, Some(scenes)) = (self.status, &self.scenes) {
            writer.write_u8(scenes.len() as u8)?;
            writer.write_bytes(scenes)?;
        }
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let status = ClusterLibraryStatus::from_u8_lossy(reader.read_u8()?);
        let capacity = reader.read_u8()?;
        let group = reader.read_u16()?;
        let scenes = if status == ClusterLibraryStatus::Success {
            let count = reader.read_u8()? as usize;
            let list = reader.read_bytes(count)?;
            Some(Vec::from_slice(list).map_err(|_| Error::NotEnoughSpace)?)
        } else {
            None
        };
        Ok((
            Self {
                status,
                capacity,
                group,
                scenes,
            },
            reader.position(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_enhanced_add_scene() {
        let data = [
            0x01, 0x00, // group
            0x07, // scene
            0x19, 0x00, // 2.5 seconds
            0x00, // no name
            0x06, 0x00, 0x01, 0x01, // on/off field set
            0x08, 0x00, 0x01, 0x80, // level control field set
        ];
        let (cmd, used) = AddScene::unpack(&data).unwrap();
        assert_eq!(used, data.len());
        assert_eq!(cmd.group, 1);
        assert_eq!(cmd.scene, 7);
        assert_eq!(cmd.transition_time, 0x0019);
        assert_eq!(cmd.fieldsets.len(), 2);
        assert_eq!(cmd.fieldsets[1].cluster, 0x0008);
        assert_eq!(cmd.fieldsets[1].data[..], [0x80]);
    }

    #[test]
    fn fieldset_length_exceeding_payload() {
        let data = [0x01, 0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x00, 0x04, 0x01];
        assert_eq!(AddScene::unpack(&data), Err(Error::WrongNumberOfBytes));
    }

    #[test]
    fn recall_transition_time() {
        let (cmd, _) = RecallScene::unpack(&[0x01, 0x00, 0x07]).unwrap();
        assert_eq!(cmd.transition_time, None);
        let (cmd, _) = RecallScene::unpack(&[0x01, 0x00, 0x07, 0xff, 0xff]).unwrap();
        assert_eq!(cmd.transition_time, None);
        let (cmd, _) = RecallScene::unpack(&[0x01, 0x00, 0x07, 0x64, 0x00]).unwrap();
        assert_eq!(cmd.transition_time, Some(100));
    }

    #[test]
    fn view_response_omits_detail_on_failure() {
        let response = ViewSceneResponse {
            status: ClusterLibraryStatus::NotFound,
            group: 0x0001,
            scene: 0x03,
            detail: Some(SceneDetail {
                transition_time: 1,
                name: CharacterString::new(),
                fieldsets: ExtensionFieldSets::new(),
            }),
        };
        let mut buffer = [0u8; 16];
        assert_eq!(response.pack(&mut buffer), Ok(4));
        assert_eq!(buffer[..4], [0x8b, 0x01, 0x00, 0x03]);
    }

    #[test]
    fn unpack_copy_scene() {
        let (cmd, used) =
            CopyScene::unpack(&[0x01, 0x01, 0x00, 0x02, 0x02, 0x00, 0x00]).unwrap();
        assert_eq!(used, 7);
        assert!(cmd.copy_all);
        assert_eq!(cmd.group_from, 1);
        assert_eq!(cmd.group_to, 2);
    }

    #[test]
    fn membership_response() {
        let mut scenes = Vec::new();
        scenes.push(1).unwrap();
        scenes.push(7).unwrap();
        let response = GetSceneMembershipResponse {
            status: ClusterLibraryStatus::Success,
            capacity: 14,
            group: 1,
            scenes: Some(scenes),
        };
        let mut buffer = [0u8; 16];
        assert_eq!(response.pack(&mut buffer), Ok(7));
        assert_eq!(buffer[..7], [0x00, 0x0e, 0x01, 0x00, 0x02, 0x01, 0x07]);
    }
}
