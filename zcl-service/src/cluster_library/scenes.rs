//! Scenes server
//!
//! A scene holds the packed values of the scene attributes of every server
//! cluster on the endpoint, one extension field set per cluster. Analog
//! values are recalled through the value transition engine, other values
//! are written at once. Scene names are not stored.

use heapless::Vec;

use zcl_data::cluster_library::groups::GroupStatusResponse;
use zcl_data::cluster_library::scenes::{
    AddScene, CopyScene, ExtensionFieldSet, ExtensionFieldSets, GetSceneMembershipResponse,
    GroupRequest, RecallScene, SceneDetail, SceneRequest, SceneStatusResponse, ScenesCommand,
    ViewSceneResponse, ATTR_CURRENT_GROUP, ATTR_CURRENT_SCENE, ATTR_LAST_CONFIGURED_BY,
    ATTR_NAME_SUPPORT, ATTR_SCENE_COUNT, ATTR_SCENE_VALID, MAX_FIELDSET_LENGTH, MAX_SCENE_LIST,
    TRANSITION_TIME_UNSPECIFIED,
};
use zcl_data::cluster_library::{
    cluster, AttributeIdentifier, AttributeValue, ClusterIdentifier, ClusterLibraryStatus,
};
use zcl_data::pack::Pack;
use zcl_data::{CharacterString, GroupIdentifier};

use core::convert::TryFrom;

use super::{malformed, CommandResult, HandlerResult, Inbound};
use crate::attribute_store::{AttributeRecord, Role, WriteOrigin};
use crate::callback::{CallbackStatus, DeviceEvent, DeviceHandler};
use crate::cvc::{TransitionOwner, TransitionRequest, TransitionStatus};
use crate::ClusterLibraryService;

/// Maximum number of scenes over all endpoints
pub const MAX_SCENES: usize = 16;
/// Maximum number of recalls waiting for their transitions
pub const MAX_PENDING_RECALLS: usize = 4;

/// List of scene identifiers
pub type SceneList = Vec<u8, MAX_SCENE_LIST>;

/// Stored scene
#[derive(Clone, Debug, PartialEq)]
pub struct SceneRecord {
    /// Endpoint
    pub endpoint: u8,
    /// Group, zero for the global scene
    pub group: GroupIdentifier,
    /// Scene identifier
    pub scene: u8,
    /// Transition time, whole seconds
    pub transition_time: u16,
    /// Transition time, additional tenths of a second
    pub transition_tenths: u8,
    /// Extension field sets
    pub fieldsets: ExtensionFieldSets,
}

impl SceneRecord {
    /// Transition time in tenths of a second, saturated
    pub fn transition_time_tenths(&self) -> u16 {
        let tenths = u32::from(self.transition_time) * 10 + u32::from(self.transition_tenths);
        tenths.min(u32::from(TRANSITION_TIME_UNSPECIFIED - 1)) as u16
    }

    fn set_transition_time(&mut self, time: u16, enhanced: bool) {
        if enhanced {
            self.transition_time = time / 10;
            self.transition_tenths = (time % 10) as u8;
        } else {
            self.transition_time = time;
            self.transition_tenths = 0;
        }
    }

    fn is(&self, endpoint: u8, group: GroupIdentifier, scene: u8) -> bool {
        self.endpoint == endpoint && self.group == group && self.scene == scene
    }
}

/// Recall waiting for its transitions to end
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRecall {
    /// Endpoint
    pub endpoint: u8,
    /// Group
    pub group: GroupIdentifier,
    /// Scene
    pub scene: u8,
}

/// Scene table
#[derive(Clone, Debug, Default)]
pub struct SceneTable {
    entries: Vec<SceneRecord, MAX_SCENES>,
}

impl SceneTable {
    /// Find a scene
    pub fn find(&self, endpoint: u8, group: GroupIdentifier, scene: u8) -> Option<&SceneRecord> {
        self.entries.iter().find(|s| s.is(endpoint, group, scene))
    }

    /// Add or replace a scene, returns true when an existing scene was
    /// replaced
    pub fn insert(&mut self, record: SceneRecord) -> Result<bool, ClusterLibraryStatus> {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|s| s.is(record.endpoint, record.group, record.scene))
        {
            *existing = record;
            return Ok(true);
        }
        self.entries
            .push(record)
            .map(|_| false)
            .map_err(|_| ClusterLibraryStatus::InsufficientSpace)
    }

    /// Remove a scene
    pub fn remove(&mut self, endpoint: u8, group: GroupIdentifier, scene: u8) -> bool {
        match self.entries.iter().position(|s| s.is(endpoint, group, scene)) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove the scenes of a group, returns the removed scene identifiers
    pub fn remove_group(&mut self, endpoint: u8, group: GroupIdentifier) -> SceneList {
        let removed = self.scenes(endpoint, group);
        self.entries
            .retain(|s| !(s.endpoint == endpoint && s.group == group));
        removed
    }

    /// Remove every scene of an endpoint, returns the removed group and
    /// scene pairs
    pub fn remove_endpoint(&mut self, endpoint: u8) -> Vec<(GroupIdentifier, u8), MAX_SCENES> {
        let removed = self
            .entries
            .iter()
            .filter(|s| s.endpoint == endpoint)
            .map(|s| (s.group, s.scene))
            .collect();
        self.entries.retain(|s| s.endpoint != endpoint);
        removed
    }

    /// Scene identifiers of a group
    pub fn scenes(&self, endpoint: u8, group: GroupIdentifier) -> SceneList {
        self.entries
            .iter()
            .filter(|s| s.endpoint == endpoint && s.group == group)
            .map(|s| s.scene)
            .collect()
    }

    /// Number of scenes on an endpoint
    pub fn count(&self, endpoint: u8) -> usize {
        self.entries.iter().filter(|s| s.endpoint == endpoint).count()
    }

    /// Number of free slots
    pub fn free(&self) -> usize {
        MAX_SCENES - self.entries.len()
    }

    /// True if a scene of the endpoint has a field set for the cluster
    pub fn has_fieldset(&self, endpoint: u8, cluster: ClusterIdentifier) -> bool {
        self.entries
            .iter()
            .filter(|s| s.endpoint == endpoint)
            .any(|s| s.fieldsets.iter().any(|f| f.cluster == cluster))
    }

    /// All scenes
    pub fn entries(&self) -> &[SceneRecord] {
        &self.entries
    }

    /// Remove every scene
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Attributes of a scenes server
pub fn server_attributes() -> [AttributeRecord; 6] {
    [
        AttributeRecord::read_only(ATTR_SCENE_COUNT, AttributeValue::Unsigned8(0)),
        AttributeRecord::read_only(ATTR_CURRENT_SCENE, AttributeValue::Unsigned8(0)),
        AttributeRecord::read_only(ATTR_CURRENT_GROUP, AttributeValue::Unsigned16(0)),
        AttributeRecord::read_only(ATTR_SCENE_VALID, AttributeValue::Boolean(false)),
        AttributeRecord::read_only(ATTR_NAME_SUPPORT, AttributeValue::Bitmap8(0)),
        AttributeRecord::read_only(ATTR_LAST_CONFIGURED_BY, AttributeValue::IeeeAddress(u64::MAX)),
    ]
}

/// Value in a recall, with the transition parameters of analog values
struct RecalledValue {
    cluster: ClusterIdentifier,
    attribute: AttributeIdentifier,
    value: AttributeValue,
    range: Option<(i64, i64)>,
}

const MAX_RECALLED_VALUES: usize = 16;

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    pub(crate) fn handle_scenes(&mut self, inbound: &Inbound) -> CommandResult {
        let command = match ScenesCommand::try_from(inbound.header.command) {
            Ok(command) => command,
            Err(_) => return Ok(HandlerResult::NotHandled),
        };
        log::info!("> {:?} endpoint {}", command, inbound.endpoint);
        match command {
            ScenesCommand::AddScene | ScenesCommand::EnhancedAddScene => {
                let (request, _) = AddScene::unpack(inbound.payload).map_err(malformed)?;
                let status = self.add_scene(inbound.endpoint, &request, command.is_enhanced());
                self.respond_scene_status(inbound, status, request.group, request.scene);
                Ok(HandlerResult::HandledWillRespond)
            }
            ScenesCommand::ViewScene | ScenesCommand::EnhancedViewScene => {
                let (request, _) = SceneRequest::unpack(inbound.payload).map_err(malformed)?;
                let found = self
                    .check_scene_group(inbound.endpoint, request.group)
                    .and_then(|()| {
                        self.scenes
                            .find(inbound.endpoint, request.group, request.scene)
                            .ok_or(ClusterLibraryStatus::NotFound)
                    });
                let (status, detail) = match found {
                    Ok(record) => {
                        let transition_time = if command.is_enhanced() {
                            record.transition_time_tenths()
                        } else {
                            record.transition_time
                        };
                        let detail = SceneDetail {
                            transition_time,
                            name: CharacterString::new(),
                            fieldsets: record.fieldsets.clone(),
                        };
                        (ClusterLibraryStatus::Success, Some(detail))
                    }
                    Err(status) => (status, None),
                };
                if inbound.is_unicast() {
                    let response = ViewSceneResponse {
                        status: self.status(status),
                        group: request.group,
                        scene: request.scene,
                        detail,
                    };
                    self.respond(inbound, command.into(), &response);
                }
                Ok(HandlerResult::HandledWillRespond)
            }
            ScenesCommand::RemoveScene => {
                let (request, _) = SceneRequest::unpack(inbound.payload).map_err(malformed)?;
                let status = match self.check_scene_group(inbound.endpoint, request.group) {
                    Ok(()) => {
                        if self.scenes.remove(inbound.endpoint, request.group, request.scene) {
                            self.scene_removed(inbound.endpoint, request.group, request.scene);
                            ClusterLibraryStatus::Success
                        } else {
                            ClusterLibraryStatus::NotFound
                        }
                    }
                    Err(status) => status,
                };
                self.respond_scene_status(inbound, status, request.group, request.scene);
                Ok(HandlerResult::HandledWillRespond)
            }
            ScenesCommand::RemoveAllScenes => {
                let (request, _) = GroupRequest::unpack(inbound.payload).map_err(malformed)?;
                let status = match self.check_scene_group(inbound.endpoint, request.group) {
                    Ok(()) if request.group == 0 => {
                        self.remove_endpoint_scenes(inbound.endpoint);
                        ClusterLibraryStatus::Success
                    }
                    Ok(()) => {
                        self.remove_group_scenes(inbound.endpoint, request.group);
                        ClusterLibraryStatus::Success
                    }
                    Err(status) => status,
                };
                if inbound.is_unicast() {
                    let response = GroupStatusResponse {
                        status: self.status(status),
                        group: request.group,
                    };
                    self.respond(inbound, command.into(), &response);
                }
                Ok(HandlerResult::HandledWillRespond)
            }
            ScenesCommand::StoreScene => {
                let (request, _) = SceneRequest::unpack(inbound.payload).map_err(malformed)?;
                let status = match self.store_scene(inbound.endpoint, request.group, request.scene) {
                    Ok(()) => ClusterLibraryStatus::Success,
                    Err(status) => status,
                };
                self.respond_scene_status(inbound, status, request.group, request.scene);
                Ok(HandlerResult::HandledWillRespond)
            }
            ScenesCommand::RecallScene => {
                let (request, _) = RecallScene::unpack(inbound.payload).map_err(malformed)?;
                let transition_time = request
                    .transition_time
                    .filter(|t| *t != TRANSITION_TIME_UNSPECIFIED)
                    .map(|t| t.saturating_mul(10).min(TRANSITION_TIME_UNSPECIFIED - 1));
                self.recall_scene(inbound.endpoint, request.group, request.scene, transition_time)?;
                Ok(HandlerResult::Handled)
            }
            ScenesCommand::GetSceneMembership => {
                let (request, _) = GroupRequest::unpack(inbound.payload).map_err(malformed)?;
                let capacity = self.scenes.free().min(0xfe) as u8;
                let response = match self.check_scene_group(inbound.endpoint, request.group) {
                    Ok(()) => GetSceneMembershipResponse {
                        status: ClusterLibraryStatus::Success,
                        capacity,
                        group: request.group,
                        scenes: Some(self.scenes.scenes(inbound.endpoint, request.group)),
                    },
                    Err(status) => GetSceneMembershipResponse {
                        status: self.status(status),
                        capacity,
                        group: request.group,
                        scenes: None,
                    },
                };
                let listed = response.scenes.as_ref().map_or(false, |s| !s.is_empty());
                if inbound.is_unicast() || listed {
                    self.respond(inbound, command.into(), &response);
                }
                Ok(HandlerResult::HandledWillRespond)
            }
            ScenesCommand::CopyScene => {
                let (request, _) = CopyScene::unpack(inbound.payload).map_err(malformed)?;
                let status = match self.copy_scene(inbound.endpoint, &request) {
                    Ok(()) => ClusterLibraryStatus::Success,
                    Err(status) => status,
                };
                if inbound.is_unicast() {
                    let response = SceneStatusResponse {
                        status: self.status(status),
                        group: request.group_from,
                        scene: request.scene_from,
                    };
                    self.respond(inbound, command.into(), &response);
                }
                Ok(HandlerResult::HandledWillRespond)
            }
        }
    }

    fn respond_scene_status(
        &mut self,
        inbound: &Inbound,
        status: ClusterLibraryStatus,
        group: GroupIdentifier,
        scene: u8,
    ) {
        if inbound.is_unicast() {
            let response = SceneStatusResponse {
                status: self.status(status),
                group,
                scene,
            };
            self.respond(inbound, inbound.header.command, &response);
        }
    }

    /// Scenes of a group other than the global scene need the membership
    fn check_scene_group(&self, endpoint: u8, group: GroupIdentifier) -> Result<(), ClusterLibraryStatus> {
        if group == 0 || self.groups.contains(endpoint, group) {
            Ok(())
        } else {
            Err(ClusterLibraryStatus::InvalidField)
        }
    }

    fn add_scene(&mut self, endpoint: u8, request: &AddScene, enhanced: bool) -> ClusterLibraryStatus {
        if let Err(status) = self.check_scene_group(endpoint, request.group) {
            return status;
        }
        let mut fieldsets = ExtensionFieldSets::new();
        for fieldset in request.fieldsets.iter() {
            if self.store.cluster(endpoint, fieldset.cluster, Role::Server).is_some() {
                let _ = fieldsets.push(fieldset.clone());
            } else {
                log::warn!("> Field set of cluster {:04x} ignored", fieldset.cluster);
            }
        }
        let mut record = SceneRecord {
            endpoint,
            group: request.group,
            scene: request.scene,
            transition_time: 0,
            transition_tenths: 0,
            fieldsets,
        };
        record.set_transition_time(request.transition_time, enhanced);
        match self.insert_scene(record) {
            Ok(()) => ClusterLibraryStatus::Success,
            Err(status) => status,
        }
    }

    fn insert_scene(&mut self, record: SceneRecord) -> Result<(), ClusterLibraryStatus> {
        let (endpoint, group, scene) = (record.endpoint, record.group, record.scene);
        let updated = self.scenes.insert(record)?;
        let event = if updated {
            DeviceEvent::SceneUpdated { group, scene }
        } else {
            DeviceEvent::SceneAdded { group, scene }
        };
        let (status, _) = self.notify(endpoint, CallbackStatus::Ok, event);
        match status.response_status() {
            Some(ClusterLibraryStatus::Success) | None => {}
            Some(status) => {
                if !updated {
                    self.scenes.remove(endpoint, group, scene);
                }
                return Err(status);
            }
        }
        self.update_scene_count(endpoint);
        Ok(())
    }

    fn scene_removed(&mut self, endpoint: u8, group: GroupIdentifier, scene: u8) {
        self.notify(
            endpoint,
            CallbackStatus::Ok,
            DeviceEvent::SceneRemoved { group, scene },
        );
        self.update_scene_count(endpoint);
    }

    /// Remove the scenes of a group
    pub(crate) fn remove_group_scenes(&mut self, endpoint: u8, group: GroupIdentifier) {
        for scene in self.scenes.remove_group(endpoint, group) {
            self.scene_removed(endpoint, group, scene);
        }
    }

    /// Remove every scene of the endpoint, the current scene is cleared
    pub(crate) fn remove_endpoint_scenes(&mut self, endpoint: u8) {
        for (group, scene) in self.scenes.remove_endpoint(endpoint) {
            self.scene_removed(endpoint, group, scene);
        }
        self.update_scene_count(endpoint);
        self.set_attribute(
            endpoint,
            cluster::SCENES,
            Role::Server,
            ATTR_CURRENT_SCENE,
            AttributeValue::Unsigned8(0),
        );
        self.set_attribute(
            endpoint,
            cluster::SCENES,
            Role::Server,
            ATTR_CURRENT_GROUP,
            AttributeValue::Unsigned16(0),
        );
        self.invalidate_scene(endpoint);
    }

    pub(crate) fn update_scene_count(&mut self, endpoint: u8) {
        let count = self.scenes.count(endpoint).min(usize::from(u8::MAX)) as u8;
        self.set_attribute(
            endpoint,
            cluster::SCENES,
            Role::Server,
            ATTR_SCENE_COUNT,
            AttributeValue::Unsigned8(count),
        );
    }

    /// Mark the current scene as no longer valid
    pub(crate) fn invalidate_scene(&mut self, endpoint: u8) {
        let valid = matches!(
            self.store.read(
                endpoint,
                cluster::SCENES,
                Role::Server,
                ATTR_SCENE_VALID,
                None,
                WriteOrigin::Local
            ),
            Ok(AttributeValue::Boolean(true))
        );
        if valid {
            self.set_attribute(
                endpoint,
                cluster::SCENES,
                Role::Server,
                ATTR_SCENE_VALID,
                AttributeValue::Boolean(false),
            );
        }
    }

    fn set_current_scene(&mut self, endpoint: u8, group: GroupIdentifier, scene: u8) {
        self.set_attribute(
            endpoint,
            cluster::SCENES,
            Role::Server,
            ATTR_CURRENT_SCENE,
            AttributeValue::Unsigned8(scene),
        );
        self.set_attribute(
            endpoint,
            cluster::SCENES,
            Role::Server,
            ATTR_CURRENT_GROUP,
            AttributeValue::Unsigned16(group),
        );
        self.set_attribute(
            endpoint,
            cluster::SCENES,
            Role::Server,
            ATTR_SCENE_VALID,
            AttributeValue::Boolean(true),
        );
    }

    /// Field sets with the current values of the scene attributes
    fn snapshot(&self, endpoint: u8) -> ExtensionFieldSets {
        let mut fieldsets = ExtensionFieldSets::new();
        for instance in self
            .store
            .clusters()
            .iter()
            .filter(|c| c.endpoint == endpoint && c.role == Role::Server)
        {
            let mut buffer = [0u8; MAX_FIELDSET_LENGTH];
            let mut used = 0;
            for record in instance.scene_attributes() {
                match record.value.pack(&mut buffer[used..]) {
                    Ok(size) => used += size,
                    Err(err) => {
                        log::warn!(
                            "Scene value {:04x}:{:04x} left out, {:?}",
                            instance.cluster,
                            record.identifier,
                            err
                        );
                        break;
                    }
                }
            }
            if used == 0 {
                continue;
            }
            if let Ok(data) = Vec::from_slice(&buffer[..used]) {
                let _ = fieldsets.push(ExtensionFieldSet {
                    cluster: instance.cluster,
                    data,
                });
            }
        }
        fieldsets
    }

    /// Store the current state as a scene
    pub fn store_scene(
        &mut self,
        endpoint: u8,
        group: GroupIdentifier,
        scene: u8,
    ) -> Result<(), ClusterLibraryStatus> {
        self.check_scene_group(endpoint, group)?;
        let fieldsets = self.snapshot(endpoint);
        let record = match self.scenes.find(endpoint, group, scene) {
            Some(existing) => SceneRecord {
                fieldsets,
                ..existing.clone()
            },
            None => SceneRecord {
                endpoint,
                group,
                scene,
                transition_time: 0,
                transition_tenths: 0,
                fieldsets,
            },
        };
        self.insert_scene(record)?;
        self.set_current_scene(endpoint, group, scene);
        Ok(())
    }

    /// Values of a field set, in the order of the scene attributes
    fn recalled_values(
        &self,
        endpoint: u8,
        fieldset: &ExtensionFieldSet,
        values: &mut Vec<RecalledValue, MAX_RECALLED_VALUES>,
    ) {
        let instance = match self.store.cluster(endpoint, fieldset.cluster, Role::Server) {
            Some(instance) => instance,
            None => return,
        };
        let mut offset = 0;
        for record in instance.scene_attributes() {
            if offset >= fieldset.data.len() {
                break;
            }
            match AttributeValue::unpack(&fieldset.data[offset..], record.value.data_type()) {
                Ok((value, used)) => {
                    offset += used;
                    let range = if record.value.data_type().is_analog() {
                        record.range()
                    } else {
                        None
                    };
                    // stored values may lie outside the limits of the attribute
                    let value = match (range, value.as_integer()) {
                        (Some((minimum, maximum)), Some(v)) if v < minimum || v > maximum => {
                            AttributeValue::from_integer(
                                value.data_type(),
                                v.clamp(minimum, maximum),
                            )
                            .unwrap_or(value)
                        }
                        _ => value,
                    };
                    let _ = values.push(RecalledValue {
                        cluster: fieldset.cluster,
                        attribute: record.identifier,
                        value,
                        range,
                    });
                }
                Err(err) => {
                    log::warn!(
                        "Scene value {:04x}:{:04x} unreadable, {:?}",
                        fieldset.cluster,
                        record.identifier,
                        err
                    );
                    break;
                }
            }
        }
    }

    /// Recall a scene, `transition_time` in tenths of a second overrides
    /// the stored time
    pub fn recall_scene(
        &mut self,
        endpoint: u8,
        group: GroupIdentifier,
        scene: u8,
        transition_time: Option<u16>,
    ) -> Result<(), ClusterLibraryStatus> {
        self.check_scene_group(endpoint, group)?;
        let record = self
            .scenes
            .find(endpoint, group, scene)
            .ok_or(ClusterLibraryStatus::NotFound)?;
        let transition_time = transition_time.unwrap_or_else(|| record.transition_time_tenths());
        let mut values = Vec::new();
        for fieldset in record.fieldsets.iter() {
            self.recalled_values(endpoint, fieldset, &mut values);
        }
        log::info!(
            "Recall scene {:04x}:{:02x} endpoint {}, {} values over {}",
            group,
            scene,
            endpoint,
            values.len(),
            transition_time
        );
        let owner = TransitionOwner::SceneRecall { group, scene };
        self.pending_recalls
            .retain(|r| !(r.endpoint == endpoint && r.group == group && r.scene == scene));
        let now = self.now();
        let mut transitions = false;
        let mut failure = None;
        for recalled in values {
            let started = match (recalled.range, recalled.value.as_integer(), transition_time) {
                (Some((minimum, maximum)), Some(end), time) if time > 0 => {
                    let current = self
                        .store
                        .record(endpoint, recalled.cluster, Role::Server, recalled.attribute, None)
                        .and_then(|r| r.value.as_integer())
                        .unwrap_or(end);
                    let request = TransitionRequest {
                        endpoint,
                        cluster: recalled.cluster,
                        attribute: recalled.attribute,
                        current,
                        end,
                        minimum,
                        maximum,
                        overlap: false,
                        transition_time: time,
                        owner,
                    };
                    self.cvc.start(request, now).is_ok()
                }
                _ => false,
            };
            if started {
                transitions = true;
            } else if let Err(status) = self.write_local(
                endpoint,
                recalled.cluster,
                Role::Server,
                recalled.attribute,
                None,
                recalled.value,
                WriteOrigin::Local,
            ) {
                log::warn!(
                    "Recall of {:04x}:{:04x} failed, {:?}",
                    recalled.cluster,
                    recalled.attribute,
                    status
                );
                failure.get_or_insert(status);
            }
        }
        if let Some(status) = failure {
            return Err(status);
        }
        if transitions
            && self
                .pending_recalls
                .push(PendingRecall {
                    endpoint,
                    group,
                    scene,
                })
                .is_ok()
        {
            return Ok(());
        }
        self.finish_recall(endpoint, group, scene);
        Ok(())
    }

    fn finish_recall(&mut self, endpoint: u8, group: GroupIdentifier, scene: u8) {
        self.set_current_scene(endpoint, group, scene);
        self.notify(
            endpoint,
            CallbackStatus::Ok,
            DeviceEvent::SceneRecalled { group, scene },
        );
    }

    /// A transition ended, the recall completes with its last transition
    pub(crate) fn recall_transition_finished(
        &mut self,
        endpoint: u8,
        owner: TransitionOwner,
        status: TransitionStatus,
    ) {
        let (group, scene) = match owner {
            TransitionOwner::SceneRecall { group, scene } => (group, scene),
            _ => return,
        };
        if self.cvc.is_owner_running(endpoint, owner) {
            return;
        }
        let index = match self
            .pending_recalls
            .iter()
            .position(|r| r.endpoint == endpoint && r.group == group && r.scene == scene)
        {
            Some(index) => index,
            None => return,
        };
        self.pending_recalls.swap_remove(index);
        if status == TransitionStatus::Completed {
            self.finish_recall(endpoint, group, scene);
        } else {
            log::info!("Recall of scene {:04x}:{:02x} interrupted", group, scene);
        }
    }

    fn copy_scene(&mut self, endpoint: u8, request: &CopyScene) -> Result<(), ClusterLibraryStatus> {
        self.check_scene_group(endpoint, request.group_from)?;
        self.check_scene_group(endpoint, request.group_to)?;
        let sources: SceneList = if request.copy_all {
            self.scenes.scenes(endpoint, request.group_from)
        } else {
            let mut single = SceneList::new();
            if self
                .scenes
                .find(endpoint, request.group_from, request.scene_from)
                .is_none()
            {
                return Err(ClusterLibraryStatus::NotFound);
            }
            let _ = single.push(request.scene_from);
            single
        };
        for scene in sources {
            let source = match self.scenes.find(endpoint, request.group_from, scene) {
                Some(source) => source.clone(),
                None => continue,
            };
            let target_scene = if request.copy_all { scene } else { request.scene_to };
            let record = SceneRecord {
                group: request.group_to,
                scene: target_scene,
                ..source
            };
            self.insert_scene(record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(endpoint: u8, group: u16, scene: u8) -> SceneRecord {
        SceneRecord {
            endpoint,
            group,
            scene,
            transition_time: 0,
            transition_tenths: 0,
            fieldsets: ExtensionFieldSets::new(),
        }
    }

    #[test]
    fn table() {
        let mut table = SceneTable::default();
        assert_eq!(table.insert(record(1, 0x0001, 1)), Ok(false));
        assert_eq!(table.insert(record(1, 0x0001, 2)), Ok(false));
        assert_eq!(table.insert(record(2, 0x0001, 1)), Ok(false));
        assert_eq!(table.insert(record(1, 0x0001, 1)), Ok(true));
        assert_eq!(table.count(1), 2);
        assert_eq!(table.scenes(1, 0x0001)[..], [1, 2]);
        assert_eq!(table.remove_group(1, 0x0001)[..], [1, 2]);
        assert_eq!(table.count(1), 0);
        assert!(table.find(2, 0x0001, 1).is_some());
        assert!(table.remove(2, 0x0001, 1));
        assert_eq!(table.free(), MAX_SCENES);
    }

    #[test]
    fn remove_endpoint() {
        let mut table = SceneTable::default();
        table.insert(record(1, 0x0000, 1)).unwrap();
        table.insert(record(1, 0x0005, 2)).unwrap();
        table.insert(record(2, 0x0005, 3)).unwrap();
        assert_eq!(table.remove_endpoint(1)[..], [(0x0000, 1), (0x0005, 2)]);
        assert_eq!(table.count(1), 0);
        assert_eq!(table.count(2), 1);
    }

    #[test]
    fn transition_times() {
        let mut scene = record(1, 0, 1);
        scene.set_transition_time(25, true);
        assert_eq!((scene.transition_time, scene.transition_tenths), (2, 5));
        assert_eq!(scene.transition_time_tenths(), 25);
        scene.set_transition_time(10, false);
        assert_eq!(scene.transition_time_tenths(), 100);
        scene.set_transition_time(0xffff, false);
        assert_eq!(scene.transition_time_tenths(), 0xfffe);
    }

    #[test]
    fn fieldset_lookup() {
        let mut table = SceneTable::default();
        let mut scene = record(1, 0, 1);
        scene
            .fieldsets
            .push(ExtensionFieldSet {
                cluster: cluster::ON_OFF,
                data: Vec::from_slice(&[1]).unwrap(),
            })
            .unwrap();
        table.insert(scene).unwrap();
        assert!(table.has_fieldset(1, cluster::ON_OFF));
        assert!(!table.has_fieldset(1, cluster::LEVEL_CONTROL));
        assert!(!table.has_fieldset(2, cluster::ON_OFF));
    }
}
