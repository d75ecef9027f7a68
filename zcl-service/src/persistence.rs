//! Persistent records
//!
//! Tables that survive a restart are written as one record per table. A
//! record is `tag u8, version u8, length u16, body`, little endian. Records
//! with another version are skipped on restore so the defaults stay in place.

use core::convert::TryFrom;

use heapless::Vec;

use zcl_data::cluster_library::commands::AttributeReportingConfiguration;
use zcl_data::cluster_library::drlc::LoadControlEvent;
use zcl_data::cluster_library::scenes::{ExtensionFieldSet, ExtensionFieldSets};
use zcl_data::cluster_library::wwah::{ClusterList, EnableAppEventRetryAlgorithm};
use zcl_data::cluster_library::{AttributeDataType, AttributeValue, ClusterIdentifier};
use zcl_data::extended_enum;
use zcl_data::pack::{Pack, Reader, Writer};
use zcl_data::ShortAddress;

use crate::attribute_store::{Access, Role, WriteOrigin};
use crate::callback::DeviceHandler;
use crate::cluster_library::scenes::SceneRecord;
use crate::drlc::{EventOrigin, EventState, ScheduledEvent};
use crate::reporting::{ReportingKey, ReportingRecord};
use crate::wwah::rejoin::{RejoinBackoff, RejoinParameters};
use crate::{ClusterLibraryService, Error};

/// Layout version of every record
pub const RECORD_VERSION: u8 = 1;
/// Size of the record header
pub const HEADER_SIZE: usize = 4;
/// Largest record, header included
pub const MAX_RECORD_SIZE: usize = 2048;

const LOAD_CONTROL_EVENT_SIZE: usize = 23;
const MAX_CONFIGURATION_SIZE: usize = 32;

extended_enum!(
    /// Kind of a stored record
    RecordTag, u8,
    /// Writable and non-volatile attribute values
    Attributes => 0x01,
    /// Scene table
    Scenes => 0x02,
    /// Works with all hubs policy
    Wwah => 0x03,
    /// Load control calendar
    LoadControl => 0x04,
    /// Reporting configurations
    Reporting => 0x05,
    /// Group memberships
    Groups => 0x06,
);

/// Opaque record storage provided by the integrator
pub trait PersistentStorage {
    /// Read the record stored under `tag` into `buffer`, returns the number
    /// of bytes read, zero when nothing is stored
    fn read(&mut self, tag: RecordTag, buffer: &mut [u8]) -> Result<usize, Error>;

    /// Replace the record stored under `tag`
    fn write(&mut self, tag: RecordTag, data: &[u8]) -> Result<(), Error>;
}

type BodyResult = Result<(), zcl_data::Error>;

fn write_record<S, F>(storage: &mut S, tag: RecordTag, body: F) -> Result<(), Error>
where
    S: PersistentStorage,
    F: FnOnce(&mut Writer) -> BodyResult,
{
    let mut buffer = [0u8; MAX_RECORD_SIZE];
    let length = {
        let mut writer = Writer::new(&mut buffer[HEADER_SIZE..]);
        body(&mut writer)?;
        writer.position()
    };
    let mut header = Writer::new(&mut buffer[..HEADER_SIZE]);
    header.write_u8(tag.into())?;
    header.write_u8(RECORD_VERSION)?;
    header.write_u16(length as u16)?;
    log::debug!("Saving {:?}, {} bytes", tag, length);
    storage.write(tag, &buffer[..HEADER_SIZE + length])
}

/// Body of the record stored under `tag`, none when nothing usable is stored
fn read_record<'b, S: PersistentStorage>(
    storage: &mut S,
    tag: RecordTag,
    buffer: &'b mut [u8],
) -> Result<Option<&'b [u8]>, Error> {
    let used = storage.read(tag, buffer)?;
    if used == 0 {
        return Ok(None);
    }
    let data: &'b [u8] = buffer;
    let mut reader = Reader::new(&data[..used.min(data.len())]);
    let stored = reader.read_u8().map_err(|_| Error::InvalidRecord)?;
    let version = reader.read_u8().map_err(|_| Error::InvalidRecord)?;
    let length = reader.read_u16().map_err(|_| Error::InvalidRecord)?;
    if stored != u8::from(tag) {
        log::error!("Record {:?} holds tag {:02x}", tag, stored);
        return Err(Error::InvalidRecord);
    }
    if version != RECORD_VERSION {
        log::warn!("Skipping {:?}, version {}", tag, version);
        return Ok(None);
    }
    let body = reader
        .read_bytes(usize::from(length))
        .map_err(|_| Error::InvalidRecord)?;
    Ok(Some(body))
}

fn role_from(value: u8) -> Result<Role, zcl_data::Error> {
    match value {
        0 => Ok(Role::Server),
        1 => Ok(Role::Client),
        _ => Err(zcl_data::Error::InvalidValue),
    }
}

fn write_optional_u16(writer: &mut Writer, value: Option<u16>) -> BodyResult {
    writer.write_bool(value.is_some())?;
    writer.write_u16(value.unwrap_or(0))
}

fn read_optional_u16(reader: &mut Reader) -> Result<Option<u16>, zcl_data::Error> {
    let present = reader.read_bool()?;
    let value = reader.read_u16()?;
    Ok(if present { Some(value) } else { None })
}

fn write_value(writer: &mut Writer, value: &AttributeValue) -> BodyResult {
    writer.write_u8(value.data_type().into())?;
    let size = value.packed_size();
    value.pack(writer.allocate(size)?)?;
    Ok(())
}

fn read_value(reader: &mut Reader) -> Result<AttributeValue, zcl_data::Error> {
    let data_type = AttributeDataType::try_from(reader.read_u8()?)?;
    let (value, used) = AttributeValue::unpack(reader.rest(), data_type)?;
    reader.read_bytes(used)?;
    Ok(value)
}

fn write_clusters(writer: &mut Writer, clusters: &[ClusterIdentifier]) -> BodyResult {
    writer.write_u8(clusters.len() as u8)?;
    for cluster in clusters {
        writer.write_u16(*cluster)?;
    }
    Ok(())
}

fn read_clusters<const C: usize>(
    reader: &mut Reader,
) -> Result<Vec<ClusterIdentifier, C>, zcl_data::Error> {
    let count = reader.read_u8()?;
    let mut clusters = Vec::new();
    for _ in 0..count {
        clusters
            .push(reader.read_u16()?)
            .map_err(|_| zcl_data::Error::NotEnoughSpace)?;
    }
    Ok(clusters)
}

/// Scene record body
pub fn pack_scene(writer: &mut Writer, scene: &SceneRecord) -> BodyResult {
    writer.write_u8(scene.endpoint)?;
    writer.write_u16(scene.group)?;
    writer.write_u8(scene.scene)?;
    writer.write_u16(scene.transition_time)?;
    writer.write_u8(scene.transition_tenths)?;
    writer.write_u8(scene.fieldsets.len() as u8)?;
    for fieldset in scene.fieldsets.iter() {
        writer.write_u16(fieldset.cluster)?;
        writer.write_u8(fieldset.data.len() as u8)?;
        writer.write_bytes(&fieldset.data)?;
    }
    Ok(())
}

/// Read a scene written by [`pack_scene`]
pub fn unpack_scene(reader: &mut Reader) -> Result<SceneRecord, zcl_data::Error> {
    let endpoint = reader.read_u8()?;
    let group = reader.read_u16()?;
    let scene = reader.read_u8()?;
    let transition_time = reader.read_u16()?;
    let transition_tenths = reader.read_u8()?;
    let count = reader.read_u8()?;
    let mut fieldsets = ExtensionFieldSets::new();
    for _ in 0..count {
        let cluster = reader.read_u16()?;
        let length = reader.read_u8()?;
        let data = Vec::from_slice(reader.read_bytes(usize::from(length))?)
            .map_err(|_| zcl_data::Error::NotEnoughSpace)?;
        fieldsets
            .push(ExtensionFieldSet { cluster, data })
            .map_err(|_| zcl_data::Error::NotEnoughSpace)?;
    }
    Ok(SceneRecord {
        endpoint,
        group,
        scene,
        transition_time,
        transition_tenths,
        fieldsets,
    })
}

/// Scheduled load control event body
pub fn pack_scheduled_event(writer: &mut Writer, scheduled: &ScheduledEvent) -> BodyResult {
    writer.write_u8(scheduled.origin.endpoint)?;
    writer.write_u16(scheduled.origin.server.into())?;
    writer.write_u8(scheduled.origin.server_endpoint)?;
    scheduled
        .event
        .pack(writer.allocate(LOAD_CONTROL_EVENT_SIZE)?)?;
    writer.write_u32(scheduled.effective_start)?;
    writer.write_u32(scheduled.effective_end)?;
    writer.write_bool(scheduled.state == EventState::Active)?;
    writer.write_bool(scheduled.participating)?;
    writer.write_bool(scheduled.duty_cycling)?;
    writer.write_bool(scheduled.cancel_at.is_some())?;
    writer.write_u32(scheduled.cancel_at.unwrap_or(0))?;
    Ok(())
}

/// Read an event written by [`pack_scheduled_event`]
pub fn unpack_scheduled_event(reader: &mut Reader) -> Result<ScheduledEvent, zcl_data::Error> {
    let origin = EventOrigin {
        endpoint: reader.read_u8()?,
        server: ShortAddress::new(reader.read_u16()?),
        server_endpoint: reader.read_u8()?,
    };
    let (event, _) = LoadControlEvent::unpack(reader.read_bytes(LOAD_CONTROL_EVENT_SIZE)?)?;
    let effective_start = reader.read_u32()?;
    let effective_end = reader.read_u32()?;
    let state = if reader.read_bool()? {
        EventState::Active
    } else {
        EventState::Scheduled
    };
    let participating = reader.read_bool()?;
    let duty_cycling = reader.read_bool()?;
    let cancelled = reader.read_bool()?;
    let cancel_at = reader.read_u32()?;
    Ok(ScheduledEvent {
        origin,
        event,
        effective_start,
        effective_end,
        state,
        participating,
        duty_cycling,
        cancel_at: if cancelled { Some(cancel_at) } else { None },
    })
}

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    /// Write every persistent table to `storage`
    pub fn save<S: PersistentStorage>(&self, storage: &mut S) -> Result<(), Error> {
        self.save_attributes(storage)?;
        self.save_groups(storage)?;
        self.save_scenes(storage)?;
        self.save_wwah(storage)?;
        self.save_load_control(storage)?;
        self.save_reporting(storage)
    }

    /// Read back the tables written by [`save`](Self::save), missing records
    /// leave the current state untouched
    pub fn restore<S: PersistentStorage>(&mut self, storage: &mut S) -> Result<(), Error> {
        let mut buffer = [0u8; MAX_RECORD_SIZE];
        for tag in [
            RecordTag::Attributes,
            RecordTag::Groups,
            RecordTag::Scenes,
            RecordTag::Wwah,
            RecordTag::LoadControl,
            RecordTag::Reporting,
        ] {
            let body = match read_record(storage, tag, &mut buffer)? {
                Some(body) => body,
                None => continue,
            };
            let mut reader = Reader::new(body);
            let result = match tag {
                RecordTag::Attributes => self.restore_attributes(&mut reader),
                RecordTag::Groups => self.restore_groups(&mut reader),
                RecordTag::Scenes => self.restore_scenes(&mut reader),
                RecordTag::Wwah => self.restore_wwah(&mut reader),
                RecordTag::LoadControl => self.restore_load_control(&mut reader),
                RecordTag::Reporting => self.restore_reporting(&mut reader),
            };
            if let Err(err) = result {
                log::error!("Failed to restore {:?}, {:?}", tag, err);
                return Err(Error::InvalidRecord);
            }
            log::info!("Restored {:?}", tag);
        }
        let endpoints: Vec<u8, { crate::attribute_store::MAX_ENDPOINTS }> =
            self.store.endpoints().iter().map(|e| e.endpoint).collect();
        for endpoint in endpoints {
            self.update_scene_count(endpoint);
            self.refresh_energy_management(endpoint);
        }
        Ok(())
    }

    fn save_attributes<S: PersistentStorage>(&self, storage: &mut S) -> Result<(), Error> {
        write_record(storage, RecordTag::Attributes, |writer| {
            let persistent = Access::WRITE | Access::NON_VOLATILE;
            for instance in self.store.clusters() {
                for record in instance
                    .attributes()
                    .iter()
                    .filter(|r| r.access.intersects(persistent))
                {
                    writer.write_u8(instance.endpoint)?;
                    writer.write_u16(instance.cluster)?;
                    writer.write_u8(instance.role.into())?;
                    writer.write_u16(record.identifier)?;
                    write_optional_u16(writer, record.manufacturer)?;
                    write_value(writer, &record.value)?;
                }
            }
            Ok(())
        })
    }

    fn restore_attributes(&mut self, reader: &mut Reader) -> BodyResult {
        while !reader.is_empty() {
            let endpoint = reader.read_u8()?;
            let cluster = reader.read_u16()?;
            let role = role_from(reader.read_u8()?)?;
            let attribute = reader.read_u16()?;
            let manufacturer = read_optional_u16(reader)?;
            let value = read_value(reader)?;
            if let Err(status) =
                self.store
                    .restore(endpoint, cluster, role, attribute, manufacturer, value)
            {
                log::warn!(
                    "Stored {:04x}:{:04x} on endpoint {} dropped, {:?}",
                    cluster,
                    attribute,
                    endpoint,
                    status
                );
            }
        }
        Ok(())
    }

    fn save_groups<S: PersistentStorage>(&self, storage: &mut S) -> Result<(), Error> {
        write_record(storage, RecordTag::Groups, |writer| {
            for membership in self.groups.entries() {
                writer.write_u8(membership.endpoint)?;
                writer.write_u16(membership.group)?;
            }
            Ok(())
        })
    }

    fn restore_groups(&mut self, reader: &mut Reader) -> BodyResult {
        self.groups.clear();
        while !reader.is_empty() {
            let endpoint = reader.read_u8()?;
            let group = reader.read_u16()?;
            if self.groups.add(endpoint, group).is_err() {
                log::warn!("Stored group {:04x} on endpoint {} dropped", group, endpoint);
            }
        }
        Ok(())
    }

    fn save_scenes<S: PersistentStorage>(&self, storage: &mut S) -> Result<(), Error> {
        write_record(storage, RecordTag::Scenes, |writer| {
            for scene in self.scenes.entries() {
                pack_scene(writer, scene)?;
            }
            Ok(())
        })
    }

    fn restore_scenes(&mut self, reader: &mut Reader) -> BodyResult {
        self.scenes.clear();
        while !reader.is_empty() {
            let scene = unpack_scene(reader)?;
            let (endpoint, group, identifier) = (scene.endpoint, scene.group, scene.scene);
            if self.scenes.insert(scene).is_err() {
                log::warn!(
                    "Stored scene {:04x}:{:02x} on endpoint {} dropped",
                    group,
                    identifier,
                    endpoint
                );
            }
        }
        Ok(())
    }

    fn save_wwah<S: PersistentStorage>(&self, storage: &mut S) -> Result<(), Error> {
        let policy = &self.policy;
        write_record(storage, RecordTag::Wwah, |writer| {
            writer.write_u16(policy.trust_center.into())?;
            writer.write_bool(policy.ack_required_by_default)?;
            writer.write_bool(policy.link_key_required_by_default)?;
            write_clusters(writer, &policy.ack_clusters)?;
            write_clusters(writer, &policy.link_key_clusters)?;
            write_clusters(writer, &policy.trust_center_clusters)?;
            match &policy.app_event_retry {
                Some(retry) => {
                    writer.write_bool(true)?;
                    writer.write_u8(retry.first_backoff)?;
                    writer.write_u8(retry.common_ratio)?;
                    writer.write_u32(retry.max_backoff)?;
                    writer.write_u8(retry.max_redelivery_attempts)?;
                }
                None => writer.write_bool(false)?,
            }
            match self.rejoin.as_ref().map(RejoinBackoff::parameters) {
                Some(parameters) => {
                    writer.write_bool(true)?;
                    writer.write_u16(parameters.first_backoff)?;
                    writer.write_u16(parameters.max_backoff)?;
                    writer.write_u16(parameters.max_iterations)?;
                }
                None => writer.write_bool(false)?,
            }
            Ok(())
        })
    }

    fn restore_wwah(&mut self, reader: &mut Reader) -> BodyResult {
        let trust_center = ShortAddress::new(reader.read_u16()?);
        let ack_required_by_default = reader.read_bool()?;
        let link_key_required_by_default = reader.read_bool()?;
        let ack_clusters: ClusterList = read_clusters(reader)?;
        let link_key_clusters: ClusterList = read_clusters(reader)?;
        let trust_center_clusters = read_clusters(reader)?;
        let app_event_retry = if reader.read_bool()? {
            Some(EnableAppEventRetryAlgorithm {
                first_backoff: reader.read_u8()?,
                common_ratio: reader.read_u8()?,
                max_backoff: reader.read_u32()?,
                max_redelivery_attempts: reader.read_u8()?,
            })
        } else {
            None
        };
        let rejoin = if reader.read_bool()? {
            Some(RejoinParameters {
                first_backoff: reader.read_u16()?,
                max_backoff: reader.read_u16()?,
                max_iterations: reader.read_u16()?,
            })
        } else {
            None
        };
        self.policy.trust_center = trust_center;
        self.policy.ack_required_by_default = ack_required_by_default;
        self.policy.link_key_required_by_default = link_key_required_by_default;
        self.policy.ack_clusters = ack_clusters;
        self.policy.link_key_clusters = link_key_clusters;
        self.policy.trust_center_clusters = trust_center_clusters;
        self.policy.app_event_retry = app_event_retry;
        let kind = self.config.wwah.device_kind;
        self.rejoin = rejoin.map(|parameters| RejoinBackoff::new(parameters, kind));
        Ok(())
    }

    fn save_load_control<S: PersistentStorage>(&self, storage: &mut S) -> Result<(), Error> {
        write_record(storage, RecordTag::LoadControl, |writer| {
            for scheduled in self.drlc.events() {
                pack_scheduled_event(writer, scheduled)?;
            }
            Ok(())
        })
    }

    fn restore_load_control(&mut self, reader: &mut Reader) -> BodyResult {
        while !reader.is_empty() {
            let scheduled = unpack_scheduled_event(reader)?;
            let id = scheduled.event.issuer_event_id;
            if self.drlc.restore(scheduled).is_err() {
                log::warn!("Stored load control event {:08x} dropped", id);
            }
        }
        Ok(())
    }

    fn save_reporting<S: PersistentStorage>(&self, storage: &mut S) -> Result<(), Error> {
        write_record(storage, RecordTag::Reporting, |writer| {
            for (key, record) in self.reporting.records() {
                writer.write_u8(key.endpoint)?;
                writer.write_u16(key.cluster)?;
                writer.write_u8(key.role)?;
                let mut configuration = [0u8; MAX_CONFIGURATION_SIZE];
                let used = record.configuration.pack(&mut configuration)?;
                writer.write_u8(used as u8)?;
                writer.write_bytes(&configuration[..used])?;
            }
            Ok(())
        })
    }

    fn restore_reporting(&mut self, reader: &mut Reader) -> BodyResult {
        self.reporting.clear();
        while !reader.is_empty() {
            let endpoint = reader.read_u8()?;
            let cluster = reader.read_u16()?;
            let role = role_from(reader.read_u8()?)?;
            let length = reader.read_u8()?;
            let (configuration, _) =
                AttributeReportingConfiguration::unpack(reader.read_bytes(usize::from(length))?)?;
            let attribute = configuration.identifier();
            let key = ReportingKey::new(endpoint, cluster, role, attribute, configuration.direction());
            let last_value = match configuration {
                AttributeReportingConfiguration::Send { .. } => self
                    .store
                    .read(endpoint, cluster, role, attribute, None, WriteOrigin::Local)
                    .ok()
                    .cloned(),
                AttributeReportingConfiguration::Receive { .. } => None,
            };
            let record = ReportingRecord {
                configuration,
                last_value,
                last_report: self.timestamp,
                pending: false,
            };
            if self.reporting.restore(key, record).is_err() {
                log::warn!(
                    "Stored reporting of {:04x}:{:04x} on endpoint {} dropped",
                    cluster,
                    attribute,
                    endpoint
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use zcl_data::cluster_library::drlc::{DeviceClass, EventControl};

    #[derive(Default)]
    struct MemoryStorage {
        records: HashMap<u8, std::vec::Vec<u8>>,
    }

    impl PersistentStorage for MemoryStorage {
        fn read(&mut self, tag: RecordTag, buffer: &mut [u8]) -> Result<usize, Error> {
            match self.records.get(&u8::from(tag)) {
                Some(data) => {
                    buffer[..data.len()].copy_from_slice(data);
                    Ok(data.len())
                }
                None => Ok(0),
            }
        }

        fn write(&mut self, tag: RecordTag, data: &[u8]) -> Result<(), Error> {
            self.records.insert(tag.into(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn record_header() {
        let mut storage = MemoryStorage::default();
        write_record(&mut storage, RecordTag::Groups, |writer| {
            writer.write_u8(1)?;
            writer.write_u16(0x1234)
        })
        .unwrap();
        assert_eq!(
            storage.records[&0x06],
            [0x06, 0x01, 0x03, 0x00, 0x01, 0x34, 0x12]
        );
        let mut buffer = [0u8; 64];
        let body = read_record(&mut storage, RecordTag::Groups, &mut buffer)
            .unwrap()
            .unwrap();
        assert_eq!(body, [0x01, 0x34, 0x12]);
    }

    #[test]
    fn missing_and_foreign_records() {
        let mut storage = MemoryStorage::default();
        let mut buffer = [0u8; 64];
        assert_eq!(
            read_record(&mut storage, RecordTag::Scenes, &mut buffer),
            Ok(None)
        );
        storage.records.insert(0x02, vec![0x02, 0x07, 0x00, 0x00]);
        assert_eq!(
            read_record(&mut storage, RecordTag::Scenes, &mut buffer),
            Ok(None)
        );
        storage.records.insert(0x02, vec![0x03, 0x01, 0x00, 0x00]);
        assert_eq!(
            read_record(&mut storage, RecordTag::Scenes, &mut buffer),
            Err(Error::InvalidRecord)
        );
        storage.records.insert(0x02, vec![0x02, 0x01, 0x05, 0x00, 0x01]);
        assert_eq!(
            read_record(&mut storage, RecordTag::Scenes, &mut buffer),
            Err(Error::InvalidRecord)
        );
    }

    #[test]
    fn scene_body() {
        let mut fieldsets = ExtensionFieldSets::new();
        fieldsets
            .push(ExtensionFieldSet {
                cluster: 0x0008,
                data: Vec::from_slice(&[0x80]).unwrap(),
            })
            .unwrap();
        let scene = SceneRecord {
            endpoint: 1,
            group: 0x0010,
            scene: 3,
            transition_time: 2,
            transition_tenths: 5,
            fieldsets,
        };
        let mut data = [0u8; 64];
        let mut writer = Writer::new(&mut data);
        pack_scene(&mut writer, &scene).unwrap();
        let used = writer.position();
        assert_eq!(used, 12);
        let mut reader = Reader::new(&data[..used]);
        assert_eq!(unpack_scene(&mut reader).unwrap(), scene);
        assert!(reader.is_empty());
    }

    #[test]
    fn cancelled_event_body() {
        let scheduled = ScheduledEvent {
            origin: EventOrigin {
                endpoint: 1,
                server: ShortAddress::new(0x0000),
                server_endpoint: 9,
            },
            event: LoadControlEvent {
                issuer_event_id: 0x0102_0304,
                device_class: DeviceClass::HVAC,
                utility_enrollment_group: 0,
                start_time: 0,
                duration: 30,
                criticality_level: 1,
                cooling_temperature_offset: 0xff,
                heating_temperature_offset: 0xff,
                cooling_temperature_set_point: -32768,
                heating_temperature_set_point: -32768,
                average_load_adjustment_percentage: -128,
                duty_cycle: 0xff,
                event_control: EventControl::RANDOMIZE_START,
            },
            effective_start: 1000,
            effective_end: 2800,
            state: EventState::Active,
            participating: true,
            duty_cycling: false,
            cancel_at: Some(1500),
        };
        let mut data = [0u8; 64];
        let mut writer = Writer::new(&mut data);
        pack_scheduled_event(&mut writer, &scheduled).unwrap();
        let used = writer.position();
        let mut reader = Reader::new(&data[..used]);
        let restored = unpack_scheduled_event(&mut reader).unwrap();
        assert_eq!(restored.cancel_at, Some(1500));
        assert_eq!(restored.state, EventState::Active);
        assert_eq!(restored.event.issuer_event_id, 0x0102_0304);
        assert_eq!(restored.origin.server_endpoint, 9);
    }
}
