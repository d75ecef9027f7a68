//! Attribute reporting
//!
//! Send records decide when a local attribute is reported, receive records
//! watch for reports from peers and flag a missing report after twice the
//! configured timeout.

use hash32_derive::Hash32;
use heapless::{FnvIndexMap, Vec};

use zcl_data::cluster_library::commands::{AttributeReportingConfiguration, ReportingDirection};
use zcl_data::cluster_library::{
    AttributeIdentifier, AttributeValue, ClusterIdentifier, ClusterLibraryStatus,
};

use crate::attribute_store::Role;
use crate::timer::{earliest, SECOND};

/// Maximum number of reporting records
pub const MAX_REPORTING: usize = 16;
/// Maximum interval disabling a send record
pub const REPORTING_DISABLED: u16 = 0xffff;

/// Reporting record key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash32)]
pub struct ReportingKey {
    /// Endpoint
    pub endpoint: u8,
    /// Cluster
    pub cluster: u16,
    /// Role of the local cluster, server 0, client 1
    pub role: u8,
    /// Attribute
    pub attribute: u16,
    /// Direction, send 0, receive 1
    pub direction: u8,
}

impl ReportingKey {
    /// Key of a record
    pub fn new(
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        direction: ReportingDirection,
    ) -> Self {
        Self {
            endpoint,
            cluster,
            role: role.into(),
            attribute,
            direction: direction.into(),
        }
    }

    /// Role of the local cluster
    pub fn role(&self) -> Role {
        if self.role == 0 {
            Role::Server
        } else {
            Role::Client
        }
    }

    /// Direction of the record
    pub fn direction(&self) -> ReportingDirection {
        if self.direction == 0 {
            ReportingDirection::Send
        } else {
            ReportingDirection::Receive
        }
    }
}

/// Reporting record
#[derive(Clone, Debug, PartialEq)]
pub struct ReportingRecord {
    /// Configuration
    pub configuration: AttributeReportingConfiguration,
    /// Last reported value, send records only
    pub last_value: Option<AttributeValue>,
    /// Time stamp of the last report sent or received
    pub last_report: u32,
    /// A change waits for the minimum interval
    pub pending: bool,
}

impl ReportingRecord {
    fn deadline(&self) -> Option<u32> {
        match self.configuration {
            AttributeReportingConfiguration::Send {
                minimum_interval,
                maximum_interval,
                ..
            } => {
                let change = if self.pending {
                    Some(
                        self.last_report
                            .wrapping_add(u32::from(minimum_interval) * SECOND),
                    )
                } else {
                    None
                };
                let periodic = if maximum_interval != 0 {
                    Some(
                        self.last_report
                            .wrapping_add(u32::from(maximum_interval) * SECOND),
                    )
                } else {
                    None
                };
                match (change, periodic) {
                    (Some(c), Some(p)) => Some(if c.wrapping_sub(self.last_report)
                        <= p.wrapping_sub(self.last_report)
                    {
                        c
                    } else {
                        p
                    }),
                    (c, p) => c.or(p),
                }
            }
            AttributeReportingConfiguration::Receive { timeout, .. } => {
                if timeout == 0 {
                    None
                } else {
                    Some(
                        self.last_report
                            .wrapping_add(2 * u32::from(timeout) * SECOND),
                    )
                }
            }
        }
    }

    fn is_due(&self, now: u32) -> bool {
        self.deadline()
            .map(|deadline| crate::timer::is_due(now, deadline))
            .unwrap_or(false)
    }
}

/// Reporting records
#[derive(Default)]
pub struct Reporting {
    records: FnvIndexMap<ReportingKey, ReportingRecord, MAX_REPORTING>,
}

impl Reporting {
    /// Add, replace or remove a record, `current` is the value of the local
    /// attribute for send records
    pub fn configure(
        &mut self,
        key: ReportingKey,
        configuration: AttributeReportingConfiguration,
        current: Option<AttributeValue>,
        now: u32,
    ) -> Result<(), ClusterLibraryStatus> {
        let disable = match configuration {
            AttributeReportingConfiguration::Send {
                minimum_interval,
                maximum_interval,
                ..
            } => {
                if maximum_interval != 0
                    && maximum_interval != REPORTING_DISABLED
                    && minimum_interval > maximum_interval
                {
                    return Err(ClusterLibraryStatus::InvalidValue);
                }
                maximum_interval == REPORTING_DISABLED
            }
            AttributeReportingConfiguration::Receive { timeout, .. } => timeout == 0,
        };
        if disable {
            let _ = self.records.remove(&key);
            return Ok(());
        }
        let record = ReportingRecord {
            configuration,
            last_value: current,
            last_report: now,
            pending: false,
        };
        self.records
            .insert(key, record)
            .map(|_| ())
            .map_err(|_| ClusterLibraryStatus::InsufficientSpace)
    }

    /// Configuration of a record
    pub fn configuration(&self, key: &ReportingKey) -> Option<&AttributeReportingConfiguration> {
        self.records.get(key).map(|r| &r.configuration)
    }

    /// Records
    pub fn records(&self) -> impl Iterator<Item = (&ReportingKey, &ReportingRecord)> {
        self.records.iter()
    }

    /// Restore a record read from storage
    pub fn restore(&mut self, key: ReportingKey, record: ReportingRecord) -> Result<(), ClusterLibraryStatus> {
        self.records
            .insert(key, record)
            .map(|_| ())
            .map_err(|_| ClusterLibraryStatus::InsufficientSpace)
    }

    /// Remove every record
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// A local attribute changed
    pub fn attribute_changed(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        value: &AttributeValue,
    ) {
        let key = ReportingKey::new(endpoint, cluster, role, attribute, ReportingDirection::Send);
        if let Some(record) = self.records.get_mut(&key) {
            let reportable_change = match &record.configuration {
                AttributeReportingConfiguration::Send {
                    reportable_change, ..
                } => reportable_change.as_ref(),
                AttributeReportingConfiguration::Receive { .. } => return,
            };
            let changed = match &record.last_value {
                Some(last) => value.change_exceeds(last, reportable_change),
                None => true,
            };
            if changed {
                record.pending = true;
            }
        }
    }

    /// A report from a peer was received
    pub fn report_received(
        &mut self,
        endpoint: u8,
        cluster: ClusterIdentifier,
        role: Role,
        attribute: AttributeIdentifier,
        now: u32,
    ) {
        let key = ReportingKey::new(
            endpoint,
            cluster,
            role,
            attribute,
            ReportingDirection::Receive,
        );
        if let Some(record) = self.records.get_mut(&key) {
            record.last_report = now;
        }
    }

    /// Send records due at `now`, ordered by endpoint and cluster
    pub fn due_reports(&self, now: u32) -> Vec<ReportingKey, MAX_REPORTING> {
        let mut keys: Vec<ReportingKey, MAX_REPORTING> = self
            .records
            .iter()
            .filter(|(key, record)| {
                key.direction() == ReportingDirection::Send && record.is_due(now)
            })
            .map(|(key, _)| *key)
            .collect();
        keys.sort_unstable_by_key(|k| (k.endpoint, k.cluster, k.role, k.attribute));
        keys
    }

    /// A report has been sent for the record
    pub fn reported(&mut self, key: &ReportingKey, value: AttributeValue, now: u32) {
        if let Some(record) = self.records.get_mut(key) {
            record.last_value = Some(value);
            record.last_report = now;
            record.pending = false;
        }
    }

    /// Receive records without a report for twice the timeout, the timer of
    /// each returned record restarts
    pub fn missing_reports(&mut self, now: u32) -> Vec<ReportingKey, MAX_REPORTING> {
        let mut keys = Vec::new();
        for (key, record) in self.records.iter_mut() {
            if key.direction() == ReportingDirection::Receive && record.is_due(now) {
                record.last_report = now;
                let _ = keys.push(*key);
            }
        }
        keys
    }

    /// Earliest deadline of any record
    pub fn next_deadline(&self, now: u32) -> Option<u32> {
        self.records
            .values()
            .fold(None, |next, record| earliest(now, next, record.deadline()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zcl_data::cluster_library::AttributeDataType;

    fn send(minimum_interval: u16, maximum_interval: u16, change: u8) -> AttributeReportingConfiguration {
        AttributeReportingConfiguration::Send {
            identifier: 0x0000,
            data_type: AttributeDataType::Unsigned8,
            minimum_interval,
            maximum_interval,
            reportable_change: Some(AttributeValue::Unsigned8(change)),
        }
    }

    fn key() -> ReportingKey {
        ReportingKey::new(1, 0x0008, Role::Server, 0x0000, ReportingDirection::Send)
    }

    #[test]
    fn change_waits_for_minimum_interval() {
        let mut reporting = Reporting::default();
        reporting
            .configure(key(), send(2, 60, 5), Some(AttributeValue::Unsigned8(100)), 0)
            .unwrap();
        reporting.attribute_changed(1, 0x0008, Role::Server, 0x0000, &AttributeValue::Unsigned8(103));
        assert!(reporting.due_reports(5_000).is_empty());
        reporting.attribute_changed(1, 0x0008, Role::Server, 0x0000, &AttributeValue::Unsigned8(110));
        assert!(reporting.due_reports(1_000).is_empty());
        assert_eq!(reporting.next_deadline(1_000), Some(2_000));
        assert_eq!(reporting.due_reports(2_000)[..], [key()]);
        reporting.reported(&key(), AttributeValue::Unsigned8(110), 2_000);
        assert!(reporting.due_reports(3_000).is_empty());
        assert_eq!(reporting.next_deadline(3_000), Some(62_000));
        assert_eq!(reporting.due_reports(62_000)[..], [key()]);
    }

    #[test]
    fn configure_and_disable() {
        let mut reporting = Reporting::default();
        assert_eq!(
            reporting.configure(key(), send(10, 5, 1), None, 0),
            Err(ClusterLibraryStatus::InvalidValue)
        );
        reporting.configure(key(), send(0, 0, 1), None, 0).unwrap();
        assert!(reporting.configuration(&key()).is_some());
        assert_eq!(reporting.next_deadline(0), None);
        reporting
            .configure(key(), send(0, REPORTING_DISABLED, 1), None, 0)
            .unwrap();
        assert!(reporting.configuration(&key()).is_none());
    }

    #[test]
    fn missing_report() {
        let mut reporting = Reporting::default();
        let key = ReportingKey::new(1, 0x0006, Role::Client, 0x0000, ReportingDirection::Receive);
        reporting
            .configure(
                key,
                AttributeReportingConfiguration::Receive {
                    identifier: 0x0000,
                    timeout: 10,
                },
                None,
                0,
            )
            .unwrap();
        reporting.report_received(1, 0x0006, Role::Client, 0x0000, 15_000);
        assert!(reporting.missing_reports(30_000).is_empty());
        assert_eq!(reporting.missing_reports(35_000)[..], [key]);
        assert!(reporting.missing_reports(36_000).is_empty());
    }
}
