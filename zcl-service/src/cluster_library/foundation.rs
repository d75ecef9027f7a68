//! Profile wide commands

use core::convert::TryFrom;

use zcl_data::cluster_library::commands::{
    AttributeInformation, AttributeReportingConfiguration, AttributeReportingStatus,
    AttributeStatus, Command, ConfigureReporting, ConfigureReportingResponse, DiscoverAttributes,
    DiscoverAttributesExtendedResponse, DiscoverAttributesResponse, DiscoverCommands,
    DiscoverCommandsResponse, ExtendedAttributeInformation, ReadAttributes,
    ReadAttributesResponse, ReadReportingConfiguration, ReadReportingConfigurationResponse,
    ReportAttributes, ReportingConfigurationStatus, ReportingDirection, WriteAttributeStatus,
    WriteAttributes, WriteAttributesResponse, MAX_DISCOVERY_ENTRIES,
};
use zcl_data::cluster_library::{ClusterLibraryStatus, GeneralCommandIdentifier};

use super::{command_table, malformed, CommandResult, HandlerResult, Inbound};
use crate::aps::MAX_FRAME_SIZE;
use crate::attribute_store::{Access, AttributeRecord, WriteOrigin};
use crate::callback::{CallbackStatus, DeviceEvent, DeviceHandler};
use crate::reporting::ReportingKey;
use crate::ClusterLibraryService;

/// Room for records after the largest header
const RESPONSE_BUDGET: usize = MAX_FRAME_SIZE - 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriteMode {
    Normal,
    Undivided,
    NoResponse,
}

/// Access control bits of the extended discovery
fn access_bits(access: Access) -> u8 {
    let mut bits = 0;
    if access.contains(Access::READ) {
        bits |= 0x01;
    }
    if access.contains(Access::WRITE) {
        bits |= 0x02;
    }
    if access.contains(Access::REPORTABLE) {
        bits |= 0x04;
    }
    bits
}

fn discoverable(record: &AttributeRecord, manufacturer: Option<u16>, cluster: Option<u16>) -> bool {
    record.manufacturer == manufacturer
        || (record.manufacturer.is_none() && manufacturer.is_some() && cluster == manufacturer)
}

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    pub(crate) fn handle_foundation(&mut self, inbound: &Inbound) -> CommandResult {
        let identifier = GeneralCommandIdentifier::try_from(inbound.header.command)
            .map_err(|_| ClusterLibraryStatus::UnsupportedGeneralCommand)?;
        let (command, _) = Command::unpack(inbound.payload, identifier).map_err(malformed)?;
        log::info!(
            "> {:?} cluster {:04x} endpoint {}",
            identifier,
            inbound.cluster(),
            inbound.endpoint
        );
        match command {
            Command::ReadAttributes(request) => self.read_attributes(inbound, &request),
            Command::WriteAttributes(request) => {
                self.write_attributes(inbound, &request, WriteMode::Normal)
            }
            Command::WriteAttributesUndivided(request) => {
                self.write_attributes(inbound, &request, WriteMode::Undivided)
            }
            Command::WriteAttributesNoResponse(request) => {
                self.write_attributes(inbound, &request, WriteMode::NoResponse)
            }
            Command::ConfigureReporting(request) => self.configure_reporting(inbound, &request),
            Command::ReadReportingConfiguration(request) => {
                self.read_reporting_configuration(inbound, &request)
            }
            Command::ReportAttributes(report) => self.report_attributes(inbound, &report),
            Command::DefaultResponse(response) => {
                log::info!(
                    "> Default response, command {:02x} {:?}",
                    response.command,
                    response.status
                );
                Ok(HandlerResult::Handled)
            }
            Command::DiscoverAttributes(request) => self.discover_attributes(inbound, &request),
            Command::DiscoverAttributesExtended(request) => {
                self.discover_attributes_extended(inbound, &request)
            }
            Command::DiscoverCommandsReceived(request) => {
                self.discover_commands(inbound, &request, false)
            }
            Command::DiscoverCommandsGenerated(request) => {
                self.discover_commands(inbound, &request, true)
            }
            Command::ReadAttributesResponse(_)
            | Command::WriteAttributesResponse(_)
            | Command::ConfigureReportingResponse(_)
            | Command::ReadReportingConfigurationResponse(_)
            | Command::DiscoverAttributesResponse(_)
            | Command::DiscoverCommandsReceivedResponse(_)
            | Command::DiscoverCommandsGeneratedResponse(_)
            | Command::DiscoverAttributesExtendedResponse(_) => {
                log::info!("> Unsolicited {:?}", identifier);
                Ok(HandlerResult::Handled)
            }
        }
    }

    fn read_attributes(&mut self, inbound: &Inbound, request: &ReadAttributes) -> CommandResult {
        let mut response = ReadAttributesResponse::default();
        let mut size = 0;
        for identifier in request.attributes.iter().copied() {
            let result = match self.dynamic_value(
                inbound.endpoint,
                inbound.cluster(),
                inbound.role,
                identifier,
            ) {
                Some(value) => Ok(value),
                None => self
                    .store
                    .read(
                        inbound.endpoint,
                        inbound.cluster(),
                        inbound.role,
                        identifier,
                        inbound.header.manufacturer,
                        WriteOrigin::Remote,
                    )
                    .map(Clone::clone),
            };
            let record = match result {
                Ok(value) => AttributeStatus {
                    identifier,
                    status: ClusterLibraryStatus::Success,
                    value: Some(value),
                },
                Err(status) => AttributeStatus {
                    identifier,
                    status: self.status(status),
                    value: None,
                },
            };
            let record_size = 3 + record.value.as_ref().map_or(0, |v| 1 + v.packed_size());
            if size + record_size > RESPONSE_BUDGET {
                log::warn!("< Read response truncated at {:04x}", identifier);
                break;
            }
            size += record_size;
            if response.attributes.push(record).is_err() {
                break;
            }
        }
        self.respond_global(inbound, &Command::ReadAttributesResponse(response));
        Ok(HandlerResult::HandledWillRespond)
    }

    fn write_attributes(
        &mut self,
        inbound: &Inbound,
        request: &WriteAttributes,
        mode: WriteMode,
    ) -> CommandResult {
        let mut response = WriteAttributesResponse::default();
        if mode == WriteMode::Undivided {
            for record in request.attributes.iter() {
                if let Err(status) = self.store.validate(
                    inbound.endpoint,
                    inbound.cluster(),
                    inbound.role,
                    record.identifier,
                    inbound.header.manufacturer,
                    &record.value,
                    WriteOrigin::Remote,
                ) {
                    let _ = response.attributes.push(WriteAttributeStatus {
                        status: self.status(status),
                        identifier: record.identifier,
                    });
                }
            }
            if !response.attributes.is_empty() {
                self.respond_global(inbound, &Command::WriteAttributesResponse(response));
                return Ok(HandlerResult::HandledWillRespond);
            }
        }
        for record in request.attributes.iter() {
            if let Err(status) = self.write_local(
                inbound.endpoint,
                inbound.cluster(),
                inbound.role,
                record.identifier,
                inbound.header.manufacturer,
                record.value.clone(),
                WriteOrigin::Remote,
            ) {
                log::warn!("> Write {:04x} failed, {:?}", record.identifier, status);
                let _ = response.attributes.push(WriteAttributeStatus {
                    status: self.status(status),
                    identifier: record.identifier,
                });
            }
        }
        if mode != WriteMode::NoResponse {
            self.respond_global(inbound, &Command::WriteAttributesResponse(response));
        }
        Ok(HandlerResult::HandledWillRespond)
    }

    fn configure_reporting(
        &mut self,
        inbound: &Inbound,
        request: &ConfigureReporting,
    ) -> CommandResult {
        let mut response = ConfigureReportingResponse::default();
        let now = self.now();
        for record in request.records.iter() {
            let identifier = record.identifier();
            let direction = record.direction();
            let current = match record {
                AttributeReportingConfiguration::Send { data_type, .. } => {
                    match self.store.record(
                        inbound.endpoint,
                        inbound.cluster(),
                        inbound.role,
                        identifier,
                        inbound.header.manufacturer,
                    ) {
                        None => Err(ClusterLibraryStatus::UnsupportedAttribute),
                        Some(r) if !r.access.contains(Access::REPORTABLE) => {
                            Err(ClusterLibraryStatus::UnreportableAttribute)
                        }
                        Some(r) if r.value.data_type() != *data_type => {
                            Err(ClusterLibraryStatus::InvalidDataType)
                        }
                        Some(r) => Ok(Some(r.value.clone())),
                    }
                }
                AttributeReportingConfiguration::Receive { .. } => Ok(None),
            };
            let key = ReportingKey::new(
                inbound.endpoint,
                inbound.cluster(),
                inbound.role,
                identifier,
                direction,
            );
            let result =
                current.and_then(|current| self.reporting.configure(key, record.clone(), current, now));
            if let Err(status) = result {
                log::warn!("> Reporting of {:04x} refused, {:?}", identifier, status);
                let _ = response.records.push(AttributeReportingStatus {
                    status: self.status(status),
                    direction,
                    identifier,
                });
            }
        }
        self.respond_global(inbound, &Command::ConfigureReportingResponse(response));
        Ok(HandlerResult::HandledWillRespond)
    }

    fn read_reporting_configuration(
        &mut self,
        inbound: &Inbound,
        request: &ReadReportingConfiguration,
    ) -> CommandResult {
        let mut response = ReadReportingConfigurationResponse::default();
        for record in request.records.iter() {
            let key = ReportingKey::new(
                inbound.endpoint,
                inbound.cluster(),
                inbound.role,
                record.identifier,
                record.direction,
            );
            let status = match self.reporting.configuration(&key) {
                Some(configuration) => ReportingConfigurationStatus::Configured(configuration.clone()),
                None => {
                    let exists = self
                        .store
                        .record(
                            inbound.endpoint,
                            inbound.cluster(),
                            inbound.role,
                            record.identifier,
                            inbound.header.manufacturer,
                        )
                        .is_some();
                    let status = if record.direction == ReportingDirection::Send && !exists {
                        ClusterLibraryStatus::UnsupportedAttribute
                    } else {
                        ClusterLibraryStatus::NotFound
                    };
                    ReportingConfigurationStatus::Failed {
                        status: self.status(status),
                        direction: record.direction,
                        identifier: record.identifier,
                    }
                }
            };
            let _ = response.records.push(status);
        }
        self.respond_global(inbound, &Command::ReadReportingConfigurationResponse(response));
        Ok(HandlerResult::HandledWillRespond)
    }

    fn report_attributes(&mut self, inbound: &Inbound, report: &ReportAttributes) -> CommandResult {
        let now = self.now();
        for record in report.reports.iter() {
            self.reporting.report_received(
                inbound.endpoint,
                inbound.cluster(),
                inbound.role,
                record.identifier,
                now,
            );
            self.notify(
                inbound.endpoint,
                CallbackStatus::Ok,
                DeviceEvent::ReportAttribute {
                    source: inbound.indication.source,
                    cluster: inbound.cluster(),
                    attribute: record.identifier,
                    value: record.value.clone(),
                },
            );
        }
        Ok(HandlerResult::Handled)
    }

    fn discoverable_attributes<'s>(
        &'s self,
        inbound: &Inbound,
        request: &DiscoverAttributes,
    ) -> (impl Iterator<Item = &'s AttributeRecord>, usize) {
        let manufacturer = inbound.header.manufacturer;
        let (records, cluster_manufacturer) =
            match self.store.cluster(inbound.endpoint, inbound.cluster(), inbound.role) {
                Some(instance) => (instance.attributes(), instance.manufacturer),
                None => (&[][..], None),
            };
        let start = request.start;
        let maximum = usize::from(request.maximum).min(MAX_DISCOVERY_ENTRIES);
        let iter = records.iter().filter(move |r| {
            r.identifier >= start && discoverable(r, manufacturer, cluster_manufacturer)
        });
        (iter, maximum)
    }

    fn discover_attributes(&mut self, inbound: &Inbound, request: &DiscoverAttributes) -> CommandResult {
        let mut response = DiscoverAttributesResponse::default();
        {
            let (mut records, maximum) = self.discoverable_attributes(inbound, request);
            for record in records.by_ref().take(maximum) {
                let _ = response.attributes.push(AttributeInformation {
                    identifier: record.identifier,
                    data_type: record.value.data_type(),
                });
            }
            response.complete = records.next().is_none();
        }
        self.respond_global(inbound, &Command::DiscoverAttributesResponse(response));
        Ok(HandlerResult::HandledWillRespond)
    }

    fn discover_attributes_extended(
        &mut self,
        inbound: &Inbound,
        request: &DiscoverAttributes,
    ) -> CommandResult {
        let mut response = DiscoverAttributesExtendedResponse::default();
        {
            let (mut records, maximum) = self.discoverable_attributes(inbound, request);
            for record in records.by_ref().take(maximum) {
                let _ = response.attributes.push(ExtendedAttributeInformation {
                    identifier: record.identifier,
                    data_type: record.value.data_type(),
                    access: access_bits(record.access),
                });
            }
            response.complete = records.next().is_none();
        }
        self.respond_global(inbound, &Command::DiscoverAttributesExtendedResponse(response));
        Ok(HandlerResult::HandledWillRespond)
    }

    fn discover_commands(
        &mut self,
        inbound: &Inbound,
        request: &DiscoverCommands,
        generated: bool,
    ) -> CommandResult {
        let maximum = usize::from(request.maximum).min(MAX_DISCOVERY_ENTRIES);
        let mut commands = command_table(inbound.cluster(), inbound.role, generated)
            .iter()
            .copied()
            .filter(|c| *c >= request.start);
        let mut response = DiscoverCommandsResponse::default();
        for command in commands.by_ref().take(maximum) {
            let _ = response.commands.push(command);
        }
        response.complete = commands.next().is_none();
        let command = if generated {
            Command::DiscoverCommandsGeneratedResponse(response)
        } else {
            Command::DiscoverCommandsReceivedResponse(response)
        };
        self.respond_global(inbound, &command);
        Ok(HandlerResult::HandledWillRespond)
    }
}
