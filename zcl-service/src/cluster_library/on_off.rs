//! On/Off server

use core::convert::TryFrom;

use zcl_data::cluster_library::on_off::{OnOffCommand, ATTR_ON_OFF};
use zcl_data::cluster_library::{cluster, AttributeValue};

use super::{CommandResult, HandlerResult, Inbound};
use crate::attribute_store::{Access, AttributeRecord, Role, WriteOrigin};
use crate::callback::DeviceHandler;
use crate::ClusterLibraryService;

/// Attributes of an on/off server
pub fn server_attributes(on: bool) -> [AttributeRecord; 1] {
    [AttributeRecord::read_only(ATTR_ON_OFF, AttributeValue::Boolean(on)).with_access(
        Access::REPORTABLE | Access::SCENE | Access::NON_VOLATILE,
    )]
}

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    pub(crate) fn handle_on_off(&mut self, inbound: &Inbound) -> CommandResult {
        let command = match OnOffCommand::try_from(inbound.header.command) {
            Ok(command) => command,
            Err(_) => return Ok(HandlerResult::NotHandled),
        };
        let on = command.apply(self.is_on(inbound.endpoint));
        log::info!("> {:?} endpoint {}, on {}", command, inbound.endpoint, on);
        self.write_local(
            inbound.endpoint,
            cluster::ON_OFF,
            Role::Server,
            ATTR_ON_OFF,
            None,
            AttributeValue::Boolean(on),
            WriteOrigin::Local,
        )?;
        Ok(HandlerResult::Handled)
    }

    /// State of the on/off server of an endpoint
    pub fn is_on(&self, endpoint: u8) -> bool {
        matches!(
            self.store.read(
                endpoint,
                cluster::ON_OFF,
                Role::Server,
                ATTR_ON_OFF,
                None,
                WriteOrigin::Local
            ),
            Ok(AttributeValue::Boolean(true))
        )
    }
}
