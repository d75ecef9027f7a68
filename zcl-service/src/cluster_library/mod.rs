//! Cluster library dispatch
//!
//! Profile wide commands go to the foundation handlers, cluster specific
//! commands to the built-in cluster handlers. Commands without a built-in
//! handler are passed to the application.

pub mod basic;
pub mod drlc;
pub mod energy_management;
pub mod foundation;
pub mod groups;
pub mod level_control;
pub mod on_off;
pub mod scenes;
pub mod wwah;

use zcl_data::cluster_library::{
    cluster, ClusterIdentifier, ClusterLibraryHeader, ClusterLibraryStatus,
};

use crate::aps::ApsIndication;
use crate::attribute_store::Role;
use crate::callback::{CallbackStatus, DeviceEvent, DeviceHandler};
use crate::ClusterLibraryService;

/// Outcome of a command handler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// Handled, a default response reports success
    Handled,
    /// Handled, a specific response has been or will be sent
    HandledWillRespond,
    /// Handled, a default response reports the status
    HandledWithError(ClusterLibraryStatus),
    /// No handler for the command
    NotHandled,
}

pub(crate) type CommandResult = Result<HandlerResult, ClusterLibraryStatus>;

/// Frame delivered to one endpoint
#[derive(Clone, Copy, Debug)]
pub struct Inbound<'p> {
    /// Indication of the frame
    pub indication: ApsIndication,
    /// Receiving endpoint
    pub endpoint: u8,
    /// Receiving role
    pub role: Role,
    /// Frame header
    pub header: ClusterLibraryHeader,
    /// Command payload
    pub payload: &'p [u8],
}

impl<'p> Inbound<'p> {
    /// Cluster of the frame
    pub fn cluster(&self) -> ClusterIdentifier {
        self.indication.cluster
    }

    /// True when sent to this device only
    pub fn is_unicast(&self) -> bool {
        self.indication.is_unicast()
    }
}

pub(crate) fn malformed(err: zcl_data::Error) -> ClusterLibraryStatus {
    log::warn!("> Malformed payload, {:?}", err);
    ClusterLibraryStatus::MalformedCommand
}

const SCENES_COMMANDS: &[u8] = &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x40, 0x41, 0x42];
const SCENES_RESPONSES: &[u8] = &[0x00, 0x01, 0x02, 0x03, 0x04, 0x06, 0x40, 0x41, 0x42];
const WWAH_COMMANDS: &[u8] = &[
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
    0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d,
    0x1e, 0x1f,
];
const WWAH_RESPONSES: &[u8] = &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];

/// Commands a cluster instance receives or, with `generated`, sends
pub fn command_table(cluster: ClusterIdentifier, role: Role, generated: bool) -> &'static [u8] {
    match (cluster, role, generated) {
        (cluster::BASIC, Role::Server, false) => &[0x00],
        (cluster::GROUPS, Role::Server, false) => &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05],
        (cluster::GROUPS, Role::Server, true) => &[0x00, 0x01, 0x02, 0x03],
        (cluster::SCENES, Role::Server, false) => SCENES_COMMANDS,
        (cluster::SCENES, Role::Server, true) => SCENES_RESPONSES,
        (cluster::ON_OFF, Role::Server, false) => &[0x00, 0x01, 0x02],
        (cluster::LEVEL_CONTROL, Role::Server, false) => {
            &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]
        }
        (cluster::DEMAND_RESPONSE, Role::Client, false) => &[0x00, 0x01, 0x02],
        (cluster::DEMAND_RESPONSE, Role::Client, true) => &[0x00, 0x01],
        (cluster::DEMAND_RESPONSE, Role::Server, false) => &[0x00, 0x01],
        (cluster::DEMAND_RESPONSE, Role::Server, true) => &[0x00, 0x01, 0x02],
        (cluster::ENERGY_MANAGEMENT, Role::Server, false) => &[0x00],
        (cluster::ENERGY_MANAGEMENT, Role::Server, true) => &[0x00],
        (cluster::WORKS_WITH_ALL_HUBS, Role::Server, false) => WWAH_COMMANDS,
        (cluster::WORKS_WITH_ALL_HUBS, Role::Server, true) => WWAH_RESPONSES,
        _ => &[],
    }
}

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    /// Run the handler of a frame
    pub(crate) fn dispatch(&mut self, inbound: &Inbound) -> HandlerResult {
        let result = if inbound.header.is_global() {
            self.handle_foundation(inbound)
        } else {
            self.handle_cluster_command(inbound)
        };
        match result {
            Ok(result) => result,
            Err(status) => HandlerResult::HandledWithError(status),
        }
    }

    fn handle_cluster_command(&mut self, inbound: &Inbound) -> CommandResult {
        let manufacturer = self
            .store
            .cluster(inbound.endpoint, inbound.cluster(), inbound.role)
            .and_then(|c| c.manufacturer);
        if let Some(code) = inbound.header.manufacturer {
            if manufacturer != Some(code) {
                return Err(ClusterLibraryStatus::UnsupportedManufacturerClusterCommand);
            }
        }
        let result = match (inbound.cluster(), inbound.role) {
            (cluster::BASIC, Role::Server) => self.handle_basic(inbound)?,
            (cluster::GROUPS, Role::Server) => self.handle_groups(inbound)?,
            (cluster::SCENES, Role::Server) => self.handle_scenes(inbound)?,
            (cluster::ON_OFF, Role::Server) => self.handle_on_off(inbound)?,
            (cluster::LEVEL_CONTROL, Role::Server) => self.handle_level_control(inbound)?,
            (cluster::DEMAND_RESPONSE, Role::Client) => self.handle_load_control_client(inbound)?,
            (cluster::DEMAND_RESPONSE, Role::Server) => self.handle_load_control_server(inbound)?,
            (cluster::ENERGY_MANAGEMENT, Role::Server) => {
                self.handle_energy_management(inbound)?
            }
            (cluster::WORKS_WITH_ALL_HUBS, Role::Server) => self.handle_wwah(inbound)?,
            _ => HandlerResult::NotHandled,
        };
        if result == HandlerResult::NotHandled {
            Ok(self.forward_command(inbound))
        } else {
            Ok(result)
        }
    }

    /// Pass a cluster command to the application
    fn forward_command(&mut self, inbound: &Inbound) -> HandlerResult {
        let (status, _) = self.notify(
            inbound.endpoint,
            CallbackStatus::NotFound,
            DeviceEvent::ClusterCommand {
                cluster: inbound.cluster(),
                role: inbound.role,
                header: inbound.header,
                payload: inbound.payload,
            },
        );
        match status {
            CallbackStatus::NotFound => {
                log::info!(
                    "> Unsupported command {:02x} cluster {:04x}",
                    inbound.header.command,
                    inbound.cluster()
                );
                let status = if inbound.header.manufacturer.is_some() {
                    ClusterLibraryStatus::UnsupportedManufacturerClusterCommand
                } else {
                    ClusterLibraryStatus::UnsupportedClusterCommand
                };
                HandlerResult::HandledWithError(status)
            }
            other => match other.response_status() {
                Some(ClusterLibraryStatus::Success) => HandlerResult::Handled,
                Some(status) => HandlerResult::HandledWithError(status),
                None => HandlerResult::HandledWillRespond,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tables() {
        assert_eq!(command_table(cluster::ON_OFF, Role::Server, false), [0, 1, 2]);
        assert!(command_table(cluster::ON_OFF, Role::Server, true).is_empty());
        assert_eq!(command_table(cluster::WORKS_WITH_ALL_HUBS, Role::Server, false).len(), 32);
        assert!(command_table(cluster::SCENES, Role::Server, false).contains(&0x42));
        assert!(command_table(cluster::SCENES, Role::Client, false).is_empty());
    }
}
