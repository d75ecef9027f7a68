//! Basic server

use zcl_data::cluster_library::basic::{
    PowerSource, ATTR_APPLICATION_VERSION, ATTR_DATE_CODE, ATTR_DEVICE_ENABLED,
    ATTR_HARDWARE_VERSION, ATTR_LOCATION_DESCRIPTION, ATTR_MANUFACTURER_NAME,
    ATTR_MODEL_IDENTIFIER, ATTR_PHYSICAL_ENVIRONMENT, ATTR_POWER_SOURCE,
    ATTR_SOFTWARE_BUILD_IDENTIFIER, ATTR_STACK_VERSION, ATTR_ZCL_VERSION,
    CMD_RESET_TO_FACTORY_DEFAULTS, ZCL_VERSION,
};
use zcl_data::cluster_library::AttributeValue;
use zcl_data::CharacterString;

use super::{CommandResult, HandlerResult, Inbound};
use crate::attribute_store::{Access, AttributeRecord};
use crate::callback::{CallbackStatus, DeviceEvent, DeviceHandler};
use crate::wwah::WwahPolicy;
use crate::ClusterLibraryService;

/// Product information published by the basic server
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BasicInformation<'s> {
    /// Application version
    pub application_version: u8,
    /// Stack version
    pub stack_version: u8,
    /// Hardware version
    pub hardware_version: u8,
    /// Manufacturer name
    pub manufacturer_name: &'s str,
    /// Model identifier
    pub model_identifier: &'s str,
    /// Date code, YYYYMMDD
    pub date_code: &'s str,
    /// Software build identifier
    pub software_build: &'s str,
    /// Power source
    pub power_source: PowerSource,
}

impl<'s> Default for BasicInformation<'s> {
    fn default() -> Self {
        Self {
            application_version: 0,
            stack_version: 0,
            hardware_version: 0,
            manufacturer_name: "",
            model_identifier: "",
            date_code: "",
            software_build: "",
            power_source: PowerSource::Unknown,
        }
    }
}

/// Character string value, longer text is cut
fn text(value: &str) -> AttributeValue {
    let mut string = CharacterString::new();
    for c in value.chars() {
        if string.push(c).is_err() {
            break;
        }
    }
    AttributeValue::CharacterString(string)
}

impl<'s> BasicInformation<'s> {
    /// Attributes of a basic server
    pub fn server_attributes(&self) -> [AttributeRecord; 12] {
        [
            AttributeRecord::read_only(ATTR_ZCL_VERSION, AttributeValue::Unsigned8(ZCL_VERSION)),
            AttributeRecord::read_only(
                ATTR_APPLICATION_VERSION,
                AttributeValue::Unsigned8(self.application_version),
            ),
            AttributeRecord::read_only(
                ATTR_STACK_VERSION,
                AttributeValue::Unsigned8(self.stack_version),
            ),
            AttributeRecord::read_only(
                ATTR_HARDWARE_VERSION,
                AttributeValue::Unsigned8(self.hardware_version),
            ),
            AttributeRecord::read_only(ATTR_MANUFACTURER_NAME, text(self.manufacturer_name)),
            AttributeRecord::read_only(ATTR_MODEL_IDENTIFIER, text(self.model_identifier)),
            AttributeRecord::read_only(ATTR_DATE_CODE, text(self.date_code)),
            AttributeRecord::read_only(
                ATTR_POWER_SOURCE,
                AttributeValue::Enumeration8(self.power_source.into()),
            ),
            AttributeRecord::writable(ATTR_LOCATION_DESCRIPTION, text(""))
                .with_access(Access::NON_VOLATILE),
            AttributeRecord::writable(ATTR_PHYSICAL_ENVIRONMENT, AttributeValue::Enumeration8(0))
                .with_access(Access::NON_VOLATILE),
            AttributeRecord::writable(ATTR_DEVICE_ENABLED, AttributeValue::Boolean(true))
                .with_access(Access::NON_VOLATILE),
            AttributeRecord::read_only(ATTR_SOFTWARE_BUILD_IDENTIFIER, text(self.software_build)),
        ]
    }
}

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    pub(crate) fn handle_basic(&mut self, inbound: &Inbound) -> CommandResult {
        match inbound.header.command {
            CMD_RESET_TO_FACTORY_DEFAULTS => {
                log::info!("> Reset to factory defaults from {}", inbound.indication.source);
                self.reset_to_factory_defaults(inbound.endpoint);
                Ok(HandlerResult::Handled)
            }
            _ => Ok(HandlerResult::NotHandled),
        }
    }

    /// Restore the attribute defaults of every endpoint and forget groups,
    /// scenes, reporting configurations, load control events and the WWAH
    /// policy
    pub fn reset_to_factory_defaults(&mut self, endpoint: u8) {
        let endpoints: heapless::Vec<u8, { crate::attribute_store::MAX_ENDPOINTS }> =
            self.store.endpoints().iter().map(|e| e.endpoint).collect();
        for local in endpoints {
            self.cvc.stop_endpoint(local);
        }
        let _ = self.cvc.take_events();
        self.store.reset_to_defaults();
        self.scenes.clear();
        self.pending_recalls.clear();
        self.groups.clear();
        self.reporting.clear();
        self.drlc.clear();
        self.policy = WwahPolicy::new(&self.config.wwah);
        self.rejoin = None;
        self.notify(
            endpoint,
            CallbackStatus::Ok,
            DeviceEvent::ResetToFactoryDefaults,
        );
    }
}
