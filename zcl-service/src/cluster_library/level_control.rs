//! Level control server
//!
//! Level changes run on the value transition engine. The with on/off
//! variants switch the light on before moving up and off when a move ends
//! at the minimum level.

use core::convert::TryFrom;

use zcl_data::cluster_library::level_control::{
    LevelControlCommand, Move, MoveMode, MoveToLevel, Step, ATTR_CURRENT_LEVEL, ATTR_MAX_LEVEL,
    ATTR_MIN_LEVEL, ATTR_ON_LEVEL, ATTR_ON_OFF_TRANSITION_TIME, ATTR_REMAINING_TIME,
    MAXIMUM_LEVEL, MINIMUM_LEVEL,
};
use zcl_data::cluster_library::on_off::ATTR_ON_OFF;
use zcl_data::cluster_library::{cluster, AttributeIdentifier, AttributeValue, ClusterLibraryStatus};
use zcl_data::pack::Pack;

use super::{malformed, CommandResult, HandlerResult, Inbound};
use crate::attribute_store::{Access, AttributeRecord, Role, WriteOrigin};
use crate::callback::DeviceHandler;
use crate::cvc::{TransitionOwner, TransitionRequest, TransitionStatus, TRANSITION_TIME_IMMEDIATE};
use crate::ClusterLibraryService;

/// Move to level transition time meaning "use the on/off transition time"
const DEFAULT_TRANSITION_TIME: u16 = 0xffff;

/// Attributes of a level control server
pub fn server_attributes(level: u8) -> [AttributeRecord; 6] {
    [
        AttributeRecord::read_only(ATTR_CURRENT_LEVEL, AttributeValue::Unsigned8(level))
            .with_limits(i64::from(MINIMUM_LEVEL), i64::from(MAXIMUM_LEVEL))
            .with_access(Access::REPORTABLE | Access::SCENE | Access::NON_VOLATILE),
        AttributeRecord::read_only(ATTR_REMAINING_TIME, AttributeValue::Unsigned16(0)),
        AttributeRecord::read_only(ATTR_MIN_LEVEL, AttributeValue::Unsigned8(MINIMUM_LEVEL)),
        AttributeRecord::read_only(ATTR_MAX_LEVEL, AttributeValue::Unsigned8(MAXIMUM_LEVEL)),
        AttributeRecord::writable(ATTR_ON_OFF_TRANSITION_TIME, AttributeValue::Unsigned16(0)),
        AttributeRecord::writable(ATTR_ON_LEVEL, AttributeValue::Unsigned8(0xff)),
    ]
}

/// Transition time of a move at `rate` units per second, tenths
fn move_time(current: i64, target: i64, rate: u8) -> u16 {
    let distance = (target - current).unsigned_abs();
    (distance * 10 / u64::from(rate)).min(u64::from(TRANSITION_TIME_IMMEDIATE - 1)) as u16
}

impl<'a, H: DeviceHandler, const N: usize> ClusterLibraryService<'a, H, N> {
    fn level_attribute(&self, endpoint: u8, attribute: AttributeIdentifier) -> Option<i64> {
        self.store
            .read(
                endpoint,
                cluster::LEVEL_CONTROL,
                Role::Server,
                attribute,
                None,
                WriteOrigin::Local,
            )
            .ok()
            .and_then(AttributeValue::as_integer)
    }

    fn level_limits(&self, endpoint: u8) -> (i64, i64) {
        let minimum = self
            .level_attribute(endpoint, ATTR_MIN_LEVEL)
            .unwrap_or_else(|| i64::from(MINIMUM_LEVEL))
            .max(i64::from(MINIMUM_LEVEL));
        let maximum = self
            .level_attribute(endpoint, ATTR_MAX_LEVEL)
            .unwrap_or_else(|| i64::from(MAXIMUM_LEVEL))
            .min(i64::from(MAXIMUM_LEVEL));
        (minimum, maximum.max(minimum))
    }

    pub(crate) fn handle_level_control(&mut self, inbound: &Inbound) -> CommandResult {
        let command = match LevelControlCommand::try_from(inbound.header.command) {
            Ok(command) => command,
            Err(_) => return Ok(HandlerResult::NotHandled),
        };
        let endpoint = inbound.endpoint;
        let with_on_off = command.with_on_off();
        let current = self
            .level_attribute(endpoint, ATTR_CURRENT_LEVEL)
            .ok_or(ClusterLibraryStatus::UnsupportedAttribute)?;
        let (minimum, maximum) = self.level_limits(endpoint);
        log::info!("> {:?} endpoint {}, level {}", command, endpoint, current);
        let (target, time) = match command {
            LevelControlCommand::MoveToLevel | LevelControlCommand::MoveToLevelWithOnOff => {
                let (request, _) = MoveToLevel::unpack(inbound.payload).map_err(malformed)?;
                let time = if request.transition_time == DEFAULT_TRANSITION_TIME {
                    self.level_attribute(endpoint, ATTR_ON_OFF_TRANSITION_TIME)
                        .unwrap_or(0) as u16
                } else {
                    request.transition_time
                };
                (i64::from(request.level), time)
            }
            LevelControlCommand::Move | LevelControlCommand::MoveWithOnOff => {
                let (request, _) = Move::unpack(inbound.payload).map_err(malformed)?;
                if request.rate == 0 {
                    return Ok(HandlerResult::Handled);
                }
                let target = match request.mode {
                    MoveMode::Up => maximum,
                    MoveMode::Down => minimum,
                };
                (target, move_time(current, target, request.rate))
            }
            LevelControlCommand::Step | LevelControlCommand::StepWithOnOff => {
                let (request, _) = Step::unpack(inbound.payload).map_err(malformed)?;
                let target = match request.mode {
                    MoveMode::Up => current + i64::from(request.size),
                    MoveMode::Down => current - i64::from(request.size),
                };
                (target, request.transition_time)
            }
            LevelControlCommand::Stop | LevelControlCommand::StopWithOnOff => {
                self.cvc
                    .stop(endpoint, cluster::LEVEL_CONTROL, ATTR_CURRENT_LEVEL);
                return Ok(HandlerResult::Handled);
            }
        };
        let target = target.clamp(minimum, maximum);
        if with_on_off && target > minimum {
            self.set_attribute(
                endpoint,
                cluster::ON_OFF,
                Role::Server,
                ATTR_ON_OFF,
                AttributeValue::Boolean(true),
            );
        }
        let request = TransitionRequest {
            endpoint,
            cluster: cluster::LEVEL_CONTROL,
            attribute: ATTR_CURRENT_LEVEL,
            current,
            end: target,
            minimum,
            maximum,
            overlap: false,
            transition_time: time,
            owner: TransitionOwner::LevelControl { with_on_off },
        };
        let now = self.now();
        self.cvc.start(request, now).map_err(|err| {
            log::warn!("> Level transition refused, {:?}", err);
            ClusterLibraryStatus::InsufficientSpace
        })?;
        Ok(HandlerResult::Handled)
    }

    /// A level transition ended, a with on/off move ending at the minimum
    /// level switches the light off
    pub(crate) fn level_transition_finished(
        &mut self,
        endpoint: u8,
        owner: TransitionOwner,
        status: TransitionStatus,
    ) {
        if owner != (TransitionOwner::LevelControl { with_on_off: true })
            || status != TransitionStatus::Completed
        {
            return;
        }
        let (minimum, _) = self.level_limits(endpoint);
        if self.level_attribute(endpoint, ATTR_CURRENT_LEVEL) == Some(minimum) {
            self.set_attribute(
                endpoint,
                cluster::ON_OFF,
                Role::Server,
                ATTR_ON_OFF,
                AttributeValue::Boolean(false),
            );
        }
    }
}
