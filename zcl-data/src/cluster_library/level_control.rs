//! # Level Control Cluster

use core::convert::TryFrom;

use crate::pack::{Pack, Reader, Writer};
use crate::Error;

/// Level control attribute, current level
pub const ATTR_CURRENT_LEVEL: u16 = 0x0000;
/// Level control attribute, remaining time of the running transition
pub const ATTR_REMAINING_TIME: u16 = 0x0001;
/// Level control attribute, minimum level
pub const ATTR_MIN_LEVEL: u16 = 0x0002;
/// Level control attribute, maximum level
pub const ATTR_MAX_LEVEL: u16 = 0x0003;
/// Level control attribute, on off transition time
pub const ATTR_ON_OFF_TRANSITION_TIME: u16 = 0x0010;
/// Level control attribute, on level
pub const ATTR_ON_LEVEL: u16 = 0x0011;

/// Lowest level of the current level attribute
pub const MINIMUM_LEVEL: u8 = 0x01;
/// Highest level of the current level attribute
pub const MAXIMUM_LEVEL: u8 = 0xfe;

extended_enum!(
    /// Level control command identifiers
    LevelControlCommand, u8,
    MoveToLevel => 0x00,
    Move => 0x01,
    Step => 0x02,
    Stop => 0x03,
    MoveToLevelWithOnOff => 0x04,
    MoveWithOnOff => 0x05,
    StepWithOnOff => 0x06,
    StopWithOnOff => 0x07,
);

impl LevelControlCommand {
    /// True for the variants that also drive the On/Off cluster
    pub fn with_on_off(self) -> bool {
        matches!(
            self,
            LevelControlCommand::MoveToLevelWithOnOff
                | LevelControlCommand::MoveWithOnOff
                | LevelControlCommand::StepWithOnOff
                | LevelControlCommand::StopWithOnOff
        )
    }
}

extended_enum!(
    /// Direction of move and step
    MoveMode, u8,
    /// Increase level
    Up => 0x00,
    /// Decrease level
    Down => 0x01,
);

/// Move to level request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveToLevel {
    /// Target level
    pub level: u8,
    /// Transition time in tenths of a second, 0xffff use the default
    pub transition_time: u16,
}

impl Pack<MoveToLevel, Error> for MoveToLevel {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(self.level)?;
        writer.write_u16(self.transition_time)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let level = reader.read_u8()?;
        let transition_time = reader.read_u16()?;
        Ok((
            Self {
                level,
                transition_time,
            },
            reader.position(),
        ))
    }
}

/// Move request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Move {
    /// Direction
    pub mode: MoveMode,
    /// Rate in units per second, 0xff use the default
    pub rate: u8,
}

impl Pack<Move, Error> for Move {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(u8::from(self.mode))?;
        writer.write_u8(self.rate)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let mode = MoveMode::try_from(reader.read_u8()?)?;
        let rate = reader.read_u8()?;
        Ok((Self { mode, rate }, reader.position()))
    }
}

/// Step request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    /// Direction
    pub mode: MoveMode,
    /// Step size
    pub size: u8,
    /// Transition time in tenths of a second
    pub transition_time: u16,
}

impl Pack<Step, Error> for Step {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(u8::from(self.mode))?;
        writer.write_u8(self.size)?;
        writer.write_u16(self.transition_time)?;
        Ok(writer.position())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let mode = MoveMode::try_from(reader.read_u8()?)?;
        let size = reader.read_u8()?;
        let transition_time = reader.read_u16()?;
        Ok((
            Self {
                mode,
                size,
                transition_time,
            },
            reader.position(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_move_to_level() {
        // trailing options mask and override are ignored
        let data = [0x80, 0x0a, 0x00, 0x00, 0x00];
        let (cmd, used) = MoveToLevel::unpack(&data).unwrap();
        assert_eq!(used, 3);
        assert_eq!(cmd.level, 0x80);
        assert_eq!(cmd.transition_time, 10);
    }

    #[test]
    fn unpack_step() {
        let (cmd, _) = Step::unpack(&[0x01, 0x20, 0xff, 0xff]).unwrap();
        assert_eq!(cmd.mode, MoveMode::Down);
        assert_eq!(cmd.size, 0x20);
        assert_eq!(cmd.transition_time, 0xffff);
        assert_eq!(Move::unpack(&[0x02, 0x10]), Err(Error::InvalidValue));
    }

    #[test]
    fn with_on_off_variants() {
        assert!(LevelControlCommand::StepWithOnOff.with_on_off());
        assert!(!LevelControlCommand::Stop.with_on_off());
    }
}
