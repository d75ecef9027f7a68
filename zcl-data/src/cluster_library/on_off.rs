//! # On/Off Cluster

/// On/Off attribute, on off state
pub const ATTR_ON_OFF: u16 = 0x0000;

extended_enum!(
    /// On/Off command identifiers
    OnOffCommand, u8,
    /// Switch off
    Off => 0x00,
    /// Switch on
    On => 0x01,
    /// Toggle the state
    Toggle => 0x02,
);

impl OnOffCommand {
    /// The state after applying the command to `current`
    pub fn apply(self, current: bool) -> bool {
        match self {
            OnOffCommand::Off => false,
            OnOffCommand::On => true,
            OnOffCommand::Toggle => !current,
        }
    }
}
