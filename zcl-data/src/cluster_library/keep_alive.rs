//! # Keep-Alive Cluster
//!
//! Hosted by the Trust Center, read by devices doing periodic check-ins.

/// Keep-alive attribute, base interval in minutes
pub const ATTR_TC_KEEP_ALIVE_BASE: u16 = 0x0000;
/// Keep-alive attribute, jitter in seconds
pub const ATTR_TC_KEEP_ALIVE_JITTER: u16 = 0x0001;

/// Default base interval, minutes
pub const DEFAULT_KEEP_ALIVE_BASE: u8 = 0x0a;
/// Default jitter, seconds
pub const DEFAULT_KEEP_ALIVE_JITTER: u16 = 0x012c;
