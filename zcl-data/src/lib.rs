//! # ZCL data - Zigbee cluster library wire types
//!
//! This crate contains the frame format, attribute types and the command
//! payloads of the Zigbee cluster library.
//!

#![warn(missing_docs)]
#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate bitflags;

#[macro_use]
mod utils;

pub mod cluster_library; // ZCL
pub mod common;
pub mod error;
pub mod pack;

pub use common::address::{GroupIdentifier, ShortAddress, TRUST_CENTER_ADDRESS};
pub use common::types::{CharacterString, OctetString};
pub use error::Error;
