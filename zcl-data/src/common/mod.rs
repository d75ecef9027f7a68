//! # Common structs and functions
//!
//! Addresses and string types shared by the cluster library codecs.

pub mod address;
pub mod types;
