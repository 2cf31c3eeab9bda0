//! Patch editor core for the PreenFM3 FM synthesizer.
//!
//! The [`core::codec`] module turns NRPN dumps into [`core::Patch`] values and patch edits back
//! into NRPN/CC messages. [`core::midi`] binds that to real ports through midir, and
//! [`messaging`] keeps an editable patch in sync with the device.

pub mod config;
pub mod core;
pub mod messaging;
pub mod utils;
