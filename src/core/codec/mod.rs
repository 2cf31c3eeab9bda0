//! NRPN/SysEx patch codec.
//!
//! Inbound: wire bytes feed an [`NrpnAccumulator`], and [`assemble_patch`] turns its address
//! map into a [`Patch`](crate::core::patch::Patch). Outbound: [`CommandEncoder`] turns a
//! [`PatchEdit`](crate::core::patch::PatchEdit) into wire messages, and [`encode_patch`] emits a
//! whole patch.

pub mod accumulator;
pub mod assembler;
pub mod encoder;
pub mod layout;
pub mod sysex;

pub use accumulator::NrpnAccumulator;
pub use assembler::{assemble_patch, AssembleOptions};
pub use encoder::{dump_request, encode_patch, CommandEncoder};
pub use sysex::{decode_patch_sysex, encode_patch_sysex, is_valid_frame, SysexFrame};
