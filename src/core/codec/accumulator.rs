use std::collections::BTreeMap;

use crate::core::midi::message::{
    Nrpn, CC_DATA_ENTRY_LSB, CC_DATA_ENTRY_MSB, CC_NRPN_LSB, CC_NRPN_MSB,
};
use crate::core::patch::PRESET_NAME_LENGTH;
use crate::utils::helpers::join_14bit;

use super::layout;

/// Half-received NRPN quad.
#[derive(Debug, Clone, Copy, Default)]
struct PendingNrpn {
    param_msb: Option<u8>,
    param_lsb: Option<u8>,
    value_msb: Option<u8>,
}

/// Collects an NRPN stream into a sparse `address -> value` map.
///
/// Preset name characters arrive as ordinary writes to `(1, 100..=111)` and are kept apart
/// from the generic map. Nothing is ever rejected: unknown addresses are stored and left for
/// the assembler to ignore.
#[derive(Debug, Clone, Default)]
pub struct NrpnAccumulator {
    values: BTreeMap<u16, u16>,
    name: [Option<char>; PRESET_NAME_LENGTH],
    pending: PendingNrpn,
}

impl NrpnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one complete NRPN write. Last write to an address wins.
    pub fn add_message(&mut self, param_msb: u8, param_lsb: u8, value_msb: u8, value_lsb: u8) {
        let (param_msb, param_lsb) = (param_msb & 0x7F, param_lsb & 0x7F);
        let value = join_14bit(value_msb, value_lsb);

        if layout::is_preset_name(param_msb, param_lsb) {
            let position = (param_lsb - layout::PRESET_NAME_LSB) as usize;
            self.name[position] = Some(char::from((value & 0x7F) as u8));
            return;
        }

        self.values.insert(join_14bit(param_msb, param_lsb), value);
    }

    pub fn add_nrpn(&mut self, nrpn: &Nrpn) {
        self.add_message(
            nrpn.param_msb,
            nrpn.param_lsb,
            nrpn.value_msb(),
            nrpn.value_lsb(),
        );
    }

    /// Feed a single control change. The four NRPN controllers are assembled into a quad and
    /// committed when the value LSB (CC 38) arrives; any other controller is ignored here.
    /// Returns the write when one completes.
    pub fn add_control_change(&mut self, controller: u8, value: u8) -> Option<Nrpn> {
        let value = value & 0x7F;
        match controller & 0x7F {
            CC_NRPN_MSB => {
                self.pending = PendingNrpn {
                    param_msb: Some(value),
                    ..PendingNrpn::default()
                };
                None
            }
            CC_NRPN_LSB => {
                self.pending.param_lsb = Some(value);
                self.pending.value_msb = None;
                None
            }
            CC_DATA_ENTRY_MSB => {
                self.pending.value_msb = Some(value);
                None
            }
            CC_DATA_ENTRY_LSB => {
                let PendingNrpn {
                    param_msb: Some(param_msb),
                    param_lsb: Some(param_lsb),
                    value_msb,
                } = self.pending
                else {
                    return None;
                };
                // Data entry without a value MSB carries the LSB alone.
                let nrpn = Nrpn::from_parts(param_msb, param_lsb, value_msb.unwrap_or(0), value);
                self.add_nrpn(&nrpn);
                self.pending.value_msb = None;
                Some(nrpn)
            }
            _ => None,
        }
    }

    /// The preset name: positional characters joined, cut at the first NUL, trimmed.
    pub fn preset_name(&self) -> String {
        let joined: String = self.name.iter().flatten().collect();
        let terminated = match joined.find('\0') {
            Some(end) => &joined[..end],
            None => &joined[..],
        };
        terminated.trim().to_string()
    }

    pub fn value(&self, param_msb: u8, param_lsb: u8) -> Option<u16> {
        self.value_at(join_14bit(param_msb, param_lsb))
    }

    pub fn value_at(&self, index: u16) -> Option<u16> {
        self.values.get(&index).copied()
    }

    /// Raw value rescaled linearly from `0..=16383` into `min..=max`; `min` when never written.
    pub fn scaled_value(&self, param_msb: u8, param_lsb: u8, min: f32, max: f32) -> f32 {
        match self.value(param_msb, param_lsb) {
            Some(raw) => min + (max - min) * raw as f32 / 16383.0,
            None => min,
        }
    }

    /// Number of generic addresses written.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.name.iter().all(Option::is_none)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
