use crate::utils::helpers::{join_14bit, split_14bit};

pub const CC_DATA_ENTRY_MSB: u8 = 6;
pub const CC_DATA_ENTRY_LSB: u8 = 38;
pub const CC_NRPN_LSB: u8 = 98;
pub const CC_NRPN_MSB: u8 = 99;

/// One NRPN write: a 14-bit parameter number and a 14-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nrpn {
    pub param_msb: u8,
    pub param_lsb: u8,
    pub value: u16,
}

impl Nrpn {
    pub fn new(param_msb: u8, param_lsb: u8, value: u16) -> Self {
        Self {
            param_msb: param_msb & 0x7F,
            param_lsb: param_lsb & 0x7F,
            value: value & 0x3FFF,
        }
    }

    /// Build from a combined `(msb << 7) | lsb` address.
    pub fn at(index: u16, value: u16) -> Self {
        let (msb, lsb) = split_14bit(index);
        Self::new(msb, lsb, value)
    }

    pub fn from_parts(param_msb: u8, param_lsb: u8, value_msb: u8, value_lsb: u8) -> Self {
        Self::new(param_msb, param_lsb, join_14bit(value_msb, value_lsb))
    }

    pub fn index(&self) -> u16 {
        join_14bit(self.param_msb, self.param_lsb)
    }

    pub fn value_msb(&self) -> u8 {
        split_14bit(self.value).0
    }

    pub fn value_lsb(&self) -> u8 {
        split_14bit(self.value).1
    }

    /// The four control changes that carry this write, in wire order.
    pub fn control_changes(&self) -> [(u8, u8); 4] {
        [
            (CC_NRPN_MSB, self.param_msb),
            (CC_NRPN_LSB, self.param_lsb),
            (CC_DATA_ENTRY_MSB, self.value_msb()),
            (CC_DATA_ENTRY_LSB, self.value_lsb()),
        ]
    }
}

/// Something the codec wants to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    ControlChange { controller: u8, value: u8 },
    Nrpn(Nrpn),
    SysEx(Vec<u8>),
}

impl WireMessage {
    /// Raw MIDI bytes for this message. `channel` is 0-based.
    pub fn to_bytes(&self, channel: u8) -> Vec<u8> {
        let status = 0xB0 | (channel & 0x0F);
        match self {
            Self::ControlChange { controller, value } => {
                vec![status, controller & 0x7F, value & 0x7F]
            }
            Self::Nrpn(nrpn) => nrpn
                .control_changes()
                .iter()
                .flat_map(|(controller, value)| [status, *controller, *value])
                .collect(),
            Self::SysEx(bytes) => bytes.clone(),
        }
    }
}

impl From<Nrpn> for WireMessage {
    fn from(nrpn: Nrpn) -> Self {
        Self::Nrpn(nrpn)
    }
}

/// Inbound message, as far as the editor cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    ControlChange { channel: u8, controller: u8, value: u8 },
    SysEx(Vec<u8>),
}

/// Parse raw MIDI bytes. Anything other than control changes and SysEx is ignored.
pub fn parse_midi_message(data: &[u8]) -> Option<MidiMessage> {
    let status_byte = *data.first()?;

    if status_byte == 0xF0 {
        return Some(MidiMessage::SysEx(data.to_vec()));
    }

    match status_byte & 0xF0 {
        0xB0 if data.len() >= 3 => Some(MidiMessage::ControlChange {
            channel: status_byte & 0x0F,
            controller: data[1] & 0x7F,
            value: data[2] & 0x7F,
        }),
        _ => None,
    }
}
