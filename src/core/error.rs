use std::{error, fmt};

/// Errors reported by the patch codec.
///
/// Decoding never produces one of these: missing or unknown wire data falls back to defaults.
/// They show up when an edit can't be put on the wire (a skipped send), when a SysEx frame is
/// rejected at the boundary, or when a topology breaks its invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    InvalidTopology { id: String, reason: String },
    InvalidAlgorithm(usize),
    UnknownOperator(u8),
    NotACarrier { operator: u8 },
    CarrierSlotUnavailable { operator: u8, carrier_index: usize },
    NoModulationSlot { from: u8, to: u8 },
    InvalidMatrixRow(usize),
    InvalidLfo(usize),
    InvalidSysexFrame(String),
    UnsupportedSysex(String),
}

impl error::Error for CodecError {}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTopology { id, reason } => write!(f, "Topology {id} is invalid: {reason}"),
            Self::InvalidAlgorithm(index) => write!(f, "No algorithm with index {index}"),
            Self::UnknownOperator(id) => write!(f, "Operator {id} is not part of the algorithm"),
            Self::NotACarrier { operator } => {
                write!(f, "Operator {operator} is not a carrier and has no mix/pan control")
            }
            Self::CarrierSlotUnavailable {
                operator,
                carrier_index,
            } => write!(
                f,
                "Operator {operator} is carrier #{} and only the first 4 carriers have mix/pan controls",
                carrier_index + 1
            ),
            Self::NoModulationSlot { from, to } => {
                write!(f, "No IM slot for modulation {from} -> {to} in this algorithm")
            }
            Self::InvalidMatrixRow(row) => write!(f, "Matrix row {row} out of range"),
            Self::InvalidLfo(index) => write!(f, "LFO {index} out of range"),
            Self::InvalidSysexFrame(str) => write!(f, "Invalid SysEx frame: {str}"),
            Self::UnsupportedSysex(str) => write!(f, "Unsupported SysEx message: {str}"),
        }
    }
}
