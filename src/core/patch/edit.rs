use serde::{Deserialize, Serialize};

use super::lfo::Lfo;
use super::modulation::MatrixRow;
use super::operator::{Adsr, KeyboardTracking, Waveform};

/// A single change the editor wants to make to the current patch.
///
/// The same value is applied locally with [`Patch::apply`](super::Patch::apply) and turned into
/// wire messages with [`CommandEncoder::encode`](crate::core::codec::CommandEncoder::encode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatchEdit {
    SelectAlgorithm(usize),
    OperatorEnabled { operator: u8, enabled: bool },
    Waveform { operator: u8, waveform: Waveform },
    Frequency { operator: u8, frequency: f32 },
    Detune { operator: u8, detune: f32 },
    KeyboardTracking { operator: u8, tracking: KeyboardTracking },
    Mix { operator: u8, amplitude: u8 },
    Pan { operator: u8, pan: f32 },
    Envelope { operator: u8, adsr: Adsr },
    ModulationAmount { source: u8, target: u8, im: f32 },
    ModulationVelocity { source: u8, target: u8, velocity: f32 },
    MatrixRow { row: usize, value: MatrixRow },
    Lfo { index: usize, lfo: Lfo },
    VelocitySensitivity(u8),
    Glide(u8),
    Polyphony(u8),
    PresetName(String),
}

impl PatchEdit {
    /// The operator this edit is about, if any.
    pub fn operator(&self) -> Option<u8> {
        match self {
            Self::OperatorEnabled { operator, .. }
            | Self::Waveform { operator, .. }
            | Self::Frequency { operator, .. }
            | Self::Detune { operator, .. }
            | Self::KeyboardTracking { operator, .. }
            | Self::Mix { operator, .. }
            | Self::Pan { operator, .. }
            | Self::Envelope { operator, .. } => Some(*operator),
            Self::ModulationAmount { source, .. } | Self::ModulationVelocity { source, .. } => {
                Some(*source)
            }
            _ => None,
        }
    }
}
