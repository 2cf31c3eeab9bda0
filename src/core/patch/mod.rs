//! In-memory patch model.
//!
//! A [`Patch`] is what the editor works on: it is built fresh as an init patch, rebuilt by the
//! assembler from a device dump, and then changed one [`PatchEdit`] at a time.

pub mod edit;
pub mod lfo;
pub mod modulation;
pub mod operator;

pub use edit::PatchEdit;
pub use lfo::{Lfo, LfoEnvelope, LfoRate, LfoShape, MidiClockDivision, StepSequencer};
pub use modulation::{MatrixRow, MATRIX_DESTINATIONS, MATRIX_ROW_COUNT, MATRIX_SOURCES};
pub use operator::{
    Adsr, EnvelopePoint, FrequencyType, KeyboardTracking, ModulationLink, Operator, Waveform,
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::algorithm::{Algorithm, OperatorRole};
use crate::core::CodecError;
use lfo::{LFO_COUNT, LFO_ENVELOPE_COUNT, STEP_SEQUENCER_COUNT};

/// Longest preset name the device stores.
pub const PRESET_NAME_LENGTH: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayMode {
    #[default]
    Poly,
    Mono,
    Unison,
}

impl PlayMode {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => Self::Poly,
            1 => Self::Mono,
            _ => Self::Unison,
        }
    }

    pub fn to_raw(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub volume: f32,
    pub transpose: i8,
    /// 0..=10
    pub glide: u8,
    pub bend_range: u8,
    /// 0..=16
    pub velocity_sensitivity: u8,
    /// Voice count. Not part of a device dump.
    pub polyphony: u8,
    pub play_mode: PlayMode,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            volume: 0.8,
            transpose: 0,
            glide: 0,
            bend_range: 2,
            velocity_sensitivity: 8,
            polyphony: 8,
            play_mode: PlayMode::Poly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSettings {
    pub filter_type: u8,
    pub param1: f32,
    pub param2: f32,
    pub gain: f32,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            filter_type: 0,
            param1: 0.5,
            param2: 0.5,
            gain: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArpClock {
    #[default]
    Off,
    Internal,
    External,
}

impl ArpClock {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => Self::Off,
            1 => Self::Internal,
            _ => Self::External,
        }
    }

    pub fn to_raw(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArpDirection {
    #[default]
    Up,
    Down,
    UpDown,
    Played,
    Random,
    Chord,
    RotateUp,
    RotateDown,
    RotateUpDown,
    ShiftUp,
    ShiftDown,
    ShiftUpDown,
}

impl ArpDirection {
    pub const ALL: [ArpDirection; 12] = [
        ArpDirection::Up,
        ArpDirection::Down,
        ArpDirection::UpDown,
        ArpDirection::Played,
        ArpDirection::Random,
        ArpDirection::Chord,
        ArpDirection::RotateUp,
        ArpDirection::RotateDown,
        ArpDirection::RotateUpDown,
        ArpDirection::ShiftUp,
        ArpDirection::ShiftDown,
        ArpDirection::ShiftUpDown,
    ];

    pub fn from_raw(raw: u16) -> Self {
        Self::ALL[(raw as usize).min(Self::ALL.len() - 1)]
    }

    pub fn to_raw(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArpeggiatorSettings {
    pub clock: ArpClock,
    pub bpm: u16,
    pub direction: ArpDirection,
    pub octave: u8,
    pub pattern: u8,
    pub division: u8,
    pub duration: u8,
    pub latch: bool,
}

impl Default for ArpeggiatorSettings {
    fn default() -> Self {
        Self {
            clock: ArpClock::Off,
            bpm: 90,
            direction: ArpDirection::Up,
            octave: 1,
            pattern: 1,
            division: 9,
            duration: 14,
            latch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiSettings {
    /// 1..=16
    pub channel: u8,
    /// Push every edit to the device as it happens.
    pub send_edits: bool,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            channel: 1,
            send_edits: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorMetadata {
    /// Seconds since the unix epoch.
    pub modified_at: u64,
}

impl EditorMetadata {
    pub fn now() -> Self {
        Self {
            modified_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

/// The complete patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub name: String,
    pub algorithm: Algorithm,
    /// One entry per algorithm node, ascending id.
    pub operators: Vec<Operator>,
    pub modulation_matrix: [MatrixRow; MATRIX_ROW_COUNT],
    pub lfos: [Lfo; LFO_COUNT],
    pub lfo_envelopes: [LfoEnvelope; LFO_ENVELOPE_COUNT],
    pub step_sequencers: [StepSequencer; STEP_SEQUENCER_COUNT],
    pub global: GlobalSettings,
    pub effects: EffectSettings,
    pub arpeggiator: ArpeggiatorSettings,
    pub midi: MidiSettings,
    pub editor: EditorMetadata,
}

impl Patch {
    /// A fresh init patch on the first algorithm.
    pub fn new(name: impl Into<String>) -> Self {
        let algorithm = Algorithm::default();
        let operators = Self::operators_for(&algorithm, &[]);
        Self {
            name: name.into(),
            algorithm,
            operators,
            modulation_matrix: Default::default(),
            lfos: Default::default(),
            lfo_envelopes: Default::default(),
            step_sequencers: Default::default(),
            global: GlobalSettings::default(),
            effects: EffectSettings::default(),
            arpeggiator: ArpeggiatorSettings::default(),
            midi: MidiSettings::default(),
            editor: EditorMetadata::now(),
        }
    }

    /// Build the operator list for `algorithm`. Operators already present in `previous` keep
    /// their settings, and links keep im/velocity when the same `(from, to)` edge still exists.
    pub fn operators_for(algorithm: &Algorithm, previous: &[Operator]) -> Vec<Operator> {
        let carried: HashMap<(u8, u8), ModulationLink> = previous
            .iter()
            .flat_map(|op| {
                op.targets
                    .iter()
                    .map(move |link| ((op.id, link.target_operator_id), *link))
            })
            .collect();

        algorithm
            .operator_ids()
            .into_iter()
            .map(|id| {
                let role = algorithm.role_of(id).unwrap_or(OperatorRole::Modulator);
                let mut operator = previous
                    .iter()
                    .find(|op| op.id == id)
                    .cloned()
                    .unwrap_or_else(|| Operator::new(id, role));
                operator.role = role;
                operator.targets = Operator::links_from(algorithm, id)
                    .into_iter()
                    .map(|link| {
                        carried
                            .get(&(id, link.target_operator_id))
                            .copied()
                            .unwrap_or(link)
                    })
                    .collect();
                operator
            })
            .collect()
    }

    /// Switch to another table algorithm, re-deriving operators and links.
    pub fn select_algorithm(&mut self, index: usize) -> Result<(), CodecError> {
        let algorithm = Algorithm::from_index(index).ok_or(CodecError::InvalidAlgorithm(index))?;
        self.operators = Self::operators_for(&algorithm, &self.operators);
        self.algorithm = algorithm;
        Ok(())
    }

    pub fn operator(&self, id: u8) -> Option<&Operator> {
        self.operators.iter().find(|op| op.id == id)
    }

    pub fn operator_mut(&mut self, id: u8) -> Result<&mut Operator, CodecError> {
        self.operators
            .iter_mut()
            .find(|op| op.id == id)
            .ok_or(CodecError::UnknownOperator(id))
    }

    /// Apply one edit to the patch and bump the modification time.
    pub fn apply(&mut self, edit: &PatchEdit) -> Result<(), CodecError> {
        if let Some(id) = edit.operator() {
            self.operator_mut(id)?;
        }

        match edit {
            PatchEdit::SelectAlgorithm(index) => self.select_algorithm(*index)?,
            PatchEdit::OperatorEnabled { operator, enabled } => {
                self.operator_mut(*operator)?.enabled = *enabled
            }
            PatchEdit::Waveform { operator, waveform } => {
                self.operator_mut(*operator)?.waveform = *waveform
            }
            PatchEdit::Frequency {
                operator,
                frequency,
            } => self.operator_mut(*operator)?.frequency = *frequency,
            PatchEdit::Detune { operator, detune } => {
                self.operator_mut(*operator)?.detune = *detune
            }
            PatchEdit::KeyboardTracking { operator, tracking } => {
                self.operator_mut(*operator)?.keyboard_tracking = *tracking
            }
            PatchEdit::Mix {
                operator,
                amplitude,
            } => self.operator_mut(*operator)?.amplitude = (*amplitude).min(127),
            PatchEdit::Pan { operator, pan } => {
                self.operator_mut(*operator)?.pan = pan.clamp(-1.0, 1.0)
            }
            PatchEdit::Envelope { operator, adsr } => {
                self.operator_mut(*operator)?.adsr = adsr.normalized()
            }
            PatchEdit::ModulationAmount { source, target, im } => {
                self.link_mut(*source, *target)?.im = im.clamp(0.0, 10.0)
            }
            PatchEdit::ModulationVelocity {
                source,
                target,
                velocity,
            } => {
                self.link_mut(*source, *target)?.velocity_sensitivity = velocity.clamp(0.0, 10.0)
            }
            PatchEdit::MatrixRow { row, value } => {
                *self
                    .modulation_matrix
                    .get_mut(*row)
                    .ok_or(CodecError::InvalidMatrixRow(*row))? = MatrixRow {
                    multiplier: value.multiplier.clamp(-10.0, 10.0),
                    ..value.clone()
                }
            }
            PatchEdit::Lfo { index, lfo } => {
                *self.lfos.get_mut(*index).ok_or(CodecError::InvalidLfo(*index))? = *lfo
            }
            PatchEdit::VelocitySensitivity(value) => {
                self.global.velocity_sensitivity = (*value).min(16)
            }
            PatchEdit::Glide(value) => self.global.glide = (*value).min(10),
            PatchEdit::Polyphony(value) => self.global.polyphony = *value,
            PatchEdit::PresetName(name) => {
                self.name = name.chars().take(PRESET_NAME_LENGTH).collect()
            }
        }

        self.editor = EditorMetadata::now();
        Ok(())
    }

    fn link_mut(&mut self, source: u8, target: u8) -> Result<&mut ModulationLink, CodecError> {
        self.operator_mut(source)?
            .link_mut(target)
            .ok_or(CodecError::NoModulationSlot {
                from: source,
                to: target,
            })
    }
}

impl Default for Patch {
    fn default() -> Self {
        Self::new("Init")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_im(patch: &mut Patch, source: u8, target: u8, im: f32, velocity: f32) {
        patch
            .apply(&PatchEdit::ModulationAmount { source, target, im })
            .unwrap();
        patch
            .apply(&PatchEdit::ModulationVelocity {
                source,
                target,
                velocity,
            })
            .unwrap();
    }

    #[test]
    fn init_patch_matches_topology() {
        let patch = Patch::default();
        assert_eq!(patch.algorithm.index, 0);
        assert_eq!(patch.operators.len(), 6);
        for op in &patch.operators {
            let outgoing = patch.algorithm.outgoing(op.id).count();
            assert_eq!(op.targets.len(), outgoing, "operator {}", op.id);
            assert_eq!(Some(op.role), patch.algorithm.role_of(op.id));
        }
    }

    #[test]
    fn feedback_link_points_at_itself() {
        let patch = Patch::default();
        let op6 = patch.operator(6).unwrap();
        let feedback: Vec<_> = op6
            .targets
            .iter()
            .filter(|link| link.target_operator_id == op6.id)
            .collect();
        assert_eq!(feedback.len(), 1);
    }

    #[test]
    fn algorithm_switch_keeps_shared_edges() {
        // DX 1 and DX 2 share 2->1, 4->3, 5->4 and 6->5; feedback moves from 6 to 2.
        let mut patch = Patch::default();
        set_im(&mut patch, 2, 1, 3.5, 1.0);
        set_im(&mut patch, 6, 5, 7.0, 2.5);
        set_im(&mut patch, 6, 6, 4.0, 0.5);
        patch.operator_mut(3).unwrap().waveform = Waveform::Saw;

        patch.select_algorithm(1).unwrap();
        assert_eq!(patch.operator(2).unwrap().link(2).unwrap().im, 0.0);
        assert!(patch.operator(6).unwrap().link(6).is_none());

        patch.select_algorithm(0).unwrap();
        let link = patch.operator(2).unwrap().link(1).unwrap();
        assert_eq!((link.im, link.velocity_sensitivity), (3.5, 1.0));
        let link = patch.operator(6).unwrap().link(5).unwrap();
        assert_eq!((link.im, link.velocity_sensitivity), (7.0, 2.5));
        // the feedback edge didn't exist in DX 2, so it starts over
        assert_eq!(patch.operator(6).unwrap().link(6).unwrap().im, 0.0);
        assert_eq!(patch.operator(3).unwrap().waveform, Waveform::Saw);
    }

    #[test]
    fn roles_follow_the_new_algorithm() {
        let mut patch = Patch::default();
        patch.select_algorithm(31).unwrap();
        assert!(patch.operators.iter().all(|op| op.is_carrier()));
        assert_eq!(
            patch.select_algorithm(32),
            Err(CodecError::InvalidAlgorithm(32))
        );
    }

    #[test]
    fn edits_are_validated() {
        let mut patch = Patch::default();
        assert_eq!(
            patch.apply(&PatchEdit::Detune {
                operator: 7,
                detune: 1.0
            }),
            Err(CodecError::UnknownOperator(7))
        );
        assert_eq!(
            patch.apply(&PatchEdit::ModulationAmount {
                source: 1,
                target: 2,
                im: 1.0
            }),
            Err(CodecError::NoModulationSlot { from: 1, to: 2 })
        );
        patch
            .apply(&PatchEdit::PresetName("A very long preset name".to_string()))
            .unwrap();
        assert_eq!(patch.name, "A very long ");
        patch
            .apply(&PatchEdit::Pan {
                operator: 1,
                pan: 3.0,
            })
            .unwrap();
        assert_eq!(patch.operator(1).unwrap().pan, 1.0);
    }

    #[test]
    fn matrix_multiplier_is_clamped() {
        let mut patch = Patch::default();
        patch
            .apply(&PatchEdit::MatrixRow {
                row: 2,
                value: MatrixRow {
                    multiplier: 15.0,
                    ..MatrixRow::default()
                },
            })
            .unwrap();
        assert_eq!(patch.modulation_matrix[2].multiplier, 10.0);
        assert_eq!(
            patch.apply(&PatchEdit::MatrixRow {
                row: 12,
                value: MatrixRow::default(),
            }),
            Err(CodecError::InvalidMatrixRow(12))
        );
    }

    #[test]
    fn envelope_edits_are_stored_in_order() {
        let mut patch = Patch::default();
        let mut adsr = Adsr::default();
        adsr.decay.time = 0.5;
        adsr.sustain.time = 0.2;
        patch
            .apply(&PatchEdit::Envelope { operator: 3, adsr })
            .unwrap();

        let stored = patch.operator(3).unwrap().adsr;
        assert!(stored.is_monotonic());
        assert_eq!(stored.sustain.time, 0.5);
        assert_eq!(stored.release.time, adsr.release.time);
    }
}
