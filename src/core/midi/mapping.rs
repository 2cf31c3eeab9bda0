use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::algorithm::{Algorithm, ALGORITHM_COUNT, CARRIER_CONTROL_SLOTS};
use crate::core::patch::PatchEdit;

/// Named control change numbers of the PreenFM3.
///
/// Indexed variants carry the 1-based number printed on the device (`Mix(3)` is "Mix3").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preenfm3Cc {
    BankSelect,
    ModWheel,
    Breath,
    DataEntryMsb,
    DataEntryLsb,
    Sustain,
    NrpnLsb,
    NrpnMsb,
    AllSoundOff,
    AllNotesOff,

    Algo,
    Im(u8),
    ImFeedback,
    Mix(u8),
    Pan(u8),
    OscFrequency(u8),
    FilterParam1,
    FilterParam2,
    FilterGain,
    EnvAttack(u8),
    EnvRelease(u8),
    MatrixMultiplier(u8),
    LfoFrequency(u8),
    LfoEnv2Silence,
    StepSeqGate(u8),
    MatrixSourceCc(u8),
    LfoPhase(u8),
    LfoBias(u8),
    LfoShape(u8),
    EnvAttackModulators,
    EnvReleaseModulators,

    ArpClock,
    ArpDirection,
    ArpOctave,
    ArpPattern,
    ArpDivision,
    ArpDuration,
    ArpLatch,
    Glide,
    VelocitySensitivity,
    PlayMode,
    UnisonDetune,
    UnisonSpread,

    MfxInputLevel,
    MfxRoomSize,
    MfxDecay,
    MfxDamping,
    MfxPredelay,
    MfxHighpass,
    MfxLevel,
}

/// 1-based index into a block of `len` consecutive controllers starting at `first`.
fn block(first: u8, len: u8, index: u8) -> Option<u8> {
    (1..=len).contains(&index).then(|| first + index - 1)
}

impl Preenfm3Cc {
    /// The controller number on the wire, or `None` for an index outside its block.
    pub fn number(self) -> Option<u8> {
        use Preenfm3Cc::*;
        let number = match self {
            BankSelect => 0,
            ModWheel => 1,
            Breath => 2,
            DataEntryMsb => 6,
            DataEntryLsb => 38,
            Sustain => 64,
            NrpnLsb => 98,
            NrpnMsb => 99,
            AllSoundOff => 120,
            AllNotesOff => 123,

            Algo => 16,
            Im(n) => return block(17, 4, n),
            ImFeedback => 21,
            Mix(n) => return block(22, 4, n),
            Pan(n) => return block(26, 4, n),
            OscFrequency(n) => return block(30, 6, n),
            FilterParam1 => 36,
            FilterParam2 => 37,
            FilterGain => 39,
            EnvAttack(n) => return block(40, 6, n),
            EnvRelease(n) => return block(46, 6, n),
            MatrixMultiplier(n) => return block(52, 4, n),
            LfoFrequency(n) => return block(56, 3, n),
            LfoEnv2Silence => 59,
            StepSeqGate(n) => return block(60, 2, n),
            // 64 is the sustain pedal
            MatrixSourceCc(n) => {
                return [62, 63, 65, 66].get((n as usize).checked_sub(1)?).copied()
            }
            LfoPhase(n) => return block(67, 3, n),
            LfoBias(n) => return block(70, 3, n),
            LfoShape(n) => return block(73, 3, n),
            EnvAttackModulators => 76,
            EnvReleaseModulators => 77,

            ArpClock => 78,
            ArpDirection => 79,
            ArpOctave => 80,
            ArpPattern => 81,
            ArpDivision => 82,
            ArpDuration => 83,
            ArpLatch => 84,
            Glide => 85,
            VelocitySensitivity => 86,
            PlayMode => 87,
            UnisonDetune => 88,
            UnisonSpread => 89,

            MfxInputLevel => 102,
            MfxRoomSize => 103,
            MfxDecay => 104,
            MfxDamping => 105,
            MfxPredelay => 106,
            MfxHighpass => 107,
            MfxLevel => 108,
        };
        Some(number)
    }

    pub fn from_number(number: u8) -> Option<Self> {
        use Preenfm3Cc::*;
        let cc = match number {
            0 => BankSelect,
            1 => ModWheel,
            2 => Breath,
            6 => DataEntryMsb,
            38 => DataEntryLsb,
            64 => Sustain,
            98 => NrpnLsb,
            99 => NrpnMsb,
            120 => AllSoundOff,
            123 => AllNotesOff,

            16 => Algo,
            17..=20 => Im(number - 16),
            21 => ImFeedback,
            22..=25 => Mix(number - 21),
            26..=29 => Pan(number - 25),
            30..=35 => OscFrequency(number - 29),
            36 => FilterParam1,
            37 => FilterParam2,
            39 => FilterGain,
            40..=45 => EnvAttack(number - 39),
            46..=51 => EnvRelease(number - 45),
            52..=55 => MatrixMultiplier(number - 51),
            56..=58 => LfoFrequency(number - 55),
            59 => LfoEnv2Silence,
            60..=61 => StepSeqGate(number - 59),
            62 | 63 => MatrixSourceCc(number - 61),
            65 | 66 => MatrixSourceCc(number - 62),
            67..=69 => LfoPhase(number - 66),
            70..=72 => LfoBias(number - 69),
            73..=75 => LfoShape(number - 72),
            76 => EnvAttackModulators,
            77 => EnvReleaseModulators,

            78 => ArpClock,
            79 => ArpDirection,
            80 => ArpOctave,
            81 => ArpPattern,
            82 => ArpDivision,
            83 => ArpDuration,
            84 => ArpLatch,
            85 => Glide,
            86 => VelocitySensitivity,
            87 => PlayMode,
            88 => UnisonDetune,
            89 => UnisonSpread,

            102 => MfxInputLevel,
            103 => MfxRoomSize,
            104 => MfxDecay,
            105 => MfxDamping,
            106 => MfxPredelay,
            107 => MfxHighpass,
            108 => MfxLevel,
            _ => return None,
        };
        Some(cc)
    }

    /// Turn a CC the device echoed back into the edit it stands for. Only the controls that
    /// map one-to-one onto the patch model are recognised.
    pub fn to_edit(self, value: u8, algorithm: &Algorithm) -> Option<PatchEdit> {
        match self {
            Self::Algo => {
                let index = value as usize;
                (index < ALGORITHM_COUNT).then_some(PatchEdit::SelectAlgorithm(index))
            }
            Self::Mix(n) => carrier_for(algorithm, n).map(|operator| PatchEdit::Mix {
                operator,
                amplitude: value.min(127),
            }),
            Self::Pan(n) => carrier_for(algorithm, n).map(|operator| PatchEdit::Pan {
                operator,
                pan: cc_to_pan(value),
            }),
            _ => None,
        }
    }
}

fn carrier_for(algorithm: &Algorithm, encoder: u8) -> Option<u8> {
    let index = (encoder as usize).checked_sub(1)?;
    if index >= CARRIER_CONTROL_SLOTS {
        return None;
    }
    algorithm.carriers().get(index).copied()
}

impl fmt::Display for Preenfm3Cc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Preenfm3Cc::*;
        match self {
            Im(n) => write!(f, "Im{n}"),
            Mix(n) => write!(f, "Mix{n}"),
            Pan(n) => write!(f, "Pan{n}"),
            OscFrequency(n) => write!(f, "Osc{n}Freq"),
            EnvAttack(n) => write!(f, "Env{n}Attack"),
            EnvRelease(n) => write!(f, "Env{n}Release"),
            MatrixMultiplier(n) => write!(f, "Matrix{n}Mul"),
            LfoFrequency(n) => write!(f, "Lfo{n}Freq"),
            StepSeqGate(n) => write!(f, "StepSeq{n}Gate"),
            MatrixSourceCc(n) => write!(f, "MatrixSourceCc{n}"),
            LfoPhase(n) => write!(f, "Lfo{n}Phase"),
            LfoBias(n) => write!(f, "Lfo{n}Bias"),
            LfoShape(n) => write!(f, "Lfo{n}Shape"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Pan -1..=1 onto 0..=127 with 64 as center.
pub fn pan_to_cc(pan: f32) -> u8 {
    let pan = pan.clamp(-1.0, 1.0);
    let offset = if pan >= 0.0 { pan * 63.0 } else { pan * 64.0 };
    (64.0 + offset).round() as u8
}

pub fn cc_to_pan(value: u8) -> f32 {
    let value = value.min(127) as f32;
    if value >= 64.0 {
        (value - 64.0) / 63.0
    } else {
        (value - 64.0) / 64.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_round_trip() {
        let mut known = 0;
        for number in 0..=127u8 {
            if let Some(cc) = Preenfm3Cc::from_number(number) {
                assert_eq!(cc.number(), Some(number), "{cc}");
                known += 1;
            }
        }
        assert_eq!(known, 89);
    }

    #[test]
    fn names_follow_the_device() {
        assert_eq!(Preenfm3Cc::Mix(3).to_string(), "Mix3");
        assert_eq!(Preenfm3Cc::Pan(1).to_string(), "Pan1");
        assert_eq!(Preenfm3Cc::Algo.to_string(), "Algo");
        assert_eq!(Preenfm3Cc::Mix(1).number(), Some(22));
        assert_eq!(Preenfm3Cc::Pan(4).number(), Some(29));
        assert_eq!(Preenfm3Cc::from_number(64), Some(Preenfm3Cc::Sustain));
        assert_eq!(Preenfm3Cc::from_number(65), Some(Preenfm3Cc::MatrixSourceCc(3)));
    }

    #[test]
    fn indices_outside_a_block_have_no_number() {
        assert_eq!(Preenfm3Cc::Mix(0).number(), None);
        assert_eq!(Preenfm3Cc::Mix(5).number(), None);
        assert_eq!(Preenfm3Cc::Pan(1).number(), Some(26));
        assert_eq!(Preenfm3Cc::OscFrequency(7).number(), None);
        assert_eq!(Preenfm3Cc::LfoShape(3).number(), Some(75));
        assert_eq!(Preenfm3Cc::MatrixSourceCc(0).number(), None);
        assert_eq!(Preenfm3Cc::MatrixSourceCc(4).number(), Some(66));
        assert_eq!(Preenfm3Cc::StepSeqGate(3).number(), None);
    }

    #[test]
    fn pan_center_is_exact() {
        assert_eq!(pan_to_cc(0.0), 64);
        assert_eq!(pan_to_cc(-1.0), 0);
        assert_eq!(pan_to_cc(1.0), 127);
        assert_eq!(cc_to_pan(64), 0.0);
        assert_eq!(cc_to_pan(0), -1.0);
        assert_eq!(cc_to_pan(127), 1.0);
    }

    #[test]
    fn echoed_controls_become_edits() {
        // DX 22 carriers: 1, 3, 4, 5
        let algorithm = Algorithm::from_index(21).unwrap();
        assert_eq!(
            Preenfm3Cc::Mix(3).to_edit(90, &algorithm),
            Some(PatchEdit::Mix {
                operator: 4,
                amplitude: 90
            })
        );
        assert_eq!(
            Preenfm3Cc::Pan(2).to_edit(127, &algorithm),
            Some(PatchEdit::Pan {
                operator: 3,
                pan: 1.0
            })
        );
        assert_eq!(
            Preenfm3Cc::Algo.to_edit(4, &algorithm),
            Some(PatchEdit::SelectAlgorithm(4))
        );
        assert_eq!(Preenfm3Cc::Algo.to_edit(40, &algorithm), None);
        assert_eq!(Preenfm3Cc::Glide.to_edit(3, &algorithm), None);

        // DX 1 has only two carriers
        let algorithm = Algorithm::from_index(0).unwrap();
        assert_eq!(Preenfm3Cc::Mix(3).to_edit(90, &algorithm), None);
    }
}
