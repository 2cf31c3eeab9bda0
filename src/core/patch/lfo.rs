use serde::{Deserialize, Serialize};

pub const LFO_COUNT: usize = 3;
pub const LFO_ENVELOPE_COUNT: usize = 2;
pub const STEP_SEQUENCER_COUNT: usize = 2;
pub const STEP_COUNT: usize = 16;

/// Raw frequency values at or above this select a MIDI clock division.
pub const MIDI_CLOCK_RAW_BASE: u16 = 10000;
const MIDI_CLOCK_RAW_STEP: u16 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LfoShape {
    #[default]
    Sin,
    Saw,
    Triangle,
    Square,
    Random,
    Brownian,
    Wandering,
    Flow,
}

impl LfoShape {
    pub const ALL: [LfoShape; 8] = [
        LfoShape::Sin,
        LfoShape::Saw,
        LfoShape::Triangle,
        LfoShape::Square,
        LfoShape::Random,
        LfoShape::Brownian,
        LfoShape::Wandering,
        LfoShape::Flow,
    ];

    pub fn from_raw(raw: u16) -> Self {
        Self::ALL[(raw as usize).min(Self::ALL.len() - 1)]
    }

    pub fn to_raw(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiClockDivision {
    Div16,
    Div8,
    Div4,
    Div2,
    Clock,
    Mul2,
    Mul3,
    Mul4,
    Mul8,
}

impl MidiClockDivision {
    pub const ALL: [MidiClockDivision; 9] = [
        MidiClockDivision::Div16,
        MidiClockDivision::Div8,
        MidiClockDivision::Div4,
        MidiClockDivision::Div2,
        MidiClockDivision::Clock,
        MidiClockDivision::Mul2,
        MidiClockDivision::Mul3,
        MidiClockDivision::Mul4,
        MidiClockDivision::Mul8,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Div16 => "MC/16",
            Self::Div8 => "MC/8",
            Self::Div4 => "MC/4",
            Self::Div2 => "MC/2",
            Self::Clock => "MC",
            Self::Mul2 => "MC*2",
            Self::Mul3 => "MC*3",
            Self::Mul4 => "MC*4",
            Self::Mul8 => "MC*8",
        }
    }

    /// Resolve a raw value of at least [`MIDI_CLOCK_RAW_BASE`]. Values between table entries
    /// resolve to the closest entry below them.
    pub fn from_raw(raw: u16) -> Self {
        let position = (raw.saturating_sub(MIDI_CLOCK_RAW_BASE) / MIDI_CLOCK_RAW_STEP) as usize;
        Self::ALL[position.min(Self::ALL.len() - 1)]
    }

    pub fn to_raw(self) -> u16 {
        MIDI_CLOCK_RAW_BASE + self as u16 * MIDI_CLOCK_RAW_STEP
    }
}

/// LFO speed: either free running or locked to MIDI clock. Both share one wire field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LfoRate {
    Hz(f32),
    MidiClock(MidiClockDivision),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lfo {
    pub shape: LfoShape,
    pub rate: LfoRate,
    /// -1..=1
    pub bias: f32,
    /// `None` when key sync is off, otherwise the delay in 0..=16.
    pub keysync: Option<f32>,
    /// 0..=1
    pub phase: f32,
}

impl Default for Lfo {
    fn default() -> Self {
        Self {
            shape: LfoShape::Sin,
            rate: LfoRate::Hz(3.0),
            bias: 0.0,
            keysync: None,
            phase: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LfoEnvelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for LfoEnvelope {
    fn default() -> Self {
        Self {
            attack: 0.5,
            decay: 0.5,
            sustain: 1.0,
            release: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSequencer {
    pub bpm: u8,
    pub gate: f32,
    pub steps: [u8; STEP_COUNT],
}

impl Default for StepSequencer {
    fn default() -> Self {
        Self {
            bpm: 120,
            gate: 0.5,
            steps: [15; STEP_COUNT],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midi_clock_table() {
        assert_eq!(MidiClockDivision::from_raw(10000), MidiClockDivision::Div16);
        assert_eq!(MidiClockDivision::from_raw(10040), MidiClockDivision::Clock);
        assert_eq!(MidiClockDivision::from_raw(10045), MidiClockDivision::Clock);
        assert_eq!(MidiClockDivision::from_raw(16383), MidiClockDivision::Mul8);
        for division in MidiClockDivision::ALL {
            assert_eq!(MidiClockDivision::from_raw(division.to_raw()), division);
        }
        assert_eq!(MidiClockDivision::Mul3.label(), "MC*3");
    }

    #[test]
    fn shape_clamps() {
        assert_eq!(LfoShape::from_raw(7), LfoShape::Flow);
        assert_eq!(LfoShape::from_raw(200), LfoShape::Flow);
    }
}
