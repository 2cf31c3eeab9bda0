use serde::{Deserialize, Serialize};

use crate::core::algorithm::{Algorithm, OperatorRole};

/// Oscillator shapes exposed by the editor. The firmware knows more slots than these; anything
/// past the end clamps to the last entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    #[default]
    Sine,
    Saw,
    Square,
    SinSquared,
    SinZero,
    SinPositive,
}

impl Waveform {
    pub const ALL: [Waveform; 6] = [
        Waveform::Sine,
        Waveform::Saw,
        Waveform::Square,
        Waveform::SinSquared,
        Waveform::SinZero,
        Waveform::SinPositive,
    ];

    pub fn from_raw(raw: u16) -> Self {
        Self::ALL[(raw as usize).min(Self::ALL.len() - 1)]
    }

    pub fn to_raw(self) -> u16 {
        self as u16
    }
}

/// How an operator's frequency follows the keyboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyboardTracking {
    /// Frequency is a ratio of the played note.
    #[default]
    Keyboard,
    /// Frequency is an absolute value in Hz.
    Fixed,
    /// Keyboard tracking plus a fixed offset in Hz.
    KeyboardHz,
}

impl KeyboardTracking {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => Self::Keyboard,
            1 => Self::Fixed,
            _ => Self::KeyboardHz,
        }
    }

    pub fn to_raw(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyType {
    Ratio,
    Hz,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePoint {
    /// Absolute time in seconds from note on.
    pub time: f32,
    /// Level in percent, 0..=100.
    pub level: f32,
}

impl EnvelopePoint {
    pub fn new(time: f32, level: f32) -> Self {
        Self { time, level }
    }
}

/// Operator envelope. Times are cumulative: each stage's time is measured from note on, not
/// from the previous stage. The wire carries deltas instead (see `codec::layout`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adsr {
    pub attack: EnvelopePoint,
    pub decay: EnvelopePoint,
    pub sustain: EnvelopePoint,
    pub release: EnvelopePoint,
}

impl Adsr {
    pub fn points(&self) -> [EnvelopePoint; 4] {
        [self.attack, self.decay, self.sustain, self.release]
    }

    pub fn from_points(points: [EnvelopePoint; 4]) -> Self {
        let [attack, decay, sustain, release] = points;
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// `true` when every stage starts no earlier than the one before it.
    pub fn is_monotonic(&self) -> bool {
        let points = self.points();
        points.windows(2).all(|pair| pair[0].time <= pair[1].time)
    }

    /// The envelope as the device stores it: no stage starts before the previous one and
    /// levels stay in 0..=100.
    pub fn normalized(&self) -> Self {
        let mut earliest = 0.0f32;
        Self::from_points(self.points().map(|point| {
            earliest = earliest.max(point.time);
            EnvelopePoint::new(earliest, point.level.clamp(0.0, 100.0))
        }))
    }
}

impl Default for Adsr {
    fn default() -> Self {
        Self {
            attack: EnvelopePoint::new(0.0, 100.0),
            decay: EnvelopePoint::new(0.2, 80.0),
            sustain: EnvelopePoint::new(0.7, 80.0),
            release: EnvelopePoint::new(1.2, 0.0),
        }
    }
}

/// One outgoing edge of an operator with its modulation index and velocity amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModulationLink {
    pub target_operator_id: u8,
    /// Modulation index, 0..=10.
    pub im: f32,
    /// Velocity sensitivity of the index, 0..=10.
    pub velocity_sensitivity: f32,
}

impl ModulationLink {
    pub fn new(target_operator_id: u8) -> Self {
        Self {
            target_operator_id,
            im: 0.0,
            velocity_sensitivity: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub id: u8,
    pub role: OperatorRole,
    pub enabled: bool,
    pub waveform: Waveform,
    /// Ratio or Hz, depending on [`Operator::frequency_type`].
    pub frequency: f32,
    pub detune: f32,
    pub keyboard_tracking: KeyboardTracking,
    pub adsr: Adsr,
    /// Output level, 0..=127. Only carriers use it.
    pub amplitude: u8,
    /// Stereo position, -1..=1. Only carriers use it.
    pub pan: f32,
    pub targets: Vec<ModulationLink>,
}

impl Operator {
    pub fn new(id: u8, role: OperatorRole) -> Self {
        Self {
            id,
            role,
            enabled: true,
            waveform: Waveform::Sine,
            frequency: 1.0,
            detune: 0.0,
            keyboard_tracking: KeyboardTracking::Keyboard,
            adsr: Adsr::default(),
            amplitude: 100,
            pan: 0.0,
            targets: Vec::new(),
        }
    }

    pub fn frequency_type(&self) -> FrequencyType {
        match self.keyboard_tracking {
            KeyboardTracking::Keyboard => FrequencyType::Ratio,
            KeyboardTracking::Fixed | KeyboardTracking::KeyboardHz => FrequencyType::Hz,
        }
    }

    pub fn is_carrier(&self) -> bool {
        self.role == OperatorRole::Carrier
    }

    pub fn link(&self, target: u8) -> Option<&ModulationLink> {
        self.targets
            .iter()
            .find(|link| link.target_operator_id == target)
    }

    pub fn link_mut(&mut self, target: u8) -> Option<&mut ModulationLink> {
        self.targets
            .iter_mut()
            .find(|link| link.target_operator_id == target)
    }

    /// Fresh links for every outgoing edge of this operator in `algorithm`, in declared order.
    pub fn links_from(algorithm: &Algorithm, id: u8) -> Vec<ModulationLink> {
        algorithm
            .outgoing(id)
            .map(|edge| ModulationLink::new(edge.to))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waveform_clamps() {
        assert_eq!(Waveform::from_raw(0), Waveform::Sine);
        assert_eq!(Waveform::from_raw(5), Waveform::SinPositive);
        assert_eq!(Waveform::from_raw(6), Waveform::SinPositive);
        assert_eq!(Waveform::from_raw(13), Waveform::SinPositive);
        for waveform in Waveform::ALL {
            assert_eq!(Waveform::from_raw(waveform.to_raw()), waveform);
        }
    }

    #[test]
    fn frequency_type_follows_tracking() {
        let mut op = Operator::new(1, OperatorRole::Carrier);
        assert_eq!(op.frequency_type(), FrequencyType::Ratio);
        op.keyboard_tracking = KeyboardTracking::from_raw(1);
        assert_eq!(op.frequency_type(), FrequencyType::Hz);
        assert_eq!(KeyboardTracking::from_raw(9), KeyboardTracking::KeyboardHz);
    }

    #[test]
    fn default_envelope_is_monotonic() {
        assert!(Adsr::default().is_monotonic());
        let mut adsr = Adsr::default();
        adsr.sustain.time = 0.1;
        assert!(!adsr.is_monotonic());
    }

    #[test]
    fn normalized_envelope_never_goes_back() {
        let adsr = Adsr::from_points([
            EnvelopePoint::new(-0.1, 120.0),
            EnvelopePoint::new(0.5, 80.0),
            EnvelopePoint::new(0.2, 60.0),
            EnvelopePoint::new(1.0, -5.0),
        ])
        .normalized();

        assert!(adsr.is_monotonic());
        assert_eq!(adsr.attack, EnvelopePoint::new(0.0, 100.0));
        assert_eq!(adsr.decay.time, 0.5);
        assert_eq!(adsr.sustain.time, 0.5);
        assert_eq!(adsr.release, EnvelopePoint::new(1.0, 0.0));
        assert_eq!(Adsr::default().normalized(), Adsr::default());
    }

    #[test]
    fn links_include_feedback() {
        // DX 1: operator 6 drives 5 and itself
        let algorithm = Algorithm::from_index(0).unwrap();
        let links = Operator::links_from(&algorithm, 6);
        let targets: Vec<u8> = links.iter().map(|link| link.target_operator_id).collect();
        assert_eq!(targets, vec![5, 6]);
        assert!(Operator::links_from(&algorithm, 1).is_empty());
    }
}
