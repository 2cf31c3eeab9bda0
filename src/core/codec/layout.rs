//! NRPN address map of a patch dump.
//!
//! Every address is `(msb << 7) | lsb`. Fields that come in groups (IM slots, carriers,
//! operators, matrix rows, LFOs) are computed from a base and a stride.

use crate::core::patch::PRESET_NAME_LENGTH;

pub const fn address(msb: u8, lsb: u8) -> u16 {
    ((msb as u16) << 7) | lsb as u16
}

pub const ALGORITHM: u16 = 0;
pub const VELOCITY_SENSITIVITY: u16 = 1;
/// Shared with the voice count on older firmware; this revision sends play mode here.
pub const PLAY_MODE: u16 = 2;
pub const GLIDE: u16 = 3;

const IM_BASE: u16 = 4;
const CARRIER_BASE: u16 = 16;
/// Carrier ordinals that have mix/pan addresses in a dump.
pub const CARRIER_SLOT_COUNT: usize = 6;

pub const ARP_CLOCK: u16 = 28;
pub const ARP_BPM: u16 = 29;
pub const ARP_DIRECTION: u16 = 30;
pub const ARP_OCTAVE: u16 = 31;
pub const ARP_PATTERN: u16 = 32;
pub const ARP_DIVISION: u16 = 33;
pub const ARP_DURATION: u16 = 34;
pub const ARP_LATCH: u16 = 35;

pub const FILTER_TYPE: u16 = 36;
pub const FILTER_PARAM1: u16 = 37;
pub const FILTER_PARAM2: u16 = 38;
pub const FILTER_GAIN: u16 = 39;

const OSCILLATOR_BASE: u16 = 40;
const OSCILLATOR_STRIDE: u16 = 4;
pub const OSC_WAVEFORM: u16 = 0;
pub const OSC_TRACKING: u16 = 1;
pub const OSC_FREQUENCY: u16 = 2;
pub const OSC_DETUNE: u16 = 3;

const ENVELOPE_BASE: u16 = 64;
const ENVELOPE_STRIDE: u16 = 8;

const LFO_BASE: u16 = address(1, 40);
const LFO_STRIDE: u16 = 4;
pub const LFO_SHAPE: u16 = 0;
pub const LFO_RATE: u16 = 1;
pub const LFO_BIAS: u16 = 2;
pub const LFO_KEYSYNC: u16 = 3;
const LFO_PHASE_BASE: u16 = address(1, 68);

pub const MATRIX_SOURCE: u16 = 0;
pub const MATRIX_MULTIPLIER: u16 = 1;
pub const MATRIX_DESTINATION1: u16 = 2;
pub const MATRIX_DESTINATION2: u16 = 3;

pub const PRESET_NAME_MSB: u8 = 1;
pub const PRESET_NAME_LSB: u8 = 100;

pub const DUMP_REQUEST_MSB: u8 = 127;
pub const DUMP_REQUEST_LSB: u8 = 127;

// Fixed-point conventions
pub const HUNDREDTHS: f32 = 100.0;
pub const TENTHS: f32 = 10.0;
pub const DETUNE_CENTER: i32 = 1600;
pub const PAN_CENTER: i32 = 100;
pub const BIAS_CENTER: i32 = 100;
pub const MULTIPLIER_CENTER: i32 = 1000;

pub fn im_value(slot: usize) -> u16 {
    IM_BASE + 2 * slot as u16
}

pub fn im_velocity(slot: usize) -> u16 {
    IM_BASE + 2 * slot as u16 + 1
}

pub fn carrier_mix(ordinal: usize) -> u16 {
    CARRIER_BASE + 2 * ordinal as u16
}

pub fn carrier_pan(ordinal: usize) -> u16 {
    CARRIER_BASE + 2 * ordinal as u16 + 1
}

/// `field` is one of the `OSC_*` offsets; `position` is the operator's rank by ascending id.
pub fn oscillator(position: usize, field: u16) -> u16 {
    OSCILLATOR_BASE + OSCILLATOR_STRIDE * position as u16 + field
}

/// Envelope stage `stage` (0 attack .. 3 release) of the operator at `position`.
pub fn envelope_time(position: usize, stage: usize) -> u16 {
    ENVELOPE_BASE + ENVELOPE_STRIDE * position as u16 + 2 * stage as u16
}

pub fn envelope_level(position: usize, stage: usize) -> u16 {
    envelope_time(position, stage) + 1
}

/// First address of a matrix row. Rows 0-2 sit at the end of MSB 0, the rest start MSB 1.
pub fn matrix_row(row: usize) -> u16 {
    if row < 3 {
        address(0, 116 + 4 * row as u8)
    } else {
        address(1, 4 * (row as u8 - 3))
    }
}

pub fn lfo(index: usize, field: u16) -> u16 {
    LFO_BASE + LFO_STRIDE * index as u16 + field
}

pub fn lfo_phase(index: usize) -> u16 {
    LFO_PHASE_BASE + index as u16
}

/// `(msb, lsb)` pair for preset name character `position`.
pub fn preset_name_char(position: usize) -> (u8, u8) {
    (PRESET_NAME_MSB, PRESET_NAME_LSB + position as u8)
}

pub fn is_preset_name(param_msb: u8, param_lsb: u8) -> bool {
    param_msb == PRESET_NAME_MSB
        && (PRESET_NAME_LSB..PRESET_NAME_LSB + PRESET_NAME_LENGTH as u8).contains(&param_lsb)
}

/// `(raw - offset) / scale`
pub fn from_fixed(raw: u16, scale: f32, offset: i32) -> f32 {
    (raw as i32 - offset) as f32 / scale
}

/// Inverse of [`from_fixed`], clamped to the 14-bit range.
pub fn to_fixed(value: f32, scale: f32, offset: i32) -> u16 {
    ((value * scale).round() as i32 + offset).clamp(0, 0x3FFF) as u16
}

/// Wire envelope deltas (1/100 s) to cumulative times from note on (also 1/100 s).
pub fn cumulative_times(deltas: [u16; 4]) -> [u32; 4] {
    let mut total = 0u32;
    deltas.map(|delta| {
        total += delta as u32;
        total
    })
}

/// Cumulative times back to wire deltas. A stage placed before the previous one sends 0.
pub fn relative_times(absolute: [u32; 4]) -> [u16; 4] {
    let mut previous = 0u32;
    absolute.map(|time| {
        let delta = time.saturating_sub(previous);
        previous = previous.max(time);
        delta.min(0x3FFF) as u16
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_blocks_do_not_overlap() {
        assert_eq!(oscillator(0, OSC_WAVEFORM), 40);
        assert_eq!(oscillator(5, OSC_DETUNE), 63);
        assert_eq!(envelope_time(0, 0), 64);
        assert_eq!(envelope_level(5, 3), 111);
        assert_eq!(matrix_row(0), 116);
        assert_eq!(matrix_row(2), 124);
        assert_eq!(matrix_row(3), 128);
        assert_eq!(matrix_row(11), address(1, 32));
        assert_eq!(lfo(2, LFO_KEYSYNC), address(1, 51));
        assert_eq!(lfo_phase(0), address(1, 68));
        assert_eq!(im_velocity(5), 15);
        assert_eq!(carrier_pan(5), 27);
    }

    #[test]
    fn name_range() {
        assert!(is_preset_name(1, 100));
        assert!(is_preset_name(1, 111));
        assert!(!is_preset_name(1, 112));
        assert!(!is_preset_name(0, 100));
    }

    #[test]
    fn envelope_times_accumulate() {
        assert_eq!(cumulative_times([10, 20, 50, 30]), [10, 30, 80, 110]);
        assert_eq!(relative_times([10, 30, 80, 110]), [10, 20, 50, 30]);
        // out-of-order stage is clamped instead of wrapping
        assert_eq!(relative_times([50, 20, 70, 70]), [50, 0, 20, 0]);
    }

    #[test]
    fn fixed_point() {
        assert_eq!(from_fixed(1625, HUNDREDTHS, DETUNE_CENTER), 0.25);
        assert_eq!(to_fixed(-0.5, HUNDREDTHS, DETUNE_CENTER), 1550);
        assert_eq!(to_fixed(-3.0, HUNDREDTHS, 0), 0);
        assert_eq!(from_fixed(0, HUNDREDTHS, MULTIPLIER_CENTER), -10.0);
    }
}
