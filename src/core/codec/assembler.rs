use log::debug;

use crate::core::algorithm::{Algorithm, OperatorRole, ALGORITHM_COUNT};
use crate::core::patch::lfo::MIDI_CLOCK_RAW_BASE;
use crate::core::patch::modulation::entry_name;
use crate::core::patch::{
    Adsr, ArpClock, ArpDirection, EnvelopePoint, KeyboardTracking, Lfo, LfoRate, LfoShape,
    MatrixRow, MidiClockDivision, Operator, Patch, PlayMode, Waveform, MATRIX_DESTINATIONS,
    MATRIX_SOURCES,
};

use super::accumulator::NrpnAccumulator;
use super::layout::{self, HUNDREDTHS, TENTHS};

/// Things a dump doesn't say that the caller has to.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembleOptions {
    /// Used when the dump carries no preset name.
    pub default_name: String,
    /// Voice count to keep; dumps don't include it.
    pub polyphony: u8,
}

impl AssembleOptions {
    /// Options that keep what `previous` knows about fields missing from a dump.
    pub fn keeping(previous: &Patch) -> Self {
        Self {
            polyphony: previous.global.polyphony,
            ..Self::default()
        }
    }
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            default_name: "MIDI Patch".to_string(),
            polyphony: Patch::default().global.polyphony,
        }
    }
}

/// Rebuild a complete patch from whatever the accumulator holds.
///
/// Missing addresses fall back to the same defaults an init patch uses, so a partial or empty
/// dump still gives a usable patch. This never fails.
pub fn assemble_patch(dump: &NrpnAccumulator, options: &AssembleOptions) -> Patch {
    let algorithm_index = dump
        .value_at(layout::ALGORITHM)
        .map(usize::from)
        .filter(|index| *index < ALGORITHM_COUNT)
        .unwrap_or(0);
    let algorithm = Algorithm::from_index(algorithm_index).unwrap_or_default();

    let name = match dump.preset_name() {
        name if name.is_empty() => options.default_name.clone(),
        name => name,
    };

    let mut patch = Patch::new(name);
    patch.operators = algorithm
        .operator_ids()
        .into_iter()
        .enumerate()
        .map(|(position, id)| read_operator(dump, &algorithm, position, id))
        .collect();
    patch.algorithm = algorithm;

    read_modulation_slots(dump, &mut patch);
    read_carriers(dump, &mut patch);

    for (row, slot) in patch.modulation_matrix.iter_mut().enumerate() {
        *slot = read_matrix_row(dump, row);
    }
    for (index, lfo) in patch.lfos.iter_mut().enumerate() {
        *lfo = read_lfo(dump, index);
    }

    read_globals(dump, &mut patch, options);

    debug!(
        "Assembled '{}' on {} from {} NRPN values",
        patch.name,
        patch.algorithm.name,
        dump.len()
    );
    patch
}

fn read_operator(
    dump: &NrpnAccumulator,
    algorithm: &Algorithm,
    position: usize,
    id: u8,
) -> Operator {
    let role = algorithm.role_of(id).unwrap_or(OperatorRole::Modulator);
    let mut operator = Operator::new(id, role);
    operator.targets = Operator::links_from(algorithm, id);

    let osc = |field| dump.value_at(layout::oscillator(position, field));
    if let Some(raw) = osc(layout::OSC_WAVEFORM) {
        operator.waveform = Waveform::from_raw(raw);
    }
    if let Some(raw) = osc(layout::OSC_TRACKING) {
        operator.keyboard_tracking = KeyboardTracking::from_raw(raw);
    }
    if let Some(raw) = osc(layout::OSC_FREQUENCY) {
        operator.frequency = layout::from_fixed(raw, HUNDREDTHS, 0);
    }
    if let Some(raw) = osc(layout::OSC_DETUNE) {
        operator.detune = layout::from_fixed(raw, HUNDREDTHS, layout::DETUNE_CENTER);
    }

    operator.adsr = read_envelope(dump, position, &operator.adsr);
    operator
}

/// Envelope deltas become cumulative times. Stages the dump skips keep their default delta.
fn read_envelope(dump: &NrpnAccumulator, position: usize, defaults: &Adsr) -> Adsr {
    let default_points = defaults.points();
    let default_deltas = layout::relative_times(
        default_points.map(|point| (point.time * HUNDREDTHS).round().max(0.0) as u32),
    );

    let mut deltas = [0u16; 4];
    let mut levels = [0f32; 4];
    for stage in 0..4 {
        deltas[stage] = dump
            .value_at(layout::envelope_time(position, stage))
            .unwrap_or(default_deltas[stage]);
        levels[stage] = dump
            .value_at(layout::envelope_level(position, stage))
            .map(|raw| raw.min(100) as f32)
            .unwrap_or(default_points[stage].level);
    }

    let times = layout::cumulative_times(deltas);
    let mut points = [EnvelopePoint::default(); 4];
    for stage in 0..4 {
        points[stage] = EnvelopePoint::new(times[stage] as f32 / HUNDREDTHS, levels[stage]);
    }
    Adsr::from_points(points)
}

/// IM slots are positional: operators low to high, then each operator's edges in order.
fn read_modulation_slots(dump: &NrpnAccumulator, patch: &mut Patch) {
    for slot in patch.algorithm.modulation_slots() {
        let Some(link) = patch
            .operators
            .iter_mut()
            .find(|op| op.id == slot.from)
            .and_then(|op| op.link_mut(slot.to))
        else {
            continue;
        };
        if let Some(raw) = dump.value_at(layout::im_value(slot.index)) {
            link.im = layout::from_fixed(raw, TENTHS, 0);
        }
        if let Some(raw) = dump.value_at(layout::im_velocity(slot.index)) {
            link.velocity_sensitivity = layout::from_fixed(raw, TENTHS, 0);
        }
    }
}

fn read_carriers(dump: &NrpnAccumulator, patch: &mut Patch) {
    let carriers = patch.algorithm.carriers();
    for (ordinal, id) in carriers.into_iter().enumerate().take(layout::CARRIER_SLOT_COUNT) {
        let Some(operator) = patch.operators.iter_mut().find(|op| op.id == id) else {
            continue;
        };
        if let Some(raw) = dump.value_at(layout::carrier_mix(ordinal)) {
            operator.amplitude = raw.min(127) as u8;
        }
        if let Some(raw) = dump.value_at(layout::carrier_pan(ordinal)) {
            operator.pan = layout::from_fixed(raw, HUNDREDTHS, layout::PAN_CENTER).clamp(-1.0, 1.0);
        }
    }
}

fn read_matrix_row(dump: &NrpnAccumulator, row: usize) -> MatrixRow {
    let base = layout::matrix_row(row);
    let field = |offset| dump.value_at(base + offset);
    let defaults = MatrixRow::default();

    MatrixRow {
        source: field(layout::MATRIX_SOURCE)
            .map(|raw| entry_name(&MATRIX_SOURCES, raw))
            .unwrap_or(defaults.source),
        multiplier: field(layout::MATRIX_MULTIPLIER)
            .map(|raw| layout::from_fixed(raw, HUNDREDTHS, layout::MULTIPLIER_CENTER))
            .unwrap_or(defaults.multiplier),
        destination1: field(layout::MATRIX_DESTINATION1)
            .map(|raw| entry_name(&MATRIX_DESTINATIONS, raw))
            .unwrap_or(defaults.destination1),
        destination2: field(layout::MATRIX_DESTINATION2)
            .map(|raw| entry_name(&MATRIX_DESTINATIONS, raw))
            .unwrap_or(defaults.destination2),
    }
}

fn read_lfo(dump: &NrpnAccumulator, index: usize) -> Lfo {
    let field = |offset| dump.value_at(layout::lfo(index, offset));
    let mut lfo = Lfo::default();

    if let Some(raw) = field(layout::LFO_SHAPE) {
        lfo.shape = LfoShape::from_raw(raw);
    }
    if let Some(raw) = field(layout::LFO_RATE) {
        lfo.rate = if raw >= MIDI_CLOCK_RAW_BASE {
            LfoRate::MidiClock(MidiClockDivision::from_raw(raw))
        } else {
            LfoRate::Hz(layout::from_fixed(raw, HUNDREDTHS, 0))
        };
    }
    if let Some(raw) = field(layout::LFO_BIAS) {
        lfo.bias = layout::from_fixed(raw, HUNDREDTHS, layout::BIAS_CENTER).clamp(-1.0, 1.0);
    }
    if let Some(raw) = field(layout::LFO_KEYSYNC) {
        lfo.keysync = match raw {
            0 => None,
            raw => Some(layout::from_fixed(raw.min(1601), HUNDREDTHS, 1)),
        };
    }
    if let Some(raw) = dump.value_at(layout::lfo_phase(index)) {
        lfo.phase = layout::from_fixed(raw, HUNDREDTHS, 0).clamp(0.0, 1.0);
    }
    lfo
}

fn read_globals(dump: &NrpnAccumulator, patch: &mut Patch, options: &AssembleOptions) {
    let read = |index| dump.value_at(index);

    if let Some(raw) = read(layout::VELOCITY_SENSITIVITY) {
        patch.global.velocity_sensitivity = raw.min(16) as u8;
    }
    if let Some(raw) = read(layout::PLAY_MODE) {
        patch.global.play_mode = PlayMode::from_raw(raw);
    }
    if let Some(raw) = read(layout::GLIDE) {
        patch.global.glide = raw.min(10) as u8;
    }
    // The dump's address 2 is play mode, so the voice count always comes from the caller.
    patch.global.polyphony = options.polyphony;

    let arp = &mut patch.arpeggiator;
    if let Some(raw) = read(layout::ARP_CLOCK) {
        arp.clock = ArpClock::from_raw(raw);
    }
    if let Some(raw) = read(layout::ARP_BPM) {
        arp.bpm = raw;
    }
    if let Some(raw) = read(layout::ARP_DIRECTION) {
        arp.direction = ArpDirection::from_raw(raw);
    }
    if let Some(raw) = read(layout::ARP_OCTAVE) {
        arp.octave = raw.min(u8::MAX as u16) as u8;
    }
    if let Some(raw) = read(layout::ARP_PATTERN) {
        arp.pattern = raw.min(u8::MAX as u16) as u8;
    }
    if let Some(raw) = read(layout::ARP_DIVISION) {
        arp.division = raw.min(u8::MAX as u16) as u8;
    }
    if let Some(raw) = read(layout::ARP_DURATION) {
        arp.duration = raw.min(u8::MAX as u16) as u8;
    }
    if let Some(raw) = read(layout::ARP_LATCH) {
        arp.latch = raw != 0;
    }

    let effects = &mut patch.effects;
    if let Some(raw) = read(layout::FILTER_TYPE) {
        effects.filter_type = raw.min(u8::MAX as u16) as u8;
    }
    if let Some(raw) = read(layout::FILTER_PARAM1) {
        effects.param1 = layout::from_fixed(raw, HUNDREDTHS, 0);
    }
    if let Some(raw) = read(layout::FILTER_PARAM2) {
        effects.param2 = layout::from_fixed(raw, HUNDREDTHS, 0);
    }
    if let Some(raw) = read(layout::FILTER_GAIN) {
        effects.gain = layout::from_fixed(raw, HUNDREDTHS, 0);
    }
}
