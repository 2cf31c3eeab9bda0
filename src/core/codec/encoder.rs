use log::warn;

use crate::core::algorithm::{Algorithm, ALGORITHM_COUNT, CARRIER_CONTROL_SLOTS};
use crate::core::midi::mapping::{pan_to_cc, Preenfm3Cc};
use crate::core::midi::message::{Nrpn, WireMessage};
use crate::core::patch::lfo::{LFO_COUNT, MIDI_CLOCK_RAW_BASE};
use crate::core::patch::modulation::entry_index;
use crate::core::patch::{
    Adsr, Lfo, LfoRate, MatrixRow, Operator, Patch, PatchEdit, MATRIX_DESTINATIONS,
    MATRIX_ROW_COUNT, MATRIX_SOURCES, PRESET_NAME_LENGTH,
};
use crate::core::CodecError;

use super::layout::{self, HUNDREDTHS, TENTHS};

/// Turns patch edits into wire messages for one algorithm.
///
/// Carrier controls (mix, pan) are numbered by the operator's rank among the algorithm's
/// carriers, and IM slots by the positional walk in [`Algorithm::modulation_slots`], so the
/// encoder has to be built for the algorithm the device currently runs.
pub struct CommandEncoder<'a> {
    algorithm: &'a Algorithm,
}

impl<'a> CommandEncoder<'a> {
    pub fn new(algorithm: &'a Algorithm) -> Self {
        Self { algorithm }
    }

    /// 1-based Mix/Pan control number of a carrier.
    pub fn carrier_control(&self, operator: u8) -> Result<u8, CodecError> {
        self.position(operator)?;
        let index = self
            .algorithm
            .carrier_index(operator)
            .ok_or(CodecError::NotACarrier { operator })?;
        if index >= CARRIER_CONTROL_SLOTS {
            return Err(CodecError::CarrierSlotUnavailable {
                operator,
                carrier_index: index,
            });
        }
        Ok(index as u8 + 1)
    }

    /// Wire controller of a carrier's Mix or Pan control.
    fn carrier_controller(
        &self,
        operator: u8,
        control: fn(u8) -> Preenfm3Cc,
    ) -> Result<u8, CodecError> {
        let ordinal = self.carrier_control(operator)?;
        control(ordinal)
            .number()
            .ok_or(CodecError::CarrierSlotUnavailable {
                operator,
                carrier_index: ordinal as usize - 1,
            })
    }

    /// Rank of an operator by ascending id; per-operator NRPN blocks are laid out by it.
    fn position(&self, operator: u8) -> Result<usize, CodecError> {
        self.algorithm
            .operator_ids()
            .iter()
            .position(|id| *id == operator)
            .ok_or(CodecError::UnknownOperator(operator))
    }

    /// Wire messages for one edit. An `Err` means the send is skipped; the caller decides
    /// whether to log it. Edits with no wire representation give an empty list.
    pub fn encode(&self, edit: &PatchEdit) -> Result<Vec<WireMessage>, CodecError> {
        let nrpns = match edit {
            PatchEdit::SelectAlgorithm(index) => {
                if *index >= ALGORITHM_COUNT {
                    return Err(CodecError::InvalidAlgorithm(*index));
                }
                vec![Nrpn::at(layout::ALGORITHM, *index as u16)]
            }
            PatchEdit::OperatorEnabled { operator, .. } => {
                self.position(*operator)?;
                Vec::new()
            }
            PatchEdit::Waveform { operator, waveform } => {
                let position = self.position(*operator)?;
                vec![Nrpn::at(
                    layout::oscillator(position, layout::OSC_WAVEFORM),
                    waveform.to_raw(),
                )]
            }
            PatchEdit::KeyboardTracking { operator, tracking } => {
                let position = self.position(*operator)?;
                vec![Nrpn::at(
                    layout::oscillator(position, layout::OSC_TRACKING),
                    tracking.to_raw(),
                )]
            }
            PatchEdit::Frequency {
                operator,
                frequency,
            } => {
                let position = self.position(*operator)?;
                vec![Nrpn::at(
                    layout::oscillator(position, layout::OSC_FREQUENCY),
                    layout::to_fixed(*frequency, HUNDREDTHS, 0),
                )]
            }
            PatchEdit::Detune { operator, detune } => {
                let position = self.position(*operator)?;
                vec![Nrpn::at(
                    layout::oscillator(position, layout::OSC_DETUNE),
                    layout::to_fixed(*detune, HUNDREDTHS, layout::DETUNE_CENTER),
                )]
            }
            PatchEdit::Mix {
                operator,
                amplitude,
            } => {
                return Ok(vec![WireMessage::ControlChange {
                    controller: self.carrier_controller(*operator, Preenfm3Cc::Mix)?,
                    value: (*amplitude).min(127),
                }]);
            }
            PatchEdit::Pan { operator, pan } => {
                return Ok(vec![WireMessage::ControlChange {
                    controller: self.carrier_controller(*operator, Preenfm3Cc::Pan)?,
                    value: pan_to_cc(*pan),
                }]);
            }
            PatchEdit::Envelope { operator, adsr } => {
                envelope_writes(self.position(*operator)?, adsr)
            }
            PatchEdit::ModulationAmount { source, target, im } => {
                let slot = self.modulation_slot(*source, *target)?;
                vec![Nrpn::at(
                    layout::im_value(slot),
                    layout::to_fixed(im.clamp(0.0, 10.0), TENTHS, 0),
                )]
            }
            PatchEdit::ModulationVelocity {
                source,
                target,
                velocity,
            } => {
                let slot = self.modulation_slot(*source, *target)?;
                vec![Nrpn::at(
                    layout::im_velocity(slot),
                    layout::to_fixed(velocity.clamp(0.0, 10.0), TENTHS, 0),
                )]
            }
            PatchEdit::MatrixRow { row, value } => {
                if *row >= MATRIX_ROW_COUNT {
                    return Err(CodecError::InvalidMatrixRow(*row));
                }
                matrix_writes(*row, value)
            }
            PatchEdit::Lfo { index, lfo } => {
                if *index >= LFO_COUNT {
                    return Err(CodecError::InvalidLfo(*index));
                }
                lfo_writes(*index, lfo)
            }
            PatchEdit::VelocitySensitivity(value) => vec![Nrpn::at(
                layout::VELOCITY_SENSITIVITY,
                (*value).min(16) as u16,
            )],
            PatchEdit::Glide(value) => vec![Nrpn::at(layout::GLIDE, (*value).min(10) as u16)],
            // No address carries the voice count in this firmware revision.
            PatchEdit::Polyphony(_) => Vec::new(),
            PatchEdit::PresetName(name) => name_writes(name),
        };

        Ok(nrpns.into_iter().map(WireMessage::Nrpn).collect())
    }

    fn modulation_slot(&self, from: u8, to: u8) -> Result<usize, CodecError> {
        self.algorithm
            .slot_for(from, to)
            .ok_or(CodecError::NoModulationSlot { from, to })
    }
}

/// The NRPN that asks the device for a full patch dump.
pub fn dump_request() -> WireMessage {
    WireMessage::Nrpn(Nrpn::new(
        layout::DUMP_REQUEST_MSB,
        layout::DUMP_REQUEST_LSB,
        0,
    ))
}

/// A whole patch as NRPN writes, laid out the way the device dumps it.
pub fn encode_patch(patch: &Patch) -> Vec<Nrpn> {
    let algorithm = &patch.algorithm;
    let mut writes = vec![
        Nrpn::at(layout::ALGORITHM, algorithm.index as u16),
        Nrpn::at(
            layout::VELOCITY_SENSITIVITY,
            patch.global.velocity_sensitivity.min(16) as u16,
        ),
        Nrpn::at(layout::PLAY_MODE, patch.global.play_mode.to_raw()),
        Nrpn::at(layout::GLIDE, patch.global.glide.min(10) as u16),
    ];

    for slot in algorithm.modulation_slots() {
        let Some(link) = patch.operator(slot.from).and_then(|op| op.link(slot.to)) else {
            continue;
        };
        writes.push(Nrpn::at(
            layout::im_value(slot.index),
            layout::to_fixed(link.im, TENTHS, 0),
        ));
        writes.push(Nrpn::at(
            layout::im_velocity(slot.index),
            layout::to_fixed(link.velocity_sensitivity, TENTHS, 0),
        ));
    }

    let carriers = algorithm.carriers();
    for (ordinal, id) in carriers.into_iter().enumerate().take(layout::CARRIER_SLOT_COUNT) {
        let Some(operator) = patch.operator(id) else {
            continue;
        };
        writes.push(Nrpn::at(
            layout::carrier_mix(ordinal),
            operator.amplitude.min(127) as u16,
        ));
        writes.push(Nrpn::at(
            layout::carrier_pan(ordinal),
            layout::to_fixed(operator.pan, HUNDREDTHS, layout::PAN_CENTER),
        ));
    }

    let arp = &patch.arpeggiator;
    writes.extend([
        Nrpn::at(layout::ARP_CLOCK, arp.clock.to_raw()),
        Nrpn::at(layout::ARP_BPM, arp.bpm),
        Nrpn::at(layout::ARP_DIRECTION, arp.direction.to_raw()),
        Nrpn::at(layout::ARP_OCTAVE, arp.octave as u16),
        Nrpn::at(layout::ARP_PATTERN, arp.pattern as u16),
        Nrpn::at(layout::ARP_DIVISION, arp.division as u16),
        Nrpn::at(layout::ARP_DURATION, arp.duration as u16),
        Nrpn::at(layout::ARP_LATCH, arp.latch as u16),
    ]);

    let effects = &patch.effects;
    writes.extend([
        Nrpn::at(layout::FILTER_TYPE, effects.filter_type as u16),
        Nrpn::at(layout::FILTER_PARAM1, layout::to_fixed(effects.param1, HUNDREDTHS, 0)),
        Nrpn::at(layout::FILTER_PARAM2, layout::to_fixed(effects.param2, HUNDREDTHS, 0)),
        Nrpn::at(layout::FILTER_GAIN, layout::to_fixed(effects.gain, HUNDREDTHS, 0)),
    ]);

    for (position, id) in algorithm.operator_ids().into_iter().enumerate() {
        match patch.operator(id) {
            Some(operator) => {
                writes.extend(oscillator_writes(position, operator));
                writes.extend(envelope_writes(position, &operator.adsr));
            }
            None => warn!("Patch has no operator {id}; its fields are left out of the dump"),
        }
    }

    for (row, value) in patch.modulation_matrix.iter().enumerate() {
        writes.extend(matrix_writes(row, value));
    }
    for (index, lfo) in patch.lfos.iter().enumerate() {
        writes.extend(lfo_writes(index, lfo));
    }
    writes.extend(name_writes(&patch.name));
    writes
}

fn oscillator_writes(position: usize, operator: &Operator) -> [Nrpn; 4] {
    let address = |field| layout::oscillator(position, field);
    [
        Nrpn::at(address(layout::OSC_WAVEFORM), operator.waveform.to_raw()),
        Nrpn::at(
            address(layout::OSC_TRACKING),
            operator.keyboard_tracking.to_raw(),
        ),
        Nrpn::at(
            address(layout::OSC_FREQUENCY),
            layout::to_fixed(operator.frequency, HUNDREDTHS, 0),
        ),
        Nrpn::at(
            address(layout::OSC_DETUNE),
            layout::to_fixed(operator.detune, HUNDREDTHS, layout::DETUNE_CENTER),
        ),
    ]
}

/// Cumulative model times go out as per-stage deltas.
fn envelope_writes(position: usize, adsr: &Adsr) -> Vec<Nrpn> {
    let points = adsr.normalized().points();
    let absolute = points.map(|point| (point.time * HUNDREDTHS).round().max(0.0) as u32);
    let deltas = layout::relative_times(absolute);

    let mut writes = Vec::with_capacity(8);
    for (stage, point) in points.iter().enumerate() {
        writes.push(Nrpn::at(layout::envelope_time(position, stage), deltas[stage]));
        writes.push(Nrpn::at(
            layout::envelope_level(position, stage),
            point.level.round().clamp(0.0, 100.0) as u16,
        ));
    }
    writes
}

fn matrix_writes(row: usize, value: &MatrixRow) -> Vec<Nrpn> {
    let base = layout::matrix_row(row);
    let index = |table: &[&str], name: &str| {
        entry_index(table, name).unwrap_or_else(|| {
            warn!("Matrix row {row}: unknown entry '{name}', sending None");
            0
        })
    };
    vec![
        Nrpn::at(
            base + layout::MATRIX_SOURCE,
            index(&MATRIX_SOURCES, &value.source),
        ),
        Nrpn::at(
            base + layout::MATRIX_MULTIPLIER,
            layout::to_fixed(
                value.multiplier.clamp(-10.0, 10.0),
                HUNDREDTHS,
                layout::MULTIPLIER_CENTER,
            ),
        ),
        Nrpn::at(
            base + layout::MATRIX_DESTINATION1,
            index(&MATRIX_DESTINATIONS, &value.destination1),
        ),
        Nrpn::at(
            base + layout::MATRIX_DESTINATION2,
            index(&MATRIX_DESTINATIONS, &value.destination2),
        ),
    ]
}

fn lfo_writes(index: usize, lfo: &Lfo) -> Vec<Nrpn> {
    let rate = match lfo.rate {
        // Anything at or above the clock base would read back as a clock division.
        LfoRate::Hz(hz) => layout::to_fixed(hz, HUNDREDTHS, 0).min(MIDI_CLOCK_RAW_BASE - 1),
        LfoRate::MidiClock(division) => division.to_raw(),
    };
    let keysync = match lfo.keysync {
        None => 0,
        Some(delay) => layout::to_fixed(delay.clamp(0.0, 16.0), HUNDREDTHS, 1),
    };
    vec![
        Nrpn::at(layout::lfo(index, layout::LFO_SHAPE), lfo.shape.to_raw()),
        Nrpn::at(layout::lfo(index, layout::LFO_RATE), rate),
        Nrpn::at(
            layout::lfo(index, layout::LFO_BIAS),
            layout::to_fixed(lfo.bias, HUNDREDTHS, layout::BIAS_CENTER),
        ),
        Nrpn::at(layout::lfo(index, layout::LFO_KEYSYNC), keysync),
        Nrpn::at(
            layout::lfo_phase(index),
            layout::to_fixed(lfo.phase, HUNDREDTHS, 0),
        ),
    ]
}

/// Twelve character writes, NUL padded. Non-ASCII characters go out as `?`.
fn name_writes(name: &str) -> Vec<Nrpn> {
    let mut bytes = [0u8; PRESET_NAME_LENGTH];
    for (slot, character) in bytes.iter_mut().zip(name.chars()) {
        *slot = if character.is_ascii() && !character.is_ascii_control() {
            character as u8
        } else {
            b'?'
        };
    }
    bytes
        .iter()
        .enumerate()
        .map(|(position, byte)| {
            let (msb, lsb) = layout::preset_name_char(position);
            Nrpn::new(msb, lsb, *byte as u16)
        })
        .collect()
}
