use crossbeam_channel::Sender;
use log::{error, warn};
use midir::{MidiInput, MidiInputConnection};
use std::sync::{Arc, Mutex};

use crate::core::codec::sysex::is_valid_frame;
use crate::core::codec::NrpnAccumulator;

use super::message::{
    parse_midi_message, MidiMessage, Nrpn, CC_DATA_ENTRY_LSB, CC_DATA_ENTRY_MSB, CC_NRPN_LSB,
    CC_NRPN_MSB,
};

const CLIENT_NAME: &str = "PreenFM3 Editor Input";

/// What the input side reports after feeding the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// An NRPN quad completed and was stored.
    Nrpn(Nrpn),
    /// A plain controller, outside the NRPN sequence.
    ControlChange { controller: u8, value: u8 },
    /// A well-framed SysEx message.
    SysEx(Vec<u8>),
}

/// Handles MIDI input from the synth
pub struct MidiInputHandler {
    connection: Option<MidiInputConnection<()>>,
    accumulator: Arc<Mutex<NrpnAccumulator>>,
    event_sender: Sender<DeviceEvent>,
    channel: u8,
}

impl MidiInputHandler {
    /// `channel` is 0-based; messages on other channels are ignored.
    pub fn new(
        accumulator: Arc<Mutex<NrpnAccumulator>>,
        event_sender: Sender<DeviceEvent>,
        channel: u8,
    ) -> Self {
        Self {
            connection: None,
            accumulator,
            event_sender,
            channel: channel & 0x0F,
        }
    }

    /// List all available MIDI input ports
    pub fn list_ports(&self) -> Vec<String> {
        let mut port_names = Vec::new();

        match MidiInput::new(CLIENT_NAME) {
            Ok(midi_in) => {
                for port in midi_in.ports() {
                    if let Ok(name) = midi_in.port_name(&port) {
                        port_names.push(name);
                    }
                }
            }
            Err(err) => {
                error!("Error initializing MIDI input: {}", err);
            }
        }

        port_names
    }

    /// Connect to a specific MIDI input port by name
    pub fn connect_to_port(&mut self, port_name: &str) -> Result<(), String> {
        self.disconnect();

        let mut midi_in = MidiInput::new(CLIENT_NAME)
            .map_err(|err| format!("Failed to create MIDI input: {}", err))?;
        // keep SysEx, drop clock and active sensing
        midi_in.ignore(midir::Ignore::TimeAndActiveSense);

        let port = midi_in
            .ports()
            .into_iter()
            .find(|port| {
                midi_in
                    .port_name(port)
                    .map(|name| name == port_name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| format!("MIDI port '{}' not found", port_name))?;

        let accumulator = Arc::clone(&self.accumulator);
        let sender = self.event_sender.clone();
        let channel = self.channel;

        let connection = midi_in
            .connect(
                &port,
                "preenfm3-read-input",
                move |_stamp, message, _| {
                    Self::handle_midi_message(message, channel, &accumulator, &sender);
                },
                (),
            )
            .map_err(|err| format!("Failed to connect to MIDI port: {}", err))?;

        self.connection = Some(connection);
        Ok(())
    }

    /// Disconnect from the currently connected MIDI port
    pub fn disconnect(&mut self) {
        self.connection = None;
    }

    /// Apply one raw message to the accumulator and report what it produced. The accumulator
    /// lock is held for this single message only.
    pub fn handle_midi_message(
        message: &[u8],
        channel: u8,
        accumulator: &Mutex<NrpnAccumulator>,
        sender: &Sender<DeviceEvent>,
    ) {
        let event = match parse_midi_message(message) {
            Some(MidiMessage::ControlChange {
                channel: message_channel,
                controller,
                value,
            }) if message_channel == channel => {
                let completed = match accumulator.lock() {
                    Ok(mut accumulator) => accumulator.add_control_change(controller, value),
                    Err(_) => {
                        error!("NRPN accumulator lock poisoned; dropping CC {controller}");
                        return;
                    }
                };
                match controller {
                    CC_NRPN_MSB | CC_NRPN_LSB | CC_DATA_ENTRY_MSB | CC_DATA_ENTRY_LSB => {
                        completed.map(DeviceEvent::Nrpn)
                    }
                    _ => Some(DeviceEvent::ControlChange { controller, value }),
                }
            }
            Some(MidiMessage::SysEx(bytes)) => {
                if is_valid_frame(&bytes) {
                    Some(DeviceEvent::SysEx(bytes))
                } else {
                    warn!("Dropping SysEx message without a closing F7 ({} bytes)", bytes.len());
                    None
                }
            }
            _ => None,
        };

        if let Some(event) = event {
            sender.send(event).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn nrpn_quad_reaches_the_accumulator() {
        let accumulator = Mutex::new(NrpnAccumulator::new());
        let (sender, receiver) = unbounded();

        let nrpn = Nrpn::new(0, 16, 90);
        let bytes = crate::core::midi::WireMessage::Nrpn(nrpn).to_bytes(0);
        for message in bytes.chunks(3) {
            MidiInputHandler::handle_midi_message(message, 0, &accumulator, &sender);
        }

        assert_eq!(receiver.try_recv(), Ok(DeviceEvent::Nrpn(nrpn)));
        assert!(receiver.try_recv().is_err());
        assert_eq!(accumulator.lock().unwrap().value(0, 16), Some(90));
    }

    #[test]
    fn other_channels_and_broken_sysex_are_ignored() {
        let accumulator = Mutex::new(NrpnAccumulator::new());
        let (sender, receiver) = unbounded();

        MidiInputHandler::handle_midi_message(&[0xB5, 22, 10], 0, &accumulator, &sender);
        MidiInputHandler::handle_midi_message(&[0xF0, 0x7D, 0x50], 0, &accumulator, &sender);
        assert!(receiver.try_recv().is_err());

        MidiInputHandler::handle_midi_message(&[0xB0, 22, 10], 0, &accumulator, &sender);
        assert_eq!(
            receiver.try_recv(),
            Ok(DeviceEvent::ControlChange {
                controller: 22,
                value: 10
            })
        );
    }
}
