use log::{debug, error};
use midir::{MidiOutput, MidiOutputConnection};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::message::WireMessage;

const CLIENT_NAME: &str = "PreenFM3 Editor Output";

/// Handles MIDI output to the synth
pub struct MidiOutputHandler {
    connection: Option<MidiOutputConnection>,
    last_sent: HashMap<u8, Instant>, // Control number -> last sent time
    throttle_ms: u64,                // Minimum ms between messages for the same control
    channel: u8,
}

impl MidiOutputHandler {
    /// `channel` is 0-based.
    pub fn new(channel: u8) -> Self {
        Self {
            connection: None,
            last_sent: HashMap::new(),
            throttle_ms: 20,
            channel: channel & 0x0F,
        }
    }

    /// Set the throttle time for plain control changes. 0 disables it.
    pub fn set_throttle(&mut self, ms: u64) {
        self.throttle_ms = ms;
    }

    /// List all available MIDI output ports
    pub fn list_ports(&self) -> Vec<String> {
        let mut port_names = Vec::new();

        match MidiOutput::new(CLIENT_NAME) {
            Ok(midi_out) => {
                for port in midi_out.ports() {
                    if let Ok(name) = midi_out.port_name(&port) {
                        port_names.push(name);
                    }
                }
            }
            Err(err) => {
                error!("Error initializing MIDI output: {}", err);
            }
        }

        port_names
    }

    /// Connect to a specific MIDI output port by name
    pub fn connect_to_port(&mut self, port_name: &str) -> Result<(), String> {
        self.disconnect();

        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|err| format!("Failed to create MIDI output: {}", err))?;

        let port = midi_out
            .ports()
            .into_iter()
            .find(|port| {
                midi_out
                    .port_name(port)
                    .map(|name| name == port_name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| format!("MIDI port '{}' not found", port_name))?;

        let connection = midi_out
            .connect(&port, "preenfm3-write-output")
            .map_err(|err| format!("Failed to connect to MIDI port: {}", err))?;

        self.connection = Some(connection);
        Ok(())
    }

    /// Disconnect from the currently connected MIDI port
    pub fn disconnect(&mut self) {
        self.connection = None;
        self.last_sent.clear();
    }

    /// Send one message. Plain control changes are throttled per controller; NRPN quads and
    /// SysEx always go out since dropping part of them would corrupt the parameter.
    pub fn send(&mut self, message: &WireMessage) -> Result<(), String> {
        let now = Instant::now();
        if let WireMessage::ControlChange { controller, .. } = message {
            if self.is_throttled(*controller, now) {
                debug!("Throttled CC {}", controller);
                return Ok(());
            }
        }

        let Some(conn) = &mut self.connection else {
            return Ok(());
        };

        let bytes = message.to_bytes(self.channel);
        match message {
            // Each control change is its own MIDI message.
            WireMessage::ControlChange { .. } | WireMessage::Nrpn(_) => {
                for chunk in bytes.chunks(3) {
                    conn.send(chunk)
                        .map_err(|err| format!("Failed to send MIDI message: {}", err))?;
                }
            }
            WireMessage::SysEx(_) => {
                conn.send(&bytes)
                    .map_err(|err| format!("Failed to send SysEx: {}", err))?;
            }
        }

        if let WireMessage::ControlChange { controller, .. } = message {
            self.last_sent.insert(*controller, now);
        }
        Ok(())
    }

    fn is_throttled(&self, controller: u8, now: Instant) -> bool {
        self.last_sent
            .get(&controller)
            .map(|last| now.duration_since(*last) < Duration::from_millis(self.throttle_ms))
            .unwrap_or(false)
    }
}
