//! Thin midir binding for one PreenFM3.
//!
//! Input bytes are parsed in the midir callback and fed to a shared [`NrpnAccumulator`], one
//! message per lock. What comes out is reported as [`DeviceEvent`]s on a crossbeam channel.

pub mod input;
pub mod mapping;
pub mod message;
pub mod output;

pub use input::{DeviceEvent, MidiInputHandler};
pub use mapping::Preenfm3Cc;
pub use message::{MidiMessage, Nrpn, WireMessage};
pub use output::MidiOutputHandler;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::EditorConfig;
use crate::core::codec::{dump_request, NrpnAccumulator};

/// Port names containing this (case-insensitive) are picked when none is configured.
const DEVICE_NAME_HINT: &str = "preenfm";

/// A dump as the device sent it.
#[derive(Debug, Clone)]
pub enum ReceivedDump {
    Nrpn(NrpnAccumulator),
    SysEx(Vec<u8>),
}

/// Input and output ports of one device plus the accumulator they feed.
pub struct DeviceConnection {
    pub input: MidiInputHandler,
    pub output: MidiOutputHandler,
    accumulator: Arc<Mutex<NrpnAccumulator>>,
    event_sender: Sender<DeviceEvent>,
    events: Receiver<DeviceEvent>,
    channel: u8,
}

impl DeviceConnection {
    pub fn new(config: &EditorConfig) -> Self {
        let accumulator = Arc::new(Mutex::new(NrpnAccumulator::new()));
        let (event_sender, events) = unbounded();
        let channel = config.channel_index();

        let mut output = MidiOutputHandler::new(channel);
        output.set_throttle(config.cc_throttle_ms);

        Self {
            input: MidiInputHandler::new(Arc::clone(&accumulator), event_sender.clone(), channel),
            output,
            accumulator,
            event_sender,
            events,
            channel,
        }
    }

    /// Available `(inputs, outputs)`.
    pub fn list_ports(&self) -> (Vec<String>, Vec<String>) {
        (self.input.list_ports(), self.output.list_ports())
    }

    /// Connect both directions to the configured ports, or to the first ones that look like
    /// the synth.
    pub fn connect(&mut self, config: &EditorConfig) -> Result<(), String> {
        let (inputs, outputs) = self.list_ports();

        let input_port = pick_port(config.input_port.as_deref(), &inputs)
            .ok_or_else(|| "No PreenFM3 MIDI input found".to_string())?;
        self.input.connect_to_port(&input_port)?;

        let output_port = pick_port(config.output_port.as_deref(), &outputs)
            .ok_or_else(|| "No PreenFM3 MIDI output found".to_string())?;
        self.output.connect_to_port(&output_port)?;

        info!("Connected to '{}' / '{}' on channel {}", input_port, output_port, self.channel + 1);
        Ok(())
    }

    pub fn events(&self) -> &Receiver<DeviceEvent> {
        &self.events
    }

    /// Feed raw bytes as if they arrived on the input port.
    pub fn handle_bytes(&self, bytes: &[u8]) {
        MidiInputHandler::handle_midi_message(bytes, self.channel, &self.accumulator, &self.event_sender);
    }

    pub fn send(&mut self, message: &WireMessage) -> Result<(), String> {
        self.output.send(message)
    }

    /// Clear the accumulator and ask the device for its current patch.
    pub fn request_dump(&mut self) -> Result<(), String> {
        self.reset_accumulator();
        while self.events.try_recv().is_ok() {}
        self.output.send(&dump_request())
    }

    /// Copy of what has been accumulated so far.
    pub fn snapshot(&self) -> NrpnAccumulator {
        match self.accumulator.lock() {
            Ok(accumulator) => accumulator.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn reset_accumulator(&self) {
        match self.accumulator.lock() {
            Ok(mut accumulator) => accumulator.reset(),
            Err(poisoned) => poisoned.into_inner().reset(),
        }
    }

    /// Wait for a dump to finish. An NRPN dump has no end marker, so it counts as complete once
    /// nothing arrived for `idle`. A SysEx dump is complete when its frame arrives. Returns
    /// `None` when nothing at all arrived within `timeout`.
    pub fn wait_for_dump(&self, idle: Duration, timeout: Duration) -> Option<ReceivedDump> {
        let deadline = Instant::now() + timeout;
        let mut received = 0usize;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let remaining = deadline - now;
            let wait = if received == 0 { remaining } else { idle.min(remaining) };

            match self.events.recv_timeout(wait) {
                Ok(DeviceEvent::Nrpn(_)) => received += 1,
                Ok(DeviceEvent::SysEx(bytes)) => return Some(ReceivedDump::SysEx(bytes)),
                Ok(DeviceEvent::ControlChange { controller, value }) => {
                    debug!("CC {} = {} while waiting for a dump", controller, value);
                }
                Err(RecvTimeoutError::Timeout) if received > 0 => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if received == 0 {
            warn!("No dump received within {:?}", timeout);
            return None;
        }
        debug!("Dump finished after {} NRPN writes", received);
        Some(ReceivedDump::Nrpn(self.snapshot()))
    }
}

fn pick_port(configured: Option<&str>, available: &[String]) -> Option<String> {
    match configured {
        Some(name) => available.iter().find(|port| *port == name).cloned(),
        None => available
            .iter()
            .find(|port| port.to_lowercase().contains(DEVICE_NAME_HINT))
            .cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_are_picked_by_name_or_hint() {
        let ports = vec!["Midi Through".to_string(), "PreenFM3 MIDI 1".to_string()];
        assert_eq!(pick_port(None, &ports).as_deref(), Some("PreenFM3 MIDI 1"));
        assert_eq!(pick_port(Some("Midi Through"), &ports).as_deref(), Some("Midi Through"));
        assert_eq!(pick_port(Some("Nope"), &ports), None);
        assert_eq!(pick_port(None, &ports[..1]), None);
    }

    #[test]
    fn idle_gap_completes_an_nrpn_dump() {
        let connection = DeviceConnection::new(&EditorConfig::default());
        for nrpn in [Nrpn::new(0, 0, 3), Nrpn::new(0, 1, 12)] {
            for message in WireMessage::Nrpn(nrpn).to_bytes(0).chunks(3) {
                connection.handle_bytes(message);
            }
        }

        let dump = connection.wait_for_dump(Duration::from_millis(20), Duration::from_secs(2));
        let Some(ReceivedDump::Nrpn(dump)) = dump else {
            panic!("expected an NRPN dump");
        };
        assert_eq!(dump.value(0, 0), Some(3));
        assert_eq!(dump.value(0, 1), Some(12));
    }

    #[test]
    fn sysex_frame_completes_immediately() {
        let connection = DeviceConnection::new(&EditorConfig::default());
        connection.handle_bytes(&[0xF0, 0x7D, 0x50, 0x01, 0xF7]);
        let dump = connection.wait_for_dump(Duration::from_millis(20), Duration::from_secs(2));
        assert!(matches!(dump, Some(ReceivedDump::SysEx(bytes)) if bytes.len() == 5));
    }

    #[test]
    fn silence_times_out() {
        let connection = DeviceConnection::new(&EditorConfig::default());
        let dump = connection.wait_for_dump(Duration::from_millis(5), Duration::from_millis(30));
        assert!(dump.is_none());
    }
}
