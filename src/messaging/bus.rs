use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, warn};
use std::sync::{Arc, RwLock};

use super::EditorMessage;
use crate::core::codec::{
    assemble_patch, decode_patch_sysex, dump_request, encode_patch, AssembleOptions,
    CommandEncoder, NrpnAccumulator,
};
use crate::core::midi::{Preenfm3Cc, WireMessage};
use crate::core::patch::PatchEdit;
use crate::core::Patch;

/// MessageBus owns the current patch and turns editor messages into patch changes and
/// outbound wire messages
pub struct MessageBus {
    pub(crate) sender: Sender<EditorMessage>,
    pub(crate) receiver: Receiver<EditorMessage>,
    patch_ref: Arc<RwLock<Patch>>,
    outbound: Sender<WireMessage>,
    default_patch_name: String,
}

impl MessageBus {
    /// Create a bus around `patch`; wire messages go to `outbound`
    pub fn new(patch: Arc<RwLock<Patch>>, outbound: Sender<WireMessage>) -> Self {
        let (sender, receiver) = unbounded();

        MessageBus {
            sender,
            receiver,
            patch_ref: patch,
            outbound,
            default_patch_name: AssembleOptions::default().default_name,
        }
    }

    /// Name given to dumps without a preset name
    pub fn with_default_patch_name(mut self, name: impl Into<String>) -> Self {
        self.default_patch_name = name.into();
        self
    }

    /// Get a sender that can be cloned and handed to the MIDI side
    pub fn sender(&self) -> Sender<EditorMessage> {
        self.sender.clone()
    }

    pub fn patch(&self) -> Arc<RwLock<Patch>> {
        Arc::clone(&self.patch_ref)
    }

    /// Process up to `max_messages` pending messages; returns how many were handled
    pub fn process_messages(&self, max_messages: usize) -> usize {
        let mut count = 0;

        while count < max_messages {
            let Ok(msg) = self.receiver.try_recv() else {
                break;
            };
            count += 1;

            self.handle_message(msg);
        }
        count
    }

    /// Handle an individual message
    fn handle_message(&self, msg: EditorMessage) {
        match msg {
            EditorMessage::Edit { edit, send } => self.apply_edit(&edit, send),
            EditorMessage::DumpReceived(dump) => self.replace_from_dump(&dump),
            EditorMessage::SysExReceived(bytes) => {
                if let Ok(mut patch) = self.patch_ref.write() {
                    let options = self.assemble_options(&patch);
                    match decode_patch_sysex(&bytes, &options) {
                        Ok(decoded) => *patch = keep_midi_settings(decoded, &patch),
                        Err(err) => warn!("Dropped SysEx message: {}", err),
                    }
                }
            }
            EditorMessage::ControlChangeReceived { controller, value } => {
                let edit = self.patch_ref.read().ok().and_then(|patch| {
                    Preenfm3Cc::from_number(controller)?.to_edit(value, &patch.algorithm)
                });
                match edit {
                    Some(edit) => self.apply_edit(&edit, false),
                    None => debug!("Ignoring CC {} = {}", controller, value),
                }
            }
            EditorMessage::RequestDump => self.emit(dump_request()),
            EditorMessage::SendPatch => {
                let writes = match self.patch_ref.read() {
                    Ok(patch) => encode_patch(&patch),
                    Err(_) => return,
                };
                for nrpn in writes {
                    self.emit(WireMessage::Nrpn(nrpn));
                }
            }
            EditorMessage::ResetPatch => {
                if let Ok(mut patch) = self.patch_ref.write() {
                    *patch = keep_midi_settings(Patch::default(), &patch);
                }
            }
        }
    }

    fn apply_edit(&self, edit: &PatchEdit, send: bool) {
        let Ok(mut patch) = self.patch_ref.write() else {
            error!("Patch lock poisoned; dropping {:?}", edit);
            return;
        };

        if let Err(err) = patch.apply(edit) {
            warn!("Rejected edit {:?}: {}", edit, err);
            return;
        }
        if !send || !patch.midi.send_edits {
            return;
        }

        match CommandEncoder::new(&patch.algorithm).encode(edit) {
            Ok(messages) => {
                for message in messages {
                    self.emit(message);
                }
            }
            Err(err) => warn!("Skipped send for {:?}: {}", edit, err),
        }
    }

    fn replace_from_dump(&self, dump: &NrpnAccumulator) {
        if let Ok(mut patch) = self.patch_ref.write() {
            let options = self.assemble_options(&patch);
            let assembled = assemble_patch(dump, &options);
            *patch = keep_midi_settings(assembled, &patch);
        }
    }

    fn assemble_options(&self, previous: &Patch) -> AssembleOptions {
        AssembleOptions {
            default_name: self.default_patch_name.clone(),
            ..AssembleOptions::keeping(previous)
        }
    }

    /// Fire-and-forget; a closed outbound channel only loses the message
    fn emit(&self, message: WireMessage) {
        if self.outbound.send(message).is_err() {
            warn!("Outbound MIDI channel closed; message dropped");
        }
    }

    /// Public method to send a message
    pub fn send(&self, msg: EditorMessage) -> Result<(), crossbeam_channel::SendError<EditorMessage>> {
        self.sender.send(msg)
    }
}

/// MIDI settings belong to the editor session, not to the patch on the device.
fn keep_midi_settings(mut patch: Patch, previous: &Patch) -> Patch {
    patch.midi = previous.midi.clone();
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::encode_patch_sysex;

    fn bus() -> (MessageBus, Receiver<WireMessage>) {
        let (outbound, wire) = unbounded();
        let bus = MessageBus::new(Arc::new(RwLock::new(Patch::default())), outbound);
        (bus, wire)
    }

    #[test]
    fn edits_are_applied_and_sent() {
        let (bus, wire) = bus();
        bus.send(EditorMessage::Edit {
            edit: PatchEdit::Mix {
                operator: 3,
                amplitude: 50,
            },
            send: true,
        })
        .unwrap();
        assert_eq!(bus.process_messages(10), 1);

        assert_eq!(bus.patch().read().unwrap().operator(3).unwrap().amplitude, 50);
        // DX 1 carriers are 1 and 3
        assert_eq!(
            wire.try_recv(),
            Ok(WireMessage::ControlChange {
                controller: Preenfm3Cc::Mix(2).number().unwrap(),
                value: 50
            })
        );
    }

    #[test]
    fn unsendable_edit_still_changes_the_patch() {
        let (bus, wire) = bus();
        bus.send(EditorMessage::Edit {
            edit: PatchEdit::SelectAlgorithm(31),
            send: false,
        })
        .unwrap();
        bus.send(EditorMessage::Edit {
            edit: PatchEdit::Pan {
                operator: 6,
                pan: -1.0,
            },
            send: true,
        })
        .unwrap();
        bus.process_messages(10);

        assert_eq!(bus.patch().read().unwrap().operator(6).unwrap().pan, -1.0);
        assert!(wire.try_recv().is_err());
    }

    #[test]
    fn process_messages_respects_the_limit() {
        let (bus, _wire) = bus();
        for _ in 0..3 {
            bus.send(EditorMessage::RequestDump).unwrap();
        }
        assert_eq!(bus.process_messages(2), 2);
        assert_eq!(bus.process_messages(10), 1);
    }

    #[test]
    fn dump_replaces_the_patch_but_keeps_polyphony() {
        let (bus, _wire) = bus();
        bus.send(EditorMessage::Edit {
            edit: PatchEdit::Polyphony(2),
            send: true,
        })
        .unwrap();

        let mut dump = NrpnAccumulator::new();
        dump.add_message(0, 0, 0, 9);
        bus.send(EditorMessage::DumpReceived(dump)).unwrap();
        bus.process_messages(10);

        let patch = bus.patch();
        let patch = patch.read().unwrap();
        assert_eq!(patch.algorithm.index, 9);
        assert_eq!(patch.global.polyphony, 2);
        assert_eq!(patch.name, "MIDI Patch");
    }

    #[test]
    fn reset_keeps_midi_settings() {
        let (bus, wire) = bus();
        {
            let patch = bus.patch();
            let mut patch = patch.write().unwrap();
            patch.midi.channel = 7;
            patch.midi.send_edits = false;
        }
        bus.send(EditorMessage::Edit {
            edit: PatchEdit::SelectAlgorithm(12),
            send: true,
        })
        .unwrap();
        bus.send(EditorMessage::ResetPatch).unwrap();
        bus.process_messages(10);

        let patch = bus.patch();
        let patch = patch.read().unwrap();
        assert_eq!(patch.algorithm.index, 0);
        assert_eq!(patch.name, "Init");
        assert_eq!(patch.midi.channel, 7);
        assert!(!patch.midi.send_edits);
        // send_edits is off, so the algorithm change stayed local
        assert!(wire.try_recv().is_err());
    }

    #[test]
    fn unnamed_dump_uses_the_configured_name() {
        let (outbound, _wire) = unbounded();
        let bus = MessageBus::new(Arc::new(RwLock::new(Patch::default())), outbound)
            .with_default_patch_name("From Device");
        bus.sender()
            .send(EditorMessage::DumpReceived(NrpnAccumulator::new()))
            .unwrap();
        bus.process_messages(1);
        assert_eq!(bus.patch().read().unwrap().name, "From Device");
    }

    #[test]
    fn echoed_cc_updates_without_sending() {
        let (bus, wire) = bus();
        bus.send(EditorMessage::ControlChangeReceived {
            controller: Preenfm3Cc::Algo.number().unwrap(),
            value: 4,
        })
        .unwrap();
        bus.process_messages(10);
        assert_eq!(bus.patch().read().unwrap().algorithm.index, 4);
        assert!(wire.try_recv().is_err());
    }

    #[test]
    fn sysex_dump_and_send_patch() {
        let (bus, wire) = bus();
        let mut source = Patch::new("Organ");
        source.select_algorithm(31).unwrap();
        bus.send(EditorMessage::SysExReceived(encode_patch_sysex(&source)))
            .unwrap();
        bus.send(EditorMessage::SysExReceived(vec![0xF0, 0x01])).unwrap();
        bus.send(EditorMessage::SendPatch).unwrap();
        bus.process_messages(10);

        assert_eq!(bus.patch().read().unwrap().name, "Organ");
        let sent: Vec<WireMessage> = wire.try_iter().collect();
        assert_eq!(sent.len(), encode_patch(&source).len());
    }
}
