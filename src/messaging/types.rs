use crate::core::codec::NrpnAccumulator;
use crate::core::midi::DeviceEvent;
use crate::core::patch::PatchEdit;

/// Commands for the editor core
#[derive(Debug, Clone)]
pub enum EditorMessage {
    /// Change the patch; with `send`, also push the change to the device.
    Edit { edit: PatchEdit, send: bool },
    /// A finished NRPN dump replaces the patch.
    DumpReceived(NrpnAccumulator),
    /// A SysEx patch dump replaces the patch.
    SysExReceived(Vec<u8>),
    /// A plain CC echoed by the device.
    ControlChangeReceived { controller: u8, value: u8 },
    RequestDump,
    /// Push the whole current patch to the device.
    SendPatch,
    /// Back to an init patch, keeping MIDI settings.
    ResetPatch,
}

impl EditorMessage {
    /// The message a device event stands for on its own. Single NRPN writes have none; they
    /// only count once the whole dump is in.
    pub fn from_device_event(event: DeviceEvent) -> Option<Self> {
        match event {
            DeviceEvent::ControlChange { controller, value } => {
                Some(Self::ControlChangeReceived { controller, value })
            }
            DeviceEvent::SysEx(bytes) => Some(Self::SysExReceived(bytes)),
            DeviceEvent::Nrpn(_) => None,
        }
    }
}
