use log::debug;

use crate::core::midi::message::Nrpn;
use crate::core::patch::Patch;
use crate::core::CodecError;

use super::accumulator::NrpnAccumulator;
use super::assembler::{assemble_patch, AssembleOptions};
use super::encoder::encode_patch;

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;
/// Non-commercial manufacturer id.
pub const MANUFACTURER_ID: u8 = 0x7D;
pub const MODEL_ID: u8 = 0x50;
pub const COMMAND_PATCH_DUMP: u8 = 0x01;

const HEADER: [u8; 3] = [MANUFACTURER_ID, MODEL_ID, COMMAND_PATCH_DUMP];

/// A validated `F0 .. F7` frame borrowing its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysexFrame<'a> {
    payload: &'a [u8],
}

impl<'a> SysexFrame<'a> {
    /// Check framing and that every payload byte is 7-bit.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, CodecError> {
        if bytes.len() < 2 {
            return Err(CodecError::InvalidSysexFrame(format!(
                "{} bytes is too short for a frame",
                bytes.len()
            )));
        }
        if bytes[0] != SYSEX_START || bytes[bytes.len() - 1] != SYSEX_END {
            return Err(CodecError::InvalidSysexFrame(format!(
                "expected F0 .. F7, got {:02X} .. {:02X}",
                bytes[0],
                bytes[bytes.len() - 1]
            )));
        }
        let payload = &bytes[1..bytes.len() - 1];
        if let Some(position) = payload.iter().position(|byte| *byte > 0x7F) {
            return Err(CodecError::InvalidSysexFrame(format!(
                "status byte {:02X} inside the frame at {}",
                payload[position],
                position + 1
            )));
        }
        Ok(Self { payload })
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Payload after the manufacturer/model/command header, if this is a patch dump.
    pub fn patch_dump(&self) -> Result<&'a [u8], CodecError> {
        match self.payload.strip_prefix(&HEADER[..]) {
            Some(body) => Ok(body),
            None => Err(CodecError::UnsupportedSysex(format!(
                "header {:02X?}",
                &self.payload[..self.payload.len().min(HEADER.len())]
            ))),
        }
    }
}

/// Only checks the start and end bytes.
pub fn is_valid_frame(bytes: &[u8]) -> bool {
    bytes.first() == Some(&SYSEX_START) && bytes.last() == Some(&SYSEX_END)
}

/// Wrap a patch into a dump frame: the header, then one `msb lsb vmsb vlsb` quad per write.
pub fn encode_patch_sysex(patch: &Patch) -> Vec<u8> {
    let writes = encode_patch(patch);
    let mut bytes = Vec::with_capacity(2 + HEADER.len() + 4 * writes.len());
    bytes.push(SYSEX_START);
    bytes.extend_from_slice(&HEADER);
    for nrpn in &writes {
        bytes.extend_from_slice(&[
            nrpn.param_msb,
            nrpn.param_lsb,
            nrpn.value_msb(),
            nrpn.value_lsb(),
        ]);
    }
    bytes.push(SYSEX_END);
    bytes
}

/// Decode a dump frame into a patch. Bad framing or a foreign header rejects the whole frame;
/// nothing is partially applied.
pub fn decode_patch_sysex(bytes: &[u8], options: &AssembleOptions) -> Result<Patch, CodecError> {
    let frame = SysexFrame::parse(bytes)?;
    let body = frame.patch_dump()?;
    if body.len() % 4 != 0 {
        return Err(CodecError::InvalidSysexFrame(format!(
            "dump body of {} bytes is not a whole number of NRPN quads",
            body.len()
        )));
    }

    let mut dump = NrpnAccumulator::new();
    for quad in body.chunks_exact(4) {
        dump.add_nrpn(&Nrpn::from_parts(quad[0], quad[1], quad[2], quad[3]));
    }
    debug!("SysEx dump carried {} NRPN quads", body.len() / 4);
    Ok(assemble_patch(&dump, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::patch::PatchEdit;

    #[test]
    fn frame_validation() {
        assert!(is_valid_frame(&[0xF0, 0xF7]));
        assert!(!is_valid_frame(&[0xF0, 0x01]));
        assert!(!is_valid_frame(&[]));

        assert!(SysexFrame::parse(&[0xF0]).is_err());
        assert!(SysexFrame::parse(&[0xF0, 0x7D, 0x80, 0xF7]).is_err());
        let frame = SysexFrame::parse(&[0xF0, 0x7D, 0x50, 0x01, 0xF7]).unwrap();
        assert_eq!(frame.payload(), &[0x7D, 0x50, 0x01]);
        assert_eq!(frame.patch_dump().unwrap(), &[] as &[u8]);
    }

    #[test]
    fn foreign_header_is_rejected() {
        let bytes = [0xF0, 0x43, 0x00, 0x09, 0xF7];
        assert!(matches!(
            decode_patch_sysex(&bytes, &AssembleOptions::default()),
            Err(CodecError::UnsupportedSysex(_))
        ));
    }

    #[test]
    fn truncated_quad_is_rejected() {
        let bytes = [0xF0, 0x7D, 0x50, 0x01, 0, 0, 0, 0xF7];
        assert!(matches!(
            decode_patch_sysex(&bytes, &AssembleOptions::default()),
            Err(CodecError::InvalidSysexFrame(_))
        ));
    }

    #[test]
    fn patch_survives_a_sysex_trip() {
        let mut patch = Patch::new("Glass");
        patch.apply(&PatchEdit::SelectAlgorithm(4)).unwrap();
        patch
            .apply(&PatchEdit::Detune {
                operator: 2,
                detune: 0.75,
            })
            .unwrap();
        patch
            .apply(&PatchEdit::ModulationAmount {
                source: 6,
                target: 6,
                im: 3.3,
            })
            .unwrap();

        let bytes = encode_patch_sysex(&patch);
        assert!(is_valid_frame(&bytes));
        let decoded = decode_patch_sysex(&bytes, &AssembleOptions::default()).unwrap();
        assert_eq!(decoded.name, "Glass");
        assert_eq!(decoded.algorithm, patch.algorithm);
        assert_eq!(decoded.operators, patch.operators);
        assert_eq!(decoded.lfos, patch.lfos);
    }
}
