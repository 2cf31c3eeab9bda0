use serde::{Deserialize, Serialize};

/// Rows in the modulation matrix.
pub const MATRIX_ROW_COUNT: usize = 12;

pub const MATRIX_SOURCES: [&str; 28] = [
    "None",
    "LFO 1",
    "LFO 2",
    "LFO 3",
    "LFO Env 1",
    "LFO Env 2",
    "LFO Seq 1",
    "LFO Seq 2",
    "Mod Wheel",
    "Pitch Bend",
    "Aftertouch",
    "Velocity",
    "Note 1",
    "CC 1",
    "CC 2",
    "CC 3",
    "CC 4",
    "Note 2",
    "Breath",
    "MPE Slide",
    "Random",
    "Poly AT",
    "User CC 1",
    "User CC 2",
    "User CC 3",
    "User CC 4",
    "MPE Pressure",
    "MPE Bend",
];

pub const MATRIX_DESTINATIONS: [&str; 54] = [
    "None",
    "Gate",
    "IM 1",
    "IM 2",
    "IM 3",
    "IM 4",
    "IM 5",
    "IM 6",
    "IM All",
    "Mix 1",
    "Mix 2",
    "Mix 3",
    "Mix 4",
    "Mix All",
    "Pan 1",
    "Pan 2",
    "Pan 3",
    "Pan 4",
    "Pan All",
    "Osc 1 Freq",
    "Osc 2 Freq",
    "Osc 3 Freq",
    "Osc 4 Freq",
    "Osc 5 Freq",
    "Osc 6 Freq",
    "Osc All Freq",
    "Env 1 Attack",
    "Env 2 Attack",
    "Env 3 Attack",
    "Env 4 Attack",
    "Env 5 Attack",
    "Env 6 Attack",
    "Env All Attack",
    "Env All Decay",
    "Env All Release",
    "Mtx 1 Mul",
    "Mtx 2 Mul",
    "Mtx 3 Mul",
    "Mtx 4 Mul",
    "LFO 1 Freq",
    "LFO 2 Freq",
    "LFO 3 Freq",
    "LFO Env 2 Silence",
    "Seq 1 Gate",
    "Seq 2 Gate",
    "Filter Param 1",
    "Filter Param 2",
    "Filter Gain",
    "Carrier Env Attack",
    "Carrier Env Release",
    "Modulator Env Attack",
    "Modulator Env Release",
    "Osc All Detune",
    "Unison Detune",
];

/// Name for a wire index. Indices outside the table render as `Unknown(n)`.
pub fn entry_name(table: &[&str], raw: u16) -> String {
    match table.get(raw as usize) {
        Some(name) => name.to_string(),
        None => format!("Unknown({raw})"),
    }
}

/// Wire index for a name produced by [`entry_name`], `Unknown(n)` included.
pub fn entry_index(table: &[&str], name: &str) -> Option<u16> {
    if let Some(position) = table.iter().position(|entry| *entry == name) {
        return Some(position as u16);
    }
    name.strip_prefix("Unknown(")
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|number| number.parse().ok())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub source: String,
    /// -10.0..=10.0
    pub multiplier: f32,
    pub destination1: String,
    /// Not every firmware revision transmits this one.
    pub destination2: String,
}

impl Default for MatrixRow {
    fn default() -> Self {
        Self {
            source: MATRIX_SOURCES[0].to_string(),
            multiplier: 0.0,
            destination1: MATRIX_DESTINATIONS[0].to_string(),
            destination2: MATRIX_DESTINATIONS[0].to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_entries_survive_a_round_trip() {
        assert_eq!(entry_name(&MATRIX_SOURCES, 11), "Velocity");
        assert_eq!(entry_name(&MATRIX_SOURCES, 40), "Unknown(40)");
        assert_eq!(entry_index(&MATRIX_SOURCES, "Unknown(40)"), Some(40));
        assert_eq!(entry_index(&MATRIX_DESTINATIONS, "Mix 3"), Some(11));
        assert_eq!(entry_index(&MATRIX_DESTINATIONS, "Nope"), None);
    }

    #[test]
    fn names_are_unique() {
        for table in [&MATRIX_SOURCES[..], &MATRIX_DESTINATIONS[..]] {
            for (index, name) in table.iter().enumerate() {
                assert_eq!(entry_index(table, name), Some(index as u16));
            }
        }
    }
}
