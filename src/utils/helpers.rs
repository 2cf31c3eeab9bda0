/// Join two 7-bit bytes into a 14-bit value
pub fn join_14bit(msb: u8, lsb: u8) -> u16 {
    ((msb as u16 & 0x7F) << 7) | (lsb as u16 & 0x7F)
}

/// Split a 14-bit value into its MSB and LSB 7-bit halves
pub fn split_14bit(value: u16) -> (u8, u8) {
    (((value >> 7) & 0x7F) as u8, (value & 0x7F) as u8)
}

/// Format a frequency value with appropriate unit suffix (Hz, kHz)
pub fn format_frequency(freq: f32) -> String {
    if freq >= 1000.0 {
        format!("{:.2} kHz", freq / 1000.0)
    } else {
        format!("{:.2} Hz", freq)
    }
}

/// Format a time value with appropriate unit suffix (ms, s)
pub fn format_time(time_in_seconds: f32) -> String {
    if time_in_seconds >= 1.0 {
        format!("{:.2} s", time_in_seconds)
    } else {
        format!("{:.0} ms", time_in_seconds * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourteen_bit_halves() {
        assert_eq!(join_14bit(1, 100), 228);
        assert_eq!(split_14bit(228), (1, 100));
        assert_eq!(split_14bit(16383), (127, 127));
        // bit 14 and above are dropped
        assert_eq!(split_14bit(16384), (0, 0));
    }

    #[test]
    fn formatting() {
        assert_eq!(format_time(0.25), "250 ms");
        assert_eq!(format_time(1.5), "1.50 s");
        assert_eq!(format_frequency(440.0), "440.00 Hz");
        assert_eq!(format_frequency(2500.0), "2.50 kHz");
    }
}
