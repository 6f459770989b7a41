//! Wire-level constants for the lighting firmware protocol.
//!
//! Two revisions coexist and must never be mixed on one link: the legacy
//! 8-bit boards (sync 0xAA, one byte per channel) and the 16-bit boards
//! (sync 0xFF, two bytes per channel over a 12-bit range). Action codes
//! 245-254 are reserved in both revisions; panel addresses stay well below
//! that range so a receiver can always tell a broadcast command from a
//! per-panel payload.

/// Whole-state commands, 2-byte packets (sync + code).
pub const ACTION_EMERGENCY: u8 = 254;
pub const ACTION_ALL_OFF: u8 = 253;
/// Strobe phase 0 commands: all white / all UV to full.
pub const ACTION_WHITE_ON: u8 = 252;
pub const ACTION_UV_ON: u8 = 251;

/// Zone commands carrying channel payloads.
pub const ACTION_FRONT_LEDS_SAME: u8 = 250;
pub const ACTION_FRONT_PANELS_SAME: u8 = 249;
pub const ACTION_REAR_LEDS_SAME: u8 = 248;
pub const ACTION_REAR_PANELS_SAME: u8 = 247;
pub const ACTION_WHITE_SET_ALL: u8 = 246;
pub const ACTION_UV_SET_ALL: u8 = 245;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Revision {
    EightBit,
    SixteenBit,
}

impl Revision {
    pub fn sync(self) -> u8 {
        match self {
            Revision::EightBit => 0xAA,
            Revision::SixteenBit => 0xFF,
        }
    }

    /// Replacement for a data byte that collides with the sync value.
    /// The 8-bit boards expect 170 -> 171, the 16-bit boards 255 -> 254.
    pub fn escaped(self) -> u8 {
        match self {
            Revision::EightBit => 0xAB,
            Revision::SixteenBit => 0xFE,
        }
    }

    pub fn escape(self, byte: u8) -> u8 {
        if byte == self.sync() {
            self.escaped()
        } else {
            byte
        }
    }

    /// Perceptual correction exponent applied before quantization.
    pub fn gamma(self) -> f32 {
        match self {
            Revision::EightBit => 2.2,
            Revision::SixteenBit => 3.4,
        }
    }

    /// Largest representable channel value: one byte 0-254, or a big-endian
    /// pair over a 12-bit range.
    pub fn max_channel(self) -> u16 {
        match self {
            Revision::EightBit => 254,
            Revision::SixteenBit => 4095,
        }
    }

    /// Append one quantized channel value, escaped.
    pub fn push_channel(self, out: &mut Vec<u8>, value: u16) {
        match self {
            Revision::EightBit => out.push(self.escape(value as u8)),
            Revision::SixteenBit => {
                out.push(self.escape((value >> 8) as u8));
                out.push(self.escape((value & 0xFF) as u8));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_remaps_only_sync_collisions() {
        assert_eq!(Revision::EightBit.escape(0xAA), 0xAB);
        assert_eq!(Revision::EightBit.escape(0xFF), 0xFF);
        assert_eq!(Revision::SixteenBit.escape(0xFF), 0xFE);
        assert_eq!(Revision::SixteenBit.escape(0xAA), 0xAA);
    }

    #[test]
    fn sixteen_bit_channel_is_big_endian() {
        let mut out = Vec::new();
        Revision::SixteenBit.push_channel(&mut out, 0x0ABC);
        assert_eq!(out, vec![0x0A, 0xBC]);
    }

    #[test]
    fn channel_bytes_never_equal_sync() {
        for v in 0..=4095u16 {
            let mut out = Vec::new();
            Revision::SixteenBit.push_channel(&mut out, v);
            assert!(out.iter().all(|b| *b != 0xFF));
        }
        for v in 0..=254u16 {
            let mut out = Vec::new();
            Revision::EightBit.push_channel(&mut out, v);
            assert!(out.iter().all(|b| *b != 0xAA));
        }
    }
}
