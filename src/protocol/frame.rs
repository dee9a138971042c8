use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result, DIMMER_COUNT, MAX_INSTANCE, SWITCH_COUNT};
use super::MANUFACTURER_TAG;

/// Minimum length of a received status payload
pub const STATUS_PAYLOAD_LEN: usize = 6;

/// Length of an outbound payload including the manufacturer tag
pub const COMMAND_PAYLOAD_LEN: usize = 8;

/// Data Model 2 contents of a PGN 65280 frame: two dimmer words and eight
/// switch bits for one API component instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFrame {
    /// API component instance as carried on the wire
    pub instance: u8,
    /// Dimmer levels, 0 = 0% .. 1000 = 100%
    pub dimmer_levels: [u16; DIMMER_COUNT],
    /// Switch bits, the first two mirror the dimmers' on/off state
    pub switches: [bool; SWITCH_COUNT],
}

impl DeviceFrame {
    /// Decodes a received status payload
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_status(bytes)
    }

    /// Decodes the analyzer's hex rendering of a payload, e.g. `"01 f4 01 e8 03 55"`
    pub fn from_hex(data: &str) -> Result<Self> {
        let bytes = crate::util::parse_hex_payload(data)?;
        decode_status(&bytes)
    }

    /// Encodes this frame as an outbound payload
    pub fn encode(&self) -> Bytes {
        encode_status(self.instance, self.dimmer_levels, self.switches)
    }

    /// Maps a received frame onto the logical instance.
    ///
    /// The NXT transmits status of logical instance X from its
    /// "Transmit to network" component X + 1.
    pub fn into_logical(self) -> Result<Self> {
        let instance = self
            .instance
            .checked_sub(1)
            .ok_or_else(|| Error::malformed_frame("received instance 0 has no logical instance"))?;
        if instance > MAX_INSTANCE {
            return Err(Error::malformed_frame(format!(
                "logical instance {} is outside 0..={}",
                instance, MAX_INSTANCE
            )));
        }
        Ok(DeviceFrame { instance, ..self })
    }
}

/// Reads instance, two little endian dimmer words and one byte of switch
/// bits (LSB first). Bytes beyond the sixth are ignored.
pub fn decode_status(bytes: &[u8]) -> Result<DeviceFrame> {
    if bytes.len() < STATUS_PAYLOAD_LEN {
        return Err(Error::malformed_frame(format!(
            "expected at least {} bytes, got {}",
            STATUS_PAYLOAD_LEN,
            bytes.len()
        )));
    }

    let mut buf = bytes;
    let instance = buf.get_u8();
    let dimmer_levels = [buf.get_u16_le(), buf.get_u16_le()];
    let switches = unpack_switches(buf.get_u8());

    Ok(DeviceFrame {
        instance,
        dimmer_levels,
        switches,
    })
}

/// Writes the manufacturer tag, instance, dimmer words and packed switch
/// bits. Values are not range checked here.
pub fn encode_status(
    instance: u8,
    dimmer_levels: [u16; DIMMER_COUNT],
    switches: [bool; SWITCH_COUNT],
) -> Bytes {
    let mut buf = BytesMut::with_capacity(COMMAND_PAYLOAD_LEN);
    buf.put_slice(&MANUFACTURER_TAG);
    buf.put_u8(instance);
    for level in dimmer_levels {
        buf.put_u16_le(level);
    }
    buf.put_u8(pack_switches(&switches));
    buf.freeze()
}

fn pack_switches(switches: &[bool; SWITCH_COUNT]) -> u8 {
    switches
        .iter()
        .enumerate()
        .filter(|(_, on)| **on)
        .fold(0u8, |bits, (i, _)| bits | (1 << i))
}

fn unpack_switches(bits: u8) -> [bool; SWITCH_COUNT] {
    std::array::from_fn(|i| ((bits >> i) & 0x01) == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALTERNATING: [bool; 8] = [true, false, true, false, true, false, true, false];

    #[test]
    fn test_decode_status() {
        let frame = decode_status(&[0x01, 0xF4, 0x01, 0xE8, 0x03, 0x55]).unwrap();
        assert_eq!(frame.instance, 1);
        assert_eq!(frame.dimmer_levels, [500, 1000]);
        assert_eq!(frame.switches, ALTERNATING);
    }

    #[test]
    fn test_encode_status() {
        let payload = encode_status(0, [500, 1000], ALTERNATING);
        assert_eq!(&payload[..], &[0x30, 0x99, 0x00, 0xF4, 0x01, 0xE8, 0x03, 0x55]);
        assert_eq!(payload.len(), COMMAND_PAYLOAD_LEN);
    }

    #[test]
    fn test_short_payload() {
        let err = decode_status(&[0x01, 0xF4, 0x01, 0xE8, 0x03]).unwrap_err();
        assert!(matches!(err, Error::MalformedFrame(_)));
        assert!(decode_status(&[]).is_err());
    }

    #[test]
    fn test_from_hex() {
        let frame = DeviceFrame::from_hex("01 f4 01\te8 03 55").unwrap();
        assert_eq!(frame.dimmer_levels, [500, 1000]);

        // Trailing bytes are ignored
        let frame = DeviceFrame::from_hex("93475265704961").unwrap();
        assert_eq!(frame.instance, 0x93);
        assert_eq!(frame.dimmer_levels, [0x5247, 0x7065]);

        assert!(DeviceFrame::from_hex("01f401").is_err());
        assert!(DeviceFrame::from_hex("zz f4 01 e8 03 55").is_err());
    }

    #[test]
    fn test_round_trip() {
        let levels = [0u16, 1, 500, 999, 1000];

        for instance in 0..=u8::MAX {
            for bits in 0..=u8::MAX {
                let switches = unpack_switches(bits);
                for (first, second) in levels.iter().zip(levels.iter().rev()) {
                    let dimmer_levels = [*first, *second];
                    let payload = encode_status(instance, dimmer_levels, switches);
                    // Skip the manufacturer tag, as the analyzer does
                    let frame = decode_status(&payload[MANUFACTURER_TAG.len()..]).unwrap();
                    assert_eq!(frame.instance, instance);
                    assert_eq!(frame.dimmer_levels, dimmer_levels);
                    assert_eq!(frame.switches, switches);
                }
            }
        }
    }

    #[test]
    fn test_into_logical() {
        let frame = decode_status(&[0x01, 0xF4, 0x01, 0xE8, 0x03, 0x55]).unwrap();
        let logical = frame.into_logical().unwrap();
        assert_eq!(logical.instance, 0);
        assert_eq!(logical.dimmer_levels, frame.dimmer_levels);

        let frame = DeviceFrame { instance: 0, ..frame };
        assert!(matches!(frame.into_logical(), Err(Error::MalformedFrame(_))));

        let frame = DeviceFrame { instance: 51, ..frame };
        assert!(frame.into_logical().is_err());
        let frame = DeviceFrame { instance: 50, ..frame };
        assert_eq!(frame.into_logical().unwrap().instance, 49);
    }
}
