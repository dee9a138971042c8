use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Utc};
use tokio_util::codec::Encoder;

use crate::core::Error;
use super::message::OutboundFrame;

/// Renders a payload in the Actisense serial text format understood by
/// the NMEA 2000 gateway:
/// `<timestamp>,2,<pgn>,0,<dst>,<len>,<hex bytes>`
pub fn to_actisense(
    timestamp: &DateTime<Utc>,
    pgn: u32,
    payload: &[u8],
    destination: u8,
) -> String {
    let data = payload
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{},2,{},0,{},{},{}",
        crate::util::iso_timestamp(timestamp),
        pgn,
        destination,
        payload.len(),
        data
    )
}

/// Line codec writing outbound frames, one Actisense line each
#[derive(Clone, Default)]
pub struct ActisenseCodec;

impl ActisenseCodec {
    /// Creates a new Actisense codec
    pub fn new() -> Self {
        ActisenseCodec
    }
}

impl Encoder<OutboundFrame> for ActisenseCodec {
    type Error = Error;

    fn encode(&mut self, item: OutboundFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.to_actisense();

        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::TimeZone;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 1, 19, 15, 37, 1).unwrap()
    }

    #[test]
    fn test_status_line() {
        let payload = [0x30, 0x99, 0x00, 0xf4, 0x01, 0xe8, 0x03, 0x55];
        let line = to_actisense(&timestamp(), 65280, &payload, 255);
        assert_eq!(
            line,
            "2018-01-19T15:37:01.000Z,2,65280,0,255,8,30,99,00,f4,01,e8,03,55"
        );
        assert_eq!(&line[25..], "2,65280,0,255,8,30,99,00,f4,01,e8,03,55");
    }

    #[test]
    fn test_destination() {
        let line = to_actisense(&timestamp(), 59904, &[0x00, 0xff], 17);
        assert!(line.ends_with(",2,59904,0,17,2,00,ff"));
    }

    #[test]
    fn test_codec_writes_lines() {
        let mut codec = ActisenseCodec::new();
        let mut bytes = BytesMut::new();

        let frame = OutboundFrame {
            timestamp: timestamp(),
            pgn: 59904,
            destination: 255,
            payload: Bytes::from_static(&[0x00, 0xff, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff]),
        };

        codec.encode(frame.clone(), &mut bytes).unwrap();
        codec.encode(frame, &mut bytes).unwrap();

        let text = std::str::from_utf8(&bytes).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "2018-01-19T15:37:01.000Z,2,59904,0,255,8,00,ff,00,ff,ff,ff,ff,ff"
        );
        assert!(text.ends_with('\n'));
    }
}
