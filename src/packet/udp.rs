//! UDP header: `source_port(2) destination_port(2) length(2) checksum(2)`,
//! followed by the payload.

use crate::value::{Record, Value};

pub const HEADER_LEN: usize = 8;

pub fn decode(bytes: &[u8]) -> Record {
    let mut rec = Record::new();
    rec.insert("source_port", u16::from_be_bytes([bytes[0], bytes[1]]) as u64);
    rec.insert(
        "destination_port",
        u16::from_be_bytes([bytes[2], bytes[3]]) as u64,
    );
    rec.insert("length", u16::from_be_bytes([bytes[4], bytes[5]]) as u64);
    rec.insert(
        "checksum",
        Value::HexU64(u16::from_be_bytes([bytes[6], bytes[7]]) as u64),
    );
    rec
}

pub fn encode(rec: &Record) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    out.extend_from_slice(
        &(rec
            .get("source_port")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u16)
            .to_be_bytes(),
    );
    out.extend_from_slice(
        &(rec
            .get("destination_port")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u16)
            .to_be_bytes(),
    );
    out.extend_from_slice(
        &(rec.get("length").and_then(Value::as_u64).unwrap_or(0) as u16).to_be_bytes(),
    );
    out.extend_from_slice(
        &(rec.get("checksum").and_then(Value::as_u64).unwrap_or(0) as u16).to_be_bytes(),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_header() {
        let bytes = [0, 53, 0xc3, 0x50, 0x00, 0x20, 0xab, 0xcd];
        let rec = decode(&bytes);
        assert_eq!(rec.get("source_port").and_then(Value::as_u64), Some(53));
        assert_eq!(encode(&rec), bytes);
    }
}
