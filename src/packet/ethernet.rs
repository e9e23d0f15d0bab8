//! Ethernet II framing: `destination(6) ‖ source(6) ‖ type(2, big-endian)`.

use crate::value::{Record, Value};

pub const HEADER_LEN: usize = 14;
pub const ETHERTYPE_IPV4: u64 = 0x0800;

/// Decodes the 14-byte Ethernet header. The caller has already checked
/// `bytes.len() >= HEADER_LEN`.
pub fn decode(bytes: &[u8]) -> Record {
    let mut rec = Record::new();
    rec.insert("destination", bytes[0..6].to_vec());
    rec.insert("source", bytes[6..12].to_vec());
    let ethertype = u16::from_be_bytes([bytes[12], bytes[13]]) as u64;
    rec.insert("type", ethertype);
    rec
}

pub fn encode(rec: &Record) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    let destination = rec.get("destination").and_then(Value::as_bytes).unwrap_or(&[0; 6]);
    let source = rec.get("source").and_then(Value::as_bytes).unwrap_or(&[0; 6]);
    out.extend_from_slice(destination);
    out.extend_from_slice(source);
    let ethertype = rec.get("type").and_then(Value::as_u64).unwrap_or(0) as u16;
    out.extend_from_slice(&ethertype.to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_header() {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[0..6].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        bytes[6..12].copy_from_slice(&[0xaa; 6]);
        bytes[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
        let rec = decode(&bytes);
        assert_eq!(rec.get("type").and_then(Value::as_u64), Some(0x0800));
        assert_eq!(encode(&rec), bytes);
    }
}
