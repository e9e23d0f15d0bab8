//! IPv4 header. Options are out of scope: a header whose `header_length`
//! exceeds 5 simply has those extra bytes fall into whatever follows it.

use crate::value::{Record, Value};

pub const HEADER_LEN: usize = 20;
pub const PROTOCOL_TCP: u64 = 6;
pub const PROTOCOL_UDP: u64 = 17;

/// Decodes the 20-byte fixed IPv4 header. `flags` keeps its 3-bit width
/// (shift 13, mask implied by the shift) and `fragment_offset` its 13-bit
/// width, both preserved verbatim rather than normalized.
pub fn decode(bytes: &[u8]) -> Record {
    let mut rec = Record::new();
    let version_ihl = bytes[0];
    rec.insert("version", (version_ihl >> 4) as u64);
    rec.insert("header_length", (version_ihl & 0x0F) as u64);
    rec.insert("dsf", Value::HexU64(bytes[1] as u64));
    rec.insert("total_length", u16::from_be_bytes([bytes[2], bytes[3]]) as u64);
    rec.insert(
        "identification",
        Value::HexU64(u16::from_be_bytes([bytes[4], bytes[5]]) as u64),
    );
    let flags_offset = u16::from_be_bytes([bytes[6], bytes[7]]);
    rec.insert("flags", Value::HexU64((flags_offset >> 13) as u64));
    rec.insert("fragment_offset", (flags_offset & 0x1FFF) as u64);
    rec.insert("ttl", bytes[8] as u64);
    rec.insert("protocol", bytes[9] as u64);
    rec.insert(
        "header_checksum",
        Value::HexU64(u16::from_be_bytes([bytes[10], bytes[11]]) as u64),
    );
    rec.insert("source", addr_to_value(&bytes[12..16]));
    rec.insert("destination", addr_to_value(&bytes[16..20]));
    rec
}

/// Renders a 4-byte IPv4 address as a decimal inline sequence (`[10, 0,
/// 0, 1]`), unlike an Ethernet MAC's hex byte sequence — the document
/// form the original tool's `save_flow_list` produces for IPv4 addresses,
/// as opposed to `save_flow_bytes` for raw byte strings.
fn addr_to_value(bytes: &[u8]) -> Value {
    Value::FlowList(bytes.iter().map(|b| Value::U64(*b as u64)).collect())
}

/// Recovers four address octets from the decimal inline sequence written
/// by `addr_to_value`. Missing or short entries default to zero.
pub fn addr_from_value(value: Option<&Value>) -> [u8; 4] {
    let mut out = [0u8; 4];
    if let Some(Value::FlowList(items)) = value {
        for (i, item) in items.iter().take(4).enumerate() {
            out[i] = item.as_u64().unwrap_or(0) as u8;
        }
    }
    out
}

pub fn encode(rec: &Record) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    let version = rec.get("version").and_then(Value::as_u64).unwrap_or(4) as u8;
    let header_length = rec.get("header_length").and_then(Value::as_u64).unwrap_or(5) as u8;
    out.push((version << 4) | (header_length & 0x0F));
    out.push(rec.get("dsf").and_then(Value::as_u64).unwrap_or(0) as u8);
    out.extend_from_slice(
        &(rec.get("total_length").and_then(Value::as_u64).unwrap_or(0) as u16).to_be_bytes(),
    );
    out.extend_from_slice(
        &(rec
            .get("identification")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u16)
            .to_be_bytes(),
    );
    let flags = rec.get("flags").and_then(Value::as_u64).unwrap_or(0) as u16;
    let fragment_offset = rec
        .get("fragment_offset")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u16;
    out.extend_from_slice(&((flags << 13) | (fragment_offset & 0x1FFF)).to_be_bytes());
    out.push(rec.get("ttl").and_then(Value::as_u64).unwrap_or(0) as u8);
    out.push(rec.get("protocol").and_then(Value::as_u64).unwrap_or(0) as u8);
    out.extend_from_slice(
        &(rec
            .get("header_checksum")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u16)
            .to_be_bytes(),
    );
    out.extend_from_slice(&addr_from_value(rec.get("source")));
    out.extend_from_slice(&addr_from_value(rec.get("destination")));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_flags_and_fragment_offset() {
        let mut rec = Record::new();
        rec.insert("version", 4u64);
        rec.insert("header_length", 5u64);
        rec.insert("dsf", Value::HexU64(0));
        rec.insert("total_length", 40u64);
        rec.insert("identification", Value::HexU64(0x1234));
        rec.insert("flags", Value::HexU64(0x2));
        rec.insert("fragment_offset", 0u64);
        rec.insert("ttl", 64u64);
        rec.insert("protocol", PROTOCOL_TCP);
        rec.insert("header_checksum", Value::HexU64(0));
        rec.insert("source", addr_to_value(&[192, 168, 0, 1]));
        rec.insert("destination", addr_to_value(&[192, 168, 0, 2]));
        let bytes = encode(&rec);
        let decoded = decode(&bytes);
        assert_eq!(decoded.get("flags").and_then(Value::as_u64), Some(0x2));
        assert_eq!(decoded.get("protocol").and_then(Value::as_u64), Some(PROTOCOL_TCP));
        assert_eq!(decoded.get("source"), Some(&addr_to_value(&[192, 168, 0, 1])));
    }

    #[test]
    fn addresses_render_as_a_decimal_inline_sequence_not_hex_bytes() {
        let rec = decode(&[
            0x45, 0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x40, 0x06, 0x00, 0x00, 10, 0, 0, 1,
            10, 0, 0, 2,
        ]);
        match rec.get("source") {
            Some(Value::FlowList(items)) => {
                assert_eq!(items, &[Value::U64(10), Value::U64(0), Value::U64(0), Value::U64(1)]);
            }
            other => panic!("expected a FlowList of decimal octets, got {other:?}"),
        }
    }
}
