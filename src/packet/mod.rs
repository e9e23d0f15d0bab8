//! Packet codec: Ethernet → IPv4 → TCP/UDP dissection of an Enhanced
//! Packet Block's payload. Each recognized layer is inserted as a sibling
//! field directly on the Enhanced Packet Block's record (`ethernet_data`,
//! `ipv4_data`, `tcp_data`/`udp_data`) rather than nesting each layer
//! inside the one above it. Anything not dissected further is left as an
//! opaque `unknown_payload` byte string; dissection never proceeds above
//! UDP/TCP.

mod ethernet;
mod ipv4;
mod tcp;
mod udp;

use crate::error::Result;
use crate::value::{Record, Value};

pub use ipv4::{addr_from_value as ipv4_addr_from_value, PROTOCOL_TCP, PROTOCOL_UDP};

/// Dissects a captured frame's bytes into `ethernet_data`/`ipv4_data`/
/// `tcp_data`/`udp_data`/`unknown_payload` siblings on a fresh `Record`.
pub fn decode_frame(bytes: &[u8]) -> Result<Record> {
    let mut rec = Record::new();
    if bytes.len() < ethernet::HEADER_LEN {
        rec.insert("unknown_payload", bytes.to_vec());
        return Ok(rec);
    }
    let eth = ethernet::decode(&bytes[..ethernet::HEADER_LEN]);
    let ethertype = eth.get("type").and_then(Value::as_u64).unwrap_or(0);
    rec.insert("ethernet_data", Value::Record(eth));
    let payload = &bytes[ethernet::HEADER_LEN..];
    if ethertype == ethernet::ETHERTYPE_IPV4 {
        decode_ipv4_into(&mut rec, payload)?;
    } else {
        rec.insert("unknown_payload", payload.to_vec());
    }
    Ok(rec)
}

fn decode_ipv4_into(rec: &mut Record, bytes: &[u8]) -> Result<()> {
    if bytes.len() < ipv4::HEADER_LEN {
        rec.insert("unknown_payload", bytes.to_vec());
        return Ok(());
    }
    let ipv4_rec = ipv4::decode(&bytes[..ipv4::HEADER_LEN]);
    let protocol = ipv4_rec.get("protocol").and_then(Value::as_u64).unwrap_or(0);
    rec.insert("ipv4_data", Value::Record(ipv4_rec));
    let payload = &bytes[ipv4::HEADER_LEN..];
    match protocol {
        ipv4::PROTOCOL_TCP => decode_tcp_into(rec, payload)?,
        ipv4::PROTOCOL_UDP => decode_udp_into(rec, payload),
        _ => {
            rec.insert("unknown_payload", payload.to_vec());
        }
    }
    Ok(())
}

fn decode_tcp_into(rec: &mut Record, bytes: &[u8]) -> Result<()> {
    if bytes.len() < tcp::FIXED_HEADER_LEN {
        rec.insert("unknown_payload", bytes.to_vec());
        return Ok(());
    }
    let (tcp_rec, header_len) = tcp::decode(bytes)?;
    rec.insert("tcp_data", Value::Record(tcp_rec));
    if bytes.len() > header_len {
        rec.insert("unknown_payload", bytes[header_len..].to_vec());
    }
    Ok(())
}

fn decode_udp_into(rec: &mut Record, bytes: &[u8]) {
    if bytes.len() < udp::HEADER_LEN {
        rec.insert("unknown_payload", bytes.to_vec());
        return;
    }
    let udp_rec = udp::decode(&bytes[..udp::HEADER_LEN]);
    rec.insert("udp_data", Value::Record(udp_rec));
    if bytes.len() > udp::HEADER_LEN {
        rec.insert("unknown_payload", bytes[udp::HEADER_LEN..].to_vec());
    }
}

/// Inverts `decode_frame`: serializes whichever of `ethernet_data` /
/// `ipv4_data` / `tcp_data` / `udp_data` / `unknown_payload` are present,
/// in wire order.
pub fn encode_frame(rec: &Record) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(eth) = rec.get("ethernet_data").and_then(Value::as_record) {
        out.extend(ethernet::encode(eth));
        if let Some(ip) = rec.get("ipv4_data").and_then(Value::as_record) {
            out.extend(ipv4::encode(ip));
            if let Some(t) = rec.get("tcp_data").and_then(Value::as_record) {
                out.extend(tcp::encode(t));
            } else if let Some(u) = rec.get("udp_data").and_then(Value::as_record) {
                out.extend(udp::encode(u));
            }
        }
    }
    if let Some(payload) = rec.get("unknown_payload").and_then(Value::as_bytes) {
        out.extend_from_slice(payload);
    }
    out
}

pub use ethernet::{decode as decode_ethernet, encode as encode_ethernet};
pub use ipv4::{decode as decode_ipv4, encode as encode_ipv4};
pub use tcp::{decode as decode_tcp, encode as encode_tcp};
pub use udp::{decode as decode_udp, encode as encode_udp};
