//! Zeroes then recomputes the IPv4 header checksum and the TCP/UDP
//! pseudo-header checksum of an Enhanced Packet Block.

use crate::checksum::calc_carry_add_checksum;
use crate::packet;
use crate::pipeline::{is_enhanced_packet, Processor};
use crate::value::{Record, Value};

#[derive(Default)]
pub struct FixChecksums;

impl Processor for FixChecksums {
    fn process(&mut self, rec: &mut Record) {
        if !is_enhanced_packet(rec) {
            return;
        }
        let Some(ip) = rec.get("ipv4_data").and_then(Value::as_record).cloned() else {
            return;
        };

        let mut ip = ip;
        ip.insert("header_checksum", Value::HexU64(0));
        let header_bytes = packet::encode_ipv4(&ip);
        let ip_checksum = calc_carry_add_checksum(&header_bytes);
        ip.insert("header_checksum", Value::HexU64(ip_checksum as u64));

        let total_length = ip.get("total_length").and_then(Value::as_u64).unwrap_or(0);
        let ip_header_length = ip.get("header_length").and_then(Value::as_u64).unwrap_or(5);
        let protocol = ip.get("protocol").and_then(Value::as_u64).unwrap_or(0) as u8;
        let source = crate::packet::ipv4_addr_from_value(ip.get("source")).to_vec();
        let destination = crate::packet::ipv4_addr_from_value(ip.get("destination")).to_vec();
        rec.insert("ipv4_data", Value::Record(ip));

        let protocol_length = total_length.saturating_sub(4 * ip_header_length);
        let payload = rec
            .get("unknown_payload")
            .and_then(Value::as_bytes)
            .map(|b| b.to_vec())
            .unwrap_or_default();

        if let Some(tcp) = rec.get("tcp_data").and_then(Value::as_record).cloned() {
            let mut tcp = tcp;
            tcp.insert("checksum", Value::HexU64(0));
            let header_bytes = packet::encode_tcp(&tcp);
            let csum = pseudo_header_checksum(
                &source,
                &destination,
                protocol,
                protocol_length,
                &header_bytes,
                &payload,
            );
            tcp.insert("checksum", Value::HexU64(csum as u64));
            rec.insert("tcp_data", Value::Record(tcp));
        } else if let Some(udp) = rec.get("udp_data").and_then(Value::as_record).cloned() {
            let mut udp = udp;
            udp.insert("checksum", Value::HexU64(0));
            let header_bytes = packet::encode_udp(&udp);
            let csum = pseudo_header_checksum(
                &source,
                &destination,
                protocol,
                protocol_length,
                &header_bytes,
                &payload,
            );
            udp.insert("checksum", Value::HexU64(csum as u64));
            rec.insert("udp_data", Value::Record(udp));
        }
    }
}

fn pseudo_header_checksum(
    source: &[u8],
    destination: &[u8],
    protocol: u8,
    protocol_length: u64,
    header_bytes: &[u8],
    payload: &[u8],
) -> u16 {
    let mut buf = Vec::with_capacity(12 + header_bytes.len() + payload.len());
    buf.extend_from_slice(source);
    buf.extend_from_slice(destination);
    buf.push(0);
    buf.push(protocol);
    buf.extend_from_slice(&(protocol_length as u16).to_be_bytes());
    buf.extend_from_slice(header_bytes);
    buf.extend_from_slice(payload);
    calc_carry_add_checksum(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PROTOCOL_TCP;

    fn sample_tcp_over_ipv4() -> Record {
        let mut tcp = Record::new();
        tcp.insert("source_port", 1234u64);
        tcp.insert("destination_port", 80u64);
        tcp.insert("seq_num", 0u64);
        tcp.insert("ack_num", 0u64);
        tcp.insert("header_length", 5u64);
        tcp.insert("flags", 0u64);
        tcp.insert("window_size", 0u64);
        tcp.insert("checksum", Value::HexU64(0xdead));
        tcp.insert("urgent_pointer", 0u64);

        let mut ip = Record::new();
        ip.insert("version", 4u64);
        ip.insert("header_length", 5u64);
        ip.insert("dsf", Value::HexU64(0));
        ip.insert("total_length", 24u64);
        ip.insert("identification", Value::HexU64(0));
        ip.insert("flags", Value::HexU64(0));
        ip.insert("fragment_offset", 0u64);
        ip.insert("ttl", 64u64);
        ip.insert("protocol", PROTOCOL_TCP);
        ip.insert("header_checksum", Value::HexU64(0xbeef));
        ip.insert("source", Value::FlowList(vec![Value::U64(10), Value::U64(0), Value::U64(0), Value::U64(1)]));
        ip.insert("destination", Value::FlowList(vec![Value::U64(10), Value::U64(0), Value::U64(0), Value::U64(2)]));

        let mut rec = Record::new();
        rec.insert("block_type", Value::HexU64(0x6));
        rec.insert("ipv4_data", Value::Record(ip));
        rec.insert("tcp_data", Value::Record(tcp));
        rec
    }

    #[test]
    fn ipv4_header_checksums_to_zero_after_fixup() {
        let mut rec = sample_tcp_over_ipv4();
        let mut p = FixChecksums;
        p.process(&mut rec);
        let ip = rec.get("ipv4_data").and_then(Value::as_record).unwrap();
        let bytes = packet::encode_ipv4(ip);
        assert_eq!(calc_carry_add_checksum(&bytes), 0);
    }

    #[test]
    fn tcp_checksum_is_recomputed() {
        let mut rec = sample_tcp_over_ipv4();
        let mut p = FixChecksums;
        p.process(&mut rec);
        let tcp = rec.get("tcp_data").and_then(Value::as_record).unwrap();
        assert_ne!(tcp.get("checksum").and_then(Value::as_u64), Some(0xdead));
    }
}
