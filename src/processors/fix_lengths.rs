//! Recomputes the layered length fields of an Enhanced Packet Block
//! bottom-up, from the innermost payload out, re-serializing each header
//! in turn to measure its packed size rather than trusting whatever the
//! document already claims.

use crate::packet;
use crate::pipeline::{is_enhanced_packet, Processor};
use crate::value::{Record, Value};

#[derive(Default)]
pub struct FixLengths;

impl Processor for FixLengths {
    fn process(&mut self, rec: &mut Record) {
        if !is_enhanced_packet(rec) {
            return;
        }

        let payload_len = rec
            .get("unknown_payload")
            .and_then(Value::as_bytes)
            .map(|b| b.len())
            .unwrap_or(0) as u64;
        let mut acc = payload_len;

        if let Some(tcp) = rec.get("tcp_data").and_then(Value::as_record).cloned() {
            let mut tcp = tcp;
            let header_bytes = packet::encode_tcp(&tcp);
            let h_tcp = header_bytes.len() as u64;
            tcp.insert("header_length", h_tcp / 4);
            acc += h_tcp;
            rec.insert("tcp_data", Value::Record(tcp));
        } else if let Some(udp) = rec.get("udp_data").and_then(Value::as_record).cloned() {
            let mut udp = udp;
            let h_udp = packet::encode_udp(&udp).len() as u64;
            udp.insert("length", h_udp + acc);
            acc += h_udp;
            rec.insert("udp_data", Value::Record(udp));
        }

        if let Some(ip) = rec.get("ipv4_data").and_then(Value::as_record).cloned() {
            let mut ip = ip;
            let h_ip = packet::encode_ipv4(&ip).len() as u64;
            ip.insert("total_length", h_ip + acc);
            acc += h_ip;
            rec.insert("ipv4_data", Value::Record(ip));
        }

        if let Some(eth) = rec.get("ethernet_data").and_then(Value::as_record) {
            let h_eth = packet::encode_ethernet(eth).len() as u64;
            acc += h_eth;
        }

        let captured_length = rec.get("captured_length").and_then(Value::as_u64);
        let packet_length = rec.get("packet_length").and_then(Value::as_u64);
        if captured_length.is_some() && captured_length == packet_length {
            rec.insert("packet_length", acc);
        }
        rec.insert("captured_length", acc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PROTOCOL_TCP;

    fn sample_tcp_over_ipv4(payload: Vec<u8>) -> Record {
        let mut tcp = Record::new();
        tcp.insert("source_port", 1234u64);
        tcp.insert("destination_port", 80u64);
        tcp.insert("seq_num", 0u64);
        tcp.insert("ack_num", 0u64);
        tcp.insert("header_length", 5u64);
        tcp.insert("flags", 0u64);
        tcp.insert("window_size", 0u64);
        tcp.insert("checksum", Value::HexU64(0));
        tcp.insert("urgent_pointer", 0u64);

        let mut ip = Record::new();
        ip.insert("version", 4u64);
        ip.insert("header_length", 5u64);
        ip.insert("dsf", Value::HexU64(0));
        ip.insert("total_length", 0u64);
        ip.insert("identification", Value::HexU64(0));
        ip.insert("flags", Value::HexU64(0));
        ip.insert("fragment_offset", 0u64);
        ip.insert("ttl", 64u64);
        ip.insert("protocol", PROTOCOL_TCP);
        ip.insert("header_checksum", Value::HexU64(0));
        ip.insert("source", Value::FlowList(vec![Value::U64(10), Value::U64(0), Value::U64(0), Value::U64(1)]));
        ip.insert("destination", Value::FlowList(vec![Value::U64(10), Value::U64(0), Value::U64(0), Value::U64(2)]));

        let mut rec = Record::new();
        rec.insert("block_type", Value::HexU64(0x6));
        rec.insert("ipv4_data", Value::Record(ip));
        rec.insert("tcp_data", Value::Record(tcp));
        rec.insert("unknown_payload", payload);
        rec.insert("captured_length", 0u64);
        rec.insert("packet_length", 0u64);
        rec
    }

    #[test]
    fn propagates_lengths_bottom_up() {
        let mut rec = sample_tcp_over_ipv4(vec![1, 2, 3, 4]);
        let mut p = FixLengths;
        p.process(&mut rec);

        let tcp = rec.get("tcp_data").and_then(Value::as_record).unwrap();
        assert_eq!(tcp.get("header_length").and_then(Value::as_u64), Some(5));

        let ip = rec.get("ipv4_data").and_then(Value::as_record).unwrap();
        // 20 bytes TCP + 4 bytes payload + 20 bytes IPv4 header
        assert_eq!(ip.get("total_length").and_then(Value::as_u64), Some(44));

        assert_eq!(rec.get("captured_length").and_then(Value::as_u64), Some(44));
        assert_eq!(rec.get("packet_length").and_then(Value::as_u64), Some(44));
    }

    #[test]
    fn leaves_packet_length_alone_when_it_already_diverged() {
        let mut rec = sample_tcp_over_ipv4(vec![1, 2, 3, 4]);
        rec.insert("packet_length", 9999u64);
        let mut p = FixLengths;
        p.process(&mut rec);
        assert_eq!(rec.get("packet_length").and_then(Value::as_u64), Some(9999));
        assert_eq!(rec.get("captured_length").and_then(Value::as_u64), Some(44));
    }

    #[test]
    fn is_idempotent() {
        let mut rec = sample_tcp_over_ipv4(vec![1, 2, 3, 4]);
        let mut p = FixLengths;
        p.process(&mut rec);
        let once = rec.clone();
        p.process(&mut rec);
        assert_eq!(rec, once);
    }
}
