//! Rewrites TCP sequence and acknowledgment numbers so a stream that has
//! been spliced, truncated, or had packets dropped elsewhere in the
//! pipeline still presents a consistent byte stream. The SYN/SYN-ACK
//! re-anchoring rule is subtle enough to warrant reading DESIGN.md before
//! changing this file.

use crate::pipeline::{is_enhanced_packet, Processor};
use crate::value::{Record, Value};
use std::collections::HashMap;

const FLAG_SYN: u64 = 0x002;
const FLAG_ACK: u64 = 0x010;

struct FlowState {
    /// `counters[false as usize]`/`counters[true as usize]` track the next
    /// expected sequence number in each of the flow's two directions.
    counters: [u32; 2],
    initialized: bool,
}

/// Keyed by the canonically-ordered pair of `"ip:port"` endpoint strings,
/// so both directions of one flow share a single entry.
#[derive(Default)]
pub struct FixTcpStreams {
    flows: HashMap<(String, String), FlowState>,
}

impl Processor for FixTcpStreams {
    fn process(&mut self, rec: &mut Record) {
        if !is_enhanced_packet(rec) {
            return;
        }
        let Some(ip) = rec.get("ipv4_data").and_then(Value::as_record).cloned() else {
            return;
        };
        let Some(tcp) = rec.get("tcp_data").and_then(Value::as_record).cloned() else {
            return;
        };

        let source_ip = crate::packet::ipv4_addr_from_value(ip.get("source"));
        let destination_ip = crate::packet::ipv4_addr_from_value(ip.get("destination"));
        let source_port = tcp.get("source_port").and_then(Value::as_u64).unwrap_or(0);
        let destination_port = tcp
            .get("destination_port")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let source_endpoint = endpoint_string(&source_ip, source_port);
        let destination_endpoint = endpoint_string(&destination_ip, destination_port);

        // `direction` indexes into the flow's two counters; the endpoint
        // pair is sorted so both directions land in the same flow entry.
        let direction = (source_endpoint > destination_endpoint) as usize;
        let opposite = 1 - direction;
        let key = if source_endpoint <= destination_endpoint {
            (source_endpoint, destination_endpoint)
        } else {
            (destination_endpoint, source_endpoint)
        };

        let total_length = ip.get("total_length").and_then(Value::as_u64).unwrap_or(0);
        let ip_header_length = ip.get("header_length").and_then(Value::as_u64).unwrap_or(5);
        let tcp_header_length = tcp.get("header_length").and_then(Value::as_u64).unwrap_or(5);
        let segment_length = total_length
            .saturating_sub(4 * ip_header_length)
            .saturating_sub(4 * tcp_header_length) as u32;

        let seq_num = tcp.get("seq_num").and_then(Value::as_u64).unwrap_or(0) as u32;
        let ack_num = tcp.get("ack_num").and_then(Value::as_u64).unwrap_or(0) as u32;
        let flags = tcp.get("flags").and_then(Value::as_u64).unwrap_or(0);
        let is_syn = flags & FLAG_SYN != 0;
        let is_ack = flags & FLAG_ACK != 0;

        let state = self.flows.entry(key).or_insert_with(|| FlowState {
            counters: [0, 0],
            initialized: false,
        });
        if !state.initialized {
            state.counters[direction] = seq_num;
            state.counters[opposite] = ack_num;
            state.initialized = true;
        }

        let mut tcp = tcp;
        tcp.insert("seq_num", state.counters[direction] as u64);
        tcp.insert("ack_num", state.counters[opposite] as u64);
        rec.insert("tcp_data", Value::Record(tcp));

        state.counters[direction] = state.counters[direction].wrapping_add(segment_length);

        if is_syn {
            if !is_ack {
                state.counters[opposite] = 0;
            }
            state.counters[direction] = seq_num.wrapping_add(1);
        }
    }
}

fn endpoint_string(ip: &[u8], port: u64) -> String {
    format!("{}.{}.{}.{}:{}", ip[0], ip[1], ip[2], ip[3], port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PROTOCOL_TCP;

    fn addr_value(bytes: [u8; 4]) -> Value {
        Value::FlowList(bytes.iter().map(|b| Value::U64(*b as u64)).collect())
    }

    fn epb(source: [u8; 4], sport: u64, dest: [u8; 4], dport: u64, seq: u32, ack: u32, flags: u64, payload_len: u64) -> Record {
        let mut tcp = Record::new();
        tcp.insert("source_port", sport);
        tcp.insert("destination_port", dport);
        tcp.insert("seq_num", seq as u64);
        tcp.insert("ack_num", ack as u64);
        tcp.insert("header_length", 5u64);
        tcp.insert("flags", flags);
        tcp.insert("window_size", 0u64);
        tcp.insert("checksum", Value::HexU64(0));
        tcp.insert("urgent_pointer", 0u64);

        let mut ip = Record::new();
        ip.insert("version", 4u64);
        ip.insert("header_length", 5u64);
        ip.insert("dsf", Value::HexU64(0));
        ip.insert("total_length", 20 + 20 + payload_len);
        ip.insert("identification", Value::HexU64(0));
        ip.insert("flags", Value::HexU64(0));
        ip.insert("fragment_offset", 0u64);
        ip.insert("ttl", 64u64);
        ip.insert("protocol", PROTOCOL_TCP);
        ip.insert("header_checksum", Value::HexU64(0));
        ip.insert("source", addr_value(source));
        ip.insert("destination", addr_value(dest));

        let mut rec = Record::new();
        rec.insert("block_type", Value::HexU64(0x6));
        rec.insert("ipv4_data", Value::Record(ip));
        rec.insert("tcp_data", Value::Record(tcp));
        rec
    }

    #[test]
    fn first_packet_of_a_flow_is_left_as_is() {
        let mut rec = epb([10, 0, 0, 1], 1234, [10, 0, 0, 2], 80, 1000, 0, FLAG_SYN, 0);
        let mut p = FixTcpStreams::default();
        p.process(&mut rec);
        let tcp = rec.get("tcp_data").and_then(Value::as_record).unwrap();
        assert_eq!(tcp.get("seq_num").and_then(Value::as_u64), Some(1000));
        assert_eq!(tcp.get("ack_num").and_then(Value::as_u64), Some(0));
    }

    #[test]
    fn subsequent_packet_advances_by_segment_length() {
        let mut p = FixTcpStreams::default();
        let mut syn = epb([10, 0, 0, 1], 1234, [10, 0, 0, 2], 80, 1000, 0, FLAG_SYN, 0);
        p.process(&mut syn);

        let mut data = epb([10, 0, 0, 1], 1234, [10, 0, 0, 2], 80, 9999, 0, 0, 5);
        p.process(&mut data);
        let tcp = data.get("tcp_data").and_then(Value::as_record).unwrap();
        // seq_num after the SYN was re-anchored to 1000 + 1 = 1001
        assert_eq!(tcp.get("seq_num").and_then(Value::as_u64), Some(1001));
    }

    #[test]
    fn reverse_direction_shares_the_same_flow_entry() {
        let mut p = FixTcpStreams::default();
        let mut syn = epb([10, 0, 0, 1], 1234, [10, 0, 0, 2], 80, 1000, 0, FLAG_SYN, 0);
        p.process(&mut syn);

        let mut synack = epb([10, 0, 0, 2], 80, [10, 0, 0, 1], 1234, 5000, 1001, FLAG_SYN | FLAG_ACK, 0);
        p.process(&mut synack);
        let tcp = synack.get("tcp_data").and_then(Value::as_record).unwrap();
        assert_eq!(tcp.get("ack_num").and_then(Value::as_u64), Some(1001));
    }
}
