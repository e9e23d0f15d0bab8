//! Zeroes both MAC addresses on every Ethernet-framed packet.

use crate::pipeline::{is_enhanced_packet, Processor};
use crate::value::{Record, Value};

#[derive(Default)]
pub struct CleanMac;

impl Processor for CleanMac {
    fn process(&mut self, rec: &mut Record) {
        if !is_enhanced_packet(rec) {
            return;
        }
        let Some(eth) = rec.get("ethernet_data").and_then(Value::as_record).cloned() else {
            return;
        };
        let mut eth = eth;
        eth.insert("destination", vec![0u8; 6]);
        eth.insert("source", vec![0u8; 6]);
        rec.insert("ethernet_data", Value::Record(eth));
    }
}
