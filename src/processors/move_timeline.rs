//! Shifts every packet and interface-statistics timestamp by a fixed
//! offset, so a capture can be replayed as if it started at a chosen
//! instant.

use crate::block::{BT_ENHANCED_PACKET, BT_INTERFACE_STATISTICS};
use crate::pipeline::Processor;
use crate::value::{Record, Value};
use chrono::{DateTime, Duration, Utc};

fn is_timestamped_block(rec: &Record) -> bool {
    matches!(
        rec.get("block_type").and_then(Value::as_u64),
        Some(bt) if bt == BT_ENHANCED_PACKET as u64 || bt == BT_INTERFACE_STATISTICS as u64
    )
}

/// The offset is fixed from the *first* timestamped record the processor
/// sees; every later record (and the options `isb_starttime`/`isb_endtime`
/// on Interface Statistics Blocks) is shifted by that same offset.
pub struct MoveTimeline {
    target: DateTime<Utc>,
    offset: Option<Duration>,
}

impl MoveTimeline {
    pub fn new(target: DateTime<Utc>) -> Self {
        MoveTimeline {
            target,
            offset: None,
        }
    }

    fn shift(&mut self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let offset = *self.offset.get_or_insert_with(|| self.target - ts);
        ts + offset
    }
}

impl Processor for MoveTimeline {
    fn process(&mut self, rec: &mut Record) {
        if !is_timestamped_block(rec) {
            return;
        }
        if let Some(ts) = rec.get("datetime").and_then(Value::as_timestamp) {
            let shifted = self.shift(ts);
            rec.insert("datetime", Value::Timestamp(shifted));
        }
        if let Some(mut options) = rec.get("options").and_then(Value::as_record).cloned() {
            let mut changed = false;
            for key in ["isb_starttime", "isb_endtime"] {
                if let Some(ts) = options.get(key).and_then(Value::as_timestamp) {
                    let shifted = self.shift(ts);
                    options.insert(key, Value::Timestamp(shifted));
                    changed = true;
                }
            }
            if changed {
                rec.insert("options", Value::Record(options));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn shifts_subsequent_records_by_the_offset_established_by_the_first() {
        let start = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        let target = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut p = MoveTimeline::new(target);

        let mut first = Record::new();
        first.insert("block_type", Value::HexU64(0x6));
        first.insert("datetime", Value::Timestamp(start));
        p.process(&mut first);
        assert_eq!(first.get("datetime").and_then(Value::as_timestamp), Some(target));

        let mut second = Record::new();
        second.insert("block_type", Value::HexU64(0x6));
        second.insert("datetime", Value::Timestamp(start + Duration::seconds(10)));
        p.process(&mut second);
        assert_eq!(
            second.get("datetime").and_then(Value::as_timestamp),
            Some(target + Duration::seconds(10))
        );
    }

    #[test]
    fn shifts_interface_statistics_options_too() {
        let start = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        let target = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut p = MoveTimeline::new(target);

        let mut options = Record::new();
        options.insert("isb_starttime", Value::Timestamp(start));

        let mut rec = Record::new();
        rec.insert("block_type", Value::HexU64(0x5));
        rec.insert("datetime", Value::Timestamp(start));
        rec.insert("options", Value::Record(options));
        p.process(&mut rec);
        let options = rec.get("options").and_then(Value::as_record).unwrap();
        assert_eq!(options.get("isb_starttime").and_then(Value::as_timestamp), Some(target));
    }

    #[test]
    fn ignores_blocks_without_a_timeline() {
        let target = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut p = MoveTimeline::new(target);
        let mut rec = Record::new();
        rec.insert("block_type", Value::HexU64(0x1));
        p.process(&mut rec);
        assert!(rec.get("datetime").is_none());
    }
}
