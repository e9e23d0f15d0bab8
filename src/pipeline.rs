//! The pipeline runner: reads Records lazily, applies an ordered list of
//! processors to each in turn, writes each Record before reading the next.

use crate::block::BT_ENHANCED_PACKET;
use crate::doc::{Reader, Writer};
use crate::error::Result;
use crate::value::{Record, Value};
use std::io::{BufRead, Write};

/// A pure Record-to-Record transform. Implementations must ignore any
/// block whose `block_type` they don't care about.
pub trait Processor {
    fn process(&mut self, rec: &mut Record);
}

fn block_type_is(rec: &Record, expected: u64) -> bool {
    rec.get("block_type").and_then(Value::as_u64) == Some(expected)
}

/// Every processor in this crate only acts on EPB records; this is the
/// shared guard each processor's `process` calls first.
pub fn is_enhanced_packet(rec: &Record) -> bool {
    block_type_is(rec, BT_ENHANCED_PACKET as u64)
}

/// Runs `processors` in order over every Record read from `input`,
/// writing each transformed Record to `output` before reading the next.
/// Returns the number of Records processed.
pub fn run<R: BufRead, W: Write>(
    input: R,
    output: W,
    processors: &mut [Box<dyn Processor>],
) -> Result<usize> {
    let mut reader = Reader::new(input);
    let mut writer = Writer::new(output);
    let mut count = 0usize;
    while let Some(mut rec) = reader.read_record()? {
        for processor in processors.iter_mut() {
            processor.process(&mut rec);
        }
        writer.write_record(&rec)?;
        count += 1;
    }
    tracing::debug!(records = count, "pipeline finished");
    Ok(count)
}
