//! The block codec: per-section endianness detection, block framing
//! (leading/trailing length assertion), and per-block field decode.

mod epb;
mod idb;
mod isb;
pub mod opts;
mod shb;

use crate::endian::Endianness;
use crate::error::{Error, Result};
use crate::value::{Record, Value};
use chrono::{DateTime, TimeZone, Utc};
use std::io::{Cursor, Read, Write};

/// Converts a 64-bit tick count (`timestamp_hi << 32 | timestamp_lo`) to
/// civil time, per the interface's `tsresol`.
pub fn ticks_to_datetime(ticks: u64, tsresol: f64) -> DateTime<Utc> {
    let seconds = ticks as f64 * tsresol;
    Utc.timestamp_opt(0, 0).unwrap() + chrono::Duration::microseconds((seconds * 1e6).round() as i64)
}

/// Inverts `ticks_to_datetime`.
pub fn datetime_to_ticks(dt: DateTime<Utc>, tsresol: f64) -> u64 {
    let seconds = dt.timestamp() as f64 + (dt.timestamp_subsec_micros() as f64) / 1e6;
    (seconds / tsresol) as u64
}

pub const BT_SECTION_HEADER: u32 = 0x0A0D_0D0A;
pub const BT_INTERFACE_DESCRIPTION: u32 = 0x0000_0001;
pub const BT_OBSOLETE_PACKET: u32 = 0x0000_0002;
pub const BT_SIMPLE_PACKET: u32 = 0x0000_0003;
pub const BT_NAME_RESOLUTION: u32 = 0x0000_0004;
pub const BT_INTERFACE_STATISTICS: u32 = 0x0000_0005;
pub const BT_ENHANCED_PACKET: u32 = 0x0000_0006;

/// Per-interface state, reset at each Section Header.
#[derive(Clone, Copy, Debug)]
pub struct InterfaceParam {
    pub link_type: u16,
    pub tsresol: f64,
}

impl Default for InterfaceParam {
    fn default() -> Self {
        InterfaceParam {
            link_type: 1, // LINKTYPE_ETHERNET
            tsresol: 1e-6,
        }
    }
}

/// Tracks the endianness and interface list of the section currently being
/// read or written. A fresh `Section` is appropriate at the start of a
/// capture; `reset` is called whenever a Section Header is seen.
pub struct Section {
    pub endianness: Endianness,
    pub interfaces: Vec<InterfaceParam>,
    saw_section_header: bool,
}

impl Default for Section {
    fn default() -> Self {
        Section {
            endianness: Endianness::Big,
            interfaces: Vec::new(),
            saw_section_header: false,
        }
    }
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, endianness: Endianness) {
        self.endianness = endianness;
        self.interfaces.clear();
        self.saw_section_header = true;
    }

    pub fn interface(&self, id: u32) -> Result<&InterfaceParam> {
        self.interfaces
            .get(id as usize)
            .ok_or(Error::UnknownInterface(id))
    }
}

fn decode_u32(bytes: [u8; 4], e: Endianness) -> u32 {
    match e {
        Endianness::Big => u32::from_be_bytes(bytes),
        Endianness::Little => u32::from_le_bytes(bytes),
    }
}

fn encode_u32(v: u32, e: Endianness) -> [u8; 4] {
    match e {
        Endianness::Big => v.to_be_bytes(),
        Endianness::Little => v.to_le_bytes(),
    }
}

/// Reads one block, advancing `section`'s endianness/interface state as a
/// side effect when the block is a Section Header or Interface Description
/// Block. Returns `Ok(None)` cleanly at end of stream.
pub fn read_block<R: Read>(r: &mut R, section: &mut Section) -> Result<Option<Record>> {
    let mut type_bytes = [0u8; 4];
    match read_exact_or_eof(r, &mut type_bytes)? {
        false => return Ok(None),
        true => {}
    }
    let mut len_bytes = [0u8; 4];
    r.read_exact(&mut len_bytes)?;

    let is_shb = type_bytes == BT_SECTION_HEADER.to_be_bytes();
    if !is_shb && !section.saw_section_header {
        return Err(Error::DidntStartWithSectionHeader);
    }
    let endianness = if is_shb {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        let e = Endianness::from_magic(magic).ok_or(Error::UnexpectedMagic(magic))?;
        section.reset(e);
        e
    } else {
        section.endianness
    };

    let block_length = decode_u32(len_bytes, endianness);
    let min_length = if is_shb { 16 } else { 12 };
    if block_length < min_length {
        return Err(Error::BlockLengthTooSmall(block_length));
    }
    let remaining_len = block_length as usize - if is_shb { 16 } else { 12 };
    let mut body = vec![0u8; remaining_len];
    r.read_exact(&mut body)?;

    let mut trailing_bytes = [0u8; 4];
    r.read_exact(&mut trailing_bytes)?;
    let trailing_length = decode_u32(trailing_bytes, endianness);
    if block_length != trailing_length {
        return Err(Error::BlockLengthMismatch(block_length, trailing_length));
    }

    let block_type = if is_shb {
        BT_SECTION_HEADER
    } else {
        decode_u32(type_bytes, endianness)
    };

    let decoded = match block_type {
        BT_SECTION_HEADER => shb::decode(&body, endianness)?,
        BT_INTERFACE_DESCRIPTION => {
            let (rec, param) = idb::decode(&body, endianness)?;
            section.interfaces.push(param);
            rec
        }
        BT_ENHANCED_PACKET => epb::decode(&body, endianness, section)?,
        BT_INTERFACE_STATISTICS => isb::decode(&body, endianness)?,
        BT_OBSOLETE_PACKET | BT_SIMPLE_PACKET | BT_NAME_RESOLUTION => {
            eprintln!("Unknown block_type 0x{block_type:08x}");
            tracing::warn!("unknown block_type 0x{block_type:08x}");
            unknown_record(body)
        }
        other => {
            eprintln!("Unknown block_type 0x{other:08x}");
            tracing::warn!("unknown block_type 0x{other:08x}");
            unknown_record(body)
        }
    };

    // `block_type` is the first field of every decoded block, matching the
    // original reader's `info['block_type'] = ...` assignment order; each
    // per-block decoder builds the rest of the record without it.
    let mut rec = Record::new();
    rec.insert("block_type", Value::HexU64(block_type as u64));
    for (key, value) in decoded.iter() {
        rec.insert(key.clone(), value.clone());
    }
    Ok(Some(rec))
}

fn unknown_record(body: Vec<u8>) -> Record {
    let mut rec = Record::new();
    rec.insert("unknown_payload", body);
    rec
}

fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0;
    while total < buf.len() {
        let n = r.read(&mut buf[total..])?;
        if n == 0 {
            if total == 0 {
                return Ok(false);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "truncated block header",
            )
            .into());
        }
        total += n;
    }
    Ok(true)
}

/// Writes one block, updating `section` exactly as `read_block` would.
pub fn write_block<W: Write>(w: &mut W, section: &mut Section, rec: &Record) -> Result<()> {
    let block_type = rec.require_u64("block_type")? as u32;
    let is_shb = block_type == BT_SECTION_HEADER;

    let mut body = Cursor::new(Vec::new());
    let endianness = if is_shb {
        let endianness = shb::requested_endianness(rec);
        section.reset(endianness);
        endianness
    } else {
        section.endianness
    };

    match block_type {
        BT_SECTION_HEADER => shb::encode(&mut body, endianness, rec)?,
        BT_INTERFACE_DESCRIPTION => {
            let param = idb::encode(&mut body, endianness, rec)?;
            section.interfaces.push(param);
        }
        BT_ENHANCED_PACKET => epb::encode(&mut body, endianness, rec, section)?,
        BT_INTERFACE_STATISTICS => isb::encode(&mut body, endianness, rec)?,
        _ => {
            if let Some(payload) = rec.get("unknown_payload").and_then(Value::as_bytes) {
                body.write_all(payload)?;
            }
        }
    }
    let body = body.into_inner();

    let header_overhead = if is_shb { 16 } else { 12 };
    let total_length = (header_overhead + body.len()) as u32;

    if is_shb {
        w.write_all(&BT_SECTION_HEADER.to_be_bytes())?;
        w.write_all(&encode_u32(total_length, endianness))?;
        w.write_all(&endianness.magic_bytes())?;
    } else {
        w.write_all(&encode_u32(block_type, endianness))?;
        w.write_all(&encode_u32(total_length, endianness))?;
    }
    w.write_all(&body)?;
    w.write_all(&encode_u32(total_length, endianness))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;

    fn sample_shb() -> Record {
        let mut rec = Record::new();
        rec.insert("block_type", Value::HexU64(BT_SECTION_HEADER as u64));
        rec.insert("major_version", 1u64);
        rec.insert("minor_version", 0u64);
        rec
    }

    #[test]
    fn shb_round_trips_through_the_wire_format() {
        let mut section = Section::new();
        let mut buf = Vec::new();
        write_block(&mut buf, &mut section, &sample_shb()).unwrap();

        let mut section2 = Section::new();
        let mut cur = Cursor::new(buf);
        let rec = read_block(&mut cur, &mut section2).unwrap().unwrap();
        assert_eq!(
            rec.get("major_version").and_then(Value::as_u64),
            Some(1)
        );
        assert_eq!(section2.endianness as u8, Endianness::Big as u8);
    }

    #[test]
    fn unknown_block_type_falls_back_to_raw_payload() {
        let mut section = Section::new();
        let mut buf = Vec::new();
        write_block(&mut buf, &mut section, &sample_shb()).unwrap();

        let mut rec = Record::new();
        rec.insert("block_type", Value::HexU64(0x99));
        rec.insert("unknown_payload", vec![1, 2, 3, 4]);
        write_block(&mut buf, &mut section, &rec).unwrap();

        let mut section2 = Section::new();
        let mut cur = Cursor::new(buf);
        read_block(&mut cur, &mut section2).unwrap().unwrap();
        let decoded = read_block(&mut cur, &mut section2).unwrap().unwrap();
        assert_eq!(
            decoded.get("unknown_payload").and_then(Value::as_bytes),
            Some(&[1, 2, 3, 4][..])
        );
    }

    #[test]
    fn a_block_stream_not_starting_with_a_section_header_is_rejected() {
        let mut section = Section::new();
        let mut rec = Record::new();
        rec.insert("block_type", Value::HexU64(BT_INTERFACE_DESCRIPTION as u64));
        rec.insert("link_type", 1u64);
        rec.insert("snapshot_length", 0u64);
        let mut buf = Vec::new();
        // Hand-build an IDB wire block directly; `write_block` assumes an SHB
        // already ran so it can't produce this malformed stream itself.
        buf.extend_from_slice(&BT_INTERFACE_DESCRIPTION.to_be_bytes());
        buf.extend_from_slice(&12u32.to_be_bytes());
        buf.extend_from_slice(&12u32.to_be_bytes());

        let mut cur = Cursor::new(buf);
        match read_block(&mut cur, &mut section) {
            Err(Error::DidntStartWithSectionHeader) => {}
            other => panic!("expected DidntStartWithSectionHeader, got {other:?}"),
        }
    }
}
