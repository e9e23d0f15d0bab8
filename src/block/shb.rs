//! Section Header Block: self-bootstrapping endianness detection via the
//! magic word, then `major_version`/`minor_version`/`section_length` and
//! the `shb_hardware`/`shb_os`/`shb_userappl` options.

use crate::block::opts;
use crate::endian::{self, Endianness};
use crate::error::Result;
use crate::value::{Record, Value};
use std::io::{Cursor, Write};

const MAGIC_BIG: u64 = 0x1A2B_3C4D;
const MAGIC_LITTLE: u64 = 0x4D3C_2B1A;

/// Decodes everything after the magic word (which `block::read_block` has
/// already consumed to determine `endianness`). The magic value itself is
/// recorded as a plain field so a later `encode` of this same `Record`
/// knows which endianness the writer requested.
pub fn decode(body: &[u8], endianness: Endianness) -> Result<Record> {
    let mut rec = Record::new();
    rec.insert(
        "magic",
        Value::HexU64(if endianness == Endianness::Big {
            MAGIC_BIG
        } else {
            MAGIC_LITTLE
        }),
    );
    let mut cur = Cursor::new(body);
    rec.insert(
        "major_version",
        endian::read_u16(&mut cur, endianness)? as u64,
    );
    rec.insert(
        "minor_version",
        endian::read_u16(&mut cur, endianness)? as u64,
    );
    rec.insert(
        "section_length",
        Value::HexU64(endian::read_u64(&mut cur, endianness)?),
    );
    if let Some(options) = decode_options(&cur, endianness)? {
        rec.insert("options", Value::Record(options));
    }
    Ok(rec)
}

/// Which endianness a Record produced by `decode` (or hand-written by a
/// document author) asks to be written with.
pub fn requested_endianness(rec: &Record) -> Endianness {
    match rec.get("magic").and_then(Value::as_u64) {
        Some(v) if v == MAGIC_LITTLE => Endianness::Little,
        _ => Endianness::Big,
    }
}

pub fn encode<W: Write>(w: &mut W, endianness: Endianness, rec: &Record) -> Result<()> {
    endian::write_u16(
        w,
        endianness,
        rec.get("major_version").and_then(Value::as_u64).unwrap_or(1) as u16,
    )?;
    endian::write_u16(
        w,
        endianness,
        rec.get("minor_version").and_then(Value::as_u64).unwrap_or(0) as u16,
    )?;
    endian::write_u64(
        w,
        endianness,
        rec.get("section_length")
            .and_then(Value::as_u64)
            .unwrap_or(u64::MAX),
    )?;
    if let Some(options) = rec.get("options").and_then(Value::as_record) {
        encode_options(w, endianness, options)?;
    }
    Ok(())
}

fn decode_options(cur: &Cursor<&[u8]>, endianness: Endianness) -> Result<Option<Record>> {
    let remaining = &cur.get_ref()[cur.position() as usize..];
    if remaining.is_empty() {
        return Ok(None);
    }
    let raw = opts::read_options(remaining, endianness)?;
    let mut options = Record::new();
    for (code, value) in raw {
        match code {
            opts::OPT_COMMENT => {
                options.insert("opt_comment", String::from_utf8_lossy(&value).into_owned());
            }
            2 => options.insert("shb_hardware", String::from_utf8_lossy(&value).into_owned()),
            3 => options.insert("shb_os", String::from_utf8_lossy(&value).into_owned()),
            4 => options.insert("shb_userappl", String::from_utf8_lossy(&value).into_owned()),
            other => {
                eprintln!("Unknown option_code {other}");
                tracing::warn!(option_code = other, "unknown option code");
                continue;
            }
        };
    }
    Ok(Some(options))
}

fn encode_options<W: Write>(w: &mut W, endianness: Endianness, options: &Record) -> Result<()> {
    for (key, value) in options.iter() {
        let code = match key.as_str() {
            "opt_comment" => opts::OPT_COMMENT,
            "shb_hardware" => 2,
            "shb_os" => 3,
            "shb_userappl" => 4,
            other => {
                eprintln!("Unknown option {other}");
                continue;
            }
        };
        let bytes = value.as_str().unwrap_or("").as_bytes();
        opts::write_option(w, endianness, code, bytes)?;
    }
    opts::write_end(w, endianness)?;
    Ok(())
}
