//! The options TLV: `code(2) len(2) value(len, padded to 4) ...`,
//! terminated by a code-0 zero-length record which is never represented
//! in the data model.

use crate::endian::{align_up, read_u16, write_u16, Endianness};
use crate::error::{Error, Result};
use std::io::{Cursor, Read, Write};

pub const OPT_END: u16 = 0;
pub const OPT_COMMENT: u16 = 1;

/// Reads raw `(code, value)` pairs out of an already-sliced options region.
/// The trailing padding and end marker are consumed here; the caller never
/// sees code 0.
pub fn read_options(bytes: &[u8], endianness: Endianness) -> Result<Vec<(u16, Vec<u8>)>> {
    let mut cur = Cursor::new(bytes);
    let mut out = Vec::new();
    loop {
        if cur.position() as usize >= bytes.len() {
            break;
        }
        let code = read_u16(&mut cur, endianness)?;
        if code == OPT_END {
            break;
        }
        let length = read_u16(&mut cur, endianness)?;
        let remaining = bytes.len() - cur.position() as usize;
        if length as usize > remaining {
            return Err(Error::TruncatedOption { code, length });
        }
        let mut value = vec![0u8; length as usize];
        cur.read_exact(&mut value)?;
        let padded = align_up(length as u64, 4) as usize;
        if padded > length as usize {
            let mut pad = vec![0u8; padded - length as usize];
            cur.read_exact(&mut pad)?;
        }
        out.push((code, value));
    }
    Ok(out)
}

pub fn write_option<W: Write>(
    w: &mut W,
    endianness: Endianness,
    code: u16,
    value: &[u8],
) -> Result<()> {
    write_u16(w, endianness, code)?;
    write_u16(w, endianness, value.len() as u16)?;
    w.write_all(value)?;
    let padded = align_up(value.len() as u64, 4) as usize;
    if padded > value.len() {
        w.write_all(&vec![0u8; padded - value.len()])?;
    }
    Ok(())
}

pub fn write_end<W: Write>(w: &mut W, endianness: Endianness) -> Result<()> {
    write_u16(w, endianness, OPT_END)?;
    write_u16(w, endianness, 0)?;
    Ok(())
}

/// Decodes a single-byte `if_tsresol`-shaped option into `(base, power)`.
pub fn decode_tsresol_byte(byte: u8) -> (u64, u64) {
    let base = if byte & 0x80 != 0 { 2 } else { 10 };
    let power = (byte & 0x7F) as u64;
    (base, power)
}

pub fn encode_tsresol_byte(base: u64, power: u64) -> u8 {
    let flag = if base == 2 { 0x80 } else { 0x00 };
    flag | (power as u8 & 0x7F)
}

pub fn read_u64_option(bytes: &[u8], endianness: Endianness) -> Result<u64> {
    let mut cur = Cursor::new(bytes);
    crate::endian::read_u64(&mut cur, endianness)
}

pub fn encode_u64_option(endianness: Endianness, v: u64) -> Vec<u8> {
    let mut out = Vec::new();
    let _ = crate::endian::write_u64(&mut out, endianness, v);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_comment_option() {
        let mut buf = Vec::new();
        write_option(&mut buf, Endianness::Big, OPT_COMMENT, b"hi").unwrap();
        write_end(&mut buf, Endianness::Big).unwrap();
        let opts = read_options(&buf, Endianness::Big).unwrap();
        assert_eq!(opts, vec![(OPT_COMMENT, b"hi".to_vec())]);
    }

    #[test]
    fn an_option_claiming_more_bytes_than_remain_is_rejected() {
        let mut buf = Vec::new();
        write_u16(&mut buf, Endianness::Big, 2).unwrap();
        write_u16(&mut buf, Endianness::Big, 100).unwrap();
        buf.extend_from_slice(b"short");
        match read_options(&buf, Endianness::Big) {
            Err(Error::TruncatedOption { code: 2, length: 100 }) => {}
            other => panic!("expected TruncatedOption, got {other:?}"),
        }
    }

    #[test]
    fn tsresol_byte_round_trips() {
        assert_eq!(decode_tsresol_byte(6), (10, 6));
        assert_eq!(decode_tsresol_byte(0x80 | 20), (2, 20));
        assert_eq!(encode_tsresol_byte(10, 6), 6);
        assert_eq!(encode_tsresol_byte(2, 20), 0x80 | 20);
    }
}
