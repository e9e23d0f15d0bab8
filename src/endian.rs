//! The byte codec: fixed-width integer read/write under a
//! runtime-selected endianness, plus 4-byte alignment helpers. A pcapng
//! capture picks its byte order once per section (via the Section Header's
//! magic word) and every subsequent integer in that section is read or
//! written under that same order.

use crate::error::Result;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    /// Section Header magic word interpretation.
    pub fn from_magic(bytes: [u8; 4]) -> Option<Endianness> {
        match bytes {
            [0x1A, 0x2B, 0x3C, 0x4D] => Some(Endianness::Big),
            [0x4D, 0x3C, 0x2B, 0x1A] => Some(Endianness::Little),
            _ => None,
        }
    }

    pub fn magic_bytes(self) -> [u8; 4] {
        match self {
            Endianness::Big => [0x1A, 0x2B, 0x3C, 0x4D],
            Endianness::Little => [0x4D, 0x3C, 0x2B, 0x1A],
        }
    }
}

/// Rounds `value` up to the next multiple of `multiplier`.
pub fn align_up(value: u64, multiplier: u64) -> u64 {
    if value % multiplier == 0 {
        value
    } else {
        value / multiplier * multiplier + multiplier
    }
}

pub fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    Ok(r.read_u8()?)
}

pub fn read_u16<R: Read>(r: &mut R, e: Endianness) -> Result<u16> {
    Ok(match e {
        Endianness::Big => r.read_u16::<BigEndian>()?,
        Endianness::Little => r.read_u16::<LittleEndian>()?,
    })
}

pub fn read_u32<R: Read>(r: &mut R, e: Endianness) -> Result<u32> {
    Ok(match e {
        Endianness::Big => r.read_u32::<BigEndian>()?,
        Endianness::Little => r.read_u32::<LittleEndian>()?,
    })
}

pub fn read_u64<R: Read>(r: &mut R, e: Endianness) -> Result<u64> {
    Ok(match e {
        Endianness::Big => r.read_u64::<BigEndian>()?,
        Endianness::Little => r.read_u64::<LittleEndian>()?,
    })
}

pub fn read_bytes<R: Read>(r: &mut R, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<()> {
    w.write_u8(v)?;
    Ok(())
}

pub fn write_u16<W: Write>(w: &mut W, e: Endianness, v: u16) -> Result<()> {
    match e {
        Endianness::Big => w.write_u16::<BigEndian>(v)?,
        Endianness::Little => w.write_u16::<LittleEndian>(v)?,
    }
    Ok(())
}

pub fn write_u32<W: Write>(w: &mut W, e: Endianness, v: u32) -> Result<()> {
    match e {
        Endianness::Big => w.write_u32::<BigEndian>(v)?,
        Endianness::Little => w.write_u32::<LittleEndian>(v)?,
    }
    Ok(())
}

pub fn write_u64<W: Write>(w: &mut W, e: Endianness, v: u64) -> Result<()> {
    match e {
        Endianness::Big => w.write_u64::<BigEndian>(v)?,
        Endianness::Little => w.write_u64::<LittleEndian>(v)?,
    }
    Ok(())
}

pub fn write_bytes<W: Write>(w: &mut W, buf: &[u8]) -> Result<()> {
    w.write_all(buf)?;
    Ok(())
}

/// Run `f`, then zero-pad the just-written span up to a multiple of
/// `align` bytes. Requires a seekable writer so the span length can be
/// measured.
pub fn write_aligned<W: Write + Seek>(
    w: &mut W,
    align: u64,
    f: impl FnOnce(&mut W) -> Result<()>,
) -> Result<()> {
    let start = w.stream_position()?;
    f(w)?;
    let end = w.stream_position()?;
    let padded = start + align_up(end - start, align);
    if padded > end {
        let pad = vec![0u8; (padded - end) as usize];
        w.write_all(&pad)?;
    }
    Ok(())
}

/// Run `f`, then skip forward past any padding so the consumed span is a
/// multiple of `align` bytes.
pub fn read_aligned<R: Read + Seek>(
    r: &mut R,
    align: u64,
    f: impl FnOnce(&mut R) -> Result<()>,
) -> Result<()> {
    let start = r.stream_position()?;
    f(r)?;
    let end = r.stream_position()?;
    let padded = start + align_up(end - start, align);
    if padded > end {
        r.seek(SeekFrom::Start(padded))?;
    }
    Ok(())
}
