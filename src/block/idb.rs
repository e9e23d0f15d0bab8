//! Interface Description Block: `link_type`, a reserved u16 (always 0 on
//! write), `snapshot_length`, and the `if_name`/`if_description`/
//! `if_tsresol`/`if_filter`/`if_os` options. Decoding an IDB also produces
//! the `InterfaceParam` that the enclosing `Section` records for later
//! Enhanced Packet Blocks to resolve against.

use crate::block::{opts, InterfaceParam};
use crate::endian::{self, Endianness};
use crate::error::Result;
use crate::value::{Record, Value};
use std::io::{Cursor, Write};

pub fn decode(body: &[u8], endianness: Endianness) -> Result<(Record, InterfaceParam)> {
    let mut rec = Record::new();
    let mut cur = Cursor::new(body);
    let link_type = endian::read_u16(&mut cur, endianness)?;
    rec.insert("link_type", link_type as u64);
    let _reserved = endian::read_u16(&mut cur, endianness)?;
    rec.insert(
        "snapshot_length",
        endian::read_u32(&mut cur, endianness)? as u64,
    );

    let mut tsresol = 1e-6;
    let remaining = &cur.get_ref()[cur.position() as usize..];
    if !remaining.is_empty() {
        let raw = opts::read_options(remaining, endianness)?;
        let mut options = Record::new();
        for (code, value) in raw {
            match code {
                opts::OPT_COMMENT => {
                    options.insert("opt_comment", String::from_utf8_lossy(&value).into_owned());
                }
                2 => options.insert("if_name", String::from_utf8_lossy(&value).into_owned()),
                3 => options.insert(
                    "if_description",
                    String::from_utf8_lossy(&value).into_owned(),
                ),
                9 if value.len() == 1 => {
                    let (base, power) = opts::decode_tsresol_byte(value[0]);
                    tsresol = (base as f64).powi(-(power as i32));
                    let mut tsresol_rec = Record::new();
                    tsresol_rec.insert("base", base);
                    tsresol_rec.insert("power", power);
                    options.insert("if_tsresol", Value::Record(tsresol_rec))
                }
                11 => options.insert("if_filter", String::from_utf8_lossy(&value).into_owned()),
                12 => options.insert("if_os", String::from_utf8_lossy(&value).into_owned()),
                other => {
                    eprintln!("Unknown option_code {other}");
                    tracing::warn!(option_code = other, "unknown option code");
                    continue;
                }
            };
        }
        if !options.is_empty() {
            rec.insert("options", Value::Record(options));
        }
    }

    let param = InterfaceParam { link_type, tsresol };
    Ok((rec, param))
}

pub fn encode<W: Write>(w: &mut W, endianness: Endianness, rec: &Record) -> Result<InterfaceParam> {
    let link_type = rec.get("link_type").and_then(Value::as_u64).unwrap_or(1) as u16;
    endian::write_u16(w, endianness, link_type)?;
    endian::write_u16(w, endianness, 0)?;
    endian::write_u32(
        w,
        endianness,
        rec.get("snapshot_length")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
    )?;

    let mut tsresol = 1e-6;
    if let Some(options) = rec.get("options").and_then(Value::as_record) {
        for (key, value) in options.iter() {
            let code = match key.as_str() {
                "opt_comment" => opts::OPT_COMMENT,
                "if_name" => 2,
                "if_description" => 3,
                "if_tsresol" => 9,
                "if_filter" => 11,
                "if_os" => 12,
                other => {
                    eprintln!("Unknown option {other}");
                    continue;
                }
            };
            if code == 9 {
                if let Value::Record(tsresol_rec) = value {
                    let base = tsresol_rec.get("base").and_then(Value::as_u64).unwrap_or(10);
                    let power = tsresol_rec.get("power").and_then(Value::as_u64).unwrap_or(6);
                    tsresol = (base as f64).powi(-(power as i32));
                    opts::write_option(
                        w,
                        endianness,
                        code,
                        &[opts::encode_tsresol_byte(base, power)],
                    )?;
                }
                continue;
            }
            let bytes = value.as_str().unwrap_or("").as_bytes();
            opts::write_option(w, endianness, code, bytes)?;
        }
    }
    opts::write_end(w, endianness)?;

    Ok(InterfaceParam { link_type, tsresol })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_link_type_and_snapshot_length() {
        let mut rec = Record::new();
        rec.insert("link_type", 1u64);
        rec.insert("snapshot_length", 65535u64);
        let mut buf = Vec::new();
        let written_param = encode(&mut buf, Endianness::Big, &rec).unwrap();
        assert_eq!(written_param.tsresol, 1e-6);
        let (decoded, param) = decode(&buf, Endianness::Big).unwrap();
        assert_eq!(decoded.get("link_type").and_then(Value::as_u64), Some(1));
        assert_eq!(param.link_type, 1);
        assert_eq!(param.tsresol, 1e-6);
    }

    #[test]
    fn if_tsresol_option_overrides_default_resolution() {
        let mut rec = Record::new();
        rec.insert("link_type", 1u64);
        rec.insert("snapshot_length", 0u64);
        let mut options = Record::new();
        let mut tsresol_rec = Record::new();
        tsresol_rec.insert("base", 10u64);
        tsresol_rec.insert("power", 9u64);
        options.insert("if_tsresol", Value::Record(tsresol_rec));
        rec.insert("options", Value::Record(options));

        let mut buf = Vec::new();
        let param = encode(&mut buf, Endianness::Big, &rec).unwrap();
        assert_eq!(param.tsresol, 1e-9);

        let (_decoded, param2) = decode(&buf, Endianness::Big).unwrap();
        assert_eq!(param2.tsresol, 1e-9);
    }
}
