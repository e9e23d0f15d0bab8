//! Interface Statistics Block: `interface_id`, a microsecond-resolution
//! `datetime`, and the `isb_starttime`/`isb_endtime`/`isb_ifrecv`/
//! `isb_ifdrop` options.

use crate::block::{datetime_to_ticks, opts, ticks_to_datetime};
use crate::endian::{self, Endianness};
use crate::error::Result;
use crate::value::{Record, Value};
use std::io::{Cursor, Write};

const TSRESOL: f64 = 1e-6;

pub fn decode(body: &[u8], endianness: Endianness) -> Result<Record> {
    let mut rec = Record::new();
    let mut cur = Cursor::new(body);
    rec.insert(
        "interface_id",
        endian::read_u32(&mut cur, endianness)? as u64,
    );
    let ticks_hi = endian::read_u32(&mut cur, endianness)? as u64;
    let ticks_lo = endian::read_u32(&mut cur, endianness)? as u64;
    let ticks = (ticks_hi << 32) | ticks_lo;
    rec.insert("datetime", Value::Timestamp(ticks_to_datetime(ticks, TSRESOL)));

    let remaining = &cur.get_ref()[cur.position() as usize..];
    if !remaining.is_empty() {
        let raw = opts::read_options(remaining, endianness)?;
        let mut options = Record::new();
        for (code, value) in raw {
            match code {
                opts::OPT_COMMENT => {
                    options.insert("opt_comment", String::from_utf8_lossy(&value).into_owned());
                }
                2 => {
                    let ticks = opts::read_u64_option(&value, endianness)?;
                    options.insert(
                        "isb_starttime",
                        Value::Timestamp(ticks_to_datetime(ticks, TSRESOL)),
                    )
                }
                3 => {
                    let ticks = opts::read_u64_option(&value, endianness)?;
                    options.insert(
                        "isb_endtime",
                        Value::Timestamp(ticks_to_datetime(ticks, TSRESOL)),
                    )
                }
                4 => options.insert(
                    "isb_ifrecv",
                    opts::read_u64_option(&value, endianness)?,
                ),
                5 => options.insert(
                    "isb_ifdrop",
                    opts::read_u64_option(&value, endianness)?,
                ),
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
    Ok(rec)
}

pub fn encode<W: Write>(w: &mut W, endianness: Endianness, rec: &Record) -> Result<()> {
    endian::write_u32(
        w,
        endianness,
        rec.get("interface_id").and_then(Value::as_u64).unwrap_or(0) as u32,
    )?;
    let ticks = datetime_to_ticks(
        rec.get("datetime")
            .and_then(Value::as_timestamp)
            .unwrap_or_default(),
        TSRESOL,
    );
    endian::write_u32(w, endianness, (ticks >> 32) as u32)?;
    endian::write_u32(w, endianness, ticks as u32)?;

    if let Some(options) = rec.get("options").and_then(Value::as_record) {
        for (key, value) in options.iter() {
            match key.as_str() {
                "opt_comment" => {
                    opts::write_option(
                        w,
                        endianness,
                        opts::OPT_COMMENT,
                        value.as_str().unwrap_or("").as_bytes(),
                    )?;
                }
                "isb_starttime" | "isb_endtime" => {
                    let code = if key == "isb_starttime" { 2 } else { 3 };
                    let ticks = datetime_to_ticks(
                        value.as_timestamp().unwrap_or_default(),
                        TSRESOL,
                    );
                    opts::write_option(w, endianness, code, &opts::encode_u64_option(endianness, ticks))?;
                }
                "isb_ifrecv" | "isb_ifdrop" => {
                    let code = if key == "isb_ifrecv" { 4 } else { 5 };
                    let v = value.as_u64().unwrap_or(0);
                    opts::write_option(w, endianness, code, &opts::encode_u64_option(endianness, v))?;
                }
                other => {
                    eprintln!("Unknown option {other}");
                }
            }
        }
    }
    opts::write_end(w, endianness)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round_trips_interface_id_and_datetime() {
        let mut rec = Record::new();
        rec.insert("interface_id", 0u64);
        rec.insert("datetime", Value::Timestamp(sample_timestamp()));
        let mut buf = Vec::new();
        encode(&mut buf, Endianness::Big, &rec).unwrap();
        let decoded = decode(&buf, Endianness::Big).unwrap();
        assert_eq!(decoded.get("interface_id").and_then(Value::as_u64), Some(0));
        assert_eq!(
            decoded.get("datetime").and_then(Value::as_timestamp),
            Some(sample_timestamp())
        );
    }

    fn sample_timestamp() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.timestamp_opt(1_600_000_000, 0).unwrap()
    }
}
