//! TCP header and option list. The `flags` field keeps a 9-bit mask
//! (`0x1FF`) verbatim even though TCP defines up to 12 control bits — see
//! DESIGN.md for the rationale.

use crate::error::{Error, Result};
use crate::value::{Record, Value};

pub const FIXED_HEADER_LEN: usize = 20;

const OPT_END: u8 = 0;
const OPT_NOP: u8 = 1;
const OPT_MAX_SEGMENT_SIZE: u8 = 2;
const OPT_WINDOW_SCALE: u8 = 3;
const OPT_SACK_PERMITTED: u8 = 4;
const OPT_TIMESTAMPS: u8 = 8;

fn decode_options(bytes: &[u8]) -> Result<Vec<Value>> {
    let mut opts = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let code = bytes[i];
        match code {
            OPT_END => {
                opts.push(Value::String("end".into()));
                break;
            }
            OPT_NOP => {
                opts.push(Value::String("nop".into()));
                i += 1;
            }
            OPT_MAX_SEGMENT_SIZE => {
                let size = bytes[i + 1] as usize;
                if size != 4 {
                    return Err(Error::TcpOptionSizeMismatch {
                        code,
                        expected: 4,
                        actual: size,
                    });
                }
                let mut r = Record::new();
                r.insert(
                    "max_segment_size",
                    u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as u64,
                );
                opts.push(Value::Record(r));
                i += 4;
            }
            OPT_WINDOW_SCALE => {
                let size = bytes[i + 1] as usize;
                if size != 3 {
                    return Err(Error::TcpOptionSizeMismatch {
                        code,
                        expected: 3,
                        actual: size,
                    });
                }
                let mut r = Record::new();
                r.insert("window_scale", bytes[i + 2] as u64);
                opts.push(Value::Record(r));
                i += 3;
            }
            OPT_SACK_PERMITTED => {
                let size = bytes[i + 1] as usize;
                if size != 2 {
                    return Err(Error::TcpOptionSizeMismatch {
                        code,
                        expected: 2,
                        actual: size,
                    });
                }
                opts.push(Value::String("sack_permitted".into()));
                i += 2;
            }
            OPT_TIMESTAMPS => {
                let size = bytes[i + 1] as usize;
                if size != 10 {
                    return Err(Error::TcpOptionSizeMismatch {
                        code,
                        expected: 10,
                        actual: size,
                    });
                }
                let ts_val =
                    u32::from_be_bytes([bytes[i + 2], bytes[i + 3], bytes[i + 4], bytes[i + 5]]);
                let ts_ecr =
                    u32::from_be_bytes([bytes[i + 6], bytes[i + 7], bytes[i + 8], bytes[i + 9]]);
                let mut r = Record::new();
                r.insert(
                    "timestamps",
                    Value::FlowList(vec![Value::U64(ts_val as u64), Value::U64(ts_ecr as u64)]),
                );
                opts.push(Value::Record(r));
                i += 10;
            }
            other => {
                let size = bytes[i + 1] as usize;
                opts.push(Value::Bytes(bytes[i..i + size].to_vec()));
                i += size;
            }
        }
    }
    Ok(opts)
}

fn encode_options(opts: &[Value]) -> Vec<u8> {
    let mut out = Vec::new();
    for opt in opts {
        match opt {
            Value::String(s) if s == "end" => out.push(OPT_END),
            Value::String(s) if s == "nop" => out.push(OPT_NOP),
            Value::String(s) if s == "sack_permitted" => {
                out.push(OPT_SACK_PERMITTED);
                out.push(2);
            }
            Value::Bytes(raw) => out.extend_from_slice(raw),
            Value::Record(r) => {
                if let Some(v) = r.get("max_segment_size").and_then(Value::as_u64) {
                    out.push(OPT_MAX_SEGMENT_SIZE);
                    out.push(4);
                    out.extend_from_slice(&(v as u16).to_be_bytes());
                } else if let Some(v) = r.get("window_scale").and_then(Value::as_u64) {
                    out.push(OPT_WINDOW_SCALE);
                    out.push(3);
                    out.push(v as u8);
                } else if let Some(Value::FlowList(ts)) = r.get("timestamps") {
                    out.push(OPT_TIMESTAMPS);
                    out.push(10);
                    let ts_val = ts.first().and_then(Value::as_u64).unwrap_or(0) as u32;
                    let ts_ecr = ts.get(1).and_then(Value::as_u64).unwrap_or(0) as u32;
                    out.extend_from_slice(&ts_val.to_be_bytes());
                    out.extend_from_slice(&ts_ecr.to_be_bytes());
                }
            }
            _ => {}
        }
    }
    out
}

/// Decodes the fixed TCP header, then its option list if `header_length >
/// 5`. Returns the decoded record together with the total header length in
/// bytes so the caller can slice off the remaining payload.
pub fn decode(bytes: &[u8]) -> Result<(Record, usize)> {
    let mut rec = Record::new();
    rec.insert("source_port", u16::from_be_bytes([bytes[0], bytes[1]]) as u64);
    rec.insert(
        "destination_port",
        u16::from_be_bytes([bytes[2], bytes[3]]) as u64,
    );
    rec.insert(
        "seq_num",
        u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as u64,
    );
    rec.insert(
        "ack_num",
        u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as u64,
    );
    let header_length_flags = u16::from_be_bytes([bytes[12], bytes[13]]);
    let header_length = (header_length_flags >> 12) as usize;
    rec.insert("header_length", header_length as u64);
    rec.insert("flags", (header_length_flags & 0x1FF) as u64);
    rec.insert(
        "window_size",
        u16::from_be_bytes([bytes[14], bytes[15]]) as u64,
    );
    rec.insert(
        "checksum",
        Value::HexU64(u16::from_be_bytes([bytes[16], bytes[17]]) as u64),
    );
    rec.insert(
        "urgent_pointer",
        u16::from_be_bytes([bytes[18], bytes[19]]) as u64,
    );

    let total_len = if header_length > 5 {
        let options_len = 4 * (header_length - 5);
        let opts = decode_options(&bytes[20..20 + options_len])?;
        rec.insert("options", Value::BlockList(opts));
        20 + options_len
    } else {
        20
    };
    Ok((rec, total_len))
}

pub fn encode(rec: &Record) -> Vec<u8> {
    let mut out = Vec::with_capacity(FIXED_HEADER_LEN);
    out.extend_from_slice(
        &(rec
            .get("source_port")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u16)
            .to_be_bytes(),
    );
    out.extend_from_slice(
        &(rec
            .get("destination_port")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u16)
            .to_be_bytes(),
    );
    out.extend_from_slice(
        &(rec.get("seq_num").and_then(Value::as_u64).unwrap_or(0) as u32).to_be_bytes(),
    );
    out.extend_from_slice(
        &(rec.get("ack_num").and_then(Value::as_u64).unwrap_or(0) as u32).to_be_bytes(),
    );
    let header_length = rec.get("header_length").and_then(Value::as_u64).unwrap_or(5) as u16;
    let flags = rec.get("flags").and_then(Value::as_u64).unwrap_or(0) as u16;
    out.extend_from_slice(&((header_length << 12) | (flags & 0x1FF)).to_be_bytes());
    out.extend_from_slice(
        &(rec
            .get("window_size")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u16)
            .to_be_bytes(),
    );
    out.extend_from_slice(
        &(rec.get("checksum").and_then(Value::as_u64).unwrap_or(0) as u16).to_be_bytes(),
    );
    out.extend_from_slice(
        &(rec
            .get("urgent_pointer")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u16)
            .to_be_bytes(),
    );
    if let Some(Value::BlockList(opts)) = rec.get("options") {
        out.extend_from_slice(&encode_options(opts));
    }
    out
}
