//! Renders a `Record` into the textual grammar described in
//! `crate::doc`: hex ints, inline flow sequences, block sequences, and
//! quoted strings, each chosen by the `Value` variant rather than by a
//! marker subclass.

use crate::error::Result;
use crate::value::{Record, Value};
use std::io::Write as IoWrite;

const INDENT: &str = "  ";

/// Renders one Record as `key: value` lines at indent 0, with nested
/// Records/BlockLists indented two spaces deeper per level. Does not
/// include the blank-line record separator; callers add it.
pub fn format_record(rec: &Record) -> String {
    let mut out = String::new();
    write_record(&mut out, rec, 0);
    out
}

fn write_record(out: &mut String, rec: &Record, indent: usize) {
    for (key, value) in rec.iter() {
        write_field(out, key, value, indent);
    }
}

fn write_field(out: &mut String, key: &str, value: &Value, indent: usize) {
    out.push_str(&INDENT.repeat(indent));
    match value {
        Value::Record(nested) => {
            out.push_str(key);
            out.push_str(":\n");
            write_record(out, nested, indent + 1);
        }
        Value::BlockList(items) => {
            out.push_str(key);
            out.push_str(":\n");
            write_block_list(out, items, indent + 1);
        }
        scalar => {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&format_scalar(scalar));
            out.push('\n');
        }
    }
}

fn write_block_list(out: &mut String, items: &[Value], indent: usize) {
    for item in items {
        out.push_str(&INDENT.repeat(indent));
        out.push_str("- ");
        match item {
            Value::Record(r) => {
                let mut fields = r.iter();
                if let Some((k, v)) = fields.next() {
                    out.push_str(k);
                    out.push_str(": ");
                    out.push_str(&format_scalar(v));
                }
                out.push('\n');
                for (k, v) in fields {
                    write_field(out, k, v, indent + 1);
                }
                continue;
            }
            scalar => out.push_str(&format_scalar(scalar)),
        }
        out.push('\n');
    }
}

/// Formats everything that can appear as an inline scalar. `Record` and
/// `BlockList` are routed through `write_field`/`write_block_list` before
/// reaching here and never passed in.
fn format_scalar(value: &Value) -> String {
    match value {
        Value::U64(v) => v.to_string(),
        Value::HexU64(v) => format!("0x{v:x}"),
        Value::F64(v) => v.to_string(),
        Value::Bytes(bytes) => {
            if bytes.is_empty() {
                "[]".to_string()
            } else {
                let parts: Vec<String> = bytes.iter().map(|b| format!("0x{b:02x}")).collect();
                format!("[{}]", parts.join(", "))
            }
        }
        Value::String(s) => quote_if_needed(s),
        Value::Timestamp(t) => t.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
        Value::FlowList(items) => {
            let parts: Vec<String> = items.iter().map(format_scalar).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Record(_) | Value::BlockList(_) => String::new(),
    }
}

/// PyYAML's default plain-scalar fallback: quote (and `''`-escape) a
/// string whenever leaving it bare would make it ambiguous with another
/// scalar type or a structural character.
fn quote_if_needed(s: &str) -> String {
    let looks_like_other_scalar = s.is_empty()
        || s.starts_with(' ')
        || s.ends_with(' ')
        || s.contains(':')
        || s.contains('#')
        || s.starts_with('[')
        || s.starts_with('-')
        || matches!(s, "true" | "false" | "null" | "~")
        || s.strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .is_some_and(|hex| u64::from_str_radix(hex, 16).is_ok())
        || s.parse::<u64>().is_ok()
        || super::reader::looks_like_timestamp(s);
    if looks_like_other_scalar {
        format!("'{}'", s.replace('\'', "''"))
    } else {
        s.to_owned()
    }
}

/// Writes a sequence of Records to a stream, one per `write_record` call,
/// each followed by a blank-line separator.
pub struct Writer<W> {
    inner: W,
}

impl<W: IoWrite> Writer<W> {
    pub fn new(inner: W) -> Self {
        Writer { inner }
    }

    pub fn write_record(&mut self, rec: &Record) -> Result<()> {
        let text = format_record(rec);
        self.inner.write_all(text.as_bytes())?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
