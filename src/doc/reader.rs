//! Parses the textual grammar described in `crate::doc` back into
//! `Record`s: hex-int detection, inline-vs-block sequence detection, and
//! blank-line-delimited record splitting.

use crate::error::{Error, Result};
use crate::value::{Record, Value};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::io::BufRead;

const TIMESTAMP_FMT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

struct Line<'a> {
    indent: usize,
    content: &'a str,
}

fn tokenize(block: &str) -> Result<Vec<Line<'_>>> {
    let mut out = Vec::new();
    for raw in block.lines() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let stripped = line.trim_start_matches(' ');
        let spaces = line.len() - stripped.len();
        if spaces % 2 != 0 {
            return Err(Error::DocumentSyntax(format!(
                "odd indentation ({spaces} spaces): {line:?}"
            )));
        }
        out.push(Line {
            indent: spaces / 2,
            content: stripped,
        });
    }
    Ok(out)
}

/// Parses one blank-line-delimited chunk of text into a single Record.
pub fn parse_record(block: &str) -> Result<Record> {
    let lines = tokenize(block)?;
    let mut pos = 0;
    let rec = parse_fields(&lines, &mut pos, 0)?;
    Ok(rec)
}

fn parse_fields(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Record> {
    let mut rec = Record::new();
    while *pos < lines.len() && lines[*pos].indent == indent {
        let content = lines[*pos].content;
        *pos += 1;
        let (key, rest) = split_key_value(content)?;
        let value = match rest {
            Some(rest) => parse_scalar(rest)?,
            None => parse_nested(lines, pos, indent + 1)?,
        };
        rec.insert(key, value);
    }
    Ok(rec)
}

fn parse_nested(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Value> {
    if *pos >= lines.len() || lines[*pos].indent != indent {
        return Ok(Value::Record(Record::new()));
    }
    if lines[*pos].content.starts_with("- ") {
        parse_block_list(lines, pos, indent)
    } else {
        Ok(Value::Record(parse_fields(lines, pos, indent)?))
    }
}

fn parse_block_list(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Value> {
    let mut items = Vec::new();
    while *pos < lines.len() && lines[*pos].indent == indent && lines[*pos].content.starts_with("- ")
    {
        let item_content = &lines[*pos].content[2..];
        *pos += 1;
        let value = match split_key_value(item_content) {
            Ok((key, Some(rest))) => {
                let mut r = Record::new();
                r.insert(key, parse_scalar(rest)?);
                if *pos < lines.len() && lines[*pos].indent == indent + 1 {
                    let tail = parse_fields(lines, pos, indent + 1)?;
                    for (k, v) in tail.iter() {
                        r.insert(k.clone(), v.clone());
                    }
                }
                Value::Record(r)
            }
            _ => parse_scalar(item_content)?,
        };
        items.push(value);
    }
    Ok(Value::BlockList(items))
}

/// Splits `key: value` at the first top-level `": "`. A trailing bare
/// `key:` (no value on the line) signals that the value is a nested
/// structure on the following, more-indented lines.
fn split_key_value(content: &str) -> Result<(String, Option<&str>)> {
    if let Some(idx) = content.find(": ") {
        let (key, rest) = content.split_at(idx);
        return Ok((key.to_owned(), Some(rest[2..].trim())));
    }
    if let Some(key) = content.strip_suffix(':') {
        return Ok((key.to_owned(), None));
    }
    Err(Error::DocumentSyntax(format!(
        "expected 'key: value' or 'key:', got {content:?}"
    )))
}

fn parse_scalar(s: &str) -> Result<Value> {
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return parse_flow_list(inner);
    }
    if s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2 {
        return Ok(Value::String(unquote(s)));
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if let Ok(v) = u64::from_str_radix(hex, 16) {
            return Ok(Value::HexU64(v));
        }
    }
    if looks_like_timestamp(s) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FMT) {
            return Ok(Value::Timestamp(DateTime::<Utc>::from_naive_utc_and_offset(
                naive,
                Utc,
            )));
        }
    }
    if let Ok(v) = s.parse::<u64>() {
        return Ok(Value::U64(v));
    }
    Ok(Value::String(s.to_owned()))
}

fn parse_flow_list(inner: &str) -> Result<Value> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Ok(Value::Bytes(Vec::new()));
    }
    let mut values = Vec::new();
    for token in inner.split(',') {
        values.push(parse_scalar(token.trim())?);
    }
    let all_byte_sized_hex = values
        .iter()
        .all(|v| matches!(v, Value::HexU64(n) if *n <= 0xFF));
    if all_byte_sized_hex {
        let bytes = values
            .into_iter()
            .map(|v| v.as_u64().unwrap_or(0) as u8)
            .collect();
        Ok(Value::Bytes(bytes))
    } else {
        Ok(Value::FlowList(values))
    }
}

fn unquote(s: &str) -> String {
    let inner = &s[1..s.len() - 1];
    inner.replace("''", "'")
}

/// Cheap structural check used both here and by the writer's
/// quote-if-ambiguous logic; the full parse in `parse_scalar` is the
/// source of truth, this just avoids running `NaiveDateTime::parse_from_str`
/// against every plain string.
pub(crate) fn looks_like_timestamp(s: &str) -> bool {
    s.len() >= 20
        && s.as_bytes()[4] == b'-'
        && s.as_bytes()[7] == b'-'
        && s.as_bytes()[10] == b'T'
        && s.ends_with('Z')
}

/// Reads Records lazily from a stream, one blank-line-delimited chunk at a
/// time, so only one Record is live in memory.
pub struct Reader<R> {
    lines: std::io::Lines<R>,
}

impl<R: BufRead> Reader<R> {
    pub fn new(inner: R) -> Self {
        Reader {
            lines: inner.lines(),
        }
    }

    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let mut block = String::new();
        let mut saw_content = false;
        loop {
            match self.lines.next() {
                None => break,
                Some(line) => {
                    let line = line?;
                    if line.trim().is_empty() {
                        if saw_content {
                            break;
                        }
                        continue;
                    }
                    saw_content = true;
                    block.push_str(&line);
                    block.push('\n');
                }
            }
        }
        if !saw_content {
            return Ok(None);
        }
        Ok(Some(parse_record(&block)?))
    }
}
