//! The typed scalar/record data model: `Value`, `Record`, `Options`. One
//! dynamic `Value` enum covers every scalar shape a record field can hold,
//! backed by `indexmap::IndexMap` so field order survives a read-modify-write
//! round trip without extra bookkeeping.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::error::{Error, Result};

/// One field's value. `HexU64` and `U64` carry the same numeric domain;
/// the variant only affects how the document codec renders it.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    U64(u64),
    HexU64(u64),
    /// Internal-only; never produced by the document parser and only
    /// reached via `if_tsresol`'s base/power decomposition math.
    F64(f64),
    Bytes(Vec<u8>),
    String(String),
    Timestamp(DateTime<Utc>),
    Record(Record),
    /// Always rendered as an inline `[a, b, c]` flow sequence.
    FlowList(Vec<Value>),
    /// Always rendered as a `- a` / `- b` block sequence, one per line.
    BlockList(Vec<Value>),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) | Value::HexU64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U64(v as u64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// An ordered, string-keyed map. A `Block` is just a `Record` keyed by
/// `block_type`; options are also `Record`s, keyed by option name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Record {
            fields: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, Value> {
        self.fields.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn require(&self, key: &'static str) -> Result<&Value> {
        self.fields.get(key).ok_or(Error::MissingField(key))
    }

    pub fn require_u64(&self, key: &'static str) -> Result<u64> {
        self.require(key)?.as_u64().ok_or(Error::WrongType(key))
    }

    pub fn require_bytes(&self, key: &'static str) -> Result<&[u8]> {
        self.require(key)?.as_bytes().ok_or(Error::WrongType(key))
    }

    pub fn require_str(&self, key: &'static str) -> Result<&str> {
        self.require(key)?.as_str().ok_or(Error::WrongType(key))
    }

    pub fn require_record(&self, key: &'static str) -> Result<&Record> {
        self.require(key)?.as_record().ok_or(Error::WrongType(key))
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record {
            fields: IndexMap::from_iter(iter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_order_is_preserved() {
        let mut r = Record::new();
        r.insert("b", 1u64);
        r.insert("a", 2u64);
        let keys: Vec<&str> = r.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn missing_field_is_reported_by_name() {
        let r = Record::new();
        match r.require_u64("ts") {
            Err(Error::MissingField("ts")) => {}
            other => panic!("expected MissingField(\"ts\"), got {other:?}"),
        }
    }
}
