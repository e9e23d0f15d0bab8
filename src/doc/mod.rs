//! The document codec: a line-oriented, indentation-based textual format
//! for a sequence of ordered Records, separated by one or more blank lines.
//!
//! The grammar is narrow enough (presentation-tagged hex ints, one
//! inline-vs-block sequence distinction, a single timestamp shape) that
//! this crate owns a small dedicated parser/emitter instead of carrying a
//! general-purpose YAML dependency for a handful of custom node types.

mod reader;
mod writer;

pub use reader::{parse_record, Reader};
pub use writer::{format_record, Writer};
