//! Format assertions and I/O failures are fatal and flow through this
//! enum; unknown-but-recoverable conditions (unknown block type, unknown
//! option code, non-Ethernet link type) are *not* represented here at all —
//! they are diagnosed to stderr inline and do not stop the run.

use std::io;
use std::result;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("didn't understand magic number {0:?}")]
    UnexpectedMagic([u8; 4]),
    #[error("block's leading length ({0}) and trailing length ({1}) don't match")]
    BlockLengthMismatch(u32, u32),
    #[error("block's length is {0} bytes, but the minimum is 12")]
    BlockLengthTooSmall(u32),
    #[error("option {code} claims a length of {length}, which runs past the end of the block")]
    TruncatedOption { code: u16, length: u16 },
    #[error("TCP option {code} has size {actual}, expected {expected}")]
    TcpOptionSizeMismatch {
        code: u8,
        expected: usize,
        actual: usize,
    },
    #[error("a capture section must start with a Section Header block")]
    DidntStartWithSectionHeader,
    #[error("document syntax error: {0}")]
    DocumentSyntax(String),
    #[error("record is missing required field {0:?}")]
    MissingField(&'static str),
    #[error("field {0:?} has the wrong type")]
    WrongType(&'static str),
    #[error("interface id {0} was never defined by an Interface Description Block")]
    UnknownInterface(u32),
    #[error("captured_length {captured} runs past the {available} bytes remaining in the block body")]
    TruncatedPacket { captured: u32, available: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
