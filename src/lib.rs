//! `pcapweave`: a round-trip codec and edit pipeline for pcapng capture
//! files. Converts the pcapng block stream to and from an ordered,
//! human-editable textual document, and applies a pipeline of semantic
//! processors — length fixup, checksum recomputation, TCP
//! sequence/acknowledgement rewriting, MAC anonymization, timeline shift —
//! over that textual representation.
//!
//! Module layout, leaves first: [`endian`] (byte codec) → [`packet`]
//! (Ethernet/IPv4/UDP/TCP) → [`block`] (pcapng framing) → [`doc`] (textual
//! document) → [`pipeline`] + [`processors`] (the edit pipeline) →
//! [`worker`] (CLI file plumbing).

pub mod block;
pub mod checksum;
pub mod doc;
pub mod endian;
pub mod error;
pub mod packet;
pub mod pipeline;
pub mod processors;
pub mod value;
pub mod worker;

pub use error::{Error, Result};
pub use value::{Record, Value};

use std::io::{BufRead, Read, Write};

/// Decodes every block from `input` and serializes the resulting Record
/// stream to `output` as text.
pub fn pcap_to_doc<R: Read, W: Write>(input: &mut R, output: W) -> Result<usize> {
    let mut section = block::Section::new();
    let mut writer = doc::Writer::new(output);
    let mut count = 0usize;
    while let Some(rec) = block::read_block(input, &mut section)? {
        writer.write_record(&rec)?;
        count += 1;
    }
    Ok(count)
}

/// Parses Records from `input` and encodes each as a pcapng block
/// written to `output`.
pub fn doc_to_pcap<R: BufRead, W: Write>(input: R, output: &mut W) -> Result<usize> {
    let mut section = block::Section::new();
    let mut reader = doc::Reader::new(input);
    let mut count = 0usize;
    while let Some(rec) = reader.read_record()? {
        block::write_block(output, &mut section, &rec)?;
        count += 1;
    }
    Ok(count)
}
