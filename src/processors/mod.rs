//! The five processors: pure `Record`→`Record` transforms run by the
//! pipeline in a fixed order — see DESIGN.md for the grounding behind
//! each one.

mod clean_mac;
mod fix_checksums;
mod fix_lengths;
mod fix_tcp_streams;
mod move_timeline;

pub use clean_mac::CleanMac;
pub use fix_checksums::FixChecksums;
pub use fix_lengths::FixLengths;
pub use fix_tcp_streams::FixTcpStreams;
pub use move_timeline::MoveTimeline;
