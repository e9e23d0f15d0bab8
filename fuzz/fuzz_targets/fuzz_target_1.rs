#![no_main]
use libfuzzer_sys::fuzz_target;
use pcapweave::block::{read_block, Section};
use std::io::Cursor;

// Drives the block decoder over arbitrary bytes. A malformed capture
// must error or return cleanly, never panic.
fuzz_target!(|data: &[u8]| {
    let mut cur = Cursor::new(data);
    let mut section = Section::new();
    while let Ok(Some(_)) = read_block(&mut cur, &mut section) {}
});
