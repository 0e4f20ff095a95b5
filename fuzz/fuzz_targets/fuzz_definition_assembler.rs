//! Fuzz target: `DefinitionAssembler::feed_frame` and `finish`
//!
//! Arbitrary frames are parsed and fed to the assembler; any completed
//! blob is inflated. Nothing may panic and the inflate limit must hold.
//!
//! cargo fuzz run fuzz_definition_assembler

#![no_main]

use libfuzzer_sys::fuzz_target;
use lrpc::rpc::chunked::DefinitionAssembler;
use lrpc::rpc::client::ResponseFrame;
use lrpc::rpc::compress::MAX_DEFINITION_SIZE;

fuzz_target!(|data: &[u8]| {
    let mut assembler = DefinitionAssembler::new();
    let mut rest = data;

    while let Some(&size) = rest.first() {
        let size = (size as usize).clamp(1, rest.len());
        let (bytes, tail) = rest.split_at(size);
        rest = tail;

        let Ok(frame) = ResponseFrame::parse(bytes) else {
            continue;
        };
        if let Ok(Some(blob)) = assembler.feed_frame(&frame) {
            if let Ok(text) = DefinitionAssembler::finish(&blob, None) {
                assert!(text.len() <= MAX_DEFINITION_SIZE);
            }
        }
    }
});
