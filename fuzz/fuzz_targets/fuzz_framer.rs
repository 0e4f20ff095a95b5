//! Fuzz target: `Framer::push`
//!
//! Every frame the framer yields must carry its own length in the first
//! byte and lie within the legal frame size range.
//!
//! cargo fuzz run fuzz_framer

#![no_main]

use libfuzzer_sys::fuzz_target;
use lrpc::rpc::framer::{Framer, MAX_FRAME_SIZE, MIN_FRAME_SIZE};

fuzz_target!(|data: &[u8]| {
    // First byte picks the receive limit.
    let Some((&limit, rest)) = data.split_first() else {
        return;
    };
    let mut framer = Framer::with_limit(limit as usize);

    for &b in rest {
        if let Some(frame) = framer.push(b) {
            assert_eq!(frame[0] as usize, frame.len());
            assert!(frame.len() >= MIN_FRAME_SIZE);
            assert!(frame.len() <= MAX_FRAME_SIZE);
        }
        assert!(framer.len() <= MAX_FRAME_SIZE);
    }
});
