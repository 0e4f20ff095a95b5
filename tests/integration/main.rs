//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem through a
//! full `Server` and a mock transport. All tests run on the host with no
//! hardware required.

mod meta_tests;
mod stream_tests;
