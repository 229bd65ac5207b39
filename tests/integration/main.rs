//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives a full transport session
//! against the real server or console, with stub collaborators standing
//! in for the radio.  All tests run on the host (x86_64) over loopback
//! sockets and simulated console input.

#![cfg(not(target_os = "espidf"))]

mod console_tests;
mod mock_hw;
mod session_tests;
