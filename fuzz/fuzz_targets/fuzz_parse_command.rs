//! Fuzz target: `commands::parse` (both wire forms)
//!
//! Feeds arbitrary bytes through the format auto-detection and both the
//! text and JSON parsers.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Every parse yields a command with a nameable keyword
//! - Invalid input always carries a non-empty reason
//!
//! cargo fuzz run fuzz_parse_command

#![no_main]

use libfuzzer_sys::fuzz_target;
use pinpoint::app::commands::{self, Command};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let cmd = commands::parse(&input);

    assert!(!cmd.name().is_empty());

    if let Command::Invalid(inv) = &cmd {
        assert!(
            !inv.reason.is_empty(),
            "rejections must carry a reason: {input:?}"
        );
    }
});
