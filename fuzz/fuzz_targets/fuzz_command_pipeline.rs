//! Fuzz target: the full parse → execute → render pipeline
//!
//! Drives an in-memory pin store with arbitrary multi-line input, the same
//! shape a hostile TCP client could send.
//!
//! Invariants checked:
//! - No panics across parse, execution and envelope rendering
//! - Replies are always a single line
//! - RESET never schedules anything but the fixed restart delay
//!
//! cargo fuzz run fuzz_command_pipeline

#![no_main]

use libfuzzer_sys::fuzz_target;
use pinpoint::app::executor::{self, Action, RESTART_DELAY_MS};
use pinpoint::app::ports::GpioPort;
use pinpoint::app::store::PinStore;
use pinpoint::app::{commands, response};

struct NullGpio;

impl GpioPort for NullGpio {
    fn configure_output(&mut self, _pin: u8) {}
    fn configure_input(&mut self, _pin: u8) {}
    fn digital_write(&mut self, _pin: u8, _high: bool) {}
    fn digital_read(&mut self, _pin: u8) -> bool {
        false
    }
    fn pwm_attach(&mut self, _pin: u8, _channel: u8) {}
    fn pwm_write(&mut self, _channel: u8, _duty: u8) {}
}

fuzz_target!(|data: &[u8]| {
    let mut store = PinStore::new();
    let mut gpio = NullGpio;

    for line in String::from_utf8_lossy(data).lines().take(64) {
        let cmd = commands::parse(line);
        match executor::execute(&cmd, &mut store, &mut gpio) {
            Action::Reply(outcome) => {
                let reply = response::render(&cmd, &outcome);
                assert!(!reply.contains('\n'), "multi-line reply for {line:?}");
            }
            Action::ReplyAndRestart(outcome, request) => {
                assert_eq!(request.delay_ms, RESTART_DELAY_MS);
                let _ = response::render(&cmd, &outcome);
            }
            Action::SendStatus | Action::SendHelp => {}
        }
    }
});
