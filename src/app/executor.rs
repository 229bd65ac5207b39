//! Command execution: the switch from parsed commands to pin-store calls.
//!
//! Returns an [`Action`] instead of a rendered string because three
//! commands bypass the generic envelope: STATUS and HELP have
//! transport-specific payloads, and RESET must hand a deferred
//! [`RestartRequest`] up to the main loop after the acknowledgement has
//! been written.

use super::commands::Command;
use super::ports::GpioPort;
use super::response::Outcome;
use super::store::PinStore;

/// Delay between the RESET acknowledgement and the actual restart, long
/// enough for the reply to flush.
pub const RESTART_DELAY_MS: u64 = 2_000;

/// Deferred restart scheduled by a RESET command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartRequest {
    pub delay_ms: u64,
}

/// What a transport should send back for one executed command.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Wrap the outcome in the generic JSON envelope.
    Reply(Outcome),
    /// Render the transport's own aggregate status report.
    SendStatus,
    /// Send the command reference verbatim.
    SendHelp,
    /// Acknowledge, then hand the restart request to the main loop.
    ReplyAndRestart(Outcome, RestartRequest),
}

/// Execute one command against the store.  Total over every variant.
///
/// SET and PWM echo the commanded value even on failure; GET and TOGGLE
/// echo the read-back level only on success.
pub fn execute(cmd: &Command, store: &mut PinStore, gpio: &mut dyn GpioPort) -> Action {
    match cmd {
        Command::Set { pin, value } => {
            let outcome = match store.set_digital(gpio, *pin, *value) {
                Ok(()) => Outcome::ok("Pin set successfully"),
                Err(_) => Outcome::fail("Failed to set pin"),
            };
            Action::Reply(outcome.with_value(i32::from(*value)))
        }

        Command::Get { pin } => {
            let outcome = match store.get_digital(gpio, *pin) {
                Ok(level) => Outcome::ok("Pin value retrieved").with_value(i32::from(level)),
                Err(_) => Outcome::fail("Failed to get pin value"),
            };
            Action::Reply(outcome)
        }

        Command::Toggle { pin } => {
            let outcome = match store.toggle(gpio, *pin) {
                Ok(()) => {
                    let level = store.get_digital(gpio, *pin).map_or(-1, i32::from);
                    Outcome::ok("Pin toggled successfully").with_value(level)
                }
                Err(_) => Outcome::fail("Failed to toggle pin"),
            };
            Action::Reply(outcome)
        }

        Command::Pwm { pin, duty } => {
            let outcome = match store.set_pwm(gpio, *pin, *duty) {
                Ok(()) => Outcome::ok("PWM set successfully"),
                Err(_) => Outcome::fail("Failed to set PWM"),
            };
            Action::Reply(outcome.with_value(i32::from(*duty)))
        }

        Command::Status => Action::SendStatus,

        Command::Reset => Action::ReplyAndRestart(
            Outcome::ok("System will restart in 2 seconds"),
            RestartRequest {
                delay_ms: RESTART_DELAY_MS,
            },
        ),

        Command::ResetPins => {
            store.reset_all(gpio);
            Action::Reply(Outcome::ok("All pins reset"))
        }

        Command::Help => Action::SendHelp,

        // The parse reason reaches the client via the envelope fallback.
        Command::Invalid(_) => Action::Reply(Outcome::fail(String::new())),
    }
}
