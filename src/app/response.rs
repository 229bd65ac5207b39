//! Outbound JSON reply envelope shared by the TCP and UDP paths.
//!
//! Every executed command (except STATUS, which returns the full system
//! report, and HELP, which returns raw text) is answered with one compact
//! JSON object.  Field order is fixed: `success`, `command`, `pin`,
//! `value`, `message`.  Pin and value are omitted when negative; an empty
//! message falls back to the parse error recorded on the command.

use serde::Serialize;

use super::commands::Command;

/// Result of executing one command, before envelope assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    /// Result value to report; negative means "omit".
    pub value: i32,
    pub message: String,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            value: -1,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            value: -1,
            message: message.into(),
        }
    }

    pub fn with_value(mut self, value: i32) -> Self {
        self.value = value;
        self
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    success: bool,
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pin: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

/// Render the single-line reply for `cmd`.
pub fn render(cmd: &Command, outcome: &Outcome) -> String {
    let message = if !outcome.message.is_empty() {
        Some(outcome.message.as_str())
    } else if !outcome.success {
        cmd.parse_error()
    } else {
        None
    };

    let pin = cmd.envelope_pin();
    let envelope = Envelope {
        success: outcome.success,
        command: cmd.name(),
        pin: (pin >= 0).then_some(pin),
        value: (outcome.value >= 0).then_some(outcome.value),
        message,
    };

    // Serializing a flat struct of ints and strs cannot fail in practice.
    serde_json::to_string(&envelope)
        .unwrap_or_else(|_| String::from(r#"{"success":false,"command":"INVALID"}"#))
}
