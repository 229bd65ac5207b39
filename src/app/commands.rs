//! Command vocabulary and the two inbound wire forms.
//!
//! One `parse()` entry point auto-detects the format: input beginning with
//! `{` is treated as a single-line JSON object, anything else as
//! whitespace-delimited text with the keyword first.  Keywords are matched
//! case-insensitively.  Parsing never fails — malformed input becomes
//! [`Command::Invalid`] carrying a human-readable reason that the response
//! envelope echoes back to the client.
//!
//! All validation that does not require pin-store state happens here:
//! whitelist membership, SET ∈ {0, 1}, PWM ∈ [0, 255], missing fields.

use serde_json::Value;

use crate::pins;

// ───────────────────────────────────────────────────────────────
// Command type
// ───────────────────────────────────────────────────────────────

/// A fully validated inbound command, produced once per message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { pin: u8, value: bool },
    Get { pin: u8 },
    Toggle { pin: u8 },
    Pwm { pin: u8, duty: u8 },
    Status,
    Reset,
    ResetPins,
    Help,
    Invalid(InvalidCommand),
}

/// Rejected input: the reason plus whatever pin was parsed before
/// validation failed (echoed in the response when non-negative).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCommand {
    pub reason: String,
    pub pin: i32,
}

impl Command {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(InvalidCommand {
            reason: reason.into(),
            pin: -1,
        })
    }

    fn invalid_at(reason: impl Into<String>, pin: i32) -> Self {
        Self::Invalid(InvalidCommand {
            reason: reason.into(),
            pin,
        })
    }

    /// Keyword echoed in the `command` field of every response.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "SET",
            Self::Get { .. } => "GET",
            Self::Toggle { .. } => "TOGGLE",
            Self::Pwm { .. } => "PWM",
            Self::Status => "STATUS",
            Self::Reset => "RESET",
            Self::ResetPins => "RESET_PINS",
            Self::Help => "HELP",
            Self::Invalid(_) => "INVALID",
        }
    }

    /// Pin for the response envelope; negative means "omit".
    pub fn envelope_pin(&self) -> i32 {
        match self {
            Self::Set { pin, .. }
            | Self::Get { pin }
            | Self::Toggle { pin }
            | Self::Pwm { pin, .. } => i32::from(*pin),
            Self::Invalid(inv) => inv.pin,
            _ => -1,
        }
    }

    /// Failure reason recorded at parse time, if any.
    pub fn parse_error(&self) -> Option<&str> {
        match self {
            Self::Invalid(inv) => Some(&inv.reason),
            _ => None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Parsing
// ───────────────────────────────────────────────────────────────

/// Parse one inbound message.  Never panics, never blocks.
pub fn parse(input: &str) -> Command {
    if input.is_empty() {
        return Command::invalid("Empty command");
    }

    let trimmed = input.trim();
    if trimmed.starts_with('{') {
        parse_json(trimmed)
    } else {
        parse_text(trimmed)
    }
}

fn parse_text(text: &str) -> Command {
    let upper = text.to_uppercase();

    let (keyword, params) = match upper.find(' ') {
        Some(i) => (&upper[..i], upper[i + 1..].trim()),
        None => (upper.as_str(), ""),
    };

    match keyword {
        "SET" | "PWM" => {
            let Some(split) = params.find(' ') else {
                return Command::invalid("Missing parameters (expected: pin value)");
            };
            let pin = to_int(&params[..split]);
            let value = to_int(params[split + 1..].trim());
            build_write(keyword, pin, value)
        }
        "GET" | "TOGGLE" => {
            if params.is_empty() {
                return Command::invalid("Missing pin parameter");
            }
            let pin = to_int(params);
            build_read(keyword, pin)
        }
        "STATUS" => Command::Status,
        "RESET" => Command::Reset,
        "RESET_PINS" => Command::ResetPins,
        "HELP" => Command::Help,
        other => Command::invalid(format!("Invalid command: {other}")),
    }
}

fn parse_json(json: &str) -> Command {
    let doc: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => return Command::invalid(format!("JSON parse error: {e}")),
    };

    let Some(cmd_field) = doc.get("cmd") else {
        return Command::invalid("Missing 'cmd' field");
    };
    let keyword = match cmd_field {
        Value::String(s) => s.to_uppercase(),
        other => other.to_string().to_uppercase(),
    };

    match keyword.as_str() {
        "SET" | "PWM" => {
            let Some(pin_field) = doc.get("pin") else {
                return Command::invalid("Missing 'pin' field");
            };
            let pin = json_int(pin_field);
            let Some(value_field) = doc.get("value") else {
                // Pin validity is reported first, matching the text form.
                if !pin_is_allowed(pin) {
                    return Command::invalid_at(format!("Invalid pin number: {pin}"), pin);
                }
                return Command::invalid_at("Missing 'value' field", pin);
            };
            build_write(&keyword, pin, json_int(value_field))
        }
        "GET" | "TOGGLE" => {
            let Some(pin_field) = doc.get("pin") else {
                return Command::invalid("Missing 'pin' field");
            };
            build_read(&keyword, json_int(pin_field))
        }
        "STATUS" => Command::Status,
        "RESET" => Command::Reset,
        "RESET_PINS" => Command::ResetPins,
        "HELP" => Command::Help,
        other => Command::invalid(format!("Invalid command type: {other}")),
    }
}

/// Shared validation for SET/PWM once pin and value integers are in hand.
fn build_write(keyword: &str, pin: i32, value: i32) -> Command {
    if !pin_is_allowed(pin) {
        return Command::invalid_at(format!("Invalid pin number: {pin}"), pin);
    }
    let pin = pin as u8;

    if keyword == "SET" {
        if value != 0 && value != 1 {
            return Command::invalid_at("SET value must be 0 or 1", i32::from(pin));
        }
        Command::Set {
            pin,
            value: value == 1,
        }
    } else {
        if !(0..=255).contains(&value) {
            return Command::invalid_at("PWM value must be 0-255", i32::from(pin));
        }
        Command::Pwm {
            pin,
            duty: value as u8,
        }
    }
}

/// Shared validation for GET/TOGGLE.
fn build_read(keyword: &str, pin: i32) -> Command {
    if !pin_is_allowed(pin) {
        return Command::invalid_at(format!("Invalid pin number: {pin}"), pin);
    }
    let pin = pin as u8;
    if keyword == "GET" {
        Command::Get { pin }
    } else {
        Command::Toggle { pin }
    }
}

fn pin_is_allowed(pin: i32) -> bool {
    u8::try_from(pin).is_ok_and(pins::is_allowed)
}

/// Leading-integer parse: optional sign, then digits, stopping at the first
/// non-digit.  Anything else yields 0 (so `SET abc 1` reports pin 0, which
/// the whitelist then rejects).  Saturates instead of overflowing.
fn to_int(s: &str) -> i32 {
    let t = s.trim_start();
    let (negative, digits) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };

    let mut value: i64 = 0;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if negative {
        value = -value;
    }
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// ArduinoJson-style numeric coercion for JSON fields: integers pass
/// through, floats truncate, numeric strings parse, everything else is 0.
fn json_int(v: &Value) -> i32 {
    if let Some(i) = v.as_i64() {
        i.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    } else if let Some(f) = v.as_f64() {
        f as i32
    } else if let Some(s) = v.as_str() {
        to_int(s)
    } else if let Some(b) = v.as_bool() {
        i32::from(b)
    } else {
        0
    }
}

// ───────────────────────────────────────────────────────────────
// Help text
// ───────────────────────────────────────────────────────────────

/// Command reference returned verbatim for HELP, covering both wire forms
/// and the full allowed-pin list.
pub fn help_text() -> String {
    let mut help = String::from("ESP32 Pin Controller - Command Reference\n\n");
    help.push_str("JSON Format:\n");
    help.push_str("  Set pin:    {\"cmd\":\"SET\",\"pin\":13,\"value\":1}\n");
    help.push_str("  Get pin:    {\"cmd\":\"GET\",\"pin\":13}\n");
    help.push_str("  Toggle pin: {\"cmd\":\"TOGGLE\",\"pin\":13}\n");
    help.push_str("  PWM:        {\"cmd\":\"PWM\",\"pin\":13,\"value\":128}\n");
    help.push_str("  Status:     {\"cmd\":\"STATUS\"}\n");
    help.push_str("  Reset:      {\"cmd\":\"RESET\"}\n");
    help.push_str("  Reset pins: {\"cmd\":\"RESET_PINS\"}\n");
    help.push_str("  Help:       {\"cmd\":\"HELP\"}\n\n");
    help.push_str("Text Format:\n");
    help.push_str("  Set pin:    SET 13 1\n");
    help.push_str("  Get pin:    GET 13\n");
    help.push_str("  Toggle pin: TOGGLE 13\n");
    help.push_str("  PWM:        PWM 13 128\n");
    help.push_str("  Status:     STATUS\n");
    help.push_str("  Reset:      RESET\n");
    help.push_str("  Reset pins: RESET_PINS\n");
    help.push_str("  Help:       HELP\n\n");
    help.push_str("Available pins: ");
    for (i, pin) in pins::ALLOWED_PINS.iter().enumerate() {
        if i > 0 {
            help.push_str(", ");
        }
        help.push_str(&pin.to_string());
    }
    help.push('\n');
    help
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_set_parses() {
        assert_eq!(
            parse("SET 13 1"),
            Command::Set {
                pin: 13,
                value: true
            }
        );
        assert_eq!(
            parse("set 13 0"),
            Command::Set {
                pin: 13,
                value: false
            }
        );
    }

    #[test]
    fn text_get_toggle_parse() {
        assert_eq!(parse("GET 4"), Command::Get { pin: 4 });
        assert_eq!(parse("toggle 27"), Command::Toggle { pin: 27 });
    }

    #[test]
    fn text_pwm_parses() {
        assert_eq!(parse("PWM 13 128"), Command::Pwm { pin: 13, duty: 128 });
        assert_eq!(parse("pwm 13 255"), Command::Pwm { pin: 13, duty: 255 });
    }

    #[test]
    fn bare_keywords_parse() {
        assert_eq!(parse("STATUS"), Command::Status);
        assert_eq!(parse("reset"), Command::Reset);
        assert_eq!(parse("RESET_PINS"), Command::ResetPins);
        assert_eq!(parse("Help"), Command::Help);
    }

    #[test]
    fn whitelist_enforced_before_execution() {
        let cmd = parse("SET 1 1");
        assert_eq!(cmd.parse_error(), Some("Invalid pin number: 1"));
        assert_eq!(cmd.envelope_pin(), 1);
    }

    #[test]
    fn negative_pin_is_not_echoed() {
        let cmd = parse("GET -5");
        assert_eq!(cmd.parse_error(), Some("Invalid pin number: -5"));
        assert_eq!(cmd.envelope_pin(), -1, "negative pins are omitted");
    }

    #[test]
    fn set_value_range_enforced() {
        assert_eq!(parse("SET 13 2").parse_error(), Some("SET value must be 0 or 1"));
        assert_eq!(parse("SET 13 -1").parse_error(), Some("SET value must be 0 or 1"));
    }

    #[test]
    fn pwm_value_range_enforced() {
        assert_eq!(parse("PWM 13 256").parse_error(), Some("PWM value must be 0-255"));
        assert_eq!(parse("PWM 13 -1").parse_error(), Some("PWM value must be 0-255"));
        assert_eq!(parse("PWM 13 0"), Command::Pwm { pin: 13, duty: 0 });
    }

    #[test]
    fn missing_text_parameters() {
        assert_eq!(
            parse("SET 13").parse_error(),
            Some("Missing parameters (expected: pin value)")
        );
        assert_eq!(parse("GET").parse_error(), Some("Missing pin parameter"));
    }

    #[test]
    fn unknown_keyword_is_echoed_uppercased() {
        assert_eq!(parse("blink 13").parse_error(), Some("Invalid command: BLINK"));
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse("").parse_error(), Some("Empty command"));
    }

    #[test]
    fn garbage_numbers_become_zero() {
        // Pin 0 is reserved, so the whitelist rejects the coerced value.
        assert_eq!(parse("SET abc 1").parse_error(), Some("Invalid pin number: 0"));
    }

    #[test]
    fn json_set_parses() {
        assert_eq!(
            parse(r#"{"cmd":"SET","pin":13,"value":1}"#),
            Command::Set {
                pin: 13,
                value: true
            }
        );
    }

    #[test]
    fn json_keyword_case_insensitive() {
        assert_eq!(parse(r#"{"cmd":"get","pin":4}"#), Command::Get { pin: 4 });
    }

    #[test]
    fn json_missing_fields() {
        assert_eq!(parse(r#"{"pin":13}"#).parse_error(), Some("Missing 'cmd' field"));
        assert_eq!(
            parse(r#"{"cmd":"GET"}"#).parse_error(),
            Some("Missing 'pin' field")
        );
        assert_eq!(
            parse(r#"{"cmd":"SET","pin":13}"#).parse_error(),
            Some("Missing 'value' field")
        );
    }

    #[test]
    fn json_malformed_reports_detail() {
        let cmd = parse(r#"{"cmd":"#);
        let reason = cmd.parse_error().unwrap();
        assert!(reason.starts_with("JSON parse error: "), "got: {reason}");
    }

    #[test]
    fn json_unknown_command_type() {
        assert_eq!(
            parse(r#"{"cmd":"FLASH","pin":13}"#).parse_error(),
            Some("Invalid command type: FLASH")
        );
    }

    #[test]
    fn json_numeric_string_pin_coerces() {
        assert_eq!(parse(r#"{"cmd":"GET","pin":"13"}"#), Command::Get { pin: 13 });
    }

    #[test]
    fn surrounding_whitespace_ignored() {
        assert_eq!(parse("  GET 4  \r"), Command::Get { pin: 4 });
        assert_eq!(
            parse("  {\"cmd\":\"STATUS\"}  "),
            Command::Status
        );
    }

    #[test]
    fn to_int_matches_strtol_shape() {
        assert_eq!(to_int("42"), 42);
        assert_eq!(to_int("-7"), -7);
        assert_eq!(to_int("+9"), 9);
        assert_eq!(to_int("12abc"), 12);
        assert_eq!(to_int("abc"), 0);
        assert_eq!(to_int(""), 0);
        assert_eq!(to_int("999999999999999999999"), i32::MAX);
    }

    #[test]
    fn help_lists_every_pin() {
        let help = help_text();
        for pin in crate::pins::ALLOWED_PINS {
            assert!(help.contains(&pin.to_string()), "pin {pin} missing from help");
        }
        for keyword in ["SET", "GET", "TOGGLE", "PWM", "STATUS", "RESET", "RESET_PINS", "HELP"] {
            assert!(help.contains(keyword), "{keyword} missing from help");
        }
    }
}
