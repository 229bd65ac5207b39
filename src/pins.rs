//! GPIO / peripheral pin assignments and hardware limits.
//!
//! Single source of truth — every module references this file rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Remotely controllable pins
// ---------------------------------------------------------------------------

/// Pins that remote clients may drive.
///
/// Excludes pins reserved for flash (6-11), boot strapping (0, 2) and the
/// serial console (1, 3).  Adjust per board variant.
pub const ALLOWED_PINS: [u8; 18] = [
    4, 5, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27, 32, 33,
];

/// Whether `pin` may be controlled remotely.
pub fn is_allowed(pin: u8) -> bool {
    ALLOWED_PINS.contains(&pin)
}

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

/// On-board status LED (blink patterns signal link state).
pub const STATUS_LED_GPIO: u8 = 2;

// ---------------------------------------------------------------------------
// PWM (LEDC) configuration
// ---------------------------------------------------------------------------

/// Number of LEDC channels the chip provides.
pub const MAX_PWM_CHANNELS: u8 = 16;
/// LEDC base frequency for client-controlled PWM outputs.
pub const PWM_FREQ_HZ: u32 = 5_000;
/// LEDC timer resolution (bits).  8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
