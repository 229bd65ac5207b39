//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PinStore / executor (domain)
//! ```
//!
//! Driven adapters (GPIO hardware, the WiFi station) implement these traits.
//! The pin store and command executor consume them via generics, so the
//! domain core never touches hardware directly and runs unchanged on the
//! host for tests.

// ───────────────────────────────────────────────────────────────
// GPIO port (driven adapter: domain → pins)
// ───────────────────────────────────────────────────────────────

/// Pin-level hardware primitives the store drives.
///
/// All methods are infallible at this boundary: register writes on an
/// ESP32 cannot report failure, and validation (whitelist, value range,
/// channel pool) happens in the store before any call lands here.
pub trait GpioPort {
    /// Configure `pin` as a push-pull digital output.
    fn configure_output(&mut self, pin: u8);

    /// Configure `pin` as a floating digital input.
    fn configure_input(&mut self, pin: u8);

    /// Drive an already-configured output pin.
    fn digital_write(&mut self, pin: u8, high: bool);

    /// Sample an already-configured input pin.
    fn digital_read(&mut self, pin: u8) -> bool;

    /// Bind `pin` to LEDC `channel` (timer setup + attach, duty 0).
    fn pwm_attach(&mut self, pin: u8, channel: u8);

    /// Set the duty cycle (0–255) on an attached LEDC channel.
    fn pwm_write(&mut self, channel: u8, duty: u8);
}

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: connectivity → status reporting)
// ───────────────────────────────────────────────────────────────

/// Read-only view of the wireless link, consumed by status reporting.
///
/// Reconnection policy lives entirely in the adapter; the command engine
/// only ever reads these accessors.
pub trait LinkPort {
    fn is_connected(&self) -> bool;

    /// SSID of the associated network; empty when disconnected.
    fn current_ssid(&self) -> &str;

    /// Station IPv4 address; unspecified (0.0.0.0) when disconnected.
    fn current_address(&self) -> core::net::Ipv4Addr;

    /// Received signal strength in dBm; 0 when disconnected.
    fn signal_quality(&self) -> i32;
}
