//! On-board status LED driver.
//!
//! One GPIO drives the board LED.  The main loop picks a blink interval
//! from the link state (fast = fault, slow = connected) and calls
//! [`StatusLed::blink`] every tick; the driver toggles the line once the
//! interval has elapsed.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the GPIO via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::pins;

pub struct StatusLed {
    lit: bool,
    last_toggle_ms: u64,
}

impl StatusLed {
    /// Configure the LED pin as an output, driven low.
    pub fn new() -> Self {
        hw_init::gpio_config_output(pins::STATUS_LED_GPIO);
        hw_init::gpio_write(pins::STATUS_LED_GPIO, false);
        Self {
            lit: false,
            last_toggle_ms: 0,
        }
    }

    /// Toggle the LED once `interval_ms` has elapsed since the last edge.
    pub fn blink(&mut self, now_ms: u64, interval_ms: u64) {
        if now_ms.saturating_sub(self.last_toggle_ms) >= interval_ms {
            self.last_toggle_ms = now_ms;
            self.lit = !self.lit;
            hw_init::gpio_write(pins::STATUS_LED_GPIO, self.lit);
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}
