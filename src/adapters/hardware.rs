//! GPIO adapter — bridges the pin store to real pins.
//!
//! Implements [`GpioPort`] over the raw register helpers in
//! `drivers::hw_init`.  This is the only adapter the executor path
//! touches hardware through.  On non-espidf targets the register
//! helpers are no-ops, so the adapter additionally keeps an in-memory
//! level table so host runs read back what they wrote.

use crate::app::ports::GpioPort;
use crate::drivers::hw_init;

/// One past the highest GPIO number on the classic ESP32 package.
#[cfg(not(target_os = "espidf"))]
const SIM_PIN_SPAN: usize = 40;

pub struct GpioAdapter {
    #[cfg(not(target_os = "espidf"))]
    sim_levels: [bool; SIM_PIN_SPAN],
}

impl GpioAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            sim_levels: [false; SIM_PIN_SPAN],
        }
    }
}

impl Default for GpioAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// Callers hold the whitelist invariant: every pin passed in is a member
// of the allowed pin set, so it indexes the sim table without checks.
impl GpioPort for GpioAdapter {
    fn configure_output(&mut self, pin: u8) {
        hw_init::gpio_config_output(pin);
    }

    fn configure_input(&mut self, pin: u8) {
        hw_init::gpio_config_input(pin);
    }

    fn digital_write(&mut self, pin: u8, high: bool) {
        hw_init::gpio_write(pin, high);
        #[cfg(not(target_os = "espidf"))]
        {
            self.sim_levels[usize::from(pin)] = high;
        }
    }

    fn digital_read(&mut self, pin: u8) -> bool {
        #[cfg(target_os = "espidf")]
        {
            hw_init::gpio_read(pin)
        }
        #[cfg(not(target_os = "espidf"))]
        {
            self.sim_levels[usize::from(pin)]
        }
    }

    fn pwm_attach(&mut self, pin: u8, channel: u8) {
        hw_init::ledc_attach_channel(pin, channel);
    }

    fn pwm_write(&mut self, channel: u8, duty: u8) {
        hw_init::ledc_set_duty_raw(channel, duty);
    }
}
