//! Pin state store: the single owner of configured-pin bookkeeping.
//!
//! Every hardware mutation flows through here so the cache and the silicon
//! never disagree.  A pin enters a mode the first time its setter runs;
//! switching modes goes through an explicit `reconfigure` step that silently
//! abandons the old configuration (an abandoned PWM channel stays allocated
//! until [`PinStore::reset_all`], matching the monotonic allocator
//! invariant).

use serde::Serialize;

use crate::app::ports::GpioPort;
use crate::error::PinError;
use crate::pins;

/// Configured mode of one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    DigitalOutput,
    PwmOutput,
}

/// Bookkeeping for one configured pin.
#[derive(Debug, Clone, Copy)]
pub struct PinRecord {
    pub mode: PinMode,
    /// Last commanded value: 0/1 for digital, 0-255 for PWM duty.
    pub value: u8,
    /// LEDC channel, present only while in PWM mode.
    pub channel: Option<u8>,
}

/// Commanded state for every whitelisted pin plus the PWM channel
/// allocator.  Slots are indexed by position in [`pins::ALLOWED_PINS`];
/// pins outside the whitelist never reach a slot.
pub struct PinStore {
    slots: [Option<PinRecord>; pins::ALLOWED_PINS.len()],
    next_channel: u8,
}

impl PinStore {
    pub fn new() -> Self {
        Self {
            slots: [None; pins::ALLOWED_PINS.len()],
            next_channel: 0,
        }
    }

    fn slot_index(pin: u8) -> Result<usize, PinError> {
        pins::ALLOWED_PINS
            .iter()
            .position(|&p| p == pin)
            .ok_or(PinError::NotAllowed(pin))
    }

    /// Explicit mode transition: run the hardware configure step that moves
    /// `pin` into `mode`, discarding whatever configuration it had before.
    /// Digital starts driven low; PWM attaches the next free LEDC channel at
    /// duty 0 and returns it.
    fn reconfigure(
        &mut self,
        gpio: &mut dyn GpioPort,
        pin: u8,
        mode: PinMode,
    ) -> Result<Option<u8>, PinError> {
        match mode {
            PinMode::DigitalOutput => {
                gpio.configure_output(pin);
                gpio.digital_write(pin, false);
                Ok(None)
            }
            PinMode::PwmOutput => {
                if self.next_channel >= pins::MAX_PWM_CHANNELS {
                    return Err(PinError::NoFreeChannel);
                }
                let ch = self.next_channel;
                self.next_channel += 1;
                gpio.pwm_attach(pin, ch);
                gpio.pwm_write(ch, 0);
                Ok(Some(ch))
            }
        }
    }

    /// Drive `pin` high or low, configuring it as a digital output first
    /// when its current mode differs.
    pub fn set_digital(
        &mut self,
        gpio: &mut dyn GpioPort,
        pin: u8,
        high: bool,
    ) -> Result<(), PinError> {
        let idx = Self::slot_index(pin)?;

        if self.slots[idx].map(|r| r.mode) != Some(PinMode::DigitalOutput) {
            self.reconfigure(gpio, pin, PinMode::DigitalOutput)?;
        }

        gpio.digital_write(pin, high);
        self.slots[idx] = Some(PinRecord {
            mode: PinMode::DigitalOutput,
            value: u8::from(high),
            channel: None,
        });
        Ok(())
    }

    /// Read `pin`: the cached level while it is a digital output, otherwise
    /// a live sample with the pin configured as an input.  The record is
    /// left untouched by the input path, so a PWM pin read this way still
    /// reports PWM mode in the projections.
    pub fn get_digital(&mut self, gpio: &mut dyn GpioPort, pin: u8) -> Result<bool, PinError> {
        let idx = Self::slot_index(pin)?;

        if let Some(rec) = self.slots[idx] {
            if rec.mode == PinMode::DigitalOutput {
                return Ok(rec.value != 0);
            }
        }

        gpio.configure_input(pin);
        Ok(gpio.digital_read(pin))
    }

    /// Invert the current digital level, whatever the present mode.
    pub fn toggle(&mut self, gpio: &mut dyn GpioPort, pin: u8) -> Result<(), PinError> {
        let current = self.get_digital(gpio, pin)?;
        self.set_digital(gpio, pin, !current)
    }

    /// Write a PWM duty, attaching the pin to a fresh LEDC channel when it
    /// is not already in PWM mode.  Channels are handed out monotonically
    /// and never reclaimed before a full reset, so a pin that leaves and
    /// re-enters PWM mode consumes a second channel.
    pub fn set_pwm(&mut self, gpio: &mut dyn GpioPort, pin: u8, duty: u8) -> Result<(), PinError> {
        let idx = Self::slot_index(pin)?;

        let channel = match self.slots[idx] {
            Some(PinRecord {
                mode: PinMode::PwmOutput,
                channel: Some(ch),
                ..
            }) => ch,
            _ => self
                .reconfigure(gpio, pin, PinMode::PwmOutput)?
                .ok_or(PinError::NoFreeChannel)?,
        };

        gpio.pwm_write(channel, duty);
        self.slots[idx] = Some(PinRecord {
            mode: PinMode::PwmOutput,
            value: duty,
            channel: Some(channel),
        });
        Ok(())
    }

    /// Cached duty cycle, present only while the pin is in PWM mode.
    pub fn get_pwm(&self, pin: u8) -> Option<u8> {
        let idx = Self::slot_index(pin).ok()?;
        match self.slots[idx] {
            Some(PinRecord {
                mode: PinMode::PwmOutput,
                value,
                ..
            }) => Some(value),
            _ => None,
        }
    }

    pub fn mode_of(&self, pin: u8) -> Option<PinMode> {
        let idx = Self::slot_index(pin).ok()?;
        self.slots[idx].map(|r| r.mode)
    }

    /// Number of pins currently holding a configuration record.
    pub fn configured_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Drive every configured pin to its quiescent level (digital LOW, PWM
    /// duty 0), then forget all records and rewind the channel allocator.
    pub fn reset_all(&mut self, gpio: &mut dyn GpioPort) {
        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(rec) = slot {
                match rec.mode {
                    PinMode::DigitalOutput => {
                        gpio.digital_write(pins::ALLOWED_PINS[idx], false);
                    }
                    PinMode::PwmOutput => {
                        if let Some(ch) = rec.channel {
                            gpio.pwm_write(ch, 0);
                        }
                    }
                }
            }
        }
        self.slots = [None; pins::ALLOWED_PINS.len()];
        self.next_channel = 0;
    }

    /// Multi-line listing for the serial status screen.
    pub fn states_text(&self) -> String {
        let mut out = String::from("Configured Pins:\n");
        if self.configured_count() == 0 {
            out.push_str("  None\n");
            return out;
        }
        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(rec) = slot {
                let pin = pins::ALLOWED_PINS[idx];
                match rec.mode {
                    PinMode::DigitalOutput => {
                        out.push_str(&format!("  Pin {pin}: DIGITAL = {}\n", rec.value));
                    }
                    PinMode::PwmOutput => {
                        out.push_str(&format!("  Pin {pin}: PWM = {}\n", rec.value));
                    }
                }
            }
        }
        out
    }

    /// Compact JSON projection embedded in the STATUS report, ascending by
    /// pin number.
    pub fn states_json(&self) -> String {
        let pins: Vec<PinEntry> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                slot.map(|rec| PinEntry {
                    pin: pins::ALLOWED_PINS[idx],
                    value: rec.value,
                    mode: match rec.mode {
                        PinMode::DigitalOutput => "digital",
                        PinMode::PwmOutput => "pwm",
                    },
                })
            })
            .collect();

        serde_json::to_string(&PinDump { pins })
            .unwrap_or_else(|_| String::from(r#"{"pins":[]}"#))
    }
}

impl Default for PinStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct PinEntry {
    pin: u8,
    value: u8,
    mode: &'static str,
}

#[derive(Serialize)]
struct PinDump {
    pins: Vec<PinEntry>,
}
