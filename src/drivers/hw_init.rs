//! On-demand GPIO and LEDC access via raw ESP-IDF sys calls.
//!
//! Unlike firmware with a fixed pin map, command pins are configured the
//! first time a command touches them, so these are per-pin free functions
//! rather than a one-shot init table.  Host builds compile every function
//! as a no-op so the domain layer links unchanged.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::debug;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_config_output(pin: u8) {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config on a whitelisted pin from the single main task.
    unsafe { gpio_config(&cfg) };
    debug!("hw_init: pin {pin} configured as output");
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_config_output(_pin: u8) {}

#[cfg(target_os = "espidf")]
pub fn gpio_config_input(pin: u8) {
    // Floating input, matching the on-demand read path's expectations.
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config on a whitelisted pin from the single main task.
    unsafe { gpio_config(&cfg) };
    debug!("hw_init: pin {pin} configured as input");
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_config_input(_pin: u8) {}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: u8, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // main-loop only.
    unsafe {
        gpio_set_level(i32::from(pin), u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: u8, _high: bool) {}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: u8) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(i32::from(pin)) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: u8) -> bool {
    false
}

// ── LEDC PWM ─────────────────────────────────────────────────

/// Classic-ESP32 LEDC routing: channels 0-7 live in the high-speed group,
/// 8-15 in the low-speed group, paired two channels per timer.
#[cfg(target_os = "espidf")]
fn ledc_route(channel: u8) -> (ledc_mode_t, u32, u32) {
    let speed_mode = if channel < 8 {
        ledc_mode_t_LEDC_HIGH_SPEED_MODE
    } else {
        ledc_mode_t_LEDC_LOW_SPEED_MODE
    };
    (speed_mode, u32::from(channel % 8), u32::from((channel / 2) % 4))
}

/// Configure the channel's timer for 5 kHz / 8-bit and bind `pin` to it
/// with duty 0.
#[cfg(target_os = "espidf")]
pub fn ledc_attach_channel(pin: u8, channel: u8) {
    let (speed_mode, chan, timer) = ledc_route(channel);

    // SAFETY: LEDC register configuration from the single main task.
    unsafe {
        ledc_timer_config(&ledc_timer_config_t {
            speed_mode,
            timer_num: timer,
            duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
            freq_hz: pins::PWM_FREQ_HZ,
            clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
            ..Default::default()
        });

        ledc_channel_config(&ledc_channel_config_t {
            speed_mode,
            channel: chan,
            timer_sel: timer,
            gpio_num: i32::from(pin),
            duty: 0,
            hpoint: 0,
            ..Default::default()
        });
    }
    debug!("hw_init: LEDC channel {channel} attached to pin {pin}");
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_attach_channel(_pin: u8, _channel: u8) {}

#[cfg(target_os = "espidf")]
pub fn ledc_set_duty_raw(channel: u8, duty: u8) {
    let (speed_mode, chan, _) = ledc_route(channel);
    // SAFETY: duty register writes on a channel configured by
    // ledc_attach_channel(); race-free since only the main loop calls this.
    unsafe {
        ledc_set_duty(speed_mode, chan, u32::from(duty));
        ledc_update_duty(speed_mode, chan);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set_duty_raw(_channel: u8, _duty: u8) {}
