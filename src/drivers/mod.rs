//! Hardware drivers: raw GPIO/LEDC access, watchdog timer, status LED,
//! and chip-level helpers.

pub mod hw_init;
pub mod status_led;
pub mod system;
pub mod watchdog;
