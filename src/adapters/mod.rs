//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements | Connects to              |
//! |------------|------------|--------------------------|
//! | `hardware` | GpioPort   | ESP32 GPIO + LEDC        |
//! | `time`     | (clock)    | ESP32 system timer       |
//! | `wifi`     | LinkPort   | ESP-IDF WiFi STA         |

pub mod hardware;
pub mod time;
pub mod wifi;
