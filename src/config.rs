//! System configuration parameters
//!
//! All tunable parameters for the pin-controller firmware, with defaults
//! matching the reference deployment.  Construct once in `main()` and pass
//! by reference; nothing here is global.

use serde::{Deserialize, Serialize};

/// Device hostname reported in status output.
pub const DEVICE_HOSTNAME: &str = "esp32-controller";

/// Console baud rate (UART0 is configured by the bootloader; informational).
pub const SERIAL_BAUD_RATE: u32 = 115_200;

/// Fixed number of stream client slots.
pub const MAX_TCP_CLIENTS: usize = 4;

/// Longest accepted command line, per channel.  Anything longer is
/// discarded whole.
pub const COMMAND_BUFFER_SIZE: usize = 512;

/// One candidate access point.
#[derive(Debug, Clone, Copy)]
pub struct WifiNetwork {
    pub ssid: &'static str,
    pub password: &'static str,
}

/// Access points tried in order, at boot and on each reconnect attempt.
/// Replace with your own networks before flashing.
pub const WIFI_NETWORKS: [WifiNetwork; 2] = [
    WifiNetwork {
        ssid: "YourWiFiSSID",
        password: "YourWiFiPassword",
    },
    WifiNetwork {
        ssid: "BackupSSID",
        password: "BackupPassword",
    },
];

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Network ---
    /// TCP command server port
    pub tcp_port: u16,
    /// UDP command server port
    pub udp_port: u16,
    /// How long to block startup waiting for the first link-up (ms)
    pub wifi_connect_timeout_ms: u32,
    /// Pause between reconnect rounds once the link has dropped (ms)
    pub wifi_reconnect_interval_ms: u32,

    // --- Watchdog / recovery ---
    /// Hardware watchdog timeout (seconds)
    pub hw_watchdog_timeout_secs: u32,
    /// Minimum interval between hardware watchdog feeds (ms)
    pub feed_interval_ms: u32,
    /// Quiet period after which consecutive errors are forgiven (ms)
    pub error_cooldown_ms: u32,
    /// Consecutive errors that force a restart
    pub max_consecutive_errors: u32,
    /// Restart automatically when the consecutive-error limit is hit
    pub restart_on_critical_error: bool,

    // --- Status LED blink intervals (ms) ---
    pub led_blink_connecting_ms: u32,
    pub led_blink_connected_ms: u32,
    pub led_blink_error_ms: u32,

    // --- Timing ---
    /// Heartbeat log interval (ms); 0 disables
    pub heartbeat_interval_ms: u32,
    /// Sleep at the end of each scheduler tick (ms)
    pub tick_sleep_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Network
            tcp_port: 8888,
            udp_port: 8889,
            wifi_connect_timeout_ms: 10_000,
            wifi_reconnect_interval_ms: 30_000,

            // Watchdog / recovery
            hw_watchdog_timeout_secs: 8,
            feed_interval_ms: 1_000,
            error_cooldown_ms: 5_000,
            max_consecutive_errors: 10,
            restart_on_critical_error: true,

            // Status LED
            led_blink_connecting_ms: 500,
            led_blink_connected_ms: 2_000,
            led_blink_error_ms: 100,

            // Timing
            heartbeat_interval_ms: 60_000,
            tick_sleep_ms: 10,
        }
    }
}
