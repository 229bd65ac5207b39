//! Pinpoint Firmware — Main Entry Point
//!
//! Networked GPIO pin controller: one cooperative loop multiplexes TCP,
//! UDP and serial command channels over a shared parser and executor.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Transports (outer ring)                │
//! │                                                           │
//! │   CommandServer (TCP x4 + UDP)        Console (UART0)     │
//! │                                                           │
//! │  ────────────────── Port Trait Boundary ───────────────   │
//! │                                                           │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │   parse → execute → render  (pure logic, host-      │  │
//! │  │   testable; PinStore owns modes + PWM channels)     │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │                                                           │
//! │   GpioAdapter (GPIO + LEDC) · WifiAdapter · Supervisor    │
//! └───────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod console;
mod error;
mod pins;
mod supervisor;

pub mod app;
mod adapters;
mod drivers;
mod net;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::hardware::GpioAdapter;
use adapters::time::Esp32Clock;
use adapters::wifi::WifiAdapter;
use app::executor::RestartRequest;
use app::ports::LinkPort;
use app::report;
use app::store::PinStore;
use config::SystemConfig;
use console::Console;
use drivers::status_led::StatusLed;
use net::server::CommandServer;
use supervisor::{Recovery, Supervisor};

// ── Fault reporting ───────────────────────────────────────────
//
// The supervisor never restarts from inside `register_error`; it hands
// back a verdict and the call site acts on it.  Every fault in main
// goes through here so the limit is enforced uniformly.

fn report_fault(supervisor: &mut Supervisor, message: &str, now_ms: u64) {
    if supervisor.register_error(message, now_ms) == Recovery::RestartNow {
        supervisor.restart("Maximum consecutive errors exceeded", now_ms);
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Pinpoint v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    info!("Device: {}", config::DEVICE_HOSTNAME);

    // ── 2. Core state ─────────────────────────────────────────
    //
    // Everything is constructed here and passed by reference; no
    // subsystem holds a global.
    let config = SystemConfig::default();
    let clock = Esp32Clock::new();
    let mut supervisor = Supervisor::new(&config, clock.now_ms());
    let mut led = StatusLed::new();
    let mut gpio = GpioAdapter::new();
    let mut store = PinStore::new();
    let mut console = Console::new();

    // ── 3. WiFi link ──────────────────────────────────────────
    #[cfg(target_os = "espidf")]
    let mut wifi = {
        let peripherals = esp_idf_svc::hal::peripherals::Peripherals::take()?;
        let sysloop = esp_idf_svc::eventloop::EspSystemEventLoop::take()?;
        let nvs = esp_idf_svc::nvs::EspDefaultNvsPartition::take()?;
        match WifiAdapter::new(
            peripherals.modem,
            sysloop,
            nvs,
            &config::WIFI_NETWORKS,
            &config,
        ) {
            Ok(w) => w,
            Err(e) => {
                // No driver means no link and no recovery path — halt and
                // let the hardware watchdog reset us.
                log::error!("WiFi driver init failed: {e} — halting");
                #[allow(clippy::empty_loop)]
                loop {}
            }
        }
    };
    #[cfg(not(target_os = "espidf"))]
    let mut wifi = WifiAdapter::new(&config::WIFI_NETWORKS, &config);

    wifi.begin(clock.now_ms());

    // Block briefly for the first connection so the server can come up
    // with the rest of setup.
    let wifi_start = clock.now_ms();
    while !wifi.is_connected()
        && clock.now_ms() - wifi_start < u64::from(config.wifi_connect_timeout_ms)
    {
        wifi.poll(clock.now_ms());
        supervisor.feed(clock.now_ms());
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    // ── 4. Network server ─────────────────────────────────────
    let mut server: Option<CommandServer> = None;

    if wifi.is_connected() {
        match CommandServer::new(&config) {
            Ok(s) => {
                info!("{}", report::link_status_line(&wifi));
                server = Some(s);
            }
            Err(e) => {
                report_fault(
                    &mut supervisor,
                    &format!("Server start failed: {e}"),
                    clock.now_ms(),
                );
            }
        }
    } else {
        warn!("WiFi not connected, server not started; retrying in background");
        report_fault(
            &mut supervisor,
            "Initial WiFi connection failed",
            clock.now_ms(),
        );
    }

    info!("System ready. Entering command loop.");

    // ── 5. Command loop ───────────────────────────────────────
    let mut blink_interval = if wifi.is_connected() {
        u64::from(config.led_blink_connecting_ms)
    } else {
        u64::from(config.led_blink_error_ms)
    };
    let mut pending_restart_at: Option<u64> = None;
    let mut last_heartbeat_ms = clock.now_ms();

    loop {
        let now = clock.now_ms();

        supervisor.feed(now);
        wifi.poll(now);

        // Start the server once the link comes up; tear it down on loss
        // so stale sockets never linger across reconnects.
        if wifi.is_connected() && server.is_none() {
            info!("WiFi connected, starting server");
            match CommandServer::new(&config) {
                Ok(s) => {
                    info!("{}", report::link_status_line(&wifi));
                    supervisor.clear_errors();
                    server = Some(s);
                }
                Err(e) => {
                    report_fault(&mut supervisor, &format!("Server start failed: {e}"), now);
                }
            }
        }

        if wifi.is_connected() && server.is_some() {
            blink_interval = u64::from(config.led_blink_connected_ms);
        } else if !wifi.is_connected() {
            blink_interval = u64::from(config.led_blink_error_ms);
            if server.is_some() {
                warn!("WiFi disconnected, stopping server");
                server = None;
            }
        }

        // One bounded service pass per channel.
        let mut restart_request: Option<RestartRequest> = None;
        if let Some(s) = server.as_mut() {
            restart_request = s.tick(&mut store, &mut gpio, &wifi, &supervisor, now);
        }
        if let Some(req) =
            console.service(&mut store, &mut gpio, &wifi, server.as_ref(), &supervisor, now)
        {
            restart_request = Some(req);
        }
        if let Some(req) = restart_request {
            pending_restart_at = Some(now + req.delay_ms);
        }

        led.blink(now, blink_interval);

        // Periodic heartbeat.
        if config.heartbeat_interval_ms > 0
            && now - last_heartbeat_ms >= u64::from(config.heartbeat_interval_ms)
        {
            last_heartbeat_ms = now;
            info!("--- Heartbeat ---");
            info!("Uptime: {} seconds", supervisor.uptime_secs(now));
            info!("{}", report::link_status_line(&wifi));
            if let Some(s) = server.as_ref() {
                info!("TCP Clients: {}", s.client_count());
            }
            info!("Free Heap: {} bytes", drivers::system::free_heap_bytes());
            info!("-----------------");
        }

        // Deferred restart from a RESET command, once the acknowledgement
        // has had time to flush.
        if let Some(at) = pending_restart_at {
            if now >= at {
                supervisor.restart("User requested restart", now);
            }
        }

        if supervisor.should_restart() {
            supervisor.restart("Automatic restart due to errors", now);
        }

        std::thread::sleep(std::time::Duration::from_millis(u64::from(
            config.tick_sleep_ms,
        )));
    }
}
