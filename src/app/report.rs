//! Aggregate STATUS report and shared connectivity line rendering.
//!
//! The network STATUS reply is the one response that is pretty-printed;
//! everything else on the wire is a compact single line.  `pin_states` is
//! carried as an embedded JSON string rather than a nested object, which
//! long-standing clients already parse in two passes.

use serde::Serialize;

use super::ports::LinkPort;

/// Snapshot of everything the aggregate STATUS report covers.  Assembled
/// by the transport that owns the pieces, rendered here.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub uptime_secs: u64,
    pub free_heap_bytes: u32,
    pub chip_model: &'static str,
    pub cpu_freq_mhz: u32,
    pub wifi_connected: bool,
    pub ssid: String,
    pub ip: String,
    pub rssi_dbm: i32,
    pub tcp_port: u16,
    pub udp_port: u16,
    pub tcp_clients: usize,
    pub pin_states_json: String,
    pub error_count: u32,
    pub consecutive_errors: u32,
    pub last_error: String,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    success: bool,
    command: &'a str,
    system: SystemInfo<'a>,
    wifi: WifiInfo<'a>,
    server: ServerInfo,
    pin_states: &'a str,
    watchdog: WatchdogInfo<'a>,
}

#[derive(Serialize)]
struct SystemInfo<'a> {
    uptime: u64,
    free_heap: u32,
    chip_model: &'a str,
    cpu_freq: u32,
}

#[derive(Serialize)]
struct WifiInfo<'a> {
    connected: bool,
    ssid: &'a str,
    ip: &'a str,
    rssi: i32,
}

#[derive(Serialize)]
struct ServerInfo {
    tcp_port: u16,
    udp_port: u16,
    tcp_clients: usize,
}

#[derive(Serialize)]
struct WatchdogInfo<'a> {
    error_count: u32,
    consecutive_errors: u32,
    last_error: &'a str,
}

/// Render the pretty-printed STATUS reply.
pub fn status_json(s: &StatusSnapshot) -> String {
    let body = StatusBody {
        success: true,
        command: "STATUS",
        system: SystemInfo {
            uptime: s.uptime_secs,
            free_heap: s.free_heap_bytes,
            chip_model: s.chip_model,
            cpu_freq: s.cpu_freq_mhz,
        },
        wifi: WifiInfo {
            connected: s.wifi_connected,
            ssid: &s.ssid,
            ip: &s.ip,
            rssi: s.rssi_dbm,
        },
        server: ServerInfo {
            tcp_port: s.tcp_port,
            udp_port: s.udp_port,
            tcp_clients: s.tcp_clients,
        },
        pin_states: &s.pin_states_json,
        watchdog: WatchdogInfo {
            error_count: s.error_count,
            consecutive_errors: s.consecutive_errors,
            last_error: &s.last_error,
        },
    };

    serde_json::to_string_pretty(&body)
        .unwrap_or_else(|_| String::from(r#"{"success":true,"command":"STATUS"}"#))
}

/// One-line connectivity summary used by the serial status screen and the
/// heartbeat log.
pub fn link_status_line(link: &dyn LinkPort) -> String {
    if link.is_connected() {
        format!(
            "Connected to {} (IP: {}, RSSI: {} dBm)",
            link.current_ssid(),
            link.current_address(),
            link.signal_quality()
        )
    } else {
        String::from("Disconnected")
    }
}
