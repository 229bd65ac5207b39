//! WiFi station adapter.
//!
//! Owns the STA interface and the candidate-network rotation; everything
//! else in the system consumes the read accessors through [`LinkPort`]
//! and never sees reconnection internals.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation with a settable link state.
//!
//! ## Connection policy
//!
//! Attempts are non-blocking: `begin` kicks off an attempt and `poll`
//! advances it from the main loop tick.  Each candidate gets the connect
//! timeout; when the whole list fails, the adapter goes quiet for the
//! reconnect interval before the next round.  A lost link retries
//! promptly, then falls into the same rhythm.

use core::net::Ipv4Addr;

use log::{info, warn};

use crate::config::{SystemConfig, WifiNetwork};

#[cfg(target_os = "espidf")]
use crate::error::{Error, Result};
use crate::app::ports::LinkPort;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

/// How often an established link is re-verified against the driver.
const CONNECTION_CHECK_INTERVAL_MS: u64 = 5_000;

/// Reported signal strength while no AP is associated.
const RSSI_FLOOR_DBM: i32 = -100;

pub struct WifiAdapter {
    #[cfg(target_os = "espidf")]
    driver: EspWifi<'static>,
    networks: &'static [WifiNetwork],
    current: usize,
    tried_this_round: usize,
    connected: bool,
    active_ssid: &'static str,
    ip: Ipv4Addr,
    rssi: i32,
    connect_timeout_ms: u64,
    reconnect_interval_ms: u64,
    attempt_started_ms: Option<u64>,
    last_attempt_ms: u64,
    last_check_ms: u64,
    /// Simulation: what the fake driver reports as link state.
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        networks: &'static [WifiNetwork],
        config: &SystemConfig,
    ) -> Result<Self> {
        let driver = EspWifi::new(modem, sysloop, Some(nvs)).map_err(|e| {
            log::error!("WiFi: driver init failed: {e}");
            Error::Init("wifi driver")
        })?;
        info!("WiFi: driver initialized, {} configured networks", networks.len());

        Ok(Self {
            driver,
            networks,
            current: 0,
            tried_this_round: 0,
            connected: false,
            active_ssid: "",
            ip: Ipv4Addr::UNSPECIFIED,
            rssi: RSSI_FLOOR_DBM,
            connect_timeout_ms: u64::from(config.wifi_connect_timeout_ms),
            reconnect_interval_ms: u64::from(config.wifi_reconnect_interval_ms),
            attempt_started_ms: None,
            last_attempt_ms: 0,
            last_check_ms: 0,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(networks: &'static [WifiNetwork], config: &SystemConfig) -> Self {
        info!("WiFi(sim): {} configured networks", networks.len());
        Self {
            networks,
            current: 0,
            tried_this_round: 0,
            connected: false,
            active_ssid: "",
            ip: Ipv4Addr::UNSPECIFIED,
            rssi: RSSI_FLOOR_DBM,
            connect_timeout_ms: u64::from(config.wifi_connect_timeout_ms),
            reconnect_interval_ms: u64::from(config.wifi_reconnect_interval_ms),
            attempt_started_ms: None,
            last_attempt_ms: 0,
            last_check_ms: 0,
            sim_link_up: true,
        }
    }

    /// Start the first connection round.
    pub fn begin(&mut self, now_ms: u64) {
        self.tried_this_round = 0;
        self.start_attempt(now_ms);
    }

    /// Advance the connection state machine by one tick.
    pub fn poll(&mut self, now_ms: u64) {
        if self.connected {
            if now_ms.saturating_sub(self.last_check_ms) < CONNECTION_CHECK_INTERVAL_MS {
                return;
            }
            self.last_check_ms = now_ms;
            if self.platform_is_up() {
                self.ip = self.platform_ip();
                self.rssi = self.platform_rssi();
            } else {
                warn!("WiFi: connection lost");
                self.mark_down();
            }
            return;
        }

        match self.attempt_started_ms {
            Some(started) => {
                if self.platform_is_up() {
                    self.mark_connected(now_ms);
                } else if now_ms.saturating_sub(started) >= self.connect_timeout_ms {
                    warn!("WiFi: failed to connect to '{}'", self.candidate().ssid);
                    self.tried_this_round += 1;
                    if self.tried_this_round >= self.networks.len() {
                        warn!(
                            "WiFi: all networks failed, next round in {} ms",
                            self.reconnect_interval_ms
                        );
                        self.attempt_started_ms = None;
                        self.tried_this_round = 0;
                    } else {
                        self.current = (self.current + 1) % self.networks.len();
                        self.start_attempt(now_ms);
                    }
                }
            }
            None => {
                if now_ms.saturating_sub(self.last_attempt_ms) >= self.reconnect_interval_ms {
                    info!("WiFi: attempting to reconnect");
                    self.start_attempt(now_ms);
                }
            }
        }
    }

    /// Force the simulated driver link state.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_link(&mut self, up: bool) {
        self.sim_link_up = up;
    }

    fn candidate(&self) -> &WifiNetwork {
        &self.networks[self.current]
    }

    fn start_attempt(&mut self, now_ms: u64) {
        self.last_attempt_ms = now_ms;
        info!("WiFi: connecting to '{}'", self.candidate().ssid);
        self.platform_begin_attempt();
        self.attempt_started_ms = Some(now_ms);
    }

    fn mark_connected(&mut self, now_ms: u64) {
        self.connected = true;
        self.attempt_started_ms = None;
        self.tried_this_round = 0;
        self.last_check_ms = now_ms;
        self.active_ssid = self.candidate().ssid;
        self.ip = self.platform_ip();
        self.rssi = self.platform_rssi();
        info!(
            "WiFi: connected to '{}' (IP: {}, RSSI: {} dBm)",
            self.active_ssid, self.ip, self.rssi
        );
    }

    fn mark_down(&mut self) {
        self.connected = false;
        self.active_ssid = "";
        self.ip = Ipv4Addr::UNSPECIFIED;
        self.rssi = RSSI_FLOOR_DBM;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_begin_attempt(&mut self) {
        let net = self.networks[self.current];
        let Ok(ssid) = net.ssid.try_into() else {
            warn!("WiFi: SSID '{}' too long, skipping", net.ssid);
            return;
        };
        let Ok(password) = net.password.try_into() else {
            warn!("WiFi: password for '{}' too long, skipping", net.ssid);
            return;
        };
        let auth_method = if net.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        // A stale association from the previous candidate is torn down
        // first; the error when there is none is expected.
        let _ = self.driver.disconnect();

        let cfg = Configuration::Client(ClientConfiguration {
            ssid,
            password,
            auth_method,
            ..Default::default()
        });
        if let Err(e) = self.driver.set_configuration(&cfg) {
            warn!("WiFi: set_configuration failed: {e}");
            return;
        }
        if !self.driver.is_started().unwrap_or(false) {
            if let Err(e) = self.driver.start() {
                warn!("WiFi: start failed: {e}");
                return;
            }
        }
        if let Err(e) = self.driver.connect() {
            warn!("WiFi: connect failed: {e}");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin_attempt(&mut self) {}

    #[cfg(target_os = "espidf")]
    fn platform_is_up(&self) -> bool {
        if !self.driver.is_connected().unwrap_or(false) {
            return false;
        }
        // Associated is not enough; the servers need an address.
        self.driver
            .sta_netif()
            .get_ip_info()
            .map_or(false, |info| !info.ip.is_unspecified())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_up(&self) -> bool {
        self.sim_link_up
    }

    #[cfg(target_os = "espidf")]
    fn platform_ip(&self) -> Ipv4Addr {
        self.driver
            .sta_netif()
            .get_ip_info()
            .map_or(Ipv4Addr::UNSPECIFIED, |info| info.ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_ip(&self) -> Ipv4Addr {
        if self.sim_link_up {
            Ipv4Addr::new(192, 168, 1, 100)
        } else {
            Ipv4Addr::UNSPECIFIED
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_rssi(&self) -> i32 {
        let mut ap = esp_idf_svc::sys::wifi_ap_record_t::default();
        // SAFETY: read-only query of the currently associated AP record.
        if unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap) } == esp_idf_svc::sys::ESP_OK
        {
            i32::from(ap.rssi)
        } else {
            RSSI_FLOOR_DBM
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rssi(&self) -> i32 {
        if self.sim_link_up { -58 } else { RSSI_FLOOR_DBM }
    }
}

impl LinkPort for WifiAdapter {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn current_ssid(&self) -> &str {
        if self.connected {
            self.active_ssid
        } else {
            "Not connected"
        }
    }

    fn current_address(&self) -> Ipv4Addr {
        self.ip
    }

    fn signal_quality(&self) -> i32 {
        self.rssi
    }
}
