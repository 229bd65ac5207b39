//! Shared test doubles for the integration suite.
//!
//! The pin side uses the library's own host-simulated `GpioAdapter`; only
//! the wireless link needs stubbing here.

use core::net::Ipv4Addr;

use pinpoint::app::ports::LinkPort;

/// Healthy uplink with fixed identity, for status assertions.
pub struct StubLink;

impl LinkPort for StubLink {
    fn is_connected(&self) -> bool {
        true
    }

    fn current_ssid(&self) -> &str {
        "testnet"
    }

    fn current_address(&self) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, 9)
    }

    fn signal_quality(&self) -> i32 {
        -51
    }
}

/// Uplink that never came up.
pub struct DownLink;

impl LinkPort for DownLink {
    fn is_connected(&self) -> bool {
        false
    }

    fn current_ssid(&self) -> &str {
        "Not connected"
    }

    fn current_address(&self) -> Ipv4Addr {
        Ipv4Addr::UNSPECIFIED
    }

    fn signal_quality(&self) -> i32 {
        -100
    }
}
