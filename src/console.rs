//! Serial console: the same command protocol on UART0, with
//! human-readable STATUS/HELP/RESET screens instead of JSON.
//!
//! Input is polled one bounded step per tick, like the network
//! channels.  On the device, bytes come from the UART driver with a
//! zero timeout; on host targets a pushable buffer stands in so tests
//! can drive full command round trips.
//!
//! Replies go to stdout, which the ESP-IDF VFS routes to the same
//! console UART.

use std::io::Write as _;

use log::{debug, info};

use crate::app::commands;
use crate::app::executor::{self, Action, RestartRequest};
use crate::app::ports::{GpioPort, LinkPort};
use crate::app::report;
use crate::app::response;
use crate::app::store::PinStore;
use crate::config::{COMMAND_BUFFER_SIZE, SERIAL_BAUD_RATE};
use crate::drivers::system;
use crate::net::server::CommandServer;
use crate::supervisor::Supervisor;

const RULE: &str = "========================================";

pub struct Console {
    line: heapless::Vec<u8, COMMAND_BUFFER_SIZE>,
    /// Set after an overflow; bytes are dropped until the next newline.
    discarding: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_input: std::collections::VecDeque<u8>,
}

impl Console {
    /// Take over UART0 for command input.  The boot console has already
    /// configured the pins; this re-parametrizes and installs the
    /// interrupt-driven driver so reads can be non-blocking.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        use esp_idf_svc::sys::*;

        let uart_config = uart_config_t {
            baud_rate: SERIAL_BAUD_RATE as i32,
            data_bits: uart_word_length_t_UART_DATA_8_BITS,
            parity: uart_parity_t_UART_PARITY_DISABLE,
            stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
            flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
            ..Default::default()
        };
        // SAFETY: one-time UART0 driver setup from the main task, before
        // any reads are issued.
        unsafe {
            uart_param_config(0, &uart_config);
            uart_driver_install(0, 512, 0, 0, core::ptr::null_mut(), 0);
        }
        info!("Console: ready on UART0 at {SERIAL_BAUD_RATE} baud");

        Self {
            line: heapless::Vec::new(),
            discarding: false,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            line: heapless::Vec::new(),
            discarding: false,
            sim_input: std::collections::VecDeque::new(),
        }
    }

    /// Queue bytes as if typed on the console.
    #[cfg(not(target_os = "espidf"))]
    pub fn push_input(&mut self, text: &str) {
        self.sim_input.extend(text.bytes());
    }

    /// Service at most one console command.  Returns a restart request
    /// when one was commanded.
    pub fn service(
        &mut self,
        store: &mut PinStore,
        gpio: &mut dyn GpioPort,
        link: &dyn LinkPort,
        server: Option<&CommandServer>,
        supervisor: &Supervisor,
        now_ms: u64,
    ) -> Option<RestartRequest> {
        let line = self.poll_line()?;
        debug!("Console: command: {line}");

        let cmd = commands::parse(&line);
        match executor::execute(&cmd, store, gpio) {
            Action::Reply(outcome) => {
                println!("{}", response::render(&cmd, &outcome));
                None
            }
            Action::SendStatus => {
                self.print_status(store, link, server, supervisor, now_ms);
                None
            }
            Action::SendHelp => {
                println!();
                println!("{RULE}");
                println!("  Command Help");
                println!("{RULE}");
                print!("{}", commands::help_text());
                println!("{RULE}");
                println!();
                None
            }
            Action::ReplyAndRestart(_, request) => {
                println!();
                println!("{RULE}");
                println!("  RESTART REQUESTED");
                println!("{RULE}");
                println!("Restarting in 2 seconds...");
                println!("{RULE}");
                println!();
                Some(request)
            }
        }
    }

    fn print_status(
        &self,
        store: &PinStore,
        link: &dyn LinkPort,
        server: Option<&CommandServer>,
        supervisor: &Supervisor,
        now_ms: u64,
    ) {
        println!();
        println!("{RULE}");
        println!("  System Status");
        println!("{RULE}");
        println!("{}", report::link_status_line(link));
        println!("Free Heap: {} bytes", system::free_heap_bytes());
        println!();
        match server {
            Some(s) => print!("{}", s.status_text()),
            None => println!("Network Server Status:\n  Not running"),
        }
        println!();
        println!("Pin States:");
        print!("{}", store.states_text());
        println!();
        println!("Watchdog Status:");
        print!("{}", supervisor.error_stats(now_ms));
        println!("{RULE}");
        println!();
        let _ = std::io::stdout().flush();
    }

    /// Pull newly arrived bytes and hand back at most one completed,
    /// non-empty line.
    fn poll_line(&mut self) -> Option<String> {
        let mut chunk = [0u8; 64];
        let n = self.platform_read(&mut chunk);
        for &b in &chunk[..n] {
            if self.discarding {
                if b == b'\n' {
                    self.discarding = false;
                }
                continue;
            }
            if self.line.push(b).is_err() {
                debug!("Console: line too long, discarding");
                self.line.clear();
                if b != b'\n' {
                    self.discarding = true;
                }
            }
        }

        let pos = self.line.iter().position(|&b| b == b'\n')?;
        let line = String::from_utf8_lossy(&self.line[..pos]).trim().to_string();

        let tail_start = pos + 1;
        let remaining = self.line.len() - tail_start;
        for j in 0..remaining {
            self.line[j] = self.line[tail_start + j];
        }
        self.line.truncate(remaining);

        if line.is_empty() {
            return None;
        }
        Some(line)
    }

    #[cfg(target_os = "espidf")]
    fn platform_read(&mut self, buf: &mut [u8]) -> usize {
        // SAFETY: driver installed in new(); zero ticks_to_wait keeps the
        // call non-blocking.
        let n = unsafe {
            esp_idf_svc::sys::uart_read_bytes(0, buf.as_mut_ptr().cast(), buf.len() as u32, 0)
        };
        if n > 0 { n as usize } else { 0 }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_read(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.sim_input.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::hardware::GpioAdapter;
    use crate::app::store::PinMode;
    use crate::config::SystemConfig;
    use core::net::Ipv4Addr;

    struct DownLink;

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

    struct Bed {
        console: Console,
        store: PinStore,
        gpio: GpioAdapter,
        supervisor: Supervisor,
    }

    impl Bed {
        fn new() -> Self {
            Self {
                console: Console::new(),
                store: PinStore::new(),
                gpio: GpioAdapter::new(),
                supervisor: Supervisor::new(&SystemConfig::default(), 0),
            }
        }

        fn service(&mut self) -> Option<RestartRequest> {
            self.console.service(
                &mut self.store,
                &mut self.gpio,
                &DownLink,
                None,
                &self.supervisor,
                2_000,
            )
        }
    }

    #[test]
    fn executes_a_typed_command() {
        let mut bed = Bed::new();
        bed.console.push_input("SET 13 1\n");
        assert_eq!(bed.service(), None);
        assert_eq!(bed.store.mode_of(13), Some(PinMode::DigitalOutput));
    }

    #[test]
    fn waits_for_the_newline() {
        let mut bed = Bed::new();
        bed.console.push_input("SET 1");
        assert_eq!(bed.service(), None);
        assert_eq!(bed.store.mode_of(13), None);

        bed.console.push_input("3 1\n");
        bed.service();
        assert_eq!(bed.store.mode_of(13), Some(PinMode::DigitalOutput));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let mut bed = Bed::new();
        bed.console.push_input("   \n\n");
        assert_eq!(bed.service(), None);
        assert_eq!(bed.service(), None);
        assert_eq!(bed.store.configured_count(), 0);
    }

    #[test]
    fn reset_returns_the_restart_request() {
        let mut bed = Bed::new();
        bed.console.push_input("RESET\n");
        assert_eq!(bed.service(), Some(RestartRequest { delay_ms: 2_000 }));
    }

    #[test]
    fn status_renders_without_a_server() {
        let mut bed = Bed::new();
        bed.console.push_input("STATUS\n");
        assert_eq!(bed.service(), None);
    }

    #[test]
    fn one_command_per_service_call() {
        let mut bed = Bed::new();
        bed.console.push_input("SET 13 1\nTOGGLE 13\n");

        bed.service();
        assert_eq!(bed.store.get_pwm(13), None);
        assert_eq!(bed.store.mode_of(13), Some(PinMode::DigitalOutput));

        // The second line is still queued and runs on the next call.
        bed.service();
        assert!(!bed.gpio.digital_read(13));
    }
}
