//! Command server — the connection multiplexer.
//!
//! One TCP listener with a fixed pool of client slots, plus a UDP socket
//! answering one datagram per request.  Both speak the same command
//! protocol; only this module knows which channel a command arrived on.
//!
//! Everything is non-blocking and serviced in bounded steps from the
//! scheduler tick: at most one accepted connection, one completed line
//! per client, and one datagram per call.  `std::net` is backed by lwIP
//! on the device, so the same code runs on both targets.
//!
//! Line discipline: requests are newline-terminated; TCP replies are
//! CRLF-terminated lines (the aggregate STATUS body spans several), UDP
//! replies are bare datagrams.  Lines longer than the command buffer are
//! discarded whole.

use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream, UdpSocket};

use log::{debug, error, info, warn};

use crate::app::commands;
use crate::app::executor::{self, Action, RestartRequest};
use crate::app::ports::{GpioPort, LinkPort};
use crate::app::report::{self, StatusSnapshot};
use crate::app::response;
use crate::app::store::PinStore;
use crate::config::{SystemConfig, COMMAND_BUFFER_SIZE, MAX_TCP_CLIENTS};
use crate::drivers::system;
use crate::error::{NetError, Result};
use crate::supervisor::Supervisor;

struct ClientSlot {
    stream: TcpStream,
    line: heapless::Vec<u8, COMMAND_BUFFER_SIZE>,
    /// Set after an overflow; bytes are dropped until the next newline.
    discarding: bool,
}

pub struct CommandServer {
    listener: TcpListener,
    udp: UdpSocket,
    tcp_port: u16,
    udp_port: u16,
    clients: [Option<ClientSlot>; MAX_TCP_CLIENTS],
}

impl CommandServer {
    /// Bind both sockets in non-blocking mode.  Port 0 picks a free port
    /// (tests); the actual ports are what STATUS reports.
    pub fn new(config: &SystemConfig) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.tcp_port))
            .map_err(|e| {
                error!("Net: TCP bind on port {} failed: {e}", config.tcp_port);
                NetError::BindFailed
            })?;
        listener.set_nonblocking(true).map_err(|_| NetError::Io)?;
        let tcp_port = listener
            .local_addr()
            .map(|a| a.port())
            .unwrap_or(config.tcp_port);
        info!("Net: TCP server started on port {tcp_port}");

        let udp = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.udp_port)).map_err(|e| {
            error!("Net: UDP bind on port {} failed: {e}", config.udp_port);
            NetError::BindFailed
        })?;
        udp.set_nonblocking(true).map_err(|_| NetError::Io)?;
        let udp_port = udp.local_addr().map(|a| a.port()).unwrap_or(config.udp_port);
        info!("Net: UDP server started on port {udp_port}");

        Ok(Self {
            listener,
            udp,
            tcp_port,
            udp_port,
            clients: core::array::from_fn(|_| None),
        })
    }

    /// Service every channel by one bounded step.  Returns a restart
    /// request if one was commanded this tick.
    pub fn tick(
        &mut self,
        store: &mut PinStore,
        gpio: &mut dyn GpioPort,
        link: &dyn LinkPort,
        supervisor: &Supervisor,
        now_ms: u64,
    ) -> Option<RestartRequest> {
        let mut restart = None;

        self.accept_new();

        for i in 0..MAX_TCP_CLIENTS {
            let Some(line) = self.poll_client_line(i) else {
                continue;
            };
            debug!("Net: TCP command from client {i}: {line}");
            let (reply, request) = self.respond(&line, store, gpio, link, supervisor, now_ms);
            if request.is_some() {
                restart = request;
            }
            self.send_tcp(i, &reply);
        }

        if let Some((line, peer)) = self.poll_udp() {
            debug!("Net: UDP command from {peer}: {line}");
            let (reply, request) = self.respond(&line, store, gpio, link, supervisor, now_ms);
            if request.is_some() {
                restart = request;
            }
            if let Err(e) = self.udp.send_to(reply.as_bytes(), peer) {
                warn!("Net: UDP reply to {peer} failed: {e}");
            }
        }

        restart
    }

    /// Occupied client slots.
    pub fn client_count(&self) -> usize {
        self.clients.iter().filter(|c| c.is_some()).count()
    }

    /// Multi-line summary for the serial status screen.
    pub fn status_text(&self) -> String {
        let mut status = String::from("Network Server Status:\n");
        status.push_str(&format!("  TCP Server: Port {}\n", self.tcp_port));
        status.push_str(&format!("  UDP Server: Port {}\n", self.udp_port));
        status.push_str(&format!(
            "  Connected TCP Clients: {}\n",
            self.client_count()
        ));
        status
    }

    /// Actual bound TCP address (useful when port 0 was requested).
    pub fn tcp_local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(|_| NetError::Io.into())
    }

    /// Actual bound UDP address.
    pub fn udp_local_addr(&self) -> Result<SocketAddr> {
        self.udp.local_addr().map_err(|_| NetError::Io.into())
    }

    fn accept_new(&mut self) {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                if stream.set_nonblocking(true).is_err() {
                    warn!("Net: failed to set non-blocking on client socket");
                    return;
                }
                let _ = stream.set_nodelay(true);

                match self.clients.iter().position(Option::is_none) {
                    Some(i) => {
                        info!("Net: new TCP client connected from {peer} (slot {i})");
                        let mut slot = ClientSlot {
                            stream,
                            line: heapless::Vec::new(),
                            discarding: false,
                        };
                        let _ = slot
                            .stream
                            .write_all(b"ESP32 Pin Controller Ready\r\nType HELP for command list\r\n");
                        self.clients[i] = Some(slot);
                    }
                    None => {
                        warn!("Net: rejected TCP client from {peer} (no free slots)");
                        let mut stream = stream;
                        let _ = stream.write_all(b"ERROR: Server full\r\n");
                    }
                }
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => warn!("Net: accept error: {e}"),
        }
    }

    /// Pull newly arrived bytes for slot `i` and hand back at most one
    /// completed, non-empty line.  Frees the slot on EOF or error.
    fn poll_client_line(&mut self, i: usize) -> Option<String> {
        let slot = self.clients[i].as_mut()?;

        let mut chunk = [0u8; 256];
        match slot.stream.read(&mut chunk) {
            Ok(0) => {
                info!("Net: TCP client {i} disconnected");
                self.clients[i] = None;
                return None;
            }
            Ok(n) => {
                for &b in &chunk[..n] {
                    if slot.discarding {
                        if b == b'\n' {
                            slot.discarding = false;
                        }
                        continue;
                    }
                    if slot.line.push(b).is_err() {
                        warn!("Net: client {i} line too long, discarding");
                        slot.line.clear();
                        if b != b'\n' {
                            slot.discarding = true;
                        }
                    }
                }
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => {
                warn!("Net: client {i} read error: {e}");
                self.clients[i] = None;
                return None;
            }
        }

        let slot = self.clients[i].as_mut()?;
        let pos = slot.line.iter().position(|&b| b == b'\n')?;
        let line = String::from_utf8_lossy(&slot.line[..pos]).trim().to_string();

        // Shift any bytes after the newline to the front for next tick.
        let tail_start = pos + 1;
        let remaining = slot.line.len() - tail_start;
        for j in 0..remaining {
            slot.line[j] = slot.line[tail_start + j];
        }
        slot.line.truncate(remaining);

        if line.is_empty() {
            return None;
        }
        Some(line)
    }

    fn poll_udp(&mut self) -> Option<(String, SocketAddr)> {
        let mut buf = [0u8; COMMAND_BUFFER_SIZE];
        match self.udp.recv_from(&mut buf) {
            Ok((n, peer)) => {
                let line = String::from_utf8_lossy(&buf[..n]).trim().to_string();
                Some((line, peer))
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(e) => {
                warn!("Net: UDP receive error: {e}");
                None
            }
        }
    }

    fn send_tcp(&mut self, i: usize, reply: &str) {
        let Some(slot) = self.clients[i].as_mut() else {
            return;
        };
        let write = slot
            .stream
            .write_all(reply.as_bytes())
            .and_then(|()| slot.stream.write_all(b"\r\n"));
        if write.is_err() {
            warn!("Net: write to client {i} failed, dropping");
            self.clients[i] = None;
        }
    }

    /// Parse, execute, and render one command; channel-independent.
    fn respond(
        &self,
        input: &str,
        store: &mut PinStore,
        gpio: &mut dyn GpioPort,
        link: &dyn LinkPort,
        supervisor: &Supervisor,
        now_ms: u64,
    ) -> (String, Option<RestartRequest>) {
        let cmd = commands::parse(input);
        match executor::execute(&cmd, store, gpio) {
            Action::Reply(outcome) => (response::render(&cmd, &outcome), None),
            Action::SendHelp => (commands::help_text(), None),
            Action::SendStatus => {
                let body = report::status_json(&self.snapshot(store, link, supervisor, now_ms));
                (body, None)
            }
            Action::ReplyAndRestart(outcome, request) => {
                (response::render(&cmd, &outcome), Some(request))
            }
        }
    }

    fn snapshot(
        &self,
        store: &PinStore,
        link: &dyn LinkPort,
        supervisor: &Supervisor,
        now_ms: u64,
    ) -> StatusSnapshot {
        StatusSnapshot {
            uptime_secs: supervisor.uptime_secs(now_ms),
            free_heap_bytes: system::free_heap_bytes(),
            chip_model: system::chip_model(),
            cpu_freq_mhz: system::cpu_freq_mhz(),
            wifi_connected: link.is_connected(),
            ssid: link.current_ssid().to_string(),
            ip: link.current_address().to_string(),
            rssi_dbm: link.signal_quality(),
            tcp_port: self.tcp_port,
            udp_port: self.udp_port,
            tcp_clients: self.client_count(),
            pin_states_json: store.states_json(),
            error_count: supervisor.error_count(),
            consecutive_errors: supervisor.consecutive_errors(),
            last_error: supervisor.last_error().to_string(),
        }
    }
}
