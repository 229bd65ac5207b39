//! End-to-end command sessions over real loopback sockets.
//!
//! Drives the multiplexer exactly as a deployed client would: connect,
//! consume the banner, then run a scripted exchange asserting every
//! reply byte.  Complements the in-module socket tests, which cover slot
//! management; here the focus is multi-command state flowing through one
//! shared store across channels.

use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, TcpStream, UdpSocket};
use std::thread::sleep;
use std::time::Duration;

use pinpoint::adapters::hardware::GpioAdapter;
use pinpoint::app::executor::RestartRequest;
use pinpoint::app::store::PinStore;
use pinpoint::config::SystemConfig;
use pinpoint::net::server::CommandServer;
use pinpoint::supervisor::Supervisor;

use crate::mock_hw::StubLink;

struct Rig {
    server: CommandServer,
    store: PinStore,
    gpio: GpioAdapter,
    supervisor: Supervisor,
    now_ms: u64,
}

impl Rig {
    fn new() -> Self {
        let config = SystemConfig {
            tcp_port: 0,
            udp_port: 0,
            ..SystemConfig::default()
        };
        Self {
            server: CommandServer::new(&config).expect("bind test server"),
            store: PinStore::new(),
            gpio: GpioAdapter::new(),
            supervisor: Supervisor::new(&config, 0),
            now_ms: 0,
        }
    }

    fn tick(&mut self) -> Option<RestartRequest> {
        self.now_ms += 10;
        self.server.tick(
            &mut self.store,
            &mut self.gpio,
            &StubLink,
            &self.supervisor,
            self.now_ms,
        )
    }

    /// Connect and consume the two-line welcome banner.
    fn connect(&mut self) -> BufReader<TcpStream> {
        let addr = self.server.tcp_local_addr().expect("bound");
        let stream = TcpStream::connect(addr).expect("connect");
        sleep(Duration::from_millis(50));
        self.tick();

        let mut reader = BufReader::new(stream);
        let mut banner = String::new();
        reader.read_line(&mut banner).unwrap();
        banner.clear();
        reader.read_line(&mut banner).unwrap();
        reader
    }

    /// Send one command line and return its reply, CRLF stripped.
    fn send(&mut self, reader: &mut BufReader<TcpStream>, line: &str) -> String {
        reader.get_mut().write_all(line.as_bytes()).unwrap();
        reader.get_mut().write_all(b"\n").unwrap();
        sleep(Duration::from_millis(50));
        self.tick();

        let mut reply = String::new();
        reader.read_line(&mut reply).unwrap();
        reply.trim_end().to_string()
    }
}

#[test]
fn scripted_session_controls_pins() {
    let mut rig = Rig::new();
    let mut client = rig.connect();

    assert_eq!(
        rig.send(&mut client, "SET 13 1"),
        r#"{"success":true,"command":"SET","pin":13,"value":1,"message":"Pin set successfully"}"#
    );
    assert_eq!(
        rig.send(&mut client, "GET 13"),
        r#"{"success":true,"command":"GET","pin":13,"value":1,"message":"Pin value retrieved"}"#
    );
    assert_eq!(
        rig.send(&mut client, "TOGGLE 13"),
        r#"{"success":true,"command":"TOGGLE","pin":13,"value":0,"message":"Pin toggled successfully"}"#
    );
    assert_eq!(
        rig.send(&mut client, "PWM 4 128"),
        r#"{"success":true,"command":"PWM","pin":4,"value":128,"message":"PWM set successfully"}"#
    );
    assert_eq!(
        rig.send(&mut client, "RESET_PINS"),
        r#"{"success":true,"command":"RESET_PINS","message":"All pins reset"}"#
    );
    assert_eq!(rig.store.configured_count(), 0);
}

#[test]
fn json_and_text_forms_drive_the_same_store() {
    let mut rig = Rig::new();
    let mut client = rig.connect();

    let reply = rig.send(&mut client, r#"{"cmd":"SET","pin":13,"value":1}"#);
    assert!(reply.contains(r#""success":true"#), "got: {reply}");

    assert_eq!(
        rig.send(&mut client, "GET 13"),
        r#"{"success":true,"command":"GET","pin":13,"value":1,"message":"Pin value retrieved"}"#
    );
}

#[test]
fn tcp_and_udp_share_one_store() {
    let mut rig = Rig::new();
    let mut client = rig.connect();
    rig.send(&mut client, "SET 13 1");

    let udp = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let addr = rig.server.udp_local_addr().unwrap();
    udp.send_to(b"GET 13", addr).unwrap();
    sleep(Duration::from_millis(50));
    rig.tick();

    let mut buf = [0u8; 512];
    let (n, _) = udp.recv_from(&mut buf).unwrap();
    assert_eq!(
        &buf[..n],
        br#"{"success":true,"command":"GET","pin":13,"value":1,"message":"Pin value retrieved"}"#
    );
}

#[test]
fn help_over_tcp_is_raw_text() {
    let mut rig = Rig::new();
    let mut client = rig.connect();

    let first_line = rig.send(&mut client, "HELP");
    assert_eq!(first_line, "ESP32 Pin Controller - Command Reference");
}

#[test]
fn rejected_pin_never_touches_the_store() {
    let mut rig = Rig::new();
    let mut client = rig.connect();

    assert_eq!(
        rig.send(&mut client, "SET 7 1"),
        r#"{"success":false,"command":"INVALID","pin":7,"message":"Invalid pin number: 7"}"#
    );
    assert_eq!(rig.store.configured_count(), 0);
}

#[test]
fn empty_lines_are_silently_skipped() {
    let mut rig = Rig::new();
    let mut client = rig.connect();

    client.get_mut().write_all(b"\n\r\n").unwrap();
    sleep(Duration::from_millis(50));
    // One line is extracted per tick: the empty line, then the bare CR.
    rig.tick();
    rig.tick();

    // The next real command gets the next reply on the wire.
    let reply = rig.send(&mut client, "GET 4");
    assert!(reply.contains(r#""command":"GET""#), "got: {reply}");
}

#[test]
fn reset_is_acknowledged_and_service_continues() {
    let mut rig = Rig::new();
    let mut client = rig.connect();

    client.get_mut().write_all(b"RESET\n").unwrap();
    sleep(Duration::from_millis(50));
    let request = rig.tick();
    assert_eq!(request, Some(RestartRequest { delay_ms: 2_000 }));

    let mut ack = String::new();
    client.read_line(&mut ack).unwrap();
    assert_eq!(
        ack.trim_end(),
        r#"{"success":true,"command":"RESET","message":"System will restart in 2 seconds"}"#
    );

    // The restart is the main loop's decision; until the delay elapses the
    // server keeps answering.
    let reply = rig.send(&mut client, "GET 4");
    assert!(reply.contains(r#""success":true"#), "got: {reply}");
}
