//! Scripted serial-console sessions against the shared command pipeline.
//!
//! Uses the console's simulated input queue to type complete command
//! lines and asserts the effects on the store and the simulated pins.

use pinpoint::adapters::hardware::GpioAdapter;
use pinpoint::app::executor::RestartRequest;
use pinpoint::app::ports::GpioPort;
use pinpoint::app::store::{PinMode, PinStore};
use pinpoint::config::SystemConfig;
use pinpoint::console::Console;
use pinpoint::net::server::CommandServer;
use pinpoint::supervisor::Supervisor;

use crate::mock_hw::{DownLink, StubLink};

struct Rig {
    console: Console,
    store: PinStore,
    gpio: GpioAdapter,
    supervisor: Supervisor,
}

impl Rig {
    fn new() -> Self {
        Self {
            console: Console::new(),
            store: PinStore::new(),
            gpio: GpioAdapter::new(),
            supervisor: Supervisor::new(&SystemConfig::default(), 0),
        }
    }

    fn run(&mut self, line: &str) -> Option<RestartRequest> {
        self.console.push_input(line);
        self.console.push_input("\n");
        self.console.service(
            &mut self.store,
            &mut self.gpio,
            &DownLink,
            None,
            &self.supervisor,
            5_000,
        )
    }
}

#[test]
fn typed_commands_drive_the_pins() {
    let mut rig = Rig::new();

    rig.run("SET 13 1");
    assert_eq!(rig.store.mode_of(13), Some(PinMode::DigitalOutput));
    assert!(rig.gpio.digital_read(13));

    rig.run("TOGGLE 13");
    assert!(!rig.gpio.digital_read(13));

    rig.run("PWM 4 200");
    assert_eq!(rig.store.get_pwm(4), Some(200));
}

#[test]
fn json_commands_work_on_the_console_too() {
    let mut rig = Rig::new();
    rig.run(r#"{"cmd":"SET","pin":13,"value":1}"#);
    assert_eq!(rig.store.mode_of(13), Some(PinMode::DigitalOutput));
}

#[test]
fn reading_a_fresh_pin_claims_no_record() {
    let mut rig = Rig::new();
    rig.run("GET 4");
    assert_eq!(rig.store.mode_of(4), None, "input reads leave no record");
    assert_eq!(rig.store.configured_count(), 0);
}

#[test]
fn reset_bubbles_a_restart_request() {
    let mut rig = Rig::new();
    assert_eq!(rig.run("RESET"), Some(RestartRequest { delay_ms: 2_000 }));
}

#[test]
fn status_renders_with_a_live_server() {
    let mut rig = Rig::new();
    let config = SystemConfig {
        tcp_port: 0,
        udp_port: 0,
        ..SystemConfig::default()
    };
    let server = CommandServer::new(&config).expect("bind test server");

    rig.console.push_input("STATUS\n");
    let request = rig.console.service(
        &mut rig.store,
        &mut rig.gpio,
        &StubLink,
        Some(&server),
        &rig.supervisor,
        5_000,
    );
    assert_eq!(request, None);
}
