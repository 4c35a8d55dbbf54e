//! # Simulated Gateway
//!
//! Runs the gateway core against in-memory controllers on a desktop:
//! - Two classic channels, one of them chatting with an OBD-II tester
//! - A console sink printing every routed frame
//! - Short idle timeouts so the warning / shutdown / wake cycle shows up
//!
//! ```bash
//! cargo run --example simulated_gateway
//! ```
use std::collections::VecDeque;
use std::time::Instant as StdInstant;

use can_gateway_core::{
    config::{BusConfig, GatewayConfig},
    frame::{standard_id, ClassicFrame, FdFrame},
    manager::{
        bus_load::LoadTelemetry, dispatcher::SinkSet, power::WakeFlag, CanManager, TickOutcome,
    },
    traits::{
        board::Board,
        can_channel::CanChannel,
        sink::{FrameSink, ObdEmulator},
    },
};
use embassy_time::Instant;

static WAKE: WakeFlag = WakeFlag::new();
static LOADS: LoadTelemetry<2> = LoadTelemetry::new();

/// Controller whose receive FIFO is filled by `main`.
#[derive(Default)]
struct DemoChannel {
    rx: VecDeque<ClassicFrame>,
}

impl CanChannel for DemoChannel {
    type Error = ();

    fn enable(&mut self) {}
    fn disable(&mut self) {}

    fn begin(&mut self, _nominal_speed: u32) -> Result<(), ()> {
        Ok(())
    }

    fn begin_fd(&mut self, _nominal_speed: u32, _data_speed: u32) -> Result<(), ()> {
        Err(())
    }

    fn set_listen_only(&mut self, _listen_only: bool) {}
    fn arm_wake_filter(&mut self) {}

    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read_frame(&mut self) -> Result<ClassicFrame, ()> {
        self.rx.pop_front().ok_or(())
    }

    fn read_frame_fd(&mut self) -> Result<FdFrame, ()> {
        Err(())
    }

    fn send_frame(&mut self, frame: &ClassicFrame) -> Result<(), ()> {
        println!("   TX 0x{:03X} {:02X?}", frame.raw_id(), frame.payload());
        Ok(())
    }

    fn send_frame_fd(&mut self, _frame: &FdFrame) -> Result<(), ()> {
        Err(())
    }

    fn supports_fd(&self) -> bool {
        false
    }
}

/// GVRET stand-in printing frames instead of encoding them.
struct ConsoleSink(&'static str);

impl FrameSink for ConsoleSink {
    fn pending_output_bytes(&self) -> usize {
        0
    }

    fn send_frame_to_buffer(&mut self, frame: &ClassicFrame, channel: usize) {
        println!(
            "   [{}] CAN{} 0x{:03X} {:02X?}",
            self.0,
            channel,
            frame.raw_id(),
            frame.payload()
        );
    }
}

struct Elm327;

impl ObdEmulator for Elm327 {
    fn is_monitor_mode_enabled(&self) -> bool {
        false
    }

    fn on_can_reply(&mut self, frame: &ClassicFrame) {
        println!("   [elm327] ECU reply from 0x{:03X}", frame.raw_id());
    }
}

/// Board whose sleep lasts 100 ms, then the activity pin rises.
struct DemoBoard;

impl Board for DemoBoard {
    fn set_power_rail(&mut self, powered: bool) {
        println!("   rail -> {}", if powered { "HIGH" } else { "LOW" });
    }

    fn select_transceiver(&mut self, _channel_zero: bool) {}

    fn arm_wake_interrupt(&mut self) {}

    async fn light_sleep(&mut self) {
        println!("   zzz...");
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        WAKE.on_wake_interrupt();
    }
}

#[tokio::main]
async fn main() {
    println!("=== can-gateway-core simulated gateway ===\n");

    let config = GatewayConfig::new([BusConfig::classic(500_000), BusConfig::classic(250_000)])
        .with_timeouts_ms(200, 400);
    let channels = [DemoChannel::default(), DemoChannel::default()];

    let mut manager = match CanManager::new(config, channels, DemoBoard, &WAKE) {
        Ok(manager) => manager.with_telemetry(&LOADS),
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return;
        }
    };

    let start = StdInstant::now();
    let now = || Instant::from_millis(start.elapsed().as_millis() as u64);

    let report = manager.setup(now());
    println!("1. Setup: {:?}\n", report.channels);

    println!("2. OBD-II request and reply");
    let request = ClassicFrame::new_data(standard_id(0x7DF), &[0x02, 0x01, 0x0C, 0, 0, 0, 0, 0]);
    if let Err(e) = manager.send_frame(0, &request.into()) {
        eprintln!("   send failed: {}", e);
    }
    if let Some(can0) = manager.channel_mut(0) {
        can0.rx
            .push_back(ClassicFrame::new_data(standard_id(0x7E8), &[0x04, 0x41, 0x0C, 0x1A, 0xF8, 0, 0, 0]));
    }
    if let Some(can1) = manager.channel_mut(1) {
        can1.rx.push_back(ClassicFrame::new_data(standard_id(0x3E9), &[0x10, 0x20]));
    }

    let (mut wifi, mut serial, mut lawicel, mut elm) = (
        ConsoleSink("wifi"),
        ConsoleSink("serial"),
        ConsoleSink("lawicel"),
        Elm327,
    );
    let mut sinks = SinkSet::new(&mut wifi, &mut serial, &mut lawicel, &mut elm);

    println!("\n3. Ticking until the gateway has slept and woken once");
    let mut woke = false;
    while !woke {
        match manager.tick(now(), &mut sinks).await {
            TickOutcome::Serviced(report) => {
                if let Some(event) = report.power_event {
                    println!("   t={:>4} ms  {:?}", start.elapsed().as_millis(), event);
                    woke = matches!(event, can_gateway_core::manager::power::PowerEvent::Woke);
                }
            }
            TickOutcome::Skipped => {}
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    println!("\n4. Published bus load: {:?} %", LOADS.snapshot());
}
