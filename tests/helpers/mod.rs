/// Test doubles simulating the CAN controllers, the transports, the OBD
/// emulator, the board and the clock during integration tests.
use can_gateway_core::{
    config::OutputMode,
    frame::{ClassicFrame, FdFrame, Frame},
    manager::{dispatcher::SinkSet, power::WakeFlag},
    traits::{
        board::Board,
        can_channel::CanChannel,
        gateway_timer::GatewayTimer,
        register_access::{route_standby_pin, RegisterAccess, MCP2517FD_IOCON},
        sink::{FrameSink, ObdEmulator},
    },
};
use embassy_time::Instant;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

#[allow(dead_code)]
/// Simulated controller; frames arrive through the paired [`BusInjector`].
pub struct SimChannel {
    fd_capable: bool,
    rx: mpsc::UnboundedReceiver<Frame>,
    /// Frames transmitted by the gateway.
    pub sent: Vec<Frame>,
    /// MCP2517FD IOCON register, power-on value.
    pub iocon: u8,
}

#[derive(Clone)]
#[allow(dead_code)]
/// Bus side of a [`SimChannel`]: what other ECUs put on the wire.
pub struct BusInjector {
    tx: mpsc::UnboundedSender<Frame>,
}

#[allow(dead_code)]
impl SimChannel {
    /// Construct an interconnected controller / bus pair.
    pub fn create_pair(fd_capable: bool) -> (Self, BusInjector) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = Self {
            fd_capable,
            rx,
            sent: Vec::new(),
            iocon: 0x03,
        };
        (channel, BusInjector { tx })
    }
}

#[allow(dead_code)]
impl BusInjector {
    pub fn inject(&self, frame: impl Into<Frame>) {
        self.tx.send(frame.into()).ok();
    }
}

impl CanChannel for SimChannel {
    type Error = ();

    fn enable(&mut self) {}

    fn disable(&mut self) {}

    fn begin(&mut self, _nominal_speed: u32) -> Result<(), ()> {
        Ok(())
    }

    fn begin_fd(&mut self, _nominal_speed: u32, _data_speed: u32) -> Result<(), ()> {
        if self.fd_capable {
            Ok(())
        } else {
            Err(())
        }
    }

    fn set_listen_only(&mut self, _listen_only: bool) {}

    fn arm_wake_filter(&mut self) {}

    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read_frame(&mut self) -> Result<ClassicFrame, ()> {
        match self.rx.try_recv() {
            Ok(Frame::Classic(frame)) => Ok(frame),
            _ => Err(()),
        }
    }

    fn read_frame_fd(&mut self) -> Result<FdFrame, ()> {
        match self.rx.try_recv() {
            Ok(Frame::Fd(frame)) => Ok(frame),
            _ => Err(()),
        }
    }

    fn send_frame(&mut self, frame: &ClassicFrame) -> Result<(), ()> {
        self.sent.push(Frame::Classic(*frame));
        Ok(())
    }

    fn send_frame_fd(&mut self, frame: &FdFrame) -> Result<(), ()> {
        self.sent.push(Frame::Fd(*frame));
        Ok(())
    }

    fn supports_fd(&self) -> bool {
        self.fd_capable
    }

    fn configure_standby_pin(&mut self) -> Result<(), ()> {
        route_standby_pin(self)
    }
}

impl RegisterAccess for SimChannel {
    type Error = ();

    fn read8(&mut self, address: u16) -> Result<u8, ()> {
        if address == MCP2517FD_IOCON {
            Ok(self.iocon)
        } else {
            Err(())
        }
    }

    fn write8(&mut self, address: u16, value: u8) -> Result<(), ()> {
        if address == MCP2517FD_IOCON {
            self.iocon = value;
            Ok(())
        } else {
            Err(())
        }
    }
}

#[derive(Default)]
#[allow(dead_code)]
/// GVRET-like transport: each frame costs `12 + len` bytes until flushed.
pub struct SimTransport {
    pub pending: usize,
    pub frames: Vec<(Frame, usize)>,
}

#[allow(dead_code)]
impl SimTransport {
    /// Pretend the link sent everything out.
    pub fn flush(&mut self) {
        self.pending = 0;
    }

    pub fn ids(&self) -> Vec<u32> {
        self.frames.iter().map(|(f, _)| f.raw_id()).collect()
    }
}

impl FrameSink for SimTransport {
    fn pending_output_bytes(&self) -> usize {
        self.pending
    }

    fn send_frame_to_buffer(&mut self, frame: &ClassicFrame, channel: usize) {
        self.pending += 12 + frame.payload().len();
        self.frames.push((Frame::Classic(*frame), channel));
    }

    fn send_fd_frame_to_buffer(&mut self, frame: &FdFrame, channel: usize) {
        self.pending += 12 + frame.payload().len();
        self.frames.push((Frame::Fd(*frame), channel));
    }
}

#[derive(Default)]
#[allow(dead_code)]
/// SLCAN-like transport without FD support.
pub struct SimLawicel {
    pub frames: Vec<(ClassicFrame, usize)>,
}

impl FrameSink for SimLawicel {
    fn pending_output_bytes(&self) -> usize {
        0
    }

    fn send_frame_to_buffer(&mut self, frame: &ClassicFrame, channel: usize) {
        self.frames.push((*frame, channel));
    }
}

#[derive(Default)]
#[allow(dead_code)]
pub struct SimObd {
    pub monitor: bool,
    pub replies: Vec<u32>,
}

impl ObdEmulator for SimObd {
    fn is_monitor_mode_enabled(&self) -> bool {
        self.monitor
    }

    fn on_can_reply(&mut self, frame: &ClassicFrame) {
        self.replies.push(frame.raw_id());
    }
}

#[derive(Default)]
#[allow(dead_code)]
/// Every downstream collaborator of one gateway.
pub struct Outputs {
    pub wifi: SimTransport,
    pub serial: SimTransport,
    pub lawicel: SimLawicel,
    pub obd: SimObd,
    pub mode: OutputMode,
}

#[allow(dead_code)]
impl Outputs {
    /// Borrow everything for one tick.
    pub fn sinks(&mut self) -> SinkSet<'_, SimTransport, SimTransport, SimLawicel, SimObd> {
        SinkSet::new(&mut self.wifi, &mut self.serial, &mut self.lawicel, &mut self.obd)
            .with_mode(self.mode)
    }
}

#[derive(Default)]
#[allow(dead_code)]
/// Line levels driven by the gateway, shared with the test body.
pub struct BoardLog {
    pub rail: Vec<bool>,
    pub select: Vec<bool>,
    pub sleeps: usize,
    /// Sleep flag as seen when each suspend started.
    pub asleep_on_entry: Vec<bool>,
}

#[allow(dead_code)]
/// Board whose sleep ends with the CAN activity interrupt firing, when
/// `wake_on_sleep` is set.
pub struct SimBoard {
    pub log: Arc<Mutex<BoardLog>>,
    wake: &'static WakeFlag,
    wake_on_sleep: bool,
}

#[allow(dead_code)]
impl SimBoard {
    pub fn new(wake: &'static WakeFlag, wake_on_sleep: bool) -> (Self, Arc<Mutex<BoardLog>>) {
        let log = Arc::new(Mutex::new(BoardLog::default()));
        let board = Self {
            log: log.clone(),
            wake,
            wake_on_sleep,
        };
        (board, log)
    }
}

impl Board for SimBoard {
    fn set_power_rail(&mut self, powered: bool) {
        self.log.lock().unwrap().rail.push(powered);
    }

    fn select_transceiver(&mut self, channel_zero: bool) {
        self.log.lock().unwrap().select.push(channel_zero);
    }

    fn arm_wake_interrupt(&mut self) {}

    async fn light_sleep(&mut self) {
        {
            let mut log = self.log.lock().unwrap();
            log.sleeps += 1;
            log.asleep_on_entry.push(self.wake.is_sleeping());
        }
        if self.wake_on_sleep {
            // Simulate the activity pin rising while suspended.
            self.wake.on_wake_interrupt();
        }
    }
}

#[allow(dead_code)]
/// Wake flag with its own `'static` lifetime for each test.
pub fn leak_wake_flag() -> &'static WakeFlag {
    Box::leak(Box::new(WakeFlag::new()))
}

#[allow(dead_code)]
/// Instant helper for tick timestamps.
pub fn ms(millis: u64) -> Instant {
    Instant::from_millis(millis)
}

#[allow(dead_code)]
/// Timer based on `tokio::time` to drive `CanManager::run` in tests.
pub struct SimTimer {
    start: tokio::time::Instant,
}

#[allow(dead_code)]
impl SimTimer {
    pub fn new() -> Self {
        Self {
            start: tokio::time::Instant::now(),
        }
    }
}

impl GatewayTimer for SimTimer {
    fn now(&self) -> Instant {
        Instant::from_millis(self.start.elapsed().as_millis() as u64)
    }

    async fn delay_ms(&mut self, millis: u32) {
        sleep(Duration::from_millis(millis as u64)).await;
    }
}
