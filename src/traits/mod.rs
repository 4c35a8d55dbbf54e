//! Abstraction traits for everything the core talks to but does not own:
//! CAN controllers, downstream sinks, the OBD emulator, board-level lines
//! and the clock.
pub mod board;
pub mod can_channel;
pub mod gateway_timer;
pub mod register_access;
pub mod sink;
