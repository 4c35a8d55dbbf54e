//! `can-gateway-core` library: the hardware-independent core of a
//! multi-channel CAN gateway. It brings the channels up, drains received
//! frames into the host-facing sinks under a backlog ceiling, estimates the
//! load of every bus, and cuts the downstream power rail after a period
//! without traffic until a CAN wake interrupt fires.
#![cfg_attr(not(test), no_std)]
//==================================================================================
/// Static configuration: channel settings, board variant, limits, timeouts.
pub mod config;
/// Configuration, channel start-up and transmission errors.
pub mod error;
/// Classic and FD frame representations and their on-wire bit cost.
pub mod frame;
/// The gateway core: channel handles, dispatcher, bus load and power cycle.
pub mod manager;
/// Interfaces to the hardware and to the downstream consumers.
pub mod traits;
//==================================================================================
#[cfg(test)]
pub(crate) mod mocks;
