//! Board-level lines the power state machine drives: the downstream power
//! rail, the shared-transceiver select line, the wake interrupt and the
//! low-power suspend.
use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use futures_util::Future;

/// Board services used by `CanManager`.
pub trait Board {
    /// Drive the rail feeding the companion board. `true` = powered (HIGH).
    fn set_power_rail(&mut self, powered: bool);
    /// Drive the select line of a transceiver shared by channels 0 and 1.
    /// `true` (HIGH) routes channel 0, `false` (LOW) routes channel 1.
    fn select_transceiver(&mut self, channel_zero: bool);
    /// Attach the rising-edge interrupt of the shared CAN activity pin to the
    /// wake handler (`WakeFlag::on_wake_interrupt`).
    fn arm_wake_interrupt(&mut self);
    /// Suspend until the CAN activity pin rises. Returns once the MCU runs again.
    fn light_sleep<'a>(&'a mut self) -> impl Future<Output = ()> + 'a;
}

/// Platform low-power primitives, for boards assembled with [`PinBoard`].
pub trait SleepController {
    /// Attach the rising-edge interrupt of the wake pin.
    fn arm_wake_interrupt(&mut self);
    /// Enter light sleep with the wake pin as the only wake source.
    fn light_sleep<'a>(&'a mut self) -> impl Future<Output = ()> + 'a;
}

//==================================================================================PIN_BOARD
/// [`Board`] built from `embedded-hal` output pins.
pub struct PinBoard<P, S, Z> {
    power_rail: P,
    transceiver_select: S,
    sleep: Z,
}

impl<P, S, Z> PinBoard<P, S, Z>
where
    P: OutputPin,
    S: OutputPin,
    Z: SleepController,
{
    pub fn new(power_rail: P, transceiver_select: S, sleep: Z) -> Self {
        Self {
            power_rail,
            transceiver_select,
            sleep,
        }
    }

    /// Give the pins back.
    pub fn release(self) -> (P, S, Z) {
        (self.power_rail, self.transceiver_select, self.sleep)
    }
}

impl<P, S, Z> Board for PinBoard<P, S, Z>
where
    P: OutputPin,
    S: OutputPin,
    Z: SleepController,
{
    fn set_power_rail(&mut self, powered: bool) {
        let result = if powered {
            self.power_rail.set_high()
        } else {
            self.power_rail.set_low()
        };
        if result.is_err() {
            #[cfg(feature = "defmt")]
            defmt::error!("Power rail pin write failed");
        }
    }

    fn select_transceiver(&mut self, channel_zero: bool) {
        let result = if channel_zero {
            self.transceiver_select.set_high()
        } else {
            self.transceiver_select.set_low()
        };
        if result.is_err() {
            #[cfg(feature = "defmt")]
            defmt::error!("Transceiver select pin write failed");
        }
    }

    fn arm_wake_interrupt(&mut self) {
        self.sleep.arm_wake_interrupt();
    }

    fn light_sleep<'a>(&'a mut self) -> impl Future<Output = ()> + 'a {
        self.sleep.light_sleep()
    }
}

/// Placeholder for boards without a transceiver select line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
