//! Clock and delay abstraction driving `CanManager::run`.
use embassy_time::Instant;
use futures_util::Future;

/// Timer trait abstraction; `now` must be monotonic.
pub trait GatewayTimer {
    /// Current instant on the gateway clock.
    fn now(&self) -> Instant;
    /// Asynchronously wait for `millis` milliseconds.
    fn delay_ms<'a>(&'a mut self, millis: u32) -> impl Future<Output = ()> + 'a;
}
