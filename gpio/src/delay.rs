use embedded_hal::delay::DelayNs;
use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;

/// A blocking wait, used for the fixed timings of the display protocol.
///
/// Implementations must not return before the requested time elapsed, but may wait longer.
/// Tests use [SimDelay](crate::sim::SimDelay), which records the waits instead of sleeping.
pub trait Delay: Debug {
    /// Blocks for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Blocks for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

/// [Delay] backed by [std::thread::sleep].
///
/// The OS scheduler decides the real granularity, so the 1 µs waits of the enable pulse usually
/// take a few tens of microseconds. The display only cares about minimums.
#[derive(Copy, Clone, Debug, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_us(&mut self, us: u32) {
        sleep(Duration::from_micros(us as u64));
    }
}

/// [Delay] on top of an `embedded-hal` delay provider, such as the timer of a HAL crate.
#[derive(Debug)]
pub struct HalDelay<D>(pub D);

impl<D: DelayNs + Debug> Delay for HalDelay<D> {
    fn delay_us(&mut self, us: u32) {
        self.0.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[derive(Debug, Default)]
    struct CountingDelay {
        waited_ns: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.waited_ns += ns as u64;
        }
    }

    #[test]
    fn hal_delay_forwards_the_full_wait() {
        let mut delay = HalDelay(CountingDelay::default());
        delay.delay_us(150);
        assert_eq!(delay.0.waited_ns, 150_000);

        delay.delay_ms(50);
        assert_eq!(delay.0.waited_ns, 50_150_000);
    }

    #[test]
    fn std_delay_waits_at_least_requested_time() {
        let mut delay = StdDelay;
        let start = Instant::now();
        delay.delay_ms(2);
        assert!(start.elapsed() >= Duration::from_millis(2));
    }
}
