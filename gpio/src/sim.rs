//! Simulated GPIO backend.
//!
//! [SimGpioDriver] does not touch any hardware. Every level written to one of its pins, and every
//! wait performed through a [SimDelay] obtained from it, is appended to a single event log, so the
//! exact sequence seen by the wires can be inspected afterwards. The log can also be replayed through
//! a model of a 74HC595 shift register with [replay_shift_register].
use crate::{Delay, GpioActiveLevel, GpioDriver, GpioError, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;

/// A single entry of the simulator log.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimEvent {
    /// A pin was driven to the given physical level.
    Level { pin: usize, high: bool },
    /// A [SimDelay] was asked to wait for the given amount of microseconds.
    Delay { us: u32 },
}

pub struct SimGpioDriver {
    used_pins: BitVec<AtomicU8>,
    levels: RefCell<Vec<bool>>,
    events: RefCell<Vec<SimEvent>>,
}

impl SimGpioDriver {
    /// Creates a simulator with `count` pins, all of them low.
    pub fn new(count: usize) -> Self {
        SimGpioDriver {
            used_pins: BitVec::repeat(false, count),
            levels: RefCell::new(vec![false; count]),
            events: RefCell::new(Vec::new()),
        }
    }

    /// Gets a [Delay] that logs its waits here instead of sleeping.
    pub fn delay(&self) -> SimDelay<'_> {
        SimDelay { driver: self }
    }

    /// Gets the last physical level driven on the pin, or `None` for an unknown pin.
    pub fn level(&self, pin: usize) -> Option<bool> {
        self.levels.borrow().get(pin).copied()
    }

    /// Gets a copy of the whole event log.
    pub fn events(&self) -> Vec<SimEvent> {
        self.events.borrow().clone()
    }

    /// Drains the event log, so the next inspection only sees what happens afterwards.
    pub fn take_events(&self) -> Vec<SimEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Sums every logged wait.
    pub fn total_delay_us(&self) -> u64 {
        self.events
            .borrow()
            .iter()
            .map(|event| match event {
                SimEvent::Delay { us } => *us as u64,
                SimEvent::Level { .. } => 0,
            })
            .sum()
    }

    /// Replays the whole log through [replay_shift_register].
    pub fn shift_register_outputs(&self, latch: usize, clock: usize, data: usize) -> Vec<u8> {
        replay_shift_register(&self.events.borrow(), latch, clock, data)
    }

    fn record_level(&self, pin: usize, high: bool) {
        self.levels.borrow_mut()[pin] = high;
        self.events.borrow_mut().push(SimEvent::Level { pin, high });
    }

    fn record_delay(&self, us: u32) {
        self.events.borrow_mut().push(SimEvent::Delay { us });
    }
}

impl Debug for SimGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimGpioDriver({})", self.used_pins.len())
    }
}

impl GpioDriver for SimGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.used_pins.len())
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        if index >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);

        Ok(Box::new(SimPin {
            driver: self,
            pin_index: index,
            active_level: GpioActiveLevel::High,
        }))
    }
}

/// Replays a log through a model of a serial-in, parallel-out shift register.
///
/// Every rising edge of `clock` shifts the current `data` level in at the least significant end,
/// every rising edge of `latch` copies the register to the outputs. Returns the output byte after
/// each latch, in order. All three lines are assumed low before the first event.
pub fn replay_shift_register(events: &[SimEvent], latch: usize, clock: usize, data: usize) -> Vec<u8> {
    let mut latch_level = false;
    let mut clock_level = false;
    let mut data_level = false;
    let mut register = 0u8;
    let mut outputs = Vec::new();

    for event in events {
        let SimEvent::Level { pin, high } = *event else {
            continue;
        };

        if pin == data {
            data_level = high;
        } else if pin == clock {
            if high && !clock_level {
                register = (register << 1) | data_level as u8;
            }
            clock_level = high;
        } else if pin == latch {
            if high && !latch_level {
                outputs.push(register);
            }
            latch_level = high;
        }
    }

    outputs
}

struct SimPin<'a> {
    driver: &'a SimGpioDriver,
    pin_index: usize,
    active_level: GpioActiveLevel,
}

impl Debug for SimPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for SimPin<'_> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        Ok(Box::new(SimOutput { pin: self }))
    }

    fn active_level(&self) -> GpioActiveLevel {
        self.active_level
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.active_level = level;
        Ok(())
    }
}

impl Drop for SimPin<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.set_aliased(self.pin_index, false);
    }
}

struct SimOutput<'a> {
    pin: &'a SimPin<'a>,
}

impl Debug for SimOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.pin)
    }
}

impl GpioOutput for SimOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.pin
            .driver
            .record_level(self.pin.pin_index, self.pin.active_level.get_state(value));
        Ok(())
    }
}

/// [Delay] that appends a [SimEvent::Delay] to the log of its [SimGpioDriver] and returns immediately.
#[derive(Debug)]
pub struct SimDelay<'a> {
    driver: &'a SimGpioDriver,
}

impl Delay for SimDelay<'_> {
    fn delay_us(&mut self, us: u32) {
        self.driver.record_delay(us);
    }
}
