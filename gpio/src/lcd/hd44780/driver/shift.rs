use crate::lcd::hd44780::driver::HD44780Driver;
use crate::shift::ShiftRegister;
use crate::{Delay, GpioResult};
use log::{debug, trace};

/// Shift register output wired to the E (enable) line of the display.
pub const SR_E: u8 = 2;
/// Shift register output wired to the RS (register select) line of the display.
pub const SR_RS: u8 = 3;
/// Shift register outputs wired to DB4, DB5, DB6 and DB7 of the display.
pub const SR_DB: [u8; 4] = [4, 5, 6, 7];

/// Settle time after each enable pulse. Commands need more than 37 µs.
const SETTLE_DELAY_US: u32 = 100;

/// HD44780 driver talking 4-bit mode through an 8-bit shift register.
///
/// The outputs of the register are wired as follows (outputs 0 and 1 are left unconnected, the
/// R/W line of the display is tied to ground, so the controller can't be read):
///
/// | Output | 0 | 1 | 2 | 3  | 4   | 5   | 6   | 7   |
/// |--------|---|---|---|----|-----|-----|-----|-----|
/// | Line   | – | – | E | RS | DB4 | DB5 | DB6 | DB7 |
///
/// Each bit change is committed on its own, so a single nibble costs four full shifts plus three
/// more for the enable pulse. The busy flag can't be polled, so every transfer waits a fixed
/// 100 µs, and the slow commands add another 2 ms on top.
#[derive(Debug)]
pub struct ShiftRegisterHD44780Driver<'a> {
    shift_register: ShiftRegister<'a>,
    delay: &'a mut dyn Delay,
}

impl<'a> ShiftRegisterHD44780Driver<'a> {
    pub fn new(shift_register: ShiftRegister<'a>, delay: &'a mut dyn Delay) -> Self {
        ShiftRegisterHD44780Driver {
            shift_register,
            delay,
        }
    }

    /// Gets the shift register, e.g. to inspect the staged image.
    pub fn shift_register(&self) -> &ShiftRegister<'a> {
        &self.shift_register
    }

    /// Gives back the shift register.
    pub fn into_inner(self) -> ShiftRegister<'a> {
        self.shift_register
    }

    fn pulse_enable(&mut self) -> GpioResult<()> {
        self.shift_register.set_bit(SR_E, false);
        self.shift_register.commit()?;
        self.delay.delay_us(1);

        self.shift_register.set_bit(SR_E, true);
        self.shift_register.commit()?;
        self.delay.delay_us(1);

        // The controller latches on the falling edge
        self.shift_register.set_bit(SR_E, false);
        self.shift_register.commit()?;
        self.delay.delay_us(SETTLE_DELAY_US);
        Ok(())
    }

    /// Presents the low 4 bits of `nibble` on DB4..DB7, one commit per bit, and pulses E.
    fn write_nibble(&mut self, nibble: u8) -> GpioResult<()> {
        trace!("Writing nibble: {:04b}", nibble & 0x0F);

        for (i, &position) in SR_DB.iter().enumerate() {
            self.shift_register.set_bit(position, (nibble >> i) & 1 != 0);
            self.shift_register.commit()?;
        }

        self.pulse_enable()
    }

    fn send(&mut self, data: u8, rs: bool) -> GpioResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, rs);

        self.shift_register.set_bit(SR_RS, rs);
        self.shift_register.commit()?;

        self.write_nibble(data >> 4)?;
        self.write_nibble(data & 0x0F)
    }
}

impl HD44780Driver for ShiftRegisterHD44780Driver<'_> {
    /// Runs the reset sequence of figure 24 in the datasheet. The display can't be assumed to
    /// have been reset together with the host, so it's resynchronized through 8-bit mode first:
    ///
    /// 1. wait 50 ms for the supply to rise,
    /// 2. send `0011` (8-bit interface) three times, waiting 4.5 ms, 4.5 ms and 150 µs,
    /// 3. send `0010` to switch to the 4-bit interface.
    fn init(&mut self) -> GpioResult<()> {
        debug!("Resetting HD44780 into 4-bit mode");

        self.delay.delay_ms(50);

        self.shift_register.set_bit(SR_RS, false);
        self.shift_register.set_bit(SR_E, false);

        self.write_nibble(0b0011)?;
        self.delay.delay_us(4500);

        self.write_nibble(0b0011)?;
        self.delay.delay_us(4500);

        self.write_nibble(0b0011)?;
        self.delay.delay_us(150);

        self.write_nibble(0b0010)
    }

    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, false)
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, true)
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::GpioDriver;
    use crate::lcd::hd44780::driver::{DisplayControl, SLOW_COMMAND_DELAY_US};
    use crate::sim::{SimEvent, SimGpioDriver, replay_shift_register};

    pub(crate) const LATCH: usize = 0;
    pub(crate) const CLOCK: usize = 1;
    pub(crate) const DATA: usize = 2;

    /// What the display controller sees on its bus: one entry per falling edge of E.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub(crate) struct Latched {
        pub rs: bool,
        pub nibble: u8,
    }

    /// Replays the log through the shift register model and samples RS/DB4..DB7 on E falling edges.
    pub(crate) fn latched_nibbles(events: &[SimEvent]) -> Vec<Latched> {
        let mut previous_e = false;
        let mut latched = Vec::new();
        for output in replay_shift_register(events, LATCH, CLOCK, DATA) {
            let e = output & (1 << SR_E) != 0;
            if previous_e && !e {
                latched.push(Latched {
                    rs: output & (1 << SR_RS) != 0,
                    nibble: output >> 4,
                });
            }
            previous_e = e;
        }
        latched
    }

    /// Pairs nibbles into `(rs, byte)` transfers, high nibble first.
    pub(crate) fn latched_bytes(events: &[SimEvent]) -> Vec<(bool, u8)> {
        latched_nibbles(events)
            .chunks(2)
            .map(|pair| (pair[0].rs, pair[0].nibble << 4 | pair[1].nibble))
            .collect()
    }

    pub(crate) fn with_driver(test: impl FnOnce(&SimGpioDriver, &mut ShiftRegisterHD44780Driver<'_>)) {
        let sim = SimGpioDriver::new(3);
        let mut latch = sim.get_pin(LATCH).unwrap();
        let mut clock = sim.get_pin(CLOCK).unwrap();
        let mut data = sim.get_pin(DATA).unwrap();
        let latch = latch.as_output().unwrap();
        let clock = clock.as_output().unwrap();
        let data = data.as_output().unwrap();
        let mut delay = sim.delay();

        let shift_register = ShiftRegister::new(&*latch, &*clock, &*data).unwrap();
        let mut driver = ShiftRegisterHD44780Driver::new(shift_register, &mut delay);
        test(&sim, &mut driver);
    }

    #[test]
    fn nibble_is_four_bit_commits_then_enable_pulse() {
        with_driver(|sim, driver| {
            sim.take_events();

            driver.write_nibble(0b1010).unwrap();
            let events = sim.take_events();

            let outputs = replay_shift_register(&events, LATCH, CLOCK, DATA);
            assert_eq!(
                outputs,
                vec![
                    // DB4..DB7 one at a time
                    0b0000_0000,
                    0b0010_0000,
                    0b0010_0000,
                    0b1010_0000,
                    // E low, high, low
                    0b1010_0000,
                    0b1010_0100,
                    0b1010_0000,
                ]
            );

            let delays: Vec<u32> = events
                .iter()
                .filter_map(|event| match *event {
                    SimEvent::Delay { us } => Some(us),
                    SimEvent::Level { .. } => None,
                })
                .collect();
            assert_eq!(delays, vec![1, 1, SETTLE_DELAY_US]);
            assert!(matches!(events.last(), Some(SimEvent::Delay { us: 100 })));
        });
    }

    #[test]
    fn enable_delays_follow_their_commits() {
        with_driver(|sim, driver| {
            sim.take_events();
            driver.write_nibble(0b0001).unwrap();
            let events = sim.take_events();

            // Each delay comes right after a latch rising edge, i.e. after the commit it follows.
            for (i, event) in events.iter().enumerate() {
                if let SimEvent::Delay { .. } = event {
                    assert_eq!(events[i - 1], SimEvent::Level { pin: LATCH, high: true });
                }
            }
        });
    }

    #[test]
    fn send_sets_rs_and_transfers_high_nibble_first() {
        with_driver(|sim, driver| {
            sim.take_events();

            driver.send_data(b'A').unwrap();
            driver.send_command(0x0C).unwrap();
            let events = sim.take_events();

            assert_eq!(
                latched_nibbles(&events),
                vec![
                    Latched { rs: true, nibble: 0x4 },
                    Latched { rs: true, nibble: 0x1 },
                    Latched { rs: false, nibble: 0x0 },
                    Latched { rs: false, nibble: 0xC },
                ]
            );
            // One RS commit plus 2 * (4 + 3) per byte.
            assert_eq!(replay_shift_register(&events, LATCH, CLOCK, DATA).len(), 2 * 15);
        });
    }

    #[test]
    fn init_resynchronizes_through_eight_bit_mode() {
        with_driver(|sim, driver| {
            sim.take_events();

            driver.init().unwrap();
            let events = sim.take_events();

            assert_eq!(events.first(), Some(&SimEvent::Delay { us: 50_000 }));
            let nibbles: Vec<u8> = latched_nibbles(&events).iter().map(|l| l.nibble).collect();
            assert_eq!(nibbles, vec![0b0011, 0b0011, 0b0011, 0b0010]);
            assert!(latched_nibbles(&events).iter().all(|l| !l.rs));

            let long_delays: Vec<u32> = events
                .iter()
                .filter_map(|event| match *event {
                    SimEvent::Delay { us } if us > SETTLE_DELAY_US => Some(us),
                    _ => None,
                })
                .collect();
            assert_eq!(long_delays, vec![50_000, 4500, 4500, 150]);
        });
    }

    #[test]
    fn slow_commands_wait_through_the_driver_delay() {
        with_driver(|sim, driver| {
            sim.take_events();

            driver.clear_display().unwrap();
            let events = sim.take_events();
            assert_eq!(latched_bytes(&events), vec![(false, 0x01)]);
            assert_eq!(events.last(), Some(&SimEvent::Delay { us: SLOW_COMMAND_DELAY_US }));

            driver
                .set_display_control(DisplayControl::from_bits(DisplayControl::DISPLAY_ON))
                .unwrap();
            assert_eq!(latched_bytes(&sim.take_events()), vec![(false, 0x0C)]);
            assert_eq!(driver.shift_register().read() & (1 << SR_E), 0);
        });
    }
}
