//! Low-level HD44780 interface.
//!
//! [HD44780Driver] encodes the instruction set as provided methods over two raw primitives,
//! [HD44780Driver::send_command] and [HD44780Driver::send_data]. How those bytes reach the
//! controller is up to the implementation, see [ShiftRegisterHD44780Driver] for the 4-bit bus behind
//! a shift register.

mod shift;

use crate::{GpioError, GpioResult};
use std::fmt::Debug;
pub use shift::*;

#[cfg(test)]
pub(crate) use shift::tests as shift_tests;

/// Time the controller needs to execute [clear](HD44780Driver::clear_display) and
/// [return home](HD44780Driver::return_home), in microseconds. Datasheet gives 1.52 ms.
pub const SLOW_COMMAND_DELAY_US: u32 = 2000;

macro_rules! command_flags {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$flag_meta:meta])* $flag:ident = $value:expr,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
        pub struct $name(u8);

        impl $name {
            $($(#[$flag_meta])* pub const $flag: u8 = $value;)*

            const ALL: u8 = 0 $(| $value)*;

            /// Creates the flags from raw bits. Bits that don't belong to this command are dropped.
            pub const fn from_bits(bits: u8) -> Self {
                $name(bits & Self::ALL)
            }

            /// Gets the raw bits, ready to be ORed into the command byte.
            pub const fn bits(self) -> u8 {
                self.0
            }

            /// Returns whether every bit of `flag` is set.
            pub const fn contains(self, flag: u8) -> bool {
                self.0 & flag == flag
            }

            /// Sets or clears the bits of `flag`.
            pub fn set(&mut self, flag: u8, value: bool) {
                if value {
                    self.0 |= flag & Self::ALL;
                } else {
                    self.0 &= !flag;
                }
            }
        }
    };
}

command_flags! {
    /// Arguments of the function set instruction (`001DNF??`).
    FunctionSet {
        /// `D`: 8-bit interface when set, 4-bit otherwise.
        EIGHT_BIT_MODE = 0b00010000,
        /// `N`: two display lines when set, one otherwise.
        TWO_LINES = 0b00001000,
        /// `F`: 5x10 dot font when set, 5x8 otherwise. Only effective with one line.
        FONT_5X10 = 0b00000100,
    }
}

command_flags! {
    /// Arguments of the display control instruction (`00001DCB`).
    DisplayControl {
        /// `D`: display on.
        DISPLAY_ON = 0b00000100,
        /// `C`: underline cursor shown.
        CURSOR_ON = 0b00000010,
        /// `B`: cursor cell blinks.
        BLINK_ON = 0b00000001,
    }
}

command_flags! {
    /// Arguments of the entry mode instruction (`000001IS`).
    EntryMode {
        /// `I`: the address counter increments after each write, so text flows left to right.
        INCREMENT = 0b00000010,
        /// `S`: the display shifts on each write instead of the cursor moving.
        SHIFT = 0b00000001,
    }
}

pub trait HD44780Driver: Debug {
    /// Brings the controller from an unknown state into 4-bit mode, following the "initializing by
    /// instruction" procedure of the datasheet. Nothing else (lines, display, entry mode) is set up.
    fn init(&mut self) -> GpioResult<()>;

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> GpioResult<()> {
        self.send_command(0b00000001)?;
        self.delay_us(SLOW_COMMAND_DELAY_US);
        Ok(())
    }

    /// Sets the cursor to the home position and undoes any display shift.
    fn return_home(&mut self) -> GpioResult<()> {
        self.send_command(0b00000010)?;
        self.delay_us(SLOW_COMMAND_DELAY_US);
        Ok(())
    }

    /// Sets the display to the specified entry mode.
    fn set_entry_mode(&mut self, mode: EntryMode) -> GpioResult<()> {
        self.send_command(0b00000100 | mode.bits())
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(&mut self, control: DisplayControl) -> GpioResult<()> {
        self.send_command(0b00001000 | control.bits())
    }

    /// Moves the cursor or shifts the display.
    fn cursor_shift(&mut self, display_shift: bool, direction: CursorDirection) -> GpioResult<()> {
        let mut command = 0b00010000;
        if display_shift {
            command |= 0b00001000;
        }
        if direction == CursorDirection::Right {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the function set.
    fn function_set(&mut self, function: FunctionSet) -> GpioResult<()> {
        self.send_command(0b00100000 | function.bits())
    }

    /// Sets the CGRAM address.
    fn set_cgram_address(&mut self, address: u8) -> GpioResult<()> {
        if address > 0b00111111 {
            return Err(GpioError::InvalidArgument);
        }
        let command = 0b01000000 | address;
        self.send_command(command)
    }

    /// Sets the DDRAM address.
    fn set_ddram_address(&mut self, address: u8) -> GpioResult<()> {
        if address > 0b01111111 {
            return Err(GpioError::InvalidArgument);
        }
        let command = 0b10000000 | address;
        self.send_command(command)
    }

    // Low-level commands
    // These raw commands are used by the high-level functions above.
    // They are not meant to be used directly, but implemented by the driver implementation.

    /// Sends a command to the HD44780 controller.
    /// Sets the RS line to 0 (command).
    fn send_command(&mut self, command: u8) -> GpioResult<()>;

    /// Sends data to the HD44780 controller.
    /// Sets the RS line to 1 (data).
    fn send_data(&mut self, data: u8) -> GpioResult<()>;

    /// Blocks for the given time using the delay of the driver.
    fn delay_us(&mut self, us: u32);
}

impl<T: ?Sized + HD44780Driver> HD44780Driver for &mut T {
    fn init(&mut self) -> GpioResult<()> {
        (**self).init()
    }

    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        (**self).send_command(command)
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        (**self).send_data(data)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor (or shifts the display) to the left.
    Left,
    /// Moves the cursor (or shifts the display) to the right.
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingDriver {
        commands: Vec<u8>,
        data: Vec<u8>,
        waited_us: u32,
    }

    impl HD44780Driver for RecordingDriver {
        fn init(&mut self) -> GpioResult<()> {
            Ok(())
        }

        fn send_command(&mut self, command: u8) -> GpioResult<()> {
            self.commands.push(command);
            Ok(())
        }

        fn send_data(&mut self, data: u8) -> GpioResult<()> {
            self.data.push(data);
            Ok(())
        }

        fn delay_us(&mut self, us: u32) {
            self.waited_us += us;
        }
    }

    #[test]
    fn flags_only_keep_their_own_bits() {
        let mut control = DisplayControl::from_bits(0xFF);
        assert_eq!(control.bits(), 0b111);

        control.set(DisplayControl::CURSOR_ON, false);
        assert!(control.contains(DisplayControl::DISPLAY_ON | DisplayControl::BLINK_ON));
        assert!(!control.contains(DisplayControl::CURSOR_ON));

        let mut mode = EntryMode::default();
        mode.set(0b1000_0000, true);
        assert_eq!(mode.bits(), 0);
    }

    #[test]
    fn instructions_are_encoded() {
        let mut driver = RecordingDriver::default();

        driver.clear_display().unwrap();
        driver.return_home().unwrap();
        driver
            .set_entry_mode(EntryMode::from_bits(EntryMode::INCREMENT))
            .unwrap();
        driver
            .set_display_control(DisplayControl::from_bits(
                DisplayControl::DISPLAY_ON | DisplayControl::BLINK_ON,
            ))
            .unwrap();
        driver.cursor_shift(true, CursorDirection::Left).unwrap();
        driver.cursor_shift(true, CursorDirection::Right).unwrap();
        driver
            .function_set(FunctionSet::from_bits(FunctionSet::TWO_LINES))
            .unwrap();
        driver.set_cgram_address(0x08).unwrap();
        driver.set_ddram_address(0x40).unwrap();

        assert_eq!(
            driver.commands,
            vec![0x01, 0x02, 0x06, 0x0D, 0x18, 0x1C, 0x28, 0x48, 0xC0]
        );
        assert_eq!(driver.waited_us, 2 * SLOW_COMMAND_DELAY_US);
        assert!(driver.data.is_empty());
    }

    #[test]
    fn addresses_out_of_range_are_rejected() {
        let mut driver = RecordingDriver::default();

        assert_eq!(driver.set_cgram_address(0x40), Err(GpioError::InvalidArgument));
        assert_eq!(driver.set_ddram_address(0x80), Err(GpioError::InvalidArgument));
        assert!(driver.commands.is_empty());
    }
}
