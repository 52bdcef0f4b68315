//! HD44780 character LCD module.
//!
//! [CharacterLcd] is the user-facing API: it keeps the display state (function set, display control
//! and entry mode flags, line count) and turns every high-level operation into instructions for an
//! [HD44780Driver]. The drivers live in [driver].
//!
//! ```no_run
//! use s2plcd_gpio::{GpioDriver, StdDelay};
//! use s2plcd_gpio::gpiod::GpiodDriver;
//! use s2plcd_gpio::lcd::hd44780::CharacterLcd;
//! use s2plcd_gpio::lcd::hd44780::driver::ShiftRegisterHD44780Driver;
//! use s2plcd_gpio::shift::ShiftRegister;
//!
//! # fn main() -> Result<(), s2plcd_gpio::GpioError> {
//! let gpio = GpiodDriver::open("/dev/gpiochip0")?;
//! let (mut latch, mut clock, mut data) = (gpio.get_pin(17)?, gpio.get_pin(27)?, gpio.get_pin(22)?);
//! let (latch, clock, data) = (latch.as_output()?, clock.as_output()?, data.as_output()?);
//! let mut delay = StdDelay;
//!
//! let shift_register = ShiftRegister::new(&*latch, &*clock, &*data)?;
//! let mut lcd = CharacterLcd::new(ShiftRegisterHD44780Driver::new(shift_register, &mut delay));
//! lcd.begin(16, 2)?;
//! lcd.print("Hello")?;
//! # Ok(())
//! # }
//! ```

pub mod driver;

use crate::GpioResult;
use crate::lcd::hd44780::driver::{CursorDirection, DisplayControl, EntryMode, FunctionSet, HD44780Driver};
use log::{debug, warn};
use std::fmt;

/// DDRAM address of the first column of each row. Rows 2 and 3 continue rows 0 and 1 in memory.
const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Number of CGRAM glyph slots.
pub const CUSTOM_CHAR_SLOTS: u8 = 8;

/// Character matrix selected by [CharacterLcd::begin_with_font].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CharacterFont {
    #[default]
    Dots5x8,
    /// Only available on single-line displays.
    Dots5x10,
}

/// A character LCD bound to one HD44780 controller.
///
/// Every toggle updates the cached flags and sends the whole flag set again, even when nothing
/// changed, so the display can be brought back in sync by simply repeating a call.
#[derive(Debug)]
pub struct CharacterLcd<D> {
    driver: D,
    function: FunctionSet,
    control: DisplayControl,
    entry_mode: EntryMode,
    columns: u8,
    line_count: u8,
    current_line: u8,
}

impl<D: HD44780Driver> CharacterLcd<D> {
    /// Wraps a driver. Nothing is sent until [begin](Self::begin).
    ///
    /// The function set defaults to 4-bit interface, 2 lines and 5x8 font.
    pub fn new(driver: D) -> Self {
        CharacterLcd {
            driver,
            function: FunctionSet::from_bits(FunctionSet::TWO_LINES),
            control: DisplayControl::default(),
            entry_mode: EntryMode::default(),
            columns: 16,
            line_count: 2,
            current_line: 0,
        }
    }

    /// Initializes the display with the 5x8 font. See [begin_with_font](Self::begin_with_font).
    pub fn begin(&mut self, columns: u8, lines: u8) -> GpioResult<()> {
        self.begin_with_font(columns, lines, CharacterFont::Dots5x8)
    }

    /// Resets the controller and sets it up: function set, display on with cursor and blinking
    /// off, cleared, and text flowing left to right without autoscroll.
    ///
    /// The 5x10 font is only honoured when `lines` is 1, otherwise it's ignored.
    pub fn begin_with_font(&mut self, columns: u8, lines: u8, font: CharacterFont) -> GpioResult<()> {
        debug!("Initializing {}x{} display", columns, lines);

        self.columns = columns;
        self.line_count = lines;
        self.current_line = 0;

        self.function = FunctionSet::from_bits(FunctionSet::TWO_LINES);
        if lines == 1 && font == CharacterFont::Dots5x10 {
            self.function.set(FunctionSet::TWO_LINES, false);
            self.function.set(FunctionSet::FONT_5X10, true);
        }

        self.driver.init()?;
        self.driver.function_set(self.function)?;

        self.control = DisplayControl::default();
        self.display()?;

        self.clear()?;

        self.entry_mode = EntryMode::from_bits(EntryMode::INCREMENT);
        self.driver.set_entry_mode(self.entry_mode)?;

        debug!("Display initialized");
        Ok(())
    }

    /// Clears the display and moves the cursor to (0, 0).
    pub fn clear(&mut self) -> GpioResult<()> {
        self.driver.clear_display()
    }

    /// Moves the cursor to (0, 0) and undoes scrolling.
    pub fn home(&mut self) -> GpioResult<()> {
        self.driver.return_home()
    }

    /// Moves the cursor to the given column and row, both counted from 0.
    ///
    /// Rows past the last line land on the last line. Columns are not checked, an address past
    /// the end of DDRAM wraps around.
    pub fn set_cursor(&mut self, column: u8, row: u8) -> GpioResult<()> {
        let last_row = (self.line_count.saturating_sub(1) as usize).min(ROW_OFFSETS.len() - 1);
        let row = (row as usize).min(last_row);
        let address = column.wrapping_add(ROW_OFFSETS[row]) & 0x7F;
        self.driver.set_ddram_address(address)
    }

    /// Turns the display off, keeping its contents.
    pub fn no_display(&mut self) -> GpioResult<()> {
        self.update_control(DisplayControl::DISPLAY_ON, false)
    }

    /// Turns the display on.
    pub fn display(&mut self) -> GpioResult<()> {
        self.update_control(DisplayControl::DISPLAY_ON, true)
    }

    /// Hides the underline cursor.
    pub fn no_cursor(&mut self) -> GpioResult<()> {
        self.update_control(DisplayControl::CURSOR_ON, false)
    }

    /// Shows the underline cursor.
    pub fn cursor(&mut self) -> GpioResult<()> {
        self.update_control(DisplayControl::CURSOR_ON, true)
    }

    /// Stops the blinking block cursor.
    pub fn no_blink(&mut self) -> GpioResult<()> {
        self.update_control(DisplayControl::BLINK_ON, false)
    }

    /// Blinks the block cursor.
    pub fn blink(&mut self) -> GpioResult<()> {
        self.update_control(DisplayControl::BLINK_ON, true)
    }

    /// Scrolls the whole display one column to the left, without changing DDRAM.
    pub fn scroll_display_left(&mut self) -> GpioResult<()> {
        self.driver.cursor_shift(true, CursorDirection::Left)
    }

    /// Scrolls the whole display one column to the right, without changing DDRAM.
    pub fn scroll_display_right(&mut self) -> GpioResult<()> {
        self.driver.cursor_shift(true, CursorDirection::Right)
    }

    pub fn left_to_right(&mut self) -> GpioResult<()> {
        self.update_entry_mode(EntryMode::INCREMENT, true)
    }

    pub fn right_to_left(&mut self) -> GpioResult<()> {
        self.update_entry_mode(EntryMode::INCREMENT, false)
    }

    /// Shifts the display on each write, so text appears right-justified at the cursor.
    pub fn autoscroll(&mut self) -> GpioResult<()> {
        self.update_entry_mode(EntryMode::SHIFT, true)
    }

    /// Moves the cursor on each write instead, text appears left-justified.
    pub fn no_autoscroll(&mut self) -> GpioResult<()> {
        self.update_entry_mode(EntryMode::SHIFT, false)
    }

    /// Defines the glyph of custom character `location` (0–7, higher values wrap around). Each
    /// byte of `charmap` is one row of the 5x8 matrix, top first, using the lowest 5 bits.
    ///
    /// The character is then printed by writing its location as data. This leaves the address
    /// counter in CGRAM, so call [set_cursor](Self::set_cursor) or [home](Self::home) before writing
    /// text again.
    pub fn create_char(&mut self, location: u8, charmap: &[u8; 8]) -> GpioResult<()> {
        let location = location & (CUSTOM_CHAR_SLOTS - 1);
        self.driver.set_cgram_address(location << 3)?;
        for &row in charmap {
            self.write(row)?;
        }
        Ok(())
    }

    /// Sends a raw instruction.
    pub fn command(&mut self, value: u8) -> GpioResult<()> {
        self.driver.send_command(value)
    }

    /// Writes one byte at the cursor. Always reports one byte written.
    pub fn write(&mut self, value: u8) -> GpioResult<usize> {
        self.driver.send_data(value)?;
        Ok(1)
    }

    /// Writes a string at the cursor, one byte per character. Characters outside ASCII are not
    /// in the character ROM and are shown as `?`.
    pub fn print(&mut self, s: &str) -> GpioResult<usize> {
        let mut written = 0;
        for c in s.chars() {
            if c.is_ascii() {
                written += self.write(c as u8)?;
            } else {
                warn!("Non-ASCII character: {}", c);
                written += self.write(b'?')?;
            }
        }
        Ok(written)
    }

    pub fn function_set(&self) -> FunctionSet {
        self.function
    }

    pub fn display_control(&self) -> DisplayControl {
        self.control
    }

    pub fn entry_mode(&self) -> EntryMode {
        self.entry_mode
    }

    pub fn columns(&self) -> u8 {
        self.columns
    }

    pub fn line_count(&self) -> u8 {
        self.line_count
    }

    pub fn current_line(&self) -> u8 {
        self.current_line
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_inner(self) -> D {
        self.driver
    }

    fn update_control(&mut self, flag: u8, value: bool) -> GpioResult<()> {
        self.control.set(flag, value);
        self.driver.set_display_control(self.control)
    }

    fn update_entry_mode(&mut self, flag: u8, value: bool) -> GpioResult<()> {
        self.entry_mode.set(flag, value);
        self.driver.set_entry_mode(self.entry_mode)
    }
}

impl<D: HD44780Driver> fmt::Write for CharacterLcd<D> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.print(s).map(|_| ()).map_err(|_| fmt::Error)
    }
}
