//! Serial-in, parallel-out shift register (74HC595 and compatibles) driven by three GPIO outputs.
use crate::{GpioOutput, GpioResult};
use log::trace;
use std::fmt::{Debug, Formatter};

/// An 8-bit shift register with a staged in-memory image.
///
/// Bit mutations only touch the image. Nothing reaches the parallel outputs until
/// [ShiftRegister::commit] serializes the image on the data line, MSB first, and latches it.
///
/// The register has no notion of transactions: callers that need the outputs to change commit
/// after every mutation.
pub struct ShiftRegister<'a> {
    pin_latch: &'a dyn GpioOutput,
    pin_clock: &'a dyn GpioOutput,
    pin_data: &'a dyn GpioOutput,
    register: u8,
}

impl<'a> ShiftRegister<'a> {
    /// Binds the register to its control lines, zeroes the image and commits it, so the outputs
    /// start from a known state.
    ///
    /// # Parameters
    ///
    /// - `pin_latch`: storage register clock (RCK / ST_CP), a rising edge copies the shifted bits
    ///   to the outputs.
    /// - `pin_clock`: shift register clock (SCK / SH_CP), a rising edge shifts the data line in.
    /// - `pin_data`: serial data input (SI / DS).
    pub fn new(
        pin_latch: &'a dyn GpioOutput,
        pin_clock: &'a dyn GpioOutput,
        pin_data: &'a dyn GpioOutput,
    ) -> GpioResult<Self> {
        let mut shift_register = ShiftRegister {
            pin_latch,
            pin_clock,
            pin_data,
            register: 0,
        };
        shift_register.commit()?;
        Ok(shift_register)
    }

    /// Sets or clears one bit of the image.
    ///
    /// Positions past 7 wrap around (`8` is bit 0, `9` is bit 1 and so on) and are not reported.
    pub fn set_bit(&mut self, position: u8, value: bool) {
        let mask = 1u8.wrapping_shl(position as u32);
        if value {
            self.register |= mask;
        } else {
            self.register &= !mask;
        }
    }

    /// ANDs the image with `mask`.
    ///
    /// Note this does **not** assign `mask`: bits that are clear in the image stay clear. To load a
    /// specific value, [clear](Self::clear) first and then [set_bit](Self::set_bit) the wanted bits.
    pub fn set_byte(&mut self, mask: u8) {
        self.register &= mask;
    }

    /// Clears every bit of the image.
    pub fn clear(&mut self) {
        self.set_byte(0x00);
    }

    /// Gets the image. This is what the next commit will output, not what the pins currently show.
    pub fn read(&self) -> u8 {
        self.register
    }

    /// Shifts the image out, bit 7 first, and latches it to the parallel outputs.
    pub fn commit(&mut self) -> GpioResult<()> {
        trace!("Committing: {:08b}", self.register);

        self.pin_latch.write(false)?;

        for i in (0..8).rev() {
            self.pin_clock.write(false)?;
            self.pin_data.write((self.register >> i) & 1 != 0)?;
            self.pin_clock.write(true)?;
        }

        self.pin_latch.write(true)?;
        Ok(())
    }
}

impl Debug for ShiftRegister<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ShiftRegister({:?}, {:?}, {:?})[{:08b}]",
            self.pin_latch, self.pin_clock, self.pin_data, self.register
        )
    }
}
