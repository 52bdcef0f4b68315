mod config;

use crate::config::Config;
use dotenv::dotenv;
use log::{debug, info, warn};
use s2plcd_gpio::gpiod::GpiodDriver;
use s2plcd_gpio::lcd::hd44780::CharacterLcd;
use s2plcd_gpio::lcd::hd44780::driver::ShiftRegisterHD44780Driver;
use s2plcd_gpio::shift::ShiftRegister;
use s2plcd_gpio::{GpioDriver, StdDelay};
use std::fmt::Write;
use std::thread::sleep;
use std::time::Duration;
use sysinfo::System;
use time::OffsetDateTime;

/// A small bell, shown as character 0.
const BELL: [u8; 8] = [
    0b00100,
    0b01110,
    0b01110,
    0b01110,
    0b11111,
    0b00000,
    0b00100,
    0b00000,
];

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "s2plcd demo on {} ({})",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
    );

    let config = Config::load()?;
    info!(
        "LCD {}x{} @ {} latch: {}, clock: {}, data: {}",
        config.columns,
        config.lines,
        config.gpio_chip,
        config.pin_latch,
        config.pin_clock,
        config.pin_data,
    );

    debug!("Initializing GPIO driver...");
    let gpio = GpiodDriver::open(&config.gpio_chip)?;
    debug!("{:?} initialized.", gpio);

    let mut pin_latch = gpio.get_pin(config.pin_latch)?;
    let mut pin_clock = gpio.get_pin(config.pin_clock)?;
    let mut pin_data = gpio.get_pin(config.pin_data)?;
    let pin_latch_out = pin_latch.as_output()?;
    let pin_clock_out = pin_clock.as_output()?;
    let pin_data_out = pin_data.as_output()?;

    let mut delay = StdDelay;
    let shift_register = ShiftRegister::new(&*pin_latch_out, &*pin_clock_out, &*pin_data_out)?;
    let mut lcd = CharacterLcd::new(ShiftRegisterHD44780Driver::new(shift_register, &mut delay));

    debug!("Initializing LCD...");
    lcd.begin(config.columns, config.lines)?;
    lcd.create_char(0, &BELL)?;
    lcd.home()?;
    lcd.write(0)?;
    lcd.print(" s2plcd v.")?;
    lcd.print(env!("CARGO_PKG_VERSION"))?;
    debug!("{:?} initialized.", lcd);

    if config.lines < 2 {
        warn!("Single-line display, the clock won't be shown");
        return Ok(());
    }

    info!("Showing the clock, press Ctrl+C to stop");
    loop {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());

        lcd.set_cursor(0, 1)?;
        write!(lcd, "{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())
            .map_err(|_| eyre::eyre!("failed to write to the display"))?;

        sleep(Duration::from_secs(1));
    }
}
