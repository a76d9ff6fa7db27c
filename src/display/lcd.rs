/// HD44780 1602 display behind a PCF8574 I2C backpack
use hd44780_driver::bus::I2CBus;
use hd44780_driver::{Cursor, CursorBlink, Display as Power, DisplayMode, HD44780};
use log::debug;
use rppal::hal::Delay;
use rppal::i2c::I2c;

use crate::display::{Display, DisplayError, COLUMNS, ROWS};

// DDRAM offset of the second row
const ROW_OFFSET: u8 = 0x40;

fn driver_error(e: hd44780_driver::error::Error) -> DisplayError {
    DisplayError(format!("LCD bus error: {:?}", e))
}

/// DDRAM position of a cell, clamped to the visible area
pub fn cursor_position(x: u8, y: u8) -> u8 {
    let x = x.min(COLUMNS - 1);
    let y = y.min(ROWS - 1);
    ROW_OFFSET * y + x
}

pub struct Lcd1602 {
    lcd: HD44780<I2CBus<I2c>>,
    delay: Delay,
}

impl Lcd1602 {
    pub fn open(address: u16) -> Result<Self, DisplayError> {
        let address = u8::try_from(address)
            .map_err(|_| DisplayError(format!("I2C address 0x{:X} is out of range", address)))?;
        let bus = I2c::new().map_err(|e| DisplayError(e.to_string()))?;
        let mut delay = Delay::new();

        let mut lcd = HD44780::new_i2c(bus, address, &mut delay).map_err(driver_error)?;
        lcd.set_display_mode(
            DisplayMode {
                display: Power::On,
                cursor_visibility: Cursor::Invisible,
                cursor_blink: CursorBlink::Off,
            },
            &mut delay,
        )
        .map_err(driver_error)?;
        lcd.clear(&mut delay).map_err(driver_error)?;

        debug!("LCD initialised at address 0x{:X}", address);
        Ok(Self { lcd, delay })
    }
}

impl Display for Lcd1602 {
    fn write_at(&mut self, x: u8, y: u8, text: &str) -> Result<(), DisplayError> {
        self.lcd
            .set_cursor_pos(cursor_position(x, y), &mut self.delay)
            .map_err(driver_error)?;
        self.lcd
            .write_str(text, &mut self.delay)
            .map_err(driver_error)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.lcd.clear(&mut self.delay).map_err(driver_error)
    }
}
