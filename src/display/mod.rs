/// Character display output for the collection cycle
pub mod lcd;

use std::fmt;
use time::OffsetDateTime;

use crate::utils::{format_clock, format_fixed};

pub use lcd::Lcd1602;

pub const COLUMNS: u8 = 16;
pub const ROWS: u8 = 2;

const VALUE_WIDTH: usize = 4;
const HEADER: &str = "temp humi time";
const WRITE_ISSUE: &str = "WRITE ISSUE";

#[derive(Debug)]
pub struct DisplayError(pub String);

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "display error: {}", self.0)
    }
}

impl std::error::Error for DisplayError {}

/// A 16x2 character display addressed by cell
pub trait Display {
    /// Write `text` starting at column `x` of row `y`. Out of range
    /// coordinates are clamped to the nearest cell.
    fn write_at(&mut self, x: u8, y: u8, text: &str) -> Result<(), DisplayError>;

    /// Blank both rows
    fn clear(&mut self) -> Result<(), DisplayError>;
}

/// Show a fresh reading: header on the top row, then temperature,
/// humidity and the local time underneath.
pub fn show_reading<D: Display>(
    display: &mut D,
    temperature_c: f64,
    humidity: f64,
    at: &OffsetDateTime,
) -> Result<(), DisplayError> {
    display.write_at(0, 0, HEADER)?;
    if let Some(temperature) = format_fixed(temperature_c, VALUE_WIDTH) {
        display.write_at(0, 1, &temperature)?;
    }
    if let Some(humidity) = format_fixed(humidity, VALUE_WIDTH) {
        display.write_at(5, 1, &humidity)?;
    }
    display.write_at(10, 1, &format_clock(at))
}

/// Flag a cycle in which no reading could be taken. The previous
/// reading is cleared so it is not mistaken for a fresh one.
pub fn show_write_issue<D: Display>(display: &mut D) -> Result<(), DisplayError> {
    display.clear()?;
    display.write_at(0, 0, WRITE_ISSUE)
}

#[cfg(test)]
pub mod recording {
    use super::{Display, DisplayError};

    /// Remembers every write for assertions
    #[derive(Default)]
    pub struct RecordingDisplay {
        pub writes: Vec<(u8, u8, String)>,
        pub clears: usize,
    }

    impl Display for RecordingDisplay {
        fn write_at(&mut self, x: u8, y: u8, text: &str) -> Result<(), DisplayError> {
            self.writes.push((x, y, text.to_string()));
            Ok(())
        }

        fn clear(&mut self) -> Result<(), DisplayError> {
            self.clears += 1;
            Ok(())
        }
    }
}
