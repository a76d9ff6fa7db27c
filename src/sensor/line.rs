/// Single-wire GPIO access used by the DHT11 decoder
use std::thread;
use std::time::{Duration, Instant};

use rppal::gpio::{Bias, Gpio, IoPin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Input,
    Output,
}

/// A bit-banged data line plus the delays needed to drive it.
///
/// The decoder only talks to hardware through this trait, so tests can
/// replay a recorded waveform instead of touching a real pin.
pub trait Line {
    fn set_mode(&mut self, mode: Mode);
    fn read(&mut self) -> Level;
    fn write(&mut self, level: Level);
    fn delay_ms(&mut self, ms: u32);
    fn delay_us(&mut self, us: u32);
}

/// Raspberry Pi GPIO pin (BCM numbering) with the internal pull-up
/// enabled while listening.
pub struct GpioLine {
    pin: IoPin,
}

impl GpioLine {
    pub fn open(bcm_pin: u8) -> Result<Self, rppal::gpio::Error> {
        let mut pin = Gpio::new()?.get(bcm_pin)?.into_io(rppal::gpio::Mode::Output);
        pin.set_bias(Bias::PullUp);
        Ok(Self { pin })
    }
}

impl Line for GpioLine {
    fn set_mode(&mut self, mode: Mode) {
        let mode = match mode {
            Mode::Input => rppal::gpio::Mode::Input,
            Mode::Output => rppal::gpio::Mode::Output,
        };
        self.pin.set_mode(mode);
    }

    fn read(&mut self) -> Level {
        match self.pin.read() {
            rppal::gpio::Level::Low => Level::Low,
            rppal::gpio::Level::High => Level::High,
        }
    }

    fn write(&mut self, level: Level) {
        let level = match level {
            Level::Low => rppal::gpio::Level::Low,
            Level::High => rppal::gpio::Level::High,
        };
        self.pin.write(level);
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }

    // Busy-wait
    fn delay_us(&mut self, us: u32) {
        let deadline = Instant::now() + Duration::from_micros(u64::from(us));
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}
