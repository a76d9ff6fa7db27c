/// DHT11 single-wire protocol decoding
use log::debug;
use std::fmt;

use crate::models::RawSample;
use crate::sensor::line::{Level, Line, Mode};

// DHT11 timing constants
const START_HOLD_MS: u32 = 18; // Host start signal, line held low
const RELEASE_US: u32 = 40; // Line driven high before handing over to the sensor
const MAX_TRANSITIONS: usize = 85; // Preamble + 40 bits, two edges each
const MAX_WAIT_POLLS: u8 = 255; // Poll budget per edge before giving up
const PREAMBLE_TRANSITIONS: usize = 4; // Sensor response edges before the first bit
const ONE_THRESHOLD: u8 = 25; // Pulses longer than this many polls are a 1
const FRAME_BITS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The sensor stopped toggling before a full frame arrived
    NoResponse { bits: u8 },
    /// A full frame arrived but its checksum byte is wrong
    ChecksumMismatch { expected: u8, received: u8 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse { bits } => {
                write!(f, "sensor stopped responding after {bits} of {FRAME_BITS} bits")
            }
            Self::ChecksumMismatch { expected, received } => {
                write!(f, "checksum mismatch: expected {expected:#04x}, received {received:#04x}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// DHT11 sensor attached to a single data line
pub struct Dht11<L: Line> {
    line: L,
}

impl<L: Line> Dht11<L> {
    pub fn new(line: L) -> Self {
        Self { line }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> L {
        self.line
    }

    /// Run one start/sample cycle and validate the frame.
    ///
    /// Blocks for roughly 20 ms and must not be interrupted while
    /// sampling, so call it from a dedicated thread.
    pub fn read(&mut self) -> Result<RawSample, DecodeError> {
        self.line.set_mode(Mode::Output);
        self.line.write(Level::Low);
        self.line.delay_ms(START_HOLD_MS);
        self.line.write(Level::High);
        self.line.delay_us(RELEASE_US);
        self.line.set_mode(Mode::Input);

        let mut bytes = [0u8; 5];
        let mut bits = 0usize;
        let mut last = Level::High;

        for transition in 0..MAX_TRANSITIONS {
            let mut polls = 0u8;
            loop {
                let level = self.line.read();
                if level != last {
                    last = level;
                    break;
                }
                polls += 1;
                if polls == MAX_WAIT_POLLS {
                    break;
                }
                self.line.delay_us(1);
            }
            if polls == MAX_WAIT_POLLS {
                break;
            }

            // Each bit is a low gap followed by a high pulse; only the
            // pulse width carries data
            if transition >= PREAMBLE_TRANSITIONS && transition % 2 == 0 && bits < FRAME_BITS {
                let byte = &mut bytes[bits / 8];
                *byte <<= 1;
                if polls > ONE_THRESHOLD {
                    *byte |= 1;
                }
                bits += 1;
            }
        }

        validate(bits, bytes)
    }

    /// Retry `read` up to `attempts` times, returning the last error when
    /// every attempt fails.
    pub fn read_with_retries(&mut self, attempts: usize) -> Result<RawSample, DecodeError> {
        let mut last_error = DecodeError::NoResponse { bits: 0 };
        for attempt in 1..=attempts {
            match self.read() {
                Ok(sample) => {
                    debug!("DHT11 frame decoded on attempt {}", attempt);
                    return Ok(sample);
                }
                Err(e) => {
                    debug!("DHT11 attempt {} failed: {}", attempt, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

fn validate(bits: usize, bytes: [u8; 5]) -> Result<RawSample, DecodeError> {
    if bits < FRAME_BITS {
        return Err(DecodeError::NoResponse { bits: bits as u8 });
    }
    let sample = RawSample::from_bytes(bytes);
    if !sample.is_valid() {
        return Err(DecodeError::ChecksumMismatch {
            expected: sample.expected_checksum(),
            received: sample.checksum,
        });
    }
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Reading;
    use crate::sensor::line::scripted::ScriptedLine;
    use time::macros::datetime;

    fn decode(segments: Vec<(Level, u32)>) -> Result<RawSample, DecodeError> {
        Dht11::new(ScriptedLine::new(segments)).read()
    }

    #[test]
    fn decodes_a_valid_frame() {
        let sample = decode(ScriptedLine::frame([23, 6, 26, 3, 58])).unwrap();
        assert_eq!(sample, RawSample::from_fields(23, 6, 26, 3));
    }

    #[test]
    fn decodes_extreme_byte_values() {
        let sample = decode(ScriptedLine::frame([255, 255, 0, 0, 254])).unwrap();
        assert_eq!(sample.to_bytes(), [255, 255, 0, 0, 254]);
    }

    #[test]
    fn all_zero_frame_is_valid() {
        assert_eq!(
            decode(ScriptedLine::frame([0; 5])),
            Ok(RawSample::from_fields(0, 0, 0, 0))
        );
    }

    #[test]
    fn drives_the_start_signal() {
        let mut sensor = Dht11::new(ScriptedLine::new(ScriptedLine::frame([0; 5])));
        sensor.read().unwrap();
        let line = sensor.into_inner();
        assert_eq!(line.writes, vec![Level::Low, Level::High]);
        assert_eq!(line.held_low_ms, START_HOLD_MS);
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let result = decode(ScriptedLine::frame([23, 6, 26, 3, 59]));
        assert_eq!(
            result,
            Err(DecodeError::ChecksumMismatch {
                expected: 58,
                received: 59
            })
        );
    }

    #[test]
    fn truncated_frame_reports_bits_seen() {
        let mut segments = ScriptedLine::frame([23, 6, 26, 3, 58]);
        // preamble is three segments, each bit two more, plus the gap
        // that closes the last complete pulse
        segments.truncate(3 + 2 * 30 + 1);
        assert_eq!(decode(segments), Err(DecodeError::NoResponse { bits: 30 }));
    }

    #[test]
    fn silent_sensor_fails_fast() {
        assert_eq!(decode(Vec::new()), Err(DecodeError::NoResponse { bits: 0 }));
    }

    #[test]
    fn pulse_width_threshold_separates_bits() {
        // A 25 poll pulse is still a zero, 26 is a one
        let mut segments = vec![(Level::High, 30), (Level::Low, 80), (Level::High, 80)];
        for i in 0..40 {
            segments.push((Level::Low, 50));
            segments.push((Level::High, if i == 7 { 26 } else { 25 }));
        }
        segments.push((Level::Low, 50));
        // byte 0 = 0x01, checksum byte = 0 so the frame fails on checksum
        assert_eq!(
            decode(segments),
            Err(DecodeError::ChecksumMismatch {
                expected: 1,
                received: 0
            })
        );
    }

    #[test]
    fn retries_stop_at_the_attempt_limit() {
        let mut sensor = Dht11::new(ScriptedLine::new(Vec::new()));
        assert_eq!(
            sensor.read_with_retries(3),
            Err(DecodeError::NoResponse { bits: 0 })
        );
        assert_eq!(sensor.into_inner().writes.len(), 6);
    }

    #[test]
    fn decoded_frame_converts_without_drift() {
        let original = RawSample::from_fields(41, 0, 22, 5);
        let decoded = decode(ScriptedLine::frame(original.to_bytes())).unwrap();
        let at = datetime!(2024-05-01 10:00:00);
        assert_eq!(Reading::from_raw(&decoded, at), Reading::from_raw(&original, at));
    }
}
