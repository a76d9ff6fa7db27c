/// Utility functions for formatting timestamps and display values
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

const LISTING_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const PLOT_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day][hour]:[minute]:[second]");
const CLOCK_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// Format a timestamp for human-readable listings
///
/// Converts a reading timestamp to YYYY-MM-DD HH:MM:SS format.
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &PrimitiveDateTime) -> String {
    dt.format(LISTING_FORMAT).unwrap_or_else(|_| dt.to_string())
}

/// Timestamp layout matching the plot script's `timefmt` directive
pub fn format_plot_time(dt: &PrimitiveDateTime) -> String {
    dt.format(PLOT_FORMAT).unwrap_or_else(|_| dt.to_string())
}

/// HH:MM for the display's clock field
pub fn format_clock(dt: &OffsetDateTime) -> String {
    dt.format(CLOCK_FORMAT)
        .unwrap_or_else(|_| format!("{:02}:{:02}", dt.hour(), dt.minute()))
}

/// Current wall-clock time in the local offset, or UTC when the local
/// offset cannot be determined.
pub fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Render a value into a fixed number of character cells
///
/// The value is scaled so its leading digit sits in the first cell and
/// the decimal point lands where the magnitude puts it. Values below 1
/// render as `0.` followed by the scaled fraction. Values too large to
/// fit are divided down and the last cell is replaced with `E`. When
/// the point falls on the last cell one extra digit follows it, so
/// `100.0` renders in five cells for a length of four.
///
/// Negative values take one cell for the sign. Returns `None` for a
/// zero length or a non-finite value.
pub fn format_fixed(value: f64, length: usize) -> Option<String> {
    if length == 0 || !value.is_finite() {
        return None;
    }
    if value < 0.0 {
        if length == 1 {
            return Some("-".to_string());
        }
        return format_fixed(-value, length - 1).map(|digits| format!("-{digits}"));
    }

    let mut divisor = 10u64.checked_pow(u32::try_from(length).ok()?)?;
    let limit = divisor.checked_mul(10)? as f64;
    let mut decimal_place = length + 1;
    let mut overflow = false;
    let mut scaled = value;

    if scaled < 1.0 {
        decimal_place = 1;
        scaled *= divisor as f64;
    } else if scaled > limit {
        overflow = true;
        while scaled > limit {
            scaled /= 10.0;
        }
    } else {
        while scaled < divisor as f64 {
            scaled *= 10.0;
            decimal_place -= 1;
        }
    }

    let mut remaining = scaled as u64;
    let mut output = String::with_capacity(length + 2);
    let mut cells = 0;
    while divisor > 0 && cells < length {
        if cells == decimal_place {
            output.push('.');
            cells += 1;
        }
        let digit = (remaining / divisor).min(9) as u32;
        output.push(char::from_digit(digit, 10)?);
        remaining %= divisor;
        divisor /= 10;
        cells += 1;
    }

    if overflow {
        output.pop();
        output.push('E');
    }
    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn fixed_width_places_the_decimal_point() {
        assert_eq!(format_fixed(26.5, 4).as_deref(), Some("26.5"));
        assert_eq!(format_fixed(60.0, 4).as_deref(), Some("60.0"));
        assert_eq!(format_fixed(7.0, 4).as_deref(), Some("7.00"));
        assert_eq!(format_fixed(1234.5, 4).as_deref(), Some("1234"));
    }

    #[test]
    fn fixed_width_small_values_lead_with_zero() {
        assert_eq!(format_fixed(0.5, 4).as_deref(), Some("0.50"));
        assert_eq!(format_fixed(0.0, 4).as_deref(), Some("0.00"));
    }

    #[test]
    fn fixed_width_point_on_last_cell_adds_a_digit() {
        assert_eq!(format_fixed(100.0, 4).as_deref(), Some("100.0"));
    }

    #[test]
    fn fixed_width_marks_overflow() {
        assert_eq!(format_fixed(123456.0, 4).as_deref(), Some("123E"));
    }

    #[test]
    fn fixed_width_negative_and_degenerate_inputs() {
        assert_eq!(format_fixed(-5.0, 4).as_deref(), Some("-5.0"));
        assert_eq!(format_fixed(26.5, 0), None);
        assert_eq!(format_fixed(f64::INFINITY, 4), None);
        assert_eq!(format_fixed(f64::NAN, 4), None);
    }

    #[test]
    fn timestamp_layouts() {
        let dt = datetime!(2024-05-01 09:05:03);
        assert_eq!(format_datetime(&dt), "2024-05-01 09:05:03");
        assert_eq!(format_plot_time(&dt), "2024-05-0109:05:03");
        assert_eq!(format_clock(&dt.assume_utc()), "09:05");
    }
}
