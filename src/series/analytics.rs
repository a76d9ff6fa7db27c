/// Range and summary calculations over a series
use crate::models::{Reading, TemperatureUnit};
use crate::series::Series;

/// Lower and upper value of a plotted axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

/// Mean, minimum and maximum of one quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub count: usize,
    pub temperature: Summary,
    pub humidity: Summary,
}

/// Scan `values` once. A constant input is widened by `buffer` on both
/// sides so the axis never collapses to zero height.
fn padded_bounds<I>(values: I, buffer: f64) -> Option<Bounds>
where
    I: IntoIterator<Item = f64>,
{
    let mut values = values.into_iter();
    let first = values.next()?;
    let (min, max) = values.fold((first, first), |(min, max), v| (min.min(v), max.max(v)));

    if min == max {
        Some(Bounds {
            min: min - buffer,
            max: max + buffer,
        })
    } else {
        Some(Bounds { min, max })
    }
}

pub fn min_max_temperature(series: &Series, buffer: f64, unit: TemperatureUnit) -> Option<Bounds> {
    padded_bounds(series.iter().map(|r| r.temperature(unit)), buffer)
}

pub fn min_max_humidity(series: &Series, buffer: f64) -> Option<Bounds> {
    padded_bounds(series.iter().map(Reading::humidity), buffer)
}

/// Shared bounds for temperature and humidity drawn on one axis.
pub fn min_max_value(series: &Series, buffer: f64, unit: TemperatureUnit) -> Option<Bounds> {
    padded_bounds(
        series
            .iter()
            .flat_map(|r| [r.temperature(unit), r.humidity()]),
        buffer,
    )
}

struct Accumulator {
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn finish(&self, count: usize) -> Summary {
        Summary {
            mean: self.sum / count as f64,
            min: self.min,
            max: self.max,
        }
    }
}

/// Mean, minimum and maximum of temperature and humidity in one pass.
/// Returns `None` for an empty series.
pub fn statistics(series: &Series, unit: TemperatureUnit) -> Option<Statistics> {
    if series.is_empty() {
        return None;
    }

    let mut temperature = Accumulator::new();
    let mut humidity = Accumulator::new();
    for reading in series {
        temperature.add(reading.temperature(unit));
        humidity.add(reading.humidity());
    }

    let count = series.len();
    Some(Statistics {
        count,
        temperature: temperature.finish(count),
        humidity: humidity.finish(count),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn series(values: &[(f64, f64)]) -> Series {
        values
            .iter()
            .map(|&(t, h)| Reading::new(t, h, datetime!(2024-05-01 12:00:00)))
            .collect()
    }

    #[test]
    fn empty_series_has_no_bounds() {
        let empty = Series::new();
        assert_eq!(min_max_temperature(&empty, 2.0, TemperatureUnit::Celsius), None);
        assert_eq!(min_max_humidity(&empty, 2.0), None);
        assert_eq!(min_max_value(&empty, 2.0, TemperatureUnit::Celsius), None);
        assert_eq!(statistics(&empty, TemperatureUnit::Celsius), None);
    }

    #[test]
    fn single_value_is_padded_by_buffer() {
        let one = series(&[(20.0, 50.0)]);
        assert_eq!(
            min_max_temperature(&one, 2.0, TemperatureUnit::Celsius),
            Some(Bounds { min: 18.0, max: 22.0 })
        );
        assert_eq!(
            min_max_humidity(&one, 1.5),
            Some(Bounds { min: 48.5, max: 51.5 })
        );
        assert_eq!(
            min_max_temperature(&one, 2.0, TemperatureUnit::Fahrenheit),
            Some(Bounds { min: 66.0, max: 70.0 })
        );
    }

    #[test]
    fn spread_values_are_not_padded() {
        let data = series(&[(20.0, 50.0), (25.0, 40.0), (22.0, 60.0)]);
        assert_eq!(
            min_max_temperature(&data, 2.0, TemperatureUnit::Celsius),
            Some(Bounds { min: 20.0, max: 25.0 })
        );
        assert_eq!(
            min_max_humidity(&data, 2.0),
            Some(Bounds { min: 40.0, max: 60.0 })
        );
    }

    #[test]
    fn shared_bounds_span_both_quantities() {
        let data = series(&[(20.0, 50.0), (25.0, 40.0)]);
        assert_eq!(
            min_max_value(&data, 2.0, TemperatureUnit::Celsius),
            Some(Bounds { min: 20.0, max: 50.0 })
        );
        assert_eq!(
            min_max_value(&data, 2.0, TemperatureUnit::Fahrenheit),
            Some(Bounds { min: 40.0, max: 77.0 })
        );
    }

    #[test]
    fn shared_bounds_pad_when_everything_is_equal() {
        let data = series(&[(30.0, 30.0)]);
        assert_eq!(
            min_max_value(&data, 2.0, TemperatureUnit::Celsius),
            Some(Bounds { min: 28.0, max: 32.0 })
        );
    }

    #[test]
    fn statistics_over_two_readings() {
        let data = series(&[(20.0, 50.0), (22.0, 60.0)]);
        let stats = statistics(&data, TemperatureUnit::Celsius).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.temperature.mean, 21.0);
        assert_eq!(stats.humidity.mean, 55.0);
        assert_eq!(stats.temperature.max, 22.0);
        assert_eq!(stats.temperature.min, 20.0);
        assert_eq!(stats.humidity.min, 50.0);
        assert_eq!(stats.humidity.max, 60.0);
    }

    #[test]
    fn statistics_follow_the_unit() {
        let data = series(&[(0.0, 50.0), (100.0, 60.0)]);
        let stats = statistics(&data, TemperatureUnit::Fahrenheit).unwrap();
        assert_eq!(stats.temperature.min, 32.0);
        assert_eq!(stats.temperature.max, 212.0);
        assert_eq!(stats.temperature.mean, 122.0);
    }
}
