/// In-memory time series of readings built per query
pub mod analytics;

use crate::models::{compare_timestamps, Reading};

pub use analytics::{min_max_humidity, min_max_temperature, min_max_value, statistics};

/// Readings in the order they were appended. Query results are not
/// guaranteed to arrive chronologically, so call `sort_by_timestamp`
/// before anything that depends on time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    readings: Vec<Reading>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    /// Reorder into non-decreasing timestamp order. The relative order of
    /// readings with equal timestamps is not part of the contract.
    pub fn sort_by_timestamp(&mut self) {
        self.readings
            .sort_by(|a, b| compare_timestamps(&a.timestamp(), &b.timestamp()));
    }

    pub fn sorted(mut self) -> Self {
        self.sort_by_timestamp();
        self
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.readings.iter()
    }

    pub fn as_slice(&self) -> &[Reading] {
        &self.readings
    }
}

impl FromIterator<Reading> for Series {
    fn from_iter<I: IntoIterator<Item = Reading>>(iter: I) -> Self {
        Self {
            readings: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;
    use std::cmp::Ordering;
    use time::macros::datetime;

    fn reading(temperature: f64, at: Timestamp) -> Reading {
        Reading::new(temperature, 50.0, at)
    }

    fn shuffled() -> Series {
        [
            reading(3.0, datetime!(2024-05-01 12:00:00)),
            reading(1.0, datetime!(2024-04-30 23:59:59)),
            reading(4.0, datetime!(2024-05-01 12:00:01)),
            reading(2.0, datetime!(2024-05-01 00:00:00)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn append_keeps_insertion_order() {
        let mut series = Series::new();
        assert!(series.is_empty());
        series.append(reading(2.0, datetime!(2024-05-01 12:00:00)));
        series.append(reading(1.0, datetime!(2024-05-01 11:00:00)));
        let temps: Vec<f64> = series.iter().map(|r| r.temperature_c()).collect();
        assert_eq!(temps, vec![2.0, 1.0]);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn sorting_orders_by_timestamp() {
        let sorted = shuffled().sorted();
        let temps: Vec<f64> = sorted.iter().map(|r| r.temperature_c()).collect();
        assert_eq!(temps, vec![1.0, 2.0, 3.0, 4.0]);
        for pair in sorted.as_slice().windows(2) {
            assert_ne!(
                compare_timestamps(&pair[0].timestamp(), &pair[1].timestamp()),
                Ordering::Greater
            );
        }
    }

    #[test]
    fn sorting_is_idempotent() {
        let once = shuffled().sorted();
        let twice = once.clone().sorted();
        assert_eq!(once, twice);
    }

    #[test]
    fn equal_timestamps_survive_sorting() {
        let at = datetime!(2024-05-01 12:00:00);
        let mut series: Series = [reading(1.0, at), reading(2.0, at)].into_iter().collect();
        series.sort_by_timestamp();
        let mut temps: Vec<f64> = series.iter().map(|r| r.temperature_c()).collect();
        temps.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(temps, vec![1.0, 2.0]);
    }

    #[test]
    fn empty_and_single_series_sort_trivially() {
        assert!(Series::new().sorted().is_empty());
        let single: Series = [reading(1.0, datetime!(2024-05-01 12:00:00))]
            .into_iter()
            .collect();
        assert_eq!(single.clone().sorted(), single);
    }
}
