/// Database operations for storing and querying DHT11 readings
use futures_util::{pin_mut, TryStreamExt};
use log::warn;
use tokio_postgres::types::ToSql;

use crate::config::DatabaseConfig;
use crate::database::connection::execute_with_retry;
use crate::models::{RawSample, Reading, TimeRange, Timestamp};
use crate::series::Series;

/// Convert the four stored integer fields into a reading
///
/// This is the only path from stored rows to engineering units. Returns
/// None when a field does not fit in a byte, which a valid frame never
/// produces.
pub fn convert_row(fields: [i32; 4], timestamp: Timestamp) -> Option<Reading> {
    let [humidity_int, humidity_frac, temperature_int, temperature_frac] = fields;
    let sample = RawSample::from_fields(
        u8::try_from(humidity_int).ok()?,
        u8::try_from(humidity_frac).ok()?,
        u8::try_from(temperature_int).ok()?,
        u8::try_from(temperature_frac).ok()?,
    );
    Some(Reading::from_raw(&sample, timestamp))
}

/// Store the data bytes of a decoded sample
///
/// The row timestamp is assigned by the database. Retries on failure
/// with a one second pause, up to `max_attempts` times.
///
/// # Arguments
/// * `sample` - Validated sample from the sensor
/// * `database` - Connection string and table name
/// * `max_attempts` - Upper bound on connection/insert attempts
pub async fn store_raw_sample(
    sample: &RawSample,
    database: &DatabaseConfig,
    max_attempts: usize,
) -> Result<(), String> {
    let sample = *sample;
    let statement = format!(
        "INSERT INTO {}(hum_int, hum_frac, temp_int, temp_frac) VALUES ($1, $2, $3, $4)",
        database.table
    );

    execute_with_retry(&database.url, max_attempts, move |client| {
        let statement = statement.clone();
        async move {
            client
                .execute(
                    statement.as_str(),
                    &[
                        &i32::from(sample.humidity_int),
                        &i32::from(sample.humidity_frac),
                        &i32::from(sample.temperature_int),
                        &i32::from(sample.temperature_frac),
                    ],
                )
                .await
        }
    })
    .await
    .map(|_| ())
}

/// Fetch every reading inside `range`, in the order the database
/// returns them
///
/// The series is not sorted; callers that need time order sort it
/// themselves.
pub async fn fetch_range(range: &TimeRange, database: &DatabaseConfig) -> Result<Series, String> {
    let (start, end) = range.bounds().map_err(|e| e.to_string())?;
    let query = format!(
        "SELECT hum_int, hum_frac, temp_int, temp_frac, time FROM {} WHERE time BETWEEN $1 AND $2",
        database.table
    );

    execute_with_retry(&database.url, 1, move |client| {
        let query = query.clone();
        async move {
            let params: [&(dyn ToSql + Sync); 2] = [&start, &end];
            let rows = client.query_raw(query.as_str(), params).await?;
            pin_mut!(rows);

            let mut series = Series::new();
            while let Some(row) = rows.try_next().await? {
                let fields = [
                    row.try_get::<_, i32>(0)?,
                    row.try_get::<_, i32>(1)?,
                    row.try_get::<_, i32>(2)?,
                    row.try_get::<_, i32>(3)?,
                ];
                let timestamp: Timestamp = row.try_get(4)?;
                match convert_row(fields, timestamp) {
                    Some(reading) => series.append(reading),
                    None => warn!("Skipping row at {} with out-of-range fields {:?}", timestamp, fields),
                }
            }
            Ok(series)
        }
    })
    .await
}

/// Check that the database is reachable and the configured table exists
pub async fn check_table(database: &DatabaseConfig) -> Result<bool, String> {
    let table = database.table.clone();

    execute_with_retry(&database.url, 1, move |client| {
        let table = table.clone();
        async move {
            let row = client
                .query_one(
                    "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
                    &[&table],
                )
                .await?;
            row.try_get::<_, bool>(0)
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn stored_fields_convert_like_sensor_frames() {
        let at = datetime!(2024-05-01 10:15:00);
        let reading = convert_row([23, 6, 26, 3], at).unwrap();
        assert!((reading.temperature_c() - 26.3).abs() < 1e-9);
        assert!((reading.humidity() - 23.6).abs() < 1e-9);
        assert_eq!(reading.timestamp(), at);
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let at = datetime!(2024-05-01 10:15:00);
        assert_eq!(convert_row([256, 0, 20, 0], at), None);
        assert_eq!(convert_row([50, 0, -1, 0], at), None);
    }
}
