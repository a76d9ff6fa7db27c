/// Background sample → store → display cycle
use log::{error, info, warn};
use tokio::sync::watch;
use tokio::task;
use tokio::time::{sleep, Duration};

use crate::config::{DatabaseConfig, SensorConfig};
use crate::database::store_raw_sample;
use crate::display::{show_reading, show_write_issue, Display};
use crate::models::RawSample;
use crate::sensor::{DecodeError, Dht11, Line};
use crate::utils::now_local;

/// What happened in one collection cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Stored(RawSample),
    /// Decoded and displayed, but lost from the database
    NotStored(RawSample),
    /// Every decode attempt failed
    NoReading(DecodeError),
}

/// Move `value` onto a blocking thread, run `f` on it and hand it back.
async fn on_blocking<T, R, F>(mut value: T, f: F) -> Result<(T, R), task::JoinError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: FnOnce(&mut T) -> R + Send + 'static,
{
    task::spawn_blocking(move || {
        let result = f(&mut value);
        (value, result)
    })
    .await
}

/// Sleep for `seconds` unless the stop flag is raised first.
/// Returns true if the collector should stop.
async fn wait_or_stop(seconds: u64, stop: &mut watch::Receiver<bool>) -> bool {
    if *stop.borrow() {
        return true;
    }
    // A dropped sender also ends collection
    let sender_gone = tokio::select! {
        _ = sleep(Duration::from_secs(seconds)) => false,
        changed = stop.changed() => changed.is_err(),
    };
    sender_gone || *stop.borrow()
}

pub struct Collector<L: Line, D> {
    sensor: Dht11<L>,
    display: D,
    database: DatabaseConfig,
    rate_seconds: u64,
    max_read_tries: usize,
    max_store_tries: usize,
}

impl<L, D> Collector<L, D>
where
    L: Line + Send + 'static,
    D: Display + Send + 'static,
{
    pub fn new(sensor: Dht11<L>, display: D, config: &SensorConfig) -> Self {
        Self {
            sensor,
            display,
            database: config.database.clone(),
            rate_seconds: config.rate_seconds,
            max_read_tries: config.max_read_tries,
            max_store_tries: config.max_store_tries,
        }
    }

    /// Run one decode → store → display cycle
    pub async fn run_cycle(mut self) -> Result<(Self, CycleOutcome), task::JoinError> {
        let max_read_tries = self.max_read_tries;
        let (sensor, decoded) =
            on_blocking(self.sensor, move |s| s.read_with_retries(max_read_tries)).await?;
        self.sensor = sensor;

        let outcome = match decoded {
            Ok(sample) => {
                let outcome =
                    match store_raw_sample(&sample, &self.database, self.max_store_tries).await {
                        Ok(()) => {
                            info!(
                                "Stored reading: temp={:.2}°C, humidity={:.2}%",
                                sample.temperature_c(),
                                sample.humidity()
                            );
                            CycleOutcome::Stored(sample)
                        }
                        Err(e) => {
                            error!("Failed to store reading: {}", e);
                            CycleOutcome::NotStored(sample)
                        }
                    };

                let at = now_local();
                let (display, shown) = on_blocking(self.display, move |d| {
                    show_reading(d, sample.temperature_c(), sample.humidity(), &at)
                })
                .await?;
                self.display = display;
                if let Err(e) = shown {
                    warn!("Failed to update display: {}", e);
                }
                outcome
            }
            Err(e) => {
                warn!("No reading after {} attempts: {}", max_read_tries, e);
                let (display, shown) = on_blocking(self.display, |d| show_write_issue(d)).await?;
                self.display = display;
                if let Err(e) = shown {
                    warn!("Failed to update display: {}", e);
                }
                CycleOutcome::NoReading(e)
            }
        };

        Ok((self, outcome))
    }

    /// Cycle every `rate_seconds` until the stop flag is raised
    ///
    /// The first cycle runs after one full interval. The flag is only
    /// checked between cycles, never while sampling or storing.
    pub async fn run(self, mut stop: watch::Receiver<bool>) -> Result<(), task::JoinError> {
        info!(
            "Collector started, sampling every {} seconds",
            self.rate_seconds
        );

        let mut collector = self;
        while !wait_or_stop(collector.rate_seconds, &mut stop).await {
            let (next, _) = collector.run_cycle().await?;
            collector = next;
        }

        info!("Collector stopped");
        Ok(())
    }
}
