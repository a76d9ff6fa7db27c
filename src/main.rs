mod collector;
mod config;
mod database;
mod display;
mod menu;
mod models;
mod plot;
mod sensor;
mod series;
mod utils;

use log::{error, info, warn};
use tokio::io::{stdin, BufReader};
use tokio::sync::watch;

use collector::Collector;
use config::SensorConfig;
use database::check_table;
use display::Lcd1602;
use menu::{run_menu, Prompt};
use sensor::{Dht11, GpioLine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match SensorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    match check_table(&config.database).await {
        Ok(true) => info!("Connected, table '{}' found", config.database.table),
        Ok(false) => warn!(
            "Table '{}' not found, readings will not be stored",
            config.database.table
        ),
        Err(e) => warn!("Database not reachable yet: {}", e),
    }

    let line = match GpioLine::open(config.dht11_pin) {
        Ok(line) => line,
        Err(e) => {
            error!("Failed to initialize DHT11 pin {}: {}", config.dht11_pin, e);
            return Err(e.into());
        }
    };
    let lcd = match Lcd1602::open(config.lcd_address) {
        Ok(lcd) => lcd,
        Err(e) => {
            error!(
                "Failed to initialize LCD at address 0x{:X}: {}",
                config.lcd_address, e
            );
            return Err(e.into());
        }
    };

    // The menu raises the flag on quit; the collector checks it between cycles
    let (stop_tx, stop_rx) = watch::channel(false);
    let collector = Collector::new(Dht11::new(line), lcd, &config);
    let collector_handle = tokio::spawn(collector.run(stop_rx));

    run_menu(Prompt::new(BufReader::new(stdin())), &config, stop_tx).await;

    match collector_handle.await {
        Ok(Ok(())) => info!("Program completed successfully"),
        Ok(Err(e)) => error!("Collector failed: {}", e),
        Err(e) => error!("Collector task panicked: {}", e),
    }

    Ok(())
}
