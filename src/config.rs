use log::info;
use std::env;

const DEFAULT_TABLE: &str = "data_main";
const DEFAULT_DHT11_PIN: u8 = 4; // BCM 4, physical pin 7
const DEFAULT_LCD_ADDRESS: u16 = 0x27;
const DEFAULT_RATE_SECONDS: u64 = 600;
const DEFAULT_MAX_READ_TRIES: usize = 100;
const DEFAULT_MAX_STORE_TRIES: usize = 5;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub table: String,
}

#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub database: DatabaseConfig,
    pub dht11_pin: u8,
    pub lcd_address: u16,
    pub rate_seconds: u64,
    pub max_read_tries: usize,
    pub max_store_tries: usize,
}

impl SensorConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(
            "Loaded configuration: table={}, pin={}, lcd=0x{:X}, rate={}s",
            config.database.table, config.dht11_pin, config.lcd_address, config.rate_seconds
        );
        Ok(config)
    }

    /// Build the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL").ok_or("DATABASE_URL environment variable not set")?;

        let table = lookup("SENSOR_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());
        if !is_identifier(&table) {
            return Err(format!(
                "SENSOR_TABLE '{}' must contain only letters, digits and underscores",
                table
            )
            .into());
        }

        Ok(SensorConfig {
            database: DatabaseConfig { url, table },
            dht11_pin: numeric(&lookup, "DHT11_PIN", DEFAULT_DHT11_PIN)?,
            lcd_address: numeric(&lookup, "LCD_ADDRESS", DEFAULT_LCD_ADDRESS)?,
            rate_seconds: numeric(&lookup, "RATE_SECONDS", DEFAULT_RATE_SECONDS)?,
            max_read_tries: numeric(&lookup, "MAX_READ_TRIES", DEFAULT_MAX_READ_TRIES)?,
            max_store_tries: numeric(&lookup, "MAX_STORE_TRIES", DEFAULT_MAX_STORE_TRIES)?,
        })
    }
}

fn numeric<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: TryFrom<u64>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => parse_number(&raw)
            .and_then(|value| T::try_from(value).ok())
            .ok_or_else(|| format!("{} has invalid value '{}'", key, raw)),
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal number
pub fn parse_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
