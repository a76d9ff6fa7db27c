pub mod connection;
pub mod operations;

pub use operations::{check_table, fetch_range, store_raw_sample};
