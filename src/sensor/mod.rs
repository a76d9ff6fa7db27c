pub mod dht11;
pub mod line;

pub use dht11::{DecodeError, Dht11};
pub use line::{GpioLine, Line};
