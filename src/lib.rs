pub mod serial;
pub mod scale;
pub mod scanner;
pub mod device;
pub mod config;
pub mod commands;

pub use config::HardwareConfig;
pub use device::{ConnectionResult, DeviceKind, HardwareSession, HardwareStatus};
pub use scale::WeightReading;
