use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scale::ScaleProtocol;

// Ohaus scales enumerate through an FTDI USB-serial bridge
pub const OHAUS_VID: u16 = 1027;
pub const RANGER_PID: u16 = 24577;
pub const SCOUT_PID: u16 = 24597;

pub const SCALE_BAUD_RATE: u32 = 9600;
pub const SCANNER_BAUD_RATE: u32 = 115200;

/// A specific supported device model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Ohaus Ranger 3000, answers `IP` queries
    RangerScale,
    /// Ohaus Scout SPX2201, streams weights continuously
    ScoutScale,
    /// Bluetooth QR/barcode scanner
    Scanner,
}

/// What a port must look like to be taken for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSignature {
    UsbId { vid: u16, pid: u16 },
    Bluetooth,
}

/// Device families that are connected together and share one retry prompt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Scale,
    Scanner,
}

impl DeviceKind {
    pub const SCALES: [DeviceKind; 2] = [DeviceKind::RangerScale, DeviceKind::ScoutScale];

    pub fn signature(self) -> DeviceSignature {
        match self {
            DeviceKind::RangerScale => DeviceSignature::UsbId { vid: OHAUS_VID, pid: RANGER_PID },
            DeviceKind::ScoutScale => DeviceSignature::UsbId { vid: OHAUS_VID, pid: SCOUT_PID },
            DeviceKind::Scanner => DeviceSignature::Bluetooth,
        }
    }

    pub fn class(self) -> DeviceClass {
        match self {
            DeviceKind::RangerScale | DeviceKind::ScoutScale => DeviceClass::Scale,
            DeviceKind::Scanner => DeviceClass::Scanner,
        }
    }

    pub fn baud_rate(self) -> u32 {
        match self.class() {
            DeviceClass::Scale => SCALE_BAUD_RATE,
            DeviceClass::Scanner => SCANNER_BAUD_RATE,
        }
    }

    /// Read timeout the port is opened with
    pub fn port_timeout(self) -> Duration {
        match self.class() {
            DeviceClass::Scale => Duration::from_secs(2),
            DeviceClass::Scanner => Duration::from_secs(1),
        }
    }

    pub fn scale_protocol(self) -> Option<ScaleProtocol> {
        match self {
            DeviceKind::RangerScale => Some(ScaleProtocol::Polled),
            DeviceKind::ScoutScale => Some(ScaleProtocol::Continuous),
            DeviceKind::Scanner => None,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::RangerScale => "Ranger scale",
            DeviceKind::ScoutScale => "Scout scale",
            DeviceKind::Scanner => "QR scanner",
        };
        f.write_str(name)
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Scale => f.write_str("scale"),
            DeviceClass::Scanner => f.write_str("scanner"),
        }
    }
}
