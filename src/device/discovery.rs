//! Matching enumerated serial ports against known device signatures.

use serde::{Deserialize, Serialize};

use crate::serial::{PortBackend, PortTransport, Result, SerialDeviceInfo};

use super::models::{DeviceKind, DeviceSignature};

// Windows lists paired SPP devices under the BTHENUM enumerator
const BLUETOOTH_DESCRIPTION_MARKERS: [&str; 2] = ["bluetooth", "standard serial over bluetooth"];
const BLUETOOTH_HWID_MARKER: &str = "bthenum";

pub fn is_bluetooth_serial(info: &SerialDeviceInfo) -> bool {
    if info.transport == PortTransport::Bluetooth {
        return true;
    }
    let description = info.description.as_deref().unwrap_or_default().to_lowercase();
    let hardware_id = info.hardware_id.as_deref().unwrap_or_default().to_lowercase();

    BLUETOOTH_DESCRIPTION_MARKERS.iter().any(|m| description.contains(m))
        || hardware_id.contains(BLUETOOTH_HWID_MARKER)
}

pub fn matches_signature(info: &SerialDeviceInfo, signature: DeviceSignature) -> bool {
    match signature {
        DeviceSignature::UsbId { vid, pid } => info.vid == Some(vid) && info.pid == Some(pid),
        DeviceSignature::Bluetooth => is_bluetooth_serial(info),
    }
}

/// The single device kind a port is recognised as, if any.
///
/// Scale signatures are exact VID/PID pairs and are checked first, so a USB
/// scale whose description happens to mention Bluetooth is still a scale.
pub fn classify_port(info: &SerialDeviceInfo) -> Option<DeviceKind> {
    DeviceKind::SCALES
        .into_iter()
        .chain(std::iter::once(DeviceKind::Scanner))
        .find(|kind| matches_signature(info, kind.signature()))
}

/// Ports recognised as `kind`, in enumeration order
pub fn find_ports(ports: &[SerialDeviceInfo], kind: DeviceKind) -> Vec<&SerialDeviceInfo> {
    ports.iter().filter(|p| classify_port(p) == Some(kind)).collect()
}

/// A port together with what it was recognised as
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedPort {
    pub info: SerialDeviceInfo,
    pub kind: Option<DeviceKind>,
}

/// Enumerate every host port and classify each one
pub fn survey_ports(backend: &dyn PortBackend) -> Result<Vec<ClassifiedPort>> {
    let ports = backend.available_ports()?;
    log::debug!("Enumerated {} serial ports", ports.len());
    Ok(ports
        .into_iter()
        .map(|info| {
            let kind = classify_port(&info);
            ClassifiedPort { info, kind }
        })
        .collect())
}
