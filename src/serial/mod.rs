pub mod framer;
pub mod interface;
pub mod mock;
pub mod port_details;

pub use framer::LineFramer;
pub use interface::{SerialInterface, SystemPorts};
pub use mock::{MockPortBackend, MockSerialDevice};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the operating system reports a port's underlying transport
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PortTransport {
    Usb,
    Bluetooth,
    Pci,
    Unknown,
}

/// One enumerated serial port, reduced to what device matching needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialDeviceInfo {
    pub port_name: String,
    pub transport: PortTransport,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    /// Human-readable description (USB product string on most platforms)
    pub description: Option<String>,
    /// Hardware identifier in the `USB VID:PID=0403:6001` / `BTHENUM\...` style
    pub hardware_id: Option<String>,
}

impl SerialDeviceInfo {
    pub fn usb(port_name: &str, vid: u16, pid: u16) -> Self {
        Self {
            port_name: port_name.to_string(),
            transport: PortTransport::Usb,
            vid: Some(vid),
            pid: Some(pid),
            serial_number: None,
            manufacturer: None,
            description: None,
            hardware_id: Some(format!("USB VID:PID={:04X}:{:04X}", vid, pid)),
        }
    }

    pub fn other(port_name: &str, description: Option<&str>, hardware_id: Option<&str>) -> Self {
        Self {
            port_name: port_name.to_string(),
            transport: PortTransport::Unknown,
            vid: None,
            pid: None,
            serial_number: None,
            manufacturer: None,
            description: description.map(str::to_string),
            hardware_id: hardware_id.map(str::to_string),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    SerialportError(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;

/// An open serial connection as seen by the readers.
///
/// Every call returns immediately with whatever the OS has buffered, except
/// `read`, which may wait up to the port timeout when asked for more bytes
/// than `bytes_to_read` reported.
pub trait SerialDevice: Send {
    /// Number of bytes already buffered by the OS
    fn bytes_to_read(&mut self) -> Result<u32>;

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write the whole buffer and flush it to the device
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Discard anything waiting in the receive buffer
    fn clear_input(&mut self) -> Result<()>;

    fn port_name(&self) -> Option<String>;
}

impl<D: SerialDevice + ?Sized> SerialDevice for Box<D> {
    fn bytes_to_read(&mut self) -> Result<u32> {
        (**self).bytes_to_read()
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        (**self).read(buffer)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data)
    }

    fn clear_input(&mut self) -> Result<()> {
        (**self).clear_input()
    }

    fn port_name(&self) -> Option<String> {
        (**self).port_name()
    }
}

/// Port enumeration and opening, the only two things discovery needs from the host
pub trait PortBackend: Send + Sync {
    fn available_ports(&self) -> Result<Vec<SerialDeviceInfo>>;

    fn open(&self, port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialDevice>>;
}
