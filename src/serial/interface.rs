use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort, SerialPortInfo, SerialPortType};

use super::port_details::{self, PortDetails};
use super::{PortBackend, PortTransport, Result, SerialDevice, SerialDeviceInfo, SerialError};

/// A real serial port opened through the `serialport` crate
pub struct SerialInterface {
    port: Box<dyn SerialPort>,
    port_name: String,
}

impl SerialInterface {
    /// Open `port_name` at the given baud rate; reads block at most `timeout`
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| SerialError::ConnectionFailed(format!("{}: {}", port_name, e)))?;

        log::info!("Opened {} at {} baud", port_name, baud_rate);
        Ok(Self {
            port,
            port_name: port_name.to_string(),
        })
    }
}

impl SerialDevice for SerialInterface {
    fn bytes_to_read(&mut self) -> Result<u32> {
        Ok(self.port.bytes_to_read()?)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match Read::read(&mut self.port, buffer) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(SerialError::IoError(e)),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        Write::write_all(&mut self.port, data)?;
        Write::flush(&mut self.port)?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        Ok(self.port.clear(ClearBuffer::Input)?)
    }

    fn port_name(&self) -> Option<String> {
        Some(self.port_name.clone())
    }
}

impl Drop for SerialInterface {
    fn drop(&mut self) {
        log::debug!("Closing {}", self.port_name);
    }
}

/// Host serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortBackend for SystemPorts {
    fn available_ports(&self) -> Result<Vec<SerialDeviceInfo>> {
        let ports = serialport::available_ports()?;
        Ok(ports.iter().map(describe_port).collect())
    }

    fn open(&self, port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialDevice>> {
        Ok(Box::new(SerialInterface::open(port_name, baud_rate, timeout)?))
    }
}

/// Flatten `serialport`'s port description into a `SerialDeviceInfo`.
///
/// Non-USB ports are filled in from the OS device database, since that is
/// where a paired Bluetooth port's name and hardware id live.
pub fn describe_port(port: &SerialPortInfo) -> SerialDeviceInfo {
    let details = match port.port_type {
        SerialPortType::UsbPort(_) => None,
        _ => port_details::lookup(&port.port_name),
    };
    describe_port_with(port, details)
}

pub fn describe_port_with(port: &SerialPortInfo, details: Option<PortDetails>) -> SerialDeviceInfo {
    let details = details.unwrap_or_default();
    match &port.port_type {
        SerialPortType::UsbPort(usb_info) => {
            let mut hardware_id = format!("USB VID:PID={:04X}:{:04X}", usb_info.vid, usb_info.pid);
            if let Some(serial) = &usb_info.serial_number {
                hardware_id.push_str(&format!(" SER={}", serial));
            }
            SerialDeviceInfo {
                port_name: port.port_name.clone(),
                transport: PortTransport::Usb,
                vid: Some(usb_info.vid),
                pid: Some(usb_info.pid),
                serial_number: usb_info.serial_number.clone(),
                manufacturer: usb_info.manufacturer.clone(),
                description: usb_info.product.clone().or(details.description),
                hardware_id: Some(hardware_id),
            }
        }
        other => {
            let reported = match other {
                SerialPortType::BluetoothPort => PortTransport::Bluetooth,
                SerialPortType::PciPort => PortTransport::Pci,
                _ => PortTransport::Unknown,
            };
            let transport = match (reported, details.transport) {
                (PortTransport::Unknown, Some(looked_up)) => looked_up,
                _ => reported,
            };
            SerialDeviceInfo {
                transport,
                ..SerialDeviceInfo::other(
                    &port.port_name,
                    details.description.as_deref(),
                    details.hardware_id.as_deref(),
                )
            }
        }
    }
}
