//! In-memory serial doubles
//!
//! `MockSerialDevice` stands in for an open port: bytes queued with
//! `queue_rx_data` become readable, writes are captured, and scripted replies
//! are released one per write to mimic a query/response instrument.
//! `MockPortBackend` serves a fixed port list and hands out mock devices.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{PortBackend, Result, SerialDevice, SerialDeviceInfo, SerialError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Clone, Default)]
pub struct MockSerialDevice {
    port_name: Option<String>,
    rx_buffer: Arc<Mutex<VecDeque<u8>>>,
    tx_buffer: Arc<Mutex<Vec<u8>>>,
    replies: Arc<Mutex<VecDeque<Vec<u8>>>>,
    next_error: Arc<Mutex<Option<io::Error>>>,
}

impl MockSerialDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(port_name: &str) -> Self {
        Self {
            port_name: Some(port_name.to_string()),
            ..Self::default()
        }
    }

    /// Make bytes available to the next read
    pub fn queue_rx_data(&self, data: &[u8]) {
        lock(&self.rx_buffer).extend(data);
    }

    /// Queue a reply released into the receive buffer by the next write
    pub fn queue_reply(&self, data: &[u8]) {
        lock(&self.replies).push_back(data.to_vec());
    }

    /// Everything written to the device so far
    pub fn tx_data(&self) -> Vec<u8> {
        lock(&self.tx_buffer).clone()
    }

    pub fn pending_rx(&self) -> usize {
        lock(&self.rx_buffer).len()
    }

    /// Fail the next operation with `error`
    pub fn set_next_error(&self, error: io::Error) {
        *lock(&self.next_error) = Some(error);
    }

    fn take_error(&self) -> Result<()> {
        match lock(&self.next_error).take() {
            Some(e) => Err(SerialError::IoError(e)),
            None => Ok(()),
        }
    }
}

impl SerialDevice for MockSerialDevice {
    fn bytes_to_read(&mut self) -> Result<u32> {
        self.take_error()?;
        Ok(lock(&self.rx_buffer).len() as u32)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        self.take_error()?;
        let mut rx = lock(&self.rx_buffer);
        let n = buffer.len().min(rx.len());
        for (slot, byte) in buffer.iter_mut().zip(rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.take_error()?;
        lock(&self.tx_buffer).extend_from_slice(data);
        if let Some(reply) = lock(&self.replies).pop_front() {
            lock(&self.rx_buffer).extend(reply);
        }
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.take_error()?;
        lock(&self.rx_buffer).clear();
        Ok(())
    }

    fn port_name(&self) -> Option<String> {
        self.port_name.clone()
    }
}

/// Record of one `open` call made against a `MockPortBackend`
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub port_name: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

#[derive(Clone, Default)]
pub struct MockPortBackend {
    ports: Arc<Mutex<Vec<SerialDeviceInfo>>>,
    devices: Arc<Mutex<HashMap<String, MockSerialDevice>>>,
    open_failures: Arc<Mutex<HashMap<String, String>>>,
    opened: Arc<Mutex<Vec<OpenRequest>>>,
}

impl MockPortBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the enumerated port list
    pub fn set_ports(&self, ports: Vec<SerialDeviceInfo>) {
        *lock(&self.ports) = ports;
    }

    /// Add a port to enumeration and return the device that opening it yields
    pub fn add_port(&self, info: SerialDeviceInfo) -> MockSerialDevice {
        let device = MockSerialDevice::named(&info.port_name);
        lock(&self.devices).insert(info.port_name.clone(), device.clone());
        lock(&self.ports).push(info);
        device
    }

    /// Device handed out for `port_name`, created on first use
    pub fn device(&self, port_name: &str) -> MockSerialDevice {
        lock(&self.devices)
            .entry(port_name.to_string())
            .or_insert_with(|| MockSerialDevice::named(port_name))
            .clone()
    }

    /// Make opening `port_name` fail with `message` until cleared
    pub fn fail_open(&self, port_name: &str, message: &str) {
        lock(&self.open_failures).insert(port_name.to_string(), message.to_string());
    }

    pub fn clear_open_failure(&self, port_name: &str) {
        lock(&self.open_failures).remove(port_name);
    }

    pub fn open_requests(&self) -> Vec<OpenRequest> {
        lock(&self.opened).clone()
    }
}

impl PortBackend for MockPortBackend {
    fn available_ports(&self) -> Result<Vec<SerialDeviceInfo>> {
        Ok(lock(&self.ports).clone())
    }

    fn open(&self, port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialDevice>> {
        lock(&self.opened).push(OpenRequest {
            port_name: port_name.to_string(),
            baud_rate,
            timeout,
        });
        if let Some(message) = lock(&self.open_failures).get(port_name) {
            return Err(SerialError::ConnectionFailed(format!("{}: {}", port_name, message)));
        }
        Ok(Box::new(self.device(port_name)))
    }
}
