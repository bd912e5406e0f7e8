//! Barcode/QR scanner reading.
//!
//! Scanners emit one `\r\n`-terminated code per scan. Codes are returned
//! verbatim; this layer does not validate their format.

pub mod setup;

pub use setup::{spawn_scan_test, ScanTestOutcome, SCAN_TEST_WINDOW};

use std::collections::VecDeque;

use crate::serial::{LineFramer, Result, SerialDevice};

/// Returned by `check_code` when nothing has been scanned
pub const NO_SCAN: &str = "none";

/// Code returned by a simulated scanner
pub const TEST_CODE: &str = "TEST-QRCODE-12345";

pub struct ScannerReader<D: SerialDevice> {
    device: D,
    framer: LineFramer,
    queued: VecDeque<String>,
}

impl<D: SerialDevice> ScannerReader<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            framer: LineFramer::new(),
            queued: VecDeque::new(),
        }
    }

    /// Return at most one scanned code without waiting.
    ///
    /// Codes that arrive together are handed out one per call. A scan whose
    /// terminator has not arrived yet stays buffered for a later call.
    pub fn poll_code(&mut self) -> Result<Option<String>> {
        if let Some(code) = self.queued.pop_front() {
            return Ok(Some(code));
        }

        let waiting = self.device.bytes_to_read()? as usize;
        if waiting == 0 {
            return Ok(None);
        }
        let mut buffer = vec![0u8; waiting];
        let n = self.device.read(&mut buffer)?;
        self.queued.extend(self.framer.push(&buffer[..n]));

        let code = self.queued.pop_front();
        if let Some(code) = &code {
            log::info!("Scanned code: {}", code);
        }
        Ok(code)
    }

    /// Like `poll_code`, with `NO_SCAN` standing in for "nothing scanned"
    pub fn check_code(&mut self) -> Result<String> {
        Ok(self.poll_code()?.unwrap_or_else(|| NO_SCAN.to_string()))
    }
}

/// Where scanned codes come from for a session
pub enum ScannerSource {
    Device(ScannerReader<Box<dyn SerialDevice>>),
    /// Test mode: every check yields the same code and no hardware is opened
    Simulated(String),
}

impl ScannerSource {
    pub fn simulated() -> Self {
        ScannerSource::Simulated(TEST_CODE.to_string())
    }

    pub fn poll_code(&mut self) -> Result<Option<String>> {
        match self {
            ScannerSource::Device(reader) => reader.poll_code(),
            ScannerSource::Simulated(code) => Ok(Some(code.clone())),
        }
    }

    pub fn check_code(&mut self) -> Result<String> {
        Ok(self.poll_code()?.unwrap_or_else(|| NO_SCAN.to_string()))
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, ScannerSource::Simulated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::MockSerialDevice;

    #[test]
    fn empty_buffer_returns_sentinel_repeatedly() {
        let device = MockSerialDevice::new();
        let mut scanner = ScannerReader::new(device.clone());
        for _ in 0..5 {
            assert_eq!(scanner.check_code().unwrap(), NO_SCAN);
        }
        assert!(device.tx_data().is_empty());
    }

    #[test]
    fn returns_trimmed_code() {
        let device = MockSerialDevice::new();
        let mut scanner = ScannerReader::new(device.clone());
        device.queue_rx_data(b"  PLANT-00042 \r\n");
        assert_eq!(scanner.check_code().unwrap(), "PLANT-00042");
        assert_eq!(scanner.check_code().unwrap(), NO_SCAN);
    }

    #[test]
    fn one_code_per_call() {
        let device = MockSerialDevice::new();
        let mut scanner = ScannerReader::new(device.clone());
        device.queue_rx_data(b"A1\r\nB2\r\n");
        assert_eq!(scanner.poll_code().unwrap().as_deref(), Some("A1"));
        assert_eq!(scanner.poll_code().unwrap().as_deref(), Some("B2"));
        assert_eq!(scanner.poll_code().unwrap(), None);
    }

    #[test]
    fn partial_scan_waits_for_terminator() {
        let device = MockSerialDevice::new();
        let mut scanner = ScannerReader::new(device.clone());
        device.queue_rx_data(b"TOTE-");
        assert_eq!(scanner.poll_code().unwrap(), None);
        device.queue_rx_data(b"17\r\n");
        assert_eq!(scanner.poll_code().unwrap().as_deref(), Some("TOTE-17"));
    }

    #[test]
    fn simulated_scanner_always_reads_test_code() {
        let mut source = ScannerSource::simulated();
        assert!(source.is_simulated());
        assert_eq!(source.check_code().unwrap(), TEST_CODE);
        assert_eq!(source.check_code().unwrap(), TEST_CODE);
    }
}
