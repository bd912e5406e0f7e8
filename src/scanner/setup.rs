//! Scanner port test used when choosing which Bluetooth port to save.
//!
//! The test waits up to `SCAN_TEST_WINDOW` for one scan, which is too long
//! to hold an interactive caller, so it runs on its own thread and reports
//! back through a oneshot channel.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::device::models::DeviceKind;
use crate::serial::{LineFramer, PortBackend};

pub const SCAN_TEST_WINDOW: Duration = Duration::from_secs(10);
const SCAN_TEST_READ_TIMEOUT: Duration = Duration::from_millis(500);
const SCAN_TEST_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ScanTestOutcome {
    Received { port: String, code: String },
    TimedOut { port: String },
    OpenFailed { port: String, message: String },
}

impl ScanTestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ScanTestOutcome::Received { .. })
    }
}

/// Open `port` at the scanner baud rate and wait up to `window` for a scan
pub fn spawn_scan_test(
    backend: Arc<dyn PortBackend>,
    port: String,
    window: Duration,
) -> oneshot::Receiver<ScanTestOutcome> {
    let (tx, rx) = oneshot::channel();
    thread::spawn(move || {
        let outcome = run_scan_test(backend.as_ref(), &port, window);
        let _ = tx.send(outcome);
    });
    rx
}

fn run_scan_test(backend: &dyn PortBackend, port: &str, window: Duration) -> ScanTestOutcome {
    log::info!("Testing scanner on {}, waiting {:?} for a scan", port, window);
    let mut device = match backend.open(port, DeviceKind::Scanner.baud_rate(), SCAN_TEST_READ_TIMEOUT) {
        Ok(device) => device,
        Err(e) => {
            log::error!("Could not open {}: {}", port, e);
            return ScanTestOutcome::OpenFailed { port: port.to_string(), message: e.to_string() };
        }
    };

    let mut framer = LineFramer::new();
    let deadline = Instant::now() + window;
    while Instant::now() < deadline {
        match device.bytes_to_read() {
            Ok(0) => {}
            Ok(waiting) => {
                let mut buffer = vec![0u8; waiting as usize];
                match device.read(&mut buffer) {
                    Ok(n) => {
                        if let Some(code) = framer.push(&buffer[..n]).into_iter().next() {
                            log::info!("Scanner on {} answered with {}", port, code);
                            return ScanTestOutcome::Received { port: port.to_string(), code };
                        }
                    }
                    Err(e) => log::warn!("Read from {} failed: {}", port, e),
                }
            }
            Err(e) => log::warn!("Could not query {}: {}", port, e),
        }
        thread::sleep(SCAN_TEST_POLL_INTERVAL);
    }

    log::warn!("Timed out waiting for a scan on {}", port);
    ScanTestOutcome::TimedOut { port: port.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::MockPortBackend;

    #[tokio::test]
    async fn reports_first_scan() {
        let backend = MockPortBackend::new();
        backend.device("COM7").queue_rx_data(b"QR-1\r\nQR-2\r\n");

        let outcome = spawn_scan_test(Arc::new(backend.clone()), "COM7".into(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(outcome, ScanTestOutcome::Received { port: "COM7".into(), code: "QR-1".into() });
        assert_eq!(backend.open_requests()[0].baud_rate, 115_200);
    }

    #[tokio::test]
    async fn times_out_without_scan() {
        let backend = MockPortBackend::new();
        let outcome = spawn_scan_test(Arc::new(backend), "COM7".into(), Duration::from_millis(150))
            .await
            .unwrap();
        assert_eq!(outcome, ScanTestOutcome::TimedOut { port: "COM7".into() });
        assert!(!outcome.is_success());
    }

    #[test]
    fn open_failure_is_reported() {
        let backend = MockPortBackend::new();
        backend.fail_open("COM9", "Access is denied.");
        let outcome = spawn_scan_test(Arc::new(backend), "COM9".into(), SCAN_TEST_WINDOW)
            .blocking_recv()
            .unwrap();
        assert!(matches!(outcome, ScanTestOutcome::OpenFailed { .. }));
    }
}
