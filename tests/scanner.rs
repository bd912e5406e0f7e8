use std::sync::Arc;
use std::time::Duration;

use harvest_station_lib::scanner::{spawn_scan_test, ScanTestOutcome, ScannerReader, NO_SCAN};
use harvest_station_lib::serial::{MockPortBackend, MockSerialDevice, SerialDeviceInfo};

#[test]
fn no_data_returns_sentinel_every_time() {
    let device = MockSerialDevice::new();
    let mut scanner = ScannerReader::new(device.clone());
    for _ in 0..10 {
        assert_eq!(scanner.check_code().unwrap(), NO_SCAN);
    }
    assert!(device.tx_data().is_empty());
    assert_eq!(device.pending_rx(), 0);
}

#[test]
fn code_is_returned_verbatim() {
    let device = MockSerialDevice::new();
    let mut scanner = ScannerReader::new(device.clone());
    device.queue_rx_data(b"1A4000000000000000012345\r\n");
    assert_eq!(scanner.check_code().unwrap(), "1A4000000000000000012345");
}

#[test]
fn undecodable_bytes_are_replaced() {
    let device = MockSerialDevice::new();
    let mut scanner = ScannerReader::new(device.clone());
    device.queue_rx_data(b"TOTE\xfe9\r\n");
    assert_eq!(scanner.check_code().unwrap(), "TOTE\u{fffd}9");
}

#[test]
fn scan_test_reports_code() {
    let backend = MockPortBackend::new();
    let device = backend.add_port(SerialDeviceInfo::other("COM8", Some("Bluetooth link"), None));
    device.queue_rx_data(b"HELLO\r\n");

    let outcome = spawn_scan_test(Arc::new(backend.clone()), "COM8".to_string(), Duration::from_secs(2))
        .blocking_recv()
        .unwrap();
    assert_eq!(
        outcome,
        ScanTestOutcome::Received { port: "COM8".to_string(), code: "HELLO".to_string() }
    );
    assert_eq!(backend.open_requests()[0].baud_rate, 115200);
}

#[test]
fn scan_test_times_out() {
    let backend = MockPortBackend::new();
    backend.add_port(SerialDeviceInfo::other("COM8", Some("Bluetooth link"), None));

    let outcome = spawn_scan_test(Arc::new(backend), "COM8".to_string(), Duration::from_millis(250))
        .blocking_recv()
        .unwrap();
    assert_eq!(outcome, ScanTestOutcome::TimedOut { port: "COM8".to_string() });
    assert!(!outcome.is_success());
}

#[test]
fn scan_test_reports_open_failure() {
    let backend = MockPortBackend::new();
    backend.fail_open("COM8", "Element not found");

    let outcome = spawn_scan_test(Arc::new(backend), "COM8".to_string(), Duration::from_millis(250))
        .blocking_recv()
        .unwrap();
    assert!(matches!(outcome, ScanTestOutcome::OpenFailed { ref message, .. } if message.contains("Element not found")));
}
