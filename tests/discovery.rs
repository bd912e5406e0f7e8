use std::sync::Arc;

use harvest_station_lib::device::discovery::{classify_port, survey_ports};
use harvest_station_lib::device::{
    ConnectionResult, DeviceClass, DeviceError, DeviceKind, HardwareSession, RetryDecision, RetryPrompt,
};
use harvest_station_lib::serial::interface::describe_port_with;
use harvest_station_lib::serial::port_details::PortDetails;
use harvest_station_lib::serial::{MockPortBackend, SerialDeviceInfo};
use serialport::{SerialPortInfo, SerialPortType};
use harvest_station_lib::HardwareConfig;

/// Answers from a fixed script and records what it was asked about
struct ScriptedPrompt {
    answers: Vec<RetryDecision>,
    asked: Vec<DeviceClass>,
}

impl ScriptedPrompt {
    fn new(answers: &[RetryDecision]) -> Self {
        Self { answers: answers.to_vec(), asked: Vec::new() }
    }
}

impl RetryPrompt for ScriptedPrompt {
    fn decide(&mut self, class: DeviceClass, _error: &DeviceError) -> RetryDecision {
        self.asked.push(class);
        if self.answers.is_empty() {
            RetryDecision::Cancel
        } else {
            self.answers.remove(0)
        }
    }
}

fn session(backend: &MockPortBackend) -> HardwareSession {
    HardwareSession::new(Arc::new(backend.clone()), HardwareConfig::default())
}

#[test]
fn scale_signatures_are_exclusive() {
    let backend = MockPortBackend::new();
    backend.add_port(SerialDeviceInfo::usb("COM3", 1027, 24577));
    backend.add_port(SerialDeviceInfo::usb("COM4", 1027, 24597));

    let ports = survey_ports(&backend).unwrap();
    let kinds: Vec<Option<DeviceKind>> = ports.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, vec![Some(DeviceKind::RangerScale), Some(DeviceKind::ScoutScale)]);

    for port in &ports {
        let matching = DeviceKind::SCALES
            .into_iter()
            .filter(|kind| harvest_station_lib::device::discovery::matches_signature(&port.info, kind.signature()))
            .count();
        assert_eq!(matching, 1);
    }
}

#[test]
fn enumerated_bluetooth_port_without_usb_ids_is_the_scanner() {
    let com8 = SerialPortInfo {
        port_name: "COM8".to_string(),
        port_type: SerialPortType::Unknown,
    };

    let by_name = PortDetails {
        description: Some("Standard Serial over Bluetooth link (COM8)".to_string()),
        hardware_id: Some("BTHENUM\\{00001101-0000-1000-8000-00805F9B34FB}_VID&00010057_PID&0023".to_string()),
        transport: None,
    };
    assert_eq!(classify_port(&describe_port_with(&com8, Some(by_name))), Some(DeviceKind::Scanner));

    let by_hwid_only = PortDetails {
        description: Some("Serial port".to_string()),
        hardware_id: Some("BTHENUM\\{00001101-0000-1000-8000-00805F9B34FB}_LOCALMFG&0000".to_string()),
        transport: None,
    };
    assert_eq!(classify_port(&describe_port_with(&com8, Some(by_hwid_only))), Some(DeviceKind::Scanner));

    let rfcomm = SerialPortInfo {
        port_name: "/dev/rfcomm0".to_string(),
        port_type: SerialPortType::Unknown,
    };
    let udev = PortDetails {
        hardware_id: Some("/devices/virtual/tty/rfcomm0".to_string()),
        transport: Some(harvest_station_lib::serial::PortTransport::Bluetooth),
        ..PortDetails::default()
    };
    assert_eq!(classify_port(&describe_port_with(&rfcomm, Some(udev))), Some(DeviceKind::Scanner));

    assert_eq!(classify_port(&describe_port_with(&com8, None)), None);
}

#[test]
fn usb_scale_mentioning_bluetooth_is_still_a_scale() {
    let mut port = SerialDeviceInfo::usb("COM3", 1027, 24597);
    port.description = Some("Scout with Bluetooth option".to_string());
    assert_eq!(classify_port(&port), Some(DeviceKind::ScoutScale));
}

#[test]
fn cancel_without_bluetooth_port_aborts() {
    let backend = MockPortBackend::new();
    backend.add_port(SerialDeviceInfo::usb("COM3", 1027, 24577));
    let mut session = session(&backend);
    let mut prompt = ScriptedPrompt::new(&[RetryDecision::Cancel]);

    let result = session.connect_scanner(&mut prompt);
    assert!(matches!(result, ConnectionResult::Abort(DeviceError::NotFound(DeviceClass::Scanner))));
    assert_eq!(prompt.asked, vec![DeviceClass::Scanner]);
    assert_eq!(session.status().label(DeviceKind::Scanner), "Not Found");
}

#[tokio::test]
async fn retry_after_open_failure_connects() {
    let backend = MockPortBackend::new();
    backend.add_port(SerialDeviceInfo::usb("COM4", 1027, 24597));
    backend.fail_open("COM4", "Access is denied");
    let mut session = session(&backend);

    struct FixThenRetry(MockPortBackend, usize);
    impl RetryPrompt for FixThenRetry {
        fn decide(&mut self, _class: DeviceClass, error: &DeviceError) -> RetryDecision {
            assert!(error.to_string().contains("Access is denied"));
            self.0.clear_open_failure("COM4");
            self.1 += 1;
            RetryDecision::Retry
        }
    }

    let mut prompt = FixThenRetry(backend.clone(), 0);
    let result = session.connect_scales(&mut prompt).await;
    assert!(matches!(result, ConnectionResult::Connected(ref kinds) if kinds == &[DeviceKind::ScoutScale]));
    assert_eq!(prompt.1, 1);
    assert_eq!(backend.open_requests().len(), 2);
    assert!(session.status().scout_scale);
    assert!(!session.status().ranger_scale);
}

#[tokio::test]
async fn connected_scales_are_not_reopened() {
    let backend = MockPortBackend::new();
    backend.add_port(SerialDeviceInfo::usb("COM3", 1027, 24577));
    let mut session = session(&backend);

    session.try_connect_scales().await.unwrap();
    session.try_connect_scales().await.unwrap();
    assert_eq!(backend.open_requests().len(), 1);
}
