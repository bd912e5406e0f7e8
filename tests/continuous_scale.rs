use harvest_station_lib::scale::{ContinuousScaleReader, WeightReading, WeightSource};
use harvest_station_lib::serial::MockSerialDevice;

fn scale() -> (MockSerialDevice, ContinuousScaleReader<MockSerialDevice>) {
    let device = MockSerialDevice::new();
    (device.clone(), ContinuousScaleReader::new(device))
}

#[test]
fn single_line_in_one_read() {
    let (device, mut scale) = scale();
    device.queue_rx_data(b"12.5 g\r\n");
    assert_eq!(scale.poll().unwrap(), Some(12.5));
}

#[test]
fn line_split_across_polls() {
    let (device, mut scale) = scale();
    device.queue_rx_data(b"12.5 ");
    assert_eq!(scale.poll().unwrap(), None);
    device.queue_rx_data(b"g\r\n");
    assert_eq!(scale.poll().unwrap(), Some(12.5));
}

#[test]
fn last_line_wins_without_queueing() {
    let (device, mut scale) = scale();
    device.queue_rx_data(b"10.0 g\r\n20.0 g\r\n");
    assert_eq!(scale.poll().unwrap(), Some(20.0));
    assert_eq!(scale.poll().unwrap(), Some(20.0));
    assert_eq!(device.pending_rx(), 0);
}

#[test]
fn malformed_line_keeps_last_weight() {
    let (device, mut scale) = scale();
    device.queue_rx_data(b"7.5 g\r\n");
    assert_eq!(scale.poll().unwrap(), Some(7.5));

    device.queue_rx_data(b"abc def\r\n");
    assert_eq!(scale.poll().unwrap(), Some(7.5));

    device.queue_rx_data(b"99\r\n");
    assert_eq!(scale.poll().unwrap(), Some(7.5));
}

#[test]
fn malformed_line_before_any_weight_stays_unknown() {
    let (device, mut scale) = scale();
    device.queue_rx_data(b"abc def\r\n");
    assert_eq!(scale.poll().unwrap(), None);
}

#[test]
fn unit_is_recorded_not_converted() {
    let (device, mut scale) = scale();
    device.queue_rx_data(b"1.2 kg\r\n");
    assert_eq!(scale.poll().unwrap(), Some(1.2));
    assert_eq!(scale.last_unit(), Some("kg"));
}

#[tokio::test]
async fn read_error_keeps_last_weight() {
    let (device, mut scale) = scale();
    device.queue_rx_data(b"30 g\r\n");
    assert_eq!(scale.read_weight().await.unwrap(), WeightReading::Grams(30.0));

    device.set_next_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"));
    assert!(scale.read_weight().await.is_err());
    assert_eq!(scale.last_weight(), Some(30.0));
    assert_eq!(scale.read_weight().await.unwrap(), WeightReading::Grams(30.0));
}
