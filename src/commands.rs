//! Operations behind the `harvest-station` subcommands.
//!
//! Each one takes an already-built `HardwareSession` (or backend) and writes
//! human-readable lines to `out`, so the same code drives the terminal and
//! the tests.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::config::HardwareConfig;
use crate::device::discovery::{survey_ports, ClassifiedPort};
use crate::device::{
    ConnectionResult, DeviceClass, DeviceError, DeviceKind, HardwareSession, HardwareStatus, RetryDecision,
    RetryPrompt, StatusTracker,
};
use crate::scale::WeightReading;
use crate::scanner::{spawn_scan_test, ScanTestOutcome, NO_SCAN};
use crate::serial::PortBackend;

/// Shown in place of a reading when the device read itself failed
pub const READ_ERROR_PLACEHOLDER: &str = "Error";

// tokio intervals reject a zero period
const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

fn poll_ticker(period: Duration) -> tokio::time::Interval {
    tokio::time::interval(period.max(MIN_POLL_PERIOD))
}

/// The user cancelled a connection prompt
#[derive(Debug, thiserror::Error)]
#[error("Connection aborted: {0}")]
pub struct Aborted(pub DeviceError);

/// Turn a retry-loop result into an error the binary can map to its exit code
pub fn require_connected(result: ConnectionResult) -> Result<Vec<DeviceKind>> {
    match result {
        ConnectionResult::Connected(kinds) => Ok(kinds),
        ConnectionResult::Abort(e) => Err(Aborted(e).into()),
    }
}

/// Process exit status when the user cancels a connection prompt
pub const EXIT_ABORTED: u8 = 2;
pub const EXIT_FAILED: u8 = 1;

/// Exit status for the outcome of a subcommand
pub fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) if e.downcast_ref::<Aborted>().is_some() => EXIT_ABORTED,
        Err(_) => EXIT_FAILED,
    }
}

/// Retry prompt on the controlling terminal
pub struct StdinPrompt;

impl RetryPrompt for StdinPrompt {
    fn decide(&mut self, class: DeviceClass, error: &DeviceError) -> RetryDecision {
        let hint = match class {
            DeviceClass::Scale => "Check that the scale is powered on and its USB cable is plugged in.",
            DeviceClass::Scanner => "Check that the scanner is switched on and paired over Bluetooth.",
        };
        eprintln!("{}", error);
        eprintln!("{}", hint);
        eprint!("[R]etry or [C]ancel? ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => RetryDecision::Cancel,
            Ok(_) => parse_decision(&answer),
        }
    }
}

fn parse_decision(answer: &str) -> RetryDecision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" | "r" | "retry" => RetryDecision::Retry,
        _ => RetryDecision::Cancel,
    }
}

/// Print every enumerated port with what it was recognised as
pub fn list_ports(backend: &dyn PortBackend, out: &mut dyn Write) -> Result<Vec<ClassifiedPort>> {
    let ports = survey_ports(backend).context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        writeln!(out, "No serial ports found")?;
    }
    for port in &ports {
        let kind = port.kind.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string());
        let description = port.info.description.as_deref().unwrap_or("");
        writeln!(out, "{:<16} {:<14} {}", port.info.port_name, kind, description)?;
    }
    Ok(ports)
}

/// Text shown for one reading in the weight field
pub fn format_reading(reading: &WeightReading) -> String {
    match reading {
        WeightReading::Grams(_) => format!("{} g", reading.display_value()),
        WeightReading::Unknown => "--".to_string(),
        WeightReading::NoReply => format!("{} (no reply)", reading.display_value()),
        WeightReading::Malformed { .. } => format!("{} (unreadable reply)", reading.display_value()),
    }
}

/// First connected scale, Ranger before Scout
pub fn default_scale(status: HardwareStatus) -> Option<DeviceKind> {
    DeviceKind::SCALES.into_iter().find(|kind| status.is_connected(*kind))
}

/// Poll `kind` on the configured weight interval, `count` times or forever
pub async fn weigh(
    session: &HardwareSession,
    kind: DeviceKind,
    count: Option<usize>,
    out: &mut dyn Write,
) -> Result<()> {
    if !session.is_connected(kind) {
        return Err(DeviceError::NotConnected(kind).into());
    }
    let mut ticker = poll_ticker(session.config().polling.weight_interval());
    let mut taken = 0;
    while count.map_or(true, |n| taken < n) {
        ticker.tick().await;
        let shown = match session.read_weight(kind).await {
            Ok(reading) => format_reading(&reading),
            Err(e) => {
                log::error!("Reading {} failed: {}", kind, e);
                READ_ERROR_PLACEHOLDER.to_string()
            }
        };
        writeln!(out, "{}: {}", kind, shown)?;
        taken += 1;
    }
    Ok(())
}

/// Poll the scanner until `count` codes have been read (or forever)
pub async fn scan(session: &mut HardwareSession, count: Option<usize>, out: &mut dyn Write) -> Result<Vec<String>> {
    let mut ticker = poll_ticker(session.config().polling.scanner_interval());
    let mut codes = Vec::new();
    while count.map_or(true, |n| codes.len() < n) {
        ticker.tick().await;
        match session.check_scanner() {
            Ok(code) if code == NO_SCAN => {}
            Ok(code) => {
                writeln!(out, "{}", code)?;
                codes.push(code);
            }
            Err(e @ DeviceError::NotConnected(_)) => return Err(e.into()),
            Err(e) => {
                log::error!("Scanner read failed: {}", e);
                writeln!(out, "{}", READ_ERROR_PLACEHOLDER)?;
            }
        }
    }
    Ok(codes)
}

pub fn print_status(status: HardwareStatus, out: &mut dyn Write) -> Result<()> {
    for kind in [DeviceKind::RangerScale, DeviceKind::ScoutScale, DeviceKind::Scanner] {
        writeln!(out, "{:<14} {}", kind.to_string(), status.label(kind))?;
    }
    Ok(())
}

/// Re-check status on the configured interval, printing only changes
pub async fn watch_status(session: &HardwareSession, checks: Option<usize>, out: &mut dyn Write) -> Result<()> {
    let mut tracker = StatusTracker::new();
    let mut ticker = poll_ticker(session.config().polling.status_interval());
    let mut done = 0;
    while checks.map_or(true, |n| done < n) {
        ticker.tick().await;
        if let Some(change) = tracker.observe(session.status()) {
            writeln!(out, "[{}]", change.observed_at.format("%H:%M:%S"))?;
            print_status(change.status, out)?;
        }
        done += 1;
    }
    Ok(())
}

/// Test a Bluetooth port for the scanner and optionally save it.
///
/// Without `port`, the first Bluetooth serial port found is tested. The
/// chosen port is written to `config_path` only when a scan arrives and
/// `save` is set.
pub async fn setup_scanner(
    backend: Arc<dyn PortBackend>,
    config_path: &Path,
    port: Option<String>,
    window: Duration,
    save: bool,
    out: &mut dyn Write,
) -> Result<ScanTestOutcome> {
    let port = match port {
        Some(port) => port,
        None => {
            let candidates: Vec<ClassifiedPort> = survey_ports(backend.as_ref())
                .context("Failed to enumerate serial ports")?
                .into_iter()
                .filter(|p| p.kind == Some(DeviceKind::Scanner))
                .collect();
            if candidates.is_empty() {
                bail!("No Bluetooth serial ports found. Pair the scanner first.");
            }
            writeln!(out, "Bluetooth serial ports:")?;
            for candidate in &candidates {
                writeln!(
                    out,
                    "  {} {}",
                    candidate.info.port_name,
                    candidate.info.description.as_deref().unwrap_or("")
                )?;
            }
            candidates[0].info.port_name.clone()
        }
    };

    writeln!(out, "Scan a code within {} seconds to test {}...", window.as_secs(), port)?;
    let outcome = spawn_scan_test(backend, port, window)
        .await
        .context("Scan test thread exited without a result")?;

    match &outcome {
        ScanTestOutcome::Received { port, code } => {
            writeln!(out, "Received '{}' on {}", code, port)?;
            if save {
                let mut config = HardwareConfig::load_or_default(config_path)?;
                config.scanner_com_port = Some(port.clone());
                config.save(config_path)?;
                writeln!(out, "Saved {} to {}", port, config_path.display())?;
            }
        }
        ScanTestOutcome::TimedOut { port } => writeln!(out, "No scan received on {}", port)?,
        ScanTestOutcome::OpenFailed { port, message } => writeln!(out, "Could not open {}: {}", port, message)?,
    }
    Ok(outcome)
}
