use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::HardwareConfig;
use crate::scale::{
    ContinuousScaleReader, PolledScaleReader, ScaleHandle, ScaleProtocol, ScaleWorker, WeightReading,
    WeightSource,
};
use crate::scanner::{ScannerReader, ScannerSource};
use crate::serial::{PortBackend, SystemPorts};

use super::discovery::find_ports;
use super::{DeviceClass, DeviceError, DeviceKind, HardwareStatus, Result};

/// What the user chose after a failed connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Cancel,
}

/// Asks the operator whether to retry a failed connection
pub trait RetryPrompt {
    fn decide(&mut self, class: DeviceClass, error: &DeviceError) -> RetryDecision;
}

/// Never retries; used for unattended runs
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysCancel;

impl RetryPrompt for AlwaysCancel {
    fn decide(&mut self, _class: DeviceClass, _error: &DeviceError) -> RetryDecision {
        RetryDecision::Cancel
    }
}

/// Outcome of a connect-with-retry run.
///
/// `Abort` carries the last failure; the host decides whether that ends the
/// process, returns to a menu, or just disables the dependent feature.
#[derive(Debug)]
pub enum ConnectionResult {
    Connected(Vec<DeviceKind>),
    Abort(DeviceError),
}

impl ConnectionResult {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionResult::Connected(_))
    }
}

/// Hardware owned by one station application.
///
/// Built once at startup and passed to whatever needs device access. Open
/// devices stay open for the life of the session; an unplugged device shows
/// up as failing reads, not as a status change.
pub struct HardwareSession {
    backend: Arc<dyn PortBackend>,
    config: HardwareConfig,
    scales: BTreeMap<DeviceKind, ScaleHandle>,
    scanner: Option<ScannerSource>,
    status: HardwareStatus,
}

impl HardwareSession {
    pub fn new(backend: Arc<dyn PortBackend>, config: HardwareConfig) -> Self {
        Self {
            backend,
            config,
            scales: BTreeMap::new(),
            scanner: None,
            status: HardwareStatus::default(),
        }
    }

    pub fn with_system_ports(config: HardwareConfig) -> Self {
        Self::new(Arc::new(SystemPorts), config)
    }

    pub fn config(&self) -> &HardwareConfig {
        &self.config
    }

    /// Current connection flags
    pub fn status(&self) -> HardwareStatus {
        self.status
    }

    pub fn is_connected(&self, kind: DeviceKind) -> bool {
        self.status.is_connected(kind)
    }

    /// One discovery pass over the scales.
    ///
    /// Every recognised model is opened (first matching port wins); scales
    /// already connected are left alone. Fails only if no scale ends up
    /// connected, preferring an open failure over "not found" so the user
    /// sees the OS error.
    pub async fn try_connect_scales(&mut self) -> Result<Vec<DeviceKind>> {
        let ports = self.backend.available_ports()?;
        let mut connected = Vec::new();
        let mut open_failure = None;

        for kind in DeviceKind::SCALES {
            if self.scales.contains_key(&kind) {
                connected.push(kind);
                continue;
            }

            let candidates = find_ports(&ports, kind);
            let Some(first) = candidates.first() else {
                log::debug!("No {} among {} ports", kind, ports.len());
                continue;
            };
            for extra in candidates.iter().skip(1) {
                log::warn!("Ignoring additional {} on {}", kind, extra.port_name);
            }

            log::info!("Connecting to {} on {}", kind, first.port_name);
            match self.open_scale(kind, &first.port_name) {
                Ok(handle) => {
                    self.scales.insert(kind, handle);
                    self.status.mark_connected(kind);
                    connected.push(kind);
                    log::info!("Connected to {} on {}", kind, first.port_name);
                }
                Err(e) => {
                    log::error!("Failed to connect to {}: {}", kind, e);
                    open_failure.get_or_insert(e);
                }
            }
        }

        if connected.is_empty() {
            return Err(open_failure.unwrap_or(DeviceError::NotFound(DeviceClass::Scale)));
        }
        Ok(connected)
    }

    fn open_scale(&self, kind: DeviceKind, port_name: &str) -> Result<ScaleHandle> {
        let device = self
            .backend
            .open(port_name, kind.baud_rate(), kind.port_timeout())
            .map_err(|e| DeviceError::OpenFailed {
                port: port_name.to_string(),
                message: e.to_string(),
            })?;

        let source: Box<dyn WeightSource> = match kind.scale_protocol() {
            Some(ScaleProtocol::Polled) => Box::new(PolledScaleReader::with_timeout(
                device,
                self.config.polling.query_timeout(),
            )),
            Some(ScaleProtocol::Continuous) => Box::new(ContinuousScaleReader::new(device)),
            None => return Err(DeviceError::NotFound(DeviceClass::Scale)),
        };
        Ok(ScaleWorker::new(source).spawn())
    }

    /// Discover scales, asking `prompt` after every failed pass
    pub async fn connect_scales(&mut self, prompt: &mut dyn RetryPrompt) -> ConnectionResult {
        loop {
            match self.try_connect_scales().await {
                Ok(kinds) => return ConnectionResult::Connected(kinds),
                Err(e) => {
                    log::warn!("Scale connection failed: {}", e);
                    if prompt.decide(DeviceClass::Scale, &e) == RetryDecision::Cancel {
                        log::info!("Scale connection cancelled");
                        return ConnectionResult::Abort(e);
                    }
                    log::info!("Retrying scale connection");
                }
            }
        }
    }

    /// One attempt at opening the scanner.
    ///
    /// The configured `scanner_com_port` is used as-is; without one, the
    /// first Bluetooth serial port found is taken.
    pub fn try_connect_scanner(&mut self) -> Result<()> {
        if self.scanner.is_some() {
            return Ok(());
        }

        let port = match &self.config.scanner_com_port {
            Some(port) => port.clone(),
            None => {
                let ports = self.backend.available_ports()?;
                let candidates = find_ports(&ports, DeviceKind::Scanner);
                for extra in candidates.iter().skip(1) {
                    log::warn!("Ignoring additional Bluetooth port {}", extra.port_name);
                }
                candidates
                    .first()
                    .map(|p| p.port_name.clone())
                    .ok_or(DeviceError::NotFound(DeviceClass::Scanner))?
            }
        };

        let kind = DeviceKind::Scanner;
        let device = self
            .backend
            .open(&port, kind.baud_rate(), kind.port_timeout())
            .map_err(|e| DeviceError::OpenFailed {
                port: port.clone(),
                message: e.to_string(),
            })?;

        self.scanner = Some(ScannerSource::Device(ScannerReader::new(device)));
        self.status.mark_connected(kind);
        log::info!("Scanner ready on {}", port);
        Ok(())
    }

    /// Open the scanner, asking `prompt` after every failed attempt
    pub fn connect_scanner(&mut self, prompt: &mut dyn RetryPrompt) -> ConnectionResult {
        loop {
            match self.try_connect_scanner() {
                Ok(()) => return ConnectionResult::Connected(vec![DeviceKind::Scanner]),
                Err(e) => {
                    log::warn!("Scanner connection failed: {}", e);
                    if prompt.decide(DeviceClass::Scanner, &e) == RetryDecision::Cancel {
                        log::info!("Scanner connection cancelled");
                        return ConnectionResult::Abort(e);
                    }
                    log::info!("Retrying scanner connection");
                }
            }
        }
    }

    /// Replace the scanner with one that always reads the test code
    pub fn use_simulated_scanner(&mut self) {
        log::info!("Scanner running in test mode");
        self.scanner = Some(ScannerSource::simulated());
        self.status.mark_connected(DeviceKind::Scanner);
    }

    pub fn scale(&self, kind: DeviceKind) -> Option<ScaleHandle> {
        self.scales.get(&kind).cloned()
    }

    pub async fn read_weight(&self, kind: DeviceKind) -> Result<WeightReading> {
        let handle = self.scale(kind).ok_or(DeviceError::NotConnected(kind))?;
        Ok(handle.read_weight().await?)
    }

    /// Next scanned code, or `NO_SCAN` when nothing is waiting
    pub fn check_scanner(&mut self) -> Result<String> {
        let scanner = self
            .scanner
            .as_mut()
            .ok_or(DeviceError::NotConnected(DeviceKind::Scanner))?;
        Ok(scanner.check_code()?)
    }

    /// Stop every scale worker
    pub async fn shutdown(&mut self) {
        for (kind, handle) in std::mem::take(&mut self.scales) {
            log::debug!("Stopping {} worker", kind);
            handle.shutdown().await;
        }
    }
}
