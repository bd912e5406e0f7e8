use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::DeviceKind;

/// Connection flags for every device kind, as last set by discovery
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HardwareStatus {
    pub ranger_scale: bool,
    pub scout_scale: bool,
    pub scanner: bool,
}

impl HardwareStatus {
    pub fn is_connected(&self, kind: DeviceKind) -> bool {
        match kind {
            DeviceKind::RangerScale => self.ranger_scale,
            DeviceKind::ScoutScale => self.scout_scale,
            DeviceKind::Scanner => self.scanner,
        }
    }

    pub(crate) fn mark_connected(&mut self, kind: DeviceKind) {
        match kind {
            DeviceKind::RangerScale => self.ranger_scale = true,
            DeviceKind::ScoutScale => self.scout_scale = true,
            DeviceKind::Scanner => self.scanner = true,
        }
    }

    pub fn any_scale(&self) -> bool {
        self.ranger_scale || self.scout_scale
    }

    /// Indicator text shown next to a device
    pub fn label(&self, kind: DeviceKind) -> &'static str {
        if self.is_connected(kind) {
            "Connected"
        } else {
            "Not Found"
        }
    }
}

/// One observed change in connection status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: HardwareStatus,
    pub observed_at: DateTime<Utc>,
}

/// Caller-side helper that reports a status only when it differs from the
/// previous check, so periodic refreshes do not redraw unchanged indicators.
#[derive(Debug, Default)]
pub struct StatusTracker {
    last: Option<HardwareStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, status: HardwareStatus) -> Option<StatusChange> {
        if self.last == Some(status) {
            return None;
        }
        self.last = Some(status);
        Some(StatusChange { status, observed_at: Utc::now() })
    }
}
