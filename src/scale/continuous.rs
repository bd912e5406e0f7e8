//! Reader for scales in continuous-output mode (Ohaus Scout).
//!
//! The scale streams `<weight> <unit>\r\n` lines without being asked. Each
//! poll drains whatever the OS has buffered, frames it, and keeps only the
//! newest parseable weight. The unit token is recorded but never converted;
//! the scale is expected to be set to grams.

use crate::serial::{LineFramer, Result, SerialDevice};

use super::{ScaleProtocol, WeightReading, WeightSource};

/// Parse a continuous-mode line into its weight and unit label
pub fn parse_continuous_line(line: &str) -> Option<(f64, &str)> {
    let mut tokens = line.split_whitespace();
    let weight = tokens.next()?.parse::<f64>().ok().filter(|w| w.is_finite())?;
    let unit = tokens.next()?;
    Some((weight, unit))
}

pub struct ContinuousScaleReader<D: SerialDevice> {
    device: D,
    framer: LineFramer,
    last_weight: Option<f64>,
    last_unit: Option<String>,
}

impl<D: SerialDevice> ContinuousScaleReader<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            framer: LineFramer::new(),
            last_weight: None,
            last_unit: None,
        }
    }

    /// Drain buffered input and return the last known weight.
    ///
    /// Never waits for data. A read error is returned as-is and leaves the
    /// last known weight in place.
    pub fn poll(&mut self) -> Result<Option<f64>> {
        let waiting = self.device.bytes_to_read()? as usize;
        if waiting > 0 {
            let mut buffer = vec![0u8; waiting];
            let n = self.device.read(&mut buffer)?;
            for line in self.framer.push(&buffer[..n]) {
                self.apply_line(&line);
            }
        }
        Ok(self.last_weight)
    }

    fn apply_line(&mut self, line: &str) {
        match parse_continuous_line(line) {
            Some((weight, unit)) => {
                if !unit.starts_with('g') {
                    log::debug!("Scale reported unit '{}', value used as grams", unit);
                }
                self.last_weight = Some(weight);
                self.last_unit = Some(unit.to_string());
            }
            None => {
                log::debug!("Discarding scale line {:?} ({})", line, hex::encode(line.as_bytes()));
            }
        }
    }

    pub fn last_weight(&self) -> Option<f64> {
        self.last_weight
    }

    pub fn last_unit(&self) -> Option<&str> {
        self.last_unit.as_deref()
    }
}

#[async_trait::async_trait]
impl<D: SerialDevice> WeightSource for ContinuousScaleReader<D> {
    fn protocol(&self) -> ScaleProtocol {
        ScaleProtocol::Continuous
    }

    async fn read_weight(&mut self) -> Result<WeightReading> {
        Ok(match self.poll()? {
            Some(weight) => WeightReading::Grams(weight),
            None => WeightReading::Unknown,
        })
    }
}
