pub mod continuous;
pub mod polled;
pub mod worker;

pub use continuous::ContinuousScaleReader;
pub use polled::PolledScaleReader;
pub use worker::{ScaleHandle, ScaleWorker};

use serde::{Deserialize, Serialize};

use crate::serial::Result;

/// Wire protocol a scale is configured for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScaleProtocol {
    /// Scale streams `<weight> <unit>` lines on its own cadence
    Continuous,
    /// Scale answers one line per `IP` query
    Polled,
}

/// Result of asking a scale for its weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WeightReading {
    Grams(f64),
    /// Continuous scale has not produced a parseable line yet
    Unknown,
    /// Polled scale did not answer within the query timeout
    NoReply,
    /// Polled scale answered with something other than `<tag> <number> g...`
    Malformed { reply: String },
}

impl WeightReading {
    pub fn grams(&self) -> Option<f64> {
        match self {
            WeightReading::Grams(g) => Some(*g),
            _ => None,
        }
    }

    /// Text for a weight display field.
    ///
    /// Polled failures read as `"0"`, which is what the stations have always
    /// shown for a scale that did not answer sensibly.
    pub fn display_value(&self) -> String {
        match self {
            WeightReading::Grams(g) if g.fract() == 0.0 => format!("{:.0}", g),
            WeightReading::Grams(g) => g.to_string(),
            WeightReading::Unknown => String::new(),
            WeightReading::NoReply | WeightReading::Malformed { .. } => "0".to_string(),
        }
    }
}

/// Anything that can produce a weight reading on demand
#[async_trait::async_trait]
pub trait WeightSource: Send {
    fn protocol(&self) -> ScaleProtocol;

    async fn read_weight(&mut self) -> Result<WeightReading>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_values() {
        assert_eq!(WeightReading::Grams(45.0).display_value(), "45");
        assert_eq!(WeightReading::Grams(12.5).display_value(), "12.5");
        assert_eq!(WeightReading::Unknown.display_value(), "");
        assert_eq!(WeightReading::NoReply.display_value(), "0");
        assert_eq!(
            WeightReading::Malformed { reply: "ERR".to_string() }.display_value(),
            "0"
        );
    }

    #[test]
    fn readings_serialize_with_kind_tag() {
        let json = serde_json::to_value(WeightReading::Malformed { reply: "ERR".into() }).unwrap();
        assert_eq!(json["kind"], "malformed");
        assert_eq!(json["value"]["reply"], "ERR");

        let json = serde_json::to_value(WeightReading::Grams(45.0)).unwrap();
        assert_eq!(json["kind"], "grams");
        assert_eq!(json["value"], 45.0);
    }
}
