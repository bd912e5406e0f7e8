//! Reader for scales that only answer an explicit query (Ohaus Ranger).
//!
//! Each read discards stale input, sends `IP\r\n`, then waits for one reply
//! line such as `ID 45 g`. The wait is bounded by the query timeout and
//! yields to the runtime between checks, so a silent scale costs the caller
//! at most one timeout and never stalls other tasks.

use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::serial::{LineFramer, Result, SerialDevice};

use super::{ScaleProtocol, WeightReading, WeightSource};

pub const QUERY_COMMAND: &[u8] = b"IP\r\n";
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(2000);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Interpret one reply line.
///
/// At least three tokens are required and the third must start with `g`;
/// the second is the weight, rounded to whole grams with ties going to the
/// even neighbour. The leading token is whatever tag the scale prints and is
/// ignored.
pub fn parse_polled_reply(line: &str) -> WeightReading {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let malformed = || WeightReading::Malformed { reply: line.to_string() };

    if tokens.len() < 3 || !tokens[2].starts_with('g') {
        return malformed();
    }
    match tokens[1].parse::<f64>() {
        Ok(weight) if weight.is_finite() => WeightReading::Grams(weight.round_ties_even()),
        _ => malformed(),
    }
}

pub struct PolledScaleReader<D: SerialDevice> {
    device: D,
    framer: LineFramer,
    query_timeout: Duration,
}

impl<D: SerialDevice> PolledScaleReader<D> {
    pub fn new(device: D) -> Self {
        Self::with_timeout(device, DEFAULT_QUERY_TIMEOUT)
    }

    pub fn with_timeout(device: D, query_timeout: Duration) -> Self {
        Self {
            device,
            framer: LineFramer::new(),
            query_timeout,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Send one query and classify the reply
    pub async fn query(&mut self) -> Result<WeightReading> {
        self.device.clear_input()?;
        self.framer.clear();
        self.device.write_all(QUERY_COMMAND)?;

        match timeout(self.query_timeout, self.next_line()).await {
            Ok(Ok(line)) => {
                let reading = parse_polled_reply(&line);
                if let WeightReading::Malformed { reply } = &reading {
                    log::debug!("Unusable scale reply {:?} ({})", reply, hex::encode(reply.as_bytes()));
                }
                Ok(reading)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                log::warn!("Scale did not answer within {:?}", self.query_timeout);
                Ok(WeightReading::NoReply)
            }
        }
    }

    async fn next_line(&mut self) -> Result<String> {
        let mut buffer = [0u8; 256];
        loop {
            let waiting = self.device.bytes_to_read()? as usize;
            if waiting == 0 {
                sleep(POLL_INTERVAL).await;
                continue;
            }
            let len = waiting.min(buffer.len());
            let n = self.device.read(&mut buffer[..len])?;
            if let Some(line) = self.framer.push(&buffer[..n]).into_iter().next() {
                return Ok(line);
            }
        }
    }
}

#[async_trait::async_trait]
impl<D: SerialDevice> WeightSource for PolledScaleReader<D> {
    fn protocol(&self) -> ScaleProtocol {
        ScaleProtocol::Polled
    }

    async fn read_weight(&mut self) -> Result<WeightReading> {
        self.query().await
    }
}
