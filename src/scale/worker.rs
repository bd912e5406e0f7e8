//! Scale reader task
//!
//! A `ScaleWorker` owns one `WeightSource` on a Tokio task. Callers keep a
//! cloneable `ScaleHandle` and receive each reading through a oneshot reply,
//! so a slow polled query only delays the caller that asked for it.
use tokio::sync::{mpsc, oneshot};

use crate::serial::{Result, SerialError};

use super::{ScaleProtocol, WeightReading, WeightSource};

const COMMAND_CAPACITY: usize = 16;

#[derive(Debug)]
pub enum ScaleCommand {
    Read { responder: oneshot::Sender<Result<WeightReading>> },
    Shutdown,
}

#[derive(Clone)]
pub struct ScaleHandle {
    cmd_tx: mpsc::Sender<ScaleCommand>,
    protocol: ScaleProtocol,
}

impl ScaleHandle {
    pub fn protocol(&self) -> ScaleProtocol {
        self.protocol
    }

    pub async fn read_weight(&self) -> Result<WeightReading> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(ScaleCommand::Read { responder: tx })
            .await
            .map_err(|_| SerialError::ProtocolError("Scale worker stopped".into()))?;
        rx.await.map_err(|_| SerialError::ProtocolError("Scale reading dropped".into()))?
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(ScaleCommand::Shutdown).await;
    }
}

pub struct ScaleWorker {
    source: Box<dyn WeightSource>,
}

impl ScaleWorker {
    pub fn new(source: Box<dyn WeightSource>) -> Self {
        Self { source }
    }

    /// Start the task; must be called from within a Tokio runtime
    pub fn spawn(self) -> ScaleHandle {
        let protocol = self.source.protocol();
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
        tokio::spawn(worker_task(self.source, cmd_rx));
        ScaleHandle { cmd_tx, protocol }
    }
}

async fn worker_task(mut source: Box<dyn WeightSource>, mut cmd_rx: mpsc::Receiver<ScaleCommand>) {
    log::debug!("{:?} scale worker started", source.protocol());
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            ScaleCommand::Read { responder } => {
                let reading = source.read_weight().await;
                if let Err(e) = &reading {
                    log::warn!("Scale read failed: {}", e);
                }
                let _ = responder.send(reading);
            }
            ScaleCommand::Shutdown => break,
        }
    }
    log::debug!("{:?} scale worker stopped", source.protocol());
}
