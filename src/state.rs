use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::detector::FrameAnalyzer;
use crate::monitor::Monitor;

#[derive(Clone)]
pub struct AppState {
    monitor: Arc<Monitor>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(monitor: Arc<Monitor>, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self {
            monitor,
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn analyzer(&self) -> &FrameAnalyzer {
        self.monitor.pipeline().analyzer()
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
