//! 监控控制面
//!
//! `Monitor` 拥有后台 worker 的生命周期：`start` 同步打开采集设备并启动 worker，
//! `stop` 请求停止并在限定时间内等待 worker 退出，`status` 可随时查询。
//!
//! 锁顺序：`control`（tokio Mutex，串行化 start/stop）→ `shared`（std Mutex，
//! worker 与控制面共享的全部可变字段）。`shared` 从不跨 await 持有。

pub mod sink;
pub mod state_machine;
mod worker;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::capture::{CaptureError, CaptureSettings, CaptureSource, FramePipeline};
use crate::config::MonitorConfig;
use crate::constants::ALERT_BROADCAST_CAPACITY;
use crate::detector::AnalysisResult;

pub use sink::{AlertSink, LogSink};
pub use state_machine::{AlertEvent, PeekPhase, PeekingStateMachine};

use sink::SinkRegistry;
use worker::{WorkerContext, WorkerHandle};

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("monitor is already running")]
    AlreadyRunning,
    #[error("previous monitor run has not released the capture device yet")]
    PreviousRunActive,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("failed to spawn monitor worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// 监控状态快照
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub is_running: bool,
    pub alert_active: bool,
    /// 当前窥视持续秒数，未计时为 0
    pub peeking_duration: f64,
    pub phase: PeekPhase,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub frames_analyzed: u64,
    pub last_result: Option<AnalysisResult>,
    pub last_error: Option<String>,
}

/// worker 与控制面共享的可变状态
pub(crate) struct Shared {
    pub running: bool,
    pub stop_requested: bool,
    /// worker 线程仍持有采集设备
    pub worker_active: bool,
    pub machine: PeekingStateMachine,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub frames_analyzed: u64,
    pub last_result: Option<AnalysisResult>,
    pub last_error: Option<String>,
}

impl Shared {
    fn new(machine: PeekingStateMachine) -> Self {
        Self {
            running: false,
            stop_requested: false,
            worker_active: false,
            machine,
            run_id: None,
            started_at: None,
            frames_analyzed: 0,
            last_result: None,
            last_error: None,
        }
    }

    fn begin_run(&mut self, run_id: Uuid) {
        self.running = true;
        self.stop_requested = false;
        self.worker_active = true;
        self.run_id = Some(run_id);
        self.started_at = Some(Utc::now());
        self.frames_analyzed = 0;
        self.last_result = None;
        self.last_error = None;
        self.machine.reset();
    }

    fn status(&self, now: Instant) -> Status {
        Status {
            is_running: self.running,
            alert_active: self.machine.alert_active(),
            peeking_duration: self.machine.peeking_duration(now).as_secs_f64(),
            phase: self.machine.phase(),
            run_id: self.run_id,
            started_at: self.started_at,
            frames_analyzed: self.frames_analyzed,
            last_result: self.last_result,
            last_error: self.last_error.clone(),
        }
    }
}

pub(crate) fn lock_shared(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Monitor {
    config: MonitorConfig,
    settings: CaptureSettings,
    source: Arc<dyn CaptureSource>,
    pipeline: FramePipeline,
    shared: Arc<Mutex<Shared>>,
    control: tokio::sync::Mutex<Option<WorkerHandle>>,
    sinks: Arc<SinkRegistry>,
    events_tx: mpsc::UnboundedSender<AlertEvent>,
    broadcast_tx: broadcast::Sender<AlertEvent>,
}

impl Monitor {
    /// 创建监控实例并启动告警分发任务，必须在 Tokio runtime 内调用
    pub fn new(
        config: MonitorConfig,
        settings: CaptureSettings,
        source: Arc<dyn CaptureSource>,
        pipeline: FramePipeline,
    ) -> Result<Self, MonitorError> {
        config.validate().map_err(MonitorError::InvalidConfig)?;

        let sinks = Arc::new(SinkRegistry::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, _) = broadcast::channel(ALERT_BROADCAST_CAPACITY);
        sink::spawn_dispatcher(events_rx, sinks.clone(), broadcast_tx.clone());

        let machine = PeekingStateMachine::new(config.required_duration());

        Ok(Self {
            config,
            settings,
            source,
            pipeline,
            shared: Arc::new(Mutex::new(Shared::new(machine))),
            control: tokio::sync::Mutex::new(None),
            sinks,
            events_tx,
            broadcast_tx,
        })
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    /// 注册告警回调；回调不应做耗时操作，否则会拖慢后续事件的分发
    pub fn register_sink(&self, sink: Arc<dyn AlertSink>) {
        self.sinks.register(sink);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.broadcast_tx.subscribe()
    }

    pub fn status(&self) -> Status {
        lock_shared(&self.shared).status(Instant::now())
    }

    pub fn is_running(&self) -> bool {
        lock_shared(&self.shared).running
    }

    /// 打开采集设备并启动 worker
    ///
    /// 已在运行时返回 `AlreadyRunning`，不会启动第二个 worker；
    /// 设备打开失败时 worker 不会启动，也不留下任何状态。
    pub async fn start(&self) -> Result<Status, MonitorError> {
        let mut control = self.control.lock().await;

        {
            let shared = lock_shared(&self.shared);
            if shared.running {
                return Err(MonitorError::AlreadyRunning);
            }
            if shared.worker_active {
                return Err(MonitorError::PreviousRunActive);
            }
        }

        let source = self.source.clone();
        let settings = self.settings;
        let opened = tokio::task::spawn_blocking(move || source.open(&settings))
            .await
            .map_err(|e| CaptureError::Open(format!("open task failed: {e}")))
            .and_then(|opened| opened);

        let device = match opened {
            Ok(device) => device,
            Err(e) => {
                tracing::error!(error = %e, "Could not open capture device");
                return Err(e.into());
            }
        };

        let run_id = Uuid::new_v4();
        lock_shared(&self.shared).begin_run(run_id);

        let ctx = WorkerContext {
            run_id,
            device,
            pipeline: self.pipeline.clone(),
            shared: self.shared.clone(),
            events: self.events_tx.clone(),
            config: self.config.clone(),
        };

        match worker::spawn(ctx) {
            Ok(handle) => {
                *control = Some(handle);
                tracing::info!(%run_id, "Monitor started");
                Ok(self.status())
            }
            Err(e) => {
                let mut shared = lock_shared(&self.shared);
                shared.running = false;
                shared.worker_active = false;
                shared.run_id = None;
                shared.started_at = None;
                Err(MonitorError::Spawn(e))
            }
        }
    }

    /// 请求停止并等待 worker 退出（有超时）；未运行时为 no-op
    pub async fn stop(&self) -> Status {
        let mut control = self.control.lock().await;
        let handle = control.take();

        {
            let mut shared = lock_shared(&self.shared);
            if !shared.running && handle.is_none() {
                return shared.status(Instant::now());
            }
            shared.stop_requested = true;
        }

        if let Some(handle) = handle {
            let timeout = self.config.stop_timeout();
            match tokio::time::timeout(timeout, handle.done).await {
                Ok(_) => {
                    if handle.thread.is_finished() {
                        let _ = handle.thread.join();
                    }
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "Monitor worker did not exit in time, detaching"
                    );
                }
            }
        }

        let mut shared = lock_shared(&self.shared);
        let was_running = shared.running;
        shared.running = false;
        if let Some(event) = shared.machine.reset() {
            tracing::info!("Alert deactivated");
            let _ = self.events_tx.send(event);
        }
        if was_running {
            tracing::info!(run_id = ?shared.run_id, "Monitor stopped");
        }
        shared.status(Instant::now())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        lock_shared(&self.shared).stop_requested = true;
    }
}
