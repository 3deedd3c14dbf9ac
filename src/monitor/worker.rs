//! 监控 worker：取帧 → 分析 → 推进状态机 → 发出事件 → 控制帧率
//!
//! 运行在独立线程上。采集设备由 worker 独占，在任何退出路径上
//! （正常停止、连续失败放弃、panic）都会先释放设备，再通知控制面。

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::capture::{CaptureDevice, FramePipeline};
use crate::config::MonitorConfig;
use crate::detector::AnalysisResult;
use crate::monitor::state_machine::{AlertEvent, PeekPhase};
use crate::monitor::{lock_shared, Shared};

pub(crate) struct WorkerContext {
    pub run_id: Uuid,
    pub device: Box<dyn CaptureDevice>,
    pub pipeline: FramePipeline,
    pub shared: Arc<Mutex<Shared>>,
    pub events: mpsc::UnboundedSender<AlertEvent>,
    pub config: MonitorConfig,
}

/// 控制面持有的 worker 句柄
pub(crate) struct WorkerHandle {
    pub thread: thread::JoinHandle<()>,
    /// worker 退出（含 panic）时完成
    pub done: oneshot::Receiver<()>,
}

enum LoopExit {
    Stopped,
    GaveUp(String),
}

/// 退出时的收尾；panic 时 `exit` 为 `None`
struct ExitGuard {
    shared: Arc<Mutex<Shared>>,
    events: mpsc::UnboundedSender<AlertEvent>,
    done: Option<oneshot::Sender<()>>,
    exit: Option<LoopExit>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let mut shared = lock_shared(&self.shared);
        shared.worker_active = false;

        let failure = match self.exit.take() {
            Some(LoopExit::Stopped) => {
                tracing::info!("Monitor loop stopped");
                None
            }
            Some(LoopExit::GaveUp(reason)) => {
                tracing::error!(error = %reason, "Capture kept failing, giving up");
                Some(reason)
            }
            None => {
                tracing::error!("Monitor worker panicked");
                Some("monitor worker panicked".to_string())
            }
        };

        if let Some(reason) = failure {
            shared.running = false;
            shared.last_error = Some(reason);
            if let Some(event) = shared.machine.reset() {
                let _ = self.events.send(event);
            }
        }
        drop(shared);

        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

pub(crate) fn spawn(ctx: WorkerContext) -> std::io::Result<WorkerHandle> {
    let (done_tx, done_rx) = oneshot::channel();
    // 沿用调用方的 subscriber（测试里是线程局部的）
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());
    let thread = thread::Builder::new()
        .name("peek-monitor".to_string())
        .spawn(move || tracing::dispatcher::with_default(&dispatch, || run(ctx, done_tx)))?;
    Ok(WorkerHandle {
        thread,
        done: done_rx,
    })
}

fn run(ctx: WorkerContext, done: oneshot::Sender<()>) {
    let span = tracing::info_span!("monitor", run_id = %ctx.run_id);
    let _span = span.enter();

    // 晚于 span、先于 device 声明：device 先释放，收尾日志仍在 span 内
    let mut guard = ExitGuard {
        shared: ctx.shared.clone(),
        events: ctx.events.clone(),
        done: Some(done),
        exit: None,
    };

    let WorkerContext {
        run_id: _,
        mut device,
        pipeline,
        shared,
        events,
        config,
    } = ctx;

    tracing::info!(
        target_fps = config.target_fps,
        required_seconds = config.required_seconds,
        "Monitor loop started"
    );

    let interval = config.frame_interval();
    let backoff = config.retry_backoff();
    let mut consecutive_failures: u32 = 0;
    let mut last_tick = Instant::now();

    let exit = loop {
        if lock_shared(&shared).stop_requested {
            break LoopExit::Stopped;
        }

        match device.read_frame() {
            Ok(frame) => {
                consecutive_failures = 0;
                let result = pipeline.analyze(Some(&frame));
                if !record(&shared, &events, result, Instant::now()) {
                    break LoopExit::Stopped;
                }
            }
            Err(err) => {
                consecutive_failures = consecutive_failures.saturating_add(1);
                tracing::warn!(error = %err, consecutive_failures, "Failed to grab frame");
                if config.max_consecutive_failures > 0
                    && consecutive_failures >= config.max_consecutive_failures
                {
                    break LoopExit::GaveUp(format!(
                        "{err} ({consecutive_failures} consecutive failures)"
                    ));
                }
                thread::sleep(backoff);
                last_tick = Instant::now();
                continue;
            }
        }

        // 分析耗时超过帧间隔时不补偿，帧率自然下降
        let elapsed = last_tick.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
        last_tick = Instant::now();
    };

    drop(device);
    guard.exit = Some(exit);
}

/// 记录一帧结果并推进状态机；已请求停止时返回 false 且不做任何修改
fn record(
    shared: &Mutex<Shared>,
    events: &mpsc::UnboundedSender<AlertEvent>,
    result: AnalysisResult,
    now: Instant,
) -> bool {
    let mut shared = lock_shared(shared);
    if shared.stop_requested {
        return false;
    }

    shared.frames_analyzed += 1;
    shared.last_result = Some(result);

    let before = shared.machine.phase();
    let since = shared.machine.peeking_since();
    let event = shared.machine.advance(result.peeking, now);
    let after = shared.machine.phase();

    tracing::trace!(
        face_count = result.face_count,
        peeking = result.peeking,
        reason = result.reason.as_str(),
        "Frame analyzed"
    );

    if before == PeekPhase::Idle && after != PeekPhase::Idle {
        tracing::info!(
            face_count = result.face_count,
            confidence = result.confidence,
            "Peeking detected"
        );
    }
    if before != PeekPhase::Idle && after == PeekPhase::Idle {
        let duration_secs = since
            .map(|s| now.saturating_duration_since(s).as_secs_f64())
            .unwrap_or(0.0);
        tracing::info!(duration_secs, reason = result.reason.as_str(), "Peeking stopped");
    }

    if let Some(event) = event {
        if event.alert {
            tracing::warn!(
                duration_secs = event.duration.unwrap_or(0.0),
                "Peeking sustained, alert raised"
            );
        } else {
            tracing::info!("Alert deactivated");
        }
        // 持锁发送，保证与控制面发出的事件顺序一致
        let _ = events.send(event);
    }

    true
}
