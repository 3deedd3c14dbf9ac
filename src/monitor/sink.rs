//! 告警事件分发
//!
//! worker 只把事件写入无界通道，不直接调用回调；单个分发任务按顺序
//! 依次调用已注册的 sink，再广播给订阅者。慢 sink 只会拖慢分发，不会阻塞取帧。

use std::sync::{Arc, RwLock};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::monitor::state_machine::AlertEvent;

/// 告警回调
///
/// 同一个监控实例的事件严格串行、按发生顺序送达。
pub trait AlertSink: Send + Sync {
    fn on_alert(&self, event: &AlertEvent);
}

impl<F> AlertSink for F
where
    F: Fn(&AlertEvent) + Send + Sync,
{
    fn on_alert(&self, event: &AlertEvent) {
        self(event)
    }
}

/// 把事件写入日志
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn on_alert(&self, event: &AlertEvent) {
        match event.duration {
            Some(duration_secs) if event.alert => {
                tracing::warn!(duration_secs, "Shoulder surfing alert raised")
            }
            _ => tracing::info!(alert = event.alert, "Shoulder surfing alert cleared"),
        }
    }
}

#[derive(Default)]
pub(crate) struct SinkRegistry {
    sinks: RwLock<Vec<Arc<dyn AlertSink>>>,
}

impl SinkRegistry {
    pub(crate) fn register(&self, sink: Arc<dyn AlertSink>) {
        match self.sinks.write() {
            Ok(mut sinks) => sinks.push(sink),
            Err(poisoned) => poisoned.into_inner().push(sink),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        match self.sinks.read() {
            Ok(sinks) => sinks.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn AlertSink>> {
        match self.sinks.read() {
            Ok(sinks) => sinks.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// 启动分发任务；通道所有发送端关闭后任务退出
pub(crate) fn spawn_dispatcher(
    mut rx: mpsc::UnboundedReceiver<AlertEvent>,
    registry: Arc<SinkRegistry>,
    broadcast_tx: broadcast::Sender<AlertEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            for sink in registry.snapshot() {
                sink.on_alert(&event);
            }
            // 没有订阅者时 send 返回错误，忽略即可
            let _ = broadcast_tx.send(event);
        }
        tracing::debug!("Alert dispatcher exited");
    })
}
