//! 窥视告警状态机
//!
//! 三状态：Idle（无计时）→ Pending（计时中，尚未告警）→ Alerting（已告警）。
//!
//! - 连续的 `peeking=true` 持续达到 `required` 时进入 Alerting，并只发出一次告警
//! - 任意一帧 `peeking=false` 立即回到 Idle 并清零计时；若此前在告警则发出解除事件
//! - Alerting 期间重复的 `peeking=true` 不再产生事件
//!
//! 没有容错窗口：单帧误判也会重置计时。

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// 告警事件；`duration` 只在 `alert=true` 时存在（秒）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub alert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl AlertEvent {
    pub fn raised(duration: Duration) -> Self {
        Self {
            alert: true,
            duration: Some(duration.as_secs_f64()),
        }
    }

    pub fn cleared() -> Self {
        Self {
            alert: false,
            duration: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeekPhase {
    Idle,
    Pending,
    Alerting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeekState {
    Idle,
    Pending { since: Instant },
    Alerting { since: Instant },
}

/// 告警状态机，由监控 worker 独占推进
#[derive(Debug, Clone)]
pub struct PeekingStateMachine {
    required: Duration,
    state: PeekState,
    last_tick: Option<Instant>,
}

impl PeekingStateMachine {
    pub fn new(required: Duration) -> Self {
        Self {
            required,
            state: PeekState::Idle,
            last_tick: None,
        }
    }

    pub fn phase(&self) -> PeekPhase {
        match self.state {
            PeekState::Idle => PeekPhase::Idle,
            PeekState::Pending { .. } => PeekPhase::Pending,
            PeekState::Alerting { .. } => PeekPhase::Alerting,
        }
    }

    /// 计时开始时刻；仅在计时进行中为 `Some`
    pub fn peeking_since(&self) -> Option<Instant> {
        match self.state {
            PeekState::Idle => None,
            PeekState::Pending { since } | PeekState::Alerting { since } => Some(since),
        }
    }

    pub fn alert_active(&self) -> bool {
        matches!(self.state, PeekState::Alerting { .. })
    }

    pub fn last_tick(&self) -> Option<Instant> {
        self.last_tick
    }

    /// 当前已持续的窥视时长，未计时为 0
    pub fn peeking_duration(&self, now: Instant) -> Duration {
        self.peeking_since()
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or(Duration::ZERO)
    }

    /// 输入最新一帧的结论，返回需要发出的事件
    pub fn advance(&mut self, peeking: bool, now: Instant) -> Option<AlertEvent> {
        self.last_tick = Some(now);

        match (self.state, peeking) {
            (PeekState::Idle, true) => {
                self.state = PeekState::Pending { since: now };
                // required 为 0 时同一帧即可告警
                self.promote_if_sustained(now)
            }
            (PeekState::Pending { .. }, true) => self.promote_if_sustained(now),
            (PeekState::Alerting { .. }, true) => None,
            (PeekState::Idle, false) => None,
            (PeekState::Pending { .. }, false) => {
                self.state = PeekState::Idle;
                None
            }
            (PeekState::Alerting { .. }, false) => {
                self.state = PeekState::Idle;
                Some(AlertEvent::cleared())
            }
        }
    }

    /// 回到 Idle；若正在告警，返回解除事件
    pub fn reset(&mut self) -> Option<AlertEvent> {
        let was_alerting = self.alert_active();
        self.state = PeekState::Idle;
        self.last_tick = None;
        was_alerting.then(AlertEvent::cleared)
    }

    fn promote_if_sustained(&mut self, now: Instant) -> Option<AlertEvent> {
        let PeekState::Pending { since } = self.state else {
            return None;
        };
        let elapsed = now.saturating_duration_since(since);
        if elapsed >= self.required {
            self.state = PeekState::Alerting { since };
            Some(AlertEvent::raised(elapsed))
        } else {
            None
        }
    }
}
