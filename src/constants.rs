/// 视线居中阈值：双眼平均水平位置与 0.5 的偏差小于此值视为看屏幕
pub const DEFAULT_GAZE_THRESHOLD: f64 = 0.35;

/// 窥视持续多少秒后触发告警
pub const DEFAULT_REQUIRED_SECONDS: f64 = 5.0;

/// 分析帧率（Hz）
pub const DEFAULT_TARGET_FPS: u32 = 20;

/// 请求的采集分辨率与帧率（仅为提示）
pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
pub const DEFAULT_CAPTURE_FPS: u32 = 30;

/// 取帧失败后的退避时间（毫秒）
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;

/// 连续取帧失败达到此次数后放弃，0 表示无限重试
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 50;

/// stop 等待 worker 退出的最长时间（毫秒）
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 2000;

/// 告警事件广播通道容量
pub const ALERT_BROADCAST_CAPACITY: usize = 64;

/// SSE 连接上限
pub const MAX_SSE_CONNECTIONS: usize = 32;

pub const DEFAULT_REPLAY_PATH: &str = "./recordings/session.jsonl";
