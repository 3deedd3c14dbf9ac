use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

impl From<&crate::config::Config> for LogConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            log_level: config.log_level.clone(),
            enable_file_logs: config.enable_file_logs,
            log_dir: config.log_dir.clone(),
        }
    }
}

/// 初始化全局 subscriber；重复调用是 no-op
pub fn init_tracing(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // worker 跑在独立线程上，线程名便于区分采集循环与 HTTP 处理
    let stdout_layer = fmt::layer().with_target(true).with_thread_names(true);

    let registry = Registry::default().with(env_filter).with(stdout_layer);

    let result = if config.enable_file_logs {
        match RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("peek-guard")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&config.log_dir)
        {
            Ok(file_appender) => {
                let file_layer = fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .json();
                registry.with(file_layer).try_init()
            }
            Err(e) => {
                eprintln!(
                    "failed to create log directory {}: {e}; file logs disabled",
                    config.log_dir
                );
                registry.try_init()
            }
        }
    } else {
        registry.try_init()
    };

    if let Err(e) = result {
        let msg = e.to_string();
        if !msg.contains("already been set") {
            panic!("Failed to initialize tracing: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let cfg = LogConfig::default();
        init_tracing(&cfg);
        init_tracing(&cfg);
    }

    #[test]
    fn file_logs_into_temp_dir() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cfg = LogConfig {
            log_level: "debug".to_string(),
            enable_file_logs: true,
            log_dir: tmp.path().to_string_lossy().to_string(),
        };
        init_tracing(&cfg);
    }
}
