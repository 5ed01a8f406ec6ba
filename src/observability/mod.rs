//! 可观测性模块
//!
//! 提供结构化日志初始化和调度器指标（Prometheus 文本格式）。

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::config::LoggingConfig;
use crate::error::{AppError, Result};

// ===== Scheduler Metrics =====

/// 调度器指标
#[derive(Clone, Default)]
pub struct SchedulerMetrics {
    pub evaluations_total: Arc<AtomicU64>,
    pub reminders_delivered_total: Arc<AtomicU64>,
    pub reminders_failed_total: Arc<AtomicU64>,
    pub reminders_suppressed_total: Arc<AtomicU64>,
    pub snapshot_errors_total: Arc<AtomicU64>,
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub evaluations: u64,
    pub delivered: u64,
    pub failed: u64,
    pub suppressed: u64,
    pub snapshot_errors: u64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次完成的评估
    pub fn record_evaluation(&self, delivered: usize, failed: usize, suppressed: usize) {
        self.evaluations_total.fetch_add(1, Ordering::SeqCst);
        self.reminders_delivered_total
            .fetch_add(delivered as u64, Ordering::SeqCst);
        self.reminders_failed_total
            .fetch_add(failed as u64, Ordering::SeqCst);
        self.reminders_suppressed_total
            .fetch_add(suppressed as u64, Ordering::SeqCst);
    }

    /// 记录快照读取失败
    pub fn record_snapshot_error(&self) {
        self.snapshot_errors_total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            evaluations: self.evaluations_total.load(Ordering::SeqCst),
            delivered: self.reminders_delivered_total.load(Ordering::SeqCst),
            failed: self.reminders_failed_total.load(Ordering::SeqCst),
            suppressed: self.reminders_suppressed_total.load(Ordering::SeqCst),
            snapshot_errors: self.snapshot_errors_total.load(Ordering::SeqCst),
        }
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP scheduler_evaluations_total Completed scheduler evaluations
# TYPE scheduler_evaluations_total counter
scheduler_evaluations_total {}
# HELP reminders_delivered_total Reminders handed to the delivery sink
# TYPE reminders_delivered_total counter
reminders_delivered_total {}
# HELP reminders_failed_total Reminder deliveries that failed or timed out
# TYPE reminders_failed_total counter
reminders_failed_total {}
# HELP reminders_suppressed_total Due reminders skipped because they already fired this minute
# TYPE reminders_suppressed_total counter
reminders_suppressed_total {}
# HELP snapshot_errors_total Evaluations skipped because the reminder snapshot could not be read
# TYPE snapshot_errors_total counter
snapshot_errors_total {}
"#,
            s.evaluations, s.delivered, s.failed, s.suppressed, s.snapshot_errors,
        )
    }
}

// ===== Structured Logging =====

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 初始化日志
///
/// `RUST_LOG` 优先于配置中的级别。配置了 `log_dir` 时额外写入按天滚动的
/// 日志文件，返回的 guard 必须在进程退出前保持存活。
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AppError::Config(format!("无效的日志级别 '{}': {}", config.level, e)))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(if config.structured {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .boxed()
    });

    let guard = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt::layer().with_writer(writer).with_ansi(false).boxed());
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| AppError::Internal(format!("日志初始化失败: {}", e)))?;

    Ok(guard)
}
