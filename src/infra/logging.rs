//! # Diagnostic Logging Module / 诊断日志模块
//!
//! Installs the `tracing` subscriber used for diagnostic logs (state transitions, heartbeats,
//! escalation, spawned commands). Logs go to stderr so they never mix with the progress lines
//! on stdout. `RUST_LOG` takes precedence over the verbosity flag.
//!
//! 安装用于诊断日志（状态转换、心跳、升级、派生的命令）的 `tracing` 订阅器。
//! 日志输出到 stderr，因此不会与 stdout 上的进度行混在一起。`RUST_LOG` 优先于详细程度标志。

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directive for a verbosity level: `0` warn, `1` debug, `2+` trace.
/// 详细程度对应的默认指令：`0` 为 warn，`1` 为 debug，`2+` 为 trace。
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "s3_matrix_bench=warn",
        1 => "s3_matrix_bench=debug",
        _ => "s3_matrix_bench=trace",
    }
}

/// Initializes the global subscriber. Calling it twice is harmless.
/// 初始化全局订阅器。重复调用是无害的。
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}
