//! # Error Taxonomy Module / 错误分类模块
//!
//! Fatal errors of a benchmark campaign. Trial-level failures (timeouts, non-zero exits,
//! malformed output) are *not* represented here: they are recorded as data through
//! [`crate::core::models::ErrorKind`] and never interrupt the campaign.
//!
//! 基准测试活动的致命错误。试验级别的失败（超时、非零退出、输出格式错误）
//! 不在此表示：它们通过 [`crate::core::models::ErrorKind`] 作为数据记录，不会中断活动。

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a campaign (or the comparison step) with a non-zero exit code.
/// 以非零退出码中止活动（或比较步骤）的错误。
#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid, missing or placeholder configuration. Raised before any trial runs.
    /// 无效、缺失或占位符配置。在任何试验运行之前引发。
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The comparison step could not resolve its inputs.
    /// 比较步骤无法解析其输入。
    #[error("aggregation failure: {0}")]
    Aggregation(String),

    /// The result store could not be written or read.
    /// 无法写入或读取结果存储。
    #[error("result store error at {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The campaign was interrupted by the user before the matrix completed.
    #[error("campaign interrupted before the matrix completed")]
    Interrupted,
}

impl BenchError {
    pub fn config(message: impl Into<String>) -> Self {
        BenchError::Configuration(message.into())
    }

    pub fn aggregation(message: impl Into<String>) -> Self {
        BenchError::Aggregation(message.into())
    }

    pub fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BenchError::Store {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for configuration errors, which must be raised before any subprocess.
    pub fn is_configuration(&self) -> bool {
        matches!(self, BenchError::Configuration(_))
    }
}
