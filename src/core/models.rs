//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the benchmark runner.
//! It includes models for trial specifications, normalized trial results, error kinds,
//! supervisor states, and the run metadata snapshot.
//!
//! 此模块定义了整个基准测试运行器中使用的核心数据结构。
//! 它包括试验规格、规范化的试验结果、错误类型、监督器状态以及运行元数据快照的模型。

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::BenchError;

/// The storage operations the load generator knows how to benchmark.
/// 负载生成器可以进行基准测试的存储操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Put,
    Get,
    Delete,
    List,
    Mixed,
}

impl Operation {
    /// Every supported operation, in canonical order.
    pub const ALL: [Operation; 5] = [
        Operation::Put,
        Operation::Get,
        Operation::Delete,
        Operation::List,
        Operation::Mixed,
    ];

    /// The subcommand name understood by the load generator.
    /// 负载生成器可识别的子命令名称。
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Put => "put",
            Operation::Get => "get",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| BenchError::config(format!("unknown operation '{}'", s.trim())))
    }
}

/// An object size as written by the user (e.g. `1MiB`), validated and resolved to bytes.
/// The original token is kept verbatim because it is what the load generator receives
/// and what names the raw artifacts.
///
/// 用户书写的对象大小（例如 `1MiB`），经过验证并解析为字节数。
/// 原始标记被原样保留，因为负载生成器接收的就是它，原始产物也以它命名。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectSize {
    token: String,
    bytes: u64,
}

impl ObjectSize {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl FromStr for ObjectSize {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() {
            return Err(BenchError::config("object size must not be empty"));
        }
        let parsed: ByteSize = token
            .parse()
            .map_err(|e| BenchError::config(format!("invalid object size '{token}': {e}")))?;
        if parsed.as_u64() == 0 {
            return Err(BenchError::config(format!(
                "object size '{token}' must be greater than zero"
            )));
        }
        Ok(ObjectSize {
            token: token.to_string(),
            bytes: parsed.as_u64(),
        })
    }
}

impl TryFrom<String> for ObjectSize {
    type Error = BenchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectSize> for String {
    fn from(value: ObjectSize) -> Self {
        value.token
    }
}

impl fmt::Display for ObjectSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// One planned, immutable invocation of the load generator.
/// 负载生成器的一次已计划的、不可变的调用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSpec {
    /// Name of the target this trial runs against / 此试验针对的目标名称
    pub target: String,
    pub operation: Operation,
    pub object_size: ObjectSize,
    /// Number of concurrent load-generator workers / 负载生成器的并发工作者数量
    pub concurrency: u32,
    /// 1-based repetition ordinal / 从 1 开始的重复序号
    pub iteration: u32,
    /// Per-operation duration override in seconds. `None` means the run-level default.
    /// 按操作覆盖的持续时间（秒）。`None` 表示使用运行级别的默认值。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

impl TrialSpec {
    /// File stem shared by every artifact of this trial, e.g. `get_1MiB_c8_i2`.
    /// 此试验所有产物共用的文件名主干，例如 `get_1MiB_c8_i2`。
    pub fn artifact_stem(&self) -> String {
        let size = self
            .object_size
            .token()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
            .collect::<String>();
        format!(
            "{}_{}_c{}_i{}",
            self.operation, size, self.concurrency, self.iteration
        )
    }

    /// Short human-readable label for progress lines.
    pub fn label(&self) -> String {
        format!(
            "{} {} c={} i={}",
            self.operation, self.object_size, self.concurrency, self.iteration
        )
    }
}

/// Latency percentiles in milliseconds. Serialized flat into [`TrialResult`] because the
/// report renderer reads `avg_latency_ms`, `p50_latency_ms`, ... as top-level columns.
///
/// 以毫秒为单位的延迟百分位数。扁平化序列化到 [`TrialResult`] 中，
/// 因为报告渲染器将 `avg_latency_ms`、`p50_latency_ms` 等作为顶级列读取。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Latency {
    #[serde(rename = "avg_latency_ms")]
    pub avg: f64,
    #[serde(rename = "p50_latency_ms")]
    pub p50: f64,
    #[serde(rename = "p90_latency_ms")]
    pub p90: f64,
    #[serde(rename = "p99_latency_ms")]
    pub p99: f64,
}

/// Why a trial did not produce metrics. Recorded as data, never raised.
/// 试验未产生指标的原因。作为数据记录，从不抛出。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The subprocess outlived `expected duration + safety buffer` and was terminated.
    /// 子进程的运行时间超过了 `预期持续时间 + 安全缓冲`，已被终止。
    Timeout,
    /// The subprocess exited with a non-zero status.
    /// 子进程以非零状态退出。
    ProcessFailed,
    /// The subprocess exited cleanly but its output carried no usable result payload.
    /// 子进程正常退出，但其输出不包含可用的结果负载。
    InvalidRawOutput,
    /// The load generator could not be started at all.
    /// 负载生成器根本无法启动。
    SpawnFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::ProcessFailed => "process_failed",
            ErrorKind::InvalidRawOutput => "invalid_raw_output",
            ErrorKind::SpawnFailed => "spawn_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized, fixed-schema outcome of one trial.
/// Every metric defaults to zero so downstream aggregation never meets a missing key.
///
/// 一次试验的规范化、固定模式的结果。
/// 每个指标默认为零，因此下游聚合永远不会遇到缺失的键。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub target: String,
    pub operation: Operation,
    pub object_size: String,
    pub concurrency: u32,
    pub iteration: u32,
    /// MiB per second / 每秒 MiB
    #[serde(default)]
    pub throughput_mbps: f64,
    #[serde(default)]
    pub ops_per_sec: f64,
    #[serde(flatten)]
    pub latency: Latency,
    #[serde(default)]
    pub total_operations: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub error_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Bounded, redacted tail of the raw payload for failed trials.
    /// 失败试验的原始负载的有界、已脱敏尾部。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Wall-clock seconds spent in the Running state / 在运行状态中花费的挂钟秒数
    #[serde(default)]
    pub elapsed_secs: f64,
}

impl TrialResult {
    /// A result for `spec` with every metric zeroed.
    /// 为 `spec` 创建一个所有指标都为零的结果。
    pub fn zeroed(spec: &TrialSpec) -> Self {
        Self {
            target: spec.target.clone(),
            operation: spec.operation,
            object_size: spec.object_size.token().to_string(),
            concurrency: spec.concurrency,
            iteration: spec.iteration,
            throughput_mbps: 0.0,
            ops_per_sec: 0.0,
            latency: Latency::default(),
            total_operations: 0,
            errors: 0,
            error_rate: 0.0,
            error: None,
            diagnostic: None,
            exit_code: None,
            elapsed_secs: 0.0,
        }
    }

    /// An error-kind result. The error rate is pinned to 1.0 so a failed trial can never be
    /// mistaken for a clean one by the renderer.
    ///
    /// 一个错误类型的结果。错误率固定为 1.0，这样渲染器永远不会把失败的试验误认为是成功的。
    pub fn failed(spec: &TrialSpec, kind: ErrorKind, diagnostic: Option<String>) -> Self {
        Self {
            error_rate: 1.0,
            error: Some(kind),
            diagnostic,
            ..Self::zeroed(spec)
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Identity of the trial this result belongs to, ignoring the target.
    /// Orders like the plan does: operation, then size (by bytes), concurrency, iteration.
    ///
    /// 此结果所属试验的标识（忽略目标）。排序方式与计划相同：操作、大小（按字节）、并发、迭代。
    pub fn trial_key(&self) -> (Operation, u64, String, u32, u32) {
        let bytes = self
            .object_size
            .parse::<ObjectSize>()
            .map(|size| size.bytes())
            .unwrap_or(u64::MAX);
        (
            self.operation,
            bytes,
            self.object_size.clone(),
            self.concurrency,
            self.iteration,
        )
    }
}

/// Lifecycle of one supervised trial:
/// `Idle → [Warming] → Running → {Completed, TimedOut, Failed}`.
///
/// 单个受监督试验的生命周期。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Idle,
    Warming,
    Running,
    Completed,
    TimedOut,
    Failed,
}

impl TrialState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrialState::Completed | TrialState::TimedOut | TrialState::Failed
        )
    }
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How far the termination escalation had to go before the process died.
/// 终止升级在进程死亡之前进行到了哪一步。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Escalation {
    /// The process exited on its own.
    None,
    /// The process exited within the grace period after SIGTERM.
    Graceful,
    /// The process had to be SIGKILLed.
    Forced,
}

/// Configuration values captured into `metadata.json`. Secrets are masked.
/// 记录到 `metadata.json` 中的配置值。密钥已被掩码。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    pub endpoint: String,
    pub bucket: String,
    pub region: Option<String>,
    pub tls: bool,
    pub path_style: bool,
    pub access_key: String,
    pub operations: Vec<Operation>,
    pub sizes: Vec<String>,
    pub concurrency: Vec<u32>,
    pub iterations: u32,
    pub duration_secs: u64,
    pub warmup_secs: u64,
    pub skip_cleanup: bool,
}

/// Host facts captured into `metadata.json`.
/// 记录到 `metadata.json` 中的主机信息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub kernel: String,
    pub load_generator_version: String,
    pub tool_version: String,
}

/// The finalization-time document sealing a run directory.
/// 封存运行目录的最终化文档。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub target: String,
    pub timestamp: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub trial_count: usize,
    pub error_count: usize,
    pub configuration: ConfigurationSnapshot,
    pub environment: EnvironmentInfo,
}
