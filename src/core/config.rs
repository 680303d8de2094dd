//! # Configuration Module / 配置模块
//!
//! Parsing of the `BenchMatrix.toml` file and construction of the immutable
//! [`RunConfiguration`] that every component receives a slice of.
//!
//! 解析 `BenchMatrix.toml` 文件，并构造不可变的 [`RunConfiguration`]，
//! 每个组件只接收其中需要的部分。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::BenchError;

/// The default name for the benchmark matrix configuration file.
/// 基准矩阵配置文件的默认名称。
pub const CONFIG_FILE_NAME: &str = "BenchMatrix.toml";

/// Connection settings for one named storage endpoint under test.
/// 被测试的一个命名存储端点的连接设置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TargetConfig {
    /// `host[:port]`, optionally prefixed with `http://` or `https://`.
    /// `host[:port]`，可选地以 `http://` 或 `https://` 为前缀。
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Use HTTPS. Implied when the endpoint carries an `https://` scheme.
    /// 使用 HTTPS。当端点带有 `https://` 前缀时隐含启用。
    #[serde(default)]
    pub tls: bool,
    /// Path-style bucket addressing instead of virtual-host style.
    /// 使用路径样式的存储桶寻址，而非虚拟主机样式。
    #[serde(default)]
    pub path_style: bool,
}

impl TargetConfig {
    /// The endpoint without scheme or trailing slash, as the load generator expects it.
    /// 去掉协议前缀和末尾斜杠的端点，符合负载生成器的期望格式。
    pub fn host(&self) -> &str {
        let endpoint = self.endpoint.trim();
        let endpoint = endpoint
            .strip_prefix("https://")
            .or_else(|| endpoint.strip_prefix("http://"))
            .unwrap_or(endpoint);
        endpoint.trim_end_matches('/')
    }

    pub fn uses_tls(&self) -> bool {
        self.tls || self.endpoint.trim().starts_with("https://")
    }

    /// `host:port` for a TCP reachability probe, defaulting the port from the scheme.
    /// 用于 TCP 可达性探测的 `host:port`，端口根据协议默认选择。
    pub fn socket_address(&self) -> String {
        let host = self.host();
        let has_port = match host.rfind(':') {
            // A bracketed IPv6 literal only carries a port after the closing bracket.
            Some(idx) => !host.contains(']') || host[..idx].ends_with(']'),
            None => false,
        };
        if has_port {
            host.to_string()
        } else if self.uses_tls() {
            format!("{host}:443")
        } else {
            format!("{host}:80")
        }
    }

    /// Expands `${VAR}` and `~` in every string field.
    /// 展开每个字符串字段中的 `${VAR}` 和 `~`。
    pub fn expanded(&self, name: &str) -> Result<TargetConfig, BenchError> {
        let expand = |field: &str, value: &str| -> Result<String, BenchError> {
            shellexpand::full(value)
                .map(|v| v.into_owned())
                .map_err(|e| {
                    BenchError::config(format!("target '{name}': cannot expand {field}: {e}"))
                })
        };
        Ok(TargetConfig {
            endpoint: expand("endpoint", &self.endpoint)?,
            access_key: expand("access_key", &self.access_key)?,
            secret_key: expand("secret_key", &self.secret_key)?,
            bucket: expand("bucket", &self.bucket)?,
            region: self
                .region
                .as_deref()
                .map(|r| expand("region", r))
                .transpose()?,
            tls: self.tls,
            path_style: self.path_style,
        })
    }

    /// The literal secret values that must never reach an artifact or a log line.
    pub fn secrets(&self) -> Vec<String> {
        vec![self.access_key.clone(), self.secret_key.clone()]
    }
}

/// A target together with the name it was selected by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTarget {
    pub name: String,
    pub config: TargetConfig,
}

/// How to invoke the external load generator.
/// 如何调用外部负载生成器。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoadGenerator {
    #[serde(default = "default_program")]
    pub program: String,
    /// Extra arguments appended verbatim to every invocation.
    /// 原样追加到每次调用的额外参数。
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for LoadGenerator {
    fn default() -> Self {
        Self {
            program: default_program(),
            extra_args: vec![],
        }
    }
}

/// The dimensions of the test matrix.
/// 测试矩阵的维度。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatrixSettings {
    #[serde(default = "default_operations")]
    pub operations: Vec<String>,
    #[serde(default = "default_sizes")]
    pub sizes: Vec<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency: Vec<u32>,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Run-level default trial duration in seconds / 运行级别的默认试验持续时间（秒）
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Warmup duration in seconds; `0` disables warmup / 预热持续时间（秒）；`0` 表示禁用预热
    #[serde(default)]
    pub warmup_secs: u64,
    /// Per-operation duration overrides, keyed by operation name.
    /// 按操作名称键入的持续时间覆盖。
    #[serde(default)]
    pub durations: BTreeMap<String, u64>,
}

impl Default for MatrixSettings {
    fn default() -> Self {
        Self {
            operations: default_operations(),
            sizes: default_sizes(),
            concurrency: default_concurrency(),
            iterations: default_iterations(),
            duration_secs: default_duration_secs(),
            warmup_secs: 0,
            durations: BTreeMap::new(),
        }
    }
}

/// Supervisor timing as written in the configuration file, in seconds.
/// 配置文件中书写的监督器时间设置（秒）。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_timeout_buffer_secs")]
    pub timeout_buffer_secs: u64,
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
            timeout_buffer_secs: default_timeout_buffer_secs(),
            grace_secs: default_grace_secs(),
        }
    }
}

/// Supervisor timing resolved to [`Duration`]s.
/// 解析为 [`Duration`] 的监督器时间设置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Interval between liveness polls / 存活轮询之间的间隔
    pub heartbeat: Duration,
    /// Added to the expected duration to form the hard timeout / 加到预期持续时间上形成硬超时
    pub safety_buffer: Duration,
    /// Time between SIGTERM and SIGKILL / SIGTERM 与 SIGKILL 之间的时间
    pub grace_period: Duration,
}

impl From<&SupervisorConfig> for SupervisorSettings {
    fn from(value: &SupervisorConfig) -> Self {
        Self {
            heartbeat: Duration::from_secs(value.heartbeat_secs.max(1)),
            safety_buffer: Duration::from_secs(value.timeout_buffer_secs),
            grace_period: Duration::from_secs(value.grace_secs),
        }
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self::from(&SupervisorConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PreflightSettings {
    /// Open a TCP connection to every target before the first trial.
    /// 在第一次试验之前与每个目标建立 TCP 连接。
    #[serde(default = "default_true")]
    pub check_reachability: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for PreflightSettings {
    fn default() -> Self {
        Self {
            check_reachability: true,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// The external report renderer.
/// 外部报告渲染器。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReportSettings {
    /// Command line of the renderer; `--input/--output/--charts/--targets` are appended.
    /// 渲染器的命令行；会追加 `--input/--output/--charts/--targets` 参数。
    #[serde(default)]
    pub command: Option<String>,
}

/// Represents the entire benchmark configuration, loaded from a TOML file.
/// 代表从 TOML 文件加载的整个基准测试配置。
#[derive(Debug, Deserialize, Serialize)]
pub struct BenchMatrix {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,

    /// Root directory of the result history / 结果历史的根目录
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    #[serde(default)]
    pub load_generator: LoadGenerator,

    #[serde(default)]
    pub matrix: MatrixSettings,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub preflight: PreflightSettings,

    #[serde(default)]
    pub report: ReportSettings,

    /// All known targets, keyed by name / 所有已知目标，按名称键入
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

impl Default for BenchMatrix {
    fn default() -> Self {
        Self {
            language: default_language(),
            results_dir: default_results_dir(),
            load_generator: LoadGenerator::default(),
            matrix: MatrixSettings::default(),
            supervisor: SupervisorConfig::default(),
            preflight: PreflightSettings::default(),
            report: ReportSettings::default(),
            targets: BTreeMap::new(),
        }
    }
}

/// Values given on the command line that take precedence over the file.
/// 在命令行上给出的、优先于配置文件的值。
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub results_dir: Option<PathBuf>,
    pub duration_secs: Option<u64>,
    pub warmup_secs: Option<u64>,
    pub sizes: Option<Vec<String>>,
    pub concurrency: Option<Vec<u32>>,
    pub iterations: Option<u32>,
    pub operations: Option<Vec<String>>,
    pub skip_cleanup: bool,
}

/// The single immutable value a campaign is driven by.
/// 驱动一次活动的唯一不可变值。
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    pub results_dir: PathBuf,
    pub matrix: MatrixSettings,
    pub supervisor: SupervisorSettings,
    pub load_generator: LoadGenerator,
    pub preflight: PreflightSettings,
    pub report: ReportSettings,
    pub skip_cleanup: bool,
    /// Selected targets in the order they were requested / 按请求顺序排列的所选目标
    pub targets: Vec<NamedTarget>,
}

impl RunConfiguration {
    /// Merges the file with the command-line overrides and resolves the selected targets.
    ///
    /// # Errors
    /// Returns [`BenchError::Configuration`] when a selected target is not defined or one of
    /// its values cannot be expanded.
    ///
    /// 将配置文件与命令行覆盖合并，并解析所选目标。
    pub fn resolve(
        file: &BenchMatrix,
        overrides: CliOverrides,
        selected: &[String],
    ) -> Result<Self, BenchError> {
        let mut matrix = file.matrix.clone();
        if let Some(duration) = overrides.duration_secs {
            matrix.duration_secs = duration;
        }
        if let Some(warmup) = overrides.warmup_secs {
            matrix.warmup_secs = warmup;
        }
        if let Some(sizes) = overrides.sizes {
            matrix.sizes = sizes;
        }
        if let Some(concurrency) = overrides.concurrency {
            matrix.concurrency = concurrency;
        }
        if let Some(iterations) = overrides.iterations {
            matrix.iterations = iterations;
        }
        if let Some(operations) = overrides.operations {
            matrix.operations = operations;
        }

        let mut targets = Vec::with_capacity(selected.len());
        for name in selected {
            if targets.iter().any(|t: &NamedTarget| &t.name == name) {
                continue;
            }
            let raw = file.targets.get(name).ok_or_else(|| {
                BenchError::config(format!("target '{name}' is not defined in the configuration"))
            })?;
            targets.push(NamedTarget {
                name: name.clone(),
                config: raw.expanded(name)?,
            });
        }

        Ok(Self {
            results_dir: overrides
                .results_dir
                .unwrap_or_else(|| file.results_dir.clone()),
            matrix,
            supervisor: SupervisorSettings::from(&file.supervisor),
            load_generator: file.load_generator.clone(),
            preflight: file.preflight.clone(),
            report: file.report.clone(),
            skip_cleanup: overrides.skip_cleanup,
            targets,
        })
    }
}

/// Reads and parses a configuration file.
/// 读取并解析配置文件。
pub fn load_bench_matrix(path: &Path) -> anyhow::Result<BenchMatrix> {
    let content = fs::read_to_string(path)?;
    let matrix: BenchMatrix = toml::from_str(&content)?;
    Ok(matrix)
}

/// Splits a comma-separated CLI list, dropping empty items.
/// 拆分以逗号分隔的 CLI 列表，丢弃空项。
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_program() -> String {
    "warp".to_string()
}

fn default_operations() -> Vec<String> {
    vec!["put".to_string(), "get".to_string()]
}

fn default_sizes() -> Vec<String> {
    vec!["4KiB".to_string(), "1MiB".to_string()]
}

fn default_concurrency() -> Vec<u32> {
    vec![8]
}

fn default_iterations() -> u32 {
    1
}

fn default_duration_secs() -> u64 {
    60
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_timeout_buffer_secs() -> u64 {
    300
}

fn default_grace_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}
