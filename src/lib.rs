//! # S3 Matrix Bench Library / S3 矩阵基准测试库
//!
//! This library provides the benchmark execution engine behind `s3-matrix-bench`: it drives
//! an external object-storage load generator over a matrix of operations, object sizes and
//! concurrency levels, supervises every invocation under a hard time bound, and keeps a
//! crash-safe, timestamped history of normalized results that can be compared across targets.
//!
//! 此库提供 `s3-matrix-bench` 背后的基准测试执行引擎：它针对由操作、对象大小和并发级别组成的矩阵
//! 驱动外部对象存储负载生成器，在硬性时间限制下监督每次调用，并保存可在目标之间比较的、
//! 崩溃安全的、带时间戳的规范化结果历史。
//!
//! ## Modules / 模块
//!
//! - `core` - Data models, configuration, planning, supervision, parsing, result store
//! - `infra` - Subprocess control, atomic file writes, redaction, logging, i18n
//! - `reporting` - Console output and the external report renderer
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 数据模型、配置、计划、监督、解析、结果存储
//! - `infra` - 子进程控制、原子文件写入、脱敏、日志、国际化
//! - `reporting` - 控制台输出和外部报告渲染器
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::config;
pub use crate::core::error::BenchError;
pub use crate::core::models;

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");

/// Selects the UI language.
///
/// `requested` (from `--lang` or the configuration file) wins when it names an available
/// locale; otherwise the system locale is used. Both are matched in full (e.g. "zh-CN") and
/// then by language code (e.g. "en" from "en-US"), falling back to "en".
///
/// 选择界面语言。`requested`（来自 `--lang` 或配置文件）在指向可用语言时优先；否则使用系统语言。
pub fn init_locale(requested: Option<&str>) {
    let system = sys_locale::get_locale();
    let lang = requested
        .and_then(match_locale)
        .or_else(|| system.as_deref().and_then(match_locale))
        .unwrap_or("en");
    rust_i18n::set_locale(lang);
}

/// Maps a locale tag onto one of the bundled locales.
/// 将语言标签映射到内置语言之一。
pub fn match_locale(locale: &str) -> Option<&'static str> {
    let available = rust_i18n::available_locales!();
    available
        .iter()
        .copied()
        .find(|candidate| candidate.eq_ignore_ascii_case(locale))
        .or_else(|| {
            let code = locale.split(['-', '_']).next()?;
            available
                .iter()
                .copied()
                .find(|candidate| candidate.eq_ignore_ascii_case(code))
        })
}
