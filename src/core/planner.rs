//! # Test Matrix Planner Module / 测试矩阵计划模块
//!
//! This module expands the configured matrix dimensions into an explicit, ordered
//! sequence of [`TrialSpec`]s and persists that plan before any trial is executed,
//! so that every run can be audited and reproduced independently of its outcome.
//!
//! 此模块将配置的矩阵维度展开为明确的、有序的 [`TrialSpec`] 序列，
//! 并在执行任何试验之前持久化该计划，使每次运行都可以独立于其结果进行审计和复现。

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::core::config::MatrixSettings;
use crate::core::error::BenchError;
use crate::core::models::{ObjectSize, Operation, TrialSpec};
use crate::infra::fs::write_atomic;

/// Machine-readable plan file name / 机器可读的计划文件名
pub const PLAN_JSON: &str = "plan.json";
/// Human-readable plan file name / 人类可读的计划文件名
pub const PLAN_TEXT: &str = "plan.txt";

/// Represents the complete, pre-materialized trial sequence for one target.
/// 表示一个目标的完整的、预先物化的试验序列。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialPlan {
    pub target: String,
    /// Run-level default duration in seconds / 运行级别的默认持续时间（秒）
    pub default_duration_secs: u64,
    pub warmup_secs: u64,
    pub trials: Vec<TrialSpec>,
}

impl TrialPlan {
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Writes `plan.json` and `plan.txt` into `dir`.
    /// 将 `plan.json` 和 `plan.txt` 写入 `dir`。
    pub fn persist(&self, dir: &Path) -> Result<(PathBuf, PathBuf), BenchError> {
        let json_path = dir.join(PLAN_JSON);
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| BenchError::store(&json_path, std::io::Error::other(e)))?;
        write_atomic(&json_path, &json)?;

        let text_path = dir.join(PLAN_TEXT);
        write_atomic(&text_path, self.render_table().as_bytes())?;

        Ok((json_path, text_path))
    }

    /// Renders the plan as a fixed-width table.
    ///
    /// ```text
    /// Target: aws  (24 trials, default duration 60s, warmup 0s)
    ///     #  operation  size      concurrency  iteration  duration
    ///     1  put        4KiB                8          1       60s
    /// ```
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Target: {}  ({} trials, default duration {}s, warmup {}s)",
            self.target,
            self.trials.len(),
            self.default_duration_secs,
            self.warmup_secs
        );
        let _ = writeln!(
            out,
            "{:>5}  {:<9}  {:<8}  {:>11}  {:>9}  {:>8}",
            "#", "operation", "size", "concurrency", "iteration", "duration"
        );
        for (i, spec) in self.trials.iter().enumerate() {
            let duration = spec.duration_secs.unwrap_or(self.default_duration_secs);
            let _ = writeln!(
                out,
                "{:>5}  {:<9}  {:<8}  {:>11}  {:>9}  {:>7}s",
                i + 1,
                spec.operation.as_str(),
                spec.object_size.token(),
                spec.concurrency,
                spec.iteration,
                duration
            );
        }
        out
    }
}

/// Creates the trial plan for one target.
///
/// Trials are nested in canonical order: operation → size → concurrency → iteration.
/// The same inputs always produce the same sequence.
///
/// # Errors
/// Returns [`BenchError::Configuration`] when any dimension is empty, the iteration count, a
/// concurrency level or a duration is zero, or a size/operation token is invalid. An empty matrix is never
/// silently turned into a successful zero-trial run.
///
/// 为一个目标创建试验计划。
/// 试验按规范顺序嵌套：操作 → 大小 → 并发 → 迭代。相同的输入总是产生相同的序列。
pub fn plan_trials(target: &str, matrix: &MatrixSettings) -> Result<TrialPlan, BenchError> {
    if matrix.operations.is_empty() {
        return Err(BenchError::config("the operation list is empty"));
    }
    if matrix.sizes.is_empty() {
        return Err(BenchError::config("the object size list is empty"));
    }
    if matrix.concurrency.is_empty() {
        return Err(BenchError::config("the concurrency list is empty"));
    }
    if matrix.iterations == 0 {
        return Err(BenchError::config("the iteration count must be at least 1"));
    }
    if matrix.concurrency.contains(&0) {
        return Err(BenchError::config("concurrency levels must be positive"));
    }
    if matrix.duration_secs == 0 {
        return Err(BenchError::config("the trial duration must be at least 1 second"));
    }

    let operations = matrix
        .operations
        .iter()
        .map(|op| op.parse::<Operation>())
        .collect::<Result<Vec<_>, _>>()?;
    let sizes = matrix
        .sizes
        .iter()
        .map(|size| size.parse::<ObjectSize>())
        .collect::<Result<Vec<_>, _>>()?;

    // Duplicates would make two trials share one raw artifact name.
    if has_duplicates(&operations) {
        return Err(BenchError::config("the operation list contains duplicates"));
    }
    if has_duplicates(&sizes) {
        return Err(BenchError::config("the object size list contains duplicates"));
    }
    if has_duplicates(&matrix.concurrency) {
        return Err(BenchError::config("the concurrency list contains duplicates"));
    }

    let mut overrides = Vec::with_capacity(matrix.durations.len());
    for (name, secs) in &matrix.durations {
        if *secs == 0 {
            return Err(BenchError::config(format!(
                "the duration override for '{name}' must be at least 1 second"
            )));
        }
        overrides.push((name.parse::<Operation>()?, *secs));
    }
    let duration_for = |op: Operation| {
        overrides
            .iter()
            .find(|(o, _)| *o == op)
            .map(|(_, secs)| *secs)
    };

    let capacity =
        operations.len() * sizes.len() * matrix.concurrency.len() * matrix.iterations as usize;
    let mut trials = Vec::with_capacity(capacity);
    for &operation in &operations {
        for size in &sizes {
            for &concurrency in &matrix.concurrency {
                for iteration in 1..=matrix.iterations {
                    trials.push(TrialSpec {
                        target: target.to_string(),
                        operation,
                        object_size: size.clone(),
                        concurrency,
                        iteration,
                        duration_secs: duration_for(operation),
                    });
                }
            }
        }
    }

    Ok(TrialPlan {
        target: target.to_string(),
        default_duration_secs: matrix.duration_secs,
        warmup_secs: matrix.warmup_secs,
        trials,
    })
}

fn has_duplicates<T: PartialEq>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| items[..i].contains(item))
}
