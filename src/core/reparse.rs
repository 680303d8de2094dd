//! # Re-parse Module / 重新解析模块
//!
//! Rebuilds the summary of an existing run from its `raw/` artifacts with the current parser,
//! e.g. after the parser learned a payload shape that was once recorded as
//! `invalid_raw_output`. The output goes to a fresh
//! `<results_dir>/reparsed/<target>-<run>/<now>/`; the source run is only read.
//!
//! 使用当前的解析器，从已有运行的 `raw/` 产物重建其摘要，例如在解析器学会了一种曾被记录为
//! `invalid_raw_output` 的负载格式之后。输出写入一个新的派生目录；源运行只会被读取。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::compare::{ComparisonSource, SOURCES_FILE};
use crate::core::error::BenchError;
use crate::core::models::{ErrorKind, Operation, TrialResult, TrialSpec};
use crate::core::parser::parse_raw_output;
use crate::core::planner::{PLAN_JSON, TrialPlan};
use crate::core::store::{
    self, METADATA_FILE, RAW_DIR, REPARSED_DIR, SUMMARY_FILE, read_summary, write_json_new,
};
use crate::infra::redact::Redactor;

const RAW_EXTENSION: &str = "json";

/// A written re-parse.
/// 一次已写入的重新解析。
#[derive(Debug, Clone)]
pub struct Reparsed {
    pub path: PathBuf,
    pub summary_path: PathBuf,
    pub source: ComparisonSource,
    pub results: Vec<TrialResult>,
    /// Raw files whose names do not describe a trial / 文件名不描述任何试验的原始文件
    pub skipped: Vec<PathBuf>,
}

impl Reparsed {
    pub fn invalid_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.error == Some(ErrorKind::InvalidRawOutput))
            .count()
    }
}

/// Re-parses every raw artifact of `run_dir` and writes the rebuilt summary under
/// `results_dir/reparsed/`.
///
/// Entries the run recorded as `timeout`, `process_failed` or `spawn_failed` are carried over
/// unchanged, since their raw file never held a finished report. Exit codes and elapsed times
/// come from the run's own summary when it has one.
///
/// # Errors
/// * [`BenchError::Aggregation`] when `run_dir` has no `raw/` directory or no usable name
/// * [`BenchError::Store`] when a file cannot be read or the output cannot be written
///
/// 重新解析 `run_dir` 的每个原始产物，并将重建的摘要写入 `results_dir/reparsed/` 下。
/// 运行中记录为 `timeout`、`process_failed` 或 `spawn_failed` 的条目原样保留。
pub async fn reparse(
    results_dir: &Path,
    run_dir: &Path,
    redactor: &Redactor,
) -> Result<Reparsed, BenchError> {
    let (results, skipped, target) = rebuild(run_dir, redactor)?;

    let path = store::create_derived_dir(results_dir, REPARSED_DIR, run_dir).await?;
    let summary_path = path.join(SUMMARY_FILE);
    write_json_new(&summary_path, &results)?;

    let sealed = store::is_sealed(run_dir);
    if sealed {
        let metadata = run_dir.join(METADATA_FILE);
        let copy = path.join(METADATA_FILE);
        fs::copy(&metadata, &copy).map_err(|e| BenchError::store(&copy, e))?;
    }
    let source = ComparisonSource {
        target,
        run_dir: run_dir.to_path_buf(),
        timestamp: store::run_identity(run_dir)?.1,
        trial_count: results.len(),
        sealed,
    };
    write_json_new(&path.join(SOURCES_FILE), std::slice::from_ref(&source))?;
    tracing::info!(path = %path.display(), results = results.len(), "re-parse written");

    Ok(Reparsed {
        path,
        summary_path,
        source,
        results,
        skipped,
    })
}

/// Rebuilds the results of `run_dir` in canonical trial order without writing anything.
/// Returns the results, the raw files that were skipped, and the run's target.
///
/// 在不写入任何内容的情况下，按规范试验顺序重建 `run_dir` 的结果。
pub fn rebuild(
    run_dir: &Path,
    redactor: &Redactor,
) -> Result<(Vec<TrialResult>, Vec<PathBuf>, String), BenchError> {
    let raw_dir = run_dir.join(RAW_DIR);
    if !raw_dir.is_dir() {
        return Err(BenchError::aggregation(format!(
            "'{}' is not a run directory (no {RAW_DIR}/)",
            run_dir.display()
        )));
    }
    let (target, _) = store::run_identity(run_dir)?;
    let planned = planned_specs(run_dir)?;

    let summary = run_dir.join(SUMMARY_FILE);
    let mut recorded: HashMap<_, TrialResult> = if summary.is_file() {
        read_summary(&summary)?
            .into_iter()
            .map(|result| (result_identity(&result), result))
            .collect()
    } else {
        HashMap::new()
    };

    let mut artifacts = raw_artifacts(&raw_dir)?;
    artifacts.sort();

    let mut results = Vec::with_capacity(artifacts.len());
    let mut skipped = Vec::new();
    for artifact in artifacts {
        let spec = artifact
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| {
                planned
                    .get(stem)
                    .cloned()
                    .or_else(|| spec_from_stem(&target, stem))
            });
        let Some(spec) = spec else {
            tracing::warn!(file = %artifact.display(), "raw file does not name a trial; skipped");
            skipped.push(artifact);
            continue;
        };

        let previous = recorded.remove(&spec_identity(&spec));
        if let Some(previous) = previous.as_ref().filter(|r| kept_as_recorded(r)) {
            results.push(previous.clone());
            continue;
        }

        let bytes = fs::read(&artifact).map_err(|e| BenchError::store(&artifact, e))?;
        let raw = String::from_utf8_lossy(&bytes);
        let mut result = parse_raw_output(&spec, &raw, redactor);
        if let Some(previous) = previous {
            result.exit_code = previous.exit_code;
            result.elapsed_secs = previous.elapsed_secs;
        }
        results.push(result);
    }
    // Recorded results whose raw file is gone are still part of the run.
    results.extend(recorded.into_values());

    for result in &mut results {
        result.target = target.clone();
    }
    results.sort_by_key(TrialResult::trial_key);
    Ok((results, skipped, target))
}

/// Failures decided by the supervisor rather than by the payload.
fn kept_as_recorded(result: &TrialResult) -> bool {
    matches!(
        result.error,
        Some(ErrorKind::Timeout | ErrorKind::ProcessFailed | ErrorKind::SpawnFailed)
    )
}

type Identity = (Operation, String, u32, u32);

fn result_identity(result: &TrialResult) -> Identity {
    (
        result.operation,
        result.object_size.clone(),
        result.concurrency,
        result.iteration,
    )
}

fn spec_identity(spec: &TrialSpec) -> Identity {
    (
        spec.operation,
        spec.object_size.token().to_string(),
        spec.concurrency,
        spec.iteration,
    )
}

/// The persisted plan, keyed by artifact stem. Empty when the run has no `plan.json`.
fn planned_specs(run_dir: &Path) -> Result<HashMap<String, TrialSpec>, BenchError> {
    let path = run_dir.join(PLAN_JSON);
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let bytes = fs::read(&path).map_err(|e| BenchError::store(&path, e))?;
    let plan: TrialPlan = serde_json::from_slice(&bytes).map_err(|e| {
        BenchError::store(
            &path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })?;
    Ok(plan
        .trials
        .into_iter()
        .map(|spec| (spec.artifact_stem(), spec))
        .collect())
}

fn raw_artifacts(raw_dir: &Path) -> Result<Vec<PathBuf>, BenchError> {
    let entries = fs::read_dir(raw_dir).map_err(|e| BenchError::store(raw_dir, e))?;
    let mut artifacts = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| BenchError::store(raw_dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == RAW_EXTENSION) {
            artifacts.push(path);
        }
    }
    Ok(artifacts)
}

/// Recovers a trial from an artifact stem such as `get_1MiB_c8_i2` when no plan is available.
///
/// 在没有计划可用时，从 `get_1MiB_c8_i2` 这样的产物文件名主干恢复试验。
pub fn spec_from_stem(target: &str, stem: &str) -> Option<TrialSpec> {
    let (rest, iteration) = stem.rsplit_once("_i")?;
    let (rest, concurrency) = rest.rsplit_once("_c")?;
    let (operation, size) = rest.split_once('_')?;
    Some(TrialSpec {
        target: target.to_string(),
        operation: operation.parse().ok()?,
        object_size: size.parse().ok()?,
        concurrency: concurrency.parse().ok()?,
        iteration: iteration.parse().ok()?,
        duration_secs: None,
    })
}
