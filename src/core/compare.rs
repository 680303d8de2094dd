//! # Comparison Module / 比较模块
//!
//! Merges the result stores of two or more targets into a derived comparison under
//! `<results_dir>/comparisons/<timestamp>/`. Source run directories are only ever read.
//!
//! 将两个或更多目标的结果存储合并到 `<results_dir>/comparisons/<timestamp>/` 下的派生比较中。
//! 源运行目录只会被读取。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::BenchError;
use crate::core::models::TrialResult;
use crate::core::store::{self, SUMMARY_FILE, create_timestamped_dir, read_summary, write_json_new};

/// Directory under the results root that holds every comparison.
pub const COMPARISONS_DIR: &str = "comparisons";
pub const SOURCES_FILE: &str = "sources.json";

/// Which run of a target takes part in a comparison.
/// 哪一次运行参与比较。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSelector {
    /// The most recent run of the named target / 命名目标的最近一次运行
    Latest(String),
    /// An explicit run directory; the target is its parent directory's name.
    /// 显式的运行目录；目标是其父目录的名称。
    Pinned(PathBuf),
}

/// Where one target's results came from, recorded in `sources.json`.
/// 一个目标的结果来源，记录在 `sources.json` 中。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSource {
    pub target: String,
    pub run_dir: PathBuf,
    pub timestamp: String,
    pub trial_count: usize,
    /// `false` when the run never wrote its `metadata.json` / 当运行从未写入其 `metadata.json` 时为 `false`
    pub sealed: bool,
}

/// A written comparison.
/// 一个已写入的比较。
#[derive(Debug, Clone)]
pub struct Comparison {
    pub path: PathBuf,
    pub summary_path: PathBuf,
    pub sources: Vec<ComparisonSource>,
    pub results: Vec<TrialResult>,
}

/// Resolves every selector to a run directory.
///
/// # Errors
/// [`BenchError::Aggregation`] when fewer than two runs are requested, a target has no prior
/// run, a pinned directory has no summary, or two selectors name the same target.
///
/// 将每个选择器解析为运行目录。
pub fn resolve_sources(
    results_dir: &Path,
    selectors: &[RunSelector],
) -> Result<Vec<(String, PathBuf)>, BenchError> {
    if selectors.len() < 2 {
        return Err(BenchError::aggregation(format!(
            "a comparison needs at least two runs, got {}",
            selectors.len()
        )));
    }

    let mut resolved: Vec<(String, PathBuf)> = Vec::with_capacity(selectors.len());
    for selector in selectors {
        let (target, run_dir) = match selector {
            RunSelector::Latest(target) => {
                let run_dir = store::latest_run(results_dir, target)?.ok_or_else(|| {
                    BenchError::aggregation(format!("target '{target}' has no prior runs"))
                })?;
                (target.clone(), run_dir)
            }
            RunSelector::Pinned(run_dir) => {
                if !run_dir.join(SUMMARY_FILE).is_file() {
                    return Err(BenchError::aggregation(format!(
                        "'{}' is not a run directory (no {SUMMARY_FILE})",
                        run_dir.display()
                    )));
                }
                let (target, _) = store::run_identity(run_dir)?;
                (target, run_dir.clone())
            }
        };
        if resolved.iter().any(|(t, _)| *t == target) {
            return Err(BenchError::aggregation(format!(
                "target '{target}' is selected more than once"
            )));
        }
        resolved.push((target, run_dir));
    }
    Ok(resolved)
}

/// Reads every source summary, tags each result with its target and sorts the union by target,
/// then canonical trial order. The order of `sources` does not affect the output.
///
/// 读取每个源摘要，用目标标记每个结果，并按目标和规范试验顺序对并集排序。`sources` 的顺序不影响输出。
pub fn merge(
    sources: &[(String, PathBuf)],
) -> Result<(Vec<ComparisonSource>, Vec<TrialResult>), BenchError> {
    let mut described = Vec::with_capacity(sources.len());
    let mut merged = Vec::new();
    for (target, run_dir) in sources {
        let results = read_summary(&run_dir.join(SUMMARY_FILE))?;
        let sealed = store::is_sealed(run_dir);
        if !sealed {
            tracing::warn!(run = %run_dir.display(), "comparing an unsealed run");
        }
        described.push(ComparisonSource {
            target: target.clone(),
            run_dir: run_dir.clone(),
            timestamp: run_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            trial_count: results.len(),
            sealed,
        });
        merged.extend(results.into_iter().map(|mut result| {
            result.target = target.clone();
            result
        }));
    }
    described.sort_by(|a, b| a.target.cmp(&b.target));
    merged.sort_by(|a, b| {
        a.target
            .cmp(&b.target)
            .then_with(|| a.trial_key().cmp(&b.trial_key()))
    });
    Ok((described, merged))
}

/// Resolves, merges and writes a comparison. Nothing is written unless every input resolved.
///
/// 解析、合并并写入比较。只有在所有输入都解析成功后才会写入任何内容。
pub async fn compare(
    results_dir: &Path,
    selectors: &[RunSelector],
) -> Result<Comparison, BenchError> {
    let sources = resolve_sources(results_dir, selectors)?;
    let (sources, results) = merge(&sources)?;

    let (_, path, _) = create_timestamped_dir(&results_dir.join(COMPARISONS_DIR)).await?;
    let summary_path = path.join(SUMMARY_FILE);
    write_json_new(&summary_path, &results)?;
    write_json_new(&path.join(SOURCES_FILE), &sources)?;
    tracing::info!(path = %path.display(), results = results.len(), "comparison written");

    Ok(Comparison {
        path,
        summary_path,
        sources,
        results,
    })
}
