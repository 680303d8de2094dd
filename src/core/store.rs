//! # Result Store Module / 结果存储模块
//!
//! One immutable directory per (target, run), named by the run's start timestamp:
//!
//! ```text
//! <results_dir>/<target>/<YYYYmmdd-HHMMSS>/
//!     plan.json  plan.txt  raw/  summary.json  metadata.json
//! ```
//!
//! `summary.json` is a JSON array that is valid after every append. `metadata.json` is written
//! exactly once and marks the run as sealed.
//!
//! 每个（目标，运行）对应一个以运行开始时间戳命名的不可变目录。
//! `summary.json` 是一个 JSON 数组，每次追加后都有效。`metadata.json` 只写入一次，标志着运行已封存。

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::BenchError;
use crate::core::models::{RunMetadata, TrialResult};
use crate::infra::fs::{create_dir_exclusive, is_directory, write_atomic, write_atomic_new};

pub const SUMMARY_FILE: &str = "summary.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const RAW_DIR: &str = "raw";
/// Directory under the results root holding reports rendered for single runs.
pub const REPORTS_DIR: &str = "reports";
/// Directory under the results root holding summaries rebuilt from raw artifacts.
pub const REPARSED_DIR: &str = "reparsed";
/// Run identity format, always in UTC so that lexicographic order is time order.
/// 运行标识格式，始终使用 UTC，使字典序即时间顺序。
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// How many seconds a directory creation may slip while waiting for a free timestamp.
const MAX_TIMESTAMP_ATTEMPTS: usize = 5;

/// A run directory owned by the campaign that created it.
/// 由创建它的活动所拥有的运行目录。
#[derive(Debug, Clone)]
pub struct RunDirectory {
    target: String,
    timestamp: String,
    path: PathBuf,
    started_at: DateTime<Utc>,
}

impl RunDirectory {
    /// Creates a fresh run directory for `target` under `results_dir`.
    ///
    /// The directory is created exclusively; when a run for the same target already started in
    /// the current second, creation waits for the next second instead of reusing it.
    /// `raw/` is created and `summary.json` is initialized to `[]`.
    ///
    /// 为 `target` 在 `results_dir` 下创建一个新的运行目录。
    /// 目录以独占方式创建；如果同一目标在当前秒内已经开始了一次运行，则等待下一秒，而不是重用它。
    pub async fn create(results_dir: &Path, target: &str) -> Result<Self, BenchError> {
        let (timestamp, path, started_at) =
            create_timestamped_dir(&results_dir.join(target)).await?;
        let run = Self {
            target: target.to_string(),
            timestamp,
            path,
            started_at,
        };
        run.initialize()?;
        tracing::debug!(path = %run.path.display(), "run directory created");
        Ok(run)
    }

    fn initialize(&self) -> Result<(), BenchError> {
        let raw = self.raw_dir();
        fs::create_dir(&raw).map_err(|e| BenchError::store(&raw, e))?;
        write_atomic_new(&self.summary_path(), b"[]")
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.path.join(RAW_DIR)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.path.join(SUMMARY_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_FILE)
    }

    /// Appends one result: read the current array, push, atomically replace.
    /// Returns the number of results now stored.
    ///
    /// 追加一个结果：读取当前数组，推入，原子替换。返回当前存储的结果数量。
    pub fn append_result(&self, result: &TrialResult) -> Result<usize, BenchError> {
        let path = self.summary_path();
        let mut results = read_summary(&path)?;
        results.push(result.clone());
        let bytes = serde_json::to_vec_pretty(&results)
            .map_err(|e| BenchError::store(&path, std::io::Error::other(e)))?;
        write_atomic(&path, &bytes)?;
        Ok(results.len())
    }

    /// Writes `metadata.json`, sealing the run. Refuses to overwrite an existing file.
    /// 写入 `metadata.json`，封存此次运行。拒绝覆盖已存在的文件。
    pub fn finalize(&self, metadata: &RunMetadata) -> Result<PathBuf, BenchError> {
        let path = self.metadata_path();
        let bytes = serde_json::to_vec_pretty(metadata)
            .map_err(|e| BenchError::store(&path, std::io::Error::other(e)))?;
        write_atomic_new(&path, &bytes)?;
        Ok(path)
    }
}

/// Exclusively creates `<parent>/<timestamp>` for the current second, waiting for the next
/// second on a collision. Returns the timestamp, the directory and the creation instant.
///
/// 为当前秒独占地创建 `<parent>/<timestamp>`，冲突时等待下一秒。返回时间戳、目录和创建时刻。
pub async fn create_timestamped_dir(
    parent: &Path,
) -> Result<(String, PathBuf, DateTime<Utc>), BenchError> {
    for _ in 0..MAX_TIMESTAMP_ATTEMPTS {
        let now = Utc::now();
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let path = parent.join(&timestamp);
        match create_dir_exclusive(&path) {
            Ok(()) => return Ok((timestamp, path, now)),
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                let into_second = u64::from(now.timestamp_subsec_millis().min(999));
                tracing::debug!(%timestamp, "directory exists; waiting for the next second");
                tokio::time::sleep(Duration::from_millis(1000 - into_second)).await;
            }
            Err(e) => return Err(BenchError::store(path, e)),
        }
    }
    Err(BenchError::store(
        parent,
        std::io::Error::new(
            IoErrorKind::AlreadyExists,
            "no free timestamp for a new directory",
        ),
    ))
}

/// Target and timestamp of a run directory: the names of its parent and of itself.
///
/// # Errors
/// [`BenchError::Aggregation`] when the path has no usable parent or name.
///
/// 运行目录的目标和时间戳：其父目录的名称和其自身的名称。
pub fn run_identity(run_dir: &Path) -> Result<(String, String), BenchError> {
    let resolved = run_dir.canonicalize().unwrap_or_else(|_| run_dir.to_path_buf());
    let name_of = |path: Option<&Path>| {
        path.and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .map(str::to_string)
    };
    match (
        name_of(resolved.parent()),
        name_of(Some(resolved.as_path())),
    ) {
        (Some(target), Some(timestamp)) => Ok((target, timestamp)),
        _ => Err(BenchError::aggregation(format!(
            "cannot infer the target of '{}'",
            run_dir.display()
        ))),
    }
}

/// Creates a fresh directory for output derived from `run_dir`:
/// `<results_dir>/<kind>/<target>-<run timestamp>/<now>/`. The run itself is never written.
///
/// 为从 `run_dir` 派生的输出创建一个新目录：`<results_dir>/<kind>/<目标>-<运行时间戳>/<当前时间>/`。
/// 运行本身永远不会被写入。
pub async fn create_derived_dir(
    results_dir: &Path,
    kind: &str,
    run_dir: &Path,
) -> Result<PathBuf, BenchError> {
    let (target, timestamp) = run_identity(run_dir)?;
    let parent = results_dir.join(kind).join(format!("{target}-{timestamp}"));
    let (_, path, _) = create_timestamped_dir(&parent).await?;
    tracing::debug!(path = %path.display(), source = %run_dir.display(), "derived directory created");
    Ok(path)
}

/// Serializes `value` as pretty JSON into a file that must not exist yet.
/// 将 `value` 序列化为格式化 JSON，写入一个尚不存在的文件。
pub fn write_json_new<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), BenchError> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| BenchError::store(path, std::io::Error::other(e)))?;
    write_atomic_new(path, &bytes)
}

/// Reads a `summary.json` file.
/// 读取 `summary.json` 文件。
pub fn read_summary(path: &Path) -> Result<Vec<TrialResult>, BenchError> {
    let bytes = fs::read(path).map_err(|e| BenchError::store(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| {
        BenchError::store(
            path,
            std::io::Error::new(IoErrorKind::InvalidData, e),
        )
    })
}

/// `true` when `name` is a run timestamp such as `20250131-235959`.
pub fn is_run_timestamp(name: &str) -> bool {
    name.len() == 15 && NaiveDateTime::parse_from_str(name, TIMESTAMP_FORMAT).is_ok()
}

/// Resolves the most recent run of `target`: the lexicographically greatest timestamp-named
/// directory that contains a `summary.json`. Returns `Ok(None)` when the target has no runs.
///
/// 解析 `target` 的最近一次运行：包含 `summary.json` 的、按字典序最大的时间戳命名目录。
/// 当目标没有任何运行时返回 `Ok(None)`。
pub fn latest_run(results_dir: &Path, target: &str) -> Result<Option<PathBuf>, BenchError> {
    let target_dir = results_dir.join(target);
    if !is_directory(&target_dir) {
        return Ok(None);
    }
    let entries = fs::read_dir(&target_dir).map_err(|e| BenchError::store(&target_dir, e))?;

    let mut latest: Option<(String, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|e| BenchError::store(&target_dir, e))?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let path = entry.path();
        if !is_run_timestamp(&name) || !path.join(SUMMARY_FILE).is_file() {
            continue;
        }
        if latest.as_ref().is_none_or(|(best, _)| name > *best) {
            latest = Some((name, path));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

/// `true` once `metadata.json` has been written into `run_dir`.
pub fn is_sealed(run_dir: &Path) -> bool {
    run_dir.join(METADATA_FILE).is_file()
}
