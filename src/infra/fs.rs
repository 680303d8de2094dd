//! # File System Operations Module / 文件系统操作模块
//!
//! Crash-safe file writes for the result store. Every write goes to a temporary file in the
//! destination directory, is flushed to disk, and then atomically renamed over the target so
//! that a concurrent reader observes either the old or the new content, never a torn file.
//!
//! 结果存储的崩溃安全文件写入。每次写入都先写到目标目录中的临时文件，刷新到磁盘，
//! 然后原子地重命名覆盖目标，使并发读取者只会看到旧内容或新内容，绝不会看到部分写入的文件。

use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::core::error::BenchError;

/// Atomically replaces `path` with `bytes`.
///
/// # Arguments
/// * `path` - Destination file; its parent directory must exist
/// * `bytes` - The complete new content
///
/// 原子地用 `bytes` 替换 `path`。
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BenchError> {
    let temp = stage(path, bytes)?;
    temp.persist(path)
        .map_err(|e| BenchError::store(path, e.error))?;
    sync_parent(path);
    Ok(())
}

/// Like [`write_atomic`], but fails if `path` already exists.
/// Used for documents that must be written exactly once.
///
/// 与 [`write_atomic`] 相同，但如果 `path` 已存在则失败。用于必须只写入一次的文档。
pub fn write_atomic_new(path: &Path, bytes: &[u8]) -> Result<(), BenchError> {
    let temp = stage(path, bytes)?;
    temp.persist_noclobber(path)
        .map_err(|e| BenchError::store(path, e.error))?;
    sync_parent(path);
    Ok(())
}

/// Creates `path` as a new directory. Fails with `AlreadyExists` rather than reusing it.
/// 将 `path` 创建为新目录。如果已存在则以 `AlreadyExists` 失败，而不是重用它。
pub fn create_dir_exclusive(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir(path)
}

/// Checks if a path exists and is a directory.
///
/// # Arguments
/// * `path` - Path to check
pub fn is_directory(path: &Path) -> bool {
    path.exists() && path.is_dir()
}

fn stage(path: &Path, bytes: &[u8]) -> Result<NamedTempFile, BenchError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".staging-")
        .tempfile_in(parent)
        .map_err(|e| BenchError::store(path, e))?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| BenchError::store(path, e))?;
    Ok(temp)
}

fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}
