//! # Comparison Unit Tests / 比较单元测试
//!
//! Tests for resolving runs, merging summaries and writing a comparison directory.
//!
//! 测试运行的解析、摘要的合并以及比较目录的写入。

mod common;

use s3_matrix_bench::BenchError;
use s3_matrix_bench::core::compare::{
    COMPARISONS_DIR, ComparisonSource, RunSelector, SOURCES_FILE, compare, resolve_sources,
};
use s3_matrix_bench::core::store::{METADATA_FILE, SUMMARY_FILE, read_summary};
use s3_matrix_bench::models::{ObjectSize, Operation, TrialResult, TrialSpec};
use std::fs;
use std::path::{Path, PathBuf};

use common::setup_test_environment;

fn result(target: &str, operation: Operation, size: &str, concurrency: u32) -> TrialResult {
    let spec = TrialSpec {
        target: target.to_string(),
        operation,
        object_size: size.parse::<ObjectSize>().unwrap(),
        concurrency,
        iteration: 1,
        duration_secs: None,
    };
    let mut result = TrialResult::zeroed(&spec);
    result.throughput_mbps = f64::from(concurrency);
    result
}

/// Writes a run with the given results and returns its directory.
fn write_run(root: &Path, target: &str, timestamp: &str, results: &[TrialResult], sealed: bool) -> PathBuf {
    let dir = root.join(target).join(timestamp);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(SUMMARY_FILE), serde_json::to_vec(results).unwrap()).unwrap();
    if sealed {
        fs::write(dir.join(METADATA_FILE), "{}").unwrap();
    }
    dir
}

fn comparisons(root: &Path) -> usize {
    fs::read_dir(root.join(COMPARISONS_DIR))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[cfg(test)]
mod resolution_tests {
    use super::*;

    #[tokio::test]
    async fn test_single_target_fails_without_writing() {
        let temp = setup_test_environment();
        write_run(temp.path(), "aws", "20250101-000000", &[], true);

        let err = compare(temp.path(), &[RunSelector::Latest("aws".into())])
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::Aggregation(_)));
        assert_eq!(comparisons(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_target_without_runs_fails_without_writing() {
        let temp = setup_test_environment();
        write_run(temp.path(), "aws", "20250101-000000", &[], true);

        let err = compare(
            temp.path(),
            &[
                RunSelector::Latest("aws".into()),
                RunSelector::Latest("minio".into()),
            ],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BenchError::Aggregation(ref m) if m.contains("minio")));
        assert_eq!(comparisons(temp.path()), 0);
    }

    #[test]
    fn test_pinned_directory_infers_target() {
        let temp = setup_test_environment();
        let old = write_run(temp.path(), "aws", "20240101-000000", &[], true);
        write_run(temp.path(), "aws", "20250101-000000", &[], true);
        write_run(temp.path(), "minio", "20250101-000000", &[], true);

        let sources = resolve_sources(
            temp.path(),
            &[RunSelector::Pinned(old.clone()), RunSelector::Latest("minio".into())],
        )
        .unwrap();
        assert_eq!(sources[0].0, "aws");
        assert_eq!(sources[0].1, old);
    }

    #[test]
    fn test_pinned_directory_needs_summary() {
        let temp = setup_test_environment();
        write_run(temp.path(), "minio", "20250101-000000", &[], true);
        let empty = temp.path().join("aws").join("20250101-000000");
        fs::create_dir_all(&empty).unwrap();

        let err = resolve_sources(
            temp.path(),
            &[RunSelector::Pinned(empty), RunSelector::Latest("minio".into())],
        )
        .unwrap_err();
        assert!(matches!(err, BenchError::Aggregation(_)));
    }

    #[test]
    fn test_same_target_twice_is_rejected() {
        let temp = setup_test_environment();
        let old = write_run(temp.path(), "aws", "20240101-000000", &[], true);
        write_run(temp.path(), "aws", "20250101-000000", &[], true);

        let err = resolve_sources(
            temp.path(),
            &[RunSelector::Latest("aws".into()), RunSelector::Pinned(old)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}

#[cfg(test)]
mod merge_tests {
    use super::*;

    fn seed(root: &Path) {
        write_run(
            root,
            "aws",
            "20250101-000000",
            &[
                result("aws", Operation::Put, "1MiB", 8),
                result("aws", Operation::Put, "4KiB", 8),
            ],
            true,
        );
        write_run(
            root,
            "minio",
            "20250102-000000",
            &[
                result("minio", Operation::Get, "4KiB", 8),
                result("minio", Operation::Put, "4KiB", 32),
            ],
            false,
        );
    }

    #[tokio::test]
    async fn test_union_is_sorted_and_sources_recorded() {
        let temp = setup_test_environment();
        seed(temp.path());

        let comparison = compare(
            temp.path(),
            &[
                RunSelector::Latest("minio".into()),
                RunSelector::Latest("aws".into()),
            ],
        )
        .await
        .unwrap();

        assert!(comparison.path.starts_with(temp.path().join(COMPARISONS_DIR)));
        let keys: Vec<(String, String)> = comparison
            .results
            .iter()
            .map(|r| (r.target.clone(), format!("{}_{}", r.operation, r.object_size)))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("aws".to_string(), "put_4KiB".to_string()),
                ("aws".to_string(), "put_1MiB".to_string()),
                ("minio".to_string(), "put_4KiB".to_string()),
                ("minio".to_string(), "get_4KiB".to_string()),
            ]
        );

        let written = read_summary(&comparison.summary_path).unwrap();
        assert_eq!(written, comparison.results);

        let sources: Vec<ComparisonSource> =
            serde_json::from_slice(&fs::read(comparison.path.join(SOURCES_FILE)).unwrap()).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].target, "aws");
        assert!(sources[0].sealed);
        assert_eq!(sources[1].timestamp, "20250102-000000");
        assert!(!sources[1].sealed);
        assert_eq!(sources[1].trial_count, 2);
    }

    /// compare(A, B) and compare(B, A) produce the same merged summary.
    /// compare(A, B) 和 compare(B, A) 产生相同的合并摘要。
    #[tokio::test]
    async fn test_merge_is_order_independent() {
        let temp = setup_test_environment();
        seed(temp.path());

        let forward = compare(
            temp.path(),
            &[RunSelector::Latest("aws".into()), RunSelector::Latest("minio".into())],
        )
        .await
        .unwrap();
        let backward = compare(
            temp.path(),
            &[RunSelector::Latest("minio".into()), RunSelector::Latest("aws".into())],
        )
        .await
        .unwrap();

        assert_ne!(forward.path, backward.path);
        assert_eq!(
            fs::read(&forward.summary_path).unwrap(),
            fs::read(&backward.summary_path).unwrap()
        );
    }

    #[tokio::test]
    async fn test_sources_are_not_modified() {
        let temp = setup_test_environment();
        seed(temp.path());
        let summary = temp.path().join("aws/20250101-000000").join(SUMMARY_FILE);
        let before = fs::read(&summary).unwrap();

        compare(
            temp.path(),
            &[RunSelector::Latest("aws".into()), RunSelector::Latest("minio".into())],
        )
        .await
        .unwrap();

        assert_eq!(fs::read(&summary).unwrap(), before);
        assert!(!temp.path().join("minio/20250102-000000").join(METADATA_FILE).exists());
    }
}
