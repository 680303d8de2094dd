//! # Re-parse Unit Tests / 重新解析单元测试
//!
//! Tests for rebuilding a run's summary from its raw artifacts into a derived directory.
//!
//! 测试将运行的摘要从其原始产物重建到派生目录中。

mod common;

use s3_matrix_bench::core::compare::SOURCES_FILE;
use s3_matrix_bench::core::reparse::{rebuild, reparse, spec_from_stem};
use s3_matrix_bench::core::store::{REPARSED_DIR, RAW_DIR, RunDirectory, SUMMARY_FILE, read_summary};
use s3_matrix_bench::infra::redact::Redactor;
use s3_matrix_bench::models::{ErrorKind, ObjectSize, Operation, TrialResult, TrialSpec};
use std::fs;
use std::path::Path;

use common::{SECRET_KEY, WARP_V2_OUTPUT, read_tree, setup_test_environment};

fn spec(operation: Operation, size: &str, concurrency: u32) -> TrialSpec {
    TrialSpec {
        target: "minio".to_string(),
        operation,
        object_size: size.parse::<ObjectSize>().unwrap(),
        concurrency,
        iteration: 1,
        duration_secs: None,
    }
}

fn write_raw(run: &RunDirectory, spec: &TrialSpec, content: &str) {
    fs::write(
        run.raw_dir().join(format!("{}.json", spec.artifact_stem())),
        content,
    )
    .unwrap();
}

fn recorded(spec: &TrialSpec, kind: ErrorKind, exit_code: Option<i32>) -> TrialResult {
    let mut result = TrialResult::failed(spec, kind, Some("recorded".to_string()));
    result.exit_code = exit_code;
    result.elapsed_secs = 5.0;
    result
}

/// A run with three trials as an older parser saw them:
/// * `put 1MiB c8`: a valid report once recorded as `invalid_raw_output`
/// * `put 1MiB c16`: text with no payload at all
/// * `get 4KiB c8`: a trial that timed out
///
/// plus a stray `raw/notes.json` that names no trial.
async fn older_run(results: &Path) -> RunDirectory {
    let run = RunDirectory::create(results, "minio").await.unwrap();

    let valid = spec(Operation::Put, "1MiB", 8);
    write_raw(&run, &valid, WARP_V2_OUTPUT);
    run.append_result(&recorded(&valid, ErrorKind::InvalidRawOutput, Some(0)))
        .unwrap();

    let garbage = spec(Operation::Put, "1MiB", 16);
    write_raw(
        &run,
        &garbage,
        &format!("warp: no json here\nsecret={SECRET_KEY}\n"),
    );

    let timed_out = spec(Operation::Get, "4KiB", 8);
    write_raw(&run, &timed_out, WARP_V2_OUTPUT);
    run.append_result(&recorded(&timed_out, ErrorKind::Timeout, None))
        .unwrap();

    fs::write(run.raw_dir().join("notes.json"), "{}").unwrap();
    run
}

#[cfg(test)]
mod stem_tests {
    use super::*;

    #[test]
    fn test_spec_from_stem() {
        let spec = spec_from_stem("minio", "get_1MiB_c8_i2").unwrap();
        assert_eq!(spec.operation, Operation::Get);
        assert_eq!(spec.object_size.token(), "1MiB");
        assert_eq!(spec.concurrency, 8);
        assert_eq!(spec.iteration, 2);
        assert_eq!(spec.target, "minio");

        assert_eq!(
            spec_from_stem("minio", &super::spec(Operation::Mixed, "64KiB", 32).artifact_stem())
                .unwrap()
                .object_size
                .bytes(),
            64 * 1024
        );
    }

    #[test]
    fn test_unrecognized_stems() {
        for stem in ["notes", "copy_1MiB_c8_i1", "put_1MiB_c8", "put_1MiB_cX_i1", "put_c8_i1"] {
            assert!(spec_from_stem("minio", stem).is_none(), "'{stem}' should not parse");
        }
    }
}

#[cfg(test)]
mod rebuild_tests {
    use super::*;

    #[tokio::test]
    async fn test_rebuild_reparses_payload_failures_only() {
        let temp = setup_test_environment();
        let run = older_run(&temp.path().join("results")).await;

        let (results, skipped, target) =
            rebuild(run.path(), &Redactor::new([SECRET_KEY])).unwrap();
        assert_eq!(target, "minio");
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].ends_with("notes.json"));

        let order: Vec<_> = results
            .iter()
            .map(|r| (r.operation, r.concurrency))
            .collect();
        assert_eq!(
            order,
            [(Operation::Put, 8), (Operation::Put, 16), (Operation::Get, 8)]
        );

        let fixed = &results[0];
        assert_eq!(fixed.error, None);
        assert!((fixed.ops_per_sec - 20.0).abs() < 1e-9);
        assert!((fixed.throughput_mbps - 20.0).abs() < 1e-9);
        assert_eq!(fixed.exit_code, Some(0));
        assert_eq!(fixed.elapsed_secs, 5.0);

        let garbage = &results[1];
        assert_eq!(garbage.error, Some(ErrorKind::InvalidRawOutput));
        let diagnostic = garbage.diagnostic.as_deref().unwrap();
        assert!(diagnostic.contains("no json here"));
        assert!(!diagnostic.contains(SECRET_KEY));

        let timed_out = &results[2];
        assert_eq!(timed_out.error, Some(ErrorKind::Timeout));
        assert_eq!(timed_out.diagnostic.as_deref(), Some("recorded"));
    }

    #[tokio::test]
    async fn test_directory_without_raw_is_rejected() {
        let temp = setup_test_environment();
        let run = RunDirectory::create(temp.path(), "minio").await.unwrap();
        fs::remove_dir(run.path().join(RAW_DIR)).unwrap();

        let err = rebuild(run.path(), &Redactor::new(Vec::<String>::new())).unwrap_err();
        assert!(err.to_string().contains("is not a run directory"));
    }
}

#[cfg(test)]
mod reparse_tests {
    use super::*;

    /// The rebuilt summary lands under `reparsed/` and the source run keeps every byte.
    /// 重建的摘要位于 `reparsed/` 下，源运行的每个字节都保持不变。
    #[tokio::test]
    async fn test_reparse_writes_derived_dir_only() {
        let temp = setup_test_environment();
        let results = temp.path().join("results");
        let run = older_run(&results).await;
        let before = read_tree(run.path());

        let reparsed = reparse(&results, run.path(), &Redactor::new([SECRET_KEY]))
            .await
            .unwrap();

        assert_eq!(read_tree(run.path()), before);
        assert!(reparsed.path.starts_with(
            results
                .join(REPARSED_DIR)
                .join(format!("minio-{}", run.timestamp()))
        ));
        assert_eq!(reparsed.summary_path, reparsed.path.join(SUMMARY_FILE));
        let written = read_summary(&reparsed.summary_path).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|r| r.target == "minio"));
        assert_eq!(reparsed.invalid_count(), 1);
        assert_eq!(reparsed.source.trial_count, 3);
        assert!(!reparsed.source.sealed);
        assert!(reparsed.path.join(SOURCES_FILE).is_file());
        assert!(!reparsed.path.join("metadata.json").exists());
    }
}
