//! # Campaign Integration Tests / 活动集成测试
//!
//! End-to-end runs of the campaign driver against fake load generators: the single-cell happy
//! path, hung and malformed trials that must not stop the campaign, the empty-matrix rejection,
//! secret masking across every artifact, and interruption.
//!
//! 针对伪造负载生成器的活动驱动端到端运行：单单元格的正常路径、不得中止活动的挂起和格式错误的试验、
//! 空矩阵的拒绝、所有产物中的密钥掩码，以及中断。

#![cfg(unix)]

mod common;

use s3_matrix_bench::BenchError;
use s3_matrix_bench::core::Campaign;
use s3_matrix_bench::core::planner::{PLAN_JSON, PLAN_TEXT};
use s3_matrix_bench::core::store::{METADATA_FILE, RAW_DIR, is_sealed, read_summary};
use s3_matrix_bench::models::{ErrorKind, RunMetadata};
use std::fs;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::{
    ACCESS_KEY, MASKED_SECRET, SECRET_KEY, garbage_generator, hanging_generator, read_tree,
    recording_generator, run_configuration, setup_test_environment, single_cell_matrix,
    success_generator,
};

#[cfg(test)]
mod happy_path_tests {
    use super::*;

    /// One target, one cell: one error-free result, all artifacts present, run sealed.
    /// 一个目标，一个单元格：一个无错误的结果，所有产物都存在，运行已封存。
    #[tokio::test]
    async fn test_single_cell_run() {
        let temp = setup_test_environment();
        let results_dir = temp.path().join("results");
        let config = run_configuration(
            &results_dir,
            &success_generator(temp.path()),
            single_cell_matrix(),
            &["minio"],
        );

        let runs = Campaign::new(config, CancellationToken::new())
            .run()
            .await
            .unwrap();
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.error_count(), 0);
        assert!(run.run_dir.starts_with(results_dir.join("minio")));

        let summary = read_summary(&run.summary_path).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].errors, 0);
        assert!(summary[0].throughput_mbps > 0.0);
        assert!(summary[0].elapsed_secs >= 0.0);

        assert!(run.run_dir.join(PLAN_JSON).is_file());
        assert!(run.run_dir.join(PLAN_TEXT).is_file());
        assert!(run.run_dir.join(RAW_DIR).join("put_1MiB_c8_i1.json").is_file());
        assert!(is_sealed(&run.run_dir));

        let metadata: RunMetadata =
            serde_json::from_slice(&fs::read(&run.metadata_path).unwrap()).unwrap();
        assert_eq!(metadata.target, "minio");
        assert_eq!(metadata.trial_count, 1);
        assert_eq!(metadata.error_count, 0);
        assert_eq!(metadata.environment.load_generator_version, "fake-warp 0.0.1");
        assert_eq!(metadata.configuration.access_key, "AKIA****7890");
        assert!(metadata.finished_at >= metadata.started_at);
    }

    /// Every planned trial yields exactly one result, whatever happens to it.
    /// 每个计划的试验都恰好产生一个结果，无论它发生了什么。
    #[tokio::test]
    async fn test_result_count_matches_plan() {
        let temp = setup_test_environment();
        let mut matrix = single_cell_matrix();
        matrix.operations = vec!["put".into(), "get".into()];
        matrix.sizes = vec!["4KiB".into(), "1MiB".into()];
        matrix.concurrency = vec![1, 4];
        matrix.iterations = 2;
        let config = run_configuration(
            &temp.path().join("results"),
            &success_generator(temp.path()),
            matrix,
            &["minio"],
        );

        let runs = Campaign::new(config, CancellationToken::new())
            .run()
            .await
            .unwrap();
        let summary = read_summary(&runs[0].summary_path).unwrap();
        assert_eq!(summary.len(), 16);
        let raw_files = fs::read_dir(runs[0].run_dir.join(RAW_DIR)).unwrap().count();
        assert_eq!(raw_files, 16);
        assert_eq!(summary.first().unwrap().object_size, "4KiB");
        assert_eq!(summary.last().unwrap().iteration, 2);
    }

    #[tokio::test]
    async fn test_targets_run_in_order_into_separate_stores() {
        let temp = setup_test_environment();
        let marker = temp.path().join("calls.log");
        let results_dir = temp.path().join("results");
        let config = run_configuration(
            &results_dir,
            &recording_generator(temp.path(), &marker),
            single_cell_matrix(),
            &["aws", "minio"],
        );

        let runs = Campaign::new(config, CancellationToken::new())
            .run()
            .await
            .unwrap();
        let names: Vec<&str> = runs.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(names, vec!["aws", "minio"]);
        assert!(runs[0].run_dir.starts_with(results_dir.join("aws")));
        assert!(runs[1].run_dir.starts_with(results_dir.join("minio")));
        assert_eq!(fs::read_to_string(marker).unwrap().lines().count(), 2);
    }

    /// A second run never touches the first run's directory.
    /// 第二次运行永远不会触碰第一次运行的目录。
    #[tokio::test]
    async fn test_repeated_runs_are_isolated() {
        let temp = setup_test_environment();
        let results_dir = temp.path().join("results");
        let program = success_generator(temp.path());

        let first = Campaign::new(
            run_configuration(&results_dir, &program, single_cell_matrix(), &["minio"]),
            CancellationToken::new(),
        )
        .run()
        .await
        .unwrap();
        let before = fs::read(&first[0].summary_path).unwrap();

        let second = Campaign::new(
            run_configuration(&results_dir, &program, single_cell_matrix(), &["minio"]),
            CancellationToken::new(),
        )
        .run()
        .await
        .unwrap();

        assert_ne!(first[0].run_dir, second[0].run_dir);
        assert_eq!(fs::read(&first[0].summary_path).unwrap(), before);
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    /// A hung trial becomes a timeout result and the campaign moves on.
    /// 挂起的试验变成超时结果，活动继续进行。
    #[tokio::test]
    async fn test_hung_trials_time_out_and_campaign_continues() {
        let temp = setup_test_environment();
        let mut matrix = single_cell_matrix();
        matrix.iterations = 2;
        let config = run_configuration(
            &temp.path().join("results"),
            &hanging_generator(temp.path()),
            matrix,
            &["minio"],
        );

        let runs = Campaign::new(config, CancellationToken::new())
            .run()
            .await
            .unwrap();
        let summary = read_summary(&runs[0].summary_path).unwrap();
        assert_eq!(summary.len(), 2);
        for result in &summary {
            assert_eq!(result.error, Some(ErrorKind::Timeout));
            assert_eq!(result.error_rate, 1.0);
        }
        assert_eq!(runs[0].error_count(), 2);
        assert!(is_sealed(&runs[0].run_dir));
    }

    /// Malformed output is recorded as invalid_raw_output with a masked diagnostic, and no
    /// artifact anywhere in the run contains a secret.
    ///
    /// 格式错误的输出被记录为 invalid_raw_output，并带有已掩码的诊断信息，运行中的任何产物都不包含密钥。
    #[tokio::test]
    async fn test_malformed_output_is_recorded_and_masked() {
        let temp = setup_test_environment();
        let mut matrix = single_cell_matrix();
        matrix.iterations = 2;
        let config = run_configuration(
            &temp.path().join("results"),
            &garbage_generator(temp.path()),
            matrix,
            &["minio"],
        );

        let runs = Campaign::new(config, CancellationToken::new())
            .run()
            .await
            .unwrap();
        let summary = read_summary(&runs[0].summary_path).unwrap();
        assert_eq!(summary.len(), 2);
        let diagnostic = summary[0].diagnostic.as_deref().unwrap();
        assert_eq!(summary[0].error, Some(ErrorKind::InvalidRawOutput));
        assert!(diagnostic.contains(MASKED_SECRET));

        let everything = read_tree(&runs[0].run_dir);
        assert!(!everything.contains(SECRET_KEY));
        assert!(!everything.contains(ACCESS_KEY));
    }

    /// An empty size list is rejected before any directory is created or process spawned.
    /// 空的大小列表会在创建任何目录或派生任何进程之前被拒绝。
    #[tokio::test]
    async fn test_empty_matrix_rejected_before_side_effects() {
        let temp = setup_test_environment();
        let marker = temp.path().join("calls.log");
        let results_dir = temp.path().join("results");
        let mut matrix = single_cell_matrix();
        matrix.sizes.clear();
        let config = run_configuration(
            &results_dir,
            &recording_generator(temp.path(), &marker),
            matrix,
            &["minio"],
        );

        let err = Campaign::new(config, CancellationToken::new())
            .run()
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(!results_dir.exists());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_unreachable_target_rejected_before_side_effects() {
        let temp = setup_test_environment();
        let results_dir = temp.path().join("results");
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = run_configuration(
            &results_dir,
            &success_generator(temp.path()),
            single_cell_matrix(),
            &["minio"],
        );
        config.preflight.check_reachability = true;
        config.targets[0].config.endpoint = format!("127.0.0.1:{port}");

        let err = Campaign::new(config, CancellationToken::new())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
        assert!(!results_dir.exists());
    }
}

#[cfg(test)]
mod interruption_tests {
    use super::*;

    /// Cancelling mid-trial stops the campaign with `Interrupted` and leaves the run unsealed.
    /// 在试验中途取消会以 `Interrupted` 停止活动，并使运行保持未封存状态。
    #[tokio::test]
    async fn test_cancel_leaves_run_unsealed() {
        let temp = setup_test_environment();
        let results_dir = temp.path().join("results");
        let mut config = run_configuration(
            &results_dir,
            &hanging_generator(temp.path()),
            single_cell_matrix(),
            &["minio", "aws"],
        );
        config.supervisor.safety_buffer = Duration::from_secs(60);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            trigger.cancel();
        });

        let err = Campaign::new(config, cancel).run().await.unwrap_err();
        assert!(matches!(err, BenchError::Interrupted));

        let target_dir = results_dir.join("minio");
        let run_dir = fs::read_dir(&target_dir)
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        assert!(!run_dir.join(METADATA_FILE).exists());
        // The cancelled trial is not recorded.
        assert!(read_summary(&run_dir.join("summary.json")).unwrap().is_empty());
        // The second target never started.
        assert!(!results_dir.join("aws").exists());
    }
}
