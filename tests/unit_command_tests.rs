//! # Command Unit Tests / 命令单元测试
//!
//! Tests for load-generator command lines and for output capture.
//!
//! 测试负载生成器命令行以及输出捕获。

mod common;

use s3_matrix_bench::config::LoadGenerator;
use s3_matrix_bench::core::planner::plan_trials;
use s3_matrix_bench::infra::command::{Invocation, READER_DRAIN_TIMEOUT, spawn_captured};
use s3_matrix_bench::infra::redact::Redactor;
use std::time::{Duration, Instant};

use common::{ACCESS_KEY, SECRET_KEY, single_cell_matrix, target_config};

fn generator() -> LoadGenerator {
    LoadGenerator {
        program: "warp".to_string(),
        extra_args: vec!["--autoterm".to_string()],
    }
}

#[cfg(test)]
mod invocation_tests {
    use super::*;

    #[test]
    fn test_trial_arguments() {
        let spec = plan_trials("minio", &single_cell_matrix())
            .unwrap()
            .trials
            .remove(0);
        let invocation = Invocation::for_trial(
            &generator(),
            &target_config("127.0.0.1:9000"),
            &spec,
            Duration::from_secs(7),
            true,
        );

        assert_eq!(invocation.program, "warp");
        assert_eq!(invocation.args[0], "put");
        let joined = invocation.args.join(" ");
        assert!(joined.contains("--obj.size 1MiB"));
        assert!(joined.contains("--concurrent 8"));
        assert!(joined.contains("--duration 7s"));
        assert!(joined.contains("--noclear"));
        assert!(joined.ends_with("--json --autoterm"));
    }

    #[test]
    fn test_display_masks_credentials() {
        let spec = plan_trials("minio", &single_cell_matrix())
            .unwrap()
            .trials
            .remove(0);
        let target = target_config("127.0.0.1:9000");
        let invocation =
            Invocation::for_trial(&generator(), &target, &spec, Duration::from_secs(1), false);

        let line = invocation.display_redacted(&Redactor::new(target.secrets()));
        assert!(!line.contains(SECRET_KEY));
        assert!(!line.contains(ACCESS_KEY));
        assert!(!line.contains("--noclear"));
    }
}

#[cfg(all(test, unix))]
mod capture_tests {
    use super::*;
    use tokio::process::Command;

    /// A pipe held open by a process outside our control still yields what was written to it.
    /// 被不受控制的进程保持打开的管道仍会返回已写入的内容。
    #[tokio::test]
    async fn test_output_read_before_drain_timeout_is_kept() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo partial report; sleep 30 & exit 0"])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        let mut captured = spawn_captured(cmd).unwrap();
        assert!(captured.child.wait().await.unwrap().success());

        let started = Instant::now();
        let output = captured.collect_output().await;
        assert_eq!(output, "partial report\n");
        assert!(started.elapsed() < READER_DRAIN_TIMEOUT + Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_stdout_precedes_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo err >&2; echo out"])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        let mut captured = spawn_captured(cmd).unwrap();
        captured.child.wait().await.unwrap();
        assert_eq!(captured.collect_output().await, "out\nerr\n");
    }
}
