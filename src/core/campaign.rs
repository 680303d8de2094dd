//! # Campaign Driver Module / 活动驱动模块
//!
//! The single control flow of a benchmark campaign. For each selected target, one after the
//! other: create the run directory, persist the plan, supervise every trial in plan order,
//! normalize and append its result, then seal the run with its metadata.
//!
//! 基准测试活动的唯一控制流。对每个选定的目标依次执行：创建运行目录，持久化计划，
//! 按计划顺序监督每个试验，规范化并追加其结果，最后用元数据封存本次运行。

use colored::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::core::config::{NamedTarget, RunConfiguration};
use crate::core::error::BenchError;
use crate::core::execution::Supervisor;
use crate::core::models::{
    ConfigurationSnapshot, EnvironmentInfo, Operation, RunMetadata, TrialResult,
};
use crate::core::planner::TrialPlan;
use crate::core::store::RunDirectory;
use crate::core::{parser, preflight};
use crate::infra::command::probe_first_line;
use crate::infra::redact::{Redactor, mask};
use crate::infra::t;
use crate::reporting::console::{self, ProgressTracker};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const UNKNOWN: &str = "unknown";

/// What a finished target left behind.
/// 一个已完成的目标留下的内容。
#[derive(Debug, Clone)]
pub struct TargetRun {
    pub target: String,
    pub run_dir: PathBuf,
    pub summary_path: PathBuf,
    pub metadata_path: PathBuf,
    pub results: Vec<TrialResult>,
}

impl TargetRun {
    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }
}

/// Drives the configured matrix against every selected target, sequentially.
/// 针对每个选定的目标依次执行配置的矩阵。
#[derive(Debug)]
pub struct Campaign {
    config: RunConfiguration,
    cancel: CancellationToken,
}

impl Campaign {
    pub fn new(config: RunConfiguration, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Validates, then runs every target to completion.
    ///
    /// # Errors
    /// * [`BenchError::Configuration`] from preflight, before any directory or subprocess exists
    /// * [`BenchError::Store`] when the result store cannot be written
    /// * [`BenchError::Interrupted`] when cancelled; the interrupted run stays unsealed
    ///
    /// 先验证，再把每个目标运行到完成。
    pub async fn run(&self) -> Result<Vec<TargetRun>, BenchError> {
        let plans = preflight::validate(&self.config)?;
        preflight::check_all_reachable(&self.config).await?;

        let environment = probe_environment(&self.config.load_generator.program).await;
        let mut runs = Vec::with_capacity(plans.len());
        for (target, plan) in self.config.targets.iter().zip(plans) {
            if self.cancel.is_cancelled() {
                return Err(BenchError::Interrupted);
            }
            runs.push(self.run_target(target, &plan, &environment).await?);
        }
        Ok(runs)
    }

    async fn run_target(
        &self,
        target: &NamedTarget,
        plan: &TrialPlan,
        environment: &EnvironmentInfo,
    ) -> Result<TargetRun, BenchError> {
        let redactor = Redactor::new(target.config.secrets());
        let run = RunDirectory::create(&self.config.results_dir, &target.name).await?;
        plan.persist(run.path())?;
        console::print_plan_header(plan, run.path());

        let supervisor = Supervisor::new(
            &self.config.load_generator,
            &target.config,
            self.config.supervisor,
            Duration::from_secs(self.config.matrix.duration_secs),
            Duration::from_secs(self.config.matrix.warmup_secs),
            self.config.skip_cleanup,
            &redactor,
            self.cancel.clone(),
        );

        let raw_dir = run.raw_dir();
        let mut progress = ProgressTracker::new(plan.len());
        let mut results = Vec::with_capacity(plan.len());
        for spec in &plan.trials {
            if self.cancel.is_cancelled() {
                return Err(self.interrupted(&run));
            }
            let started = Instant::now();
            supervisor.warm_up(spec).await;
            let outcome = supervisor.run(spec, &raw_dir).await?;
            if outcome.cancelled {
                return Err(self.interrupted(&run));
            }

            let result = parser::normalize(spec, &outcome, &redactor);
            run.append_result(&result)?;
            progress.record(started.elapsed());
            console::print_trial_line(&progress, spec, &result);
            results.push(result);
        }

        let metadata = RunMetadata {
            target: target.name.clone(),
            timestamp: run.timestamp().to_string(),
            started_at: run.started_at(),
            finished_at: chrono::Utc::now(),
            trial_count: results.len(),
            error_count: results.iter().filter(|r| r.is_error()).count(),
            configuration: self.snapshot(target)?,
            environment: environment.clone(),
        };
        let metadata_path = run.finalize(&metadata)?;
        tracing::info!(run = %run.path().display(), trials = results.len(), "run sealed");

        Ok(TargetRun {
            target: target.name.clone(),
            run_dir: run.path().to_path_buf(),
            summary_path: run.summary_path(),
            metadata_path,
            results,
        })
    }

    fn interrupted(&self, run: &RunDirectory) -> BenchError {
        println!(
            "{}",
            t!("run.interrupted", path = run.path().display()).yellow()
        );
        BenchError::Interrupted
    }

    fn snapshot(&self, target: &NamedTarget) -> Result<ConfigurationSnapshot, BenchError> {
        let matrix = &self.config.matrix;
        let operations = matrix
            .operations
            .iter()
            .map(|op| op.parse::<Operation>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ConfigurationSnapshot {
            endpoint: target.config.endpoint.clone(),
            bucket: target.config.bucket.clone(),
            region: target.config.region.clone(),
            tls: target.config.uses_tls(),
            path_style: target.config.path_style,
            access_key: mask(&target.config.access_key),
            operations,
            sizes: matrix.sizes.clone(),
            concurrency: matrix.concurrency.clone(),
            iterations: matrix.iterations,
            duration_secs: matrix.duration_secs,
            warmup_secs: matrix.warmup_secs,
            skip_cleanup: self.config.skip_cleanup,
        })
    }
}

/// Best-effort host facts for `metadata.json`; anything that cannot be determined is `unknown`.
/// 为 `metadata.json` 尽力收集的主机信息；无法确定的内容记为 `unknown`。
pub async fn probe_environment(program: &str) -> EnvironmentInfo {
    let hostname = match std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty()) {
        Some(hostname) => Some(hostname),
        None => probe_first_line("hostname", &[], PROBE_TIMEOUT).await,
    };
    let kernel = probe_first_line("uname", &["-r"], PROBE_TIMEOUT).await;
    let load_generator_version = probe_first_line(program, &["--version"], PROBE_TIMEOUT).await;

    EnvironmentInfo {
        hostname: hostname.unwrap_or_else(|| UNKNOWN.to_string()),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        kernel: kernel.unwrap_or_else(|| UNKNOWN.to_string()),
        load_generator_version: load_generator_version.unwrap_or_else(|| UNKNOWN.to_string()),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}
