//! # Trial Supervision Module / 试验监督模块
//!
//! This module runs one load-generator invocation per [`TrialSpec`] under a bounded lifetime.
//! It handles the optional warmup, the heartbeat-driven supervision loop, and the two-stage
//! termination escalation (SIGTERM, grace period, SIGKILL) that keeps a hung trial from
//! stalling the whole campaign.
//!
//! 此模块在有界的生命周期内为每个 [`TrialSpec`] 运行一次负载生成器调用。
//! 它处理可选的预热、由心跳驱动的监督循环，以及两阶段终止升级
//! （SIGTERM、宽限期、SIGKILL），以防止挂起的试验拖住整个活动。

use colored::*;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use tokio::process::Child;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::config::{LoadGenerator, SupervisorSettings, TargetConfig};
use crate::core::error::BenchError;
use crate::core::models::{Escalation, TrialSpec, TrialState};
use crate::infra::command::{self, Invocation};
use crate::infra::fs::write_atomic;
use crate::infra::redact::Redactor;
use crate::infra::t;
use crate::reporting::console;

/// Everything the supervisor observed about one invocation.
/// 监督器观察到的关于一次调用的所有信息。
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    /// Terminal state: `Completed`, `TimedOut` or `Failed` / 终止状态
    pub state: TrialState,
    pub escalation: Escalation,
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr, already redacted / 合并的 stdout 和 stderr，已脱敏
    pub raw_output: String,
    /// Where the raw output artifact was written / 原始输出产物的写入位置
    pub raw_path: Option<PathBuf>,
    /// Time spent in the Running state / 在运行状态中花费的时间
    pub elapsed: Duration,
    /// Set when the load generator could not be spawned / 当负载生成器无法启动时设置
    pub spawn_error: Option<String>,
    /// Set when the campaign was cancelled while this trial ran / 当此试验运行期间活动被取消时设置
    pub cancelled: bool,
}

/// How the supervision loop ended before any escalation.
enum LoopExit {
    Exited(std::io::Result<ExitStatus>),
    Deadline,
    Cancelled,
}

/// Result of supervising one spawned child to its end.
struct Supervised {
    status: Option<ExitStatus>,
    escalation: Escalation,
    timed_out: bool,
    cancelled: bool,
    output: String,
    elapsed: Duration,
}

/// Executes trials for a single target. Holds only the configuration slices it needs.
/// 为单个目标执行试验。只持有它需要的配置部分。
#[derive(Debug)]
pub struct Supervisor<'a> {
    generator: &'a LoadGenerator,
    target: &'a TargetConfig,
    settings: SupervisorSettings,
    default_duration: Duration,
    warmup: Duration,
    skip_cleanup: bool,
    redactor: &'a Redactor,
    cancel: CancellationToken,
}

impl<'a> Supervisor<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generator: &'a LoadGenerator,
        target: &'a TargetConfig,
        settings: SupervisorSettings,
        default_duration: Duration,
        warmup: Duration,
        skip_cleanup: bool,
        redactor: &'a Redactor,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            generator,
            target,
            settings,
            default_duration,
            warmup,
            skip_cleanup,
            redactor,
            cancel,
        }
    }

    /// The trial's own duration, falling back to the run-level default.
    /// 试验自身的持续时间，缺省时回退到运行级别的默认值。
    pub fn expected_duration(&self, spec: &TrialSpec) -> Duration {
        spec.duration_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_duration)
    }

    /// `expected duration + safety buffer`; the point at which escalation starts.
    /// `预期持续时间 + 安全缓冲`；升级开始的时间点。
    pub fn hard_timeout(&self, spec: &TrialSpec) -> Duration {
        self.expected_duration(spec) + self.settings.safety_buffer
    }

    /// Worst-case wall time of one trial: hard timeout plus the grace period.
    /// 单次试验的最坏情况挂钟时间：硬超时加上宽限期。
    pub fn worst_case(&self, spec: &TrialSpec) -> Duration {
        self.hard_timeout(spec) + self.settings.grace_period
    }

    /// Runs the optional warmup for `spec`. Output is discarded; any failure is reported as a
    /// warning and never aborts the trial.
    ///
    /// 为 `spec` 运行可选的预热。输出被丢弃；任何失败都作为警告报告，绝不会中止试验。
    pub async fn warm_up(&self, spec: &TrialSpec) {
        if self.warmup.is_zero() || self.cancel.is_cancelled() {
            return;
        }
        transition(spec, TrialState::Idle, TrialState::Warming);
        let invocation = Invocation::for_trial(
            self.generator,
            self.target,
            spec,
            self.warmup,
            self.skip_cleanup,
        );
        tracing::debug!(command = %invocation.display_redacted(self.redactor), "warmup");

        let captured = match command::spawn_captured(invocation.to_command()) {
            Ok(captured) => captured,
            Err(e) => {
                println!(
                    "{}",
                    t!("run.warmup_failed", label = spec.label(), reason = e.to_string()).yellow()
                );
                return;
            }
        };

        let supervised = self
            .supervise(captured, self.warmup + self.settings.safety_buffer)
            .await;
        let reason = if supervised.cancelled {
            None
        } else if supervised.timed_out {
            Some(t!("run.reason_timeout").to_string())
        } else {
            match supervised.status {
                Some(status) if status.success() => None,
                Some(status) => Some(describe_status(&status)),
                None => Some(t!("run.reason_unknown_status").to_string()),
            }
        };
        if let Some(reason) = reason {
            println!(
                "{}",
                t!("run.warmup_failed", label = spec.label(), reason = reason).yellow()
            );
        }
    }

    /// Runs one trial to a terminal state and writes its raw output artifact into `raw_dir`.
    ///
    /// # Errors
    /// Only a failure to write the raw artifact is returned; every process-level failure is
    /// captured in the returned [`TrialOutcome`].
    ///
    /// 运行一次试验直到终止状态，并将其原始输出产物写入 `raw_dir`。
    /// 只有写入原始产物失败才会返回错误；所有进程级别的失败都记录在返回的 [`TrialOutcome`] 中。
    pub async fn run(&self, spec: &TrialSpec, raw_dir: &Path) -> Result<TrialOutcome, BenchError> {
        let from = if self.warmup.is_zero() {
            TrialState::Idle
        } else {
            TrialState::Warming
        };
        transition(spec, from, TrialState::Running);

        let expected = self.expected_duration(spec);
        let invocation = Invocation::for_trial(
            self.generator,
            self.target,
            spec,
            expected,
            self.skip_cleanup,
        );
        tracing::debug!(command = %invocation.display_redacted(self.redactor), "spawning load generator");

        let raw_path = raw_dir.join(format!("{}.json", spec.artifact_stem()));
        let started = Instant::now();

        let captured = match command::spawn_captured(invocation.to_command()) {
            Ok(captured) => captured,
            Err(e) => {
                let message = self
                    .redactor
                    .redact(&format!(
                        "failed to start load generator '{}': {e}",
                        self.generator.program
                    ))
                    .into_owned();
                write_atomic(&raw_path, message.as_bytes())?;
                transition(spec, TrialState::Running, TrialState::Failed);
                return Ok(TrialOutcome {
                    state: TrialState::Failed,
                    escalation: Escalation::None,
                    exit_code: None,
                    raw_output: message.clone(),
                    raw_path: Some(raw_path),
                    elapsed: started.elapsed(),
                    spawn_error: Some(message),
                    cancelled: false,
                });
            }
        };

        let supervised = self.supervise(captured, self.hard_timeout(spec)).await;
        let raw_output = self.redactor.redact(&supervised.output).into_owned();
        write_atomic(&raw_path, raw_output.as_bytes())?;

        let state = if supervised.timed_out {
            TrialState::TimedOut
        } else {
            match supervised.status {
                Some(status) if status.success() && !supervised.cancelled => TrialState::Completed,
                _ => TrialState::Failed,
            }
        };
        transition(spec, TrialState::Running, state);

        Ok(TrialOutcome {
            state,
            escalation: supervised.escalation,
            exit_code: supervised.status.and_then(|s| s.code()),
            raw_output,
            raw_path: Some(raw_path),
            elapsed: supervised.elapsed,
            spawn_error: None,
            cancelled: supervised.cancelled,
        })
    }

    /// Supervises a spawned child until it exits, the hard timeout passes, or the campaign is
    /// cancelled. The heartbeat polls liveness and prints elapsed time while the child runs.
    ///
    /// 监督一个已派生的子进程，直到其退出、超过硬超时或活动被取消。
    /// 子进程运行期间，心跳轮询其存活状态并打印已用时间。
    async fn supervise(
        &self,
        mut captured: command::CapturedChild,
        hard_timeout: Duration,
    ) -> Supervised {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + hard_timeout;
        let heartbeat_every = self.settings.heartbeat;
        let mut heartbeat =
            tokio::time::interval_at(tokio::time::Instant::now() + heartbeat_every, heartbeat_every);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            tokio::select! {
                biased;
                status = captured.child.wait() => break LoopExit::Exited(status),
                _ = tokio::time::sleep_until(deadline) => break LoopExit::Deadline,
                _ = self.cancel.cancelled() => break LoopExit::Cancelled,
                _ = heartbeat.tick() => {
                    match captured.child.try_wait() {
                        Ok(Some(status)) => break LoopExit::Exited(Ok(status)),
                        Ok(None) => {
                            tracing::debug!(
                                elapsed_secs = started.elapsed().as_secs(),
                                timeout_secs = hard_timeout.as_secs(),
                                "heartbeat: load generator still running"
                            );
                            console::print_heartbeat(started.elapsed(), hard_timeout);
                        }
                        Err(e) => tracing::warn!("heartbeat: liveness poll failed: {e}"),
                    }
                }
            }
        };

        let (status, escalation, timed_out, cancelled) = match exit {
            LoopExit::Exited(Ok(status)) => (Some(status), Escalation::None, false, false),
            LoopExit::Exited(Err(e)) => {
                tracing::warn!("waiting for the load generator failed: {e}");
                let (escalation, status) =
                    escalate(&mut captured.child, self.settings.grace_period).await;
                (status, escalation, false, false)
            }
            LoopExit::Deadline => {
                println!(
                    "{}",
                    t!("run.trial_timeout", timeout = hard_timeout.as_secs()).red()
                );
                let (escalation, status) =
                    escalate(&mut captured.child, self.settings.grace_period).await;
                (status, escalation, true, false)
            }
            LoopExit::Cancelled => {
                let (escalation, status) =
                    escalate(&mut captured.child, self.settings.grace_period).await;
                (status, escalation, false, true)
            }
        };
        let elapsed = started.elapsed();
        captured.kill_stragglers();
        let output = captured.collect_output().await;

        Supervised {
            status,
            escalation,
            timed_out,
            cancelled,
            output,
            elapsed,
        }
    }
}

/// Two-stage termination: SIGTERM, wait up to `grace`, then SIGKILL.
/// The returned [`Escalation`] records which stage ended the process.
///
/// 两阶段终止：SIGTERM，最多等待 `grace`，然后 SIGKILL。
/// 返回的 [`Escalation`] 记录了是哪一阶段结束了进程。
pub async fn escalate(child: &mut Child, grace: Duration) -> (Escalation, Option<ExitStatus>) {
    tracing::warn!(grace_secs = grace.as_secs_f64(), "escalation: sending SIGTERM");
    command::request_termination(child);
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::info!("escalation: process exited after SIGTERM");
            (Escalation::Graceful, Some(status))
        }
        Ok(Err(e)) => {
            tracing::warn!("escalation: wait after SIGTERM failed ({e}); sending SIGKILL");
            command::force_kill(child);
            (Escalation::Forced, child.wait().await.ok())
        }
        Err(_) => {
            tracing::warn!("escalation: grace period elapsed; sending SIGKILL");
            command::force_kill(child);
            (Escalation::Forced, child.wait().await.ok())
        }
    }
}

fn transition(spec: &TrialSpec, from: TrialState, to: TrialState) {
    tracing::debug!(trial = %spec.label(), %from, %to, "state transition");
}

/// Human-readable exit status: `exit code 2` or `signal 9`.
pub fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {signal}");
        }
    }
    status.to_string()
}
