//! # Console Reporting Module / 控制台报告模块
//!
//! This module handles everything the user sees while a campaign runs: the plan header, one
//! progress line per trial with an ETA, and the final summary with artifact paths.
//! All text goes through the i18n layer.
//!
//! 此模块处理活动运行期间用户看到的所有内容：计划标题、每个试验一行带预计剩余时间的进度，
//! 以及带有产物路径的最终摘要。所有文本都经过国际化层。

use colored::*;
use std::path::Path;
use std::time::Duration;

use crate::core::campaign::TargetRun;
use crate::core::compare::Comparison;
use crate::core::models::{TrialResult, TrialSpec};
use crate::core::planner::TrialPlan;
use crate::core::reparse::Reparsed;
use crate::infra::t;

/// Running average of finished trials, used for the ETA.
/// 已完成试验的运行平均值，用于计算预计剩余时间。
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    completed: usize,
    spent: Duration,
    last: Duration,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            spent: Duration::ZERO,
            last: Duration::ZERO,
        }
    }

    /// Records one finished trial and its wall time (warmup included).
    pub fn record(&mut self, elapsed: Duration) {
        self.completed += 1;
        self.spent += elapsed;
        self.last = elapsed;
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn last(&self) -> Duration {
        self.last
    }

    /// Average trial duration times the number of trials left.
    /// `None` before the first trial has finished.
    ///
    /// 平均试验时长乘以剩余的试验数量。在第一个试验完成之前为 `None`。
    pub fn eta(&self) -> Option<Duration> {
        if self.completed == 0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.completed) as u32;
        let average = self.spent / self.completed as u32;
        Some(average * remaining)
    }
}

/// Formats a duration as `1h02m03s`, `2m03s` or `3s`.
/// 将持续时间格式化为 `1h02m03s`、`2m03s` 或 `3s`。
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m:02}m{s:02}s")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{s}s")
    }
}

/// Prints the banner shown before the first trial of a target.
pub fn print_plan_header(plan: &TrialPlan, run_dir: &Path) {
    println!(
        "\n{}",
        t!("run.target_banner", target = &plan.target).bold()
    );
    println!(
        "  {}",
        t!(
            "run.plan_summary",
            count = plan.len(),
            duration = plan.default_duration_secs,
            warmup = plan.warmup_secs
        )
    );
    println!(
        "  {}",
        t!("run.run_directory", path = run_dir.display()).dimmed()
    );
}

/// Prints the heartbeat shown while a trial is still running.
/// 打印试验仍在运行时显示的心跳行。
pub fn print_heartbeat(elapsed: Duration, timeout: Duration) {
    println!("  {}", heartbeat_line(elapsed, timeout).dimmed());
}

pub fn heartbeat_line(elapsed: Duration, timeout: Duration) -> String {
    t!(
        "run.heartbeat",
        elapsed = format_duration(elapsed),
        timeout = format_duration(timeout)
    )
    .to_string()
}

/// Prints one progress line for a finished trial.
///
/// ```text
/// [ 3/24] put 1MiB c=8 i=1   ok      412.50 MiB/s     412.5 ops/s   61s  ETA 21m21s
/// [ 4/24] get 1MiB c=8 i=1   timeout                                365s  ETA 1h02m00s
/// ```
pub fn print_trial_line(progress: &ProgressTracker, spec: &TrialSpec, result: &TrialResult) {
    let width = progress.total().to_string().len();
    let counter = format!(
        "[{:>width$}/{}]",
        progress.completed(),
        progress.total(),
        width = width
    );
    let eta = progress
        .eta()
        .map(|eta| format!("{} {}", t!("run.eta"), format_duration(eta)))
        .unwrap_or_default();
    let elapsed = format_duration(progress.last());

    match result.error {
        None => println!(
            "{} {:<28} {:<8} {:>10.2} MiB/s {:>10.1} ops/s {:>8}  {}",
            counter.dimmed(),
            spec.label(),
            t!("run.status_ok").green(),
            result.throughput_mbps,
            result.ops_per_sec,
            elapsed,
            eta.dimmed()
        ),
        Some(kind) => println!(
            "{} {:<28} {:<8} {:>34} {:>8}  {}",
            counter.dimmed(),
            spec.label(),
            kind.as_str().red(),
            "",
            elapsed,
            eta.dimmed()
        ),
    }
}

/// Prints the final summary of a campaign.
///
/// ```text
/// --- Campaign Summary ---
///   aws      24 trials   1 errors   results/aws/20250101-120000
///     summary:  results/aws/20250101-120000/summary.json
///     metadata: results/aws/20250101-120000/metadata.json
/// ```
pub fn print_campaign_summary(runs: &[TargetRun]) {
    println!("\n{}", t!("summary.banner").bold());
    for run in runs {
        let errors = run.error_count();
        let error_text = t!("summary.errors", count = errors);
        let error_text = if errors == 0 {
            error_text.green()
        } else {
            error_text.red()
        };
        println!(
            "  {:<16} {:>6}  {}  {}",
            run.target.cyan(),
            t!("summary.trials", count = run.results.len()),
            error_text,
            run.run_dir.display()
        );
        println!(
            "    {} {}",
            t!("summary.summary_path").dimmed(),
            run.summary_path.display()
        );
        println!(
            "    {} {}",
            t!("summary.metadata_path").dimmed(),
            run.metadata_path.display()
        );
    }
    let total: usize = runs.iter().map(|r| r.results.len()).sum();
    let errors: usize = runs.iter().map(TargetRun::error_count).sum();
    println!(
        "{}",
        t!("summary.totals", trials = total, errors = errors).bold()
    );
}

/// Prints where a comparison was written and what went into it.
/// 打印比较写入的位置及其包含的内容。
pub fn print_comparison(comparison: &Comparison) {
    println!("\n{}", t!("compare.banner").bold());
    for source in &comparison.sources {
        let marker = if source.sealed {
            String::new()
        } else {
            format!(" {}", t!("compare.unsealed").yellow())
        };
        println!(
            "  {:<16} {:>4}  {}{}",
            source.target.cyan(),
            source.trial_count,
            source.run_dir.display(),
            marker
        );
    }
    println!(
        "{}",
        t!(
            "compare.written",
            count = comparison.results.len(),
            path = comparison.summary_path.display()
        )
        .green()
    );
}

/// Prints what a re-parse rebuilt and where it went.
///
/// ```text
/// --- Re-parse ---
///   minio            24  results/minio/20250101-120000
///   skipped: results/minio/20250101-120000/raw/notes.json
/// Rebuilt 24 results (1 still invalid) into results/reparsed/minio-20250101-120000/20250102-090000/summary.json
/// ```
pub fn print_reparse(reparsed: &Reparsed) {
    println!("\n{}", t!("reparse.banner").bold());
    let source = &reparsed.source;
    let marker = if source.sealed {
        String::new()
    } else {
        format!(" {}", t!("compare.unsealed").yellow())
    };
    println!(
        "  {:<16} {:>4}  {}{}",
        source.target.cyan(),
        source.trial_count,
        source.run_dir.display(),
        marker
    );
    for skipped in &reparsed.skipped {
        println!(
            "  {}",
            t!("reparse.skipped", path = skipped.display()).yellow()
        );
    }
    let line = t!(
        "reparse.written",
        count = reparsed.results.len(),
        invalid = reparsed.invalid_count(),
        path = reparsed.summary_path.display()
    );
    if reparsed.invalid_count() == 0 {
        println!("{}", line.green());
    } else {
        println!("{}", line.yellow());
    }
}
