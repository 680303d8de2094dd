//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command: it loads `BenchMatrix.toml`, merges the
//! command-line overrides, runs the campaign against every selected target, and optionally
//! compares the fresh runs and renders a report.
//!
//! 此模块实现了 `run` 命令：加载 `BenchMatrix.toml`，合并命令行覆盖，
//! 针对每个选定的目标运行活动，并可选地比较新的运行结果并渲染报告。

use anyhow::{Context, Result, bail};
use colored::*;
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        campaign::Campaign,
        compare::{self, RunSelector},
        config::{self, BenchMatrix, CliOverrides, RunConfiguration},
        store,
    },
    infra::t,
    reporting::{print_campaign_summary, print_comparison, render_report, render_run_report},
};

/// Everything the `run` subcommand was given.
/// `run` 子命令接收到的所有参数。
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub targets: Vec<String>,
    pub config: PathBuf,
    pub results_dir: Option<PathBuf>,
    pub duration_secs: Option<u64>,
    pub warmup_secs: Option<u64>,
    pub sizes: Option<String>,
    pub concurrency: Option<String>,
    pub iterations: Option<u32>,
    pub operations: Option<String>,
    pub compare: bool,
    pub report: bool,
    pub use_latest: bool,
    pub skip_cleanup: bool,
    pub language_explicit: bool,
}

impl RunOptions {
    /// Converts the raw flag values into typed overrides.
    ///
    /// # Errors
    /// Fails when `--concurrency` contains something other than integers.
    pub fn overrides(&self) -> Result<CliOverrides> {
        let concurrency = self
            .concurrency
            .as_deref()
            .map(|list| {
                config::split_list(list)
                    .iter()
                    .map(|level| {
                        level.parse::<u32>().with_context(|| {
                            t!("run.invalid_concurrency", value = level).to_string()
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;
        Ok(CliOverrides {
            results_dir: self.results_dir.clone(),
            duration_secs: self.duration_secs,
            warmup_secs: self.warmup_secs,
            sizes: self.sizes.as_deref().map(config::split_list),
            concurrency,
            iterations: self.iterations,
            operations: self.operations.as_deref().map(config::split_list),
            skip_cleanup: self.skip_cleanup,
        })
    }
}

/// Executes the run command with the provided options.
///
/// # Returns
/// A Result indicating success or failure of the command execution. Trial failures are
/// recorded in the results and do not fail the command; configuration, store and
/// interruption errors do.
pub async fn execute(options: RunOptions) -> Result<()> {
    let file = load_config(&options.config)?;
    if !options.language_explicit {
        crate::init_locale(Some(&file.language));
    }
    let overrides = options.overrides()?;

    if options.use_latest {
        let results_dir = overrides
            .results_dir
            .clone()
            .unwrap_or_else(|| file.results_dir.clone());
        return use_latest(&file, &results_dir, &options).await;
    }

    let config = RunConfiguration::resolve(&file, overrides, &options.targets)?;
    let results_dir = config.results_dir.clone();
    println!(
        "{}",
        t!("run.loaded_config", path = options.config.display()).cyan()
    );

    let cancel = setup_signal_handler();
    let campaign = Campaign::new(config, cancel);
    let runs = campaign.run().await?;
    print_campaign_summary(&runs);

    let targets: Vec<String> = runs.iter().map(|run| run.target.clone()).collect();
    if options.compare {
        compare_and_report(&file, &results_dir, &targets, options.report).await?;
    } else if options.report {
        for run in &runs {
            report_run(&file, &results_dir, &run.run_dir, &run.target).await?;
        }
    }
    Ok(())
}

/// `--use-latest`: skip running and work on the most recent run of every selected target.
async fn use_latest(file: &BenchMatrix, results_dir: &Path, options: &RunOptions) -> Result<()> {
    if options.targets.is_empty() {
        bail!("{}", t!("run.no_targets"));
    }
    if options.compare {
        return compare_and_report(file, results_dir, &options.targets, options.report).await;
    }
    for target in &options.targets {
        let Some(run_dir) = store::latest_run(results_dir, target)? else {
            bail!("{}", t!("run.no_prior_runs", target = target));
        };
        println!(
            "{}",
            t!("run.using_latest", target = target, path = run_dir.display())
        );
        if options.report {
            report_run(file, results_dir, &run_dir, target).await?;
        }
    }
    Ok(())
}

async fn compare_and_report(
    file: &BenchMatrix,
    results_dir: &Path,
    targets: &[String],
    with_report: bool,
) -> Result<()> {
    let selectors: Vec<RunSelector> = targets
        .iter()
        .cloned()
        .map(RunSelector::Latest)
        .collect();
    let comparison = compare::compare(results_dir, &selectors).await?;
    print_comparison(&comparison);
    if with_report {
        let mut names: Vec<String> = comparison.sources.iter().map(|s| s.target.clone()).collect();
        names.sort();
        report(file, &comparison.summary_path, &names).await?;
    }
    Ok(())
}

/// Renders a report for `summary_path` when a renderer is configured.
pub(crate) async fn report(file: &BenchMatrix, summary_path: &Path, targets: &[String]) -> Result<()> {
    match &file.report.command {
        Some(command) => {
            render_report(command, summary_path, targets).await?;
        }
        None => report_not_configured(),
    }
    Ok(())
}

/// Renders the report of a single run when a renderer is configured.
/// The output goes to a derived directory; `run_dir` is only read.
pub(crate) async fn report_run(
    file: &BenchMatrix,
    results_dir: &Path,
    run_dir: &Path,
    target: &str,
) -> Result<()> {
    match &file.report.command {
        Some(command) => {
            render_run_report(command, results_dir, run_dir, target).await?;
        }
        None => report_not_configured(),
    }
    Ok(())
}

pub(crate) fn report_not_configured() {
    println!("{}", t!("report.not_configured").yellow());
}

/// Loads the configuration file, with the path in the error message.
pub(crate) fn load_config(path: &Path) -> Result<BenchMatrix> {
    config::load_bench_matrix(path)
        .with_context(|| t!("run.config_load_failed", path = path.display()).to_string())
}

/// Sets up a signal handler for graceful shutdown.
/// The running trial is escalated and the interrupted run is left unsealed.
fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("run.shutdown_signal").yellow());
            token_clone.cancel();
        }
    });

    token
}
