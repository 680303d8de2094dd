//! # Report Renderer Module / 报告渲染模块
//!
//! The HTML report and charts are produced by an external renderer. This module only builds
//! its command line from `[report] command` and runs it against a `summary.json`:
//!
//! ```text
//! <command> --input <dir>/summary.json --output <dir>/report.html --charts <dir>/charts --targets a,b
//! ```
//!
//! Reports for a single run are rendered into a fresh `<results_dir>/reports/<target>-<run>/<now>/`
//! holding copies of the run's summary and metadata, so a sealed run directory is only read.
//!
//! HTML 报告和图表由外部渲染器生成。此模块只根据 `[report] command` 构建其命令行，
//! 并针对一个 `summary.json` 运行它。单次运行的报告渲染到一个新的派生目录中，封存的运行目录只会被读取。

use anyhow::{Context, Result, bail};
use colored::*;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::core::store::{self, METADATA_FILE, REPORTS_DIR, SUMMARY_FILE};
use crate::infra::command::Invocation;
use crate::infra::t;

pub const REPORT_FILE: &str = "report.html";
pub const CHARTS_DIR: &str = "charts";

/// Builds the renderer invocation for the summary at `summary_path`.
///
/// # Arguments
/// * `command_line` - The configured command, split like a shell would; `~` and `${VAR}` expand
/// * `summary_path` - The merged or per-run `summary.json`
/// * `targets` - Targets shown in the report, passed as one comma-separated value
///
/// 为 `summary_path` 处的摘要构建渲染器调用。
pub fn renderer_invocation(
    command_line: &str,
    summary_path: &Path,
    targets: &[String],
) -> Result<Invocation> {
    let expanded = shellexpand::full(command_line)
        .with_context(|| format!("cannot expand report command '{command_line}'"))?;
    let mut parts = shlex::split(&expanded)
        .with_context(|| format!("report command '{command_line}' has unbalanced quotes"))?
        .into_iter();
    let Some(program) = parts.next() else {
        bail!("report command is empty");
    };

    let output_dir = summary_path.parent().unwrap_or_else(|| Path::new("."));
    let mut args: Vec<String> = parts.collect();
    args.extend([
        "--input".to_string(),
        summary_path.display().to_string(),
        "--output".to_string(),
        output_dir.join(REPORT_FILE).display().to_string(),
        "--charts".to_string(),
        output_dir.join(CHARTS_DIR).display().to_string(),
        "--targets".to_string(),
        targets.join(","),
    ]);
    Ok(Invocation { program, args })
}

/// Runs the renderer and returns the path of the written report.
/// The renderer's own output is passed through to the terminal.
///
/// 运行渲染器并返回写入的报告路径。渲染器自身的输出直接传到终端。
pub async fn render_report(
    command_line: &str,
    summary_path: &Path,
    targets: &[String],
) -> Result<PathBuf> {
    let invocation = renderer_invocation(command_line, summary_path, targets)?;
    println!(
        "{}",
        t!("report.rendering", path = summary_path.display()).cyan()
    );
    tracing::debug!(program = %invocation.program, args = ?invocation.args, "running report renderer");

    let status = tokio::process::Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .status()
        .await
        .with_context(|| format!("failed to start report renderer '{}'", invocation.program))?;
    if !status.success() {
        bail!("report renderer exited with {status}");
    }

    let report = summary_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(REPORT_FILE);
    println!(
        "{}",
        t!("report.written", path = report.display()).green()
    );
    Ok(report)
}

/// Renders the report of one run into a fresh derived directory and returns the report path.
///
/// # Arguments
/// * `command_line` - The configured renderer command
/// * `results_dir` - Results root under which `reports/` lives
/// * `run_dir` - The run to report on; only read
/// * `target` - The run's target
///
/// 将一次运行的报告渲染到一个新的派生目录中，并返回报告路径。
pub async fn render_run_report(
    command_line: &str,
    results_dir: &Path,
    run_dir: &Path,
    target: &str,
) -> Result<PathBuf> {
    let report_dir = store::create_derived_dir(results_dir, REPORTS_DIR, run_dir).await?;
    for file in [SUMMARY_FILE, METADATA_FILE] {
        let source = run_dir.join(file);
        if source.is_file() {
            std::fs::copy(&source, report_dir.join(file)).with_context(|| {
                format!("cannot copy {} into {}", source.display(), report_dir.display())
            })?;
        }
    }
    render_report(
        command_line,
        &report_dir.join(SUMMARY_FILE),
        &[target.to_string()],
    )
    .await
}
