//! # Reparse Command Module / 重新解析命令模块
//!
//! Rebuilds the summary of an existing run from its raw artifacts, without running anything.
//!
//! 在不运行任何内容的情况下，从原始产物重建已有运行的摘要。

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::{
    core::{config::BenchMatrix, reparse},
    infra::redact::Redactor,
    reporting::{print_reparse, render_report},
};

#[derive(Debug, Clone, Default)]
pub struct ReparseOptions {
    pub run_dir: PathBuf,
    pub config: PathBuf,
    pub results_dir: Option<PathBuf>,
    pub report: bool,
}

/// Executes the reparse command.
///
/// The configuration file is optional. When present, the secrets of its targets are redacted
/// from diagnostics and its report renderer can be used. Without `--results-dir`, output goes
/// under the results root the run lives in.
pub async fn execute(options: ReparseOptions) -> Result<()> {
    let file = if options.config.is_file() {
        super::run::load_config(&options.config)?
    } else {
        BenchMatrix::default()
    };
    let results_dir = match options.results_dir.clone() {
        Some(dir) => dir,
        None => results_root_of(&options.run_dir)?,
    };
    let redactor = Redactor::new(file.targets.values().flat_map(|target| target.secrets()));

    let reparsed = reparse::reparse(&results_dir, &options.run_dir, &redactor).await?;
    print_reparse(&reparsed);

    if options.report {
        match &file.report.command {
            Some(command) => {
                render_report(command, &reparsed.summary_path, &[reparsed.source.target.clone()])
                    .await?;
            }
            None => super::run::report_not_configured(),
        }
    }
    Ok(())
}

/// `<results>/<target>/<timestamp>` lives two levels below its results root.
fn results_root_of(run_dir: &Path) -> Result<PathBuf> {
    let resolved = run_dir
        .canonicalize()
        .with_context(|| format!("cannot resolve run directory {}", run_dir.display()))?;
    resolved
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .with_context(|| format!("'{}' has no results root", run_dir.display()))
}
