//! # Compare Command Module / 比较命令模块
//!
//! Merges existing runs without running anything: the latest run of each `--target`, and/or
//! explicitly pinned `--run-dir`s.
//!
//! 在不运行任何内容的情况下合并已有的运行：每个 `--target` 的最新运行，和/或显式固定的 `--run-dir`。

use anyhow::Result;
use std::path::PathBuf;

use crate::{
    core::{
        compare::{self, RunSelector},
        config::BenchMatrix,
    },
    reporting::print_comparison,
};

#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub targets: Vec<String>,
    pub run_dirs: Vec<PathBuf>,
    pub config: PathBuf,
    pub results_dir: Option<PathBuf>,
    pub report: bool,
}

impl CompareOptions {
    /// Latest-run selectors first, then pinned directories, in the order given.
    pub fn selectors(&self) -> Vec<RunSelector> {
        self.targets
            .iter()
            .cloned()
            .map(RunSelector::Latest)
            .chain(self.run_dirs.iter().cloned().map(RunSelector::Pinned))
            .collect()
    }
}

/// Executes the compare command.
///
/// The configuration file is optional here: without it the default results directory is used
/// and no report renderer is available.
pub async fn execute(options: CompareOptions) -> Result<()> {
    let file = if options.config.is_file() {
        super::run::load_config(&options.config)?
    } else {
        BenchMatrix::default()
    };
    let results_dir = options
        .results_dir
        .clone()
        .unwrap_or_else(|| file.results_dir.clone());

    let comparison = compare::compare(&results_dir, &options.selectors()).await?;
    print_comparison(&comparison);

    if options.report {
        let targets: Vec<String> = comparison
            .sources
            .iter()
            .map(|source| source.target.clone())
            .collect();
        super::run::report(&file, &comparison.summary_path, &targets).await?;
    }
    Ok(())
}
