// src/cli.rs
use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::core::config::CONFIG_FILE_NAME;
use crate::infra::{logging, t};

pub mod commands;

use commands::{compare::CompareOptions, reparse::ReparseOptions, run::RunOptions};

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang="))
        .map(str::to_string)
}

fn target_arg() -> Arg {
    Arg::new("target")
        .short('t')
        .long("target")
        .help(t!("cli.arg_target").to_string())
        .value_name("TARGET")
        .action(ArgAction::Append)
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("cli.arg_config").to_string())
        .value_name("CONFIG")
        .default_value(CONFIG_FILE_NAME)
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn results_dir_arg() -> Arg {
    Arg::new("results-dir")
        .long("results-dir")
        .help(t!("cli.arg_results_dir").to_string())
        .value_name("DIR")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn report_arg() -> Arg {
    Arg::new("report")
        .long("report")
        .help(t!("cli.arg_report").to_string())
        .action(ArgAction::SetTrue)
}

pub fn build_cli() -> Command {
    Command::new("s3-matrix-bench")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about").to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.arg_lang").to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help(t!("cli.arg_verbose").to_string())
                .global(true)
                .action(ArgAction::Count),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.cmd_run_about").to_string())
                .arg(target_arg())
                .arg(config_arg())
                .arg(results_dir_arg())
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .help(t!("cli.arg_duration").to_string())
                        .value_name("SECS")
                        .value_parser(clap::value_parser!(u64))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("warmup")
                        .long("warmup")
                        .help(t!("cli.arg_warmup").to_string())
                        .value_name("SECS")
                        .value_parser(clap::value_parser!(u64))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("sizes")
                        .long("sizes")
                        .help(t!("cli.arg_sizes").to_string())
                        .value_name("LIST")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("concurrency")
                        .long("concurrency")
                        .help(t!("cli.arg_concurrency").to_string())
                        .value_name("LIST")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .help(t!("cli.arg_iterations").to_string())
                        .value_name("N")
                        .value_parser(clap::value_parser!(u32))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("operations")
                        .long("operations")
                        .help(t!("cli.arg_operations").to_string())
                        .value_name("LIST")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("compare")
                        .long("compare")
                        .help(t!("cli.arg_compare").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(report_arg())
                .arg(
                    Arg::new("use-latest")
                        .long("use-latest")
                        .help(t!("cli.arg_use_latest").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("skip-cleanup")
                        .long("skip-cleanup")
                        .help(t!("cli.arg_skip_cleanup").to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("compare")
                .about(t!("cli.cmd_compare_about").to_string())
                .arg(target_arg())
                .arg(
                    Arg::new("run-dir")
                        .long("run-dir")
                        .help(t!("cli.arg_run_dir").to_string())
                        .value_name("DIR")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Append),
                )
                .arg(config_arg())
                .arg(results_dir_arg())
                .arg(report_arg()),
        )
        .subcommand(
            Command::new("reparse")
                .about(t!("cli.cmd_reparse_about").to_string())
                .arg(
                    Arg::new("run-dir")
                        .help(t!("cli.arg_reparse_run_dir").to_string())
                        .value_name("RUN_DIR")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(config_arg())
                .arg(results_dir_arg())
                .arg(report_arg()),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.cmd_init_about").to_string())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help(t!("cli.arg_output").to_string())
                        .value_name("PATH")
                        .default_value(CONFIG_FILE_NAME)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("cli.arg_non_interactive").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help(t!("cli.arg_force").to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Parses the command line and dispatches to the selected subcommand.
/// 解析命令行并分派到所选的子命令。
pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let explicit_language = pre_parse_language();
    crate::init_locale(explicit_language.as_deref());

    let matches = build_cli().get_matches();
    logging::init(matches.get_count("verbose"));

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let options = RunOptions {
                targets: strings(run_matches, "target"),
                config: run_matches
                    .get_one::<PathBuf>("config")
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
                results_dir: run_matches.get_one::<PathBuf>("results-dir").cloned(),
                duration_secs: run_matches.get_one::<u64>("duration").copied(),
                warmup_secs: run_matches.get_one::<u64>("warmup").copied(),
                sizes: run_matches.get_one::<String>("sizes").cloned(),
                concurrency: run_matches.get_one::<String>("concurrency").cloned(),
                iterations: run_matches.get_one::<u32>("iterations").copied(),
                operations: run_matches.get_one::<String>("operations").cloned(),
                compare: run_matches.get_flag("compare"),
                report: run_matches.get_flag("report"),
                use_latest: run_matches.get_flag("use-latest"),
                skip_cleanup: run_matches.get_flag("skip-cleanup"),
                language_explicit: explicit_language.is_some(),
            };
            commands::run::execute(options).await?;
        }
        Some(("compare", compare_matches)) => {
            let options = CompareOptions {
                targets: strings(compare_matches, "target"),
                run_dirs: compare_matches
                    .get_many::<PathBuf>("run-dir")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default(),
                config: compare_matches
                    .get_one::<PathBuf>("config")
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
                results_dir: compare_matches.get_one::<PathBuf>("results-dir").cloned(),
                report: compare_matches.get_flag("report"),
            };
            commands::compare::execute(options).await?;
        }
        Some(("reparse", reparse_matches)) => {
            let options = ReparseOptions {
                run_dir: reparse_matches
                    .get_one::<PathBuf>("run-dir")
                    .cloned()
                    .unwrap_or_default(),
                config: reparse_matches
                    .get_one::<PathBuf>("config")
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
                results_dir: reparse_matches.get_one::<PathBuf>("results-dir").cloned(),
                report: reparse_matches.get_flag("report"),
            };
            commands::reparse::execute(options).await?;
        }
        Some(("init", init_matches)) => {
            let output = init_matches
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            let non_interactive = init_matches.get_flag("non-interactive");
            let force = init_matches.get_flag("force");
            let language = (*rust_i18n::locale()).to_string();
            commands::init::execute(output, non_interactive, force, &language)?;
        }
        _ => {
            // `subcommand_required` makes clap print help before we get here.
        }
    }
    Ok(())
}
