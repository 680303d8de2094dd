//! # Init Command Module / 初始化命令模块
//!
//! This module implements the `init` command, which creates a new `BenchMatrix.toml`, either
//! from a commented template or through a short interactive wizard.
//!
//! 此模块实现了 `init` 命令，用于创建新的 `BenchMatrix.toml`，
//! 可以来自带注释的模板，也可以通过简短的交互式向导生成。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::{fs, path::Path, path::PathBuf};

use crate::core::config::{BenchMatrix, MatrixSettings, TargetConfig};
use crate::core::models::ObjectSize;
use crate::infra::t;

const DEFAULT_CONFIG: &str = r#"# Benchmark Matrix Configuration / 基准测试矩阵配置

# Language for console messages / 控制台消息的语言
language = "en"

# Root of the result history / 结果历史的根目录
results_dir = "results"

[load_generator]
program = "warp"
# Appended verbatim to every invocation / 原样追加到每次调用
extra_args = []

[matrix]
operations = ["put", "get"]
sizes = ["4KiB", "1MiB", "16MiB"]
concurrency = [8, 32]
iterations = 1
# Default trial duration and warmup in seconds / 默认试验时长和预热时长（秒）
duration_secs = 60
warmup_secs = 0

# Per-operation duration overrides / 按操作覆盖的持续时间
[matrix.durations]
get = 120

[supervisor]
heartbeat_secs = 30
# Hard timeout = duration + timeout_buffer_secs / 硬超时 = 持续时间 + 缓冲
timeout_buffer_secs = 300
# Time between SIGTERM and SIGKILL / SIGTERM 与 SIGKILL 之间的时间
grace_secs = 15

[preflight]
check_reachability = true
connect_timeout_secs = 5

[report]
# External renderer; --input/--output/--charts/--targets are appended
# 外部渲染器；会追加 --input/--output/--charts/--targets 参数
# command = "python3 perf-tests/report.py"

# Credentials are read from the environment / 凭据从环境变量读取
[targets.aws]
endpoint = "https://s3.us-east-1.amazonaws.com"
access_key = "${AWS_ACCESS_KEY_ID}"
secret_key = "${AWS_SECRET_ACCESS_KEY}"
bucket = "${BENCH_BUCKET}"
region = "us-east-1"

[targets.minio]
endpoint = "http://127.0.0.1:9000"
access_key = "${MINIO_ACCESS_KEY}"
secret_key = "${MINIO_SECRET_KEY}"
bucket = "bench"
path_style = true
"#;

/// Executes the init command.
///
/// # Arguments
/// * `output` - Path for the new configuration file
/// * `non_interactive` - Write the commented template instead of running the wizard
/// * `force` - Overwrite an existing file without asking
/// * `language` - Language written into the generated file
pub fn execute(output: PathBuf, non_interactive: bool, force: bool, language: &str) -> Result<()> {
    if non_interactive {
        if output.exists() && !force {
            println!(
                "{}",
                t!("init.file_exists", path = output.display()).red()
            );
            println!("{}", t!("init.use_force").yellow());
            return Ok(());
        }
        let content = DEFAULT_CONFIG.replacen(
            "language = \"en\"",
            &format!("language = \"{language}\""),
            1,
        );
        write_config(&output, &content)?;
    } else {
        run_wizard(&output, force, language)?;
    }
    Ok(())
}

/// Runs the interactive wizard and writes the resulting configuration.
/// 运行交互式向导并写入生成的配置。
fn run_wizard(output: &Path, force: bool, language: &str) -> Result<()> {
    let theme = ColorfulTheme::default();
    println!("\n{}", t!("init.wizard_welcome").bold().cyan());
    println!("{}\n", t!("init.wizard_description"));

    if output.exists() && !force {
        let overwrite = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", path = output.display()).to_string())
            .default(false)
            .interact()
            .context(t!("init.confirmation_failed").to_string())?;
        if !overwrite {
            println!("{}", t!("init.aborted").yellow());
            return Ok(());
        }
    }

    let name: String = Input::with_theme(&theme)
        .with_prompt(t!("init.prompt_target_name").to_string())
        .default("minio".to_string())
        .validate_with(|input: &String| -> Result<(), String> {
            if !input.is_empty()
                && input
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            {
                Ok(())
            } else {
                Err(t!("init.invalid_target_name").to_string())
            }
        })
        .interact_text()?;
    let endpoint: String = Input::with_theme(&theme)
        .with_prompt(t!("init.prompt_endpoint").to_string())
        .default("http://127.0.0.1:9000".to_string())
        .interact_text()?;
    let bucket: String = Input::with_theme(&theme)
        .with_prompt(t!("init.prompt_bucket").to_string())
        .default("bench".to_string())
        .interact_text()?;
    let region: String = Input::with_theme(&theme)
        .with_prompt(t!("init.prompt_region").to_string())
        .allow_empty(true)
        .interact_text()?;
    let access_var: String = Input::with_theme(&theme)
        .with_prompt(t!("init.prompt_access_key_var").to_string())
        .default("S3_ACCESS_KEY".to_string())
        .interact_text()?;
    let secret_var: String = Input::with_theme(&theme)
        .with_prompt(t!("init.prompt_secret_key_var").to_string())
        .default("S3_SECRET_KEY".to_string())
        .interact_text()?;
    let sizes: String = Input::with_theme(&theme)
        .with_prompt(t!("init.prompt_sizes").to_string())
        .default("4KiB,1MiB".to_string())
        .validate_with(|input: &String| -> Result<(), String> {
            input
                .split(',')
                .map(|size| size.parse::<ObjectSize>().map(|_| ()))
                .collect::<Result<(), _>>()
                .map_err(|e| e.to_string())
        })
        .interact_text()?;
    let duration_secs: u64 = Input::with_theme(&theme)
        .with_prompt(t!("init.prompt_duration").to_string())
        .default(60)
        .interact_text()?;
    let path_style = Confirm::with_theme(&theme)
        .with_prompt(t!("init.prompt_path_style").to_string())
        .default(true)
        .interact()?;

    let mut config = BenchMatrix {
        language: language.to_string(),
        matrix: MatrixSettings {
            sizes: crate::core::config::split_list(&sizes),
            duration_secs,
            ..MatrixSettings::default()
        },
        ..BenchMatrix::default()
    };
    config.targets.insert(
        name,
        TargetConfig {
            endpoint,
            access_key: format!("${{{access_var}}}"),
            secret_key: format!("${{{secret_var}}}"),
            bucket,
            region: Some(region).filter(|r| !r.trim().is_empty()),
            tls: false,
            path_style,
        },
    );

    let toml_string =
        toml::to_string_pretty(&config).context(t!("init.serialize_failed").to_string())?;
    write_config(output, &toml_string)
}

fn write_config(output: &Path, content: &str) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).with_context(|| {
                t!("init.create_parent_dir_failed", path = parent.display()).to_string()
            })?;
        }
    }
    fs::write(output, content)
        .with_context(|| t!("init.write_failed", path = output.display()).to_string())?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success", path = output.display()).bold()
    );
    println!("{}", t!("init.next_steps"));
    Ok(())
}
