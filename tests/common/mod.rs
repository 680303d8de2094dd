// Shared test helpers for integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use s3_matrix_bench::config::{
    LoadGenerator, MatrixSettings, NamedTarget, PreflightSettings, ReportSettings,
    RunConfiguration, SupervisorSettings, TargetConfig,
};
use tempfile::{TempDir, tempdir};

pub const ACCESS_KEY: &str = "AKIATESTKEY1234567890";
pub const SECRET_KEY: &str = "wJalrXUtnFEMIK7MDENGbPxRfiCYSECRETKEY0";
pub const MASKED_SECRET: &str = "wJal****KEY0";

/// A warp v2 payload preceded by progress text, like real warp output.
pub const WARP_V2_OUTPUT: &str = r#"Throughput 100.0MiB/s within 7.500000% for 7s. Assuming stability. Terminating benchmark.

{
  "v": 2,
  "total": {
    "total_requests": 100,
    "total_objects": 100,
    "total_errors": 0,
    "total_bytes": 104857600,
    "throughput": {
      "measure_duration_millis": 5000,
      "bytes": 104857600,
      "objects": 100,
      "ops": 100
    },
    "requests_by_client": {
      "client1": [
        {
          "single_sized_requests": {
            "first_byte": {
              "average_millis": 20.5,
              "median_millis": 19.0,
              "p90_millis": 24.0,
              "p99_millis": 26.0
            }
          }
        }
      ]
    }
  },
  "by_op_type": {
    "GET": {
      "throughput": { "measure_duration_millis": 5000, "bytes": 104857600, "ops": 100 },
      "requests_by_client": {}
    }
  }
}
"#;

/// Creates a temporary workspace for one test.
pub fn setup_test_environment() -> TempDir {
    tempdir().expect("Failed to create temporary directory")
}

/// Writes an executable shell script that behaves like a load generator.
/// Every script answers `--version` first so environment probing never runs the body.
pub fn write_generator(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let script = format!(
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo \"fake-warp 0.0.1\"; exit 0; fi\n{body}\n"
    );
    fs::write(&path, script).expect("Failed to write generator script");
    make_executable(&path);
    path
}

#[cfg(unix)]
pub fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

/// Prints a valid warp v2 report and exits 0.
pub fn success_generator(dir: &Path) -> PathBuf {
    let payload = dir.join("payload.json");
    fs::write(&payload, WARP_V2_OUTPUT).unwrap();
    write_generator(dir, "warp-ok", &format!("cat '{}'", payload.display()))
}

/// Never exits on its own but dies on SIGTERM.
pub fn hanging_generator(dir: &Path) -> PathBuf {
    write_generator(dir, "warp-hang", "echo starting\nsleep 1000")
}

/// Ignores SIGTERM, so only SIGKILL ends it.
pub fn stubborn_generator(dir: &Path) -> PathBuf {
    write_generator(
        dir,
        "warp-stubborn",
        "trap '' TERM\necho ignoring TERM\nwhile true; do sleep 1; done",
    )
}

/// Exits cleanly with human-readable text (echoing its arguments) instead of JSON.
pub fn garbage_generator(dir: &Path) -> PathBuf {
    write_generator(
        dir,
        "warp-garbage",
        "echo \"warp: unexpected response, invoked as: $*\"\necho 'no json here'",
    )
}

/// Prints a valid report, then exits while a background process still holds stdout open.
pub fn straggling_generator(dir: &Path) -> PathBuf {
    let payload = dir.join("payload.json");
    fs::write(&payload, WARP_V2_OUTPUT).unwrap();
    write_generator(
        dir,
        "warp-straggler",
        &format!("cat '{}'
sleep 30 &
exit 0", payload.display()),
    )
}

/// Writes to stderr and exits with status 3.
pub fn failing_generator(dir: &Path) -> PathBuf {
    write_generator(
        dir,
        "warp-fail",
        "echo \"fatal: access denied for $*\" >&2\nexit 3",
    )
}

/// Records every invocation into `marker` before succeeding.
pub fn recording_generator(dir: &Path, marker: &Path) -> PathBuf {
    let payload = dir.join("payload.json");
    fs::write(&payload, WARP_V2_OUTPUT).unwrap();
    write_generator(
        dir,
        "warp-recording",
        &format!(
            "echo \"$*\" >> '{}'\ncat '{}'",
            marker.display(),
            payload.display()
        ),
    )
}

pub fn target_config(endpoint: &str) -> TargetConfig {
    TargetConfig {
        endpoint: endpoint.to_string(),
        access_key: ACCESS_KEY.to_string(),
        secret_key: SECRET_KEY.to_string(),
        bucket: "bench-bucket".to_string(),
        region: Some("us-east-1".to_string()),
        tls: false,
        path_style: true,
    }
}

pub fn named_target(name: &str) -> NamedTarget {
    NamedTarget {
        name: name.to_string(),
        config: target_config("127.0.0.1:9000"),
    }
}

/// A single-cell matrix: {put} x {1MiB} x {8} x 1, one second per trial.
pub fn single_cell_matrix() -> MatrixSettings {
    MatrixSettings {
        operations: vec!["put".to_string()],
        sizes: vec!["1MiB".to_string()],
        concurrency: vec![8],
        iterations: 1,
        duration_secs: 1,
        warmup_secs: 0,
        durations: BTreeMap::new(),
    }
}

/// Supervisor timing short enough for tests.
pub fn fast_supervisor() -> SupervisorSettings {
    SupervisorSettings {
        heartbeat: Duration::from_millis(200),
        safety_buffer: Duration::from_millis(500),
        grace_period: Duration::from_millis(500),
    }
}

pub fn run_configuration(
    results_dir: &Path,
    program: &Path,
    matrix: MatrixSettings,
    targets: &[&str],
) -> RunConfiguration {
    RunConfiguration {
        results_dir: results_dir.to_path_buf(),
        matrix,
        supervisor: fast_supervisor(),
        load_generator: LoadGenerator {
            program: program.display().to_string(),
            extra_args: vec![],
        },
        preflight: PreflightSettings {
            check_reachability: false,
            connect_timeout_secs: 1,
        },
        report: ReportSettings::default(),
        skip_cleanup: false,
        targets: targets.iter().map(|name| named_target(name)).collect(),
    }
}

/// Concatenated contents of every file under `dir`, recursively.
pub fn read_tree(dir: &Path) -> String {
    let mut out = String::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            out.push_str(&read_tree(&path));
        } else {
            out.push_str(&String::from_utf8_lossy(&fs::read(&path).unwrap()));
        }
    }
    out
}

/// Writes a `BenchMatrix.toml` for the CLI tests.
pub fn write_config_file(dir: &Path, program: &Path, targets: &[&str], extra: &str) -> PathBuf {
    let mut content = format!(
        r#"language = "en"
results_dir = "{results}"

[load_generator]
program = "{program}"

[matrix]
operations = ["put"]
sizes = ["1MiB"]
concurrency = [8]
iterations = 1
duration_secs = 1

[supervisor]
heartbeat_secs = 1
timeout_buffer_secs = 2
grace_secs = 1

[preflight]
check_reachability = false
{extra}
"#,
        results = dir.join("results").display(),
        program = program.display(),
    );
    for name in targets {
        content.push_str(&format!(
            r#"
[targets.{name}]
endpoint = "127.0.0.1:9000"
access_key = "{ACCESS_KEY}"
secret_key = "{SECRET_KEY}"
bucket = "bench-bucket"
path_style = true
"#
        ));
    }
    let path = dir.join("BenchMatrix.toml");
    fs::write(&path, content).unwrap();
    path
}
