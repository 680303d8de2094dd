//! # Command Execution Module / 命令执行模块
//!
//! Construction of load-generator invocations, spawning with captured output streams,
//! and the two signals used by the supervisor's termination escalation.
//!
//! 负载生成器调用的构造、带输出流捕获的进程派生，以及监督器终止升级所使用的两个信号。

use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::core::config::{LoadGenerator, TargetConfig};
use crate::core::models::TrialSpec;
use crate::infra::redact::Redactor;

/// How long to wait for the output readers after the process group is gone.
/// Only a grandchild that escaped the process group can hold the pipes open this long.
pub const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A fully resolved command line for one load-generator invocation.
/// 一次负载生成器调用的完全解析的命令行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Builds the invocation for `spec` against `target`, running for `duration`.
    ///
    /// # Arguments
    /// * `generator` - Program and extra arguments of the load generator
    /// * `target` - Endpoint, credentials and addressing flags
    /// * `spec` - The trial whose operation, size and concurrency are used
    /// * `duration` - Value passed as `--duration`
    /// * `skip_cleanup` - Pass `--noclear` so uploaded objects are left in the bucket
    ///
    /// 为 `spec` 针对 `target` 构建调用，运行时长为 `duration`。
    pub fn for_trial(
        generator: &LoadGenerator,
        target: &TargetConfig,
        spec: &TrialSpec,
        duration: Duration,
        skip_cleanup: bool,
    ) -> Self {
        let mut args = vec![
            spec.operation.as_str().to_string(),
            "--host".to_string(),
            target.host().to_string(),
            "--access-key".to_string(),
            target.access_key.clone(),
            "--secret-key".to_string(),
            target.secret_key.clone(),
            "--bucket".to_string(),
            target.bucket.clone(),
            "--obj.size".to_string(),
            spec.object_size.token().to_string(),
            "--concurrent".to_string(),
            spec.concurrency.to_string(),
            "--duration".to_string(),
            format!("{}s", duration.as_secs()),
        ];
        if let Some(region) = target.region.as_deref().filter(|r| !r.is_empty()) {
            args.push("--region".to_string());
            args.push(region.to_string());
        }
        if target.uses_tls() {
            args.push("--tls".to_string());
        }
        if target.path_style {
            args.push("--lookup".to_string());
            args.push("path".to_string());
        }
        if skip_cleanup {
            args.push("--noclear".to_string());
        }
        args.push("--json".to_string());
        args.extend(generator.extra_args.iter().cloned());

        Self {
            program: generator.program.clone(),
            args,
        }
    }

    /// Creates the `tokio` command. The child gets its own process group so that the
    /// termination signals reach every process it forks.
    ///
    /// 创建 `tokio` 命令。子进程拥有自己的进程组，使终止信号能到达它派生的每个进程。
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    /// The command line with every secret masked, for logs.
    /// 所有密钥都已掩码的命令行，用于日志。
    pub fn display_redacted(&self, redactor: &Redactor) -> String {
        let line = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| shlex::try_quote(part).map(|q| q.into_owned()).unwrap_or_else(|_| part.to_string()))
            .collect::<Vec<_>>()
            .join(" ");
        redactor.redact(&line).into_owned()
    }
}

/// Bytes read so far from one output stream. Shared with the reader task so that whatever
/// arrived before a drain timeout is kept.
type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// A background task copying one stream into a [`SharedBuffer`].
#[derive(Debug)]
struct OutputReader {
    buffer: SharedBuffer,
    task: JoinHandle<()>,
}

impl OutputReader {
    fn start<R>(reader: R) -> Self
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        let buffer = SharedBuffer::default();
        let task = tokio::spawn(read_into(reader, Arc::clone(&buffer)));
        Self { buffer, task }
    }

    /// Waits for end-of-stream, at most [`READER_DRAIN_TIMEOUT`], and returns what was read.
    async fn drain(mut self) -> String {
        match tokio::time::timeout(READER_DRAIN_TIMEOUT, &mut self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("output reader task failed: {e}"),
            Err(_) => {
                self.task.abort();
                tracing::warn!(
                    "output reader did not reach end-of-stream; keeping the output read so far"
                );
            }
        }
        let bytes = std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner));
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

async fn read_into<R: tokio::io::AsyncRead + Unpin>(mut reader: R, buffer: SharedBuffer) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(&chunk[..n]),
            Err(e) => {
                tracing::debug!("stream read ended with error: {e}");
                break;
            }
        }
    }
}

/// A spawned child whose stdout and stderr are being drained by background tasks.
/// 一个已派生的子进程，其 stdout 和 stderr 正由后台任务读取。
#[derive(Debug)]
pub struct CapturedChild {
    pub child: Child,
    /// Process group id, recorded at spawn: `Child::id` is gone once the child is reaped.
    pgid: Option<u32>,
    stdout: OutputReader,
    stderr: OutputReader,
}

impl CapturedChild {
    /// Kills whatever is left of the child's process group after the child itself has exited,
    /// so that background processes it started release the output pipes.
    ///
    /// 在子进程本身退出后杀死其进程组中剩余的进程，使其启动的后台进程释放输出管道。
    pub fn kill_stragglers(&self) {
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            let Some(pgid) = self.pgid else { return };
            match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
                Ok(()) => tracing::debug!(pgid, "killed leftover processes in the group"),
                Err(Errno::ESRCH) => {}
                Err(e) => tracing::debug!("SIGKILL to process group {pgid} failed: {e}"),
            }
        }
    }

    /// Waits for both reader tasks and returns the combined output: stdout, then stderr.
    /// A stream that never reaches end-of-file contributes what was read before the timeout.
    ///
    /// 等待两个读取任务并返回合并后的输出：先 stdout，后 stderr。
    pub async fn collect_output(self) -> String {
        let (stdout, stderr) = tokio::join!(self.stdout.drain(), self.stderr.drain());
        if stderr.is_empty() {
            stdout
        } else if stdout.is_empty() || stdout.ends_with('\n') {
            format!("{stdout}{stderr}")
        } else {
            format!("{stdout}\n{stderr}")
        }
    }
}

/// Spawns a command and starts draining its stdout and stderr concurrently.
/// The streams are read to completion so that a chatty child can never block on a full pipe.
///
/// # Arguments
/// * `cmd` - The `tokio::process::Command` to execute, configured with piped output.
///
/// # Returns
/// The running child together with its reader tasks, or the spawn error.
///
/// 派生一个命令，并开始并发读取其 stdout 和 stderr。
/// 流会被读取到结束，因此输出很多的子进程永远不会因管道已满而阻塞。
pub fn spawn_captured(mut cmd: Command) -> std::io::Result<CapturedChild> {
    let mut child = cmd.spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stderr"))?;

    Ok(CapturedChild {
        pgid: child.id(),
        child,
        stdout: OutputReader::start(stdout),
        stderr: OutputReader::start(stderr),
    })
}

/// First escalation stage: asks the child's process group to shut down (SIGTERM).
/// 第一个升级阶段：请求子进程的进程组关闭（SIGTERM）。
pub fn request_termination(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                tracing::debug!("SIGTERM to process group {pid} failed: {e}");
            }
        }
    }
    #[cfg(not(unix))]
    {
        // No graceful signal on this platform; the forced stage follows after the grace period.
        let _ = child;
    }
}

/// Second escalation stage: kills the child's process group outright (SIGKILL).
/// 第二个升级阶段：直接杀死子进程的进程组（SIGKILL）。
pub fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                tracing::debug!("SIGKILL to process group {pid} failed: {e}");
            }
        }
    }
    if let Err(e) = child.start_kill() {
        tracing::debug!("start_kill failed: {e}");
    }
}

/// Runs a short auxiliary command (e.g. `warp --version`) and returns its first output line.
/// Best effort: any failure yields `None`.
///
/// 运行一个简短的辅助命令（例如 `warp --version`）并返回其输出的第一行。尽力而为：任何失败都返回 `None`。
pub async fn probe_first_line(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let output = tokio::time::timeout(timeout, cmd.output()).await.ok()?.ok()?;
    let text = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        String::from_utf8_lossy(&output.stdout).into_owned()
    };
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
