//! Subprocess invocation and execution.
//!
//! Every external tool the pipeline drives (pyenv, python, pip, delocate,
//! auditwheel) goes through [`CommandRunner`], so the orchestration can be
//! exercised without the tools installed.

use super::builder::tool_detection::locate_program;
use super::{Error, Result};
use crate::cli::OutputManager;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// A fully described subprocess call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
    env_removals: Vec<OsString>,
}

impl Invocation {
    /// Starts an invocation of `program`.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            ..Default::default()
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Sets the working directory.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets an environment variable for the child. Later values win.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        let key = key.as_ref().to_os_string();
        self.envs.retain(|(k, _)| *k != key);
        self.env_removals.retain(|k| *k != key);
        self.envs.push((key, value.as_ref().to_os_string()));
        self
    }

    /// Removes an environment variable from the child.
    pub fn env_remove(mut self, key: impl AsRef<OsStr>) -> Self {
        let key = key.as_ref().to_os_string();
        self.envs.retain(|(k, _)| *k != key);
        self.env_removals.push(key);
        self
    }

    /// Program as invoked.
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments in order.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Working directory, if set.
    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Value of an environment override, if set.
    pub fn get_env(&self, key: &str) -> Option<&OsStr> {
        self.envs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Whether `key` is removed from the child environment.
    pub fn removes_env(&self, key: &str) -> bool {
        self.env_removals.iter().any(|k| k == key)
    }

    /// Program name as a lossy string.
    pub fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .unwrap_or(&self.program)
            .to_string_lossy()
            .into_owned()
    }

    fn to_command(&self, program: &Path) -> Command {
        let mut command = Command::new(program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        for key in &self.env_removals {
            command.env_remove(key);
        }
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        command
    }
}

impl fmt::Display for Invocation {
    /// Shell-like rendering used in logs and error messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('"') {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of a finished subprocess.
#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// A successful output carrying `stdout`.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status 0.
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes subprocesses for the pipeline.
///
/// Implementations report the child's status in [`CommandOutput`]; only
/// failures to start or wait on the child are errors. Use
/// [`CommandRunner::run_checked`] for fail-fast semantics.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Runs the invocation to completion.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Runs the invocation and turns a non-zero status into [`Error::CommandFailed`].
    async fn run_checked(&self, invocation: &Invocation) -> Result<CommandOutput> {
        log::debug!("Running: {}", invocation);
        let output = self.run(invocation).await?;
        if output.is_success() {
            Ok(output)
        } else {
            Err(Error::CommandFailed {
                command: invocation.to_string(),
                code: output.code,
                stderr: output.stderr,
            })
        }
    }
}

/// Runs invocations as real child processes.
///
/// Stdout is streamed to the output manager line by line while being
/// captured; stderr is captured and echoed in verbose mode.
pub struct ProcessRunner {
    output: OutputManager,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Creates a runner that reports through `output`.
    ///
    /// # Arguments
    ///
    /// * `output` - Output manager for streamed subprocess output
    /// * `timeout` - Per-command timeout; `None` waits indefinitely
    pub fn new(output: OutputManager, timeout: Option<Duration>) -> Self {
        Self { output, timeout }
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let program = locate_program(invocation)?;

        let mut command = invocation.to_command(&program);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout also reaches compilers spawned by pip or setup.py
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| Error::GenericError(format!("failed to spawn `{}`: {}", invocation, e)))?;
        let pid = child.id();

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        // Both streams must be drained before waiting, or a chatty child blocks on a full pipe
        let completion = async {
            let (stdout, stderr) = tokio::join!(
                drain_lines(stdout_pipe, |line| {
                    let _ = self.output.indent(line);
                }),
                drain_lines(stderr_pipe, |line| {
                    let _ = self.output.verbose(line);
                })
            );
            (stdout, stderr, child.wait().await)
        };

        let finished = match self.timeout {
            None => Some(completion.await),
            Some(limit) => tokio::time::timeout(limit, completion).await.ok(),
        };
        let Some((stdout, stderr, status)) = finished else {
            #[cfg(unix)]
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            #[cfg(not(unix))]
            let _ = pid;
            if let Err(e) = child.kill().await {
                log::warn!("Failed to kill `{}` after timeout: {}", invocation, e);
            }
            return Err(Error::CommandTimedOut {
                command: invocation.to_string(),
                seconds: self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
            });
        };
        let status = status?;

        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Sends SIGKILL to every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        log::debug!("Failed to kill process group {}: {}", raw, e);
    }
}

/// Reads a pipe to EOF, handing each line to `sink` and returning the full text.
///
/// Lines are decoded lossily: tools print paths and locale messages that are
/// not UTF-8, and stopping early would close the pipe under a live child.
async fn drain_lines<R>(pipe: Option<R>, mut sink: impl FnMut(&str)) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut captured = String::new();
    let Some(pipe) = pipe else {
        return captured;
    };

    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text
                    .strip_suffix('\n')
                    .map(|l| l.strip_suffix('\r').unwrap_or(l))
                    .unwrap_or(&*text);
                sink(line);
                captured.push_str(line);
                captured.push('\n');
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Stopped reading subprocess output: {}", e);
                break;
            }
        }
    }
    captured
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let inv = Invocation::new("python").args(["-c", "import ssh2; import pssh"]);
        assert_eq!(inv.to_string(), r#"python -c "import ssh2; import pssh""#);
    }

    #[test]
    fn later_env_overrides_replace_earlier_ones() {
        let inv = Invocation::new("pip")
            .env("PATH", "/a")
            .env_remove("PYTHONPATH")
            .env("PATH", "/b");
        assert_eq!(inv.get_env("PATH"), Some(OsStr::new("/b")));
        assert!(inv.removes_env("PYTHONPATH"));
    }

    #[test]
    fn program_name_strips_directories() {
        let inv = Invocation::new("/opt/venv/bin/python");
        assert_eq!(inv.program_name(), "python");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_reports_status_and_output() {
        let runner = ProcessRunner::new(OutputManager::new(false, true), None);
        let ok = runner
            .run(&Invocation::new("sh").args(["-c", "echo hello; echo oops >&2"]))
            .await
            .unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.stdout, "hello\n");
        assert_eq!(ok.stderr, "oops\n");

        let err = runner
            .run_checked(&Invocation::new("sh").args(["-c", "exit 7"]))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 7);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_kills_on_timeout() {
        let runner = ProcessRunner::new(
            OutputManager::new(false, true),
            Some(Duration::from_millis(200)),
        );
        let err = runner
            .run(&Invocation::new("sh").args(["-c", "sleep 5"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandTimedOut { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_output_is_captured_to_the_end() {
        let runner = ProcessRunner::new(OutputManager::new(false, true), None);
        let script = "printf 'caf\\351\\n'; \
            i=0; while [ $i -lt 20000 ]; do echo \"line $i\"; i=$((i+1)); done; \
            echo /usr/local/lib/libssh2.1.dylib";
        let output = runner
            .run(&Invocation::new("sh").args(["-c", script]))
            .await
            .unwrap();

        assert!(output.is_success(), "exit: {:?}", output.code);
        assert!(output.stdout.starts_with("caf\u{FFFD}\n"));
        assert_eq!(output.stdout.lines().count(), 20002);
        assert!(output.stdout.ends_with("/usr/local/lib/libssh2.1.dylib\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_grandchildren() {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("sleep.pid");
        let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
        let runner = ProcessRunner::new(
            OutputManager::new(false, true),
            Some(Duration::from_millis(500)),
        );
        let err = runner
            .run(&Invocation::new("sh").args(["-c", script.as_str()]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandTimedOut { .. }));

        let pid: i32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let gone = |pid: i32| {
            kill(Pid::from_raw(pid), None).is_err()
                || std::fs::read_to_string(format!("/proc/{pid}/stat"))
                    .is_ok_and(|stat| stat.contains(") Z "))
        };
        let mut dead = false;
        for _ in 0..50 {
            if gone(pid) {
                dead = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(dead, "grandchild {} survived the timeout", pid);
    }

    #[tokio::test]
    async fn missing_tool_is_reported_by_name() {
        let runner = ProcessRunner::new(OutputManager::new(false, true), None);
        let err = runner
            .run(&Invocation::new("definitely-not-a-real-tool-4821"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { ref program, .. } if program == "definitely-not-a-real-tool-4821"));
    }
}
