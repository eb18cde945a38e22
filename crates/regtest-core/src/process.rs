//! External commands with their output streamed into the log
//!
//! Every output stream of a child process gets its own reader thread. The
//! readers re-enter the [`LogContext`] of the thread that started the
//! process, so their lines are attributed to the case and phase that
//! launched it.

use crate::error::ProcessError;
use regtest_trace::LogContext;
use std::{
    fs::{
        File,
        OpenOptions,
    },
    io::{
        self,
        BufRead,
        BufReader,
        Read,
        Write,
    },
    path::{
        Path,
        PathBuf,
    },
    process::{
        Child,
        Command,
        ExitStatus,
        Stdio,
    },
    thread::{
        self,
        JoinHandle,
    },
};
use tracing::Level;

const TARGET: &str = "process_runner";

#[derive(Debug, Clone, PartialEq, Eq)]
enum CommandLine {
    Args(Vec<String>),
    /// Run through `sh -c`
    Shell(String),
}

/// An external command and how its output is handled.
///
/// ```no_run
/// use regtest_core::process::ProcessCommand;
///
/// ProcessCommand::shell("make -j")
///     .current_dir("/opt/gamer/src")
///     .merge_streams()
///     .tee_stdout("make.log")
///     .run()?;
/// # Ok::<(), regtest_core::error::ProcessError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    command: CommandLine,
    cwd: Option<PathBuf>,
    merge_streams: bool,
    tee_stdout: Option<PathBuf>,
    tee_stderr: Option<PathBuf>,
    level: Level,
    check: bool,
}

impl ProcessCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_line(CommandLine::Args(args.into_iter().map(Into::into).collect()))
    }

    pub fn shell(command: impl Into<String>) -> Self {
        Self::with_line(CommandLine::Shell(command.into()))
    }

    fn with_line(command: CommandLine) -> Self {
        Self {
            command,
            cwd: None,
            merge_streams: false,
            tee_stdout: None,
            tee_stderr: None,
            level: Level::DEBUG,
            check: true,
        }
    }

    pub fn current_dir(
        mut self,
        dir: impl Into<PathBuf>,
    ) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Send stderr into the stdout stream
    pub fn merge_streams(mut self) -> Self {
        self.merge_streams = true;
        self
    }

    /// Append the raw stdout bytes to `path`; relative paths follow the working directory
    pub fn tee_stdout(
        mut self,
        path: impl Into<PathBuf>,
    ) -> Self {
        self.tee_stdout = Some(path.into());
        self
    }

    pub fn tee_stderr(
        mut self,
        path: impl Into<PathBuf>,
    ) -> Self {
        self.tee_stderr = Some(path.into());
        self
    }

    /// Level at which output lines are logged
    pub fn level(
        mut self,
        level: Level,
    ) -> Self {
        self.level = level;
        self
    }

    /// Do not treat a non-zero exit as an error
    pub fn unchecked(mut self) -> Self {
        self.check = false;
        self
    }

    pub fn display(&self) -> String {
        match &self.command {
            CommandLine::Args(args) => args.join(" "),
            CommandLine::Shell(line) => line.clone(),
        }
    }

    fn command(&self) -> Command {
        let mut command = match &self.command {
            CommandLine::Args(args) => {
                let mut command = Command::new(args.first().map_or("", String::as_str));
                command.args(args.iter().skip(1));
                command
            },
            CommandLine::Shell(line) => {
                let mut command = Command::new("sh");
                command.arg("-c").arg(line);
                command
            },
        };
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        command.stdin(Stdio::null());
        command
    }

    fn resolve(
        &self,
        path: &Path,
    ) -> PathBuf {
        match &self.cwd {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn open_tee(
        &self,
        path: Option<&PathBuf>,
    ) -> Result<Option<File>, ProcessError> {
        path.map(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.resolve(path))
        })
        .transpose()
        .map_err(ProcessError::from)
    }

    fn spawn(
        &self,
        command: &mut Command,
    ) -> Result<Child, ProcessError> {
        command.spawn().map_err(|source| ProcessError::Spawn {
            command: self.display(),
            source,
        })
    }

    /// Run to completion, blocking until the process has exited and its
    /// output has been fully drained.
    pub fn run(&self) -> Result<ExitStatus, ProcessError> {
        let ctx = LogContext::capture();
        let stdout_tee = self.open_tee(self.tee_stdout.as_ref())?;
        let stderr_tee = self.open_tee(self.tee_stderr.as_ref())?;

        tracing::debug!(target: TARGET, "Running: {}", self.display());
        let mut workers = Vec::with_capacity(2);
        let mut child = {
            // the command holds the write end of the merged pipe; it must be
            // dropped before the reader can see EOF
            let mut command = self.command();
            if self.merge_streams {
                let (reader, writer) = io::pipe()?;
                command.stdout(writer.try_clone()?).stderr(writer);
                let mut child = self.spawn(&mut command)?;
                match spawn_stream_worker("stdout", reader, stdout_tee, self.level, ctx) {
                    Ok(worker) => workers.push(worker),
                    Err(err) => return Err(abandon(&mut child, err)),
                }
                child
            } else {
                command.stdout(Stdio::piped()).stderr(Stdio::piped());
                let mut child = self.spawn(&mut command)?;
                let streams = (child.stdout.take(), child.stderr.take());
                if let (Some(out), Some(err)) = streams {
                    let started = spawn_stream_worker(
                        "stdout",
                        out,
                        stdout_tee,
                        self.level,
                        ctx.clone(),
                    )
                    .and_then(|worker| {
                        workers.push(worker);
                        spawn_stream_worker("stderr", err, stderr_tee, self.level, ctx)
                    });
                    match started {
                        Ok(worker) => workers.push(worker),
                        Err(err) => return Err(abandon(&mut child, err)),
                    }
                }
                child
            }
        };

        let status = child.wait()?;
        for worker in workers {
            if worker.join().is_err() {
                tracing::warn!(target: TARGET, "output reader of '{}' panicked", self.display());
            }
        }
        if self.check && !status.success() {
            return Err(ProcessError::Exit {
                command: self.display(),
                status,
            });
        }
        Ok(status)
    }
}

fn abandon(
    child: &mut Child,
    err: io::Error,
) -> ProcessError {
    let _ = child.kill();
    let _ = child.wait();
    ProcessError::Io(err)
}

fn spawn_stream_worker<R>(
    name: &str,
    stream: R,
    tee: Option<File>,
    level: Level,
    ctx: LogContext,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || ctx.in_scope(|| pump(stream, tee, level)))
}

/// Forward `stream` line by line until EOF.
fn pump<R: Read>(
    stream: R,
    mut tee: Option<File>,
    level: Level,
) {
    let mut reader = BufReader::new(stream);
    let mut chunk = Vec::new();
    loop {
        chunk.clear();
        match reader.read_until(b'\n', &mut chunk) {
            Ok(0) => break,
            Ok(_) => {},
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::warn!(target: TARGET, "failed to read process output: {}", err);
                break;
            },
        }
        if let Some(file) = tee.as_mut()
            && let Err(err) = file.write_all(&chunk)
        {
            tracing::warn!(target: TARGET, "stopped teeing process output: {}", err);
            tee = None;
        }
        let decoded = String::from_utf8_lossy(&chunk);
        let line = decoded.trim_end_matches(['\n', '\r']);
        if !line.is_empty() {
            log_line(level, line);
        }
    }
}

fn log_line(
    level: Level,
    line: &str,
) {
    match level {
        Level::ERROR => tracing::error!(target: TARGET, "{}", line),
        Level::WARN => tracing::warn!(target: TARGET, "{}", line),
        Level::INFO => tracing::info!(target: TARGET, "{}", line),
        Level::DEBUG => tracing::debug!(target: TARGET, "{}", line),
        Level::TRACE => tracing::trace!(target: TARGET, "{}", line),
    }
}
