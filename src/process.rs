//! Subprocess execution with timeout and cancellation.
//!
//! Every external program the build starts (git and the `before_cmds` shell
//! commands) goes through [`Cmd`]. The child is polled instead of waited on, so
//! a configured timeout or a tripped [`CancelToken`] kills it rather than
//! blocking the calling task forever.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Shared flag telling concurrent tasks to stop as soon as possible.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Return `Cancelled` if the token has been tripped.
    pub fn check(&self, context: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled {
                context: context.to_string(),
            });
        }
        Ok(())
    }
}

/// Result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit status of the command.
    pub status: ExitStatus,
    /// Captured stdout, empty when stdio was inherited.
    pub stdout: String,
    /// Captured stderr, empty when stdio was inherited.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true if the command exited successfully.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Get stdout, trimmed of whitespace.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Get stderr, trimmed of whitespace.
    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// Builder for configuring command execution.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    /// Inherit the parent's stdin/stdout/stderr instead of capturing.
    inherit_stdio: bool,
    timeout: Option<Duration>,
    cancel: Option<CancelToken>,
    /// Shown in errors instead of program + args (used for shell commands).
    display: Option<String>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            current_dir: None,
            inherit_stdio: false,
            timeout: None,
            cancel: None,
            display: None,
        }
    }

    /// A command line run through the platform shell.
    ///
    /// A timeout or cancellation kills only the shell process. Programs the
    /// command line started, such as `npm` in `cd js && npm ci`, are not
    /// killed and may keep running after [`Cmd::run`] returns.
    pub fn shell(command_line: impl AsRef<str>) -> Self {
        let command_line = command_line.as_ref();
        let cmd = if cfg!(windows) {
            Cmd::new("cmd").args(["/C", command_line])
        } else {
            Cmd::new("sh").args(["-c", command_line])
        };
        Self {
            display: Some(command_line.to_string()),
            ..cmd
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Add a path as an argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Set the working directory.
    pub fn dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Let the child write straight to the terminal.
    pub fn inherit_stdio(mut self) -> Self {
        self.inherit_stdio = true;
        self
    }

    /// Kill the child if it runs longer than `timeout`. Its own children are
    /// left running.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Kill the child when `token` is cancelled.
    pub fn cancel_on(mut self, token: &CancelToken) -> Self {
        self.cancel = Some(token.clone());
        self
    }

    /// Human readable form of the command for logs and errors.
    pub fn display(&self) -> String {
        match &self.display {
            Some(display) => display.clone(),
            None if self.args.is_empty() => self.program.clone(),
            None => format!("{} {}", self.program, self.args.join(" ")),
        }
    }

    /// Run the command to completion.
    ///
    /// A non-zero exit is not an error here; callers inspect
    /// [`CommandOutput::status`]. Errors are reserved for commands that could
    /// not be started, timed out, or were cancelled.
    pub fn run(self) -> Result<CommandOutput> {
        let display = self.display();
        let dir = self
            .current_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(token) = &self.cancel {
            token.check(&display)?;
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        if self.inherit_stdio {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }

        let mut child = cmd.spawn().map_err(|e| Error::CommandFailed {
            command: display.clone(),
            dir: dir.clone(),
            status: format!("could not start '{}' ({})", self.program, e),
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child, &display)?;

        Ok(CommandOutput {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    fn wait(&self, child: &mut Child, display: &str) -> Result<ExitStatus> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }

            if let Some(token) = &self.cancel {
                if token.is_cancelled() {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::Cancelled {
                        context: display.to_string(),
                    });
                }
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::CommandTimeout {
                        command: display.to_string(),
                        seconds: timeout.as_secs(),
                    });
                }
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .map(|handle| handle.join().unwrap_or_default())
        .unwrap_or_default()
}
