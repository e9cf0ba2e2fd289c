//! External command execution.
//!
//! Every platform tool (`netsh`, `nmcli`, `resolvectl`, `networksetup`, ...)
//! is driven through [`CommandRunner`], so the method tables can be exercised
//! against scripted output in tests.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::{DnsError, Result};

/// Captured result of one finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run with the given exit code and stderr.
    #[must_use]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }

    /// Trimmed stderr, falling back to stdout.
    #[must_use]
    pub fn message(&self) -> &str {
        let err = self.stderr.trim();
        if err.is_empty() { self.stdout.trim() } else { err }
    }

    /// Converts a non-zero exit into [`DnsError::ToolFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::ToolFailed`] when the command did not exit 0.
    pub fn check(self, tool: &str) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let status = self
            .status
            .map_or_else(|| "signal".to_string(), |c| format!("exit {c}"));
        Err(DnsError::ToolFailed {
            tool: tool.to_string(),
            status,
            message: self.message().to_string(),
        })
    }
}

/// Runs an external program to completion.
pub trait CommandRunner {
    /// Runs `program` with `args`, waiting at most `timeout` when given.
    ///
    /// A non-zero exit is *not* an error here; callers decide via
    /// [`CommandOutput::check`].
    ///
    /// # Errors
    ///
    /// [`DnsError::ToolAbsent`] when the executable cannot be found,
    /// [`DnsError::ToolTimedOut`] when the budget runs out (the child is
    /// killed), [`DnsError::Io`] for other spawn/wait failures.
    fn run(&self, program: &str, args: &[&str], timeout: Option<Duration>) -> Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[&str], timeout: Option<Duration>) -> Result<CommandOutput> {
        (**self).run(program, args, timeout)
    }
}

/// [`CommandRunner`] backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], timeout: Option<Duration>) -> Result<CommandOutput> {
        tracing::debug!(tool = %program, args = ?args, "Running command");
        let child = match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DnsError::ToolAbsent {
                    tool: program.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let Some(limit) = timeout else {
            let output = child.wait_with_output()?;
            return Ok(CommandOutput {
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        };

        wait_bounded(program, child, limit)
    }
}

/// Waits for `child` while draining its pipes on helper threads, killing it
/// once `limit` has elapsed.
fn wait_bounded(program: &str, mut child: Child, limit: Duration) -> Result<CommandOutput> {
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let Some(status) = child.wait_timeout(limit)? else {
        if let Err(e) = child.kill() {
            tracing::warn!(tool = %program, error = %e, "Failed to kill timed-out command");
        }
        // Reap; the reader threads are left to finish on their own.
        let _ = child.wait();
        return Err(DnsError::ToolTimedOut {
            tool: program.to_string(),
            after: limit,
        });
    };

    let collect = |handle: Option<thread::JoinHandle<Vec<u8>>>| {
        handle
            .and_then(|h| h.join().ok())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    };
    Ok(CommandOutput {
        status: status.code(),
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn spawn_reader<T: Read + Send + 'static>(mut pipe: T) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted runner for driving method tables in unit tests.

    use super::{CommandOutput, CommandRunner};
    use crate::error::{DnsError, Result};
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    /// Replies keyed by the full command line (`program arg1 arg2`).
    ///
    /// Unscripted commands fail with exit 1 when their program is marked
    /// installed, and report [`DnsError::ToolAbsent`] otherwise.
    #[derive(Default)]
    pub struct ScriptedRunner {
        replies: HashMap<String, CommandOutput>,
        installed: HashSet<String>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Marks `program` installed and answering `--version`.
        pub fn installed(mut self, program: &str) -> Self {
            self.installed.insert(program.to_string());
            self.replies
                .insert(format!("{program} --version"), CommandOutput::ok("1.0"));
            self
        }

        /// Marks `program` present without answering any probe.
        pub fn present(mut self, program: &str) -> Self {
            self.installed.insert(program.to_string());
            self
        }

        pub fn on(mut self, cmdline: &str, reply: CommandOutput) -> Self {
            if let Some(program) = cmdline.split(' ').next() {
                self.installed.insert(program.to_string());
            }
            self.replies.insert(cmdline.to_string(), reply);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        pub fn called(&self, cmdline: &str) -> bool {
            self.calls.borrow().iter().any(|c| c == cmdline)
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, program: &str, args: &[&str], _: Option<Duration>) -> Result<CommandOutput> {
            let mut line = program.to_string();
            for arg in args {
                line.push(' ');
                line.push_str(arg);
            }
            self.calls.borrow_mut().push(line.clone());
            if let Some(reply) = self.replies.get(&line) {
                return Ok(reply.clone());
            }
            if self.installed.contains(program) {
                Ok(CommandOutput::failed(1, format!("unscripted: {line}")))
            } else {
                Err(DnsError::ToolAbsent {
                    tool: program.to_string(),
                })
            }
        }
    }
}
