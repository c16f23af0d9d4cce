//! Runs the user's command in response to events.
//!
//! Commands are split with shell-like quoting (no shell is involved), the
//! program is resolved in `PATH` up front, and every run is spawned as its
//! own process group so nothing is left behind when it exits.

use crate::config::CommandConfig;
use crate::event::Event;
use anyhow::{Context, Result, bail};
use command_group::CommandGroup;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use tracing::{Level, debug, span, warn};
use which::which;

/// A parsed, resolved command ready to be run on events.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    /// Program as resolved in `PATH`
    program: PathBuf,
    args: Vec<String>,
    /// Write the event rendering to the command's stdin
    pipe: bool,
    /// Tolerate non-zero exits
    keepalive: bool,
}

impl CommandRunner {
    /// Parse `cmd` into a program and arguments.
    ///
    /// Handles shell-like quoting:
    /// - `"make test"` → `("make", ["test"])`
    /// - `"notify-send 'file changed'"` → `("notify-send", ["file changed"])`
    ///
    /// # Errors
    ///
    /// Returns an error if the command is empty, has unbalanced quotes, or
    /// its program cannot be found in `PATH`.
    pub fn parse(cmd: &str, pipe: bool, keepalive: bool) -> Result<Self> {
        let span = span!(Level::DEBUG, "parse_command", cmd);
        let _guard = span.enter();

        let mut parts = shell_words::split(cmd)
            .with_context(|| format!("Invalid command syntax: '{cmd}'"))?
            .into_iter();

        let Some(name) = parts.next() else {
            bail!("Empty command");
        };
        let program =
            which(&name).with_context(|| format!("Program '{name}' not found in PATH"))?;
        let args: Vec<String> = parts.collect();

        debug!(program = %program.display(), args = ?args, "Command parsed");

        Ok(Self {
            program,
            args,
            pipe,
            keepalive,
        })
    }

    /// Build a runner from the `[command]` config section, if a command is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured command cannot be parsed.
    pub fn from_config(config: &CommandConfig) -> Result<Option<Self>> {
        config
            .cmd
            .as_deref()
            .map(|cmd| Self::parse(cmd, config.pipe, config.keepalive))
            .transpose()
    }

    /// Run the command once, feeding `input` to its stdin when piping.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or waited on.
    pub fn run(&self, input: Option<&str>) -> Result<ExitStatus> {
        let span = span!(Level::DEBUG, "run_command", program = %self.program.display());
        let _guard = span.enter();

        let stdin = if self.pipe {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let mut group = Command::new(&self.program)
            .args(&self.args)
            .stdin(stdin)
            .group_spawn()
            .with_context(|| format!("Failed to spawn command: {}", self.program.display()))?;

        if self.pipe
            && let Some(mut pipe) = group.inner().stdin.take()
        {
            let input = input.unwrap_or_default();
            match writeln!(pipe, "{input}") {
                Ok(()) => {}
                // The command is free to ignore its input
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    debug!("Command closed stdin early");
                }
                Err(e) => return Err(e).context("Failed to write to command stdin"),
            }
        }

        let status = group.wait().context("Failed to wait for command")?;
        debug!(exit_code = ?status.code(), "Command finished");
        Ok(status)
    }

    /// Run the command for `event`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be run, or if it exits
    /// unsuccessfully and keepalive is off.
    pub fn on_event(&self, event: &Event) -> Result<()> {
        let rendering = event.to_string();
        let status = self.run(Some(&rendering))?;
        self.check(status)
    }

    /// Run the command once at startup.
    ///
    /// # Errors
    ///
    /// Same as [`CommandRunner::on_event`].
    pub fn on_start(&self) -> Result<()> {
        let status = self.run(None)?;
        self.check(status)
    }

    fn check(&self, status: ExitStatus) -> Result<()> {
        if status.success() {
            return Ok(());
        }
        if self.keepalive {
            warn!(exit_code = ?status.code(), "Command failed, keeping alive");
            return Ok(());
        }
        bail!(
            "Command '{}' exited with {status}",
            self.program.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_command() {
        let result = CommandRunner::parse("", false, false);
        assert!(result.unwrap_err().to_string().contains("Empty command"));
    }

    #[test]
    fn test_parse_invalid_syntax() {
        assert!(CommandRunner::parse("echo 'unclosed quote", false, false).is_err());
    }

    #[test]
    fn test_parse_missing_program() {
        let result = CommandRunner::parse("pollwatch-no-such-program --flag", false, false);
        assert!(result.unwrap_err().to_string().contains("not found in PATH"));
    }

    #[test]
    fn test_from_config_without_command() {
        assert!(
            CommandRunner::from_config(&CommandConfig::default())
                .unwrap()
                .is_none()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_quoted_args() {
        let runner = CommandRunner::parse("sh -c 'exit 0'", false, false).unwrap();
        assert!(runner.program.ends_with("sh"));
        assert_eq!(runner.args, vec!["-c", "exit 0"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_without_keepalive() {
        let runner = CommandRunner::parse("sh -c 'exit 3'", false, false).unwrap();
        assert!(runner.on_start().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_with_keepalive() {
        let runner = CommandRunner::parse("sh -c 'exit 3'", false, true).unwrap();
        assert!(runner.on_start().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_pipe_feeds_event() {
        use crate::event::Op;
        use crate::snapshot::FileMeta;

        let runner = CommandRunner::parse(
            r#"sh -c 'read line; case "$line" in *WRITE*) exit 0;; *) exit 1;; esac'"#,
            true,
            false,
        )
        .unwrap();
        let event = Event::new(Op::Write, "/tmp/x", FileMeta::synthetic("x"));
        assert!(runner.on_event(&event).is_ok());
    }
}
