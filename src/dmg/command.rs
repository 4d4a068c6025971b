//! External command execution.
//!
//! All `hdiutil`, `chmod`, `bless`, `codesign` and `xcrun` calls go through
//! [`CommandExecutor`], which reports each invocation and honors simulate mode.

use super::error::{Error, Result};
use super::sink::EventSink;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;

/// Runs external programs one at a time.
#[derive(Clone)]
pub struct CommandExecutor {
    simulate: bool,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("simulate", &self.simulate)
            .field("sink", &"<EventSink>")
            .finish()
    }
}

impl CommandExecutor {
    pub fn new(simulate: bool, sink: Arc<dyn EventSink>) -> Self {
        Self { simulate, sink }
    }

    pub fn simulate(&self) -> bool {
        self.simulate
    }

    /// Run `program`, streaming its output to ours.
    ///
    /// In simulate mode the invocation is only reported.
    pub async fn run(&self, program: &str, args: &[String]) -> Result<()> {
        self.sink.command(program, args, self.simulate);
        if self.simulate {
            return Ok(());
        }

        let path = resolve(program)?;
        let status = Command::new(&path)
            .args(args)
            .status()
            .await
            .map_err(|source| Error::Spawn {
                command: program.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(Error::CommandFailed {
                command: command_line(program, args),
                status,
                output: String::new(),
            });
        }

        Ok(())
    }

    /// Run `program` and return stdout followed by stderr.
    ///
    /// In simulate mode nothing runs and the output is empty.
    pub async fn output(&self, program: &str, args: &[String]) -> Result<String> {
        self.sink.command(program, args, self.simulate);
        if self.simulate {
            return Ok(String::new());
        }

        let path = resolve(program)?;
        let output = Command::new(&path)
            .args(args)
            .output()
            .await
            .map_err(|source| Error::Spawn {
                command: program.to_string(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: command_line(program, args),
                status: output.status,
                output: combined,
            });
        }

        Ok(combined)
    }
}

/// Locate `program` on `PATH`.
fn resolve(program: &str) -> Result<PathBuf> {
    match which::which(program) {
        Ok(path) => {
            log::debug!("Found {} at: {}", program, path.display());
            Ok(path)
        }
        Err(source) => Err(Error::ToolNotFound {
            tool: program.to_string(),
            source,
        }),
    }
}

fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
