//! External layout engine run as a child process.

use std::{
    io::Write,
    process::{Command, Stdio},
    thread,
};

use log::{debug, warn};

use super::{EngineFailure, LayoutEngine};
use crate::config::CommandConfig;

/// Runs an external program as the layout engine.
///
/// The request is written to the program's stdin and the reply is read from
/// its stdout as a single JSON value. A non-zero exit status is reported as an
/// engine failure carrying whatever the program wrote to stderr.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl From<&CommandConfig> for CommandEngine {
    fn from(config: &CommandConfig) -> Self {
        Self::new(config.program(), config.args().to_vec())
    }
}

impl LayoutEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn layout(&self, request: &str) -> Result<serde_json::Value, EngineFailure> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| EngineFailure::new(format!("cannot start `{}`: {err}", self.program)))?;

        // Written from a separate thread while stdout is drained
        let writer = child.stdin.take().map(|mut stdin| {
            let request = request.to_owned();
            thread::spawn(move || stdin.write_all(request.as_bytes()))
        });

        let output = child
            .wait_with_output()
            .map_err(|err| EngineFailure::new(format!("cannot read from `{}`: {err}", self.program)))?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(program = self.program, err = err.to_string(); "Layout engine closed stdin early")
                }
                Err(_) => warn!(program = self.program; "Layout request writer panicked"),
            }
        }

        debug!(
            program = self.program,
            status = output.status.to_string(),
            stdout_bytes = output.stdout.len();
            "Layout engine exited"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineFailure::new(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|err| {
            EngineFailure::new(format!("`{}` wrote an invalid reply: {err}", self.program))
        })
    }
}
