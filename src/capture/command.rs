use super::ImageCapture;
use crate::log_debug;
use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

/// Placeholder replaced with the destination file in capture command arguments.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Stills command used on Raspberry Pi camera stacks.
pub const DEFAULT_CAPTURE_COMMAND: &str = "rpicam-still --nopreview --immediate -o {path}";

/// Captures stills by running an external program once per frame.
#[derive(Debug, Clone)]
pub struct CommandCapture {
    program: String,
    args: Vec<String>,
}

impl CommandCapture {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a shell-style command line into program + argument template.
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut parts = shell_words::split(line)
            .with_context(|| format!("failed to parse capture command '{line}'"))?;
        if parts.is_empty() {
            bail!("capture command cannot be empty");
        }
        let program = parts.remove(0);
        Ok(Self::new(program, parts))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn with_program(self, program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: self.args,
        }
    }

    /// Quote back into a single command line that `from_command_line` accepts.
    pub fn to_command_line(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(self.args.iter()))
    }

    /// Arguments for one capture; the path is appended when no placeholder is present.
    pub fn args_for(&self, path: &Path) -> Vec<String> {
        let path_text = path.to_string_lossy();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(PATH_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(PATH_PLACEHOLDER, &path_text)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(path_text.into_owned());
        }
        args
    }
}

impl ImageCapture for CommandCapture {
    fn capture_file(&mut self, path: &Path) -> Result<()> {
        let args = self.args_for(path);
        let started = Instant::now();
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run capture command '{}'", self.program))?;
        log_debug(&format!(
            "capture command '{}' finished in {}ms with {}",
            self.program,
            started.elapsed().as_millis(),
            output.status
        ));
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "capture command exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        if !path.exists() {
            bail!(
                "capture command succeeded but '{}' was not written",
                path.display()
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}
