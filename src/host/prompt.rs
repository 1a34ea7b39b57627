use std::{path::PathBuf, process::Command};

use anyhow::Context as _;

use crate::foundation::error::{ArkError, ArkResult};

/// Modal prompt editor. Returns the edited prompt, or the current one if nothing changed.
pub trait PromptDialog {
    fn show(&self, current: &str) -> ArkResult<String>;
}

/// Runs an external prompt app as `<program> [-p <current>]` and reads the prompt from stdout.
#[derive(Clone, Debug)]
pub struct ExternalPromptDialog {
    program: PathBuf,
}

impl ExternalPromptDialog {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PromptDialog for ExternalPromptDialog {
    fn show(&self, current: &str) -> ArkResult<String> {
        let mut cmd = Command::new(&self.program);
        if !current.is_empty() {
            cmd.arg("-p").arg(current);
        }
        let out = cmd
            .output()
            .with_context(|| format!("run prompt app '{}'", self.program.display()))?;
        if !out.status.success() {
            return Err(ArkError::resource(format!(
                "prompt app exited with {}",
                out.status
            )));
        }
        Ok(strip_newlines(&String::from_utf8_lossy(&out.stdout)))
    }
}

/// Used when no prompt app is configured; keeps whatever prompt is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPromptDialog;

impl PromptDialog for NoPromptDialog {
    fn show(&self, current: &str) -> ArkResult<String> {
        tracing::warn!("no prompt app configured; prompt left unchanged");
        Ok(current.to_string())
    }
}

pub fn strip_newlines(s: &str) -> String {
    s.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

#[cfg(test)]
#[path = "../../tests/unit/host/prompt.rs"]
mod tests;
