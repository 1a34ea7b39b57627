use std::{
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    time::Duration,
};

use anyhow::Context as _;

use crate::{
    backend::client::Backend,
    foundation::{
        config::RendererOpts,
        error::{ArkError, ArkResult},
    },
};

const CONFIG_DIR: &str = "DeepMake";
const CONFIG_FILE: &str = "Config.json";

/// Launcher settings written by the backend installer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BackendLaunchConfig {
    /// Interpreter environment root; prefixed to the startup command.
    #[serde(rename = "Py_Environment")]
    pub py_environment: String,
    #[serde(rename = "Directory")]
    pub directory: PathBuf,
    #[serde(rename = "Startup_CMD")]
    pub startup_cmd: String,
}

impl BackendLaunchConfig {
    pub fn from_path(path: &Path) -> ArkResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read backend config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)?;
        if cfg.startup_cmd.trim().is_empty() {
            return Err(ArkError::validation("Startup_CMD must not be empty"));
        }
        Ok(cfg)
    }

    /// Installer location for this platform: the per-user path if present, else the shared one.
    pub fn default_path() -> Option<PathBuf> {
        let candidates = platform_config_dirs();
        candidates
            .iter()
            .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
            .find(|p| p.exists())
            .or_else(|| {
                candidates
                    .first()
                    .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
            })
    }

    pub fn command_line(&self) -> String {
        format!("{}{}", self.py_environment, self.startup_cmd)
    }

    /// Splits the command line on whitespace and runs it in `directory`.
    pub fn command(&self) -> ArkResult<Command> {
        let line = self.command_line();
        let mut words = line.split_whitespace();
        let program = words
            .next()
            .ok_or_else(|| ArkError::validation("backend startup command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(words)
            .current_dir(&self.directory)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        Ok(cmd)
    }

    pub fn spawn(&self) -> ArkResult<Child> {
        tracing::info!(cmd = %self.command_line(), dir = %self.directory.display(), "starting backend");
        let child = self
            .command()?
            .spawn()
            .with_context(|| format!("spawn backend '{}'", self.command_line()))?;
        Ok(child)
    }
}

/// Per-user config root first, then the machine-wide one.
fn platform_config_dirs() -> Vec<PathBuf> {
    let shared = if cfg!(target_os = "windows") {
        std::env::var_os("ProgramData")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
    } else if cfg!(target_os = "macos") {
        Some(PathBuf::from("/Library/Application Support"))
    } else {
        Some(PathBuf::from("/etc"))
    };
    [dirs::config_dir(), shared].into_iter().flatten().collect()
}

/// Polls `is_running` every `poll` up to `attempts` times.
pub fn wait_until_running(backend: &dyn Backend, poll: Duration, attempts: u32) -> bool {
    for _ in 0..attempts {
        if backend.is_running() {
            return true;
        }
        std::thread::sleep(poll);
    }
    backend.is_running()
}

/// Launches the backend from its installer config unless it already answers.
#[tracing::instrument(skip_all)]
pub fn start_backend(backend: &dyn Backend, opts: &RendererOpts) -> ArkResult<()> {
    if backend.is_running() {
        return Ok(());
    }

    let path = opts
        .backend_config_path
        .clone()
        .or_else(BackendLaunchConfig::default_path)
        .ok_or_else(|| ArkError::resource("no backend config location for this platform"))?;
    if !path.exists() {
        return Err(ArkError::resource(format!(
            "backend config '{}' not found",
            path.display()
        )));
    }

    let cfg = BackendLaunchConfig::from_path(&path)?;
    // Detached: the handle is dropped without waiting.
    let _child = cfg.spawn()?;

    if wait_until_running(backend, opts.backend_start_poll(), opts.backend_start_attempts) {
        tracing::info!("backend is up");
        return Ok(());
    }

    if !cfg.directory.exists() {
        tracing::error!(dir = %cfg.directory.display(), "backend directory not found");
    }
    Err(ArkError::timeout(format!(
        "backend not reachable after {} checks",
        opts.backend_start_attempts
    )))
}

#[cfg(test)]
#[path = "../../tests/unit/backend/process.rs"]
mod tests;
