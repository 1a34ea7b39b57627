use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;

use crate::foundation::error::{ArkError, ArkResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";

pub const ENV_BACKEND_URL: &str = "ARK_BACKEND_URL";
pub const ENV_PROMPT_APP: &str = "ARK_PROMPT_APP";

/// Tunables for the backend client and the render orchestrator.
///
/// Every field has a default, so a config file only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RendererOpts {
    /// Backend root URL, with trailing slash.
    pub base_url: String,
    pub request_timeout_ms: u64,
    /// First sleep between job polls; shrinks toward observed render time.
    pub poll_interval_ms: u64,
    pub min_poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// Number of `initialize` calls allowed to try launching the backend.
    pub startup_max_attempts: u32,
    pub backend_start_poll_ms: u64,
    pub backend_start_attempts: u32,
    pub login_timeout_ms: u64,
    pub login_poll_ms: u64,
    /// External prompt editor. Invoked as `<program> [-p "<current prompt>"]`.
    pub prompt_program: Option<PathBuf>,
    /// Location of the backend launcher config; platform default when unset.
    pub backend_config_path: Option<PathBuf>,
}

impl Default for RendererOpts {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 120_000,
            poll_interval_ms: 10_000,
            min_poll_interval_ms: 100,
            max_poll_attempts: 6,
            startup_max_attempts: 1,
            backend_start_poll_ms: 100,
            backend_start_attempts: 300,
            login_timeout_ms: 60_000,
            login_poll_ms: 1_000,
            prompt_program: None,
            backend_config_path: None,
        }
    }
}

impl RendererOpts {
    pub fn from_path(path: &Path) -> ArkResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read renderer config '{}'", path.display()))?;
        let opts: Self = serde_json::from_str(&text)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Applies `ARK_BACKEND_URL` and `ARK_PROMPT_APP` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_BACKEND_URL)
            && !url.trim().is_empty()
        {
            self.base_url = url;
        }
        if let Ok(app) = std::env::var(ENV_PROMPT_APP)
            && !app.trim().is_empty()
        {
            self.prompt_program = Some(PathBuf::from(app));
        }
        self.normalized()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.normalized()
    }

    fn normalized(mut self) -> Self {
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
        self
    }

    pub fn validate(&self) -> ArkResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ArkError::validation("base_url must not be empty"));
        }
        if self.max_poll_attempts == 0 {
            return Err(ArkError::validation("max_poll_attempts must be non-zero"));
        }
        if self.min_poll_interval_ms > self.poll_interval_ms {
            return Err(ArkError::validation(
                "min_poll_interval_ms must be <= poll_interval_ms",
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn min_poll_interval(&self) -> Duration {
        Duration::from_millis(self.min_poll_interval_ms)
    }

    pub fn backend_start_poll(&self) -> Duration {
        Duration::from_millis(self.backend_start_poll_ms)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }

    pub fn login_poll(&self) -> Duration {
        Duration::from_millis(self.login_poll_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
