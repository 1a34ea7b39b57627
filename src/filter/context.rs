use std::{sync::Arc, time::Duration};

use crate::{
    backend::{client::Backend, process},
    filter::config::FilterConfig,
    foundation::{config::RendererOpts, error::ArkResult, logging::report_previous_crash},
    params::cache::ParamCache,
};

/// Key of the persisted parameter cache document.
pub const CACHE_ID: &str = "ark.ai_renderer";

pub type BackendStarter = fn(&dyn Backend, &RendererOpts) -> ArkResult<()>;

/// Process-wide orchestrator state, shared by every filter instance.
///
/// The caller owns it and hands it to each entry point.
pub struct RendererContext {
    opts: RendererOpts,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) param_cache: ParamCache,
    pub(crate) filter_configs: Vec<FilterConfig>,
    startup_attempts: u32,
    crash_checked: bool,
    backend_started: bool,
    logged_in: bool,
    poll_interval: Duration,
    start_backend: BackendStarter,
}

impl RendererContext {
    pub fn new(opts: RendererOpts, backend: Arc<dyn Backend>) -> Self {
        let poll_interval = opts.poll_interval();
        Self {
            opts,
            backend,
            param_cache: ParamCache::new(CACHE_ID),
            filter_configs: Vec::new(),
            startup_attempts: 0,
            crash_checked: false,
            backend_started: false,
            logged_in: false,
            poll_interval,
            start_backend: process::start_backend,
        }
    }

    /// Replaces the backend launcher used by `initialize`.
    pub fn with_backend_starter(mut self, starter: BackendStarter) -> Self {
        self.start_backend = starter;
        self
    }

    pub fn opts(&self) -> &RendererOpts {
        &self.opts
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn backend_handle(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    pub fn param_cache(&self) -> &ParamCache {
        &self.param_cache
    }

    pub fn filter_configs(&self) -> &[FilterConfig] {
        &self.filter_configs
    }

    pub fn startup_attempts(&self) -> u32 {
        self.startup_attempts
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn set_logged_in(&mut self, logged_in: bool) {
        self.logged_in = logged_in;
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Shrinks the poll interval toward an observed render time, never below the configured floor.
    pub fn adapt_poll_interval(&mut self, elapsed: Duration) {
        if elapsed < self.poll_interval {
            self.poll_interval = elapsed.max(self.opts.min_poll_interval());
            tracing::debug!(interval_ms = self.poll_interval.as_millis(), "poll interval adapted");
        }
    }

    pub fn backend_started(&self) -> bool {
        self.backend_started
    }

    /// Re-checks the backend and records the answer.
    pub fn refresh_backend_started(&mut self) -> bool {
        self.backend_started = self.backend.is_running();
        self.backend_started
    }

    /// Counts a startup attempt. `false` means another launch may be tried.
    ///
    /// Logs the timeout once, on the first call after the budget ran out.
    pub fn startup_timed_out(&mut self) -> bool {
        let max = self.opts.startup_max_attempts;
        if self.backend_started {
            return true;
        }
        if self.startup_attempts == max {
            tracing::error!("backend startup timed out, please check the backend");
            self.startup_attempts += 1;
        }
        if self.startup_attempts < max {
            self.startup_attempts += 1;
            tracing::info!(attempt = self.startup_attempts, "backend startup attempt");
            return false;
        }
        true
    }

    pub(crate) fn launch_backend(&self) -> ArkResult<()> {
        (self.start_backend)(self.backend.as_ref(), &self.opts)
    }

    pub fn crash_checked(&self) -> bool {
        self.crash_checked
    }

    /// Reports a crash if the last session did not shut down cleanly, then re-arms the flag.
    pub fn handle_crash_check(&mut self) {
        if self.crash_checked {
            return;
        }
        if self.backend.has_shutdown_gracefully() {
            tracing::info!("no crash detected in previous session");
        } else {
            report_previous_crash();
        }
        if let Err(err) = self.backend.mark_shutdown(false) {
            tracing::warn!(error = %err, "could not reset shutdown flag");
        }
        self.crash_checked = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/context.rs"]
mod tests;
