use std::{
    sync::{Arc, mpsc},
    thread,
    time::{Duration, Instant},
};

use anyhow::Context as _;

use crate::{
    backend::client::{Backend, UiPage},
    foundation::error::{ArkError, ArkResult},
};

/// Opens the backend login page on a worker thread and waits for the user to log in.
///
/// `Ok(false)` means the login did not complete within `timeout`.
#[tracing::instrument(skip(backend))]
pub fn run_login_flow(
    backend: Arc<dyn Backend>,
    timeout: Duration,
    poll: Duration,
) -> ArkResult<bool> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("ark-login".to_string())
        .spawn(move || {
            let logged_in = wait_for_login(backend.as_ref(), timeout, poll);
            // The receiver may have given up already.
            let _ = tx.send(logged_in);
        })
        .context("spawn login thread")?;

    // One extra poll of slack for the worker's final status check.
    match rx.recv_timeout(timeout + poll) {
        Ok(logged_in) => Ok(logged_in),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!("login flow timed out");
            Ok(false)
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(ArkError::resource("login thread exited without a result"))
        }
    }
}

fn wait_for_login(backend: &dyn Backend, timeout: Duration, poll: Duration) -> bool {
    if let Err(err) = backend.open_ui(&UiPage::Login) {
        tracing::warn!(error = %err, "could not open login page");
    }
    let deadline = Instant::now() + timeout;
    loop {
        match backend.login_status() {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => tracing::debug!(error = %err, "login status unavailable"),
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(poll);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/login.rs"]
mod tests;
