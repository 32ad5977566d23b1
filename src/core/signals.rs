//! # OS interrupt handling.
//!
//! [`wait_for_interrupt`] completes when the process receives a stop signal.
//! The supervisor races it against the coordinator loop.
//!
//! **Unix:** `SIGINT` (Ctrl-C), `SIGTERM`, `SIGQUIT`.
//! **Other platforms:** Ctrl-C via [`tokio::signal::ctrl_c`].

/// Waits for an interrupt.
///
/// Returns `Err` if the listeners cannot be registered.
#[cfg(unix)]
pub async fn wait_for_interrupt() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for an interrupt.
///
/// Returns `Err` if the listener cannot be registered.
#[cfg(not(unix))]
pub async fn wait_for_interrupt() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Like [`wait_for_interrupt`], but never completes if registration fails.
pub async fn interrupted() {
    if let Err(err) = wait_for_interrupt().await {
        tracing::warn!(%err, "cannot listen for interrupts; only success or exhaustion will stop the search");
        std::future::pending::<()>().await;
    }
}
