//! Turn termination requests into cancellation

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancel `token` on the first interrupt, hangup, terminate or quit signal
#[cfg(unix)]
pub fn cancel_on_signal(token: CancellationToken) -> Result<()> {
    use signal::unix::{SignalKind, signal as listen};

    let mut hangup = listen(SignalKind::hangup()).context("Failed to listen for SIGHUP")?;
    let mut terminate = listen(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;
    let mut interrupt = listen(SignalKind::interrupt()).context("Failed to listen for SIGINT")?;
    let mut quit = listen(SignalKind::quit()).context("Failed to listen for SIGQUIT")?;

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = hangup.recv() => "SIGHUP",
            _ = terminate.recv() => "SIGTERM",
            _ = interrupt.recv() => "SIGINT",
            _ = quit.recv() => "SIGQUIT",
            _ = token.cancelled() => return,
        };
        debug!(signal = name, "received signal, stopping");
        token.cancel();
    });

    Ok(())
}

#[cfg(not(unix))]
pub fn cancel_on_signal(token: CancellationToken) -> Result<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "failed to listen for ctrl+c");
                    return;
                }
            }
            _ = token.cancelled() => return,
        }
        debug!("received ctrl+c, stopping");
        token.cancel();
    });

    Ok(())
}
