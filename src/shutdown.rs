//! Final flush on termination signals
//!
//! `Drop` covers normal and error returns. Signals do not unwind, so hosts that own a
//! sink wait on `wait_for_termination` alongside their work and run `finalize` when it
//! resolves.

use std::sync::{Arc, Mutex};

use crate::logging::LogSink;

/// Sink shared between the host's main work and its signal listener
pub type SharedSink = Arc<Mutex<LogSink>>;

/// Signal that ended the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Interrupt,
    Terminate,
}

/// Wrap a sink for sharing with a signal listener
pub fn share(sink: LogSink) -> SharedSink {
    Arc::new(Mutex::new(sink))
}

/// Resolve on SIGINT (Ctrl-C) or, on Unix, SIGTERM
pub async fn wait_for_termination() -> std::io::Result<Termination> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|_| Termination::Interrupt),
            _ = terminate.recv() => Ok(Termination::Terminate),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok(Termination::Interrupt)
    }
}

/// Flush the shared sink and mark it terminated
///
/// A poisoned lock still gets its final flush; losing records to a panic elsewhere
/// would defeat the point.
pub fn finalize(sink: &SharedSink) {
    let mut guard = match sink.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Err(e) = guard.shutdown() {
        tracing::warn!(error = %e, "Final log flush failed");
    }
}
