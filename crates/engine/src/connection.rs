//! Connection gate: the backend connection state machine
//!
//! Connection status is an explicit three-state machine,
//! `Disconnected -> Connecting -> Connected`, with failure transitioning
//! back to `Disconnected`. The states live in a `tokio::sync::watch`
//! channel: the first caller to observe `Disconnected` claims the
//! transition and drives `Backend::connect`; callers arriving during
//! `Connecting` suspend on the channel and proceed or fail together with
//! the attempt's outcome.

use tokio::sync::watch;
use tracing::{info, warn};
use weft_core::{Backend, Result, WeftError};

/// Connection status of a dispatcher instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; the next request will initiate one
    Disconnected,
    /// A connect attempt is in flight; new requests wait on it
    Connecting,
    /// The backend is ready for requests
    Connected,
}

/// Coordination primitive guarding the backend connection
#[derive(Debug)]
pub struct ConnectionGate {
    tx: watch::Sender<ConnectionState>,
}

impl Default for ConnectionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionGate {
    /// Create a gate in the `Disconnected` state
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionState::Disconnected);
        Self { tx }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Ensure the backend is connected, connecting it if necessary
    ///
    /// Exactly one caller drives `Backend::connect` per attempt; everyone
    /// else suspends until the attempt resolves. On failure the state
    /// falls back to `Disconnected` and the waiters fail with
    /// `ConnectFailed` while the driver gets the backend's own error.
    pub async fn ensure_connected(&self, backend: &dyn Backend) -> Result<()> {
        loop {
            let claimed = self.tx.send_if_modified(|state| {
                if *state == ConnectionState::Disconnected {
                    *state = ConnectionState::Connecting;
                    true
                } else {
                    false
                }
            });
            if claimed {
                return match backend.connect().await {
                    Ok(()) => {
                        self.tx.send_replace(ConnectionState::Connected);
                        info!(target: "weft::connection", "backend connected");
                        Ok(())
                    }
                    Err(err) => {
                        self.tx.send_replace(ConnectionState::Disconnected);
                        warn!(target: "weft::connection", error = %err, "backend connect failed");
                        Err(err)
                    }
                };
            }
            let mut rx = self.tx.subscribe();
            loop {
                let current = *rx.borrow_and_update();
                match current {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Disconnected => {
                        // The in-flight attempt failed while we waited;
                        // fail together rather than retrying behind the
                        // caller's back.
                        return Err(WeftError::ConnectFailed {
                            reason: "concurrent connect attempt failed".into(),
                        });
                    }
                    ConnectionState::Connecting => {
                        if rx.changed().await.is_err() {
                            return Err(WeftError::NotConnected);
                        }
                    }
                }
            }
        }
    }

    /// Disconnect the backend and return to `Disconnected`
    pub async fn disconnect(&self, backend: &dyn Backend) -> Result<()> {
        backend.disconnect().await?;
        self.tx.send_replace(ConnectionState::Disconnected);
        info!(target: "weft::connection", "backend disconnected");
        Ok(())
    }
}
