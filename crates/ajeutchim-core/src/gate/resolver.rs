//! Entry-state resolution.
//!
//! `SessionResolver` owns the single authoritative `SessionState`. It
//! watches the auth provider's identity channel and, whenever an identity
//! is present, asks the secret store whether a PIN has been provisioned
//! on this device. Exactly one resolved state is published per identity
//! event; a PIN lookup still in flight when the next event lands is
//! dropped unused.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::auth::{AuthProvider, SecretStore, PIN_KEY};

/// Timeout for a single PIN-presence lookup.
/// The secret store is local and normally instant; 10s turns a hung
/// keychain into a visible resolution failure instead of an endless
/// spinner.
const LOOKUP_TIMEOUT_SECS: u64 = 10;

/// Resolved entry state driving which screen is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Startup value, before the first identity event lands
    Unresolved,
    /// No remote session; show sign-in
    NeedsLogin,
    /// Signed in, but no PIN provisioned on this device yet
    NeedsPinSetup,
    /// Signed in and a PIN is present; show the unlock screen
    NeedsPinUnlock,
    /// Gate passed; the app proper takes over
    Ready,
    /// PIN presence could not be determined. Callers retry or fall back
    /// to sign-in; this is never treated as PIN absence.
    ResolutionFailed,
}

/// Narrow handle through which the PIN gate publishes `Ready`
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionHandle {
    pub(crate) fn set_ready(&self) {
        self.state.send_replace(SessionState::Ready);
    }
}

pub struct SessionResolver {
    auth: Arc<dyn AuthProvider>,
    secrets: Arc<dyn SecretStore>,
    state: Arc<watch::Sender<SessionState>>,
    refresh: Notify,
}

impl SessionResolver {
    pub fn new(auth: Arc<dyn AuthProvider>, secrets: Arc<dyn SecretStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Unresolved);
        Self {
            auth,
            secrets,
            state: Arc::new(state),
            refresh: Notify::new(),
        }
    }

    /// Current resolved state
    pub fn current(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch the resolved state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Handle for the PIN gate to publish `Ready` through
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Re-run the resolution pass for the current identity.
    ///
    /// Recovery path after `ResolutionFailed`.
    pub fn retry(&self) {
        self.refresh.notify_one();
    }

    /// Drive resolution until the identity stream closes.
    ///
    /// Spawn this on the runtime; subscribers see every state it
    /// publishes. Identity events are processed strictly in delivery
    /// order, and a newer event always supersedes the lookup started for
    /// an older one.
    pub async fn run(&self) {
        let mut identity_rx = self.auth.subscribe();
        loop {
            let present = identity_rx.borrow_and_update().is_some();
            if present {
                let lookup = timeout(
                    Duration::from_secs(LOOKUP_TIMEOUT_SECS),
                    self.secrets.get(PIN_KEY),
                );
                tokio::select! {
                    changed = identity_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        debug!("Identity changed mid-lookup, discarding stale result");
                        continue;
                    }
                    outcome = lookup => {
                        let next = match outcome {
                            Ok(Ok(Some(_))) => SessionState::NeedsPinUnlock,
                            Ok(Ok(None)) => SessionState::NeedsPinSetup,
                            Ok(Err(e)) => {
                                warn!(error = %e, "PIN presence lookup failed");
                                SessionState::ResolutionFailed
                            }
                            Err(_) => {
                                warn!("PIN presence lookup timed out");
                                SessionState::ResolutionFailed
                            }
                        };
                        debug!(state = ?next, "Session resolved");
                        self.state.send_replace(next);
                    }
                }
            } else {
                debug!("No identity present, needs login");
                self.state.send_replace(SessionState::NeedsLogin);
            }

            tokio::select! {
                changed = identity_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = self.refresh.notified() => {}
            }
        }
    }
}
