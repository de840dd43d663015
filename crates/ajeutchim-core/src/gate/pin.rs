//! PIN setup, unlock, and reset.
//!
//! `PinGate` owns the small state machine between "signed in" and "app
//! unlocked". It is the only writer of the PIN secret: setup validates
//! and stores it, unlock compares against it, reset deletes it and ends
//! the remote session so the resolver lands back on sign-in.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use thiserror::Error;
use tokio::sync::Mutex as OpMutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::auth::{AuthProvider, SecretStore, PIN_KEY};

use super::resolver::{SessionHandle, SessionState};

/// Required PIN length, in digits
const PIN_LENGTH: usize = 4;

/// Timeout for a single secret-store call.
/// Same bound as the resolver's lookup: a hung keychain surfaces as
/// `StoreUnavailable` instead of freezing the unlock screen.
const STORE_TIMEOUT_SECS: u64 = 10;

/// Where the gate currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No PIN on this device yet; waiting for `set_pin`
    Setup,
    /// PIN present; waiting for `attempt_unlock`
    Locked,
    /// An unlock attempt is in flight
    Unlocking,
    /// Gate passed; terminal as far as the gate is concerned
    Unlocked,
    /// A reset is in flight
    ResettingPin,
}

#[derive(Debug, Error)]
pub enum PinError {
    #[error("PIN must be exactly 4 digits")]
    InvalidFormat,

    #[error("Incorrect PIN")]
    IncorrectPin,

    #[error("An unlock attempt is already in progress")]
    AlreadyInProgress,

    #[error("No PIN is set on this device")]
    PinNotSet,

    #[error("Secret store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("PIN reset failed: {0}")]
    ResetFailed(String),

    #[error("Operation not valid while {0:?}")]
    InvalidState(GateState),
}

pub struct PinGate {
    secrets: Arc<dyn SecretStore>,
    auth: Arc<dyn AuthProvider>,
    session: SessionHandle,
    state: Mutex<GateState>,
    /// One mutating operation in flight at a time. Unlock takes this with
    /// `try_lock` so concurrent attempts are rejected rather than queued;
    /// reset waits its turn behind an outstanding unlock.
    op: OpMutex<()>,
}

impl PinGate {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        auth: Arc<dyn AuthProvider>,
        session: SessionHandle,
        initial: GateState,
    ) -> Self {
        Self {
            secrets,
            auth,
            session,
            state: Mutex::new(initial),
            op: OpMutex::new(()),
        }
    }

    /// Gate for the state the resolver landed on, if it involves a PIN
    /// step
    pub fn from_session(
        secrets: Arc<dyn SecretStore>,
        auth: Arc<dyn AuthProvider>,
        session: SessionHandle,
        resolved: SessionState,
    ) -> Option<Self> {
        let initial = match resolved {
            SessionState::NeedsPinSetup => GateState::Setup,
            SessionState::NeedsPinUnlock => GateState::Locked,
            _ => return None,
        };
        Some(Self::new(secrets, auth, session, initial))
    }

    pub fn state(&self) -> GateState {
        *self.state.lock().expect("gate state lock poisoned")
    }

    fn set_state(&self, next: GateState) {
        *self.state.lock().expect("gate state lock poisoned") = next;
        debug!(state = ?next, "Gate state changed");
    }

    /// Provision the unlock PIN.
    ///
    /// Valid only in `Setup`. The candidate must be exactly four ASCII
    /// digits; nothing is written on a failed check. Success unlocks the
    /// gate and marks the session ready.
    pub async fn set_pin(&self, candidate: &str) -> Result<(), PinError> {
        let _op = self.op.lock().await;
        let state = self.state();
        if state != GateState::Setup {
            return Err(PinError::InvalidState(state));
        }
        if !is_valid_pin(candidate) {
            return Err(PinError::InvalidFormat);
        }

        bounded(self.secrets.set(PIN_KEY, candidate))
            .await
            .map_err(|e| PinError::StoreUnavailable(e.to_string()))?;

        self.set_state(GateState::Unlocked);
        self.session.set_ready();
        info!("PIN provisioned");
        Ok(())
    }

    /// Compare a candidate against the stored PIN.
    ///
    /// Valid only in `Locked`. A second call while one is outstanding is
    /// rejected with `AlreadyInProgress`, not queued. A mismatch returns
    /// the gate to `Locked`; retrying immediately is allowed.
    pub async fn attempt_unlock(&self, candidate: &str) -> Result<(), PinError> {
        let _op = self.op.try_lock().map_err(|_| PinError::AlreadyInProgress)?;
        let state = self.state();
        if state != GateState::Locked {
            return Err(PinError::InvalidState(state));
        }
        self.set_state(GateState::Unlocking);

        let stored = match bounded(self.secrets.get(PIN_KEY)).await {
            Ok(stored) => stored,
            Err(e) => {
                self.set_state(GateState::Locked);
                warn!(error = %e, "PIN read failed during unlock");
                return Err(PinError::StoreUnavailable(e.to_string()));
            }
        };

        match stored {
            Some(stored) if stored == candidate => {
                self.set_state(GateState::Unlocked);
                self.session.set_ready();
                info!("Unlocked");
                Ok(())
            }
            Some(_) => {
                self.set_state(GateState::Locked);
                debug!("Incorrect PIN");
                Err(PinError::IncorrectPin)
            }
            None => {
                // A reset raced this unlock away; back to provisioning
                self.set_state(GateState::Setup);
                warn!("No PIN in store during unlock");
                Err(PinError::PinNotSet)
            }
        }
    }

    /// Forget the PIN and end the remote session.
    ///
    /// Valid from `Locked` or `Setup`; waits for an in-flight unlock to
    /// settle first. Each half is retried once. If either half still
    /// fails the gate returns to its pre-reset state and reports
    /// `ResetFailed` - reset is never claimed complete unless both halves
    /// are. On success the resolver observes the sign-out and publishes
    /// `NeedsLogin`.
    pub async fn reset_pin(&self) -> Result<(), PinError> {
        let _op = self.op.lock().await;
        let prior = self.state();
        if prior != GateState::Locked && prior != GateState::Setup {
            return Err(PinError::InvalidState(prior));
        }
        self.set_state(GateState::ResettingPin);

        if let Err(e) = with_one_retry(|| bounded(self.secrets.delete(PIN_KEY))).await {
            self.set_state(prior);
            warn!(error = %e, "PIN deletion failed");
            return Err(PinError::ResetFailed(e.to_string()));
        }

        if let Err(e) = with_one_retry(|| bounded(self.auth.end_session())).await {
            self.set_state(prior);
            warn!(error = %e, "Session end failed during reset");
            return Err(PinError::ResetFailed(e.to_string()));
        }

        info!("PIN reset, session ended");
        Ok(())
    }
}

fn is_valid_pin(candidate: &str) -> bool {
    candidate.len() == PIN_LENGTH && candidate.bytes().all(|b| b.is_ascii_digit())
}

/// Bound a collaborator call so a hung store cannot wedge the gate
async fn bounded<T>(call: impl Future<Output = anyhow::Result<T>>) -> anyhow::Result<T> {
    match timeout(Duration::from_secs(STORE_TIMEOUT_SECS), call).await {
        Ok(outcome) => outcome,
        Err(_) => Err(anyhow!("timed out after {}s", STORE_TIMEOUT_SECS)),
    }
}

async fn with_one_retry<T, F, Fut>(mut call: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    match call().await {
        Ok(value) => Ok(value),
        Err(first) => {
            debug!(error = %first, "Retrying failed call once");
            call().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use tokio::sync::{watch, Semaphore};

    use crate::auth::{Identity, MemorySecretStore};
    use crate::gate::resolver::SessionResolver;

    fn test_identity() -> Identity {
        Identity {
            uid: "u1".into(),
            email: Some("membre@ajeutchim.cm".into()),
            id_token: "tok".into(),
        }
    }

    /// Auth provider with a scriptable number of end_session failures
    struct FakeAuth {
        identity: watch::Sender<Option<Identity>>,
        end_session_failures: AtomicUsize,
    }

    impl FakeAuth {
        fn signed_in() -> Self {
            let (identity, _) = watch::channel(Some(test_identity()));
            Self {
                identity,
                end_session_failures: AtomicUsize::new(0),
            }
        }

        fn failing_end_session(times: usize) -> Self {
            let auth = Self::signed_in();
            auth.end_session_failures.store(times, Ordering::SeqCst);
            auth
        }
    }

    #[async_trait]
    impl AuthProvider for FakeAuth {
        fn current_identity(&self) -> Option<Identity> {
            self.identity.borrow().clone()
        }

        fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
            self.identity.subscribe()
        }

        async fn end_session(&self) -> Result<()> {
            if self.end_session_failures.load(Ordering::SeqCst) > 0 {
                self.end_session_failures.fetch_sub(1, Ordering::SeqCst);
                bail!("auth backend unreachable");
            }
            self.identity.send_replace(None);
            Ok(())
        }
    }

    /// Store that counts calls and can fail the first N deletes
    #[derive(Default)]
    struct CountingStore {
        inner: MemorySecretStore,
        gets: AtomicUsize,
        sets: AtomicUsize,
        delete_failures: AtomicUsize,
    }

    #[async_trait]
    impl SecretStore for CountingStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            if self.delete_failures.load(Ordering::SeqCst) > 0 {
                self.delete_failures.fetch_sub(1, Ordering::SeqCst);
                bail!("keychain busy");
            }
            self.inner.delete(key).await
        }
    }

    /// Store whose reads park until the test releases them
    struct BlockedStore {
        inner: MemorySecretStore,
        release: Semaphore,
        gets: AtomicUsize,
    }

    impl BlockedStore {
        fn new() -> Self {
            Self {
                inner: MemorySecretStore::new(),
                release: Semaphore::new(0),
                gets: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SecretStore for BlockedStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            let _permit = self.release.acquire().await?;
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key).await
        }
    }

    /// Store whose every call fails
    struct FailingStore;

    #[async_trait]
    impl SecretStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            bail!("keychain unavailable")
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            bail!("keychain unavailable")
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            bail!("keychain unavailable")
        }
    }

    /// Wire a gate to a resolver over the given collaborators
    fn gate_with(
        secrets: Arc<dyn SecretStore>,
        auth: Arc<dyn AuthProvider>,
        initial: GateState,
    ) -> (PinGate, SessionResolver) {
        let resolver = SessionResolver::new(auth.clone(), secrets.clone());
        let gate = PinGate::new(secrets, auth, resolver.handle(), initial);
        (gate, resolver)
    }

    #[tokio::test]
    async fn test_set_then_unlock_round_trip() {
        let auth = Arc::new(FakeAuth::signed_in());
        let store = Arc::new(MemorySecretStore::new());

        let (gate, resolver) = gate_with(store.clone(), auth.clone(), GateState::Setup);
        let mut session_rx = resolver.subscribe();

        gate.set_pin("1234").await.unwrap();
        assert_eq!(gate.state(), GateState::Unlocked);
        session_rx.wait_for(|s| *s == SessionState::Ready).await.unwrap();

        // Next launch: PIN present, gate starts locked
        let (gate, _resolver) = gate_with(store.clone(), auth, GateState::Locked);
        gate.attempt_unlock("1234").await.unwrap();
        assert_eq!(gate.state(), GateState::Unlocked);
    }

    #[tokio::test]
    async fn test_set_pin_rejects_bad_formats_without_writing() {
        let auth = Arc::new(FakeAuth::signed_in());
        let store = Arc::new(CountingStore::default());
        let (gate, _resolver) = gate_with(store.clone(), auth, GateState::Setup);

        for candidate in ["", "123", "12345", "12a4", "12.4", " 123", "١٢٣٤"] {
            let err = gate.set_pin(candidate).await.unwrap_err();
            assert!(matches!(err, PinError::InvalidFormat), "candidate {:?}", candidate);
            assert_eq!(gate.state(), GateState::Setup);
        }
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_set_pin_outside_setup_is_rejected() {
        let auth = Arc::new(FakeAuth::signed_in());
        let store = Arc::new(MemorySecretStore::new());
        store.set(PIN_KEY, "1234").await.unwrap();

        let (gate, _resolver) = gate_with(store, auth, GateState::Locked);
        let err = gate.set_pin("5678").await.unwrap_err();
        assert!(matches!(err, PinError::InvalidState(GateState::Locked)));
    }

    #[tokio::test]
    async fn test_unlock_wrong_pin_relocks_and_allows_retry() {
        let auth = Arc::new(FakeAuth::signed_in());
        let store = Arc::new(MemorySecretStore::new());
        store.set(PIN_KEY, "1234").await.unwrap();

        let (gate, _resolver) = gate_with(store, auth, GateState::Locked);

        let err = gate.attempt_unlock("0000").await.unwrap_err();
        assert!(matches!(err, PinError::IncorrectPin));
        assert_eq!(gate.state(), GateState::Locked);

        // No lockout: an immediate retry with the right PIN succeeds
        gate.attempt_unlock("1234").await.unwrap();
        assert_eq!(gate.state(), GateState::Unlocked);
    }

    #[tokio::test]
    async fn test_concurrent_unlock_is_rejected_not_queued() {
        let auth = Arc::new(FakeAuth::signed_in());
        let store = Arc::new(BlockedStore::new());
        store.inner.set(PIN_KEY, "1234").await.unwrap();

        let (gate, _resolver) = gate_with(store.clone(), auth, GateState::Locked);
        let gate = Arc::new(gate);

        let first = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.attempt_unlock("1234").await })
        };
        while gate.state() != GateState::Unlocking {
            tokio::task::yield_now().await;
        }

        let err = gate.attempt_unlock("1234").await.unwrap_err();
        assert!(matches!(err, PinError::AlreadyInProgress));

        store.release.add_permits(1);
        first.await.unwrap().unwrap();
        assert_eq!(gate.state(), GateState::Unlocked);
        // Exactly one comparison against the store
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unlock_store_failure_relocks() {
        let auth = Arc::new(FakeAuth::signed_in());
        let (gate, _resolver) = gate_with(Arc::new(FailingStore), auth, GateState::Locked);

        let err = gate.attempt_unlock("1234").await.unwrap_err();
        assert!(matches!(err, PinError::StoreUnavailable(_)));
        assert_eq!(gate.state(), GateState::Locked);
    }

    #[tokio::test]
    async fn test_unlock_with_missing_pin_returns_to_setup() {
        let auth = Arc::new(FakeAuth::signed_in());
        let store = Arc::new(MemorySecretStore::new());

        let (gate, _resolver) = gate_with(store, auth, GateState::Locked);
        let err = gate.attempt_unlock("1234").await.unwrap_err();
        assert!(matches!(err, PinError::PinNotSet));
        assert_eq!(gate.state(), GateState::Setup);
    }

    #[tokio::test]
    async fn test_reset_clears_pin_and_session() {
        let auth = Arc::new(FakeAuth::signed_in());
        let store = Arc::new(MemorySecretStore::new());
        store.set(PIN_KEY, "1234").await.unwrap();

        let (gate, resolver) = gate_with(store.clone(), auth.clone(), GateState::Locked);
        gate.reset_pin().await.unwrap();

        assert_eq!(store.get(PIN_KEY).await.unwrap(), None);
        assert!(auth.current_identity().is_none());

        // The resolver now lands on the sign-in screen
        let resolver = Arc::new(resolver);
        let task = resolver.clone();
        tokio::spawn(async move { task.run().await });
        let mut rx = resolver.subscribe();
        rx.wait_for(|s| *s == SessionState::NeedsLogin).await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_retries_each_half_once() {
        let auth = Arc::new(FakeAuth::failing_end_session(1));
        let store = Arc::new(CountingStore::default());
        store.delete_failures.store(1, Ordering::SeqCst);
        store.inner.set(PIN_KEY, "1234").await.unwrap();

        let (gate, _resolver) = gate_with(store.clone(), auth.clone(), GateState::Locked);
        gate.reset_pin().await.unwrap();

        assert_eq!(store.inner.get(PIN_KEY).await.unwrap(), None);
        assert!(auth.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_reset_failure_restores_prior_state() {
        let auth = Arc::new(FakeAuth::failing_end_session(2));
        let store = Arc::new(MemorySecretStore::new());
        store.set(PIN_KEY, "1234").await.unwrap();

        let (gate, _resolver) = gate_with(store, auth.clone(), GateState::Locked);
        let err = gate.reset_pin().await.unwrap_err();
        assert!(matches!(err, PinError::ResetFailed(_)));
        assert_eq!(gate.state(), GateState::Locked);
        // The session end never went through
        assert!(auth.current_identity().is_some());
    }

    #[tokio::test]
    async fn test_from_session_maps_states() {
        let auth = Arc::new(FakeAuth::signed_in());
        let store = Arc::new(MemorySecretStore::new());
        let resolver = SessionResolver::new(auth.clone(), store.clone());

        let setup = PinGate::from_session(
            store.clone(),
            auth.clone(),
            resolver.handle(),
            SessionState::NeedsPinSetup,
        );
        assert_eq!(setup.map(|g| g.state()), Some(GateState::Setup));

        let locked = PinGate::from_session(
            store.clone(),
            auth.clone(),
            resolver.handle(),
            SessionState::NeedsPinUnlock,
        );
        assert_eq!(locked.map(|g| g.state()), Some(GateState::Locked));

        assert!(PinGate::from_session(store, auth, resolver.handle(), SessionState::NeedsLogin)
            .is_none());
    }
}
