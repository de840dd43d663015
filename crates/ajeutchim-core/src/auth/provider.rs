use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;

/// An authenticated remote session.
///
/// The entry gate only ever tests for presence; the fields exist for the
/// screens (profile header, authenticated backend calls).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub id_token: String,
}

/// Seam between the entry gate and the remote auth backend.
///
/// `subscribe` hands out a watch receiver: the current identity is visible
/// immediately and every change is delivered in order. Dropping the
/// receiver unsubscribes.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Snapshot of the current identity, if a session exists
    fn current_identity(&self) -> Option<Identity>;

    /// Subscribe to identity changes
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    /// End the remote session
    async fn end_session(&self) -> Result<()>;
}
