//! Remote session management.
//!
//! `AuthService` is the production `AuthProvider`: it signs the user in
//! and out against the hosted auth API, keeps the current identity on a
//! watch channel for the entry gate, and caches the session token in the
//! device-local secret store.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::{ApiError, AuthClient};

use super::provider::{AuthProvider, Identity};
use super::secrets::{SecretStore, TOKEN_KEY};

pub struct AuthService {
    client: AuthClient,
    secrets: Arc<dyn SecretStore>,
    identity: watch::Sender<Option<Identity>>,
}

impl AuthService {
    pub fn new(client: AuthClient, secrets: Arc<dyn SecretStore>) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            client,
            secrets,
            identity,
        }
    }

    /// Sign in with email and password.
    ///
    /// Publishes the new identity on success. The session token is also
    /// cached on-device; a failed cache write is logged and ignored, the
    /// sign-in itself still counts.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        let identity = self.client.sign_in(email, password).await?;
        self.cache_token(&identity).await;
        info!(uid = %identity.uid, "Signed in");
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    /// Create an account and sign it in
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        let identity = self.client.sign_up(email, password).await?;
        self.cache_token(&identity).await;
        info!(uid = %identity.uid, "Account created");
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    /// Ask the backend to email a password-reset link
    pub async fn send_password_reset(&self, email: &str) -> Result<(), ApiError> {
        self.client.send_password_reset(email).await
    }

    async fn cache_token(&self, identity: &Identity) {
        if let Err(e) = self.secrets.set(TOKEN_KEY, &identity.id_token).await {
            warn!(error = %e, "Failed to cache session token");
        }
    }
}

#[async_trait]
impl AuthProvider for AuthService {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    /// End the remote session and drop the cached token.
    ///
    /// The identity is only cleared once the token is gone, so a failed
    /// delete leaves the session observably intact for the caller to
    /// retry.
    async fn end_session(&self) -> Result<()> {
        self.secrets.delete(TOKEN_KEY).await?;
        self.identity.send_replace(None);
        info!("Session ended");
        Ok(())
    }
}
