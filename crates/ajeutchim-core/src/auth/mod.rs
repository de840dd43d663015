//! Authentication module for managing the remote session and local secrets.
//!
//! This module provides:
//! - `AuthProvider`: the seam the entry gate observes the identity through
//! - `AuthService`: production provider backed by the hosted auth API
//! - `SecretStore`: device-local secret persistence (session token, PIN)
//!
//! The PIN itself is owned by the gate (`crate::gate`); this module only
//! stores and reports it.

pub mod provider;
pub mod secrets;
pub mod service;

pub use provider::{AuthProvider, Identity};
pub use secrets::{KeyringSecretStore, MemorySecretStore, SecretStore, PIN_KEY, TOKEN_KEY};
pub use service::AuthService;
