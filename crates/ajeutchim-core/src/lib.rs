//! Core library for the AJEUTCHIM association app.
//!
//! Everything below the screens lives here: the entry gate that decides
//! which screen a launch lands on (sign-in, PIN setup, PIN unlock, or
//! home), the auth service and device-local secret storage it relies on,
//! and the domain models with their local filtering and grouping logic.
//!
//! The screens watch `gate::SessionState` and route accordingly; the gate
//! itself only ever talks to its two collaborators through the
//! `auth::AuthProvider` and `auth::SecretStore` seams, so tests (and
//! previews) can substitute fakes.

pub mod api;
pub mod auth;
pub mod config;
pub mod gate;
pub mod models;
pub mod utils;

pub use auth::{AuthProvider, AuthService, Identity, KeyringSecretStore, SecretStore};
pub use gate::{GateState, PinError, PinGate, SessionHandle, SessionResolver, SessionState};
