//! Client for the hosted auth API.
//!
//! This module provides the `AuthClient` struct for email/password
//! sign-in, account creation, and password-reset emails against the
//! identity endpoint.

pub mod client;
pub mod error;

pub use client::AuthClient;
pub use error::ApiError;
