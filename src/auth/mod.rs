//! Credential verification for the WebSocket handshake.
//!
//! The gateway never sees passwords: the authentication subsystem issues
//! signed tokens and the gateway only checks them. [`CredentialVerifier`]
//! is the seam; [`JwtVerifier`] is the HS256 implementation.

pub mod jwt;

pub use jwt::{Claims, JwtVerifier};

use crate::domain::UserId;
use crate::error::GatewayError;

/// Validates an opaque credential and extracts the subject it was issued to.
pub trait CredentialVerifier: Send + Sync + std::fmt::Debug {
    /// Verifies `token` and returns its subject.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] for every failure: malformed
    /// token, bad signature, expiry or empty subject.
    fn verify(&self, token: &str) -> Result<UserId, GatewayError>;
}
