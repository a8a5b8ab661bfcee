//! HS256 JSON Web Tokens signed with the process-wide shared secret.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::CredentialVerifier;
use crate::domain::UserId;
use crate::error::GatewayError;

/// Claims carried by a user credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Legacy subject key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Legacy subject key.
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Expiration, seconds since the epoch.
    pub exp: u64,
    /// Issued at, seconds since the epoch.
    #[serde(default)]
    pub iat: u64,
}

impl Claims {
    /// Returns the first non-blank subject among `sub`, `id` and `userId`.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        [&self.sub, &self.id, &self.user_id]
            .into_iter()
            .filter_map(|key| key.as_deref().map(str::trim))
            .find(|subject| !subject.is_empty())
    }
}

/// Verifies (and for collaborators, issues) HS256 tokens.
#[derive(Clone)]
pub struct JwtVerifier {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl JwtVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            validation,
        }
    }

    /// Issues a token for `subject` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if encoding fails.
    pub fn issue(&self, subject: &UserId, ttl: Duration) -> Result<String, GatewayError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: Some(subject.to_string()),
            id: None,
            user_id: None,
            exp: now.saturating_add(ttl.as_secs()),
            iat: now,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::Internal(format!("token encoding failed: {e}")))
    }
}

impl CredentialVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<UserId, GatewayError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "credential rejected");
            GatewayError::Unauthorized
        })?;
        let Some(subject) = data.claims.subject() else {
            tracing::debug!("credential rejected: empty subject");
            return Err(GatewayError::Unauthorized);
        };
        Ok(UserId::new(subject))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    fn sign_raw(secret: &[u8], claims: &serde_json::Value) -> String {
        let Ok(token) = encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        ) else {
            panic!("encoding failed");
        };
        token
    }

    fn future_exp() -> u64 {
        Utc::now().timestamp() as u64 + 3600
    }

    #[test]
    fn issued_token_verifies() {
        let verifier = JwtVerifier::new(SECRET);
        let Ok(token) = verifier.issue(&UserId::new("U1"), Duration::from_secs(60)) else {
            panic!("issue failed");
        };
        let Ok(subject) = verifier.verify(&token) else {
            panic!("verify failed");
        };
        assert_eq!(subject, UserId::new("U1"));
    }

    #[test]
    fn legacy_id_claim_is_accepted() {
        let token = sign_raw(SECRET, &serde_json::json!({ "id": "U7", "exp": future_exp() }));
        let verifier = JwtVerifier::new(SECRET);
        assert!(matches!(verifier.verify(&token), Ok(u) if u == UserId::new("U7")));
    }

    #[test]
    fn token_with_several_subject_keys_is_accepted() {
        let verifier = JwtVerifier::new(SECRET);
        let both = sign_raw(
            SECRET,
            &serde_json::json!({ "sub": "U1", "id": "U1", "exp": future_exp() }),
        );
        assert!(matches!(verifier.verify(&both), Ok(u) if u == UserId::new("U1")));

        let blank_sub = sign_raw(
            SECRET,
            &serde_json::json!({ "sub": "", "userId": "U9", "exp": future_exp() }),
        );
        assert!(matches!(verifier.verify(&blank_sub), Ok(u) if u == UserId::new("U9")));
    }

    #[test]
    fn every_failure_is_unauthorized() {
        let verifier = JwtVerifier::new(SECRET);
        let expired = sign_raw(SECRET, &serde_json::json!({ "sub": "U1", "exp": 1 }));
        let wrong_secret = sign_raw(b"other", &serde_json::json!({ "sub": "U1", "exp": future_exp() }));
        let no_exp = sign_raw(SECRET, &serde_json::json!({ "sub": "U1" }));
        let empty_sub = sign_raw(SECRET, &serde_json::json!({ "sub": " ", "exp": future_exp() }));

        for token in [
            "",
            "not-a-jwt",
            "a.b.c",
            expired.as_str(),
            wrong_secret.as_str(),
            no_exp.as_str(),
            empty_sub.as_str(),
        ] {
            assert!(
                matches!(verifier.verify(token), Err(GatewayError::Unauthorized)),
                "token {token:?} should be rejected"
            );
        }
    }

    #[test]
    fn debug_does_not_leak_keys() {
        let verifier = JwtVerifier::new(SECRET);
        let rendered = format!("{verifier:?}");
        assert!(!rendered.contains("test-secret"));
    }
}
