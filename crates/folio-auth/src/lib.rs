//! folio-auth
//!
//! Thin wrappers over the well-known auth primitives: argon2 password
//! hashing, HS256 JWT session tokens, and RFC 6238 TOTP for optional MFA.
//! No algorithm logic lives here — only the library calls and the error
//! boundary the HTTP layer maps to status codes.

mod mfa;
mod token;

pub use mfa::{mfa_current_code, mfa_enroll, mfa_verify, MfaEnrollment};
pub use token::{Claims, TokenService};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Password hashing or PHC parsing failed.
    Hash(String),
    /// Token expired.
    TokenExpired,
    /// Token malformed, wrong signature, or wrong issuer.
    TokenInvalid(String),
    /// TOTP secret could not be decoded or the TOTP engine rejected it.
    Mfa(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash(msg) => write!(f, "password hash error: {msg}"),
            Self::TokenExpired => write!(f, "token expired"),
            Self::TokenInvalid(msg) => write!(f, "invalid token: {msg}"),
            Self::Mfa(msg) => write!(f, "mfa error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

/// Hash a password into PHC string format with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Verify a password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; only a malformed stored hash is an error.
pub fn verify_password(plain: &str, phc: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(phc).map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let phc = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &phc).unwrap());
        assert!(!verify_password("wrong password", &phc).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same input").unwrap();
        let b = hash_password("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_stored_hash_is_an_error() {
        let err = verify_password("anything", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, AuthError::Hash(_)));
    }
}
