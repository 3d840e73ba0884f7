//! PKCE S256 verifier and challenge
//!
//! Implements the client half of Proof Key for Code Exchange (RFC 7636).
//! Only the `S256` method is supported; there is no plain mode.
//!
//! 1. The client holds a high-entropy `code_verifier`.
//! 2. The authorization URL carries `code_challenge`, the unpadded
//!    base64url SHA-256 digest of the verifier, and
//!    `code_challenge_method=S256`.
//! 3. The token request carries the verifier itself, which the provider
//!    hashes and compares against the challenge it saw in step 2.
//!
//! # References
//!
//! - RFC 7636 <https://www.rfc-editor.org/rfc/rfc7636>

use std::fmt;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{OidcError, Result};

/// The only supported challenge method.
pub const METHOD_S256: &str = "S256";

const MIN_VERIFIER_LEN: usize = 43;
const MAX_VERIFIER_LEN: usize = 128;

// ---------------------------------------------------------------------------
// CodeVerifier
// ---------------------------------------------------------------------------

/// A PKCE code verifier.
///
/// Generated once per [`OidcClient`](crate::oidc::client::OidcClient) and
/// reused by every authorization attempt that client issues. `Debug` never
/// prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CodeVerifier(String);

impl CodeVerifier {
    /// Generates a new verifier from two random v4 UUIDs (72 characters).
    ///
    /// # Examples
    ///
    /// ```
    /// use oidclite::oidc::pkce::CodeVerifier;
    ///
    /// let verifier = CodeVerifier::generate();
    /// assert_eq!(verifier.as_str().len(), 72);
    /// ```
    pub fn generate() -> Self {
        Self(format!("{}{}", Uuid::new_v4(), Uuid::new_v4()))
    }

    /// Wraps an existing verifier string.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Config`] unless the value is 43 to 128 characters
    /// drawn from the RFC 7636 unreserved set (`A-Z a-z 0-9 - . _ ~`).
    pub fn from_string(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&value.len()) {
            return Err(OidcError::Config(format!(
                "code verifier must be {}-{} characters, got {}",
                MIN_VERIFIER_LEN,
                MAX_VERIFIER_LEN,
                value.len()
            )));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
        {
            return Err(OidcError::Config(
                "code verifier contains characters outside the unreserved set".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// The raw verifier sent as `code_verifier`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The S256 challenge derived from this verifier.
    pub fn challenge(&self) -> String {
        code_challenge(&self.0)
    }
}

impl fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CodeVerifier(<redacted>)")
    }
}

impl TryFrom<String> for CodeVerifier {
    type Error = OidcError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_string(value)
    }
}

impl From<CodeVerifier> for String {
    fn from(verifier: CodeVerifier) -> Self {
        verifier.0
    }
}

// ---------------------------------------------------------------------------
// Challenge derivation
// ---------------------------------------------------------------------------

/// Computes `base64url_nopad(SHA256(ascii(verifier)))`.
///
/// # Examples
///
/// ```
/// use oidclite::oidc::pkce::code_challenge;
///
/// assert_eq!(
///     code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
///     "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
/// );
/// ```
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice())
}

/// A verifier paired with its derived challenge.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Sent to the token endpoint.
    pub verifier: CodeVerifier,
    /// Sent to the authorization endpoint.
    pub challenge: String,
    /// Always [`METHOD_S256`].
    pub method: &'static str,
}

impl PkceChallenge {
    /// Derives the challenge for an existing verifier.
    pub fn from_verifier(verifier: CodeVerifier) -> Self {
        let challenge = verifier.challenge();
        Self {
            verifier,
            challenge,
            method: METHOD_S256,
        }
    }

    /// Generates a fresh verifier and its challenge.
    pub fn generate() -> Self {
        Self::from_verifier(CodeVerifier::generate())
    }
}
