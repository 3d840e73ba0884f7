//! Protocol parameter names
//!
//! Query and form parameter names used on the authorization URL and the
//! token request, as a closed enumeration.

use std::fmt;

/// `response_type` value for the authorization code flow.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// `grant_type` value for exchanging an authorization code.
pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

/// A protocol parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    ClientId,
    ClientSecret,
    ResponseType,
    Scope,
    RedirectUri,
    State,
    Nonce,
    CodeChallengeMethod,
    CodeChallenge,
    GrantType,
    Code,
    CodeVerifier,
    Error,
    ErrorDescription,
}

impl Param {
    /// Wire name of the parameter.
    pub const fn as_str(self) -> &'static str {
        match self {
            Param::ClientId => "client_id",
            Param::ClientSecret => "client_secret",
            Param::ResponseType => "response_type",
            Param::Scope => "scope",
            Param::RedirectUri => "redirect_uri",
            Param::State => "state",
            Param::Nonce => "nonce",
            Param::CodeChallengeMethod => "code_challenge_method",
            Param::CodeChallenge => "code_challenge",
            Param::GrantType => "grant_type",
            Param::Code => "code",
            Param::CodeVerifier => "code_verifier",
            Param::Error => "error",
            Param::ErrorDescription => "error_description",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Param {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
