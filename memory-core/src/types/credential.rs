use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of secret a [`Credential`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    /// A bare access token.
    Token,
    /// A plaintext password.
    Password,
    /// A service API key.
    ApiKey,
    /// An SSH private key or passphrase.
    Ssh,
    /// A bearer token for HTTP authorization.
    Bearer,
    /// Any secret not covered by the above.
    Other,
}

impl CredentialType {
    /// The on-disk label for this credential type.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CredentialType::Token => "token",
            CredentialType::Password => "password",
            CredentialType::ApiKey => "api_key",
            CredentialType::Ssh => "ssh",
            CredentialType::Bearer => "bearer",
            CredentialType::Other => "other",
        }
    }
}

/// A secret stored in the `CredentialVault`, keyed by `(service, type)`.
///
/// `ciphertext` is the `IV(12) || AUTH_TAG(16) || CIPHERTEXT` blob produced by
/// the vault's AEAD cipher; the plaintext secret never appears in this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// The service this credential authenticates against, e.g. `"github"`.
    pub service: String,
    /// The credential's kind.
    pub credential_type: CredentialType,
    /// `IV || AUTH_TAG || CIPHERTEXT`.
    pub ciphertext: Vec<u8>,
    /// An optional associated URL (e.g. the API endpoint).
    pub url: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// When this credential was first stored.
    pub created: DateTime<Utc>,
    /// When this credential was last updated.
    pub updated: DateTime<Utc>,
    /// When this credential expires, if known.
    pub expires: Option<DateTime<Utc>>,
}

impl Credential {
    /// The `vault:<service>` pointer text the `FactStore` stores in place of
    /// the raw secret.
    #[must_use]
    pub fn pointer(service: &str) -> String {
        format!("vault:{service}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_format() {
        assert_eq!(Credential::pointer("github"), "vault:github");
    }
}
