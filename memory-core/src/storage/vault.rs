use async_trait::async_trait;

use crate::types::{Credential, CredentialType};
use crate::Result;

/// Separate authenticated-encrypted key-value store for secrets, keyed by
/// `(service, type)`. The `FactStore` holds only opaque `vault:<service>`
/// pointers; plaintext secrets never leave this trait's implementation.
#[async_trait]
pub trait CredentialVault: Send + Sync {
    /// Encrypt and store `secret` under `(service, credential_type)`.
    ///
    /// # Errors
    ///
    /// Returns an error on storage or encryption failure.
    async fn store(
        &self,
        service: &str,
        credential_type: CredentialType,
        secret: &str,
        url: Option<String>,
        notes: Option<String>,
    ) -> Result<()>;

    /// Decrypt and return the secret stored under `(service, credential_type)`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::VaultKeyInvalid`] if the configured key cannot
    /// decrypt the stored ciphertext.
    async fn get(&self, service: &str, credential_type: CredentialType) -> Result<Option<String>>;

    /// List stored credentials' metadata (never decrypted plaintext).
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn list(&self) -> Result<Vec<Credential>>;

    /// Remove a stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    async fn delete(&self, service: &str, credential_type: CredentialType) -> Result<()>;
}
