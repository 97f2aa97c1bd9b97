//! redb-backed `CredentialVault`: AES-256-GCM over a key derived from a
//! passphrase supplied out-of-band via the environment, never through
//! `MemoryConfig` (which carries no secret material).

use std::path::Path;
use std::sync::Arc;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use chrono::Utc;
use memory_core::storage::CredentialVault;
use memory_core::types::{Credential, CredentialType};
use memory_core::{Error, Result};
use redb::{Database, ReadableTable};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::tables::VAULT_TABLE;
use crate::util::with_db_timeout;

/// Name of the environment variable the vault reads its passphrase from.
pub const VAULT_PASSPHRASE_ENV_VAR: &str = "MEMORY_VAULT_PASSPHRASE";

/// Minimum passphrase length (spec §4.7: "a 256-bit key derived from a
/// process-supplied passphrase (≥16 chars)").
const MIN_PASSPHRASE_LEN: usize = 16;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

fn vault_key(service: &str, credential_type: CredentialType) -> String {
    format!("{service}:{}", credential_type.label())
}

/// redb-backed implementation of `CredentialVault`.
pub struct RedbCredentialVault {
    db: Arc<Database>,
    cipher: Aes256Gcm,
}

impl RedbCredentialVault {
    /// Open (creating if absent) the vault database at `path`, deriving the
    /// AEAD key from the passphrase in [`VAULT_PASSPHRASE_ENV_VAR`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the environment variable is unset,
    /// or [`Error::Storage`] if the database cannot be opened.
    pub async fn open(path: &Path) -> Result<Self> {
        let passphrase = std::env::var(VAULT_PASSPHRASE_ENV_VAR).map_err(|_| {
            Error::Configuration(format!(
                "{VAULT_PASSPHRASE_ENV_VAR} must be set to open the credential vault"
            ))
        })?;
        Self::open_with_passphrase(path, &passphrase).await
    }

    /// Like [`Self::open`] but with an explicit passphrase, for tests and
    /// hosts that source the secret from their own key manager.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Security`] if the passphrase is shorter than 16
    /// chars, or [`Error::Storage`] if the database cannot be opened.
    pub async fn open_with_passphrase(path: &Path, passphrase: &str) -> Result<Self> {
        if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
            return Err(Error::Security(format!(
                "vault passphrase must be at least {MIN_PASSPHRASE_LEN} chars"
            )));
        }
        let digest = Sha256::digest(passphrase.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        let cipher = Aes256Gcm::new(key);

        let path_buf = path.to_path_buf();
        let db = with_db_timeout(move || {
            Database::create(&path_buf)
                .map_err(|e| Error::Storage(format!("failed to open vault database: {e}")))
        })
        .await?;

        let vault = Self {
            db: Arc::new(db),
            cipher,
        };
        vault.ensure_table().await?;
        Ok(vault)
    }

    async fn ensure_table(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                txn.open_table(VAULT_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open vault table: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    /// Encrypt `plaintext`, packing the result as `IV(12) || TAG(16) || CIPHERTEXT`
    /// to match [`Credential::ciphertext`]'s documented layout. `aes-gcm`
    /// natively appends the tag after the ciphertext, so the tag is split off
    /// and moved to the front.
    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let mut sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| Error::Security(format!("failed to encrypt credential: {e}")))?;

        if sealed.len() < TAG_LEN {
            return Err(Error::Security(
                "ciphertext shorter than the AEAD tag".to_string(),
            ));
        }
        let tag = sealed.split_off(sealed.len() - TAG_LEN);
        let ciphertext = sealed;

        let mut packed = Vec::with_capacity(NONCE_LEN + TAG_LEN + ciphertext.len());
        packed.extend_from_slice(nonce.as_slice());
        packed.extend_from_slice(&tag);
        packed.extend_from_slice(&ciphertext);
        Ok(packed)
    }

    /// Reverse of [`Self::encrypt`]: unpack `IV || TAG || CIPHERTEXT` back
    /// into the `ciphertext || TAG` layout `aes-gcm` expects.
    fn decrypt(&self, packed: &[u8]) -> Result<String> {
        if packed.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::VaultKeyInvalid(
                "stored ciphertext too short to contain IV and tag".to_string(),
            ));
        }
        let (nonce_bytes, rest) = packed.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let mut native = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        native.extend_from_slice(ciphertext);
        native.extend_from_slice(tag);

        let plaintext = self
            .cipher
            .decrypt(nonce, native.as_slice())
            .map_err(|_| Error::VaultKeyInvalid("vault key cannot decrypt credential".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|e| Error::Integrity(format!("decrypted credential is not valid UTF-8: {e}")))
    }

    fn read_credential(db: &Database, key: &str) -> Result<Option<Credential>> {
        let txn = db
            .begin_read()
            .map_err(|e| Error::Storage(format!("failed to begin read transaction: {e}")))?;
        let table = txn
            .open_table(VAULT_TABLE)
            .map_err(|e| Error::Storage(format!("failed to open vault table: {e}")))?;
        match table
            .get(key)
            .map_err(|e| Error::Storage(format!("failed to get credential: {e}")))?
        {
            Some(guard) => {
                let credential: Credential = postcard::from_bytes(guard.value()).map_err(|e| {
                    Error::Serialization(format!("failed to deserialize credential: {e}"))
                })?;
                Ok(Some(credential))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CredentialVault for RedbCredentialVault {
    #[instrument(skip(self, secret), fields(service = %service))]
    async fn store(
        &self,
        service: &str,
        credential_type: CredentialType,
        secret: &str,
        url: Option<String>,
        notes: Option<String>,
    ) -> Result<()> {
        let ciphertext = self.encrypt(secret)?;
        let now = Utc::now();
        let key = vault_key(service, credential_type);

        let db = Arc::clone(&self.db);
        let service = service.to_string();
        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut table = txn
                    .open_table(VAULT_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open vault table: {e}")))?;

                let created = table
                    .get(key.as_str())
                    .map_err(|e| Error::Storage(format!("failed to get credential: {e}")))?
                    .map(|guard| {
                        postcard::from_bytes::<Credential>(guard.value())
                            .ok()
                            .map(|c| c.created)
                    })
                    .unwrap_or(None)
                    .unwrap_or(now);

                let credential = Credential {
                    service,
                    credential_type,
                    ciphertext,
                    url,
                    notes,
                    created,
                    updated: now,
                    expires: None,
                };
                let bytes = postcard::to_allocvec(&credential).map_err(|e| {
                    Error::Serialization(format!("failed to serialize credential: {e}"))
                })?;
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(|e| Error::Storage(format!("failed to store credential: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn get(&self, service: &str, credential_type: CredentialType) -> Result<Option<String>> {
        let key = vault_key(service, credential_type);
        let db = Arc::clone(&self.db);
        let credential =
            with_db_timeout(move || Self::read_credential(&db, &key)).await?;

        match credential {
            Some(c) => Ok(Some(self.decrypt(&c.ciphertext)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Credential>> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let txn = db
                .begin_read()
                .map_err(|e| Error::Storage(format!("failed to begin read transaction: {e}")))?;
            let table = txn
                .open_table(VAULT_TABLE)
                .map_err(|e| Error::Storage(format!("failed to open vault table: {e}")))?;

            let mut credentials = Vec::new();
            let iter = table
                .iter()
                .map_err(|e| Error::Storage(format!("failed to iterate vault: {e}")))?;
            for entry in iter {
                let (_, bytes) = entry
                    .map_err(|e| Error::Storage(format!("failed to read credential entry: {e}")))?;
                let credential: Credential = postcard::from_bytes(bytes.value()).map_err(|e| {
                    Error::Serialization(format!("failed to deserialize credential: {e}"))
                })?;
                credentials.push(credential);
            }
            Ok(credentials)
        })
        .await
    }

    #[instrument(skip(self), fields(service = %service))]
    async fn delete(&self, service: &str, credential_type: CredentialType) -> Result<()> {
        let key = vault_key(service, credential_type);
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut table = txn
                    .open_table(VAULT_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open vault table: {e}")))?;
                table
                    .remove(key.as_str())
                    .map_err(|e| Error::Storage(format!("failed to delete credential: {e}")))?;
            }
            txn.commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_get_roundtrips_the_plaintext_secret() {
        let dir = tempfile::tempdir().unwrap();
        let vault = RedbCredentialVault::open_with_passphrase(
            &dir.path().join("vault.redb"),
            "correct horse battery staple",
        )
        .await
        .unwrap();

        vault
            .store("github", CredentialType::Token, "ghp_secret", None, None)
            .await
            .unwrap();

        let fetched = vault.get("github", CredentialType::Token).await.unwrap();
        assert_eq!(fetched.as_deref(), Some("ghp_secret"));
    }

    #[tokio::test]
    async fn wrong_passphrase_fails_to_decrypt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.redb");

        let vault = RedbCredentialVault::open_with_passphrase(&path, "correct-passphrase-one")
            .await
            .unwrap();
        vault
            .store("aws", CredentialType::ApiKey, "AKIA_secret", None, None)
            .await
            .unwrap();
        drop(vault);

        let reopened = RedbCredentialVault::open_with_passphrase(&path, "correct-passphrase-two")
            .await
            .unwrap();
        let result = reopened.get("aws", CredentialType::ApiKey).await;
        assert!(matches!(result, Err(Error::VaultKeyInvalid(_))));
    }

    #[tokio::test]
    async fn list_never_exposes_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let vault = RedbCredentialVault::open_with_passphrase(
            &dir.path().join("vault.redb"),
            "correct horse battery staple",
        )
        .await
        .unwrap();
        vault
            .store("slack", CredentialType::Bearer, "xoxb-secret", None, None)
            .await
            .unwrap();

        let listed = vault.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_ne!(listed[0].ciphertext, b"xoxb-secret".to_vec());
    }

    #[tokio::test]
    async fn short_passphrase_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            RedbCredentialVault::open_with_passphrase(&dir.path().join("vault.redb"), "pw").await;
        assert!(matches!(result, Err(Error::Security(_))));
    }
}
