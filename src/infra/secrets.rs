//! Storage of tunnel private keys.
//!
//! The user store never writes a private key directly; it goes through a
//! `SecretVault`. `PlaintextVault` stores keys as-is.

use crate::errors::AppResult;

/// Seals secrets before they are persisted and opens them on load.
pub trait SecretVault: Send + Sync {
    fn seal(&self, plaintext: &str) -> AppResult<String>;

    fn open(&self, stored: &str) -> AppResult<String>;
}

/// Identity vault: stored value equals the secret.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextVault;

impl SecretVault for PlaintextVault {
    fn seal(&self, plaintext: &str) -> AppResult<String> {
        Ok(plaintext.to_string())
    }

    fn open(&self, stored: &str) -> AppResult<String> {
        Ok(stored.to_string())
    }
}
