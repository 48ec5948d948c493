//! WireGuard key material.
//!
//! Keys are X25519 and travel as standard base64 text, the same encoding
//! `wg genkey` and `wg pubkey` use.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::errors::{AppError, AppResult};

/// A freshly generated or imported tunnel key pair.
#[derive(Clone)]
pub struct TunnelKeyPair {
    private_key: String,
    public_key: String,
}

impl std::fmt::Debug for TunnelKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelKeyPair")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl TunnelKeyPair {
    /// Generate a new key pair from the OS random source.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        Self::from_secret_bytes(secret.to_bytes())
    }

    /// Import a base64 private key and derive its public half.
    pub fn from_private_key(encoded: &str) -> AppResult<Self> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| AppError::validation("Private key is not valid base64"))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| AppError::validation("Private key must be 32 bytes"))?;
        Ok(Self::from_secret_bytes(bytes))
    }

    fn from_secret_bytes(mut bytes: [u8; 32]) -> Self {
        clamp(&mut bytes);
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);

        Self {
            private_key: STANDARD.encode(bytes),
            public_key: STANDARD.encode(public.as_bytes()),
        }
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Split into `(private_key, public_key)`.
    pub fn into_parts(self) -> (String, String) {
        (self.private_key, self.public_key)
    }
}

/// Whether `encoded` is a base64 32-byte WireGuard key.
pub fn is_valid_key(encoded: &str) -> bool {
    STANDARD
        .decode(encoded)
        .map(|raw| raw.len() == 32)
        .unwrap_or(false)
}

/// Curve25519 scalar clamping, as applied by `wg genkey`.
fn clamp(bytes: &mut [u8; 32]) {
    bytes[0] &= 248;
    bytes[31] &= 127;
    bytes[31] |= 64;
}
