//! Request signature verification.
//!
//! Discord signs every interaction with the application's Ed25519 key:
//!
//!   X-Signature-Timestamp ┐
//!   raw request body      ┴─► message ─► verify(X-Signature-Ed25519)
//!
//! A request that fails here is answered with a bare 400 and never
//! reaches the router.

use anyhow::{Context, Result};
use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature header is not 64 hex-encoded bytes")]
    Encoding,
    #[error("signature does not match")]
    Mismatch,
}

/// Verifies that a request body came from the chat platform.
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        timestamp: &str,
        body: &[u8],
        signature_hex: &str,
    ) -> Result<(), SignatureError>;
}

pub struct Ed25519Verifier {
    key: VerifyingKey,
}

impl Ed25519Verifier {
    /// Build from the hex public key shown in the developer portal.
    pub fn from_hex(public_key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(public_key_hex.trim()).context("Public key is not valid hex")?;
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Public key must be {} bytes", PUBLIC_KEY_LENGTH))?;
        let key =
            VerifyingKey::from_bytes(&bytes).context("Public key is not a valid Ed25519 point")?;
        Ok(Self { key })
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(
        &self,
        timestamp: &str,
        body: &[u8],
        signature_hex: &str,
    ) -> Result<(), SignatureError> {
        let raw = hex::decode(signature_hex.trim()).map_err(|_| SignatureError::Encoding)?;
        let raw: [u8; SIGNATURE_LENGTH] = raw.try_into().map_err(|_| SignatureError::Encoding)?;
        let signature = Signature::from_bytes(&raw);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify(&message, &signature)
            .map_err(|_| SignatureError::Mismatch)
    }
}
