//! Local session keypair
//!
//! The secret key lives only in memory; nothing here touches disk.

use std::fmt;
use std::sync::Arc;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::ParseError;
use crate::models::{Address, Signature};

/// An ed25519 keypair. `secret_key()` is the 64-byte seed || public key form.
#[derive(Clone)]
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Keypair {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuild a keypair, rejecting material whose public half does not match
    pub fn from_secret_key(bytes: &[u8; 64]) -> Result<Self, ParseError> {
        SigningKey::from_keypair_bytes(bytes)
            .map(|signing| Keypair { signing })
            .map_err(|_| ParseError::KeypairMismatch)
    }

    pub fn public_key(&self) -> Address {
        Address::new(self.signing.verifying_key().to_bytes())
    }

    pub fn secret_key(&self) -> [u8; 64] {
        self.signing.to_keypair_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::new(self.signing.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Check an ed25519 signature made by `signer` over `message`
pub fn verify_signature(signer: &Address, message: &[u8], signature: &Signature) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    key.verify(message, &sig).is_ok()
}

/// Holds the single live keypair of the session
#[derive(Debug, Default)]
pub struct KeyManager {
    current: Option<Arc<Keypair>>,
}

impl KeyManager {
    pub fn new() -> Self {
        KeyManager { current: None }
    }

    /// Generate a fresh keypair, silently discarding any previous one
    pub fn create(&mut self) -> Arc<Keypair> {
        let keypair = Arc::new(Keypair::generate());
        if let Some(old) = self.current.replace(keypair.clone()) {
            tracing::info!(previous = %old.public_key(), "Discarding previous local account");
        }
        tracing::info!(address = %keypair.public_key(), "Created local account");
        keypair
    }

    pub fn current(&self) -> Option<Arc<Keypair>> {
        self.current.clone()
    }

    pub fn address(&self) -> Option<Address> {
        self.current.as_ref().map(|k| k.public_key())
    }
}
