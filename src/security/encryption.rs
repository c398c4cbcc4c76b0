//! AES-256-GCM body envelopes.
//!
//! Envelope JSON: `{"iv": b64, "ct": b64, "tag": b64, "aad": b64?}` with a
//! 12-byte IV and a 16-byte tag, standard base64 alphabet. The cipher key is
//! SHA-256 of the actor's key secret, so secrets of any length are usable.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce as AesNonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const IV_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

/// Wire form of an encrypted body. Missing fields decode as empty and then
/// fail integrity checks, never parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    #[serde(default)]
    pub iv: String,
    #[serde(default)]
    pub ct: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad: Option<String>,
}

/// Symmetric envelope cipher.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymmetricEncryption;

impl SymmetricEncryption {
    /// Open an envelope. Any malformed field or failed tag check yields `None`.
    pub fn decrypt(&self, envelope: &EncryptedEnvelope, secret: &str) -> Option<Vec<u8>> {
        let iv = STANDARD.decode(&envelope.iv).ok()?;
        let mut sealed = STANDARD.decode(&envelope.ct).ok()?;
        let tag = STANDARD.decode(&envelope.tag).ok()?;
        let aad = match envelope.aad.as_deref() {
            Some(encoded) if !encoded.is_empty() => STANDARD.decode(encoded).ok()?,
            _ => Vec::new(),
        };

        if iv.len() != IV_SIZE || tag.len() != TAG_SIZE {
            return None;
        }
        sealed.extend_from_slice(&tag);

        cipher_for(secret)?
            .decrypt(AesNonce::from_slice(&iv), Payload { msg: &sealed, aad: &aad })
            .ok()
    }

    /// Seal plaintext under a fresh random IV.
    pub fn encrypt(&self, plaintext: &[u8], aad: Option<&[u8]>, secret: &str) -> Option<EncryptedEnvelope> {
        let mut iv = [0u8; IV_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let mut sealed = cipher_for(secret)?
            .encrypt(
                AesNonce::from_slice(&iv),
                Payload {
                    msg: plaintext,
                    aad: aad.unwrap_or_default(),
                },
            )
            .ok()?;
        let tag = sealed.split_off(sealed.len() - TAG_SIZE);

        Some(EncryptedEnvelope {
            iv: STANDARD.encode(iv),
            ct: STANDARD.encode(&sealed),
            tag: STANDARD.encode(&tag),
            aad: aad.map(|bytes| STANDARD.encode(bytes)),
        })
    }
}

fn cipher_for(secret: &str) -> Option<Aes256Gcm> {
    let key = Sha256::digest(secret.as_bytes());
    Aes256Gcm::new_from_slice(key.as_slice()).ok()
}
