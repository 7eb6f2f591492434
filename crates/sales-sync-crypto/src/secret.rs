use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use sales_sync_core::error::CoreError;
use sales_sync_core::constants::{SECRET_KEY_BYTES, SECRET_NONCE_BYTES, SHORT_HASH_TAIL_CHARS};
use zeroize::Zeroizing;

const FRAME_PREFIX: &str = "v1";

/// Encrypts and decrypts partner credential secrets at rest. Kept as a
/// trait so tests can swap in a non-encrypting provider without exercising
/// the AEAD path on every assertion.
pub trait SecretProvider: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CoreError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, CoreError>;

    /// Last `SHORT_HASH_TAIL_CHARS` characters of the plaintext, for
    /// display in the admin UI. Never used for access control.
    fn short_hash(&self, plaintext: &str) -> String {
        let len = plaintext.chars().count();
        let skip = len.saturating_sub(SHORT_HASH_TAIL_CHARS);
        plaintext.chars().skip(skip).collect()
    }
}

/// ChaCha20-Poly1305 secret provider. The key is held in a zeroizing
/// container so it is wiped from memory on drop.
pub struct AeadSecretProvider {
    key: Zeroizing<[u8; SECRET_KEY_BYTES]>,
}

impl AeadSecretProvider {
    /// Build a provider from raw key bytes (exactly `SECRET_KEY_BYTES`).
    pub fn from_key_bytes(key: [u8; SECRET_KEY_BYTES]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Decode a hex- or base64-encoded 32-byte key, such as the contents
    /// of the `ENCRYPTION_KEY` environment variable.
    pub fn from_encoded_key(encoded: &str) -> Result<Self, CoreError> {
        let trimmed = encoded.trim();
        let raw = if let Ok(bytes) = hex::decode(trimmed) {
            bytes
        } else {
            base64::engine::general_purpose::STANDARD
                .decode(trimmed)
                .map_err(|e| CoreError::BadInput(format!("ENCRYPTION_KEY is neither hex nor base64: {e}")))?
        };
        if raw.len() != SECRET_KEY_BYTES {
            return Err(CoreError::BadInput(format!(
                "ENCRYPTION_KEY must decode to {SECRET_KEY_BYTES} bytes, got {}",
                raw.len()
            )));
        }
        let mut key = [0u8; SECRET_KEY_BYTES];
        key.copy_from_slice(&raw);
        Ok(Self::from_key_bytes(key))
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&*self.key))
    }
}

impl SecretProvider for AeadSecretProvider {
    fn encrypt(&self, plaintext: &str) -> Result<String, CoreError> {
        let mut nonce_bytes = [0u8; SECRET_NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CoreError::InvalidCiphertext("encryption failed".into()))?;

        // ChaCha20Poly1305 appends the 16-byte tag to the ciphertext; split
        // it back out so the on-disk framing carries iv, tag and ciphertext
        // as three explicit fields rather than one opaque blob.
        let tag_at = ciphertext.len() - 16;
        let (body, tag) = ciphertext.split_at(tag_at);

        Ok(format!(
            "{FRAME_PREFIX}:{}:{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(tag),
            hex::encode(body)
        ))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CoreError> {
        let parts: Vec<&str> = ciphertext.split(':').collect();
        let (iv_hex, tag_hex, body_hex) = match parts.as_slice() {
            [FRAME_PREFIX, iv, tag, body] => (*iv, *tag, *body),
            // Legacy framing, written before versioning was introduced.
            [iv, tag, body] => (*iv, *tag, *body),
            _ => {
                return Err(CoreError::InvalidCiphertext(
                    "expected iv:tag:ciphertext framing".into(),
                ))
            }
        };

        let iv = hex::decode(iv_hex)
            .map_err(|e| CoreError::InvalidCiphertext(format!("bad iv: {e}")))?;
        let tag = hex::decode(tag_hex)
            .map_err(|e| CoreError::InvalidCiphertext(format!("bad tag: {e}")))?;
        let body = hex::decode(body_hex)
            .map_err(|e| CoreError::InvalidCiphertext(format!("bad body: {e}")))?;

        if iv.len() != SECRET_NONCE_BYTES {
            return Err(CoreError::InvalidCiphertext("bad iv length".into()));
        }

        let mut combined = body;
        combined.extend_from_slice(&tag);

        let nonce = Nonce::from_slice(&iv);
        let plaintext = self
            .cipher()
            .decrypt(nonce, combined.as_slice())
            .map_err(|_| CoreError::InvalidCiphertext("authentication failed".into()))?;

        String::from_utf8(plaintext)
            .map_err(|_| CoreError::InvalidCiphertext("decrypted plaintext is not valid utf-8".into()))
    }
}

/// Non-encrypting provider for tests that exercise storage/transport logic
/// without paying for real AEAD, or that need to assert on plaintext.
#[derive(Default)]
pub struct PlaintextSecretProvider;

impl SecretProvider for PlaintextSecretProvider {
    fn encrypt(&self, plaintext: &str) -> Result<String, CoreError> {
        Ok(format!("plain:{plaintext}"))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CoreError> {
        ciphertext
            .strip_prefix("plain:")
            .map(str::to_string)
            .ok_or_else(|| CoreError::InvalidCiphertext("missing plain: prefix".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> AeadSecretProvider {
        AeadSecretProvider::from_key_bytes([7u8; SECRET_KEY_BYTES])
    }

    #[test]
    fn round_trips_through_encrypt_decrypt() {
        let provider = test_provider();
        let ciphertext = provider.encrypt("sk_live_abc123").unwrap();
        assert_eq!(provider.decrypt(&ciphertext).unwrap(), "sk_live_abc123");
    }

    #[test]
    fn decrypt_rejects_tampered_ciphertext() {
        let provider = test_provider();
        let mut ciphertext = provider.encrypt("sk_live_abc123").unwrap();
        ciphertext.push('0');
        assert!(provider.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn decrypt_accepts_legacy_unversioned_framing() {
        let provider = test_provider();
        let versioned = provider.encrypt("sk_live_abc123").unwrap();
        let legacy = versioned.strip_prefix("v1:").unwrap();
        assert_eq!(provider.decrypt(legacy).unwrap(), "sk_live_abc123");
    }

    #[test]
    fn short_hash_is_last_four_chars() {
        let provider = test_provider();
        assert_eq!(provider.short_hash("sk_live_abc123"), "c123");
        assert_eq!(provider.short_hash("ab"), "ab");
    }
}
