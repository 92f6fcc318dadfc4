use crate::error::{ExtractError, Stage};

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;
pub const SALT_LEN: usize = 8;

/// AES-256 key and CBC initialization vector. Overwritten on drop and never printed.
pub struct KeyMaterial {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl KeyMaterial {
    pub fn new(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// Takes an already known key and IV.
    pub fn from_slices(key: &[u8], iv: &[u8]) -> Result<Self, ExtractError> {
        let key = key.try_into().map_err(|_| ExtractError::Cipher {
            stage: Stage::Payload,
            reason: "key must be 32 bytes long",
        })?;
        let iv = iv.try_into().map_err(|_| ExtractError::Cipher {
            stage: Stage::Payload,
            reason: "iv must be 16 bytes long",
        })?;

        Ok(Self::new(key, iv))
    }

    /// OpenSSL `EVP_BytesToKey` with MD5 and a single iteration, as produced by
    /// CryptoJS passphrase encryption.
    ///
    /// `D_0 = MD5(passphrase || salt)`, `D_i = MD5(D_{i-1} || passphrase || salt)`;
    /// the key is `D_0 || D_1` and the IV is `D_2`.
    pub fn derive(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> Self {
        let mut key = [0u8; KEY_LEN];
        let mut iv = [0u8; IV_LEN];
        let mut previous: Option<md5::Digest> = None;

        for round in 0..3 {
            let mut context = md5::Context::new();
            if let Some(previous) = &previous {
                context.consume(previous.0);
            }
            context.consume(passphrase);
            context.consume(salt);
            let digest = context.compute();

            match round {
                0 => key[..16].copy_from_slice(&digest.0),
                1 => key[16..].copy_from_slice(&digest.0),
                _ => iv.copy_from_slice(&digest.0),
            }

            previous = Some(digest);
        }

        Self { key, iv }
    }

    pub(crate) fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub(crate) fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.key.fill(0);
        self.iv.fill(0);
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}
