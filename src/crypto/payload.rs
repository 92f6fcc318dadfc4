use aes::cipher::block_padding::Pkcs7;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut as _, KeyIvInit as _};
use base64::Engine;
use serde::Deserialize;

use super::key::{KeyMaterial, SALT_LEN};
use crate::error::{ExtractError, Stage};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const FORMAT_TAG: &[u8; 8] = b"Salted__";
const BLOCK_LEN: usize = 16;

/// One `{file, type}` entry of a source list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawSource {
    pub file: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

fn cipher_error(reason: &'static str) -> ExtractError {
    ExtractError::Cipher {
        stage: Stage::Payload,
        reason,
    }
}

/// AES-256-CBC with PKCS#7 padding. Anything that does not come out as UTF-8
/// text is treated as a wrong key or corrupted input.
pub fn decrypt_payload(material: &KeyMaterial, ciphertext: &[u8]) -> Result<String, ExtractError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(cipher_error("ciphertext is not a whole number of blocks"));
    }

    let mut buffer = ciphertext.to_vec();
    let decryptor = Aes256CbcDec::new(
        GenericArray::from_slice(material.key()),
        GenericArray::from_slice(material.iv()),
    );
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| cipher_error("invalid padding, wrong key or corrupted ciphertext"))?;

    String::from_utf8(plaintext.to_vec()).map_err(|_| cipher_error("plaintext is not valid utf-8"))
}

/// Decrypts a base64 `Salted__` payload whose key material is derived from `passphrase`.
pub fn decrypt_with_passphrase(encoded: &str, passphrase: &str) -> Result<String, ExtractError> {
    let data = base64::prelude::BASE64_STANDARD
        .decode(encoded.trim())
        .map_err(|_| cipher_error("ciphertext is not valid base64"))?;

    if data.len() < FORMAT_TAG.len() + SALT_LEN {
        return Err(cipher_error("ciphertext is too short to carry a salt"));
    }

    let (header, ciphertext) = data.split_at(FORMAT_TAG.len() + SALT_LEN);
    let (tag, salt) = header.split_at(FORMAT_TAG.len());

    if tag != FORMAT_TAG {
        return Err(cipher_error("ciphertext does not start with the salted format tag"));
    }

    let salt: &[u8; SALT_LEN] = salt
        .try_into()
        .map_err(|_| cipher_error("ciphertext is too short to carry a salt"))?;
    let material = KeyMaterial::derive(passphrase.as_bytes(), salt);

    decrypt_payload(&material, ciphertext)
}

pub fn parse_sources(plaintext: &str) -> Result<Vec<RawSource>, ExtractError> {
    serde_json::from_str(plaintext).map_err(|source| ExtractError::Decryption {
        stage: Stage::Payload,
        source,
    })
}
