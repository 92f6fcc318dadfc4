pub mod key;
pub mod pattern;
pub mod payload;
pub mod secret;

pub use self::key::KeyMaterial;
pub use self::pattern::{CaseBranchPattern, OffsetLengthPair, ScriptPattern};
pub use self::payload::RawSource;

/// Runs the whole recovery for one encrypted source list: locate the offset
/// scheme in `script`, take the passphrase out of `encrypted` and decrypt the rest.
///
/// Nothing of the intermediate state survives the call.
pub fn recover_sources(
    encrypted: &str,
    script: &str,
    pattern: &impl ScriptPattern,
) -> Result<Vec<RawSource>, crate::error::ExtractError> {
    let pairs = pattern.offset_pairs(script)?;
    let split = secret::split_secret(encrypted, &pairs)?;
    let plaintext = payload::decrypt_with_passphrase(&split.ciphertext, &split.secret)?;
    let sources = payload::parse_sources(&plaintext)?;
    log::debug!("Decrypted {} sources", sources.len());

    Ok(sources)
}
