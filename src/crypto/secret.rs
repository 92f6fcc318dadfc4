use super::pattern::OffsetLengthPair;
use crate::error::{ExtractError, Stage};

/// The encrypted string after the passphrase characters were taken out of it.
pub struct SplitSecret {
    pub secret: String,
    pub ciphertext: String,
}

impl std::fmt::Debug for SplitSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitSecret")
            .field("secret", &"<redacted>")
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

/// Pulls the passphrase out of `encrypted`.
///
/// Every pair selects the window `[cursor + offset, cursor + offset + length)`, after
/// which the cursor only advances by `length`. Selected characters are read from the
/// untouched input and are missing from the returned ciphertext.
pub fn split_secret(encrypted: &str, pairs: &[OffsetLengthPair]) -> Result<SplitSecret, ExtractError> {
    let chars = encrypted.chars().collect::<Vec<_>>();
    let mut taken = vec![false; chars.len()];
    let mut secret = String::new();
    // Window ends never fall behind the total length taken so far, so bounding
    // them also bounds the overall consumption.
    let mut cursor = 0usize;

    for pair in pairs {
        let window = cursor
            .checked_add(pair.offset)
            .and_then(|start| Some(start..start.checked_add(pair.length)?))
            .filter(|window| window.end <= chars.len())
            .ok_or_else(|| {
                ExtractError::script_parse(Stage::Secret, "offset pair points past the end of the encrypted sources")
            })?;

        for index in window {
            secret.push(chars[index]);
            taken[index] = true;
        }

        cursor += pair.length;
    }

    let ciphertext = chars
        .iter()
        .zip(taken)
        .filter_map(|(c, taken)| (!taken).then_some(*c))
        .collect();

    Ok(SplitSecret { secret, ciphertext })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::split_secret;
    use crate::crypto::pattern::tests::PLAYER_SCRIPT_PAIRS;
    use crate::crypto::pattern::OffsetLengthPair;
    use crate::error::ExtractError;

    pub(crate) const ENCRYPTED_SOURCES: &str = include_str!("../../tests/fixtures/encrypted_sources.txt");
    pub(crate) const SECRET: &str = "df4XgJ5TKDwYrM25gGuAz1kNMmgaQOk4yZZniYGlRS8k";
    pub(crate) const CIPHERTEXT: &str = "U2FsdGVkX19A5ALyV8svWKkUjszjAf9X0H8EtnLgE++xbOtdodmq0uottZ+S8yCPC/xggYMwx03zsQpp29M2Zhe5MM46qZlwLvzj9SdrkzwpQkF5ZeLKq564aV6ahlqv5Hx/yGu1IJdXCR5DZ9x3KT/qvvWWzJGLBnjHJj0f2NzptDHnYy/oDgKWRbCgjsap8eM8/Rk096AXDIoSMKrATsxZrvf4MiTOF6CzPRZQffLn1/KDVLN1PsTkr1BgifI8hmyA+UqSBgH7iFD8ds8OZMLyjqTYrOuTf8NRiY/CYRlPgX2ANC2vPDvXA6gMY1QlRuLJ8aCxFCggNSOrfG/chaLhOCFrd0+VxXqDfUWcxwQec5LtYHKP067N5F4siCLmjh3bs6TS1+x7ZFokFTQylZ0yHvTMD56Ldu0J1TSEOYV73hipy/U74PSrnMAQ8j6r4jdGE1Y53QHNwzwrQGTfUg==";

    /// Puts the secret back into the ciphertext at the windows described by `pairs`.
    fn interleave(secret: &str, ciphertext: &str, pairs: &[OffsetLengthPair]) -> String {
        let len = secret.chars().count() + ciphertext.chars().count();
        let mut slots: Vec<Option<char>> = vec![None; len];
        let mut secret = secret.chars();
        let mut cursor = 0;

        for pair in pairs {
            let start = cursor + pair.offset;
            for slot in &mut slots[start..start + pair.length] {
                *slot = secret.next();
            }
            cursor += pair.length;
        }

        let mut rest = ciphertext.chars();
        slots
            .into_iter()
            .map(|slot| slot.or_else(|| rest.next()).unwrap())
            .collect()
    }

    #[test]
    fn test_split_secret() {
        assert_eq!(ENCRYPTED_SOURCES.len(), SECRET.len() + CIPHERTEXT.len());

        let split = split_secret(ENCRYPTED_SOURCES, &PLAYER_SCRIPT_PAIRS).unwrap();
        assert_eq!(split.secret, SECRET);
        assert_eq!(split.ciphertext, CIPHERTEXT);
    }

    #[test]
    fn test_cursor_advances_by_length() {
        let pairs = [OffsetLengthPair::new(1, 2), OffsetLengthPair::new(1, 1)];
        let split = split_secret("abcdefgh", &pairs).unwrap();
        // second window starts at 2 + 1, not at the end of the first window
        assert_eq!(split.secret, "bcd");
        assert_eq!(split.ciphertext, "aefgh");
    }

    #[test]
    fn test_overlapping_windows_read_original() {
        let pairs = [OffsetLengthPair::new(2, 2), OffsetLengthPair::new(0, 2)];
        let split = split_secret("abcdef", &pairs).unwrap();
        assert_eq!(split.secret, "cdcd");
        assert_eq!(split.ciphertext, "abef");
    }

    #[test]
    fn test_interleave_restores_input() {
        let inputs = [
            ("0123456789abcdefghij", vec![(0, 3), (2, 4), (5, 1)]),
            ("0123456789", vec![(7, 3)]),
            ("0123456789", vec![]),
            ("xyz", vec![(0, 3)]),
        ];

        for (input, pairs) in inputs {
            let pairs = pairs
                .into_iter()
                .map(|(offset, length)| OffsetLengthPair::new(offset, length))
                .collect::<Vec<_>>();
            let split = split_secret(input, &pairs).unwrap();
            assert_eq!(interleave(&split.secret, &split.ciphertext, &pairs), input);
        }

        let split = split_secret(ENCRYPTED_SOURCES, &PLAYER_SCRIPT_PAIRS).unwrap();
        assert_eq!(
            interleave(&split.secret, &split.ciphertext, &PLAYER_SCRIPT_PAIRS),
            ENCRYPTED_SOURCES
        );
    }

    #[test]
    fn test_pairs_past_end() {
        let err = split_secret("abc", &[OffsetLengthPair::new(2, 2)]).unwrap_err();
        assert!(matches!(err, ExtractError::ScriptParse { .. }));

        let err = split_secret("abc", &[OffsetLengthPair::new(usize::MAX, 1)]).unwrap_err();
        assert!(matches!(err, ExtractError::ScriptParse { .. }));

        let pairs = [OffsetLengthPair::new(0, 2), OffsetLengthPair::new(0, 2)];
        let err = split_secret("abc", &pairs).unwrap_err();
        assert!(matches!(err, ExtractError::ScriptParse { .. }));
    }
}
