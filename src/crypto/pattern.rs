use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ExtractError, Stage};

/// Describes which part of the encrypted string belongs to the secret, relative
/// to the characters already taken out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetLengthPair {
    pub offset: usize,
    pub length: usize,
}

impl OffsetLengthPair {
    pub const fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }
}

/// Locates the offset scheme inside an obfuscated player script.
///
/// The shape of the script is tied to one obfuscator, so a new player build
/// only requires a new implementation of this trait.
pub trait ScriptPattern {
    /// Returns the resolved `(offset, length)` literals in script order, still as
    /// hexadecimal text without any `0x` prefix.
    fn literal_pairs(&self, script: &str) -> Result<Vec<(String, String)>, ExtractError>;

    fn offset_pairs(&self, script: &str) -> Result<Vec<OffsetLengthPair>, ExtractError> {
        let literals = self.literal_pairs(script)?;
        let pairs = parse_offset_pairs(&literals);
        log::debug!(
            "Player script: matched {} offset pairs, {} usable",
            literals.len(),
            pairs.len()
        );

        Ok(pairs)
    }
}

/// Matches `case 0x..: a = X, b = Y;` branches of the player's switch statement
/// and looks up the literal assigned to `X` and `Y`.
#[derive(Debug, Clone)]
pub struct CaseBranchPattern {
    excluded_variable: Cow<'static, str>,
}

impl CaseBranchPattern {
    pub const DEFAULT_EXCLUDED_VARIABLE: &'static str = "partKey";

    pub fn new(excluded_variable: impl Into<Cow<'static, str>>) -> Self {
        Self {
            excluded_variable: excluded_variable.into(),
        }
    }
}

impl Default for CaseBranchPattern {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EXCLUDED_VARIABLE)
    }
}

impl ScriptPattern for CaseBranchPattern {
    fn literal_pairs(&self, script: &str) -> Result<Vec<(String, String)>, ExtractError> {
        static CASE_BRANCH_REGEX: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"case\s*0x[0-9a-f]+:(\s*\w+\s*=\s*(\w+)\s*,\s*\w+\s*=\s*(\w+));").unwrap()
        });

        let excluded_assignment = format!("={}", self.excluded_variable);
        let mut pairs = Vec::new();

        for captures in CASE_BRANCH_REGEX.captures_iter(script) {
            let (Some(body), Some(first), Some(second)) = (captures.get(1), captures.get(2), captures.get(3)) else {
                continue;
            };

            // The branch body runs up to the first `;`, so this mirrors a
            // "no `=partKey` before the next `;`" lookahead.
            if body.as_str().contains(&excluded_assignment) {
                continue;
            }

            pairs.push((
                match_variable_value(first.as_str(), script)?,
                match_variable_value(second.as_str(), script)?,
            ));
        }

        if pairs.is_empty() {
            return Err(ExtractError::script_parse(
                Stage::PlayerScript,
                "no offset assignments found in switch branches",
            ));
        }

        Ok(pairs)
    }
}

/// Finds the literal of `,<variable>=<literal>` and strips a leading `0x`.
pub fn match_variable_value(variable: &str, script: &str) -> Result<String, ExtractError> {
    static ASSIGNMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r",([\w$]+)=(?:0x)?([0-9a-fA-F]+)").unwrap());

    ASSIGNMENT_REGEX
        .captures_iter(script)
        .find(|captures| &captures[1] == variable)
        .map(|captures| captures[2].to_string())
        .ok_or_else(|| ExtractError::KeyMatch {
            variable: variable.to_string(),
        })
}

/// Interprets both literals as base 16. Pairs that do not fit are skipped
/// instead of failing the whole scheme.
pub fn parse_offset_pairs(literals: &[(String, String)]) -> Vec<OffsetLengthPair> {
    literals
        .iter()
        .filter_map(|(offset, length)| {
            let parsed = usize::from_str_radix(offset, 16)
                .ok()
                .zip(usize::from_str_radix(length, 16).ok());

            if parsed.is_none() {
                log::trace!("Player script: dropping unparsable offset pair");
            }

            parsed.map(|(offset, length)| OffsetLengthPair::new(offset, length))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{match_variable_value, parse_offset_pairs, CaseBranchPattern, OffsetLengthPair, ScriptPattern};
    use crate::error::ExtractError;

    /// A trimmed down player script with the same switch layout as the real one.
    pub(crate) const PLAYER_SCRIPT: &str = include_str!("../../tests/fixtures/player_script.js");

    pub(crate) const PLAYER_SCRIPT_PAIRS: [OffsetLengthPair; 7] = [
        OffsetLengthPair::new(54, 6),
        OffsetLengthPair::new(85, 6),
        OffsetLengthPair::new(100, 6),
        OffsetLengthPair::new(101, 6),
        OffsetLengthPair::new(106, 7),
        OffsetLengthPair::new(134, 7),
        OffsetLengthPair::new(156, 6),
    ];

    #[test]
    fn test_offset_pairs() {
        let pairs = CaseBranchPattern::default().offset_pairs(PLAYER_SCRIPT).unwrap();
        assert_eq!(pairs, PLAYER_SCRIPT_PAIRS.to_vec());
    }

    #[test]
    fn test_excluded_branch() {
        let literals = CaseBranchPattern::default().literal_pairs(PLAYER_SCRIPT).unwrap();
        assert_eq!(literals.len(), 7);
        assert!(!literals.iter().any(|(_, length)| length == "1"));

        // Without the exclusion the partKey branch fails to resolve
        let err = CaseBranchPattern::new("noSuchVariable")
            .literal_pairs(PLAYER_SCRIPT)
            .unwrap_err();
        assert!(matches!(err, ExtractError::KeyMatch { variable } if variable == "partKey"));
    }

    #[test]
    fn test_match_variable_value() {
        let script = "var a=1,abc=0x1F,b=2f,c=zz;";
        assert_eq!(match_variable_value("abc", script).unwrap(), "1F");
        assert_eq!(match_variable_value("b", script).unwrap(), "2f");
        assert!(matches!(
            match_variable_value("c", script),
            Err(ExtractError::KeyMatch { .. })
        ));
        assert!(matches!(
            match_variable_value("missing", script),
            Err(ExtractError::KeyMatch { .. })
        ));

        let script = "var q=0,k$=0xa,xk$=0xb,k$=0xc;";
        assert_eq!(match_variable_value("k$", script).unwrap(), "a");
        assert_eq!(match_variable_value("xk$", script).unwrap(), "b");
        assert!(matches!(
            match_variable_value("k", script),
            Err(ExtractError::KeyMatch { .. })
        ));
    }

    #[test]
    fn test_unresolved_variable() {
        let script = "case 0x0:a=foo,b=bar;break;var x=1,foo=0x2;";
        let err = CaseBranchPattern::default().offset_pairs(script).unwrap_err();
        assert!(matches!(err, ExtractError::KeyMatch { variable } if variable == "bar"));
    }

    #[test]
    fn test_no_case_branches() {
        let err = CaseBranchPattern::default()
            .offset_pairs("(function(){return 1})();")
            .unwrap_err();
        assert!(matches!(err, ExtractError::ScriptParse { .. }));
    }

    #[test]
    fn test_unparsable_pairs_are_dropped() {
        let literals = vec![
            ("a".to_string(), "3".to_string()),
            ("fffffffffffffffffffffffff".to_string(), "1".to_string()),
            ("10".to_string(), "2".to_string()),
        ];
        assert_eq!(
            parse_offset_pairs(&literals),
            vec![OffsetLengthPair::new(10, 3), OffsetLengthPair::new(16, 2)]
        );
    }
}
