//! Answer key files.
//!
//! `.json` keys are either an array of letters (`["A", "C", "B"]`), an object
//! with an `answers` array, or a single string of letters. Any other file is
//! read as plain text: letters separated by whitespace, commas, or newlines,
//! with `#` starting a comment line.

use std::path::Path;

use anyhow::{Context, Result};
use bubble_grade_core::domain::{AnswerKey, Choice};
use serde::Deserialize;
use tracing::debug;

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyFile {
    List(Vec<String>),
    Object { answers: Vec<String> },
    Letters(String),
}

impl KeyFile {
    fn into_key(self) -> Result<AnswerKey> {
        match self {
            Self::List(entries) | Self::Object { answers: entries } => {
                let choices = entries
                    .into_iter()
                    .enumerate()
                    .map(|(i, entry)| {
                        Choice::try_from(entry).with_context(|| format!("question {}", i + 1))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(AnswerKey::new(choices)?)
            }
            Self::Letters(letters) => Ok(letters.parse()?),
        }
    }
}

/// Parses key text in the plain letter format.
///
/// # Errors
///
/// Returns an error for characters that are not option letters or for a
/// key without any letters.
pub fn parse_plain_key(text: &str) -> Result<AnswerKey> {
    let letters: String = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join(" ");
    Ok(letters.parse()?)
}

/// Loads an answer key from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold a valid key.
pub fn load_answer_key(path: &Path) -> Result<AnswerKey> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answer key: {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let key = if is_json {
        let file: KeyFile = serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON answer key: {}", path.display()))?;
        file.into_key()
    } else {
        parse_plain_key(&text)
    }
    .with_context(|| format!("Invalid answer key: {}", path.display()))?;

    debug!("Loaded {}-question key from {}", key.len(), path.display());
    Ok(key)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn letters(key: &AnswerKey) -> String {
        key.choices().iter().map(|c| c.letter()).collect()
    }

    #[test]
    fn test_plain_key_skips_comments() {
        let key = parse_plain_key("# midterm\nA B C\nd,e\n").unwrap();
        assert_eq!(letters(&key), "ABCDE");
    }

    #[test]
    fn test_plain_key_rejects_digits() {
        let err = parse_plain_key("AB3").unwrap_err();
        assert!(err.to_string().contains("'3'"));
    }

    #[test]
    fn test_json_forms() {
        for text in [r#"["A","b","C"]"#, r#"{"answers":["A","B","C"]}"#, r#""abc""#] {
            let file: KeyFile = serde_json::from_str(text).unwrap();
            assert_eq!(letters(&file.into_key().unwrap()), "ABC", "{text}");
        }
    }

    #[test]
    fn test_json_entry_must_be_single_letter() {
        let file: KeyFile = serde_json::from_str(r#"["A","BC"]"#).unwrap();
        let err = file.into_key().unwrap_err();
        assert!(format!("{err:#}").contains("question 2"));
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(parse_plain_key("# nothing\n\n").is_err());
        let file: KeyFile = serde_json::from_str("[]").unwrap();
        assert!(file.into_key().is_err());
    }
}
