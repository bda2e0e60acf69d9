//! Read-only guard for model-generated SQL.

use crate::error::{PelagosError, Result};

const FORBIDDEN_KEYWORDS: [&str; 9] = [
    "DROP", "DELETE", "UPDATE", "INSERT", "TRUNCATE", "ALTER", "CREATE", "ATTACH", "PRAGMA",
];

/// Validates a generated statement before it reaches the database: exactly
/// one statement, starting with SELECT or WITH, with no write or schema
/// keywords anywhere in the text.
pub fn ensure_read_only(sql: &str) -> Result<String> {
    let statement = sql.trim().trim_end_matches(';').trim_end();
    if statement.is_empty() {
        return Err(PelagosError::QueryRejected("empty statement".to_string()));
    }
    if statement.contains(';') {
        return Err(PelagosError::QueryRejected(
            "multiple statements are not allowed".to_string(),
        ));
    }
    let upper = statement.to_uppercase();
    let starts_read = ["SELECT", "WITH"].iter().any(|keyword| {
        upper
            .strip_prefix(keyword)
            .is_some_and(|rest| rest.chars().next().is_none_or(|c| !is_word_char(c)))
    });
    if !starts_read {
        return Err(PelagosError::QueryRejected(
            "only SELECT statements are allowed".to_string(),
        ));
    }
    for keyword in FORBIDDEN_KEYWORDS {
        if contains_word(&upper, keyword) {
            return Err(PelagosError::QueryRejected(format!(
                "forbidden keyword: {keyword}"
            )));
        }
    }
    Ok(statement.to_string())
}

// Identifiers like created_at must not trip the CREATE check, so keyword
// matches require non-word characters on both sides.
fn contains_word(text: &str, word: &str) -> bool {
    let bytes = text.as_bytes();
    let mut search = 0;
    while let Some(pos) = text.get(search..).and_then(|rest| rest.find(word)) {
        let abs = search + pos;
        let end = abs + word.len();
        let before_ok = abs == 0 || !is_word_byte(bytes[abs - 1]);
        let after_ok = end >= text.len() || !is_word_byte(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        search = abs + 1;
    }
    false
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
