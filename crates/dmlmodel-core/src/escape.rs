//! MySQL string-literal escaping.
//!
//! Values are escaped, never quoted, here: callers add the surrounding `'...'`
//! when the column kind requires it.

/// Escape `value` for embedding inside a single-quoted MySQL string literal.
///
/// Exactly seven code points are rewritten to their two-character backslash
/// form:
///
/// | Input | Output |
/// |-------|--------|
/// | `NUL` | `\0`   |
/// | `\`   | `\\`   |
/// | `LF`  | `\n`   |
/// | `CR`  | `\r`   |
/// | `SUB` (0x1A) | `\Z` |
/// | `"`   | `\"`   |
/// | `'`   | `\'`   |
///
/// Every other character, including non-ASCII text, is copied unchanged.
///
/// ```
/// use dmlmodel_core::escape::escape_string;
///
/// assert_eq!(escape_string("it's"), "it\\'s");
/// assert_eq!(escape_string("héllo"), "héllo");
/// ```
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 8);
    for ch in value.chars() {
        match ch {
            '\0' => out.push_str("\\0"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_metacharacter_maps_to_two_chars() {
        assert_eq!(escape_string("\0"), "\\0");
        assert_eq!(escape_string("\\"), "\\\\");
        assert_eq!(escape_string("\n"), "\\n");
        assert_eq!(escape_string("\r"), "\\r");
        assert_eq!(escape_string("\u{1a}"), "\\Z");
        assert_eq!(escape_string("\""), "\\\"");
        assert_eq!(escape_string("'"), "\\'");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(escape_string("player_01 lvl 7"), "player_01 lvl 7");
        assert_eq!(escape_string(""), "");
        assert_eq!(escape_string("\t%_;"), "\t%_;");
    }

    #[test]
    fn test_multibyte_text_preserved() {
        assert_eq!(escape_string("勇者の剣"), "勇者の剣");
        assert_eq!(escape_string("naïve 'café'"), "naïve \\'café\\'");
        assert_eq!(escape_string("🗡\n"), "🗡\\n");
    }

    #[test]
    fn test_mixed_sql_injection_attempt() {
        assert_eq!(
            escape_string("x'; DROP TABLE player; --"),
            "x\\'; DROP TABLE player; --"
        );
    }
}
