use std::sync::LazyLock;

use regex::Regex;

use crate::core::QueryError;

/// Character sequences never allowed outside quoted literals
const DISALLOWED_SEQUENCES: [&str; 6] = ["--", "#", "/*", ";", "@", "<?"];

static STATEMENT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|DROP|ALTER|CREATE|UNION|INTO|FROM|EXEC|SLEEP|BENCHMARK)\b",
    )
    .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// Replace the body of every quoted literal with nothing, keeping the quotes.
///
/// Handles both quote styles, backslash escapes and doubled quotes.
/// An unterminated literal swallows the rest of the input.
#[must_use]
pub fn remove_quoted_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\'' && c != '"' {
            out.push(c);
            continue;
        }
        out.push(c);
        let quote = c;
        while let Some(inner) = chars.next() {
            if inner == '\\' {
                chars.next();
            } else if inner == quote {
                if chars.peek() == Some(&quote) {
                    chars.next();
                } else {
                    out.push(quote);
                    break;
                }
            }
        }
    }
    out
}

/// Reject clause text carrying SQL outside of quoted literals
pub fn check_clause(text: &str) -> Result<(), QueryError> {
    let bare = remove_quoted_strings(text);

    for sequence in DISALLOWED_SEQUENCES {
        if bare.contains(sequence) {
            return Err(QueryError::DisallowedToken(sequence.to_string()));
        }
    }
    if let Some(m) = STATEMENT_KEYWORD.find(&bare) {
        return Err(QueryError::DisallowedToken(m.as_str().to_uppercase()));
    }
    Ok(())
}
