/// Field declaration grammar
///
/// `["list" ["(" delimiter ")"] "of"] TypeName ["(" modifiers ")"]`
///
/// Modifiers are `key=value` parameters or bare flags separated by `;` or `,`.
/// After `allowed values=` or `regex=`, comma-separated pieces without `=`
/// continue the value; use `;` to start a new modifier after them.

use super::common::{keyword, paren_split, parentheses_balanced, ws};
use crate::core::DeclarationError;
use nom::{
    bytes::complete::take_until,
    character::complete::char,
    combinator::opt,
    sequence::{delimited, preceded, terminated},
    IResult,
};

/// Modifier inside the trailing parentheses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    Param(String, String),
    Flag(String),
}

/// Syntactic result, before type names and parameters are checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFieldDeclaration {
    pub is_list: bool,
    pub delimiter: Option<String>,
    pub type_name: String,
    pub modifiers: Vec<Modifier>,
}

/// Parameters whose values may themselves contain commas
const CONTINUED_PARAMS: &[&str] = &["allowed values", "regex"];

fn list_prefix(input: &str) -> IResult<&str, Option<&str>> {
    preceded(
        keyword("list"),
        terminated(
            opt(ws(delimited(char('('), take_until(")"), char(')')))),
            ws(keyword("of")),
        ),
    )(input)
}

pub fn parse_field_declaration(input: &str) -> Result<RawFieldDeclaration, DeclarationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DeclarationError::Empty);
    }
    if !parentheses_balanced(s) {
        return Err(DeclarationError::UnbalancedParentheses(s.to_string()));
    }

    let mut is_list = false;
    let mut delimiter = None;
    let mut rest = s;

    if keyword("list")(s).is_ok() {
        let (remaining, raw_delimiter) =
            list_prefix(s).map_err(|_| DeclarationError::BadDelimiter(s.to_string()))?;
        is_list = true;
        if let Some(raw) = raw_delimiter {
            delimiter = Some(normalize_delimiter(raw).ok_or_else(|| DeclarationError::BadDelimiter(s.to_string()))?);
        }
        rest = remaining.trim();
    }

    let (type_name, modifiers) = match rest.find('(') {
        Some(open) => {
            let block = rest[open + 1..]
                .strip_suffix(')')
                .ok_or_else(|| DeclarationError::Malformed(format!("unexpected text after ')' in '{s}'")))?;
            (rest[..open].trim(), parse_modifiers(block))
        }
        None => (rest, Vec::new()),
    };

    if type_name.is_empty() {
        return Err(DeclarationError::UnknownType(String::new()));
    }

    Ok(RawFieldDeclaration {
        is_list,
        delimiter,
        type_name: type_name.to_string(),
        modifiers,
    })
}

/// `\n` means a newline; a whitespace-only delimiter is kept verbatim
fn normalize_delimiter(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    if raw.trim().is_empty() {
        return Some(raw.to_string());
    }
    let trimmed = raw.trim();
    if trimmed == "\\n" {
        return Some("\n".to_string());
    }
    Some(trimmed.to_string())
}

/// Inverse of `normalize_delimiter`, for re-serialization
#[must_use]
pub fn escape_delimiter(delimiter: &str) -> String {
    if delimiter == "\n" {
        "\\n".to_string()
    } else {
        delimiter.to_string()
    }
}

fn parse_modifiers(block: &str) -> Vec<Modifier> {
    let mut modifiers = Vec::new();

    for group in paren_split(';', block) {
        let mut continued: Option<(String, String)> = None;

        for piece in paren_split(',', &group) {
            if piece.is_empty() {
                continue;
            }
            match piece.split_once('=') {
                Some((key, value)) => {
                    if let Some((k, v)) = continued.take() {
                        modifiers.push(Modifier::Param(k, v));
                    }
                    let key = key.trim().to_lowercase();
                    let value = value.trim().to_string();
                    if CONTINUED_PARAMS.contains(&key.as_str()) {
                        continued = Some((key, value));
                    } else {
                        modifiers.push(Modifier::Param(key, value));
                    }
                }
                None => match continued.as_mut() {
                    Some((_, value)) => {
                        value.push(',');
                        value.push_str(&piece);
                    }
                    None => modifiers.push(Modifier::Flag(piece.to_lowercase())),
                },
            }
        }
        if let Some((k, v)) = continued.take() {
            modifiers.push(Modifier::Param(k, v));
        }
    }
    modifiers
}
