use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{map, not, opt, peek, recognize},
    error::{Error, ErrorKind},
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};

pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((satisfy(char::is_alphabetic), char('_'))),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Words that end an operand in the condition grammar
const CONDITION_KEYWORDS: &[&str] = &[
    "AND", "OR", "NOT", "HOLDS", "LIKE", "NEAR", "WITHIN", "IS", "IN", "NULL",
];

// Identifier that is not a keyword of the condition grammar
pub fn non_keyword_identifier(input: &str) -> IResult<&str, String> {
    use nom::combinator::verify;

    verify(identifier, |s: &String| {
        let upper = s.to_uppercase();
        !CONDITION_KEYWORDS.contains(&upper.as_str())
    })(input)
}

/// Case-insensitive keyword that is not the prefix of a longer word
pub fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(
        tag_no_case(kw),
        not(peek(satisfy(|c: char| c.is_alphanumeric() || c == '_'))),
    )
}

/// Quoted literal ('...' or "..."). A doubled quote or a backslash escapes
/// the next character.
pub fn string_literal(input: &str) -> IResult<&str, String> {
    let quote = match input.chars().next() {
        Some(c @ ('\'' | '"')) => c,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    };

    let body = &input[1..];
    let mut out = String::new();
    let mut iter = body.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if c == quote {
            if iter.peek().is_some_and(|(_, next)| *next == quote) {
                out.push(quote);
                iter.next();
                continue;
            }
            return Ok((&body[i + c.len_utf8()..], out));
        }
        if c == '\\' {
            if let Some((_, next)) = iter.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

/// -12, 3.5, .5
pub fn number_literal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(char('-')),
        alt((
            recognize(tuple((digit1, opt(pair(char('.'), digit1))))),
            recognize(pair(char('.'), digit1)),
        )),
    )))(input)
}

pub fn comparison_operator(input: &str) -> IResult<&str, &str> {
    alt((
        tag(">="),
        tag("<="),
        tag("<>"),
        tag("!="),
        tag("="),
        tag(">"),
        tag("<"),
    ))(input)
}

/// Split on `delimiter` outside of parentheses, brackets, braces and quotes.
///
/// Pieces are trimmed; a blank input yields no pieces.
#[must_use]
pub fn smart_split(delimiter: char, input: &str) -> Vec<String> {
    split_top_level(delimiter, input, true)
}

/// Split on `delimiter` outside of parentheses only.
/// Used for declaration text, where quotes and brackets are plain characters.
#[must_use]
pub fn paren_split(delimiter: char, input: &str) -> Vec<String> {
    split_top_level(delimiter, input, false)
}

fn split_top_level(delimiter: char, input: &str, query_syntax: bool) -> Vec<String> {
    if input.trim().is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in input.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' if query_syntax => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            '[' | '{' if query_syntax => {
                depth += 1;
                current.push(c);
            }
            ']' | '}' if query_syntax => {
                depth -= 1;
                current.push(c);
            }
            c if c == delimiter && depth <= 0 => {
                pieces.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    pieces.push(current.trim().to_string());
    pieces
}

/// Position of the last `=` outside of parentheses and quotes
#[must_use]
pub fn last_top_level_equals(input: &str) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut found = None;

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth -= 1,
            '=' if depth == 0 => found = Some(i),
            _ => {}
        }
    }
    found
}

/// Parentheses never close more than they open and end balanced
#[must_use]
pub fn parentheses_balanced(input: &str) -> bool {
    let mut depth: i32 = 0;
    for c in input.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_split_respects_parentheses() {
        assert_eq!(
            smart_split(',', "Smith (John, Jr.), Doe, Roe"),
            vec!["Smith (John, Jr.)", "Doe", "Roe"]
        );
        assert_eq!(smart_split(',', "  "), Vec::<String>::new());
        assert_eq!(smart_split(';', "a;;b"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_smart_split_respects_quotes() {
        assert_eq!(
            smart_split(',', "CONCAT(a, ','), 'x, y', b"),
            vec!["CONCAT(a, ',')", "'x, y'", "b"]
        );
        assert_eq!(smart_split(',', r"'it\'s, here', z"), vec![r"'it\'s, here'", "z"]);
    }

    #[test]
    fn test_paren_split_ignores_quotes() {
        assert_eq!(paren_split(',', "Children's,Adult"), vec!["Children's", "Adult"]);
        assert_eq!(paren_split(';', "regex=[^']+; mandatory"), vec!["regex=[^']+", "mandatory"]);
        assert_eq!(paren_split(',', "Smith (John, Jr.), Doe"), vec!["Smith (John, Jr.)", "Doe"]);
        assert_eq!(paren_split('|', "  "), Vec::<String>::new());
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("'abc' rest"), Ok((" rest", "abc".to_string())));
        assert_eq!(string_literal("'it''s'"), Ok(("", "it's".to_string())));
        assert_eq!(string_literal(r#""say \"hi\"""#), Ok(("", "say \"hi\"".to_string())));
        assert_eq!(string_literal("''"), Ok(("", String::new())));
        assert!(string_literal("'open").is_err());
    }

    #[test]
    fn test_keyword_boundaries() {
        assert!(keyword("AND")("and x").is_ok());
        assert!(keyword("AND")("anderson").is_err());
        assert!(keyword("OR")("order").is_err());
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(identifier("_pageName rest"), Ok((" rest", "_pageName".to_string())));
        assert!(non_keyword_identifier("HOLDS").is_err());
        assert!(non_keyword_identifier("Holdings").is_ok());
    }

    #[test]
    fn test_last_top_level_equals() {
        assert_eq!(last_top_level_equals("Authors=Author"), Some(7));
        assert_eq!(last_top_level_equals("IF(a='=', 1, 2)"), None);
        assert_eq!(last_top_level_equals("COUNT(*)"), None);
    }

    #[test]
    fn test_parentheses_balanced() {
        assert!(parentheses_balanced("String (size=5)"));
        assert!(!parentheses_balanced("String (size=5"));
        assert!(!parentheses_balanced(")("));
    }
}
