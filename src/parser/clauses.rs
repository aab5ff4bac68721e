/// Clause-level parsers: tables, fields, join on, group by, order by, limit

use super::common::{identifier, keyword, last_top_level_equals, smart_split, ws};
use super::conditions::condition;
use super::expressions::{expr, qualified_field_ref};
use super::statement::{Condition, Expr, JoinCondition, OrderItem, SelectField, SortOrder, TableRef};
use nom::{
    branch::alt,
    character::complete::char,
    combinator::{map, opt, value},
    sequence::{pair, preceded, tuple},
    IResult,
};

/// Run a parser over the whole input, rejecting trailing text
fn complete<'a, O>(
    mut parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
    input: &'a str,
    clause: &str,
) -> Result<O, String> {
    match parser(input) {
        Ok((remaining, out)) => {
            if remaining.trim().is_empty() {
                Ok(out)
            } else {
                Err(format!("unexpected text in {clause}: '{}'", remaining.trim()))
            }
        }
        Err(_) => Err(format!("could not parse {clause}: '{}'", input.trim())),
    }
}

fn table_ref(input: &str) -> IResult<&str, TableRef> {
    map(
        pair(ws(identifier), opt(preceded(ws(char('=')), ws(identifier)))),
        |(name, alias)| TableRef { name, alias },
    )(input)
}

/// `Books=B, Authors`
pub fn parse_tables(input: &str) -> Result<Vec<TableRef>, String> {
    let pieces = smart_split(',', input);
    if pieces.is_empty() {
        return Err("no tables given".to_string());
    }
    pieces
        .iter()
        .map(|piece| complete(table_ref, piece, "tables"))
        .collect()
}

/// `expression[=alias], ...`
pub fn parse_fields(input: &str) -> Result<Vec<SelectField>, String> {
    smart_split(',', input)
        .into_iter()
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            let (text, alias) = match last_top_level_equals(&piece) {
                Some(pos) => (piece[..pos].trim().to_string(), Some(piece[pos + 1..].trim().to_string())),
                None => (piece.clone(), None),
            };
            if alias.as_deref() == Some("") {
                return Err(format!("empty alias in fields: '{piece}'"));
            }
            let parsed = complete(expr, &text, "fields")?;
            Ok(SelectField {
                expr: parsed,
                alias,
                text,
            })
        })
        .collect()
}

fn join_condition(input: &str) -> IResult<&str, JoinCondition> {
    map(
        tuple((
            ws(qualified_field_ref),
            alt((value(false, ws(char('='))), value(true, ws(keyword("HOLDS"))))),
            ws(qualified_field_ref),
        )),
        |(left, holds, right)| JoinCondition { left, right, holds },
    )(input)
}

/// `B._pageName=A.Book, B.Authors HOLDS C._pageName`
pub fn parse_join_on(input: &str) -> Result<Vec<JoinCondition>, String> {
    smart_split(',', input)
        .iter()
        .filter(|piece| !piece.is_empty())
        .map(|piece| complete(join_condition, piece, "join on"))
        .collect()
}

pub fn parse_condition(input: &str, clause: &str) -> Result<Condition, String> {
    complete(condition, input, clause)
}

pub fn parse_group_by(input: &str) -> Result<Vec<Expr>, String> {
    smart_split(',', input)
        .iter()
        .filter(|piece| !piece.is_empty())
        .map(|piece| complete(expr, piece, "group by"))
        .collect()
}

fn order_item(input: &str) -> IResult<&str, OrderItem> {
    map(
        pair(
            ws(expr),
            opt(ws(alt((
                value(SortOrder::Asc, keyword("ASC")),
                value(SortOrder::Desc, keyword("DESC")),
            )))),
        ),
        |(expr, order)| OrderItem {
            expr,
            order: order.unwrap_or(SortOrder::Asc),
        },
    )(input)
}

pub fn parse_order_by(input: &str) -> Result<Vec<OrderItem>, String> {
    smart_split(',', input)
        .iter()
        .filter(|piece| !piece.is_empty())
        .map(|piece| complete(order_item, piece, "order by"))
        .collect()
}

/// Non-negative integer for limit and offset
pub fn parse_count(input: &str, clause: &str) -> Result<usize, String> {
    input
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid {clause}: '{}'", input.trim()))
}
