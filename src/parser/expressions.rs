/// Expression grammar shared by fields, where, having, group by and order by
///
/// expr   := term (('+' | '-') term)*
/// term   := factor (('*' | '/') factor)*
/// factor := literal | function '(' args ')' | [table '.'] field | '(' expr ')'

use super::common::{identifier, keyword, non_keyword_identifier, number_literal, string_literal, ws};
use super::statement::{ArithOp, Expr, FieldRef, Literal};
use nom::{
    branch::alt,
    character::complete::char,
    combinator::{map, map_res, opt},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(string_literal, Literal::Text),
        map_res(number_literal, |s: &str| -> Result<Literal, std::num::ParseFloatError> {
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Literal::Integer(i));
            }
            s.parse::<f64>().map(Literal::Real)
        }),
    ))(input)
}

// table.field or field
pub fn field_ref(input: &str) -> IResult<&str, FieldRef> {
    map(
        pair(non_keyword_identifier, opt(preceded(char('.'), identifier))),
        |(first, second)| match second {
            Some(field) => FieldRef {
                table: Some(first),
                field,
            },
            None => FieldRef {
                table: None,
                field: first,
            },
        },
    )(input)
}

// table.field only, as required by join on
pub fn qualified_field_ref(input: &str) -> IResult<&str, FieldRef> {
    map(
        tuple((non_keyword_identifier, char('.'), identifier)),
        |(table, _, field)| FieldRef {
            table: Some(table),
            field,
        },
    )(input)
}

fn function_call(input: &str) -> IResult<&str, Expr> {
    let (input, name) = identifier(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, distinct) = opt(ws(keyword("DISTINCT")))(input)?;
    let (input, args) = alt((
        map(ws(char('*')), |_| vec![Expr::Star]),
        separated_list0(ws(char(',')), ws(expr)),
    ))(input)?;
    let (input, _) = ws(char(')'))(input)?;

    Ok((
        input,
        Expr::Function {
            name,
            args,
            distinct: distinct.is_some(),
        },
    ))
}

fn factor(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        map(literal, Expr::Literal),
        function_call,
        map(field_ref, Expr::Field),
        map(delimited(char('('), ws(expr), char(')')), |e| Expr::Nested(Box::new(e))),
    )))(input)
}

fn fold(first: Expr, rest: Vec<(char, Expr)>) -> Expr {
    rest.into_iter().fold(first, |left, (op, right)| {
        let op = match op {
            '+' => ArithOp::Add,
            '-' => ArithOp::Sub,
            '*' => ArithOp::Mul,
            _ => ArithOp::Div,
        };
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    })
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = factor(input)?;
    let (input, rest) = many0(pair(ws(alt((char('*'), char('/')))), factor))(input)?;
    Ok((input, fold(first, rest)))
}

pub fn expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(ws(alt((char('+'), char('-')))), term))(input)?;
    Ok((input, fold(first, rest)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_refs() {
        let (_, e) = expr("B.Title").unwrap();
        assert_eq!(e, Expr::Field(FieldRef::new(Some("B"), "Title")));
        let (_, e) = expr("_pageName").unwrap();
        assert_eq!(e, Expr::Field(FieldRef::new(None, "_pageName")));
    }

    #[test]
    fn test_literals() {
        assert_eq!(expr("'Fantasy'").unwrap().1, Expr::Literal(Literal::Text("Fantasy".to_string())));
        assert_eq!(expr("42").unwrap().1, Expr::Literal(Literal::Integer(42)));
        assert_eq!(expr("-1.5").unwrap().1, Expr::Literal(Literal::Real(-1.5)));
    }

    #[test]
    fn test_function_calls() {
        let (rest, e) = expr("COUNT(*)").unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            e,
            Expr::Function {
                name: "COUNT".to_string(),
                args: vec![Expr::Star],
                distinct: false,
            }
        );

        let (_, e) = expr("count(DISTINCT Author)").unwrap();
        assert!(matches!(e, Expr::Function { distinct: true, .. }));

        let (_, e) = expr("NOW()").unwrap();
        assert!(matches!(e, Expr::Function { ref args, .. } if args.is_empty()));
    }

    #[test]
    fn test_arithmetic_precedence() {
        let (_, e) = expr("Pages + Extra * 2").unwrap();
        match e {
            Expr::Binary { op: ArithOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: ArithOp::Mul, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_qualified_field_ref_required() {
        assert!(qualified_field_ref("Books._pageName").is_ok());
        assert!(qualified_field_ref("Title").is_err());
    }
}
