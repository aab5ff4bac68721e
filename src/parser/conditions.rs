/// WHERE / HAVING grammar
///
/// OR binds loosest, then AND, then NOT. A predicate is an expression
/// followed by one of: comparison, [NOT] LIKE, HOLDS [LIKE], NEAR, WITHIN,
/// IS [NOT] NULL, [NOT] IN (...).

use super::common::{comparison_operator, keyword, number_literal, ws};
use super::expressions::expr;
use super::statement::{CompareOp, Condition, DistanceUnit, Expr};
use nom::{
    branch::alt,
    character::complete::char,
    combinator::{map, map_res, opt, value},
    error::{Error, ErrorKind},
    multi::separated_list1,
    sequence::{delimited, preceded, tuple},
    IResult,
};

enum Suffix {
    Compare(CompareOp, Expr),
    Like(Expr, bool),
    HoldsLike(Expr),
    Holds(Expr),
    Near(f64, f64, f64, DistanceUnit),
    Within(Expr),
    IsNull(bool),
    In(Vec<Expr>, bool),
}

fn float(input: &str) -> IResult<&str, f64> {
    map_res(ws(number_literal), str::parse::<f64>)(input)
}

fn distance_unit(input: &str) -> IResult<&str, DistanceUnit> {
    alt((
        value(DistanceUnit::Kilometers, keyword("kilometers")),
        value(DistanceUnit::Kilometers, keyword("km")),
        value(DistanceUnit::Miles, keyword("miles")),
        value(DistanceUnit::Miles, keyword("mi")),
    ))(input)
}

// NEAR (lat, lon, distance [unit])
fn near_args(input: &str) -> IResult<&str, (f64, f64, f64, DistanceUnit)> {
    map(
        delimited(
            ws(char('(')),
            tuple((
                float,
                preceded(ws(char(',')), float),
                preceded(ws(char(',')), float),
                opt(ws(distance_unit)),
            )),
            ws(char(')')),
        ),
        |(lat, lon, distance, unit)| (lat, lon, distance, unit.unwrap_or(DistanceUnit::Kilometers)),
    )(input)
}

fn expr_list(input: &str) -> IResult<&str, Vec<Expr>> {
    delimited(ws(char('(')), separated_list1(ws(char(',')), ws(expr)), ws(char(')')))(input)
}

fn suffix(input: &str) -> IResult<&str, Suffix> {
    alt((
        map(tuple((ws(keyword("HOLDS")), ws(keyword("LIKE")), ws(expr))), |(_, _, e)| {
            Suffix::HoldsLike(e)
        }),
        map(preceded(ws(keyword("HOLDS")), ws(expr)), Suffix::Holds),
        map(preceded(ws(keyword("NEAR")), near_args), |(lat, lon, d, u)| {
            Suffix::Near(lat, lon, d, u)
        }),
        map(preceded(ws(keyword("WITHIN")), ws(expr)), Suffix::Within),
        map(
            tuple((ws(keyword("IS")), opt(ws(keyword("NOT"))), ws(keyword("NULL")))),
            |(_, not, _)| Suffix::IsNull(not.is_some()),
        ),
        map(
            tuple((opt(ws(keyword("NOT"))), ws(keyword("LIKE")), ws(expr))),
            |(not, _, e)| Suffix::Like(e, not.is_some()),
        ),
        map(
            tuple((opt(ws(keyword("NOT"))), ws(keyword("IN")), expr_list)),
            |(not, _, values)| Suffix::In(values, not.is_some()),
        ),
        map_res(tuple((ws(comparison_operator), ws(expr))), |(op, e)| {
            CompareOp::from_token(op).map(|op| Suffix::Compare(op, e)).ok_or(())
        }),
    ))(input)
}

fn predicate(input: &str) -> IResult<&str, Condition> {
    let start = input;
    let (input, left) = ws(expr)(input)?;
    let (input, suffix) = suffix(input)?;

    // HOLDS, NEAR and WITHIN apply to a field, not an arbitrary expression
    let field = left.as_field().cloned();
    let needs_field = || field.clone().ok_or_else(|| nom::Err::Failure(Error::new(start, ErrorKind::Verify)));

    let condition = match suffix {
        Suffix::Compare(op, right) => Condition::Compare { left, op, right },
        Suffix::Like(pattern, negated) => Condition::Like {
            expr: left,
            pattern,
            negated,
        },
        Suffix::HoldsLike(pattern) => Condition::HoldsLike {
            field: needs_field()?,
            pattern,
        },
        Suffix::Holds(value) => Condition::Holds {
            field: needs_field()?,
            value,
        },
        Suffix::Near(lat, lon, distance, unit) => Condition::Near {
            field: needs_field()?,
            lat,
            lon,
            distance,
            unit,
        },
        Suffix::Within(value) => Condition::Within {
            field: needs_field()?,
            value,
        },
        Suffix::IsNull(negated) => Condition::IsNull { expr: left, negated },
        Suffix::In(values, negated) => Condition::In {
            expr: left,
            values,
            negated,
        },
    };
    Ok((input, condition))
}

fn condition_term(input: &str) -> IResult<&str, Condition> {
    alt((
        map(preceded(ws(keyword("NOT")), condition_term), |c| Condition::Not(Box::new(c))),
        delimited(ws(char('(')), condition, ws(char(')'))),
        predicate,
    ))(input)
}

// AND binds tighter than OR
fn condition_and(input: &str) -> IResult<&str, Condition> {
    let (input, first) = condition_term(input)?;
    let (input, rest) = opt(preceded(ws(keyword("AND")), condition_and))(input)?;

    match rest {
        Some(right) => Ok((input, Condition::And(Box::new(first), Box::new(right)))),
        None => Ok((input, first)),
    }
}

pub fn condition(input: &str) -> IResult<&str, Condition> {
    let (input, first) = condition_and(input)?;
    let (input, rest) = opt(preceded(ws(keyword("OR")), condition))(input)?;

    match rest {
        Some(right) => Ok((input, Condition::Or(Box::new(first), Box::new(right)))),
        None => Ok((input, first)),
    }
}
