/// SQL functions allowed in queries, with their SQLite renderings

use crate::core::{FieldDescription, FieldType, QueryError};

const AGGREGATES: [&str; 6] = ["COUNT", "SUM", "AVG", "MIN", "MAX", "GROUP_CONCAT"];

/// Allowed functions with their (min, max) argument counts
const ALLOWED: [(&str, usize, usize); 24] = [
    ("COUNT", 1, 1),
    ("SUM", 1, 1),
    ("AVG", 1, 1),
    ("MIN", 1, 1),
    ("MAX", 1, 1),
    ("GROUP_CONCAT", 1, 2),
    ("LOWER", 1, 1),
    ("UPPER", 1, 1),
    ("LENGTH", 1, 1),
    ("TRIM", 1, 1),
    ("SUBSTRING", 2, 3),
    ("REPLACE", 3, 3),
    ("CONCAT", 1, usize::MAX),
    ("ROUND", 1, 2),
    ("FLOOR", 1, 1),
    ("CEIL", 1, 1),
    ("ABS", 1, 1),
    ("DATE", 1, 1),
    ("YEAR", 1, 1),
    ("MONTH", 1, 1),
    ("DAY", 1, 1),
    ("DAYOFMONTH", 1, 1),
    ("NOW", 0, 0),
    ("IFNULL", 2, 2),
];

/// COALESCE takes any number of arguments and is checked separately
const VARIADIC: &str = "COALESCE";

#[must_use]
pub fn is_aggregate(name: &str) -> bool {
    AGGREGATES.iter().any(|a| a.eq_ignore_ascii_case(name))
}

#[must_use]
pub fn is_allowed(name: &str) -> bool {
    name.eq_ignore_ascii_case(VARIADIC) || ALLOWED.iter().any(|(n, ..)| n.eq_ignore_ascii_case(name))
}

/// Render a call with already compiled arguments.
///
/// `args` may repeat in the output; placeholders inside them must be
/// numbered (`?N`) so repetition binds the same value.
pub fn translate(name: &str, args: &[String], distinct: bool) -> Result<String, QueryError> {
    let upper = name.to_uppercase();

    if upper == VARIADIC {
        if args.is_empty() {
            return Err(arity_error(&upper, args.len()));
        }
        return Ok(format!("COALESCE({})", args.join(", ")));
    }

    let Some(&(_, min, max)) = ALLOWED.iter().find(|(n, ..)| *n == upper) else {
        return Err(QueryError::DisallowedFunction(name.to_string()));
    };
    if args.len() < min || args.len() > max {
        return Err(arity_error(&upper, args.len()));
    }
    if distinct && !is_aggregate(&upper) {
        return Err(QueryError::Parse(format!("DISTINCT cannot be used inside {upper}()")));
    }
    if args.iter().any(|a| a == "*") && upper != "COUNT" {
        return Err(QueryError::Parse(format!("'*' cannot be used inside {upper}()")));
    }

    let sql = match upper.as_str() {
        "COUNT" | "SUM" | "AVG" | "MIN" | "MAX" | "GROUP_CONCAT" => {
            let distinct = if distinct { "DISTINCT " } else { "" };
            format!("{upper}({distinct}{})", args.join(", "))
        }
        "SUBSTRING" => format!("substr({})", args.join(", ")),
        "CONCAT" => format!("({})", args.join(" || ")),
        "FLOOR" => {
            let x = &args[0];
            format!("(CAST({x} AS INTEGER) - (({x}) < CAST({x} AS INTEGER)))")
        }
        "CEIL" => {
            let x = &args[0];
            format!("(CAST({x} AS INTEGER) + (({x}) > CAST({x} AS INTEGER)))")
        }
        "DATE" => format!("date({})", args[0]),
        "YEAR" => format!("CAST(strftime('%Y', {}) AS INTEGER)", args[0]),
        "MONTH" => format!("CAST(strftime('%m', {}) AS INTEGER)", args[0]),
        "DAY" | "DAYOFMONTH" => format!("CAST(strftime('%d', {}) AS INTEGER)", args[0]),
        "NOW" => "datetime('now')".to_string(),
        _ => format!("{upper}({})", args.join(", ")),
    };
    Ok(sql)
}

/// Description attached to a projected function call
#[must_use]
pub fn result_description(name: &str, first_arg: Option<&FieldDescription>) -> FieldDescription {
    match name.to_uppercase().as_str() {
        "COUNT" | "LENGTH" | "YEAR" | "MONTH" | "DAY" | "DAYOFMONTH" | "FLOOR" | "CEIL" => {
            FieldDescription::new(FieldType::Integer)
        }
        "SUM" | "AVG" | "ROUND" | "ABS" => FieldDescription::new(FieldType::Float),
        "DATE" => FieldDescription::new(FieldType::Date),
        "NOW" => FieldDescription::new(FieldType::Datetime),
        "MIN" | "MAX" | "IFNULL" | "COALESCE" => match first_arg {
            Some(desc) if !desc.is_list => desc.clone(),
            _ => FieldDescription::new(FieldType::String),
        },
        _ => FieldDescription::new(FieldType::String),
    }
}

fn arity_error(name: &str, got: usize) -> QueryError {
    QueryError::Parse(format!("wrong number of arguments ({got}) for {name}()"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_aggregates() {
        assert!(is_aggregate("count"));
        assert!(is_aggregate("GROUP_CONCAT"));
        assert!(!is_aggregate("LOWER"));
    }

    #[test]
    fn test_translations() {
        assert_eq!(translate("count", &args(&["*"]), false).unwrap(), "COUNT(*)");
        assert_eq!(translate("COUNT", &args(&["\"B\".\"Title\""]), true).unwrap(), "COUNT(DISTINCT \"B\".\"Title\")");
        assert_eq!(translate("concat", &args(&["a", "?1"]), false).unwrap(), "(a || ?1)");
        assert_eq!(translate("YEAR", &args(&["d"]), false).unwrap(), "CAST(strftime('%Y', d) AS INTEGER)");
        assert_eq!(translate("now", &[], false).unwrap(), "datetime('now')");
        assert_eq!(translate("substring", &args(&["t", "?1", "?2"]), false).unwrap(), "substr(t, ?1, ?2)");
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(translate("load_extension", &args(&["x"]), false), Err(QueryError::DisallowedFunction(_))));
        assert!(matches!(translate("LOWER", &args(&["a", "b"]), false), Err(QueryError::Parse(_))));
        assert!(matches!(translate("LOWER", &args(&["a"]), true), Err(QueryError::Parse(_))));
        assert!(matches!(translate("SUM", &args(&["*"]), false), Err(QueryError::Parse(_))));
    }
}
