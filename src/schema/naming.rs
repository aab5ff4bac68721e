/// Naming rules for Cargo tables and fields

use crate::core::{NameKind, ValidationError};
use crate::storage::REPLACEMENT_SUFFIX;

/// Characters that cannot appear in table or field names
const DISALLOWED_CHARACTERS: &[char] = &['.', ',', '-', '<', '>', '(', ')', '{', '}', '[', ']', '\\', '/'];

/// Operators of the query language
pub const CARGO_RESERVED_WORDS: [&str; 4] = ["holds", "matches", "near", "within"];

/// SQL reserved words (MySQL and SQLite), upper case
pub const SQL_RESERVED_WORDS: &[&str] = &[
    "ABORT", "ACCESSIBLE", "ADD", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC", "ASENSITIVE",
    "AUTOINCREMENT", "BEFORE", "BETWEEN", "BIGINT", "BINARY", "BLOB", "BOTH", "BY", "CALL",
    "CASCADE", "CASE", "CHANGE", "CHAR", "CHARACTER", "CHECK", "COLLATE", "COLUMN", "CONDITION",
    "CONSTRAINT", "CONTINUE", "CONVERT", "CREATE", "CROSS", "CUBE", "CUME_DIST", "CURRENT_DATE",
    "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR", "DATABASE", "DATABASES",
    "DAY_HOUR", "DAY_MICROSECOND", "DAY_MINUTE", "DAY_SECOND", "DEC", "DECIMAL", "DECLARE",
    "DEFAULT", "DEFERRABLE", "DELAYED", "DELETE", "DENSE_RANK", "DESC", "DESCRIBE",
    "DETERMINISTIC", "DISTINCT", "DISTINCTROW", "DIV", "DOUBLE", "DROP", "DUAL", "EACH", "ELSE",
    "ELSEIF", "EMPTY", "ENCLOSED", "ESCAPE", "ESCAPED", "EXCEPT", "EXCLUSIVE", "EXISTS", "EXIT",
    "EXPLAIN", "FALSE", "FETCH", "FIRST_VALUE", "FLOAT", "FLOAT4", "FLOAT8", "FOR", "FORCE",
    "FOREIGN", "FROM", "FULL", "FULLTEXT", "FUNCTION", "GENERATED", "GET", "GLOB", "GRANT",
    "GROUP", "GROUPING", "GROUPS", "HAVING", "HIGH_PRIORITY", "HOUR_MICROSECOND", "HOUR_MINUTE",
    "HOUR_SECOND", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INFILE", "INNER", "INOUT",
    "INSENSITIVE", "INSERT", "INSTEAD", "INT", "INT1", "INT2", "INT3", "INT4", "INT8", "INTEGER",
    "INTERSECT", "INTERVAL", "INTO", "IS", "ISNULL", "ITERATE", "JOIN", "JSON_TABLE", "KEY",
    "KEYS", "KILL", "LAG", "LAST_VALUE", "LATERAL", "LEAD", "LEADING", "LEAVE", "LEFT", "LIKE",
    "LIMIT", "LINEAR", "LINES", "LOAD", "LOCALTIME", "LOCALTIMESTAMP", "LOCK", "LONG",
    "LONGBLOB", "LONGTEXT", "LOOP", "LOW_PRIORITY", "MATCH", "MAXVALUE", "MEDIUMBLOB",
    "MEDIUMINT", "MEDIUMTEXT", "MIDDLEINT", "MINUTE_MICROSECOND", "MINUTE_SECOND", "MOD",
    "MODIFIES", "NATURAL", "NOT", "NOTNULL", "NO_WRITE_TO_BINLOG", "NTH_VALUE", "NTILE", "NULL",
    "NUMERIC", "OF", "OFFSET", "ON", "OPTIMIZE", "OPTION", "OPTIONALLY", "OR", "ORDER", "OUT",
    "OUTER", "OUTFILE", "OVER", "PARTITION", "PERCENT_RANK", "PRAGMA", "PRECISION", "PRIMARY",
    "PROCEDURE", "PURGE", "RANGE", "RANK", "READ", "READS", "READ_WRITE", "REAL", "RECURSIVE",
    "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPEAT", "REPLACE", "REQUIRE",
    "RESIGNAL", "RESTRICT", "RETURN", "REVOKE", "RIGHT", "RLIKE", "ROLLBACK", "ROW", "ROWS",
    "ROW_NUMBER", "SAVEPOINT", "SCHEMA", "SCHEMAS", "SECOND_MICROSECOND", "SELECT", "SENSITIVE",
    "SEPARATOR", "SET", "SHOW", "SIGNAL", "SMALLINT", "SPATIAL", "SPECIFIC", "SQL",
    "SQLEXCEPTION", "SQLSTATE", "SQLWARNING", "SQL_BIG_RESULT", "SQL_CALC_FOUND_ROWS",
    "SQL_SMALL_RESULT", "SSL", "STARTING", "STORED", "STRAIGHT_JOIN", "SYSTEM", "TABLE",
    "TEMPORARY", "TERMINATED", "THEN", "TINYBLOB", "TINYINT", "TINYTEXT", "TO", "TRAILING",
    "TRANSACTION", "TRIGGER", "TRUE", "UNDO", "UNION", "UNIQUE", "UNLOCK", "UNSIGNED", "UPDATE",
    "USAGE", "USE", "USING", "UTC_DATE", "UTC_TIME", "UTC_TIMESTAMP", "VACUUM", "VALUES",
    "VARBINARY", "VARCHAR", "VARCHARACTER", "VARYING", "VIEW", "VIRTUAL", "WHEN", "WHERE",
    "WHILE", "WINDOW", "WITH", "WITHOUT", "WRITE", "XOR", "YEAR_MONTH", "ZEROFILL",
];

#[must_use]
pub fn is_reserved_word(name: &str) -> bool {
    let upper = name.to_uppercase();
    SQL_RESERVED_WORDS.contains(&upper.as_str())
        || CARGO_RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(name))
}

/// Check a table or field name against the naming rules
pub fn validate_name(name: &str, kind: NameKind) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Blank { kind });
    }
    let owned = || name.to_string();

    if name.chars().any(char::is_whitespace) {
        return Err(ValidationError::Whitespace { kind, name: owned() });
    }
    if name.starts_with('_') {
        return Err(ValidationError::LeadingUnderscore { kind, name: owned() });
    }
    if name.ends_with('_') {
        return Err(ValidationError::TrailingUnderscore { kind, name: owned() });
    }
    if name.contains("__") {
        return Err(ValidationError::DoubleUnderscore { kind, name: owned() });
    }
    if let Some(ch) = name.chars().find(|c| DISALLOWED_CHARACTERS.contains(c)) {
        return Err(ValidationError::DisallowedCharacter { kind, name: owned(), ch });
    }
    if is_reserved_word(name) {
        return Err(ValidationError::ReservedWord { kind, name: owned() });
    }
    // A list helper named `T__NEXT` would be the replacement of `T`
    if kind == NameKind::Field && name.eq_ignore_ascii_case(REPLACEMENT_SUFFIX.trim_start_matches('_')) {
        return Err(ValidationError::ReplacementName(owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_name("Books", NameKind::Table).is_ok());
        assert!(validate_name("Release_date", NameKind::Field).is_ok());
        assert!(validate_name("Année", NameKind::Field).is_ok());
    }

    #[test]
    fn test_underscores() {
        assert!(matches!(
            validate_name("_Books", NameKind::Table),
            Err(ValidationError::LeadingUnderscore { .. })
        ));
        assert!(matches!(
            validate_name("Books_", NameKind::Table),
            Err(ValidationError::TrailingUnderscore { .. })
        ));
        assert!(matches!(
            validate_name("Book__Title", NameKind::Field),
            Err(ValidationError::DoubleUnderscore { .. })
        ));
    }

    #[test]
    fn test_replacement_suffix_field() {
        for name in ["NEXT", "next"] {
            assert!(matches!(
                validate_name(name, NameKind::Field),
                Err(ValidationError::ReplacementName(n)) if n == name
            ));
        }
        assert!(validate_name("Next_edition", NameKind::Field).is_ok());
        assert!(validate_name("NEXT", NameKind::Table).is_ok());
    }

    #[test]
    fn test_whitespace_and_characters() {
        assert!(matches!(
            validate_name("Page count", NameKind::Field),
            Err(ValidationError::Whitespace { .. })
        ));
        assert!(matches!(
            validate_name("a.b", NameKind::Field),
            Err(ValidationError::DisallowedCharacter { ch: '.', .. })
        ));
        assert!(matches!(validate_name("  ", NameKind::Field), Err(ValidationError::Blank { .. })));
    }

    #[test]
    fn test_reserved_words_any_case() {
        assert!(matches!(
            validate_name("select", NameKind::Field),
            Err(ValidationError::ReservedWord { .. })
        ));
        assert!(matches!(
            validate_name("Order", NameKind::Table),
            Err(ValidationError::ReservedWord { .. })
        ));
        assert!(matches!(
            validate_name("Holds", NameKind::Field),
            Err(ValidationError::ReservedWord { .. })
        ));
        assert!(validate_name("Year", NameKind::Field).is_ok());
    }
}
