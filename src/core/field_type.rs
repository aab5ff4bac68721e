use serde::{Deserialize, Serialize};

/// Declared type of a Cargo field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FieldType {
    // Page and file references
    Page,
    File,
    // String types
    String,
    Text,
    Wikitext,
    WikitextString,
    Searchtext,
    Url,
    Email,
    // Numeric types
    Integer,
    Float,
    Rating,
    Boolean,
    // Date/Time types
    Date,
    StartDate,
    EndDate,
    Datetime,
    StartDatetime,
    EndDatetime,
    // Geo
    Coordinates,
}

/// Role of a date field in an event-style table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRole {
    Start,
    End,
}

impl FieldType {
    pub const ALL: [Self; 20] = [
        Self::Page,
        Self::File,
        Self::String,
        Self::Text,
        Self::Wikitext,
        Self::WikitextString,
        Self::Searchtext,
        Self::Url,
        Self::Email,
        Self::Integer,
        Self::Float,
        Self::Rating,
        Self::Boolean,
        Self::Date,
        Self::StartDate,
        Self::EndDate,
        Self::Datetime,
        Self::StartDatetime,
        Self::EndDatetime,
        Self::Coordinates,
    ];

    /// Canonical declaration name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Page => "Page",
            Self::File => "File",
            Self::String => "String",
            Self::Text => "Text",
            Self::Wikitext => "Wikitext",
            Self::WikitextString => "Wikitext string",
            Self::Searchtext => "Searchtext",
            Self::Url => "URL",
            Self::Email => "Email",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Rating => "Rating",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::StartDate => "Start date",
            Self::EndDate => "End date",
            Self::Datetime => "Datetime",
            Self::StartDatetime => "Start datetime",
            Self::EndDatetime => "End datetime",
            Self::Coordinates => "Coordinates",
        }
    }

    /// Case-insensitive lookup; inner whitespace is collapsed ("start   Date")
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(&normalized))
    }

    #[must_use]
    pub const fn is_date_or_datetime(self) -> bool {
        matches!(
            self,
            Self::Date
                | Self::StartDate
                | Self::EndDate
                | Self::Datetime
                | Self::StartDatetime
                | Self::EndDatetime
        )
    }

    #[must_use]
    pub const fn has_time(self) -> bool {
        matches!(self, Self::Datetime | Self::StartDatetime | Self::EndDatetime)
    }

    #[must_use]
    pub const fn date_role(self) -> Option<DateRole> {
        match self {
            Self::StartDate | Self::StartDatetime => Some(DateRole::Start),
            Self::EndDate | Self::EndDatetime => Some(DateRole::End),
            _ => None,
        }
    }

    /// Long text: stored as TEXT, compared by prefix in duplicate checks
    #[must_use]
    pub const fn is_long_text(self) -> bool {
        matches!(self, Self::Text | Self::Wikitext | Self::Searchtext)
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Rating | Self::Boolean)
    }

    /// String-like types capped by a byte size
    #[must_use]
    pub const fn is_sized_string(self) -> bool {
        matches!(
            self,
            Self::Page
                | Self::File
                | Self::String
                | Self::WikitextString
                | Self::Url
                | Self::Email
        )
    }

    /// SQLite column type for a scalar value of this type
    #[must_use]
    pub fn sql_type(self, size: Option<usize>) -> String {
        match self {
            Self::Integer | Self::Boolean => "INTEGER".to_string(),
            Self::Float | Self::Rating => "REAL".to_string(),
            Self::Date | Self::StartDate | Self::EndDate => "DATE".to_string(),
            Self::Datetime | Self::StartDatetime | Self::EndDatetime => "DATETIME".to_string(),
            Self::Text | Self::Wikitext | Self::Searchtext | Self::Coordinates => "TEXT".to_string(),
            _ => format!("VARCHAR({})", size.unwrap_or(300)),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(FieldType::from_name("string"), Some(FieldType::String));
        assert_eq!(FieldType::from_name("START  DATE"), Some(FieldType::StartDate));
        assert_eq!(FieldType::from_name("url"), Some(FieldType::Url));
        assert_eq!(FieldType::from_name("Wikitext String"), Some(FieldType::WikitextString));
        assert_eq!(FieldType::from_name("Strnig"), None);
        assert_eq!(FieldType::from_name(""), None);
    }

    #[test]
    fn test_names_round_trip() {
        for t in FieldType::ALL {
            assert_eq!(FieldType::from_name(t.name()), Some(t));
        }
    }

    #[test]
    fn test_date_roles() {
        assert_eq!(FieldType::StartDatetime.date_role(), Some(DateRole::Start));
        assert_eq!(FieldType::EndDate.date_role(), Some(DateRole::End));
        assert_eq!(FieldType::Date.date_role(), None);
        assert!(FieldType::EndDatetime.has_time());
        assert!(!FieldType::EndDate.has_time());
    }

    #[test]
    fn test_sql_types() {
        assert_eq!(FieldType::String.sql_type(Some(50)), "VARCHAR(50)");
        assert_eq!(FieldType::Page.sql_type(None), "VARCHAR(300)");
        assert_eq!(FieldType::Boolean.sql_type(None), "INTEGER");
        assert_eq!(FieldType::Wikitext.sql_type(None), "TEXT");
    }
}
