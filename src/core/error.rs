use thiserror::Error;

/// Kind of name being validated, used in messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Table,
    Field,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "Table"),
            Self::Field => write!(f, "Field"),
        }
    }
}

/// Malformed field or table declaration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("Field declaration is empty")]
    Empty,
    #[error("Unknown field type '{0}'")]
    UnknownType(String),
    #[error("Unbalanced parentheses in '{0}'")]
    UnbalancedParentheses(String),
    #[error("Invalid list delimiter in '{0}'")]
    BadDelimiter(String),
    #[error("Invalid value '{value}' for parameter '{param}'")]
    BadParameter { param: String, value: String },
    #[error("Invalid regex '{pattern}': {reason}")]
    BadRegex { pattern: String, reason: String },
    #[error("Field '{0}': a hierarchy field cannot be of type Coordinates")]
    HierarchyCoordinates(String),
    #[error("Invalid hierarchy structure: {0}")]
    BadHierarchy(String),
    #[error("Only one '{0}' field is allowed per table")]
    DuplicateDateRole(String),
    #[error("End field '{end}' must be declared after start field '{start}'")]
    EndBeforeStart { start: String, end: String },
    #[error("Field '{0}' is declared twice")]
    DuplicateField(String),
    #[error("Parameter '_table' is required")]
    MissingTable,
    #[error("Malformed declaration: {0}")]
    Malformed(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Bad table or field name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{kind} name cannot be blank")]
    Blank { kind: NameKind },
    #[error("{kind} name '{name}' cannot contain whitespace")]
    Whitespace { kind: NameKind, name: String },
    #[error("{kind} name '{name}' cannot start with an underscore")]
    LeadingUnderscore { kind: NameKind, name: String },
    #[error("{kind} name '{name}' cannot end with an underscore")]
    TrailingUnderscore { kind: NameKind, name: String },
    #[error("{kind} name '{name}' cannot contain a double underscore")]
    DoubleUnderscore { kind: NameKind, name: String },
    #[error("{kind} name '{name}' cannot contain the character '{ch}'")]
    DisallowedCharacter { kind: NameKind, name: String, ch: char },
    #[error("{kind} name '{name}' is a reserved word")]
    ReservedWord { kind: NameKind, name: String },
    #[error("Field name '{0}' is reserved for replacement tables")]
    ReplacementName(String),
    #[error("Parent table '{0}' does not exist")]
    UnknownParentTable(String),
}

/// Catalog lookups
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Table '{0}' does not exist")]
    UnknownTable(String),
    #[error("Stored schema for table '{table}' is corrupt: {source}")]
    CorruptSchema {
        table: String,
        source: serde_json::Error,
    },
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Failure of one store call. The enclosing page save is not affected.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Mandatory field '{0}' cannot have a blank value")]
    MandatoryBlank(String),
    #[error("Mandatory unique field '{field}' already has the value '{value}' on another page")]
    MandatoryNotUnique { field: String, value: String },
    #[error("Invalid declaration: {0}")]
    Declaration(#[from] DeclarationError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Unparseable or unsafe query. Rendered verbatim in place of results.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Error in query: {0}")]
    Parse(String),
    #[error("Error in query: the string \"{0}\" cannot be used")]
    DisallowedToken(String),
    #[error("Error in query: table '{0}' does not exist")]
    UnknownTable(String),
    #[error("Error in query: unknown table alias '{0}'")]
    UnknownAlias(String),
    #[error("Error in query: table alias '{0}' is used more than once")]
    DuplicateAlias(String),
    #[error("Error in query: field '{0}' not found")]
    UnknownField(String),
    #[error("Error in query: field '{0}' exists in more than one table, qualify it with a table alias")]
    AmbiguousField(String),
    #[error("Error in query: table '{0}' is not joined to the other tables, use 'join on'")]
    MissingJoin(String),
    #[error("Error in query: field alias '{0}' starts with an underscore, which is reserved")]
    ReservedAlias(String),
    #[error("Error in query: {operator} cannot be used with field '{field}': {reason}")]
    InvalidOperator {
        operator: String,
        field: String,
        reason: String,
    },
    #[error("Error in query: function '{0}' is not allowed")]
    DisallowedFunction(String),
    #[error("Error in query: invalid {clause} value '{value}'")]
    InvalidLimit { clause: String, value: String },
    #[error("Error in query: unknown format '{0}'")]
    UnknownFormat(String),
    #[error("Error in query: {0}")]
    Registry(#[from] RegistryError),
    #[error("Error in query: {0}")]
    Database(#[from] rusqlite::Error),
}

/// DDL failure. No safe partial state exists, so this is fatal for the operation.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("No table declaration found for template {0}")]
    NoDeclaration(i64),
    #[error("Table '{0}' has no replacement table")]
    NoReplacement(String),
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Umbrella error for the facade and the CLI
#[derive(Error, Debug)]
pub enum CargoError {
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
