// Module declarations
pub mod common;
pub mod declaration;
mod clauses;
mod conditions;
mod expressions;
mod statement;

// Re-export all public types
pub use statement::{
    ArithOp, CompareOp, Condition, DistanceUnit, Expr, FieldRef, JoinCondition, Literal,
    OrderItem, SelectField, SortOrder, TableRef,
};

pub use clauses::{
    parse_condition, parse_count, parse_fields, parse_group_by, parse_join_on, parse_order_by,
    parse_tables,
};
pub use declaration::{parse_field_declaration, Modifier, RawFieldDeclaration};
