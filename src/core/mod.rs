// Module declarations
pub mod coordinates;
pub mod date;
pub mod error;
pub mod field_description;
pub mod field_type;
pub mod hierarchy;
pub mod page;
pub mod table_schema;
pub mod value;

// Re-exports for convenience
pub use coordinates::Coordinates;
pub use date::{parse_date_value, DatePrecision, ParsedDate};
pub use error::{
    CargoError, DeclarationError, LifecycleError, NameKind, QueryError, RegistryError,
    StorageError, ValidationError,
};
pub use field_description::{FieldDescription, DEFAULT_DELIMITER};
pub use field_type::{DateRole, FieldType};
pub use hierarchy::{HierarchyNode, HierarchyTree, NestedSetRow};
pub use page::{PageIdentity, StoreContext, StoreOrigin};
pub use table_schema::{system_field_description, DrilldownTab, ParentTable, TableSchema, SYSTEM_FIELDS};
pub use value::{PreparedValue, Value};
