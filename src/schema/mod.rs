// Naming rules, declaration strings, catalog-backed schema resolution
pub mod declaration;
pub mod naming;
pub mod registry;

pub use declaration::{parse_drilldown_tabs, parse_parent_tables, TableDeclaration};
pub use naming::{is_reserved_word, validate_name};
pub use registry::SchemaRegistry;
