// Query compiler: clause strings -> parameterized SQL plan
pub mod compiler;
pub mod functions;
pub mod plan;
pub mod safety;

pub use compiler::QueryCompiler;
pub use plan::{PlanTable, Projection, QueryPlan, QueryText};
